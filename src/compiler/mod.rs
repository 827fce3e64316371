//! Functor dependency compiler
//!
//! Turns a linked entity into an execution plan for its generated
//! data-access source:
//!
//! 1. a topological order over the fields, driven by `@field` cross
//!    references, stable by declaration order
//! 2. guard groups: consecutive fields needing the same inputs share one
//!    presence check
//! 3. rendered pipeline source, interface functions included
//! 4. stub records for user functors nobody has written yet

pub mod codegen;
pub mod functors;
pub mod interface;
pub mod topo;

use tracing::debug;

use crate::context::{CompilationContext, EntityId};
use crate::error::{Error, Result};
use crate::features::{Feature, RuntimeRule};
use crate::model::entity::Entity;
use crate::naming;

use codegen::CodeBlock;
use topo::{TopoGraph, TopoId};

pub use functors::FunctorStub;

/// Fields sharing one presence check in generated code
#[derive(Debug, Clone, PartialEq)]
pub struct GuardGroup {
    /// Inputs that must be present before the group runs
    pub requires: Vec<String>,
    /// Fields computed inside the group, in execution order
    pub fields: Vec<String>,
}

/// Everything the generators need for one entity
#[derive(Debug, Clone)]
pub struct EntityPlan {
    pub id: EntityId,
    pub name: String,
    /// All fields in computation order
    pub order: Vec<String>,
    pub guards: Vec<GuardGroup>,
    pub stubs: Vec<FunctorStub>,
    pub rules: Vec<RuntimeRule>,
    pub source: String,
}

/// Compile every entity of one expanded schema
pub fn compile_schema(ctx: &mut CompilationContext, index: usize) -> Result<Vec<EntityPlan>> {
    let ids = ctx.schemas[index].entities.clone();
    let mut plans = Vec::with_capacity(ids.len());
    for eid in ids {
        plans.push(compile_entity(ctx, eid)?);
    }
    Ok(plans)
}

/// Compile one entity into its execution plan
pub fn compile_entity(ctx: &mut CompilationContext, eid: EntityId) -> Result<EntityPlan> {
    let entity = ctx.entity(eid).clone();

    let order = field_order(&entity)?;
    let guards = group_guards(&entity, &order);

    let mut stubs = Vec::new();
    let mut code = CodeBlock::new();
    code.line(format!("// Pipeline for {}", entity.display));
    code.open(format!(
        "pub fn apply_{}(record: &mut Record) -> Result<()> {{",
        naming::sql_name(&entity.name)
    ));
    for guard in &guards {
        let requires: Vec<String> = guard
            .requires
            .iter()
            .map(|f| format!("\"{}\"", naming::sql_name(f)))
            .collect();
        let requires = requires.join(", ");
        code.open(format!("if has_all(record, &[{requires}]) {{"));
        for field_name in &guard.fields {
            let field = entity.field(field_name).cloned().ok_or_else(|| {
                Error::UnknownField {
                    field: field_name.clone(),
                    entity: entity.name.clone(),
                    context: "pipeline compilation",
                }
            })?;
            let pipeline = codegen::render_field_pipeline(&entity, &field, &mut stubs)?;
            code.extend(pipeline);
        }
        // A partially present group is an authoring mistake, not a skip.
        code.dedent();
        code.open(format!("}} else if has_any(record, &[{requires}]) {{"));
        code.line(format!(
            "return Err(missing_companions(record, &[{requires}], \"{}\"));",
            entity.display
        ));
        code.close("}");
    }
    for feature in &entity.features {
        if let Feature::AtLeastOneNotNull(fields) = feature {
            let names: Vec<String> = fields
                .iter()
                .map(|f| format!("\"{}\"", naming::sql_name(f)))
                .collect();
            code.open(format!("if !has_any(record, &[{}]) {{", names.join(", ")));
            code.line(format!(
                "return Err(all_null(&[{}], \"{}\"));",
                names.join(", "),
                entity.display
            ));
            code.close("}");
        }
    }
    code.line("Ok(())");
    code.close("}");

    for decl in &entity.interfaces {
        code.blank();
        let rendered = interface::render_interface(ctx, &entity, decl, &mut stubs)?;
        code.extend(rendered);
    }

    let rules: Vec<RuntimeRule> = entity
        .features
        .iter()
        .flat_map(|f| f.runtime_rules())
        .collect();

    debug!(
        entity = %entity.name,
        fields = order.len(),
        guards = guards.len(),
        stubs = stubs.len(),
        "compiled entity plan"
    );

    Ok(EntityPlan {
        id: eid,
        name: entity.name,
        order,
        guards,
        stubs,
        rules,
        source: code.render(),
    })
}

/// Topological field order: `@ref` before its reader, declaration order
/// breaking ties
fn field_order(entity: &Entity) -> Result<Vec<String>> {
    let mut graph = TopoGraph::new();
    for field in &entity.fields {
        graph.add_node(TopoId::Field(field.name.clone()))?;
    }
    for field in &entity.fields {
        for dep in field.cross_refs() {
            if dep == field.name {
                return Err(Error::Usage(format!(
                    "field '{}' of entity '{}' references itself through '@{}'",
                    field.name, entity.name, dep
                )));
            }
            graph.add_edge(
                &TopoId::Field(dep.to_string()),
                &TopoId::Field(field.name.clone()),
            )?;
        }
    }
    Ok(graph
        .sort()?
        .into_iter()
        .map(|id| match id {
            TopoId::Field(name) => name,
            TopoId::Param(name) => name,
        })
        .collect())
}

/// Group consecutive fields with identical input requirements.
///
/// A field's requirement set is itself (composed fields have no raw input
/// and drop out) plus everything it reads through `@field`.
fn group_guards(entity: &Entity, order: &[String]) -> Vec<GuardGroup> {
    let mut groups: Vec<GuardGroup> = Vec::new();

    for name in order {
        let field = match entity.field(name) {
            Some(f) => f,
            None => continue,
        };
        if field.all_functors().next().is_none() {
            continue;
        }

        let mut requires: Vec<String> = Vec::new();
        if field.composer.is_none() {
            requires.push(field.name.clone());
        }
        for dep in field.cross_refs() {
            if !requires.iter().any(|r| r == dep) {
                requires.push(dep.to_string());
            }
        }
        requires.sort();

        match groups.last_mut() {
            Some(last) if last.requires == requires => last.fields.push(name.clone()),
            _ => groups.push(GuardGroup {
                requires,
                fields: vec![name.clone()],
            }),
        }
    }
    groups
}
