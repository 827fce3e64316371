//! Relation expansion
//!
//! Two rewrites run between linking and generation:
//!
//! 1. Every many-to-many edge is replaced by a synthetic junction entity
//!    carrying one FK field per side, a composite primary key, and a
//!    creation timestamp. The original edge disappears; two many-to-one
//!    edges take its place.
//! 2. Each schema's entity list is completed to the relation closure of its
//!    roots: a breadth-first walk following forward edges, plus the reverse
//!    direction of junction-owned edges so junctions join the schemas of
//!    their endpoints.
//!
//! After expansion each schema is checked for compliance; findings are
//! collected into one report so authors see everything at once.

use std::collections::VecDeque;

use tracing::{debug, info};

use crate::context::{CompilationContext, EntityId};
use crate::error::{ComplianceReport, Error, Result};
use crate::features::Feature;
use crate::model::entity::Entity;
use crate::model::field::{Field, FieldOrigin};
use crate::model::relation::{RelKind, Relation};
use crate::naming;

/// Run both rewrites and the compliance check over every schema
pub fn expand(ctx: &mut CompilationContext) -> Result<()> {
    synthesize_junctions(ctx)?;
    for i in 0..ctx.schemas.len() {
        expand_schema(ctx, i)?;
        check_compliance(ctx, i)?;
    }
    Ok(())
}

// =============================================================================
// JUNCTION SYNTHESIS
// =============================================================================

/// Replace every `ManyToMany` edge with a junction entity and two
/// `ManyToOne` edges pointing back at the original endpoints.
pub fn synthesize_junctions(ctx: &mut CompilationContext) -> Result<()> {
    // Take the m:n edges out first; the rewrite appends to both arenas.
    let pending: Vec<Relation> = ctx
        .relations
        .iter()
        .filter(|r| r.kind == RelKind::ManyToMany)
        .cloned()
        .collect();
    ctx.relations.retain(|r| r.kind != RelKind::ManyToMany);

    for edge in pending {
        let junction = build_junction(ctx, &edge)?;
        let module = ctx.entity(edge.left).module;
        let left_field = junction.key[0].clone();
        let right_field = junction.key[1].clone();

        let name = junction.name.clone();
        let jid = ctx.add_entity(junction);
        ctx.module_mut(module).entities.push(jid);

        let mut to_left = Relation::new(jid, left_field, edge.left, RelKind::ManyToOne);
        to_left.via_junction = true;
        let mut to_right = Relation::new(jid, right_field, edge.right, RelKind::ManyToOne);
        to_right.via_junction = true;
        ctx.relations.push(to_left);
        ctx.relations.push(to_right);

        info!(junction = %name, "synthesized junction entity");
    }
    Ok(())
}

fn build_junction(ctx: &mut CompilationContext, edge: &Relation) -> Result<Entity> {
    let left = ctx.entity(edge.left).clone();
    let right = ctx.entity(edge.right).clone();

    let name = naming::junction_name(&left.name, &right.name);
    if ctx.entities.iter().any(|e| e.name == name) {
        return Err(Error::JunctionCollision { name });
    }

    // Self-relations fall back to the declared field for the second side.
    let left_field = left.name.clone();
    let right_field = if right.name == left.name {
        edge.field.clone()
    } else {
        right.name.clone()
    };

    let module = left.module;
    let mut junction = Entity::new(EntityId(0), module, &name);
    junction.synthetic = true;
    junction.comment = Some(format!("Junction of {} and {}", left.display, right.display));

    junction.add_field(key_ref_field(&left, &left_field)?)?;
    junction.add_field(key_ref_field(&right, &right_field)?)?;
    junction.key = vec![left_field, right_field];

    let stamp = Feature::CreateTimestamp;
    stamp.after_fields(&mut junction)?;
    junction.features.push(stamp);

    debug!(
        junction = %junction.name,
        left = %left.name,
        right = %right.name,
        "junction layout"
    );
    Ok(junction)
}

/// An FK field mirroring the single-column key of the referenced entity
fn key_ref_field(target: &Entity, field_name: &str) -> Result<Field> {
    let key_name = target.key.first().ok_or_else(|| Error::UnknownField {
        field: "<key>".to_string(),
        entity: target.name.clone(),
        context: "junction synthesis",
    })?;
    let key_field = target.field(key_name).ok_or_else(|| Error::UnknownField {
        field: key_name.clone(),
        entity: target.name.clone(),
        context: "junction synthesis",
    })?;

    let mut ty = key_field.ty.clone();
    ty.chain = vec![ty.kind.name().to_string()];
    Ok(Field::new(field_name, ty, FieldOrigin::Junction))
}

// =============================================================================
// SCHEMA CLOSURE
// =============================================================================

/// Complete one schema's entity list to the relation closure of its roots
pub fn expand_schema(ctx: &mut CompilationContext, index: usize) -> Result<()> {
    let roots = ctx.schemas[index].roots.clone();
    let mut closure: Vec<EntityId> = Vec::new();
    let mut queue: VecDeque<EntityId> = VecDeque::new();

    for root in roots {
        if !closure.contains(&root) {
            closure.push(root);
            queue.push_back(root);
        }
    }

    // Forward edges only; the one reverse direction followed is the
    // junction's, so synthesized junctions join the schemas of their
    // endpoints without dragging in every entity that merely references
    // a member.
    while let Some(current) = queue.pop_front() {
        let neighbors: Vec<EntityId> = ctx
            .relations
            .iter()
            .filter_map(|r| {
                if r.left == current {
                    Some(r.right)
                } else if r.right == current && r.via_junction {
                    Some(r.left)
                } else {
                    None
                }
            })
            .collect();
        for next in neighbors {
            if !closure.contains(&next) {
                closure.push(next);
                queue.push_back(next);
            }
        }
    }

    debug!(
        schema = %ctx.schemas[index].name,
        roots = ctx.schemas[index].roots.len(),
        entities = closure.len(),
        "expanded schema closure"
    );
    ctx.schemas[index].entities = closure;
    Ok(())
}

// =============================================================================
// COMPLIANCE
// =============================================================================

/// Validate one expanded schema, reporting all findings together
pub fn check_compliance(ctx: &CompilationContext, index: usize) -> Result<Vec<String>> {
    let schema = &ctx.schemas[index];
    let mut report = ComplianceReport::new();

    for eid in &schema.entities {
        let entity = ctx.entity(*eid);
        if entity.key.is_empty() {
            report.error(format!("entity '{}' has no primary key", entity.name));
        }
        for field in &entity.fields {
            if field.ty.kind == crate::model::types::TypeKind::Text
                && field.ty.int_attr("maxLength").is_none()
                && field.ty.int_attr("fixedLength").is_none()
            {
                report.warn(format!(
                    "field '{}.{}' has no length bound, storage falls back to TEXT",
                    entity.name, field.name
                ));
            }
        }
    }

    for vid in &schema.views {
        let view = ctx.view(*vid);
        if !schema.contains(view.entity) {
            report.error(format!(
                "view '{}' reads entity '{}' which is outside the schema",
                view.name,
                ctx.entity(view.entity).name
            ));
        }
        if let Some(doc) = view.document {
            for eid in ctx.document(doc).entity_closure() {
                if !schema.contains(eid) {
                    report.error(format!(
                        "document '{}' joins entity '{}' which is outside the schema",
                        ctx.document(doc).name,
                        ctx.entity(eid).name
                    ));
                }
            }
        }
    }

    report.into_result(&schema.name)
}
