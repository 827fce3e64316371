//! Cross-module reference resolver
//!
//! Turns the raw module graph into the linked model. Resolution always looks
//! at the referencing module first, then walks its namespace list
//! last-to-first, so the latest import shadows earlier ones and the implicit
//! core module loses to everything. Results are memoized per
//! `name@module` so repeated references resolve once.
//!
//! Passes, in order:
//!
//! 1. entity shells + naming-table registration
//! 2. entity linking (inheritance, features, field types)
//! 3. relation edges
//! 4. documents, then views, then schemas

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, warn};

use crate::ast::{self, AttrValue, RelOp, TypeRef};
use crate::context::{
    CompilationContext, DocumentId, EntityId, ModuleId, NamedType, ViewId,
};
use crate::error::{Error, RefKind, Result};
use crate::features::Feature;
use crate::model::entity::Entity;
use crate::model::field::{Field, FieldOrigin};
use crate::model::relation::{RelKind, Relation};
use crate::model::schema::Schema;
use crate::model::types::{ResolvedType, TypeKind};
use crate::model::view::{ContainsNode, Document, View};
use crate::naming;

/// Link every loaded module in `ctx`.
///
/// Linking an already-linked context is a no-op; the resolved graph is
/// built exactly once per compilation.
pub fn link(ctx: &mut CompilationContext) -> Result<()> {
    if !ctx.entities.is_empty() {
        debug!("context already linked, skipping");
        return Ok(());
    }
    let mut linker = Linker::default();
    linker.register_entities(ctx)?;
    linker.link_entities(ctx)?;
    linker.link_relations(ctx)?;
    linker.link_documents(ctx)?;
    linker.link_views(ctx)?;
    linker.link_schemas(ctx)?;
    debug!(
        entities = ctx.entities.len(),
        relations = ctx.relations.len(),
        views = ctx.views.len(),
        schemas = ctx.schemas.len(),
        "linking complete"
    );
    Ok(())
}

#[derive(Default)]
struct Linker {
    /// Entity → declaration location
    decl_of: BTreeMap<EntityId, (ModuleId, usize)>,
    linked: BTreeSet<EntityId>,
    visiting: Vec<EntityId>,
    doc_ids: BTreeMap<(ModuleId, usize), DocumentId>,
    view_ids: BTreeMap<(ModuleId, usize), ViewId>,
}

impl Linker {
    // ===== pass 1: shells =====

    fn register_entities(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        for m in 0..ctx.modules.len() {
            let mid = ModuleId(m);
            let names: Vec<String> = ctx
                .module(mid)
                .ast
                .entities
                .iter()
                .map(|e| e.name.clone())
                .collect();
            for (i, name) in names.into_iter().enumerate() {
                let eid = ctx.add_entity(Entity::new(EntityId(0), mid, &name));
                ctx.module_mut(mid).entities.push(eid);
                self.decl_of.insert(eid, (mid, i));
                if ctx.core_module != Some(mid) {
                    ctx.register_name(RefKind::Entity, &name, mid, eid.0)?;
                }
            }
        }
        Ok(())
    }

    // ===== pass 2: entities =====

    fn link_entities(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        let all: Vec<EntityId> = self.decl_of.keys().copied().collect();
        for eid in all {
            self.link_entity(ctx, eid)?;
        }
        Ok(())
    }

    fn link_entity(&mut self, ctx: &mut CompilationContext, eid: EntityId) -> Result<()> {
        if self.linked.contains(&eid) {
            return Ok(());
        }
        if self.visiting.contains(&eid) {
            return Err(Error::InheritanceCycle {
                name: ctx.entity(eid).name.clone(),
            });
        }
        self.visiting.push(eid);

        let (mid, di) = self.decl_of[&eid];
        let decl = ctx.module(mid).ast.entities[di].clone();

        // Base first; its fields lead the child's layout.
        let base = match &decl.base {
            Some(base_name) => {
                let bid = resolve_entity(ctx, mid, base_name)?;
                self.link_entity(ctx, bid)?;
                Some(bid)
            }
            None => None,
        };

        let features: Vec<Feature> = decl
            .features
            .iter()
            .map(|call| Feature::from_call(call, &decl.name))
            .collect::<Result<_>>()?;

        let mut entity = ctx.entity(eid).clone();
        entity.base = base;
        entity.comment = decl.comment.clone();
        entity.features = features.clone();

        // Names copied from the base; a local redeclaration overrides the
        // inherited copy in place instead of colliding with it.
        let mut inherited: BTreeSet<String> = BTreeSet::new();
        if let Some(bid) = base {
            let parent = ctx.entity(bid).clone();
            for field in parent.fields {
                inherited.insert(field.name.clone());
                entity.add_field(field)?;
            }
            entity.key = parent.key;
        }

        for feature in &features {
            feature.before_fields(&mut entity)?;
        }

        for fd in &decl.fields {
            let ty = resolve_type_ref(ctx, mid, &fd.type_ref, &mut Vec::new())?;
            let mut field = Field::new(&fd.name, ty, FieldOrigin::Declared);
            field.flags = fd.flags.clone();
            field.default = fd.default.clone();
            field.comment = fd.comment.clone();
            field.validators0 = fd.validators0.clone();
            field.modifiers0 = fd.modifiers0.clone();
            field.validators1 = fd.validators1.clone();
            field.modifiers1 = fd.modifiers1.clone();
            field.composer = fd.composer.clone();
            if inherited.remove(&fd.name) {
                entity.replace_field(field)?;
            } else {
                entity.add_field(field)?;
            }
        }

        for feature in &features {
            feature.after_fields(&mut entity)?;
        }

        // An explicit key wins unless autoId already claimed the id column.
        if !decl.key.is_empty() {
            if features.contains(&Feature::AutoId) {
                warn!(
                    entity = %entity.name,
                    declared = ?decl.key,
                    "declared key ignored, autoId owns the primary key"
                );
            } else {
                entity.key = decl.key.clone();
            }
        }

        for index in &decl.indexes {
            entity.add_index(index.fields.clone(), index.unique)?;
        }
        entity.interfaces = decl.interfaces.clone();
        entity.check_field_refs()?;

        *ctx.entity_mut(eid) = entity;
        self.visiting.pop();
        self.linked.insert(eid);
        Ok(())
    }

    // ===== pass 3: relations =====

    fn link_relations(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        let decls: Vec<(EntityId, ModuleId, usize)> = self
            .decl_of
            .iter()
            .map(|(eid, (mid, di))| (*eid, *mid, *di))
            .collect();

        for (eid, mid, di) in decls {
            let relations = ctx.module(mid).ast.entities[di].relations.clone();
            for rd in relations {
                let kind = match rd.op {
                    RelOp::BelongsTo => RelKind::ManyToOne,
                    RelOp::BindsTo => RelKind::OneToOne,
                    RelOp::ManyToMany => RelKind::ManyToMany,
                };
                let multi = rd.targets.len() > 1;
                for target in &rd.targets {
                    let right = resolve_entity(ctx, mid, target)?;
                    let field = if multi {
                        format!("{}{}", rd.field, naming::pascal(target))
                    } else {
                        rd.field.clone()
                    };
                    let mut rel = Relation::new(eid, field, right, kind);
                    rel.optional = rd.optional || multi;
                    rel.comment = rd.comment.clone();
                    ctx.relations.push(rel);
                }
            }
        }
        Ok(())
    }

    // ===== pass 4: documents, views, schemas =====

    fn link_documents(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        for m in 0..ctx.modules.len() {
            let mid = ModuleId(m);
            let decls = ctx.module(mid).ast.documents.clone();
            for (i, decl) in decls.iter().enumerate() {
                let entity = resolve_entity(ctx, mid, &decl.entity)?;
                let contains = link_contains(ctx, mid, &decl.contains)?;
                let id = DocumentId(ctx.documents.len());
                ctx.documents.push(Document {
                    id,
                    module: mid,
                    name: decl.name.clone(),
                    entity,
                    contains,
                });
                self.doc_ids.insert((mid, i), id);
                if ctx.core_module != Some(mid) {
                    ctx.register_name(RefKind::Document, &decl.name, mid, id.0)?;
                }
            }
        }
        Ok(())
    }

    fn link_views(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        for m in 0..ctx.modules.len() {
            let mid = ModuleId(m);
            let decls = ctx.module(mid).ast.views.clone();
            for (i, decl) in decls.iter().enumerate() {
                let entity = resolve_entity(ctx, mid, &decl.entity)?;
                let document = match &decl.document {
                    Some(name) => Some(self.resolve_document(ctx, mid, name)?),
                    None => None,
                };

                check_view_fields(ctx, entity, decl)?;

                let id = ViewId(ctx.views.len());
                ctx.views.push(View {
                    id,
                    module: mid,
                    name: decl.name.clone(),
                    entity,
                    document,
                    filter: decl.filter.clone(),
                    group: decl.group.clone(),
                    order: decl.order.clone(),
                    limit: decl.limit.clone(),
                });
                self.view_ids.insert((mid, i), id);
                if ctx.core_module != Some(mid) {
                    ctx.register_name(RefKind::View, &decl.name, mid, id.0)?;
                }
            }
        }
        Ok(())
    }

    fn link_schemas(&mut self, ctx: &mut CompilationContext) -> Result<()> {
        for m in 0..ctx.modules.len() {
            let mid = ModuleId(m);
            let decls = ctx.module(mid).ast.schemas.clone();
            for decl in decls {
                let mut schema = Schema::new(&decl.name, mid);
                for name in &decl.entities {
                    schema.roots.push(resolve_entity(ctx, mid, name)?);
                }
                for name in &decl.views {
                    schema.views.push(self.resolve_view(ctx, mid, name)?);
                }
                ctx.schemas.push(schema);
            }
        }
        Ok(())
    }

    fn resolve_document(
        &self,
        ctx: &CompilationContext,
        from: ModuleId,
        name: &str,
    ) -> Result<DocumentId> {
        let scan = |mid: ModuleId| {
            ctx.module(mid)
                .ast
                .documents
                .iter()
                .position(|d| d.name == name)
                .and_then(|i| self.doc_ids.get(&(mid, i)).copied())
        };
        resolve_scanning(ctx, from, scan).ok_or_else(|| Error::ReferenceNotFound {
            kind: RefKind::Document,
            name: name.to_string(),
            module: ctx.module(from).label(),
        })
    }

    fn resolve_view(
        &self,
        ctx: &CompilationContext,
        from: ModuleId,
        name: &str,
    ) -> Result<ViewId> {
        let scan = |mid: ModuleId| {
            ctx.module(mid)
                .ast
                .views
                .iter()
                .position(|v| v.name == name)
                .and_then(|i| self.view_ids.get(&(mid, i)).copied())
        };
        resolve_scanning(ctx, from, scan).ok_or_else(|| Error::ReferenceNotFound {
            kind: RefKind::View,
            name: name.to_string(),
            module: ctx.module(from).label(),
        })
    }
}

/// Local module first, then the namespace last-to-first
fn resolve_scanning<T>(
    ctx: &CompilationContext,
    from: ModuleId,
    scan: impl Fn(ModuleId) -> Option<T>,
) -> Option<T> {
    if let Some(found) = scan(from) {
        return Some(found);
    }
    for mid in ctx.module(from).namespace.iter().rev() {
        if let Some(found) = scan(*mid) {
            return Some(found);
        }
    }
    None
}

/// Resolve an entity name from a module, with memoization
pub fn resolve_entity(
    ctx: &mut CompilationContext,
    from: ModuleId,
    name: &str,
) -> Result<EntityId> {
    if let Some(i) = ctx.memo_get(RefKind::Entity, name, from) {
        return Ok(EntityId(i));
    }
    let scan = |mid: ModuleId| {
        ctx.module(mid)
            .entities
            .iter()
            .copied()
            .find(|eid| ctx.entity(*eid).name == name)
    };
    match resolve_scanning(ctx, from, scan) {
        Some(eid) => {
            ctx.memo_put(RefKind::Entity, name, from, eid.0);
            Ok(eid)
        }
        None => Err(Error::ReferenceNotFound {
            kind: RefKind::Entity,
            name: name.to_string(),
            module: ctx.module(from).label(),
        }),
    }
}

/// Resolve a type reference down to a builtin primitive.
///
/// The attribute merge walks from the reference outward: the nearest
/// declaration wins, so `price : money(decimalDigits: 4)` overrides the
/// alias's own `decimalDigits`.
pub fn resolve_type_ref(
    ctx: &mut CompilationContext,
    from: ModuleId,
    tref: &TypeRef,
    visiting: &mut Vec<String>,
) -> Result<ResolvedType> {
    if let Some(kind) = TypeKind::from_builtin(&tref.name) {
        let mut resolved = ResolvedType::primitive(kind);
        resolved.attrs = attr_map(&tref.attrs);
        return Ok(resolved);
    }

    if visiting.iter().any(|n| n == &tref.name) {
        return Err(Error::TypeCycle {
            name: tref.name.clone(),
        });
    }

    let inner = match ctx.memo_get(RefKind::Type, &tref.name, from) {
        Some(i) => ctx.types[i].resolved.clone(),
        None => {
            let scan = |mid: ModuleId| {
                ctx.module(mid)
                    .ast
                    .types
                    .iter()
                    .find(|t| t.name == tref.name)
                    .map(|t| (mid, t.base.clone()))
            };
            let (decl_module, base) =
                resolve_scanning(ctx, from, scan).ok_or_else(|| Error::ReferenceNotFound {
                    kind: RefKind::Type,
                    name: tref.name.clone(),
                    module: ctx.module(from).label(),
                })?;

            visiting.push(tref.name.clone());
            let mut resolved = resolve_type_ref(ctx, decl_module, &base, visiting)?;
            visiting.pop();
            resolved.chain.insert(0, tref.name.clone());

            let index = ctx.types.len();
            ctx.types.push(NamedType {
                name: tref.name.clone(),
                module: decl_module,
                resolved: resolved.clone(),
            });
            ctx.memo_put(RefKind::Type, &tref.name, from, index);
            resolved
        }
    };

    let mut out = ResolvedType {
        kind: inner.kind,
        attrs: attr_map(&tref.attrs),
        chain: inner.chain.clone(),
    };
    out.merge_attrs(&inner.attrs.into_iter().collect::<Vec<_>>());
    Ok(out)
}

fn attr_map(attrs: &[(String, AttrValue)]) -> BTreeMap<String, AttrValue> {
    attrs.iter().cloned().collect()
}

fn link_contains(
    ctx: &mut CompilationContext,
    from: ModuleId,
    decls: &[ast::ContainsDecl],
) -> Result<Vec<ContainsNode>> {
    let mut nodes = Vec::new();
    for decl in decls {
        let entity = resolve_entity(ctx, from, &decl.entity)?;
        let children = link_contains(ctx, from, &decl.contains)?;
        nodes.push(ContainsNode {
            field: decl.field.clone(),
            entity,
            children,
        });
    }
    Ok(nodes)
}

/// Every field a view mentions must exist on its root entity
fn check_view_fields(
    ctx: &CompilationContext,
    entity: EntityId,
    decl: &ast::ViewDecl,
) -> Result<()> {
    let owner = ctx.entity(entity);
    let check = |field: &str| -> Result<()> {
        if owner.field(field).is_none() {
            return Err(Error::UnknownField {
                field: field.to_string(),
                entity: owner.name.clone(),
                context: "view",
            });
        }
        Ok(())
    };
    if let Some(cond) = &decl.filter {
        for field in cond_fields(cond) {
            check(&field)?;
        }
    }
    for field in &decl.group {
        check(field)?;
    }
    for term in &decl.order {
        check(&term.field)?;
    }
    Ok(())
}

fn cond_fields(cond: &ast::Cond) -> Vec<String> {
    match cond {
        ast::Cond::Cmp { field, .. } => vec![field.clone()],
        ast::Cond::And(a, b) | ast::Cond::Or(a, b) => {
            let mut fields = cond_fields(a);
            fields.extend(cond_fields(b));
            fields
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::FieldFlag;
    use crate::parser::parse_module;
    use std::path::PathBuf;

    /// Build a context from sources; every module imports all earlier ones
    fn linked_ctx(sources: &[&str]) -> Result<CompilationContext> {
        let mut ctx = CompilationContext::new();
        let core = ctx.add_module(
            PathBuf::from("oolong:core"),
            parse_module(include_str!("dsl/core.ool")).unwrap(),
        );
        ctx.core_module = Some(core);
        let mut loaded = vec![core];
        for (i, src) in sources.iter().enumerate() {
            let id = ctx.add_module(PathBuf::from(format!("m{i}.ool")), parse_module(src).unwrap());
            ctx.module_mut(id).namespace = loaded.clone();
            loaded.push(id);
        }
        link(&mut ctx)?;
        Ok(ctx)
    }

    fn entity_named<'a>(ctx: &'a CompilationContext, name: &str) -> &'a Entity {
        ctx.entities.iter().find(|e| e.name == name).unwrap()
    }

    #[test]
    fn resolves_core_type_aliases() {
        let ctx = linked_ctx(&["entity user { has mail : email key mail }"]).unwrap();
        let field = entity_named(&ctx, "user").field("mail").unwrap();
        assert_eq!(field.ty.kind, TypeKind::Text);
        assert_eq!(field.ty.int_attr("maxLength"), Some(120));
        assert_eq!(field.ty.chain, vec!["email", "text"]);
    }

    #[test]
    fn nearest_attrs_override_alias_attrs() {
        let ctx = linked_ctx(&[
            "type money2 : decimal(totalDigits: 18, decimalDigits: 2)",
            "entity quote { has price : money2(decimalDigits: 4) key price }",
        ])
        .unwrap();
        let field = entity_named(&ctx, "quote").field("price").unwrap();
        assert_eq!(field.ty.int_attr("decimalDigits"), Some(4));
        assert_eq!(field.ty.int_attr("totalDigits"), Some(18));
    }

    #[test]
    fn later_imports_shadow_earlier_ones() {
        let ctx = linked_ctx(&[
            "type code : text(maxLength: 8)",
            "type code : text(maxLength: 16)",
            "entity item { has c : code key c }",
        ]);
        // Both modules declare `code`: the naming table flags the clash for
        // entities/views, but plain types are resolved by shadowing.
        let ctx = ctx.unwrap();
        let field = entity_named(&ctx, "item").field("c").unwrap();
        assert_eq!(field.ty.int_attr("maxLength"), Some(16));
    }

    #[test]
    fn type_alias_chain_tracks_back() {
        let ctx = linked_ctx(&[
            "type base : text(maxLength: 100)\ntype handle : base",
            "entity user { has h : handle key h }",
        ])
        .unwrap();
        let field = entity_named(&ctx, "user").field("h").unwrap();
        assert_eq!(field.ty.chain, vec!["handle", "base", "text"]);
        assert_eq!(field.ty.int_attr("maxLength"), Some(100));
    }

    #[test]
    fn type_cycle_is_detected() {
        let err = linked_ctx(&[
            "type a : b\ntype b : a",
            "entity e { has f : a key f }",
        ])
        .unwrap_err();
        assert!(matches!(err, Error::TypeCycle { .. }));
    }

    #[test]
    fn unresolved_entity_reference_fails() {
        let err = linked_ctx(&["entity order { has customer -> user key id has id : int }"])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::ReferenceNotFound {
                kind: RefKind::Entity,
                ..
            }
        ));
    }

    #[test]
    fn inheritance_copies_fields_and_key() {
        let ctx = linked_ctx(&[
            "entity party { with autoId has name : shortText }",
            "entity person extends party { has firstName : shortText }",
        ])
        .unwrap();
        let person = entity_named(&ctx, "person");
        assert_eq!(person.fields[0].name, "id");
        assert_eq!(person.fields[1].name, "name");
        assert_eq!(person.fields[2].name, "firstName");
        assert_eq!(person.key, vec!["id"]);
        assert!(person.base.is_some());
    }

    #[test]
    fn redeclared_field_overrides_the_inherited_copy() {
        let ctx = linked_ctx(&[
            "entity party { with autoId has displayName : shortText }",
            "entity person extends party { has displayName : text(maxLength: 200) optional }",
        ])
        .unwrap();
        let person = entity_named(&ctx, "person");
        let fields: Vec<&str> = person.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["id", "displayName"]);
        let display = person.field("displayName").unwrap();
        assert_eq!(display.ty.int_attr("maxLength"), Some(200));
        assert!(display.is_optional());
    }

    #[test]
    fn redeclaring_a_local_field_twice_is_still_a_duplicate() {
        let err = linked_ctx(&[
            "entity party { with autoId has displayName : shortText }",
            "entity person extends party {\n\
               has displayName : shortText\n\
               has displayName : shortText\n\
             }",
        ])
        .unwrap_err();
        assert!(matches!(err, Error::DuplicateDefinition { .. }));
    }

    #[test]
    fn declared_key_yields_to_auto_id() {
        let ctx = linked_ctx(&[
            "entity card { with autoId has number : shortText key number }",
        ])
        .unwrap();
        assert_eq!(entity_named(&ctx, "card").key, vec!["id"]);
    }

    #[test]
    fn inheritance_cycle_is_detected() {
        let err = linked_ctx(&[
            "entity a extends b { has x : int key x }\nentity b extends a { has y : int key y }",
        ])
        .unwrap_err();
        assert!(matches!(err, Error::InheritanceCycle { .. }));
    }

    #[test]
    fn duplicate_entity_name_across_modules_conflicts() {
        let err = linked_ctx(&[
            "entity user { has id : int key id }",
            "entity user { has id : int key id }",
        ])
        .unwrap_err();
        assert!(matches!(err, Error::NamingConflict { .. }));
    }

    #[test]
    fn relations_become_edges() {
        let ctx = linked_ctx(&[
            "entity user { with autoId }\n\
             entity order { with autoId has customer -> user has badge <-> user }",
        ])
        .unwrap();
        assert_eq!(ctx.relations.len(), 2);
        assert_eq!(ctx.relations[0].kind, RelKind::ManyToOne);
        assert_eq!(ctx.relations[0].field, "customer");
        assert_eq!(ctx.relations[1].kind, RelKind::OneToOne);
    }

    #[test]
    fn multi_target_relation_fans_out_optional_edges() {
        let ctx = linked_ctx(&[
            "entity user { with autoId }\nentity org { with autoId }\n\
             entity note { with autoId has owner -> [user org] }",
        ])
        .unwrap();
        let edges: Vec<&Relation> = ctx
            .relations
            .iter()
            .filter(|r| ctx.entity(r.left).name == "note")
            .collect();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0].field, "ownerUser");
        assert_eq!(edges[1].field, "ownerOrg");
        assert!(edges.iter().all(|r| r.optional));
    }

    #[test]
    fn views_and_documents_link() {
        let ctx = linked_ctx(&[
            "entity user { with autoId has name : shortText }\n\
             entity order { with autoId has status : text has customer -> user }\n\
             document orderDoc { entity order contains customer { entity user } }\n\
             view openOrders { entity order document orderDoc where status == \"open\" }\n\
             schema shop { entities [ order ] views [ openOrders ] }",
        ])
        .unwrap();
        assert_eq!(ctx.views.len(), 1);
        assert_eq!(ctx.documents.len(), 1);
        let view = &ctx.views[0];
        assert_eq!(view.document, Some(DocumentId(0)));
        assert_eq!(ctx.schemas.len(), 1);
        assert_eq!(ctx.schemas[0].roots.len(), 1);
        assert_eq!(ctx.schemas[0].views.len(), 1);
    }

    #[test]
    fn view_with_unknown_field_fails() {
        let err = linked_ctx(&[
            "entity order { with autoId has status : text }\n\
             view bad { entity order where missing == 1 }",
        ])
        .unwrap_err();
        assert!(matches!(err, Error::UnknownField { .. }));
    }

    #[test]
    fn explicit_key_wins_without_auto_id() {
        let ctx = linked_ctx(&[
            "entity tag { has label : shortText has weight : int key label }",
        ])
        .unwrap();
        assert_eq!(entity_named(&ctx, "tag").key, vec!["label"]);
    }

    #[test]
    fn declared_field_flags_survive_linking() {
        let ctx = linked_ctx(&[
            "entity user { with autoId has email : email optional |~isEmail |>toLower }",
        ])
        .unwrap();
        let field = entity_named(&ctx, "user").field("email").unwrap();
        assert!(field.has_flag(FieldFlag::Optional));
        assert_eq!(field.validators0[0].name, "isEmail");
        assert_eq!(field.modifiers0[0].name, "toLower");
    }
}
