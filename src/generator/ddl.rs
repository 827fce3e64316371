//! Relational DDL generation
//!
//! Two scripts per schema: `entities.sql` with the CREATE TABLE statements
//! in closure order, and `relations.sql` with the foreign keys added
//! afterwards so table creation order never matters.
//!
//! FK columns are implicit: a relation field `vendor` materializes as
//! `vendor_id` unless the entity already carries a field of the relation's
//! name (junction entities do), in which case that field is the FK column.

use crate::ast::FieldFlag;
use crate::context::{CompilationContext, EntityId};
use crate::error::{Error, Result};
use crate::features::Feature;
use crate::generator::types::{column_type, default_clause};
use crate::model::entity::Entity;
use crate::model::field::Field;
use crate::model::relation::{RelKind, Relation};
use crate::model::schema::Schema;
use crate::model::types::TypeKind;
use crate::naming;

/// CREATE TABLE script for one expanded schema
pub fn entities_sql(ctx: &CompilationContext, schema: &Schema) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("-- Tables for schema '{}'\n\n", schema.name));

    for eid in &schema.entities {
        let entity = ctx.entity(*eid);
        out.push_str(&create_table(ctx, schema, entity)?);
        out.push('\n');
    }
    Ok(out)
}

/// ALTER TABLE script adding every foreign key of the schema
pub fn relations_sql(ctx: &CompilationContext, schema: &Schema) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("-- Foreign keys for schema '{}'\n\n", schema.name));

    for eid in &schema.entities {
        for rel in relations_of(ctx, schema, *eid) {
            out.push_str(&foreign_key(ctx, &rel)?);
            out.push('\n');
        }
    }
    Ok(out)
}

fn relations_of(ctx: &CompilationContext, schema: &Schema, left: EntityId) -> Vec<Relation> {
    ctx.relations
        .iter()
        .filter(|r| r.left == left && schema.contains(r.right))
        .cloned()
        .collect()
}

fn create_table(ctx: &CompilationContext, schema: &Schema, entity: &Entity) -> Result<String> {
    let table = entity.table_name();
    let mut lines: Vec<String> = Vec::new();

    for field in &entity.fields {
        lines.push(column_line(entity, field));
    }

    // Implicit FK columns, in relation declaration order.
    let rels = relations_of(ctx, schema, entity.id);
    for rel in &rels {
        if entity.field(&rel.field).is_none() {
            lines.push(fk_column_line(ctx, rel)?);
        }
    }

    if !entity.key.is_empty() {
        let cols: Vec<String> = entity
            .key
            .iter()
            .map(|f| format!("`{}`", naming::sql_name(f)))
            .collect();
        lines.push(format!("PRIMARY KEY ({})", cols.join(", ")));
    }

    for index in &entity.indexes {
        let cols: Vec<String> = index
            .fields
            .iter()
            .map(|f| format!("`{}`", naming::sql_name(f)))
            .collect();
        let tag = if index.unique { "UNIQUE KEY `ux" } else { "KEY `ix" };
        let suffix: Vec<String> = index.fields.iter().map(|f| naming::sql_name(f)).collect();
        lines.push(format!(
            "{tag}_{table}_{}` ({})",
            suffix.join("_"),
            cols.join(", ")
        ));
    }

    // Index every FK column; one-to-one edges get a uniqueness guarantee.
    for rel in &rels {
        let col = fk_column_of(entity, rel);
        if entity.key.first().map(|k| naming::sql_name(k)) == Some(col.clone()) {
            continue;
        }
        let tag = if rel.kind == RelKind::OneToOne {
            "UNIQUE KEY `ux"
        } else {
            "KEY `ix"
        };
        lines.push(format!("{tag}_{table}_{col}` (`{col}`)"));
    }

    let mut out = String::new();
    if let Some(comment) = &entity.comment {
        out.push_str(&format!("-- {comment}\n"));
    }
    out.push_str(&format!("CREATE TABLE `{table}` (\n"));
    out.push_str(
        &lines
            .iter()
            .map(|l| format!("  {l}"))
            .collect::<Vec<_>>()
            .join(",\n"),
    );
    out.push_str("\n) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4;\n");
    Ok(out)
}

fn column_line(entity: &Entity, field: &Field) -> String {
    let mut line = format!("`{}` {}", field.sql_name(), column_type(&field.ty));

    if field.is_optional() {
        line.push_str(" NULL");
    } else {
        line.push_str(" NOT NULL");
    }
    if field.has_flag(FieldFlag::Auto) {
        line.push_str(" AUTO_INCREMENT");
    }

    if let Some(clause) = timestamp_clause(entity, field) {
        line.push_str(clause);
    } else if let Some(default) = &field.default {
        line.push_str(&format!(" DEFAULT {}", default_clause(default)));
    }

    if let Some(comment) = &field.comment {
        line.push_str(&format!(" COMMENT '{}'", comment.replace('\'', "''")));
    }
    line
}

/// Database-maintained timestamp defaults injected by features
fn timestamp_clause(entity: &Entity, field: &Field) -> Option<&'static str> {
    if field.ty.kind != TypeKind::DateTime || !field.has_flag(FieldFlag::DbDefault) {
        return None;
    }
    if field.name == "createdAt" && entity.features.contains(&Feature::CreateTimestamp) {
        return Some(" DEFAULT CURRENT_TIMESTAMP");
    }
    if field.name == "updatedAt" && entity.features.contains(&Feature::UpdateTimestamp) {
        return Some(" DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP");
    }
    None
}

/// The FK column an edge uses on its left entity
pub fn fk_column_of(left: &Entity, rel: &Relation) -> String {
    if left.field(&rel.field).is_some() {
        naming::sql_name(&rel.field)
    } else {
        naming::fk_column(&rel.field)
    }
}

/// Key column a foreign key references; the target must have a one-column key
fn referenced_key<'a>(ctx: &'a CompilationContext, rel: &Relation) -> Result<&'a Field> {
    let target = ctx.entity(rel.right);
    if target.key.len() != 1 {
        return Err(Error::Usage(format!(
            "relation '{}' points at '{}' which has a {}-column key; only single-column keys can be referenced",
            rel.field,
            target.name,
            target.key.len()
        )));
    }
    target.field(&target.key[0]).ok_or_else(|| Error::UnknownField {
        field: target.key[0].clone(),
        entity: target.name.clone(),
        context: "foreign key",
    })
}

fn fk_column_line(ctx: &CompilationContext, rel: &Relation) -> Result<String> {
    let key = referenced_key(ctx, rel)?;
    let nullable = if rel.optional { " NULL" } else { " NOT NULL" };
    let mut line = format!(
        "`{}` {}{nullable}",
        naming::fk_column(&rel.field),
        column_type(&key.ty)
    );
    if let Some(comment) = &rel.comment {
        line.push_str(&format!(" COMMENT '{}'", comment.replace('\'', "''")));
    }
    Ok(line)
}

fn foreign_key(ctx: &CompilationContext, rel: &Relation) -> Result<String> {
    let left = ctx.entity(rel.left);
    let right = ctx.entity(rel.right);
    let key = referenced_key(ctx, rel)?;
    let col = fk_column_of(left, rel);

    // Junction rows die with either endpoint; ordinary references hold.
    let action = if rel.via_junction { "CASCADE" } else { "NO ACTION" };

    Ok(format!(
        "ALTER TABLE `{}`\n  ADD CONSTRAINT `fk_{}_{}` FOREIGN KEY (`{col}`) REFERENCES `{}` (`{}`)\n  ON DELETE {action} ON UPDATE {action};\n",
        left.table_name(),
        left.table_name(),
        naming::sql_name(&rel.field),
        right.table_name(),
        key.sql_name()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion;
    use crate::linker;
    use crate::parser::parse_module;
    use std::path::PathBuf;

    fn sql_for(source: &str) -> (String, String) {
        let mut ctx = CompilationContext::new();
        let core = ctx.add_module(
            PathBuf::from("oolong:core"),
            parse_module(include_str!("../dsl/core.ool")).unwrap(),
        );
        ctx.core_module = Some(core);
        let id = ctx.add_module(PathBuf::from("m.ool"), parse_module(source).unwrap());
        ctx.module_mut(id).namespace = vec![core];
        linker::link(&mut ctx).unwrap();
        expansion::expand(&mut ctx).unwrap();
        let schema = ctx.schemas[0].clone();
        (
            entities_sql(&ctx, &schema).unwrap(),
            relations_sql(&ctx, &schema).unwrap(),
        )
    }

    const SHOP: &str = r#"
        entity vendor { with autoId has name : shortText }
        entity product {
          with autoId
          with createTimestamp
          has name : text(maxLength: 60) -- "Product name"
          has blurb : text(maxLength: 2000)
          has stock : int(digits: 11) default(0)
          has vendor -> vendor
          has tags <=> tag
          index [name] is unique
        }
        entity tag { with autoId has label : shortText }
        schema shop { entities [ product ] }
    "#;

    #[test]
    fn size_buckets_flow_into_columns() {
        let (tables, _) = sql_for(SHOP);
        assert!(tables.contains("`stock` BIGINT(11) NOT NULL DEFAULT 0"));
        assert!(tables.contains("`name` VARCHAR(60) NOT NULL COMMENT 'Product name'"));
        assert!(tables.contains("`blurb` TEXT NOT NULL"));
    }

    #[test]
    fn auto_id_renders_auto_increment_primary_key() {
        let (tables, _) = sql_for(SHOP);
        assert!(tables.contains("`id` BIGINT(11) NOT NULL AUTO_INCREMENT"));
        assert!(tables.contains("PRIMARY KEY (`id`)"));
    }

    #[test]
    fn create_timestamp_uses_db_default() {
        let (tables, _) = sql_for(SHOP);
        assert!(tables.contains("`created_at` DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP"));
    }

    #[test]
    fn declared_relation_becomes_fk_column_and_constraint() {
        let (tables, fks) = sql_for(SHOP);
        assert!(tables.contains("`vendor_id` BIGINT(11) NOT NULL"));
        assert!(tables.contains("KEY `ix_product_vendor_id` (`vendor_id`)"));
        assert!(fks.contains(
            "ADD CONSTRAINT `fk_product_vendor` FOREIGN KEY (`vendor_id`) REFERENCES `vendor` (`id`)"
        ));
        assert!(fks.contains("ON DELETE NO ACTION ON UPDATE NO ACTION"));
    }

    #[test]
    fn junction_fks_cascade() {
        let (tables, fks) = sql_for(SHOP);
        assert!(tables.contains("CREATE TABLE `product_tags`"));
        assert!(tables.contains("PRIMARY KEY (`product`, `tag`)"));
        let cascades = fks.matches("ON DELETE CASCADE ON UPDATE CASCADE").count();
        assert_eq!(cascades, 2);
    }

    #[test]
    fn unique_index_renders_unique_key() {
        let (tables, _) = sql_for(SHOP);
        assert!(tables.contains("UNIQUE KEY `ux_product_name` (`name`)"));
    }

    #[test]
    fn one_to_one_fk_is_unique() {
        let (tables, _) = sql_for(
            "entity profile { with autoId }\n\
             entity user { with autoId has profile <-> profile }\n\
             schema s { entities [ user ] }",
        );
        assert!(tables.contains("UNIQUE KEY `ux_user_profile_id` (`profile_id`)"));
    }

    #[test]
    fn optional_relation_column_is_nullable() {
        let (tables, _) = sql_for(
            "entity org { with autoId }\n\
             entity user { with autoId has org -> org optional }\n\
             schema s { entities [ user ] }",
        );
        assert!(tables.contains("`org_id` BIGINT(11) NULL"));
    }
}
