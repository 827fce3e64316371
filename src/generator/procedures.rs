//! View → stored procedure generation
//!
//! Every view compiles to one read-only stored procedure. The FROM clause
//! comes from the view's document hierarchy: each `contains` level joins
//! through the relation its field names, depth-first, with table aliases
//! handed out in visiting order (A, B, ..., Z, AA, AB, ...).
//!
//! `$param` arguments in the filter or limit become IN parameters of the
//! procedure, prefixed `p_`.

use crate::ast::{Arg, Cond, Literal};
use crate::context::CompilationContext;
use crate::error::{Error, Result};
use crate::generator::ddl::fk_column_of;
use crate::generator::types::column_type;
use crate::model::schema::Schema;
use crate::model::view::{ContainsNode, View};
use crate::naming;

/// Procedure script for every view of a schema
pub fn procedures_sql(ctx: &CompilationContext, schema: &Schema) -> Result<String> {
    let mut out = String::new();
    out.push_str(&format!("-- View procedures for schema '{}'\n", schema.name));
    for vid in &schema.views {
        out.push('\n');
        out.push_str(&view_procedure(ctx, ctx.view(*vid))?);
    }
    Ok(out)
}

/// Excel-style alias for the n-th joined table
fn alias(mut n: usize) -> String {
    let mut out = String::new();
    loop {
        out.insert(0, (b'A' + (n % 26) as u8) as char);
        n /= 26;
        if n == 0 {
            break;
        }
        n -= 1;
    }
    out
}

struct JoinPlan {
    /// (alias, table, ON clause); the root has no ON clause
    tables: Vec<(String, String, Option<String>)>,
}

fn view_procedure(ctx: &CompilationContext, view: &View) -> Result<String> {
    let name = format!("view_{}", naming::sql_name(&view.name));
    let joins = join_plan(ctx, view)?;
    let mut params: Vec<(String, String)> = Vec::new();

    let where_clause = match &view.filter {
        Some(cond) => Some(cond_sql(ctx, view, cond, &mut params)?),
        None => None,
    };
    let limit = match &view.limit {
        Some(Arg::Param(p)) => {
            collect_param(ctx, view, p, &mut params, true)?;
            Some(format!("p_{}", naming::sql_name(p)))
        }
        Some(Arg::Literal(Literal::Integer(n))) => Some(n.to_string()),
        Some(other) => {
            return Err(Error::Usage(format!(
                "view '{}': limit must be an integer or a $param, got {}",
                view.name,
                other.to_dsl_string()
            )))
        }
        None => None,
    };

    let mut out = String::new();
    out.push_str(&format!("DROP PROCEDURE IF EXISTS `{name}`;\n"));
    let param_list: Vec<String> = params
        .iter()
        .map(|(p, ty)| format!("IN p_{p} {ty}"))
        .collect();
    out.push_str(&format!(
        "CREATE PROCEDURE `{name}`({})\nBEGIN\n",
        param_list.join(", ")
    ));

    let select: Vec<String> = joins
        .tables
        .iter()
        .map(|(a, _, _)| format!("{a}.*"))
        .collect();
    out.push_str(&format!("  SELECT {}\n", select.join(", ")));
    for (i, (a, table, on)) in joins.tables.iter().enumerate() {
        if i == 0 {
            out.push_str(&format!("  FROM `{table}` {a}\n"));
        } else {
            let on = on.as_deref().unwrap_or("1 = 1");
            out.push_str(&format!("  LEFT JOIN `{table}` {a} ON {on}\n"));
        }
    }
    if let Some(w) = where_clause {
        out.push_str(&format!("  WHERE {w}\n"));
    }
    if !view.group.is_empty() {
        let cols: Vec<String> = view
            .group
            .iter()
            .map(|f| format!("A.`{}`", naming::sql_name(f)))
            .collect();
        out.push_str(&format!("  GROUP BY {}\n", cols.join(", ")));
    }
    if !view.order.is_empty() {
        let terms: Vec<String> = view
            .order
            .iter()
            .map(|t| {
                format!(
                    "A.`{}` {}",
                    naming::sql_name(&t.field),
                    if t.ascending { "ASC" } else { "DESC" }
                )
            })
            .collect();
        out.push_str(&format!("  ORDER BY {}\n", terms.join(", ")));
    }
    if let Some(l) = limit {
        out.push_str(&format!("  LIMIT {l}\n"));
    }
    out.push_str("  ;\nEND;\n");
    Ok(out)
}

/// Flatten the document tree into aliased joins
fn join_plan(ctx: &CompilationContext, view: &View) -> Result<JoinPlan> {
    let root = ctx.entity(view.entity);
    let mut tables = vec![(alias(0), root.table_name(), None)];

    if let Some(doc_id) = view.document {
        let doc = ctx.document(doc_id).clone();
        let mut counter = 1usize;
        walk_joins(ctx, view, view.entity, "A", &doc.contains, &mut counter, &mut tables)?;
    }
    Ok(JoinPlan { tables })
}

fn walk_joins(
    ctx: &CompilationContext,
    view: &View,
    parent: crate::context::EntityId,
    parent_alias: &str,
    nodes: &[ContainsNode],
    counter: &mut usize,
    tables: &mut Vec<(String, String, Option<String>)>,
) -> Result<()> {
    for node in nodes {
        let child = ctx.entity(node.entity);
        let a = alias(*counter);
        *counter += 1;

        // Parent-owned FK first; otherwise the child points back at the
        // parent (junction entities always do).
        let on = if let Some(rel) = ctx
            .relations
            .iter()
            .find(|r| r.left == parent && r.field == node.field && r.right == node.entity)
        {
            let parent_entity = ctx.entity(parent);
            let col = fk_column_of(parent_entity, rel);
            let child_key = single_key(ctx, node.entity, view)?;
            format!("{a}.`{child_key}` = {parent_alias}.`{col}`")
        } else if let Some(rel) = ctx
            .relations
            .iter()
            .find(|r| r.left == node.entity && r.right == parent && r.field == node.field)
            .or_else(|| {
                ctx.relations
                    .iter()
                    .find(|r| r.left == node.entity && r.right == parent)
            })
        {
            let col = fk_column_of(child, rel);
            let parent_key = single_key(ctx, parent, view)?;
            format!("{a}.`{col}` = {parent_alias}.`{parent_key}`")
        } else {
            return Err(Error::UnknownField {
                field: node.field.clone(),
                entity: ctx.entity(parent).name.clone(),
                context: "document join",
            });
        };

        tables.push((a.clone(), child.table_name(), Some(on)));
        walk_joins(ctx, view, node.entity, &a, &node.children, counter, tables)?;
    }
    Ok(())
}

/// Snake-cased single key column of an entity
fn single_key(ctx: &CompilationContext, eid: crate::context::EntityId, view: &View) -> Result<String> {
    let entity = ctx.entity(eid);
    match entity.key.as_slice() {
        [one] => Ok(naming::sql_name(one)),
        _ => Err(Error::Usage(format!(
            "view '{}': document joins need single-column keys, '{}' has {}",
            view.name,
            entity.name,
            entity.key.len()
        ))),
    }
}

/// Filter condition over the root alias, collecting `$param` binds
fn cond_sql(
    ctx: &CompilationContext,
    view: &View,
    cond: &Cond,
    params: &mut Vec<(String, String)>,
) -> Result<String> {
    match cond {
        Cond::Cmp { field, op, value } => {
            let rhs = match value {
                Arg::Literal(Literal::String(s)) => format!("'{}'", s.replace('\'', "''")),
                Arg::Literal(lit) => lit.to_dsl_string(),
                Arg::Param(p) => {
                    collect_param(ctx, view, p, params, false)?;
                    format!("p_{}", naming::sql_name(p))
                }
                Arg::FieldRef(other) => format!("A.`{}`", naming::sql_name(other)),
            };
            Ok(format!("A.`{}` {} {rhs}", naming::sql_name(field), op.sql()))
        }
        Cond::And(a, b) => Ok(format!(
            "({}) AND ({})",
            cond_sql(ctx, view, a, params)?,
            cond_sql(ctx, view, b, params)?
        )),
        Cond::Or(a, b) => Ok(format!(
            "({}) OR ({})",
            cond_sql(ctx, view, a, params)?,
            cond_sql(ctx, view, b, params)?
        )),
    }
}

fn collect_param(
    ctx: &CompilationContext,
    view: &View,
    name: &str,
    params: &mut Vec<(String, String)>,
    integer: bool,
) -> Result<()> {
    let snake = naming::sql_name(name);
    if params.iter().any(|(p, _)| *p == snake) {
        return Ok(());
    }
    // Type the parameter after the filtered column when one matches,
    // otherwise fall back to a plain INT (limits).
    let ty = if integer {
        "INT".to_string()
    } else {
        ctx.entity(view.entity)
            .field(name)
            .map(|f| column_type(&f.ty))
            .unwrap_or_else(|| "VARCHAR(255)".to_string())
    };
    params.push((snake, ty));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion;
    use crate::linker;
    use crate::parser::parse_module;
    use std::path::PathBuf;

    fn sql_for(source: &str) -> String {
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
        procedures_sql(&ctx, &schema).unwrap()
    }

    const SHOP: &str = r#"
        entity vendor { with autoId has name : shortText }
        entity product {
          with autoId
          has name : shortText
          has status : text(maxLength: 20)
          has stock : int(digits: 8)
          has vendor -> vendor
        }
        document productDoc {
          entity product
          contains vendor { entity vendor }
        }
        view productList {
          entity product
          document productDoc
          where status == "active" and stock > 0
          order [ name asc ]
          limit $count
        }
        schema shop { entities [ product ] views [ productList ] }
    "#;

    #[test]
    fn aliases_run_alphabetically() {
        assert_eq!(alias(0), "A");
        assert_eq!(alias(25), "Z");
        assert_eq!(alias(26), "AA");
        assert_eq!(alias(27), "AB");
        assert_eq!(alias(52), "BA");
    }

    #[test]
    fn procedure_joins_through_the_document() {
        let sql = sql_for(SHOP);
        assert!(sql.contains("CREATE PROCEDURE `view_product_list`"));
        assert!(sql.contains("FROM `product` A"));
        assert!(sql.contains("LEFT JOIN `vendor` B ON B.`id` = A.`vendor_id`"));
    }

    #[test]
    fn operators_translate_to_sql() {
        let sql = sql_for(SHOP);
        assert!(sql.contains("WHERE (A.`status` = 'active') AND (A.`stock` > 0)"));
    }

    #[test]
    fn limit_param_becomes_procedure_parameter() {
        let sql = sql_for(SHOP);
        assert!(sql.contains("(IN p_count INT)"));
        assert!(sql.contains("LIMIT p_count"));
    }

    #[test]
    fn order_renders_direction() {
        let sql = sql_for(SHOP);
        assert!(sql.contains("ORDER BY A.`name` ASC"));
    }

    #[test]
    fn filter_param_typed_after_the_column() {
        let sql = sql_for(
            "entity user { with autoId has status : text(maxLength: 20) }\n\
             view byStatus { entity user where status == $status }\n\
             schema s { entities [ user ] views [ byStatus ] }",
        );
        assert!(sql.contains("(IN p_status VARCHAR(20))"));
        assert!(sql.contains("WHERE A.`status` = p_status"));
    }

    #[test]
    fn junction_document_joins_via_reverse_edge() {
        let sql = sql_for(
            "entity product { with autoId has tags <=> tag }\n\
             entity tag { with autoId has label : shortText }\n\
             document productTagsDoc {\n\
               entity product\n\
               contains links { entity productTags contains tag { entity tag } }\n\
             }\n\
             view tagged { entity product document productTagsDoc }\n\
             schema s { entities [ product ] views [ tagged ] }",
        );
        assert!(sql.contains("LEFT JOIN `product_tags` B ON B.`product` = A.`id`"));
        assert!(sql.contains("LEFT JOIN `tag` C ON C.`id` = B.`tag`"));
    }
}
