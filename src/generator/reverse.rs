//! Reverse engineering: information_schema → DSL source
//!
//! Connects through a [`Connector`] (anything that can run a text query and
//! hand back rows), reads table, column, key and index metadata, and emits
//! DSL entity declarations that would regenerate an equivalent schema.
//!
//! The mapping is heuristic on the way back in:
//! - `tinyint(1)` becomes `bool`
//! - an auto-increment integer primary key named `id` becomes `with autoId`
//! - snake_case identifiers come back as camelCase

use std::collections::BTreeMap;

use convert_case::{Case, Casing};
use serde_json::Value;
use tracing::info;

use crate::error::{Error, Result};

/// One result row, column name → value
pub type Row = BTreeMap<String, Value>;

/// Minimal query surface the introspector needs
pub trait Connector {
    fn query(&mut self, sql: &str, params: &[&str]) -> Result<Vec<Row>>;
}

#[derive(Debug, Clone)]
struct ColumnInfo {
    name: String,
    data_type: String,
    column_type: String,
    nullable: bool,
    auto_increment: bool,
    char_length: Option<i64>,
    numeric_precision: Option<i64>,
    numeric_scale: Option<i64>,
    default: Option<String>,
    comment: String,
}

#[derive(Debug, Clone)]
struct ForeignKeyInfo {
    column: String,
    referenced_table: String,
}

#[derive(Debug, Clone)]
struct IndexInfo {
    columns: Vec<String>,
    unique: bool,
}

/// Introspect every table of `database` and render DSL source for it
pub fn reverse_schema(conn: &mut dyn Connector, database: &str) -> Result<String> {
    let tables = table_names(conn, database)?;
    info!(database, tables = tables.len(), "reverse engineering schema");

    let mut out = String::new();
    out.push_str(&format!("# reverse engineered from database '{database}'\n"));
    for table in &tables {
        out.push('\n');
        out.push_str(&render_entity(conn, database, table)?);
    }
    Ok(out)
}

fn table_names(conn: &mut dyn Connector, database: &str) -> Result<Vec<String>> {
    let rows = conn.query(
        "SELECT table_name FROM information_schema.tables \
         WHERE table_schema = ? AND table_type = 'BASE TABLE' ORDER BY table_name",
        &[database],
    )?;
    rows.iter()
        .map(|r| row_str(r, "table_name"))
        .collect()
}

fn render_entity(conn: &mut dyn Connector, database: &str, table: &str) -> Result<String> {
    let columns = column_info(conn, database, table)?;
    let keys = primary_key(conn, database, table)?;
    let fks = foreign_keys(conn, database, table)?;
    let indexes = secondary_indexes(conn, database, table, &keys)?;

    let entity_name = table.to_case(Case::Camel);
    let mut out = format!("entity {entity_name} {{\n");

    // A lone auto-increment integer `id` key collapses to the feature that
    // would have produced it.
    let auto_id = keys == ["id"]
        && columns
            .iter()
            .any(|c| c.name == "id" && c.auto_increment && is_integer(&c.data_type));
    if auto_id {
        out.push_str("  with autoId\n");
    }

    for col in &columns {
        if auto_id && col.name == "id" {
            continue;
        }
        if let Some(fk) = fks.iter().find(|fk| fk.column == col.name) {
            let field = col
                .name
                .strip_suffix("_id")
                .unwrap_or(&col.name)
                .to_case(Case::Camel);
            let target = fk.referenced_table.to_case(Case::Camel);
            out.push_str(&format!("  has {field} -> {target}"));
            if col.nullable {
                out.push_str(" optional");
            }
            out.push('\n');
            continue;
        }
        out.push_str(&render_field(col));
    }

    if !auto_id && !keys.is_empty() {
        let fields: Vec<String> = keys.iter().map(|k| k.to_case(Case::Camel)).collect();
        if fields.len() == 1 {
            out.push_str(&format!("  key {}\n", fields[0]));
        } else {
            out.push_str(&format!("  key [ {} ]\n", fields.join(" ")));
        }
    }
    for idx in &indexes {
        let fields: Vec<String> = idx.columns.iter().map(|c| c.to_case(Case::Camel)).collect();
        out.push_str(&format!("  index [ {} ]", fields.join(" ")));
        if idx.unique {
            out.push_str(" is unique");
        }
        out.push('\n');
    }

    out.push_str("}\n");
    Ok(out)
}

fn render_field(col: &ColumnInfo) -> String {
    let field = col.name.to_case(Case::Camel);
    let ty = dsl_type(col);
    let mut line = format!("  has {field} : {ty}");
    if col.nullable {
        line.push_str(" optional");
    }
    if let Some(default) = &col.default {
        if default != "NULL" && !default.starts_with("CURRENT_TIMESTAMP") {
            let rendered = render_default(col, default);
            line.push_str(&format!(" default({rendered})"));
        }
    }
    if !col.comment.is_empty() {
        line.push_str(&format!(" -- \"{}\"", col.comment));
    }
    line.push('\n');
    line
}

/// MySQL column type back to a DSL type expression
fn dsl_type(col: &ColumnInfo) -> String {
    match col.data_type.as_str() {
        "tinyint" if col.column_type.starts_with("tinyint(1)") => "bool".to_string(),
        // Epoch-second columns: unsigned integers named `*_time`.
        t if is_integer(t)
            && col.column_type.contains("unsigned")
            && col.name.ends_with("_time") =>
        {
            "datetime".to_string()
        }
        "tinyint" | "smallint" | "mediumint" | "int" | "bigint" => match display_width(col) {
            Some(d) => format!("int(digits: {d})"),
            None => "int".to_string(),
        },
        "decimal" => format!(
            "decimal(totalDigits: {}, decimalDigits: {})",
            col.numeric_precision.unwrap_or(10),
            col.numeric_scale.unwrap_or(0)
        ),
        "float" | "double" => "float".to_string(),
        "char" => match col.char_length {
            Some(n) => format!("text(fixedLength: {n})"),
            None => "text".to_string(),
        },
        "varchar" => match col.char_length {
            Some(n) => format!("text(maxLength: {n})"),
            None => "text".to_string(),
        },
        "text" | "mediumtext" | "longtext" | "tinytext" => "text".to_string(),
        "datetime" | "timestamp" | "date" => "datetime".to_string(),
        "binary" | "varbinary" | "blob" | "mediumblob" | "longblob" => match col.char_length {
            Some(n) => format!("binary(maxLength: {n})"),
            None => "binary".to_string(),
        },
        "enum" => {
            // column_type looks like: enum('a','b','c')
            let inner = col
                .column_type
                .trim_start_matches("enum(")
                .trim_end_matches(')');
            let values: Vec<String> = inner
                .split(',')
                .map(|v| v.trim().trim_matches('\'').to_string())
                .collect();
            format!("enum(values: [{}])", values.join(" "))
        }
        other => {
            // Leave a trail for hand cleanup instead of failing the run.
            format!("text -- \"unmapped column type: {other}\"")
        }
    }
}

fn render_default(col: &ColumnInfo, default: &str) -> String {
    match col.data_type.as_str() {
        "tinyint" if col.column_type.starts_with("tinyint(1)") => {
            if default == "0" { "false" } else { "true" }.to_string()
        }
        "tinyint" | "smallint" | "mediumint" | "int" | "bigint" | "decimal" | "float"
        | "double" => default.to_string(),
        _ => format!("\"{default}\""),
    }
}

fn display_width(col: &ColumnInfo) -> Option<i64> {
    let open = col.column_type.find('(')?;
    let close = col.column_type.find(')')?;
    col.column_type[open + 1..close].parse().ok()
}

fn is_integer(data_type: &str) -> bool {
    matches!(data_type, "tinyint" | "smallint" | "mediumint" | "int" | "bigint")
}

fn column_info(conn: &mut dyn Connector, database: &str, table: &str) -> Result<Vec<ColumnInfo>> {
    let rows = conn.query(
        "SELECT column_name, data_type, column_type, is_nullable, extra, \
                character_maximum_length, numeric_precision, numeric_scale, \
                column_default, column_comment \
         FROM information_schema.columns \
         WHERE table_schema = ? AND table_name = ? ORDER BY ordinal_position",
        &[database, table],
    )?;
    rows.iter()
        .map(|r| {
            Ok(ColumnInfo {
                name: row_str(r, "column_name")?,
                data_type: row_str(r, "data_type")?,
                column_type: row_str(r, "column_type")?,
                nullable: row_str(r, "is_nullable")? == "YES",
                auto_increment: row_str(r, "extra")?.contains("auto_increment"),
                char_length: row_int(r, "character_maximum_length"),
                numeric_precision: row_int(r, "numeric_precision"),
                numeric_scale: row_int(r, "numeric_scale"),
                default: r
                    .get("column_default")
                    .and_then(|v| v.as_str())
                    .map(str::to_string),
                comment: row_str(r, "column_comment").unwrap_or_default(),
            })
        })
        .collect()
}

fn primary_key(conn: &mut dyn Connector, database: &str, table: &str) -> Result<Vec<String>> {
    let rows = conn.query(
        "SELECT column_name FROM information_schema.key_column_usage \
         WHERE table_schema = ? AND table_name = ? AND constraint_name = 'PRIMARY' \
         ORDER BY ordinal_position",
        &[database, table],
    )?;
    rows.iter().map(|r| row_str(r, "column_name")).collect()
}

fn foreign_keys(
    conn: &mut dyn Connector,
    database: &str,
    table: &str,
) -> Result<Vec<ForeignKeyInfo>> {
    let rows = conn.query(
        "SELECT column_name, referenced_table_name \
         FROM information_schema.key_column_usage \
         WHERE table_schema = ? AND table_name = ? \
           AND referenced_table_name IS NOT NULL \
         ORDER BY constraint_name",
        &[database, table],
    )?;
    rows.iter()
        .map(|r| {
            Ok(ForeignKeyInfo {
                column: row_str(r, "column_name")?,
                referenced_table: row_str(r, "referenced_table_name")?,
            })
        })
        .collect()
}

fn secondary_indexes(
    conn: &mut dyn Connector,
    database: &str,
    table: &str,
    keys: &[String],
) -> Result<Vec<IndexInfo>> {
    let rows = conn.query(
        "SELECT index_name, column_name, non_unique \
         FROM information_schema.statistics \
         WHERE table_schema = ? AND table_name = ? AND index_name <> 'PRIMARY' \
         ORDER BY index_name, seq_in_index",
        &[database, table],
    )?;
    let mut by_name: BTreeMap<String, IndexInfo> = BTreeMap::new();
    for row in &rows {
        let name = row_str(row, "index_name")?;
        let column = row_str(row, "column_name")?;
        let unique = row
            .get("non_unique")
            .and_then(|v| v.as_i64())
            .unwrap_or(1)
            == 0;
        by_name
            .entry(name)
            .or_insert(IndexInfo { columns: Vec::new(), unique })
            .columns
            .push(column);
    }
    // An index matching the primary key adds no information.
    Ok(by_name
        .into_values()
        .filter(|idx| idx.columns != keys)
        .collect())
}

fn row_str(row: &Row, column: &str) -> Result<String> {
    row.get(column)
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Usage(format!("introspection row missing column '{column}'")))
}

fn row_int(row: &Row, column: &str) -> Option<i64> {
    row.get(column).and_then(|v| v.as_i64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Canned rows keyed by a substring of the incoming query
    struct MockDb {
        responses: Vec<(&'static str, Vec<Row>)>,
    }

    impl Connector for MockDb {
        fn query(&mut self, sql: &str, _params: &[&str]) -> Result<Vec<Row>> {
            for (needle, rows) in &self.responses {
                if sql.contains(needle) {
                    return Ok(rows.clone());
                }
            }
            Ok(Vec::new())
        }
    }

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    fn column(name: &str, data_type: &str, column_type: &str, extra: &[(&str, Value)]) -> Row {
        let mut r = row(&[
            ("column_name", json!(name)),
            ("data_type", json!(data_type)),
            ("column_type", json!(column_type)),
            ("is_nullable", json!("NO")),
            ("extra", json!("")),
            ("column_comment", json!("")),
        ]);
        for (k, v) in extra {
            r.insert(k.to_string(), v.clone());
        }
        r
    }

    fn shop_db() -> MockDb {
        MockDb {
            responses: vec![
                (
                    "information_schema.tables",
                    vec![row(&[("table_name", json!("product"))])],
                ),
                (
                    "information_schema.columns",
                    vec![
                        column("id", "bigint", "bigint(11)", &[("extra", json!("auto_increment"))]),
                        column(
                            "name",
                            "varchar",
                            "varchar(60)",
                            &[("character_maximum_length", json!(60))],
                        ),
                        column("active", "tinyint", "tinyint(1)", &[("column_default", json!("1"))]),
                        column(
                            "price",
                            "decimal",
                            "decimal(10,2)",
                            &[("numeric_precision", json!(10)), ("numeric_scale", json!(2))],
                        ),
                        column(
                            "vendor_id",
                            "bigint",
                            "bigint(11)",
                            &[("is_nullable", json!("YES"))],
                        ),
                    ],
                ),
                (
                    "constraint_name = 'PRIMARY'",
                    vec![row(&[("column_name", json!("id"))])],
                ),
                (
                    "referenced_table_name IS NOT NULL",
                    vec![row(&[
                        ("column_name", json!("vendor_id")),
                        ("referenced_table_name", json!("vendor")),
                    ])],
                ),
                (
                    "information_schema.statistics",
                    vec![
                        row(&[
                            ("index_name", json!("ux_product_name")),
                            ("column_name", json!("name")),
                            ("non_unique", json!(0)),
                        ]),
                    ],
                ),
            ],
        }
    }

    #[test]
    fn auto_increment_key_collapses_to_auto_id() {
        let dsl = reverse_schema(&mut shop_db(), "shop").unwrap();
        assert!(dsl.contains("entity product {"));
        assert!(dsl.contains("with autoId"));
        assert!(!dsl.contains("has id"));
    }

    #[test]
    fn tinyint_one_maps_to_bool() {
        let dsl = reverse_schema(&mut shop_db(), "shop").unwrap();
        assert!(dsl.contains("has active : bool default(true)"));
    }

    #[test]
    fn varchar_and_decimal_round_trip() {
        let dsl = reverse_schema(&mut shop_db(), "shop").unwrap();
        assert!(dsl.contains("has name : text(maxLength: 60)"));
        assert!(dsl.contains("has price : decimal(totalDigits: 10, decimalDigits: 2)"));
    }

    #[test]
    fn foreign_key_becomes_relation() {
        let dsl = reverse_schema(&mut shop_db(), "shop").unwrap();
        assert!(dsl.contains("has vendor -> vendor optional"));
        assert!(!dsl.contains("vendorId"));
    }

    #[test]
    fn unique_index_survives() {
        let dsl = reverse_schema(&mut shop_db(), "shop").unwrap();
        assert!(dsl.contains("index [ name ] is unique"));
    }

    #[test]
    fn unsigned_time_columns_come_back_as_datetime() {
        let mut db = MockDb {
            responses: vec![
                (
                    "information_schema.tables",
                    vec![row(&[("table_name", json!("session"))])],
                ),
                (
                    "information_schema.columns",
                    vec![
                        column("updated_time", "int", "int(10) unsigned", &[]),
                        column("retry_count", "int", "int(10) unsigned", &[]),
                    ],
                ),
            ],
        };
        let dsl = reverse_schema(&mut db, "shop").unwrap();
        assert!(dsl.contains("has updatedTime : datetime"));
        assert!(dsl.contains("has retryCount : int(digits: 10)"));
    }

    #[test]
    fn snake_names_come_back_camel() {
        let mut db = MockDb {
            responses: vec![
                (
                    "information_schema.tables",
                    vec![row(&[("table_name", json!("order_line"))])],
                ),
                (
                    "information_schema.columns",
                    vec![column(
                        "unit_price",
                        "decimal",
                        "decimal(10,2)",
                        &[("numeric_precision", json!(10)), ("numeric_scale", json!(2))],
                    )],
                ),
            ],
        };
        let dsl = reverse_schema(&mut db, "shop").unwrap();
        assert!(dsl.contains("entity orderLine {"));
        assert!(dsl.contains("has unitPrice :"));
    }
}
