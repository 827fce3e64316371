//! Resolved type → MySQL column type
//!
//! Integer and text types bucket by their declared size so the storage
//! footprint follows the constraint instead of defaulting to the widest
//! column. Unbounded text falls back to TEXT (compliance flags it).

use crate::ast::Literal;
use crate::model::types::{ResolvedType, TypeKind};

/// MySQL column type for a resolved field type
pub fn column_type(ty: &ResolvedType) -> String {
    match ty.kind {
        TypeKind::Int => int_type(ty),
        TypeKind::Float => "DOUBLE".to_string(),
        TypeKind::Decimal => format!(
            "DECIMAL({},{})",
            ty.int_attr("totalDigits").unwrap_or(10),
            ty.int_attr("decimalDigits").unwrap_or(0)
        ),
        TypeKind::Text => text_type(ty),
        TypeKind::Bool => "TINYINT(1)".to_string(),
        TypeKind::Binary => binary_type(ty),
        TypeKind::DateTime => "DATETIME".to_string(),
        TypeKind::Enum => enum_type(ty),
    }
}

fn int_type(ty: &ResolvedType) -> String {
    let range = int_range(ty);
    let base = match ty.int_attr("digits") {
        Some(d) if d > 10 => format!("BIGINT({d})"),
        Some(d) if d > 7 => format!("INT({d})"),
        Some(d) if d > 4 => format!("MEDIUMINT({d})"),
        Some(d) if d > 2 => format!("SMALLINT({d})"),
        Some(d) => format!("TINYINT({d})"),
        None => match range {
            Some((min, max)) => range_bucket(min, max),
            None => "INT".to_string(),
        },
    };
    // A range that excludes negatives halves the storage requirement.
    match range {
        Some((min, _)) if min >= 0 => format!("{base} UNSIGNED"),
        _ => base,
    }
}

fn int_range(ty: &ResolvedType) -> Option<(i64, i64)> {
    let lits = ty.list_attr("range")?;
    match lits {
        [min, max] => Some((min.as_integer()?, max.as_integer()?)),
        _ => None,
    }
}

/// Narrowest MySQL integer type that holds every value of the range
fn range_bucket(min: i64, max: i64) -> String {
    let fits = |lo: i64, hi: i64| min >= lo && max <= hi;
    if min >= 0 {
        if fits(0, 255) {
            "TINYINT"
        } else if fits(0, 65_535) {
            "SMALLINT"
        } else if fits(0, 16_777_215) {
            "MEDIUMINT"
        } else if fits(0, 4_294_967_295) {
            "INT"
        } else {
            "BIGINT"
        }
    } else if fits(-128, 127) {
        "TINYINT"
    } else if fits(-32_768, 32_767) {
        "SMALLINT"
    } else if fits(-8_388_608, 8_388_607) {
        "MEDIUMINT"
    } else if fits(-2_147_483_648, 2_147_483_647) {
        "INT"
    } else {
        "BIGINT"
    }
    .to_string()
}

fn text_type(ty: &ResolvedType) -> String {
    if let Some(n) = ty.int_attr("fixedLength") {
        return format!("CHAR({n})");
    }
    match ty.int_attr("maxLength") {
        Some(n) if n > 16_777_215 => "LONGTEXT".to_string(),
        Some(n) if n > 65_535 => "MEDIUMTEXT".to_string(),
        Some(n) if n >= 2_000 => "TEXT".to_string(),
        Some(n) => format!("VARCHAR({n})"),
        None => "TEXT".to_string(),
    }
}

fn binary_type(ty: &ResolvedType) -> String {
    if let Some(n) = ty.int_attr("fixedLength") {
        return format!("BINARY({n})");
    }
    match ty.int_attr("maxLength") {
        Some(n) if n > 16_777_215 => "LONGBLOB".to_string(),
        Some(n) if n > 65_535 => "MEDIUMBLOB".to_string(),
        Some(n) if n >= 2_000 => "BLOB".to_string(),
        Some(n) => format!("VARBINARY({n})"),
        None => "BLOB".to_string(),
    }
}

fn enum_type(ty: &ResolvedType) -> String {
    let values: Vec<String> = ty
        .list_attr("values")
        .unwrap_or_default()
        .iter()
        .filter_map(|lit| lit.as_str())
        .map(|v| format!("'{}'", v.replace('\'', "''")))
        .collect();
    format!("ENUM({})", values.join(","))
}

/// Literal default rendered for a DEFAULT clause
pub fn default_clause(lit: &Literal) -> String {
    match lit {
        Literal::String(s) => format!("'{}'", s.replace('\'', "''")),
        Literal::Integer(i) => i.to_string(),
        Literal::Float(f) => f.to_string(),
        Literal::Boolean(true) => "1".to_string(),
        Literal::Boolean(false) => "0".to_string(),
        Literal::Null => "NULL".to_string(),
    }
}
