//! Name derivation shared by the linker and the generators
//!
//! Declared names are camelCase. Everything else is derived here: SQL
//! identifiers, generated source identifiers, display labels, plural forms
//! for junction entities.

use convert_case::{Case, Casing};

/// SQL table/column spelling: `orderLine` → `order_line`
pub fn sql_name(name: &str) -> String {
    name.to_case(Case::Snake)
}

/// Pascal spelling for synthesized entity names: `orderLine` → `OrderLine`
pub fn pascal(name: &str) -> String {
    name.to_case(Case::Pascal)
}

/// Human display label: `firstName` → `First Name`
pub fn display_name(name: &str) -> String {
    name.to_case(Case::Title)
}

/// English plural, enough for identifier synthesis.
///
/// `tag` → `tags`, `category` → `categories`, `address` → `addresses`.
pub fn pluralize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix('y') {
        let penult = stem.chars().last();
        if !matches!(penult, Some('a' | 'e' | 'i' | 'o' | 'u')) {
            return format!("{stem}ies");
        }
    }
    if name.ends_with('s')
        || name.ends_with('x')
        || name.ends_with('z')
        || name.ends_with("ch")
        || name.ends_with("sh")
    {
        return format!("{name}es");
    }
    format!("{name}s")
}

/// Name of the junction entity synthesized for `left <=> right`
pub fn junction_name(left: &str, right: &str) -> String {
    format!("{left}{}", pascal(&pluralize(right)))
}

/// Foreign-key column for a relation field: `vendor` → `vendor_id`
pub fn fk_column(field: &str) -> String {
    format!("{}_id", sql_name(field))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snake_and_pascal() {
        assert_eq!(sql_name("orderLine"), "order_line");
        assert_eq!(sql_name("id"), "id");
        assert_eq!(pascal("orderLine"), "OrderLine");
    }

    #[test]
    fn plural_rules() {
        assert_eq!(pluralize("tag"), "tags");
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("batch"), "batches");
    }

    #[test]
    fn junction_names() {
        assert_eq!(junction_name("product", "tag"), "productTags");
        assert_eq!(junction_name("user", "category"), "userCategories");
    }

    #[test]
    fn display_labels() {
        assert_eq!(display_name("firstName"), "First Name");
        assert_eq!(display_name("sku"), "Sku");
    }
}
