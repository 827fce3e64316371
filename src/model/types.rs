//! Builtin primitive types and resolved type information
//!
//! Every user-declared `type` eventually tracks back to one of the builtin
//! primitives. [`ResolvedType`] is the flattened result: the primitive kind
//! plus the merged constraint attributes collected along the alias chain,
//! nearest declaration winning.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{AttrValue, Literal};

/// The primitive kinds the generators know how to map to storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Int,
    Float,
    Decimal,
    Text,
    Bool,
    Binary,
    DateTime,
    Enum,
}

impl TypeKind {
    /// Builtin primitive name → kind
    pub fn from_builtin(name: &str) -> Option<TypeKind> {
        match name {
            "int" => Some(TypeKind::Int),
            "float" => Some(TypeKind::Float),
            "decimal" => Some(TypeKind::Decimal),
            "text" => Some(TypeKind::Text),
            "bool" => Some(TypeKind::Bool),
            "binary" => Some(TypeKind::Binary),
            "datetime" => Some(TypeKind::DateTime),
            "enum" => Some(TypeKind::Enum),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TypeKind::Int => "int",
            TypeKind::Float => "float",
            TypeKind::Decimal => "decimal",
            TypeKind::Text => "text",
            TypeKind::Bool => "bool",
            TypeKind::Binary => "binary",
            TypeKind::DateTime => "datetime",
            TypeKind::Enum => "enum",
        }
    }
}

/// A fully tracked-back type: primitive kind, merged attributes, and the
/// alias chain walked to get there (most derived first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedType {
    pub kind: TypeKind,
    pub attrs: BTreeMap<String, AttrValue>,
    pub chain: Vec<String>,
}

impl ResolvedType {
    /// A bare primitive with no constraints
    pub fn primitive(kind: TypeKind) -> Self {
        Self {
            kind,
            attrs: BTreeMap::new(),
            chain: vec![kind.name().to_string()],
        }
    }

    pub fn with_attr(mut self, key: &str, value: i64) -> Self {
        self.attrs
            .insert(key.to_string(), AttrValue::One(Literal::Integer(value)));
        self
    }

    pub fn int_attr(&self, key: &str) -> Option<i64> {
        self.attrs.get(key).and_then(|v| v.as_integer())
    }

    pub fn str_attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_str())
    }

    pub fn list_attr(&self, key: &str) -> Option<&[Literal]> {
        self.attrs.get(key).and_then(|v| v.as_list())
    }

    /// Merge attributes from an outer reference; existing keys win because
    /// the nearest declaration overrides the alias it refines.
    pub fn merge_attrs<'a>(
        &mut self,
        attrs: impl IntoIterator<Item = &'a (String, AttrValue)>,
    ) {
        for (key, value) in attrs {
            self.attrs.entry(key.clone()).or_insert_with(|| value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_lookup() {
        assert_eq!(TypeKind::from_builtin("int"), Some(TypeKind::Int));
        assert_eq!(TypeKind::from_builtin("datetime"), Some(TypeKind::DateTime));
        assert_eq!(TypeKind::from_builtin("money"), None);
    }

    #[test]
    fn nearest_attr_wins_on_merge() {
        let mut ty = ResolvedType::primitive(TypeKind::Text).with_attr("maxLength", 60);
        ty.merge_attrs(&[
            ("maxLength".to_string(), AttrValue::One(Literal::Integer(255))),
            ("fixedLength".to_string(), AttrValue::One(Literal::Integer(8))),
        ]);
        assert_eq!(ty.int_attr("maxLength"), Some(60));
        assert_eq!(ty.int_attr("fixedLength"), Some(8));
    }
}
