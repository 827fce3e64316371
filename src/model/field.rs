//! Linked field model

use serde::{Deserialize, Serialize};

use crate::ast::{FieldFlag, FunctorCall, Literal};
use crate::model::types::ResolvedType;
use crate::naming;

/// Why a field exists on an entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOrigin {
    /// Written by the author in the entity block
    Declared,
    /// Injected by a feature (`autoId`, timestamps, ...)
    Feature,
    /// Synthesized for a junction entity
    Junction,
}

/// A field after type resolution
///
/// Functor lists keep their declaration order; the compiler depends on it
/// for chaining and for stable topological ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub display: String,
    pub comment: Option<String>,
    pub ty: ResolvedType,
    pub flags: Vec<FieldFlag>,
    pub default: Option<Literal>,
    pub validators0: Vec<FunctorCall>,
    pub modifiers0: Vec<FunctorCall>,
    pub validators1: Vec<FunctorCall>,
    pub modifiers1: Vec<FunctorCall>,
    pub composer: Option<FunctorCall>,
    pub origin: FieldOrigin,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: ResolvedType, origin: FieldOrigin) -> Self {
        let name = name.into();
        let display = naming::display_name(&name);
        Self {
            name,
            display,
            comment: None,
            ty,
            flags: vec![],
            default: None,
            validators0: vec![],
            modifiers0: vec![],
            validators1: vec![],
            modifiers1: vec![],
            composer: None,
            origin,
        }
    }

    pub fn with_flag(mut self, flag: FieldFlag) -> Self {
        if !self.flags.contains(&flag) {
            self.flags.push(flag);
        }
        self
    }

    pub fn has_flag(&self, flag: FieldFlag) -> bool {
        self.flags.contains(&flag)
    }

    pub fn is_optional(&self) -> bool {
        self.has_flag(FieldFlag::Optional)
    }

    /// Column spelling for DDL
    pub fn sql_name(&self) -> String {
        naming::sql_name(&self.name)
    }

    /// All functor calls of the field in pipeline order
    pub fn all_functors(&self) -> impl Iterator<Item = &FunctorCall> {
        self.validators0
            .iter()
            .chain(&self.modifiers0)
            .chain(&self.validators1)
            .chain(&self.modifiers1)
            .chain(self.composer.as_ref())
    }

    /// Fields this one reads through `@field` arguments, in first-use order
    pub fn cross_refs(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for call in self.all_functors() {
            for name in call.field_refs() {
                if !seen.contains(&name) {
                    seen.push(name);
                }
            }
        }
        seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Arg;
    use crate::model::types::TypeKind;

    fn text_field(name: &str) -> Field {
        Field::new(name, ResolvedType::primitive(TypeKind::Text), FieldOrigin::Declared)
    }

    #[test]
    fn display_name_is_derived() {
        assert_eq!(text_field("firstName").display, "First Name");
    }

    #[test]
    fn cross_refs_deduplicate_in_order() {
        let mut f = text_field("slug");
        let mut call = FunctorCall::new("slugify");
        call.args = vec![Arg::FieldRef("name".into()), Arg::FieldRef("vendor".into())];
        f.modifiers0.push(call);
        let mut second = FunctorCall::new("truncate");
        second.args = vec![Arg::FieldRef("name".into())];
        f.modifiers1.push(second);
        assert_eq!(f.cross_refs(), vec!["name", "vendor"]);
    }

    #[test]
    fn flag_dedup() {
        let f = text_field("a")
            .with_flag(FieldFlag::Optional)
            .with_flag(FieldFlag::Optional);
        assert_eq!(f.flags.len(), 1);
    }
}
