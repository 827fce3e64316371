//! Linked entity model

use serde::{Deserialize, Serialize};

use crate::ast::InterfaceDecl;
use crate::context::{EntityId, ModuleId};
use crate::error::{Error, Result};
use crate::features::Feature;
use crate::model::field::Field;
use crate::naming;

/// A secondary index over entity fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Index {
    pub fields: Vec<String>,
    pub unique: bool,
}

/// An entity after linking: base resolved, types resolved, features parsed.
///
/// Relations are not stored here; they live on the [`crate::context::CompilationContext`]
/// as a flat edge list so junction synthesis can rewrite them in one place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub module: ModuleId,
    pub name: String,
    pub display: String,
    pub comment: Option<String>,
    pub base: Option<EntityId>,
    pub features: Vec<Feature>,
    pub fields: Vec<Field>,
    /// Primary key field names, declaration spelling
    pub key: Vec<String>,
    pub indexes: Vec<Index>,
    /// Interface bodies stay in AST form until the compiler runs
    pub interfaces: Vec<InterfaceDecl>,
    /// True for junction entities synthesized during expansion
    pub synthetic: bool,
}

impl Entity {
    pub fn new(id: EntityId, module: ModuleId, name: impl Into<String>) -> Self {
        let name = name.into();
        let display = naming::display_name(&name);
        Self {
            id,
            module,
            name,
            display,
            comment: None,
            base: None,
            features: vec![],
            fields: vec![],
            key: vec![],
            indexes: vec![],
            interfaces: vec![],
            synthetic: false,
        }
    }

    pub fn table_name(&self) -> String {
        naming::sql_name(&self.name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_mut(&mut self, name: &str) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| f.name == name)
    }

    pub fn has_feature(&self, pred: impl Fn(&Feature) -> bool) -> bool {
        self.features.iter().any(pred)
    }

    /// Append a field, rejecting duplicate names
    pub fn add_field(&mut self, field: Field) -> Result<()> {
        if self.field(&field.name).is_some() {
            return Err(Error::DuplicateDefinition {
                what: "field",
                name: field.name,
                entity: self.name.clone(),
            });
        }
        self.fields.push(field);
        Ok(())
    }

    /// Swap an existing field for a new definition, keeping its position
    pub fn replace_field(&mut self, field: Field) -> Result<()> {
        match self.fields.iter().position(|f| f.name == field.name) {
            Some(i) => {
                self.fields[i] = field;
                Ok(())
            }
            None => self.add_field(field),
        }
    }

    /// Add an index unless an index over the same field set already exists.
    ///
    /// The field set comparison is order-insensitive; `[a b]` and `[b a]`
    /// cover the same columns.
    pub fn add_index(&mut self, fields: Vec<String>, unique: bool) -> Result<()> {
        let mut wanted = fields.clone();
        wanted.sort();
        for existing in &self.indexes {
            let mut have = existing.fields.clone();
            have.sort();
            if have == wanted {
                return Err(Error::DuplicateDefinition {
                    what: "index",
                    name: fields.join(" "),
                    entity: self.name.clone(),
                });
            }
        }
        self.indexes.push(Index { fields, unique });
        Ok(())
    }

    /// Verify every key and index field actually exists
    pub fn check_field_refs(&self) -> Result<()> {
        for name in &self.key {
            if self.field(name).is_none() {
                return Err(Error::UnknownField {
                    field: name.clone(),
                    entity: self.name.clone(),
                    context: "primary key",
                });
            }
        }
        for index in &self.indexes {
            for name in &index.fields {
                if self.field(name).is_none() {
                    return Err(Error::UnknownField {
                        field: name.clone(),
                        entity: self.name.clone(),
                        context: "index",
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::field::FieldOrigin;
    use crate::model::types::{ResolvedType, TypeKind};

    fn entity() -> Entity {
        Entity::new(EntityId(0), ModuleId(0), "orderLine")
    }

    fn field(name: &str) -> Field {
        Field::new(name, ResolvedType::primitive(TypeKind::Int), FieldOrigin::Declared)
    }

    #[test]
    fn table_name_is_snake() {
        assert_eq!(entity().table_name(), "order_line");
    }

    #[test]
    fn duplicate_field_rejected() {
        let mut e = entity();
        e.add_field(field("qty")).unwrap();
        assert!(e.add_field(field("qty")).is_err());
    }

    #[test]
    fn duplicate_index_set_rejected_regardless_of_order() {
        let mut e = entity();
        e.add_index(vec!["a".into(), "b".into()], false).unwrap();
        assert!(e.add_index(vec!["b".into(), "a".into()], true).is_err());
        assert!(e.add_index(vec!["a".into()], false).is_ok());
    }
}
