//! Entity feature plugins
//!
//! A feature is a reusable behavior bundle declared with `with name(...)`.
//! Features are a closed set: each one is a variant with typed options, and
//! each contributes through two ordered hooks. `before_fields` runs before
//! the declared fields are linked (so injected columns lead the table), and
//! `after_fields` runs after (so it can inspect and adjust declared fields).

use serde::{Deserialize, Serialize};

use crate::ast::{FeatureCall, FieldFlag, Literal};
use crate::error::{Error, Result};
use crate::model::entity::Entity;
use crate::model::field::{Field, FieldOrigin};
use crate::model::types::{ResolvedType, TypeKind};

/// Scenarios a runtime rule attaches to in generated data-access code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuleScenario {
    PostCreate,
    PreUpdate,
    PreDelete,
}

/// A behavioral obligation a feature leaves for the generated layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeRule {
    pub scenario: RuleScenario,
    pub description: String,
}

/// The closed set of entity features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Feature {
    /// Auto-increment integer primary key named `id`
    AutoId,
    /// The listed fields become optional individually, but at least one
    /// must be set per record
    AtLeastOneNotNull(Vec<String>),
    /// `createdAt` timestamp stamped by the database on insert
    CreateTimestamp,
    /// `updatedAt` timestamp refreshed by the database on update
    UpdateTimestamp,
    /// Soft delete through a `deleted` flag instead of row removal
    LogicalDeletion,
    /// One timestamp column per state of the named enum field
    StateTracking { field: String },
}

impl Feature {
    /// Parse a `with ...` call into a feature
    pub fn from_call(call: &FeatureCall, entity: &str) -> Result<Feature> {
        match call.name.as_str() {
            "autoId" => Ok(Feature::AutoId),
            "atLeastOneNotNull" => {
                if call.list.len() < 2 {
                    return Err(Error::FeatureArgs {
                        feature: "atLeastOneNotNull",
                        entity: entity.to_string(),
                        message: "needs a list of at least two fields".to_string(),
                    });
                }
                Ok(Feature::AtLeastOneNotNull(call.list.clone()))
            }
            "createTimestamp" => Ok(Feature::CreateTimestamp),
            "updateTimestamp" => Ok(Feature::UpdateTimestamp),
            "logicalDeletion" => Ok(Feature::LogicalDeletion),
            "stateTracking" => {
                let field = call
                    .attrs
                    .iter()
                    .find(|(k, _)| k == "field")
                    .and_then(|(_, v)| v.as_str().map(str::to_string))
                    .or_else(|| call.list.first().cloned());
                match field {
                    Some(field) => Ok(Feature::StateTracking { field }),
                    None => Err(Error::FeatureArgs {
                        feature: "stateTracking",
                        entity: entity.to_string(),
                        message: "needs the enum field to track".to_string(),
                    }),
                }
            }
            other => Err(Error::UnknownFeature {
                name: other.to_string(),
                entity: entity.to_string(),
            }),
        }
    }

    /// Hook run before declared fields are linked
    pub fn before_fields(&self, entity: &mut Entity) -> Result<()> {
        if let Feature::AutoId = self {
            let ty = ResolvedType::primitive(TypeKind::Int).with_attr("digits", 11);
            let id = Field::new("id", ty, FieldOrigin::Feature)
                .with_flag(FieldFlag::Auto)
                .with_flag(FieldFlag::ReadOnly);
            entity.add_field(id)?;
            if entity.key.is_empty() {
                entity.key = vec!["id".to_string()];
            }
        }
        Ok(())
    }

    /// Hook run after declared fields are linked
    pub fn after_fields(&self, entity: &mut Entity) -> Result<()> {
        match self {
            Feature::AutoId => Ok(()),

            Feature::AtLeastOneNotNull(fields) => {
                for name in fields {
                    match entity.field_mut(name) {
                        Some(field) => {
                            if !field.has_flag(FieldFlag::Optional) {
                                field.flags.push(FieldFlag::Optional);
                            }
                        }
                        None => {
                            return Err(Error::UnknownField {
                                field: name.clone(),
                                entity: entity.name.clone(),
                                context: "atLeastOneNotNull",
                            })
                        }
                    }
                }
                Ok(())
            }

            Feature::CreateTimestamp => {
                let ty = ResolvedType::primitive(TypeKind::DateTime);
                let field = Field::new("createdAt", ty, FieldOrigin::Feature)
                    .with_flag(FieldFlag::ReadOnly)
                    .with_flag(FieldFlag::DbDefault);
                entity.add_field(field)
            }

            Feature::UpdateTimestamp => {
                let ty = ResolvedType::primitive(TypeKind::DateTime);
                let field = Field::new("updatedAt", ty, FieldOrigin::Feature)
                    .with_flag(FieldFlag::ReadOnly)
                    .with_flag(FieldFlag::DbDefault);
                entity.add_field(field)
            }

            Feature::LogicalDeletion => {
                let ty = ResolvedType::primitive(TypeKind::Bool);
                let mut field = Field::new("deleted", ty, FieldOrigin::Feature)
                    .with_flag(FieldFlag::ReadOnly);
                field.default = Some(Literal::Boolean(false));
                entity.add_field(field)
            }

            Feature::StateTracking { field } => {
                let states: Vec<String> = match entity.field(field) {
                    Some(tracked) if tracked.ty.kind == TypeKind::Enum => tracked
                        .ty
                        .list_attr("values")
                        .unwrap_or_default()
                        .iter()
                        .filter_map(|lit| lit.as_str().map(str::to_string))
                        .collect(),
                    Some(_) => {
                        return Err(Error::FeatureArgs {
                            feature: "stateTracking",
                            entity: entity.name.clone(),
                            message: format!("field '{field}' is not an enum"),
                        })
                    }
                    None => {
                        return Err(Error::UnknownField {
                            field: field.clone(),
                            entity: entity.name.clone(),
                            context: "stateTracking",
                        })
                    }
                };
                for state in states {
                    let ty = ResolvedType::primitive(TypeKind::DateTime);
                    let field = Field::new(format!("{state}At"), ty, FieldOrigin::Feature)
                        .with_flag(FieldFlag::Optional)
                        .with_flag(FieldFlag::ReadOnly);
                    entity.add_field(field)?;
                }
                Ok(())
            }
        }
    }

    /// Obligations for the generated data-access layer
    pub fn runtime_rules(&self) -> Vec<RuntimeRule> {
        match self {
            Feature::AtLeastOneNotNull(fields) => vec![RuntimeRule {
                scenario: RuleScenario::PostCreate,
                description: format!("at least one of [{}] must be set", fields.join(", ")),
            }],
            Feature::LogicalDeletion => vec![RuntimeRule {
                scenario: RuleScenario::PreDelete,
                description: "convert delete into an update setting 'deleted'".to_string(),
            }],
            Feature::StateTracking { field } => vec![RuntimeRule {
                scenario: RuleScenario::PreUpdate,
                description: format!("stamp the timestamp column for the new '{field}' state"),
            }],
            _ => vec![],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{AttrValue, Span};
    use crate::context::{EntityId, ModuleId};

    fn call(name: &str, list: &[&str]) -> FeatureCall {
        FeatureCall {
            name: name.to_string(),
            attrs: vec![],
            list: list.iter().map(|s| s.to_string()).collect(),
            span: Span::default(),
        }
    }

    fn entity() -> Entity {
        Entity::new(EntityId(0), ModuleId(0), "customer")
    }

    #[test]
    fn auto_id_injects_leading_key_field() {
        let mut e = entity();
        Feature::AutoId.before_fields(&mut e).unwrap();
        e.add_field(Field::new(
            "name",
            ResolvedType::primitive(TypeKind::Text),
            FieldOrigin::Declared,
        ))
        .unwrap();
        assert_eq!(e.fields[0].name, "id");
        assert_eq!(e.key, vec!["id"]);
        assert!(e.fields[0].has_flag(FieldFlag::Auto));
    }

    #[test]
    fn at_least_one_not_null_marks_fields_optional() {
        let mut e = entity();
        for name in ["email", "mobile"] {
            e.add_field(Field::new(
                name,
                ResolvedType::primitive(TypeKind::Text),
                FieldOrigin::Declared,
            ))
            .unwrap();
        }
        let feature = Feature::from_call(&call("atLeastOneNotNull", &["email", "mobile"]), "customer")
            .unwrap();
        feature.after_fields(&mut e).unwrap();
        assert!(e.field("email").unwrap().is_optional());
        assert!(e.field("mobile").unwrap().is_optional());
        assert_eq!(feature.runtime_rules()[0].scenario, RuleScenario::PostCreate);
    }

    #[test]
    fn at_least_one_not_null_rejects_short_list() {
        assert!(Feature::from_call(&call("atLeastOneNotNull", &["email"]), "customer").is_err());
    }

    #[test]
    fn unknown_feature_is_an_error() {
        assert!(Feature::from_call(&call("turboMode", &[]), "customer").is_err());
    }

    #[test]
    fn state_tracking_adds_one_column_per_state() {
        let mut e = entity();
        let mut status = Field::new(
            "status",
            ResolvedType::primitive(TypeKind::Enum),
            FieldOrigin::Declared,
        );
        status.ty.attrs.insert(
            "values".to_string(),
            AttrValue::Many(vec![
                Literal::String("draft".into()),
                Literal::String("posted".into()),
            ]),
        );
        e.add_field(status).unwrap();

        Feature::StateTracking {
            field: "status".into(),
        }
        .after_fields(&mut e)
        .unwrap();

        assert!(e.field("draftAt").is_some());
        assert!(e.field("postedAt").is_some());
        assert!(e.field("draftAt").unwrap().is_optional());
    }

    #[test]
    fn state_tracking_rejects_non_enum_field() {
        let mut e = entity();
        e.add_field(Field::new(
            "status",
            ResolvedType::primitive(TypeKind::Text),
            FieldOrigin::Declared,
        ))
        .unwrap();
        let err = Feature::StateTracking {
            field: "status".into(),
        }
        .after_fields(&mut e)
        .unwrap_err();
        assert!(err.to_string().contains("not an enum"));
    }
}
