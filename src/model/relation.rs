//! Linked relations between entities

use serde::{Deserialize, Serialize};

use crate::context::EntityId;

/// Cardinality of a linked relation edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelKind {
    /// `<->` one row on each side, FK column is unique
    OneToOne,
    /// `->` many left rows point at one right row
    ManyToOne,
    /// `<=>` before junction synthesis rewrites it
    ManyToMany,
}

/// One edge of the relation graph.
///
/// `left` owns the FK column named after `field`; `right` is the referenced
/// entity. Junction synthesis replaces every `ManyToMany` edge with a
/// synthetic entity and two `ManyToOne` edges, so generators never see one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub left: EntityId,
    pub field: String,
    pub right: EntityId,
    pub kind: RelKind,
    pub optional: bool,
    pub comment: Option<String>,
    /// Set on edges created for a synthesized junction entity
    pub via_junction: bool,
}

impl Relation {
    pub fn new(left: EntityId, field: impl Into<String>, right: EntityId, kind: RelKind) -> Self {
        Self {
            left,
            field: field.into(),
            right,
            kind,
            optional: false,
            comment: None,
            via_junction: false,
        }
    }

}
