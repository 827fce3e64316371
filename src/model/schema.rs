//! Linked schemas: the unit of expansion and generation

use serde::{Deserialize, Serialize};

use crate::context::{EntityId, ModuleId, ViewId};

/// A schema after linking and expansion.
///
/// `roots` are the entities named in the declaration; `entities` is the
/// relation closure computed by expansion, roots first in declaration order,
/// then reachable entities in discovery order. Generators iterate `entities`
/// so output ordering is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub name: String,
    pub module: ModuleId,
    pub roots: Vec<EntityId>,
    pub entities: Vec<EntityId>,
    pub views: Vec<ViewId>,
}

impl Schema {
    pub fn new(name: impl Into<String>, module: ModuleId) -> Self {
        Self {
            name: name.into(),
            module,
            roots: vec![],
            entities: vec![],
            views: vec![],
        }
    }

    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(&entity)
    }
}
