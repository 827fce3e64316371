//! Linked views and document hierarchies

use serde::{Deserialize, Serialize};

use crate::ast::{Arg, Cond, OrderTerm};
use crate::context::{DocumentId, EntityId, ModuleId, ViewId};

/// A view after linking: entity and document references resolved.
///
/// The condition tree keeps field names as written; the generator validates
/// them against the root entity when it renders SQL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub id: ViewId,
    pub module: ModuleId,
    pub name: String,
    pub entity: EntityId,
    pub document: Option<DocumentId>,
    pub filter: Option<Cond>,
    pub group: Vec<String>,
    pub order: Vec<OrderTerm>,
    pub limit: Option<Arg>,
}

/// One join level of a document: parent relation field into a child entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainsNode {
    pub field: String,
    pub entity: EntityId,
    pub children: Vec<ContainsNode>,
}

/// A document hierarchy after linking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub module: ModuleId,
    pub name: String,
    pub entity: EntityId,
    pub contains: Vec<ContainsNode>,
}

impl Document {
    /// All entities the document joins, root first, depth-first
    pub fn entity_closure(&self) -> Vec<EntityId> {
        fn walk(nodes: &[ContainsNode], out: &mut Vec<EntityId>) {
            for node in nodes {
                if !out.contains(&node.entity) {
                    out.push(node.entity);
                }
                walk(&node.children, out);
            }
        }
        let mut out = vec![self.entity];
        walk(&self.contains, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_is_depth_first_and_deduplicated() {
        let doc = Document {
            id: DocumentId(0),
            module: ModuleId(0),
            name: "orderDoc".into(),
            entity: EntityId(0),
            contains: vec![ContainsNode {
                field: "customer".into(),
                entity: EntityId(1),
                children: vec![ContainsNode {
                    field: "account".into(),
                    entity: EntityId(2),
                    children: vec![],
                }],
            }, ContainsNode {
                field: "reseller".into(),
                entity: EntityId(1),
                children: vec![],
            }],
        };
        assert_eq!(
            doc.entity_closure(),
            vec![EntityId(0), EntityId(1), EntityId(2)]
        );
    }
}
