//! Linked data model
//!
//! The linker turns raw [`crate::ast`] declarations into these types. All
//! cross-references are arena ids owned by
//! [`crate::context::CompilationContext`].

pub mod entity;
pub mod field;
pub mod relation;
pub mod schema;
pub mod types;
pub mod view;

pub use entity::{Entity, Index};
pub use field::{Field, FieldOrigin};
pub use relation::{RelKind, Relation};
pub use schema::Schema;
pub use types::{ResolvedType, TypeKind};
pub use view::{ContainsNode, Document, View};
