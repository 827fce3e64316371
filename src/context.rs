//! Compilation context: module cache, linked arenas, naming table
//!
//! Everything the pipeline produces lives here and is addressed by plain
//! index ids. The context is threaded `&mut` through the loader, the linker
//! and the expansion passes; nothing is global.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::ast::ModuleAst;
use crate::error::{Error, RefKind, Result};
use crate::model::entity::Entity;
use crate::model::relation::Relation;
use crate::model::schema::Schema;
use crate::model::types::ResolvedType;
use crate::model::view::{Document, View};

macro_rules! arena_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        pub struct $name(pub usize);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

arena_id!(
    /// Index into the module arena
    ModuleId
);
arena_id!(
    /// Index into the entity arena
    EntityId
);
arena_id!(
    /// Index into the view arena
    ViewId
);
arena_id!(
    /// Index into the document arena
    DocumentId
);

/// One loaded source file plus its resolution namespace
#[derive(Debug, Clone)]
pub struct Module {
    pub id: ModuleId,
    pub path: PathBuf,
    pub ast: ModuleAst,
    /// Imported modules in declaration order. Reference resolution scans
    /// this list last-to-first so later imports shadow earlier ones.
    pub namespace: Vec<ModuleId>,
    /// Entities this module declares, filled during linking
    pub entities: Vec<EntityId>,
}

impl Module {
    /// Short label for error messages
    pub fn label(&self) -> String {
        self.path.display().to_string()
    }
}

/// A user `type` declaration after track-back to a builtin primitive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedType {
    pub name: String,
    pub module: ModuleId,
    pub resolved: ResolvedType,
}

/// Mutable state of one compilation run
#[derive(Debug, Default)]
pub struct CompilationContext {
    pub modules: Vec<Module>,
    paths: BTreeMap<PathBuf, ModuleId>,

    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
    pub views: Vec<View>,
    pub documents: Vec<Document>,
    pub types: Vec<NamedType>,
    pub schemas: Vec<Schema>,

    /// Kind-qualified name → owning module and arena index.
    /// Keys look like `E$product`, `T$money`, `V$productList`.
    naming: BTreeMap<String, (ModuleId, usize)>,
    /// Resolution memo keyed by `E$name@moduleId`
    memo: BTreeMap<String, usize>,

    /// The implicit builtin-types module, always first in every namespace
    pub core_module: Option<ModuleId>,
}

impl CompilationContext {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== modules =====

    /// Register a parsed module. The same canonical path loads once; a
    /// second registration returns the cached id.
    pub fn add_module(&mut self, path: PathBuf, ast: ModuleAst) -> ModuleId {
        if let Some(id) = self.paths.get(&path) {
            return *id;
        }
        let id = ModuleId(self.modules.len());
        self.paths.insert(path.clone(), id);
        self.modules.push(Module {
            id,
            path,
            ast,
            namespace: vec![],
            entities: vec![],
        });
        id
    }

    pub fn module_by_path(&self, path: &Path) -> Option<ModuleId> {
        self.paths.get(path).copied()
    }

    pub fn module(&self, id: ModuleId) -> &Module {
        &self.modules[id.0]
    }

    pub fn module_mut(&mut self, id: ModuleId) -> &mut Module {
        &mut self.modules[id.0]
    }

    // ===== arenas =====

    pub fn add_entity(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len());
        entity.id = id;
        self.entities.push(entity);
        id
    }

    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub fn view(&self, id: ViewId) -> &View {
        &self.views[id.0]
    }

    pub fn document(&self, id: DocumentId) -> &Document {
        &self.documents[id.0]
    }

    // ===== naming table =====

    /// Claim a kind-qualified name for a module. Two modules declaring the
    /// same name of the same kind is a fatal conflict; re-registration from
    /// the same module is idempotent.
    pub fn register_name(
        &mut self,
        kind: RefKind,
        name: &str,
        module: ModuleId,
        index: usize,
    ) -> Result<()> {
        let key = format!("{}{name}", kind.prefix());
        if let Some((owner, _)) = self.naming.get(&key) {
            if *owner != module {
                return Err(Error::NamingConflict {
                    kind,
                    name: name.to_string(),
                    first: self.module(*owner).label(),
                    second: self.module(module).label(),
                });
            }
            return Ok(());
        }
        self.naming.insert(key, (module, index));
        Ok(())
    }

    /// Arena index registered for a kind-qualified name, if any
    pub fn lookup_name(&self, kind: RefKind, name: &str) -> Option<usize> {
        self.naming
            .get(&format!("{}{name}", kind.prefix()))
            .map(|(_, index)| *index)
    }

    // ===== resolution memo =====

    pub fn memo_get(&self, kind: RefKind, name: &str, from: ModuleId) -> Option<usize> {
        self.memo
            .get(&format!("{}{name}@{from}", kind.prefix()))
            .copied()
    }

    pub fn memo_put(&mut self, kind: RefKind, name: &str, from: ModuleId, index: usize) {
        self.memo
            .insert(format!("{}{name}@{from}", kind.prefix()), index);
    }
}
