//! Error taxonomy for the schema compiler
//!
//! One variant per failure class of the compilation pipeline. Every error is
//! fatal: a single unresolved reference aborts the whole run, there is no
//! partial-success mode and no retry (compilation is deterministic).

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the compiler
#[derive(Error, Debug)]
pub enum Error {
    #[error("Parse error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Cannot read module {path}: {source}")]
    ModuleRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Import '{spec}' in {module} matched no modules")]
    ImportEmpty { spec: String, module: PathBuf },

    #[error("{kind} '{name}' not found, referenced from module '{module}'")]
    ReferenceNotFound {
        kind: RefKind,
        name: String,
        module: String,
    },

    #[error(
        "Naming conflict: {kind} '{name}' is declared in both module '{first}' and module '{second}'"
    )]
    NamingConflict {
        kind: RefKind,
        name: String,
        first: String,
        second: String,
    },

    #[error("Duplicate {what} '{name}' in entity '{entity}'")]
    DuplicateDefinition {
        what: &'static str,
        name: String,
        entity: String,
    },

    #[error("Cannot synthesize junction entity '{name}': the name is already taken")]
    JunctionCollision { name: String },

    #[error("Type alias cycle through '{name}'")]
    TypeCycle { name: String },

    #[error("Inheritance cycle through entity '{name}'")]
    InheritanceCycle { name: String },

    #[error("Unknown feature '{name}' on entity '{entity}'")]
    UnknownFeature { name: String, entity: String },

    #[error("Feature '{feature}' on entity '{entity}': {message}")]
    FeatureArgs {
        feature: &'static str,
        entity: String,
        message: String,
    },

    #[error("Unknown field '{field}' referenced by {context} of entity '{entity}'")]
    UnknownField {
        field: String,
        entity: String,
        context: &'static str,
    },

    #[error("Duplicate computation node '{node}'")]
    DuplicateNode { node: String },

    #[error("Self-dependency on '{node}'")]
    SelfDependency { node: String },

    #[error("Unknown computation node '{node}', referenced by '{from}'")]
    UnknownNode { node: String, from: String },

    #[error("Dependency cycle among: {nodes}")]
    DependencyCycle { nodes: String },

    #[error("Functor '{functor}' on '{entity}.{field}' takes {expected} arguments, got {got}")]
    FunctorArity {
        functor: String,
        entity: String,
        field: String,
        expected: String,
        got: usize,
    },

    #[error("Usage error: {0}")]
    Usage(String),

    #[error("Schema '{schema}' failed compliance checks:\n{report}")]
    Compliance { schema: String, report: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reference kinds tracked by the resolver and the naming table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefKind {
    Entity,
    View,
    Document,
    Type,
}

impl RefKind {
    /// Prefix used for the kind-qualified naming table key
    pub fn prefix(self) -> &'static str {
        match self {
            RefKind::Entity => "E$",
            RefKind::View => "V$",
            RefKind::Document => "D$",
            RefKind::Type => "T$",
        }
    }
}

impl std::fmt::Display for RefKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RefKind::Entity => "entity",
            RefKind::View => "view",
            RefKind::Document => "document",
            RefKind::Type => "type",
        };
        f.write_str(s)
    }
}

/// Accumulates compliance warnings and errors so a schema check can surface
/// everything at once instead of failing on the first finding.
#[derive(Debug, Default)]
pub struct ComplianceReport {
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

impl ComplianceReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Consume the report; `Err` carries warnings and errors together.
    pub fn into_result(self, schema: &str) -> Result<Vec<String>> {
        if self.has_errors() {
            let mut report = String::new();
            for w in &self.warnings {
                report.push_str("warning: ");
                report.push_str(w);
                report.push('\n');
            }
            for e in &self.errors {
                report.push_str("error: ");
                report.push_str(e);
                report.push('\n');
            }
            Err(Error::Compliance {
                schema: schema.to_string(),
                report,
            })
        } else {
            Ok(self.warnings)
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
