//! Oolong: a declarative schema compiler.
//!
//! Projects describe their domain in `.ool` modules: entities with typed
//! fields, functor pipelines, relations, views, documents and schemas. The
//! compiler turns those into MySQL DDL, stored procedures for views, and
//! generated data-access sources.
//!
//! The pipeline runs in fixed stages:
//!
//! ```text
//! .ool files --(loader)--> module ASTs
//!            --(linker)--> resolved entity graph
//!            --(expansion)--> junctions synthesized, schema closures
//!            --(compiler)--> per-entity execution plans
//!            --(generator)--> SQL scripts + model sources
//! ```
//!
//! [`build`] runs the whole thing against a [`config::BuildConfig`];
//! [`generator::reverse`] goes the other way, from a live database back to
//! DSL source.

pub mod ast;
pub mod compiler;
pub mod config;
pub mod context;
pub mod error;
pub mod expansion;
pub mod features;
pub mod generator;
pub mod linker;
pub mod loader;
pub mod model;
pub mod naming;
pub mod parser;

pub use config::BuildConfig;
pub use context::CompilationContext;
pub use error::{Error, Result};

use tracing::info;

/// Run the full pipeline: load, link, expand, compile, generate.
///
/// Returns the compilation context so callers can inspect the resolved
/// graph after the artifacts are written.
pub fn build(config: &BuildConfig) -> Result<CompilationContext> {
    let mut ctx = CompilationContext::new();

    let loader = loader::ModuleLoader::new(config);
    let entry = loader.load_entry(&mut ctx)?;
    info!(entry = %ctx.module(entry).label(), modules = ctx.modules.len(), "modules loaded");

    linker::link(&mut ctx)?;
    expansion::expand(&mut ctx)?;
    generator::generate(&mut ctx, config)?;

    info!(
        entities = ctx.entities.len(),
        schemas = ctx.schemas.len(),
        "build complete"
    );
    Ok(ctx)
}
