//! Module loader
//!
//! Walks the import graph starting from the entry module, parsing each file
//! exactly once (deduplicated by canonical path, so import cycles simply
//! resolve to already-loaded modules). Every module's namespace starts with
//! the implicit core-types module, then every other module file in its own
//! directory, then its imports in declaration order; the linker scans that
//! list last-to-first, so explicit imports shadow siblings and siblings
//! shadow core.
//!
//! Import specs are relative to the importing file:
//!
//! ```text
//! import "./types/common"     one file (.ool extension implied)
//! import "./types/*"          every .ool file in the directory
//! import "../shared/**"       every .ool file below the directory
//! ```

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::config::BuildConfig;
use crate::context::{CompilationContext, ModuleId};
use crate::error::{Error, Result};
use crate::parser;

/// Pseudo-path of the embedded core-types module
pub const CORE_NAMESPACE: &str = "oolong:core";

const CORE_SOURCE: &str = include_str!("dsl/core.ool");

pub struct ModuleLoader<'a> {
    config: &'a BuildConfig,
}

impl<'a> ModuleLoader<'a> {
    pub fn new(config: &'a BuildConfig) -> Self {
        Self { config }
    }

    /// Load the configured entry module and everything it imports
    pub fn load_entry(&self, ctx: &mut CompilationContext) -> Result<ModuleId> {
        self.ensure_core(ctx)?;
        self.load_file(ctx, &self.config.entry_path())
    }

    /// Load one module file (and, recursively, its imports)
    pub fn load_file(&self, ctx: &mut CompilationContext, path: &Path) -> Result<ModuleId> {
        let canonical = path.canonicalize().map_err(|source| Error::ModuleRead {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(id) = ctx.module_by_path(&canonical) {
            return Ok(id);
        }

        let text = std::fs::read_to_string(&canonical).map_err(|source| Error::ModuleRead {
            path: canonical.clone(),
            source,
        })?;
        let ast = parser::parse_module(&text).map_err(|message| Error::Parse {
            path: canonical.clone(),
            message,
        })?;

        info!(
            path = %canonical.display(),
            entities = ast.entities.len(),
            types = ast.types.len(),
            imports = ast.imports.len(),
            "loaded module"
        );

        let imports = ast.imports.clone();
        let id = ctx.add_module(canonical.clone(), ast);
        self.write_debug_artifact(ctx, id);

        // Core first so every later import can shadow it.
        let mut namespace = Vec::new();
        if let Some(core) = ctx.core_module {
            namespace.push(core);
        }

        let base = canonical
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        // Same-directory modules are visible without an import; explicit
        // imports come later in the list and therefore shadow them.
        for sibling in collect_dir(&base)? {
            if sibling == canonical {
                continue;
            }
            let loaded = self.load_file(ctx, &sibling)?;
            if !namespace.contains(&loaded) {
                namespace.push(loaded);
            }
        }

        for spec in &imports {
            for file in resolve_import(&base, spec, &canonical)? {
                let imported = self.load_file(ctx, &file)?;
                if !namespace.contains(&imported) {
                    namespace.push(imported);
                }
            }
        }
        ctx.module_mut(id).namespace = namespace;
        Ok(id)
    }

    /// Parse and register the embedded core-types module
    fn ensure_core(&self, ctx: &mut CompilationContext) -> Result<ModuleId> {
        if let Some(id) = ctx.core_module {
            return Ok(id);
        }
        let ast = parser::parse_module(CORE_SOURCE).map_err(|message| Error::Parse {
            path: PathBuf::from(CORE_NAMESPACE),
            message,
        })?;
        let id = ctx.add_module(PathBuf::from(CORE_NAMESPACE), ast);
        ctx.core_module = Some(id);
        Ok(id)
    }

    /// Drop the parsed AST as pretty JSON next to the other build artifacts.
    /// Failure is never fatal; a build must not break over a debug file.
    fn write_debug_artifact(&self, ctx: &CompilationContext, id: ModuleId) {
        let Some(dir) = &self.config.debug_dir else {
            return;
        };
        let module = ctx.module(id);
        let stem = module
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string());
        let target = dir.join(format!("{stem}_{id}.ast.json"));

        let written = std::fs::create_dir_all(dir)
            .map_err(|e| e.to_string())
            .and_then(|_| serde_json::to_string_pretty(&module.ast).map_err(|e| e.to_string()))
            .and_then(|json| std::fs::write(&target, json).map_err(|e| e.to_string()));
        if let Err(message) = written {
            warn!(path = %target.display(), %message, "debug artifact skipped");
        }
    }
}

/// Expand one import spec into a sorted list of module files
fn resolve_import(base: &Path, spec: &str, from: &Path) -> Result<Vec<PathBuf>> {
    let empty = |spec: &str| Error::ImportEmpty {
        spec: spec.to_string(),
        module: from.to_path_buf(),
    };

    if let Some(dir) = spec.strip_suffix("**").map(|d| d.trim_end_matches('/')) {
        let mut files = Vec::new();
        collect_recursive(&base.join(dir), &mut files)?;
        files.sort();
        if files.is_empty() {
            return Err(empty(spec));
        }
        return Ok(files);
    }
    if let Some(dir) = spec.strip_suffix('*').map(|d| d.trim_end_matches('/')) {
        let files = collect_dir(&base.join(dir))?;
        if files.is_empty() {
            return Err(empty(spec));
        }
        return Ok(files);
    }

    let mut path = base.join(spec);
    if path.is_dir() {
        let files = collect_dir(&path)?;
        if files.is_empty() {
            return Err(empty(spec));
        }
        return Ok(files);
    }
    if path.extension().is_none() {
        path.set_extension("ool");
    }
    if !path.is_file() {
        return Err(empty(spec));
    }
    Ok(vec![path])
}

fn is_module_file(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == "ool")
}

/// Module files directly inside `dir`, sorted for deterministic load order
fn collect_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|source| Error::ModuleRead {
        path: dir.to_path_buf(),
        source,
    })? {
        let path = entry?.path();
        if path.is_file() && is_module_file(&path) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn collect_recursive(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir).map_err(|source| Error::ModuleRead {
        path: dir.to_path_buf(),
        source,
    })? {
        let path = entry?.path();
        if path.is_dir() {
            collect_recursive(&path, out)?;
        } else if is_module_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}
