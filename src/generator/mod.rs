//! Output generation
//!
//! Takes linked, expanded, compiled schemas and writes the deliverables:
//! DDL scripts (tables, then foreign keys, then view procedures) under the
//! configured scripts directory and generated model sources under the
//! models directory.

pub mod ddl;
pub mod models;
pub mod procedures;
pub mod reverse;
pub mod types;

use std::fs;

use tracing::info;

use crate::compiler;
use crate::config::BuildConfig;
use crate::context::CompilationContext;
use crate::error::Result;
use crate::naming;

/// Write every artifact for every schema in the context
pub fn generate(ctx: &mut CompilationContext, config: &BuildConfig) -> Result<()> {
    for index in 0..ctx.schemas.len() {
        generate_schema(ctx, config, index)?;
    }
    Ok(())
}

fn generate_schema(ctx: &mut CompilationContext, config: &BuildConfig, index: usize) -> Result<()> {
    let plans = compiler::compile_schema(ctx, index)?;
    let schema = ctx.schemas[index].clone();

    let scripts = config.scripts_dir.join(naming::sql_name(&schema.name));
    fs::create_dir_all(&scripts)?;
    fs::write(scripts.join("entities.sql"), ddl::entities_sql(ctx, &schema)?)?;
    fs::write(scripts.join("relations.sql"), ddl::relations_sql(ctx, &schema)?)?;
    fs::write(
        scripts.join("procedures.sql"),
        procedures::procedures_sql(ctx, &schema)?,
    )?;

    let models = config.models_dir.join(naming::sql_name(&schema.name));
    models::write_models(&models, &plans)?;

    info!(
        schema = %schema.name,
        entities = schema.entities.len(),
        views = schema.views.len(),
        "generated schema artifacts"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expansion;
    use crate::linker;
    use crate::parser::parse_module;
    use std::path::PathBuf;

    #[test]
    fn schema_artifacts_land_in_configured_dirs() {
        let mut ctx = CompilationContext::new();
        let core = ctx.add_module(
            PathBuf::from("oolong:core"),
            parse_module(include_str!("../dsl/core.ool")).unwrap(),
        );
        ctx.core_module = Some(core);
        let id = ctx.add_module(
            PathBuf::from("m.ool"),
            parse_module(
                "entity vendor { with autoId has name : shortText }\n\
                 view vendors { entity vendor order [ name asc ] }\n\
                 schema shop { entities [ vendor ] views [ vendors ] }",
            )
            .unwrap(),
        );
        ctx.module_mut(id).namespace = vec![core];
        linker::link(&mut ctx).unwrap();
        expansion::expand(&mut ctx).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let config = BuildConfig {
            scripts_dir: dir.path().join("sql"),
            models_dir: dir.path().join("models"),
            ..BuildConfig::default()
        };
        generate(&mut ctx, &config).unwrap();

        let sql = dir.path().join("sql").join("shop");
        assert!(sql.join("entities.sql").exists());
        assert!(sql.join("relations.sql").exists());
        let procs = std::fs::read_to_string(sql.join("procedures.sql")).unwrap();
        assert!(procs.contains("view_vendors"));
        assert!(dir.path().join("models").join("shop").join("vendor.rs").exists());
    }
}
