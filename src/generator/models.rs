//! Model source emission
//!
//! Writes one generated source file per compiled entity and one stub file
//! per entity that references user functors. Generated model files are
//! overwritten on every run; stub files are written once and then left
//! alone, since they exist to be filled in by hand.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::ast::FunctorKind;
use crate::compiler::{EntityPlan, FunctorStub};
use crate::error::Result;
use crate::naming;

/// Write model files for every compiled entity under `models_dir`
pub fn write_models(models_dir: &Path, plans: &[EntityPlan]) -> Result<()> {
    fs::create_dir_all(models_dir)?;
    for plan in plans {
        let path = models_dir.join(format!("{}.rs", naming::sql_name(&plan.name)));
        fs::write(&path, model_source(plan))?;
        debug!(entity = %plan.name, path = %path.display(), "wrote model");
    }
    write_stubs(&models_dir.join("functors"), plans)?;
    info!(models = plans.len(), dir = %models_dir.display(), "models written");
    Ok(())
}

fn model_source(plan: &EntityPlan) -> String {
    let mut out = String::new();
    out.push_str(&format!("// Generated model for entity '{}'.\n", plan.name));
    out.push_str("// Regenerated on every build, do not edit.\n");
    for rule in &plan.rules {
        out.push_str(&format!("// rule {:?}: {}\n", rule.scenario, rule.description));
    }
    out.push('\n');
    out.push_str(&plan.source);
    out
}

/// Write one stub module per entity with user functors, skipping files
/// that already exist.
fn write_stubs(stub_dir: &Path, plans: &[EntityPlan]) -> Result<()> {
    let mut by_entity: BTreeMap<String, Vec<&FunctorStub>> = BTreeMap::new();
    for plan in plans {
        for stub in &plan.stubs {
            by_entity.entry(stub.entity.clone()).or_default().push(stub);
        }
    }
    if by_entity.is_empty() {
        return Ok(());
    }
    fs::create_dir_all(stub_dir)?;
    for (entity, stubs) in &by_entity {
        let path = stub_dir.join(format!("{}.rs", naming::sql_name(entity)));
        if path.exists() {
            debug!(path = %path.display(), "stub file exists, keeping");
            continue;
        }
        fs::write(&path, stub_source(entity, stubs))?;
        info!(entity, path = %path.display(), "wrote functor stubs");
    }
    Ok(())
}

fn stub_source(entity: &str, stubs: &[&FunctorStub]) -> String {
    let mut out = String::new();
    out.push_str(&format!("// Functor implementations for entity '{entity}'.\n"));
    out.push_str("// Written once; fill in the bodies and keep the signatures.\n\n");
    out.push_str("use super::{invalid, Result, Value};\n");
    for stub in stubs {
        out.push('\n');
        out.push_str(&format!(
            "/// `{}` ({}) on field `{}`\n",
            stub.name, stub.kind, stub.field
        ));
        let mut params = vec!["value: Value".to_string()];
        for i in 1..=stub.arity {
            params.push(format!("arg{i}: Value"));
        }
        let ret = match stub.kind {
            FunctorKind::Validator => "Result<bool>",
            _ => "Result<Value>",
        };
        out.push_str(&format!(
            "pub fn {}({}) -> {} {{\n    todo!(\"implement {}\")\n}}\n",
            stub.fn_name(),
            params.join(", "),
            ret,
            stub.name
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::{EntityPlan, FunctorStub};
    use crate::features::{RuleScenario, RuntimeRule};

    fn plan(name: &str, stubs: Vec<FunctorStub>) -> EntityPlan {
        EntityPlan {
            id: crate::context::EntityId(0),
            name: name.to_string(),
            order: vec!["code".to_string()],
            guards: Vec::new(),
            stubs,
            rules: vec![RuntimeRule {
                scenario: RuleScenario::PostCreate,
                description: "stamp creation time".to_string(),
            }],
            source: "pub fn apply_order(record: &mut Record) -> Result<()> {\n}\n".to_string(),
        }
    }

    fn stub(name: &str) -> FunctorStub {
        FunctorStub {
            name: name.to_string(),
            kind: crate::ast::FunctorKind::Validator,
            entity: "order".to_string(),
            field: "code".to_string(),
            arity: 0,
        }
    }

    #[test]
    fn model_file_carries_rules_and_source() {
        let dir = tempfile::tempdir().unwrap();
        write_models(dir.path(), &[plan("order", Vec::new())]).unwrap();
        let text = std::fs::read_to_string(dir.path().join("order.rs")).unwrap();
        assert!(text.contains("PostCreate: stamp creation time"));
        assert!(text.contains("pub fn apply_order"));
    }

    #[test]
    fn stub_file_written_for_user_functors() {
        let dir = tempfile::tempdir().unwrap();
        write_models(dir.path(), &[plan("order", vec![stub("checkCode")])]).unwrap();
        let text =
            std::fs::read_to_string(dir.path().join("functors").join("order.rs")).unwrap();
        assert!(text.contains("pub fn check_code(value: Value) -> Result<bool>"));
    }

    #[test]
    fn existing_stub_file_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let stub_path = dir.path().join("functors").join("order.rs");
        std::fs::create_dir_all(stub_path.parent().unwrap()).unwrap();
        std::fs::write(&stub_path, "// hand written\n").unwrap();
        write_models(dir.path(), &[plan("order", vec![stub("checkCode")])]).unwrap();
        assert_eq!(std::fs::read_to_string(&stub_path).unwrap(), "// hand written\n");
    }

    #[test]
    fn model_file_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("order.rs"), "stale").unwrap();
        write_models(dir.path(), &[plan("order", Vec::new())]).unwrap();
        let text = std::fs::read_to_string(dir.path().join("order.rs")).unwrap();
        assert!(text.contains("Generated model"));
    }
}
