//! Functor resolution
//!
//! Builtin functors live in three static registries, one per kind; a call
//! that misses all of them is a user functor and produces a stub record so
//! the generator can emit a skeleton for it. Builtins get their argument
//! count checked here; user functors are checked only at their call shape
//! (the author owns the implementation).

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::ast::{FunctorCall, FunctorKind};
use crate::error::{Error, Result};
use crate::naming;

/// Signature of a builtin functor. Arguments count the extra arguments
/// only; the in-flight field value is always implicit.
#[derive(Debug, Clone, Copy)]
pub struct Builtin {
    pub name: &'static str,
    pub kind: FunctorKind,
    pub min_args: usize,
    pub max_args: Option<usize>,
}

const BUILTINS: &[Builtin] = &[
    // validators
    Builtin { name: "notNull", kind: FunctorKind::Validator, min_args: 0, max_args: Some(0) },
    Builtin { name: "notEmpty", kind: FunctorKind::Validator, min_args: 0, max_args: Some(0) },
    Builtin { name: "isAlpha", kind: FunctorKind::Validator, min_args: 0, max_args: Some(0) },
    Builtin { name: "isAlphanumeric", kind: FunctorKind::Validator, min_args: 0, max_args: Some(0) },
    Builtin { name: "isNumeric", kind: FunctorKind::Validator, min_args: 0, max_args: Some(0) },
    Builtin { name: "isEmail", kind: FunctorKind::Validator, min_args: 0, max_args: Some(0) },
    Builtin { name: "isUrl", kind: FunctorKind::Validator, min_args: 0, max_args: Some(0) },
    Builtin { name: "minLength", kind: FunctorKind::Validator, min_args: 1, max_args: Some(1) },
    Builtin { name: "maxLength", kind: FunctorKind::Validator, min_args: 1, max_args: Some(1) },
    Builtin { name: "min", kind: FunctorKind::Validator, min_args: 1, max_args: Some(1) },
    Builtin { name: "max", kind: FunctorKind::Validator, min_args: 1, max_args: Some(1) },
    Builtin { name: "between", kind: FunctorKind::Validator, min_args: 2, max_args: Some(2) },
    Builtin { name: "matches", kind: FunctorKind::Validator, min_args: 1, max_args: Some(1) },
    Builtin { name: "oneOf", kind: FunctorKind::Validator, min_args: 1, max_args: None },
    // modifiers
    Builtin { name: "trim", kind: FunctorKind::Modifier, min_args: 0, max_args: Some(0) },
    Builtin { name: "toLower", kind: FunctorKind::Modifier, min_args: 0, max_args: Some(0) },
    Builtin { name: "toUpper", kind: FunctorKind::Modifier, min_args: 0, max_args: Some(0) },
    Builtin { name: "capitalize", kind: FunctorKind::Modifier, min_args: 0, max_args: Some(0) },
    Builtin { name: "padLeft", kind: FunctorKind::Modifier, min_args: 1, max_args: Some(2) },
    Builtin { name: "padRight", kind: FunctorKind::Modifier, min_args: 1, max_args: Some(2) },
    Builtin { name: "truncate", kind: FunctorKind::Modifier, min_args: 1, max_args: Some(1) },
    Builtin { name: "round", kind: FunctorKind::Modifier, min_args: 0, max_args: Some(1) },
    Builtin { name: "abs", kind: FunctorKind::Modifier, min_args: 0, max_args: Some(0) },
    // composers
    Builtin { name: "concat", kind: FunctorKind::Composer, min_args: 1, max_args: None },
    Builtin { name: "slugify", kind: FunctorKind::Composer, min_args: 1, max_args: Some(1) },
    Builtin { name: "copyOf", kind: FunctorKind::Composer, min_args: 1, max_args: Some(1) },
    Builtin { name: "now", kind: FunctorKind::Composer, min_args: 0, max_args: Some(0) },
];

static REGISTRY: Lazy<BTreeMap<(FunctorKind, &'static str), &'static Builtin>> =
    Lazy::new(|| BUILTINS.iter().map(|b| ((b.kind, b.name), b)).collect());

pub fn lookup(kind: FunctorKind, name: &str) -> Option<&'static Builtin> {
    REGISTRY.get(&(kind, name)).copied()
}

/// How a call resolved
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Builtin(&'static str),
    /// User functor; the generator emits a stub for it
    User,
}

/// A user functor the author still has to implement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctorStub {
    pub name: String,
    pub kind: FunctorKind,
    pub entity: String,
    pub field: String,
    /// Extra arguments beyond the implicit value
    pub arity: usize,
}

impl FunctorStub {
    /// Function name in generated source
    pub fn fn_name(&self) -> String {
        naming::sql_name(&self.name)
    }
}

/// Resolve one call, checking builtin arity
pub fn resolve(
    call: &FunctorCall,
    kind: FunctorKind,
    entity: &str,
    field: &str,
) -> Result<Resolved> {
    match lookup(kind, &call.name) {
        Some(builtin) => {
            let got = call.args.len();
            let fits = got >= builtin.min_args
                && builtin.max_args.map_or(true, |max| got <= max);
            if !fits {
                let expected = match builtin.max_args {
                    Some(max) if max == builtin.min_args => builtin.min_args.to_string(),
                    Some(max) => format!("{}..{max}", builtin.min_args),
                    None => format!("{}+", builtin.min_args),
                };
                return Err(Error::FunctorArity {
                    functor: call.name.clone(),
                    entity: entity.to_string(),
                    field: field.to_string(),
                    expected,
                    got,
                });
            }
            Ok(Resolved::Builtin(builtin.name))
        }
        None => Ok(Resolved::User),
    }
}
