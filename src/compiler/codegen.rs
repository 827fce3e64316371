//! Pipeline code rendering
//!
//! Renders a field's functor pipeline into source text for the generated
//! data-access layer. The text itself is advisory; what the rest of the
//! system depends on is the ordering, the merge rules and the error
//! messages:
//!
//! * adjacent validators of one stage collapse into a single AND-joined
//!   check with one failure message naming the field and the entity
//! * adjacent modifiers of one stage nest, each call wrapping the previous
//!   result
//! * stage 0 runs before stage 1, the composer last

use crate::ast::{Arg, FunctorCall, FunctorKind, Literal};
use crate::compiler::functors::{self, FunctorStub, Resolved};
use crate::error::Result;
use crate::model::entity::Entity;
use crate::model::field::Field;
use crate::naming;

// =============================================================================
// CODE BLOCK
// =============================================================================

/// Indentation-tracking line builder for generated source
#[derive(Debug, Default)]
pub struct CodeBlock {
    lines: Vec<String>,
    indent: usize,
}

impl CodeBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.lines
            .push(format!("{}{}", "    ".repeat(self.indent), text.as_ref()));
        self
    }

    pub fn blank(&mut self) -> &mut Self {
        self.lines.push(String::new());
        self
    }

    /// Emit a line and indent the following ones
    pub fn open(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.line(text);
        self.indent += 1;
        self
    }

    /// Dedent, then emit the closing line
    pub fn close(&mut self, text: impl AsRef<str>) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self.line(text)
    }

    /// Dedent without emitting a line; for `else if` chains
    pub fn dedent(&mut self) -> &mut Self {
        self.indent = self.indent.saturating_sub(1);
        self
    }

    pub fn extend(&mut self, other: CodeBlock) -> &mut Self {
        let prefix = "    ".repeat(self.indent);
        for line in other.lines {
            if line.is_empty() {
                self.lines.push(line);
            } else {
                self.lines.push(format!("{prefix}{line}"));
            }
        }
        self
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }
}

// =============================================================================
// EXPRESSION RENDERING
// =============================================================================

/// Render a call argument as generated-source text
pub fn render_arg(arg: &Arg) -> String {
    match arg {
        Arg::Literal(Literal::String(s)) => format!("\"{}\"", s.replace('"', "\\\"")),
        Arg::Literal(lit) => lit.to_dsl_string(),
        Arg::FieldRef(name) => naming::sql_name(name),
        Arg::Param(name) => naming::sql_name(name),
    }
}

/// Render one functor call applied to `value`
pub fn render_call(call: &FunctorCall, kind: FunctorKind, owner: &str, value: &str) -> String {
    let mut args = vec![value.to_string()];
    args.extend(call.args.iter().map(render_arg));
    let joined = args.join(", ");

    match functors::lookup(kind, &call.name) {
        Some(builtin) => format!("ops::{}({joined})", naming::sql_name(builtin.name)),
        None => format!(
            "functors::{}::{}({joined})",
            naming::sql_name(owner),
            naming::sql_name(&call.name)
        ),
    }
}

// =============================================================================
// FIELD PIPELINE
// =============================================================================

/// Resolve and render one field's complete pipeline.
///
/// Appends any unresolved user functors to `stubs`.
pub fn render_field_pipeline(
    entity: &Entity,
    field: &Field,
    stubs: &mut Vec<FunctorStub>,
) -> Result<CodeBlock> {
    let mut code = CodeBlock::new();
    let value = field.sql_name();

    render_validators(entity, field, &field.validators0, &value, stubs, &mut code)?;
    render_modifiers(entity, field, &field.modifiers0, &value, stubs, &mut code)?;
    render_validators(entity, field, &field.validators1, &value, stubs, &mut code)?;
    render_modifiers(entity, field, &field.modifiers1, &value, stubs, &mut code)?;

    if let Some(composer) = &field.composer {
        track(entity, field, composer, FunctorKind::Composer, stubs)?;
        let args: Vec<String> = composer.args.iter().map(render_arg).collect();
        let expr = match functors::lookup(FunctorKind::Composer, &composer.name) {
            Some(builtin) => format!("ops::{}({})", naming::sql_name(builtin.name), args.join(", ")),
            None => format!(
                "functors::{}::{}({})",
                naming::sql_name(&entity.name),
                naming::sql_name(&composer.name),
                args.join(", ")
            ),
        };
        code.line(format!("let {value} = {expr};"));
    }
    Ok(code)
}

/// One AND-joined check per validator stage
fn render_validators(
    entity: &Entity,
    field: &Field,
    calls: &[FunctorCall],
    value: &str,
    stubs: &mut Vec<FunctorStub>,
    code: &mut CodeBlock,
) -> Result<()> {
    if calls.is_empty() {
        return Ok(());
    }
    let mut checks = Vec::with_capacity(calls.len());
    for call in calls {
        track(entity, field, call, FunctorKind::Validator, stubs)?;
        checks.push(render_call(call, FunctorKind::Validator, &entity.name, value));
    }
    code.open(format!("if !({}) {{", checks.join(" && ")));
    code.line(format!(
        "return Err(invalid(\"{}\", \"{}\"));",
        field.display, entity.display
    ));
    code.close("}");
    Ok(())
}

/// Modifiers of one stage nest into a single assignment
fn render_modifiers(
    entity: &Entity,
    field: &Field,
    calls: &[FunctorCall],
    value: &str,
    stubs: &mut Vec<FunctorStub>,
    code: &mut CodeBlock,
) -> Result<()> {
    if calls.is_empty() {
        return Ok(());
    }
    let mut expr = value.to_string();
    for call in calls {
        track(entity, field, call, FunctorKind::Modifier, stubs)?;
        expr = render_call(call, FunctorKind::Modifier, &entity.name, &expr);
    }
    code.line(format!("let {value} = {expr};"));
    Ok(())
}

/// Arity-check a call; record a stub when it is a user functor
fn track(
    entity: &Entity,
    field: &Field,
    call: &FunctorCall,
    kind: FunctorKind,
    stubs: &mut Vec<FunctorStub>,
) -> Result<()> {
    if let Resolved::User = functors::resolve(call, kind, &entity.name, &field.name)? {
        let stub = FunctorStub {
            name: call.name.clone(),
            kind,
            entity: entity.name.clone(),
            field: field.name.clone(),
            arity: call.args.len(),
        };
        if !stubs.contains(&stub) {
            stubs.push(stub);
        }
    }
    Ok(())
}
