//! Interface compilation
//!
//! An interface body compiles to one function in the generated data-access
//! source: parameter pipelines first, then the operations. Case ladders are
//! rendered in reverse declaration order, so the last matching `when` wins;
//! a ladder without an `else` falls through to an unexpected-state error.

use crate::ast::{Arg, Cond, IfaceOp, InterfaceDecl};
use crate::compiler::codegen::{self, CodeBlock};
use crate::compiler::functors::{self, FunctorStub, Resolved};
use crate::ast::FunctorKind;
use crate::context::CompilationContext;
use crate::error::Result;
use crate::linker;
use crate::model::entity::Entity;
use crate::naming;

/// Render one interface into generated source
pub fn render_interface(
    ctx: &mut CompilationContext,
    entity: &Entity,
    iface: &InterfaceDecl,
    stubs: &mut Vec<FunctorStub>,
) -> Result<CodeBlock> {
    let mut code = CodeBlock::new();

    let params: Vec<String> = iface
        .params
        .iter()
        .map(|p| naming::sql_name(&p.name))
        .collect();
    let signature = if params.is_empty() {
        String::new()
    } else {
        format!(", {}", params.join(", "))
    };
    code.open(format!(
        "pub fn {}(store: &mut dyn Store{signature}) -> Result<Value> {{",
        naming::sql_name(&iface.name)
    ));

    // Parameter pipelines run before anything touches the store.
    for param in &iface.params {
        // Type references in parameter lists must resolve like field types.
        linker::resolve_type_ref(ctx, entity.module, &param.type_ref, &mut Vec::new())?;
        let value = naming::sql_name(&param.name);

        if !param.validators0.is_empty() {
            let mut checks = Vec::new();
            for call in &param.validators0 {
                track_param(entity, &param.name, call, FunctorKind::Validator, stubs)?;
                checks.push(codegen::render_call(
                    call,
                    FunctorKind::Validator,
                    &entity.name,
                    &value,
                ));
            }
            code.open(format!("if !({}) {{", checks.join(" && ")));
            code.line(format!(
                "return Err(invalid(\"{}\", \"{}\"));",
                naming::display_name(&param.name),
                entity.display
            ));
            code.close("}");
        }
        if !param.modifiers0.is_empty() {
            let mut expr = value.clone();
            for call in &param.modifiers0 {
                track_param(entity, &param.name, call, FunctorKind::Modifier, stubs)?;
                expr = codegen::render_call(call, FunctorKind::Modifier, &entity.name, &expr);
            }
            code.line(format!("let {value} = {expr};"));
        }
    }

    for op in &iface.ops {
        render_op(entity, iface, op, &mut code);
    }

    code.line(format!(
        "Err(unexpected_state(\"{}\", \"{}\"))",
        iface.name, entity.display
    ));
    code.close("}");
    Ok(code)
}

fn render_op(entity: &Entity, iface: &InterfaceDecl, op: &IfaceOp, code: &mut CodeBlock) {
    match op {
        IfaceOp::Find { cond } => {
            let (where_sql, binds) = cond_sql(cond);
            code.line(format!(
                "let record = store.find_one(\"{}\", \"{where_sql}\", &[{}])?;",
                entity.table_name(),
                binds.join(", ")
            ));
        }
        IfaceOp::Return { value } => {
            code.line(format!("return Ok(value_of({}));", codegen::render_arg(value)));
        }
        IfaceOp::Error { message } => {
            code.line(format!(
                "return Err(domain_error(\"{}\"));",
                message.replace('"', "\\\"")
            ));
        }
        IfaceOp::Cases { whens, otherwise } => {
            let fallback = format!(
                "return Err(unexpected_state(\"{}\", \"{}\"));",
                iface.name, entity.display
            );
            if whens.is_empty() {
                match otherwise {
                    Some(body) => render_op(entity, iface, body, code),
                    None => {
                        code.line(fallback);
                    }
                }
                return;
            }
            // Reverse declaration order: the last written `when` is checked
            // first, so it wins on overlap.
            let mut first = true;
            for (cond, body) in whens.iter().rev() {
                let keyword = if first { "if" } else { "} else if" };
                first = false;
                code.open(format!("{keyword} {} {{", cond_expr(cond)));
                render_op(entity, iface, body, code);
                code.dedent();
            }
            code.open("} else {");
            match otherwise {
                Some(body) => render_op(entity, iface, body, code),
                None => {
                    code.line(fallback);
                }
            }
            code.close("}");
        }
    }
}

/// Condition as a SQL where-clause with positional binds
fn cond_sql(cond: &Cond) -> (String, Vec<String>) {
    match cond {
        Cond::Cmp { field, op, value } => (
            format!("{} {} ?", naming::sql_name(field), op.sql()),
            vec![bind_of(value)],
        ),
        Cond::And(a, b) => {
            let (sa, mut ba) = cond_sql(a);
            let (sb, bb) = cond_sql(b);
            ba.extend(bb);
            (format!("({sa}) AND ({sb})"), ba)
        }
        Cond::Or(a, b) => {
            let (sa, mut ba) = cond_sql(a);
            let (sb, bb) = cond_sql(b);
            ba.extend(bb);
            (format!("({sa}) OR ({sb})"), ba)
        }
    }
}

fn bind_of(arg: &Arg) -> String {
    codegen::render_arg(arg)
}

/// Condition as a boolean expression over the fetched record
fn cond_expr(cond: &Cond) -> String {
    match cond {
        Cond::Cmp { field, op, value } => format!(
            "record.{} {} {}",
            naming::sql_name(field),
            op.dsl(),
            codegen::render_arg(value)
        ),
        Cond::And(a, b) => format!("({}) && ({})", cond_expr(a), cond_expr(b)),
        Cond::Or(a, b) => format!("({}) || ({})", cond_expr(a), cond_expr(b)),
    }
}

fn track_param(
    entity: &Entity,
    param: &str,
    call: &crate::ast::FunctorCall,
    kind: FunctorKind,
    stubs: &mut Vec<FunctorStub>,
) -> Result<()> {
    if let Resolved::User = functors::resolve(call, kind, &entity.name, param)? {
        let stub = FunctorStub {
            name: call.name.clone(),
            kind,
            entity: entity.name.clone(),
            field: param.to_string(),
            arity: call.args.len(),
        };
        if !stubs.contains(&stub) {
            stubs.push(stub);
        }
    }
    Ok(())
}
