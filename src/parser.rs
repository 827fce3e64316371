//! nom parser for the entity-definition language
//!
//! One `fn` per grammar production, all working over `&str` with
//! `VerboseError` so the public entry point can render a readable message.
//! The parser is purely syntactic: every cross-file reference stays a plain
//! name for the linker to resolve.
//!
//! Line comments start with `#`. Field/entity display comments use the
//! `-- "text"` form and are kept on the AST.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, tag, take_while},
    character::complete::{alpha1, alphanumeric1, char, digit1, multispace1, none_of},
    combinator::{all_consuming, map, opt, recognize, value},
    error::{convert_error, ErrorKind, ParseError as NomParseError, VerboseError},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, preceded, tuple},
    IResult,
};

use crate::ast::*;

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

// =============================================================================
// PUBLIC API
// =============================================================================

/// Parse one complete DSL source unit.
///
/// Returns a raw [`ModuleAst`] where all references are still names.
/// The error string is the rendered `VerboseError` trace.
pub fn parse_module(input: &str) -> Result<ModuleAst, String> {
    match all_consuming(module)(input) {
        Ok((_, ast)) => Ok(ast),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(convert_error(input, e)),
        Err(nom::Err::Incomplete(_)) => Err("incomplete input".to_string()),
    }
}

// =============================================================================
// LEXICAL HELPERS
// =============================================================================

/// Skip whitespace and `#` line comments
fn sp(input: &str) -> PResult<&str> {
    recognize(many0(alt((multispace1, line_comment))))(input)
}

fn line_comment(input: &str) -> PResult<&str> {
    recognize(pair(char('#'), take_while(|c| c != '\n')))(input)
}

fn ident(input: &str) -> PResult<&str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

/// An identifier token, whitespace-skipping
fn name(input: &str) -> PResult<&str> {
    preceded(sp, ident)(input)
}

/// A punctuation token, whitespace-skipping
fn sym<'a>(s: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input| preceded(sp, tag(s))(input)
}

/// A reserved word token; backtracks when the next identifier differs
fn keyword<'a>(k: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    move |input| {
        let (rest, id) = name(input)?;
        if id == k {
            Ok((rest, id))
        } else {
            Err(nom::Err::Error(VerboseError::from_error_kind(
                input,
                ErrorKind::Tag,
            )))
        }
    }
}

fn string_lit(input: &str) -> PResult<String> {
    preceded(
        sp,
        delimited(
            char('"'),
            map(
                opt(escaped_transform(
                    none_of("\\\""),
                    '\\',
                    alt((
                        value('"', char('"')),
                        value('\\', char('\\')),
                        value('\n', char('n')),
                        value('\t', char('t')),
                    )),
                )),
                Option::unwrap_or_default,
            ),
            char('"'),
        ),
    )(input)
}

fn number_lit(input: &str) -> PResult<Literal> {
    let (rest, text) = preceded(
        sp,
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
        ))),
    )(input)?;

    let lit = if text.contains('.') {
        text.parse().ok().map(Literal::Float)
    } else {
        text.parse().ok().map(Literal::Integer)
    };
    match lit {
        Some(lit) => Ok((rest, lit)),
        None => Err(nom::Err::Error(VerboseError::from_error_kind(
            input,
            ErrorKind::Digit,
        ))),
    }
}

fn literal(input: &str) -> PResult<Literal> {
    alt((
        map(string_lit, Literal::String),
        number_lit,
        value(Literal::Boolean(true), keyword("true")),
        value(Literal::Boolean(false), keyword("false")),
        value(Literal::Null, keyword("null")),
    ))(input)
}

/// `-- "display text"` trailing comment
fn display_comment(input: &str) -> PResult<String> {
    preceded(sym("--"), string_lit)(input)
}

// =============================================================================
// ATTRIBUTES AND ARGUMENTS
// =============================================================================

/// One item of an attribute list: a bare identifier reads as a string
fn attr_item(input: &str) -> PResult<Literal> {
    alt((literal, map(name, |s| Literal::String(s.to_string()))))(input)
}

fn attr_value(input: &str) -> PResult<AttrValue> {
    alt((
        map(
            delimited(sym("["), many0(attr_item), sym("]")),
            AttrValue::Many,
        ),
        map(literal, AttrValue::One),
    ))(input)
}

/// `maxLength: 60`
fn attr(input: &str) -> PResult<(String, AttrValue)> {
    map(
        tuple((name, sym(":"), attr_value)),
        |(key, _, val)| (key.to_string(), val),
    )(input)
}

fn attr_list(input: &str) -> PResult<Vec<(String, AttrValue)>> {
    separated_list0(sym(","), attr)(input)
}

/// `text(maxLength: 60)` or just `money`
fn type_ref(input: &str) -> PResult<TypeRef> {
    map(
        pair(name, opt(delimited(sym("("), attr_list, sym(")")))),
        |(n, attrs)| TypeRef {
            name: n.to_string(),
            attrs: attrs.unwrap_or_default(),
        },
    )(input)
}

/// Functor/condition argument: literal, `@field`, or `$param`
fn arg(input: &str) -> PResult<Arg> {
    alt((
        map(preceded(sym("@"), ident), |n| Arg::FieldRef(n.to_string())),
        map(preceded(sym("$"), ident), |n| Arg::Param(n.to_string())),
        map(literal, Arg::Literal),
    ))(input)
}

fn arg_list(input: &str) -> PResult<Vec<Arg>> {
    separated_list0(sym(","), arg)(input)
}

// =============================================================================
// FUNCTORS
// =============================================================================

/// Which pipeline slot a parsed functor call lands in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctorSlot {
    Validator0,
    Modifier0,
    Validator1,
    Modifier1,
    Composer,
}

/// `|~isEmail`, `|>trim`, `|~~notNull`, `|>>padLeft(8)`, `|=concat(@a, @b)`
fn functor(input: &str) -> PResult<(FunctorSlot, FunctorCall)> {
    let (input, slot) = preceded(
        sp,
        alt((
            value(FunctorSlot::Validator1, tag("|~~")),
            value(FunctorSlot::Modifier1, tag("|>>")),
            value(FunctorSlot::Validator0, tag("|~")),
            value(FunctorSlot::Modifier0, tag("|>")),
            value(FunctorSlot::Composer, tag("|=")),
        )),
    )(input)?;

    let (input, fname) = functor_name(input)?;
    let (input, args) = opt(delimited(sym("("), arg_list, sym(")")))(input)?;

    Ok((
        input,
        (
            slot,
            FunctorCall {
                name: fname,
                args: args.unwrap_or_default(),
                span: Span::default(),
            },
        ),
    ))
}

/// Local name or `entity.function` cross-reference
fn functor_name(input: &str) -> PResult<String> {
    map(
        preceded(sp, recognize(pair(ident, opt(pair(char('.'), ident))))),
        |s: &str| s.to_string(),
    )(input)
}

// =============================================================================
// FIELDS AND RELATIONS
// =============================================================================

/// Trailing modifiers of an ordinary field: flags, default, functors
enum FieldTail {
    Flag(FieldFlag),
    Default(Literal),
    Functor(FunctorSlot, FunctorCall),
}

fn field_flag(input: &str) -> PResult<FieldFlag> {
    let (rest, id) = name(input)?;
    let flag = match id {
        "optional" => FieldFlag::Optional,
        "readOnly" => FieldFlag::ReadOnly,
        "writeOnce" => FieldFlag::WriteOnce,
        "auto" => FieldFlag::Auto,
        "dbDefault" => FieldFlag::DbDefault,
        _ => {
            return Err(nom::Err::Error(VerboseError::from_error_kind(
                input,
                ErrorKind::Tag,
            )))
        }
    };
    Ok((rest, flag))
}

fn field_tail(input: &str) -> PResult<FieldTail> {
    alt((
        map(functor, |(slot, call)| FieldTail::Functor(slot, call)),
        map(
            preceded(keyword("default"), delimited(sym("("), literal, sym(")"))),
            FieldTail::Default,
        ),
        map(field_flag, FieldTail::Flag),
    ))(input)
}

/// Item inside an `entity` block
enum EntityItem {
    Feature(FeatureCall),
    Field(FieldDecl),
    Relation(RelationDecl),
    Key(Vec<String>),
    Index(IndexDecl),
    Interface(InterfaceDecl),
}

/// `with autoId` / `with atLeastOneNotNull([email mobile])`
fn feature_item(input: &str) -> PResult<EntityItem> {
    let (input, _) = keyword("with")(input)?;
    let (input, fname) = name(input)?;
    let (input, parens) = opt(delimited(
        sym("("),
        alt((
            map(delimited(sym("["), many0(name), sym("]")), |items| {
                (vec![], items.iter().map(|s| s.to_string()).collect())
            }),
            map(attr_list, |attrs| (attrs, vec![])),
        )),
        sym(")"),
    ))(input)?;

    let (attrs, list) = parens.unwrap_or_default();
    Ok((
        input,
        EntityItem::Feature(FeatureCall {
            name: fname.to_string(),
            attrs,
            list,
            span: Span::default(),
        }),
    ))
}

fn has_item(input: &str) -> PResult<EntityItem> {
    let (input, _) = keyword("has")(input)?;
    let (input, fname) = name(input)?;

    // A relation operator or a `:` type reference decides the shape.
    if let Ok((rest, op)) = rel_op(input) {
        let (rest, targets) = rel_targets(rest)?;
        let (rest, optional) = opt(keyword("optional"))(rest)?;
        let (rest, comment) = opt(display_comment)(rest)?;
        return Ok((
            rest,
            EntityItem::Relation(RelationDecl {
                field: fname.to_string(),
                op,
                targets,
                optional: optional.is_some(),
                comment,
                span: Span::default(),
            }),
        ));
    }

    let (input, _) = sym(":")(input)?;
    let (input, tref) = type_ref(input)?;
    let (input, tails) = many0(field_tail)(input)?;
    let (input, comment) = opt(display_comment)(input)?;

    let mut decl = FieldDecl {
        name: fname.to_string(),
        type_ref: tref,
        flags: vec![],
        default: None,
        validators0: vec![],
        modifiers0: vec![],
        validators1: vec![],
        modifiers1: vec![],
        composer: None,
        comment,
        span: Span::default(),
    };
    for tail in tails {
        match tail {
            FieldTail::Flag(flag) => decl.flags.push(flag),
            FieldTail::Default(lit) => decl.default = Some(lit),
            FieldTail::Functor(slot, call) => match slot {
                FunctorSlot::Validator0 => decl.validators0.push(call),
                FunctorSlot::Modifier0 => decl.modifiers0.push(call),
                FunctorSlot::Validator1 => decl.validators1.push(call),
                FunctorSlot::Modifier1 => decl.modifiers1.push(call),
                FunctorSlot::Composer => decl.composer = Some(call),
            },
        }
    }
    Ok((input, EntityItem::Field(decl)))
}

fn rel_op(input: &str) -> PResult<RelOp> {
    preceded(
        sp,
        alt((
            value(RelOp::BindsTo, tag("<->")),
            value(RelOp::ManyToMany, tag("<=>")),
            value(RelOp::BelongsTo, tag("->")),
        )),
    )(input)
}

fn rel_targets(input: &str) -> PResult<Vec<String>> {
    alt((
        map(delimited(sym("["), many1(name), sym("]")), |names| {
            names.iter().map(|s| s.to_string()).collect()
        }),
        map(name, |n| vec![n.to_string()]),
    ))(input)
}

/// `key id` or `key [productId tagId]`
fn key_item(input: &str) -> PResult<EntityItem> {
    let (input, _) = keyword("key")(input)?;
    let (input, fields) = alt((
        map(delimited(sym("["), many1(name), sym("]")), |names| {
            names.iter().map(|s| s.to_string()).collect::<Vec<_>>()
        }),
        map(name, |n| vec![n.to_string()]),
    ))(input)?;
    Ok((input, EntityItem::Key(fields)))
}

/// `index [name vendor] is unique`
fn index_item(input: &str) -> PResult<EntityItem> {
    let (input, _) = keyword("index")(input)?;
    let (input, fields) = delimited(sym("["), many1(name), sym("]"))(input)?;
    let (input, unique) = opt(pair(keyword("is"), keyword("unique")))(input)?;
    Ok((
        input,
        EntityItem::Index(IndexDecl {
            fields: fields.iter().map(|s| s.to_string()).collect(),
            unique: unique.is_some(),
            span: Span::default(),
        }),
    ))
}

// =============================================================================
// INTERFACES
// =============================================================================

fn param_decl(input: &str) -> PResult<ParamDecl> {
    let (input, pname) = name(input)?;
    let (input, _) = sym(":")(input)?;
    let (input, tref) = type_ref(input)?;
    let (input, functors) = many0(functor)(input)?;

    let mut param = ParamDecl {
        name: pname.to_string(),
        type_ref: tref,
        validators0: vec![],
        modifiers0: vec![],
        span: Span::default(),
    };
    for (slot, call) in functors {
        match slot {
            FunctorSlot::Validator0 | FunctorSlot::Validator1 => param.validators0.push(call),
            FunctorSlot::Modifier0 | FunctorSlot::Modifier1 => param.modifiers0.push(call),
            // Composers make no sense on parameters; callers get a linker
            // error later, keep the parse permissive here.
            FunctorSlot::Composer => param.modifiers0.push(call),
        }
    }
    Ok((input, param))
}

fn cmp_op(input: &str) -> PResult<CmpOp> {
    preceded(
        sp,
        alt((
            value(CmpOp::Eq, tag("==")),
            value(CmpOp::Ne, tag("!=")),
            value(CmpOp::Ge, tag(">=")),
            value(CmpOp::Le, tag("<=")),
            value(CmpOp::Gt, tag(">")),
            value(CmpOp::Lt, tag("<")),
        )),
    )(input)
}

fn cond_cmp(input: &str) -> PResult<Cond> {
    map(tuple((name, cmp_op, arg)), |(field, op, val)| Cond::Cmp {
        field: field.to_string(),
        op,
        value: val,
    })(input)
}

fn cond(input: &str) -> PResult<Cond> {
    let (input, first) = cond_cmp(input)?;
    let (input, rest) = opt(pair(
        alt((keyword("and"), keyword("or"))),
        cond,
    ))(input)?;
    match rest {
        Some(("and", right)) => Ok((input, Cond::And(Box::new(first), Box::new(right)))),
        Some((_, right)) => Ok((input, Cond::Or(Box::new(first), Box::new(right)))),
        None => Ok((input, first)),
    }
}

/// Flat op as parsed; `when`/`else` items are grouped into ladders afterwards
enum RawOp {
    Plain(IfaceOp),
    When(Cond, IfaceOp),
    Else(IfaceOp),
}

fn iface_simple_op(input: &str) -> PResult<IfaceOp> {
    alt((
        map(preceded(keyword("find"), cond), |c| IfaceOp::Find { cond: c }),
        map(preceded(keyword("return"), arg), |v| IfaceOp::Return {
            value: v,
        }),
        map(preceded(keyword("error"), string_lit), |m| IfaceOp::Error {
            message: m,
        }),
    ))(input)
}

fn raw_op(input: &str) -> PResult<RawOp> {
    alt((
        map(
            tuple((keyword("when"), cond, sym("=>"), iface_simple_op)),
            |(_, c, _, op)| RawOp::When(c, op),
        ),
        map(
            tuple((keyword("else"), sym("=>"), iface_simple_op)),
            |(_, _, op)| RawOp::Else(op),
        ),
        map(iface_simple_op, RawOp::Plain),
    ))(input)
}

/// Fold consecutive when/else runs into a single `Cases` ladder
fn group_ops(raw: Vec<RawOp>) -> Vec<IfaceOp> {
    let mut ops = Vec::new();
    let mut ladder: Vec<(Cond, Box<IfaceOp>)> = Vec::new();

    for op in raw {
        match op {
            RawOp::Plain(p) => {
                if !ladder.is_empty() {
                    ops.push(IfaceOp::Cases {
                        whens: std::mem::take(&mut ladder),
                        otherwise: None,
                    });
                }
                ops.push(p);
            }
            RawOp::When(c, body) => ladder.push((c, Box::new(body))),
            RawOp::Else(body) => {
                ops.push(IfaceOp::Cases {
                    whens: std::mem::take(&mut ladder),
                    otherwise: Some(Box::new(body)),
                });
            }
        }
    }
    if !ladder.is_empty() {
        ops.push(IfaceOp::Cases {
            whens: ladder,
            otherwise: None,
        });
    }
    ops
}

fn interface_item(input: &str) -> PResult<EntityItem> {
    let (input, _) = keyword("interface")(input)?;
    let (input, iname) = name(input)?;
    let (input, params) = delimited(
        sym("("),
        separated_list0(sym(","), param_decl),
        sym(")"),
    )(input)?;
    let (input, raw) = delimited(sym("{"), many0(raw_op), sym("}"))(input)?;

    Ok((
        input,
        EntityItem::Interface(InterfaceDecl {
            name: iname.to_string(),
            params,
            ops: group_ops(raw),
            span: Span::default(),
        }),
    ))
}

// =============================================================================
// TOP-LEVEL DECLARATIONS
// =============================================================================

fn entity_item(input: &str) -> PResult<EntityItem> {
    alt((
        feature_item,
        has_item,
        key_item,
        index_item,
        interface_item,
    ))(input)
}

fn entity_decl(input: &str) -> PResult<EntityDecl> {
    let (input, _) = keyword("entity")(input)?;
    let (input, ename) = name(input)?;
    let (input, base) = opt(preceded(keyword("extends"), name))(input)?;
    let (input, comment) = opt(display_comment)(input)?;
    let (input, items) = delimited(sym("{"), many0(entity_item), sym("}"))(input)?;

    let mut decl = EntityDecl {
        name: ename.to_string(),
        base: base.map(|s| s.to_string()),
        comment,
        features: vec![],
        fields: vec![],
        relations: vec![],
        key: vec![],
        indexes: vec![],
        interfaces: vec![],
        span: Span::default(),
    };
    for item in items {
        match item {
            EntityItem::Feature(f) => decl.features.push(f),
            EntityItem::Field(f) => decl.fields.push(f),
            EntityItem::Relation(r) => decl.relations.push(r),
            EntityItem::Key(k) => decl.key = k,
            EntityItem::Index(i) => decl.indexes.push(i),
            EntityItem::Interface(i) => decl.interfaces.push(i),
        }
    }
    Ok((input, decl))
}

fn import_decl(input: &str) -> PResult<String> {
    preceded(keyword("import"), string_lit)(input)
}

fn type_decl(input: &str) -> PResult<TypeDecl> {
    map(
        tuple((keyword("type"), name, sym(":"), type_ref)),
        |(_, tname, _, base)| TypeDecl {
            name: tname.to_string(),
            base,
            span: Span::default(),
        },
    )(input)
}

fn schema_decl(input: &str) -> PResult<SchemaDecl> {
    let (input, _) = keyword("schema")(input)?;
    let (input, sname) = name(input)?;
    let (input, _) = sym("{")(input)?;
    let (input, _) = keyword("entities")(input)?;
    let (input, entities) = delimited(sym("["), many1(name), sym("]"))(input)?;
    let (input, views) = opt(preceded(
        keyword("views"),
        delimited(sym("["), many1(name), sym("]")),
    ))(input)?;
    let (input, _) = sym("}")(input)?;

    Ok((
        input,
        SchemaDecl {
            name: sname.to_string(),
            entities: entities.iter().map(|s| s.to_string()).collect(),
            views: views
                .unwrap_or_default()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            span: Span::default(),
        },
    ))
}

fn order_term(input: &str) -> PResult<OrderTerm> {
    let (input, field) = name(input)?;
    let (input, dir) = alt((keyword("asc"), keyword("desc")))(input)?;
    Ok((
        input,
        OrderTerm {
            field: field.to_string(),
            ascending: dir == "asc",
        },
    ))
}

fn view_decl(input: &str) -> PResult<ViewDecl> {
    let (input, _) = keyword("view")(input)?;
    let (input, vname) = name(input)?;
    let (input, _) = sym("{")(input)?;
    let (input, _) = keyword("entity")(input)?;
    let (input, entity) = name(input)?;
    let (input, document) = opt(preceded(keyword("document"), name))(input)?;
    let (input, filter) = opt(preceded(keyword("where"), cond))(input)?;
    let (input, group) = opt(preceded(
        keyword("group"),
        delimited(sym("["), many1(name), sym("]")),
    ))(input)?;
    let (input, order) = opt(preceded(
        keyword("order"),
        delimited(sym("["), many1(order_term), sym("]")),
    ))(input)?;
    let (input, limit) = opt(preceded(keyword("limit"), arg))(input)?;
    let (input, _) = sym("}")(input)?;

    Ok((
        input,
        ViewDecl {
            name: vname.to_string(),
            entity: entity.to_string(),
            document: document.map(|s| s.to_string()),
            filter,
            group: group
                .unwrap_or_default()
                .iter()
                .map(|s| s.to_string())
                .collect(),
            order: order.unwrap_or_default(),
            limit,
            span: Span::default(),
        },
    ))
}

fn contains_decl(input: &str) -> PResult<ContainsDecl> {
    let (input, _) = keyword("contains")(input)?;
    let (input, field) = name(input)?;
    let (input, _) = sym("{")(input)?;
    let (input, _) = keyword("entity")(input)?;
    let (input, entity) = name(input)?;
    let (input, nested) = many0(contains_decl)(input)?;
    let (input, _) = sym("}")(input)?;

    Ok((
        input,
        ContainsDecl {
            field: field.to_string(),
            entity: entity.to_string(),
            contains: nested,
            span: Span::default(),
        },
    ))
}

fn document_decl(input: &str) -> PResult<DocumentDecl> {
    let (input, _) = keyword("document")(input)?;
    let (input, dname) = name(input)?;
    let (input, _) = sym("{")(input)?;
    let (input, _) = keyword("entity")(input)?;
    let (input, entity) = name(input)?;
    let (input, contains) = many0(contains_decl)(input)?;
    let (input, _) = sym("}")(input)?;

    Ok((
        input,
        DocumentDecl {
            name: dname.to_string(),
            entity: entity.to_string(),
            contains,
            span: Span::default(),
        },
    ))
}

/// Top-level declaration dispatch
enum TopDecl {
    Import(String),
    Type(TypeDecl),
    Entity(EntityDecl),
    Schema(SchemaDecl),
    View(ViewDecl),
    Document(DocumentDecl),
}

fn top_decl(input: &str) -> PResult<TopDecl> {
    alt((
        map(import_decl, TopDecl::Import),
        map(type_decl, TopDecl::Type),
        map(entity_decl, TopDecl::Entity),
        map(schema_decl, TopDecl::Schema),
        map(view_decl, TopDecl::View),
        map(document_decl, TopDecl::Document),
    ))(input)
}

fn module(input: &str) -> PResult<ModuleAst> {
    let (input, decls) = many0(top_decl)(input)?;
    let (input, _) = sp(input)?;

    let mut ast = ModuleAst::default();
    for decl in decls {
        match decl {
            TopDecl::Import(path) => ast.imports.push(path),
            TopDecl::Type(t) => ast.types.push(t),
            TopDecl::Entity(e) => ast.entities.push(e),
            TopDecl::Schema(s) => ast.schemas.push(s),
            TopDecl::View(v) => ast.views.push(v),
            TopDecl::Document(d) => ast.documents.push(d),
        }
    }
    Ok((input, ast))
}

// =============================================================================
// TESTS
// =============================================================================
