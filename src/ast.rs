//! Raw parse tree for the entity-definition language
//!
//! The parser produces a *raw* module where every reference is still a plain
//! name: `extends base`, `vendor -> user`, `type money : decimal(...)`. The
//! linker upgrades these names into linked graph nodes; nothing in this module
//! knows about other files.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Parser → ModuleAst (names only)
//!                       ↓
//!               Loader + Linker (cross-module resolution)
//!                       ↓
//!             Linked model (model::Entity, model::Schema, ...)
//! ```

use serde::{Deserialize, Serialize};

// =============================================================================
// SOURCE SPAN
// =============================================================================

/// Source span for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    /// Byte offset of start
    pub start: usize,
    /// Byte offset of end
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a span covering two spans
    pub fn merge(a: Span, b: Span) -> Span {
        Span {
            start: a.start.min(b.start),
            end: a.end.max(b.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }
}

// =============================================================================
// LITERALS AND ARGUMENTS
// =============================================================================

/// Literal values appearing in type constraints, defaults and functor args
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    /// String literal: "hello"
    String(String),

    /// Integer literal: 42, -17
    Integer(i64),

    /// Float literal: 3.14
    Float(f64),

    /// Boolean literal: true, false
    Boolean(bool),

    /// Null literal: null
    Null,
}

impl Literal {
    /// Render the literal back to DSL source
    pub fn to_dsl_string(&self) -> String {
        match self {
            Literal::String(s) => format!("\"{}\"", s.replace('\"', "\\\"")),
            Literal::Integer(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Boolean(b) => if *b { "true" } else { "false" }.to_string(),
            Literal::Null => "null".to_string(),
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Literal::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Literal::String(s) => Some(s),
            _ => None,
        }
    }
}

/// A named attribute value inside a type reference or feature call:
/// either a single literal or a list of literals (`values: [draft posted]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    One(Literal),
    Many(Vec<Literal>),
}

impl AttrValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            AttrValue::One(lit) => lit.as_integer(),
            AttrValue::Many(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::One(lit) => lit.as_str(),
            AttrValue::Many(_) => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Literal]> {
        match self {
            AttrValue::Many(items) => Some(items),
            AttrValue::One(_) => None,
        }
    }
}

/// An argument to a functor call or a view clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Arg {
    /// Terminal literal value
    Literal(Literal),

    /// `@field`: the latest in-flight value of another field of the same
    /// entity. The compiler turns these into cross-field dependencies.
    FieldRef(String),

    /// `$name`: a runtime variable or interface parameter
    Param(String),
}

impl Arg {
    pub fn as_field_ref(&self) -> Option<&str> {
        match self {
            Arg::FieldRef(name) => Some(name),
            _ => None,
        }
    }

    /// Render the argument back to DSL source
    pub fn to_dsl_string(&self) -> String {
        match self {
            Arg::Literal(lit) => lit.to_dsl_string(),
            Arg::FieldRef(name) => format!("@{name}"),
            Arg::Param(name) => format!("${name}"),
        }
    }
}

// =============================================================================
// FUNCTORS
// =============================================================================

/// Functor kinds: what a call in a field's pipeline does with the value
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum FunctorKind {
    /// Boolean check; failure raises a domain validation error
    Validator,
    /// Transforms the value; result is assigned back
    Modifier,
    /// Produces a value for a field with no raw input
    Composer,
}

impl std::fmt::Display for FunctorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FunctorKind::Validator => "validator",
            FunctorKind::Modifier => "modifier",
            FunctorKind::Composer => "composer",
        };
        f.write_str(s)
    }
}

/// One validator/modifier/composer invocation on a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctorCall {
    /// Local name or `entity.function` cross-reference
    pub name: String,
    pub args: Vec<Arg>,
    pub span: Span,
}

impl FunctorCall {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: vec![],
            span: Span::default(),
        }
    }

    /// Names of fields this call reads through `@field` arguments
    pub fn field_refs(&self) -> impl Iterator<Item = &str> {
        self.args.iter().filter_map(|a| a.as_field_ref())
    }
}

// =============================================================================
// TYPE REFERENCES
// =============================================================================

/// A reference to a type with optional constraint attributes:
/// `text(maxLength: 60)`, `int(digits: 11)`, `money`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    pub attrs: Vec<(String, AttrValue)>,
}

impl TypeRef {
    pub fn plain(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: vec![],
        }
    }

    pub fn attr(&self, key: &str) -> Option<&AttrValue> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// `type money : decimal(totalDigits: 18, decimalDigits: 2)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub name: String,
    pub base: TypeRef,
    pub span: Span,
}

// =============================================================================
// ENTITY DECLARATIONS
// =============================================================================

/// Declaration-order flags on a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldFlag {
    Optional,
    ReadOnly,
    WriteOnce,
    Auto,
    DbDefault,
}

/// `has name : text(maxLength: 60) writeOnce |~isAlpha |>trim -- "Name"`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub type_ref: TypeRef,
    pub flags: Vec<FieldFlag>,
    pub default: Option<Literal>,
    pub validators0: Vec<FunctorCall>,
    pub modifiers0: Vec<FunctorCall>,
    pub validators1: Vec<FunctorCall>,
    pub modifiers1: Vec<FunctorCall>,
    pub composer: Option<FunctorCall>,
    pub comment: Option<String>,
    pub span: Span,
}

impl FieldDecl {
    pub fn has_flag(&self, flag: FieldFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Relationship kinds as declared on a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelOp {
    /// `->` many-to-one
    BelongsTo,
    /// `<->` one-to-one, unique
    BindsTo,
    /// `<=>` many-to-many, rewritten to a junction entity during expansion
    ManyToMany,
}

/// `has vendor -> user` or the chain shape `has owner -> [user organization]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationDecl {
    pub field: String,
    pub op: RelOp,
    /// One entry for the single shape, several for the chain/multi shape
    pub targets: Vec<String>,
    pub optional: bool,
    pub comment: Option<String>,
    pub span: Span,
}

/// `with autoId` / `with atLeastOneNotNull([email mobile])`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCall {
    pub name: String,
    pub attrs: Vec<(String, AttrValue)>,
    /// Positional list argument, e.g. the field list of atLeastOneNotNull
    pub list: Vec<String>,
    pub span: Span,
}

/// `index [name vendor] is unique`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDecl {
    pub fields: Vec<String>,
    pub unique: bool,
    pub span: Span,
}

/// A complete `entity` block
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDecl {
    pub name: String,
    pub base: Option<String>,
    pub comment: Option<String>,
    pub features: Vec<FeatureCall>,
    pub fields: Vec<FieldDecl>,
    pub relations: Vec<RelationDecl>,
    pub key: Vec<String>,
    pub indexes: Vec<IndexDecl>,
    pub interfaces: Vec<InterfaceDecl>,
    pub span: Span,
}

// =============================================================================
// INTERFACES
// =============================================================================

/// Comparison operators of the condition language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CmpOp {
    /// SQL spelling of the operator
    pub fn sql(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::Ne => "<>",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
        }
    }

    /// Source spelling of the operator
    pub fn dsl(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
        }
    }
}

/// Boolean condition tree over field comparisons
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cond {
    Cmp {
        field: String,
        op: CmpOp,
        value: Arg,
    },
    And(Box<Cond>, Box<Cond>),
    Or(Box<Cond>, Box<Cond>),
}

/// One operation in an interface body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IfaceOp {
    /// `find id == $id`: single-record lookup
    Find { cond: Cond },
    /// `return $value`
    Return { value: Arg },
    /// `error "message"`: explicit authoring-time failure branch
    Error { message: String },
    /// Consecutive `when cond => op` items plus an optional `else => op`,
    /// grouped into one ladder by the parser
    Cases {
        whens: Vec<(Cond, Box<IfaceOp>)>,
        otherwise: Option<Box<IfaceOp>>,
    },
}

/// An interface parameter: a name, a type, and its own functor pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDecl {
    pub name: String,
    pub type_ref: TypeRef,
    pub validators0: Vec<FunctorCall>,
    pub modifiers0: Vec<FunctorCall>,
    pub span: Span,
}

/// `interface getByName(name : text(maxLength: 60)) { find name == $name }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub ops: Vec<IfaceOp>,
    pub span: Span,
}

// =============================================================================
// SCHEMAS, VIEWS, DOCUMENTS
// =============================================================================

/// `schema shop { entities [ product ] views [ productList ] }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDecl {
    pub name: String,
    pub entities: Vec<String>,
    pub views: Vec<String>,
    pub span: Span,
}

/// One ordering term of a view: field plus direction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderTerm {
    pub field: String,
    pub ascending: bool,
}

/// A `view` block, compiled to a stored procedure by the generator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewDecl {
    pub name: String,
    pub entity: String,
    pub document: Option<String>,
    pub filter: Option<Cond>,
    pub group: Vec<String>,
    pub order: Vec<OrderTerm>,
    pub limit: Option<Arg>,
    pub span: Span,
}

/// One level of a document hierarchy: join the parent through `field` into
/// `entity`, then recurse
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainsDecl {
    pub field: String,
    pub entity: String,
    pub contains: Vec<ContainsDecl>,
    pub span: Span,
}

/// A `document` block: the join tree a view flattens into SQL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentDecl {
    pub name: String,
    pub entity: String,
    pub contains: Vec<ContainsDecl>,
    pub span: Span,
}

// =============================================================================
// MODULE
// =============================================================================

/// Everything one source file declares, exactly as written
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModuleAst {
    pub imports: Vec<String>,
    pub types: Vec<TypeDecl>,
    pub entities: Vec<EntityDecl>,
    pub views: Vec<ViewDecl>,
    pub documents: Vec<DocumentDecl>,
    pub schemas: Vec<SchemaDecl>,
}

impl ModuleAst {
    pub fn is_empty(&self) -> bool {
        self.imports.is_empty()
            && self.types.is_empty()
            && self.entities.is_empty()
            && self.views.is_empty()
            && self.documents.is_empty()
            && self.schemas.is_empty()
    }
}
