//! The syntax tree produced by compiling a template.
//!
//! Every node is immutable once built, so a compiled
//! [`Template`][`crate::Template`] can be shared between threads and
//! rendered concurrently.
use crate::{compile::Operator, region::Region, tag::Tag};
use serde_json::Value;
use std::{fmt::Debug, sync::Arc};

/// An ordered list of statements.
pub type Block = Vec<Statement>;

/// A unit of work performed by the renderer.
#[derive(Debug, Clone)]
pub enum Statement {
    /// Literal text.
    Text(Region),
    /// Render the value of an expression, from `{{ }}` or `echo`.
    Output(Output),
    /// `if`, `elsif` and `else`.
    If(If),
    /// `unless` and `else`.
    Unless(Unless),
    /// `case`, `when` and `else`.
    Case(Case),
    /// `for` and `else`.
    For(For),
    /// Render a block into a variable.
    Capture(Capture),
    /// Evaluate an expression into a variable.
    Assign(Assign),
    /// Write a counter, then add one.
    Increment(Counter),
    /// Subtract one from a counter, then write it.
    Decrement(Counter),
    /// Stop the innermost loop.
    Break(Region),
    /// Skip to the next item of the innermost loop.
    Continue(Region),
    /// Text written verbatim, the body of a `raw` tag.
    Raw(Region),
    /// Discarded text, the body of a `comment` tag.
    Comment(Region),
    /// Write the next value of a group.
    Cycle(Cycle),
    /// Render another template, from `include` or `render`.
    Include(Include),
    /// A tag registered by the host.
    Custom(Custom),
}

/// Represents a call to render some kind of Expression.
#[derive(Debug, Clone)]
pub struct Output {
    pub expression: Expression,
    pub region: Region,
}

/// A condition and the block rendered when it holds.
#[derive(Debug, Clone)]
pub struct Branch {
    pub condition: Expression,
    pub block: Block,
}

#[derive(Debug, Clone)]
pub struct If {
    /// The `if` branch followed by every `elsif` branch, in order.
    pub branches: Vec<Branch>,
    pub otherwise: Option<Block>,
    pub region: Region,
}

#[derive(Debug, Clone)]
pub struct Unless {
    pub condition: Expression,
    pub block: Block,
    pub otherwise: Option<Block>,
    pub region: Region,
}

/// A `when` section, matching when the subject equals any option.
#[derive(Debug, Clone)]
pub struct When {
    pub options: Vec<Expression>,
    pub block: Block,
}

#[derive(Debug, Clone)]
pub struct Case {
    pub subject: Expression,
    pub whens: Vec<When>,
    pub otherwise: Option<Block>,
    pub region: Region,
}

#[derive(Debug, Clone)]
pub struct For {
    /// Name bound to each item.
    pub variable: Identifier,
    /// The sequence being iterated.
    pub source: Expression,
    pub reversed: bool,
    pub limit: Option<Expression>,
    pub offset: Option<Expression>,
    pub block: Block,
    /// Rendered when the sequence is empty.
    pub otherwise: Option<Block>,
    pub region: Region,
}

#[derive(Debug, Clone)]
pub struct Capture {
    pub name: Identifier,
    pub block: Block,
    pub region: Region,
}

#[derive(Debug, Clone)]
pub struct Assign {
    pub name: Identifier,
    pub value: Expression,
    pub region: Region,
}

#[derive(Debug, Clone)]
pub struct Counter {
    pub name: Identifier,
    pub region: Region,
}

#[derive(Debug, Clone)]
pub struct Cycle {
    /// Explicit group name, otherwise the values identify the group.
    pub group: Option<Expression>,
    pub values: Vec<Expression>,
    pub region: Region,
}

/// Distinguishes `include` from `render`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// The included template sees the enclosing scope.
    Include,
    /// The included template sees only its arguments.
    Render,
}

/// Value passed to an included template.
#[derive(Debug, Clone)]
pub enum Pass {
    /// `with e`, bound once.
    With(Expression),
    /// `for e`, rendered once per item.
    For(Expression),
}

#[derive(Debug, Clone)]
pub struct Include {
    pub mode: Mode,
    pub path: Expression,
    pub pass: Option<Pass>,
    pub alias: Option<Identifier>,
    /// `key: value` pairs, in source order.
    pub arguments: Vec<(Identifier, Expression)>,
    pub region: Region,
}

/// A tag registered by the host.
#[derive(Clone)]
pub struct Custom {
    pub name: String,
    pub tag: Arc<dyn Tag>,
    pub argument: Option<Expression>,
    /// Present only for block tags.
    pub block: Option<Block>,
    pub region: Region,
}

impl Debug for Custom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Custom")
            .field("name", &self.name)
            .field("argument", &self.argument)
            .field("block", &self.block)
            .field("region", &self.region)
            .finish()
    }
}

/// A value computed while rendering.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value.
    Literal(Literal),
    /// A variable such as `user.name` or `items[0]`.
    Path(Path),
    /// Two operands joined by an operator.
    Binary(Binary),
    /// A filter applied to a receiver.
    Call(Call),
    /// `(from..to)`.
    Range(Range),
}

impl Expression {
    /// Get the Region from the underlying Expression kind.
    pub fn get_region(&self) -> Region {
        match self {
            Expression::Literal(literal) => literal.region,
            Expression::Path(path) => path.region,
            Expression::Binary(binary) => binary.region,
            Expression::Call(call) => call.region,
            Expression::Range(range) => range.region,
        }
    }
}

/// Operand kinds of a [`Literal`].
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Value(Value),
    /// The `empty` operand.
    Empty,
    /// The `blank` operand.
    Blank,
}

/// Literal data that does not need to be evaluated any further.
#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub constant: Constant,
    pub region: Region,
}

/// Ordered segments that locate a value, the first is always an identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub segments: Vec<Segment>,
    pub region: Region,
}

impl Path {
    /// Return the root identifier.
    pub fn root(&self) -> &str {
        match self.segments.first() {
            Some(Segment::Identifier(identifier)) => &identifier.name,
            _ => "",
        }
    }
}

/// Path segment in a larger path.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// `.name`
    Identifier(Identifier),
    /// `[expression]`
    Indexer(Expression),
}

/// Area that contains an identifying value.
#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub name: String,
    pub region: Region,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Binary {
    pub operator: Operator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
    pub region: Region,
}

/// Call to some registered filter.
///
/// Refer to an underlying Expression from which the input data
/// may be derived.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub name: Identifier,
    pub receiver: Box<Expression>,
    pub arguments: Vec<Argument>,
    pub region: Region,
}

/// A filter argument, positional or `name: value`.
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub name: Option<Identifier>,
    pub value: Expression,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    pub from: Box<Expression>,
    pub to: Box<Expression>,
    pub region: Region,
}
