// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The expression AST (§3.4): literal constants, field paths, function calls, comparisons,
//! boolean combinators, list/record constructors, and spreads.

use tql_df_diagnostics::Location;
use tql_df_value::{Type, Value};

/// A binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// A boolean combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    /// Logical conjunction.
    And,
    /// Logical disjunction.
    Or,
}

/// One entry of a record constructor: a named field, or a spread of another expression's
/// fields (`..expr`).
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEntry {
    /// `name: expr`
    Field(String, Expr),
    /// `..expr` — splices the fields of a record-typed expression into this record.
    Spread(Expr),
}

/// One entry of a list constructor: an element, or a spread of another list-typed expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ListEntry {
    /// A single element expression.
    Element(Expr),
    /// `..expr` — splices the elements of a list-typed expression.
    Spread(Expr),
}

/// The expression AST node kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// A literal constant.
    Literal(Value),
    /// A dot-separated field path rooted at the event, e.g. `src.ip`.
    FieldPath(Vec<String>),
    /// A function call: builtin or plugin-registered, by name, with positional arguments.
    Call(String, Vec<Expr>),
    /// A binary comparison.
    Compare(CompareOp, Box<Expr>, Box<Expr>),
    /// A boolean combination.
    BoolOp(BoolOp, Box<Expr>, Box<Expr>),
    /// Logical negation.
    Not(Box<Expr>),
    /// A list constructor.
    List(Vec<ListEntry>),
    /// A record constructor.
    Record(Vec<RecordEntry>),
}

/// An expression: a parsed AST node with a static kind hint and a source location (§3.4).
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    /// The AST node.
    pub kind: ExprKind,
    /// Static kind hint; `None` means `any` (unknown until evaluated).
    pub kind_hint: Option<Type>,
    /// Source location for diagnostics.
    pub location: Option<Location>,
}

impl Expr {
    /// Wraps an `ExprKind` with no kind hint and no location.
    #[must_use]
    pub const fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            kind_hint: None,
            location: None,
        }
    }

    /// Attaches a source location.
    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Attaches a static kind hint.
    #[must_use]
    pub fn with_kind_hint(mut self, ty: Type) -> Self {
        self.kind_hint = Some(ty);
        self
    }

    /// Builds a literal expression.
    #[must_use]
    pub fn literal(value: Value) -> Self {
        Self::new(ExprKind::Literal(value))
    }

    /// Builds a field-path expression from dot-separated segments.
    #[must_use]
    pub fn field_path(path: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::new(ExprKind::FieldPath(path.into_iter().map(Into::into).collect()))
    }

    /// Builds a function call expression.
    #[must_use]
    pub fn call(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Self::new(ExprKind::Call(name.into(), args))
    }
}
