// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The expression AST, evaluator, and builtin function/aggregation registries (§3.4, §4.2).

pub mod aggregate;
pub mod ast;
pub mod error;
pub mod eval;
pub mod functions;
pub mod series;

pub use aggregate::{Aggregation, AggregationRegistry};
pub use ast::{BoolOp, CompareOp, Expr, ExprKind, ListEntry, RecordEntry};
pub use error::ExprError;
pub use eval::eval;
pub use functions::{Function, FunctionRegistry};
pub use series::Series;
