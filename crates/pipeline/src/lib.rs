// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! TQL grammar, parser, expression parser, and pipeline composer/optimizer (C4, §3.5, §4.4,
//! §6.1).

pub mod compose;
pub mod error;
pub mod expr_parser;
pub mod parser;

pub use compose::{compose, compose_from, requires_remote_placement, OperatorFactory, OperatorRegistry};
pub use error::Error;
pub use expr_parser::parse_expr;
pub use parser::parse_pipeline;
