// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The typed value model: types, schemas, and Arrow-backed record batches (§3.1, §3.2, §4.1).

pub mod batch;
pub mod builder;
pub mod cast;
pub mod error;
pub mod flatten;
pub mod reader;
pub mod schema;
pub mod types;
pub mod value;

pub use batch::RecordBatch;
pub use builder::{batches_from_rows, FieldBuilder, RecordBatchBuilder, DEFAULT_BATCH_ROW_CAP};
pub use cast::cast_batch;
pub use error::ValueError;
pub use flatten::flatten;
pub use schema::Schema;
pub use types::{Enumeration, Field, PatternOptions, Type, TypeKind};
pub use value::Value;
