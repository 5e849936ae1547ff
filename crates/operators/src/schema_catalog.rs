// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! A process-wide, best-effort catalog of distinct schemas seen so far, backing the `schemas`
//! aspect source (§6.4). Cross-node schema registry synchronization is an explicit non-goal
//! (§1); this catalog is local to the process and populated only by the operators that mint
//! genuinely new schemas (`from`, `cast`), not by every pass-through transformation.

use parking_lot::Mutex;
use std::sync::{Arc, OnceLock};
use tql_df_value::Schema;

/// Distinct schemas registered so far, deduplicated by fingerprint.
#[derive(Default)]
pub struct SchemaCatalog {
    schemas: Mutex<Vec<Schema>>,
}

impl SchemaCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `schema` if its fingerprint has not already been seen.
    pub fn register(&self, schema: &Schema) {
        let mut schemas = self.schemas.lock();
        let fingerprint = schema.fingerprint();
        if schemas.iter().any(|s| s.fingerprint() == fingerprint) {
            return;
        }
        schemas.push(schema.clone());
    }

    /// Returns every distinct schema registered so far.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Schema> {
        self.schemas.lock().clone()
    }
}

static CATALOG: OnceLock<Arc<SchemaCatalog>> = OnceLock::new();

/// Returns the process-wide schema catalog, creating it on first use.
#[must_use]
pub fn schema_catalog() -> Arc<SchemaCatalog> {
    Arc::clone(CATALOG.get_or_init(|| Arc::new(SchemaCatalog::new())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tql_df_value::{Field, Type};

    #[test]
    fn dedups_by_fingerprint() {
        let catalog = SchemaCatalog::new();
        let schema = Schema::from_record_type(Type::record(vec![Field::new("a", Type::int64())])).unwrap();
        catalog.register(&schema);
        catalog.register(&schema);
        assert_eq!(catalog.snapshot().len(), 1);
    }
}
