// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! Wires every builtin operator into a [`tql_df_pipeline::OperatorRegistry`] (§6.1 "plugin
//! registration"), built once behind a process-wide [`OnceLock`].
//!
//! `fork` and `plugins` each need a handle to the very registry they are being registered into
//! (`fork` to compose its side pipeline against the full operator set; `plugins` to enumerate
//! it). Their factory closures read the static back out of [`REGISTRY`] lazily, at call time —
//! by construction this only ever happens after [`OnceLock::get_or_init`] has returned and
//! stored the registry, since `compose` cannot invoke a factory before `builtin_registry` has
//! handed the registry out.

use crate::assert_throughput_op::AssertThroughput;
use crate::cast_op::Cast;
use crate::diagnostics_op::Diagnostics;
use crate::flatten_op::Flatten;
use crate::fork_op::Fork;
use crate::from_op::From;
use crate::head_tail::{Head, Tail};
use crate::metrics_op::Metrics;
use crate::partitions_op::Partitions;
use crate::plugins_op::Plugins;
use crate::repeat_op::Repeat;
use crate::schemas_op::Schemas;
use crate::select_op::{Select, Set};
use crate::summarize_op::Summarize;
use crate::unordered_op::Unordered;
use crate::where_op::Where;
use std::sync::{Arc, OnceLock};
use tql_df_engine::Operator;
use tql_df_pipeline::OperatorRegistry;
use tql_df_telemetry::BufferStatsRegistry;

static REGISTRY: OnceLock<Arc<OperatorRegistry>> = OnceLock::new();
static BUFFER_STATS: OnceLock<Arc<BufferStatsRegistry>> = OnceLock::new();

/// Returns the process-wide registry of builtin operators, building it on first use.
#[must_use]
pub fn builtin_registry() -> Arc<OperatorRegistry> {
    Arc::clone(REGISTRY.get_or_init(build_registry))
}

/// Returns the same [`BufferStatsRegistry`] the `metrics` aspect source polls. A caller running
/// pipelines (e.g. the `tqld` binary) registers each pipeline's real edges here so that a
/// `metrics` source composed elsewhere in the process actually observes them.
#[must_use]
pub fn buffer_stats_registry() -> Arc<BufferStatsRegistry> {
    Arc::clone(BUFFER_STATS.get_or_init(|| Arc::new(BufferStatsRegistry::new())))
}

fn factory_err(err: crate::error::Error) -> tql_df_pipeline::Error {
    tql_df_pipeline::Error::from(tql_df_engine::Error::from(err))
}

/// Registers a builder of the common `fn(&serde_json::Value) -> Result<Self, crate::Error>`
/// shape under `name`.
fn register_simple<O, B>(registry: &mut OperatorRegistry, name: &'static str, build: B)
where
    O: Operator + 'static,
    B: Fn(&serde_json::Value) -> Result<O, crate::error::Error> + Send + Sync + 'static,
{
    registry.register(
        name,
        Box::new(move |config| build(config).map(|op| Box::new(op) as Box<dyn Operator>).map_err(factory_err)),
    );
}

fn build_registry() -> Arc<OperatorRegistry> {
    let buffer_stats = buffer_stats_registry();

    let mut registry = OperatorRegistry::new();
    register_simple(&mut registry, "from", From::build);
    register_simple(&mut registry, "where", Where::build);
    register_simple(&mut registry, "select", Select::build);
    register_simple(&mut registry, "set", Set::build);
    register_simple(&mut registry, "cast", Cast::build);
    register_simple(&mut registry, "flatten", Flatten::build);
    register_simple(&mut registry, "head", Head::build);
    register_simple(&mut registry, "tail", Tail::build);
    register_simple(&mut registry, "repeat", Repeat::build);
    register_simple(&mut registry, "unordered", Unordered::build);
    register_simple(&mut registry, "summarize", Summarize::build);
    register_simple(&mut registry, "assert_throughput", AssertThroughput::build);
    register_simple(&mut registry, "diagnostics", Diagnostics::build);
    register_simple(&mut registry, "schemas", Schemas::build);
    register_simple(&mut registry, "partitions", Partitions::build);

    registry.register(
        "metrics",
        Box::new(move |config| {
            Metrics::build(config, &buffer_stats)
                .map(|op| Box::new(op) as Box<dyn Operator>)
                .map_err(factory_err)
        }),
    );
    registry.register(
        "fork",
        Box::new(|config| {
            let registry = REGISTRY.get().expect("registry initialized before any factory runs");
            Fork::build(config, registry)
                .map(|op| Box::new(op) as Box<dyn Operator>)
                .map_err(factory_err)
        }),
    );
    registry.register(
        "plugins",
        Box::new(|config| {
            let registry = REGISTRY.get().expect("registry initialized before any factory runs");
            Plugins::build(config, registry)
                .map(|op| Box::new(op) as Box<dyn Operator>)
                .map_err(factory_err)
        }),
    );

    Arc::new(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_builtin_is_registered() {
        let registry = builtin_registry();
        let mut names = registry.names();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "assert_throughput",
                "cast",
                "diagnostics",
                "flatten",
                "fork",
                "from",
                "head",
                "metrics",
                "partitions",
                "plugins",
                "repeat",
                "schemas",
                "select",
                "set",
                "summarize",
                "tail",
                "unordered",
                "where",
            ]
        );
    }

    #[test]
    fn composes_a_fork_pipeline_through_the_shared_registry() {
        let registry = builtin_registry();
        let operators = tql_df_pipeline::compose(r#"from [{"a": 1}] | fork "where a > 0" | where a > 0"#, &registry).unwrap();
        assert_eq!(operators.len(), 3);
    }
}
