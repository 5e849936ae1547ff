// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The pipeline composer (C4): turns parsed [`OperatorUserConfig`] values into a type-checked,
//! optimized chain of boxed [`Operator`] instances (§3.5, §4.4).

use crate::error::Error;
use std::collections::HashMap;
use tql_df_config::{ElementType, OperatorUserConfig};
use tql_df_engine::{EventOrder, Operator, OperatorLocation, OptimizeOutcome};

/// A factory function that builds one operator instance from its parsed `config` value.
pub type OperatorFactory = Box<dyn Fn(&serde_json::Value) -> Result<Box<dyn Operator>, Error> + Send + Sync>;

/// A lookup table from operator plugin name to its factory, populated by whichever crate
/// registers concrete operator implementations (§6.1 "plugin registration").
#[derive(Default)]
pub struct OperatorRegistry {
    factories: HashMap<&'static str, OperatorFactory>,
}

impl OperatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name`, overwriting any previous registration.
    pub fn register(&mut self, name: &'static str, factory: OperatorFactory) {
        let _ = self.factories.insert(name, factory);
    }

    fn build(&self, def: &OperatorUserConfig) -> Result<Box<dyn Operator>, Error> {
        let factory = self.factories.get(def.name()).ok_or_else(|| Error::UnknownOperator {
            name: def.name().to_string(),
        })?;
        factory(&def.config)
    }

    /// Returns every registered operator name, for the `plugins` aspect source (§6.4).
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

/// Parses, type-checks, and optimizes a TQL pipeline string into an ordered list of boxed
/// operators ready to hand to [`tql_df_engine::RuntimePipeline`] (§3.5, §4.4).
pub fn compose(source: &str, registry: &OperatorRegistry) -> Result<Vec<Box<dyn Operator>>, Error> {
    compose_from(source, registry, ElementType::Void)
}

/// As [`compose`], but starts type-checking from `start` rather than `void`. Used by operators
/// (e.g. `fork`) that build a side chain fed from an already-flowing record batch stream rather
/// than from a source.
pub fn compose_from(source: &str, registry: &OperatorRegistry, start: ElementType) -> Result<Vec<Box<dyn Operator>>, Error> {
    let defs = crate::parser::parse_pipeline(source)?;
    let mut operators = defs.iter().map(|def| registry.build(def)).collect::<Result<Vec<_>, _>>()?;

    check_adjacency(&operators, start)?;
    optimize_backward(&mut operators);
    Ok(operators)
}

/// Validates the pipeline's element-type flow (§3.5): feeds `start` into the first operator,
/// then threads each operator's inferred output into the next operator's `infer_type` as its
/// input. An operator that cannot accept the type it is handed rejects it from `infer_type`
/// itself, which this function reports as a type clash naming both operators.
fn check_adjacency(operators: &[Box<dyn Operator>], start: ElementType) -> Result<(), Error> {
    let mut upstream_name = "<pipeline start>";
    let mut current = start;
    for operator in operators {
        let output = operator.infer_type(current).map_err(|_| Error::TypeClash {
            upstream: upstream_name.to_string(),
            upstream_output: current,
            downstream: operator.name().to_string(),
            downstream_input: current,
        })?;
        upstream_name = operator.name();
        current = output;
    }
    Ok(())
}

/// Walks the pipeline from the sink backward, offering each operator the residual filter and
/// order preference accumulated so far and substituting its (possibly rewritten) replacement
/// (§4.4 predicate/order pushdown). Stops pushing at the first operator that declines.
fn optimize_backward(operators: &mut [Box<dyn Operator>]) {
    let mut filter = None;
    let mut order = EventOrder::Ordered;
    for operator in operators.iter_mut().rev() {
        match operator.optimize(filter.take(), order) {
            OptimizeOutcome::Pushed {
                residual_filter,
                requested_order,
                replacement,
            } => {
                *operator = replacement;
                filter = residual_filter;
                order = requested_order;
            }
            OptimizeOutcome::DoNotOptimize => break,
        }
    }
}

/// Returns whether any operator in the composed pipeline must run on the client rather than
/// the node (§4.7 aspect sources, §5 placement).
#[must_use]
pub fn requires_remote_placement(operators: &[Box<dyn Operator>]) -> bool {
    operators.iter().any(|op| op.location() == OperatorLocation::Remote)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tql_df_engine::{Error as EngineError, OperatorContext, OperatorIo, Signature};

    struct Passthrough {
        name: &'static str,
        output: ElementType,
    }

    #[async_trait(?Send)]
    impl Operator for Passthrough {
        fn name(&self) -> &'static str {
            self.name
        }

        fn signature(&self) -> Signature {
            Signature::SOURCE | Signature::TRANSFORMATION | Signature::SINK
        }

        fn infer_type(&self, _input: ElementType) -> Result<ElementType, EngineError> {
            Ok(self.output)
        }

        async fn run(self: Box<Self>, _io: OperatorIo, _ctx: OperatorContext) -> Result<(), EngineError> {
            Ok(())
        }
    }

    fn registry() -> OperatorRegistry {
        let mut registry = OperatorRegistry::new();
        registry.register(
            "source",
            Box::new(|_| {
                Ok(Box::new(Passthrough {
                    name: "source",
                    output: ElementType::RecordBatch,
                }) as Box<dyn Operator>)
            }),
        );
        registry.register(
            "sink",
            Box::new(|_| {
                Ok(Box::new(Passthrough {
                    name: "sink",
                    output: ElementType::Void,
                }) as Box<dyn Operator>)
            }),
        );
        registry
    }

    #[test]
    fn composes_a_type_compatible_chain() {
        let registry = registry();
        let operators = compose("source | sink", &registry).unwrap();
        assert_eq!(operators.len(), 2);
    }

    #[test]
    fn rejects_unknown_operator_names() {
        let registry = registry();
        let err = compose("bogus", &registry).unwrap_err();
        assert!(matches!(err, Error::UnknownOperator { name } if name == "bogus"));
    }
}
