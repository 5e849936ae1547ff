// Copyright The OpenTelemetry Authors
// SPDX-License-Identifier: Apache-2.0

//! The operator abstraction (§4.3): a polymorphic value over `name`, `signature`,
//! `infer_type`, `instantiate`, `location`, `internal`, `optimize`, and `idle_after`.

use crate::checkpoint::StateBlob;
use crate::edge::{StageReceiver, StageSender};
use crate::error::Error;
use crate::stop::StopSignal;
use async_trait::async_trait;
use bitflags::bitflags;
use std::time::Duration;
use tql_df_config::ElementType;
use tql_df_diagnostics::DiagnosticSession;
use tql_df_expr::{Expr, FunctionRegistry};

bitflags! {
    /// Which structural roles an operator may occupy in a pipeline (§4.3).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Signature: u8 {
        /// May appear as the first stage; its input element type is `void`.
        const SOURCE = 0b001;
        /// May appear as a middle stage, transforming its input.
        const TRANSFORMATION = 0b010;
        /// May appear as the last stage; its output element type is `void`.
        const SINK = 0b100;
    }
}

/// Where an operator is permitted to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperatorLocation {
    /// Must run on the node.
    Local,
    /// Must run on the client submitting the pipeline.
    Remote,
    /// No placement preference.
    #[default]
    Anywhere,
}

/// The ordering contract an operator's output must honor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventOrder {
    /// Row order must be preserved.
    #[default]
    Ordered,
    /// The operator may reorder, reshard, or parallelize internally.
    Unordered,
}

/// The result of asking an operator to absorb a pushed-down filter and order preference
/// during optimization (§4.4).
pub enum OptimizeOutcome {
    /// The operator accepts some or all of the pushdown, yielding a residual filter, the
    /// order it now requires of its own upstream, and its own (possibly rewritten) form.
    Pushed {
        /// What remains to be applied upstream of the replacement operator.
        residual_filter: Option<Expr>,
        /// The order requested of the operator now upstream of the replacement.
        requested_order: EventOrder,
        /// The operator to substitute in the composed pipeline.
        replacement: Box<dyn Operator>,
    },
    /// The operator cannot absorb the pushdown; composition halts at this point.
    DoNotOptimize,
}

/// Shared, read-only context handed to an operator's `run` method.
pub struct OperatorContext {
    /// The diagnostics session for the pipeline this operator belongs to.
    pub diagnostics: DiagnosticSession,
    /// The builtin scalar function registry, for operators that evaluate TQL expressions.
    pub functions: FunctionRegistry,
    /// A restored state blob from the most recent committed checkpoint, if this operator is
    /// stateful and a prior run committed one (§4.6 Recovery).
    pub restored_state: Option<StateBlob>,
    /// The pipeline-wide cooperative stop signal (§4.5 Cancellation). Any operator may observe
    /// it to stop pulling/producing early, or request it to ask every other operator to do the
    /// same.
    pub stop: StopSignal,
}

/// The input/output edges an operator instance is wired to. `input` is `None` for a source;
/// `output` is `None` for a sink (§4.3).
pub struct OperatorIo {
    /// The upstream edge, absent for sources.
    pub input: Option<StageReceiver>,
    /// The downstream edge, absent for sinks.
    pub output: Option<StageSender>,
}

/// An operator: the unit of computation composed into a linear pipeline (§3.5, §4.3).
///
/// `instantiate` drives the operator's entire lifetime: it performs the open phase, then
/// loops pulling from `io.input` (if any) and pushing to `io.output` (if any) until it sees
/// `Message::Exhausted` or is cancelled, forwarding checkpoint markers per §4.6.
#[async_trait(?Send)]
pub trait Operator: 'static {
    /// Stable identifier, as used in TQL source and diagnostics.
    fn name(&self) -> &'static str;

    /// The structural roles this operator is allowed to occupy.
    fn signature(&self) -> Signature;

    /// Maps the input element type to the output element type, or fails with a type clash.
    fn infer_type(&self, input: ElementType) -> Result<ElementType, Error>;

    /// Where this operator is permitted to run. Aspect sources (§4.7) override this to
    /// `Remote`.
    fn location(&self) -> OperatorLocation {
        OperatorLocation::Anywhere
    }

    /// Whether this operator must never appear in user-facing diagnostics (e.g. an internal
    /// rewrite introduced by the optimizer).
    fn internal(&self) -> bool {
        false
    }

    /// Attempts to absorb a pushed-down filter and order preference (§4.4). The default
    /// implementation opts out, which halts pushdown at this operator.
    fn optimize(&self, _filter: Option<Expr>, _order: EventOrder) -> OptimizeOutcome {
        OptimizeOutcome::DoNotOptimize
    }

    /// The maximum permitted idle duration before the runtime expects at least a keepalive
    /// empty yield (§4.5). Default: 5 seconds, matching the default stall timeout.
    fn idle_after(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Runs this operator instance to completion against `io`, using `ctx` for diagnostics,
    /// function lookups, and checkpoint recovery.
    async fn run(self: Box<Self>, io: OperatorIo, ctx: OperatorContext) -> Result<(), Error>;
}
