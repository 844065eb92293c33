//! Orchestration of requirement lists into phase reports.
//!
//! An [`Oracle`] is a named group of requirements for one [`Phase`]. Running
//! it produces the requirement list, evaluates each requirement in order,
//! classifies failures by severity and logs a summary.
//!
//! # Modules
//!
//! - [`context`] - The explicit per-run [`EvalContext`] and [`Phase`] labels
//! - [`report`] - [`build_report`] and [`log_report`]
//! - [`score`] - Per-phase [`Scorecard`]

pub mod context;
pub mod report;
pub mod score;

pub use context::{EvalContext, Phase};
pub use report::{
    build_report, log_report, OracleReport, RequirementOutcome, REQUIREMENTS_OUTCOME,
};
pub use score::{PhaseScore, Scorecard};

use crate::requirements::Requirement;
use tracing::info_span;

/// The requirements of one phase, produced lazily.
pub struct Oracle<F> {
    phase: Phase,
    producer: F,
}

impl<F> Oracle<F>
where
    F: FnOnce() -> anyhow::Result<Vec<Requirement>>,
{
    pub fn new(phase: Phase, producer: F) -> Self {
        Self { phase, producer }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Evaluate and log, returning the full report.
    pub fn report(self, ctx: &EvalContext) -> OracleReport {
        let span = info_span!("oracle", bundle = %ctx.bundle, phase = self.phase.label());
        let _enter = span.enter();
        let report = build_report(self.producer, ctx);
        log_report(self.phase.label(), &report, ctx.verbose);
        report
    }

    /// Evaluate and log, returning whether the phase passed.
    pub fn run(self, ctx: &EvalContext) -> bool {
        self.report(ctx).ok
    }
}
