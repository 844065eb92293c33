//! Evaluating a requirement list and summarizing the outcome.

use super::context::EvalContext;
use crate::requirements::{truncate_text, CheckResult, Requirement, MAX_MESSAGE_CHARS};
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::{debug, error, info, warn};

/// Name of the synthetic outcome recorded when the requirement list itself
/// cannot be produced.
pub const REQUIREMENTS_OUTCOME: &str = "requirements";

/// One evaluated requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequirementOutcome {
    pub name: String,
    pub optional: bool,
    pub result: CheckResult,
}

/// Aggregate result of one oracle run.
///
/// `errors` holds failed required outcomes and `warnings` failed optional
/// ones; `outcomes` holds everything in evaluation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OracleReport {
    pub ok: bool,
    pub errors: Vec<RequirementOutcome>,
    pub warnings: Vec<RequirementOutcome>,
    pub outcomes: Vec<RequirementOutcome>,
}

impl OracleReport {
    fn from_outcomes(outcomes: Vec<RequirementOutcome>) -> Self {
        let (errors, warnings): (Vec<_>, Vec<_>) = outcomes
            .iter()
            .filter(|o| !o.result.ok)
            .cloned()
            .partition(|o| !o.optional);
        Self {
            ok: errors.is_empty(),
            errors,
            warnings,
            outcomes,
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

fn producer_failure(detail: String) -> OracleReport {
    error!("failed to build requirements: {}", detail);
    OracleReport::from_outcomes(vec![RequirementOutcome {
        name: REQUIREMENTS_OUTCOME.to_string(),
        optional: false,
        result: CheckResult::failure("failed to build requirements").with_output("", detail),
    }])
}

/// Produce the requirement list, evaluate each in order and classify.
///
/// A producer that errors or panics yields a single failed required
/// outcome named `requirements`. A requirement whose evaluation panics
/// fails with the panic text; the remaining requirements still run.
pub fn build_report<F>(producer: F, ctx: &EvalContext) -> OracleReport
where
    F: FnOnce() -> anyhow::Result<Vec<Requirement>>,
{
    let requirements = match catch_unwind(AssertUnwindSafe(producer)) {
        Ok(Ok(requirements)) => requirements,
        Ok(Err(e)) => return producer_failure(format!("{:#}", e)),
        Err(payload) => return producer_failure(panic_message(payload.as_ref())),
    };

    let mut outcomes = Vec::with_capacity(requirements.len());
    for requirement in &requirements {
        debug!(
            requirement = requirement.name(),
            kind = requirement.check().kind(),
            "evaluating"
        );
        let result = match catch_unwind(AssertUnwindSafe(|| requirement.evaluate(ctx))) {
            Ok(result) => result,
            Err(payload) => {
                let text = panic_message(payload.as_ref());
                error!(requirement = requirement.name(), "check panicked: {}", text);
                CheckResult::failure(format!("exception during check: {}", text))
            }
        };
        outcomes.push(RequirementOutcome {
            name: requirement.name().to_string(),
            optional: requirement.is_optional(),
            result,
        });
    }
    OracleReport::from_outcomes(outcomes)
}

fn log_details(outcome: &RequirementOutcome) {
    let r = &outcome.result;
    if let Some(cwd) = &r.cwd {
        info!("   cwd: {}", cwd.display());
    }
    if let Some(rc) = r.returncode {
        info!("   returncode: {}", rc);
    }
    if r.timed_out {
        info!("   timed_out: true");
    }
    if !r.stdout.trim().is_empty() {
        info!("   stdout:\n{}", truncate_text(r.stdout.trim(), MAX_MESSAGE_CHARS));
    }
    if !r.stderr.trim().is_empty() {
        info!("   stderr:\n{}", truncate_text(r.stderr.trim(), MAX_MESSAGE_CHARS));
    }
}

/// Log a PASS / PASS (with warnings) / FAIL summary and return `report.ok`.
///
/// With `verbose`, captured diagnostics of every failed outcome follow
/// its line.
pub fn log_report(label: &str, report: &OracleReport, verbose: bool) -> bool {
    if !report.ok {
        error!("{}: FAIL", label);
        for outcome in &report.errors {
            error!(" - {}: {}", outcome.name, outcome.result.message);
            if verbose {
                log_details(outcome);
            }
        }
    } else if !report.warnings.is_empty() {
        info!("{}: PASS (with warnings)", label);
    } else {
        info!("{}: PASS", label);
    }

    for outcome in &report.warnings {
        warn!(" - {}: {}", outcome.name, outcome.result.message);
        if verbose {
            log_details(outcome);
        }
    }
    report.ok
}
