//! Per-phase scoring for a bundle run.

use super::context::Phase;
use super::report::OracleReport;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Result of one phase in a scorecard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhaseScore {
    pub phase: Phase,
    pub label: &'static str,
    /// 1 if the phase passed, else 0.
    pub score: u32,
    pub errors: usize,
    pub warnings: usize,
}

/// Scores for every phase evaluated in one bundle run.
#[derive(Debug, Clone, Serialize)]
pub struct Scorecard {
    pub bundle: String,
    pub started_at: DateTime<Utc>,
    pub phases: Vec<PhaseScore>,
}

impl Scorecard {
    pub fn new(bundle: impl Into<String>) -> Self {
        Self {
            bundle: bundle.into(),
            started_at: Utc::now(),
            phases: Vec::new(),
        }
    }

    /// Record a phase's report.
    pub fn record(&mut self, phase: Phase, report: &OracleReport) {
        self.phases.push(PhaseScore {
            phase,
            label: phase.label(),
            score: u32::from(report.ok),
            errors: report.errors.len(),
            warnings: report.warnings.len(),
        });
    }

    /// Number of passing phases.
    pub fn total(&self) -> u32 {
        self.phases.iter().map(|p| p.score).sum()
    }

    /// Whether every recorded phase passed.
    pub fn passed(&self) -> bool {
        self.phases.iter().all(|p| p.score == 1)
    }
}
