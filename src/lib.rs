//! arteval - Artifact evaluation harness.
//!
//! Evaluates a research artifact bundle in four ordered phases (environment
//! setup, artifact build, benchmark preparation, experiment runs) and scores
//! each phase pass/fail. Each phase is a list of declarative requirements
//! evaluated in order; failures of required entries fail the phase, failures
//! of optional ones are warnings.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`compare`] - Similarity metrics, elementwise comparison, label alignment
//! - [`config`] - Bundle loading, validation, and requirement construction
//! - [`error`] - Error types and result aliases
//! - [`oracle`] - Orchestration, reports, and scoring
//! - [`requirements`] - Requirement types and check results
//! - [`shell`] - Timeout-bounded subprocess execution
//!
//! # Example
//!
//! ```
//! use arteval::compare::{NumericSeries, SimilarityMetric};
//! use arteval::oracle::{build_report, EvalContext};
//! use arteval::requirements::{ElementwiseThresholdCheck, FailCheck, Requirement};
//!
//! let report = build_report(
//!     || {
//!         Ok(vec![
//!             Requirement::new(
//!                 "throughput",
//!                 ElementwiseThresholdCheck::new(
//!                     NumericSeries::Values(vec![98.0, 101.0]),
//!                     NumericSeries::Values(vec![100.0, 100.0]),
//!                     0.9,
//!                 )?,
//!             )?,
//!             Requirement::new("figure 7", FailCheck::new("manual"))?.optional(true),
//!         ])
//!     },
//!     &EvalContext::new("demo"),
//! );
//! assert!(report.ok);
//! assert_eq!(report.warnings.len(), 1);
//! assert_eq!(SimilarityMetric::Cosine.compute(&[1.0, 0.0], &[2.0, 0.0]).unwrap(), 1.0);
//! ```

pub mod cli;
pub mod compare;
pub mod config;
pub mod error;
pub mod oracle;
pub mod requirements;
pub mod shell;

pub use error::{ArtevalError, Result};
