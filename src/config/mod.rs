//! Bundle configuration: loading, validation, and requirement construction.
//!
//! - Schema definitions in [`schema`]
//! - File loading and `~` / `${VAR}` path expansion in [`loader`]
//! - Collect-all validation in [`validator`]
//! - Building each phase's requirements in [`resolve`]
//!
//! # Example
//!
//! ```
//! use arteval::config::{load_bundle, validate};
//! use arteval::oracle::Phase;
//! use tempfile::TempDir;
//! use std::fs;
//!
//! let temp = TempDir::new().unwrap();
//! let path = temp.path().join("bundle.yml");
//! fs::write(&path, "name: demo\nphases:\n  env_setup:\n    - {name: manual, kind: fail, message: todo}\n").unwrap();
//!
//! let bundle = load_bundle(&path).unwrap();
//! validate(&bundle).unwrap();
//! assert_eq!(bundle.requirements(Phase::EnvSetup).unwrap().len(), 1);
//! ```

pub mod loader;
pub mod resolve;
pub mod schema;
pub mod validator;

pub use loader::{expand_path, expand_path_with, load_bundle, parse_bundle, LoadedBundle};
pub use schema::{
    BuildConfig, BundleConfig, CheckConfig, CommandConfig, CommandSpec, ElementwiseEqualConfig,
    ElementwiseThresholdConfig, EnvVarConfig, FailConfig, LabeledThresholdConfig,
    ListSimilarityConfig, PathConfig, PhasesConfig, RequirementConfig, Settings, VersionConfig,
};
pub use validator::{validate, validate_bundle, ValidationError};
