//! Validate command implementation.
//!
//! The `arteval validate` command reports every problem in a bundle file
//! without running any requirement.

use std::io::Write;

use crate::cli::args::ValidateArgs;
use crate::cli::display::Theme;
use crate::config::{load_bundle, validate_bundle};
use crate::error::Result;
use crate::oracle::Phase;

use super::dispatcher::{Command, CommandResult};

/// The validate command implementation.
pub struct ValidateCommand {
    args: ValidateArgs,
    theme: Theme,
}

impl ValidateCommand {
    pub fn new(args: ValidateArgs, theme: Theme) -> Self {
        Self { args, theme }
    }
}

impl Command for ValidateCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let bundle = load_bundle(&self.args.bundle)?;
        let errors = validate_bundle(&bundle);

        if errors.is_empty() {
            let count: usize = Phase::ALL
                .iter()
                .map(|p| bundle.config.phases.get(*p).len())
                .sum();
            writeln!(
                out,
                "{} {} is valid ({} requirements)",
                self.theme.success.apply_to("✓"),
                self.args.bundle.display(),
                count
            )?;
            return Ok(CommandResult::success());
        }

        writeln!(
            out,
            "{} {} has {} problem(s):",
            self.theme.error.apply_to("✗"),
            self.args.bundle.display(),
            errors.len()
        )?;
        for error in &errors {
            writeln!(
                out,
                "  {} {}",
                self.theme.dim.apply_to(format!("[{}]", error.rule)),
                error.message
            )?;
        }
        Ok(CommandResult::failure(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn validate(yaml: &str) -> (CommandResult, String) {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bundle.yml");
        fs::write(&path, yaml).unwrap();
        let mut out = Vec::new();
        let result = ValidateCommand::new(ValidateArgs { bundle: path }, Theme::plain())
            .execute(&mut out)
            .unwrap();
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn valid_bundle_reports_count() {
        let (result, out) = validate("name: x\nphases:\n  env_setup:\n    - {name: a, kind: fail, message: m}\n");
        assert!(result.success);
        assert!(out.contains("is valid (1 requirements)"));
    }

    #[test]
    fn invalid_bundle_lists_problems() {
        let (result, out) = validate(
            "name: x\nphases:\n  env_setup:\n    - {name: a, kind: fail, message: m}\n    - {name: a, kind: fail, message: m}\n",
        );
        assert_eq!(result.exit_code, 1);
        assert!(out.contains("has 1 problem(s)"));
        assert!(out.contains("[duplicate-requirement]"));
    }
}
