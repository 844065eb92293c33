//! Run command implementation.
//!
//! The `arteval run` command evaluates each phase of a bundle in order and
//! prints a per-phase score.

use std::io::Write;

use crate::cli::args::RunArgs;
use crate::cli::display::Theme;
use crate::config::load_bundle;
use crate::error::Result;
use crate::oracle::{EvalContext, Oracle, Phase, Scorecard};
use tracing::info;

use super::dispatcher::{Command, CommandResult};

/// The run command implementation.
pub struct RunCommand {
    args: RunArgs,
    verbose: bool,
    theme: Theme,
}

impl RunCommand {
    pub fn new(args: RunArgs, verbose: bool, theme: Theme) -> Self {
        Self {
            args,
            verbose,
            theme,
        }
    }

    /// Phases to evaluate, always in run order.
    fn selected_phases(&self) -> Vec<Phase> {
        Phase::ALL
            .into_iter()
            .filter(|p| self.args.phases.is_empty() || self.args.phases.contains(p))
            .collect()
    }

    fn render(&self, card: &Scorecard, out: &mut dyn Write) -> Result<()> {
        if self.args.json {
            let json = serde_json::to_string_pretty(card).map_err(anyhow::Error::from)?;
            writeln!(out, "{}", json)?;
            return Ok(());
        }
        writeln!(out, "{}", self.theme.key.apply_to(&card.bundle))?;
        for phase in &card.phases {
            let detail = match (phase.errors, phase.warnings) {
                (0, 0) => String::new(),
                (e, w) => format!(" ({} errors, {} warnings)", e, w),
            };
            writeln!(
                out,
                "  {:<18} {}{}",
                phase.label,
                self.theme.pass_fail(phase.score == 1),
                self.theme.dim.apply_to(detail)
            )?;
        }
        writeln!(out, "  {:<18} {}/{}", "Score", card.total(), card.phases.len())?;
        Ok(())
    }
}

impl Command for RunCommand {
    fn execute(&self, out: &mut dyn Write) -> Result<CommandResult> {
        let bundle = load_bundle(&self.args.bundle)?;
        let ctx = EvalContext::new(bundle.config.name.clone())
            .verbose(self.verbose)
            .runner(bundle.config.settings.runner());
        info!(
            "Evaluating {} (home: {})",
            bundle.config.name,
            bundle.home_dir.display()
        );

        let mut card = Scorecard::new(bundle.config.name.clone());
        for phase in self.selected_phases() {
            let report = Oracle::new(phase, || Ok(bundle.requirements(phase)?)).report(&ctx);
            card.record(phase, &report);
        }

        self.render(&card, out)?;
        if card.passed() {
            Ok(CommandResult::success())
        } else {
            Ok(CommandResult::failure(1))
        }
    }
}
