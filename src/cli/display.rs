//! Terminal styling for command output.

use console::Style;

/// Styles for scorecard and validation output.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Passing phases (green).
    pub success: Style,
    /// Failing phases and errors (red bold).
    pub error: Style,
    /// Secondary text (dim).
    pub dim: Style,
    /// Labels (bold).
    pub key: Style,
}

impl Theme {
    pub fn new() -> Self {
        Self {
            success: Style::new().green(),
            error: Style::new().red().bold(),
            dim: Style::new().dim(),
            key: Style::new().bold(),
        }
    }

    /// A theme without colors (for non-TTY or --no-color).
    pub fn plain() -> Self {
        Self {
            success: Style::new(),
            error: Style::new(),
            dim: Style::new(),
            key: Style::new(),
        }
    }

    /// Colored unless `NO_COLOR` is set or stdout is not a terminal.
    pub fn detect(no_color: bool) -> Self {
        if no_color || !should_use_colors() {
            Self::plain()
        } else {
            Self::new()
        }
    }

    pub fn pass_fail(&self, ok: bool) -> String {
        if ok {
            self.success.apply_to("PASS").to_string()
        } else {
            self.error.apply_to("FAIL").to_string()
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

/// Check if colors should be enabled.
pub fn should_use_colors() -> bool {
    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }
    console::Term::stdout().is_term()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_theme_has_no_escapes() {
        let theme = Theme::plain();
        assert_eq!(theme.pass_fail(true), "PASS");
        assert_eq!(theme.pass_fail(false), "FAIL");
    }
}
