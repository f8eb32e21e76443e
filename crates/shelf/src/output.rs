//! Colored status lines on stderr.

use console::{Style, Term};

/// Terminal output formatter.
pub(crate) struct Output {
    term: Term,
    success: Style,
    warning: Style,
    error: Style,
    url: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            success: Style::new().green(),
            warning: Style::new().yellow(),
            error: Style::new().red().bold(),
            url: Style::new().cyan().bold(),
        }
    }

    fn line(&self, text: &str) {
        // Status output is best effort.
        let _ = self.term.write_line(text);
    }

    pub(crate) fn info(&self, msg: &str) {
        self.line(msg);
    }

    pub(crate) fn success(&self, msg: &str) {
        self.line(&self.success.apply_to(msg).to_string());
    }

    pub(crate) fn warning(&self, msg: &str) {
        self.line(&self.warning.apply_to(msg).to_string());
    }

    pub(crate) fn error(&self, msg: &str) {
        self.line(&self.error.apply_to(msg).to_string());
    }

    /// Print `label` followed by the server URL, base path included.
    pub(crate) fn address(&self, label: &str, host: &str, port: u16, base_path: &str) {
        let url = format!("http://{host}:{port}{base_path}");
        self.line(&format!("{label} {}", self.url.apply_to(url)));
    }
}
