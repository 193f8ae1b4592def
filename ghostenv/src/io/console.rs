//! User-facing output.
//!
//! Progress lines and panels go to stderr so stdout stays with the user's
//! script; the retained-environment report goes to stdout.

use std::fmt::Display;

#[derive(Debug, Clone, Copy, Default)]
pub struct Console {
    quiet: bool,
}

impl Console {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    /// Progress line. Suppressed when quiet.
    pub fn step(&self, message: impl Display) {
        if !self.quiet {
            eprintln!("{message}");
        }
    }

    /// Line that must reach the user even when quiet.
    pub fn alert(&self, message: impl Display) {
        eprintln!("{message}");
    }

    /// Informational panel. Suppressed when quiet.
    pub fn panel(&self, title: &str, body: &str) {
        if !self.quiet {
            eprint!("{}", render_panel(title, body));
        }
    }

    /// Error panel. Always shown.
    pub fn error(&self, title: &str, body: &str) {
        eprint!("{}", render_panel(title, body));
    }

    /// Result panel for the caller. Always shown, on stdout.
    pub fn report(&self, title: &str, body: &str) {
        print!("{}", render_panel(title, body));
    }
}

/// Render `body` in a box with `title` centered in a header row.
pub fn render_panel(title: &str, body: &str) -> String {
    let lines: Vec<&str> = body.lines().collect();
    let inner = lines
        .iter()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
        .max(title.chars().count());
    let border = format!("+{}+\n", "-".repeat(inner + 2));

    let mut out = String::new();
    out.push_str(&border);
    out.push_str(&format!("| {title:^inner$} |\n"));
    out.push_str(&border);
    for line in lines {
        out.push_str(&format!("| {line:<inner$} |\n"));
    }
    out.push_str(&border);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panel_pads_to_widest_line() {
        let panel = render_panel("ghostenv", "Created temporary environment\nok");
        let expected = "\
+-------------------------------+
|           ghostenv            |
+-------------------------------+
| Created temporary environment |
| ok                            |
+-------------------------------+
";
        assert_eq!(panel, expected);
    }

    #[test]
    fn panel_grows_to_fit_title() {
        let panel = render_panel("Installation Error", "x");
        let first = panel.lines().next().expect("border");
        assert_eq!(first.len(), "Installation Error".len() + 4);
        assert!(panel.contains("| x                  |"));
    }
}
