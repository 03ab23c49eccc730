//! Where reports go.

use std::io::{self, Write};

/// Sink for report lines.
///
/// Reports only say what a line means; the sink picks its layout.
pub trait Output {
    fn heading(&mut self, text: &str);

    /// Opens a named group of lines.
    fn group(&mut self, name: &str);

    fn field(&mut self, key: &str, value: &str);

    fn entry(&mut self, text: &str);

    /// A file that did not exist before.
    fn created(&mut self, text: &str);

    /// A file that was overwritten.
    fn replaced(&mut self, text: &str);

    fn warning(&mut self, msg: &str);

    /// Text printed as is, such as a rendered diagnostic.
    fn block(&mut self, text: &str);

    fn blank(&mut self);
}

/// Something a command prints when it is done.
pub trait Report {
    fn render(&self, out: &mut dyn Output);
}

/// Prints to stdout, warnings to stderr.
///
/// Write errors are dropped.
pub struct TerminalOutput {
    stdout: io::Stdout,
    key_width: usize,
}

impl TerminalOutput {
    pub fn new() -> Self {
        Self {
            stdout: io::stdout(),
            key_width: 12,
        }
    }

    fn line(&mut self, text: std::fmt::Arguments) {
        let _ = writeln!(self.stdout.lock(), "{}", text);
    }
}

impl Default for TerminalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl Output for TerminalOutput {
    fn heading(&mut self, text: &str) {
        self.line(format_args!("{}", text));
        self.line(format_args!("{}", "─".repeat(text.chars().count())));
    }

    fn group(&mut self, name: &str) {
        self.line(format_args!("{}:", name));
    }

    fn field(&mut self, key: &str, value: &str) {
        let width = self.key_width;
        self.line(format_args!("  {:<width$}{}", key, value));
    }

    fn entry(&mut self, text: &str) {
        self.line(format_args!("  - {}", text));
    }

    fn created(&mut self, text: &str) {
        self.line(format_args!("  + {}", text));
    }

    fn replaced(&mut self, text: &str) {
        self.line(format_args!("  ~ {}", text));
    }

    fn warning(&mut self, msg: &str) {
        let _ = writeln!(io::stderr().lock(), "warning: {}", msg);
    }

    fn block(&mut self, text: &str) {
        self.line(format_args!("{}", text));
    }

    fn blank(&mut self) {
        self.line(format_args!(""));
    }
}
