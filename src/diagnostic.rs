use std::fmt;

/// A byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn dummy() -> Self {
        Self { start: 0, end: 0 }
    }

    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A label pointing at a span in the source.
#[derive(Debug, Clone)]
pub struct Label {
    pub span: Span,
    pub message: String,
}

impl Label {
    pub fn primary(span: Span, message: impl Into<String>) -> Self {
        Self {
            span,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
        }
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.labels.push(label);
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.notes.push(format!("help: {}", help.into()));
        self
    }
}

/// Computes 1-based line and column from a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

fn line_content(source: &str, line_num: usize) -> Option<&str> {
    source.split('\n').nth(line_num.saturating_sub(1))
}

/// Renders diagnostics in the usual compiler layout:
/// header, location, source line, caret underline, notes.
pub struct DiagnosticRenderer<'a> {
    source: &'a str,
    file_name: &'a str,
    use_color: bool,
}

impl<'a> DiagnosticRenderer<'a> {
    pub fn new(source: &'a str, file_name: &'a str, use_color: bool) -> Self {
        Self {
            source,
            file_name,
            use_color,
        }
    }

    pub fn render(&self, diagnostic: &Diagnostic) -> String {
        let mut out = String::new();

        let severity = match diagnostic.severity {
            Severity::Error => self.paint("\x1b[1;31m", "error"),
            Severity::Warning => self.paint("\x1b[1;33m", "warning"),
        };
        out.push_str(&format!(
            "{}: {}\n",
            severity,
            self.paint("\x1b[1m", &diagnostic.message)
        ));

        if let Some(label) = diagnostic.labels.first() {
            let (line, col) = line_col(self.source, label.span.start);
            out.push_str(&format!(
                "  {} {}:{}:{}\n",
                self.paint("\x1b[34m", "-->"),
                self.file_name,
                line,
                col
            ));

            if let Some(content) = line_content(self.source, line) {
                let gutter = line.to_string();
                let pad = " ".repeat(gutter.len());
                out.push_str(&format!("{} {}\n", pad, self.paint("\x1b[34m", "|")));
                out.push_str(&format!(
                    "{} {} {}\n",
                    self.paint("\x1b[34m", &gutter),
                    self.paint("\x1b[34m", "|"),
                    content
                ));

                let width = label.span.end.saturating_sub(label.span.start).max(1);
                let underline =
                    format!("{}{}", " ".repeat(col.saturating_sub(1)), "^".repeat(width));
                out.push_str(&format!(
                    "{} {} {}",
                    pad,
                    self.paint("\x1b[34m", "|"),
                    self.paint("\x1b[31m", &underline)
                ));
                if !label.message.is_empty() {
                    out.push(' ');
                    out.push_str(&self.paint("\x1b[31m", &label.message));
                }
                out.push('\n');
            }
        }

        for note in &diagnostic.notes {
            out.push_str(&format!("  {} {}\n", self.paint("\x1b[34m", "="), note));
        }

        out
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_color {
            format!("{}{}\x1b[0m", code, text)
        } else {
            text.to_string()
        }
    }
}

pub fn render_diagnostics(
    source: &str,
    file_name: &str,
    diagnostics: &[Diagnostic],
    use_color: bool,
) -> String {
    let renderer = DiagnosticRenderer::new(source, file_name, use_color);
    let mut out = String::new();
    for diagnostic in diagnostics {
        out.push_str(&renderer.render(diagnostic));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_col() {
        let source = "var x = 5;\nvar y = 10;";
        assert_eq!(line_col(source, 0), (1, 1));
        assert_eq!(line_col(source, 4), (1, 5));
        assert_eq!(line_col(source, 11), (2, 1));
        assert_eq!(line_col(source, 15), (2, 5));
    }

    #[test]
    fn test_span_merge() {
        let merged = Span::new(5, 10).merge(Span::new(8, 15));
        assert_eq!(merged.start, 5);
        assert_eq!(merged.end, 15);
    }

    #[test]
    fn test_render_points_at_offending_line() {
        let source = "var x = ;\n";
        let diagnostic = Diagnostic::error("expected expression")
            .with_label(Label::primary(Span::new(8, 9), "here"))
            .with_help("provide a value after `=`");

        let renderer = DiagnosticRenderer::new(source, "script.ebs", false);
        let output = renderer.render(&diagnostic);

        assert!(output.contains("error: expected expression"));
        assert!(output.contains("script.ebs:1:9"));
        assert!(output.contains('^'));
    }
}
