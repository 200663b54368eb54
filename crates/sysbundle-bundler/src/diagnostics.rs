//! Diagnostic extraction from Rolldown errors.
//!
//! Rolldown reports build failures as a batch of diagnostics. We only depend
//! on their formatted representation, so upstream API changes do not leak
//! into the error types of this crate.

use serde::{Deserialize, Serialize};

/// Extracted diagnostic information from the bundling backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedDiagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub help: Option<String>,
}

/// Diagnostic kind (subset of Rolldown's event kinds we distinguish).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ParseError,
    UnresolvedEntry,
    UnresolvedImport,
    MissingExport,
    Plugin,
    Other,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            DiagnosticKind::ParseError => "ParseError",
            DiagnosticKind::UnresolvedEntry => "UnresolvedEntry",
            DiagnosticKind::UnresolvedImport => "UnresolvedImport",
            DiagnosticKind::MissingExport => "MissingExport",
            DiagnosticKind::Plugin => "Plugin",
            DiagnosticKind::Other => "Error",
        };
        f.write_str(name)
    }
}

impl ExtractedDiagnostic {
    /// A diagnostic carrying only a message.
    pub fn message(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            file: None,
            line: None,
            column: None,
            help: None,
        }
    }
}

impl std::fmt::Display for ExtractedDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(file) = &self.file {
            write!(f, " ({file}")?;
            if let Some(line) = self.line {
                write!(f, ":{line}")?;
                if let Some(column) = self.column {
                    write!(f, ":{column}")?;
                }
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Concatenate diagnostics into one human-readable block.
pub fn render(diagnostics: &[ExtractedDiagnostic]) -> String {
    match diagnostics {
        [] => "an unknown error".to_string(),
        [single] => single.to_string(),
        many => format!(
            "{} errors:\n{}",
            many.len(),
            many.iter()
                .map(|d| format!("  - {d}"))
                .collect::<Vec<_>>()
                .join("\n")
        ),
    }
}

/// Extract diagnostics from a Rolldown error value.
pub fn extract_from_rolldown_error(error: &dyn std::fmt::Debug) -> Vec<ExtractedDiagnostic> {
    let error_str = format!("{error:?}");

    let parts: Vec<&str> = error_str
        .split("BuildDiagnostic")
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != "Batched" && *s != "{" && *s != "[")
        .collect();

    if parts.len() > 1 {
        parts.into_iter().map(extract_single).collect()
    } else {
        vec![extract_single(&error_str)]
    }
}

fn extract_single(text: &str) -> ExtractedDiagnostic {
    let kind = if text.contains("UnresolvedEntry") {
        DiagnosticKind::UnresolvedEntry
    } else if text.contains("UnresolvedImport") || text.contains("Could not resolve") {
        DiagnosticKind::UnresolvedImport
    } else if text.contains("MissingExport") {
        DiagnosticKind::MissingExport
    } else if text.contains("Parse") || text.contains("Unexpected token") {
        DiagnosticKind::ParseError
    } else if text.contains("Plugin") {
        DiagnosticKind::Plugin
    } else {
        DiagnosticKind::Other
    };

    let file = extract_file_path(text);
    let (line, column) = file
        .as_deref()
        .and_then(|f| text.find(f).map(|pos| &text[pos + f.len()..]))
        .map(extract_line_column)
        .unwrap_or((None, None));

    ExtractedDiagnostic {
        kind,
        message: text.to_string(),
        file,
        line,
        column,
        help: extract_help_text(text),
    }
}

/// Find the first quoted or whitespace-delimited token ending in a script
/// extension.
fn extract_file_path(text: &str) -> Option<String> {
    text.split(|c: char| c.is_whitespace() || matches!(c, '"' | '\'' | '`' | ',' | '(' | ')'))
        .map(|token| token.split(':').next().unwrap_or(token))
        .find(|token| {
            [".js", ".cjs", ".mjs", ".ts", ".jsx", ".tsx", ".json"]
                .iter()
                .any(|ext| token.len() > ext.len() && token.ends_with(ext))
        })
        .map(str::to_string)
}

/// Parse a `:line:column` suffix directly following a file path.
fn extract_line_column(after_file: &str) -> (Option<u32>, Option<u32>) {
    let mut numbers = after_file
        .split(':')
        .skip(1)
        .take(2)
        .map(|part| {
            part.chars()
                .take_while(|c| c.is_ascii_digit())
                .collect::<String>()
                .parse::<u32>()
                .ok()
        });
    let line = numbers.next().flatten();
    let column = if line.is_some() {
        numbers.next().flatten()
    } else {
        None
    };
    (line, column)
}

fn extract_help_text(text: &str) -> Option<String> {
    ["help: ", "Help: ", "hint: ", "Hint: "]
        .iter()
        .find_map(|indicator| {
            let pos = text.find(indicator)?;
            let help = text[pos + indicator.len()..].lines().next()?.trim();
            (!help.is_empty()).then(|| help.to_string())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_unresolved_import() {
        #[derive(Debug)]
        struct Fake(&'static str);

        let diags = extract_from_rolldown_error(&Fake(
            "UnresolvedImport: Could not resolve 'left-pad' in /repo/src/glob.js:3:14",
        ));
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].kind, DiagnosticKind::UnresolvedImport);
        assert_eq!(diags[0].file.as_deref(), Some("/repo/src/glob.js"));
        assert_eq!(diags[0].line, Some(3));
        assert_eq!(diags[0].column, Some(14));
    }

    #[test]
    fn test_extract_help_text() {
        assert_eq!(
            extract_help_text("Parse error\nhelp: add a semicolon\nmore"),
            Some("add a semicolon".to_string())
        );
        assert_eq!(extract_help_text("nothing here"), None);
    }

    #[test]
    fn test_render_single_and_many() {
        let one = ExtractedDiagnostic::message(DiagnosticKind::ParseError, "bad token");
        assert_eq!(render(std::slice::from_ref(&one)), "ParseError: bad token");

        let two = ExtractedDiagnostic::message(DiagnosticKind::Other, "second");
        let rendered = render(&[one, two]);
        assert!(rendered.starts_with("2 errors:"));
        assert!(rendered.contains("  - ParseError: bad token"));
        assert!(rendered.contains("  - Error: second"));
    }

    #[test]
    fn test_display_includes_location() {
        let mut diag = ExtractedDiagnostic::message(DiagnosticKind::MissingExport, "no 'x'");
        diag.file = Some("a.js".to_string());
        diag.line = Some(2);
        diag.column = Some(7);
        assert_eq!(diag.to_string(), "MissingExport: no 'x' (a.js:2:7)");
    }
}
