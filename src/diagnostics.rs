//! Validation and diagnostics

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

use crate::parser::{Document, TextBuffer};

/// Source name attached to every diagnostic
pub const DIAGNOSTIC_SOURCE: &str = "magic-spell-ls";

/// Generate diagnostics for the given document.
///
/// Only YAML syntax is checked; the document must have been parsed first.
pub fn validate_document(document: &Document) -> Vec<Diagnostic> {
    let Some(error) = &document.syntax_error else {
        return Vec::new();
    };

    // Underline from the error column to the end of its line
    let line_len = document.line(error.line as usize).chars().count() as u32;
    let end = line_len.max(error.column + 1);
    let range = Range {
        start: Position::new(error.line, error.column),
        end: Position::new(error.line, end),
    };

    vec![Diagnostic {
        range,
        severity: Some(DiagnosticSeverity::ERROR),
        code: None,
        code_description: None,
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: error.message.clone(),
        related_information: None,
        tags: None,
        data: None,
    }]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(text: &str) -> Document {
        let mut document = Document::new(text.to_string());
        let _ = document.parse();
        document
    }

    #[test]
    fn test_valid_document_has_no_diagnostics() {
        let document = parsed("fireball:\n  cooldown: 1000\n");
        assert!(validate_document(&document).is_empty());
    }

    #[test]
    fn test_syntax_error_is_reported() {
        let document = parsed("fireball:\n  cooldown: [1000\n  range: 3\n");
        let diagnostics = validate_document(&document);
        assert_eq!(diagnostics.len(), 1);
        let diagnostic = &diagnostics[0];
        assert_eq!(diagnostic.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(diagnostic.source.as_deref(), Some(DIAGNOSTIC_SOURCE));
        assert!(diagnostic.range.start.line >= 1);
    }

    #[test]
    fn test_unparsed_document_has_no_diagnostics() {
        let document = Document::new("a: [".to_string());
        assert!(validate_document(&document).is_empty());
    }
}
