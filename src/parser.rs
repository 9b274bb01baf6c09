//! Document handling and line-level text utilities
//!
//! Completion never parses YAML: structure is recovered from indentation one
//! line at a time. The full `serde_yaml` parse below only feeds diagnostics.

use serde_yaml::Value as YamlValue;
use tracing::debug;

/// Read access to the lines of a document
pub trait TextBuffer {
    fn line_count(&self) -> usize;

    /// Text of line `index`, empty when out of range
    fn line(&self, index: usize) -> &str;
}

impl TextBuffer for [String] {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line(&self, index: usize) -> &str {
        self.get(index).map(String::as_str).unwrap_or("")
    }
}

impl TextBuffer for [&str] {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line(&self, index: usize) -> &str {
        self.get(index).copied().unwrap_or("")
    }
}

/// A YAML syntax error with a zero-based position
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    pub line: u32,
    pub column: u32,
    pub message: String,
}

/// An open spell document
#[derive(Debug, Clone)]
pub struct Document {
    /// The raw text of the document
    pub text: String,
    /// Lines in the document for position lookup
    pub lines: Vec<String>,
    /// First YAML syntax error, if any
    pub syntax_error: Option<SyntaxError>,
}

impl Document {
    /// Create a new document from the given text
    pub fn new(text: String) -> Self {
        let lines = split_lines(&text);
        Self {
            text,
            lines,
            syntax_error: None,
        }
    }

    /// Check the document for YAML syntax errors
    pub fn parse(&mut self) -> Result<(), serde_yaml::Error> {
        self.syntax_error = None;
        match serde_yaml::from_str::<YamlValue>(&self.text) {
            Ok(_) => Ok(()),
            Err(e) => {
                let (line, column) = e
                    .location()
                    .map(|location| {
                        (
                            location.line().saturating_sub(1) as u32,
                            location.column().saturating_sub(1) as u32,
                        )
                    })
                    .unwrap_or((0, 0));
                debug!("YAML syntax error at {}:{}: {}", line, column, e);
                self.syntax_error = Some(SyntaxError {
                    line,
                    column,
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }
}

impl TextBuffer for Document {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> &str {
        self.lines.line(index)
    }
}

/// Split text into lines, keeping a final empty line after a trailing newline
/// so the cursor can sit there.
pub fn split_lines(text: &str) -> Vec<String> {
    text.split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
        .collect()
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Characters that make up a completable word
fn is_token_char(c: char) -> bool {
    is_word_char(c) || c == '.'
}

/// Indentation width of a line in expanded columns.
///
/// Everything before the first word character or colon counts, so a list
/// dash is part of the indentation: `"  - class: X"` is 4 wide.
pub fn indent_width(line: &str, tab_size: usize) -> usize {
    line.chars()
        .take_while(|&c| !is_word_char(c) && c != ':')
        .map(|c| if c == '\t' { tab_size } else { 1 })
        .sum()
}

/// Width of the leading whitespace only; the column of a list dash
pub fn leading_width(line: &str, tab_size: usize) -> usize {
    line.chars()
        .take_while(|c| c.is_whitespace())
        .map(|c| if c == '\t' { tab_size } else { 1 })
        .sum()
}

pub fn is_blank_or_comment(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with('#')
}

pub fn is_list_item(line: &str) -> bool {
    line.trim_start().starts_with('-')
}

/// Split `<indent><dashes><word>:<rest>` into word and rest
fn split_leaf(line: &str) -> Option<(&str, &str)> {
    if line.trim_start().starts_with('#') {
        return None;
    }
    let body = line.trim_start_matches(|c: char| c.is_whitespace() || c == '-');
    let key_len = body.find(|c: char| !is_word_char(c)).unwrap_or(body.len());
    if key_len == 0 {
        return None;
    }
    let rest = body[key_len..].trim_start().strip_prefix(':')?;
    Some((&body[..key_len], rest))
}

/// Key of a `key: value` line, with or without a value
pub fn leaf_key(line: &str) -> Option<&str> {
    split_leaf(line).map(|(key, _)| key)
}

/// Key of a line that opens a block (`key:` with nothing after the colon)
pub fn object_key(line: &str) -> Option<&str> {
    split_leaf(line)
        .filter(|(_, rest)| rest.trim().is_empty())
        .map(|(key, _)| key)
}

/// Split a line into trimmed key and value, ignoring one leading list dash
pub fn split_key_value(line: &str) -> (String, String) {
    let trimmed = line.trim_start();
    let line = trimmed.strip_prefix('-').unwrap_or(trimmed);
    match line.split_once(':') {
        Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
        None => (line.trim().to_string(), String::new()),
    }
}

/// The word under the cursor: `(start, end, word)` in character columns
pub fn current_word(line: &str, col: usize) -> (usize, usize, String) {
    let chars: Vec<char> = line.chars().collect();
    let col = col.min(chars.len());

    let mut start = col;
    while start > 0 && is_token_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = col;
    while end < chars.len() && is_token_char(chars[end]) {
        end += 1;
    }

    (start, end, chars[start..end].iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_width() {
        assert_eq!(indent_width("actions:", 4), 0);
        assert_eq!(indent_width("  cast:", 4), 2);
        assert_eq!(indent_width("  - class: Fireball", 4), 4);
        assert_eq!(indent_width("\tcast:", 4), 4);
        assert_eq!(indent_width("\t- class: Fireball", 2), 4);
        assert_eq!(indent_width("    ", 4), 4);
        assert_eq!(indent_width("", 4), 0);
    }

    #[test]
    fn test_leading_width() {
        assert_eq!(leading_width("  - class: Fireball", 4), 2);
        assert_eq!(leading_width("\t- x", 4), 4);
    }

    #[test]
    fn test_leaf_key() {
        assert_eq!(leaf_key("cooldown: 1000"), Some("cooldown"));
        assert_eq!(leaf_key("  - class: Fireball"), Some("class"));
        assert_eq!(leaf_key("  cast:"), Some("cast"));
        assert_eq!(leaf_key("  target :self"), Some("target"));
        assert_eq!(leaf_key("  # class: Fireball"), None);
        assert_eq!(leaf_key("  coold"), None);
        assert_eq!(leaf_key("  - speed"), None);
        assert_eq!(leaf_key(""), None);
    }

    #[test]
    fn test_object_key() {
        assert_eq!(object_key("actions:"), Some("actions"));
        assert_eq!(object_key("  - effectlib:  "), Some("effectlib"));
        assert_eq!(object_key("  - class: Fireball"), None);
    }

    #[test]
    fn test_split_key_value() {
        assert_eq!(
            split_key_value("  - class: Fireball"),
            ("class".to_string(), "Fireball".to_string())
        );
        assert_eq!(
            split_key_value("    icon_url: http://textures/x"),
            ("icon_url".to_string(), "http://textures/x".to_string())
        );
        assert_eq!(split_key_value("  cast:"), ("cast".to_string(), String::new()));
        assert_eq!(split_key_value("  speed"), ("speed".to_string(), String::new()));
    }

    #[test]
    fn test_current_word() {
        assert_eq!(current_word("  target: sel", 13), (10, 13, "sel".to_string()));
        assert_eq!(current_word("  radius: 1.5", 11), (10, 13, "1.5".to_string()));
        assert_eq!(current_word("  coo", 4), (2, 5, "coo".to_string()));
        assert_eq!(current_word("    ", 4), (4, 4, String::new()));
        assert_eq!(current_word("short", 40), (0, 5, "short".to_string()));
    }

    #[test]
    fn test_document_lines_keep_trailing_line() {
        let document = Document::new("actions:\r\n  cast:\n".to_string());
        assert_eq!(document.line_count(), 3);
        assert_eq!(document.line(1), "  cast:");
        assert_eq!(document.line(2), "");
        assert_eq!(document.line(7), "");
    }

    #[test]
    fn test_parse_reports_syntax_error() {
        let mut document = Document::new("fireball:\n  actions: [unclosed\n".to_string());
        assert!(document.parse().is_err());
        assert!(document.syntax_error.is_some());

        let mut valid = Document::new("fireball:\n  cooldown: 1000\n".to_string());
        assert!(valid.parse().is_ok());
        assert!(valid.syntax_error.is_none());
    }
}
