//! Hover information provider

use tower_lsp::lsp_types::{Hover, HoverContents, MarkupContent, MarkupKind, Position, Range};

use crate::completion::{CompletionOptions, Request};
use crate::parser::{Document, TextBuffer};
use crate::schema::MagicSchema;

/// Generate hover information for the key on the hovered line
pub fn provide_hover(
    document: &Document,
    position: Position,
    schema: &MagicSchema,
    options: CompletionOptions,
) -> Option<Hover> {
    let line = position.line as usize;
    if line >= document.line_count() {
        return None;
    }
    let (request, key) = Request::for_existing_key(schema, document, line, options)?;
    let (start, end) = key_span(document.line(line), &key)?;
    let character = position.character;
    if character < start || character > end {
        return None;
    }

    let documentation = describe_key(&request, &key)?;
    Some(Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: documentation,
        }),
        range: Some(Range {
            start: Position::new(position.line, start),
            end: Position::new(position.line, end),
        }),
    })
}

/// Markdown for a key: description, type and default
fn describe_key<B: TextBuffer + ?Sized>(request: &Request<'_, B>, key: &str) -> Option<String> {
    let schema = request.schema;
    let property_key = request.property_for_key(key)?;
    let property = schema.property(&property_key)?;

    let mut sections = vec![format!("**{}**", key)];
    if !property.description.is_empty() {
        sections.push(property.description.join("\n\n"));
    }
    sections.push(format!("Type: `{}`", property.type_key));
    if let Some(default) = request.default_for_property(&property_key) {
        sections.push(format!("Default: `{}`", default));
    }
    Some(sections.join("\n\n"))
}

/// Character columns of `key` on its line
fn key_span(line: &str, key: &str) -> Option<(u32, u32)> {
    let byte_start = line.find(key)?;
    let start = line[..byte_start].chars().count() as u32;
    Some((start, start + key.chars().count() as u32))
}
