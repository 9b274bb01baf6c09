//! Completion provider implementation

mod ranking;
mod resolver;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionList as LspCompletionList, CompletionResponse,
    CompletionTextEdit, Documentation, MarkupContent, MarkupKind, Position, Range, TextEdit,
};
use tracing::debug;
use url::Url;

use crate::parser::{current_word, Document, TextBuffer};
use crate::schema::{FieldMap, MagicSchema};

pub(crate) use resolver::Request;

/// Which completion rules apply to a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// Spell definitions: properties, parameters, actions and effects
    #[default]
    Spells,
    /// Standalone effect definitions
    Effects,
}

impl Dialect {
    /// Effect files are named `effects.*` or live in an `effects` directory,
    /// everything else is a spell file
    pub fn for_uri(uri: &Url) -> Self {
        let segments: Vec<&str> = uri
            .path_segments()
            .map(Iterator::collect)
            .unwrap_or_default();
        let Some((file_name, directories)) = segments.split_last() else {
            return Dialect::Spells;
        };
        let stem = file_name
            .rsplit_once('.')
            .map(|(stem, _)| stem)
            .unwrap_or(file_name);
        if stem == "effects" || directories.contains(&"effects") {
            Dialect::Effects
        } else {
            Dialect::Spells
        }
    }

    /// Keys that may appear at the top of a spell or effect body
    pub(crate) fn root_properties(self, schema: &MagicSchema) -> &FieldMap {
        match self {
            Dialect::Spells => &schema.context.spell_properties,
            Dialect::Effects => &schema.context.effect_parameters,
        }
    }
}

/// Per-request settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompletionOptions {
    pub tab_size: usize,
    pub dialect: Dialect,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            tab_size: 4,
            dialect: Dialect::Spells,
        }
    }
}

/// Zero-based cursor position; `col` counts characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pub line: usize,
    pub col: usize,
}

impl Cursor {
    pub fn new(line: usize, col: usize) -> Self {
        Self { line, col }
    }
}

/// What the candidates complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Key,
    Value,
    Class,
}

/// One ranked suggestion
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Bare key or value
    pub label: String,
    /// Replacement text, the label plus any suffix such as `": "`
    pub text: String,
    pub description: Option<Vec<String>>,
    pub importance: f64,
    /// Drawn from a generic layer rather than the specific class
    pub inherited: bool,
    /// The current default value
    pub is_default: bool,
}

/// Ranked candidates and the span of the current line they replace
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionList {
    pub candidates: Vec<Candidate>,
    pub replace_from: usize,
    pub replace_to: usize,
    pub target: Target,
}

/// Compute completions at `cursor`, or `None` when there is nothing to offer
pub fn request_completions<B>(
    schema: &MagicSchema,
    buffer: &B,
    cursor: Cursor,
    options: CompletionOptions,
) -> Option<CompletionList>
where
    B: TextBuffer + ?Sized,
{
    if cursor.line >= buffer.line_count() {
        return None;
    }
    let line = buffer.line(cursor.line);
    if line.trim_start().starts_with('#') {
        return None;
    }

    let (replace_from, replace_to, word) = current_word(line, cursor.col);
    let request = Request::new(schema, buffer, cursor, options);
    let raw = resolver::resolve_candidates(&request);
    let target = raw.target;
    let candidates = ranking::rank_candidates(schema, &raw, &word);

    if candidates.iter().all(|candidate| candidate.text == word) {
        debug!("No completions for {:?} at {:?}", word, cursor);
        return None;
    }

    Some(CompletionList {
        candidates,
        replace_from,
        replace_to,
        target,
    })
}

/// Generate completion items for the given document and position
pub fn provide_completion(
    document: &Document,
    position: Position,
    schema: &MagicSchema,
    options: CompletionOptions,
) -> Option<CompletionResponse> {
    let cursor = Cursor::new(position.line as usize, position.character as usize);
    let list = request_completions(schema, document, cursor, options)?;

    let items = list
        .candidates
        .iter()
        .enumerate()
        .map(|(rank, candidate)| create_completion_item(candidate, rank, &list, position.line))
        .collect();

    // Ranking depends on the typed word, so clients must ask again as it grows
    Some(CompletionResponse::List(LspCompletionList {
        is_incomplete: true,
        items,
    }))
}

/// Render one candidate as an LSP completion item
fn create_completion_item(
    candidate: &Candidate,
    rank: usize,
    list: &CompletionList,
    line: u32,
) -> CompletionItem {
    let kind = match list.target {
        Target::Key => CompletionItemKind::PROPERTY,
        Target::Value => CompletionItemKind::VALUE,
        Target::Class => CompletionItemKind::CLASS,
    };
    let detail = if candidate.is_default {
        Some("default".to_string())
    } else if candidate.inherited {
        Some("inherited".to_string())
    } else {
        None
    };

    CompletionItem {
        label: candidate.label.clone(),
        kind: Some(kind),
        detail,
        documentation: candidate.description.as_ref().map(|lines| {
            Documentation::MarkupContent(MarkupContent {
                kind: MarkupKind::Markdown,
                value: lines.join("\n\n"),
            })
        }),
        preselect: candidate.is_default.then_some(true),
        sort_text: Some(format!("{:05}", rank)),
        filter_text: Some(candidate.label.clone()),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit {
            range: Range {
                start: Position::new(line, list.replace_from as u32),
                end: Position::new(line, list.replace_to as u32),
            },
            new_text: candidate.text.clone(),
        })),
        ..CompletionItem::default()
    }
}
