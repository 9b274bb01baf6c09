//! Reconstruct the chain of enclosing keys from indentation alone

use crate::parser::{indent_width, is_blank_or_comment, leaf_key, object_key, TextBuffer};
use crate::schema::FieldMap;

/// One element of the hierarchy with the line it was read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub key: String,
    pub line: usize,
    pub indent: usize,
}

/// Enclosing keys of the cursor, outermost first.
///
/// The last element is the key of the cursor line, or `""` when that line has
/// no key yet. A cursor in column 0 is always a new top-level key (`[""]`).
pub fn resolve_hierarchy<B>(buffer: &B, line: usize, col: usize, tab_size: usize) -> Vec<String>
where
    B: TextBuffer + ?Sized,
{
    walk_hierarchy(buffer, line, col, tab_size)
        .into_iter()
        .map(|ancestor| ancestor.key)
        .collect()
}

pub(crate) fn walk_hierarchy<B>(buffer: &B, line: usize, col: usize, tab_size: usize) -> Vec<Ancestor>
where
    B: TextBuffer + ?Sized,
{
    if line >= buffer.line_count() {
        return Vec::new();
    }

    let text = buffer.line(line);
    let indent = indent_width(text, tab_size).min(col);
    let key = leaf_key(text).unwrap_or("").to_string();

    if col == 0 {
        return vec![Ancestor {
            key: String::new(),
            line,
            indent: 0,
        }];
    }

    let mut path = vec![Ancestor { key, line, indent }];
    let mut reference = indent;
    let mut current = line;
    while reference > 0 {
        let Some(opener) = enclosing_block(buffer, current, reference, tab_size) else {
            break;
        };
        let opener_text = buffer.line(opener);
        reference = indent_width(opener_text, tab_size);
        current = opener;
        path.push(Ancestor {
            key: object_key(opener_text).unwrap_or("").to_string(),
            line: opener,
            indent: reference,
        });
    }

    path.reverse();
    path
}

/// Nearest preceding `key:` block opener indented less than `reference`
fn enclosing_block<B>(buffer: &B, line: usize, reference: usize, tab_size: usize) -> Option<usize>
where
    B: TextBuffer + ?Sized,
{
    (0..line).rev().find(|&index| {
        let text = buffer.line(index);
        !is_blank_or_comment(text)
            && object_key(text).is_some()
            && indent_width(text, tab_size) < reference
    })
}

/// A hierarchy path normalized so index 0 is always the spell.
///
/// Spell files come in two layouts: keyed, with spell names at the root and
/// each spell body indented below, and bare, where the root is a single spell
/// body. Bare paths get an empty spell key prepended so both layouts share the
/// same depth numbering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellPath {
    segments: Vec<String>,
    spell_line: Option<usize>,
}

impl SpellPath {
    /// `root_properties` are the keys that may appear at the top of a spell body
    pub fn normalize(ancestors: &[Ancestor], root_properties: &FieldMap) -> Self {
        let bare = match ancestors {
            [] => false,
            [only] if only.key.is_empty() => true,
            [first, ..] => root_properties.contains_key(&first.key),
        };

        let mut segments: Vec<String> = ancestors.iter().map(|a| a.key.clone()).collect();
        if bare {
            segments.insert(0, String::new());
        }

        Self {
            segments,
            spell_line: if bare {
                None
            } else {
                ancestors.first().map(|a| a.line)
            },
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Segment at `index`, empty when out of range
    pub fn get(&self, index: usize) -> &str {
        self.segments.get(index).map(String::as_str).unwrap_or("")
    }

    /// Key of the cursor line, `""` when a new key is being typed
    pub fn field(&self) -> &str {
        self.segments.last().map(String::as_str).unwrap_or("")
    }

    /// The key directly enclosing the cursor line
    pub fn parent(&self) -> &str {
        match self.segments.len() {
            0 | 1 => "",
            len => &self.segments[len - 2],
        }
    }

    /// Whether the cursor line is still waiting for a key
    pub fn awaiting_key(&self) -> bool {
        self.field().is_empty()
    }

    /// Line of the spell key in a keyed document
    pub fn spell_line(&self) -> Option<usize> {
        self.spell_line
    }

    /// Forget the cursor line's key, as if it were still being typed
    pub(crate) fn clear_field(&mut self) {
        if let Some(last) = self.segments.last_mut() {
            last.clear();
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(lines: &[&str], line: usize, col: usize) -> Vec<String> {
        resolve_hierarchy(lines, line, col, 4)
    }

    fn roots() -> FieldMap {
        ["actions", "effects", "parameters", "costs"]
            .into_iter()
            .map(|key| (key.to_string(), key.to_string()))
            .collect()
    }

    #[test]
    fn test_new_top_level_key() {
        assert_eq!(resolve(&[""], 0, 0), vec![""]);
        assert_eq!(resolve(&["cooldown: 100"], 0, 0), vec![""]);
        assert_eq!(resolve(&["coo"], 0, 3), vec![""]);
        assert_eq!(resolve(&["cooldown: 1"], 0, 11), vec!["cooldown"]);
    }

    #[test]
    fn test_out_of_range_is_empty() {
        assert!(resolve(&["actions:"], 4, 2).is_empty());
    }

    #[test]
    fn test_nested_blocks() {
        let doc = [
            "fireball:",
            "  actions:",
            "    cast:",
            "    - class: Projectile",
            "      radius: 2",
        ];
        assert_eq!(resolve(&doc, 4, 15), vec!["fireball", "actions", "cast", "radius"]);
        assert_eq!(resolve(&doc, 3, 20), vec!["fireball", "actions", "cast", "class"]);
        assert_eq!(resolve(&doc, 2, 9), vec!["fireball", "actions", "cast"]);
    }

    #[test]
    fn test_blank_cursor_line() {
        let doc = ["fireball:", "  parameters:", "    "];
        assert_eq!(resolve(&doc, 2, 4), vec!["fireball", "parameters", ""]);
        // Cursor left of the line's whitespace
        assert_eq!(resolve(&doc, 2, 2), vec!["fireball", ""]);
    }

    #[test]
    fn test_skips_comments_blank_lines_and_values() {
        let doc = [
            "fireball:",
            "  parameters:",
            "    # target:",
            "",
            "    range: 32",
            "    target: ",
        ];
        assert_eq!(resolve(&doc, 5, 12), vec!["fireball", "parameters", "target"]);
    }

    #[test]
    fn test_tabs_compare_with_spaces() {
        let doc = ["fireball:", "\tparameters:", "        rad"];
        assert_eq!(resolve_hierarchy(&doc[..], 2, 11, 4), vec!["fireball", "parameters", ""]);
    }

    #[test]
    fn test_depth_plus_one() {
        let doc = ["a:", "  b:", "    c:", "      d:", "        "];
        for depth in 1..doc.len() {
            let line = doc[depth];
            let path = resolve(&doc, depth, line.len());
            assert_eq!(path.len(), depth + 1, "line {}", depth);
        }
    }

    #[test]
    fn test_normalize_bare_and_keyed() {
        let bare_doc = ["actions:", "  - class: Fireball", "    "];
        let bare = SpellPath::normalize(&walk_hierarchy(&bare_doc[..], 2, 4, 4), &roots());
        assert_eq!(bare.segments(), ["", "actions", ""]);
        assert_eq!(bare.spell_line(), None);
        assert_eq!(bare.parent(), "actions");
        assert!(bare.awaiting_key());

        let keyed_doc = ["fireball:", "  actions:", "    "];
        let keyed = SpellPath::normalize(&walk_hierarchy(&keyed_doc[..], 2, 4, 4), &roots());
        assert_eq!(keyed.segments(), ["fireball", "actions", ""]);
        assert_eq!(keyed.spell_line(), Some(0));

        let root = SpellPath::normalize(&walk_hierarchy(&[""][..], 0, 0, 4), &roots());
        assert_eq!(root.segments(), ["", ""]);
        assert_eq!(root.get(9), "");
    }
}
