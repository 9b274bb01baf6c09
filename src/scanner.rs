//! Context around the cursor: sibling keys, the governing class and list shape

use std::collections::BTreeMap;

use crate::parser::{
    indent_width, is_blank_or_comment, is_list_item, leading_width, leaf_key, split_key_value,
    TextBuffer,
};
use crate::schema::{MagicSchema, Options, ACTION_SUFFIX};

/// Where the cursor sits relative to a surrounding list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPosition {
    /// Not a list element, or already on a `- ` line
    Plain,
    /// In the dash column of a list, so a new element needs a leading `- `
    NewItem,
    /// Between a list dash and the element's content column
    Misaligned,
}

/// The closest keyed line enclosing a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parent {
    pub line: usize,
    pub key: String,
    pub indent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    Map,
    List,
}

/// Element type one level below a map- or list-typed property
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionType {
    pub kind: CollectionKind,
    pub type_key: String,
    pub options: Options,
}

/// Append `suffix` unless the name already ends with it
pub fn add_suffix(name: &str, suffix: &str) -> String {
    if name.ends_with(suffix) {
        name.to_string()
    } else {
        format!("{}{}", name, suffix)
    }
}

/// Options of the key type of a map property, or the element type of a list
/// property. `None` for anything else.
pub fn map_or_list_value_type(schema: &MagicSchema, property_key: &str) -> Option<CollectionType> {
    let (_, type_def) = schema.property_type(property_key)?;
    let (kind, type_key) = match (&type_def.key_type, &type_def.value_type) {
        (Some(key_type), _) => (CollectionKind::Map, key_type),
        (None, Some(value_type)) => (CollectionKind::List, value_type),
        (None, None) => return None,
    };
    Some(CollectionType {
        kind,
        type_key: type_key.clone(),
        options: schema.options(type_key),
    })
}

/// Line scans over a text buffer
pub struct Scanner<'a, B: TextBuffer + ?Sized> {
    buffer: &'a B,
    tab_size: usize,
}

impl<'a, B: TextBuffer + ?Sized> Scanner<'a, B> {
    pub fn new(buffer: &'a B, tab_size: usize) -> Self {
        Self { buffer, tab_size }
    }

    pub fn buffer(&self) -> &'a B {
        self.buffer
    }

    fn indent(&self, text: &str) -> usize {
        indent_width(text, self.tab_size)
    }

    /// Keys and values at the same indentation as `line`, within the current
    /// block and the current list element.
    pub fn collect_siblings(&self, line: usize, indent: usize) -> BTreeMap<String, String> {
        let mut siblings = BTreeMap::new();
        let mut record = |text: &str| {
            if leaf_key(text).is_some() {
                let (key, value) = split_key_value(text);
                siblings.insert(key, value);
            }
        };

        // A line opening a list element has nothing of its own above it
        if !is_list_item(self.buffer.line(line)) {
            for index in (0..line).rev() {
                let text = self.buffer.line(index);
                if is_blank_or_comment(text) {
                    continue;
                }
                let this_indent = self.indent(text);
                if this_indent < indent {
                    break;
                }
                if this_indent == indent {
                    record(text);
                }
                if is_list_item(text) && this_indent <= indent {
                    break;
                }
            }
        }

        for index in line..self.buffer.line_count() {
            let text = self.buffer.line(index);
            if is_blank_or_comment(text) {
                continue;
            }
            let this_indent = self.indent(text);
            if index > line && is_list_item(text) && this_indent <= indent {
                break;
            }
            if this_indent < indent {
                break;
            }
            if this_indent == indent {
                record(text);
            }
        }

        siblings
    }

    /// The `class` declared beside `line`, with `suffix` appended if missing
    pub fn current_class(&self, line: usize, indent: usize, suffix: Option<&str>) -> Option<String> {
        let siblings = self.collect_siblings(line, indent);
        let class = siblings.get("class").filter(|value| !value.is_empty())?;
        Some(match suffix {
            Some(suffix) => add_suffix(class, suffix),
            None => class.clone(),
        })
    }

    /// Every `class:` declared in the spell's `actions:` block, as `…Action`
    /// names in order of appearance.
    ///
    /// `spell_line` is the spell key of a keyed document; without it the
    /// document root is the spell body.
    pub fn find_declared_action_classes(&self, spell_line: Option<usize>) -> Vec<String> {
        let count = self.buffer.line_count();
        let (start, body_indent) = match spell_line {
            None => (0, 0),
            Some(header) => {
                let header_indent = self.indent(self.buffer.line(header));
                let body = (header + 1..count)
                    .find(|&index| !is_blank_or_comment(self.buffer.line(index)));
                match body {
                    Some(index) if self.indent(self.buffer.line(index)) > header_indent => {
                        (index, self.indent(self.buffer.line(index)))
                    }
                    _ => return Vec::new(),
                }
            }
        };

        let mut actions_line = None;
        for index in start..count {
            let text = self.buffer.line(index);
            if is_blank_or_comment(text) {
                continue;
            }
            let this_indent = self.indent(text);
            if spell_line.is_some() && this_indent < body_indent {
                break;
            }
            if this_indent == body_indent && text.trim() == "actions:" {
                actions_line = Some(index);
                break;
            }
        }
        let Some(actions_line) = actions_line else {
            return Vec::new();
        };

        let mut classes = Vec::new();
        for index in actions_line + 1..count {
            let text = self.buffer.line(index);
            if is_blank_or_comment(text) {
                continue;
            }
            if self.indent(text) <= body_indent {
                break;
            }
            let (key, value) = split_key_value(text);
            if key == "class" && !value.is_empty() {
                let class = add_suffix(&value, ACTION_SUFFIX);
                if !classes.contains(&class) {
                    classes.push(class);
                }
            }
        }
        classes
    }

    /// The nearest earlier line starting exactly at column `indent`, trimmed
    pub fn previous_sibling(&self, line: usize, indent: usize) -> Option<String> {
        for index in (0..line).rev() {
            let text = self.buffer.line(index);
            if is_blank_or_comment(text) {
                continue;
            }
            let start = leading_width(text, self.tab_size);
            if start == indent {
                return Some(text.trim().to_string());
            }
            if start < indent {
                return None;
            }
        }
        None
    }

    /// The nearest earlier keyed line indented less than `indent`
    pub fn parent_key(&self, line: usize, indent: usize) -> Option<Parent> {
        (0..line).rev().find_map(|index| {
            let text = self.buffer.line(index);
            if is_blank_or_comment(text) {
                return None;
            }
            let this_indent = self.indent(text);
            if this_indent >= indent {
                return None;
            }
            leaf_key(text).map(|key| Parent {
                line: index,
                key: key.to_string(),
                indent: this_indent,
            })
        })
    }

    pub fn list_position(&self, line: usize, indent: usize) -> ListPosition {
        if is_list_item(self.buffer.line(line)) {
            return ListPosition::Plain;
        }
        for index in (0..line).rev() {
            let text = self.buffer.line(index);
            if is_blank_or_comment(text) {
                continue;
            }
            let start = leading_width(text, self.tab_size);
            if start > indent {
                continue;
            }
            if !is_list_item(text) {
                return ListPosition::Plain;
            }
            let content = self.indent(text);
            return if start == indent {
                ListPosition::NewItem
            } else if indent < content {
                ListPosition::Misaligned
            } else {
                ListPosition::Plain
            };
        }
        ListPosition::Plain
    }

    pub fn is_misaligned_list_item(&self, line: usize, indent: usize) -> bool {
        self.list_position(line, indent) == ListPosition::Misaligned
    }
}
