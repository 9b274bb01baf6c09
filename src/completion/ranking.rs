//! Filter, annotate and order raw candidates against the typed word

use std::cmp::Ordering;

use super::resolver::{DescriptionSource, RawCandidates};
use super::Candidate;
use crate::schema::{MagicSchema, Options, ValueKind};

/// How many values below one each synthesized chain produces, minus one
const INTEGER_DECIMAL_LIMIT: u32 = 0;
const DOUBLE_DECIMAL_LIMIT: u32 = 5;

/// Rank `raw` for the typed `word`: prefix matches first, then (for
/// non-numeric types) substring matches, each bucket sorted by
/// [`compare_candidates`].
pub(crate) fn rank_candidates(schema: &MagicSchema, raw: &RawCandidates, word: &str) -> Vec<Candidate> {
    let kind = raw
        .value_type
        .as_deref()
        .map(ValueKind::from_type_key)
        .unwrap_or(ValueKind::Other);

    let mut primary = raw.primary.clone();
    match kind {
        ValueKind::Integer => synthesize_numbers(&mut primary, raw.default_value.as_deref(), word, false),
        ValueKind::Double => synthesize_numbers(&mut primary, raw.default_value.as_deref(), word, true),
        _ => {}
    }

    let mut ranker = Ranker {
        schema,
        raw,
        kind,
        word,
        prefix: Vec::new(),
        contains: Vec::new(),
        found_default: false,
    };
    for (key, value) in &primary {
        ranker.consider(key, value.as_deref(), false);
    }
    if let Some(inherited) = &raw.inherited {
        for (key, value) in inherited {
            if !primary.contains_key(key) {
                ranker.consider(key, value.as_deref(), true);
            }
        }
    }
    ranker.add_missing_default();

    let Ranker {
        mut prefix,
        mut contains,
        ..
    } = ranker;
    prefix.sort_by(|a, b| compare_candidates(a, b, word));
    if kind.is_numeric() {
        return prefix;
    }
    contains.sort_by(|a, b| compare_candidates(a, b, word));
    prefix.extend(contains);
    prefix
}

struct Ranker<'a> {
    schema: &'a MagicSchema,
    raw: &'a RawCandidates,
    kind: ValueKind,
    word: &'a str,
    prefix: Vec<Candidate>,
    contains: Vec<Candidate>,
    found_default: bool,
}

impl Ranker<'_> {
    fn is_default(&self, key: &str) -> bool {
        self.raw.default_value.as_deref() == Some(key)
    }

    fn consider(&mut self, key: &str, value: Option<&str>, inherited: bool) {
        let is_default = self.is_default(key);
        self.found_default |= is_default;

        let match_text = format!("{}{}", key, value.map(trim_tags).unwrap_or(""));
        if !match_text.contains(self.word) {
            return;
        }
        let candidate = self.describe(key, value, inherited, is_default);
        if match_text.starts_with(self.word) {
            self.prefix.push(candidate);
        } else {
            self.contains.push(candidate);
        }
    }

    fn add_missing_default(&mut self) {
        if self.found_default {
            return;
        }
        let Some(default) = self.raw.default_value.as_deref() else {
            return;
        };
        if !default.contains(self.word) {
            return;
        }
        let candidate = self.describe(default, None, false, true);
        if default.starts_with(self.word) {
            self.prefix.push(candidate);
        } else {
            self.contains.push(candidate);
        }
    }

    fn describe(&self, key: &str, value: Option<&str>, inherited: bool, is_default: bool) -> Candidate {
        let text = format!("{}{}", key, self.raw.suffix);
        let (lines, mut importance) = match value {
            None => (Vec::new(), 0.0),
            Some(value) => self
                .lookup(value)
                .unwrap_or_else(|| (vec![value.to_string()], 0.0)),
        };
        let description = (!lines.is_empty()).then_some(lines);

        if importance == 0.0 && self.kind == ValueKind::Color {
            importance = hue(&text);
        }

        Candidate {
            label: key.to_string(),
            text,
            description,
            importance,
            inherited,
            is_default,
        }
    }

    /// Description and importance of the schema entry a candidate points at
    fn lookup(&self, value: &str) -> Option<(Vec<String>, f64)> {
        match self.raw.source {
            DescriptionSource::Properties => self
                .schema
                .property(value)
                .map(|property| (property.description.clone(), property.importance)),
            DescriptionSource::Actions => self
                .schema
                .actions
                .by_key(value)
                .map(|class| (class.description.clone(), class.importance)),
            DescriptionSource::Effects => self
                .schema
                .effects
                .by_key(value)
                .map(|class| (class.description.clone(), class.importance)),
            DescriptionSource::Literal => None,
        }
    }
}

/// Order: the exact word, the default, own before inherited, higher
/// importance, then text.
fn compare_candidates(a: &Candidate, b: &Candidate, word: &str) -> Ordering {
    (b.label == word)
        .cmp(&(a.label == word))
        .then_with(|| b.is_default.cmp(&a.is_default))
        .then_with(|| a.inherited.cmp(&b.inherited))
        .then_with(|| b.importance.total_cmp(&a.importance))
        .then_with(|| a.text.to_lowercase().cmp(&b.text.to_lowercase()))
        .then_with(|| a.text.cmp(&b.text))
}

/// Text after the last `>` of a description, dropping leading markup
pub(crate) fn trim_tags(description: &str) -> &str {
    match description.rfind('>') {
        Some(index) if index > 0 && index + 1 < description.len() => &description[index + 1..],
        _ => description,
    }
}

/// Add multiples of the default and powers of ten of the typed number
fn synthesize_numbers(values: &mut Options, default: Option<&str>, word: &str, decimal: bool) {
    let limit = if decimal {
        DOUBLE_DECIMAL_LIMIT
    } else {
        INTEGER_DECIMAL_LIMIT
    };
    let render = |value: f64| {
        if decimal {
            format_decimal(value)
        } else {
            format!("{}", value.floor() as i64)
        }
    };

    if let Some(default) = default.and_then(|default| default.trim().parse::<f64>().ok()) {
        for value in multiples(default, limit) {
            values.insert(render(value), None);
        }
    }

    if word.is_empty() {
        return;
    }
    values.insert(word.to_string(), None);
    let typed = if decimal {
        word.parse::<f64>().ok()
    } else {
        leading_integer(word)
    };
    if let Some(mut typed) = typed {
        for _ in 0..3 {
            typed *= 10.0;
            values.insert(render(typed), None);
        }
    }
}

/// ×2, ×10, then a halving and a tenth chain, each running until it has
/// produced `limit + 1` values below one.
fn multiples(value: f64, limit: u32) -> Vec<f64> {
    if !value.is_finite() {
        return Vec::new();
    }
    let mut out = vec![value * 2.0, value * 10.0];
    for divisor in [2.0, 10.0] {
        let mut remaining = limit + 1;
        let mut current = value;
        while remaining > 0 {
            current /= divisor;
            out.push(current);
            if current.abs() < 1.0 {
                remaining -= 1;
            }
        }
    }
    out
}

/// Leading `[+-]digits` of a word, like a lenient integer parse
fn leading_integer(word: &str) -> Option<f64> {
    let sign_len = usize::from(word.starts_with(['-', '+']));
    let digits = word[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(word.len() - sign_len);
    if digits == 0 {
        return None;
    }
    word[..sign_len + digits].parse::<i64>().ok().map(|n| n as f64)
}

/// At most four decimals, trailing zeros dropped
fn format_decimal(value: f64) -> String {
    let text = format!("{:.4}", value);
    let text = text.trim_end_matches('0').trim_end_matches('.');
    match text {
        "-0" | "" => "0".to_string(),
        other => other.to_string(),
    }
}

/// Hue in degrees of a `#RRGGBB` literal, 0 when it does not parse
fn hue(text: &str) -> f64 {
    let hex = text
        .trim()
        .trim_end_matches(": ")
        .trim_matches(|c| c == '\'' || c == '"')
        .trim_start_matches('#');
    let channel = |index: usize| {
        hex.get(index..index + 2)
            .and_then(|pair| u8::from_str_radix(pair, 16).ok())
            .map(|value| f64::from(value) / 255.0)
    };
    let (Some(r), Some(g), Some(b)) = (channel(0), channel(2), channel(4)) else {
        return 0.0;
    };

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let chroma = max - min;
    if max <= 0.0 || chroma <= 0.0 {
        return 0.0;
    }
    if r == max {
        let hue = 60.0 * ((g - b) / chroma);
        if hue < 0.0 {
            hue + 360.0
        } else {
            hue
        }
    } else if g == max {
        120.0 + 60.0 * ((b - r) / chroma)
    } else {
        240.0 + 60.0 * ((r - g) / chroma)
    }
}
