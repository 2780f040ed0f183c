//! Ordered pattern dispatch for line-oriented pseudo-files.
//!
//! A [`Pattern`] describes the shape of one kind of line as a template of
//! whitespace-separated tokens. Each template token is either a literal or a
//! mix of literal affixes and typed placeholders:
//!
//! ```text
//! SMB Request/Response Buffer: {smb_buffer} Pool size: {smb_pool_size}
//! {session_id}) \\{server:text}\{share:rest}
//! buckets used: {buckets_used}/{buckets_available}
//! ```
//!
//! | Placeholder | Captures | Decoded as |
//! |---|---|---|
//! | `{name}` | ASCII digits | `u64` |
//! | `{name:size}` | humanized value (`1.1M`) | `u64` via [`dehumanize`] |
//! | `{name:signed}` | humanized value, optional `-` | `i64` via [`dehumanize_signed`] |
//! | `{name:text}` | any non-empty text | kept verbatim |
//! | `{name:rest}` | rest of the line (final token only) | kept verbatim |
//!
//! A [`PatternSet`] tries its patterns strictly in order and the first full
//! match wins, so a specific pattern placed before a generic one takes
//! precedence on lines both would accept.

use super::error::DecodeError;
use super::fields::{FieldSet, Value};
use super::numeric::{dehumanize, dehumanize_signed, parse_u64};

/// Type of a template placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Count,
    Size,
    Signed,
    Text,
    Rest,
}

impl Placeholder {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "" => Some(Placeholder::Count),
            "size" => Some(Placeholder::Size),
            "signed" => Some(Placeholder::Signed),
            "text" => Some(Placeholder::Text),
            "rest" => Some(Placeholder::Rest),
            _ => None,
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Placeholder::Count | Placeholder::Size | Placeholder::Signed
        )
    }

    /// Structural check applied while matching; numeric range is only
    /// checked when the capture is decoded.
    fn accepts(self, raw: &str) -> bool {
        let humanized = |s: &str| {
            s.as_bytes().first().is_some_and(u8::is_ascii_digit)
                && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'.')
        };
        match self {
            Placeholder::Count => !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()),
            Placeholder::Size => humanized(raw),
            Placeholder::Signed => humanized(raw.strip_prefix('-').unwrap_or(raw)),
            Placeholder::Text | Placeholder::Rest => !raw.is_empty(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    Hole {
        name: &'static str,
        kind: Placeholder,
    },
}

/// One compiled line shape.
#[derive(Debug, Clone)]
pub struct Pattern {
    tokens: Vec<Vec<Segment>>,
    /// The final token ends in a `rest` placeholder.
    open_ended: bool,
}

impl Pattern {
    /// Compiles a template. Braces that do not form a valid placeholder are
    /// treated as literal text.
    pub fn new(template: &'static str) -> Self {
        let mut tokens: Vec<Vec<Segment>> = template.split_whitespace().map(compile_token).collect();

        // `rest` is only meaningful at the very end; anywhere else it
        // behaves like `text`.
        let last_index = tokens.len().saturating_sub(1);
        let mut open_ended = false;
        for (i, token) in tokens.iter_mut().enumerate() {
            let segment_count = token.len();
            for (j, segment) in token.iter_mut().enumerate() {
                if let Segment::Hole { kind, .. } = segment
                    && *kind == Placeholder::Rest
                {
                    if i == last_index && j + 1 == segment_count {
                        open_ended = true;
                    } else {
                        *kind = Placeholder::Text;
                    }
                }
            }
        }

        Self { tokens, open_ended }
    }

    /// Names of all placeholders, in template order.
    pub fn placeholder_names(&self) -> Vec<&'static str> {
        self.tokens
            .iter()
            .flatten()
            .filter_map(|s| match s {
                Segment::Hole { name, .. } => Some(*name),
                Segment::Literal(_) => None,
            })
            .collect()
    }

    /// Matches the whole line against this shape.
    pub fn captures<'l>(&self, line: &'l str) -> Option<Captures<'l>> {
        let words = tokenize(line);
        let arity_ok = if self.open_ended {
            words.len() >= self.tokens.len()
        } else {
            words.len() == self.tokens.len()
        };
        if !arity_ok || self.tokens.is_empty() {
            return None;
        }

        let mut captures = Captures::default();
        for (i, segments) in self.tokens.iter().enumerate() {
            let (offset, word) = words[i];
            let subject = if self.open_ended && i + 1 == self.tokens.len() {
                line[offset..].trim_end()
            } else {
                word
            };
            match_segments(segments, subject, &mut captures)?;
        }
        Some(captures)
    }
}

fn compile_token(token: &'static str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal_start = 0;
    let mut cursor = 0;

    while let Some(open) = token[cursor..].find('{').map(|p| p + cursor) {
        let Some(close) = token[open..].find('}').map(|p| p + open) else {
            break;
        };
        let inner = &token[open + 1..close];
        let (name, tag) = inner.split_once(':').unwrap_or((inner, ""));
        let valid_name = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');

        match Placeholder::from_tag(tag) {
            Some(kind) if valid_name => {
                if literal_start < open {
                    segments.push(Segment::Literal(&token[literal_start..open]));
                }
                segments.push(Segment::Hole { name, kind });
                cursor = close + 1;
                literal_start = cursor;
            }
            _ => cursor = open + 1,
        }
    }

    if literal_start < token.len() {
        segments.push(Segment::Literal(&token[literal_start..]));
    }
    segments
}

/// Splits a line on whitespace, keeping each token's byte offset.
fn tokenize(line: &str) -> Vec<(usize, &str)> {
    let base = line.as_ptr() as usize;
    line.split_whitespace()
        .map(|word| (word.as_ptr() as usize - base, word))
        .collect()
}

fn match_segments<'l>(
    segments: &[Segment],
    subject: &'l str,
    captures: &mut Captures<'l>,
) -> Option<()> {
    let mut pos = 0;
    for (i, segment) in segments.iter().enumerate() {
        match segment {
            Segment::Literal(literal) => {
                if !subject[pos..].starts_with(literal) {
                    return None;
                }
                pos += literal.len();
            }
            Segment::Hole { name, kind } => {
                let end = match segments.get(i + 1) {
                    // A hole is never empty, so the search for the
                    // following literal starts one character in.
                    Some(Segment::Literal(next)) => {
                        let first = subject[pos..].chars().next()?.len_utf8();
                        let from = pos + first;
                        from + subject[from..].find(next)?
                    }
                    _ => subject.len(),
                };
                let raw = &subject[pos..end];
                if !kind.accepts(raw) {
                    return None;
                }
                captures.items.push(Capture {
                    name: *name,
                    kind: *kind,
                    raw,
                });
                pos = end;
            }
        }
    }
    (pos == subject.len()).then_some(())
}

/// One captured placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture<'l> {
    pub name: &'static str,
    pub kind: Placeholder,
    pub raw: &'l str,
}

/// Raw text captured by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures<'l> {
    items: Vec<Capture<'l>>,
}

impl<'l> Captures<'l> {
    /// Raw text of any placeholder.
    pub fn raw(&self, name: &str) -> Option<&'l str> {
        self.items.iter().find(|c| c.name == name).map(|c| c.raw)
    }

    /// Verbatim value of a `text` or `rest` placeholder.
    pub fn text(&self, name: &str) -> Option<&'l str> {
        self.items
            .iter()
            .find(|c| c.name == name && !c.kind.is_numeric())
            .map(|c| c.raw)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Capture<'l>> {
        self.items.iter()
    }

    /// Decodes all numeric placeholders.
    pub fn numeric(&self) -> Result<Vec<(&'static str, Value)>, DecodeError> {
        self.items
            .iter()
            .filter(|c| c.kind.is_numeric())
            .map(|c| {
                let value = match c.kind {
                    Placeholder::Size => Value::Unsigned(dehumanize(c.raw)?),
                    Placeholder::Signed => Value::Signed(dehumanize_signed(c.raw)?),
                    _ => Value::Unsigned(parse_u64(c.raw)?),
                };
                Ok((c.name, value))
            })
            .collect()
    }

    /// Decodes all numeric placeholders into `fields`. Nothing is inserted
    /// if any of them fails.
    pub fn decode_into(&self, fields: &mut FieldSet) -> Result<(), DecodeError> {
        for (name, value) in self.numeric()? {
            fields.insert(name, value);
        }
        Ok(())
    }
}

/// Outcome of dispatching one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult<'l> {
    NoMatch,
    Matched { index: usize, captures: Captures<'l> },
}

/// Priority-ordered list of patterns.
#[derive(Debug, Clone)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    pub fn new(templates: &[&'static str]) -> Self {
        Self {
            patterns: templates.iter().copied().map(Pattern::new).collect(),
        }
    }

    /// Returns the first pattern, in list order, that matches the full line.
    pub fn dispatch<'l>(&self, line: &'l str) -> MatchResult<'l> {
        for (index, pattern) in self.patterns.iter().enumerate() {
            if let Some(captures) = pattern.captures(line) {
                return MatchResult::Matched { index, captures };
            }
        }
        MatchResult::NoMatch
    }

    pub fn get(&self, index: usize) -> Option<&Pattern> {
        self.patterns.get(index)
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matched<'l>(result: MatchResult<'l>) -> (usize, Captures<'l>) {
        match result {
            MatchResult::Matched { index, captures } => (index, captures),
            MatchResult::NoMatch => panic!("expected a match"),
        }
    }

    #[test]
    fn test_literal_and_count() {
        let pattern = Pattern::new("Operations (MIDs): {operations}");
        let captures = pattern.captures("Operations (MIDs): 12").unwrap();
        assert_eq!(captures.raw("operations"), Some("12"));
        assert!(pattern.captures("Operations (MIDs): x").is_none());
        assert!(pattern.captures("Operations (MIDs): 12 extra").is_none());
        assert!(pattern.captures("Operations: 12").is_none());
    }

    #[test]
    fn test_extra_whitespace_is_insignificant() {
        let pattern = Pattern::new("Reads: {reads} Bytes: {read_bytes}");
        let captures = pattern.captures("  Reads:  4   Bytes: 4096\t").unwrap();
        let mut fields = FieldSet::new();
        captures.decode_into(&mut fields).unwrap();
        assert_eq!(fields.get("reads"), Some(4));
        assert_eq!(fields.get("read_bytes"), Some(4096));
    }

    #[test]
    fn test_affixes_and_multiple_holes_per_token() {
        let pattern = Pattern::new("buckets used: {used}/{available}");
        let captures = pattern.captures("buckets used: 433/512").unwrap();
        assert_eq!(captures.raw("used"), Some("433"));
        assert_eq!(captures.raw("available"), Some("512"));

        let pattern = Pattern::new("Unused: {unused}%");
        assert_eq!(pattern.captures("Unused: 99%").unwrap().raw("unused"), Some("99"));
        assert!(pattern.captures("Unused: 99").is_none());
    }

    #[test]
    fn test_rest_runs_to_end_of_line() {
        let pattern = Pattern::new("{session_id}) \\\\{server:text}\\{share:rest}");
        let captures = pattern
            .captures("2) \\\\fileserver\\team share\\docs  ")
            .unwrap();
        assert_eq!(captures.raw("session_id"), Some("2"));
        assert_eq!(captures.text("server"), Some("fileserver"));
        assert_eq!(captures.text("share"), Some("team share\\docs"));
        assert_eq!(
            pattern.placeholder_names(),
            vec!["session_id", "server", "share"]
        );
    }

    #[test]
    fn test_rest_only_at_end() {
        let pattern = Pattern::new("{name:rest} {value}");
        assert!(pattern.captures("a b 1").is_none());
        assert!(pattern.captures("a 1").is_some());
    }

    #[test]
    fn test_size_and_signed_placeholders() {
        let pattern = Pattern::new("change: {change:signed}/sec");
        let captures = pattern.captures("change: -321.5k/sec").unwrap();
        let mut fields = FieldSet::new();
        captures.decode_into(&mut fields).unwrap();
        assert_eq!(fields.get_signed("change"), Some(-329204));

        let pattern = Pattern::new("dirty: {dirty:size}");
        assert!(pattern.captures("dirty: -1k").is_none());
        assert!(pattern.captures("dirty: 20.4G").is_some());
    }

    #[test]
    fn test_decode_failure_inserts_nothing() {
        let pattern = Pattern::new("{a} {b:size}");
        let captures = pattern.captures("1 5q").unwrap();
        let mut fields = FieldSet::new();
        let err = captures.decode_into(&mut fields).unwrap_err();
        assert_eq!(err.token, "5q");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_invalid_braces_are_literal() {
        let pattern = Pattern::new("{Bad} {x:unknown} {ok}");
        assert!(pattern.captures("{Bad} {x:unknown} 3").is_some());
        assert_eq!(pattern.placeholder_names(), vec!["ok"]);
    }

    #[test]
    fn test_first_match_wins() {
        let set = PatternSet::new(&[
            "Flushes: {flushes}",
            "{op:text}: {count}",
            "{op:text}: {sent} sent {failed} failed",
        ]);

        let (index, captures) = matched(set.dispatch("Flushes: 7"));
        assert_eq!(index, 0);
        assert_eq!(captures.raw("flushes"), Some("7"));

        let (index, captures) = matched(set.dispatch("Opens: 3"));
        assert_eq!(index, 1);
        assert_eq!(captures.text("op"), Some("Opens"));

        let (index, _) = matched(set.dispatch("Flushes: 1 sent 0 failed"));
        assert_eq!(index, 2);

        assert_eq!(set.dispatch("nothing to see"), MatchResult::NoMatch);
    }

    #[test]
    fn test_earlier_pattern_preferred_when_both_match() {
        let generic_first = PatternSet::new(&["{op:text}: {count}", "Flushes: {flushes}"]);
        let (index, captures) = matched(generic_first.dispatch("Flushes: 7"));
        assert_eq!(index, 0);
        assert_eq!(captures.text("op"), Some("Flushes"));
    }

    #[test]
    fn test_blank_line_never_matches() {
        let set = PatternSet::new(&["{a:rest}", ""]);
        assert_eq!(set.dispatch(""), MatchResult::NoMatch);
        assert_eq!(set.dispatch("   "), MatchResult::NoMatch);
    }
}
