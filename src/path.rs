//! Attribute paths into nested store data.
//!
//! A path is a sequence of [`Segment`]s written with dots for object keys and
//! brackets for array indices: `user.tags[0]`, `rows[2]["first name"]`.
//! Parsing goes through a logos tokenizer; the canonical [`Display`] form is
//! what store topics are named after. Plain keys print dotted, numeric keys
//! and indices print as `[n]`, and keys holding `.`, brackets or quotes print
//! quoted, so `a.b[0]`, `a["b"].0` and `a['b'][0]` share subscribers while
//! `cfg["a.b"]` and `cfg.a.b` do not.
//!
//! [`Display`]: std::fmt::Display

use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use logos::Logos;

use crate::value::{Map, Value};

/// Errors from path parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    #[error("empty path")]
    Empty,
    #[error("empty segment at byte {position}")]
    EmptySegment { position: usize },
    #[error("unclosed bracket starting at byte {position}")]
    UnclosedBracket { position: usize },
    #[error("unexpected `{found}` at byte {position}")]
    Unexpected { position: usize, found: String },
    #[error("array index {index} is past the writable limit")]
    IndexTooLarge { index: usize },
}

/// Largest array index [`Path::assign`] will pad an array out to.
pub const MAX_INDEX: usize = 65_535;

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Token {
    #[token(".")]
    Dot,

    #[token("[")]
    Open,

    #[token("]")]
    Close,

    #[regex(r#""[^"]*""#)]
    DoubleQuoted,

    #[regex(r"'[^']*'")]
    SingleQuoted,

    #[regex(r#"[^.\[\]"']+"#)]
    Name,
}

/// One step of a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Object property.
    Key(String),
    /// Array element.
    Index(usize),
}

impl Segment {
    /// Index form of this segment, if it has one. Numeric keys count, so
    /// `list.0` reaches into arrays the same way `list[0]` does.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(k) => numeric_key(k),
        }
    }

    /// Object-key form of this segment.
    pub fn as_key(&self) -> Cow<'_, str> {
        match self {
            Segment::Key(k) => Cow::Borrowed(k),
            Segment::Index(i) => Cow::Owned(i.to_string()),
        }
    }

    fn empty_container(&self) -> Value {
        match self {
            Segment::Index(_) => Value::Array(Vec::new()),
            Segment::Key(_) => Value::Object(Map::new()),
        }
    }

    fn step<'v>(&self, value: &'v Value) -> Option<&'v Value> {
        match value {
            Value::Array(items) => self.as_index().and_then(|i| items.get(i)),
            Value::Object(map) => map.get(self.as_key().as_ref()),
            _ => None,
        }
    }

    fn step_mut<'v>(&self, value: &'v mut Value) -> Option<&'v mut Value> {
        match value {
            Value::Array(items) => self.as_index().and_then(move |i| items.get_mut(i)),
            Value::Object(map) => map.get_mut(self.as_key().as_ref()),
            _ => None,
        }
    }

    /// Slot for this segment inside `current`, created (as null) if missing.
    /// A `current` that cannot hold the segment is replaced by the container
    /// the segment needs. Callers check the index against [`MAX_INDEX`] first.
    fn slot_mut<'v>(&self, current: &'v mut Value) -> &'v mut Value {
        let fits = match &*current {
            Value::Array(_) => self.as_index().is_some(),
            Value::Object(_) => true,
            _ => false,
        };
        if !fits {
            *current = self.empty_container();
        }
        match current {
            Value::Array(items) => {
                let index = self.as_index().unwrap_or(items.len());
                if items.len() <= index {
                    items.resize(index + 1, Value::Null);
                }
                &mut items[index]
            }
            Value::Object(map) => map
                .entry(self.as_key().into_owned())
                .or_insert(Value::Null),
            other => other,
        }
    }
}

/// Canonical array index spelled as a key: `"0"`, `"17"`, not `"07"` or `"+1"`.
fn numeric_key(key: &str) -> Option<usize> {
    let canonical = !key.is_empty()
        && key.bytes().all(|b| b.is_ascii_digit())
        && (key == "0" || !key.starts_with('0'));
    if canonical {
        key.parse().ok()
    } else {
        None
    }
}

/// A parsed attribute path. The empty path addresses the root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Path {
    segments: Vec<Segment>,
}

impl Path {
    /// The root path (no segments).
    pub fn root() -> Self {
        Self::default()
    }

    /// A single-key path that is never split, whatever characters it holds.
    pub fn literal(key: impl Into<String>) -> Self {
        Self {
            segments: vec![Segment::Key(key.into())],
        }
    }

    /// Parse a dotted/bracketed path.
    pub fn parse(input: &str) -> Result<Self, PathError> {
        let mut segments = Vec::new();
        let mut lexer = Token::lexer(input).spanned();
        // True at the start and right after a dot.
        let mut expect_name = true;

        while let Some((token, span)) = lexer.next() {
            let token = token.map_err(|()| PathError::Unexpected {
                position: span.start,
                found: input[span.clone()].to_owned(),
            })?;
            match token {
                Token::Name => {
                    if !expect_name {
                        return Err(PathError::Unexpected {
                            position: span.start,
                            found: input[span].to_owned(),
                        });
                    }
                    segments.push(Segment::Key(input[span].to_owned()));
                    expect_name = false;
                }
                Token::Dot => {
                    if expect_name {
                        return Err(PathError::EmptySegment {
                            position: span.start,
                        });
                    }
                    expect_name = true;
                }
                Token::Open => {
                    if expect_name && !segments.is_empty() {
                        return Err(PathError::EmptySegment {
                            position: span.start,
                        });
                    }
                    let open = span.start;
                    let inner = match lexer.next() {
                        Some((Ok(Token::Name), s)) => bracket_segment(&input[s], false),
                        Some((Ok(Token::DoubleQuoted | Token::SingleQuoted), s)) => {
                            bracket_segment(&input[s], true)
                        }
                        _ => return Err(PathError::UnclosedBracket { position: open }),
                    };
                    match lexer.next() {
                        Some((Ok(Token::Close), _)) => {}
                        _ => return Err(PathError::UnclosedBracket { position: open }),
                    }
                    segments.push(inner);
                    expect_name = false;
                }
                Token::Close | Token::DoubleQuoted | Token::SingleQuoted => {
                    return Err(PathError::Unexpected {
                        position: span.start,
                        found: input[span].to_owned(),
                    });
                }
            }
        }

        if segments.is_empty() {
            return Err(PathError::Empty);
        }
        if expect_name {
            return Err(PathError::EmptySegment {
                position: input.len(),
            });
        }
        Ok(Self { segments })
    }

    /// Parse, falling back to a [`literal`](Self::literal) key on malformed input.
    pub fn parse_lenient(input: &str) -> Self {
        match Self::parse(input) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(path = input, error = %err, "malformed path, using it as a literal key");
                Self::literal(input)
            }
        }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// First segment as an object key (the top-level attribute name).
    pub fn head(&self) -> Option<Cow<'_, str>> {
        self.segments.first().map(Segment::as_key)
    }

    /// This path extended by one segment.
    pub fn child(&self, segment: Segment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self { segments }
    }

    /// This path extended by every segment of `relative`.
    pub fn join(&self, relative: &Path) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Self { segments }
    }

    /// Read the value at this path.
    pub fn resolve<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| segment.step(current))
    }

    /// Check that [`assign`](Self::assign) into `root` would not pad an array
    /// past [`MAX_INDEX`].
    pub fn check_assign(&self, root: &Value) -> Result<(), PathError> {
        let mut current = Some(root);
        for segment in &self.segments {
            let into_array = match current {
                Some(Value::Array(_)) => true,
                Some(Value::Object(_)) => false,
                _ => matches!(segment, Segment::Index(_)),
            };
            if let Some(index) = segment.as_index().filter(|_| into_array) {
                if index > MAX_INDEX {
                    return Err(PathError::IndexTooLarge { index });
                }
            }
            current = current.and_then(|value| segment.step(value));
        }
        Ok(())
    }

    /// Write `value` at this path, creating intermediate containers as needed.
    /// Arrays are padded with nulls up to the written index; a write that
    /// would pad past [`MAX_INDEX`] leaves `root` untouched.
    pub fn assign(&self, root: &mut Value, value: Value) -> Result<(), PathError> {
        self.check_assign(root)?;
        let mut current = root;
        for (i, segment) in self.segments.iter().enumerate() {
            let slot = segment.slot_mut(current);
            if let Some(next) = self.segments.get(i + 1) {
                if !slot.is_object() && !slot.is_array() {
                    *slot = next.empty_container();
                }
            }
            current = slot;
        }
        *current = value;
        Ok(())
    }

    /// Remove the value at this path and return it.
    ///
    /// Object keys are deleted; array slots are nulled so later indices keep
    /// their paths.
    pub fn remove(&self, root: &mut Value) -> Option<Value> {
        let (last, parents) = self.segments.split_last()?;
        let mut current = root;
        for segment in parents {
            current = segment.step_mut(current)?;
        }
        match current {
            Value::Object(map) => map.remove(last.as_key().as_ref()),
            Value::Array(items) => last
                .as_index()
                .and_then(|i| items.get_mut(i))
                .map(|slot| std::mem::replace(slot, Value::Null)),
            _ => None,
        }
    }
}

/// Every path below `value`, pre-order (parents before children), relative
/// to `value` itself, each paired with the value found there.
pub fn descendants(value: &Value) -> Vec<(Path, &Value)> {
    let mut out = Vec::new();
    collect(&Path::root(), value, &mut out);
    out
}

fn collect<'v>(prefix: &Path, value: &'v Value, out: &mut Vec<(Path, &'v Value)>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = prefix.child(Segment::Key(key.clone()));
                out.push((path.clone(), child));
                collect(&path, child, out);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let path = prefix.child(Segment::Index(index));
                out.push((path.clone(), child));
                collect(&path, child, out);
            }
        }
        _ => {}
    }
}

fn bracket_segment(raw: &str, quoted: bool) -> Segment {
    if quoted {
        return Segment::Key(raw[1..raw.len() - 1].to_owned());
    }
    let trimmed = raw.trim();
    match trimmed.parse::<usize>() {
        Ok(index) => Segment::Index(index),
        Err(_) => Segment::Key(trimmed.to_owned()),
    }
}

fn needs_quotes(key: &str) -> bool {
    key.is_empty() || key.contains(['.', '[', ']', '"', '\''])
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Key(key) => match numeric_key(key) {
                    Some(index) => write!(f, "[{index}]")?,
                    None if needs_quotes(key) && key.contains('"') => write!(f, "['{key}']")?,
                    None if needs_quotes(key) => write!(f, "[\"{key}\"]")?,
                    None if i == 0 => f.write_str(key)?,
                    None => write!(f, ".{key}")?,
                },
            }
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn keys(path: &Path) -> Vec<String> {
        path.segments()
            .iter()
            .map(|s| match s {
                Segment::Key(k) => k.clone(),
                Segment::Index(i) => format!("#{i}"),
            })
            .collect()
    }

    #[test]
    fn parse_plain_key() {
        let path = Path::parse("name").unwrap();
        assert_eq!(keys(&path), vec!["name"]);
    }

    #[test]
    fn parse_dots_and_indices() {
        let path = Path::parse("user.tags[1].label").unwrap();
        assert_eq!(keys(&path), vec!["user", "tags", "#1", "label"]);
    }

    #[test]
    fn parse_quoted_bracket_key() {
        let path = Path::parse(r#"rows[0]["first.name"]"#).unwrap();
        assert_eq!(keys(&path), vec!["rows", "#0", "first.name"]);
        let single = Path::parse("a['b']").unwrap();
        assert_eq!(keys(&single), vec!["a", "b"]);
    }

    #[test]
    fn parse_leading_index() {
        let path = Path::parse("[2].x").unwrap();
        assert_eq!(keys(&path), vec!["#2", "x"]);
    }

    #[test]
    fn parse_errors() {
        assert_eq!(Path::parse(""), Err(PathError::Empty));
        assert!(matches!(Path::parse("a..b"), Err(PathError::EmptySegment { .. })));
        assert!(matches!(Path::parse("a."), Err(PathError::EmptySegment { .. })));
        assert!(matches!(Path::parse("a[0"), Err(PathError::UnclosedBracket { .. })));
        assert!(matches!(Path::parse("a]"), Err(PathError::Unexpected { .. })));
        assert!(matches!(Path::parse("a.[0]"), Err(PathError::EmptySegment { .. })));
    }

    #[test]
    fn lenient_parse_falls_back_to_literal() {
        let path = Path::parse_lenient("a..b");
        assert_eq!(keys(&path), vec!["a..b"]);
    }

    #[test]
    fn canonical_display() {
        assert_eq!(Path::parse("a.b[0].c").unwrap().to_string(), "a.b[0].c");
        assert_eq!(Path::parse(r#"a["b"][0]"#).unwrap().to_string(), "a.b[0]");
        assert_eq!(Path::parse("[3]").unwrap().to_string(), "[3]");
    }

    #[test]
    fn canonical_display_quotes_ambiguous_keys() {
        let dotted = Path::parse(r#"cfg["a.b"]"#).unwrap();
        assert_eq!(dotted.to_string(), r#"cfg["a.b"]"#);
        assert_ne!(dotted.to_string(), Path::parse("cfg.a.b").unwrap().to_string());
        assert_eq!(Path::literal("x[0]").to_string(), r#"["x[0]"]"#);
        assert_eq!(Path::literal(r#"say "hi""#).to_string(), r#"['say "hi"']"#);
        assert_eq!(Path::literal("").to_string(), r#"[""]"#);
        // Quoted output parses back to the same key.
        let reparsed = Path::parse(&dotted.to_string()).unwrap();
        assert_eq!(reparsed, dotted);
    }

    #[test]
    fn canonical_display_numeric_keys_match_indices() {
        assert_eq!(Path::parse("list.0").unwrap().to_string(), "list[0]");
        assert_eq!(Path::parse(r#"list["1"]"#).unwrap().to_string(), "list[1]");
        assert_eq!(Path::parse("list.01").unwrap().to_string(), "list.01");
        assert_eq!(Path::parse("v.1e3").unwrap().to_string(), "v.1e3");
    }

    #[test]
    fn assign_into_scalar_root_indexes_new_array() {
        let mut data = json!(5);
        Path::parse("[1]").unwrap().assign(&mut data, json!("x")).unwrap();
        assert_eq!(data, json!([null, "x"]));
    }

    #[test]
    fn assign_refuses_huge_indices() {
        let mut data = json!({"list": []});
        let err = Path::parse("list[18446744073709551615]")
            .unwrap()
            .assign(&mut data, json!(1));
        assert_eq!(err, Err(PathError::IndexTooLarge { index: usize::MAX }));
        let err = Path::parse("fresh.a[4000000000]").unwrap().assign(&mut data, json!(1));
        assert_eq!(err, Err(PathError::IndexTooLarge { index: 4_000_000_000 }));
        // Nothing was written, not even intermediate containers.
        assert_eq!(data, json!({"list": []}));
        Path::parse(&format!("list[{MAX_INDEX}]"))
            .unwrap()
            .assign(&mut data, json!(1))
            .unwrap();
        assert_eq!(data["list"].as_array().map(Vec::len), Some(MAX_INDEX + 1));
    }

    #[test]
    fn numeric_object_keys_are_not_capped() {
        let mut data = json!({"ids": {}});
        Path::parse("ids.4000000000").unwrap().assign(&mut data, json!(true)).unwrap();
        assert_eq!(data, json!({"ids": {"4000000000": true}}));
    }

    #[test]
    fn resolve_nested() {
        let data = json!({"user": {"tags": ["x", "y"], "name": "a"}});
        let path = Path::parse("user.tags[1]").unwrap();
        assert_eq!(path.resolve(&data), Some(&json!("y")));
        let numeric_key = Path::parse("user.tags.0").unwrap();
        assert_eq!(numeric_key.resolve(&data), Some(&json!("x")));
        assert_eq!(Path::parse("user.missing").unwrap().resolve(&data), None);
        assert_eq!(Path::parse("user.name.deeper").unwrap().resolve(&data), None);
    }

    #[test]
    fn assign_creates_containers() {
        let mut data = json!({});
        Path::parse("a.b[2].c").unwrap().assign(&mut data, json!(1)).unwrap();
        assert_eq!(data, json!({"a": {"b": [null, null, {"c": 1}]}}));
    }

    #[test]
    fn assign_replaces_scalars_in_the_way() {
        let mut data = json!({"a": 5});
        Path::parse("a.b").unwrap().assign(&mut data, json!("x")).unwrap();
        assert_eq!(data, json!({"a": {"b": "x"}}));
    }

    #[test]
    fn assign_root_replaces_everything() {
        let mut data = json!({"a": 1});
        Path::root().assign(&mut data, json!({"b": 2})).unwrap();
        assert_eq!(data, json!({"b": 2}));
    }

    #[test]
    fn remove_key_and_index() {
        let mut data = json!({"a": {"b": 1, "c": 2}, "list": [1, 2, 3]});
        assert_eq!(Path::parse("a.b").unwrap().remove(&mut data), Some(json!(1)));
        assert_eq!(Path::parse("list[1]").unwrap().remove(&mut data), Some(json!(2)));
        assert_eq!(data, json!({"a": {"c": 2}, "list": [1, null, 3]}));
        assert_eq!(Path::parse("nope.x").unwrap().remove(&mut data), None);
    }

    #[test]
    fn descendants_are_pre_order() {
        let data = json!({"name": "a", "tags": ["x", "y"]});
        let paths: Vec<String> = descendants(&data)
            .into_iter()
            .map(|(p, _)| p.to_string())
            .collect();
        assert_eq!(paths, vec!["name", "tags", "tags[0]", "tags[1]"]);
    }

    #[test]
    fn join_and_head() {
        let base = Path::parse("user").unwrap();
        let joined = base.join(&Path::parse("tags[0]").unwrap());
        assert_eq!(joined.to_string(), "user.tags[0]");
        assert_eq!(joined.head().as_deref(), Some("user"));
        assert!(Path::root().is_root());
    }
}
