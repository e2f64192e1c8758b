//! `[[ property ]]` placeholder templates.
//!
//! Watch directives and node filters carry strings such as
//! `"Hello [[ user.name ]], you have [[count]] items"`. The logos scanner splits
//! them into literal text and placeholder paths; rendering substitutes each
//! placeholder with the display form of its resolved value.
//!
//! Parsing is lenient: an unclosed `[[` and stray brackets stay literal text.

use std::fmt;

use logos::Logos;

use crate::value::{display, Value};

#[derive(Logos, Debug, Clone, Copy, PartialEq)]
enum Token {
    #[token("[[")]
    Open,

    #[token("]]")]
    Close,

    #[regex(r"[^\[\]]+")]
    Text,

    #[token("[")]
    Bracket,

    #[token("]")]
    CloseBracket,
}

/// A piece of a parsed template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Part {
    Literal(String),
    /// A trimmed placeholder path.
    Placeholder(String),
}

/// A parsed template string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    source: String,
    parts: Vec<Part>,
}

impl Template {
    pub fn parse(source: &str) -> Self {
        let mut scan = Scan::default();

        for (token, span) in Token::lexer(source).spanned() {
            let text = &source[span.clone()];
            let Ok(token) = token else {
                scan.settle();
                scan.push_text(text);
                continue;
            };
            match token {
                Token::Open => {
                    scan.settle();
                    if let Some(open) = scan.open.take() {
                        // `[[a [[b]]`: the first opener was literal text.
                        scan.literal.push_str(&source[open.start..span.start]);
                    }
                    scan.open = Some(Opening::at(span.start));
                }
                Token::Close => {
                    // Fed one bracket at a time so `[[tags[0]]]` keeps its index.
                    scan.close_bracket(source, span.start + 1);
                    scan.close_bracket(source, span.end);
                }
                Token::CloseBracket => scan.close_bracket(source, span.end),
                Token::Text | Token::Bracket => {
                    scan.settle();
                    scan.push_text(text);
                }
            }
        }

        let Scan {
            mut parts,
            mut literal,
            open,
        } = scan;
        if let Some(open) = open {
            literal.push_str(&source[open.start..]);
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Self {
            source: source.to_owned(),
            parts,
        }
    }

    /// The original template string.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn parts(&self) -> &[Part] {
        &self.parts
    }

    /// Distinct placeholder paths in order of first appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for part in &self.parts {
            if let Part::Placeholder(name) = part {
                if !seen.contains(&name.as_str()) {
                    seen.push(name);
                }
            }
        }
        seen
    }

    pub fn has_placeholders(&self) -> bool {
        self.parts.iter().any(|p| matches!(p, Part::Placeholder(_)))
    }

    /// Render, resolving each placeholder through `resolve`.
    pub fn render(&self, mut resolve: impl FnMut(&str) -> Option<Value>) -> String {
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Placeholder(name) => out.push_str(&display(resolve(name).as_ref())),
            }
        }
        out
    }

    /// Render with every placeholder replaced by the same value.
    ///
    /// Used as a node filter: `"Total: [[value]]"` applied to `42`.
    pub fn render_value(&self, value: Option<&Value>) -> String {
        let shown = display(value);
        let mut out = String::new();
        for part in &self.parts {
            match part {
                Part::Literal(text) => out.push_str(text),
                Part::Placeholder(_) => out.push_str(&shown),
            }
        }
        out
    }
}

/// An open `[[` and the placeholder text collected since.
struct Opening {
    start: usize,
    inner: String,
    /// A single `]` seen while the inner brackets were balanced.
    pending: bool,
}

impl Opening {
    fn at(start: usize) -> Self {
        Self {
            start,
            inner: String::new(),
            pending: false,
        }
    }

    fn unbalanced(&self) -> bool {
        self.inner.matches('[').count() > self.inner.matches(']').count()
    }
}

#[derive(Default)]
struct Scan {
    parts: Vec<Part>,
    literal: String,
    open: Option<Opening>,
}

impl Scan {
    fn push_text(&mut self, text: &str) {
        match &mut self.open {
            Some(open) => open.inner.push_str(text),
            None => self.literal.push_str(text),
        }
    }

    /// A pending `]` followed by anything but another `]` was placeholder text.
    fn settle(&mut self) {
        if let Some(open) = &mut self.open {
            if open.pending {
                open.pending = false;
                open.inner.push(']');
            }
        }
    }

    /// One `]` ending at byte `end`.
    fn close_bracket(&mut self, source: &str, end: usize) {
        let Some(open) = &mut self.open else {
            self.literal.push(']');
            return;
        };
        if open.unbalanced() {
            open.inner.push(']');
            return;
        }
        if !open.pending {
            open.pending = true;
            return;
        }
        let inner = open.inner.trim();
        if inner.is_empty() {
            self.literal.push_str(&source[open.start..end]);
        } else {
            if !self.literal.is_empty() {
                self.parts.push(Part::Literal(std::mem::take(&mut self.literal)));
            }
            self.parts.push(Part::Placeholder(inner.to_owned()));
        }
        self.open = None;
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl From<&str> for Template {
    fn from(source: &str) -> Self {
        Self::parse(source)
    }
}
