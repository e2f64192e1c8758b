//! JSON-shaped layout descriptions.
//!
//! ```json
//! {
//!   "tag": "form",
//!   "class": "signup",
//!   "children": [
//!     {"tag": "input", "bind": "user.email"},
//!     "plain text",
//!     null
//!   ],
//!   "greeting": {"tag": "p", "watch": ["Hello [[user.name]]", "text"]},
//!   "onState": ["step", {"1": "first", "2": "second"}],
//!   "cache": true
//! }
//! ```
//!
//! Reserved keys become directives. Any other object-valued key is a
//! positional child, kept in declaration order alongside `children`; other
//! values are attributes and `null` is skipped. A directive of the wrong
//! shape is dropped with a warning; structural problems are errors.

use serde_json::Map;

use super::description::{BindSpec, Directive, Layout, StateAction, StateSpec, WatchSpec};
use crate::dom::target::TEXT;
use crate::template::Template;
use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LayoutError {
    #[error("layout description must be an object, found {found}")]
    NotAnObject { found: &'static str },
    #[error("`tag` must be a string")]
    InvalidTag,
    #[error("`children` must be an array")]
    InvalidChildren,
    #[error("child {index} must be an object, a string or null")]
    InvalidChild { index: usize },
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

impl Layout {
    pub fn parse(description: &Value) -> Result<Layout, LayoutError> {
        let Value::Object(map) = description else {
            return Err(LayoutError::NotAnObject {
                found: kind_name(description),
            });
        };
        parse_object(map)
    }
}

fn parse_object(map: &Map<String, Value>) -> Result<Layout, LayoutError> {
    let mut layout = Layout::default();
    for (key, value) in map {
        match key.as_str() {
            "tag" => {
                layout.tag = value.as_str().ok_or(LayoutError::InvalidTag)?.to_owned();
            }
            "children" => {
                let Value::Array(items) = value else {
                    return Err(LayoutError::InvalidChildren);
                };
                for (index, item) in items.iter().enumerate() {
                    layout.children.push(parse_child(index, item)?);
                }
            }
            "bind" => push_or_warn(&mut layout, key, parse_bind(value).map(Directive::Bind)),
            "watch" => match parse_watch(value) {
                Some(specs) => layout
                    .directives
                    .extend(specs.into_iter().map(Directive::Watch)),
                None => warn_dropped(key, value),
            },
            "onState" => push_or_warn(&mut layout, key, parse_state(value).map(Directive::OnState)),
            "onSet" => push_or_warn(&mut layout, key, parse_state(value).map(Directive::OnSet)),
            "route" => layout.directives.push(Directive::Route(value.clone())),
            "switch" => layout.directives.push(Directive::Switch(value.clone())),
            "cache" => push_or_warn(&mut layout, key, value.as_bool().map(Directive::Cache)),
            "onCreated" => warn_dropped(key, value),
            _ => match value {
                Value::Object(child) => layout.children.push(Some(parse_object(child)?)),
                Value::Null => {}
                other => {
                    layout.attributes.insert(key.clone(), other.clone());
                }
            },
        }
    }
    Ok(layout)
}

fn parse_child(index: usize, item: &Value) -> Result<Option<Layout>, LayoutError> {
    match item {
        Value::Null => Ok(None),
        Value::String(text) => Ok(Some(Layout::text(text.clone()))),
        Value::Object(map) => parse_object(map).map(Some),
        _ => Err(LayoutError::InvalidChild { index }),
    }
}

fn push_or_warn(layout: &mut Layout, key: &str, directive: Option<Directive>) {
    match directive {
        Some(directive) => layout.directives.push(directive),
        None => tracing::warn!(key, "malformed directive dropped"),
    }
}

fn warn_dropped(key: &str, value: &Value) {
    tracing::warn!(key, found = kind_name(value), "directive dropped");
}

/// `"path"` or `{"path": .., "filter": ..}`.
fn parse_bind(value: &Value) -> Option<BindSpec> {
    match value {
        Value::String(path) if !path.is_empty() => Some(BindSpec {
            source: None,
            path: path.clone(),
            filter: None,
        }),
        Value::Object(map) => {
            let path = map.get("path")?.as_str()?;
            Some(BindSpec {
                source: None,
                path: path.to_owned(),
                filter: map.get("filter").and_then(Value::as_str).map(Template::parse),
            })
        }
        _ => None,
    }
}

/// `"template"` (into text content), `[template, attribute]`,
/// `{"template": .., "attribute": ..}`, or an array of those.
///
/// A two-string array is the pair form only when its second string has no
/// `[[placeholder]]`; otherwise it is a list of two templates.
fn parse_watch(value: &Value) -> Option<Vec<WatchSpec>> {
    match value {
        Value::String(template) => Some(vec![WatchSpec::attribute(template, TEXT)]),
        Value::Object(map) => {
            let template = map.get("template")?.as_str()?;
            let attribute = map.get("attribute").and_then(Value::as_str).unwrap_or(TEXT);
            Some(vec![WatchSpec::attribute(template, attribute)])
        }
        Value::Array(items) => match items.as_slice() {
            [Value::String(template), Value::String(attribute)]
                if !Template::parse(attribute).has_placeholders() =>
            {
                Some(vec![WatchSpec::attribute(template, attribute.clone())])
            }
            _ => {
                let mut specs = Vec::new();
                for item in items {
                    specs.extend(parse_watch(item)?);
                }
                Some(specs)
            }
        },
        _ => None,
    }
}

/// `[path, {value: class, ..}]` or `{"path": .., "classes": {..}}`.
fn parse_state(value: &Value) -> Option<StateSpec> {
    let (path, table) = match value {
        Value::Array(items) => match items.as_slice() {
            [Value::String(path), Value::Object(table)] => (path, table),
            _ => return None,
        },
        Value::Object(map) => match (map.get("path")?, map.get("classes")?) {
            (Value::String(path), Value::Object(table)) => (path, table),
            _ => return None,
        },
        _ => return None,
    };
    let mut classes = Vec::with_capacity(table.len());
    for (expected, class) in table {
        classes.push((expected.clone(), class.as_str()?.to_owned()));
    }
    Some(StateSpec {
        source: None,
        path: path.clone(),
        action: StateAction::Classes(classes),
    })
}
