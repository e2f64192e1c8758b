//! Snapshot rendering helpers.
//!
//! Converts a node subtree into an indented plain-text listing suitable for
//! `insta` snapshots and equality assertions. One line per node:
//!
//! ```text
//! <form class="signup">
//!   <input type="email" value="a@b.c">
//!   "plain text"
//! ```
//!
//! Attributes appear in name order with JSON-formatted values; text nodes
//! show only their quoted content.

use crate::dom::{MemoryTarget, NodeId, RenderTarget};
use crate::layout::description::TEXT_TAG;
use crate::value::Value;

/// Attributes [`render_to_string`] leaves out: binder bookkeeping.
pub const HIDDEN_ATTRIBUTES: &[&str] = &["data-bind-id"];

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Render `node` and its subtree, hiding [`HIDDEN_ATTRIBUTES`].
///
/// A missing node renders as the empty string.
pub fn render_to_string(target: &MemoryTarget, node: NodeId) -> String {
    render_filtered(target, node, HIDDEN_ATTRIBUTES)
}

/// Render `node` and its subtree, leaving out the `hidden` attributes.
pub fn render_filtered(target: &MemoryTarget, node: NodeId, hidden: &[&str]) -> String {
    let mut lines = Vec::new();
    write_node(target, node, 0, hidden, &mut lines);
    lines.join("\n")
}

fn write_node(target: &MemoryTarget, node: NodeId, depth: usize, hidden: &[&str], lines: &mut Vec<String>) {
    let Some(data) = target.node(node) else {
        return;
    };
    let indent = "  ".repeat(depth);

    if data.kind == TEXT_TAG {
        let text = data.attribute("text").cloned().unwrap_or(Value::Null);
        lines.push(format!("{indent}{text}"));
    } else {
        let mut line = format!("{indent}<{}", data.kind);
        if !data.classes.is_empty() {
            line.push_str(&format!(" class=\"{}\"", data.classes.join(" ")));
        }
        for (name, value) in &data.attributes {
            if hidden.contains(&name.as_str()) {
                continue;
            }
            line.push_str(&format!(" {name}={value}"));
        }
        line.push('>');
        lines.push(line);
    }

    for child in target.children(node) {
        write_node(target, child, depth + 1, hidden, lines);
    }
}
