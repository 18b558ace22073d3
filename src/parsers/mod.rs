//! Normalizers turning raw response bodies into typed records.
//!
//! - [`parse_projects`]: project search XML → [`Project`](crate::models::Project)s
//! - [`parse_researchers`]: researcher search JSON → [`Researcher`](crate::models::Researcher)s
//!
//! Both work over a generic `serde_json::Value` tree and degrade field by
//! field: an unexpected shape drops the affected field, never the response.

pub mod locale;
mod projects;
mod researchers;
pub mod xml_tree;

pub use projects::{parse_projects, ALWAYS_ARRAY_ELEMENTS};
pub use researchers::parse_researchers;

use serde_json::{Map, Value};
use std::str::FromStr;

use xml_tree::{ATTR_PREFIX, TEXT_KEY};

/// View a value as a list: arrays as-is, `null`/absent as empty, anything else as one item
pub fn as_array(value: Option<&Value>) -> &[Value] {
    match value {
        Some(Value::Array(items)) => items,
        Some(Value::Null) | None => &[],
        Some(other) => std::slice::from_ref(other),
    }
}

/// First item of a possibly-repeated value
pub fn first(value: Option<&Value>) -> Option<&Value> {
    as_array(value).first()
}

/// First item of a possibly-repeated value, when it is an object
pub fn first_object(value: Option<&Value>) -> Option<&Map<String, Value>> {
    first(value).and_then(Value::as_object)
}

/// Trimmed, non-empty string form of a scalar
pub fn scalar_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

/// Parse a number from a JSON number or from numeric text
pub fn number<T: FromStr>(value: Option<&Value>) -> Option<T> {
    match value? {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Keep a collection only when it holds at least one item
pub fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    (!items.is_empty()).then_some(items)
}

/// An XML element value: bare text, or text with attributes
#[derive(Debug, Clone, Copy)]
pub enum TextNode<'a> {
    Plain(&'a Value),
    Attributed {
        text: Option<&'a Value>,
        node: &'a Map<String, Value>,
    },
}

impl<'a> TextNode<'a> {
    /// Classify a tree value; arrays resolve to their first item
    pub fn from_value(value: Option<&'a Value>) -> Option<Self> {
        match first(value)? {
            Value::Object(node) => Some(TextNode::Attributed {
                text: node.get(TEXT_KEY),
                node,
            }),
            Value::Null | Value::Array(_) => None,
            scalar => Some(TextNode::Plain(scalar)),
        }
    }

    /// Trimmed text content
    pub fn text(&self) -> Option<String> {
        match self {
            TextNode::Plain(value) => scalar_text(value),
            TextNode::Attributed { text, .. } => text.and_then(scalar_text),
        }
    }

    /// Attribute value (`None` for plain text)
    pub fn attr(&self, name: &str) -> Option<String> {
        match self {
            TextNode::Plain(_) => None,
            TextNode::Attributed { node, .. } => attr(node, name),
        }
    }

    /// Numeric attribute value
    pub fn attr_number<T: FromStr>(&self, name: &str) -> Option<T> {
        match self {
            TextNode::Plain(_) => None,
            TextNode::Attributed { node, .. } => attr_number(node, name),
        }
    }
}

fn attr_key(name: &str) -> String {
    format!("{}{}", ATTR_PREFIX, name)
}

/// Attribute text of an element object
pub fn attr(node: &Map<String, Value>, name: &str) -> Option<String> {
    node.get(&attr_key(name)).and_then(scalar_text)
}

/// Numeric attribute of an element object
pub fn attr_number<T: FromStr>(node: &Map<String, Value>, name: &str) -> Option<T> {
    number(node.get(&attr_key(name)))
}

/// Text content of a child element (plain or attributed)
pub fn child_text(node: &Map<String, Value>, name: &str) -> Option<String> {
    TextNode::from_value(node.get(name))?.text()
}

/// Attribute if present, else child element text
pub fn attr_or_child(node: &Map<String, Value>, name: &str) -> Option<String> {
    attr(node, name).or_else(|| child_text(node, name))
}
