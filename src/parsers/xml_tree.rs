//! XML → generic attributed tree.
//!
//! Elements become JSON-like values:
//!
//! - text-only element: `"text"`
//! - element with attributes or children: an object where attributes are
//!   keyed `@name`, children by element name, and direct text under `#text`
//! - repeated children collapse into an array; names listed in
//!   `always_array` are arrays even when they occur once
//!
//! The XML declaration is kept under the `?xml` key of the document.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

use crate::error::KakenError;

/// Prefix marking attribute keys
pub const ATTR_PREFIX: &str = "@";
/// Key holding an element's direct text when it also has attributes or children
pub const TEXT_KEY: &str = "#text";
/// Key holding the XML declaration
pub const DECLARATION_KEY: &str = "?xml";

#[derive(Debug)]
struct Frame {
    name: String,
    node: Map<String, Value>,
    has_content: bool,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, KakenError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut node = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref());
            let value = attr.unescape_value()?;
            node.insert(
                format!("{}{}", ATTR_PREFIX, key),
                Value::String(value.into_owned()),
            );
        }
        Ok(Self {
            name,
            has_content: !node.is_empty(),
            node,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        if !self.has_content {
            return (self.name, Value::String(self.text));
        }
        let mut node = self.node;
        if !self.text.is_empty() {
            node.insert(TEXT_KEY.to_string(), Value::String(self.text));
        }
        (self.name, Value::Object(node))
    }
}

fn insert_child(parent: &mut Map<String, Value>, name: String, value: Value, always_array: &[&str]) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let previous = existing.take();
            *existing = Value::Array(vec![previous, value]);
        }
        None => {
            let value = if always_array.contains(&name.as_str()) {
                Value::Array(vec![value])
            } else {
                value
            };
            parent.insert(name, value);
        }
    }
}

fn attach(
    stack: &mut [Frame],
    document: &mut Map<String, Value>,
    frame: Frame,
    always_array: &[&str],
) {
    let (name, value) = frame.close();
    match stack.last_mut() {
        Some(parent) => {
            parent.has_content = true;
            insert_child(&mut parent.node, name, value, always_array);
        }
        None => insert_child(document, name, value, always_array),
    }
}

/// Parse `xml` into a document map keyed by root element name
pub fn parse(xml: &str, always_array: &[&str]) -> Result<Map<String, Value>, KakenError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut document = Map::new();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Decl(decl) => {
                let mut node = Map::new();
                if let Ok(version) = decl.version() {
                    node.insert(
                        format!("{}version", ATTR_PREFIX),
                        Value::String(String::from_utf8_lossy(&version).into_owned()),
                    );
                }
                document.insert(DECLARATION_KEY.to_string(), Value::Object(node));
            }
            Event::Start(start) => stack.push(Frame::open(&start)?),
            Event::Empty(start) => {
                let frame = Frame::open(&start)?;
                attach(&mut stack, &mut document, frame, always_array);
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| KakenError::response("Unexpected closing tag"))?;
                attach(&mut stack, &mut document, frame, always_array);
            }
            Event::Text(text) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(frame) = stack.last_mut() {
                    frame
                        .text
                        .push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(KakenError::response(format!(
            "Unclosed element <{}>",
            open.name
        )));
    }

    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_text_attributes_and_children() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
            <root count="2">
                <name>Alpha</name>
                <item code="x">One</item>
                <item>Two</item>
                <empty/>
            </root>"#;
        let document = parse(xml, &[]).unwrap();

        assert_eq!(document[DECLARATION_KEY], json!({"@version": "1.0"}));
        assert_eq!(
            document["root"],
            json!({
                "@count": "2",
                "name": "Alpha",
                "item": [{"@code": "x", "#text": "One"}, "Two"],
                "empty": ""
            })
        );
    }

    #[test]
    fn test_forced_arrays() {
        let xml = "<root><member role=\"pi\"/><keyword>solo</keyword></root>";
        let document = parse(xml, &["member", "keyword"]).unwrap();
        assert_eq!(
            document["root"],
            json!({"member": [{"@role": "pi"}], "keyword": ["solo"]})
        );
    }

    #[test]
    fn test_attribute_keys_do_not_collide_with_children() {
        let xml = r#"<root title="attr"><title>child</title></root>"#;
        let document = parse(xml, &[]).unwrap();
        assert_eq!(document["root"]["@title"], json!("attr"));
        assert_eq!(document["root"]["title"], json!("child"));
    }

    #[test]
    fn test_entities_and_cdata() {
        let xml = "<root><a>R&amp;D</a><b><![CDATA[<raw>]]></b></root>";
        let document = parse(xml, &[]).unwrap();
        assert_eq!(document["root"]["a"], json!("R&D"));
        assert_eq!(document["root"]["b"], json!("<raw>"));
    }

    #[test]
    fn test_namespaced_attribute_keeps_prefix() {
        let xml = r#"<summary xml:lang="ja"><title>題名</title></summary>"#;
        let document = parse(xml, &[]).unwrap();
        assert_eq!(document["summary"]["@xml:lang"], json!("ja"));
    }

    #[test]
    fn test_malformed_xml_is_response_error() {
        assert!(parse("<root><a></root>", &[]).unwrap_err().is_response_error());
        assert!(parse("<root>", &[]).unwrap_err().is_response_error());
    }
}
