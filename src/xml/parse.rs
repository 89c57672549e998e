//! XML → canonical tree.
//!
//! Built on `quick_xml`'s pull-event reader, the same crate and event model
//! the SOAP envelope parsing in this codebase's lineage used for ad hoc
//! extraction; here the event loop instead builds a full [`Value`] tree so
//! every downstream component works against one canonical shape instead of
//! re-parsing substrings of the document.

use quick_xml::events::Event;
use quick_xml::Reader;

use super::error::ParseError;
use super::tree::{Map, Value, TEXT_KEY};

struct Frame {
    name: String,
    attrs: Map,
    children: Map,
    text: String,
}

impl Frame {
    fn new(name: String, attrs: Map) -> Self {
        Frame {
            name,
            attrs,
            children: Map::new(),
            text: String::new(),
        }
    }

    /// Converts the accumulated frame into a canonical [`Value`], per the
    /// rule in §4.1: a pure string when there are neither attributes nor
    /// children, otherwise a mapping carrying `@attr`s, children, and
    /// `#text` for any non-whitespace mixed content.
    fn into_value(self) -> Value {
        if self.attrs.is_empty() && self.children.is_empty() {
            return Value::Text(self.text);
        }

        let mut map = self.attrs;
        for (key, value) in self.children.iter() {
            map.insert(key.to_string(), value.clone());
        }
        if !self.text.trim().is_empty() {
            map.set(TEXT_KEY, Value::text(self.text.trim().to_string()));
        }
        Value::Map(map)
    }
}

fn read_attrs(e: &quick_xml::events::BytesStart<'_>) -> Result<Map, ParseError> {
    let mut attrs = Map::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ParseError::new(0, format!("invalid attribute: {err}")))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| ParseError::new(0, format!("invalid attribute value: {err}")))?
            .into_owned();
        attrs.insert(format!("@{key}"), Value::text(value));
    }
    Ok(attrs)
}

/// Parses a well-formed XML document into the canonical [`Value`] tree.
///
/// # Examples
///
/// ```
/// use soap_toolkit::xml::parse;
///
/// let tree = parse(b"<root attr=\"1\"><child>hi</child></root>").unwrap();
/// let root = tree.as_map().unwrap();
/// let child = root.get("root").unwrap().child_by_local_name("child").unwrap();
/// assert_eq!(child.as_text(), Some("hi"));
/// ```
pub fn parse(bytes: &[u8]) -> Result<Value, ParseError> {
    let mut reader = Reader::from_reader(bytes);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<Value> = None;
    let mut buf = Vec::new();

    loop {
        let offset = reader.buffer_position() as usize;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|err| ParseError::new(offset, err.to_string()))?;

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attrs = read_attrs(&e)?;
                stack.push(Frame::new(name, attrs));
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                let attrs = read_attrs(&e)?;
                let value = Frame::new(name.clone(), attrs).into_value();
                push_value(&mut stack, &mut root, name, value);
            }
            Event::End(_) => {
                let frame = stack
                    .pop()
                    .ok_or_else(|| ParseError::new(offset, "unmatched closing tag"))?;
                let name = frame.name.clone();
                let value = frame.into_value();
                push_value(&mut stack, &mut root, name, value);
            }
            Event::Text(text) => {
                let unescaped = text
                    .unescape()
                    .map_err(|err| ParseError::new(offset, err.to_string()))?;
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&unescaped);
                }
            }
            Event::CData(cdata) => {
                let raw = cdata.into_inner();
                let text = String::from_utf8_lossy(raw.as_ref()).into_owned();
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| ParseError::new(0, "no root element found"))
}

fn push_value(stack: &mut [Frame], root: &mut Option<Value>, name: String, value: Value) {
    if let Some(parent) = stack.last_mut() {
        parent.children.insert(name, value);
    } else {
        let mut map = Map::new();
        map.insert(name, value);
        *root = Some(Value::Map(map));
    }
}
