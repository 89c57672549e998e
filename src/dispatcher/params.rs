//! The dispatcher's parameter tree: a typed variant of the canonical XML
//! tree (§3, §9 "Attachment marker in parameter tree") that carries binary
//! attachments as a distinct leaf instead of a heuristically-detected tuple.

use crate::mime::Attachment;
use crate::xml::tree::{Map, Value};

/// A scalar parameter value, coerced to its canonical XSD lexical form on
/// output (§4.6 step 2).
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Str(String),
    Int(i64),
    Decimal(f64),
    Bool(bool),
}

impl Primitive {
    pub fn to_lexical(&self) -> String {
        match self {
            Primitive::Str(s) => s.clone(),
            Primitive::Int(n) => n.to_string(),
            Primitive::Bool(b) => if *b { "true" } else { "false" }.to_string(),
            Primitive::Decimal(d) => format_decimal(*d),
        }
    }
}

fn format_decimal(value: f64) -> String {
    let mut text = format!("{value}");
    if !text.contains('.') {
        return text;
    }
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    text
}

/// A single attachment leaf before it is substituted with an
/// `xop:Include` reference and moved out to a MIME part (§4.6 step 3).
#[derive(Debug, Clone, PartialEq)]
pub struct AttachmentParam {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub content_id: Option<String>,
}

/// The dispatcher's input parameter tree: `Primitive | Tree | Sequence |
/// Attachment`, eliminating the heuristic tuple-detection the source used.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Primitive(Primitive),
    Tree(Vec<(String, ParamValue)>),
    Sequence(Vec<ParamValue>),
    Attachment(AttachmentParam),
}

impl ParamValue {
    pub fn text(s: impl Into<String>) -> Self {
        ParamValue::Primitive(Primitive::Str(s.into()))
    }

    pub fn int(n: i64) -> Self {
        ParamValue::Primitive(Primitive::Int(n))
    }

    pub fn decimal(d: f64) -> Self {
        ParamValue::Primitive(Primitive::Decimal(d))
    }

    pub fn boolean(b: bool) -> Self {
        ParamValue::Primitive(Primitive::Bool(b))
    }

    pub fn tree() -> Self {
        ParamValue::Tree(Vec::new())
    }

    pub fn with(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        if let ParamValue::Tree(entries) = &mut self {
            entries.push((key.into(), value));
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        match self {
            ParamValue::Tree(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

/// Recursively projects `value` into a canonical [`Value`], replacing every
/// [`ParamValue::Attachment`] leaf with an `xop:Include` reference and
/// appending the extracted bytes to `attachments` (§4.6 step 3, §4.2).
pub fn extract_attachments(value: &ParamValue, attachments: &mut Vec<Attachment>) -> Value {
    match value {
        ParamValue::Primitive(p) => Value::text(p.to_lexical()),
        ParamValue::Tree(entries) => {
            let mut map = Map::new();
            for (key, child) in entries {
                map.insert(key.clone(), extract_attachments(child, attachments));
            }
            Value::Map(map)
        }
        ParamValue::Sequence(items) => Value::Sequence(
            items
                .iter()
                .map(|item| extract_attachments(item, attachments))
                .collect(),
        ),
        ParamValue::Attachment(attachment) => {
            let content_id = attachment
                .content_id
                .clone()
                .unwrap_or_else(|| format!("attachment-{}@dispatch", attachments.len() + 1));
            attachments.push(Attachment {
                content_id: Some(content_id.clone()),
                content_type: attachment.content_type.clone(),
                content_transfer_encoding: "binary".to_string(),
                data: attachment.bytes.clone(),
                size: attachment.bytes.len(),
            });

            let mut include = Map::new();
            include.insert("@href", Value::text(format!("cid:{content_id}")));
            include.insert(
                "@xmlns:xop",
                Value::text("http://www.w3.org/2004/08/xop/include"),
            );
            let mut wrapper = Map::new();
            wrapper.insert("xop:Include", Value::Map(include));
            Value::Map(wrapper)
        }
    }
}

/// True when `value` (or any descendant) is an [`ParamValue::Attachment`].
pub fn contains_attachment(value: &ParamValue) -> bool {
    match value {
        ParamValue::Attachment(_) => true,
        ParamValue::Tree(entries) => entries.iter().any(|(_, v)| contains_attachment(v)),
        ParamValue::Sequence(items) => items.iter().any(contains_attachment),
        ParamValue::Primitive(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimal_lexical_form_drops_trailing_zeros() {
        assert_eq!(Primitive::Decimal(15.0).to_lexical(), "15");
        assert_eq!(Primitive::Decimal(15.50).to_lexical(), "15.5");
        assert_eq!(Primitive::Decimal(0.1).to_lexical(), "0.1");
    }

    #[test]
    fn bool_lexical_form_is_true_or_false() {
        assert_eq!(Primitive::Bool(true).to_lexical(), "true");
        assert_eq!(Primitive::Bool(false).to_lexical(), "false");
    }

    #[test]
    fn extract_attachments_substitutes_xop_include_and_collects_bytes() {
        let params = ParamValue::tree()
            .with("fileName", ParamValue::text("report.pdf"))
            .with(
                "document",
                ParamValue::Attachment(AttachmentParam {
                    bytes: vec![0x25, 0x50, 0x44, 0x46],
                    content_type: "application/pdf".to_string(),
                    content_id: None,
                }),
            );
        let mut attachments = Vec::new();
        let tree = extract_attachments(&params, &mut attachments);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].content_type, "application/pdf");
        let document = tree.child_by_local_name("document").unwrap();
        let include = document.child_by_local_name("Include").unwrap();
        let href = include.as_map().unwrap().get("@href").unwrap().as_text();
        assert!(href.unwrap().starts_with("cid:"));
    }

    #[test]
    fn contains_attachment_detects_nested_leaf() {
        let params = ParamValue::tree().with(
            "document",
            ParamValue::Attachment(AttachmentParam {
                bytes: vec![1],
                content_type: "application/octet-stream".to_string(),
                content_id: None,
            }),
        );
        assert!(contains_attachment(&params));
        assert!(!contains_attachment(&ParamValue::text("plain")));
    }
}
