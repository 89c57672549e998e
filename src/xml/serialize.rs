//! Canonical tree → XML.

use super::tree::{local_name_of, Map, Value, TEXT_KEY};

/// Serializes `tree` into a complete XML document, prefixed with the
/// standard `<?xml version="1.0" encoding="UTF-8"?>` declaration (§4.1).
///
/// # Examples
///
/// ```
/// use soap_toolkit::xml::{parse, serialize, tree::{Map, Value}};
///
/// let mut root = Map::new();
/// root.insert("greeting", Value::text("hi"));
/// let bytes = serialize(&Value::Map(root));
/// assert!(String::from_utf8(bytes).unwrap().contains("<greeting>hi</greeting>"));
/// ```
pub fn serialize(tree: &Value) -> Vec<u8> {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    match tree {
        Value::Map(map) => {
            for (key, value) in map.iter() {
                write_element(&mut out, key, value);
            }
        }
        other => write_element(&mut out, "root", other),
    }
    out.into_bytes()
}

/// Serializes `tree` as a fragment with no XML declaration, used when
/// embedding a value as a child of an already-open element (e.g. splicing
/// parameter trees into an operation element).
pub fn serialize_fragment(tree: &Value) -> String {
    let mut out = String::new();
    if let Value::Map(map) = tree {
        for (key, value) in map.iter() {
            write_element(&mut out, key, value);
        }
    }
    out
}

fn write_element(out: &mut String, name: &str, value: &Value) {
    match value {
        Value::Sequence(items) => {
            for item in items {
                write_element(out, name, item);
            }
        }
        Value::Text(text) => {
            if text.is_empty() {
                out.push_str(&format!("<{name}/>"));
            } else {
                out.push_str(&format!("<{name}>{}</{name}>", escape_text(text)));
            }
        }
        Value::Map(map) => write_element_map(out, name, map),
    }
}

fn write_element_map(out: &mut String, name: &str, map: &Map) {
    out.push('<');
    out.push_str(name);

    for (key, value) in map.iter() {
        if let Some(attr_name) = key.strip_prefix('@') {
            let text = value.as_text().unwrap_or("");
            out.push(' ');
            out.push_str(attr_name);
            out.push_str("=\"");
            out.push_str(&escape_attr(text));
            out.push('"');
        }
    }

    let children: Vec<(&str, &Value)> = map
        .iter()
        .filter(|(key, _)| !key.starts_with('@') && *key != TEXT_KEY)
        .collect();
    let text = map.get(TEXT_KEY).and_then(Value::as_text);

    if children.is_empty() && text.is_none() {
        out.push_str("/>");
        return;
    }

    out.push('>');
    if let Some(text) = text {
        out.push_str(&escape_text(text));
    }
    for (key, child) in children {
        write_element(out, key, child);
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

/// Escapes the five predefined XML entities (`< > & " '`) in text content.
pub fn escape_text(s: &str) -> String {
    escape(s)
}

/// Escapes the five predefined XML entities (`< > & " '`) in an attribute
/// value. Per §4.1 both text and attribute values escape the same entity
/// set.
pub fn escape_attr(s: &str) -> String {
    escape(s)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Used by faults and error reporting to pretty-print a local-name lookup
/// target, stripping whichever prefix the document happened to use.
pub fn strip_prefix_for_display(qualified_name: &str) -> &str {
    local_name_of(qualified_name)
}
