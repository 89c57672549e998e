//! The Envelope Parser (§4.4): unwraps an envelope, detects a Fault, and
//! returns the body content as a canonical tree.

use crate::fault::{self, Fault};
use crate::xml::tree::{local_name_of, Value};
use crate::xml::{self, ParseError};

use super::version::SoapVersion;

/// The result of parsing a SOAP envelope: the detected namespace URI (if
/// recognized), the optional header tree, and the body tree.
#[derive(Debug, Clone)]
pub struct ParsedEnvelope {
    pub envelope_ns: Option<String>,
    pub header: Option<Value>,
    pub body: Value,
}

/// Parses `bytes` as a SOAP envelope, locating `Envelope`/`Header`/`Body`
/// by local-name suffix so any prefix (`soap`, `SOAP-ENV`, `s`, `env`, or
/// none) is accepted.
pub fn parse(bytes: &[u8]) -> Result<ParsedEnvelope, ParseError> {
    let tree = xml::parse(bytes)?;
    let root_map = tree
        .as_map()
        .ok_or_else(|| ParseError::new(0, "document root is not an element"))?;
    let (envelope_key, envelope_value) = root_map
        .get_by_local_name("Envelope")
        .ok_or_else(|| ParseError::new(0, "no Envelope element found"))?;

    let prefix = crate::xml::tree::prefix_of(envelope_key);
    let xmlns_key = if prefix.is_empty() {
        "@xmlns".to_string()
    } else {
        format!("@xmlns:{prefix}")
    };
    let envelope_ns = envelope_value
        .as_map()
        .and_then(|m| m.get(&xmlns_key))
        .and_then(Value::as_text)
        .map(str::to_string);

    let header = envelope_value.child_by_local_name("Header").cloned();
    let body = envelope_value
        .child_by_local_name("Body")
        .cloned()
        .ok_or_else(|| ParseError::new(0, "no Body element found"))?;

    Ok(ParsedEnvelope {
        envelope_ns,
        header,
        body,
    })
}

/// Strips an outer `<OpNameResponse>` wrapper (any namespace prefix) from
/// `body` and returns the remaining child mapping. If `body` instead
/// carries a SOAP Fault, returns it so the caller can surface it distinctly
/// from a normal result (§4.4, §4.9).
pub fn unwrap_response(body: &Value, op_name: &str) -> Result<Value, Fault> {
    if let Some(fault) = fault::detect(body) {
        return Err(fault);
    }

    let wrapper_name = format!("{op_name}Response");
    let map = match body.as_map() {
        Some(map) => map,
        None => return Ok(body.clone()),
    };

    if let Some((_, wrapped)) = map.get_by_local_name(&wrapper_name) {
        return Ok(wrapped.clone());
    }

    // Some services echo back the bare operation name, or wrap nothing at
    // all and place output parts directly under Body; fall back to that.
    if let Some((key, only_child)) = single_child(map) {
        if local_name_of(key) != "Fault" {
            return Ok(only_child.clone());
        }
    }

    Ok(body.clone())
}

fn single_child(map: &crate::xml::tree::Map) -> Option<(&str, &Value)> {
    if map.len() == 1 {
        map.iter().next()
    } else {
        None
    }
}

/// Convenience wrapper returning the [`SoapVersion`] detected from an
/// envelope's declared namespace URI, defaulting to 1.1 when the URI is
/// absent or unrecognized.
pub fn detect_version(parsed: &ParsedEnvelope) -> SoapVersion {
    parsed
        .envelope_ns
        .as_deref()
        .and_then(SoapVersion::detect_from_namespace_uri)
        .unwrap_or(SoapVersion::V1_1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::builder::{build, BuildOptions};
    use crate::xml::tree::Map;

    #[test]
    fn unwraps_operation_response_wrapper() {
        let xml = r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
          <soap:Body>
            <tns:AddResponse xmlns:tns="urn:calc">
              <result>15</result>
            </tns:AddResponse>
          </soap:Body>
        </soap:Envelope>"#;
        let parsed = parse(xml.as_bytes()).unwrap();
        let result = unwrap_response(&parsed.body, "Add").unwrap();
        assert_eq!(
            result.child_by_local_name("result").unwrap().as_text(),
            Some("15")
        );
        assert!(result.child_by_local_name("Body").is_none());
        assert!(result.child_by_local_name("AddResponse").is_none());
    }

    #[test]
    fn surfaces_fault_instead_of_unwrapping() {
        let mut fault_map = Map::new();
        fault_map.insert("faultcode", Value::text("Client"));
        fault_map.insert("faultstring", Value::text("Division by zero"));
        let mut body = Map::new();
        body.insert("soap:Fault", Value::Map(fault_map));

        let err = unwrap_response(&Value::Map(body), "Divide").unwrap_err();
        assert_eq!(err.code, "Client");
        assert_eq!(err.string, "Division by zero");
    }

    #[test]
    fn build_then_parse_round_trips_body() {
        let mut params = Map::new();
        params.insert("a", Value::text("10"));
        let xml = build(
            "Add",
            &Value::Map(params),
            &BuildOptions {
                namespace: "urn:calc".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        let parsed = parse(&xml).unwrap();
        assert_eq!(detect_version(&parsed), SoapVersion::V1_1);
        let add = parsed.body.child_by_local_name("Add").unwrap();
        assert_eq!(add.child_by_local_name("a").unwrap().as_text(), Some("10"));
    }
}
