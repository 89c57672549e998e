//! The Envelope Builder (§4.3): assembles a SOAP envelope around an
//! operation name, a parameter tree, and optional headers.

use thiserror::Error;

use crate::xml::tree::{Map, Value};
use crate::xml::serialize;

use super::version::SoapVersion;

/// Options recognized by [`build`].
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub version: SoapVersion,
    /// Target namespace for the operation element, declared as `xmlns:tns`.
    pub namespace: String,
    /// Header trees inserted verbatim as children of `soap:Header`, in order.
    pub headers: Vec<Value>,
    /// Recorded for transport only; never written into the envelope itself.
    pub soap_action: Option<String>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            version: SoapVersion::V1_1,
            namespace: String::new(),
            headers: Vec::new(),
            soap_action: None,
        }
    }
}

/// Error raised when an envelope cannot be constructed.
#[derive(Debug, Clone, Error)]
#[error("failed to build SOAP envelope: {0}")]
pub struct BuildError(pub String);

/// Assembles a complete SOAP envelope for `op_name` wrapping `params`,
/// returning the serialized XML bytes.
///
/// # Examples
///
/// ```
/// use soap_toolkit::envelope::{build, BuildOptions, SoapVersion};
/// use soap_toolkit::xml::tree::{Map, Value};
///
/// let mut params = Map::new();
/// params.insert("a", Value::text("10"));
/// params.insert("b", Value::text("5"));
///
/// let opts = BuildOptions {
///     version: SoapVersion::V1_1,
///     namespace: "urn:calculator".to_string(),
///     ..Default::default()
/// };
/// let xml = build("Add", &Value::Map(params), &opts).unwrap();
/// let xml = String::from_utf8(xml).unwrap();
/// assert!(xml.contains("<tns:Add>"));
/// assert!(xml.contains("http://schemas.xmlsoap.org/soap/envelope/"));
/// ```
pub fn build(op_name: &str, params: &Value, opts: &BuildOptions) -> Result<Vec<u8>, BuildError> {
    if op_name.is_empty() {
        return Err(BuildError("operation name must not be empty".to_string()));
    }

    let mut envelope = Map::new();
    envelope.insert("@xmlns:soap", Value::text(opts.version.namespace_uri()));
    if !opts.namespace.is_empty() {
        envelope.insert("@xmlns:tns", Value::text(opts.namespace.clone()));
    }

    if !opts.headers.is_empty() {
        let mut header_map = Map::new();
        for header in &opts.headers {
            splice_into(&mut header_map, header);
        }
        envelope.insert("soap:Header", Value::Map(header_map));
    }

    let mut operation_map = Map::new();
    if let Value::Map(param_map) = params {
        for (key, value) in param_map.iter() {
            operation_map.insert(key.to_string(), value.clone());
        }
    } else if !matches!(params, Value::Text(t) if t.is_empty()) {
        return Err(BuildError(
            "operation parameters must be a mapping of part name to value".to_string(),
        ));
    }

    let mut body_map = Map::new();
    body_map.insert(format!("tns:{op_name}"), Value::Map(operation_map));
    envelope.insert("soap:Body", Value::Map(body_map));

    let mut root = Map::new();
    root.insert("soap:Envelope", Value::Map(envelope));

    Ok(serialize::serialize(&Value::Map(root)))
}

/// Splices the top-level children of `header` (a tree built by e.g.
/// [`crate::security::username_token`]) into `target`, so that multiple
/// header trees can share one `soap:Header` element without nesting an
/// extra wrapper level.
fn splice_into(target: &mut Map, header: &Value) {
    match header {
        Value::Map(map) => {
            for (key, value) in map.iter() {
                target.insert(key.to_string(), value.clone());
            }
        }
        other => target.insert("Header", other.clone()),
    }
}
