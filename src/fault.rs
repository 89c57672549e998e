//! The Fault Model (§4.9): a uniform representation of SOAP 1.1 and 1.2
//! faults, recognized purely by local-name suffix so the prefix a peer
//! happens to use never matters.

use crate::envelope::SoapVersion;
use crate::xml::tree::{local_name_of, Map, MapBuilder, Value};

/// A SOAP fault, normalized across SOAP 1.1 (`faultcode`/`faultstring`/
/// `faultactor`/`detail`) and SOAP 1.2 (`Code/Value`, `Reason/Text`,
/// `Role`, `Detail`) wire shapes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fault {
    pub code: String,
    pub subcode: Option<String>,
    pub string: String,
    pub actor: Option<String>,
    pub detail: Option<Value>,
}

impl Fault {
    pub fn new(code: impl Into<String>, string: impl Into<String>) -> Self {
        Fault {
            code: code.into(),
            subcode: None,
            string: string.into(),
            actor: None,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: Value) -> Self {
        self.detail = Some(detail);
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }
}

impl std::fmt::Display for Fault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SOAP fault [{}]: {}", self.code, self.string)
    }
}

impl std::error::Error for Fault {}

/// Scans `body` for a Fault element (local-name suffix `Fault`, §4.9
/// recognition order) and extracts it into the normalized [`Fault`] shape.
/// Returns `None` when `body` carries no fault.
pub fn detect(body: &Value) -> Option<Fault> {
    let map = body.as_map()?;
    let (_, fault_value) = map
        .iter()
        .find(|(key, _)| local_name_of(key) == "Fault")?;
    let fault_map = fault_value.as_map()?;

    if let Some((_, code_value)) = fault_map.get_by_local_name("faultcode") {
        // SOAP 1.1 shape.
        let code = code_value.as_text_or_empty().to_string();
        let string = fault_map
            .get_by_local_name("faultstring")
            .map(|(_, v)| v.as_text_or_empty().to_string())
            .unwrap_or_default();
        let actor = fault_map
            .get_by_local_name("faultactor")
            .map(|(_, v)| v.as_text_or_empty().to_string())
            .filter(|s| !s.is_empty());
        let detail = fault_map
            .get_by_local_name("detail")
            .map(|(_, v)| v.clone());
        return Some(Fault {
            code,
            subcode: None,
            string,
            actor,
            detail,
        });
    }

    // SOAP 1.2 shape: Code/Value[/Subcode/Value], Reason/Text, Role, Detail.
    let code = fault_map
        .get_by_local_name("Code")
        .and_then(|(_, v)| v.child_by_local_name("Value"))
        .map(|v| v.as_text_or_empty().to_string())
        .unwrap_or_default();
    let subcode = fault_map
        .get_by_local_name("Code")
        .and_then(|(_, v)| v.child_by_local_name("Subcode"))
        .and_then(|sub| sub.child_by_local_name("Value"))
        .map(|v| v.as_text_or_empty().to_string())
        .filter(|s| !s.is_empty());
    let string = fault_map
        .get_by_local_name("Reason")
        .and_then(|(_, v)| v.child_by_local_name("Text"))
        .map(|v| v.as_text_or_empty().to_string())
        .unwrap_or_default();
    let actor = fault_map
        .get_by_local_name("Role")
        .map(|(_, v)| v.as_text_or_empty().to_string())
        .filter(|s| !s.is_empty());
    let detail = fault_map
        .get_by_local_name("Detail")
        .map(|(_, v)| v.clone());

    Some(Fault {
        code,
        subcode,
        string,
        actor,
        detail,
    })
}

/// Builds the version-appropriate Fault tree for server responses (the
/// child that goes directly under `soap:Body`).
pub fn emit(fault: &Fault, version: SoapVersion) -> Value {
    match version {
        SoapVersion::V1_1 => {
            let mut map = Map::new();
            map.insert("faultcode", Value::text(fault.code.clone()));
            map.insert("faultstring", Value::text(fault.string.clone()));
            if let Some(actor) = &fault.actor {
                map.insert("faultactor", Value::text(actor.clone()));
            }
            if let Some(detail) = &fault.detail {
                map.insert("detail", detail.clone());
            }
            Value::Map(map)
        }
        SoapVersion::V1_2 => {
            let mut code_map = Map::new();
            code_map.insert("Value", Value::text(fault.code.clone()));
            if let Some(subcode) = &fault.subcode {
                let mut sub_map = Map::new();
                sub_map.insert("Value", Value::text(subcode.clone()));
                code_map.insert("Subcode", Value::Map(sub_map));
            }

            let mut reason_map = Map::new();
            reason_map.insert(
                "Text",
                MapBuilder::new()
                    .attr("xml:lang", "en")
                    .text(fault.string.clone())
                    .into_value(),
            );

            let mut map = Map::new();
            map.insert("Code", Value::Map(code_map));
            map.insert("Reason", Value::Map(reason_map));
            if let Some(actor) = &fault.actor {
                map.insert("Role", Value::text(actor.clone()));
            }
            if let Some(detail) = &fault.detail {
                map.insert("Detail", detail.clone());
            }
            Value::Map(map)
        }
    }
}
