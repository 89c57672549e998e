//! The WSDL Analyzer (§4.5): turns a WSDL 1.1 document plus inline XSD into
//! a frozen [`ServiceModel`].

use std::collections::HashSet;

use crate::envelope::SoapVersion;
use crate::xml::tree::{local_name_of, prefix_of, Map, Value};
use crate::xml::{self};

use super::error::AnalysisError;
use super::model::{
    Endpoint, FieldDef, Message, MessagePart, MaxOccurs, Operation, PrimitiveKind, ServiceModel,
    Style, XsdType,
};

const MAX_IMPORT_DEPTH: u32 = 4;

/// Fetches an external schema document by URL. The default [`analyze`]
/// entry point has no transport of its own (§1 "deliberately out of
/// scope") and degrades unresolved imports to treating referenced types as
/// `string`; callers that want real import resolution supply a fetcher
/// backed by their HTTP client via [`analyze_with_fetcher`].
pub trait SchemaFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AnalysisError>;
}

struct NoFetch;

impl SchemaFetcher for NoFetch {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AnalysisError> {
        Err(AnalysisError::MissingSection {
            kind: "schemaLocation".to_string(),
            detail: format!("no fetcher configured to resolve {url}"),
        })
    }
}

/// Analyzes `wsdl_bytes` into a [`ServiceModel`], resolving same-document
/// `xsd:include`/`xsd:import` only (no external fetch).
pub fn analyze(wsdl_bytes: &[u8], base_url: &str) -> Result<ServiceModel, AnalysisError> {
    analyze_with_fetcher(wsdl_bytes, base_url, &NoFetch)
}

/// As [`analyze`], resolving external `schemaLocation` imports via
/// `fetcher`, bounded to depth 4 with a visited-URL set guarding cycles
/// (§9 open question decision).
pub fn analyze_with_fetcher(
    wsdl_bytes: &[u8],
    base_url: &str,
    fetcher: &dyn SchemaFetcher,
) -> Result<ServiceModel, AnalysisError> {
    let span = tracing::info_span!("wsdl_analyze", wsdl_url = base_url);
    let _enter = span.enter();

    let tree = xml::parse(wsdl_bytes).map_err(|e| AnalysisError::MalformedXml {
        offset: e.offset,
        reason: e.reason,
    })?;
    let definitions = tree
        .as_map()
        .ok_or_else(|| missing("definitions", "document root is not an element"))?;
    let definitions = definitions
        .get_by_local_name("definitions")
        .map(|(_, v)| v)
        .unwrap_or(&tree)
        .as_map()
        .ok_or_else(|| missing("definitions", "no definitions element found"))?;

    let target_namespace = definitions
        .get("@targetNamespace")
        .and_then(Value::as_text)
        .unwrap_or("")
        .to_string();
    let doc_name = definitions
        .get("@name")
        .and_then(Value::as_text)
        .unwrap_or("")
        .to_string();

    let mut types = Vec::new();
    let mut visited = HashSet::new();
    for (_, types_val) in definitions.entries_by_local_name("types") {
        if let Some(types_map) = types_val.as_map() {
            for (_, schema_val) in types_map.entries_by_local_name("schema") {
                if let Some(schema_map) = schema_val.as_map() {
                    index_schema_types(schema_map, &mut types);
                    resolve_imports(schema_map, base_url, 0, &mut visited, fetcher, &mut types);
                }
            }
        }
    }

    let messages = collect_messages(definitions);
    let port_type_ops = collect_port_type_operations(definitions);
    let (operations, endpoints, service_name) =
        collect_bindings_and_services(definitions, &messages, &port_type_ops, base_url);

    Ok(ServiceModel {
        target_namespace,
        service_name: if service_name.is_empty() {
            doc_name
        } else {
            service_name
        },
        endpoints,
        operations,
        types,
    })
}

fn missing(kind: &str, detail: &str) -> AnalysisError {
    AnalysisError::MissingSection {
        kind: kind.to_string(),
        detail: detail.to_string(),
    }
}

fn index_schema_types(schema_map: &Map, types: &mut Vec<(String, XsdType)>) {
    for (_, element_val) in schema_map.entries_by_local_name("element") {
        if let Some(element_map) = element_val.as_map() {
            let name = element_map.get("@name").and_then(Value::as_text);
            if let (Some(name), Some((_, complex_val))) =
                (name, element_map.get_by_local_name("complexType"))
            {
                if let Some(fields) = complex_fields(complex_val) {
                    types.push((name.to_string(), XsdType::Complex { fields }));
                }
            }
        }
    }

    for (_, complex_val) in schema_map.entries_by_local_name("complexType") {
        if let Some(complex_map) = complex_val.as_map() {
            if let Some(name) = complex_map.get("@name").and_then(Value::as_text) {
                if let Some(fields) = complex_fields(complex_val) {
                    types.push((name.to_string(), XsdType::Complex { fields }));
                }
            }
        }
    }

    for (_, simple_val) in schema_map.entries_by_local_name("simpleType") {
        if let Some(simple_map) = simple_val.as_map() {
            if let Some(name) = simple_map.get("@name").and_then(Value::as_text) {
                if let Some(xsd_type) = simple_type_from(simple_map) {
                    types.push((name.to_string(), xsd_type));
                }
            }
        }
    }
}

fn complex_fields(complex_val: &Value) -> Option<Vec<FieldDef>> {
    let complex_map = complex_val.as_map()?;
    let (_, group_val) = complex_map
        .get_by_local_name("sequence")
        .or_else(|| complex_map.get_by_local_name("all"))
        .or_else(|| complex_map.get_by_local_name("choice"))?;
    let group_map = group_val.as_map()?;

    let mut fields = Vec::new();
    for (_, element_val) in group_map.entries_by_local_name("element") {
        if let Some(element_map) = element_val.as_map() {
            let name = element_map
                .get("@name")
                .and_then(Value::as_text)
                .unwrap_or("")
                .to_string();
            let type_ref = element_map
                .get("@type")
                .and_then(Value::as_text)
                .unwrap_or("xsd:string")
                .to_string();
            let min_occurs = element_map
                .get("@minOccurs")
                .and_then(Value::as_text)
                .and_then(|s| s.parse().ok())
                .unwrap_or(1);
            let max_occurs = match element_map.get("@maxOccurs").and_then(Value::as_text) {
                Some("unbounded") => MaxOccurs::Unbounded,
                Some(n) => MaxOccurs::Bounded(n.parse().unwrap_or(1)),
                None => MaxOccurs::Bounded(1),
            };
            let nillable = element_map
                .get("@nillable")
                .and_then(Value::as_text)
                .map(|s| s == "true" || s == "1")
                .unwrap_or(false);
            fields.push(FieldDef {
                name,
                type_ref,
                min_occurs,
                max_occurs,
                nillable,
            });
        }
    }
    Some(fields)
}

fn simple_type_from(simple_map: &Map) -> Option<XsdType> {
    if let Some((_, restriction_val)) = simple_map.get_by_local_name("restriction") {
        let restriction_map = restriction_val.as_map()?;
        let base = restriction_map
            .get("@base")
            .and_then(Value::as_text)
            .unwrap_or("xsd:string")
            .to_string();
        let values: Vec<String> = restriction_map
            .entries_by_local_name("enumeration")
            .filter_map(|(_, v)| v.as_map()?.get("@value").and_then(Value::as_text))
            .map(str::to_string)
            .collect();
        if !values.is_empty() {
            return Some(XsdType::Enumeration { base, values });
        }
        return None;
    }
    if let Some((_, list_val)) = simple_map.get_by_local_name("list") {
        let item_type = list_val
            .as_map()?
            .get("@itemType")
            .and_then(Value::as_text)
            .unwrap_or("xsd:string")
            .to_string();
        return Some(XsdType::List { item_type });
    }
    if let Some((_, union_val)) = simple_map.get_by_local_name("union") {
        let members = union_val
            .as_map()?
            .get("@memberTypes")
            .and_then(Value::as_text)
            .unwrap_or("")
            .split_whitespace()
            .map(str::to_string)
            .collect();
        return Some(XsdType::Union { members });
    }
    None
}

fn resolve_imports(
    schema_map: &Map,
    base_url: &str,
    depth: u32,
    visited: &mut HashSet<String>,
    fetcher: &dyn SchemaFetcher,
    types: &mut Vec<(String, XsdType)>,
) {
    if depth >= MAX_IMPORT_DEPTH {
        return;
    }

    let imports = schema_map
        .entries_by_local_name("import")
        .chain(schema_map.entries_by_local_name("include"));

    for (_, import_val) in imports {
        let Some(import_map) = import_val.as_map() else {
            continue;
        };
        let Some(location) = import_map.get("@schemaLocation").and_then(Value::as_text) else {
            continue;
        };
        let resolved = resolve_url(base_url, location);
        if !visited.insert(resolved.clone()) {
            continue;
        }
        let Ok(bytes) = fetcher.fetch(&resolved) else {
            tracing::warn!(location = %resolved, "failed to resolve schema import, referenced types degrade to string");
            continue;
        };
        let Ok(tree) = xml::parse(&bytes) else {
            tracing::warn!(location = %resolved, "imported schema is not well-formed XML, skipping");
            continue;
        };
        if let Some(imported_schema) = tree
            .as_map()
            .and_then(|m| m.get_by_local_name("schema").map(|(_, v)| v))
            .or(Some(&tree))
            .and_then(Value::as_map)
        {
            index_schema_types(imported_schema, types);
            resolve_imports(imported_schema, &resolved, depth + 1, visited, fetcher, types);
        }
    }
}

fn resolve_url(base_url: &str, location: &str) -> String {
    if location.starts_with("http://") || location.starts_with("https://") {
        return location.to_string();
    }
    match base_url.rfind('/') {
        Some(pos) => format!("{}/{}", &base_url[..pos], location),
        None => location.to_string(),
    }
}

struct PortTypeOperation {
    name: String,
    input_message: Option<String>,
    output_message: Option<String>,
    fault_messages: Vec<String>,
}

fn collect_messages(definitions: &Map) -> Vec<(String, Message)> {
    let mut messages = Vec::new();
    for (_, message_val) in definitions.entries_by_local_name("message") {
        let Some(message_map) = message_val.as_map() else {
            continue;
        };
        let name = message_map
            .get("@name")
            .and_then(Value::as_text)
            .unwrap_or("")
            .to_string();
        let mut parts = Message::new();
        for (_, part_val) in message_map.entries_by_local_name("part") {
            let Some(part_map) = part_val.as_map() else {
                continue;
            };
            let part_name = part_map
                .get("@name")
                .and_then(Value::as_text)
                .unwrap_or("")
                .to_string();
            let type_ref = part_map
                .get("@type")
                .or_else(|| part_map.get("@element"))
                .and_then(Value::as_text)
                .unwrap_or("xsd:string")
                .to_string();
            parts.0.push((
                part_name,
                MessagePart {
                    type_ref,
                    required: true,
                },
            ));
        }
        messages.push((name, parts));
    }
    messages
}

fn collect_port_type_operations(definitions: &Map) -> Vec<PortTypeOperation> {
    let mut ops = Vec::new();
    for (_, port_type_val) in definitions.entries_by_local_name("portType") {
        let Some(port_type_map) = port_type_val.as_map() else {
            continue;
        };
        for (_, op_val) in port_type_map.entries_by_local_name("operation") {
            let Some(op_map) = op_val.as_map() else {
                continue;
            };
            let name = op_map
                .get("@name")
                .and_then(Value::as_text)
                .unwrap_or("")
                .to_string();
            let input_message = op_map
                .get_by_local_name("input")
                .and_then(|(_, v)| v.as_map())
                .and_then(|m| m.get("@message"))
                .and_then(Value::as_text)
                .map(|s| local_name_of(s).to_string());
            let output_message = op_map
                .get_by_local_name("output")
                .and_then(|(_, v)| v.as_map())
                .and_then(|m| m.get("@message"))
                .and_then(Value::as_text)
                .map(|s| local_name_of(s).to_string());
            let fault_messages = op_map
                .entries_by_local_name("fault")
                .filter_map(|(_, v)| v.as_map())
                .filter_map(|m| m.get("@message"))
                .filter_map(Value::as_text)
                .map(|s| local_name_of(s).to_string())
                .collect();
            ops.push(PortTypeOperation {
                name,
                input_message,
                output_message,
                fault_messages,
            });
        }
    }
    ops
}

fn collect_bindings_and_services(
    definitions: &Map,
    messages: &[(String, Message)],
    port_type_ops: &[PortTypeOperation],
    base_url: &str,
) -> (Vec<Operation>, Vec<Endpoint>, String) {
    let prefix_ns = root_namespace_declarations(definitions);

    let mut operations = Vec::new();
    for (_, binding_val) in definitions.entries_by_local_name("binding") {
        let Some(binding_map) = binding_val.as_map() else {
            continue;
        };
        let binding_name = binding_map
            .get("@name")
            .and_then(Value::as_text)
            .unwrap_or("")
            .to_string();

        let (soap_version, default_style) = binding_map
            .get_by_local_name("binding")
            .map(|(key, val)| {
                let version = namespace_for_prefix(&prefix_ns, prefix_of(key))
                    .map(|ns| {
                        if ns.contains("wsdl/soap12/") {
                            SoapVersion::V1_2
                        } else {
                            SoapVersion::V1_1
                        }
                    })
                    .unwrap_or(SoapVersion::V1_1);
                let style = val
                    .as_map()
                    .and_then(|m| m.get("@style"))
                    .and_then(Value::as_text)
                    .map(|s| if s == "rpc" { Style::Rpc } else { Style::Document })
                    .unwrap_or(Style::Document);
                (version, style)
            })
            .unwrap_or((SoapVersion::V1_1, Style::Document));

        for (_, op_val) in binding_map.entries_by_local_name("operation") {
            let Some(op_map) = op_val.as_map() else {
                continue;
            };
            let op_name = op_map
                .get("@name")
                .and_then(Value::as_text)
                .unwrap_or("")
                .to_string();
            let Some(port_type_op) = port_type_ops.iter().find(|o| o.name == op_name) else {
                continue;
            };

            let soap_action = op_map
                .get_by_local_name("operation")
                .and_then(|(_, v)| v.as_map())
                .and_then(|m| m.get("@soapAction"))
                .and_then(Value::as_text)
                .unwrap_or("")
                .to_string();

            let style = op_map
                .get_by_local_name("operation")
                .and_then(|(_, v)| v.as_map())
                .and_then(|m| m.get("@style"))
                .and_then(Value::as_text)
                .map(|s| if s == "rpc" { Style::Rpc } else { Style::Document })
                .unwrap_or(default_style);

            let input = port_type_op
                .input_message
                .as_deref()
                .and_then(|name| messages.iter().find(|(n, _)| n == name))
                .map(|(_, m)| m.clone())
                .unwrap_or_default();
            let output = port_type_op
                .output_message
                .as_deref()
                .and_then(|name| messages.iter().find(|(n, _)| n == name))
                .map(|(_, m)| m.clone())
                .unwrap_or_default();
            let faults = port_type_op
                .fault_messages
                .iter()
                .filter_map(|name| messages.iter().find(|(n, _)| n == name))
                .map(|(_, m)| m.clone())
                .collect();

            operations.push(Operation {
                name: op_name,
                soap_action,
                style,
                input,
                output,
                faults,
                binding_ref: binding_name.clone(),
            });
        }
    }

    let mut endpoints = Vec::new();
    let mut service_name = String::new();
    for (_, service_val) in definitions.entries_by_local_name("service") {
        let Some(service_map) = service_val.as_map() else {
            continue;
        };
        if service_name.is_empty() {
            service_name = service_map
                .get("@name")
                .and_then(Value::as_text)
                .unwrap_or("")
                .to_string();
        }
        for (_, port_val) in service_map.entries_by_local_name("port") {
            let Some(port_map) = port_val.as_map() else {
                continue;
            };
            let binding_ref = port_map
                .get("@binding")
                .and_then(Value::as_text)
                .map(|s| local_name_of(s).to_string())
                .unwrap_or_default();
            let Some((address_key, address_val)) = port_map.get_by_local_name("address") else {
                continue;
            };
            let location = address_val
                .as_map()
                .and_then(|m| m.get("@location"))
                .and_then(Value::as_text)
                .unwrap_or("");
            let address = resolve_url(base_url, location);
            let soap_version = namespace_for_prefix(&prefix_ns, prefix_of(address_key))
                .map(|ns| {
                    if ns.contains("wsdl/soap12/") {
                        SoapVersion::V1_2
                    } else {
                        SoapVersion::V1_1
                    }
                })
                .unwrap_or(SoapVersion::V1_1);
            endpoints.push(Endpoint {
                address,
                binding_ref,
                transport: "http://schemas.xmlsoap.org/soap/http".to_string(),
                soap_version,
            });
        }
    }

    (operations, endpoints, service_name)
}

fn root_namespace_declarations(definitions: &Map) -> Vec<(String, String)> {
    definitions
        .iter()
        .filter(|(k, _)| k.starts_with("@xmlns"))
        .filter_map(|(k, v)| {
            let prefix = k.strip_prefix("@xmlns:").unwrap_or("").to_string();
            v.as_text().map(|uri| (prefix, uri.to_string()))
        })
        .collect()
}

fn namespace_for_prefix<'a>(decls: &'a [(String, String)], prefix: &str) -> Option<&'a str> {
    decls
        .iter()
        .find(|(p, _)| p == prefix)
        .map(|(_, uri)| uri.as_str())
}

#[allow(dead_code)]
fn primitive_from_type_ref(type_ref: &str) -> PrimitiveKind {
    PrimitiveKind::from_local_name(local_name_of(type_ref)).unwrap_or(PrimitiveKind::String)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALCULATOR_WSDL: &str = r#"<?xml version="1.0"?>
    <definitions name="CalculatorService"
        targetNamespace="urn:calc"
        xmlns:tns="urn:calc"
        xmlns:xsd="http://www.w3.org/2001/XMLSchema"
        xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
        xmlns="http://schemas.xmlsoap.org/wsdl/">
      <types>
        <xsd:schema targetNamespace="urn:calc">
          <xsd:element name="Add">
            <xsd:complexType>
              <xsd:sequence>
                <xsd:element name="a" type="xsd:decimal"/>
                <xsd:element name="b" type="xsd:decimal"/>
              </xsd:sequence>
            </xsd:complexType>
          </xsd:element>
          <xsd:element name="AddResponse">
            <xsd:complexType>
              <xsd:sequence>
                <xsd:element name="result" type="xsd:decimal"/>
              </xsd:sequence>
            </xsd:complexType>
          </xsd:element>
        </xsd:schema>
      </types>
      <message name="AddRequest"><part name="parameters" element="tns:Add"/></message>
      <message name="AddResponse"><part name="parameters" element="tns:AddResponse"/></message>
      <portType name="CalculatorPortType">
        <operation name="Add">
          <input message="tns:AddRequest"/>
          <output message="tns:AddResponse"/>
        </operation>
      </portType>
      <binding name="CalculatorBinding" type="tns:CalculatorPortType">
        <soap:binding transport="http://schemas.xmlsoap.org/soap/http" style="document"/>
        <operation name="Add">
          <soap:operation soapAction="urn:calc#Add"/>
          <input><soap:body use="literal"/></input>
          <output><soap:body use="literal"/></output>
        </operation>
      </binding>
      <service name="CalculatorService">
        <port name="CalculatorPort" binding="tns:CalculatorBinding">
          <soap:address location="http://example.com/calc"/>
        </port>
      </service>
    </definitions>"#;

    #[test]
    fn analyzes_calculator_service() {
        let model = analyze(CALCULATOR_WSDL.as_bytes(), "http://example.com/calc?wsdl").unwrap();
        assert_eq!(model.target_namespace, "urn:calc");
        assert_eq!(model.service_name, "CalculatorService");
        assert_eq!(model.operations.len(), 1);

        let add = model.find_operation("Add").unwrap();
        assert_eq!(add.soap_action, "urn:calc#Add");
        assert_eq!(add.style, Style::Document);
        assert!(!add.input.is_empty());
        assert!(!add.output.is_empty());

        assert_eq!(model.endpoints.len(), 1);
        assert_eq!(model.endpoints[0].address, "http://example.com/calc");
        assert_eq!(model.endpoints[0].soap_version, SoapVersion::V1_1);
    }

    #[test]
    fn indexes_complex_types_from_inline_schema() {
        let model = analyze(CALCULATOR_WSDL.as_bytes(), "http://example.com/").unwrap();
        let add_type = model.find_type("Add").unwrap();
        match add_type {
            XsdType::Complex { fields } => {
                assert_eq!(fields.len(), 2);
                assert_eq!(fields[0].name, "a");
            }
            _ => panic!("expected complex type"),
        }
    }

    #[test]
    fn bounds_import_depth_and_dedupes_visited_locations() {
        let schema = r#"<schema xmlns="http://www.w3.org/2001/XMLSchema">
            <import schemaLocation="a.xsd" namespace="urn:a"/>
            <import schemaLocation="a.xsd" namespace="urn:a"/>
        </schema>"#;
        let tree = xml::parse(schema.as_bytes()).unwrap();
        let schema_map = tree.as_map().unwrap();
        let mut visited = HashSet::new();
        let mut types = Vec::new();
        struct CountingFetcher(std::cell::RefCell<u32>);
        impl SchemaFetcher for CountingFetcher {
            fn fetch(&self, _url: &str) -> Result<Vec<u8>, AnalysisError> {
                *self.0.borrow_mut() += 1;
                Err(AnalysisError::MissingSection {
                    kind: "test".into(),
                    detail: "unreachable in this test".into(),
                })
            }
        }
        let fetcher = CountingFetcher(std::cell::RefCell::new(0));
        resolve_imports(schema_map, "http://host/wsdl", 0, &mut visited, &fetcher, &mut types);
        assert_eq!(*fetcher.0.borrow(), 1);
    }
}
