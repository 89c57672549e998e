//! The in-memory ServiceModel produced by the WSDL Analyzer (§3, §4.5) and
//! consumed by the Operation Dispatcher and WSDL Generator.

use crate::envelope::SoapVersion;

/// A frozen description of a SOAP service: its namespace, endpoints,
/// operations, and type catalog. Built once by [`super::analyzer::analyze`]
/// and never mutated afterwards (§9 "ServiceModel immutability").
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceModel {
    pub target_namespace: String,
    pub service_name: String,
    pub endpoints: Vec<Endpoint>,
    pub operations: Vec<Operation>,
    pub types: Vec<(String, XsdType)>,
}

impl ServiceModel {
    pub fn find_operation(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn find_type(&self, qualified_name: &str) -> Option<&XsdType> {
        self.types
            .iter()
            .find(|(n, _)| n == qualified_name)
            .map(|(_, t)| t)
    }
}

/// An address where a binding is reachable.
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub address: String,
    pub binding_ref: String,
    pub transport: String,
    pub soap_version: SoapVersion,
}

/// Document vs RPC encoding style for an operation's body (§4.8 only emits
/// `document`, but the analyzer must still recognize `rpc` from the wire).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Document,
    Rpc,
}

/// A single named RPC exposed by a binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: String,
    pub soap_action: String,
    pub style: Style,
    pub input: Message,
    pub output: Message,
    pub faults: Vec<Message>,
    pub binding_ref: String,
}

/// An ordered `part_name -> {type_ref, required}` mapping (§3).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message(pub Vec<(String, MessagePart)>);

impl Message {
    pub fn new() -> Self {
        Message(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, part_name: &str) -> Option<&MessagePart> {
        self.0.iter().find(|(n, _)| n == part_name).map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MessagePart)> {
        self.0.iter().map(|(n, p)| (n.as_str(), p))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessagePart {
    pub type_ref: String,
    pub required: bool,
}

/// XSD type catalog entry (§3).
#[derive(Debug, Clone, PartialEq)]
pub enum XsdType {
    Primitive(PrimitiveKind),
    Complex { fields: Vec<FieldDef> },
    Enumeration { base: String, values: Vec<String> },
    List { item_type: String },
    Union { members: Vec<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveKind {
    String,
    Int,
    Decimal,
    Boolean,
    DateTime,
    Date,
    Base64Binary,
}

impl PrimitiveKind {
    /// Recognizes the built-in XSD primitives by local name, matching any
    /// namespace prefix (`xsd:string`, `xs:string`, ...).
    pub fn from_local_name(local_name: &str) -> Option<Self> {
        match local_name {
            "string" => Some(PrimitiveKind::String),
            "int" | "integer" | "long" | "short" => Some(PrimitiveKind::Int),
            "decimal" | "float" | "double" => Some(PrimitiveKind::Decimal),
            "boolean" => Some(PrimitiveKind::Boolean),
            "dateTime" => Some(PrimitiveKind::DateTime),
            "date" => Some(PrimitiveKind::Date),
            "base64Binary" => Some(PrimitiveKind::Base64Binary),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub type_ref: String,
    pub min_occurs: u32,
    pub max_occurs: MaxOccurs,
    pub nillable: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxOccurs {
    Bounded(u32),
    Unbounded,
}
