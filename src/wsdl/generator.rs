//! The WSDL Generator (§4.8): emits a document/literal WSDL 1.1 document
//! from a [`ServiceModel`].

use crate::envelope::SoapVersion;
use crate::xml::tree::{MapBuilder, Value};
use crate::xml::serialize;

use super::model::{Message, Operation, ServiceModel};

const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
const SOAP11_BINDING_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
const SOAP12_BINDING_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

/// Emits a WSDL 1.1 document for `model`, deriving the SOAP version (and
/// therefore `wsdl/soap/` vs `wsdl/soap12/` binding namespace) from the
/// first endpoint, defaulting to 1.1 when there are none.
pub fn emit(model: &ServiceModel) -> Vec<u8> {
    let soap_version = model
        .endpoints
        .first()
        .map(|e| e.soap_version)
        .unwrap_or(SoapVersion::V1_1);
    let (soap_prefix, soap_binding_ns) = match soap_version {
        SoapVersion::V1_1 => ("soap", SOAP11_BINDING_NS),
        SoapVersion::V1_2 => ("soap12", SOAP12_BINDING_NS),
    };

    let mut definitions = MapBuilder::new()
        .attr("name", model.service_name.clone())
        .attr("targetNamespace", model.target_namespace.clone())
        .attr("xmlns:tns", model.target_namespace.clone())
        .attr("xmlns:xsd", XSD_NS)
        .attr("xmlns", WSDL_NS)
        .attr(&format!("xmlns:{soap_prefix}"), soap_binding_ns);

    definitions = definitions.child("types", types_section(model));
    definitions = emit_messages(definitions, model);

    definitions = definitions.child("portType", port_type_section(model));
    definitions = definitions.child(
        "binding",
        binding_section(model, soap_prefix, soap_binding_ns),
    );
    definitions = definitions.child("service", service_section(model, soap_prefix));

    let root = MapBuilder::new().child("definitions", definitions.into_value()).into_value();
    serialize::serialize(&root)
}

fn emit_messages(mut builder: MapBuilder, model: &ServiceModel) -> MapBuilder {
    for op in &model.operations {
        if !op.input.is_empty() {
            builder = builder.child(
                "message",
                message_value(&format!("{}Request", op.name), &op.input),
            );
        }
        if !op.output.is_empty() {
            builder = builder.child(
                "message",
                message_value(&format!("{}Response", op.name), &op.output),
            );
        }
    }
    builder
}

fn message_value(name: &str, message: &Message) -> Value {
    let mut builder = MapBuilder::new().attr("name", name);
    for (part_name, part) in message.iter() {
        builder = builder.child(
            "part",
            MapBuilder::new()
                .attr("name", part_name)
                .attr("type", part.type_ref.clone())
                .into_value(),
        );
    }
    builder.into_value()
}

fn types_section(model: &ServiceModel) -> Value {
    let mut schema = MapBuilder::new()
        .attr("targetNamespace", model.target_namespace.clone())
        .attr("xmlns:xsd", XSD_NS);

    for op in &model.operations {
        if !op.input.is_empty() {
            schema = schema.child(
                "xsd:element",
                wrapper_element(&op.name, &op.input),
            );
        }
        if !op.output.is_empty() {
            schema = schema.child(
                "xsd:element",
                wrapper_element(&format!("{}Response", op.name), &op.output),
            );
        }
    }

    MapBuilder::new()
        .child("xsd:schema", schema.into_value())
        .into_value()
}

fn wrapper_element(name: &str, message: &Message) -> Value {
    let mut sequence = MapBuilder::new();
    for (part_name, part) in message.iter() {
        sequence = sequence.child(
            "xsd:element",
            MapBuilder::new()
                .attr("name", part_name)
                .attr("type", part.type_ref.clone())
                .into_value(),
        );
    }
    MapBuilder::new()
        .attr("name", name)
        .child(
            "xsd:complexType",
            MapBuilder::new()
                .child("xsd:sequence", sequence.into_value())
                .into_value(),
        )
        .into_value()
}

fn port_type_section(model: &ServiceModel) -> Value {
    let mut port_type = MapBuilder::new().attr("name", format!("{}PortType", model.service_name));
    for op in &model.operations {
        port_type = port_type.child("operation", port_type_operation(op));
    }
    port_type.into_value()
}

fn port_type_operation(op: &Operation) -> Value {
    let mut builder = MapBuilder::new().attr("name", op.name.clone());
    if !op.input.is_empty() {
        builder = builder.child(
            "input",
            MapBuilder::new()
                .attr("message", format!("tns:{}Request", op.name))
                .into_value(),
        );
    }
    if !op.output.is_empty() {
        builder = builder.child(
            "output",
            MapBuilder::new()
                .attr("message", format!("tns:{}Response", op.name))
                .into_value(),
        );
    }
    builder.into_value()
}

fn binding_section(model: &ServiceModel, soap_prefix: &str, soap_binding_ns: &str) -> Value {
    let mut binding = MapBuilder::new()
        .attr("name", format!("{}Binding", model.service_name))
        .attr("type", format!("tns:{}PortType", model.service_name))
        .child(
            format!("{soap_prefix}:binding"),
            MapBuilder::new()
                .attr("style", "document")
                .attr("transport", "http://schemas.xmlsoap.org/soap/http")
                .into_value(),
        );
    let _ = soap_binding_ns;

    for op in &model.operations {
        binding = binding.child("operation", binding_operation(op, soap_prefix));
    }
    binding.into_value()
}

fn binding_operation(op: &Operation, soap_prefix: &str) -> Value {
    let body = MapBuilder::new()
        .child(
            format!("{soap_prefix}:body"),
            MapBuilder::new().attr("use", "literal").into_value(),
        )
        .into_value();

    MapBuilder::new()
        .attr("name", op.name.clone())
        .child(
            format!("{soap_prefix}:operation"),
            MapBuilder::new()
                .attr("soapAction", op.soap_action.clone())
                .into_value(),
        )
        .child("input", body.clone())
        .child("output", body)
        .into_value()
}

fn service_section(model: &ServiceModel, soap_prefix: &str) -> Value {
    let mut service = MapBuilder::new().attr("name", model.service_name.clone());
    for endpoint in &model.endpoints {
        service = service.child(
            "port",
            MapBuilder::new()
                .attr("name", format!("{}Port", model.service_name))
                .attr("binding", format!("tns:{}Binding", model.service_name))
                .child(
                    format!("{soap_prefix}:address"),
                    MapBuilder::new()
                        .attr("location", endpoint.address.clone())
                        .into_value(),
                )
                .into_value(),
        );
    }
    service.into_value()
}
