//! Declarative SOAP service registration (§6 "Server API"): operations are
//! registered up front with their shape, then dispatched to a handler by
//! name at request time.

use std::collections::HashMap;
use std::sync::Arc;

use crate::envelope::SoapVersion;
use crate::fault::Fault;
use crate::wsdl::model::{Endpoint, Message, MessagePart, Operation, ServiceModel, Style};
use crate::xml::tree::Value;

/// One input or output parameter of a registered operation.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: String,
    pub type_ref: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn new(name: impl Into<String>, type_ref: impl Into<String>, required: bool) -> Self {
        ParamSpec {
            name: name.into(),
            type_ref: type_ref.into(),
            required,
        }
    }
}

/// A handler receives the request's unwrapped parameters by part name and
/// returns either the response's output parameters or a Fault (§6).
pub trait Handler: Send + Sync {
    fn invoke(&self, params: HashMap<String, Value>) -> Result<HashMap<String, Value>, Fault>;
}

impl<F> Handler for F
where
    F: Fn(HashMap<String, Value>) -> Result<HashMap<String, Value>, Fault> + Send + Sync,
{
    fn invoke(&self, params: HashMap<String, Value>) -> Result<HashMap<String, Value>, Fault> {
        self(params)
    }
}

/// A registered operation: its declared shape plus the handler that serves
/// it. Built once at startup and never mutated (§5 "publish an immutable
/// snapshot at registration").
pub struct OperationSpec {
    pub name: String,
    pub description: String,
    pub input_params: Vec<ParamSpec>,
    pub output_params: Vec<ParamSpec>,
    pub soap_action: String,
    pub handler: Arc<dyn Handler>,
}

impl OperationSpec {
    pub fn new(name: impl Into<String>, handler: Arc<dyn Handler>) -> Self {
        let name = name.into();
        OperationSpec {
            soap_action: name.clone(),
            name,
            description: String::new(),
            input_params: Vec::new(),
            output_params: Vec::new(),
            handler,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn input(mut self, param: ParamSpec) -> Self {
        self.input_params.push(param);
        self
    }

    pub fn output(mut self, param: ParamSpec) -> Self {
        self.output_params.push(param);
        self
    }

    pub fn soap_action(mut self, soap_action: impl Into<String>) -> Self {
        self.soap_action = soap_action.into();
        self
    }
}

/// Builds a [`Fault`] the way a handler constructs one to reject a call
/// (§6 `soap_fault(code, reason)`).
pub fn soap_fault(code: impl Into<String>, reason: impl Into<String>) -> Fault {
    Fault::new(code, reason)
}

/// The service's frozen set of registered operations (§5 "immutable
/// snapshot").
pub struct ServiceRegistry {
    pub service_name: String,
    pub target_namespace: String,
    pub soap_version: SoapVersion,
    pub operations: Vec<OperationSpec>,
}

impl ServiceRegistry {
    pub fn new(
        service_name: impl Into<String>,
        target_namespace: impl Into<String>,
        soap_version: SoapVersion,
    ) -> Self {
        ServiceRegistry {
            service_name: service_name.into(),
            target_namespace: target_namespace.into(),
            soap_version,
            operations: Vec::new(),
        }
    }

    pub fn register(mut self, operation: OperationSpec) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn find(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.iter().find(|op| op.name == name)
    }

    /// Builds the [`ServiceModel`] the WSDL Generator needs to describe this
    /// registry, binding it to `address` (the server's own base URL, only
    /// known at serve time).
    pub fn to_service_model(&self, address: impl Into<String>) -> ServiceModel {
        let binding_ref = format!("{}Binding", self.service_name);
        let operations = self
            .operations
            .iter()
            .map(|op| Operation {
                name: op.name.clone(),
                soap_action: op.soap_action.clone(),
                style: Style::Document,
                input: params_to_message(&op.input_params),
                output: params_to_message(&op.output_params),
                faults: Vec::new(),
                binding_ref: binding_ref.clone(),
            })
            .collect();

        ServiceModel {
            target_namespace: self.target_namespace.clone(),
            service_name: self.service_name.clone(),
            endpoints: vec![Endpoint {
                address: address.into(),
                binding_ref,
                transport: "http://schemas.xmlsoap.org/soap/http".to_string(),
                soap_version: self.soap_version,
            }],
            operations,
            types: Vec::new(),
        }
    }
}

fn params_to_message(params: &[ParamSpec]) -> Message {
    let mut message = Message::new();
    for param in params {
        message.0.push((
            param.name.clone(),
            MessagePart {
                type_ref: param.type_ref.clone(),
                required: param.required,
            },
        ));
    }
    message
}
