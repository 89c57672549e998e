//! The Operation Dispatcher (§4.6): the end-to-end call path from a
//! [`ServiceModel`] and parameters to a result tree or a distinguished
//! Fault.

use crate::envelope::{self, BuildOptions, SoapVersion};
use crate::mime;
use crate::wsdl::ServiceModel;
use crate::xml::tree::Value;

use super::error::{CallError, CallOutcome};
use super::params::{contains_attachment, extract_attachments, ParamValue};
use super::transport::{HttpRequest, Transport};

/// Per-call options (§6 `call` opts).
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub soap_version: Option<SoapVersion>,
    pub headers: Vec<Value>,
    pub timeout_ms: Option<u64>,
}

/// Runs `op_name` end-to-end against `model`: validates `params`, builds
/// the request (plain envelope or MTOM), POSTs it via `transport`, and
/// returns the unwrapped result tree or a [`CallOutcome`].
pub fn call(
    model: &ServiceModel,
    op_name: &str,
    params: &ParamValue,
    opts: &CallOptions,
    transport: &dyn Transport,
) -> Result<Value, CallOutcome> {
    let call_id = uuid::Uuid::new_v4();
    let version = opts
        .soap_version
        .or(model.endpoints.first().map(|e| e.soap_version))
        .unwrap_or(SoapVersion::V1_1);
    let span = tracing::info_span!("soap_call", %call_id, operation = op_name, soap_version = %version);
    let _enter = span.enter();
    tracing::info!("starting call");

    let result = call_inner(model, op_name, params, opts, transport);
    match &result {
        Ok(_) => tracing::info!("call succeeded"),
        Err(CallOutcome::Fault(fault)) => tracing::warn!(code = %fault.code, "call returned a fault"),
        Err(CallOutcome::Error(err)) => tracing::error!(%err, "call failed"),
    }
    result
}

fn call_inner(
    model: &ServiceModel,
    op_name: &str,
    params: &ParamValue,
    opts: &CallOptions,
    transport: &dyn Transport,
) -> Result<Value, CallOutcome> {
    let operation = model
        .find_operation(op_name)
        .ok_or_else(|| CallError::OperationNotFound(op_name.to_string()))?;

    for (part_name, part) in operation.input.iter() {
        if part.required && params.get(part_name).is_none() {
            return Err(CallError::ValidationError {
                part: part_name.to_string(),
                reason: "required input part missing".to_string(),
            }
            .into());
        }
    }

    let version = opts
        .soap_version
        .or(model.endpoints.first().map(|e| e.soap_version))
        .unwrap_or(SoapVersion::V1_1);
    let endpoint = model
        .endpoints
        .iter()
        .find(|e| e.binding_ref == operation.binding_ref)
        .or_else(|| model.endpoints.first())
        .ok_or_else(|| CallError::BuildError("ServiceModel has no endpoints".to_string()))?;

    let mut attachments = Vec::new();
    let has_attachments = contains_attachment(params);
    let body_tree = extract_attachments(params, &mut attachments);

    let build_opts = BuildOptions {
        version,
        namespace: model.target_namespace.clone(),
        headers: opts.headers.clone(),
        soap_action: Some(operation.soap_action.clone()),
    };
    let envelope_bytes = envelope::build(op_name, &body_tree, &build_opts)
        .map_err(|e| CallError::BuildError(e.0))?;

    const ENVELOPE_LOG_THRESHOLD: usize = 4096;
    if envelope_bytes.len() <= ENVELOPE_LOG_THRESHOLD {
        tracing::debug!(envelope = %String::from_utf8_lossy(&envelope_bytes), "built request envelope");
    } else {
        tracing::debug!(envelope_bytes = envelope_bytes.len(), "built request envelope (elided, over threshold)");
    }

    let (content_type, body) = if has_attachments {
        let (mut content_type, body) = mime::build_mtom(&envelope_bytes, &attachments);
        if version == SoapVersion::V1_2 {
            content_type.push_str(&format!("; action=\"{}\"", operation.soap_action));
        }
        (content_type, body)
    } else {
        (version.content_type(&operation.soap_action), envelope_bytes)
    };

    let mut headers = vec![("Content-Type".to_string(), content_type)];
    if version == SoapVersion::V1_1 {
        headers.push((
            "SOAPAction".to_string(),
            format!("\"{}\"", operation.soap_action),
        ));
    }

    let request = HttpRequest {
        url: endpoint.address.clone(),
        headers,
        body,
    };

    let response = transport.post(request, opts.timeout_ms).map_err(|e| {
        if e.is_timeout {
            CallError::Timeout
        } else {
            CallError::TransportIo(e.message)
        }
    })?;

    if response.status != 200 && response.status != 500 {
        return Err(CallError::TransportStatus {
            status: response.status,
        }
        .into());
    }

    let is_multipart = response
        .header("content-type")
        .map(|ct| ct.to_ascii_lowercase().starts_with("multipart/related"))
        .unwrap_or(false);

    let envelope_body = if is_multipart {
        let content_type = response.header("content-type").unwrap_or("").to_string();
        match mime::parse_multipart(&content_type, &response.body) {
            Ok((root, _parts)) => root,
            Err(e) => return Err(transport_or_parse_error(response.status, e.to_string())),
        }
    } else {
        response.body
    };

    // A 500 is parsed speculatively for a Fault before being classified as a
    // transport error: a non-XML error page under load has no Fault to find,
    // so it falls back to TransportStatus rather than surfacing a ParseError.
    let parsed = match envelope::parse(&envelope_body) {
        Ok(parsed) => parsed,
        Err(e) => return Err(transport_or_parse_error(response.status, e.reason)),
    };

    match envelope::unwrap_response(&parsed.body, op_name) {
        Ok(_) if response.status == 500 => Err(CallError::ParseError(
            "HTTP 500 response carried no SOAP Fault".to_string(),
        )
        .into()),
        Ok(value) => Ok(value),
        Err(fault) => Err(CallOutcome::Fault(fault)),
    }
}

/// On a transport 500, a body that fails to parse as XML is classified as
/// `TransportStatus` rather than `ParseError` — a plain-text or HTML error
/// page is a transport failure, not a malformed SOAP response.
fn transport_or_parse_error(status: u16, parse_reason: String) -> CallOutcome {
    if status == 500 {
        CallError::TransportStatus { status }.into()
    } else {
        CallError::ParseError(parse_reason).into()
    }
}

/// A documented lower bound for the request's wire size: the serialized
/// envelope plus every attachment's raw byte count (§9 open question
/// decision — the source's equivalent was unspecified and approximate).
pub fn estimate_message_size(envelope_bytes: &[u8], attachments: &[mime::Attachment]) -> usize {
    envelope_bytes.len() + attachments.iter().map(|a| a.size).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::params::{AttachmentParam, Primitive};
    use crate::dispatcher::transport::{HttpResponse, TransportIoError};
    use crate::wsdl::model::{Endpoint, Message, MessagePart, Operation, Style};
    use std::cell::RefCell;

    struct FakeTransport {
        response: HttpResponse,
        captured: RefCell<Option<HttpRequest>>,
    }

    impl Transport for FakeTransport {
        fn post(
            &self,
            request: HttpRequest,
            _timeout_ms: Option<u64>,
        ) -> Result<HttpResponse, TransportIoError> {
            *self.captured.borrow_mut() = Some(request);
            Ok(self.response.clone())
        }
    }

    fn calculator_model() -> ServiceModel {
        let mut input = Message::new();
        input.0.push((
            "a".to_string(),
            MessagePart {
                type_ref: "xsd:decimal".to_string(),
                required: true,
            },
        ));
        input.0.push((
            "b".to_string(),
            MessagePart {
                type_ref: "xsd:decimal".to_string(),
                required: true,
            },
        ));
        let mut output = Message::new();
        output.0.push((
            "result".to_string(),
            MessagePart {
                type_ref: "xsd:decimal".to_string(),
                required: true,
            },
        ));

        ServiceModel {
            target_namespace: "urn:calc".to_string(),
            service_name: "CalculatorService".to_string(),
            endpoints: vec![Endpoint {
                address: "http://example.com/calc".to_string(),
                binding_ref: "CalculatorBinding".to_string(),
                transport: "http://schemas.xmlsoap.org/soap/http".to_string(),
                soap_version: SoapVersion::V1_1,
            }],
            operations: vec![Operation {
                name: "Add".to_string(),
                soap_action: "urn:calc#Add".to_string(),
                style: Style::Document,
                input,
                output,
                faults: vec![],
                binding_ref: "CalculatorBinding".to_string(),
            }],
            types: vec![],
        }
    }

    fn envelope_response_body() -> Vec<u8> {
        br#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
          <soap:Body>
            <tns:AddResponse xmlns:tns="urn:calc"><result>15</result></tns:AddResponse>
          </soap:Body>
        </soap:Envelope>"#
            .to_vec()
    }

    #[test]
    fn calls_operation_and_unwraps_result() {
        let model = calculator_model();
        let params = ParamValue::tree()
            .with("a", ParamValue::Primitive(Primitive::Decimal(10.0)))
            .with("b", ParamValue::Primitive(Primitive::Decimal(5.0)));
        let transport = FakeTransport {
            response: HttpResponse {
                status: 200,
                headers: vec![("Content-Type".to_string(), "text/xml".to_string())],
                body: envelope_response_body(),
            },
            captured: RefCell::new(None),
        };

        let result = call(&model, "Add", &params, &CallOptions::default(), &transport).unwrap();
        assert_eq!(
            result.child_by_local_name("result").unwrap().as_text(),
            Some("15")
        );

        let captured = transport.captured.borrow();
        let request = captured.as_ref().unwrap();
        assert!(request
            .headers
            .iter()
            .any(|(k, v)| k == "SOAPAction" && v == "\"urn:calc#Add\""));
    }

    #[test]
    fn missing_required_part_is_a_validation_error() {
        let model = calculator_model();
        let params = ParamValue::tree().with("a", ParamValue::text("10"));
        let transport = FakeTransport {
            response: HttpResponse {
                status: 200,
                headers: vec![],
                body: envelope_response_body(),
            },
            captured: RefCell::new(None),
        };
        let err = call(&model, "Add", &params, &CallOptions::default(), &transport).unwrap_err();
        match err {
            CallOutcome::Error(CallError::ValidationError { part, .. }) => assert_eq!(part, "b"),
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[test]
    fn unknown_operation_is_not_found() {
        let model = calculator_model();
        let transport = FakeTransport {
            response: HttpResponse {
                status: 200,
                headers: vec![],
                body: vec![],
            },
            captured: RefCell::new(None),
        };
        let err = call(
            &model,
            "Subtract",
            &ParamValue::tree(),
            &CallOptions::default(),
            &transport,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            CallOutcome::Error(CallError::OperationNotFound(_))
        ));
    }

    #[test]
    fn fault_response_is_surfaced_distinctly() {
        let model = calculator_model();
        let fault_body = br#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
          <soap:Body>
            <soap:Fault>
              <faultcode>Client</faultcode>
              <faultstring>Division by zero</faultstring>
            </soap:Fault>
          </soap:Body>
        </soap:Envelope>"#
            .to_vec();
        let transport = FakeTransport {
            response: HttpResponse {
                status: 500,
                headers: vec![],
                body: fault_body,
            },
            captured: RefCell::new(None),
        };
        let params = ParamValue::tree()
            .with("a", ParamValue::decimal(1.0))
            .with("b", ParamValue::decimal(0.0));
        let err = call(&model, "Add", &params, &CallOptions::default(), &transport).unwrap_err();
        match err {
            CallOutcome::Fault(fault) => {
                assert_eq!(fault.code, "Client");
                assert_eq!(fault.string, "Division by zero");
            }
            other => panic!("expected Fault, got {other:?}"),
        }
    }

    #[test]
    fn non_xml_500_body_is_a_transport_status_error() {
        let model = calculator_model();
        let transport = FakeTransport {
            response: HttpResponse {
                status: 500,
                headers: vec![],
                body: b"<html><body>Internal Server Error</body></html>".to_vec(),
            },
            captured: RefCell::new(None),
        };
        let params = ParamValue::tree()
            .with("a", ParamValue::decimal(1.0))
            .with("b", ParamValue::decimal(0.0));
        let err = call(&model, "Add", &params, &CallOptions::default(), &transport).unwrap_err();
        assert!(matches!(
            err,
            CallOutcome::Error(CallError::TransportStatus { status: 500 })
        ));
    }

    #[test]
    fn attachment_param_builds_mtom_request() {
        let model = calculator_model();
        let params = ParamValue::tree()
            .with("a", ParamValue::decimal(1.0))
            .with(
                "b",
                ParamValue::Attachment(AttachmentParam {
                    bytes: vec![1, 2, 3],
                    content_type: "application/octet-stream".to_string(),
                    content_id: None,
                }),
            );
        let transport = FakeTransport {
            response: HttpResponse {
                status: 200,
                headers: vec![("Content-Type".to_string(), "text/xml".to_string())],
                body: envelope_response_body(),
            },
            captured: RefCell::new(None),
        };
        call(&model, "Add", &params, &CallOptions::default(), &transport).unwrap();
        let captured = transport.captured.borrow();
        let request = captured.as_ref().unwrap();
        let content_type = request
            .headers
            .iter()
            .find(|(k, _)| k == "Content-Type")
            .unwrap()
            .1
            .clone();
        assert!(content_type.starts_with("multipart/related"));
    }
}
