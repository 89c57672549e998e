//! The axum-backed SOAP host (§6 "Server"): a single route that dispatches
//! POST bodies to registered operations and serves the generated WSDL on
//! GET `?wsdl`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;

use crate::envelope::{self, BuildOptions, SoapVersion};
use crate::fault::{self, Fault};
use crate::wsdl;
use crate::xml::serialize;
use crate::xml::tree::{local_name_of, Map, Value};

use super::registry::ServiceRegistry;

#[derive(Clone)]
struct ServerState {
    registry: Arc<ServiceRegistry>,
    base_url: String,
}

/// Builds the router for one SOAP endpoint mounted at `path`. `base_url` is
/// the address this server is reachable at, embedded into the WSDL it
/// serves (§4.8 `service/port/soap:address`).
pub fn router(registry: Arc<ServiceRegistry>, path: &str, base_url: impl Into<String>) -> Router {
    let state = ServerState {
        registry,
        base_url: base_url.into(),
    };
    Router::new()
        .route(path, post(handle_call).get(handle_wsdl))
        .with_state(state)
}

async fn handle_wsdl(
    State(state): State<ServerState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if !query.contains_key("wsdl") {
        return StatusCode::NOT_FOUND.into_response();
    }
    let model = state.registry.to_service_model(state.base_url.clone());
    let xml = wsdl::emit(&model);
    (StatusCode::OK, [("Content-Type", "text/xml; charset=utf-8")], xml).into_response()
}

async fn handle_call(State(state): State<ServerState>, headers: HeaderMap, body: Bytes) -> Response {
    let registry = &state.registry;
    let content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let envelope_body = if content_type.to_ascii_lowercase().starts_with("multipart/related") {
        match crate::mime::parse_multipart(content_type, &body) {
            Ok((root, _parts)) => root,
            Err(e) => return malformed_response(registry.soap_version, &e.to_string()),
        }
    } else {
        body.to_vec()
    };

    let parsed = match envelope::parse(&envelope_body) {
        Ok(parsed) => parsed,
        Err(e) => return malformed_response(registry.soap_version, &e.reason),
    };
    let version = envelope::detect_version(&parsed);

    let body_map = match parsed.body.as_map() {
        Some(map) if !map.is_empty() => map,
        _ => return malformed_response(version, "request body carries no operation element"),
    };
    let (op_key, op_value) = body_map.iter().next().expect("checked non-empty above");
    let op_name = local_name_of(op_key).to_string();

    tracing::info!(operation = %op_name, %version, "handling SOAP request");

    let operation = match registry.find(&op_name) {
        Some(op) => op,
        None => {
            tracing::warn!(operation = %op_name, "unknown operation requested");
            return fault_response(
                version,
                Fault::new("Client", format!("unknown operation `{op_name}`")),
            )
        }
    };

    let mut params = HashMap::new();
    if let Some(input_map) = op_value.as_map() {
        for (key, value) in input_map.iter() {
            params.insert(local_name_of(key).to_string(), value.clone());
        }
    }
    for param in &operation.input_params {
        if param.required && !params.contains_key(&param.name) {
            return fault_response(
                version,
                Fault::new(
                    "Client",
                    format!("missing required input part `{}`", param.name),
                ),
            );
        }
    }

    let handler = operation.handler.clone();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| handler.invoke(params)))
        .unwrap_or_else(|payload| {
            let message = panic_message(&payload);
            tracing::error!(operation = %op_name, %message, "operation handler panicked");
            Err(Fault::new("Server", message))
        });

    match outcome {
        Ok(outputs) => {
            let mut output_map = Map::new();
            for (key, value) in outputs {
                output_map.insert(key, value);
            }
            let build_opts = BuildOptions {
                version,
                namespace: registry.target_namespace.clone(),
                headers: Vec::new(),
                soap_action: Some(operation.soap_action.clone()),
            };
            match envelope::build(
                &format!("{op_name}Response"),
                &Value::Map(output_map),
                &build_opts,
            ) {
                Ok(xml) => (
                    StatusCode::OK,
                    [("Content-Type", version.content_type(""))],
                    xml,
                )
                    .into_response(),
                Err(e) => malformed_response(version, &e.to_string()),
            }
        }
        Err(soap_fault) => fault_response(version, soap_fault),
    }
}

/// Builds a bare `soap:Fault` envelope: unlike [`envelope::build`], the
/// fault goes directly under `soap:Body` rather than inside an operation
/// element (§4.9).
fn build_fault_envelope(version: SoapVersion, soap_fault: &Fault) -> Vec<u8> {
    let fault_tree = fault::emit(soap_fault, version);
    let mut body_map = Map::new();
    body_map.insert("soap:Fault", fault_tree);
    let mut envelope = Map::new();
    envelope.insert("@xmlns:soap", Value::text(version.namespace_uri()));
    envelope.insert("soap:Body", Value::Map(body_map));
    let mut root = Map::new();
    root.insert("soap:Envelope", Value::Map(envelope));
    serialize::serialize(&Value::Map(root))
}

fn fault_response(version: SoapVersion, soap_fault: Fault) -> Response {
    let xml = build_fault_envelope(version, &soap_fault);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        [("Content-Type", version.content_type(""))],
        xml,
    )
        .into_response()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "operation handler panicked".to_string()
    }
}

fn malformed_response(version: SoapVersion, reason: &str) -> Response {
    let soap_fault = Fault::new("Client", format!("malformed request: {reason}"));
    let xml = build_fault_envelope(version, &soap_fault);
    (
        StatusCode::BAD_REQUEST,
        [("Content-Type", version.content_type(""))],
        xml,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::registry::{soap_fault, OperationSpec, ParamSpec};
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn calculator_registry() -> Arc<ServiceRegistry> {
        let add = OperationSpec::new(
            "Add",
            Arc::new(|params: HashMap<String, Value>| {
                let a: f64 = params
                    .get("a")
                    .and_then(|v| v.as_text())
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| soap_fault("Client", "missing a"))?;
                let b: f64 = params
                    .get("b")
                    .and_then(|v| v.as_text())
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| soap_fault("Client", "missing b"))?;
                let mut out = HashMap::new();
                out.insert("result".to_string(), Value::text((a + b).to_string()));
                Ok(out)
            }),
        )
        .input(ParamSpec::new("a", "xsd:decimal", true))
        .input(ParamSpec::new("b", "xsd:decimal", true))
        .output(ParamSpec::new("result", "xsd:decimal", true))
        .soap_action("urn:calc#Add");

        Arc::new(
            ServiceRegistry::new("CalculatorService", "urn:calc", SoapVersion::V1_1)
                .register(add),
        )
    }

    fn request_envelope(a: &str, b: &str) -> Vec<u8> {
        format!(
            r#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
              <soap:Body>
                <tns:Add xmlns:tns="urn:calc"><a>{a}</a><b>{b}</b></tns:Add>
              </soap:Body>
            </soap:Envelope>"#
        )
        .into_bytes()
    }

    #[tokio::test]
    async fn successful_call_returns_200_with_response_envelope() {
        let app = router(calculator_registry(), "/calc", "http://example.com/calc");
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/calc")
                    .header("content-type", "text/xml")
                    .body(Body::from(request_envelope("10", "5")))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("AddResponse"));
        assert!(text.contains("15"));
    }

    #[tokio::test]
    async fn unknown_operation_returns_fault_with_500() {
        let app = router(calculator_registry(), "/calc", "http://example.com/calc");
        let envelope = br#"<soap:Envelope xmlns:soap="http://schemas.xmlsoap.org/soap/envelope/">
          <soap:Body><tns:Subtract xmlns:tns="urn:calc"><a>1</a></tns:Subtract></soap:Body>
        </soap:Envelope>"#;
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/calc")
                    .header("content-type", "text/xml")
                    .body(Body::from(envelope.to_vec()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn malformed_body_returns_400() {
        let app = router(calculator_registry(), "/calc", "http://example.com/calc");
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/calc")
                    .header("content-type", "text/xml")
                    .body(Body::from("not xml at all"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wsdl_is_served_on_get_with_wsdl_query() {
        let app = router(calculator_registry(), "/calc", "http://example.com/calc");
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/calc?wsdl")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("CalculatorService"));
    }

    #[tokio::test]
    async fn get_without_wsdl_query_is_not_found() {
        let app = router(calculator_registry(), "/calc", "http://example.com/calc");
        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/calc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
