//! The Dynamic Client (§6 "Client API"): fetches a WSDL, analyzes it into a
//! [`ServiceModel`], and drives calls against it over a real HTTP transport.

use std::time::Duration;

use thiserror::Error;

use crate::dispatcher::{self, CallOptions, CallOutcome, HttpRequest, HttpResponse, ParamValue, Transport, TransportIoError};
use crate::envelope::SoapVersion;
use crate::security;
use crate::wsdl::{self, AnalysisError, SchemaFetcher, ServiceModel};
use crate::xml::tree::Value;

/// Failure modes specific to constructing a [`DynamicClient`] (§7
/// `AnalysisError` plus the network fetch it wraps).
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to fetch WSDL from `{url}`: {reason}")]
    Fetch { url: String, reason: String },
    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

/// Basic credentials applied as a WS-Security UsernameToken header on every
/// call, unless the caller's per-call options already carry a Security
/// header of their own.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Options recognized by [`DynamicClient::new`] (§6 `new(wsdl_url, opts)`).
#[derive(Debug, Clone, Default)]
pub struct ClientOptions {
    pub timeout_ms: Option<u64>,
    pub soap_version: Option<SoapVersion>,
    pub headers: Vec<(String, String)>,
    pub auth: Option<Credentials>,
}

/// Summary of one operation, as returned by `list_operations`/
/// `get_operation_info` (§6).
#[derive(Debug, Clone)]
pub struct OperationInfo {
    pub name: String,
    pub documentation: String,
    pub input: Vec<(String, String)>,
    pub output: Vec<(String, String)>,
    pub soap_action: String,
}

/// Summary of the whole service, as returned by `get_service_info` (§6).
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    pub service_name: String,
    pub target_namespace: String,
    pub endpoints: Vec<String>,
    pub operations: Vec<String>,
}

/// A dynamic, WSDL-driven SOAP client (§6 "Client API").
pub struct DynamicClient {
    model: ServiceModel,
    transport: ReqwestTransport,
    default_timeout_ms: Option<u64>,
    default_soap_version: Option<SoapVersion>,
    auth: Option<Credentials>,
}

impl DynamicClient {
    /// Fetches `wsdl_url` and analyzes it into a [`ServiceModel`], resolving
    /// `xsd:import`/`xsd:include` transitively over the same HTTP client
    /// (§4.5).
    pub fn new(wsdl_url: &str, opts: ClientOptions) -> Result<Self, ClientError> {
        let http = build_blocking_client(opts.timeout_ms);
        let body = http
            .get(wsdl_url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map_err(|e| ClientError::Fetch {
                url: wsdl_url.to_string(),
                reason: e.to_string(),
            })?;

        let fetcher = ReqwestFetcher { http: http.clone() };
        let model = wsdl::analyze_with_fetcher(&body, wsdl_url, &fetcher)?;

        Ok(DynamicClient {
            model,
            transport: ReqwestTransport {
                http,
                default_headers: opts.headers.clone(),
            },
            default_timeout_ms: opts.timeout_ms,
            default_soap_version: opts.soap_version,
            auth: opts.auth,
        })
    }

    pub fn list_operations(&self) -> Vec<OperationInfo> {
        self.model
            .operations
            .iter()
            .map(|op| OperationInfo {
                name: op.name.clone(),
                documentation: String::new(),
                input: op
                    .input
                    .iter()
                    .map(|(n, p)| (n.to_string(), p.type_ref.clone()))
                    .collect(),
                output: op
                    .output
                    .iter()
                    .map(|(n, p)| (n.to_string(), p.type_ref.clone()))
                    .collect(),
                soap_action: op.soap_action.clone(),
            })
            .collect()
    }

    pub fn get_operation_info(&self, name: &str) -> Option<OperationInfo> {
        self.list_operations().into_iter().find(|op| op.name == name)
    }

    pub fn get_service_info(&self) -> ServiceInfo {
        ServiceInfo {
            service_name: self.model.service_name.clone(),
            target_namespace: self.model.target_namespace.clone(),
            endpoints: self.model.endpoints.iter().map(|e| e.address.clone()).collect(),
            operations: self.model.operations.iter().map(|op| op.name.clone()).collect(),
        }
    }

    /// Calls `name` with `params`, folding this client's defaults under the
    /// per-call `opts` (§6 `call`).
    pub fn call(
        &self,
        name: &str,
        params: &ParamValue,
        opts: &CallOptions,
    ) -> Result<Value, CallOutcome> {
        let mut merged = opts.clone();
        if merged.soap_version.is_none() {
            merged.soap_version = self.default_soap_version;
        }
        if merged.timeout_ms.is_none() {
            merged.timeout_ms = self.default_timeout_ms;
        }

        let mut headers: Vec<Value> = Vec::new();
        if let Some(auth) = &self.auth {
            if merged
                .headers
                .iter()
                .all(|h| h.child_by_local_name("Security").is_none())
            {
                headers.push(security::username_token(
                    &auth.username,
                    &auth.password,
                    &security::UsernameTokenOptions::default(),
                ));
            }
        }
        headers.extend(merged.headers.clone());
        merged.headers = headers;

        dispatcher::call(&self.model, name, params, &merged, &self.transport)
    }

    /// A human-readable summary of the service, suitable for printing from
    /// the CLI demo (§6 `generate_service_report`).
    pub fn generate_service_report(&self) -> String {
        let info = self.get_service_info();
        let mut report = format!(
            "Service: {}\nNamespace: {}\nEndpoints: {}\n\nOperations:\n",
            info.service_name,
            info.target_namespace,
            info.endpoints.join(", "),
        );
        for op in self.list_operations() {
            let input = op
                .input
                .iter()
                .map(|(n, t)| format!("{n}: {t}"))
                .collect::<Vec<_>>()
                .join(", ");
            let output = op
                .output
                .iter()
                .map(|(n, t)| format!("{n}: {t}"))
                .collect::<Vec<_>>()
                .join(", ");
            report.push_str(&format!(
                "  {}({input}) -> ({output})  [soapAction: {}]\n",
                op.name, op.soap_action
            ));
        }
        report
    }
}

fn build_blocking_client(timeout_ms: Option<u64>) -> reqwest::blocking::Client {
    let mut builder = reqwest::blocking::Client::builder();
    if let Some(ms) = timeout_ms {
        builder = builder.timeout(Duration::from_millis(ms));
    }
    builder.build().expect("reqwest client configuration is valid")
}

struct ReqwestFetcher {
    http: reqwest::blocking::Client,
}

impl SchemaFetcher for ReqwestFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, AnalysisError> {
        self.http
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .and_then(|r| r.bytes())
            .map(|b| b.to_vec())
            .map_err(|e| AnalysisError::MalformedXml {
                offset: 0,
                reason: format!("failed to fetch import `{url}`: {e}"),
            })
    }
}

/// The `client` feature's [`Transport`] implementation, over a blocking
/// `reqwest` client so the dispatcher's synchronous call path needs no
/// async runtime of its own.
struct ReqwestTransport {
    http: reqwest::blocking::Client,
    default_headers: Vec<(String, String)>,
}

impl Transport for ReqwestTransport {
    fn post(&self, request: HttpRequest, timeout_ms: Option<u64>) -> Result<HttpResponse, TransportIoError> {
        let mut builder = self.http.post(&request.url).body(request.body);
        for (name, value) in &self.default_headers {
            builder = builder.header(name, value);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(ms) = timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }

        let response = builder.send().map_err(|e| {
            if e.is_timeout() {
                TransportIoError::timeout()
            } else {
                TransportIoError::new(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
            .collect();
        let body = response
            .bytes()
            .map_err(|e| TransportIoError::new(e.to_string()))?
            .to_vec();

        Ok(HttpResponse { status, headers, body })
    }
}
