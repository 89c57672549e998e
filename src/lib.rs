//! A dynamic, WSDL-driven SOAP 1.1/1.2 toolkit: a runtime client that
//! discovers operations from a WSDL document at call time, and a
//! declarative service host that serves both a SOAP endpoint and its own
//! WSDL. MTOM/XOP attachments and WS-Security UsernameToken headers are
//! handled by dedicated components rather than bolted onto the envelope
//! codec.

pub mod dispatcher;
pub mod envelope;
pub mod fault;
pub mod mime;
pub mod security;
pub mod wsdl;
pub mod xml;

#[cfg(feature = "client")]
pub mod client;

#[cfg(feature = "server")]
pub mod server;

#[cfg(feature = "config")]
pub mod config;

use thiserror::Error;

/// Aggregates every component error behind one propagation type for call
/// sites that want it (the CLI demo); component APIs keep their own narrow
/// error types (§10.2).
#[derive(Debug, Error)]
pub enum ToolkitError {
    #[error(transparent)]
    Parse(#[from] xml::ParseError),
    #[error(transparent)]
    Analysis(#[from] wsdl::AnalysisError),
    #[error(transparent)]
    Build(#[from] envelope::BuildError),
    #[error(transparent)]
    Mime(#[from] mime::MimeError),
    #[error(transparent)]
    Security(#[from] security::SecurityError),
    #[error(transparent)]
    Call(#[from] dispatcher::CallError),
    #[error(transparent)]
    Fault(fault::Fault),
    #[cfg(feature = "client")]
    #[error(transparent)]
    Client(#[from] client::ClientError),
}

impl From<dispatcher::CallOutcome> for ToolkitError {
    fn from(outcome: dispatcher::CallOutcome) -> Self {
        match outcome {
            dispatcher::CallOutcome::Fault(fault) => ToolkitError::Fault(fault),
            dispatcher::CallOutcome::Error(err) => ToolkitError::Call(err),
        }
    }
}
