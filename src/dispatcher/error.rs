use thiserror::Error;

use crate::fault::Fault;

/// The dispatcher's error taxonomy (§7), distinct kinds rather than a
/// shared hierarchy.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    #[error("operation `{0}` not found")]
    OperationNotFound(String),
    #[error("validation failed for part `{part}`: {reason}")]
    ValidationError { part: String, reason: String },
    #[error("failed to build request: {0}")]
    BuildError(String),
    #[error("transport returned HTTP {status}")]
    TransportStatus { status: u16 },
    #[error("transport I/O error: {0}")]
    TransportIo(String),
    #[error("response could not be parsed: {0}")]
    ParseError(String),
    #[error("call timed out")]
    Timeout,
}

/// The three-way result a call can settle into: a normal result is the
/// `Ok` of [`super::call`]'s `Result`; this type distinguishes a peer
/// Fault from a local/transport error on the `Err` side (§6 `{:fault,
/// Fault} | {:error, ...}`).
#[derive(Debug, Clone)]
pub enum CallOutcome {
    Fault(Fault),
    Error(CallError),
}

impl From<CallError> for CallOutcome {
    fn from(err: CallError) -> Self {
        CallOutcome::Error(err)
    }
}

impl From<Fault> for CallOutcome {
    fn from(fault: Fault) -> Self {
        CallOutcome::Fault(fault)
    }
}

impl std::fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallOutcome::Fault(fault) => write!(f, "{fault}"),
            CallOutcome::Error(err) => write!(f, "{err}"),
        }
    }
}
