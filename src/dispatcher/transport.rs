//! The HTTP transport seam. The dispatcher never speaks HTTP itself (§1
//! "deliberately out of scope"); it drives this trait, which the `client`
//! feature implements over `reqwest`.

/// A request the dispatcher hands to a transport.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

/// A transport's response, post-body-read.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A transport failure distinct from an HTTP error status (§7
/// `TransportError{io}`). `is_timeout` distinguishes the elapsed-timeout
/// case (§5 "Cancellation") from any other I/O failure.
#[derive(Debug, Clone)]
pub struct TransportIoError {
    pub message: String,
    pub is_timeout: bool,
}

impl TransportIoError {
    pub fn new(message: impl Into<String>) -> Self {
        TransportIoError {
            message: message.into(),
            is_timeout: false,
        }
    }

    pub fn timeout() -> Self {
        TransportIoError {
            message: "request timed out".to_string(),
            is_timeout: true,
        }
    }
}

impl std::fmt::Display for TransportIoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "transport I/O error: {}", self.message)
    }
}

impl std::error::Error for TransportIoError {}

/// Anything that can POST a request and return a response, synchronously
/// from the dispatcher's point of view (§5 "the HTTP POST during `call`"
/// is the only blocking point this trait models).
pub trait Transport {
    fn post(&self, request: HttpRequest, timeout_ms: Option<u64>) -> Result<HttpResponse, TransportIoError>;
}
