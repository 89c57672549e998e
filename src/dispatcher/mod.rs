//! The Operation Dispatcher (§4.6): for a given operation, validate
//! parameters, build the request (envelope or MTOM), dispatch it through a
//! [`Transport`], and unwrap the response to a result tree or Fault.

pub mod dispatch;
pub mod error;
pub mod params;
pub mod transport;

pub use dispatch::{call, estimate_message_size, CallOptions};
pub use error::{CallError, CallOutcome};
pub use params::{AttachmentParam, ParamValue, Primitive};
pub use transport::{HttpRequest, HttpResponse, Transport, TransportIoError};
