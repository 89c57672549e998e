//! The declarative SOAP service host (§6 "Server"): register operations
//! against a [`registry::ServiceRegistry`], then mount [`router::router`]
//! into an axum app.

pub mod registry;
pub mod router;

pub use registry::{soap_fault, Handler, OperationSpec, ParamSpec, ServiceRegistry};
pub use router::router;
