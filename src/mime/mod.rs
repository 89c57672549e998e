//! The MIME Engine (§4.2): builds and parses MTOM/XOP `multipart/related`
//! messages carrying binary attachments alongside a SOAP envelope.

pub mod attachment;
pub mod boundary;
pub mod build;
pub mod error;
pub mod parse;

pub use attachment::Attachment;
pub use boundary::{extract_boundary, generate_boundary, validate_content_type};
pub use build::build as build_mtom;
pub use error::MimeError;
pub use parse::{parse_headers, parse_multipart, Part};
