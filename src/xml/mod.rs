//! The XML Codec (§4.1): parses XML documents into the canonical
//! [`tree::Value`] and serializes that value back to XML.

pub mod error;
pub mod parse;
pub mod serialize;
pub mod tree;

pub use error::ParseError;
pub use parse::parse;
pub use serialize::{serialize, serialize_fragment};
pub use tree::{Map, MapBuilder, Value};
