//! The WSDL Analyzer (§4.5) and WSDL Generator (§4.8): WSDL 1.1 documents
//! in and out of a frozen [`ServiceModel`].

pub mod analyzer;
pub mod error;
pub mod generator;
pub mod model;

pub use analyzer::{analyze, analyze_with_fetcher, SchemaFetcher};
pub use error::AnalysisError;
pub use generator::emit;
pub use model::{
    Endpoint, FieldDef, Message, MessagePart, MaxOccurs, Operation, PrimitiveKind, ServiceModel,
    Style, XsdType,
};
