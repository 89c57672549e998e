use thiserror::Error;

/// WSDL analysis failures (§7): the document is malformed XML, or it lacks
/// a section the analyzer requires to build a [`super::ServiceModel`].
#[derive(Debug, Clone, Error)]
pub enum AnalysisError {
    #[error("malformed WSDL XML at offset {offset}: {reason}")]
    MalformedXml { offset: usize, reason: String },
    #[error("WSDL is missing required section `{kind}`: {detail}")]
    MissingSection { kind: String, detail: String },
}
