use thiserror::Error;

/// Errors raised while building or parsing MTOM/XOP multipart messages
/// (§4.2).
#[derive(Debug, Clone, Error)]
pub enum MimeError {
    #[error("Content-Type is not multipart/related")]
    NotMultipartRelated,
    #[error("Content-Type is missing a boundary parameter")]
    MissingBoundary,
    #[error("malformed multipart body: {0}")]
    MalformedBody(String),
}
