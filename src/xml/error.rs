use thiserror::Error;

/// Error raised by [`crate::xml::parse`] when the input is not well-formed
/// XML, carrying the byte offset at which the underlying reader stopped
/// making progress along with a short human-readable reason.
#[derive(Debug, Clone, Error)]
#[error("XML parse error at offset {offset}: {reason}")]
pub struct ParseError {
    pub offset: usize,
    pub reason: String,
}

impl ParseError {
    pub fn new(offset: usize, reason: impl Into<String>) -> Self {
        ParseError {
            offset,
            reason: reason.into(),
        }
    }
}
