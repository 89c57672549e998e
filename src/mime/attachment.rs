/// A binary attachment carried alongside an MTOM/XOP message (§3 Data
/// Model). `size` is always `data.len()`; the constructors enforce this
/// rather than trusting a caller-supplied value.
#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub content_id: Option<String>,
    pub content_type: String,
    pub content_transfer_encoding: String,
    pub data: Vec<u8>,
    pub size: usize,
}

impl Attachment {
    /// Creates an attachment with no explicit `content_id`; the MIME
    /// Engine assigns one at build time following the `attachment-N@host`
    /// convention (§4.2).
    pub fn new(data: Vec<u8>, content_type: impl Into<String>) -> Self {
        let size = data.len();
        Attachment {
            content_id: None,
            content_type: content_type.into(),
            content_transfer_encoding: "binary".to_string(),
            data,
            size,
        }
    }

    pub fn with_content_id(mut self, content_id: impl Into<String>) -> Self {
        self.content_id = Some(content_id.into());
        self
    }
}
