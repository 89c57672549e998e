//! Parses an MTOM/XOP `multipart/related` message back into its root XML
//! payload and attachment parts (§4.2). The inverse of [`super::build`];
//! `build` followed by `parse` reproduces each attachment's bytes exactly.

use std::collections::HashMap;

use super::attachment::Attachment;
use super::boundary::extract_boundary;
use super::error::MimeError;

/// One non-root part of a parsed multipart message.
#[derive(Debug, Clone)]
pub struct Part {
    pub headers: HashMap<String, String>,
    pub content: Vec<u8>,
}

impl Part {
    fn content_id(&self) -> Option<String> {
        self.headers
            .get("content-id")
            .map(|v| v.trim_start_matches('<').trim_end_matches('>').to_string())
    }

    /// Converts this part into an [`Attachment`], preserving its
    /// Content-Type, Content-Transfer-Encoding, and Content-ID.
    pub fn into_attachment(self) -> Attachment {
        let content_type = self
            .headers
            .get("content-type")
            .cloned()
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let content_transfer_encoding = self
            .headers
            .get("content-transfer-encoding")
            .cloned()
            .unwrap_or_else(|| "binary".to_string());
        let content_id = self.content_id();
        let size = self.content.len();
        Attachment {
            content_id,
            content_type,
            content_transfer_encoding,
            data: self.content,
            size,
        }
    }
}

/// Splits a `multipart/related` body into the root part's raw bytes and the
/// remaining attachment parts, using the boundary declared in
/// `content_type`.
pub fn parse_multipart(content_type: &str, body: &[u8]) -> Result<(Vec<u8>, Vec<Part>), MimeError> {
    let boundary = extract_boundary(content_type)?;
    let marker = format!("--{boundary}").into_bytes();
    let positions = find_line_starts(body, &marker);

    if positions.is_empty() {
        return Err(MimeError::MalformedBody("no boundary delimiter found".to_string()));
    }

    let mut raw_parts = Vec::new();
    for (i, &pos) in positions.iter().enumerate() {
        let after_marker = pos + marker.len();
        if body.get(after_marker..after_marker + 2) == Some(b"--") {
            break;
        }
        if body.get(after_marker..after_marker + 2) != Some(b"\r\n") {
            return Err(MimeError::MalformedBody(
                "boundary delimiter line is not CRLF-terminated".to_string(),
            ));
        }
        let content_start = after_marker + 2;
        let next_pos = positions.get(i + 1).copied().ok_or_else(|| {
            MimeError::MalformedBody("missing terminating boundary".to_string())
        })?;
        let content_end = next_pos.saturating_sub(2);
        if content_end < content_start {
            return Err(MimeError::MalformedBody("truncated part".to_string()));
        }
        raw_parts.push(&body[content_start..content_end]);
    }

    if raw_parts.is_empty() {
        return Err(MimeError::MalformedBody("multipart message has no parts".to_string()));
    }

    let mut parts = raw_parts.into_iter().map(split_part);
    let (_, root_content) = parts.next().expect("checked non-empty above");
    let attachments = parts
        .map(|(headers, content)| Part {
            headers,
            content: content.to_vec(),
        })
        .collect();

    Ok((root_content.to_vec(), attachments))
}

fn split_part(raw: &[u8]) -> (HashMap<String, String>, &[u8]) {
    match find_subslice(raw, b"\r\n\r\n") {
        Some(pos) => (parse_headers(&raw[..pos]), &raw[pos + 4..]),
        None => (HashMap::new(), raw),
    }
}

/// Parses a block of `\r\n`-separated `Name: value` header lines, folding
/// continuation lines that begin with whitespace into the previous value.
pub fn parse_headers(block: &[u8]) -> HashMap<String, String> {
    let text = String::from_utf8_lossy(block);
    let mut headers = HashMap::new();
    let mut current_key: Option<String> = None;
    for line in text.split("\r\n") {
        if line.is_empty() {
            continue;
        }
        if (line.starts_with(' ') || line.starts_with('\t')) && current_key.is_some() {
            let key = current_key.clone().expect("checked is_some above");
            let entry = headers.entry(key).or_insert_with(String::new);
            entry.push(' ');
            entry.push_str(line.trim());
        } else if let Some((name, value)) = line.split_once(':') {
            let name_lower = name.trim().to_ascii_lowercase();
            headers.insert(name_lower.clone(), value.trim().to_string());
            current_key = Some(name_lower);
        }
    }
    headers
}

fn find_line_starts(body: &[u8], marker: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut i = 0;
    while i + marker.len() <= body.len() {
        if &body[i..i + marker.len()] == marker {
            let at_start = i == 0;
            let preceded_by_crlf = i >= 2 && &body[i - 2..i] == b"\r\n";
            if at_start || preceded_by_crlf {
                positions.push(i);
                i += marker.len();
                continue;
            }
        }
        i += 1;
    }
    positions
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::super::attachment::Attachment;
    use super::super::build::build;
    use super::*;

    #[test]
    fn round_trips_root_and_attachment_bytes() {
        let original_root = b"<soap:Envelope><soap:Body/></soap:Envelope>";
        let original_data = vec![0xDE, 0xAD, 0xBE, 0xEF, 0x00, 0xFF];
        let attachment = Attachment::new(original_data.clone(), "application/octet-stream");
        let (content_type, body) = build(original_root, &[attachment]);

        let (root, attachments) = parse_multipart(&content_type, &body).unwrap();
        assert_eq!(root, original_root);
        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].content, original_data);
    }

    #[test]
    fn recovers_content_id_and_type_on_attachment() {
        let attachment =
            Attachment::new(vec![1, 2, 3], "image/png").with_content_id("pic@example.com");
        let (content_type, body) = build(b"<root/>", &[attachment]);
        let (_, attachments) = parse_multipart(&content_type, &body).unwrap();
        let recovered = attachments.into_iter().next().unwrap().into_attachment();
        assert_eq!(recovered.content_id.as_deref(), Some("pic@example.com"));
        assert_eq!(recovered.content_type, "image/png");
        assert_eq!(recovered.content_transfer_encoding, "binary");
    }

    #[test]
    fn folds_continuation_header_lines() {
        let block = b"Content-Type: application/xop+xml;\r\n type=\"text/xml\"";
        let headers = parse_headers(block);
        assert_eq!(
            headers.get("content-type").unwrap(),
            "application/xop+xml; type=\"text/xml\""
        );
    }

    #[test]
    fn rejects_body_without_boundary_delimiter() {
        let err = parse_multipart(
            "multipart/related; boundary=\"zzz\"",
            b"no boundary markers here",
        )
        .unwrap_err();
        assert!(matches!(err, MimeError::MalformedBody(_)));
    }

    #[test]
    fn handles_multiple_attachments_in_order() {
        let a1 = Attachment::new(vec![1, 1], "application/octet-stream");
        let a2 = Attachment::new(vec![2, 2, 2], "application/octet-stream");
        let (content_type, body) = build(b"<root/>", &[a1, a2]);
        let (_, attachments) = parse_multipart(&content_type, &body).unwrap();
        assert_eq!(attachments.len(), 2);
        assert_eq!(attachments[0].content, vec![1, 1]);
        assert_eq!(attachments[1].content, vec![2, 2, 2]);
    }
}
