//! Builds an MTOM/XOP `multipart/related` message from a root XML payload
//! and a set of binary attachments (§4.2).

use uuid::Uuid;

use super::attachment::Attachment;
use super::boundary::generate_boundary;

const CRLF: &str = "\r\n";

/// Assembles the full multipart body and its matching `Content-Type`
/// header. Attachments without an explicit `content_id` are assigned one
/// of the form `attachment-N@<build-id>`, `N` a counter local to this
/// build call starting at 1.
pub fn build(root_xml: &[u8], attachments: &[Attachment]) -> (String, Vec<u8>) {
    let boundary = generate_boundary();
    let build_host = Uuid::new_v4();
    let root_cid = format!("root@{build_host}");

    let mut body = Vec::new();
    write_part_delimiter(&mut body, &boundary);
    write_header(&mut body, "Content-Type", "application/xop+xml; charset=UTF-8; type=\"text/xml\"");
    write_header(&mut body, "Content-Transfer-Encoding", "8bit");
    write_header(&mut body, "Content-ID", &format!("<{root_cid}>"));
    body.extend_from_slice(CRLF.as_bytes());
    body.extend_from_slice(root_xml);
    body.extend_from_slice(CRLF.as_bytes());

    let mut next_attachment = 1usize;
    for attachment in attachments {
        let cid = attachment.content_id.clone().unwrap_or_else(|| {
            let cid = format!("attachment-{next_attachment}@{build_host}");
            next_attachment += 1;
            cid
        });

        write_part_delimiter(&mut body, &boundary);
        write_header(&mut body, "Content-Type", &attachment.content_type);
        write_header(
            &mut body,
            "Content-Transfer-Encoding",
            &attachment.content_transfer_encoding,
        );
        write_header(&mut body, "Content-ID", &format!("<{cid}>"));
        body.extend_from_slice(CRLF.as_bytes());
        body.extend_from_slice(&attachment.data);
        body.extend_from_slice(CRLF.as_bytes());
    }

    body.extend_from_slice(format!("--{boundary}--").as_bytes());

    let content_type = format!(
        "multipart/related; boundary=\"{boundary}\"; type=\"application/xop+xml\"; start=\"<{root_cid}>\"; start-info=\"text/xml\""
    );

    (content_type, body)
}

fn write_part_delimiter(body: &mut Vec<u8>, boundary: &str) {
    body.extend_from_slice(format!("--{boundary}").as_bytes());
    body.extend_from_slice(CRLF.as_bytes());
}

fn write_header(body: &mut Vec<u8>, name: &str, value: &str) {
    body.extend_from_slice(format!("{name}: {value}").as_bytes());
    body.extend_from_slice(CRLF.as_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_carries_boundary_and_start() {
        let (content_type, _) = build(b"<Envelope/>", &[]);
        assert!(content_type.starts_with("multipart/related; boundary=\"uuid:"));
        assert!(content_type.contains("type=\"application/xop+xml\""));
        assert!(content_type.contains("start=\"<root@"));
        assert!(content_type.ends_with("start-info=\"text/xml\""));
    }

    #[test]
    fn body_contains_root_part_and_attachment_part() {
        let attachment = Attachment::new(vec![1, 2, 3, 4], "application/octet-stream");
        let (content_type, body) = build(b"<Envelope/>", &[attachment]);
        let boundary = super::super::boundary::extract_boundary(&content_type).unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains(&format!("--{boundary}")));
        assert!(text.contains("Content-Transfer-Encoding: 8bit"));
        assert!(text.contains("Content-Transfer-Encoding: binary"));
        assert!(body.ends_with(format!("--{boundary}--").as_bytes()));
    }

    #[test]
    fn assigns_sequential_default_content_ids() {
        let a1 = Attachment::new(vec![1], "application/octet-stream");
        let a2 = Attachment::new(vec![2], "application/octet-stream");
        let (_, body) = build(b"<Envelope/>", &[a1, a2]);
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("Content-ID: <attachment-1@"));
        assert!(text.contains("Content-ID: <attachment-2@"));
    }

    #[test]
    fn honors_explicit_content_id() {
        let attachment =
            Attachment::new(vec![9], "application/octet-stream").with_content_id("mine@example.com");
        let (_, body) = build(b"<Envelope/>", &[attachment]);
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("Content-ID: <mine@example.com>"));
    }
}
