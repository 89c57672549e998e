use uuid::Uuid;

use super::error::MimeError;

/// Generates a fresh `multipart/related` boundary string, `uuid:` followed
/// by a v4 UUID (§4.2).
pub fn generate_boundary() -> String {
    format!("uuid:{}", Uuid::new_v4())
}

/// Extracts the `boundary=` parameter from a `Content-Type` header value,
/// accepting both quoted and unquoted forms.
pub fn extract_boundary(content_type: &str) -> Result<String, MimeError> {
    find_param(content_type, "boundary").ok_or(MimeError::MissingBoundary)
}

/// Confirms `content_type` names the `multipart/related` media type and
/// carries a `boundary=` parameter.
pub fn validate_content_type(content_type: &str) -> Result<(), MimeError> {
    let media_type = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    if media_type != "multipart/related" {
        return Err(MimeError::NotMultipartRelated);
    }
    extract_boundary(content_type)?;
    Ok(())
}

/// Finds a `; name=value` or `; name="value"` parameter within a
/// `Content-Type`-style header, case-insensitive on the parameter name.
pub fn find_param(header: &str, name: &str) -> Option<String> {
    for segment in header.split(';').skip(1) {
        let segment = segment.trim();
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        if key.trim().eq_ignore_ascii_case(name) {
            let value = value.trim();
            let unquoted = value
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(value);
            return Some(unquoted.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_carries_uuid_prefix() {
        let boundary = generate_boundary();
        assert!(boundary.starts_with("uuid:"));
        assert_eq!(boundary.len(), "uuid:".len() + 36);
    }

    #[test]
    fn extracts_quoted_and_unquoted_boundary() {
        assert_eq!(
            extract_boundary(r#"multipart/related; boundary="abc123""#).unwrap(),
            "abc123"
        );
        assert_eq!(
            extract_boundary("multipart/related; boundary=abc123").unwrap(),
            "abc123"
        );
    }

    #[test]
    fn validate_rejects_wrong_media_type() {
        let err = validate_content_type(r#"text/xml; boundary="abc""#).unwrap_err();
        assert!(matches!(err, MimeError::NotMultipartRelated));
    }

    #[test]
    fn validate_rejects_missing_boundary() {
        let err = validate_content_type("multipart/related; type=\"application/xop+xml\"").unwrap_err();
        assert!(matches!(err, MimeError::MissingBoundary));
    }

    #[test]
    fn extract_boundary_skips_malformed_segments() {
        assert_eq!(
            extract_boundary(r#"multipart/related; ; boundary="abc123""#).unwrap(),
            "abc123"
        );
        assert_eq!(
            extract_boundary(r#"multipart/related; start-info; boundary="abc123""#).unwrap(),
            "abc123"
        );
    }

    #[test]
    fn validate_accepts_well_formed_header() {
        assert!(validate_content_type(
            r#"multipart/related; boundary="uuid:1"; type="application/xop+xml""#
        )
        .is_ok());
    }
}
