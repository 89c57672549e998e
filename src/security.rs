//! WS-Security UsernameToken Profile 1.0 (§4.7): header generation for
//! clients and validation for servers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::RngCore;
use sha1::{Digest, Sha1};
use thiserror::Error;
use uuid::Uuid;

use crate::xml::tree::{MapBuilder, Value};

const WSSE_NS: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
const WSU_NS: &str = "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd";
const PASSWORD_TEXT_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";
const PASSWORD_DIGEST_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordDigest";
const ENCODING_TYPE_BASE64: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-soap-message-security-1.0#Base64Binary";

/// The two UsernameToken password forms (§4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PasswordType {
    #[default]
    Text,
    Digest,
}

#[derive(Debug, Clone, Default)]
pub struct UsernameTokenOptions {
    pub password_type: PasswordType,
}

#[derive(Debug, Clone)]
pub struct TimestampOptions {
    pub ttl_seconds: i64,
}

impl Default for TimestampOptions {
    fn default() -> Self {
        TimestampOptions { ttl_seconds: 300 }
    }
}

/// Builds a `<wsse:Security><wsse:UsernameToken>...</wsse:UsernameToken></wsse:Security>`
/// header tree, ready to append to [`crate::envelope::BuildOptions::headers`].
pub fn username_token(user: &str, password: &str, opts: &UsernameTokenOptions) -> Value {
    let created = now_iso8601();
    let token = username_token_element(user, password, opts, &created, None);
    wrap_security(vec![token])
}

/// Builds a standalone `<wsu:Timestamp>` header tree with `Created`/`Expires`
/// `ttl_seconds` apart (default 300s).
pub fn timestamp(opts: &TimestampOptions) -> Value {
    timestamp_element(opts, None)
}

/// Builds a single `<wsse:Security>` header carrying both a UsernameToken
/// and a Timestamp, each tagged with a distinct `wsu:Id`.
pub fn username_token_with_timestamp(
    user: &str,
    password: &str,
    token_opts: &UsernameTokenOptions,
    timestamp_opts: &TimestampOptions,
) -> Value {
    let created = now_iso8601();
    let token_id = format!("UsernameToken-{}", Uuid::new_v4());
    let timestamp_id = format!("Timestamp-{}", Uuid::new_v4());
    let token = username_token_element(user, password, token_opts, &created, Some(&token_id));
    let ts = timestamp_element(timestamp_opts, Some(&timestamp_id));
    wrap_security(vec![token, ts])
}

fn wrap_security(children: Vec<Value>) -> Value {
    let mut builder = MapBuilder::new()
        .attr("xmlns:wsse", WSSE_NS)
        .attr("xmlns:wsu", WSU_NS);
    for child in children {
        if let Value::Map(ref m) = child {
            if let Some((key, _)) = m.iter().find(|(k, _)| !k.starts_with('@')) {
                let key = key.to_string();
                builder = builder.child(key, child);
                continue;
            }
        }
    }
    MapBuilder::new()
        .child("wsse:Security", builder.into_value())
        .into_value()
}

fn username_token_element(
    user: &str,
    password: &str,
    opts: &UsernameTokenOptions,
    created: &str,
    wsu_id: Option<&str>,
) -> Value {
    let mut token = MapBuilder::new();
    if let Some(id) = wsu_id {
        token = token.attr("wsu:Id", id);
    }
    token = token.child("wsse:Username", Value::text(user));

    match opts.password_type {
        PasswordType::Text => {
            token = token.child(
                "wsse:Password",
                MapBuilder::new()
                    .attr("Type", PASSWORD_TEXT_TYPE)
                    .text(password)
                    .into_value(),
            );
        }
        PasswordType::Digest => {
            let (raw_nonce, nonce_b64) = generate_nonce();
            let digest = compute_digest_bytes(&raw_nonce, created, password);
            token = token.child(
                "wsse:Password",
                MapBuilder::new()
                    .attr("Type", PASSWORD_DIGEST_TYPE)
                    .text(digest)
                    .into_value(),
            );
            token = token.child(
                "wsse:Nonce",
                MapBuilder::new()
                    .attr("EncodingType", ENCODING_TYPE_BASE64)
                    .text(nonce_b64)
                    .into_value(),
            );
        }
    }

    token = token.child("wsu:Created", Value::text(created));

    MapBuilder::new()
        .child("wsse:UsernameToken", token.into_value())
        .into_value()
}

fn timestamp_element(opts: &TimestampOptions, wsu_id: Option<&str>) -> Value {
    let created_dt = Utc::now();
    let expires_dt = created_dt + Duration::seconds(opts.ttl_seconds);
    let created = created_dt.to_rfc3339_opts(SecondsFormat::Secs, true);
    let expires = expires_dt.to_rfc3339_opts(SecondsFormat::Secs, true);

    let mut timestamp = MapBuilder::new();
    if let Some(id) = wsu_id {
        timestamp = timestamp.attr("wsu:Id", id);
    }
    timestamp = timestamp
        .child("wsu:Created", Value::text(created))
        .child("wsu:Expires", Value::text(expires));

    MapBuilder::new()
        .child("wsu:Timestamp", timestamp.into_value())
        .into_value()
}

fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Generates 16 CSPRNG-sourced nonce bytes and their base64 encoding (§9
/// "WSS nonce randomness" — a fast PRNG is never acceptable here).
pub fn generate_nonce() -> (Vec<u8>, String) {
    let mut bytes = vec![0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    let encoded = BASE64.encode(&bytes);
    (bytes, encoded)
}

/// `base64(SHA1(raw_nonce || created || password))` (§8 invariant).
pub fn compute_digest(nonce_b64: &str, created: &str, password: &str) -> Result<String, SecurityError> {
    let raw_nonce = BASE64
        .decode(nonce_b64)
        .map_err(|_| SecurityError::InvalidPasswordDigest)?;
    Ok(compute_digest_bytes(&raw_nonce, created, password))
}

fn compute_digest_bytes(raw_nonce: &[u8], created: &str, password: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(raw_nonce);
    hasher.update(created.as_bytes());
    hasher.update(password.as_bytes());
    BASE64.encode(hasher.finalize())
}

/// Errors raised while computing or validating WS-Security material.
#[derive(Debug, Clone, Error)]
pub enum SecurityError {
    #[error("password digest could not be computed")]
    InvalidPasswordDigest,
}

/// Server-side validation outcomes (§4.7, §7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityOutcome {
    Ok,
    MissingSecurityHeader,
    InvalidCredentials,
    InvalidPasswordDigest,
    MissingTimestamp,
    InvalidTimestamp,
    TimestampExpired,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Tuning knobs for [`SecurityValidator`]; the in-memory nonce cache this
/// validator keeps is a replay guard, not a durability guarantee — it is
/// lost on restart like every other piece of this toolkit's state (§5).
#[derive(Debug, Clone)]
pub struct SecurityValidatorConfig {
    pub clock_skew_seconds: i64,
    pub require_timestamp: bool,
    pub max_nonce_cache_size: usize,
}

impl Default for SecurityValidatorConfig {
    fn default() -> Self {
        SecurityValidatorConfig {
            clock_skew_seconds: 300,
            require_timestamp: false,
            max_nonce_cache_size: 10_000,
        }
    }
}

/// Validates incoming `wsse:Security` headers against expected credentials,
/// rejecting replayed digest nonces within their timestamp validity window.
pub struct SecurityValidator {
    config: SecurityValidatorConfig,
    seen_nonces: Mutex<HashMap<String, u64>>,
}

impl SecurityValidator {
    pub fn new(config: SecurityValidatorConfig) -> Self {
        SecurityValidator {
            config,
            seen_nonces: Mutex::new(HashMap::new()),
        }
    }

    /// Validates a parsed `wsse:Security` tree (which may itself contain a
    /// `wsu:Timestamp` sibling to the UsernameToken) against `expected`.
    pub fn validate(&self, security: &Value, expected: &Credentials) -> SecurityOutcome {
        let Some(token) = security.child_by_local_name("UsernameToken") else {
            return SecurityOutcome::MissingSecurityHeader;
        };

        let username = token
            .child_by_local_name("Username")
            .and_then(Value::as_text)
            .unwrap_or("");
        if username != expected.username {
            return SecurityOutcome::InvalidCredentials;
        }

        let Some(password_el) = token.child_by_local_name("Password") else {
            return SecurityOutcome::InvalidCredentials;
        };
        let password_type = password_el
            .as_map()
            .and_then(|m| m.get("@Type"))
            .and_then(Value::as_text)
            .unwrap_or(PASSWORD_TEXT_TYPE);
        let provided_password = password_el.as_text().unwrap_or("");
        let created = token
            .child_by_local_name("Created")
            .and_then(Value::as_text)
            .unwrap_or("");

        if password_type.ends_with("#PasswordDigest") {
            let Some(nonce_el) = token.child_by_local_name("Nonce") else {
                return SecurityOutcome::InvalidPasswordDigest;
            };
            let nonce_b64 = nonce_el.as_text().unwrap_or("");
            if self.is_replayed(nonce_b64) {
                return SecurityOutcome::InvalidCredentials;
            }
            match compute_digest(nonce_b64, created, &expected.password) {
                Ok(expected_digest) if expected_digest == provided_password => {}
                _ => return SecurityOutcome::InvalidPasswordDigest,
            }
        } else if provided_password != expected.password {
            return SecurityOutcome::InvalidCredentials;
        }

        if self.config.require_timestamp || security.child_by_local_name("Timestamp").is_some() {
            match security.child_by_local_name("Timestamp") {
                None => return SecurityOutcome::MissingTimestamp,
                Some(ts) => {
                    if let Some(outcome) = self.validate_timestamp(ts) {
                        return outcome;
                    }
                }
            }
        }

        SecurityOutcome::Ok
    }

    fn validate_timestamp(&self, timestamp_tree: &Value) -> Option<SecurityOutcome> {
        let Some(expires_text) = timestamp_tree.child_by_local_name("Expires").and_then(Value::as_text)
        else {
            return Some(SecurityOutcome::InvalidTimestamp);
        };
        let Ok(expires) = DateTime::parse_from_rfc3339(expires_text) else {
            return Some(SecurityOutcome::InvalidTimestamp);
        };
        let now = Utc::now();
        let skew = Duration::seconds(self.config.clock_skew_seconds);
        if now > expires.with_timezone(&Utc) + skew {
            return Some(SecurityOutcome::TimestampExpired);
        }
        None
    }

    fn is_replayed(&self, nonce_b64: &str) -> bool {
        if nonce_b64.is_empty() {
            return false;
        }
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut cache = self.seen_nonces.lock().expect("nonce cache mutex poisoned");
        let ttl = self.config.clock_skew_seconds.max(0) as u64;
        cache.retain(|_, seen_at| now.saturating_sub(*seen_at) < ttl);
        if cache.len() >= self.config.max_nonce_cache_size {
            cache.clear();
        }
        if cache.contains_key(nonce_b64) {
            return true;
        }
        cache.insert(nonce_b64.to_string(), now);
        false
    }
}
