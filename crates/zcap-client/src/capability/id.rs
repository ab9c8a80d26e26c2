//! Capability identifiers.
//!
//! Root capabilities are never serialized as documents; they are named by
//! `urn:zcap:root:` followed by the percent-encoded invocation target, so the
//! target can always be recovered from the identifier. Delegated
//! capabilities get a random `urn:uuid:` identifier each time.

use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use uuid::Uuid;

use crate::error::{Result, ZcapError};

/// Prefix shared by every root capability identifier.
pub const ROOT_CAPABILITY_PREFIX: &str = "urn:zcap:root:";

/// Prefix of freshly generated delegated capability identifiers.
pub const DELEGATED_CAPABILITY_PREFIX: &str = "urn:uuid:";

/// Characters left alone by `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Derive the root capability identifier for an absolute target URL.
pub fn root_capability_uri(url: &str) -> Result<String> {
    if !is_absolute_uri(url) {
        return Err(ZcapError::invalid(format!(
            "invocation target must be an absolute URI: '{url}'"
        )));
    }
    Ok(format!(
        "{ROOT_CAPABILITY_PREFIX}{}",
        utf8_percent_encode(url, URI_COMPONENT)
    ))
}

/// Recover the target URL from a root capability identifier.
pub fn decode_root_capability_uri(uri: &str) -> Result<String> {
    let encoded = uri.strip_prefix(ROOT_CAPABILITY_PREFIX).ok_or_else(|| {
        ZcapError::malformed(format!(
            "root capability id must start with '{ROOT_CAPABILITY_PREFIX}'"
        ))
    })?;
    percent_decode_str(encoded)
        .decode_utf8()
        .map(|decoded| decoded.into_owned())
        .map_err(|_| ZcapError::malformed("root capability id does not decode to UTF-8"))
}

/// Whether `uri` names a root capability.
pub fn is_root_capability_uri(uri: &str) -> bool {
    uri.starts_with(ROOT_CAPABILITY_PREFIX)
}

/// Generate a new, never-reused identifier for a delegated capability.
pub fn fresh_capability_uri() -> String {
    format!("{DELEGATED_CAPABILITY_PREFIX}{}", Uuid::new_v4())
}

/// Whether `s` starts with an RFC 3986 scheme followed by `:`.
pub fn is_absolute_uri(s: &str) -> bool {
    let Some((scheme, rest)) = s.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    starts_alpha
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && !rest.is_empty()
}
