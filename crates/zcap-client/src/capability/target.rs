//! Invocation target containment.
//!
//! A target covers a URL when the URL is the target itself or sits below it
//! in the path hierarchy. `https://zcap.example/items` covers
//! `https://zcap.example/items/123` but not `https://zcap.example/items2`.
//!
//! Both sides are compared in their WHATWG-serialized form, so dot segments
//! (`items/../admin`, `items/%2e%2e/admin`), host case and default ports are
//! resolved the same way the transport will resolve them.

use std::borrow::Cow;

/// Serialize `url` the way an HTTP client will see it. Strings that do not
/// parse as URLs are returned unchanged.
pub fn normalize_url(url: &str) -> Cow<'_, str> {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.as_str() != url => Cow::Owned(parsed.into()),
        _ => Cow::Borrowed(url),
    }
}

/// Check whether `target` covers `url`.
pub fn target_covers(target: &str, url: &str) -> bool {
    let target = normalize_url(target);
    let url = normalize_url(url);
    if url == target {
        return true;
    }
    url.strip_prefix(&*target)
        .is_some_and(|rest| target.ends_with('/') || rest.starts_with('/'))
}
