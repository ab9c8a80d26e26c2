//! Client configuration.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, ZcapError};
use crate::transport::Headers;

/// Value of the `accept` header sent unless overridden.
pub const DEFAULT_ACCEPT: &str = "application/ld+json, application/json";

/// Immutable settings shared by every request a client makes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL that relative request URLs are resolved against.
    pub base_url: Option<String>,

    /// Headers sent with every invocation. Caller headers override these.
    #[serde(deserialize_with = "lower_case_names")]
    pub default_headers: Headers,
}

fn lower_case_names<'de, D>(deserializer: D) -> std::result::Result<Headers, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Headers::deserialize(deserializer)?;
    let mut headers = Headers::new();
    for (name, value) in raw {
        crate::transport::set_header(&mut headers, &name, value);
    }
    Ok(headers)
}

impl Default for ClientConfig {
    fn default() -> Self {
        let mut default_headers = Headers::new();
        default_headers.insert("accept".to_string(), DEFAULT_ACCEPT.to_string());
        Self {
            base_url: None,
            default_headers,
        }
    }
}

impl ClientConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Add or replace a default header. Names are stored lower-cased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        crate::transport::set_header(&mut self.default_headers, name, value);
        self
    }

    /// Check the configuration before a client is built from it.
    pub fn validate(&self) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            url::Url::parse(base_url).map_err(|e| {
                ZcapError::invalid(format!("base URL must be an absolute URL '{base_url}': {e}"))
            })?;
        }
        if let Some(name) = self.default_headers.keys().find(|name| name.trim().is_empty()) {
            return Err(ZcapError::invalid(format!(
                "default header name must not be blank: '{name}'"
            )));
        }
        Ok(())
    }
}
