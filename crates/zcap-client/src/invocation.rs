//! Invocation engine.
//!
//! Turns a request description into a signed HTTP request and sends it.
//! A capability may only be invoked against URLs inside its invocation
//! target; a request without a capability invokes the root capability of
//! its own URL.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::capability::{
    is_absolute_uri, normalize_url, target_covers, CapabilityRef, ACTION_READ,
};
use crate::config::ClientConfig;
use crate::error::{Result, SignerRole, ZcapError};
use crate::suite::{InvocationRequest, Signer, SigningSuite};
use crate::time;
use crate::transport::{set_header, Headers, HttpMethod, HttpRequest, HttpResponse, Transport};

/// What to invoke and how.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    url: Option<String>,
    capability: Option<CapabilityRef>,
    method: HttpMethod,
    action: Option<String>,
    headers: Headers,
    json: Option<Value>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute URL, or a URL relative to the configured base URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn capability(mut self, capability: impl Into<CapabilityRef>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    pub fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Action to invoke; `read` when unset.
    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        set_header(&mut self.headers, name, value);
        self
    }

    pub fn headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        for (name, value) in headers {
            set_header(&mut self.headers, &name, value);
        }
        self
    }

    /// JSON body, serialized once when the request is prepared.
    pub fn json(mut self, body: Value) -> Self {
        self.json = Some(body);
        self
    }

    pub(crate) fn with_defaults(mut self, method: HttpMethod, action: &str) -> Self {
        self.method = method;
        self.action = Some(action.to_string());
        self
    }

    /// Resolve, check and assemble everything except the signature.
    pub fn prepare(self, config: &ClientConfig, now: DateTime<Utc>) -> Result<PreparedInvocation> {
        let url = match (&self.url, &self.capability) {
            (None, None) => {
                return Err(ZcapError::invalid(
                    "a url or a capability is required to make a request",
                ))
            }
            (url, Some(capability)) => {
                capability.validate()?;
                match url {
                    Some(url) => resolve_url(url, config.base_url.as_deref())?,
                    None => capability.invocation_target().to_string(),
                }
            }
            (Some(url), None) => resolve_url(url, config.base_url.as_deref())?,
        };
        // Checked, signed and sent in the form the transport will request.
        let url = normalize_url(&url).into_owned();

        let capability = match self.capability {
            Some(capability) => {
                if !target_covers(capability.invocation_target(), &url) {
                    return Err(ZcapError::ScopeViolation {
                        target: capability.invocation_target().to_string(),
                        url,
                    });
                }
                capability
            }
            None => CapabilityRef::root(&url)?,
        };

        let mut headers = Headers::new();
        for (name, value) in config.default_headers.iter().chain(&self.headers) {
            set_header(&mut headers, name, value.as_str());
        }
        set_header(&mut headers, "date", time::http_date(now));

        let body = match &self.json {
            Some(json) => {
                headers
                    .entry("content-type".to_string())
                    .or_insert_with(|| "application/json".to_string());
                Some(serde_json::to_vec(json)?)
            }
            None => None,
        };

        let action = self.action.unwrap_or_else(|| ACTION_READ.to_string());
        log::trace!(
            "prepared {} {} with headers {:?}",
            self.method,
            url,
            headers.keys().collect::<Vec<_>>()
        );

        Ok(PreparedInvocation {
            url,
            method: self.method,
            capability,
            action,
            headers,
            body,
        })
    }
}

/// A checked request waiting for its invocation signature.
#[derive(Debug, Clone)]
pub struct PreparedInvocation {
    pub url: String,
    pub method: HttpMethod,
    pub capability: CapabilityRef,
    pub action: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

impl PreparedInvocation {
    /// Sign the request, returning it ready for the transport.
    pub async fn sign(
        self,
        suite: &dyn SigningSuite,
        signer: Option<&dyn Signer>,
    ) -> Result<HttpRequest> {
        let signer = signer.ok_or(ZcapError::MissingSigner(SignerRole::Invocation))?;
        let request = InvocationRequest {
            url: &self.url,
            method: self.method,
            headers: &self.headers,
            body: self.body.as_deref(),
            capability: &self.capability,
            action: &self.action,
        };
        let headers = suite.sign_invocation(&request, signer).await?;
        Ok(HttpRequest {
            method: self.method,
            url: self.url,
            headers,
            body: self.body,
        })
    }
}

/// Resolve `url` against `base_url` unless it is already absolute.
fn resolve_url(url: &str, base_url: Option<&str>) -> Result<String> {
    if is_absolute_uri(url) {
        return Ok(url.to_string());
    }
    let Some(base_url) = base_url else {
        return Err(ZcapError::invalid(format!(
            "relative url '{url}' needs a configured base URL"
        )));
    };
    let base = url::Url::parse(base_url)
        .map_err(|e| ZcapError::invalid(format!("invalid base URL '{base_url}': {e}")))?;
    base.join(url)
        .map(String::from)
        .map_err(|e| ZcapError::invalid(format!("cannot resolve '{url}' against '{base_url}': {e}")))
}

/// Prepare, sign and send one invocation. The response is returned as the
/// server sent it, whatever its status.
pub async fn invoke(
    options: RequestOptions,
    config: &ClientConfig,
    suite: &dyn SigningSuite,
    signer: Option<&dyn Signer>,
    transport: &dyn Transport,
) -> Result<HttpResponse> {
    let prepared = options.prepare(config, time::now())?;
    let capability_id = prepared.capability.id().to_string();
    let request = prepared.sign(suite, signer).await?;

    log::debug!(
        "invoking {} {} with capability {}",
        request.method,
        request.url,
        capability_id
    );
    let response = transport.send(request).await?;
    log::debug!("received status {}", response.status);
    Ok(response)
}
