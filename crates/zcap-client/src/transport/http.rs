//! `reqwest`-backed transport.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ZcapError};

use super::{Headers, HttpMethod, HttpRequest, HttpResponse, Transport};

/// Configuration for [`ReqwestTransport`].
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Optional timeout for requests in seconds
    pub timeout_seconds: Option<u64>,

    /// Optional `user-agent` header
    pub user_agent: Option<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: Some(30),
            user_agent: Some(format!("zcap-client/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

/// Transport over a pooled `reqwest::Client`. Redirects are never followed.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a new transport with the given configuration.
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let mut client_builder =
            reqwest::Client::builder().redirect(reqwest::redirect::Policy::none());

        if let Some(timeout) = config.timeout_seconds {
            client_builder = client_builder.timeout(std::time::Duration::from_secs(timeout));
        }
        if let Some(user_agent) = &config.user_agent {
            client_builder = client_builder.user_agent(user_agent.clone());
        }

        let client = client_builder
            .build()
            .map_err(|e| ZcapError::TransportFailure(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an existing client, keeping its pool and settings.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_reqwest_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Head => reqwest::Method::HEAD,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
        HttpMethod::Options => reqwest::Method::OPTIONS,
    }
}

impl From<reqwest::Error> for ZcapError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() {
            ZcapError::TransportFailure(format!("connection failed: {error}"))
        } else if error.is_timeout() {
            ZcapError::TransportFailure(format!("request timed out: {error}"))
        } else {
            ZcapError::TransportFailure(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self
            .client
            .request(to_reqwest_method(request.method), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        log::debug!("{} {}", request.method, request.url);
        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = collect_headers(response.headers());
        let body = response.bytes().await?.to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Fold a response header map into [`Headers`]. Repeated fields are joined
/// with `", "` in arrival order; values that are not UTF-8 are kept lossily.
fn collect_headers(map: &reqwest::header::HeaderMap) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in map {
        let value = String::from_utf8_lossy(value.as_bytes());
        headers
            .entry(name.as_str().to_string())
            .and_modify(|joined| {
                joined.push_str(", ");
                joined.push_str(&value);
            })
            .or_insert_with(|| value.into_owned());
    }
    headers
}
