//! The zcap client: delegation plus signed HTTP invocation.

use std::sync::Arc;

use crate::capability::{DelegatedCapability, ACTION_READ, ACTION_WRITE};
use crate::config::ClientConfig;
use crate::delegation::{self, DelegationBuilder};
use crate::error::Result;
use crate::invocation::{self, RequestOptions};
use crate::suite::{Ed25519Suite, Signer, SigningSuite};
use crate::transport::{HttpMethod, HttpResponse, Transport};

/// Delegates and invokes capabilities.
///
/// Holds only immutable configuration and shared collaborators, so it is
/// cheap to clone and safe to use from many tasks at once.
#[derive(Clone)]
pub struct ZcapClient {
    config: Arc<ClientConfig>,
    suite: Arc<dyn SigningSuite>,
    transport: Arc<dyn Transport>,
    delegation_signer: Option<Arc<dyn Signer>>,
    invocation_signer: Option<Arc<dyn Signer>>,
}

impl ZcapClient {
    pub fn builder() -> ZcapClientBuilder {
        ZcapClientBuilder::default()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Delegate a capability to the builder's controller, signed with the
    /// delegation signer.
    pub async fn delegate(&self, builder: DelegationBuilder) -> Result<DelegatedCapability> {
        delegation::delegate(
            builder,
            self.suite.as_ref(),
            self.delegation_signer.as_deref(),
        )
        .await
    }

    /// Invoke a capability with a signed HTTP request.
    pub async fn request(&self, options: RequestOptions) -> Result<HttpResponse> {
        invocation::invoke(
            options,
            &self.config,
            self.suite.as_ref(),
            self.invocation_signer.as_deref(),
            self.transport.as_ref(),
        )
        .await
    }

    /// `GET` with the `read` action.
    pub async fn read(&self, options: RequestOptions) -> Result<HttpResponse> {
        self.request(options.with_defaults(HttpMethod::Get, ACTION_READ))
            .await
    }

    /// `POST` with the `write` action, sending the options' JSON body.
    pub async fn write(&self, options: RequestOptions) -> Result<HttpResponse> {
        self.request(options.with_defaults(HttpMethod::Post, ACTION_WRITE))
            .await
    }
}

impl std::fmt::Debug for ZcapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZcapClient")
            .field("config", &self.config)
            .field(
                "delegation_signer",
                &self.delegation_signer.as_ref().map(|s| s.id().to_string()),
            )
            .field(
                "invocation_signer",
                &self.invocation_signer.as_ref().map(|s| s.id().to_string()),
            )
            .finish_non_exhaustive()
    }
}

/// Assembles a [`ZcapClient`].
#[derive(Default)]
pub struct ZcapClientBuilder {
    config: ClientConfig,
    suite: Option<Arc<dyn SigningSuite>>,
    transport: Option<Arc<dyn Transport>>,
    delegation_signer: Option<Arc<dyn Signer>>,
    invocation_signer: Option<Arc<dyn Signer>>,
}

impl ZcapClientBuilder {
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = Some(base_url.into());
        self
    }

    /// Signing suite; Ed25519Signature2020 when unset.
    pub fn suite(mut self, suite: Arc<dyn SigningSuite>) -> Self {
        self.suite = Some(suite);
        self
    }

    /// Transport; a `reqwest` transport with default settings when unset.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn delegation_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.delegation_signer = Some(signer);
        self
    }

    pub fn invocation_signer(mut self, signer: Arc<dyn Signer>) -> Self {
        self.invocation_signer = Some(signer);
        self
    }

    /// Use one signer for both delegation and invocation.
    pub fn signer(self, signer: Arc<dyn Signer>) -> Self {
        self.delegation_signer(signer.clone()).invocation_signer(signer)
    }

    pub fn build(self) -> Result<ZcapClient> {
        self.config.validate()?;
        let transport = match self.transport {
            Some(transport) => transport,
            None => default_transport()?,
        };
        let suite: Arc<dyn SigningSuite> = match self.suite {
            Some(suite) => suite,
            None => Arc::new(Ed25519Suite::new()),
        };
        Ok(ZcapClient {
            config: Arc::new(self.config),
            suite,
            transport,
            delegation_signer: self.delegation_signer,
            invocation_signer: self.invocation_signer,
        })
    }
}

#[cfg(feature = "http")]
fn default_transport() -> Result<Arc<dyn Transport>> {
    use crate::transport::{ReqwestTransport, TransportConfig};
    Ok(Arc::new(ReqwestTransport::new(&TransportConfig::default())?))
}

#[cfg(not(feature = "http"))]
fn default_transport() -> Result<Arc<dyn Transport>> {
    Err(crate::error::ZcapError::invalid(
        "no transport configured and the \"http\" feature is disabled",
    ))
}
