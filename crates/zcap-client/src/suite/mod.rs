//! Signing collaborators.
//!
//! The engines never sign anything themselves. A [`Signer`] holds key
//! material for one role (delegation or invocation) and a [`SigningSuite`]
//! turns documents and requests into signed artifacts using a signer.
//! Both are injected into the client as trait objects so algorithms can be
//! swapped without touching the engines.

pub mod ed25519;

use async_trait::async_trait;

use crate::capability::{CapabilityRef, DelegatedCapability};
use crate::error::{Result, ZcapError};
use crate::transport::{Headers, HttpMethod};

pub use ed25519::Ed25519Suite;

/// Key material able to sign bytes under a stable identifier.
pub trait Signer: Send + Sync {
    /// Verification method id (key id) used in proofs and signatures.
    fn id(&self) -> &str;

    /// The party that controls this key.
    fn controller(&self) -> &str;

    /// Signature algorithm name.
    fn algorithm(&self) -> &str;

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// What a delegation proof must commit to.
#[derive(Debug, Clone)]
pub struct DelegationPurpose<'a> {
    /// The capability being delegated from.
    pub parent: &'a CapabilityRef,
    /// Ancestors of the new capability, root first, parent last.
    pub capability_chain: Vec<String>,
}

/// An HTTP request about to be signed for invocation.
#[derive(Debug, Clone)]
pub struct InvocationRequest<'a> {
    pub url: &'a str,
    pub method: HttpMethod,
    /// Headers the request will carry (lower-case names).
    pub headers: &'a Headers,
    pub body: Option<&'a [u8]>,
    pub capability: &'a CapabilityRef,
    pub action: &'a str,
}

/// Produces proofs for delegated capabilities and signed invocation headers.
#[async_trait]
pub trait SigningSuite: Send + Sync {
    /// Attach a delegation proof to `document`.
    async fn sign_delegation(
        &self,
        document: DelegatedCapability,
        signer: &dyn Signer,
        purpose: &DelegationPurpose<'_>,
    ) -> Result<DelegatedCapability>;

    /// Return the complete header set to send with `request`.
    async fn sign_invocation(
        &self,
        request: &InvocationRequest<'_>,
        signer: &dyn Signer,
    ) -> Result<Headers>;
}

/// Report any failure raised while signing as a signing failure.
pub(crate) fn signing_failure(error: ZcapError) -> ZcapError {
    match error {
        ZcapError::SigningFailure(_) => error,
        other => ZcapError::SigningFailure(other.to_string()),
    }
}
