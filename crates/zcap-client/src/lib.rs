//! zcap-client: client engine for Authorization Capabilities.
//!
//! Derives root capability identifiers from target URLs, delegates
//! attenuated capabilities to other controllers, validates capabilities
//! received from elsewhere, and invokes them with signed HTTP requests
//! that never reach outside the capability's invocation target.

pub mod capability;
pub mod client;
pub mod config;
pub mod crypto;
pub mod delegation;
pub mod error;
pub mod invocation;
pub mod suite;
pub mod time;
pub mod transport;

// Re-export primary types
pub use capability::{
    root_capability_uri, validate_capability, AllowedActions, CapabilityRef, DelegatedCapability,
    Proof, RootCapability,
};
pub use client::{ZcapClient, ZcapClientBuilder};
pub use config::ClientConfig;
pub use delegation::{DelegationBuilder, Expires, UnsignedDelegation};
pub use error::{Result, SignerRole, ZcapError};
pub use invocation::{PreparedInvocation, RequestOptions};

// Re-export collaborator types
pub use crypto::Ed25519Signer;
pub use suite::{DelegationPurpose, Ed25519Suite, InvocationRequest, Signer, SigningSuite};
pub use transport::{Headers, HttpMethod, HttpRequest, HttpResponse, Transport};

#[cfg(feature = "http")]
pub use transport::{ReqwestTransport, TransportConfig};
