//! Error types for the zcap client.
//!
//! All errors are strongly typed and returned to the caller of the failing
//! operation. Nothing is retried or swallowed internally.

/// Which configured signer an operation needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignerRole {
    /// Signs delegated capability documents.
    Delegation,
    /// Signs HTTP invocation headers.
    Invocation,
}

impl std::fmt::Display for SignerRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SignerRole::Delegation => write!(f, "delegation"),
            SignerRole::Invocation => write!(f, "invocation"),
        }
    }
}

/// Error types covering every client operation.
#[derive(Debug, thiserror::Error)]
pub enum ZcapError {
    /// Caller-supplied shape or precondition violation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An externally supplied capability is structurally broken.
    #[error("Malformed capability: {rule}")]
    MalformedCapability { rule: String },

    /// A capability was used (or delegated) outside of its invocation target.
    #[error("Scope violation: '{url}' is not within invocation target '{target}'")]
    ScopeViolation { target: String, url: String },

    #[error("No {0} signer configured")]
    MissingSigner(SignerRole),

    /// Passthrough from the signing collaborator.
    #[error("Signing failed: {0}")]
    SigningFailure(String),

    /// Passthrough from the HTTP transport.
    #[error("Transport failed: {0}")]
    TransportFailure(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ZcapError {
    /// Shorthand for a validator rule violation.
    pub(crate) fn malformed(rule: impl Into<String>) -> Self {
        ZcapError::MalformedCapability { rule: rule.into() }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        ZcapError::InvalidArgument(message.into())
    }
}

impl From<serde_json::Error> for ZcapError {
    fn from(error: serde_json::Error) -> Self {
        ZcapError::Serialization(error.to_string())
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, ZcapError>;
