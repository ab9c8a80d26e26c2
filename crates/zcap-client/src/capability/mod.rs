//! Capabilities: identifiers, documents, and structural validation.
//!
//! The capability module provides:
//! - Root capability ids derived from target URLs, and fresh delegated ids
//! - The delegated capability document and its proof
//! - The `CapabilityRef` variant the engines operate on
//! - Structural validation of capabilities received from elsewhere
//! - Target containment and allowed-action normalization

pub mod action;
pub mod document;
pub mod id;
pub mod target;
pub mod validate;

pub use action::{actions_within, AllowedActions, ACTION_READ, ACTION_WRITE};
pub use document::{
    CapabilityRef, DelegatedCapability, Proof, RootCapability, CAPABILITY_DELEGATION_PURPOSE,
    ED25519_2020_CONTEXT, ZCAP_CONTEXT,
};
pub use id::{
    decode_root_capability_uri, fresh_capability_uri, is_absolute_uri, root_capability_uri,
    ROOT_CAPABILITY_PREFIX,
};
pub use target::{normalize_url, target_covers};
pub use validate::validate_capability;
