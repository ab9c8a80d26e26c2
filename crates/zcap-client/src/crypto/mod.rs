//! Cryptographic primitives for the default collaborators.
//!
//! This module provides:
//! - Ed25519 signers identified by `did:key`
//! - Multibase encoding of signatures
//! - Multihash body digests for invocation headers

pub mod keys;
pub mod signing;

pub use keys::{fingerprint, verifying_key_from_did_key, Ed25519Signer, ED25519_ALGORITHM};
