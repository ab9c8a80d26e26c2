//! Ed25519 signer identities.
//!
//! The signer's identity is a `did:key` derived from its public key, with
//! the key's multibase fingerprint as the verification method fragment.

use ed25519_dalek::{Signer as _, SigningKey, VerifyingKey};
use zeroize::Zeroize;

use crate::error::{Result, ZcapError};
use crate::suite::Signer;

/// Multicodec prefix of an Ed25519 public key.
const ED25519_PUB_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// Algorithm name reported by [`Ed25519Signer`].
pub const ED25519_ALGORITHM: &str = "Ed25519";

/// An Ed25519 key pair acting as a capability signer.
///
/// The signing key is zeroized on drop by `SigningKey`'s own `ZeroizeOnDrop`.
pub struct Ed25519Signer {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    controller: String,
    key_id: String,
}

impl Ed25519Signer {
    /// Generate a new random signer.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut rand::thread_rng()))
    }

    /// Reconstruct a signer from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(seed))
    }

    /// Reconstruct a signer from a base64-encoded 32-byte seed.
    pub fn from_seed_base64(seed_b64: &str) -> Result<Self> {
        let mut bytes =
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, seed_b64.trim())
                .map_err(|e| ZcapError::invalid(format!("invalid base64 seed: {e}")))?;
        let seed: std::result::Result<[u8; 32], _> = bytes.as_slice().try_into();
        bytes.zeroize();
        let mut seed = seed.map_err(|_| ZcapError::invalid("seed must be 32 bytes"))?;
        let signer = Self::from_seed(&seed);
        seed.zeroize();
        Ok(signer)
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let fingerprint = fingerprint(&verifying_key);
        Self {
            signing_key,
            verifying_key,
            controller: format!("did:key:{fingerprint}"),
            key_id: format!("did:key:{fingerprint}#{fingerprint}"),
        }
    }

    /// Return the verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Return the seed as base64. Handle with the same care as the key.
    pub fn seed_base64(&self) -> String {
        let mut seed = self.signing_key.to_bytes();
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, seed);
        seed.zeroize();
        encoded
    }
}

impl Signer for Ed25519Signer {
    fn id(&self) -> &str {
        &self.key_id
    }

    fn controller(&self) -> &str {
        &self.controller
    }

    fn algorithm(&self) -> &str {
        ED25519_ALGORITHM
    }

    fn sign(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(self.signing_key.sign(data).to_bytes().to_vec())
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Multibase (base58btc) fingerprint of an Ed25519 public key.
pub fn fingerprint(key: &VerifyingKey) -> String {
    let mut bytes = Vec::with_capacity(34);
    bytes.extend_from_slice(&ED25519_PUB_MULTICODEC);
    bytes.extend_from_slice(key.as_bytes());
    format!("z{}", bs58::encode(bytes).into_string())
}

/// Recover the Ed25519 public key from a `did:key` identifier or key id.
pub fn verifying_key_from_did_key(did: &str) -> Result<VerifyingKey> {
    let fingerprint = did
        .strip_prefix("did:key:z")
        .map(|rest| rest.split('#').next().unwrap_or(rest))
        .ok_or_else(|| ZcapError::invalid(format!("not a base58 did:key: '{did}'")))?;
    let bytes = bs58::decode(fingerprint)
        .into_vec()
        .map_err(|e| ZcapError::invalid(format!("invalid did:key encoding: {e}")))?;
    let key: [u8; 32] = bytes
        .strip_prefix(&ED25519_PUB_MULTICODEC)
        .and_then(|key| key.try_into().ok())
        .ok_or_else(|| ZcapError::invalid("did:key is not an Ed25519 public key"))?;
    VerifyingKey::from_bytes(&key)
        .map_err(|e| ZcapError::invalid(format!("invalid verifying key: {e}")))
}
