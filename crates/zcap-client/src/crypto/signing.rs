//! Encodings around signatures and digests.
//!
//! Proof values are multibase base58btc (`z…`); body digests are sha2-256
//! multihashes in multibase base64url (`u…`).

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::{Result, ZcapError};

/// Multihash header of a sha2-256 digest.
const SHA256_MULTIHASH: [u8; 2] = [0x12, 0x20];

/// SHA-256 of `data`.
pub fn sha256(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// Encode signature bytes as a multibase base58btc string.
pub fn to_multibase(bytes: &[u8]) -> String {
    format!("z{}", bs58::encode(bytes).into_string())
}

/// Decode a multibase base58btc string.
pub fn from_multibase(value: &str) -> Result<Vec<u8>> {
    let encoded = value
        .strip_prefix('z')
        .ok_or_else(|| ZcapError::invalid("multibase value must be base58btc ('z')"))?;
    bs58::decode(encoded)
        .into_vec()
        .map_err(|e| ZcapError::invalid(format!("invalid base58btc: {e}")))
}

/// Digest header value for a request body: `mh=u<base64url multihash>`.
pub fn body_digest(body: &[u8]) -> String {
    let mut multihash = Vec::with_capacity(34);
    multihash.extend_from_slice(&SHA256_MULTIHASH);
    multihash.extend_from_slice(&sha256(body));
    let encoded =
        base64::Engine::encode(&base64::engine::general_purpose::URL_SAFE_NO_PAD, multihash);
    format!("mh=u{encoded}")
}

/// Verify an Ed25519 signature in multibase form.
pub fn verify_multibase(
    verifying_key: &VerifyingKey,
    message: &[u8],
    signature_multibase: &str,
) -> Result<()> {
    let bytes = from_multibase(signature_multibase)?;
    let bytes: [u8; 64] = bytes
        .try_into()
        .map_err(|_| ZcapError::invalid("signature must be 64 bytes"))?;
    verifying_key
        .verify(message, &Signature::from_bytes(&bytes))
        .map_err(|_| ZcapError::SigningFailure("signature verification failed".into()))
}
