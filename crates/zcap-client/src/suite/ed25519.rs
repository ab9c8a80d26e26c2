//! Ed25519Signature2020 proofs and HTTP-Signature invocation headers.
//!
//! Delegation proofs sign `sha256(proof options) || sha256(document)` where
//! both halves are the JSON encoding with lexicographically sorted keys.
//! Invocations are signed over the `(key-id) (created) (expires)
//! (request-target) host capability-invocation` pseudo-headers, plus
//! `content-type digest` when a body is sent.

use async_trait::async_trait;
use chrono::Duration;
use serde::Serialize;
use serde_json::Value;
use url::{Position, Url};

use crate::capability::{
    CapabilityRef, DelegatedCapability, Proof, CAPABILITY_DELEGATION_PURPOSE,
    ED25519_2020_CONTEXT,
};
use crate::crypto::{signing, verifying_key_from_did_key};
use crate::error::{Result, ZcapError};
use crate::time;
use crate::transport::{set_header, Headers};

use super::{signing_failure, DelegationPurpose, InvocationRequest, Signer, SigningSuite};

/// Proof type produced by [`Ed25519Suite`].
pub const ED25519_SIGNATURE_2020: &str = "Ed25519Signature2020";

/// The default signing suite.
#[derive(Debug, Clone, Copy, Default)]
pub struct Ed25519Suite;

impl Ed25519Suite {
    pub fn new() -> Self {
        Self
    }

    /// Check the delegation proof on `capability` against the key named by
    /// its `verificationMethod`. This checks one signature, not the chain.
    pub fn verify_delegation_proof(&self, capability: &DelegatedCapability) -> Result<()> {
        let proof = capability
            .delegation_proof()
            .ok_or_else(|| ZcapError::malformed("capability has no delegation proof"))?;
        let proof_value = proof
            .proof_value
            .as_deref()
            .ok_or_else(|| ZcapError::malformed("proof has no proofValue"))?;

        let mut unsigned = capability.clone();
        unsigned.proof.clear();
        let mut options = proof.clone();
        options.proof_value = None;

        let key = verifying_key_from_did_key(&proof.verification_method)?;
        signing::verify_multibase(&key, &delegation_signing_input(&unsigned, &options)?, proof_value)
    }
}

fn canonical_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    // Value objects are BTreeMap-backed, so re-encoding sorts the keys.
    let value: Value = serde_json::to_value(value)?;
    Ok(serde_json::to_vec(&value)?)
}

fn delegation_signing_input(document: &DelegatedCapability, options: &Proof) -> Result<Vec<u8>> {
    let mut input = Vec::with_capacity(64);
    input.extend_from_slice(&signing::sha256(&canonical_bytes(options)?));
    input.extend_from_slice(&signing::sha256(&canonical_bytes(document)?));
    Ok(input)
}

/// Make sure the document declares this suite's JSON-LD context.
fn add_suite_context(context: &mut Value) {
    let suite = Value::from(ED25519_2020_CONTEXT);
    if let Value::Array(contexts) = context {
        if !contexts.contains(&suite) {
            contexts.push(suite);
        }
        return;
    }
    if context.is_null() {
        *context = Value::Array(vec![suite]);
    } else if *context != suite {
        *context = Value::Array(vec![context.take(), suite]);
    }
}

/// Value of the `capability-invocation` header.
fn capability_invocation_header(capability: &CapabilityRef, action: &str) -> Result<String> {
    Ok(match capability {
        CapabilityRef::Root(root) => format!("zcap id=\"{}\",action=\"{action}\"", root.id()),
        CapabilityRef::Delegated(cap) => {
            let encoded = base64::Engine::encode(
                &base64::engine::general_purpose::URL_SAFE_NO_PAD,
                serde_json::to_vec(cap.as_ref())?,
            );
            format!("zcap capability=\"{encoded}\",action=\"{action}\"")
        }
    })
}

/// Build the HTTP-Signature signing string for the covered headers.
pub(crate) fn signing_string(
    covered: &[&str],
    headers: &Headers,
    key_id: &str,
    created: i64,
    expires: i64,
    request_target: &str,
) -> Result<String> {
    let lines = covered
        .iter()
        .map(|name| match *name {
            "(key-id)" => Ok(format!("(key-id): {key_id}")),
            "(created)" => Ok(format!("(created): {created}")),
            "(expires)" => Ok(format!("(expires): {expires}")),
            "(request-target)" => Ok(format!("(request-target): {request_target}")),
            header => headers
                .get(header)
                .map(|value| format!("{header}: {value}"))
                .ok_or_else(|| {
                    ZcapError::SigningFailure(format!("covered header '{header}' is missing"))
                }),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(lines.join("\n"))
}

#[async_trait]
impl SigningSuite for Ed25519Suite {
    async fn sign_delegation(
        &self,
        mut document: DelegatedCapability,
        signer: &dyn Signer,
        purpose: &DelegationPurpose<'_>,
    ) -> Result<DelegatedCapability> {
        let mut proof = Proof {
            proof_type: ED25519_SIGNATURE_2020.to_string(),
            created: time::format_timestamp(time::now()),
            verification_method: signer.id().to_string(),
            proof_purpose: CAPABILITY_DELEGATION_PURPOSE.to_string(),
            capability_chain: purpose
                .capability_chain
                .iter()
                .cloned()
                .map(Value::String)
                .collect(),
            proof_value: None,
            extra: serde_json::Map::new(),
        };
        document.proof.clear();
        add_suite_context(&mut document.context);

        let input = delegation_signing_input(&document, &proof)?;
        let signature = signer.sign(&input).map_err(signing_failure)?;
        proof.proof_value = Some(signing::to_multibase(&signature));

        log::trace!(
            "signed delegation {} from {} (chain length {})",
            document.id,
            purpose.parent.id(),
            purpose.capability_chain.len()
        );
        document.proof = vec![proof];
        Ok(document)
    }

    async fn sign_invocation(
        &self,
        request: &InvocationRequest<'_>,
        signer: &dyn Signer,
    ) -> Result<Headers> {
        let url = Url::parse(request.url)
            .map_err(|e| ZcapError::invalid(format!("invalid request URL '{}': {e}", request.url)))?;
        let host = &url[Position::BeforeHost..Position::AfterPort];
        let request_target = format!(
            "{} {}",
            request.method.as_str().to_ascii_lowercase(),
            &url[Position::BeforePath..Position::AfterQuery]
        );

        let now = time::now();
        let created = now.timestamp();
        let expires = (now + Duration::seconds(time::INVOCATION_SIGNATURE_TTL_SECS)).timestamp();

        let mut headers = request.headers.clone();
        set_header(&mut headers, "host", host);
        set_header(
            &mut headers,
            "capability-invocation",
            capability_invocation_header(request.capability, request.action)?,
        );

        let mut covered = vec![
            "(key-id)",
            "(created)",
            "(expires)",
            "(request-target)",
            "host",
            "capability-invocation",
        ];
        if let Some(body) = request.body {
            headers
                .entry("content-type".to_string())
                .or_insert_with(|| "application/json".to_string());
            set_header(&mut headers, "digest", signing::body_digest(body));
            covered.extend(["content-type", "digest"]);
        }

        let plaintext = signing_string(
            &covered,
            &headers,
            signer.id(),
            created,
            expires,
            &request_target,
        )?;
        let signature = signer.sign(plaintext.as_bytes()).map_err(signing_failure)?;
        let signature =
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, signature);

        set_header(
            &mut headers,
            "authorization",
            format!(
                "Signature keyId=\"{}\",headers=\"{}\",signature=\"{signature}\",created=\"{created}\",expires=\"{expires}\"",
                signer.id(),
                covered.join(" "),
            ),
        );
        Ok(headers)
    }
}
