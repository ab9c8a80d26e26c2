//! Structural validation of externally supplied capabilities.
//!
//! This is the gate in front of the invocation engine. It checks shape only:
//! signatures, chains and revocation are a verifier's business.

use serde_json::{Map, Value};
use url::Url;

use crate::error::{Result, ZcapError};
use crate::time;

use super::document::{CapabilityRef, DelegatedCapability, RootCapability};
use super::id::{self, ROOT_CAPABILITY_PREFIX};

/// Validate a capability given as JSON (a root id string or a document).
pub fn validate_capability(value: &Value) -> Result<CapabilityRef> {
    match value {
        Value::String(uri) => validate_root_id(uri).map(CapabilityRef::Root),
        Value::Object(doc) => validate_document(doc),
        _ => Err(ZcapError::malformed(
            "capability must be a root capability id string or an object",
        )),
    }
}

/// A bare root capability id must decode to an absolute HTTPS URL.
fn validate_root_id(uri: &str) -> Result<RootCapability> {
    if !id::is_root_capability_uri(uri) {
        return Err(ZcapError::malformed(format!(
            "capability string must start with '{ROOT_CAPABILITY_PREFIX}'"
        )));
    }
    let root = RootCapability::from_id(uri)?;
    let target = Url::parse(root.invocation_target()).map_err(|e| {
        ZcapError::malformed(format!(
            "root capability id must decode to an absolute URL: {e}"
        ))
    })?;
    if target.scheme() != "https" {
        return Err(ZcapError::malformed(
            "root capability id must decode to an HTTPS URL",
        ));
    }
    Ok(root)
}

fn validate_document(doc: &Map<String, Value>) -> Result<CapabilityRef> {
    let id = uri_field(doc, "id")?;
    let target = uri_field(doc, "invocationTarget")?;
    if let Some(actions) = doc.get("allowedAction") {
        validate_allowed_action(actions)?;
    }

    let Some(parent) = doc.get("parentCapability") else {
        if doc.contains_key("expires") {
            return Err(ZcapError::malformed(
                "root capability must not have 'expires'",
            ));
        }
        return Ok(CapabilityRef::Root(RootCapability::from_document(
            id.to_string(),
            target.to_string(),
        )));
    };

    match parent.as_str() {
        Some(parent) if parent.contains(':') => {}
        _ => {
            return Err(ZcapError::malformed(
                "'parentCapability' must be a string containing a scheme separator",
            ))
        }
    }

    match doc.get("expires").and_then(Value::as_str) {
        Some(expires) if time::parse_timestamp(expires).is_some() => {}
        _ => {
            return Err(ZcapError::malformed(
                "delegated capability must have a parseable 'expires' timestamp",
            ))
        }
    }

    let proofs: Vec<&Value> = match doc.get("proof") {
        Some(Value::Array(proofs)) => proofs.iter().collect(),
        Some(proof @ Value::Object(_)) => vec![proof],
        _ => Vec::new(),
    };
    if !proofs.iter().all(|proof| proof.is_object()) {
        return Err(ZcapError::malformed("'proof' entries must be objects"));
    }
    let has_dated_proof = proofs.iter().any(|proof| {
        proof
            .get("created")
            .and_then(Value::as_str)
            .and_then(time::parse_timestamp)
            .is_some()
    });
    if !has_dated_proof {
        return Err(ZcapError::malformed(
            "delegated capability must carry a proof with a parseable 'created' timestamp",
        ));
    }

    let cap: DelegatedCapability = serde_json::from_value(Value::Object(doc.clone()))
        .map_err(|e| ZcapError::malformed(format!("invalid delegated capability: {e}")))?;
    Ok(CapabilityRef::Delegated(Box::new(cap)))
}

fn uri_field<'a>(doc: &'a Map<String, Value>, field: &str) -> Result<&'a str> {
    match doc.get(field).and_then(Value::as_str) {
        Some(value) if value.contains(':') => Ok(value),
        _ => Err(ZcapError::malformed(format!(
            "'{field}' must be a string containing a scheme separator"
        ))),
    }
}

fn validate_allowed_action(actions: &Value) -> Result<()> {
    let valid = match actions {
        Value::String(action) => !action.is_empty(),
        Value::Array(list) => {
            !list.is_empty()
                && list
                    .iter()
                    .all(|a| a.as_str().is_some_and(|a| !a.is_empty()))
        }
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(ZcapError::malformed(
            "'allowedAction' must be a non-empty string or a non-empty list of strings",
        ))
    }
}

impl DelegatedCapability {
    /// Apply the structural rules to an already typed document.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("id", &self.id),
            ("invocationTarget", &self.invocation_target),
            ("parentCapability", &self.parent_capability),
        ] {
            if !value.contains(':') {
                return Err(ZcapError::malformed(format!(
                    "'{field}' must be a string containing a scheme separator"
                )));
            }
        }
        if self.expires_at().is_none() {
            return Err(ZcapError::malformed(
                "delegated capability must have a parseable 'expires' timestamp",
            ));
        }
        if !self
            .proof
            .iter()
            .any(|p| time::parse_timestamp(&p.created).is_some())
        {
            return Err(ZcapError::malformed(
                "delegated capability must carry a proof with a parseable 'created' timestamp",
            ));
        }
        if self.allowed_action.iter().any(String::is_empty) {
            return Err(ZcapError::malformed(
                "'allowedAction' must be a non-empty string or a non-empty list of strings",
            ));
        }
        Ok(())
    }
}

impl RootCapability {
    /// Apply the structural rules for the form this root was supplied in.
    pub fn validate(&self) -> Result<()> {
        if self.is_document() {
            if !self.id().contains(':') || !self.invocation_target().contains(':') {
                return Err(ZcapError::malformed(
                    "root capability 'id' and 'invocationTarget' must contain a scheme separator",
                ));
            }
            return Ok(());
        }
        let root = validate_root_id(self.id())?;
        if root.invocation_target() != self.invocation_target() {
            return Err(ZcapError::malformed(
                "root capability id does not encode its invocation target",
            ));
        }
        Ok(())
    }
}

impl CapabilityRef {
    /// Apply the structural rules to a typed capability.
    pub fn validate(&self) -> Result<()> {
        match self {
            CapabilityRef::Root(root) => root.validate(),
            CapabilityRef::Delegated(cap) => cap.validate(),
        }
    }
}
