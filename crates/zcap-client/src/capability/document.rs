//! Capability documents.
//!
//! A capability is either an implicit root (named by a derived URI, never
//! signed) or a delegated document carrying a proof. Delegated documents are
//! immutable once signed: the proof covers every field.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::error::Result;
use crate::time;

use super::id;

/// JSON-LD context of capability documents.
pub const ZCAP_CONTEXT: &str = "https://w3id.org/zcap/v1";

/// JSON-LD context of the Ed25519Signature2020 suite.
pub const ED25519_2020_CONTEXT: &str = "https://w3id.org/security/suites/ed25519-2020/v1";

/// Proof purpose attached to delegated capabilities.
pub const CAPABILITY_DELEGATION_PURPOSE: &str = "capabilityDelegation";

/// Proof attached to a delegated capability by the signing suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub proof_type: String,
    /// RFC 3339 creation time.
    #[serde(default)]
    pub created: String,
    /// Empty when a received proof omits it; proof verification then fails.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub verification_method: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub proof_purpose: String,
    /// Ancestors from the root to the parent. Links are identifiers, or an
    /// embedded parent document in chains produced by some suites.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub capability_chain: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_value: Option<String>,
    /// Suite-specific fields this crate does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Proof {
    /// Identifiers of the capability chain, resolving embedded links to their `id`.
    pub fn chain_ids(&self) -> Vec<String> {
        self.capability_chain
            .iter()
            .filter_map(|link| match link {
                Value::String(id) => Some(id.clone()),
                Value::Object(doc) => doc.get("id").and_then(Value::as_str).map(str::to_string),
                _ => None,
            })
            .collect()
    }
}

/// A delegated capability document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedCapability {
    #[serde(rename = "@context", default, skip_serializing_if = "Value::is_null")]
    pub context: Value,
    pub id: String,
    /// The party allowed to invoke or further delegate this capability.
    #[serde(default)]
    pub controller: String,
    pub parent_capability: String,
    pub invocation_target: String,
    /// Empty means every action the parent allows.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub allowed_action: Vec<String>,
    /// RFC 3339 expiry.
    pub expires: String,
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many",
        serialize_with = "serialize_proofs"
    )]
    pub proof: Vec<Proof>,
}

impl DelegatedCapability {
    /// The parsed expiry, if it is a valid timestamp.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        time::parse_timestamp(&self.expires)
    }

    /// The proof establishing this capability's delegation.
    pub fn delegation_proof(&self) -> Option<&Proof> {
        self.proof
            .iter()
            .find(|p| p.proof_purpose == CAPABILITY_DELEGATION_PURPOSE)
            .or_else(|| self.proof.first())
    }

    /// Ancestor identifiers recorded in the delegation proof.
    pub fn capability_chain(&self) -> Vec<String> {
        self.delegation_proof()
            .map(Proof::chain_ids)
            .unwrap_or_default()
    }

    /// Returns `true` when the delegation proof has been attached.
    pub fn is_signed(&self) -> bool {
        self.delegation_proof().is_some()
    }
}

/// An implicit root capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootCapability {
    id: String,
    invocation_target: String,
    /// Supplied as a `{id, invocationTarget}` object rather than an id string.
    document: bool,
}

impl RootCapability {
    /// The root capability over an absolute target URL.
    pub fn for_target(url: &str) -> Result<Self> {
        Ok(Self {
            id: id::root_capability_uri(url)?,
            invocation_target: url.to_string(),
            document: false,
        })
    }

    /// Rebuild a root capability from its identifier.
    pub fn from_id(uri: &str) -> Result<Self> {
        let target = id::decode_root_capability_uri(uri)?;
        Ok(Self {
            id: uri.to_string(),
            invocation_target: target,
            document: false,
        })
    }

    /// A root capability supplied as a `{id, invocationTarget}` object.
    pub(crate) fn from_document(id: String, invocation_target: String) -> Self {
        Self {
            id,
            invocation_target,
            document: true,
        }
    }

    pub(crate) fn is_document(&self) -> bool {
        self.document
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn invocation_target(&self) -> &str {
        &self.invocation_target
    }
}

/// A capability presented to the engine: a root reference or a delegated
/// document.
#[derive(Debug, Clone, PartialEq)]
pub enum CapabilityRef {
    Root(RootCapability),
    Delegated(Box<DelegatedCapability>),
}

impl CapabilityRef {
    /// The root capability over an absolute target URL.
    pub fn root(url: &str) -> Result<Self> {
        RootCapability::for_target(url).map(CapabilityRef::Root)
    }

    pub fn id(&self) -> &str {
        match self {
            CapabilityRef::Root(root) => root.id(),
            CapabilityRef::Delegated(cap) => &cap.id,
        }
    }

    pub fn invocation_target(&self) -> &str {
        match self {
            CapabilityRef::Root(root) => root.invocation_target(),
            CapabilityRef::Delegated(cap) => &cap.invocation_target,
        }
    }

    /// Explicitly allowed actions; empty means unrestricted.
    pub fn allowed_actions(&self) -> &[String] {
        match self {
            CapabilityRef::Root(_) => &[],
            CapabilityRef::Delegated(cap) => &cap.allowed_action,
        }
    }

    /// Expiry of a delegated capability. Roots never expire.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CapabilityRef::Root(_) => None,
            CapabilityRef::Delegated(cap) => cap.expires_at(),
        }
    }

    /// Ancestors of this capability; empty for a root.
    pub fn capability_chain(&self) -> Vec<String> {
        match self {
            CapabilityRef::Root(_) => Vec::new(),
            CapabilityRef::Delegated(cap) => cap.capability_chain(),
        }
    }

    /// Number of delegation steps between the root and this capability.
    pub fn chain_len(&self) -> usize {
        self.capability_chain().len()
    }

    pub fn is_root(&self) -> bool {
        matches!(self, CapabilityRef::Root(_))
    }

    pub fn as_delegated(&self) -> Option<&DelegatedCapability> {
        match self {
            CapabilityRef::Root(_) => None,
            CapabilityRef::Delegated(cap) => Some(cap),
        }
    }
}

impl From<RootCapability> for CapabilityRef {
    fn from(root: RootCapability) -> Self {
        CapabilityRef::Root(root)
    }
}

impl From<DelegatedCapability> for CapabilityRef {
    fn from(cap: DelegatedCapability) -> Self {
        CapabilityRef::Delegated(Box::new(cap))
    }
}

impl TryFrom<&str> for CapabilityRef {
    type Error = crate::error::ZcapError;

    fn try_from(value: &str) -> Result<Self> {
        super::validate::validate_capability(&Value::String(value.to_string()))
    }
}

impl TryFrom<Value> for CapabilityRef {
    type Error = crate::error::ZcapError;

    fn try_from(value: Value) -> Result<Self> {
        super::validate::validate_capability(&value)
    }
}

impl Serialize for CapabilityRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            CapabilityRef::Root(root) => serializer.serialize_str(root.id()),
            CapabilityRef::Delegated(cap) => cap.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for CapabilityRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        super::validate::validate_capability(&value).map_err(serde::de::Error::custom)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

fn one_or_many<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    })
}

fn serialize_proofs<S: Serializer>(
    proofs: &[Proof],
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    match proofs {
        [single] => single.serialize(serializer),
        many => many.serialize(serializer),
    }
}
