//! Delegation engine.
//!
//! Builds a delegated capability from a parent (a root target URL or an
//! existing capability), narrows it, and hands it to the signing suite.
//!
//! Authority only shrinks along a chain: the new invocation target must sit
//! at or below the parent's, the allowed actions must be a subset of a
//! restricted parent's, and the expiry may not outlive a bounded parent.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::capability::{
    actions_within, fresh_capability_uri, is_absolute_uri, target_covers, AllowedActions,
    CapabilityRef, DelegatedCapability, ZCAP_CONTEXT,
};
use crate::error::{Result, SignerRole, ZcapError};
use crate::suite::{DelegationPurpose, Signer, SigningSuite};
use crate::time;

/// Requested expiry of a delegated capability.
#[derive(Debug, Clone, PartialEq)]
pub enum Expires {
    At(DateTime<Utc>),
    /// An RFC 3339 timestamp, parsed when the delegation is built.
    Text(String),
}

impl Expires {
    fn resolve(&self) -> Result<DateTime<Utc>> {
        match self {
            Expires::At(at) => Ok(*at),
            Expires::Text(text) => time::parse_timestamp(text).ok_or_else(|| {
                ZcapError::invalid(format!("expires is not a valid timestamp: '{text}'"))
            }),
        }
    }
}

impl From<DateTime<Utc>> for Expires {
    fn from(at: DateTime<Utc>) -> Self {
        Expires::At(at)
    }
}

impl From<&str> for Expires {
    fn from(text: &str) -> Self {
        Expires::Text(text.to_string())
    }
}

impl From<String> for Expires {
    fn from(text: String) -> Self {
        Expires::Text(text)
    }
}

/// Builder for delegating a capability to a new controller.
#[derive(Debug, Clone)]
pub struct DelegationBuilder {
    controller: String,
    capability: Option<CapabilityRef>,
    invocation_target: Option<String>,
    expires: Option<Expires>,
    allowed_actions: AllowedActions,
}

/// A delegation that passed every check and only needs a proof.
#[derive(Debug, Clone)]
pub struct UnsignedDelegation {
    /// The capability delegated from.
    pub parent: CapabilityRef,
    /// The document to sign; `proof` is empty.
    pub document: DelegatedCapability,
    /// Ancestors of `document`, root first, parent last.
    pub capability_chain: Vec<String>,
}

impl DelegationBuilder {
    /// Start a delegation to `controller`.
    pub fn new(controller: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            capability: None,
            invocation_target: None,
            expires: None,
            allowed_actions: AllowedActions::unrestricted(),
        }
    }

    /// Delegate from an existing capability.
    pub fn capability(mut self, capability: impl Into<CapabilityRef>) -> Self {
        self.capability = Some(capability.into());
        self
    }

    /// Set the invocation target. Without a parent capability this names
    /// the root capability being delegated.
    pub fn invocation_target(mut self, target: impl Into<String>) -> Self {
        self.invocation_target = Some(target.into());
        self
    }

    pub fn expires(mut self, expires: impl Into<Expires>) -> Self {
        self.expires = Some(expires.into());
        self
    }

    pub fn allowed_actions(mut self, actions: impl Into<AllowedActions>) -> Self {
        self.allowed_actions = actions.into();
        self
    }

    /// Run every check and assemble the unsigned document as of `now`.
    pub fn build(self, now: DateTime<Utc>) -> Result<UnsignedDelegation> {
        if !is_absolute_uri(&self.controller) {
            return Err(ZcapError::invalid(format!(
                "controller must be an absolute URI: '{}'",
                self.controller
            )));
        }

        let parent = match (self.capability, &self.invocation_target) {
            (Some(capability), _) => {
                capability.validate()?;
                capability
            }
            (None, Some(target)) => CapabilityRef::root(target)?,
            (None, None) => {
                return Err(ZcapError::invalid(
                    "at least one of capability/invocationTarget required",
                ))
            }
        };

        let invocation_target = self
            .invocation_target
            .unwrap_or_else(|| parent.invocation_target().to_string());
        if !is_absolute_uri(&invocation_target) {
            return Err(ZcapError::invalid(format!(
                "invocation target must be an absolute URI: '{invocation_target}'"
            )));
        }
        if !target_covers(parent.invocation_target(), &invocation_target) {
            return Err(ZcapError::ScopeViolation {
                target: parent.invocation_target().to_string(),
                url: invocation_target,
            });
        }

        let allowed_action = self.allowed_actions.normalize()?;
        if !actions_within(parent.allowed_actions(), &allowed_action) {
            return Err(ZcapError::invalid(format!(
                "allowed actions {allowed_action:?} exceed the parent's {:?}",
                parent.allowed_actions()
            )));
        }

        let parent_expires = parent.expires_at();
        if let Some(parent_expires) = parent_expires {
            if parent_expires <= now {
                return Err(ZcapError::invalid(format!(
                    "parent capability expired at {}",
                    time::format_timestamp(parent_expires)
                )));
            }
        }
        let expires = match self.expires {
            Some(requested) => {
                let at = requested.resolve()?;
                if parent_expires.is_some_and(|parent_expires| at > parent_expires) {
                    return Err(ZcapError::invalid(format!(
                        "expires {} is later than the parent's {}",
                        time::format_timestamp(at),
                        parent.as_delegated().map_or("", |p| p.expires.as_str())
                    )));
                }
                at
            }
            None => {
                let default = time::default_expiry(now);
                parent_expires.map_or(default, |parent_expires| default.min(parent_expires))
            }
        };

        let capability_chain = match &parent {
            CapabilityRef::Root(root) => vec![root.id().to_string()],
            CapabilityRef::Delegated(cap) => {
                let mut chain = cap.capability_chain();
                chain.push(cap.id.clone());
                chain
            }
        };

        let document = DelegatedCapability {
            context: Value::from(vec![ZCAP_CONTEXT]),
            id: fresh_capability_uri(),
            controller: self.controller,
            parent_capability: parent.id().to_string(),
            invocation_target,
            allowed_action,
            expires: time::format_timestamp(expires),
            proof: Vec::new(),
        };

        Ok(UnsignedDelegation {
            parent,
            document,
            capability_chain,
        })
    }
}

/// Build, check and sign a delegation.
pub async fn delegate(
    builder: DelegationBuilder,
    suite: &dyn SigningSuite,
    signer: Option<&dyn Signer>,
) -> Result<DelegatedCapability> {
    let UnsignedDelegation {
        parent,
        document,
        capability_chain,
    } = builder.build(time::now())?;
    let signer = signer.ok_or(ZcapError::MissingSigner(SignerRole::Delegation))?;

    log::debug!(
        "delegating {} to {} (parent {}, chain length {})",
        document.invocation_target,
        document.controller,
        parent.id(),
        capability_chain.len()
    );

    let id = document.id.clone();
    let purpose = DelegationPurpose {
        parent: &parent,
        capability_chain,
    };
    let signed = suite.sign_delegation(document, signer, &purpose).await?;
    if signed.id != id || !signed.is_signed() {
        return Err(ZcapError::SigningFailure(
            "signing suite did not return a signed copy of the delegation".into(),
        ));
    }
    Ok(signed)
}
