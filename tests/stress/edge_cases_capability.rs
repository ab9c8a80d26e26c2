//! Edge case tests: malformed capabilities and unusual inputs.
//!
//! Everything here must fail with a typed error rather than panic, and
//! nothing malformed may ever reach the transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use zcap_client::{
    root_capability_uri, validate_capability, CapabilityRef, DelegationBuilder, Ed25519Signer,
    Headers, HttpRequest, HttpResponse, RequestOptions, Transport, ZcapClient, ZcapError,
};

const ROOT_ID: &str = "urn:zcap:root:https%3A%2F%2Fzcap.example%2Fitems";

#[derive(Default)]
struct Counter(AtomicUsize);

#[async_trait]
impl Transport for Counter {
    async fn send(&self, _request: HttpRequest) -> zcap_client::Result<HttpResponse> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse {
            status: 200,
            headers: Headers::new(),
            body: Vec::new(),
        })
    }
}

fn delegated_json() -> Value {
    json!({
        "@context": "https://w3id.org/zcap/v1",
        "id": "urn:uuid:6e1f5a0c-9a0e-4d7e-8f4e-2b9d6f0c1a22",
        "controller": "did:key:abc",
        "parentCapability": ROOT_ID,
        "invocationTarget": "https://zcap.example/items",
        "expires": "2026-10-16T12:05:00Z",
        "proof": {
            "type": "Ed25519Signature2020",
            "created": "2026-10-16T12:00:00Z",
            "verificationMethod": "did:key:root#root",
            "proofPurpose": "capabilityDelegation",
            "capabilityChain": [ROOT_ID],
            "proofValue": "z1"
        }
    })
}

fn assert_malformed(value: Value) {
    match validate_capability(&value) {
        Err(ZcapError::MalformedCapability { .. }) => {}
        other => panic!("expected MalformedCapability for {value}, got {other:?}"),
    }
}

#[test]
fn edge_valid_shapes_accepted() {
    let root = validate_capability(&json!(ROOT_ID)).unwrap();
    assert!(root.is_root());
    assert_eq!(root.invocation_target(), "https://zcap.example/items");

    let doc_root =
        validate_capability(&json!({"id": ROOT_ID, "invocationTarget": "https://zcap.example/items"}))
            .unwrap();
    assert!(doc_root.is_root());

    let delegated = validate_capability(&delegated_json()).unwrap();
    assert_eq!(delegated.chain_len(), 1);

    let mut proofs_as_list = delegated_json();
    proofs_as_list["proof"] = json!([proofs_as_list["proof"].clone()]);
    assert!(validate_capability(&proofs_as_list).is_ok());
}

#[test]
fn edge_bad_root_strings() {
    assert_malformed(json!(""));
    assert_malformed(json!("https://zcap.example/items"));
    assert_malformed(json!("urn:zcap:root:not-a-url"));
    assert_malformed(json!("urn:zcap:root:http%3A%2F%2Fzcap.example%2Fitems"));
    assert_malformed(json!("urn:zcap:root:%FF%FE"));
}

#[test]
fn edge_bad_document_fields() {
    assert_malformed(json!(42));
    assert_malformed(json!(null));
    assert_malformed(json!([ROOT_ID]));
    assert_malformed(json!({}));

    for (field, bad) in [
        ("id", json!("no-separator")),
        ("id", json!(7)),
        ("invocationTarget", json!("items")),
        ("parentCapability", json!({"id": ROOT_ID})),
        ("parentCapability", json!("parent")),
        ("expires", json!("next week")),
        ("expires", json!(1_700_000_000)),
        ("allowedAction", json!("")),
        ("allowedAction", json!([])),
        ("allowedAction", json!(["read", 3])),
    ] {
        let mut doc = delegated_json();
        doc[field] = bad;
        assert_malformed(doc);
    }
}

#[test]
fn edge_missing_or_undated_proof() {
    let mut no_proof = delegated_json();
    no_proof.as_object_mut().unwrap().remove("proof");
    assert_malformed(no_proof);

    let mut undated = delegated_json();
    undated["proof"]["created"] = json!("whenever");
    assert_malformed(undated);

    let mut empty_list = delegated_json();
    empty_list["proof"] = json!([]);
    assert_malformed(empty_list);
}

#[test]
fn edge_root_document_with_expires() {
    assert_malformed(json!({
        "id": ROOT_ID,
        "invocationTarget": "https://zcap.example/items",
        "expires": "2026-10-16T12:05:00Z"
    }));
}

#[test]
fn edge_root_uri_of_relative_target() {
    for url in ["", "/items", "items/123", "://nothing", "1http://x"] {
        assert!(
            matches!(root_capability_uri(url), Err(ZcapError::InvalidArgument(_))),
            "{url:?} should be rejected"
        );
    }
}

#[test]
fn edge_capability_ref_deserialize() {
    let cap: CapabilityRef = serde_json::from_value(delegated_json()).unwrap();
    assert!(!cap.is_root());
    assert!(serde_json::from_value::<CapabilityRef>(json!("nope")).is_err());
}

#[tokio::test]
async fn edge_malformed_capability_never_sent() {
    let counter = Arc::new(Counter::default());
    let client = ZcapClient::builder()
        .transport(counter.clone())
        .signer(Arc::new(Ed25519Signer::generate()))
        .build()
        .unwrap();

    let mut cap: zcap_client::DelegatedCapability =
        serde_json::from_value(delegated_json()).unwrap();
    cap.proof.clear();

    let err = client
        .read(RequestOptions::new().capability(cap.clone()))
        .await
        .unwrap_err();
    assert!(matches!(err, ZcapError::MalformedCapability { .. }));

    let err = client
        .delegate(DelegationBuilder::new("did:key:xyz").capability(cap))
        .await
        .unwrap_err();
    assert!(matches!(err, ZcapError::MalformedCapability { .. }));

    assert_eq!(counter.0.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn edge_blank_action_and_bad_controller() {
    let client = ZcapClient::builder()
        .transport(Arc::new(Counter::default()))
        .signer(Arc::new(Ed25519Signer::generate()))
        .build()
        .unwrap();

    let err = client
        .delegate(
            DelegationBuilder::new("did:key:abc")
                .invocation_target("https://zcap.example/items")
                .allowed_actions(vec!["read", " "]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ZcapError::InvalidArgument(_)));

    let err = client
        .delegate(DelegationBuilder::new("alice").invocation_target("https://zcap.example/items"))
        .await
        .unwrap_err();
    assert!(matches!(err, ZcapError::InvalidArgument(_)));
}
