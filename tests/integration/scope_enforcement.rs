//! Integration test: capabilities are only invoked inside their target.
//!
//! Covers the confused-deputy check at invocation time and attenuation at
//! delegation time.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};

use zcap_client::{
    CapabilityRef, DelegatedCapability, DelegationBuilder, Ed25519Signer, Headers, HttpRequest,
    HttpResponse, RequestOptions, SignerRole, Transport, ZcapClient, ZcapError,
};

const ITEMS: &str = "https://zcap.example/items";

#[derive(Default)]
struct CountingTransport {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Transport for CountingTransport {
    async fn send(&self, request: HttpRequest) -> zcap_client::Result<HttpResponse> {
        self.sent.lock().unwrap().push(request.url);
        Ok(HttpResponse {
            status: 204,
            headers: Headers::new(),
            body: Vec::new(),
        })
    }
}

async fn setup() -> (ZcapClient, Arc<CountingTransport>, DelegatedCapability) {
    let transport = Arc::new(CountingTransport::default());
    let client = ZcapClient::builder()
        .transport(transport.clone())
        .signer(Arc::new(Ed25519Signer::generate()))
        .build()
        .unwrap();
    let capability = client
        .delegate(DelegationBuilder::new("did:key:abc").invocation_target(ITEMS))
        .await
        .unwrap();
    (client, transport, capability)
}

#[tokio::test]
async fn request_inside_target_succeeds() {
    let (client, transport, capability) = setup().await;

    for url in [ITEMS, "https://zcap.example/items/123", "https://zcap.example/items/a/b"] {
        let response = client
            .request(RequestOptions::new().url(url).capability(capability.clone()))
            .await
            .unwrap_or_else(|e| panic!("{url} should be allowed: {e}"));
        assert_eq!(response.status, 204);
    }
    assert_eq!(transport.sent.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn request_outside_target_is_scope_violation() {
    let (client, transport, capability) = setup().await;

    for url in [
        "https://zcap.example/other",
        "https://zcap.example/items-archive",
        "https://zcap.example/",
        "https://evil.example/items/123",
    ] {
        let err = client
            .request(RequestOptions::new().url(url).capability(capability.clone()))
            .await
            .unwrap_err();
        match err {
            ZcapError::ScopeViolation { target, url: got } => {
                assert_eq!(target, ITEMS);
                assert_eq!(got, url);
            }
            other => panic!("expected ScopeViolation for {url}, got {other:?}"),
        }
    }
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn bare_request_is_invalid_argument() {
    let (client, transport, _) = setup().await;
    let err = client.request(RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, ZcapError::InvalidArgument(_)));
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn capability_without_url_targets_itself() {
    let (client, transport, capability) = setup().await;
    client
        .read(RequestOptions::new().capability(capability))
        .await
        .unwrap();
    assert_eq!(transport.sent.lock().unwrap().as_slice(), [ITEMS.to_string()]);
}

#[tokio::test]
async fn root_capability_reference_is_scoped_too() {
    let (client, _, _) = setup().await;
    let root = CapabilityRef::root(ITEMS).unwrap();

    assert!(client
        .read(
            RequestOptions::new()
                .url("https://zcap.example/items/9")
                .capability(root.clone())
        )
        .await
        .is_ok());
    assert!(matches!(
        client
            .read(RequestOptions::new().url("https://zcap.example/x").capability(root))
            .await,
        Err(ZcapError::ScopeViolation { .. })
    ));
}

#[tokio::test]
async fn delegation_cannot_widen_target() {
    let (client, _, capability) = setup().await;
    let err = client
        .delegate(
            DelegationBuilder::new("did:key:xyz")
                .capability(capability)
                .invocation_target("https://zcap.example/other"),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ZcapError::ScopeViolation { .. }));
}

#[tokio::test]
async fn delegation_cannot_outlive_parent() {
    let (client, _, capability) = setup().await;
    let err = client
        .delegate(
            DelegationBuilder::new("did:key:xyz")
                .capability(capability)
                .expires(Utc::now() + Duration::hours(1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ZcapError::InvalidArgument(_)));
}

#[tokio::test]
async fn missing_signers_are_reported_by_role() {
    let client = ZcapClient::builder()
        .transport(Arc::new(CountingTransport::default()))
        .build()
        .unwrap();

    let err = client
        .delegate(DelegationBuilder::new("did:key:abc").invocation_target(ITEMS))
        .await
        .unwrap_err();
    assert!(matches!(err, ZcapError::MissingSigner(SignerRole::Delegation)));

    let err = client
        .read(RequestOptions::new().url(ITEMS))
        .await
        .unwrap_err();
    assert!(matches!(err, ZcapError::MissingSigner(SignerRole::Invocation)));
}

#[tokio::test]
async fn dot_segments_cannot_escape_target() {
    let (client, transport, capability) = setup().await;
    let root = CapabilityRef::root(ITEMS).unwrap();

    for url in [
        "https://zcap.example/items/../admin",
        "https://zcap.example/items/%2e%2e/admin",
        "https://zcap.example/items/%2E%2e/admin",
        "https://zcap.example/items/123/../../admin",
    ] {
        for cap in [CapabilityRef::from(capability.clone()), root.clone()] {
            let err = client
                .request(RequestOptions::new().url(url).capability(cap))
                .await
                .unwrap_err();
            match err {
                ZcapError::ScopeViolation { target, url: got } => {
                    assert_eq!(target, ITEMS);
                    assert_eq!(got, "https://zcap.example/admin");
                }
                other => panic!("expected ScopeViolation for {url}, got {other:?}"),
            }
        }
    }
    assert!(transport.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn normalized_url_is_what_gets_sent() {
    let (client, transport, capability) = setup().await;
    client
        .read(
            RequestOptions::new()
                .url("https://ZCAP.example:443/items/x/../123")
                .capability(capability),
        )
        .await
        .unwrap();
    assert_eq!(
        transport.sent.lock().unwrap().as_slice(),
        ["https://zcap.example/items/123".to_string()]
    );
}

#[tokio::test]
async fn trailing_slash_target_covers_children_only() {
    let (client, transport, _) = setup().await;
    let capability = client
        .delegate(DelegationBuilder::new("did:key:abc").invocation_target("https://zcap.example/items/"))
        .await
        .unwrap();

    client
        .read(
            RequestOptions::new()
                .url("https://zcap.example/items/123")
                .capability(capability.clone()),
        )
        .await
        .unwrap();
    for url in ["https://zcap.example/items", "https://zcap.example/items2"] {
        let err = client
            .read(RequestOptions::new().url(url).capability(capability.clone()))
            .await
            .unwrap_err();
        assert!(matches!(err, ZcapError::ScopeViolation { .. }), "{url}");
    }
    assert_eq!(transport.sent.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn delegation_cannot_widen_target_with_dot_segments() {
    let (client, _, capability) = setup().await;
    for target in [
        "https://zcap.example/items/../admin",
        "https://zcap.example/items/%2e%2e/admin",
    ] {
        let err = client
            .delegate(
                DelegationBuilder::new("did:key:xyz")
                    .capability(capability.clone())
                    .invocation_target(target),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ZcapError::ScopeViolation { .. }), "{target}");
    }
}
