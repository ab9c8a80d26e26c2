//! Stress test: build a delegation chain of depth 50 and invoke its tip.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use zcap_client::{
    CapabilityRef, DelegationBuilder, Ed25519Signer, Ed25519Suite, Headers, HttpRequest,
    HttpResponse, RequestOptions, Signer, Transport, ZcapClient,
};

const ITEMS: &str = "https://zcap.example/items";

#[derive(Default)]
struct Sink {
    sent: Mutex<Vec<HttpRequest>>,
}

#[async_trait]
impl Transport for Sink {
    async fn send(&self, request: HttpRequest) -> zcap_client::Result<HttpResponse> {
        self.sent.lock().unwrap().push(request);
        Ok(HttpResponse {
            status: 200,
            headers: Headers::new(),
            body: Vec::new(),
        })
    }
}

#[tokio::test]
async fn stress_delegation_chain_depth_50() {
    let chain_depth = 50;
    let sink = Arc::new(Sink::default());

    // One signer per hop; hop i signs the delegation to hop i + 1.
    let signers: Vec<Arc<Ed25519Signer>> = (0..=chain_depth)
        .map(|_| Arc::new(Ed25519Signer::generate()))
        .collect();
    let clients: Vec<ZcapClient> = signers
        .iter()
        .map(|signer| {
            ZcapClient::builder()
                .transport(sink.clone())
                .signer(signer.clone())
                .build()
                .unwrap()
        })
        .collect();

    let mut chain = Vec::with_capacity(chain_depth);
    let first = clients[0]
        .delegate(DelegationBuilder::new(signers[1].controller()).invocation_target(ITEMS))
        .await
        .expect("root delegation should succeed");
    chain.push(first);

    for i in 1..chain_depth {
        let parent = chain.last().unwrap().clone();
        // Narrow the target every tenth hop.
        let mut builder =
            DelegationBuilder::new(signers[i + 1].controller()).capability(parent.clone());
        if i % 10 == 0 {
            builder = builder.invocation_target(format!("{}/{i}", parent.invocation_target));
        }
        let next = clients[i]
            .delegate(builder)
            .await
            .unwrap_or_else(|e| panic!("delegation {i} should succeed: {e}"));
        chain.push(next);
    }

    assert_eq!(chain.len(), chain_depth);

    let suite = Ed25519Suite::new();
    for (depth, cap) in chain.iter().enumerate() {
        assert_eq!(CapabilityRef::from(cap.clone()).chain_len(), depth + 1);
        suite
            .verify_delegation_proof(cap)
            .unwrap_or_else(|e| panic!("proof at depth {depth} should verify: {e}"));
        if depth > 0 {
            assert_eq!(cap.parent_capability, chain[depth - 1].id);
            assert!(cap.invocation_target.starts_with(&chain[depth - 1].invocation_target));
            assert!(cap.expires_at() <= chain[depth - 1].expires_at());
        }
    }

    let tip = chain.last().unwrap().clone();
    assert_eq!(tip.invocation_target, format!("{ITEMS}/10/20/30/40"));
    let chain_ids = tip.capability_chain();
    assert_eq!(chain_ids.len(), chain_depth);
    assert!(chain_ids[0].starts_with("urn:zcap:root:"));

    let response = clients[chain_depth]
        .read(RequestOptions::new().capability(tip))
        .await
        .expect("tip should be invocable");
    assert_eq!(response.status, 200);
    assert_eq!(sink.sent.lock().unwrap().len(), 1);
}
