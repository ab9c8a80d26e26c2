//! Concurrency test: parallel delegation and invocation through one client.
//!
//! Validates that a shared client is safe to use from many tasks and that
//! every delegation gets its own identifier.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use zcap_client::{
    DelegationBuilder, Ed25519Signer, Ed25519Suite, Headers, HttpRequest, HttpResponse,
    RequestOptions, Transport, ZcapClient,
};

const ITEMS: &str = "https://zcap.example/items";

#[derive(Default)]
struct Counter {
    sent: AtomicUsize,
}

#[async_trait]
impl Transport for Counter {
    async fn send(&self, request: HttpRequest) -> zcap_client::Result<HttpResponse> {
        assert!(request.headers.contains_key("authorization"));
        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(HttpResponse {
            status: 200,
            headers: Headers::new(),
            body: Vec::new(),
        })
    }
}

fn shared_client(counter: Arc<Counter>) -> ZcapClient {
    ZcapClient::builder()
        .transport(counter)
        .signer(Arc::new(Ed25519Signer::generate()))
        .build()
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stress_50_tasks_delegating_concurrently() {
    let client = shared_client(Arc::new(Counter::default()));

    let mut handles = Vec::new();
    for task_id in 0..50 {
        let client = client.clone();
        handles.push(tokio::spawn(async move {
            let mut caps = Vec::new();
            for i in 0..20 {
                let cap = client
                    .delegate(
                        DelegationBuilder::new(format!("did:key:task{task_id}"))
                            .invocation_target(format!("{ITEMS}/{task_id}/{i}")),
                    )
                    .await
                    .expect("delegation should succeed");
                caps.push(cap);
            }
            caps
        }));
    }

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.await.unwrap());
    }
    assert_eq!(all.len(), 1_000);

    let ids: HashSet<&str> = all.iter().map(|cap| cap.id.as_str()).collect();
    assert_eq!(ids.len(), 1_000, "every delegation must get a fresh id");

    let suite = Ed25519Suite::new();
    for cap in &all {
        assert!(suite.verify_delegation_proof(cap).is_ok());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stress_concurrent_invocations() {
    let counter = Arc::new(Counter::default());
    let client = shared_client(counter.clone());
    let cap = client
        .delegate(DelegationBuilder::new("did:key:abc").invocation_target(ITEMS))
        .await
        .unwrap();

    let mut handles = Vec::new();
    for i in 0..200 {
        let client = client.clone();
        let cap = cap.clone();
        handles.push(tokio::spawn(async move {
            client
                .read(
                    RequestOptions::new()
                        .url(format!("{ITEMS}/{i}"))
                        .capability(cap),
                )
                .await
        }));
    }
    for handle in handles {
        let response = handle.await.unwrap().expect("invocation should succeed");
        assert_eq!(response.status, 200);
    }
    assert_eq!(counter.sent.load(Ordering::SeqCst), 200);
}
