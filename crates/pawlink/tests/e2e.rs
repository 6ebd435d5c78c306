//! E2E test suite for the signaling relay
//!
//! Binds the real axum router on an ephemeral port and drives it over HTTP
//! the way the base station and remote viewer pages do.
//!
//! Run: `cargo test -p pawlink --test e2e`

use std::net::SocketAddr;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

use pawlink::relay::{AnswerPolicy, RelayConfig, SignalingRelay};

// ── Helpers ──────────────────────────────────────────────────────────

/// Start a web server on an ephemeral port, return the bound address.
async fn start_test_server(relay: SignalingRelay) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, pawlink::web::router(relay)).await.unwrap();
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    addr
}

struct Peer {
    client: reqwest::Client,
    base: String,
}

impl Peer {
    fn new(addr: SocketAddr) -> Self {
        Self {
            client: reqwest::Client::new(),
            base: format!("http://{}", addr),
        }
    }

    async fn get(&self, path_and_query: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .get(format!("{}{}", self.base, path_and_query))
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn post(&self, path_and_query: &str, body: Value) -> (StatusCode, Value) {
        let resp = self
            .client
            .post(format!("{}{}", self.base, path_and_query))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }

    async fn delete(&self, path_and_query: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .delete(format!("{}{}", self.base, path_and_query))
            .send()
            .await
            .unwrap();
        let status = resp.status();
        (status, resp.json().await.unwrap())
    }
}

fn offer() -> Value {
    json!({ "type": "offer", "sdp": "v=0\r\no=- 1 2 IN IP4 127.0.0.1\r\n" })
}

fn answer() -> Value {
    json!({ "type": "answer", "sdp": "v=0\r\no=- 3 4 IN IP4 127.0.0.1\r\n" })
}

fn candidate(name: &str) -> Value {
    json!({ "candidate": name, "sdpMid": "0", "sdpMLineIndex": 0 })
}

// ═══════════════════════════════════════════════════════════════════════
// Rendezvous flow
// ═══════════════════════════════════════════════════════════════════════

/// Full base station / remote viewer exchange over HTTP.
#[tokio::test(flavor = "multi_thread")]
async fn full_rendezvous_flow() {
    let addr = start_test_server(SignalingRelay::default()).await;
    let base = Peer::new(addr);
    let viewer = Peer::new(addr);

    // Viewer polls before the base station is ready
    let (status, body) = viewer.get("/offer?id=ABC123").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Offer not found");

    let (status, body) = base.post("/offer?id=ABC123", json!({ "offer": offer() })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = viewer.get("/offer?id=ABC123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offer"], offer());

    let (status, _) = base.get("/answer?id=ABC123").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = viewer.post("/answer?id=ABC123", json!({ "answer": answer() })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = base.get("/answer?id=ABC123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], answer());

    // Trickle candidates both ways
    base.post(
        "/ice-candidate?id=ABC123&peerType=base-station",
        json!({ "candidate": candidate("c1") }),
    )
    .await;
    viewer
        .post(
            "/ice-candidate?id=ABC123&peerType=remote-viewer",
            json!({ "candidate": candidate("v1") }),
        )
        .await;

    let (status, body) = viewer.get("/ice-candidate?id=ABC123&peerType=remote-viewer").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "candidates": [candidate("c1")] }));

    let (_, body) = viewer.get("/ice-candidate?id=ABC123&peerType=remote-viewer").await;
    assert_eq!(body, json!({ "candidates": [] }));

    let (_, body) = base.get("/ice-candidate?id=ABC123&peerType=base-station").await;
    assert_eq!(body, json!({ "candidates": [candidate("v1")] }));

    // Teardown, twice
    let (status, body) = base.delete("/offer?id=ABC123").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
    let (status, _) = viewer.delete("/offer?id=ABC123").await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = viewer.get("/offer?id=ABC123").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Re-posting an offer wipes the previous answer and candidates.
#[tokio::test(flavor = "multi_thread")]
async fn new_offer_resets_over_http() {
    let addr = start_test_server(SignalingRelay::default()).await;
    let peer = Peer::new(addr);

    peer.post("/offer?id=R1", json!({ "offer": offer() })).await;
    peer.post("/answer?id=R1", json!({ "answer": answer() })).await;
    peer.post(
        "/ice-candidate?id=R1&peerType=remote-viewer",
        json!({ "candidate": candidate("stale") }),
    )
    .await;

    let second = json!({ "type": "offer", "sdp": "v=0 second" });
    peer.post("/offer?id=R1", json!({ "offer": second.clone() })).await;

    let (_, body) = peer.get("/offer?id=R1").await;
    assert_eq!(body["offer"], second);
    let (status, _) = peer.get("/answer?id=R1").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = peer.get("/ice-candidate?id=R1&peerType=base-station").await;
    assert_eq!(body, json!({ "candidates": [] }));

    let (_, body) = peer.get("/api/session?id=R1").await;
    assert_eq!(body["phase"], "offered");
    assert_eq!(body["epoch"], 2);
}

/// Same routes are reachable under the `/api/signaling` prefix.
#[tokio::test(flavor = "multi_thread")]
async fn nested_signaling_prefix() {
    let addr = start_test_server(SignalingRelay::default()).await;
    let peer = Peer::new(addr);

    let (status, _) = peer
        .post("/api/signaling/offer?id=N1", json!({ "offer": offer() }))
        .await;
    assert_eq!(status, StatusCode::OK);

    // Both prefixes share one store
    let (status, body) = peer.get("/offer?id=N1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["offer"], offer());

    let (status, body) = peer.delete("/api/signaling/offer?id=N1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

// ═══════════════════════════════════════════════════════════════════════
// Validation
// ═══════════════════════════════════════════════════════════════════════

/// Missing or empty parameters are 400s and change nothing.
#[tokio::test(flavor = "multi_thread")]
async fn missing_parameters_are_rejected() {
    let relay = SignalingRelay::default();
    let addr = start_test_server(relay.clone()).await;
    let peer = Peer::new(addr);

    let (status, body) = peer.get("/offer").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Connection ID is required");

    let (status, _) = peer.get("/offer?id=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = peer.post("/offer?id=V1", json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Connection ID and offer are required");

    for falsy in [json!(null), json!(""), json!(false), json!(0)] {
        let (status, body) = peer.post("/offer?id=V1", json!({ "offer": falsy })).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Connection ID and offer are required");
    }

    // Undecodable query strings still get a JSON error body
    let (status, body) = peer.get("/offer?id=a&id=b").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Connection ID is required");
    let (status, body) = peer
        .post(
            "/ice-candidate?id=a&id=b&peerType=base-station",
            json!({ "candidate": candidate("c1") }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
    let (status, body) = peer.get("/api/session?id=a&id=b").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let (status, _) = peer.post("/offer", json!({ "offer": offer() })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = peer.delete("/offer").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = peer.get("/answer").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = peer.post("/answer?id=V1", json!({ "sdp": "x" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Connection ID and answer are required");

    let (status, body) = peer.get("/ice-candidate?id=V1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Connection ID and peerType are required");

    let (status, body) = peer
        .post("/ice-candidate?id=V1&peerType=base-station", json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Connection ID, peerType, and candidate are required");

    // None of the rejected calls created a session
    assert_eq!(relay.sessions().await.unwrap(), 0);
    assert_eq!(relay.stats().offers_published, 0);
    assert_eq!(relay.stats().candidates_published, 0);
}

/// Unknown peerType values are validation errors, not a silent default.
#[tokio::test(flavor = "multi_thread")]
async fn unknown_peer_type_is_rejected() {
    let relay = SignalingRelay::default();
    let addr = start_test_server(relay.clone()).await;
    let peer = Peer::new(addr);

    let (status, body) = peer
        .post(
            "/ice-candidate?id=P1&peerType=camera",
            json!({ "candidate": candidate("c1") }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("camera"));
    assert_eq!(relay.stats().candidates_published, 0);
}

/// A body that is not JSON at all is a validation error.
#[tokio::test(flavor = "multi_thread")]
async fn malformed_body_is_rejected() {
    let addr = start_test_server(SignalingRelay::default()).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("http://{}/offer?id=M1", addr))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "Connection ID and offer are required");
}

// ═══════════════════════════════════════════════════════════════════════
// Answer policy and status
// ═══════════════════════════════════════════════════════════════════════

/// With the reject policy a second answer in one epoch is a 409.
#[tokio::test(flavor = "multi_thread")]
async fn second_answer_conflicts_under_reject_policy() {
    let relay = SignalingRelay::new(RelayConfig {
        answer_policy: AnswerPolicy::Reject,
        ..Default::default()
    });
    let addr = start_test_server(relay).await;
    let peer = Peer::new(addr);

    peer.post("/offer?id=A1", json!({ "offer": offer() })).await;
    let (status, _) = peer.post("/answer?id=A1", json!({ "answer": answer() })).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = peer
        .post("/answer?id=A1", json!({ "answer": { "type": "answer", "sdp": "late" } }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Answer already published for this offer");

    let (_, body) = peer.get("/answer?id=A1").await;
    assert_eq!(body["answer"], answer());
}

/// Status endpoint reflects traffic.
#[tokio::test(flavor = "multi_thread")]
async fn status_reports_counters() {
    let addr = start_test_server(SignalingRelay::default()).await;
    let peer = Peer::new(addr);

    let (status, body) = peer.get("/api/status").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sessions"], 0);
    assert_eq!(body["answer_policy"], "overwrite");

    peer.post("/offer?id=S1", json!({ "offer": offer() })).await;
    peer.post(
        "/ice-candidate?id=S1&peerType=base-station",
        json!({ "candidate": candidate("c1") }),
    )
    .await;
    peer.get("/ice-candidate?id=S1&peerType=remote-viewer").await;

    let (_, body) = peer.get("/api/status").await;
    assert_eq!(body["sessions"], 1);
    assert_eq!(body["offers_published"], 1);
    assert_eq!(body["candidates_published"], 1);
    assert_eq!(body["candidates_delivered"], 1);

    let (_, body) = peer.get("/api/session?id=never-seen").await;
    assert_eq!(body["exists"], false);
    assert_eq!(body["phase"], "empty");
}

/// Many concurrent publishers and drainers: every candidate arrives once.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_trickle_delivers_each_candidate_once() {
    let addr = start_test_server(SignalingRelay::default()).await;
    let total = 50;

    let publisher = tokio::spawn(async move {
        let peer = Peer::new(addr);
        for i in 0..total {
            let (status, _) = peer
                .post(
                    "/ice-candidate?id=C1&peerType=base-station",
                    json!({ "candidate": candidate(&format!("c{i}")) }),
                )
                .await;
            assert_eq!(status, StatusCode::OK);
        }
    });

    let poller = tokio::spawn(async move {
        let peer = Peer::new(addr);
        let mut seen = Vec::new();
        for _ in 0..total {
            let (_, body) = peer.get("/ice-candidate?id=C1&peerType=remote-viewer").await;
            seen.extend(body["candidates"].as_array().unwrap().iter().cloned());
        }
        seen
    });

    publisher.await.unwrap();
    let mut seen = poller.await.unwrap();

    let (_, body) = Peer::new(addr)
        .get("/ice-candidate?id=C1&peerType=remote-viewer")
        .await;
    seen.extend(body["candidates"].as_array().unwrap().iter().cloned());

    let mut names: Vec<String> = seen
        .iter()
        .map(|c| c["candidate"].as_str().unwrap().to_string())
        .collect();
    names.sort();
    let mut expected: Vec<String> = (0..total).map(|i| format!("c{i}")).collect();
    expected.sort();
    assert_eq!(names, expected);
}
