//! In-process tests of the HTTP surface: each request is driven through the
//! router with `oneshot`, peers are served by the in-memory client.

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use merit_crypto::generate_keypair;
use merit_ledger::{Block, BlockChain};
use merit_network::{HeartBeatData, PeerClient};
use merit_node::{build_trie, MeritNode, NodeConfig};
use merit_nullables::NullPeerClient;
use merit_rpc::router;
use merit_transactions::{Merit, SignedMerit, Transaction, TxType};
use merit_types::{BlockHash, KeyPair, Signature, Timestamp};
use merit_work::{Difficulty, WorkGenerator};

const SELF_ADDR: &str = "http://localhost:7100";
const PEER: &str = "http://localhost:7200";

fn node() -> Arc<MeritNode> {
    let config = NodeConfig {
        node_id: 1,
        advertise_addr: Some(SELF_ADDR.into()),
        difficulty: Difficulty::zeros(1),
        heartbeat_min_secs: 3600,
        heartbeat_max_secs: 3600,
        enable_mining: false,
        ..NodeConfig::default()
    };
    MeritNode::new(config, Arc::new(NullPeerClient::new()) as Arc<dyn PeerClient>).unwrap()
}

fn application(keys: &KeyPair, merit_hash: &str, fee: u64) -> Transaction {
    let merit = SignedMerit {
        merit: Merit {
            experience: vec!["welder".into()],
            education: vec![],
        },
        hash: merit_hash.into(),
        timestamp: 7,
        application_signature: Signature([2; 64]),
    };
    Transaction::signed(keys, "employer", TxType::Application, fee, merit.to_json().unwrap())
}

fn genesis() -> Block {
    let trie = build_trie(&[]).unwrap();
    let nonce = WorkGenerator::new(1_000_000)
        .generate(&BlockHash::ZERO, &trie.root_hash(), &Difficulty::zeros(1))
        .unwrap();
    Block::seal(1, Timestamp::from_millis(1_000), BlockHash::ZERO, nonce, "miner", trie)
}

async fn get(app: &Router, uri: &str) -> (StatusCode, String) {
    let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, req).await
}

async fn post(app: &Router, uri: &str, body: String) -> (StatusCode, String) {
    let req = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    send(app, req).await
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

#[tokio::test]
async fn start_is_idempotent() {
    let node = node();
    let app = router(Arc::clone(&node));

    let (status, body) = get(&app, "/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "started\n");

    let (status, body) = get(&app, "/start").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "already started\n");
    assert!(node.is_running());
}

#[tokio::test]
async fn block_lookup() {
    let node = node();
    let block = genesis();
    node.chain().insert(block.clone());
    let app = router(node);

    let (status, body) = get(&app, &format!("/block/1/{}", block.hash())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(Block::from_json(&body).unwrap().hash(), block.hash());

    let missing = BlockHash::new([7; 32]);
    let (status, body) = get(&app, &format!("/block/1/{missing}")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_empty());

    let (status, _) = get(&app, "/block/one/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn upload_returns_chain_and_registers_caller() {
    let node = node();
    node.chain().insert(genesis());
    let app = router(Arc::clone(&node));

    let hb = HeartBeatData::new(2, PEER, "{}");
    let (status, body) = post(&app, "/upload", hb.to_json().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(BlockChain::from_json(&body).unwrap().len(), 1);
    assert!(node.peers().contains(PEER));

    let (status, _) = post(&app, "/upload", "not json".into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn heartbeat_admits_transaction_once() {
    let node = node();
    node.start().await.unwrap();
    let app = router(Arc::clone(&node));
    let tx = application(&generate_keypair(), "m1", 3);
    let hb = HeartBeatData::new(2, PEER, "{}").with_transaction(tx.to_json().unwrap());

    for _ in 0..2 {
        let (status, _) = post(&app, "/heartbeat/receive", hb.to_json().unwrap()).await;
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(node.queue().len().await, 1);
    assert!(node.peers().contains(PEER));
}

#[tokio::test]
async fn transaction_submission() {
    let node = node();
    let app = router(Arc::clone(&node));
    let tx = application(&generate_keypair(), "m1", 3);

    let (status, body) = post(&app, "/transaction", tx.to_json().unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    let reply: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(reply["hash"], tx.hash.to_hex());
    assert_eq!(reply["accepted"], true);

    // Same transaction again is a duplicate.
    let (status, _) = post(&app, "/transaction", tx.to_json().unwrap()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(&app, "/transaction", "{}".into()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn projections_over_mined_chain() {
    let node = node();
    let app = router(Arc::clone(&node));
    node.admit(application(&generate_keypair(), "merit-9", 4)).await.unwrap();
    node.mine_block().await.unwrap().unwrap();

    let (status, body) = get(&app, "/transactions").await;
    assert_eq!(status, StatusCode::OK);
    let txs: Vec<Transaction> = serde_json::from_str(&body).unwrap();
    assert_eq!(txs.len(), 1);

    let (_, body) = get(&app, "/merits").await;
    let merits: Vec<SignedMerit> = serde_json::from_str(&body).unwrap();
    assert_eq!(merits[0].hash, "merit-9");

    let (_, body) = get(&app, "/balance").await;
    let balances: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(balances[node.producer()], 4);

    let (_, body) = get(&app, "/canonical").await;
    assert!(body.starts_with("Chain #0:"));

    let (_, body) = get(&app, "/show").await;
    assert!(body.contains("This is PeerMap"));

    let (status, body) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("merit_blocks_mined_total 1"));
}
