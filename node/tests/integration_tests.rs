//! Integration tests exercising the node runtime end to end:
//! gossip ingestion → validation → admission → mining → flooding, with the
//! network replaced by the in-memory peer client.

use std::sync::Arc;

use merit_crypto::generate_keypair;
use merit_ledger::Block;
use merit_network::{HeartBeatData, PeerClient};
use merit_node::{build_trie, HeartbeatOutcome, MeritNode, NodeConfig, NodeError, NodeState, StartOutcome};
use merit_nullables::NullPeerClient;
use merit_transactions::{Merit, SignedMerit, Transaction, TxType};
use merit_trie::Trie;
use merit_types::{BlockHash, KeyPair, Signature, Timestamp};
use merit_work::{Difficulty, WorkGenerator};

// ── Helpers ────────────────────────────────────────────────────────────

const SELF_ADDR: &str = "http://localhost:7100";
const PEER_B: &str = "http://localhost:7200";
const PEER_C: &str = "http://localhost:7300";

fn config(id: i32) -> NodeConfig {
    NodeConfig {
        node_id: id,
        advertise_addr: Some(SELF_ADDR.into()),
        difficulty: Difficulty::zeros(1),
        heartbeat_min_secs: 3600,
        heartbeat_max_secs: 3600,
        idle_wait_secs: 1,
        enable_mining: false,
        mining_batch: 100_000,
        ..NodeConfig::default()
    }
}

fn node_with(config: NodeConfig) -> (Arc<MeritNode>, Arc<NullPeerClient>) {
    let client = Arc::new(NullPeerClient::new());
    let node = MeritNode::new(config, Arc::clone(&client) as Arc<dyn PeerClient>).unwrap();
    (node, client)
}

fn application(keys: &KeyPair, merit_hash: &str, fee: u64) -> Transaction {
    let merit = SignedMerit {
        merit: Merit {
            experience: vec!["backend engineer".into()],
            education: vec!["msc".into()],
        },
        hash: merit_hash.into(),
        timestamp: 42,
        application_signature: Signature([1; 64]),
    };
    Transaction::signed(keys, "employer", TxType::Application, fee, merit.to_json().unwrap())
}

fn mined(height: u64, parent: BlockHash, txs: &[Transaction]) -> Block {
    seal_with_work(height, parent, build_trie(txs).unwrap())
}

/// A block with valid work whose only entry is not a transaction.
fn foreign(height: u64, parent: BlockHash) -> Block {
    seal_with_work(height, parent, Trie::from_mapping([("x", "not a transaction")]).unwrap())
}

fn seal_with_work(height: u64, parent: BlockHash, trie: Trie) -> Block {
    let nonce = WorkGenerator::new(1_000_000)
        .generate(&parent, &trie.root_hash(), &Difficulty::zeros(1))
        .unwrap();
    Block::seal(height, Timestamp::from_millis(1_000 + height as i64), parent, nonce, "miner", trie)
}

fn tx_heartbeat(from: &str, id: i32, tx: &Transaction) -> HeartBeatData {
    HeartBeatData::new(id, from, "{}").with_transaction(tx.to_json().unwrap())
}

fn block_heartbeat(from: &str, id: i32, block: &Block) -> HeartBeatData {
    HeartBeatData::new(id, from, "{}").with_block(block.to_json().unwrap())
}

// ── 1. Lifecycle ───────────────────────────────────────────────────────

#[tokio::test]
async fn start_is_idempotent() {
    let (node, _) = node_with(config(1));
    assert_eq!(node.state().await, NodeState::NotStarted);
    assert_eq!(node.start().await.unwrap(), StartOutcome::Started);
    assert_eq!(node.start().await.unwrap(), StartOutcome::AlreadyRunning);
    assert_eq!(node.state().await, NodeState::Running);
    assert!(node.is_running());
}

#[tokio::test]
async fn heartbeat_ignored_before_start() {
    let (node, client) = node_with(config(1));
    let hb = HeartBeatData::new(2, PEER_B, "{}");
    assert_eq!(node.receive_heartbeat(hb).await, HeartbeatOutcome::Ignored);
    assert!(node.peers().is_empty());
    assert!(client.sent().is_empty());
}

#[tokio::test]
async fn bootstrap_downloads_chain() {
    let keys = generate_keypair();
    let genesis = mined(1, BlockHash::ZERO, &[application(&keys, "m1", 2)]);
    let (source, _) = node_with(config(1));
    source.chain().insert(genesis.clone());

    let (node, client) = node_with(NodeConfig {
        bootstrap_peer: Some(PEER_B.into()),
        ..config(2)
    });
    client.serve_chain(PEER_B, source.chain().to_json().unwrap());

    assert_eq!(node.start().await.unwrap(), StartOutcome::Started);
    assert_eq!(node.chain().len(), 1);
    let copy = node.chain().get_block(1, genesis.hash()).unwrap();
    assert_eq!(copy.trie.root_hash(), genesis.trie.root_hash());
    // The handshake announced us to the bootstrap peer.
    assert_eq!(client.sent_to(PEER_B)[0].addr, SELF_ADDR);
}

#[tokio::test]
async fn failed_bootstrap_leaves_node_stopped() {
    let (node, client) = node_with(NodeConfig {
        bootstrap_peer: Some(PEER_B.into()),
        ..config(2)
    });
    client.set_unreachable(PEER_B);
    assert!(matches!(node.start().await, Err(NodeError::Bootstrap { .. })));
    assert_eq!(node.state().await, NodeState::NotStarted);
    assert!(!node.is_running());
}

// ── 2. Gossip receive ──────────────────────────────────────────────────

#[tokio::test]
async fn heartbeat_merges_sender_and_directory_but_not_self() {
    let (node, _) = node_with(config(1));
    node.start().await.unwrap();

    let peer_map = format!(r#"{{"{SELF_ADDR}":99,"{PEER_C}":3}}"#);
    let hb = HeartBeatData::new(2, PEER_B, peer_map);
    assert_eq!(node.receive_heartbeat(hb).await, HeartbeatOutcome::Accepted);

    let peers = node.peers().copy();
    assert_eq!(peers.get(PEER_B), Some(&2));
    assert_eq!(peers.get(PEER_C), Some(&3));
    assert!(!peers.contains_key(SELF_ADDR));
}

#[tokio::test]
async fn duplicate_gossip_transaction_admitted_once() {
    let (node, _) = node_with(config(1));
    node.start().await.unwrap();
    let tx = application(&generate_keypair(), "m1", 5);

    let first = node.receive_heartbeat(tx_heartbeat(PEER_B, 2, &tx)).await;
    let second = node.receive_heartbeat(tx_heartbeat(PEER_B, 2, &tx)).await;

    assert_eq!(first, HeartbeatOutcome::Accepted);
    assert_eq!(second, HeartbeatOutcome::Rejected);
    assert_eq!(node.queue().len().await, 1);
    assert!(node.queue().contains(&tx.hash).await);
}

#[tokio::test]
async fn accepted_transaction_is_reflooded_with_one_hop_spent() {
    let (node, client) = node_with(config(1));
    node.start().await.unwrap();
    let tx = application(&generate_keypair(), "m1", 5);

    node.receive_heartbeat(tx_heartbeat(PEER_B, 2, &tx)).await;

    let forwarded = client.sent_to(PEER_B);
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].hops, 1);
    assert_eq!(forwarded[0].addr, SELF_ADDR);
    assert_eq!(forwarded[0].id, 1);
    assert!(forwarded[0].if_new_transaction);
    assert_eq!(forwarded[0].transaction_json, tx.to_json().unwrap());
}

#[tokio::test]
async fn exhausted_hops_are_not_reflooded() {
    let (node, client) = node_with(config(1));
    node.start().await.unwrap();
    let tx = application(&generate_keypair(), "m1", 5);

    node.receive_heartbeat(tx_heartbeat(PEER_B, 2, &tx).with_hops(0)).await;
    assert!(client.sent().is_empty());
    assert_eq!(node.queue().len().await, 1);
}

#[tokio::test]
async fn invalid_transaction_is_dropped_silently() {
    let (node, client) = node_with(config(1));
    node.start().await.unwrap();
    let mut tx = application(&generate_keypair(), "m1", 5);
    tx.fee = 500;

    let outcome = node.receive_heartbeat(tx_heartbeat(PEER_B, 2, &tx)).await;
    assert_eq!(outcome, HeartbeatOutcome::Rejected);
    assert!(node.queue().is_empty().await);
    assert!(client.sent().is_empty());
    assert_eq!(node.metrics().transactions_rejected.get(), 1);
}

#[tokio::test]
async fn gossiped_block_is_inserted() {
    let (node, _) = node_with(config(1));
    node.start().await.unwrap();
    let genesis = mined(1, BlockHash::ZERO, &[application(&generate_keypair(), "m1", 1)]);

    let outcome = node.receive_heartbeat(block_heartbeat(PEER_B, 2, &genesis)).await;
    assert_eq!(outcome, HeartbeatOutcome::Accepted);
    assert_eq!(node.chain().len(), 1);
    assert_eq!(node.metrics().blocks_accepted.get(), 1);

    // The same block again is already known.
    let again = node.receive_heartbeat(block_heartbeat(PEER_B, 2, &genesis)).await;
    assert_eq!(again, HeartbeatOutcome::Rejected);
    assert_eq!(node.chain().block_count(), 1);
}

// ── 3. Backfill ────────────────────────────────────────────────────────

#[tokio::test]
async fn missing_ancestors_are_backfilled_recursively() {
    let keys = generate_keypair();
    let app = application(&keys, "m1", 3);
    let genesis = mined(1, BlockHash::ZERO, &[app.clone()]);
    let confirmation =
        Transaction::signed(&keys, app.hash.to_hex(), TxType::Confirmation, 1, "");
    let second = mined(2, *genesis.hash(), &[confirmation]);
    let third = mined(3, *second.hash(), &[]);

    let (node, client) = node_with(config(1));
    node.start().await.unwrap();
    node.peers().add(PEER_B, 2);
    client.serve_block(PEER_B, 1, *genesis.hash(), genesis.to_json().unwrap());
    client.serve_block(PEER_B, 2, *second.hash(), second.to_json().unwrap());

    let outcome = node.receive_heartbeat(block_heartbeat(PEER_C, 3, &third)).await;
    assert_eq!(outcome, HeartbeatOutcome::Accepted);
    assert_eq!(node.chain().len(), 3);
    assert_eq!(node.chain().canonical(0).len(), 3);
    assert_eq!(node.metrics().backfill_requests.get(), 2);
}

#[tokio::test]
async fn backfill_moves_on_to_the_next_peer() {
    let genesis = mined(1, BlockHash::ZERO, &[]);
    let (node, client) = node_with(config(1));
    node.peers().add(PEER_B, 2);
    node.peers().add(PEER_C, 3);
    client.set_unreachable(PEER_B);
    client.serve_block(PEER_C, 1, *genesis.hash(), genesis.to_json().unwrap());

    assert_eq!(node.backfill(1, *genesis.hash()).await, 1);
    assert!(node.chain().get_block(1, genesis.hash()).is_some());
    let asked: Vec<String> = client.block_requests().into_iter().map(|(p, _, _)| p).collect();
    assert_eq!(asked, vec![PEER_B.to_string(), PEER_C.to_string()]);
}

#[tokio::test]
async fn unresolved_backfill_is_not_fatal() {
    let genesis = mined(1, BlockHash::ZERO, &[]);
    let second = mined(2, *genesis.hash(), &[]);
    let (node, _) = node_with(config(1));
    node.start().await.unwrap();
    node.peers().add(PEER_B, 2);

    // Nobody serves the parent; the orphan is still validated and stored.
    let outcome = node.receive_heartbeat(block_heartbeat(PEER_B, 2, &second)).await;
    assert_eq!(outcome, HeartbeatOutcome::Accepted);
    assert_eq!(node.chain().len(), 2);
    assert!(node.chain().get(1).is_empty());
}

#[tokio::test]
async fn backfill_refuses_block_with_foreign_entries() {
    let bad = foreign(1, BlockHash::ZERO);
    let child = mined(2, *bad.hash(), &[]);
    let (node, client) = node_with(config(1));
    node.start().await.unwrap();
    node.peers().add(PEER_B, 2);
    client.serve_block(PEER_B, 1, *bad.hash(), bad.to_json().unwrap());

    node.receive_heartbeat(block_heartbeat(PEER_B, 2, &child)).await;
    assert!(node.chain().get(1).is_empty());
    assert_eq!(node.metrics().backfill_requests.get(), 1);

    // Honest traffic keeps flowing afterwards.
    let honest = application(&generate_keypair(), "m1", 3);
    node.admit(honest.clone()).await.unwrap();
    node.mine_block().await.unwrap().unwrap();
    assert!(node.transactions().iter().any(|tx| tx.hash == honest.hash));
}

#[tokio::test]
async fn gossiped_block_with_foreign_entries_is_rejected() {
    let (node, _) = node_with(config(1));
    node.start().await.unwrap();
    let bad = foreign(1, BlockHash::ZERO);
    let outcome = node.receive_heartbeat(block_heartbeat(PEER_B, 2, &bad)).await;
    assert_eq!(outcome, HeartbeatOutcome::Rejected);
    assert!(node.chain().is_empty());
    assert_eq!(node.metrics().blocks_rejected.get(), 1);
}

#[tokio::test]
async fn bootstrap_with_foreign_entries_is_refused() {
    let (source, _) = node_with(config(1));
    source.chain().insert(foreign(1, BlockHash::ZERO));
    let (node, client) = node_with(NodeConfig {
        bootstrap_peer: Some(PEER_B.into()),
        ..config(2)
    });
    client.serve_chain(PEER_B, source.chain().to_json().unwrap());

    assert!(matches!(node.start().await, Err(NodeError::Bootstrap { .. })));
    assert_eq!(node.state().await, NodeState::NotStarted);
    assert!(node.chain().is_empty());
}

#[tokio::test]
async fn stored_foreign_entry_does_not_block_reads_or_admission() {
    let (node, _) = node_with(config(1));
    node.chain().insert(foreign(1, BlockHash::ZERO));

    let honest = application(&generate_keypair(), "m1", 3);
    node.admit(honest.clone()).await.unwrap();
    let block = node.mine_block().await.unwrap().unwrap();
    assert_eq!(block.height(), 2);

    let hashes: Vec<_> = node.transactions().iter().map(|tx| tx.hash).collect();
    assert_eq!(hashes, vec![honest.hash]);
    assert_eq!(node.merits().len(), 1);
    let balances = node.balances();
    assert_eq!(balances.get(&node.producer()), Some(&3));
    assert_eq!(balances.get("miner"), Some(&0));
}

// ── 4. Mining ──────────────────────────────────────────────────────────

#[tokio::test]
async fn mines_highest_fees_first_and_floods_block() {
    let (node, client) = node_with(NodeConfig {
        block_tx_limit: 2,
        ..config(1)
    });
    node.peers().add(PEER_B, 2);
    let keys = generate_keypair();
    for (fee, merit) in [(1, "m1"), (9, "m2"), (5, "m3")] {
        node.admit(application(&keys, merit, fee)).await.unwrap();
    }

    let block = node.mine_block().await.unwrap().expect("queue not empty");
    assert_eq!(block.height(), 1);
    assert!(block.is_genesis());
    assert_eq!(block.header.producer, node.producer());
    let mut fees: Vec<u64> = block
        .trie
        .mapping()
        .values()
        .map(|json| Transaction::from_json(json).unwrap().fee)
        .collect();
    fees.sort_unstable();
    assert_eq!(fees, vec![5, 9]);
    assert_eq!(node.queue().len().await, 1);
    assert_eq!(node.metrics().blocks_mined.get(), 1);

    let flooded = client.sent_to(PEER_B);
    assert_eq!(flooded.len(), 1);
    assert!(flooded[0].if_new_block);
    assert_eq!(flooded[0].hops, 1);
    assert_eq!(Block::from_json(&flooded[0].block_json).unwrap().hash(), block.hash());
}

#[tokio::test]
async fn next_block_extends_the_tip() {
    let (node, _) = node_with(config(1));
    let keys = generate_keypair();
    node.admit(application(&keys, "m1", 1)).await.unwrap();
    let first = node.mine_block().await.unwrap().unwrap();
    node.admit(application(&keys, "m2", 1)).await.unwrap();
    let second = node.mine_block().await.unwrap().unwrap();

    assert_eq!(second.height(), 2);
    assert_eq!(second.parent_hash(), first.hash());
    assert_eq!(node.chain().canonical(0).len(), 2);
}

#[tokio::test]
async fn mined_transaction_cannot_be_admitted_again() {
    let (node, _) = node_with(config(1));
    let tx = application(&generate_keypair(), "m1", 1);
    node.admit(tx.clone()).await.unwrap();
    node.mine_block().await.unwrap().unwrap();

    assert!(matches!(node.admit(tx).await, Err(NodeError::Validation(_))));
    assert!(node.mine_block().await.unwrap().is_none());
}

#[tokio::test]
async fn mining_loop_seals_submitted_transactions() {
    let (node, _) = node_with(NodeConfig {
        enable_mining: true,
        ..config(1)
    });
    node.start().await.unwrap();
    let tx = application(&generate_keypair(), "m1", 1);
    node.submit_transaction(&tx.to_json().unwrap()).await.unwrap();

    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
    while node.chain().is_empty() {
        assert!(tokio::time::Instant::now() < deadline, "no block mined in time");
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(node.chain().contains_transaction(&tx.hash));
}

// ── 5. Projections and handshake ───────────────────────────────────────

#[tokio::test]
async fn projections_follow_the_canonical_chain() {
    let (node, _) = node_with(config(1));
    let applicant = generate_keypair();
    let employer = generate_keypair();
    node.admit(application(&applicant, "merit-1", 4)).await.unwrap();
    node.mine_block().await.unwrap().unwrap();

    let acceptance = Transaction::signed(&employer, "merit-1", TxType::Acceptance, 6, "");
    node.admit(acceptance).await.unwrap();
    node.mine_block().await.unwrap().unwrap();

    let txs = node.transactions();
    assert_eq!(txs.len(), 2);
    assert_eq!(txs[0].tx_type, TxType::Application);

    let merits = node.merits();
    assert_eq!(merits.len(), 1);
    assert_eq!(merits[0].hash, "merit-1");

    let balances = node.balances();
    assert_eq!(balances.get(&node.producer()), Some(&10));

    let dump = node.canonical_dump().unwrap();
    assert!(dump.starts_with("Chain #0:"));
    assert!(dump.contains("Height: 2, block: "));
    assert!(dump.contains("Height: 1, block: "));

    assert!(node.show().contains("This is the BlockChain"));
}

#[tokio::test]
async fn upload_registers_caller_and_returns_chain() {
    let (node, _) = node_with(config(1));
    node.chain().insert(mined(1, BlockHash::ZERO, &[]));
    let json = node.upload(&HeartBeatData::new(2, PEER_B, "{}")).unwrap();
    assert!(node.peers().contains(PEER_B));
    assert_eq!(merit_ledger::BlockChain::from_json(&json).unwrap().len(), 1);
}

#[tokio::test]
async fn block_lookup_by_coordinates() {
    let (node, _) = node_with(config(1));
    let genesis = mined(1, BlockHash::ZERO, &[]);
    node.chain().insert(genesis.clone());
    assert!(node.block_json(1, genesis.hash()).unwrap().is_some());
    assert!(node.block_json(1, &BlockHash::new([9; 32])).unwrap().is_none());
    assert!(node.block_json(2, genesis.hash()).unwrap().is_none());
}
