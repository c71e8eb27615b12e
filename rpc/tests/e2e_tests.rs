//! Two nodes talking over real HTTP on ephemeral localhost ports.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::oneshot;

use merit_crypto::generate_keypair;
use merit_network::{HeartBeatData, HttpPeerClient, PeerClient};
use merit_node::{MeritNode, NodeConfig};
use merit_rpc::RpcServer;
use merit_transactions::{Merit, SignedMerit, Transaction, TxType};
use merit_types::Signature;
use merit_work::Difficulty;

struct Running {
    node: Arc<MeritNode>,
    addr: String,
    _stop: oneshot::Sender<()>,
}

async fn spawn_node(id: i32, bootstrap: Option<&str>) -> Running {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = format!("http://{}", listener.local_addr().unwrap());
    let config = NodeConfig {
        node_id: id,
        port: listener.local_addr().unwrap().port(),
        advertise_addr: Some(addr.clone()),
        bootstrap_peer: bootstrap.map(str::to_string),
        difficulty: Difficulty::zeros(1),
        heartbeat_min_secs: 3600,
        heartbeat_max_secs: 3600,
        enable_mining: false,
        ..NodeConfig::default()
    };
    let client = Arc::new(HttpPeerClient::new(config.peer_timeout()));
    let node = MeritNode::new(config, client as Arc<dyn PeerClient>).unwrap();

    let (stop, stopped) = oneshot::channel::<()>();
    let server = RpcServer::new(Arc::clone(&node));
    tokio::spawn(async move {
        server
            .serve(listener, async {
                let _ = stopped.await;
            })
            .await
            .unwrap();
    });
    Running {
        node,
        addr,
        _stop: stop,
    }
}

fn application(merit_hash: &str) -> Transaction {
    let merit = SignedMerit {
        merit: Merit::default(),
        hash: merit_hash.into(),
        timestamp: 1,
        application_signature: Signature([3; 64]),
    };
    Transaction::signed(
        &generate_keypair(),
        "employer",
        TxType::Application,
        2,
        merit.to_json().unwrap(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn bootstrap_download_reproduces_root_hashes() {
    let a = spawn_node(1, None).await;
    a.node.start().await.unwrap();
    a.node.admit(application("m1")).await.unwrap();
    let mined = a.node.mine_block().await.unwrap().unwrap();

    let b = spawn_node(2, Some(&a.addr)).await;
    b.node.start().await.unwrap();

    let copy = b.node.chain().get_block(1, mined.hash()).unwrap();
    assert_eq!(copy.trie.root_hash(), mined.trie.root_hash());
    assert_eq!(copy.hash(), mined.hash());
    // The handshake taught A about B.
    assert!(a.node.peers().contains(&b.addr));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn repeated_gossip_is_admitted_once() {
    let a = spawn_node(1, None).await;
    a.node.start().await.unwrap();
    let b = spawn_node(2, Some(&a.addr)).await;
    b.node.start().await.unwrap();

    let tx = application("m2");
    let hb = HeartBeatData::new(2, b.addr.clone(), b.node.peers().to_json().unwrap())
        .with_transaction(tx.to_json().unwrap());
    let client = HttpPeerClient::new(Duration::from_secs(5));
    let (first, second) = tokio::join!(
        client.send_heartbeat(&a.addr, &hb),
        client.send_heartbeat(&a.addr, &hb)
    );
    first.unwrap();
    second.unwrap();

    assert_eq!(a.node.queue().len().await, 1);
    assert!(a.node.queue().contains(&tx.hash).await);
    // A re-flooded the first copy back to B, which admitted it too.
    assert!(b.node.queue().contains(&tx.hash).await);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn mined_block_reaches_peer() {
    let a = spawn_node(1, None).await;
    a.node.start().await.unwrap();
    let b = spawn_node(2, Some(&a.addr)).await;
    b.node.start().await.unwrap();
    // B only learns A from A's heartbeat.
    a.node.beat().await.unwrap();
    assert!(b.node.peers().contains(&a.addr));

    b.node.admit(application("m3")).await.unwrap();
    let block = b.node.mine_block().await.unwrap().unwrap();

    assert!(a.node.chain().contains_block(1, block.hash()));
    assert!(a.node.chain().contains_transaction(
        &merit_types::TxHash::from_hex(block.trie.mapping().keys().next().unwrap()).unwrap()
    ));
}
