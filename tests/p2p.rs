//! Socket-level tests of the peer connection and the mixing session against
//! a scripted masternode.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use bitcoin_hashes::Hash;
use blsful::{Bls12381G2, SignatureSchemes};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};

use dashcore_p2p::bls_sig_utils::{BLSPublicKey, BLSSignature};
use dashcore_p2p::consensus::{serialize, Decodable};
use dashcore_p2p::hash_types::{BlockHash, ConfirmedHash, ProTxHash, PubkeyHash, Txid};
use dashcore_p2p::network::constants::{Network, ServiceFlags, EMPTY_PAYLOAD_CHECKSUM};
use dashcore_p2p::network::address::Address;
use dashcore_p2p::network::message::{CommandString, NetworkMessage, RawNetworkMessage};
use dashcore_p2p::network::message_network::VersionMessage;
use dashcore_p2p::network::message_privatesend::{
    CoinJoinComplete, CoinJoinFinalTransaction, CoinJoinQueue, CoinJoinStatusUpdate, PoolMessage,
    PoolState, PoolStatusUpdate,
};
use dashcore_p2p::network::message_sml::MnListDiff;
use dashcore_p2p::network::message_spork::{SporkId, SporkMessage};
use dashcore_p2p::p2p::mix_session::{DenominateWorkflow, MixSession};
use dashcore_p2p::p2p::peer::Peer;
use dashcore_p2p::p2p::{DisconnectReason, NetShared, P2pConfig, P2pHost};
use dashcore_p2p::sml::masternode_list_entry::MasternodeListEntry;
use dashcore_p2p::{OutPoint, ScriptBuf, Transaction, TxIn, TxOut};

const NETWORK: Network = Network::Regtest;

struct TestHost {
    timeout: Duration,
    spork_pubkey_hash: PubkeyHash,
    block_hashes: HashMap<u32, BlockHash>,
    sporks: Mutex<Vec<(SporkId, i64)>>,
    downs: AtomicUsize,
}

impl TestHost {
    fn new() -> Self {
        TestHost {
            timeout: Duration::from_secs(30),
            spork_pubkey_hash: PubkeyHash::hash(b"no such key"),
            block_hashes: HashMap::new(),
            sporks: Mutex::new(Vec::new()),
            downs: AtomicUsize::new(0),
        }
    }

    fn connection_downs(&self) -> usize {
        self.downs.load(Ordering::SeqCst)
    }
}

impl P2pHost for TestHost {
    fn block_hash(&self, height: u32) -> Option<BlockHash> {
        self.block_hashes.get(&height).copied()
    }

    fn local_height(&self) -> i32 {
        169118
    }

    fn network_timeout(&self) -> Duration {
        self.timeout
    }

    fn spork_pubkey_hash(&self) -> PubkeyHash {
        self.spork_pubkey_hash
    }

    fn set_spork(&self, spork_id: SporkId, value: i64, _peer: &str) {
        self.sporks.lock().unwrap().push((spork_id, value));
    }

    fn connection_down(&self, _peer: &str) {
        self.downs.fetch_add(1, Ordering::SeqCst);
    }
}

fn config() -> Arc<P2pConfig> {
    Arc::new(P2pConfig::new(NETWORK))
}

async fn write_msg(stream: &mut TcpStream, message: NetworkMessage) -> Result<()> {
    let bytes = serialize(&RawNetworkMessage { magic: NETWORK.magic(), payload: message });
    stream.write_all(&bytes).await?;
    stream.flush().await?;
    Ok(())
}

async fn read_msg(stream: &mut TcpStream) -> Result<NetworkMessage> {
    let mut header = [0u8; 24];
    stream.read_exact(&mut header).await?;
    let magic = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
    assert_eq!(magic, NETWORK.magic());
    let command = CommandString::consensus_decode(&mut &header[4..16])?;
    let payload_len = u32::from_le_bytes([header[16], header[17], header[18], header[19]]);
    let mut payload = vec![0u8; payload_len as usize];
    stream.read_exact(&mut payload).await?;
    Ok(NetworkMessage::decode_payload(&command, &payload)?)
}

/// Reads messages until one with the wanted command arrives, answering
/// pings along the way.
async fn expect_msg(stream: &mut TcpStream, wanted: &str) -> Result<NetworkMessage> {
    let deadline = Instant::now() + Duration::from_secs(10);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let message = timeout(remaining, read_msg(stream))
            .await
            .with_context(|| format!("waiting for {wanted}"))??;
        match message {
            NetworkMessage::Ping(nonce) => {
                write_msg(stream, NetworkMessage::Pong(nonce)).await?;
            }
            message if message.cmd() == wanted => return Ok(message),
            other => bail!("expected {wanted}, got {}", other.command()),
        }
    }
}

fn server_version() -> NetworkMessage {
    let null_addr = Address { services: ServiceFlags::empty(), address: [0u16; 8], port: 0 };
    NetworkMessage::Version(VersionMessage {
        version: 70215,
        services: ServiceFlags::NETWORK | ServiceFlags::BLOOM,
        timestamp: 1567673683,
        receiver: null_addr.clone(),
        sender: null_addr,
        nonce: 42,
        user_agent: "/Dash Core:0.14.0.3/".to_string(),
        start_height: 169118,
        relay: Some(true),
        mn_auth_challenge: None,
        masternode_connection: None,
    })
}

/// Performs the server side of the handshake: version in, version and
/// verack out, verack and senddsq in.
async fn server_handshake(stream: &mut TcpStream) -> Result<()> {
    match read_msg(stream).await? {
        NetworkMessage::Version(version) => {
            assert_eq!(version.version, 70216);
            assert!(version.user_agent.starts_with("/Dash Electrum:"));
            assert_eq!(version.relay, Some(false));
        }
        other => bail!("expected version, got {}", other.command()),
    }
    write_msg(stream, server_version()).await?;
    write_msg(stream, NetworkMessage::Verack).await?;
    expect_msg(stream, "verack").await?;
    match expect_msg(stream, "senddsq").await? {
        NetworkMessage::SendDsq(true) => Ok(()),
        other => bail!("expected senddsq(true), got {:?}", other),
    }
}

async fn wait_for_close(peer: &Peer, deadline: Duration) -> bool {
    let end = Instant::now() + deadline;
    while Instant::now() < end {
        if !peer.is_open() {
            return true;
        }
        sleep(Duration::from_millis(100)).await;
    }
    false
}

#[tokio::test]
async fn handshake_succeeds_and_close_is_idempotent() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        server_handshake(&mut stream).await?;
        // hold the socket open until the client goes away
        let mut buf = [0u8; 1024];
        while stream.read(&mut buf).await? > 0 {}
        Ok::<_, anyhow::Error>(())
    });

    let host = Arc::new(TestHost::new());
    let peer =
        Peer::connect(config(), Arc::new(NetShared::new()), host.clone(), &addr.to_string(), None, None)
            .await?;
    assert!(peer.is_open());
    let version = peer.remote_version().context("remote version recorded")?;
    assert_eq!(version.user_agent, "/Dash Core:0.14.0.3/");
    let (written, read) = peer.traffic();
    assert!(written > 0 && read > 0);

    peer.close();
    peer.close();
    assert!(!peer.is_open());
    sleep(Duration::from_millis(200)).await;
    assert_eq!(host.connection_downs(), 1);
    server.await??;
    Ok(())
}

#[tokio::test]
async fn handshake_without_version_fails() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        // never send a version: the client's two handshake envelopes are a
        // verack and a ping
        read_msg(&mut stream).await?; // their version
        write_msg(&mut stream, NetworkMessage::Verack).await?;
        write_msg(&mut stream, NetworkMessage::Ping(1)).await?;
        Ok::<_, anyhow::Error>(())
    });

    let host = Arc::new(TestHost::new());
    let result = Peer::connect(
        config(),
        Arc::new(NetShared::new()),
        host.clone(),
        &addr.to_string(),
        None,
        None,
    )
    .await;
    assert!(matches!(result, Err(DisconnectReason::HandshakeFailed)));
    server.await??;
    Ok(())
}

#[tokio::test]
async fn ping_after_idle_and_pong_nonce_matching() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        server_handshake(&mut stream).await?;
        // the client pings once the link has been idle for a second
        let nonce = match timeout(Duration::from_secs(5), read_msg(&mut stream)).await?? {
            NetworkMessage::Ping(nonce) => nonce,
            other => bail!("expected ping, got {}", other.command()),
        };
        // a pong with a foreign nonce is ignored
        write_msg(&mut stream, NetworkMessage::Pong(nonce.wrapping_add(1))).await?;
        sleep(Duration::from_millis(200)).await;
        write_msg(&mut stream, NetworkMessage::Pong(nonce)).await?;
        sleep(Duration::from_secs(2)).await;
        Ok::<_, anyhow::Error>(())
    });

    let host = Arc::new(TestHost::new());
    let peer =
        Peer::connect(config(), Arc::new(NetShared::new()), host, &addr.to_string(), None, None)
            .await?;
    let started = Instant::now();

    let mut ping_time = None;
    while started.elapsed() < Duration::from_secs(6) {
        if let Some(time) = peer.ping_time_ms() {
            ping_time = Some(time);
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }
    let ping_time = ping_time.context("ping answered")?;
    assert!(ping_time <= started.elapsed().as_millis() as u64 + 1);

    peer.close();
    server.await??;
    Ok(())
}

#[tokio::test]
async fn monitor_disconnects_on_read_timeout() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        server_handshake(&mut stream).await?;
        // go silent: the client keeps writing pings but hears nothing back
        let mut buf = [0u8; 1024];
        while stream.read(&mut buf).await? > 0 {}
        Ok::<_, anyhow::Error>(())
    });

    let mut host = TestHost::new();
    host.timeout = Duration::from_secs(1);
    let host = Arc::new(host);
    let peer = Peer::connect(
        config(),
        Arc::new(NetShared::new()),
        host.clone(),
        &addr.to_string(),
        None,
        None,
    )
    .await?;

    assert!(wait_for_close(&peer, Duration::from_secs(8)).await, "monitor closed the peer");
    sleep(Duration::from_millis(200)).await;
    assert_eq!(host.connection_downs(), 1);
    server.await??;
    Ok(())
}

#[tokio::test]
async fn getmnlistd_roundtrip() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let base_hash = BlockHash::hash(b"base");
    let tip_hash = BlockHash::hash(b"tip");
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        server_handshake(&mut stream).await?;
        let request = match expect_msg(&mut stream, "getmnlistd").await? {
            NetworkMessage::GetMnListD(request) => request,
            other => bail!("expected getmnlistd, got {}", other.command()),
        };
        let diff = MnListDiff {
            base_block_hash: request.base_block_hash,
            block_hash: request.block_hash,
            total_transactions: 1,
            merkle_hashes: vec![],
            merkle_flags: vec![],
            coinbase_tx: Transaction { version: 2, input: vec![], output: vec![], lock_time: 0 },
            deleted_masternodes: vec![],
            new_masternodes: vec![],
            deleted_quorums: None,
            new_quorums: None,
        };
        write_msg(&mut stream, NetworkMessage::MnListDiff(diff)).await?;
        sleep(Duration::from_secs(1)).await;
        Ok::<_, anyhow::Error>(())
    });

    let mut host = TestHost::new();
    host.block_hashes.insert(1000, base_hash);
    host.block_hashes.insert(1010, tip_hash);
    let host = Arc::new(host);
    let peer =
        Peer::connect(config(), Arc::new(NetShared::new()), host, &addr.to_string(), None, None)
            .await?;

    let diff = peer.getmnlistd(1000, 1010).await?;
    assert_eq!(diff.base_block_hash, base_hash);
    assert_eq!(diff.block_hash, tip_hash);
    assert_eq!(diff.total_transactions, 1);

    peer.close();
    server.await??;
    Ok(())
}

#[tokio::test]
async fn bad_spork_signature_disconnects() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        server_handshake(&mut stream).await?;
        let spork = SporkMessage {
            spork_id: SporkId::Spork19ChainlocksEnabled as i32,
            value: 0,
            time_signed: 1567673683,
            // header byte is plausible, the rest is garbage
            signature: {
                let mut sig = [0x11u8; 65];
                sig[0] = 31;
                sig
            },
        };
        write_msg(&mut stream, NetworkMessage::Spork(spork)).await?;
        let mut buf = [0u8; 1024];
        while stream.read(&mut buf).await? > 0 {}
        Ok::<_, anyhow::Error>(())
    });

    let host = Arc::new(TestHost::new());
    let peer = Peer::connect(
        config(),
        Arc::new(NetShared::new()),
        host.clone(),
        &addr.to_string(),
        None,
        None,
    )
    .await?;
    assert!(wait_for_close(&peer, Duration::from_secs(5)).await, "spork failure closed the peer");
    assert!(host.sporks.lock().unwrap().is_empty());
    server.await??;
    Ok(())
}

#[tokio::test]
async fn mixing_session_denominate_round() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    // The masternode's BLS operator key.
    let secret = Bls12381G2::new_secret_key();
    let public = secret.public_key();
    let operator_public_key = BLSPublicKey::from(public.0.to_compressed());

    let shared = Arc::new(NetShared::new());
    shared.with_mn_list_mut(|list| {
        list.insert(MasternodeListEntry {
            pro_reg_tx_hash: ProTxHash::hash(b"test mn"),
            confirmed_hash: ConfirmedHash::hash(b"test mn"),
            service_address: addr,
            operator_public_key,
            key_id_voting: PubkeyHash::hash(b"voting"),
            is_valid: true,
        });
    });

    let collateral = Transaction {
        version: 2,
        input: vec![TxIn {
            previous_output: OutPoint::new(Txid::hash(b"collateral funding"), 0),
            script_sig: ScriptBuf::from_bytes(vec![0x51]),
            sequence: TxIn::SEQUENCE_FINAL,
        }],
        output: vec![TxOut {
            value: 10_000,
            script_pubkey: ScriptBuf::new_p2pkh(&PubkeyHash::hash(b"collateral out")),
        }],
        lock_time: 0,
    };

    let wfl = DenominateWorkflow {
        inputs: vec![
            OutPoint::new(Txid::hash(b"mix input 0"), 0),
            OutPoint::new(Txid::hash(b"mix input 1"), 3),
        ],
        outputs: vec![
            ScriptBuf::new_p2pkh(&PubkeyHash::hash(b"mix out 0")),
            ScriptBuf::new_p2pkh(&PubkeyHash::hash(b"mix out 1")),
        ],
    };

    const SESSION_ID: i32 = 775511;
    let mn_outpoint = OutPoint::new(Txid::hash(b"mn collateral"), 1);
    let server = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await?;
        server_handshake(&mut stream).await?;

        let denomination = match expect_msg(&mut stream, "dsa").await? {
            NetworkMessage::Dsa(dsa) => {
                assert_eq!(dsa.tx_collateral.output.len(), 1);
                dsa.denomination
            }
            other => bail!("expected dsa, got {}", other.command()),
        };
        write_msg(
            &mut stream,
            NetworkMessage::Dssu(CoinJoinStatusUpdate {
                session_id: SESSION_ID,
                pool_state: PoolState::Queue as i32,
                entries_count: 0,
                status_update: PoolStatusUpdate::Accepted as i32,
                message_id: PoolMessage::MsgNoErr as i32,
            }),
        )
        .await?;

        // announce the ready queue, signed with the operator key
        let mut dsq = CoinJoinQueue {
            denomination,
            masternode_outpoint: mn_outpoint,
            time: 1567673683,
            ready: true,
            signature: BLSSignature::from([0u8; 96]),
        };
        let signature = secret
            .sign(SignatureSchemes::Basic, &dsq.msg_hash().to_byte_array())
            .expect("sign dsq");
        dsq.signature = BLSSignature::from(signature.as_raw_value().to_compressed());
        write_msg(&mut stream, NetworkMessage::Dsq(dsq)).await?;

        let entry = match expect_msg(&mut stream, "dsi").await? {
            NetworkMessage::Dsi(entry) => entry,
            other => bail!("expected dsi, got {}", other.command()),
        };
        assert_eq!(entry.inputs.len(), 2);
        assert_eq!(entry.outputs.len(), 2);
        write_msg(
            &mut stream,
            NetworkMessage::Dssu(CoinJoinStatusUpdate {
                session_id: SESSION_ID,
                pool_state: PoolState::AcceptingEntries as i32,
                entries_count: 1,
                status_update: PoolStatusUpdate::Accepted as i32,
                message_id: PoolMessage::MsgEntriesAdded as i32,
            }),
        )
        .await?;

        // the final transaction mixes in a foreign participant
        let mut final_tx = Transaction {
            version: 2,
            input: entry.inputs.clone(),
            output: entry.outputs.clone(),
            lock_time: 0,
        };
        final_tx.input.push(TxIn {
            previous_output: OutPoint::new(Txid::hash(b"other participant"), 7),
            script_sig: ScriptBuf::new(),
            sequence: TxIn::SEQUENCE_FINAL,
        });
        final_tx.output.push(TxOut {
            value: entry.outputs[0].value,
            script_pubkey: ScriptBuf::new_p2pkh(&PubkeyHash::hash(b"other out")),
        });
        write_msg(
            &mut stream,
            NetworkMessage::Dsf(CoinJoinFinalTransaction {
                session_id: SESSION_ID,
                tx_final: final_tx,
            }),
        )
        .await?;

        let signed = match expect_msg(&mut stream, "dss").await? {
            NetworkMessage::Dss(signed) => signed,
            other => bail!("expected dss, got {}", other.command()),
        };
        assert_eq!(signed.inputs.len(), 2);
        assert!(signed.inputs.iter().all(|txin| !txin.script_sig.is_empty()));

        write_msg(
            &mut stream,
            NetworkMessage::Dsc(CoinJoinComplete {
                session_id: SESSION_ID,
                message_id: PoolMessage::MsgSuccess as i32,
            }),
        )
        .await?;
        sleep(Duration::from_millis(500)).await;
        Ok::<_, anyhow::Error>(())
    });

    let host = Arc::new(TestHost::new());
    let mut session = MixSession::new(&shared, 100_001_000, 2, None, "wfl-integration")?;
    assert_eq!(session.peer_str(), addr.to_string());
    assert!(shared.is_recent_mix_mn(&addr.to_string()));

    session.run_peer(config(), shared.clone(), host).await?;
    let wfl_inputs = wfl.inputs.clone();
    let final_tx = session
        .denominate(&wfl, &collateral, |tx| {
            // "sign" our inputs of the final tx
            Ok(tx
                .input
                .iter()
                .filter(|txin| wfl_inputs.contains(&txin.previous_output))
                .map(|txin| TxIn {
                    previous_output: txin.previous_output,
                    script_sig: ScriptBuf::from_bytes(vec![0xAA; 10]),
                    sequence: txin.sequence,
                })
                .collect())
        })
        .await?;

    assert_eq!(session.session_id(), SESSION_ID);
    assert_eq!(final_tx.input.len(), 3);
    assert_eq!(final_tx.output.len(), 3);
    for outpoint in &wfl.inputs {
        assert!(final_tx.input.iter().any(|txin| txin.previous_output == *outpoint));
    }

    session.close_peer();
    server.await??;
    Ok(())
}

#[tokio::test]
async fn empty_payload_checksum_constant_is_sha256d_of_nothing() {
    let hash = bitcoin_hashes::sha256d::Hash::hash(b"");
    assert_eq!(&hash.to_byte_array()[..4], &EMPTY_PAYLOAD_CHECKSUM);
}
