//! One outbound Dash peer connection.
//!
//! A [`Peer`] owns one TCP connection: it performs the version/verack
//! handshake, keeps the link alive with pings, reads one envelope at a time
//! and dispatches typed payloads, routing the PrivateSend subset into an
//! attached mixing session. All fatal conditions funnel into a
//! [`DisconnectReason`]; a supervisor task performs the teardown exactly
//! once on any exit path.

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, OnceLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex as TokioMutex};
use tokio::task::JoinSet;
use tokio::time::{sleep, timeout};

use crate::consensus::{Decodable, Encodable};
use crate::network::constants::{ServiceFlags, MAX_PAYLOAD_SIZE, PROTOCOL_VERSION};
use crate::network::message::{payload_checksum, CommandString, NetworkMessage};
use crate::network::message_blockdata::{InvMessage, InvType, Inventory};
use crate::network::message_network::VersionMessage;
use crate::network::message_sml::{GetMnListDiff, MnListDiff};
use crate::network::message_spork::SporkMessage;
use crate::network::address::Address;
use crate::hash_types::PubkeyHash;
use crate::p2p::mix_session::verify_dsq_signature;
use crate::p2p::{
    lock, split_host_port, DisconnectReason, MixInbound, MixSender, NetShared, P2pConfig, P2pHost,
    RequestError,
};
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// Idle time after which a ping is due.
const PING_IDLE: Duration = Duration::from_secs(1);
/// Pause between pings once one went out.
const PING_INTERVAL: Duration = Duration::from_secs(300);
/// Deadline for the `mnlistdiff` reply to a `getmnlistd`.
const MNLISTDIFF_TIMEOUT: Duration = Duration::from_secs(30);
/// Tolerated clock skew of a spork signing time.
const SPORK_MAX_FUTURE: i64 = 2 * 3600;

#[derive(Default)]
struct PingState {
    nonce: Option<u64>,
    sent_at: Option<Instant>,
    time_ms: Option<u64>,
}

enum WriteRequest {
    Data { bytes: Vec<u8>, done: oneshot::Sender<std::io::Result<()>> },
    Shutdown,
}

struct PeerInner {
    peer: String,
    config: Arc<P2pConfig>,
    shared: Arc<NetShared>,
    host: Arc<dyn P2pHost>,
    sml_entry: Option<MasternodeListEntry>,
    started: Instant,
    open: AtomicBool,
    torn_down: AtomicBool,
    read_time_ms: AtomicU64,
    write_time_ms: AtomicU64,
    read_bytes: AtomicU64,
    write_bytes: AtomicU64,
    remote_version: OnceLock<VersionMessage>,
    ping: StdMutex<PingState>,
    writer_tx: mpsc::UnboundedSender<WriteRequest>,
    mnlistdiff_tx: mpsc::Sender<MnListDiff>,
    mnlistdiff_rx: TokioMutex<mpsc::Receiver<MnListDiff>>,
    mix: StdMutex<Option<MixSender>>,
}

/// A handle to one peer connection. Clones share the connection.
#[derive(Clone)]
pub struct Peer {
    inner: Arc<PeerInner>,
}

impl Peer {
    /// Opens a TCP connection to `peer` (`host:port`), performs the
    /// handshake and spawns the connection tasks.
    ///
    /// When `mix` is given, the PrivateSend message subset is routed into
    /// it and a `Disconnected` sentinel is pushed on teardown; exactly one
    /// mixing session may be attached.
    pub async fn connect(
        config: Arc<P2pConfig>,
        shared: Arc<NetShared>,
        host: Arc<dyn P2pHost>,
        peer: &str,
        sml_entry: Option<MasternodeListEntry>,
        mix: Option<MixSender>,
    ) -> Result<Peer, DisconnectReason> {
        let (host_str, port) = split_host_port(peer)?;
        let ip: IpAddr = match host_str.parse() {
            Ok(ip) => ip,
            Err(_) => host
                .resolve_host(&host_str)
                .ok_or_else(|| DisconnectReason::BadPeerAddress(peer.to_string()))?,
        };
        let addr = SocketAddr::new(ip, port);

        log::info!("{}: open connection", peer);
        let stream = TcpStream::connect(addr).await?;
        Self::from_stream(config, shared, host, peer, stream, sml_entry, mix).await
    }

    /// Like [`Peer::connect`], but drives a connection the host already
    /// established, e.g. through a SOCKS proxy.
    pub async fn from_stream(
        config: Arc<P2pConfig>,
        shared: Arc<NetShared>,
        host: Arc<dyn P2pHost>,
        peer: &str,
        stream: TcpStream,
        sml_entry: Option<MasternodeListEntry>,
        mix: Option<MixSender>,
    ) -> Result<Peer, DisconnectReason> {
        let addr = stream.peer_addr()?;
        let (read_half, write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        let (writer_tx, writer_rx) = mpsc::unbounded_channel();
        let (mnlistdiff_tx, mnlistdiff_rx) = mpsc::channel(1);
        let inner = Arc::new(PeerInner {
            peer: peer.to_string(),
            config,
            shared,
            host,
            sml_entry,
            started: Instant::now(),
            open: AtomicBool::new(true),
            torn_down: AtomicBool::new(false),
            read_time_ms: AtomicU64::new(0),
            write_time_ms: AtomicU64::new(0),
            read_bytes: AtomicU64::new(0),
            write_bytes: AtomicU64::new(0),
            remote_version: OnceLock::new(),
            ping: StdMutex::new(PingState::default()),
            writer_tx,
            mnlistdiff_tx,
            mnlistdiff_rx: TokioMutex::new(mnlistdiff_rx),
            mix: StdMutex::new(mix),
        });

        let mut tasks = JoinSet::new();
        tasks.spawn(writer_task(inner.clone(), write_half, writer_rx));

        if let Err(reason) = handshake(&inner, &mut reader, addr).await {
            inner.teardown();
            tasks.abort_all();
            return Err(reason);
        }
        log::info!("{}: connection established", peer);

        tasks.spawn(process_msgs(inner.clone(), reader));
        tasks.spawn(process_ping(inner.clone()));
        tasks.spawn(monitor_connection(inner.clone()));

        let supervised = inner.clone();
        tokio::spawn(async move {
            let reason = loop {
                match tasks.join_next().await {
                    Some(Ok(Err(reason))) => break reason,
                    Some(Ok(Ok(()))) => continue,
                    Some(Err(join_error)) if join_error.is_cancelled() => {
                        break DisconnectReason::Closed
                    }
                    Some(Err(join_error)) => {
                        break DisconnectReason::Internal(join_error.to_string())
                    }
                    None => break DisconnectReason::Closed,
                }
            };
            log::log!(
                reason.log_level(),
                "{}: disconnecting due to {}",
                supervised.peer,
                reason
            );
            tasks.abort_all();
            supervised.teardown();
        });

        Ok(Peer { inner })
    }

    /// The `host:port` this peer was connected to.
    pub fn peer(&self) -> &str {
        &self.inner.peer
    }

    pub fn is_open(&self) -> bool {
        self.inner.open.load(Ordering::SeqCst)
    }

    /// The peer's `version` message from the handshake.
    pub fn remote_version(&self) -> Option<VersionMessage> {
        self.inner.remote_version.get().cloned()
    }

    /// Round-trip time of the last answered ping.
    pub fn ping_time_ms(&self) -> Option<u64> {
        lock(&self.inner.ping).time_ms
    }

    /// Bytes written to and read from the socket so far.
    pub fn traffic(&self) -> (u64, u64) {
        (
            self.inner.write_bytes.load(Ordering::SeqCst),
            self.inner.read_bytes.load(Ordering::SeqCst),
        )
    }

    /// Frames and writes one message; returns once the writer drained.
    pub async fn send_msg(&self, message: &NetworkMessage) -> Result<(), DisconnectReason> {
        self.inner.send_msg(message).await
    }

    /// Requests the masternode list diff between two heights and awaits the
    /// reply. Stale queue entries are drained first.
    pub async fn getmnlistd(
        &self,
        base_height: u32,
        height: u32,
    ) -> Result<MnListDiff, RequestError> {
        let inner = &self.inner;
        let base_block_hash =
            inner.host.block_hash(base_height).ok_or(RequestError::UnknownHeight(base_height))?;
        let block_hash = inner.host.block_hash(height).ok_or(RequestError::UnknownHeight(height))?;

        let mut rx = inner.mnlistdiff_rx.lock().await;
        while rx.try_recv().is_ok() {
            log::info!("{}: unasked mnlistdiff msg", inner.peer);
        }
        inner
            .send_msg(&NetworkMessage::GetMnListD(GetMnListDiff { base_block_hash, block_hash }))
            .await?;
        match timeout(MNLISTDIFF_TIMEOUT, rx.recv()).await {
            Err(_) => Err(RequestError::Timeout),
            Ok(None) => Err(RequestError::Disconnect(DisconnectReason::Closed)),
            Ok(Some(diff)) => Ok(diff),
        }
    }

    /// Records ban metadata for this peer; does not itself close the
    /// connection.
    pub fn ban(&self, message: &str, ban_time: Option<Duration>) {
        self.inner.shared.ban(&self.inner.peer, message, ban_time);
        match ban_time {
            Some(time) => log::info!("{}: banned (for {:?}): {}", self.inner.peer, time, message),
            None => log::info!("{}: banned: {}", self.inner.peer, message),
        }
    }

    /// Closes the connection. Idempotent; an attached mixing session is
    /// woken through its queue sentinel.
    pub fn close(&self) {
        self.inner.teardown();
        // monitor_connection stops the remaining tasks
    }
}

impl PeerInner {
    fn now_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn touch_read(&self, bytes: u64) {
        self.read_time_ms.store(self.now_ms(), Ordering::SeqCst);
        self.read_bytes.fetch_add(bytes, Ordering::SeqCst);
    }

    fn touch_write(&self, bytes: u64) {
        self.write_time_ms.store(self.now_ms(), Ordering::SeqCst);
        self.write_bytes.fetch_add(bytes, Ordering::SeqCst);
    }

    /// Peer is sending/receiving data within the last `window`.
    fn is_active(&self, window: Duration) -> bool {
        let now = self.now_ms();
        let window = window.as_millis() as u64;
        now.saturating_sub(self.read_time_ms.load(Ordering::SeqCst)) < window
            || now.saturating_sub(self.write_time_ms.load(Ordering::SeqCst)) < window
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Runs the teardown exactly once: marks the peer closed, stops the
    /// writer, wakes an attached session and notifies the host.
    fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.open.store(false, Ordering::SeqCst);
        let _ = self.writer_tx.send(WriteRequest::Shutdown);
        if let Some(mix) = lock(&self.mix).take() {
            let _ = mix.send(MixInbound::Disconnected);
        }
        self.host.connection_down(&self.peer);
    }

    async fn send_msg(&self, message: &NetworkMessage) -> Result<(), DisconnectReason> {
        if !self.is_open() {
            return Err(DisconnectReason::Closed);
        }
        log::debug!("{}: --> {}", self.peer, message.command());
        let bytes = frame_message(self.config.network.magic(), message)
            .map_err(|e| DisconnectReason::Internal(e.to_string()))?;
        let (done_tx, done_rx) = oneshot::channel();
        self.writer_tx
            .send(WriteRequest::Data { bytes, done: done_tx })
            .map_err(|_| DisconnectReason::Closed)?;
        match done_rx.await {
            Ok(result) => result.map_err(DisconnectReason::Io),
            Err(_) => Err(DisconnectReason::Closed),
        }
    }
}

/// Serializes the full envelope of a message.
fn frame_message(magic: u32, message: &NetworkMessage) -> std::io::Result<Vec<u8>> {
    let payload = message.payload()?;
    let mut out = Vec::with_capacity(24 + payload.len());
    magic.consensus_encode(&mut out)?;
    message.command().consensus_encode(&mut out)?;
    (payload.len() as u32).consensus_encode(&mut out)?;
    payload_checksum(&payload).consensus_encode(&mut out)?;
    out.extend_from_slice(&payload);
    Ok(out)
}

/// The writer task: the single owner of the socket's write half. Byte and
/// time accounting happens here, once, after the flush.
async fn writer_task(
    inner: Arc<PeerInner>,
    mut write_half: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<WriteRequest>,
) -> Result<(), DisconnectReason> {
    while let Some(request) = rx.recv().await {
        match request {
            WriteRequest::Shutdown => break,
            WriteRequest::Data { bytes, done } => {
                let len = bytes.len() as u64;
                let result = async {
                    write_half.write_all(&bytes).await?;
                    write_half.flush().await
                }
                .await;
                if result.is_ok() {
                    inner.touch_write(len);
                }
                let _ = done.send(result);
            }
        }
    }
    Ok(())
}

/// Builds and sends our `version` message.
async fn send_version(
    inner: &Arc<PeerInner>,
    remote: SocketAddr,
) -> Result<(), DisconnectReason> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    let local: SocketAddr =
        SocketAddr::new(IpAddr::from([127, 0, 0, 1]), inner.config.network.default_port());
    let version = VersionMessage {
        version: PROTOCOL_VERSION,
        services: ServiceFlags::empty(),
        timestamp,
        receiver: Address::new(&remote, ServiceFlags::NETWORK),
        sender: Address::new(&local, ServiceFlags::empty()),
        nonce: rand::random(),
        user_agent: inner.config.user_agent.clone(),
        start_height: inner.host.local_height(),
        relay: Some(false),
        mn_auth_challenge: None,
        masternode_connection: None,
    };
    inner.send_msg(&NetworkMessage::Version(version)).await
}

/// Performs the version/verack exchange and announces `senddsq`.
async fn handshake(
    inner: &Arc<PeerInner>,
    reader: &mut BufReader<OwnedReadHalf>,
    remote: SocketAddr,
) -> Result<(), DisconnectReason> {
    send_version(inner, remote).await?;
    let mut version_received = false;
    let mut verack_received = false;
    // The next two envelopes must be version and verack, in either order.
    for _ in 0..2 {
        match read_next_msg(inner, reader).await? {
            Some(NetworkMessage::Version(version)) => {
                let _ = inner.remote_version.set(version);
                version_received = true;
                inner.send_msg(&NetworkMessage::Verack).await?;
            }
            Some(NetworkMessage::Verack) => verack_received = true,
            Some(other) => {
                log::info!("{}: unexpected {} during handshake", inner.peer, other.command());
            }
            None => {}
        }
    }
    if !version_received || !verack_received {
        return Err(DisconnectReason::HandshakeFailed);
    }
    inner.send_msg(&NetworkMessage::SendDsq(true)).await?;
    Ok(())
}

/// Reads one envelope, resynchronizing on the magic. Returns `None` when
/// the payload of a known command fails to decode (the message is dropped,
/// the connection lives on). Framing problems are fatal.
async fn read_next_msg(
    inner: &PeerInner,
    reader: &mut BufReader<OwnedReadHalf>,
) -> Result<Option<NetworkMessage>, DisconnectReason> {
    let magic = inner.config.network.magic().to_le_bytes();

    let mut window = [0u8; 4];
    let mut skipped: usize = 0;
    for slot in window.iter_mut() {
        *slot = read_byte(inner, reader).await?;
    }
    while window != magic {
        window.rotate_left(1);
        window[3] = read_byte(inner, reader).await?;
        skipped += 1;
        if skipped > MAX_PAYLOAD_SIZE as usize {
            return Err(DisconnectReason::MagicNotFound(skipped));
        }
    }
    if skipped > 0 {
        log::info!("{}: extra data before start str: {} bytes", inner.peer, skipped);
    }
    inner.touch_read(4 + skipped as u64);

    let mut header = [0u8; 20];
    read_exact(inner, reader, &mut header).await?;
    inner.touch_read(20);
    let command = CommandString::consensus_decode(&mut &header[..12])
        .map_err(|e| DisconnectReason::Internal(e.to_string()))?;
    let payload_len = u32::from_le_bytes([header[12], header[13], header[14], header[15]]);
    if payload_len > MAX_PAYLOAD_SIZE {
        return Err(DisconnectReason::PayloadTooLarge(payload_len));
    }
    let checksum = [header[16], header[17], header[18], header[19]];

    let mut payload = vec![0u8; payload_len as usize];
    read_exact(inner, reader, &mut payload).await?;
    inner.touch_read(payload_len as u64);
    if checksum != payload_checksum(&payload) {
        return Err(DisconnectReason::ChecksumMismatch);
    }

    match NetworkMessage::decode_payload(&command, &payload) {
        Ok(message) => {
            log::debug!("{}: <-- {}", inner.peer, command);
            Ok(Some(message))
        }
        Err(error) => {
            log::debug!("{}: dropping undecodable {} msg: {}", inner.peer, command, error);
            Ok(None)
        }
    }
}

async fn read_byte(
    inner: &PeerInner,
    reader: &mut BufReader<OwnedReadHalf>,
) -> Result<u8, DisconnectReason> {
    match reader.read_u8().await {
        Ok(byte) => Ok(byte),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(if inner.is_open() { DisconnectReason::Eof } else { DisconnectReason::Closed })
        }
        Err(e) => Err(DisconnectReason::Io(e)),
    }
}

async fn read_exact(
    inner: &PeerInner,
    reader: &mut BufReader<OwnedReadHalf>,
    buf: &mut [u8],
) -> Result<(), DisconnectReason> {
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            Err(if inner.is_open() { DisconnectReason::Eof } else { DisconnectReason::Closed })
        }
        Err(e) => Err(DisconnectReason::Io(e)),
    }
}

/// The receive loop: one envelope at a time, dispatched by command.
async fn process_msgs(
    inner: Arc<PeerInner>,
    mut reader: BufReader<OwnedReadHalf>,
) -> Result<(), DisconnectReason> {
    loop {
        if !inner.is_open() {
            return Ok(());
        }
        if let Some(message) = read_next_msg(&inner, &mut reader).await? {
            dispatch(&inner, message).await?;
        }
        tokio::task::yield_now().await;
    }
}

async fn dispatch(
    inner: &Arc<PeerInner>,
    message: NetworkMessage,
) -> Result<(), DisconnectReason> {
    match message {
        NetworkMessage::Ping(nonce) => {
            inner.send_msg(&NetworkMessage::Pong(nonce)).await?;
        }
        NetworkMessage::Pong(nonce) => {
            let mut ping = lock(&inner.ping);
            if ping.nonce == Some(nonce) {
                if let Some(sent_at) = ping.sent_at {
                    ping.time_ms = Some(sent_at.elapsed().as_millis() as u64);
                }
                ping.nonce = None;
                ping.sent_at = None;
            } else {
                log::info!("{}: pong with unknown nonce", inner.peer);
            }
        }
        NetworkMessage::Spork(spork) => {
            process_spork(inner, spork).await?;
        }
        NetworkMessage::Inv(inv) => {
            let mix_attached = lock(&inner.mix).is_some();
            let mut wanted: Vec<Inventory> = Vec::new();
            for entry in inv.inventory {
                if mix_attached {
                    if entry.inv_type == InvType::DsTx {
                        wanted.push(entry);
                    }
                } else if entry.inv_type == InvType::ISLock
                    && inner.shared.note_islock_inv(entry.hash)
                {
                    wanted.push(entry);
                }
            }
            if !wanted.is_empty() {
                inner.send_msg(&NetworkMessage::GetData(InvMessage { inventory: wanted })).await?;
            }
        }
        NetworkMessage::Addr(addr) => {
            inner
                .shared
                .add_found_peers(addr.addresses.iter().map(|(_, a)| a.socket_addr().to_string()));
        }
        NetworkMessage::MnListDiff(diff) => {
            if inner.mnlistdiff_tx.try_send(diff).is_err() {
                log::info!("{}: excess mnlistdiff msg", inner.peer);
            }
        }
        NetworkMessage::ISLock(islock) => {
            inner.shared.push_recent_islock(islock);
        }
        NetworkMessage::Dsq(dsq) => {
            let mix = lock(&inner.mix).clone();
            match mix {
                Some(mix) => {
                    // the session must ignore queues that are not ready
                    if dsq.ready {
                        if verify_dsq_signature(&dsq, inner.sml_entry.as_ref()) {
                            let _ = mix.send(MixInbound::Queue(dsq));
                        } else {
                            log::info!("{}: dsq vchSig verification failed", inner.peer);
                            let _ = mix.send(MixInbound::BadDsqSignature);
                        }
                    }
                }
                None => inner.shared.add_recent_dsq(dsq),
            }
        }
        NetworkMessage::Dssu(dssu) => {
            if let Some(mix) = lock(&inner.mix).clone() {
                let _ = mix.send(MixInbound::StatusUpdate(dssu));
            }
        }
        NetworkMessage::Dsf(dsf) => {
            if let Some(mix) = lock(&inner.mix).clone() {
                let _ = mix.send(MixInbound::FinalTransaction(dsf));
            }
        }
        NetworkMessage::Dsc(dsc) => {
            if let Some(mix) = lock(&inner.mix).clone() {
                let _ = mix.send(MixInbound::Complete(dsc));
            }
        }
        other => {
            log::debug!("{}: ignoring {} msg", inner.peer, other.command());
        }
    }
    Ok(())
}

/// Verifies a spork signature off the event loop and hands the value to the
/// host's spork store. A bad signature is fatal to the peer.
async fn process_spork(
    inner: &Arc<PeerInner>,
    spork: SporkMessage,
) -> Result<(), DisconnectReason> {
    let Some(spork_id) = spork.spork_id() else {
        log::info!("{}: unknown spork id: {}", inner.peer, spork.spork_id);
        return Ok(());
    };
    let new_sigs = inner.host.is_new_spork_sigs();
    let expected = inner.host.spork_pubkey_hash();
    let peer = inner.peer.clone();
    let value = spork.value;
    let verify_ok =
        tokio::task::spawn_blocking(move || verify_spork(&spork, new_sigs, &expected, &peer))
            .await
            .map_err(|e| DisconnectReason::Internal(e.to_string()))?;
    if !verify_ok {
        return Err(DisconnectReason::SporkVerifyFailed);
    }
    inner.host.set_spork(spork_id, value, &inner.peer);
    Ok(())
}

fn verify_spork(
    spork: &SporkMessage,
    new_sigs: bool,
    expected: &PubkeyHash,
    peer: &str,
) -> bool {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default();
    if spork.time_signed > now + SPORK_MAX_FUTURE {
        log::info!("{}: spork signed too far in the future", peer);
        return false;
    }
    // Try the configured signature style first, then the other one.
    for sigs in [new_sigs, !new_sigs] {
        match spork.recover_signer(sigs) {
            Ok(signer) if signer == *expected => return true,
            Ok(_) => {}
            Err(e) => log::info!("{}: spork verification error: {}", peer, e),
        }
    }
    log::info!("{}: spork address differs from hardcoded", peer);
    false
}

/// The ping scheduler: whenever the link has been idle for a second, send a
/// ping, then back off for five minutes.
async fn process_ping(inner: Arc<PeerInner>) -> Result<(), DisconnectReason> {
    loop {
        while inner.is_active(PING_IDLE) {
            sleep(Duration::from_millis(500)).await;
            if !inner.is_open() {
                return Ok(());
            }
        }
        let nonce: u64 = rand::random();
        {
            let mut ping = lock(&inner.ping);
            ping.nonce = Some(nonce);
            ping.sent_at = Some(Instant::now());
        }
        inner.send_msg(&NetworkMessage::Ping(nonce)).await?;
        sleep(PING_INTERVAL).await;
        if !inner.is_open() {
            return Ok(());
        }
    }
}

/// The healthy connection keeps `write_time - read_time < net_timeout`:
/// once the last write is a full timeout ahead of the last read, we are
/// stuck.
fn read_timed_out(write_time_ms: u64, read_time_ms: u64, net_timeout_ms: u64) -> bool {
    write_time_ms.saturating_sub(read_time_ms) >= net_timeout_ms
}

/// The liveness monitor: if we keep writing without hearing back within
/// the host's network timeout, the connection is stuck.
async fn monitor_connection(inner: Arc<PeerInner>) -> Result<(), DisconnectReason> {
    let net_timeout = inner.host.network_timeout().as_millis() as u64;
    loop {
        sleep(Duration::from_secs(1)).await;
        if !inner.is_open() {
            return Err(DisconnectReason::Closed);
        }
        let write_time = inner.write_time_ms.load(Ordering::SeqCst);
        let read_time = inner.read_time_ms.load(Ordering::SeqCst);
        if read_timed_out(write_time, read_time, net_timeout) {
            return Err(DisconnectReason::ReadTimeout);
        }
    }
}
