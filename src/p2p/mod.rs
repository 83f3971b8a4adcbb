//! Dash P2P client.
//!
//! One [`Peer`](peer::Peer) per outbound TCP connection, driving the
//! version/verack handshake, keepalive and message demultiplexing, and one
//! [`MixSession`](mix_session::MixSession) per PrivateSend denominate round.
//! The host application supplies chain data and policy through [`P2pHost`]
//! and the cross-peer in-memory state through [`NetShared`].

pub mod mix_session;
pub mod peer;

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::IpAddr;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;

use crate::hash_types::{BlockHash, PubkeyHash, Sha256dHash};
use crate::network::constants::Network;
use crate::network::message_llmq::InstantSendLock;
use crate::network::message_privatesend::{
    CoinJoinComplete, CoinJoinFinalTransaction, CoinJoinQueue, CoinJoinStatusUpdate,
};
use crate::network::message_spork::SporkId;
use crate::sml::masternode_list::MasternodeList;

/// Smallest allowed `max_peers` setting.
pub const MIN_PEERS_LIMIT: usize = 2;
/// Largest allowed `max_peers` setting.
pub const MAX_PEERS_LIMIT: usize = 16;
/// Default `max_peers` setting.
pub const MAX_PEERS_DEFAULT: usize = 2;

const RECENT_ISLOCK_INVS_CAP: usize = 200;
const RECENT_ISLOCKS_CAP: usize = 50;
const RECENT_DSQ_CAP: usize = 100;
const RECENT_MIX_MNS_CAP: usize = 10;

/// Configuration of the P2P client.
#[derive(Clone, Debug)]
pub struct P2pConfig {
    /// Which Dash network to speak to.
    pub network: Network,
    /// `host:port` peers to use when `use_static_peers` is set.
    pub static_peers: Vec<String>,
    /// Connect only to `static_peers` instead of discovered ones.
    pub use_static_peers: bool,
    /// How many peers to keep connected, clamped to
    /// `MIN_PEERS_LIMIT..=MAX_PEERS_LIMIT`.
    pub max_peers: usize,
    /// User agent sent in our `version` message, at most 256 bytes.
    pub user_agent: String,
}

impl P2pConfig {
    pub fn new(network: Network) -> Self {
        P2pConfig {
            network,
            static_peers: Vec::new(),
            use_static_peers: false,
            max_peers: MAX_PEERS_DEFAULT,
            user_agent: format!("/Dash Electrum:{}/", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets `max_peers`, clamped into the allowed range.
    pub fn with_max_peers(mut self, max_peers: usize) -> Self {
        self.max_peers = max_peers.clamp(MIN_PEERS_LIMIT, MAX_PEERS_LIMIT);
        self
    }
}

/// Splits a `host:port` peer string. The host may be an IPv6 address, hence
/// the split happens at the last colon.
pub fn split_host_port(peer: &str) -> Result<(String, u16), DisconnectReason> {
    let (host, port) = peer
        .rsplit_once(':')
        .ok_or_else(|| DisconnectReason::BadPeerAddress(peer.to_string()))?;
    if host.is_empty() {
        return Err(DisconnectReason::BadPeerAddress(peer.to_string()));
    }
    let port: u16 = port.parse().map_err(|_| DisconnectReason::BadPeerAddress(peer.to_string()))?;
    if port == 0 {
        return Err(DisconnectReason::BadPeerAddress(peer.to_string()));
    }
    Ok((host.trim_start_matches('[').trim_end_matches(']').to_string(), port))
}

/// Why a peer connection was torn down.
#[derive(Debug, Error)]
pub enum DisconnectReason {
    /// The two handshake envelopes were not a `version` and a `verack`.
    #[error("peer version handshake failed")]
    HandshakeFailed,
    /// We kept writing without hearing back within the network timeout.
    #[error("read timeout")]
    ReadTimeout,
    /// The start string was not found within the scan limit.
    #[error("start str not found in {0} bytes read")]
    MagicNotFound(usize),
    /// An envelope declared a payload over the 32 MiB limit.
    #[error("incoming msg payload too large: {0} bytes")]
    PayloadTooLarge(u32),
    /// An envelope checksum did not match its payload.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// A spork message failed signature verification.
    #[error("verify_spork failed")]
    SporkVerifyFailed,
    /// The remote closed the connection.
    #[error("EOF reached")]
    Eof,
    /// The peer session was closed locally.
    #[error("peer session was closed")]
    Closed,
    /// The peer string did not parse or resolve.
    #[error("invalid peer address: {0}")]
    BadPeerAddress(String),
    /// A transport error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Anything that should not happen.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DisconnectReason {
    /// Level at which the disconnect is logged. Expected protocol and
    /// transport failures are routine; internal errors are not.
    pub fn log_level(&self) -> log::Level {
        match self {
            DisconnectReason::Internal(_) => log::Level::Error,
            _ => log::Level::Info,
        }
    }
}

/// A failure of a request/response exchange on an otherwise healthy peer.
#[derive(Debug, Error)]
pub enum RequestError {
    /// No reply arrived within the deadline.
    #[error("request timed out")]
    Timeout,
    /// The host has no block hash for the requested height.
    #[error("no block hash for height {0}")]
    UnknownHeight(u32),
    /// The peer went away while waiting.
    #[error(transparent)]
    Disconnect(#[from] DisconnectReason),
}

/// Chain data and policy the P2P core consumes from its host.
pub trait P2pHost: Send + Sync + 'static {
    /// Block hash at `height` from the host's header chain.
    fn block_hash(&self, height: u32) -> Option<BlockHash>;

    /// The host's current chain height.
    fn local_height(&self) -> i32;

    /// How long we keep writing without hearing back before giving up.
    fn network_timeout(&self) -> Duration {
        Duration::from_secs(30)
    }

    /// Hash160 of the key sporks must be signed with.
    fn spork_pubkey_hash(&self) -> PubkeyHash;

    /// Whether `SPORK_6_NEW_SIGS` style signatures are expected.
    fn is_new_spork_sigs(&self) -> bool {
        true
    }

    /// Accept a verified spork value.
    fn set_spork(&self, spork_id: SporkId, value: i64, peer: &str);

    /// Resolve a non-IP hostname, e.g. over DNS-over-HTTPS. `None` when the
    /// host cannot resolve it.
    fn resolve_host(&self, _host: &str) -> Option<IpAddr> {
        None
    }

    /// Called exactly once when a peer connection goes down.
    fn connection_down(&self, _peer: &str) {}
}

/// A ban record.
#[derive(Clone, Debug)]
pub struct BanEntry {
    pub message: String,
    /// `None` bans until restart.
    pub until: Option<Instant>,
}

// Poison-tolerant lock: a panicked holder cannot corrupt these collections
// beyond what the panic already did.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory state shared by every peer of one network instance.
///
/// All access goes through narrow operations so tests can observe and
/// prepopulate it.
#[derive(Default)]
pub struct NetShared {
    found_peers: Mutex<HashSet<String>>,
    recent_islock_invs: Mutex<VecDeque<Sha256dHash>>,
    recent_islocks: Mutex<VecDeque<InstantSendLock>>,
    recent_dsq: Mutex<VecDeque<CoinJoinQueue>>,
    banlist: Mutex<HashMap<String, BanEntry>>,
    recent_mixes_mns: Mutex<VecDeque<String>>,
    mn_list: RwLock<MasternodeList>,
}

impl NetShared {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges discovered peer addresses into the known set.
    pub fn add_found_peers<I: IntoIterator<Item = String>>(&self, peers: I) {
        lock(&self.found_peers).extend(peers);
    }

    /// Snapshot of the discovered peers.
    pub fn found_peers(&self) -> HashSet<String> {
        lock(&self.found_peers).clone()
    }

    /// Returns true and records the inv if this islock inventory hash has
    /// not been seen recently.
    pub fn note_islock_inv(&self, hash: Sha256dHash) -> bool {
        let mut invs = lock(&self.recent_islock_invs);
        if invs.contains(&hash) {
            return false;
        }
        if invs.len() == RECENT_ISLOCK_INVS_CAP {
            invs.pop_front();
        }
        invs.push_back(hash);
        true
    }

    pub fn push_recent_islock(&self, islock: InstantSendLock) {
        let mut islocks = lock(&self.recent_islocks);
        if islocks.len() == RECENT_ISLOCKS_CAP {
            islocks.pop_front();
        }
        islocks.push_back(islock);
    }

    pub fn recent_islocks(&self) -> Vec<InstantSendLock> {
        lock(&self.recent_islocks).iter().cloned().collect()
    }

    pub fn add_recent_dsq(&self, dsq: CoinJoinQueue) {
        let mut dsqs = lock(&self.recent_dsq);
        if dsqs.len() == RECENT_DSQ_CAP {
            dsqs.pop_front();
        }
        dsqs.push_back(dsq);
    }

    pub fn recent_dsq(&self) -> Vec<CoinJoinQueue> {
        lock(&self.recent_dsq).iter().cloned().collect()
    }

    /// Records a time-bounded ban for a peer.
    pub fn ban(&self, peer: &str, message: &str, ban_time: Option<Duration>) {
        let entry =
            BanEntry { message: message.to_string(), until: ban_time.map(|t| Instant::now() + t) };
        lock(&self.banlist).insert(peer.to_string(), entry);
    }

    /// Whether a peer is currently banned; expired bans are pruned.
    pub fn is_banned(&self, peer: &str) -> bool {
        let mut banlist = lock(&self.banlist);
        match banlist.get(peer) {
            Some(BanEntry { until: Some(until), .. }) if *until <= Instant::now() => {
                banlist.remove(peer);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn ban_entry(&self, peer: &str) -> Option<BanEntry> {
        lock(&self.banlist).get(peer).cloned()
    }

    /// Remembers that a masternode was used for mixing recently.
    pub fn note_recent_mix_mn(&self, peer: &str) {
        let mut recent = lock(&self.recent_mixes_mns);
        if recent.len() == RECENT_MIX_MNS_CAP {
            recent.pop_front();
        }
        recent.push_back(peer.to_string());
    }

    pub fn is_recent_mix_mn(&self, peer: &str) -> bool {
        lock(&self.recent_mixes_mns).iter().any(|p| p == peer)
    }

    /// Read access to the masternode list snapshot.
    pub fn with_mn_list<R>(&self, f: impl FnOnce(&MasternodeList) -> R) -> R {
        f(&self.mn_list.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Write access to the masternode list snapshot.
    pub fn with_mn_list_mut<R>(&self, f: impl FnOnce(&mut MasternodeList) -> R) -> R {
        f(&mut self.mn_list.write().unwrap_or_else(PoisonError::into_inner))
    }
}

/// What a peer feeds into an attached mixing session's queue.
#[derive(Debug)]
pub enum MixInbound {
    StatusUpdate(CoinJoinStatusUpdate),
    Queue(CoinJoinQueue),
    FinalTransaction(CoinJoinFinalTransaction),
    Complete(CoinJoinComplete),
    /// A `dsq` for the session failed BLS verification.
    BadDsqSignature,
    /// The peer connection died; the session must stop waiting.
    Disconnected,
}

/// Sending side of a mixing session's message queue.
pub type MixSender = mpsc::UnboundedSender<MixInbound>;

#[cfg(test)]
mod tests {
    use bitcoin_hashes::Hash;

    use super::*;

    #[test]
    fn split_host_port_accepts_ipv6() {
        assert_eq!(split_host_port("1.2.3.4:9999").unwrap(), ("1.2.3.4".to_string(), 9999));
        assert_eq!(split_host_port("[2001:db8::1]:9999").unwrap(), ("2001:db8::1".to_string(), 9999));
        assert!(split_host_port("nocolon").is_err());
        assert!(split_host_port(":9999").is_err());
        assert!(split_host_port("host:0").is_err());
        assert!(split_host_port("host:notaport").is_err());
    }

    #[test]
    fn islock_inv_dedup_is_bounded() {
        let shared = NetShared::new();
        let hash = Sha256dHash::hash(b"first");
        assert!(shared.note_islock_inv(hash));
        assert!(!shared.note_islock_inv(hash));
        for i in 0..RECENT_ISLOCK_INVS_CAP {
            shared.note_islock_inv(Sha256dHash::hash(&i.to_le_bytes()));
        }
        // the original entry has been evicted by now
        assert!(shared.note_islock_inv(hash));
    }

    #[test]
    fn bans_expire() {
        let shared = NetShared::new();
        shared.ban("1.2.3.4:9999", "misbehaving", Some(Duration::from_secs(0)));
        assert!(!shared.is_banned("1.2.3.4:9999"));
        shared.ban("1.2.3.4:9999", "misbehaving", None);
        assert!(shared.is_banned("1.2.3.4:9999"));
        assert!(!shared.is_banned("4.3.2.1:9999"));
    }

    #[test]
    fn max_peers_is_clamped() {
        let config = P2pConfig::new(Network::Testnet).with_max_peers(1000);
        assert_eq!(config.max_peers, MAX_PEERS_LIMIT);
        let config = P2pConfig::new(Network::Testnet).with_max_peers(0);
        assert_eq!(config.max_peers, MIN_PEERS_LIMIT);
    }
}
