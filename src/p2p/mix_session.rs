//! One PrivateSend mixing session.
//!
//! A [`MixSession`] drives a single denominate round against one
//! masternode: it selects the masternode (from a `dsq` offer or at random),
//! attaches a [`Peer`](super::peer::Peer) whose receive loop feeds the
//! session queue, then walks the `dsa`, `dsq`, `dsi`, `dsf`, `dss`, `dsc`
//! ladder, verifying the masternode's BLS signatures and the final
//! transaction along the way.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;

use crate::blockdata::script::ScriptBuf;
use crate::blockdata::transaction::{OutPoint, Transaction, TxIn, TxOut};
use crate::consensus::encode;
use crate::network::message::NetworkMessage;
use crate::network::message_privatesend::{
    pool_message_str, pool_state_str, CoinJoinAccept, CoinJoinComplete, CoinJoinEntry,
    CoinJoinFinalTransaction, CoinJoinQueue, CoinJoinSignedInputs, CoinJoinStatusUpdate,
    PoolMessage, PoolStatusUpdate,
};
use crate::p2p::peer::Peer;
use crate::p2p::{DisconnectReason, MixInbound, NetShared, P2pConfig, P2pHost};
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// How long we wait for a queue to become ready after `dsa`.
pub const PRIVATESEND_QUEUE_TIMEOUT: Duration = Duration::from_secs(30);
/// Default deadline for every other session step.
pub const PRIVATESEND_SESSION_MSG_TIMEOUT: Duration = Duration::from_secs(40);

/// Why a mixing session ended without completing.
#[derive(Debug, Error)]
pub enum MixError {
    /// No message from the masternode within the step deadline.
    #[error("session timeout, reset")]
    Timeout,
    /// The peer connection closed while waiting.
    #[error("peer connection closed")]
    PeerClosed,
    /// The masternode's queue is full.
    #[error("MN queue is full")]
    QueueFull,
    /// The masternode rejected us; the id decodes via `pool_message_str`.
    #[error("masternode replied: {}", pool_message_str(*.0))]
    Rejected(i32),
    /// A `dssu` carried a status update outside the known values.
    #[error("unknown dssu statusUpdate: {0}")]
    UnknownStatusUpdate(i32),
    /// A message named a session other than ours.
    #[error("wrong session id {got}, was {expected}")]
    UnexpectedSessionId { got: i32, expected: i32 },
    /// A `dsq` for a denomination we are not mixing.
    #[error("wrong denom in dsq msg: {got}, session denom is {expected}")]
    WrongDenom { got: i32, expected: i32 },
    /// A `dsq` arrived with `fReady` unset.
    #[error("got dsq with fReady not set")]
    DsqNotReady,
    /// A second ready `dsq` arrived on the session.
    #[error("another dsq on session with fReady set")]
    DuplicateDsq,
    /// The masternode's `dsq` signature did not verify.
    #[error("dsq vchSig verification failed")]
    BadDsqSignature,
    /// The final transaction did not contain our inputs and outputs.
    #[error("wrong txFinal")]
    WrongFinalTx,
    /// The masternode sent a message the current step cannot use.
    #[error("unexpected message for the current session step")]
    UnexpectedMessage,
    /// No masternode list entry to mix with.
    #[error("no SML entries found")]
    NoMasternode,
    /// Only recently used masternodes were drawn.
    #[error("can not select random not recently used MN")]
    NoFreshMasternode,
    /// The session already has a running peer.
    #[error("session already has a running peer")]
    PeerAlreadyRunning,
    /// The session's peer is not connected yet.
    #[error("session peer is not running")]
    PeerNotRunning,
    /// The peer connection failed or died underneath the session.
    #[error(transparent)]
    Peer(#[from] DisconnectReason),
    /// A message could not be built within the protocol bounds.
    #[error(transparent)]
    Codec(#[from] encode::Error),
    /// The host's signer refused to sign the final transaction.
    #[error("signing failed: {0}")]
    SigningFailed(String),
}

/// The inputs and outputs of one denominate workflow, the session's local
/// view against which `dsf` is checked.
#[derive(Clone, Debug, Default)]
pub struct DenominateWorkflow {
    /// Outpoints we are mixing.
    pub inputs: Vec<OutPoint>,
    /// Scripts of the denominated outputs we expect to be created.
    pub outputs: Vec<ScriptBuf>,
}

/// What [`MixSession::read_next_msg`] distilled from the queue.
#[derive(Debug)]
pub enum MixEvent {
    /// A `dssu` was applied to the session state.
    StatusUpdate,
    /// Our queue is ready to mix.
    QueueReady,
    /// The final transaction, already checked against the workflow.
    FinalTransaction(Transaction),
    /// The masternode reported success.
    Complete,
}

/// Verify the BLS signature of a `dsq` message against the operator key of
/// the masternode's SML entry.
pub fn verify_dsq_signature(dsq: &CoinJoinQueue, sml_entry: Option<&MasternodeListEntry>) -> bool {
    use bitcoin_hashes::Hash;
    let Some(entry) = sml_entry else {
        return false;
    };
    dsq.signature
        .verify(&entry.operator_public_key, &dsq.msg_hash().to_byte_array())
        .is_ok()
}

impl std::fmt::Debug for MixSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixSession")
            .field("wfl_lid", &self.wfl_lid)
            .field("denom_value", &self.denom_value)
            .field("denomination", &self.denomination)
            .field("session_id", &self.session_id)
            .field("pool_state", &self.pool_state)
            .field("message_id", &self.message_id)
            .field("entries_count", &self.entries_count)
            .field("masternode_outpoint", &self.masternode_outpoint)
            .field("ready", &self.ready)
            .field("queue_time", &self.queue_time)
            .finish()
    }
}

/// P2P session with a mixing masternode.
pub struct MixSession {
    wfl_lid: String,
    denom_value: u64,
    denomination: i32,
    sml_entry: MasternodeListEntry,
    peer: Option<Peer>,
    queue_tx: Option<mpsc::UnboundedSender<MixInbound>>,
    queue_rx: mpsc::UnboundedReceiver<MixInbound>,
    session_id: i32,
    pool_state: Option<i32>,
    message_id: Option<i32>,
    entries_count: i32,
    masternode_outpoint: Option<OutPoint>,
    ready: bool,
    queue_time: i64,
    started: Instant,
}

impl MixSession {
    /// Creates a session for one denomination.
    ///
    /// With a `dsq` offer the masternode is looked up by its collateral
    /// outpoint; otherwise a random masternode not recently used for mixing
    /// is drawn, giving up after ten attempts. The chosen masternode is
    /// recorded in the recent-mix list.
    pub fn new(
        shared: &NetShared,
        denom_value: u64,
        denomination: i32,
        dsq: Option<&CoinJoinQueue>,
        wfl_lid: impl Into<String>,
    ) -> Result<MixSession, MixError> {
        let mut sml_entry = None;
        if let Some(dsq) = dsq {
            sml_entry = shared
                .with_mn_list(|list| list.get_mn_by_outpoint(&dsq.masternode_outpoint).cloned());
        }
        let sml_entry = match sml_entry {
            Some(entry) => entry,
            None => {
                let mut try_cnt = 0;
                loop {
                    try_cnt += 1;
                    let candidate = shared
                        .with_mn_list(|list| list.get_random_mn().cloned())
                        .ok_or(MixError::NoMasternode)?;
                    if !shared.is_recent_mix_mn(&candidate.service_address.to_string()) {
                        break candidate;
                    }
                    if try_cnt >= 10 {
                        return Err(MixError::NoFreshMasternode);
                    }
                }
            }
        };
        shared.note_recent_mix_mn(&sml_entry.service_address.to_string());

        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Ok(MixSession {
            wfl_lid: wfl_lid.into(),
            denom_value,
            denomination,
            sml_entry,
            peer: None,
            queue_tx: Some(queue_tx),
            queue_rx,
            session_id: 0,
            pool_state: None,
            message_id: None,
            entries_count: 0,
            masternode_outpoint: None,
            ready: false,
            queue_time: 0,
            started: Instant::now(),
        })
    }

    /// The `host:port` of the selected masternode.
    pub fn peer_str(&self) -> String {
        self.sml_entry.service_address.to_string()
    }

    /// The selected masternode's SML entry.
    pub fn sml_entry(&self) -> &MasternodeListEntry {
        &self.sml_entry
    }

    pub fn session_id(&self) -> i32 {
        self.session_id
    }

    pub fn entries_count(&self) -> i32 {
        self.entries_count
    }

    /// Message id of the last `dssu`.
    pub fn message_id(&self) -> Option<i32> {
        self.message_id
    }

    /// Masternode outpoint named by the ready `dsq`, once received.
    pub fn masternode_outpoint(&self) -> Option<OutPoint> {
        self.masternode_outpoint
    }

    /// Creation time of the ready `dsq`, once received.
    pub fn queue_time(&self) -> i64 {
        self.queue_time
    }

    /// Last reported pool state, human readable.
    pub fn state_str(&self) -> &'static str {
        self.pool_state.map(pool_state_str).unwrap_or("UNKNOWN")
    }

    /// How long the session has been running.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Connects the peer to the selected masternode and attaches the
    /// session queue to it. Fails fast if the peer cannot be established.
    pub async fn run_peer(
        &mut self,
        config: Arc<P2pConfig>,
        shared: Arc<NetShared>,
        host: Arc<dyn P2pHost>,
    ) -> Result<(), MixError> {
        if self.peer.is_some() {
            return Err(MixError::PeerAlreadyRunning);
        }
        let queue_tx = self.queue_tx.take().ok_or(MixError::PeerAlreadyRunning)?;
        let peer = Peer::connect(
            config,
            shared,
            host,
            &self.peer_str(),
            Some(self.sml_entry.clone()),
            Some(queue_tx),
        )
        .await?;
        log::info!(
            "{}: started mixing session, peer: {}, denom_value={} (nDenom={})",
            self.wfl_lid,
            self.peer_str(),
            self.denom_value,
            self.denomination
        );
        self.peer = Some(peer);
        Ok(())
    }

    /// Closes the attached peer, if any.
    pub fn close_peer(&self) {
        if let Some(peer) = &self.peer {
            peer.close();
            log::info!("{}: stopped mixing session, peer: {}", self.wfl_lid, self.peer_str());
        }
    }

    fn peer(&self) -> Result<&Peer, MixError> {
        self.peer.as_ref().ok_or(MixError::PeerNotRunning)
    }

    /// Sends `dsa` to join or create a mixing queue.
    pub async fn send_dsa(&self, pay_collateral_tx: &Transaction) -> Result<(), MixError> {
        let msg = NetworkMessage::Dsa(CoinJoinAccept {
            denomination: self.denomination,
            tx_collateral: pay_collateral_tx.clone(),
        });
        self.peer()?.send_msg(&msg).await?;
        log::debug!("{}: dsa sent", self.wfl_lid);
        Ok(())
    }

    /// Sends `dsi` with the workflow's inputs to mix and the denominated
    /// output scripts.
    pub async fn send_dsi(
        &self,
        wfl: &DenominateWorkflow,
        pay_collateral_tx: &Transaction,
    ) -> Result<(), MixError> {
        let inputs = wfl
            .inputs
            .iter()
            .map(|outpoint| TxIn {
                previous_output: *outpoint,
                script_sig: ScriptBuf::new(),
                sequence: TxIn::SEQUENCE_FINAL,
            })
            .collect();
        let outputs = wfl
            .outputs
            .iter()
            .map(|script| TxOut { value: self.denom_value, script_pubkey: script.clone() })
            .collect();
        let entry = CoinJoinEntry::new(inputs, pay_collateral_tx.clone(), outputs)?;
        self.peer()?.send_msg(&NetworkMessage::Dsi(entry)).await?;
        log::debug!("{}: dsi sent", self.wfl_lid);
        Ok(())
    }

    /// Sends `dss` with the signed inputs of the final transaction.
    pub async fn send_dss(&self, signed_inputs: Vec<TxIn>) -> Result<(), MixError> {
        let msg = NetworkMessage::Dss(CoinJoinSignedInputs::new(signed_inputs)?);
        self.peer()?.send_msg(&msg).await?;
        Ok(())
    }

    /// Reads the next message from the session queue, applies it to the
    /// session state and reports what happened. `None` waits the default
    /// 40 seconds.
    pub async fn read_next_msg(
        &mut self,
        wfl: &DenominateWorkflow,
        deadline: Option<Duration>,
    ) -> Result<MixEvent, MixError> {
        let deadline = deadline.unwrap_or(PRIVATESEND_SESSION_MSG_TIMEOUT);
        let inbound = match timeout(deadline, self.queue_rx.recv()).await {
            Err(_) => return Err(MixError::Timeout),
            Ok(None) | Ok(Some(MixInbound::Disconnected)) => return Err(MixError::PeerClosed),
            Ok(Some(inbound)) => inbound,
        };
        match inbound {
            MixInbound::StatusUpdate(dssu) => {
                self.on_dssu(&dssu)?;
                Ok(MixEvent::StatusUpdate)
            }
            MixInbound::Queue(dsq) => {
                log::debug!("{}: dsq read: nDenom={}", self.wfl_lid, dsq.denomination);
                self.on_dsq(&dsq)?;
                Ok(MixEvent::QueueReady)
            }
            MixInbound::FinalTransaction(dsf) => {
                log::debug!("{}: dsf read: sessionID={}", self.wfl_lid, dsf.session_id);
                let tx = self.on_dsf(dsf, wfl)?;
                Ok(MixEvent::FinalTransaction(tx))
            }
            MixInbound::Complete(dsc) => {
                log::debug!("{}: dsc read: sessionID={}", self.wfl_lid, dsc.session_id);
                self.on_dsc(&dsc)?;
                Ok(MixEvent::Complete)
            }
            MixInbound::BadDsqSignature => Err(MixError::BadDsqSignature),
            MixInbound::Disconnected => Err(MixError::PeerClosed),
        }
    }

    fn check_session_id(&mut self, session_id: i32) -> Result<(), MixError> {
        if self.session_id == 0 && session_id != 0 {
            self.session_id = session_id;
        }
        if self.session_id != session_id {
            return Err(MixError::UnexpectedSessionId {
                got: session_id,
                expected: self.session_id,
            });
        }
        Ok(())
    }

    /// Applies a `dssu` status update.
    fn on_dssu(&mut self, dssu: &CoinJoinStatusUpdate) -> Result<(), MixError> {
        self.check_session_id(dssu.session_id)?;
        self.pool_state = Some(dssu.pool_state);
        self.message_id = Some(dssu.message_id);
        self.entries_count = dssu.entries_count;

        match dssu.status() {
            Some(PoolStatusUpdate::Accepted) => {
                if dssu.message() == Some(PoolMessage::ErrQueueFull) {
                    return Err(MixError::QueueFull);
                }
                log::debug!(
                    "{}: dssu read: state={}, msg={}, entries_count={}",
                    self.wfl_lid,
                    pool_state_str(dssu.pool_state),
                    pool_message_str(dssu.message_id),
                    self.entries_count
                );
                Ok(())
            }
            Some(PoolStatusUpdate::Rejected) => Err(MixError::Rejected(dssu.message_id)),
            None => Err(MixError::UnknownStatusUpdate(dssu.status_update)),
        }
    }

    /// Applies a ready `dsq` for our queue. The signature was verified by
    /// the peer on receipt.
    fn on_dsq(&mut self, dsq: &CoinJoinQueue) -> Result<(), MixError> {
        if dsq.denomination != self.denomination {
            return Err(MixError::WrongDenom {
                got: dsq.denomination,
                expected: self.denomination,
            });
        }
        if !dsq.ready {
            return Err(MixError::DsqNotReady);
        }
        if self.ready {
            return Err(MixError::DuplicateDsq);
        }
        self.masternode_outpoint = Some(dsq.masternode_outpoint);
        self.ready = dsq.ready;
        self.queue_time = dsq.time;
        Ok(())
    }

    /// Checks a `dsf` final transaction against the workflow.
    fn on_dsf(
        &mut self,
        dsf: CoinJoinFinalTransaction,
        wfl: &DenominateWorkflow,
    ) -> Result<Transaction, MixError> {
        self.check_session_id(dsf.session_id)?;
        if !verify_final_tx(&dsf.tx_final, wfl) {
            return Err(MixError::WrongFinalTx);
        }
        Ok(dsf.tx_final)
    }

    /// Applies a `dsc` session completion.
    fn on_dsc(&mut self, dsc: &CoinJoinComplete) -> Result<(), MixError> {
        self.check_session_id(dsc.session_id)?;
        if dsc.message() != Some(PoolMessage::MsgSuccess) {
            return Err(MixError::Rejected(dsc.message_id));
        }
        Ok(())
    }

    /// Drives a whole denominate round: joins the queue, waits for it to
    /// become ready, submits the entry, has the final transaction signed by
    /// `sign` and waits for completion. Returns the final transaction.
    pub async fn denominate<F>(
        &mut self,
        wfl: &DenominateWorkflow,
        pay_collateral_tx: &Transaction,
        sign: F,
    ) -> Result<Transaction, MixError>
    where
        F: FnOnce(&Transaction) -> Result<Vec<TxIn>, MixError>,
    {
        self.send_dsa(pay_collateral_tx).await?;
        loop {
            match self.read_next_msg(wfl, Some(PRIVATESEND_QUEUE_TIMEOUT)).await? {
                MixEvent::StatusUpdate => continue,
                MixEvent::QueueReady => break,
                _ => return Err(MixError::UnexpectedMessage),
            }
        }

        self.send_dsi(wfl, pay_collateral_tx).await?;
        let final_tx = loop {
            match self.read_next_msg(wfl, None).await? {
                MixEvent::StatusUpdate => continue,
                MixEvent::FinalTransaction(tx) => break tx,
                _ => return Err(MixError::UnexpectedMessage),
            }
        };

        let signed_inputs = sign(&final_tx)?;
        self.send_dss(signed_inputs).await?;
        loop {
            match self.read_next_msg(wfl, None).await? {
                MixEvent::StatusUpdate => continue,
                MixEvent::Complete => return Ok(final_tx),
                _ => return Err(MixError::UnexpectedMessage),
            }
        }
    }
}

/// The final-tx acceptance rule: every declared input outpoint and every
/// declared output script appears in `tx`, with exact counts.
pub fn verify_final_tx(tx: &Transaction, wfl: &DenominateWorkflow) -> bool {
    let icnt =
        tx.input.iter().filter(|txin| wfl.inputs.contains(&txin.previous_output)).count();
    let ocnt =
        tx.output.iter().filter(|txout| wfl.outputs.contains(&txout.script_pubkey)).count();
    icnt == wfl.inputs.len() && ocnt == wfl.outputs.len()
}
