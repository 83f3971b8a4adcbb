// Rust Dash Library
// Written for Dash in 2022 by
//     The Dash Core Developers
//
// To the extent possible under law, the author(s) have dedicated all
// copyright and related and neighboring rights to this software to
// the public domain worldwide. This software is distributed without
// any warranty.
//
// You should have received a copy of the CC0 Public Domain Dedication
// along with this software.
// If not, see <http://creativecommons.org/publicdomain/zero/1.0/>.
//

//! Dash PrivateSend (CoinJoin) network messages.
//!
//! The `ds*` message family drives a denominate round between a client and
//! a mixing masternode: `dsa` asks to join a queue, `dsq` announces queue
//! state, `dsi` submits inputs and outputs, `dsf` returns the final
//! transaction, `dss` returns the client's signed inputs and `dsc` closes
//! the session. `dssu` carries status updates throughout and `dstx` is the
//! masternode's broadcast of the mixed transaction.
//!

use std::io::{self, Read, Write};

use bitcoin_hashes::{sha256d, Hash, HashEngine};
use strum::FromRepr;

use crate::blockdata::transaction::{OutPoint, Transaction, TxIn, TxOut};
use crate::bls_sig_utils::BLSSignature;
use crate::consensus::encode::serialize;
use crate::consensus::{encode, Decodable, Encodable, ReadExt};
use crate::internal_macros::impl_consensus_encoding;
use crate::network::constants::PRIVATESEND_ENTRY_MAX_SIZE;

/// Mixing pool state carried in `dssu` messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr)]
#[repr(i32)]
pub enum PoolState {
    Idle = 0,
    Queue = 1,
    AcceptingEntries = 2,
    Signing = 3,
    Error = 4,
}

/// Human-readable pool state, tolerating unknown values.
pub fn pool_state_str(state: i32) -> &'static str {
    match PoolState::from_repr(state) {
        Some(PoolState::Idle) => "IDLE",
        Some(PoolState::Queue) => "QUEUE",
        Some(PoolState::AcceptingEntries) => "ACCEPTING_ENTRIES",
        Some(PoolState::Signing) => "SIGNING",
        Some(PoolState::Error) => "ERROR",
        None => "UNKNOWN",
    }
}

/// Pool status update carried in `dssu` messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr)]
#[repr(i32)]
pub enum PoolStatusUpdate {
    Rejected = 0,
    Accepted = 1,
}

/// Message ids carried in `dssu` and `dsc` messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr)]
#[repr(i32)]
pub enum PoolMessage {
    ErrAlreadyHave = 0x00,
    ErrDenom = 0x01,
    ErrEntriesFull = 0x02,
    ErrExistingTx = 0x03,
    ErrFees = 0x04,
    ErrInvalidCollateral = 0x05,
    ErrInvalidInput = 0x06,
    ErrInvalidScript = 0x07,
    ErrInvalidTx = 0x08,
    ErrMaximum = 0x09,
    ErrMnList = 0x0a,
    ErrMode = 0x0b,
    ErrNonStandardPubkey = 0x0c,
    /// Not used.
    ErrNotAMn = 0x0d,
    ErrQueueFull = 0x0e,
    ErrRecent = 0x0f,
    ErrSession = 0x10,
    ErrMissingTx = 0x11,
    ErrVersion = 0x12,
    MsgNoErr = 0x13,
    MsgSuccess = 0x14,
    MsgEntriesAdded = 0x15,
    ErrSizeMismatch = 0x16,
}

/// Human-readable response text, tolerating unknown ids.
pub fn pool_message_str(message_id: i32) -> &'static str {
    use PoolMessage::*;
    match PoolMessage::from_repr(message_id) {
        Some(ErrAlreadyHave) => "Already have that input.",
        Some(ErrDenom) => "No matching denominations found for mixing.",
        Some(ErrEntriesFull) => "Entries are full.",
        Some(ErrExistingTx) => "Not compatible with existing transactions.",
        Some(ErrFees) => "Transaction fees are too high.",
        Some(ErrInvalidCollateral) => "Collateral not valid.",
        Some(ErrInvalidInput) => "Input is not valid.",
        Some(ErrInvalidScript) => "Invalid script detected.",
        Some(ErrInvalidTx) => "Transaction not valid.",
        Some(ErrMaximum) => "Entry exceeds maximum size.",
        Some(ErrMnList) => "Not in the Masternode list.",
        Some(ErrMode) => "Incompatible mode.",
        Some(ErrNonStandardPubkey) => "Non-standard public key detected.",
        Some(ErrNotAMn) => "This is not a Masternode.",
        Some(ErrQueueFull) => "Masternode queue is full.",
        Some(ErrRecent) => "Last PrivateSend was too recent.",
        Some(ErrSession) => "Session not complete!",
        Some(ErrMissingTx) => "Missing input transaction information.",
        Some(ErrVersion) => "Incompatible version.",
        Some(MsgNoErr) => "No errors detected.",
        Some(MsgSuccess) => "Transaction created successfully.",
        Some(MsgEntriesAdded) => "Your entries added successfully.",
        Some(ErrSizeMismatch) => "Inputs vs outputs size mismatch.",
        None => "Unknown response.",
    }
}

/// Denomination values designated in the P2P protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromRepr)]
#[repr(i32)]
pub enum Denomination {
    Ten = 1,
    One = 2,
    Tenth = 4,
    Hundredth = 8,
    Thousandth = 16,
}

impl Denomination {
    /// The denominated amount in duffs, fee markup included.
    pub fn amount(self) -> u64 {
        match self {
            Denomination::Ten => 1_000_010_000,
            Denomination::One => 100_001_000,
            Denomination::Tenth => 10_000_100,
            Denomination::Hundredth => 1_000_010,
            Denomination::Thousandth => 100_001,
        }
    }
}

fn check_entry_count(what: &'static str, count: usize) -> Result<(), encode::Error> {
    if count > PRIVATESEND_ENTRY_MAX_SIZE {
        return Err(encode::Error::TooLarge {
            what,
            requested: count as u64,
            max: PRIVATESEND_ENTRY_MAX_SIZE as u64,
        });
    }
    Ok(())
}

fn decode_bounded_txins<R: Read + ?Sized>(
    r: &mut R,
    what: &'static str,
) -> Result<Vec<TxIn>, encode::Error> {
    let count = encode::read_compact_size(r)?;
    check_entry_count(what, count as usize)?;
    let mut inputs = Vec::with_capacity(count as usize);
    for _ in 0..count {
        inputs.push(TxIn::consensus_decode(r)?);
    }
    Ok(inputs)
}

fn encode_bounded<W: Write + ?Sized, T: Encodable>(
    w: &mut W,
    entries: &[T],
    what: &str,
) -> Result<usize, io::Error> {
    if entries.len() > PRIVATESEND_ENTRY_MAX_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{what}: too many entries"),
        ));
    }
    let mut len = encode::write_compact_size(w, entries.len() as u32)?;
    for entry in entries {
        len += entry.consensus_encode(w)?;
    }
    Ok(len)
}

/// The `dsa` message: asks a masternode to accept us into a mixing queue
/// for a denomination, backed by a collateral transaction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoinJoinAccept {
    /// Requested denomination, see [`Denomination`] for assigned values.
    pub denomination: i32,
    /// Collateral the masternode may claim if we misbehave.
    pub tx_collateral: Transaction,
}

impl_consensus_encoding!(CoinJoinAccept, denomination, tx_collateral);

/// The `dssu` message: a mixing pool status update.
///
/// All fields are raw `i32`s as on the wire; masternodes running newer
/// protocols send values outside the known enums.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CoinJoinStatusUpdate {
    pub session_id: i32,
    pub pool_state: i32,
    pub entries_count: i32,
    pub status_update: i32,
    pub message_id: i32,
}

impl CoinJoinStatusUpdate {
    /// The pool state, if it maps to a known value.
    pub fn state(&self) -> Option<PoolState> {
        PoolState::from_repr(self.pool_state)
    }

    /// The status update, if it maps to a known value.
    pub fn status(&self) -> Option<PoolStatusUpdate> {
        PoolStatusUpdate::from_repr(self.status_update)
    }

    /// The message id, if it maps to a known value.
    pub fn message(&self) -> Option<PoolMessage> {
        PoolMessage::from_repr(self.message_id)
    }
}

impl_consensus_encoding!(
    CoinJoinStatusUpdate,
    session_id,
    pool_state,
    entries_count,
    status_update,
    message_id
);

/// The `dsq` message: a masternode's announcement of a mixing queue, BLS
/// signed with its operator key.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoinJoinQueue {
    /// Denomination of the queue.
    pub denomination: i32,
    /// Collateral outpoint identifying the masternode.
    pub masternode_outpoint: OutPoint,
    /// Time the queue was created.
    pub time: i64,
    /// Set once the queue is ready to mix.
    pub ready: bool,
    /// Operator BLS signature over [`CoinJoinQueue::msg_hash`].
    pub signature: BLSSignature,
}

impl CoinJoinQueue {
    /// The hash the operator key signs:
    /// `SHA256d(nDenom || outpoint || nTime || fReady)`.
    pub fn msg_hash(&self) -> sha256d::Hash {
        let mut engine = sha256d::Hash::engine();
        engine.input(&self.denomination.to_le_bytes());
        engine.input(&serialize(&self.masternode_outpoint));
        engine.input(&self.time.to_le_bytes());
        engine.input(&[self.ready as u8]);
        sha256d::Hash::from_engine(engine)
    }
}

impl Encodable for CoinJoinQueue {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.denomination.consensus_encode(w)?;
        len += self.masternode_outpoint.consensus_encode(w)?;
        len += self.time.consensus_encode(w)?;
        len += self.ready.consensus_encode(w)?;
        len += encode::write_compact_size(w, 96)?;
        len += self.signature.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for CoinJoinQueue {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let denomination = ReadExt::read_i32(r)?;
        let masternode_outpoint = OutPoint::consensus_decode(r)?;
        let time = ReadExt::read_i64(r)?;
        let ready = ReadExt::read_bool(r)?;
        let sig_len = encode::read_compact_size(r)?;
        if sig_len != 96 {
            return Err(encode::Error::InvalidLength {
                what: "dsq vchSig",
                expected: 96,
                got: sig_len as usize,
            });
        }
        let signature = BLSSignature::consensus_decode(r)?;
        Ok(CoinJoinQueue { denomination, masternode_outpoint, time, ready, signature })
    }
}

/// The `dstx` message: a masternode broadcasting the final mixed
/// transaction, BLS signed with its operator key.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoinJoinBroadcastTx {
    pub tx: Transaction,
    /// Collateral outpoint identifying the masternode.
    pub masternode_outpoint: OutPoint,
    /// Operator BLS signature over [`CoinJoinBroadcastTx::msg_hash`].
    pub signature: BLSSignature,
    /// Time the transaction was signed.
    pub sig_time: i64,
}

impl CoinJoinBroadcastTx {
    /// The hash the operator key signs: `SHA256d(tx || outpoint || sigTime)`.
    pub fn msg_hash(&self) -> sha256d::Hash {
        let mut engine = sha256d::Hash::engine();
        engine.input(&serialize(&self.tx));
        engine.input(&serialize(&self.masternode_outpoint));
        engine.input(&self.sig_time.to_le_bytes());
        sha256d::Hash::from_engine(engine)
    }
}

impl Encodable for CoinJoinBroadcastTx {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.tx.consensus_encode(w)?;
        len += self.masternode_outpoint.consensus_encode(w)?;
        len += encode::write_compact_size(w, 96)?;
        len += self.signature.consensus_encode(w)?;
        len += self.sig_time.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for CoinJoinBroadcastTx {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let tx = Transaction::consensus_decode(r)?;
        let masternode_outpoint = OutPoint::consensus_decode(r)?;
        let sig_len = encode::read_compact_size(r)?;
        if sig_len != 96 {
            return Err(encode::Error::InvalidLength {
                what: "dstx vchSig",
                expected: 96,
                got: sig_len as usize,
            });
        }
        let signature = BLSSignature::consensus_decode(r)?;
        let sig_time = ReadExt::read_i64(r)?;
        Ok(CoinJoinBroadcastTx { tx, masternode_outpoint, signature, sig_time })
    }
}

/// The `dsi` message: the inputs we want mixed, the collateral, and the
/// denominated outputs to create.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoinJoinEntry {
    /// Inputs to mix, at most nine.
    pub inputs: Vec<TxIn>,
    /// Collateral the masternode may claim if we fail to sign.
    pub tx_collateral: Transaction,
    /// Denominated outputs, at most nine.
    pub outputs: Vec<TxOut>,
}

impl CoinJoinEntry {
    /// Builds a `dsi` payload, enforcing the per-entry size limit.
    pub fn new(
        inputs: Vec<TxIn>,
        tx_collateral: Transaction,
        outputs: Vec<TxOut>,
    ) -> Result<Self, encode::Error> {
        check_entry_count("dsi inputs", inputs.len())?;
        check_entry_count("dsi outputs", outputs.len())?;
        Ok(CoinJoinEntry { inputs, tx_collateral, outputs })
    }
}

impl Encodable for CoinJoinEntry {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = encode_bounded(w, &self.inputs, "dsi inputs")?;
        len += self.tx_collateral.consensus_encode(w)?;
        len += encode_bounded(w, &self.outputs, "dsi outputs")?;
        Ok(len)
    }
}

impl Decodable for CoinJoinEntry {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let inputs = decode_bounded_txins(r, "dsi inputs")?;
        let tx_collateral = Transaction::consensus_decode(r)?;
        let count = encode::read_compact_size(r)?;
        check_entry_count("dsi outputs", count as usize)?;
        let mut outputs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            outputs.push(TxOut::consensus_decode(r)?);
        }
        Ok(CoinJoinEntry { inputs, tx_collateral, outputs })
    }
}

/// The `dsf` message: the final transaction for this session, to be signed.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoinJoinFinalTransaction {
    pub session_id: i32,
    pub tx_final: Transaction,
}

impl_consensus_encoding!(CoinJoinFinalTransaction, session_id, tx_final);

/// The `dss` message: our signed inputs of the final transaction.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct CoinJoinSignedInputs {
    /// Signed inputs, at most nine.
    pub inputs: Vec<TxIn>,
}

impl CoinJoinSignedInputs {
    /// Builds a `dss` payload, enforcing the per-entry size limit.
    pub fn new(inputs: Vec<TxIn>) -> Result<Self, encode::Error> {
        check_entry_count("dss inputs", inputs.len())?;
        Ok(CoinJoinSignedInputs { inputs })
    }
}

impl Encodable for CoinJoinSignedInputs {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        encode_bounded(w, &self.inputs, "dss inputs")
    }
}

impl Decodable for CoinJoinSignedInputs {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Ok(CoinJoinSignedInputs { inputs: decode_bounded_txins(r, "dss inputs")? })
    }
}

/// The `dsc` message: the session is complete.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct CoinJoinComplete {
    pub session_id: i32,
    pub message_id: i32,
}

impl CoinJoinComplete {
    /// The message id, if it maps to a known value.
    pub fn message(&self) -> Option<PoolMessage> {
        PoolMessage::from_repr(self.message_id)
    }
}

impl_consensus_encoding!(CoinJoinComplete, session_id, message_id);

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::consensus::encode::{deserialize, serialize_hex, VarInt};

    const DSA_MSG: &str = concat!(
        "020000000200000001df2149d4b1805f1842aace662956f85d442d0aab9acf68fe13e2",
        "f93f9be9b259000000006b4830450221009a24e58366f1c7a4cbb170f6dc813d44023f",
        "176f5fa87809ee9cc561ebd6f29802204b05f289613e86727025d71d8f58315d30ec3e",
        "4d8a7aef7b12a7425ff4fe345a0121034963cceab57f14094933a8272e6dd3d76a30c6",
        "f1d22fd97c2f7e5dff0d6efe94feffffff019b3bd971020000001976a914ec785ad145",
        "df029f48e51e305483fda47f7834a588acf06d0200"
    );

    const DSSU_MSG: &str = "0102030405000000030000000100000015000000";

    const DSQ_MSG: &str = concat!(
        "020000005d442d0aab9acf68fe13e2f93f9be9b25d442d0aab9acf68fe13e2f93f9be9",
        "b20100000053cd705d0000000001605d442d0aab9acf68fe13e2f93f9be9b25d442d0a",
        "ab9acf68fe13e2f93f9be9b25d442d0aab9acf68fe13e2f93f9be9b25d442d0aab9acf",
        "68fe13e2f93f9be9b25d442d0aab9acf68fe13e2f93f9be9b25d442d0aab9acf68fe13",
        "e2f93f9be9b2"
    );

    const DSI_MSG: &str = concat!(
        "02ab9acf68fe13e2f93f9be9b201000000ab9acf68fe13e2f93f9be9b2010000000100",
        "0000080102030405060708ffffffffab9acf68fe13e2f93f9be9b201000000ab9acf68",
        "fe13e2f93f9be9b20100000002000000081112131415161718ffffffff0200000001df",
        "2149d4b1805f1842aace662956f85d442d0aab9acf68fe13e2f93f9be9b25900000000",
        "6b4830450221009a24e58366f1c7a4cbb170f6dc813d44023f176f5fa87809ee9cc561",
        "ebd6f29802204b05f289613e86727025d71d8f58315d30ec3e4d8a7aef7b12a7425ff4",
        "fe345a0121034963cceab57f14094933a8272e6dd3d76a30c6f1d22fd97c2f7e5dff0d",
        "6efe94feffffff019b3bd971020000001976a914ec785ad145df029f48e51e305483fd",
        "a47f7834a588acf06d0200020100000000000000080102030405060708020000000000",
        "0000081112131415161718"
    );

    const DSF_MSG: &str = concat!(
        "070000000200000001df2149d4b1805f1842aace662956f85d442d0aab9acf68fe13e2",
        "f93f9be9b259000000006b4830450221009a24e58366f1c7a4cbb170f6dc813d44023f",
        "176f5fa87809ee9cc561ebd6f29802204b05f289613e86727025d71d8f58315d30ec3e",
        "4d8a7aef7b12a7425ff4fe345a0121034963cceab57f14094933a8272e6dd3d76a30c6",
        "f1d22fd97c2f7e5dff0d6efe94feffffff019b3bd971020000001976a914ec785ad145",
        "df029f48e51e305483fda47f7834a588acf06d0200"
    );

    const DSS_MSG: &str = concat!(
        "02ab9acf68fe13e2f93f9be9b201000000ab9acf68fe13e2f93f9be9b2010000000100",
        "0000080102030405060708ffffffffab9acf68fe13e2f93f9be9b201000000ab9acf68",
        "fe13e2f93f9be9b20100000002000000081112131415161718ffffffff"
    );

    const DSC_MSG: &str = "0102030415000000";

    #[test]
    fn dsa_msg() {
        let data = hex::decode(DSA_MSG).unwrap();
        let msg: CoinJoinAccept = deserialize(&data).unwrap();
        assert_eq!(msg.denomination, 2);
        assert_eq!(msg.tx_collateral.input.len(), 1);
        assert_eq!(serialize_hex(&msg), DSA_MSG);
    }

    #[test]
    fn dssu_msg() {
        let data = hex::decode(DSSU_MSG).unwrap();
        let msg: CoinJoinStatusUpdate = deserialize(&data).unwrap();
        assert_eq!(msg.session_id, 67305985);
        assert_eq!(msg.pool_state, 5);
        assert_eq!(msg.entries_count, 3);
        assert_eq!(msg.status_update, 1);
        assert_eq!(msg.message_id, 21);
        // state 5 is not assigned, the raw value still round-trips
        assert_eq!(msg.state(), None);
        assert_eq!(msg.status(), Some(PoolStatusUpdate::Accepted));
        assert_eq!(msg.message(), Some(PoolMessage::MsgEntriesAdded));
        assert_eq!(serialize_hex(&msg), DSSU_MSG);
    }

    #[test]
    fn dsq_msg() {
        let data = hex::decode(DSQ_MSG).unwrap();
        let msg: CoinJoinQueue = deserialize(&data).unwrap();
        assert_eq!(msg.denomination, 2);
        assert_eq!(msg.masternode_outpoint.vout, 1);
        assert_eq!(msg.time, 1567673683);
        assert!(msg.ready);
        assert_eq!(serialize_hex(&msg), DSQ_MSG);
    }

    #[test]
    fn dsq_sig_must_be_96_bytes() {
        let data = hex::decode(DSQ_MSG).unwrap();
        let mut bad = data.clone();
        bad[49] = 65; // compact size before the signature
        assert_matches!(
            deserialize::<CoinJoinQueue>(&bad),
            Err(encode::Error::InvalidLength { expected: 96, .. })
        );
    }

    #[test]
    fn dsi_msg() {
        let data = hex::decode(DSI_MSG).unwrap();
        let msg: CoinJoinEntry = deserialize(&data).unwrap();
        assert_eq!(msg.inputs.len(), 2);
        assert_eq!(msg.inputs[0].previous_output.vout, 1);
        assert_eq!(msg.inputs[1].previous_output.vout, 2);
        assert_eq!(msg.outputs.len(), 2);
        assert_eq!(msg.outputs[0].value, 1);
        assert_eq!(serialize_hex(&msg), DSI_MSG);
    }

    #[test]
    fn dsi_entry_bound() {
        let data = hex::decode(DSI_MSG).unwrap();
        let msg: CoinJoinEntry = deserialize(&data).unwrap();
        let ten_inputs = vec![msg.inputs[0].clone(); 10];
        assert_matches!(
            CoinJoinEntry::new(ten_inputs.clone(), msg.tx_collateral.clone(), vec![]),
            Err(encode::Error::TooLarge { .. })
        );

        // encode-side check fires even on a hand-rolled value
        let bad =
            CoinJoinEntry { inputs: ten_inputs, tx_collateral: msg.tx_collateral, outputs: vec![] };
        let mut sink = Vec::new();
        assert!(bad.consensus_encode(&mut sink).is_err());

        // ten inputs on the wire
        let mut wire = crate::consensus::encode::serialize(&VarInt(10));
        for _ in 0..10 {
            wire.extend_from_slice(&crate::consensus::encode::serialize(&msg.inputs[0]));
        }
        assert_matches!(deserialize::<CoinJoinEntry>(&wire), Err(encode::Error::TooLarge { .. }));
    }

    #[test]
    fn dsf_msg() {
        let data = hex::decode(DSF_MSG).unwrap();
        let msg: CoinJoinFinalTransaction = deserialize(&data).unwrap();
        assert_eq!(msg.session_id, 7);
        assert_eq!(serialize_hex(&msg), DSF_MSG);
    }

    #[test]
    fn dss_msg() {
        let data = hex::decode(DSS_MSG).unwrap();
        let msg: CoinJoinSignedInputs = deserialize(&data).unwrap();
        assert_eq!(msg.inputs.len(), 2);
        assert_eq!(serialize_hex(&msg), DSS_MSG);
    }

    #[test]
    fn dsc_msg() {
        let data = hex::decode(DSC_MSG).unwrap();
        let msg: CoinJoinComplete = deserialize(&data).unwrap();
        assert_eq!(msg.session_id, 67305985);
        assert_eq!(msg.message_id, 21);
        assert_eq!(msg.message(), Some(PoolMessage::MsgEntriesAdded));
        assert_eq!(serialize_hex(&msg), DSC_MSG);
    }

    #[test]
    fn dstx_roundtrip_and_sig_length() {
        let data = hex::decode(DSA_MSG).unwrap();
        let dsa: CoinJoinAccept = deserialize(&data).unwrap();
        let dstx = CoinJoinBroadcastTx {
            tx: dsa.tx_collateral,
            masternode_outpoint: OutPoint {
                txid: crate::hash_types::Txid::hash(b"mn collateral"),
                vout: 1,
            },
            signature: BLSSignature::from([0x5d; 96]),
            sig_time: 1567673683,
        };
        let wire = crate::consensus::encode::serialize(&dstx);
        assert_eq!(deserialize::<CoinJoinBroadcastTx>(&wire).unwrap(), dstx);

        let mut bad = wire.clone();
        // compact size before the signature sits after tx and outpoint
        let sig_len_at = wire.len() - 8 - 96 - 1;
        bad[sig_len_at] = 65;
        assert_matches!(
            deserialize::<CoinJoinBroadcastTx>(&bad),
            Err(encode::Error::InvalidLength { expected: 96, .. })
        );

        // msg hash covers tx, outpoint and time but not the signature
        let mut resigned = dstx.clone();
        resigned.signature = BLSSignature::from([0x11; 96]);
        assert_eq!(dstx.msg_hash(), resigned.msg_hash());
    }

    #[test]
    fn denomination_amounts() {
        assert_eq!(Denomination::from_repr(2), Some(Denomination::One));
        assert_eq!(Denomination::One.amount(), 100_001_000);
        assert_eq!(Denomination::Thousandth.amount(), 100_001);
    }
}
