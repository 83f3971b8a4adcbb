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

//! Dash spork messages.
//!
//! Sporks are administratively signed network toggles. The signature is a
//! 65-byte recoverable ECDSA signature over either the new-style binary
//! message hash or the legacy signed-message hash, depending on
//! `SPORK_6_NEW_SIGS`.
//!

use std::io::{self, Read, Write};

use bitcoin_hashes::{hash160, sha256d, Hash, HashEngine};
use lazy_static::lazy_static;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{All, Message, Secp256k1};
use strum::FromRepr;
use thiserror::Error;

use crate::consensus::encode::VarInt;
use crate::consensus::{encode, Decodable, Encodable, ReadExt, WriteExt};
use crate::hash_types::PubkeyHash;

lazy_static! {
    static ref SECP: Secp256k1<All> = Secp256k1::new();
}

/// Message prefix of the legacy Dash signed-message scheme.
const SIGNED_MSG_PREFIX: &[u8] = b"\x19DarkCoin Signed Message:\n";

/// The spork IDs known to this library.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, FromRepr)]
#[repr(i32)]
pub enum SporkId {
    Spork2InstantSendEnabled = 10001,
    Spork3InstantSendBlockFiltering = 10002,
    Spork5InstantSendMaxValue = 10004,
    Spork6NewSigs = 10005,
    Spork9SuperblocksEnabled = 10008,
    Spork12ReconsiderBlocks = 10011,
    Spork15DeterministicMnsEnabled = 10014,
    Spork16InstantSendAutolocks = 10015,
    Spork17QuorumDkgEnabled = 10016,
    Spork19ChainlocksEnabled = 10018,
    Spork20InstantSendLlmqBased = 10019,
}

/// A failure while checking a spork signature.
#[derive(Debug, Error)]
pub enum SporkSigError {
    /// The first signature byte did not carry a valid recovery header.
    #[error("invalid signature header byte {0}")]
    InvalidHeader(u8),
    /// The signature failed to parse or verify.
    #[error("secp256k1 error: {0}")]
    Secp(#[from] secp256k1::Error),
}

/// The `spork` message.
///
/// <https://docs.dash.org/en/stable/docs/core/reference/p2p-network-spork-messages.html>
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct SporkMessage {
    /// ID of the spork, see [`SporkId`] for assigned values.
    pub spork_id: i32,
    /// Value of the spork, an activation height or timestamp.
    pub value: i64,
    /// Time the spork value was signed.
    pub time_signed: i64,
    /// Recoverable ECDSA signature by the spork key, 65 bytes.
    pub signature: [u8; 65],
}

impl SporkMessage {
    /// Returns the known spork id, if assigned.
    pub fn spork_id(&self) -> Option<SporkId> {
        SporkId::from_repr(self.spork_id)
    }

    /// Hash that the spork key signs.
    ///
    /// With `SPORK_6_NEW_SIGS` active this is the double-SHA256 of the three
    /// binary fields; before activation it is the double-SHA256 of the
    /// legacy signed-message envelope over their decimal concatenation.
    pub fn msg_hash(&self, new_sigs: bool) -> sha256d::Hash {
        if new_sigs {
            let mut engine = sha256d::Hash::engine();
            engine.input(&self.spork_id.to_le_bytes());
            engine.input(&self.value.to_le_bytes());
            engine.input(&self.time_signed.to_le_bytes());
            sha256d::Hash::from_engine(engine)
        } else {
            let msg = format!("{}{}{}", self.spork_id, self.value, self.time_signed);
            signed_msg_hash(&msg)
        }
    }

    /// Recovers the signer's pubkey hash from the 65-byte signature and
    /// verifies the signature along the way.
    pub fn recover_signer(&self, new_sigs: bool) -> Result<PubkeyHash, SporkSigError> {
        let header = self.signature[0];
        if !(27..=34).contains(&header) {
            return Err(SporkSigError::InvalidHeader(header));
        }
        let compressed = header >= 31;
        let rec_id = RecoveryId::try_from(((header - 27) & 3) as i32)?;
        let signature = RecoverableSignature::from_compact(&self.signature[1..], rec_id)?;
        let msg = Message::from_digest(self.msg_hash(new_sigs).to_byte_array());
        let pubkey = SECP.recover_ecdsa(&msg, &signature)?;
        SECP.verify_ecdsa(&msg, &signature.to_standard(), &pubkey)?;
        let serialized: &[u8] =
            if compressed { &pubkey.serialize() } else { &pubkey.serialize_uncompressed() };
        Ok(PubkeyHash::from_byte_array(hash160::Hash::hash(serialized).to_byte_array()))
    }
}

impl Encodable for SporkMessage {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.spork_id.consensus_encode(w)?;
        len += self.value.consensus_encode(w)?;
        len += self.time_signed.consensus_encode(w)?;
        len += encode::write_compact_size(w, 65)?;
        w.emit_slice(&self.signature)?;
        Ok(len + 65)
    }
}

impl Decodable for SporkMessage {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let spork_id = ReadExt::read_i32(r)?;
        let value = ReadExt::read_i64(r)?;
        let time_signed = ReadExt::read_i64(r)?;
        let sig_len = encode::read_compact_size(r)?;
        if sig_len != 65 {
            return Err(encode::Error::InvalidLength {
                what: "spork vchSig",
                expected: 65,
                got: sig_len as usize,
            });
        }
        let signature = <[u8; 65]>::consensus_decode(r)?;
        Ok(SporkMessage { spork_id, value, time_signed, signature })
    }
}

/// Double-SHA256 of a message wrapped in the legacy Dash signed-message
/// envelope.
pub fn signed_msg_hash(msg: &str) -> sha256d::Hash {
    let mut engine = sha256d::Hash::engine();
    engine.input(SIGNED_MSG_PREFIX);
    engine.input(&encode::serialize(&VarInt(msg.len() as u64)));
    engine.input(msg.as_bytes());
    sha256d::Hash::from_engine(engine)
}
