// Rust Dash Library
// Originally written in 2014 by
//     Andrew Poelstra <apoelstra@wpsoftware.net>
//     For Bitcoin
// Updated for Dash in 2022 by
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

//! Dash blockdata network messages.
//!
//! This module describes network messages which are used for passing
//! inventories around the network.
//!

use std::io::{self, Read, Write};

use crate::consensus::{encode, Decodable, Encodable, ReadExt, WriteExt};
use crate::hash_types::Sha256dHash;
use crate::internal_macros::impl_consensus_encoding;
use crate::network::constants::MAX_INV_ENTRIES;

/// An inventory object type.
///
/// The values are protocol constants; the deprecated legacy types are kept so
/// traffic from old peers still decodes.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub enum InvType {
    /// Transaction
    Tx,
    /// Block
    Block,
    /// Filtered block, for bloom-filtered connections
    FilteredBlock,
    /// Legacy InstantSend transaction lock request
    TxLockRequest,
    /// Legacy InstantSend transaction lock vote
    TxLockVote,
    /// Spork
    Spork,
    /// PrivateSend final transaction broadcast by a masternode
    DsTx,
    /// Governance object
    GovernanceObject,
    /// Governance object vote
    GovernanceObjectVote,
    /// Compact block
    CmpctBlock,
    /// LLMQ final commitment
    QuorumFinalCommitment,
    /// LLMQ DKG contribution
    QuorumContrib,
    /// LLMQ DKG complaint
    QuorumComplaint,
    /// LLMQ DKG justification
    QuorumJustification,
    /// LLMQ DKG premature commitment
    QuorumPrematureCommitment,
    /// LLMQ recovered threshold signature
    QuorumRecoveredSig,
    /// The hash is a ChainLock signature
    CLSig,
    /// The hash is an LLMQ-based IS lock
    ISLock,
    /// A type this library does not interpret, preserved as raw
    Unknown(u32),
}

impl InvType {
    /// Protocol value of this inventory type.
    pub fn to_u32(self) -> u32 {
        match self {
            InvType::Tx => 1,
            InvType::Block => 2,
            InvType::FilteredBlock => 3,
            InvType::TxLockRequest => 4,
            InvType::TxLockVote => 5,
            InvType::Spork => 6,
            InvType::DsTx => 16,
            InvType::GovernanceObject => 17,
            InvType::GovernanceObjectVote => 18,
            InvType::CmpctBlock => 20,
            InvType::QuorumFinalCommitment => 21,
            InvType::QuorumContrib => 23,
            InvType::QuorumComplaint => 24,
            InvType::QuorumJustification => 25,
            InvType::QuorumPrematureCommitment => 26,
            InvType::QuorumRecoveredSig => 28,
            InvType::CLSig => 29,
            InvType::ISLock => 30,
            InvType::Unknown(value) => value,
        }
    }

    /// Maps a protocol value to an inventory type. Deprecated legacy values
    /// (7..=15, 19, 22, 27) and anything unassigned come back as `Unknown`.
    pub fn from_u32(value: u32) -> InvType {
        match value {
            1 => InvType::Tx,
            2 => InvType::Block,
            3 => InvType::FilteredBlock,
            4 => InvType::TxLockRequest,
            5 => InvType::TxLockVote,
            6 => InvType::Spork,
            16 => InvType::DsTx,
            17 => InvType::GovernanceObject,
            18 => InvType::GovernanceObjectVote,
            20 => InvType::CmpctBlock,
            21 => InvType::QuorumFinalCommitment,
            23 => InvType::QuorumContrib,
            24 => InvType::QuorumComplaint,
            25 => InvType::QuorumJustification,
            26 => InvType::QuorumPrematureCommitment,
            28 => InvType::QuorumRecoveredSig,
            29 => InvType::CLSig,
            30 => InvType::ISLock,
            other => InvType::Unknown(other),
        }
    }
}

impl Encodable for InvType {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        w.emit_u32(self.to_u32())?;
        Ok(4)
    }
}

impl Decodable for InvType {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Ok(InvType::from_u32(ReadExt::read_u32(r)?))
    }
}

/// An inventory entry: a type tag and the hash of the announced object.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Hash)]
pub struct Inventory {
    /// The type of object announced.
    pub inv_type: InvType,
    /// Hash of the object, meaning depends on `inv_type`.
    pub hash: Sha256dHash,
}

impl_consensus_encoding!(Inventory, inv_type, hash);

/// The `inv`/`getdata` payload: a bounded list of inventory entries.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct InvMessage {
    pub inventory: Vec<Inventory>,
}

impl InvMessage {
    /// Builds an inventory message, refusing more entries than relayable.
    pub fn new(inventory: Vec<Inventory>) -> Result<Self, encode::Error> {
        if inventory.len() > MAX_INV_ENTRIES {
            return Err(encode::Error::TooLarge {
                what: "inventory entries",
                requested: inventory.len() as u64,
                max: MAX_INV_ENTRIES as u64,
            });
        }
        Ok(InvMessage { inventory })
    }
}

impl Encodable for InvMessage {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        if self.inventory.len() > MAX_INV_ENTRIES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "inv msg: too long inventory"));
        }
        let mut len = encode::write_compact_size(w, self.inventory.len() as u32)?;
        for entry in &self.inventory {
            len += entry.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl Decodable for InvMessage {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let count = encode::read_compact_size(r)?;
        if count as usize > MAX_INV_ENTRIES {
            return Err(encode::Error::TooLarge {
                what: "inventory entries",
                requested: count as u64,
                max: MAX_INV_ENTRIES as u64,
            });
        }
        let mut inventory = Vec::with_capacity(count as usize);
        for _ in 0..count {
            inventory.push(Inventory::consensus_decode(r)?);
        }
        Ok(InvMessage { inventory })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use bitcoin_hashes::Hash;

    use super::*;
    use crate::consensus::{deserialize, serialize};

    #[test]
    fn inv_roundtrip() {
        let msg = InvMessage::new(vec![
            Inventory { inv_type: InvType::ISLock, hash: Sha256dHash::all_zeros() },
            Inventory { inv_type: InvType::DsTx, hash: Sha256dHash::hash(b"dstx") },
            Inventory { inv_type: InvType::Unknown(42), hash: Sha256dHash::all_zeros() },
        ])
        .unwrap();
        let data = serialize(&msg);
        assert_eq!(data.len(), 1 + 3 * 36);
        assert_eq!(&data[1..5], &[30, 0, 0, 0]);
        let decoded: InvMessage = deserialize(&data).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn inv_entry_bound() {
        let entry = Inventory { inv_type: InvType::Tx, hash: Sha256dHash::all_zeros() };
        assert_matches!(
            InvMessage::new(vec![entry; MAX_INV_ENTRIES + 1]),
            Err(encode::Error::TooLarge { .. })
        );

        let mut data = serialize(&encode::VarInt((MAX_INV_ENTRIES + 1) as u64));
        for _ in 0..MAX_INV_ENTRIES + 1 {
            data.extend_from_slice(&serialize(&entry));
        }
        assert_matches!(deserialize::<InvMessage>(&data), Err(encode::Error::TooLarge { .. }));
    }
}
