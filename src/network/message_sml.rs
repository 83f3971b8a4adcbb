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

//! Dash simplified masternode list network messages.
//!

use std::io::{self, Read, Write};

use crate::blockdata::quorum_commitment::QuorumFinalizationCommitment;
use crate::blockdata::transaction::Transaction;
use crate::consensus::{encode, Decodable, Encodable};
use crate::hash_types::{BlockHash, ProTxHash, QuorumHash, TxMerkleNode};
use crate::internal_macros::{impl_consensus_encoding, impl_vec};
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// The `getmnlistd` message requests a `mnlistdiff` message that provides
/// either:
/// - A full masternode list (if `base_block_hash` is all-zero)
/// - An update to a previously requested masternode list
///
/// <https://docs.dash.org/en/stable/docs/core/reference/p2p-network-data-messages.html#getmnlistd>
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct GetMnListDiff {
    /// Hash of a block the requester already has a valid masternode list of.
    /// Note: Can be all-zero to indicate that a full masternode list is
    /// requested.
    pub base_block_hash: BlockHash,
    /// Hash of the block for which the masternode list diff is requested
    pub block_hash: BlockHash,
}

impl_consensus_encoding!(GetMnListDiff, base_block_hash, block_hash);

/// A deleted LLMQ quorum reference inside `mnlistdiff`.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct DeletedQuorum {
    /// Raw LLMQ type byte; deleted quorums of retired types still decode.
    pub llmq_type: u8,
    pub quorum_hash: QuorumHash,
}

impl_consensus_encoding!(DeletedQuorum, llmq_type, quorum_hash);

impl_vec!(TxMerkleNode);
impl_vec!(ProTxHash);
impl_vec!(DeletedQuorum);
impl_vec!(QuorumFinalizationCommitment);

/// The `mnlistdiff` message is a reply to a `getmnlistd` message which
/// requested either a full masternode list or a diff for a range of blocks.
///
/// The quorum sections at the tail were introduced with DIP-8; peers
/// predating it omit them, so they are decoded only when bytes remain and
/// re-encoded only when present.
///
/// <https://docs.dash.org/en/stable/docs/core/reference/p2p-network-data-messages.html#mnlistdiff>
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct MnListDiff {
    /// Hash of a block the requester already has a valid masternode list of.
    pub base_block_hash: BlockHash,
    /// Hash of the block for which the masternode list diff is requested
    pub block_hash: BlockHash,
    /// Number of total transactions in `block_hash`
    pub total_transactions: u32,
    /// Merkle hashes in depth-first order
    pub merkle_hashes: Vec<TxMerkleNode>,
    /// Merkle flag bits, packed per 8 in a byte, least significant bit first
    pub merkle_flags: Vec<u8>,
    /// The fully serialized coinbase transaction of `block_hash`
    pub coinbase_tx: Transaction,
    /// A list of `ProRegTx` hashes for masternodes which were deleted after
    /// `base_block_hash`
    pub deleted_masternodes: Vec<ProTxHash>,
    /// The list of Simplified Masternode List (SML) entries which were added
    /// or updated since `base_block_hash`
    pub new_masternodes: Vec<MasternodeListEntry>,
    /// A list of LLMQ type and quorum hashes for LLMQs which were deleted
    /// after `base_block_hash`
    pub deleted_quorums: Option<Vec<DeletedQuorum>>,
    /// The list of LLMQ commitments for the LLMQs which were added since
    /// `base_block_hash`
    pub new_quorums: Option<Vec<QuorumFinalizationCommitment>>,
}

impl Encodable for MnListDiff {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        if self.new_quorums.is_some() != self.deleted_quorums.is_some() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "mnlistdiff: quorum sections must be present together",
            ));
        }
        let mut len = 0;
        len += self.base_block_hash.consensus_encode(w)?;
        len += self.block_hash.consensus_encode(w)?;
        len += self.total_transactions.consensus_encode(w)?;
        len += self.merkle_hashes.consensus_encode(w)?;
        len += self.merkle_flags.consensus_encode(w)?;
        len += self.coinbase_tx.consensus_encode(w)?;
        len += self.deleted_masternodes.consensus_encode(w)?;
        len += self.new_masternodes.consensus_encode(w)?;
        if let (Some(deleted), Some(new)) = (&self.deleted_quorums, &self.new_quorums) {
            len += deleted.consensus_encode(w)?;
            len += new.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl Decodable for MnListDiff {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let base_block_hash = BlockHash::consensus_decode(r)?;
        let block_hash = BlockHash::consensus_decode(r)?;
        let total_transactions = u32::consensus_decode(r)?;
        let merkle_hashes = Vec::<TxMerkleNode>::consensus_decode(r)?;
        let merkle_flags = Vec::<u8>::consensus_decode(r)?;
        let coinbase_tx = Transaction::consensus_decode(r)?;
        let deleted_masternodes = Vec::<ProTxHash>::consensus_decode(r)?;
        let new_masternodes = Vec::<MasternodeListEntry>::consensus_decode(r)?;

        // Pre-DIP-8 peers stop here.
        let mut rest = Vec::new();
        r.read_to_end(&mut rest).map_err(encode::Error::Io)?;
        let (deleted_quorums, new_quorums) = if rest.is_empty() {
            (None, None)
        } else {
            let mut cursor = io::Cursor::new(rest.as_slice());
            let deleted = Vec::<DeletedQuorum>::consensus_decode(&mut cursor)?;
            let new = Vec::<QuorumFinalizationCommitment>::consensus_decode(&mut cursor)?;
            let left = rest.len() - cursor.position() as usize;
            if left > 0 {
                return Err(encode::Error::TrailingBytes(left));
            }
            (Some(deleted), Some(new))
        };

        Ok(MnListDiff {
            base_block_hash,
            block_hash,
            total_transactions,
            merkle_hashes,
            merkle_flags,
            coinbase_tx,
            deleted_masternodes,
            new_masternodes,
            deleted_quorums,
            new_quorums,
        })
    }
}
