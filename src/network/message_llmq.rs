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

//! Dash LLMQ-signed network messages.
//!
//! InstantSend locks (`islock`, DIP10) and ChainLocks (`clsig`, DIP8). Both
//! carry a 96-byte BLS threshold signature recoverable by a quorum; the
//! signing request id and message hash are computed here, verification
//! against a quorum key happens in the caller.
//!

use bitcoin_hashes::{sha256d, Hash, HashEngine};

use crate::blockdata::transaction::OutPoint;
use crate::bls_sig_utils::BLSSignature;
use crate::consensus::encode::{serialize, VarInt};
use crate::hash_types::{BlockHash, QuorumHash, QuorumSigningRequestId, Sha256dHash, Txid};
use crate::internal_macros::{impl_consensus_encoding, impl_vec};
use crate::sml::llmq_type::LLMQType;

impl_vec!(OutPoint);

/// The `islock` message: an LLMQ-based InstantSend transaction lock.
///
/// <https://docs.dash.org/en/stable/docs/core/reference/p2p-network-instantsend-messages.html#islock>
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct InstantSendLock {
    /// Outpoints spent by the locked transaction.
    pub inputs: Vec<OutPoint>,
    /// The locked transaction.
    pub txid: Txid,
    /// BLS threshold signature of the InstantSend quorum.
    pub signature: BLSSignature,
}

impl_consensus_encoding!(InstantSendLock, inputs, txid, signature);

impl InstantSendLock {
    /// The signing request id: `SHA256d("islock" as varstr || inputs)`.
    pub fn request_id(&self) -> QuorumSigningRequestId {
        let mut engine = sha256d::Hash::engine();
        engine.input(&[6]);
        engine.input(b"islock");
        engine.input(&serialize(&VarInt(self.inputs.len() as u64)));
        for input in &self.inputs {
            engine.input(&serialize(input));
        }
        QuorumSigningRequestId::from_byte_array(sha256d::Hash::from_engine(engine).to_byte_array())
    }

    /// The hash the quorum signed:
    /// `SHA256d(llmqType || quorumHash || requestId || txid)`.
    pub fn msg_hash(
        &self,
        llmq_type: LLMQType,
        quorum_hash: &QuorumHash,
        request_id: &QuorumSigningRequestId,
    ) -> Sha256dHash {
        let mut engine = sha256d::Hash::engine();
        engine.input(&[llmq_type as u8]);
        engine.input(&quorum_hash.to_byte_array());
        engine.input(&request_id.to_byte_array());
        engine.input(&self.txid.to_byte_array());
        Sha256dHash::from_byte_array(sha256d::Hash::from_engine(engine).to_byte_array())
    }
}

/// The `clsig` message: a ChainLock pinning the chain tip at a height.
///
/// <https://docs.dash.org/en/stable/docs/core/reference/p2p-network-instantsend-messages.html#clsig>
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct ChainLock {
    /// Height of the locked block.
    pub block_height: u32,
    /// Hash of the locked block.
    pub block_hash: BlockHash,
    /// BLS threshold signature of the ChainLocks quorum.
    pub signature: BLSSignature,
}

impl_consensus_encoding!(ChainLock, block_height, block_hash, signature);

impl ChainLock {
    /// The signing request id: `SHA256d("clsig" as varstr || height)`.
    pub fn request_id(&self) -> QuorumSigningRequestId {
        let mut engine = sha256d::Hash::engine();
        engine.input(&[5]);
        engine.input(b"clsig");
        engine.input(&self.block_height.to_le_bytes());
        QuorumSigningRequestId::from_byte_array(sha256d::Hash::from_engine(engine).to_byte_array())
    }

    /// The hash the quorum signed:
    /// `SHA256d(llmqType || quorumHash || requestId || blockHash)`.
    pub fn msg_hash(
        &self,
        llmq_type: LLMQType,
        quorum_hash: &QuorumHash,
        request_id: &QuorumSigningRequestId,
    ) -> Sha256dHash {
        let mut engine = sha256d::Hash::engine();
        engine.input(&[llmq_type as u8]);
        engine.input(&quorum_hash.to_byte_array());
        engine.input(&request_id.to_byte_array());
        engine.input(&self.block_hash.to_byte_array());
        Sha256dHash::from_byte_array(sha256d::Hash::from_engine(engine).to_byte_array())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{deserialize, serialize};

    #[test]
    fn islock_roundtrip() {
        let islock = InstantSendLock {
            inputs: vec![
                OutPoint::new(Txid::hash(b"first"), 0),
                OutPoint::new(Txid::hash(b"second"), 3),
            ],
            txid: Txid::hash(b"locked"),
            signature: BLSSignature::from([7u8; 96]),
        };
        let data = serialize(&islock);
        assert_eq!(data.len(), 1 + 2 * 36 + 32 + 96);
        assert_eq!(deserialize::<InstantSendLock>(&data).unwrap(), islock);
    }

    #[test]
    fn islock_request_id_matches_manual_hash() {
        let islock = InstantSendLock {
            inputs: vec![OutPoint::new(Txid::hash(b"first"), 1)],
            txid: Txid::hash(b"locked"),
            signature: BLSSignature::from([0u8; 96]),
        };
        let mut preimage = Vec::new();
        preimage.extend_from_slice(b"\x06islock\x01");
        preimage.extend_from_slice(&serialize(&islock.inputs[0]));
        let expected = sha256d::Hash::hash(&preimage);
        assert_eq!(islock.request_id().to_byte_array(), expected.to_byte_array());
    }

    #[test]
    fn clsig_roundtrip() {
        let clsig = ChainLock {
            block_height: 1_295_327,
            block_hash: BlockHash::hash(b"tip"),
            signature: BLSSignature::from([9u8; 96]),
        };
        let data = serialize(&clsig);
        assert_eq!(data.len(), 4 + 32 + 96);
        assert_eq!(deserialize::<ChainLock>(&data).unwrap(), clsig);
    }

    #[test]
    fn clsig_request_id_matches_manual_hash() {
        let clsig = ChainLock {
            block_height: 169118,
            block_hash: BlockHash::hash(b"tip"),
            signature: BLSSignature::from([0u8; 96]),
        };
        let mut preimage = Vec::new();
        preimage.extend_from_slice(b"\x05clsig");
        preimage.extend_from_slice(&169118u32.to_le_bytes());
        let expected = sha256d::Hash::hash(&preimage);
        assert_eq!(clsig.request_id().to_byte_array(), expected.to_byte_array());

        let msg_hash =
            clsig.msg_hash(LLMQType::Llmqtype400_60, &clsig.block_hash, &clsig.request_id());
        let mut preimage = vec![2u8];
        preimage.extend_from_slice(&clsig.block_hash.to_byte_array());
        preimage.extend_from_slice(&clsig.request_id().to_byte_array());
        preimage.extend_from_slice(&clsig.block_hash.to_byte_array());
        assert_eq!(msg_hash.to_byte_array(), sha256d::Hash::hash(&preimage).to_byte_array());
    }
}
