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

//! Dash Quorum Finalization Commitment.
//!
//! It is defined in DIP6 [dip-0006.md](https://github.com/dashpay/dips/blob/master/dip-0006.md)
//! and travels both as the `qfcommit` message payload and inside the
//! `mnlistdiff` `newQuorums` section.
//!

use std::io::{self, Read, Write};

use crate::bls_sig_utils::{BLSPublicKey, BLSSignature};
use crate::consensus::encode::{
    read_compact_size, read_fixed_bitset, write_compact_size, write_fixed_bitset,
};
use crate::consensus::{encode, Decodable, Encodable};
use crate::hash_types::{QuorumHash, QuorumVVecHash};
use crate::sml::llmq_type::LLMQType;

/// A Quorum Finalization Commitment. It is described in the finalization
/// section of DIP6:
/// [dip-0006.md#6-finalization-phase](https://github.com/dashpay/dips/blob/master/dip-0006.md#6-finalization-phase)
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct QuorumFinalizationCommitment {
    pub version: u16,
    pub llmq_type: LLMQType,
    pub quorum_hash: QuorumHash,
    /// Which quorum members signed the commitment, one bit per member.
    pub signers: Vec<bool>,
    /// Which quorum members passed DKG verification, one bit per member.
    pub valid_members: Vec<bool>,
    pub quorum_public_key: BLSPublicKey,
    pub quorum_vvec_hash: QuorumVVecHash,
    /// Threshold signature, recoverable by the quorum.
    pub threshold_sig: BLSSignature,
    /// Aggregated signature of all commitment signers.
    pub all_commitment_aggregated_signature: BLSSignature,
}

impl Encodable for QuorumFinalizationCommitment {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = 0;
        len += self.version.consensus_encode(w)?;
        len += self.llmq_type.consensus_encode(w)?;
        len += self.quorum_hash.consensus_encode(w)?;
        len += write_compact_size(w, self.signers.len() as u32)?;
        len += write_fixed_bitset(w, self.signers.as_slice(), self.signers.len())?;
        len += write_compact_size(w, self.valid_members.len() as u32)?;
        len += write_fixed_bitset(w, self.valid_members.as_slice(), self.valid_members.len())?;
        len += self.quorum_public_key.consensus_encode(w)?;
        len += self.quorum_vvec_hash.consensus_encode(w)?;
        len += self.threshold_sig.consensus_encode(w)?;
        len += self.all_commitment_aggregated_signature.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for QuorumFinalizationCommitment {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let version = u16::consensus_decode(r)?;
        let llmq_type = LLMQType::consensus_decode(r)?;
        let quorum_hash = QuorumHash::consensus_decode(r)?;
        let signers_count = read_compact_size(r)?;
        let signers = read_fixed_bitset(r, signers_count as usize)?;
        let valid_members_count = read_compact_size(r)?;
        let valid_members = read_fixed_bitset(r, valid_members_count as usize)?;
        let quorum_public_key = BLSPublicKey::consensus_decode(r)?;
        let quorum_vvec_hash = QuorumVVecHash::consensus_decode(r)?;
        let quorum_sig = BLSSignature::consensus_decode(r)?;
        let sig = BLSSignature::consensus_decode(r)?;
        Ok(QuorumFinalizationCommitment {
            version,
            llmq_type,
            quorum_hash,
            signers,
            valid_members,
            quorum_public_key,
            quorum_vvec_hash,
            threshold_sig: quorum_sig,
            all_commitment_aggregated_signature: sig,
        })
    }
}
