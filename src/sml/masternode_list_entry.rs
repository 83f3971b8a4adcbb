use std::fmt;
use std::io::{Read, Write};
use std::net::SocketAddr;

use crate::bls_sig_utils::BLSPublicKey;
use crate::consensus::encode::Error;
use crate::consensus::{Decodable, Encodable};
use crate::hash_types::{ConfirmedHash, ProTxHash, PubkeyHash};
use crate::internal_macros::impl_vec;

/// One row of the Simplified Masternode List, as carried by `mnlistdiff`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct MasternodeListEntry {
    /// Hash of the masternode's provider registration transaction.
    pub pro_reg_tx_hash: ProTxHash,
    /// Hash of the block where the provider registration got confirmed,
    /// all-zero while unconfirmed.
    pub confirmed_hash: ConfirmedHash,
    /// The P2P endpoint of the masternode.
    pub service_address: SocketAddr,
    /// BLS operator key, verifies `dsq`/`dstx` and quorum signatures.
    pub operator_public_key: BLSPublicKey,
    /// Hash of the voting key.
    pub key_id_voting: PubkeyHash,
    /// Whether the masternode is currently in good standing.
    pub is_valid: bool,
}

impl Encodable for MasternodeListEntry {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, std::io::Error> {
        let mut len = 0;
        len += self.pro_reg_tx_hash.consensus_encode(writer)?;
        len += self.confirmed_hash.consensus_encode(writer)?;
        len += self.service_address.consensus_encode(writer)?;
        len += self.operator_public_key.consensus_encode(writer)?;
        len += self.key_id_voting.consensus_encode(writer)?;
        len += self.is_valid.consensus_encode(writer)?;
        Ok(len)
    }
}

impl Decodable for MasternodeListEntry {
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Error> {
        let pro_reg_tx_hash: ProTxHash = Decodable::consensus_decode(reader)?;
        let confirmed_hash: ConfirmedHash = Decodable::consensus_decode(reader)?;
        let service_address: SocketAddr = Decodable::consensus_decode(reader)?;
        let operator_public_key: BLSPublicKey = Decodable::consensus_decode(reader)?;
        let key_id_voting: PubkeyHash = Decodable::consensus_decode(reader)?;
        let is_valid: bool = Decodable::consensus_decode(reader)?;

        Ok(MasternodeListEntry {
            pro_reg_tx_hash,
            confirmed_hash,
            service_address,
            operator_public_key,
            key_id_voting,
            is_valid,
        })
    }
}

impl fmt::Display for MasternodeListEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} at {} ({})",
            self.pro_reg_tx_hash,
            self.service_address,
            if self.is_valid { "valid" } else { "invalid" }
        )
    }
}

impl_vec!(MasternodeListEntry);
