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

//! Dash hash types.
//!
//! This module defines types for hashes used throughout the library. These
//! types are needed in order to avoid mixing data of the same hash format
//! (e.g. `SHA256d`) but of different meaning (such as transaction id, block
//! hash).
//!
//! Hashes are stored in network byte order, as received; their `Display`
//! implementations print the conventional reversed hex form.
//!

macro_rules! impl_hashencode {
    ($hashtype:ident) => {
        impl $crate::consensus::Encodable for $hashtype {
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                w: &mut W,
            ) -> Result<usize, std::io::Error> {
                use bitcoin_hashes::Hash;
                self.to_byte_array().consensus_encode(w)
            }
        }

        impl $crate::consensus::Decodable for $hashtype {
            fn consensus_decode<R: std::io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<Self, $crate::consensus::encode::Error> {
                use bitcoin_hashes::Hash;
                Ok(Self::from_byte_array(
                    <<$hashtype as bitcoin_hashes::Hash>::Bytes>::consensus_decode(r)?,
                ))
            }
        }
    };
}

pub use newtypes::*;

mod newtypes {
    use bitcoin_hashes::{hash160, hash_newtype, sha256d};

    hash_newtype! {
        /// A dash block hash.
        pub struct BlockHash(sha256d::Hash);

        /// A dash transaction hash/transaction ID.
        pub struct Txid(sha256d::Hash);

        /// A hash of a public key.
        pub struct PubkeyHash(hash160::Hash);

        /// A hash of the Merkle tree branch or root for transactions.
        pub struct TxMerkleNode(sha256d::Hash);

        /// ProTxHash is a pro-tx hash
        pub struct ProTxHash(sha256d::Hash);

        /// A hash that masternodes use to confirm registration on the chain.
        pub struct ConfirmedHash(sha256d::Hash);

        /// A hash of a quorum verification vector.
        pub struct QuorumVVecHash(sha256d::Hash);

        /// A hash of a quorum signing request id.
        pub struct QuorumSigningRequestId(sha256d::Hash);

        /// An inventory item hash whose meaning depends on the item type.
        pub struct Sha256dHash(sha256d::Hash);
    }

    /// A hash used to identify a quorum.
    pub type QuorumHash = BlockHash;

    impl_hashencode!(BlockHash);
    impl_hashencode!(Txid);
    impl_hashencode!(PubkeyHash);
    impl_hashencode!(TxMerkleNode);
    impl_hashencode!(ProTxHash);
    impl_hashencode!(ConfirmedHash);
    impl_hashencode!(QuorumVVecHash);
    impl_hashencode!(QuorumSigningRequestId);
    impl_hashencode!(Sha256dHash);
}

#[cfg(test)]
mod tests {
    use bitcoin_hashes::Hash;
    use hex_lit::hex;

    use super::*;
    use crate::consensus::{deserialize, serialize};

    #[test]
    fn hash_wire_order_is_preserved() {
        let raw = hex!("df2149d4b1805f1842aace662956f85d442d0aab9acf68fe13e2f93f9be9b259");
        let txid: Txid = deserialize(&raw).unwrap();
        assert_eq!(txid.to_byte_array(), raw);
        assert_eq!(serialize(&txid), raw.to_vec());
        // user-facing hex reverses the bytes
        let mut reversed = raw;
        reversed.reverse();
        assert_eq!(txid.to_string(), hex::encode(reversed));
    }
}
