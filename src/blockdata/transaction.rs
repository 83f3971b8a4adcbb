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

//! Dash transactions.
//!
//! The legacy transaction codec embedded by the `dsa`/`dsi`/`dsf`/`dstx`
//! payloads and the `mnlistdiff` coinbase. Special transaction payloads are
//! out of scope for the P2P core and the extra payload, when present, rides
//! along undecoded inside the surrounding message.
//!

use std::fmt;

use bitcoin_hashes::{sha256d, Hash};

use crate::blockdata::script::ScriptBuf;
use crate::consensus::encode::serialize;
use crate::hash_types::Txid;
use crate::internal_macros::{impl_consensus_encoding, impl_vec};

/// A reference to a transaction output.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct OutPoint {
    /// The referenced transaction's txid.
    pub txid: Txid,
    /// The index of the referenced output in its transaction's vout.
    pub vout: u32,
}

impl OutPoint {
    /// Creates a new [`OutPoint`].
    pub fn new(txid: Txid, vout: u32) -> OutPoint {
        OutPoint { txid, vout }
    }
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.txid, self.vout)
    }
}

impl_consensus_encoding!(OutPoint, txid, vout);

/// A transaction input, which defines old coins to be consumed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxIn {
    /// The reference to the previous output that is being used as an input.
    pub previous_output: OutPoint,
    /// The script which pushes values on the stack which will cause
    /// the referenced output's script to be accepted.
    pub script_sig: ScriptBuf,
    /// The sequence number, which suggests to miners which of two
    /// conflicting transactions should be preferred.
    pub sequence: u32,
}

impl TxIn {
    /// The sequence number that disables locktime-based relative ordering.
    pub const SEQUENCE_FINAL: u32 = 0xFFFFFFFF;
}

impl_consensus_encoding!(TxIn, previous_output, script_sig, sequence);

/// A transaction output, which defines new coins to be created from old ones.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TxOut {
    /// The value of the output, in duffs.
    pub value: u64,
    /// The script which must be satisfied for the output to be spent.
    pub script_pubkey: ScriptBuf,
}

impl_consensus_encoding!(TxOut, value, script_pubkey);

impl_vec!(TxIn);
impl_vec!(TxOut);

/// A Dash transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Transaction {
    /// The protocol version.
    pub version: i32,
    /// List of transaction inputs.
    pub input: Vec<TxIn>,
    /// List of transaction outputs.
    pub output: Vec<TxOut>,
    /// Block height or timestamp before which the transaction may not be
    /// included in a block.
    pub lock_time: u32,
}

impl Transaction {
    /// Computes the txid: the SHA256d of the serialized transaction, in
    /// network byte order.
    pub fn txid(&self) -> Txid {
        Txid::from_byte_array(sha256d::Hash::hash(&serialize(self)).to_byte_array())
    }
}

impl_consensus_encoding!(Transaction, version, input, output, lock_time);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{deserialize, serialize_hex};

    // Collateral transaction carried by the dsa/dsi/dsf fixtures.
    const COLLATERAL_TX: &str = concat!(
        "0200000001df2149d4b1805f1842aace662956f85d442d0aab9acf68fe13e2f93f9be9",
        "b259000000006b4830450221009a24e58366f1c7a4cbb170f6dc813d44023f176f5fa8",
        "7809ee9cc561ebd6f29802204b05f289613e86727025d71d8f58315d30ec3e4d8a7aef",
        "7b12a7425ff4fe345a0121034963cceab57f14094933a8272e6dd3d76a30c6f1d22fd9",
        "7c2f7e5dff0d6efe94feffffff019b3bd971020000001976a914ec785ad145df029f48",
        "e51e305483fda47f7834a588acf06d0200"
    );

    #[test]
    fn transaction_roundtrip() {
        let data = hex::decode(COLLATERAL_TX).unwrap();
        let tx: Transaction = deserialize(&data).unwrap();
        assert_eq!(tx.version, 2);
        assert_eq!(tx.input.len(), 1);
        assert_eq!(tx.input[0].previous_output.vout, 89);
        assert_eq!(tx.input[0].sequence, 0xFFFFFFFE);
        assert_eq!(tx.output.len(), 1);
        assert_eq!(tx.output[0].value, 10_499_996_571);
        assert_eq!(tx.output[0].script_pubkey.len(), 25);
        assert_eq!(tx.lock_time, 159_216);
        assert_eq!(serialize_hex(&tx), COLLATERAL_TX);
    }

    #[test]
    fn txid_is_stable() {
        let data = hex::decode(COLLATERAL_TX).unwrap();
        let tx: Transaction = deserialize(&data).unwrap();
        assert_eq!(tx.txid(), tx.clone().txid());
        // txid must match a fresh hash of the serialization
        use bitcoin_hashes::{sha256d, Hash};
        let expected = sha256d::Hash::hash(&data);
        assert_eq!(tx.txid().to_byte_array(), expected.to_byte_array());
    }
}
