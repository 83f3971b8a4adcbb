use std::collections::BTreeMap;

use rand::Rng;

use crate::blockdata::transaction::OutPoint;
use crate::hash_types::ProTxHash;
use crate::network::message_sml::MnListDiff;
use crate::sml::masternode_list_entry::MasternodeListEntry;

/// An in-memory snapshot of the deterministic masternode list.
///
/// Entries are keyed by their ProRegTx hash. A separate collateral index
/// maps masternode collateral outpoints (as referenced by `dsq` messages)
/// to entries; it is populated by the host, which knows the ProRegTx
/// collaterals.
#[derive(Clone, Default, Debug)]
pub struct MasternodeList {
    masternodes: BTreeMap<ProTxHash, MasternodeListEntry>,
    collaterals: BTreeMap<OutPoint, ProTxHash>,
}

impl MasternodeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.masternodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.masternodes.is_empty()
    }

    /// Adds or replaces one entry.
    pub fn insert(&mut self, entry: MasternodeListEntry) {
        self.masternodes.insert(entry.pro_reg_tx_hash, entry);
    }

    /// Records the collateral outpoint of a masternode so `dsq` offers can
    /// be resolved to an entry.
    pub fn register_collateral(&mut self, outpoint: OutPoint, pro_tx_hash: ProTxHash) {
        self.collaterals.insert(outpoint, pro_tx_hash);
    }

    /// Applies a `mnlistdiff`: drops deleted masternodes, upserts new ones.
    pub fn apply_diff(&mut self, diff: &MnListDiff) {
        for deleted in &diff.deleted_masternodes {
            self.masternodes.remove(deleted);
            self.collaterals.retain(|_, hash| hash != deleted);
        }
        for entry in &diff.new_masternodes {
            self.insert(entry.clone());
        }
    }

    pub fn get(&self, pro_tx_hash: &ProTxHash) -> Option<&MasternodeListEntry> {
        self.masternodes.get(pro_tx_hash)
    }

    /// Resolves a masternode by its collateral outpoint.
    pub fn get_mn_by_outpoint(&self, outpoint: &OutPoint) -> Option<&MasternodeListEntry> {
        self.collaterals.get(outpoint).and_then(|hash| self.masternodes.get(hash))
    }

    /// Picks a uniformly random valid masternode, if any.
    pub fn get_random_mn(&self) -> Option<&MasternodeListEntry> {
        let valid: Vec<_> =
            self.masternodes.values().filter(|entry| entry.is_valid).collect();
        if valid.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..valid.len());
        Some(valid[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = &MasternodeListEntry> {
        self.masternodes.values()
    }
}

#[cfg(test)]
mod tests {
    use bitcoin_hashes::Hash;

    use super::*;
    use crate::blockdata::transaction::Transaction;
    use crate::bls_sig_utils::BLSPublicKey;
    use crate::hash_types::{BlockHash, ConfirmedHash, PubkeyHash, Txid};

    fn entry(tag: &[u8], port: u16, valid: bool) -> MasternodeListEntry {
        MasternodeListEntry {
            pro_reg_tx_hash: ProTxHash::hash(tag),
            confirmed_hash: ConfirmedHash::hash(tag),
            service_address: format!("127.0.0.1:{port}").parse().unwrap(),
            operator_public_key: BLSPublicKey::from([1u8; 48]),
            key_id_voting: PubkeyHash::hash(tag),
            is_valid: valid,
        }
    }

    fn diff(deleted: Vec<ProTxHash>, new: Vec<MasternodeListEntry>) -> MnListDiff {
        MnListDiff {
            base_block_hash: BlockHash::all_zeros(),
            block_hash: BlockHash::all_zeros(),
            total_transactions: 0,
            merkle_hashes: vec![],
            merkle_flags: vec![],
            coinbase_tx: Transaction { version: 2, input: vec![], output: vec![], lock_time: 0 },
            deleted_masternodes: deleted,
            new_masternodes: new,
            deleted_quorums: None,
            new_quorums: None,
        }
    }

    #[test]
    fn apply_diff_upserts_and_deletes() {
        let mut list = MasternodeList::new();
        list.apply_diff(&diff(vec![], vec![entry(b"a", 9999, true), entry(b"b", 9998, true)]));
        assert_eq!(list.len(), 2);

        list.apply_diff(&diff(vec![ProTxHash::hash(b"a")], vec![entry(b"c", 9997, false)]));
        assert_eq!(list.len(), 2);
        assert!(list.get(&ProTxHash::hash(b"a")).is_none());
        assert!(list.get(&ProTxHash::hash(b"c")).is_some());
    }

    #[test]
    fn outpoint_lookup() {
        let mut list = MasternodeList::new();
        list.insert(entry(b"a", 9999, true));
        let outpoint = OutPoint::new(Txid::hash(b"collateral"), 1);
        list.register_collateral(outpoint, ProTxHash::hash(b"a"));

        let found = list.get_mn_by_outpoint(&outpoint).unwrap();
        assert_eq!(found.pro_reg_tx_hash, ProTxHash::hash(b"a"));
        assert!(list.get_mn_by_outpoint(&OutPoint::new(Txid::hash(b"other"), 0)).is_none());

        // deleting the masternode drops the collateral mapping
        list.apply_diff(&diff(vec![ProTxHash::hash(b"a")], vec![]));
        assert!(list.get_mn_by_outpoint(&outpoint).is_none());
    }

    #[test]
    fn random_pick_skips_invalid() {
        let mut list = MasternodeList::new();
        assert!(list.get_random_mn().is_none());
        list.insert(entry(b"dead", 9999, false));
        assert!(list.get_random_mn().is_none());
        list.insert(entry(b"live", 9998, true));
        let picked = list.get_random_mn().unwrap();
        assert_eq!(picked.pro_reg_tx_hash, ProTxHash::hash(b"live"));
    }
}
