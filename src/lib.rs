// Rust Dash Library
// Written by
//   The Rust Dash developers
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

//! # Rust Dash P2P Library
//!
//! A client-side implementation of the Dash peer-to-peer network protocol.
//!
//! Three tightly coupled pieces make up the library:
//!
//! * the [`network`] wire codec, a pure mapping between byte buffers and
//!   typed message records covering the Dash message set including the
//!   LLMQ (`islock`/`clsig`/`qfcommit`), masternode list (`mnlistdiff`)
//!   and PrivateSend (`ds*`) extensions;
//! * the [`p2p::peer`] connection, one per outbound TCP peer, driving the
//!   version/verack handshake, keepalive pings, and demultiplexing of
//!   inbound messages;
//! * the [`p2p::mix_session`] state machine, driving one PrivateSend
//!   denominate round against one masternode through an attached peer.
//!
//! Wallet storage, transaction signing, header synchronization and spork
//! policy stay with the host application, which plugs in through
//! [`p2p::P2pHost`] and [`p2p::NetShared`].

pub mod blockdata;
pub mod bls_sig_utils;
pub mod consensus;
pub mod hash_types;
pub(crate) mod internal_macros;
pub mod network;
pub mod p2p;
pub mod sml;

pub use crate::blockdata::script::ScriptBuf;
pub use crate::blockdata::transaction::{OutPoint, Transaction, TxIn, TxOut};
pub use crate::hash_types::{BlockHash, ProTxHash, PubkeyHash, QuorumHash, Txid};
pub use crate::network::constants::Network;
pub use crate::network::message::{NetworkMessage, RawNetworkMessage};
