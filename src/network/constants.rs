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

//! Dash network constants.
//!
//! This module provides various constants relating to the Dash network
//! protocol, such as protocol versioning and magic header bytes.
//!

use std::fmt;
use std::io::{self, Read, Write};

use crate::consensus::{encode, Decodable, Encodable};

/// Version of the protocol this library speaks.
pub const PROTOCOL_VERSION: i32 = 70216;

/// Largest payload we are willing to read or frame, 32 MiB.
pub const MAX_PAYLOAD_SIZE: u32 = 32 * 1024 * 1024;

/// Checksum of an empty payload, the first four bytes of `SHA256d("")`.
pub const EMPTY_PAYLOAD_CHECKSUM: [u8; 4] = [0x5D, 0xF6, 0xE0, 0xE2];

/// Maximum length of the `version` user agent.
pub const MAX_USER_AGENT_SIZE: usize = 256;

/// Maximum number of entries in an `addr` message.
pub const MAX_ADDRESSES: usize = 1000;

/// Maximum number of entries in an `inv` or `getdata` message.
pub const MAX_INV_ENTRIES: usize = 50000;

/// Maximum number of hash functions a `filterload` may request.
pub const FILTERLOAD_MAX_HASH_FUNCS: u32 = 50;

/// Maximum size in bytes of a `filterload` bloom filter.
pub const FILTERLOAD_MAX_FILTER_BYTES: usize = 36000;

/// Maximum size in bytes of a `filteradd` element.
pub const FILTERADD_MAX_ELEMENT_BYTES: usize = 520;

/// Maximum number of inputs or outputs in one PrivateSend entry.
pub const PRIVATESEND_ENTRY_MAX_SIZE: usize = 9;

/// The cryptocurrency network to act on.
#[derive(Copy, PartialEq, Eq, PartialOrd, Ord, Clone, Hash, Debug)]
pub enum Network {
    /// Classic Dash
    Dash,
    /// Dash's testnet
    Testnet,
    /// Dash's devnet
    Devnet,
    /// Dash's regtest
    Regtest,
}

impl Network {
    /// Return the network magic, the little-endian integer whose byte
    /// serialization is the start string of every envelope.
    pub fn magic(self) -> u32 {
        match self {
            Network::Dash => 0xBD6B0CBF,
            Network::Testnet => 0xFFCAE2CE,
            Network::Devnet => 0xCEFFCAE2,
            Network::Regtest => 0xDCB7C1FC,
        }
    }

    /// Default P2P port of the network.
    pub fn default_port(self) -> u16 {
        match self {
            Network::Dash => 9999,
            Network::Testnet => 19999,
            Network::Devnet => 19799,
            Network::Regtest => 19899,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Network::Dash => "dash",
            Network::Testnet => "testnet",
            Network::Devnet => "devnet",
            Network::Regtest => "regtest",
        };
        f.write_str(s)
    }
}

bitflags::bitflags! {
    /// Flags to indicate which network services a node supports.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct ServiceFlags: u64 {
        /// NETWORK means that the node is capable of serving the complete
        /// block chain.
        const NETWORK = 1 << 0;
        /// GETUTXO means the node is capable of responding to the getutxo
        /// protocol request.
        const GETUTXO = 1 << 1;
        /// BLOOM means the node is capable and willing to handle
        /// bloom-filtered connections.
        const BLOOM = 1 << 2;
        /// NETWORK_LIMITED means the same as NETWORK with the limitation of
        /// only serving the last 288 blocks.
        const NETWORK_LIMITED = 1 << 10;

        // Unknown flags coming from the wire are preserved.
        const _ = !0;
    }
}

impl Encodable for ServiceFlags {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        self.bits().consensus_encode(w)
    }
}

impl Decodable for ServiceFlags {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        Ok(ServiceFlags::from_bits_retain(Decodable::consensus_decode(r)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::{deserialize, serialize};

    #[test]
    fn magic_bytes_on_the_wire() {
        assert_eq!(serialize(&Network::Dash.magic()), [0xBF, 0x0C, 0x6B, 0xBD]);
        assert_eq!(serialize(&Network::Testnet.magic()), [0xCE, 0xE2, 0xCA, 0xFF]);
    }

    #[test]
    fn service_flags_preserve_unknown_bits() {
        let wire = [0x05, 0, 0, 0, 0, 0, 0x80, 0];
        let flags: ServiceFlags = deserialize(&wire).unwrap();
        assert!(flags.contains(ServiceFlags::NETWORK));
        assert!(flags.contains(ServiceFlags::BLOOM));
        assert_eq!(serialize(&flags), wire.to_vec());
    }
}
