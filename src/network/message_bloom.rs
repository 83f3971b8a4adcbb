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

//! Dash bloom filter network messages.
//!

use std::io::{self, Read, Write};

use crate::consensus::{encode, Decodable, Encodable, ReadExt};
use crate::network::constants::{
    FILTERADD_MAX_ELEMENT_BYTES, FILTERLOAD_MAX_FILTER_BYTES, FILTERLOAD_MAX_HASH_FUNCS,
};

/// The `filterload` message: sets a bloom filter on the connection.
///
/// <https://docs.dash.org/en/stable/docs/core/reference/p2p-network-control-messages.html#filterload>
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct FilterLoad {
    /// The filter itself, a bit field of arbitrary byte-aligned size.
    pub filter: Vec<u8>,
    /// The number of hash functions to use in this filter.
    pub hash_funcs: u32,
    /// A random value to add to the seed value in the hash function.
    pub tweak: u32,
    /// Controls how matched items are added to the filter.
    pub flags: u8,
}

impl FilterLoad {
    /// Builds a `filterload`, enforcing the protocol bounds.
    pub fn new(filter: Vec<u8>, hash_funcs: u32, tweak: u32, flags: u8) -> Result<Self, encode::Error> {
        if filter.len() > FILTERLOAD_MAX_FILTER_BYTES {
            return Err(encode::Error::TooLarge {
                what: "filterload filter",
                requested: filter.len() as u64,
                max: FILTERLOAD_MAX_FILTER_BYTES as u64,
            });
        }
        if hash_funcs > FILTERLOAD_MAX_HASH_FUNCS {
            return Err(encode::Error::TooLarge {
                what: "filterload nHashFuncs",
                requested: hash_funcs as u64,
                max: FILTERLOAD_MAX_HASH_FUNCS as u64,
            });
        }
        Ok(FilterLoad { filter, hash_funcs, tweak, flags })
    }
}

impl Encodable for FilterLoad {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        if self.filter.len() > FILTERLOAD_MAX_FILTER_BYTES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "filterload msg: filter too long"));
        }
        if self.hash_funcs > FILTERLOAD_MAX_HASH_FUNCS {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "filterload msg: too many hash funcs"));
        }
        let mut len = self.filter.consensus_encode(w)?;
        len += self.hash_funcs.consensus_encode(w)?;
        len += self.tweak.consensus_encode(w)?;
        len += self.flags.consensus_encode(w)?;
        Ok(len)
    }
}

impl Decodable for FilterLoad {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let filter_len = encode::read_compact_size(r)?;
        if filter_len as usize > FILTERLOAD_MAX_FILTER_BYTES {
            return Err(encode::Error::TooLarge {
                what: "filterload filter",
                requested: filter_len as u64,
                max: FILTERLOAD_MAX_FILTER_BYTES as u64,
            });
        }
        let mut filter = vec![0u8; filter_len as usize];
        r.read_slice(&mut filter)?;
        let hash_funcs = ReadExt::read_u32(r)?;
        if hash_funcs > FILTERLOAD_MAX_HASH_FUNCS {
            return Err(encode::Error::TooLarge {
                what: "filterload nHashFuncs",
                requested: hash_funcs as u64,
                max: FILTERLOAD_MAX_HASH_FUNCS as u64,
            });
        }
        let tweak = ReadExt::read_u32(r)?;
        let flags = ReadExt::read_u8(r)?;
        Ok(FilterLoad { filter, hash_funcs, tweak, flags })
    }
}

/// The `filteradd` message: adds one element to the connection's filter.
///
/// <https://docs.dash.org/en/stable/docs/core/reference/p2p-network-control-messages.html#filteradd>
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct FilterAdd {
    /// The element to add, typically a pubkey or an outpoint serialization.
    pub element: Vec<u8>,
}

impl FilterAdd {
    pub fn new(element: Vec<u8>) -> Result<Self, encode::Error> {
        if element.len() > FILTERADD_MAX_ELEMENT_BYTES {
            return Err(encode::Error::TooLarge {
                what: "filteradd element",
                requested: element.len() as u64,
                max: FILTERADD_MAX_ELEMENT_BYTES as u64,
            });
        }
        Ok(FilterAdd { element })
    }
}

impl Encodable for FilterAdd {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        if self.element.len() > FILTERADD_MAX_ELEMENT_BYTES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "filteradd msg: element too long"));
        }
        self.element.consensus_encode(w)
    }
}

impl Decodable for FilterAdd {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let element_len = encode::read_compact_size(r)?;
        if element_len as usize > FILTERADD_MAX_ELEMENT_BYTES {
            return Err(encode::Error::TooLarge {
                what: "filteradd element",
                requested: element_len as u64,
                max: FILTERADD_MAX_ELEMENT_BYTES as u64,
            });
        }
        let mut element = vec![0u8; element_len as usize];
        r.read_slice(&mut element)?;
        Ok(FilterAdd { element })
    }
}
