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

//! Dash network addresses.
//!
//! This module defines the structures and functions needed to encode
//! network addresses. IP addresses are carried as 16 bytes, IPv4 in the
//! IPv6-mapped form; ports are big-endian.
//!

use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use crate::consensus::{encode, Decodable, Encodable, ReadExt};
use crate::network::constants::{ServiceFlags, MAX_ADDRESSES};

/// A message which can be sent on the Dash network.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Address {
    /// Services provided by the peer whose address this is.
    pub services: ServiceFlags,
    /// Network byte-order ipv6 address, or ipv4-mapped ipv6 address.
    pub address: [u16; 8],
    /// Network port.
    pub port: u16,
}

impl Address {
    /// Creates an address message for a socket.
    pub fn new(socket: &SocketAddr, services: ServiceFlags) -> Address {
        let (address, port) = match *socket {
            SocketAddr::V4(addr) => (addr.ip().to_ipv6_mapped().segments(), addr.port()),
            SocketAddr::V6(addr) => (addr.ip().segments(), addr.port()),
        };
        Address { address, port, services }
    }

    /// Extracts a socket address from this [`Address`]. An ipv4-mapped
    /// address comes back as plain ipv4.
    pub fn socket_addr(&self) -> SocketAddr {
        let addr = Ipv6Addr::new(
            self.address[0],
            self.address[1],
            self.address[2],
            self.address[3],
            self.address[4],
            self.address[5],
            self.address[6],
            self.address[7],
        );
        match addr.to_ipv4_mapped() {
            Some(v4) => SocketAddr::new(IpAddr::V4(v4), self.port),
            None => SocketAddr::new(IpAddr::V6(addr), self.port),
        }
    }
}

fn addr_to_be(addr: [u16; 8]) -> [u16; 8] {
    [
        addr[0].to_be(),
        addr[1].to_be(),
        addr[2].to_be(),
        addr[3].to_be(),
        addr[4].to_be(),
        addr[5].to_be(),
        addr[6].to_be(),
        addr[7].to_be(),
    ]
}

impl Encodable for Address {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut len = self.services.consensus_encode(w)?;
        for word in &addr_to_be(self.address) {
            w.write_all(&word.to_ne_bytes())?;
            len += 2;
        }
        w.write_all(&self.port.to_be_bytes())?;
        Ok(len + 2)
    }
}

impl Decodable for Address {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let services = ServiceFlags::consensus_decode(r)?;
        let mut address = [0u16; 8];
        for word in address.iter_mut() {
            let mut buf = [0u8; 2];
            r.read_slice(&mut buf)?;
            *word = u16::from_be_bytes(buf);
        }
        let mut buf = [0u8; 2];
        r.read_slice(&mut buf)?;
        Ok(Address { services, address, port: u16::from_be_bytes(buf) })
    }
}

/// The `addr` message: known active peers, gossiped on request.
///
/// <https://docs.dash.org/en/stable/docs/core/reference/p2p-network-control-messages.html#addr>
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct AddrMessage {
    /// `(time, address)` pairs; `time` is the last-seen unix timestamp.
    pub addresses: Vec<(u32, Address)>,
}

impl AddrMessage {
    /// Builds an `addr` message, refusing more entries than relayable.
    pub fn new(addresses: Vec<(u32, Address)>) -> Result<Self, encode::Error> {
        if addresses.len() > MAX_ADDRESSES {
            return Err(encode::Error::TooLarge {
                what: "addr entries",
                requested: addresses.len() as u64,
                max: MAX_ADDRESSES as u64,
            });
        }
        Ok(AddrMessage { addresses })
    }
}

impl Encodable for AddrMessage {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        if self.addresses.len() > MAX_ADDRESSES {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "addr msg: too many addresses"));
        }
        let mut len = encode::write_compact_size(w, self.addresses.len() as u32)?;
        for (time, address) in &self.addresses {
            len += time.consensus_encode(w)?;
            len += address.consensus_encode(w)?;
        }
        Ok(len)
    }
}

impl Decodable for AddrMessage {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let count = encode::read_compact_size(r)?;
        if count as usize > MAX_ADDRESSES {
            return Err(encode::Error::TooLarge {
                what: "addr entries",
                requested: count as u64,
                max: MAX_ADDRESSES as u64,
            });
        }
        let mut addresses = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let time = ReadExt::read_u32(r)?;
            let address = Address::consensus_decode(r)?;
            addresses.push((time, address));
        }
        Ok(AddrMessage { addresses })
    }
}
