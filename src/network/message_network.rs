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

//! Dash network-related network messages.
//!
//! This module defines network messages which describe peers and their
//! capabilities.
//!

use std::io::{self, Read, Write};

use crate::consensus::encode::VarInt;
use crate::consensus::{encode, Decodable, Encodable, ReadExt};
use crate::network::address::Address;
use crate::network::constants::MAX_USER_AGENT_SIZE;

/// The `version` message
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct VersionMessage {
    /// The P2P network protocol version
    pub version: i32,
    /// A bitmask describing the services supported by this node
    pub services: crate::network::constants::ServiceFlags,
    /// The time at which the `version` message was sent
    pub timestamp: i64,
    /// The network address of the peer receiving the message
    pub receiver: Address,
    /// The network address of the peer sending the message
    pub sender: Address,
    /// A random nonce used to detect loops in the network
    pub nonce: u64,
    /// A string describing the peer's software
    pub user_agent: String,
    /// The height of the maximum-work blockchain that the peer is aware of
    pub start_height: i32,
    /// Whether the receiving peer should relay messages to the sender.
    /// Optional on the wire; if present, every earlier optional field is
    /// present too.
    pub relay: Option<bool>,
    /// The mn auth challenge is a set of random bytes that challenge a
    /// masternode to prove themselves. The sender sends a random auth
    /// challenge, and the masternode will send back a response in mn_auth
    /// proving they are a masternode by signing this message.
    pub mn_auth_challenge: Option<[u8; 32]>,
    /// Indicates if we are doing a quorum probe. Generally this should be
    /// set to false.
    pub masternode_connection: Option<bool>,
}

impl Encodable for VersionMessage {
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error> {
        if self.user_agent.len() > MAX_USER_AGENT_SIZE {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "version msg: user_agent too long"));
        }
        let mut len = 0;
        len += self.version.consensus_encode(writer)?;
        len += self.services.consensus_encode(writer)?;
        len += self.timestamp.consensus_encode(writer)?;
        len += self.receiver.consensus_encode(writer)?;
        len += self.sender.consensus_encode(writer)?;
        len += self.nonce.consensus_encode(writer)?;
        len += self.user_agent.consensus_encode(writer)?;
        len += self.start_height.consensus_encode(writer)?;
        // Each optional suffix may only be present if all earlier suffixes are.
        if self.mn_auth_challenge.is_some() && self.relay.is_none()
            || self.masternode_connection.is_some() && self.mn_auth_challenge.is_none()
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "version msg: optional suffix without its predecessors",
            ));
        }
        if let Some(relay) = self.relay {
            len += relay.consensus_encode(writer)?;
        }
        if let Some(challenge) = self.mn_auth_challenge {
            len += challenge.consensus_encode(writer)?;
        }
        if let Some(masternode) = self.masternode_connection {
            len += masternode.consensus_encode(writer)?;
        }
        Ok(len)
    }
}

impl Decodable for VersionMessage {
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, encode::Error> {
        // Required fields
        let version: i32 = Decodable::consensus_decode(reader)?;
        let services = Decodable::consensus_decode(reader)?;
        let timestamp: i64 = Decodable::consensus_decode(reader)?;
        let receiver: Address = Decodable::consensus_decode(reader)?;
        let sender: Address = Decodable::consensus_decode(reader)?;
        let nonce: u64 = Decodable::consensus_decode(reader)?;
        let user_agent_len = VarInt::consensus_decode(reader)?.0;
        if user_agent_len > MAX_USER_AGENT_SIZE as u64 {
            return Err(encode::Error::TooLarge {
                what: "version user_agent",
                requested: user_agent_len,
                max: MAX_USER_AGENT_SIZE as u64,
            });
        }
        let mut user_agent = vec![0u8; user_agent_len as usize];
        reader.read_slice(&mut user_agent)?;
        let user_agent = String::from_utf8(user_agent)
            .map_err(|_| encode::Error::ParseFailed("user_agent was not valid UTF8"))?;
        let start_height: i32 = Decodable::consensus_decode(reader)?;

        // Optional positional fields: read whatever remains.
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).map_err(encode::Error::Io)?;
        let mut rest = rest.as_slice();

        let mut relay = None;
        let mut mn_auth_challenge = None;
        let mut masternode_connection = None;
        if let Some((&byte, tail)) = rest.split_first() {
            relay = Some(byte != 0);
            rest = tail;
        }
        if !rest.is_empty() {
            if rest.len() < 32 {
                return Err(encode::Error::InvalidLength {
                    what: "version mnauth_challenge",
                    expected: 32,
                    got: rest.len(),
                });
            }
            let mut challenge = [0u8; 32];
            challenge.copy_from_slice(&rest[..32]);
            mn_auth_challenge = Some(challenge);
            rest = &rest[32..];
        }
        if let Some((&byte, tail)) = rest.split_first() {
            masternode_connection = Some(byte != 0);
            rest = tail;
        }
        if !rest.is_empty() {
            return Err(encode::Error::TrailingBytes(rest.len()));
        }

        Ok(VersionMessage {
            version,
            services,
            timestamp,
            receiver,
            sender,
            nonce,
            user_agent,
            start_height,
            relay,
            mn_auth_challenge,
            masternode_connection,
        })
    }
}
