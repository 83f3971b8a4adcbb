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

//! Dash network messages.
//!
//! This module defines the `NetworkMessage` and `RawNetworkMessage` types
//! that are used for (de)serializing Dash objects for transmission on the
//! network: a tagged variant per command wrapped in the envelope of magic
//! bytes, NUL-padded command, payload length and SHA256d checksum.
//!

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read, Write};

use bitcoin_hashes::{sha256d, Hash};

use crate::blockdata::quorum_commitment::QuorumFinalizationCommitment;
use crate::consensus::{encode, Decodable, Encodable, ReadExt, WriteExt};
use crate::network::address::AddrMessage;
use crate::network::constants::{EMPTY_PAYLOAD_CHECKSUM, MAX_PAYLOAD_SIZE};
use crate::network::message_blockdata::InvMessage;
use crate::network::message_bloom::{FilterAdd, FilterLoad};
use crate::network::message_llmq::{ChainLock, InstantSendLock};
use crate::network::message_network::VersionMessage;
use crate::network::message_privatesend::{
    CoinJoinAccept, CoinJoinBroadcastTx, CoinJoinComplete, CoinJoinEntry,
    CoinJoinFinalTransaction, CoinJoinQueue, CoinJoinSignedInputs, CoinJoinStatusUpdate,
};
use crate::network::message_sml::{GetMnListDiff, MnListDiff};
use crate::network::message_spork::SporkMessage;

/// Serializer for command string
#[derive(PartialEq, Eq, Clone, Debug, Hash)]
pub struct CommandString(Cow<'static, str>);

impl CommandString {
    /// Converts `&'static str` to `CommandString`.
    ///
    /// This is more efficient for string literals than non-static conversions
    /// because it avoids allocation.
    ///
    /// # Errors
    ///
    /// Returns an error if, and only if, the string is larger than 12
    /// characters in length.
    pub fn try_from_static(s: &'static str) -> Result<CommandString, encode::Error> {
        Self::try_from_static_cow(s.into())
    }

    fn try_from_static_cow(cow: Cow<'static, str>) -> Result<CommandString, encode::Error> {
        if cow.len() > 12 {
            return Err(encode::Error::InvalidLength {
                what: "command string",
                expected: 12,
                got: cow.len(),
            });
        }
        Ok(CommandString(cow))
    }
}

impl TryFrom<String> for CommandString {
    type Error = encode::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.len() > 12 {
            return Err(encode::Error::InvalidLength {
                what: "command string",
                expected: 12,
                got: value.len(),
            });
        }
        Ok(CommandString(value.into()))
    }
}

impl AsRef<str> for CommandString {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl fmt::Display for CommandString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.0.as_ref())
    }
}

impl Encodable for CommandString {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let mut rawbytes = [0u8; 12];
        let strbytes = self.0.as_bytes();
        if strbytes.len() > 12 {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "command string too long"));
        }
        rawbytes[..strbytes.len()].copy_from_slice(strbytes);
        rawbytes.consensus_encode(w)
    }
}

impl Decodable for CommandString {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let rawbytes: [u8; 12] = Decodable::consensus_decode(r)?;
        let rv = rawbytes
            .iter()
            .filter_map(|&u| if u > 0 { Some(u as char) } else { None })
            .collect::<String>();
        Ok(CommandString(rv.into()))
    }
}

/// A Dash network message parsed from the payload of an envelope.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum NetworkMessage {
    /// `version`
    Version(VersionMessage),
    /// `verack`
    Verack,
    /// `ping`
    Ping(u64),
    /// `pong`
    Pong(u64),
    /// `addr`
    Addr(AddrMessage),
    /// `inv`
    Inv(InvMessage),
    /// `getdata`
    GetData(InvMessage),
    /// `spork`
    Spork(SporkMessage),
    /// `islock`
    ISLock(InstantSendLock),
    /// `clsig`
    CLSig(ChainLock),
    /// `getmnlistd`
    GetMnListD(GetMnListDiff),
    /// `mnlistdiff`
    MnListDiff(MnListDiff),
    /// `qfcommit`
    QFCommit(QuorumFinalizationCommitment),
    /// `filterload`
    FilterLoad(FilterLoad),
    /// `filteradd`
    FilterAdd(FilterAdd),
    /// `senddsq`
    SendDsq(bool),
    /// `dsa`
    Dsa(CoinJoinAccept),
    /// `dssu`
    Dssu(CoinJoinStatusUpdate),
    /// `dsq`
    Dsq(CoinJoinQueue),
    /// `dstx`
    Dstx(CoinJoinBroadcastTx),
    /// `dsi`
    Dsi(CoinJoinEntry),
    /// `dsf`
    Dsf(CoinJoinFinalTransaction),
    /// `dss`
    Dss(CoinJoinSignedInputs),
    /// `dsc`
    Dsc(CoinJoinComplete),
    /// Any command not recognized by this library, payload preserved raw.
    Unknown {
        /// The command of this message.
        command: CommandString,
        /// The payload of this message.
        payload: Vec<u8>,
    },
}

impl NetworkMessage {
    /// Return the message command as a static string reference.
    pub fn cmd(&self) -> &'static str {
        match *self {
            NetworkMessage::Version(_) => "version",
            NetworkMessage::Verack => "verack",
            NetworkMessage::Ping(_) => "ping",
            NetworkMessage::Pong(_) => "pong",
            NetworkMessage::Addr(_) => "addr",
            NetworkMessage::Inv(_) => "inv",
            NetworkMessage::GetData(_) => "getdata",
            NetworkMessage::Spork(_) => "spork",
            NetworkMessage::ISLock(_) => "islock",
            NetworkMessage::CLSig(_) => "clsig",
            NetworkMessage::GetMnListD(_) => "getmnlistd",
            NetworkMessage::MnListDiff(_) => "mnlistdiff",
            NetworkMessage::QFCommit(_) => "qfcommit",
            NetworkMessage::FilterLoad(_) => "filterload",
            NetworkMessage::FilterAdd(_) => "filteradd",
            NetworkMessage::SendDsq(_) => "senddsq",
            NetworkMessage::Dsa(_) => "dsa",
            NetworkMessage::Dssu(_) => "dssu",
            NetworkMessage::Dsq(_) => "dsq",
            NetworkMessage::Dstx(_) => "dstx",
            NetworkMessage::Dsi(_) => "dsi",
            NetworkMessage::Dsf(_) => "dsf",
            NetworkMessage::Dss(_) => "dss",
            NetworkMessage::Dsc(_) => "dsc",
            NetworkMessage::Unknown { .. } => "unknown",
        }
    }

    /// Return the CommandString for the message command.
    pub fn command(&self) -> CommandString {
        match *self {
            NetworkMessage::Unknown { command: ref c, .. } => c.clone(),
            _ => CommandString::try_from_static(self.cmd()).expect("cmd returns valid commands"),
        }
    }

    /// Serializes the bare payload of this message, without the envelope.
    ///
    /// Fails only when a bound-violating value was constructed by hand,
    /// bypassing the checked constructors.
    pub fn payload(&self) -> Result<Vec<u8>, io::Error> {
        let mut out = Vec::new();
        match self {
            NetworkMessage::Version(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Verack => 0,
            NetworkMessage::Ping(nonce) => nonce.consensus_encode(&mut out)?,
            NetworkMessage::Pong(nonce) => nonce.consensus_encode(&mut out)?,
            NetworkMessage::Addr(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Inv(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::GetData(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Spork(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::ISLock(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::CLSig(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::GetMnListD(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::MnListDiff(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::QFCommit(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::FilterLoad(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::FilterAdd(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::SendDsq(enable) => enable.consensus_encode(&mut out)?,
            NetworkMessage::Dsa(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Dssu(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Dsq(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Dstx(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Dsi(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Dsf(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Dss(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Dsc(m) => m.consensus_encode(&mut out)?,
            NetworkMessage::Unknown { payload, .. } => {
                out.extend_from_slice(payload);
                payload.len()
            }
        };
        Ok(out)
    }

    /// Decodes the payload of a known command, preserving unknown commands
    /// as [`NetworkMessage::Unknown`]. Payloads of known commands must be
    /// consumed entirely.
    pub fn decode_payload(
        command: &CommandString,
        payload: &[u8],
    ) -> Result<NetworkMessage, encode::Error> {
        use crate::consensus::deserialize;

        Ok(match command.as_ref() {
            "version" => NetworkMessage::Version(deserialize(payload)?),
            "verack" => {
                if !payload.is_empty() {
                    return Err(encode::Error::TrailingBytes(payload.len()));
                }
                NetworkMessage::Verack
            }
            "ping" => NetworkMessage::Ping(deserialize(payload)?),
            "pong" => NetworkMessage::Pong(deserialize(payload)?),
            "addr" => NetworkMessage::Addr(deserialize(payload)?),
            "inv" => NetworkMessage::Inv(deserialize(payload)?),
            "getdata" => NetworkMessage::GetData(deserialize(payload)?),
            "spork" => NetworkMessage::Spork(deserialize(payload)?),
            "islock" => NetworkMessage::ISLock(deserialize(payload)?),
            "clsig" => NetworkMessage::CLSig(deserialize(payload)?),
            "getmnlistd" => NetworkMessage::GetMnListD(deserialize(payload)?),
            "mnlistdiff" => NetworkMessage::MnListDiff(deserialize(payload)?),
            "qfcommit" => NetworkMessage::QFCommit(deserialize(payload)?),
            "filterload" => NetworkMessage::FilterLoad(deserialize(payload)?),
            "filteradd" => NetworkMessage::FilterAdd(deserialize(payload)?),
            "senddsq" => NetworkMessage::SendDsq(deserialize(payload)?),
            "dsa" => NetworkMessage::Dsa(deserialize(payload)?),
            "dssu" => NetworkMessage::Dssu(deserialize(payload)?),
            "dsq" => NetworkMessage::Dsq(deserialize(payload)?),
            "dstx" => NetworkMessage::Dstx(deserialize(payload)?),
            "dsi" => NetworkMessage::Dsi(deserialize(payload)?),
            "dsf" => NetworkMessage::Dsf(deserialize(payload)?),
            "dss" => NetworkMessage::Dss(deserialize(payload)?),
            "dsc" => NetworkMessage::Dsc(deserialize(payload)?),
            _ => NetworkMessage::Unknown { command: command.clone(), payload: payload.to_vec() },
        })
    }

    /// Like [`NetworkMessage::decode_payload`], but refuses commands this
    /// library does not know.
    pub fn decode_payload_strict(
        command: &CommandString,
        payload: &[u8],
    ) -> Result<NetworkMessage, encode::Error> {
        match Self::decode_payload(command, payload)? {
            NetworkMessage::Unknown { command, .. } => {
                Err(encode::Error::UnknownCommand(command.to_string()))
            }
            message => Ok(message),
        }
    }
}

/// Computes the envelope checksum of a payload: the first four bytes of its
/// double-SHA256.
pub fn payload_checksum(payload: &[u8]) -> [u8; 4] {
    if payload.is_empty() {
        return EMPTY_PAYLOAD_CHECKSUM;
    }
    let hash = sha256d::Hash::hash(payload);
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&hash.to_byte_array()[..4]);
    checksum
}

/// A network message wrapped in its envelope.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RawNetworkMessage {
    /// Magic value associated with the network the message is on.
    pub magic: u32,
    /// The actual message data.
    pub payload: NetworkMessage,
}

impl Encodable for RawNetworkMessage {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let payload = self.payload.payload()?;
        if payload.len() > MAX_PAYLOAD_SIZE as usize {
            return Err(io::Error::new(io::ErrorKind::InvalidData, "payload over 32 MiB"));
        }
        let mut len = 0;
        len += self.magic.consensus_encode(w)?;
        len += self.payload.command().consensus_encode(w)?;
        len += (payload.len() as u32).consensus_encode(w)?;
        len += payload_checksum(&payload).consensus_encode(w)?;
        w.emit_slice(&payload)?;
        Ok(len + payload.len())
    }
}

impl Decodable for RawNetworkMessage {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let magic = ReadExt::read_u32(r)?;
        let command = CommandString::consensus_decode(r)?;
        let payload_len = ReadExt::read_u32(r)?;
        if payload_len > MAX_PAYLOAD_SIZE {
            return Err(encode::Error::OversizedPayload(payload_len));
        }
        let checksum = <[u8; 4]>::consensus_decode(r)?;
        let mut payload = vec![0u8; payload_len as usize];
        r.read_slice(&mut payload)?;
        let expected = payload_checksum(&payload);
        if checksum != expected {
            return Err(encode::Error::InvalidChecksum { expected, actual: checksum });
        }
        let payload = NetworkMessage::decode_payload(&command, &payload)?;
        Ok(RawNetworkMessage { magic, payload })
    }
}
