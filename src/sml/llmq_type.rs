use std::io::{Read, Write};

use strum::FromRepr;

use crate::consensus::{encode, Decodable, Encodable, ReadExt, WriteExt};

/// The LLMQ types known to protocol version 70216.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, FromRepr)]
#[repr(u8)]
pub enum LLMQType {
    /// 50 members, 60% threshold, one per block
    Llmqtype50_60 = 1,
    /// 400 members, 60% threshold, one every 12 blocks
    Llmqtype400_60 = 2,
    /// 400 members, 85% threshold, one every 24 blocks
    Llmqtype400_85 = 3,
    /// 5 members, 60% threshold, for testing only
    Llmqtype5_60 = 100,
}

impl Encodable for LLMQType {
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, std::io::Error> {
        w.emit_u8(*self as u8)?;
        Ok(1)
    }
}

impl Decodable for LLMQType {
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, encode::Error> {
        let received = ReadExt::read_u8(r)?;
        LLMQType::from_repr(received).ok_or(encode::Error::InvalidEnumValue {
            what: "LLMQType",
            received: received as u64,
        })
    }
}
