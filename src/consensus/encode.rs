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

//! Dash consensus-encodable types.
//!
//! This is the core of the wire codec: the `Encodable` and `Decodable`
//! traits, implementations for primitives, compact sizes (varints),
//! length-prefixed byte strings and the fixed bitsets used by quorum
//! commitments. Every decode is total: a byte sequence either produces a
//! value or a typed [`Error`], never a truncated value.
//!

use std::io::{self, Read, Write};
use std::mem;

use thiserror::Error;

/// Maximum size, in bytes, of a vector we are allowed to decode.
pub const MAX_VEC_SIZE: usize = 4_000_000;

/// Encoding error.
#[derive(Debug, Error)]
pub enum Error {
    /// And I/O error.
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    /// A length-prefixed field declared more data than allowed.
    #[error("{what}: requested length {requested} exceeds maximum {max}")]
    TooLarge {
        /// The field that overflowed.
        what: &'static str,
        /// The declared length.
        requested: u64,
        /// The allowed maximum.
        max: u64,
    },
    /// A fixed-width field had the wrong length.
    #[error("{what}: invalid length {got}, expected {expected}")]
    InvalidLength {
        /// The field with the bad length.
        what: &'static str,
        /// The required length.
        expected: usize,
        /// The length found on the wire.
        got: usize,
    },
    /// Strict decoding finished with unconsumed bytes.
    #[error("data not consumed entirely, {0} trailing bytes")]
    TrailingBytes(usize),
    /// A compact size was not encoded minimally.
    #[error("non-minimal varint")]
    NonMinimalVarInt,
    /// The envelope checksum did not match the payload.
    #[error("invalid checksum: expected {expected:02x?}, actual {actual:02x?}")]
    InvalidChecksum {
        /// Checksum computed over the payload.
        expected: [u8; 4],
        /// Checksum carried by the envelope.
        actual: [u8; 4],
    },
    /// The envelope declared a payload over the 32 MiB limit.
    #[error("payload length {0} over limit")]
    OversizedPayload(u32),
    /// A command was not recognized by a strict caller.
    #[error("unknown command: {0}")]
    UnknownCommand(String),
    /// A value did not map to any known enum discriminant.
    #[error("{what}: invalid enum value {received}")]
    InvalidEnumValue {
        /// The enum being decoded.
        what: &'static str,
        /// The value found on the wire.
        received: u64,
    },
    /// Parsing error.
    #[error("parse failed: {0}")]
    ParseFailed(&'static str),
}

/// Encodes an object into a vector.
pub fn serialize<T: Encodable + ?Sized>(data: &T) -> Vec<u8> {
    let mut encoder = Vec::new();
    let len = data.consensus_encode(&mut encoder).expect("in-memory writers don't error");
    debug_assert_eq!(len, encoder.len());
    encoder
}

/// Encodes an object into a hex-encoded string.
pub fn serialize_hex<T: Encodable + ?Sized>(data: &T) -> String {
    hex::encode(serialize(data))
}

/// Deserializes an object from a vector, will error if said deserialization
/// doesn't consume the entire vector.
pub fn deserialize<T: Decodable>(data: &[u8]) -> Result<T, Error> {
    let (rv, consumed) = deserialize_partial(data)?;
    if consumed == data.len() {
        Ok(rv)
    } else {
        Err(Error::TrailingBytes(data.len() - consumed))
    }
}

/// Deserializes an object from a vector, but will not report an error if said
/// deserialization doesn't consume the entire vector.
pub fn deserialize_partial<T: Decodable>(data: &[u8]) -> Result<(T, usize), Error> {
    let mut decoder = io::Cursor::new(data);
    let rv = Decodable::consensus_decode(&mut decoder)?;
    let consumed = decoder.position() as usize;
    Ok((rv, consumed))
}

/// Extensions of `Write` to encode data as per Dash consensus.
pub trait WriteExt: Write {
    /// Outputs a 64-bit unsigned integer.
    fn emit_u64(&mut self, v: u64) -> Result<(), io::Error>;
    /// Outputs a 32-bit unsigned integer.
    fn emit_u32(&mut self, v: u32) -> Result<(), io::Error>;
    /// Outputs a 16-bit unsigned integer.
    fn emit_u16(&mut self, v: u16) -> Result<(), io::Error>;
    /// Outputs an 8-bit unsigned integer.
    fn emit_u8(&mut self, v: u8) -> Result<(), io::Error>;

    /// Outputs a 64-bit signed integer.
    fn emit_i64(&mut self, v: i64) -> Result<(), io::Error>;
    /// Outputs a 32-bit signed integer.
    fn emit_i32(&mut self, v: i32) -> Result<(), io::Error>;
    /// Outputs a 16-bit signed integer.
    fn emit_i16(&mut self, v: i16) -> Result<(), io::Error>;

    /// Outputs a boolean.
    fn emit_bool(&mut self, v: bool) -> Result<(), io::Error>;
    /// Outputs a byte slice.
    fn emit_slice(&mut self, v: &[u8]) -> Result<(), io::Error>;
}

/// Extensions of `Read` to decode data as per Dash consensus.
pub trait ReadExt: Read {
    /// Reads a 64-bit unsigned integer.
    fn read_u64(&mut self) -> Result<u64, Error>;
    /// Reads a 32-bit unsigned integer.
    fn read_u32(&mut self) -> Result<u32, Error>;
    /// Reads a 16-bit unsigned integer.
    fn read_u16(&mut self) -> Result<u16, Error>;
    /// Reads an 8-bit unsigned integer.
    fn read_u8(&mut self) -> Result<u8, Error>;

    /// Reads a 64-bit signed integer.
    fn read_i64(&mut self) -> Result<i64, Error>;
    /// Reads a 32-bit signed integer.
    fn read_i32(&mut self) -> Result<i32, Error>;
    /// Reads a 16-bit signed integer.
    fn read_i16(&mut self) -> Result<i16, Error>;

    /// Reads a boolean.
    fn read_bool(&mut self) -> Result<bool, Error>;
    /// Reads a byte slice.
    fn read_slice(&mut self, slice: &mut [u8]) -> Result<(), Error>;
}

macro_rules! encoder_fn {
    ($name:ident, $val_type:ty) => {
        #[inline]
        fn $name(&mut self, v: $val_type) -> Result<(), io::Error> {
            self.write_all(&v.to_le_bytes())
        }
    };
}

macro_rules! decoder_fn {
    ($name:ident, $val_type:ty, $byte_len:expr) => {
        #[inline]
        fn $name(&mut self) -> Result<$val_type, Error> {
            let mut val = [0; $byte_len];
            self.read_exact(&mut val[..]).map_err(Error::Io)?;
            Ok(<$val_type>::from_le_bytes(val))
        }
    };
}

impl<W: Write + ?Sized> WriteExt for W {
    encoder_fn!(emit_u64, u64);
    encoder_fn!(emit_u32, u32);
    encoder_fn!(emit_u16, u16);
    encoder_fn!(emit_i64, i64);
    encoder_fn!(emit_i32, i32);
    encoder_fn!(emit_i16, i16);

    #[inline]
    fn emit_u8(&mut self, v: u8) -> Result<(), io::Error> {
        self.write_all(&[v])
    }
    #[inline]
    fn emit_bool(&mut self, v: bool) -> Result<(), io::Error> {
        self.write_all(&[v as u8])
    }
    #[inline]
    fn emit_slice(&mut self, v: &[u8]) -> Result<(), io::Error> {
        self.write_all(v)
    }
}

impl<R: Read + ?Sized> ReadExt for R {
    decoder_fn!(read_u64, u64, 8);
    decoder_fn!(read_u32, u32, 4);
    decoder_fn!(read_u16, u16, 2);
    decoder_fn!(read_i64, i64, 8);
    decoder_fn!(read_i32, i32, 4);
    decoder_fn!(read_i16, i16, 2);

    #[inline]
    fn read_u8(&mut self) -> Result<u8, Error> {
        let mut slice = [0u8; 1];
        self.read_exact(&mut slice)?;
        Ok(slice[0])
    }
    #[inline]
    fn read_bool(&mut self) -> Result<bool, Error> {
        ReadExt::read_u8(self).map(|bit| bit != 0)
    }
    #[inline]
    fn read_slice(&mut self, slice: &mut [u8]) -> Result<(), Error> {
        self.read_exact(slice).map_err(Error::Io)
    }
}

/// Data which can be encoded in a consensus-consistent way.
pub trait Encodable {
    /// Encodes an object with a well-defined format.
    ///
    /// Returns the number of bytes written on success.
    fn consensus_encode<W: Write + ?Sized>(&self, writer: &mut W) -> Result<usize, io::Error>;
}

/// Data which can be decoded in a consensus-consistent way.
pub trait Decodable: Sized {
    /// Decodes an object with a well-defined format.
    fn consensus_decode<R: Read + ?Sized>(reader: &mut R) -> Result<Self, Error>;
}

/// A variable-length unsigned integer (Bitcoin compact size).
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct VarInt(pub u64);

impl VarInt {
    /// Gets the length of this VarInt when encoded.
    ///
    /// Returns 1 for 0..=0xFC, 3 for 0xFD..=(2^16-1), 5 for 0x10000..=(2^32-1),
    /// and 9 otherwise.
    #[inline]
    pub fn len(&self) -> usize {
        match self.0 {
            0..=0xFC => 1,
            0xFD..=0xFFFF => 3,
            0x10000..=0xFFFFFFFF => 5,
            _ => 9,
        }
    }
}

impl Encodable for VarInt {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        match self.0 {
            0..=0xFC => {
                w.emit_u8(self.0 as u8)?;
                Ok(1)
            }
            0xFD..=0xFFFF => {
                w.emit_u8(0xFD)?;
                w.emit_u16(self.0 as u16)?;
                Ok(3)
            }
            0x10000..=0xFFFFFFFF => {
                w.emit_u8(0xFE)?;
                w.emit_u32(self.0 as u32)?;
                Ok(5)
            }
            _ => {
                w.emit_u8(0xFF)?;
                w.emit_u64(self.0)?;
                Ok(9)
            }
        }
    }
}

impl Decodable for VarInt {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let n = ReadExt::read_u8(r)?;
        match n {
            0xFF => {
                let x = ReadExt::read_u64(r)?;
                if x < 0x100000000 {
                    Err(Error::NonMinimalVarInt)
                } else {
                    Ok(VarInt(x))
                }
            }
            0xFE => {
                let x = ReadExt::read_u32(r)?;
                if x < 0x10000 {
                    Err(Error::NonMinimalVarInt)
                } else {
                    Ok(VarInt(x as u64))
                }
            }
            0xFD => {
                let x = ReadExt::read_u16(r)?;
                if x < 0xFD {
                    Err(Error::NonMinimalVarInt)
                } else {
                    Ok(VarInt(x as u64))
                }
            }
            n => Ok(VarInt(n as u64)),
        }
    }
}

/// Writes a compact size to `w`.
#[inline]
pub fn write_compact_size<W: Write + ?Sized>(w: &mut W, size: u32) -> Result<usize, io::Error> {
    VarInt(size as u64).consensus_encode(w)
}

/// Reads a compact size from `r`, bounded to `u32`.
#[inline]
pub fn read_compact_size<R: Read + ?Sized>(r: &mut R) -> Result<u32, Error> {
    let size = VarInt::consensus_decode(r)?.0;
    u32::try_from(size).map_err(|_| Error::TooLarge {
        what: "compact size",
        requested: size,
        max: u32::MAX as u64,
    })
}

/// Number of bytes a bitset of `size` bits occupies on the wire.
#[inline]
pub fn fixed_bitset_len(size: usize) -> usize {
    (size + 7) / 8
}

/// Reads a fixed bitset of `size` bits, packed per 8 in a byte, least
/// significant bit first.
pub fn read_fixed_bitset<R: Read + ?Sized>(r: &mut R, size: usize) -> Result<Vec<bool>, Error> {
    if size > MAX_VEC_SIZE * 8 {
        return Err(Error::TooLarge {
            what: "fixed bitset",
            requested: size as u64,
            max: (MAX_VEC_SIZE * 8) as u64,
        });
    }
    let mut bytes = vec![0u8; fixed_bitset_len(size)];
    r.read_slice(&mut bytes)?;
    let mut bits = Vec::with_capacity(size);
    for i in 0..size {
        bits.push(bytes[i / 8] & (1 << (i % 8)) != 0);
    }
    Ok(bits)
}

/// Writes `size` bits of `bits` as a fixed bitset.
pub fn write_fixed_bitset<W: Write + ?Sized>(
    w: &mut W,
    bits: &[bool],
    size: usize,
) -> Result<usize, io::Error> {
    let mut bytes = vec![0u8; fixed_bitset_len(size)];
    for (i, bit) in bits.iter().take(size).enumerate() {
        if *bit {
            bytes[i / 8] |= 1 << (i % 8);
        }
    }
    w.emit_slice(&bytes)?;
    Ok(bytes.len())
}

// Primitive types
macro_rules! impl_int_encodable {
    ($ty:ident, $meth_dec:ident, $meth_enc:ident) => {
        impl Decodable for $ty {
            #[inline]
            fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
                ReadExt::$meth_dec(r)
            }
        }
        impl Encodable for $ty {
            #[inline]
            fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
                w.$meth_enc(*self)?;
                Ok(mem::size_of::<$ty>())
            }
        }
    };
}

impl_int_encodable!(u8, read_u8, emit_u8);
impl_int_encodable!(u16, read_u16, emit_u16);
impl_int_encodable!(u32, read_u32, emit_u32);
impl_int_encodable!(u64, read_u64, emit_u64);
impl_int_encodable!(i16, read_i16, emit_i16);
impl_int_encodable!(i32, read_i32, emit_i32);
impl_int_encodable!(i64, read_i64, emit_i64);

impl Encodable for bool {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        w.emit_bool(*self)?;
        Ok(1)
    }
}

impl Decodable for bool {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        ReadExt::read_bool(r)
    }
}

impl Encodable for String {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let b = self.as_bytes();
        let vi_len = VarInt(b.len() as u64).consensus_encode(w)?;
        w.emit_slice(b)?;
        Ok(vi_len + b.len())
    }
}

impl Decodable for String {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        String::from_utf8(Decodable::consensus_decode(r)?)
            .map_err(|_| Error::ParseFailed("string was not valid UTF8"))
    }
}

// Byte arrays
macro_rules! impl_array {
    ( $size:literal ) => {
        impl Encodable for [u8; $size] {
            #[inline]
            fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
                w.emit_slice(&self[..])?;
                Ok(self.len())
            }
        }
        impl Decodable for [u8; $size] {
            #[inline]
            fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
                let mut ret = [0; $size];
                r.read_slice(&mut ret)?;
                Ok(ret)
            }
        }
    };
}

impl_array!(2);
impl_array!(4);
impl_array!(8);
impl_array!(12);
impl_array!(16);
impl_array!(20);
impl_array!(32);
impl_array!(33);
impl_array!(48);
impl_array!(65);
impl_array!(96);

impl Encodable for Vec<u8> {
    #[inline]
    fn consensus_encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<usize, io::Error> {
        let vi_len = VarInt(self.len() as u64).consensus_encode(w)?;
        w.emit_slice(self)?;
        Ok(vi_len + self.len())
    }
}

impl Decodable for Vec<u8> {
    #[inline]
    fn consensus_decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, Error> {
        let len = VarInt::consensus_decode(r)?.0;
        if len > MAX_VEC_SIZE as u64 {
            return Err(Error::TooLarge {
                what: "byte vector",
                requested: len,
                max: MAX_VEC_SIZE as u64,
            });
        }
        let mut ret = vec![0u8; len as usize];
        r.read_slice(&mut ret)?;
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn serialize_int_test() {
        assert_eq!(serialize(&1u8), vec![1u8]);
        assert_eq!(serialize(&0u32), vec![0u8, 0, 0, 0]);
        assert_eq!(serialize(&0xCDCDu16), vec![0xCDu8, 0xCD]);
        assert_eq!(serialize(&-1i32), vec![0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(
            serialize(&723401728380766730i64),
            vec![0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A, 0x0A]
        );
    }

    #[test]
    fn serialize_varint_test() {
        assert_eq!(serialize(&VarInt(10)), vec![10u8]);
        assert_eq!(serialize(&VarInt(0xFC)), vec![0xFCu8]);
        assert_eq!(serialize(&VarInt(0xFD)), vec![0xFDu8, 0xFD, 0]);
        assert_eq!(serialize(&VarInt(0xFFF)), vec![0xFDu8, 0xFF, 0xF]);
        assert_eq!(serialize(&VarInt(0xF0F0F0F)), vec![0xFEu8, 0xF, 0xF, 0xF, 0xF]);
        assert_eq!(
            serialize(&VarInt(0xF0F0F0F0F0E0)),
            vec![0xFFu8, 0xE0, 0xF0, 0xF0, 0xF0, 0xF0, 0xF0, 0, 0]
        );
    }

    #[test]
    fn non_minimal_varint_rejected() {
        // 0x10 encoded with a 3-byte prefix
        assert_matches!(deserialize::<VarInt>(&[0xFD, 0x10, 0x00]), Err(Error::NonMinimalVarInt));
        assert_matches!(
            deserialize::<VarInt>(&[0xFE, 0x10, 0x00, 0x00, 0x00]),
            Err(Error::NonMinimalVarInt)
        );
    }

    #[test]
    fn strict_deserialize_rejects_trailing_bytes() {
        assert_matches!(deserialize::<u32>(&[1, 0, 0, 0, 0]), Err(Error::TrailingBytes(1)));
    }

    #[test]
    fn fixed_bitset_roundtrip() {
        let bits = vec![true, false, true, true, false, true, false, false, true, true];
        let mut buf = Vec::new();
        let written = write_fixed_bitset(&mut buf, &bits, bits.len()).unwrap();
        assert_eq!(written, 2);
        let decoded = read_fixed_bitset(&mut buf.as_slice(), bits.len()).unwrap();
        assert_eq!(decoded, bits);
    }

    #[test]
    fn oversized_vec_rejected() {
        let mut data = serialize(&VarInt(MAX_VEC_SIZE as u64 + 1));
        data.extend_from_slice(&[0u8; 32]);
        assert_matches!(deserialize::<Vec<u8>>(&data), Err(Error::TooLarge { .. }));
    }
}
