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

//! Internal macros.
//!
//! Macros meant to be used inside the crate and not imported by users.
//!

macro_rules! impl_consensus_encoding {
    ($thing:ident, $($field:ident),+) => (
        impl $crate::consensus::Encodable for $thing {
            #[inline]
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                writer: &mut W,
            ) -> Result<usize, std::io::Error> {
                let mut len = 0;
                $(len += self.$field.consensus_encode(writer)?;)+
                Ok(len)
            }
        }

        impl $crate::consensus::Decodable for $thing {
            #[inline]
            fn consensus_decode<R: std::io::Read + ?Sized>(
                reader: &mut R,
            ) -> Result<$thing, $crate::consensus::encode::Error> {
                Ok($thing {
                    $($field: $crate::consensus::Decodable::consensus_decode(reader)?,)+
                })
            }
        }
    );
}
pub(crate) use impl_consensus_encoding;

/// Implements consensus encoding for `Vec<T>` as a compact-size count
/// followed by the elements.
macro_rules! impl_vec {
    ($type:ty) => {
        impl $crate::consensus::Encodable for Vec<$type> {
            #[inline]
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                writer: &mut W,
            ) -> Result<usize, std::io::Error> {
                let mut len = 0;
                len += $crate::consensus::encode::VarInt(self.len() as u64)
                    .consensus_encode(writer)?;
                for c in self.iter() {
                    len += c.consensus_encode(writer)?;
                }
                Ok(len)
            }
        }

        impl $crate::consensus::Decodable for Vec<$type> {
            #[inline]
            fn consensus_decode<R: std::io::Read + ?Sized>(
                reader: &mut R,
            ) -> Result<Self, $crate::consensus::encode::Error> {
                let len = $crate::consensus::encode::VarInt::consensus_decode(reader)?.0;
                // Allocation guard against maliciously declared counts.
                let max = ($crate::consensus::encode::MAX_VEC_SIZE
                    / std::mem::size_of::<$type>().max(1)) as u64;
                if len > max {
                    return Err($crate::consensus::encode::Error::TooLarge {
                        what: concat!("Vec<", stringify!($type), ">"),
                        requested: len,
                        max,
                    });
                }
                let mut ret = Vec::with_capacity(len as usize);
                for _ in 0..len {
                    ret.push($crate::consensus::Decodable::consensus_decode(reader)?);
                }
                Ok(ret)
            }
        }
    };
}
pub(crate) use impl_vec;
