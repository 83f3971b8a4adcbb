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

//! Consensus codec.
//!
//! This module defines the traits and functions which map protocol data
//! structures to and from their wire representation.
//!

pub mod encode;

pub use self::encode::{
    deserialize, deserialize_partial, serialize, serialize_hex, Decodable, Encodable, ReadExt,
    WriteExt,
};
