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

//! Dash BLS elements
//! Convenience wrappers around fixed size arrays of 48 and 96 bytes representing the public key
//! and signature.
//!

use std::fmt;

use blsful::{Bls12381G2Impl, Pairing};
use thiserror::Error;

/// A failure while interpreting or checking a BLS element.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BlsError {
    /// The 48 bytes did not describe a valid G1 point.
    #[error("invalid BLS public key: {0}")]
    InvalidPublicKey(String),
    /// The 96 bytes did not describe a valid G2 point.
    #[error("invalid BLS signature: {0}")]
    InvalidSignature(String),
    /// The signature did not verify for the key and message.
    #[error("BLS signature not valid: {0}")]
    SignatureNotValid(String),
}

/// A BLS Public key is 48 bytes in the scheme used for Dash Core
#[derive(Clone, Copy, Debug, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct BLSPublicKey([u8; 48]);

/// A BLS Signature is 96 bytes in the scheme used for Dash Core
#[derive(Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct BLSSignature([u8; 96]);

impl BLSPublicKey {
    pub fn is_zeroed(&self) -> bool {
        self.0 == [0; 48]
    }

    /// Returns the raw 48 bytes.
    pub fn to_bytes(self) -> [u8; 48] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }
}

impl BLSSignature {
    pub fn is_zeroed(&self) -> bool {
        self.0 == [0; 96]
    }

    /// Returns the raw 96 bytes.
    pub fn to_bytes(self) -> [u8; 96] {
        self.0
    }

    pub fn as_bytes(&self) -> &[u8; 96] {
        &self.0
    }

    /// Verifies this signature over `msg` with the operator key it is
    /// claimed to have been produced by.
    pub fn verify(&self, public_key: &BLSPublicKey, msg: &[u8]) -> Result<(), BlsError> {
        let public_key: blsful::PublicKey<Bls12381G2Impl> = public_key.try_into()?;
        let signature: blsful::Signature<Bls12381G2Impl> = self.try_into()?;
        signature.verify(&public_key, msg).map_err(|e| BlsError::SignatureNotValid(e.to_string()))
    }
}

impl From<[u8; 48]> for BLSPublicKey {
    fn from(data: [u8; 48]) -> Self {
        BLSPublicKey(data)
    }
}

impl From<[u8; 96]> for BLSSignature {
    fn from(data: [u8; 96]) -> Self {
        BLSSignature(data)
    }
}

impl TryFrom<&BLSPublicKey> for blsful::PublicKey<Bls12381G2Impl> {
    type Error = BlsError;

    fn try_from(value: &BLSPublicKey) -> Result<Self, Self::Error> {
        Self::try_from(value.0.as_slice()).map_err(|e| BlsError::InvalidPublicKey(e.to_string()))
    }
}

impl TryFrom<&BLSSignature> for blsful::Signature<Bls12381G2Impl> {
    type Error = BlsError;

    fn try_from(value: &BLSSignature) -> Result<Self, Self::Error> {
        let Some(g2_element) =
            <Bls12381G2Impl as Pairing>::Signature::from_compressed(&value.to_bytes())
                .into_option()
        else {
            // The signature could be given by an invalid source.
            return Err(BlsError::InvalidSignature(hex::encode(value.to_bytes())));
        };

        Ok(blsful::Signature::Basic(g2_element))
    }
}

impl fmt::Display for BLSPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Display for BLSSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl fmt::Debug for BLSSignature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "BLSSignature({})", hex::encode(self.0))
    }
}

macro_rules! impl_elementencode {
    ($element:ident, $len:expr) => {
        impl $crate::consensus::Encodable for $element {
            fn consensus_encode<W: std::io::Write + ?Sized>(
                &self,
                w: &mut W,
            ) -> Result<usize, std::io::Error> {
                self.0.consensus_encode(w)
            }
        }

        impl $crate::consensus::Decodable for $element {
            fn consensus_decode<R: std::io::Read + ?Sized>(
                r: &mut R,
            ) -> Result<Self, $crate::consensus::encode::Error> {
                use $crate::consensus::ReadExt;
                let mut data: [u8; $len] = [0u8; $len];
                r.read_slice(&mut data)?;
                Ok($element(data))
            }
        }
    };
}

impl_elementencode!(BLSPublicKey, 48);
impl_elementencode!(BLSSignature, 96);
