//
// Copyright 2025 The Project Oak Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

use core::fmt;

use k256::{
    elliptic_curve::sec1::{FromEncodedPoint, ToEncodedPoint},
    AffinePoint, EncodedPoint,
};

use crate::{address::Address, CryptoError, COMPRESSED_PUBLIC_KEY_LENGTH};

const EVEN_Y_PREFIX: u8 = 0x02;
const ODD_Y_PREFIX: u8 = 0x03;
const UNCOMPRESSED_PREFIX: u8 = 0x04;

/// A SEC1 compressed secp256k1 public key: a parity prefix (`0x02` for even
/// `y`, `0x03` for odd `y`) followed by the 32-byte big-endian x-coordinate.
///
/// Construction only checks the structure. Whether the x-coordinate is on the
/// curve is discovered by [`CompressedPublicKey::decompress`].
#[derive(Clone, Copy, Eq, Hash, PartialEq)]
pub struct CompressedPublicKey([u8; COMPRESSED_PUBLIC_KEY_LENGTH]);

impl CompressedPublicKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; COMPRESSED_PUBLIC_KEY_LENGTH] = bytes
            .try_into()
            .map_err(|_| CryptoError::MalformedPublicKey("expected 33 bytes"))?;
        match bytes[0] {
            EVEN_Y_PREFIX | ODD_Y_PREFIX => Ok(CompressedPublicKey(bytes)),
            _ => Err(CryptoError::MalformedPublicKey("prefix must be 0x02 or 0x03")),
        }
    }

    pub fn as_bytes(&self) -> &[u8; COMPRESSED_PUBLIC_KEY_LENGTH] {
        &self.0
    }

    pub fn x(&self) -> &[u8] {
        &self.0[1..]
    }

    pub fn has_odd_y(&self) -> bool {
        self.0[0] == ODD_Y_PREFIX
    }

    /// Recovers `y` from `y^2 = x^3 + 7 (mod p)`, picking the square root
    /// whose parity matches the prefix.
    pub fn decompress(&self) -> Result<UncompressedPublicKey, CryptoError> {
        let encoded =
            EncodedPoint::from_bytes(self.0).map_err(|_| CryptoError::PointNotOnCurve)?;
        let point: Option<AffinePoint> = AffinePoint::from_encoded_point(&encoded).into();
        let point = point.ok_or(CryptoError::PointNotOnCurve)?;
        UncompressedPublicKey::from_affine(&point)
    }

    pub fn address(&self) -> Result<Address, CryptoError> {
        Ok(Address::from_public_key(&self.decompress()?))
    }
}

impl fmt::Debug for CompressedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CompressedPublicKey(0x{})", hex::encode(self.0))
    }
}

/// The affine coordinates of a secp256k1 point.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct UncompressedPublicKey {
    x: [u8; 32],
    y: [u8; 32],
}

impl UncompressedPublicKey {
    pub(crate) fn from_affine(point: &AffinePoint) -> Result<Self, CryptoError> {
        let encoded = point.to_encoded_point(false);
        match (encoded.x(), encoded.y()) {
            (Some(x), Some(y)) => {
                let mut result = UncompressedPublicKey { x: [0u8; 32], y: [0u8; 32] };
                result.x.copy_from_slice(x);
                result.y.copy_from_slice(y);
                Ok(result)
            }
            // Only the identity point has no coordinates.
            _ => Err(CryptoError::PointNotOnCurve),
        }
    }

    pub fn x(&self) -> &[u8; 32] {
        &self.x
    }

    pub fn y(&self) -> &[u8; 32] {
        &self.y
    }

    /// SEC1 uncompressed encoding: `0x04 || x || y`.
    pub fn to_sec1_bytes(&self) -> [u8; 65] {
        let mut bytes = [0u8; 65];
        bytes[0] = UNCOMPRESSED_PREFIX;
        bytes[1..33].copy_from_slice(&self.x);
        bytes[33..].copy_from_slice(&self.y);
        bytes
    }

    pub fn compress(&self) -> CompressedPublicKey {
        let mut bytes = [0u8; COMPRESSED_PUBLIC_KEY_LENGTH];
        bytes[0] = if self.y[31] & 1 == 1 { ODD_Y_PREFIX } else { EVEN_Y_PREFIX };
        bytes[1..].copy_from_slice(&self.x);
        CompressedPublicKey(bytes)
    }

    pub fn address(&self) -> Address {
        Address::from_public_key(self)
    }
}

/// Parses and decompresses a SEC1 compressed public key in one step.
pub fn decompress_public_key(bytes: &[u8]) -> Result<UncompressedPublicKey, CryptoError> {
    CompressedPublicKey::from_bytes(bytes)?.decompress()
}
