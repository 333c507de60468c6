//! Parsing and checking of 65-byte compact message signatures.

use alloc::string::ToString;

use bitcoin::{
    hashes::{sha256d, Hash},
    secp256k1::{constants::CURVE_ORDER, ecdsa::Signature, Message, PublicKey},
};

use crate::{Error, RecoveryFlag, SecpCtx};

/// All compact signatures are `flag || r || s`.
pub const COMPACT_SIGNATURE_LENGTH: usize = 65;

/// A compact ECDSA signature with its recovery flag.
///
/// `r` and `s` are big-endian and both guaranteed to lie in `[1, n - 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompactSignature {
    pub flag: RecoveryFlag,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl CompactSignature {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.len() != COMPACT_SIGNATURE_LENGTH {
            return Err(Error::InvalidSignatureLength(bytes.len()));
        }

        let flag = RecoveryFlag::new(bytes[0])?;

        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[1..33]);
        s.copy_from_slice(&bytes[33..65]);

        if !in_scalar_range(&r) {
            return Err(Error::RIsZeroOrOverflow);
        }
        if !in_scalar_range(&s) {
            return Err(Error::SIsZeroOrOverflow);
        }

        Ok(Self { flag, r, s })
    }

    pub fn to_bytes(&self) -> [u8; COMPACT_SIGNATURE_LENGTH] {
        self.serialize_with_flag(self.flag.to_u8())
    }

    /// Serializes with the normalized flag, see [`RecoveryFlag::normalized`].
    pub fn to_recovery_bytes(&self) -> [u8; COMPACT_SIGNATURE_LENGTH] {
        self.serialize_with_flag(self.flag.normalized())
    }

    /// Verifies `(r, s)` over `digest` against a serialized public key.
    ///
    /// High-S signatures are accepted, message signing never enforced low-S.
    pub fn verify(&self, public_key: &[u8], digest: &sha256d::Hash) -> Result<(), Error> {
        let secp = SecpCtx::new();

        let public_key =
            PublicKey::from_slice(public_key).map_err(|e| Error::InvalidPublicKey(e.to_string()))?;

        let mut compact = [0u8; 64];
        compact[..32].copy_from_slice(&self.r);
        compact[32..].copy_from_slice(&self.s);
        let mut signature =
            Signature::from_compact(&compact).map_err(|_| Error::SignatureVerificationFailure)?;
        signature.normalize_s();

        let message = Message::from_digest(digest.to_byte_array());

        secp.verify_ecdsa(&message, &signature, &public_key)
            .map_err(|_| Error::SignatureVerificationFailure)
    }

    fn serialize_with_flag(&self, flag: u8) -> [u8; COMPACT_SIGNATURE_LENGTH] {
        let mut bytes = [0u8; COMPACT_SIGNATURE_LENGTH];
        bytes[0] = flag;
        bytes[1..33].copy_from_slice(&self.r);
        bytes[33..].copy_from_slice(&self.s);
        bytes
    }
}

// Big-endian byte arrays compare like the integers they encode.
fn in_scalar_range(scalar: &[u8; 32]) -> bool {
    scalar != &[0u8; 32] && scalar < &CURVE_ORDER
}
