//! Error types for signed message verification.

use alloc::string::String;
use bitcoin::Network;
use core::fmt;

use crate::WalletFamily;

/// Error types for legacy and BIP-322 signed message verification.
///
/// Every failure of a verification call ends up as one of these variants, the
/// caller never sees a panic for malformed input.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The claimed address could not be decoded
    AddressDecodeError(String),
    /// The claimed address belongs to a different network than requested
    NetworkMismatch {
        address: String,
        network: Network,
    },
    /// The signature is not valid base64
    SignatureDecodeError(String),
    /// A compact signature must be exactly 65 bytes
    InvalidSignatureLength(usize),
    /// The leading byte of a compact signature is outside `27..=42`
    InvalidRecoveryFlag(u8),
    /// The recovery flag belongs to a wallet family that cannot produce this address type
    IncompatibleRecoveryFlag {
        address_type: &'static str,
        family: WalletFamily,
    },
    /// `r` is zero or not below the curve order
    RIsZeroOrOverflow,
    /// `s` is zero or not below the curve order
    SIsZeroOrOverflow,
    /// The public key could not be recovered from the signature
    PublicKeyRecoveryFailure(String),
    /// The recovered key compression disagrees with the recovery flag
    CompressionMismatch { expected_compressed: bool },
    /// The provided public key is invalid
    InvalidPublicKey(String),
    /// The ECDSA signature does not verify against the recovered key
    SignatureVerificationFailure,
    /// The address derived from the signature differs from the claimed one
    AddressMismatch { generated: String, expected: String },
    /// The address type cannot be verified by the selected scheme
    UnsupportedAddressType(String),
    /// The simple signature declares more witness items than allowed
    TooManyWitnessItems { count: u64, max: u64 },
    /// A witness item declares more bytes than allowed
    WitnessItemTooLarge { size: u64, max: u64 },
    /// The simple signature ended before all declared bytes were read
    TruncatedInput,
    /// Error encountered when decoding Bitcoin consensus data
    DecodeError(String),
    /// The to-sign transaction does not validly spend the to-spend output
    ScriptExecutionFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::AddressDecodeError(e) => write!(f, "could not decode address: {}", e),
            Self::NetworkMismatch { address, network } => {
                write!(f, "address '{}' is not valid for network {}", address, network)
            }
            Self::SignatureDecodeError(e) => write!(f, "could not decode signature: {}", e),
            Self::InvalidSignatureLength(len) => write!(
                f,
                "wrong signature length: {} instead of {}",
                len,
                crate::COMPACT_SIGNATURE_LENGTH
            ),
            Self::InvalidRecoveryFlag(flag) => write!(f, "invalid recovery flag: {}", flag),
            Self::IncompatibleRecoveryFlag {
                address_type,
                family,
            } => write!(
                f,
                "cannot use {} for recovery flag '{}'",
                address_type, family
            ),
            Self::RIsZeroOrOverflow => write!(f, "signature r is zero or overflows the curve order"),
            Self::SIsZeroOrOverflow => write!(f, "signature s is zero or overflows the curve order"),
            Self::PublicKeyRecoveryFailure(e) => write!(f, "could not recover pubkey: {}", e),
            Self::CompressionMismatch {
                expected_compressed: true,
            } => write!(f, "we expected the key to be compressed, it wasn't"),
            Self::CompressionMismatch {
                expected_compressed: false,
            } => write!(f, "we expected the key to be uncompressed, it wasn't"),
            Self::InvalidPublicKey(e) => write!(f, "Invalid public key {}", e),
            Self::SignatureVerificationFailure => write!(f, "signature could not be verified"),
            Self::AddressMismatch {
                generated,
                expected,
            } => write!(
                f,
                "generated address '{}' does not match expected address '{}'",
                generated, expected
            ),
            Self::UnsupportedAddressType(kind) => write!(f, "unsupported address type '{}'", kind),
            Self::TooManyWitnessItems { count, max } => write!(
                f,
                "too many witness items to fit into max message size [count {}, max {}]",
                count, max
            ),
            Self::WitnessItemTooLarge { size, max } => write!(
                f,
                "script witness item is larger than the max allowed size [count {}, max {}]",
                size, max
            ),
            Self::TruncatedInput => write!(f, "witness data ended before all declared bytes"),
            Self::DecodeError(e) => write!(f, "Consensus decode error - {}", e),
            Self::ScriptExecutionFailed(e) => write!(f, "script execution failed: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
