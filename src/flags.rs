//! Recovery flag classification for compact message signatures.
//!
//! The leading byte of a 65-byte compact signature packs three facts: whether
//! the signing key was compressed, which wallet convention produced the
//! signature, and the two-bit EC recovery id. The ranges follow BIP-137 and the
//! conventions Electrum and Trezor use on top of it.

use core::{fmt, ops::RangeInclusive};

use crate::Error;

/// Plain BIP-137 flags, uncompressed key.
pub const STANDARD_FLAGS: RangeInclusive<u8> = 27..=30;
/// Compressed key flags, also used by Electrum for segwit addresses.
pub const ELECTRUM_P2WPKH_FLAGS: RangeInclusive<u8> = 31..=34;
/// Trezor flags for nested segwit (P2SH-P2WPKH) addresses.
pub const TREZOR_P2SH_P2WPKH_FLAGS: RangeInclusive<u8> = 35..=38;
/// Trezor flags for native segwit (P2WPKH) addresses.
pub const TREZOR_P2WPKH_FLAGS: RangeInclusive<u8> = 39..=42;

const FIRST_FLAG: u8 = 27;
const LAST_FLAG: u8 = 42;

/// The wallet convention a recovery flag belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum WalletFamily {
    /// BIP-137 with an uncompressed key.
    Standard,
    /// BIP-137 with a compressed key, Electrum signs segwit addresses with these too.
    ElectrumP2wpkh,
    /// Trezor signing for a nested segwit address.
    TrezorP2shP2wpkh,
    /// Trezor signing for a native segwit address.
    TrezorP2wpkh,
}

impl WalletFamily {
    pub fn is_trezor(&self) -> bool {
        matches!(self, Self::TrezorP2shP2wpkh | Self::TrezorP2wpkh)
    }
}

impl fmt::Display for WalletFamily {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Standard => write!(f, "P2PKH uncompressed"),
            Self::ElectrumP2wpkh => write!(f, "P2PKH compressed"),
            Self::TrezorP2shP2wpkh => write!(f, "BIP137 (Trezor) P2SH-P2WPKH"),
            Self::TrezorP2wpkh => write!(f, "BIP137 (Trezor) P2WPKH"),
        }
    }
}

/// A validated recovery flag in `27..=42`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RecoveryFlag(u8);

impl RecoveryFlag {
    /// Validates the raw byte, rejecting anything outside the defined ranges.
    pub fn new(flag: u8) -> Result<Self, Error> {
        if Self::is_valid(flag) {
            Ok(Self(flag))
        } else {
            Err(Error::InvalidRecoveryFlag(flag))
        }
    }

    pub fn is_valid(flag: u8) -> bool {
        (FIRST_FLAG..=LAST_FLAG).contains(&flag)
    }

    pub fn to_u8(self) -> u8 {
        self.0
    }

    /// Every flag from 31 upwards signals a compressed key.
    pub fn is_compressed(&self) -> bool {
        self.0 >= *ELECTRUM_P2WPKH_FLAGS.start()
    }

    /// The EC recovery id, `0..=3`.
    pub fn key_id(&self) -> u8 {
        (self.0 - FIRST_FLAG) & 0b11
    }

    pub fn family(&self) -> WalletFamily {
        match self.0 {
            f if STANDARD_FLAGS.contains(&f) => WalletFamily::Standard,
            f if ELECTRUM_P2WPKH_FLAGS.contains(&f) => WalletFamily::ElectrumP2wpkh,
            f if TREZOR_P2SH_P2WPKH_FLAGS.contains(&f) => WalletFamily::TrezorP2shP2wpkh,
            _ => WalletFamily::TrezorP2wpkh,
        }
    }

    /// The flag handed to public key recovery.
    ///
    /// Trezor flags are folded back to the plain `27 + key_id` form, every
    /// other flag is returned as is.
    pub fn normalized(&self) -> u8 {
        if self.family().is_trezor() {
            FIRST_FLAG + self.key_id()
        } else {
            self.0
        }
    }
}

impl TryFrom<u8> for RecoveryFlag {
    type Error = Error;

    fn try_from(flag: u8) -> Result<Self, Self::Error> {
        Self::new(flag)
    }
}
