//! Address decoding and the per-family checks of the legacy scheme.
//!
//! A legacy signature only carries a public key, so each validator re-derives
//! the address the key would produce for the claimed family and compares it to
//! the claimed address.

use alloc::string::ToString;
use core::str::FromStr;

use bitcoin::{
    hashes::Hash, opcodes::OP_0, script::Builder, Address, Network, PubkeyHash, PublicKey,
    ScriptBuf, ScriptHash, WPubkeyHash, WitnessProgram, WitnessVersion, XOnlyPublicKey,
};

use crate::{Error, RecoveryFlag, SecpCtx, WalletFamily};

/// The address families a signed message can be checked against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AddressKind {
    /// P2PKH
    Legacy(PubkeyHash),
    /// P2SH, assumed to wrap a P2WPKH program
    NestedSegwit(ScriptHash),
    /// P2WPKH
    NativeSegwit(WPubkeyHash),
    /// P2TR, carrying the tweaked output key
    Taproot(XOnlyPublicKey),
    /// Anything else, e.g. P2WSH or future witness versions
    Unsupported(&'static str),
}

impl AddressKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Legacy(_) => "P2PKH",
            Self::NestedSegwit(_) => "P2SH",
            Self::NativeSegwit(_) => "P2WPKH",
            Self::Taproot(_) => "P2TR",
            Self::Unsupported(name) => name,
        }
    }
}

/// An address decoded for, and checked against, a specific network.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedAddress {
    address: Address,
    kind: AddressKind,
    network: Network,
}

impl DecodedAddress {
    pub fn decode(address: &str, network: Network) -> Result<Self, Error> {
        let unchecked =
            Address::from_str(address).map_err(|e| Error::AddressDecodeError(e.to_string()))?;

        if !unchecked.is_valid_for_network(network) {
            return Err(Error::NetworkMismatch {
                address: address.to_string(),
                network,
            });
        }

        let address = unchecked.assume_checked();
        let kind = classify(&address)?;

        Ok(Self {
            address,
            kind,
            network,
        })
    }

    pub fn kind(&self) -> &AddressKind {
        &self.kind
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn script_pubkey(&self) -> ScriptBuf {
        self.address.script_pubkey()
    }
}

fn classify(address: &Address) -> Result<AddressKind, Error> {
    if let Some(pubkey_hash) = address.pubkey_hash() {
        return Ok(AddressKind::Legacy(pubkey_hash));
    }
    if let Some(script_hash) = address.script_hash() {
        return Ok(AddressKind::NestedSegwit(script_hash));
    }

    let Some(program) = address.witness_program() else {
        return Ok(AddressKind::Unsupported("unknown"));
    };
    let bytes = program.program().as_bytes();

    if program.is_p2wpkh() {
        let hash = <[u8; 20]>::try_from(bytes)
            .map_err(|_| Error::AddressDecodeError("invalid witness program".to_string()))?;
        Ok(AddressKind::NativeSegwit(WPubkeyHash::from_byte_array(hash)))
    } else if program.is_p2tr() {
        let output_key = XOnlyPublicKey::from_slice(bytes)
            .map_err(|e| Error::AddressDecodeError(e.to_string()))?;
        Ok(AddressKind::Taproot(output_key))
    } else if program.is_p2wsh() {
        Ok(AddressKind::Unsupported("P2WSH"))
    } else {
        Ok(AddressKind::Unsupported("witness program"))
    }
}

/// Dispatches to the validator matching the claimed address family.
pub fn validate_address(
    flag: RecoveryFlag,
    public_key: &PublicKey,
    claimed: &DecodedAddress,
) -> Result<(), Error> {
    let pubkey_hash = public_key.pubkey_hash();

    match claimed.kind() {
        AddressKind::Legacy(_) => validate_p2pkh(flag, &pubkey_hash, claimed),
        AddressKind::NestedSegwit(_) => validate_p2sh(flag, &pubkey_hash, claimed),
        AddressKind::NativeSegwit(_) => validate_p2wpkh(flag, &pubkey_hash, claimed),
        AddressKind::Taproot(_) => validate_p2tr(flag, public_key, claimed),
        AddressKind::Unsupported(name) => Err(Error::UnsupportedAddressType(name.to_string())),
    }
}

pub fn validate_p2pkh(
    flag: RecoveryFlag,
    pubkey_hash: &PubkeyHash,
    claimed: &DecodedAddress,
) -> Result<(), Error> {
    reject_families(
        flag,
        "P2PKH",
        &[WalletFamily::TrezorP2shP2wpkh, WalletFamily::TrezorP2wpkh],
    )?;

    let generated = Address::p2pkh(*pubkey_hash, claimed.network());
    compare(&generated, claimed)
}

/// Nested segwit, the redeem script is the P2WPKH program `OP_0 <hash>`.
pub fn validate_p2sh(
    flag: RecoveryFlag,
    pubkey_hash: &PubkeyHash,
    claimed: &DecodedAddress,
) -> Result<(), Error> {
    reject_families(
        flag,
        "P2SH",
        &[WalletFamily::Standard, WalletFamily::TrezorP2wpkh],
    )?;

    let redeem_script = Builder::new()
        .push_opcode(OP_0)
        .push_slice(pubkey_hash.to_byte_array())
        .into_script();
    let generated = Address::p2sh(&redeem_script, claimed.network())
        .map_err(|e| Error::AddressDecodeError(e.to_string()))?;
    compare(&generated, claimed)
}

pub fn validate_p2wpkh(
    flag: RecoveryFlag,
    pubkey_hash: &PubkeyHash,
    claimed: &DecodedAddress,
) -> Result<(), Error> {
    // segwit only commits to compressed keys
    reject_families(flag, "P2WPKH", &[WalletFamily::Standard])?;

    let program = WitnessProgram::new(WitnessVersion::V0, &pubkey_hash.to_byte_array())
        .map_err(|e| Error::AddressDecodeError(e.to_string()))?;
    let generated = Address::from_witness_program(program, claimed.network());
    compare(&generated, claimed)
}

/// Only key-path taproot addresses can match: the recovered key is used as the
/// internal key and tweaked without a script tree, so an output key committing
/// to scripts never equals the generated one.
pub fn validate_p2tr(
    flag: RecoveryFlag,
    public_key: &PublicKey,
    claimed: &DecodedAddress,
) -> Result<(), Error> {
    reject_families(
        flag,
        "P2TR",
        &[WalletFamily::TrezorP2shP2wpkh, WalletFamily::TrezorP2wpkh],
    )?;

    let secp = SecpCtx::new();
    let (internal_key, _parity) = public_key.inner.x_only_public_key();
    let internal_key = XOnlyPublicKey::from_slice(&internal_key.serialize())
        .map_err(|e| Error::InvalidPublicKey(e.to_string()))?;

    let generated = Address::p2tr(&secp, internal_key, None, claimed.network());
    compare(&generated, claimed)
}

fn reject_families(
    flag: RecoveryFlag,
    address_type: &'static str,
    rejected: &[WalletFamily],
) -> Result<(), Error> {
    let family = flag.family();
    if rejected.contains(&family) {
        return Err(Error::IncompatibleRecoveryFlag {
            address_type,
            family,
        });
    }
    Ok(())
}

fn compare(generated: &Address, claimed: &DecodedAddress) -> Result<(), Error> {
    if generated == claimed.address() {
        Ok(())
    } else {
        Err(Error::AddressMismatch {
            generated: generated.to_string(),
            expected: claimed.address().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::secp256k1;

    use super::*;

    // public key behind 14dD6ygPi5WXdwwBTt1FBZK3aD8uDem1FY / 1HUBHMij46Hae75JPdWjeZ5Q7KaL7EFRSD
    const COMPRESSED_KEY: [u8; 33] = [
        3, 77, 160, 6, 249, 88, 190, 186, 120, 236, 84, 68, 61, 244, 163, 245, 34, 55, 37, 63, 122,
        232, 203, 219, 23, 220, 207, 63, 234, 165, 127, 49, 38,
    ];

    fn flag(value: u8) -> RecoveryFlag {
        RecoveryFlag::new(value).unwrap()
    }

    fn key(compressed: bool) -> PublicKey {
        PublicKey {
            compressed,
            inner: secp256k1::PublicKey::from_slice(&COMPRESSED_KEY).unwrap(),
        }
    }

    fn mainnet(address: &str) -> DecodedAddress {
        DecodedAddress::decode(address, Network::Bitcoin).unwrap()
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            mainnet("1DAag8qiPLHh6hMFVu9qJQm9ro1HtwuyK5").kind(),
            AddressKind::Legacy(_)
        ));
        assert!(matches!(
            mainnet("3L6TyTisPBmrDAj6RoKmDzNnj4eQi54gD2").kind(),
            AddressKind::NestedSegwit(_)
        ));
        assert!(matches!(
            mainnet("bc1q9vza2e8x573nczrlzms0wvx3gsqjx7vavgkx0l").kind(),
            AddressKind::NativeSegwit(_)
        ));
        assert!(matches!(
            mainnet("bc1ppv609nr0vr25u07u95waq5lucwfm6tde4nydujnu8npg4q75mr5sxq8lt3").kind(),
            AddressKind::Taproot(_)
        ));
        assert_eq!(
            mainnet("bc1qeklep85ntjz4605drds6aww9u0qr46qzrv5xswd35uhjuj8ahfcqgf6hak").kind(),
            &AddressKind::Unsupported("P2WSH")
        );
    }

    #[test]
    fn test_decode_errors() {
        assert!(matches!(
            DecodedAddress::decode("INVALID", Network::Bitcoin),
            Err(Error::AddressDecodeError(_))
        ));
        assert!(matches!(
            DecodedAddress::decode("17u1mDkgNcDwi44braeTKpvnfNnTrgvBfB", Network::Bitcoin),
            Err(Error::AddressDecodeError(_))
        ));
        assert!(matches!(
            DecodedAddress::decode("tb1qr97cuq4kvq7plfetmxnl6kls46xaka78n2288z", Network::Bitcoin),
            Err(Error::NetworkMismatch { .. })
        ));
        assert!(DecodedAddress::decode(
            "tb1qr97cuq4kvq7plfetmxnl6kls46xaka78n2288z",
            Network::Testnet
        )
        .is_ok());
    }

    #[test]
    fn test_validate_p2pkh() {
        let compressed = key(true);
        let uncompressed = key(false);

        assert!(validate_address(
            flag(31),
            &compressed,
            &mainnet("14dD6ygPi5WXdwwBTt1FBZK3aD8uDem1FY")
        )
        .is_ok());
        assert!(validate_address(
            flag(27),
            &uncompressed,
            &mainnet("1HUBHMij46Hae75JPdWjeZ5Q7KaL7EFRSD")
        )
        .is_ok());
        assert_eq!(
            validate_address(
                flag(31),
                &compressed,
                &mainnet("1HUBHMij46Hae75JPdWjeZ5Q7KaL7EFRSD")
            ),
            Err(Error::AddressMismatch {
                generated: "14dD6ygPi5WXdwwBTt1FBZK3aD8uDem1FY".to_string(),
                expected: "1HUBHMij46Hae75JPdWjeZ5Q7KaL7EFRSD".to_string(),
            })
        );
    }

    #[test]
    fn test_flag_incompatibility() {
        let compressed = key(true);
        let legacy = mainnet("14dD6ygPi5WXdwwBTt1FBZK3aD8uDem1FY");

        assert_eq!(
            validate_p2pkh(flag(35), &compressed.pubkey_hash(), &legacy),
            Err(Error::IncompatibleRecoveryFlag {
                address_type: "P2PKH",
                family: WalletFamily::TrezorP2shP2wpkh,
            })
        );
        assert_eq!(
            validate_p2pkh(flag(39), &compressed.pubkey_hash(), &legacy)
                .unwrap_err()
                .to_string(),
            "cannot use P2PKH for recovery flag 'BIP137 (Trezor) P2WPKH'"
        );

        let nested = mainnet("3L6TyTisPBmrDAj6RoKmDzNnj4eQi54gD2");
        assert_eq!(
            validate_p2sh(flag(28), &compressed.pubkey_hash(), &nested)
                .unwrap_err()
                .to_string(),
            "cannot use P2SH for recovery flag 'P2PKH uncompressed'"
        );
        assert!(matches!(
            validate_p2sh(flag(40), &compressed.pubkey_hash(), &nested),
            Err(Error::IncompatibleRecoveryFlag { .. })
        ));

        let native = mainnet("bc1q9vza2e8x573nczrlzms0wvx3gsqjx7vavgkx0l");
        assert_eq!(
            validate_p2wpkh(flag(27), &compressed.pubkey_hash(), &native)
                .unwrap_err()
                .to_string(),
            "cannot use P2WPKH for recovery flag 'P2PKH uncompressed'"
        );

        let taproot = mainnet("bc1ppv609nr0vr25u07u95waq5lucwfm6tde4nydujnu8npg4q75mr5sxq8lt3");
        assert!(matches!(
            validate_p2tr(flag(38), &compressed, &taproot),
            Err(Error::IncompatibleRecoveryFlag { .. })
        ));
    }

    #[test]
    fn test_unsupported_dispatch() {
        let p2wsh = mainnet("bc1qeklep85ntjz4605drds6aww9u0qr46qzrv5xswd35uhjuj8ahfcqgf6hak");

        assert_eq!(
            validate_address(flag(31), &key(true), &p2wsh),
            Err(Error::UnsupportedAddressType("P2WSH".to_string()))
        );
    }

    #[test]
    fn test_generated_segwit_addresses_round_trip() {
        let compressed = key(true);
        let hash = compressed.pubkey_hash();

        let native = Address::from_witness_program(
            WitnessProgram::new(WitnessVersion::V0, &hash.to_byte_array()).unwrap(),
            Network::Bitcoin,
        );
        assert!(validate_p2wpkh(flag(31), &hash, &mainnet(&native.to_string())).is_ok());

        let nested = Address::p2sh(
            &ScriptBuf::new_p2wpkh(&WPubkeyHash::from_byte_array(hash.to_byte_array())),
            Network::Bitcoin,
        )
        .unwrap();
        assert!(validate_p2sh(flag(35), &hash, &mainnet(&nested.to_string())).is_ok());

        let secp = SecpCtx::new();
        let taproot = Address::p2tr(
            &secp,
            compressed.inner.x_only_public_key().0,
            None,
            Network::Bitcoin,
        );
        assert!(validate_p2tr(flag(27), &compressed, &mainnet(&taproot.to_string())).is_ok());
    }
}
