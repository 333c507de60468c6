//! Entry points: scheme selection and the whitespace retry.

use alloc::{
    string::{String, ToString},
    vec::Vec,
};

use bitcoin::{
    base64::{engine::general_purpose, Engine},
    Network,
};
use tracing::{debug, trace};

use crate::{
    verify_legacy, verify_simple, AddressKind, DecodedAddress, Error, COMPACT_SIGNATURE_LENGTH,
};

/// An address, a message and a base64 encoded signature claimed to link them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedMessage {
    pub address: String,
    pub message: String,
    pub signature: String,
}

impl SignedMessage {
    pub fn new(
        address: impl Into<String>,
        message: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            address: address.into(),
            message: message.into(),
            signature: signature.into(),
        }
    }
}

/// Verifies signed messages for one network.
///
/// Legacy (P2PKH) addresses and signatures of exactly 65 bytes are checked as
/// compact recoverable signatures, everything else as a BIP-322 simple
/// signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Verifier {
    network: Network,
}

impl Default for Verifier {
    fn default() -> Self {
        Self::new(Network::Bitcoin)
    }
}

impl Verifier {
    pub fn new(network: Network) -> Self {
        Self { network }
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Returns `Ok(true)` when the signature is valid, any failure is an `Err`.
    ///
    /// Some wallets trim the message before signing. When the message has
    /// surrounding whitespace the trimmed message is tried first, and only a
    /// success from that attempt is reported.
    pub fn verify(&self, signed: &SignedMessage) -> Result<bool, Error> {
        let trimmed = signed.message.trim();
        if trimmed.len() != signed.message.len() {
            let retry = SignedMessage {
                message: trimmed.to_string(),
                ..signed.clone()
            };
            match self.verify(&retry) {
                Ok(true) => return Ok(true),
                result => trace!(?result, "trimmed message did not verify"),
            }
        }

        let address = DecodedAddress::decode(&signed.address, self.network)?;
        let signature = decode_signature(&signed.signature)?;

        if matches!(address.kind(), AddressKind::Legacy(_))
            || signature.len() == COMPACT_SIGNATURE_LENGTH
        {
            debug!(address = %signed.address, "verifying legacy signature");
            verify_legacy(&address, &signed.message, &signature)?;
        } else {
            debug!(address = %signed.address, "verifying BIP-322 simple signature");
            verify_simple(&address, &signed.message, &signature)?;
        }

        Ok(true)
    }
}

// Line breaks are tolerated, base64 is commonly wrapped when copied around.
fn decode_signature(signature: &str) -> Result<Vec<u8>, Error> {
    let compact: String = signature
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .collect();

    general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| Error::SignatureDecodeError(e.to_string()))
}

/// Verifies `signed` against Bitcoin mainnet.
pub fn verify(signed: &SignedMessage) -> Result<bool, Error> {
    Verifier::default().verify(signed)
}

pub fn verify_with_network(signed: &SignedMessage, network: Network) -> Result<bool, Error> {
    Verifier::new(network).verify(signed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_mainnet() {
        assert_eq!(Verifier::default().network(), Network::Bitcoin);
    }

    #[test]
    fn test_decode_signature_ignores_line_breaks() {
        assert_eq!(decode_signature("aGVs\r\nbG8=\n").unwrap(), b"hello");
        assert!(matches!(
            decode_signature("not base64!"),
            Err(Error::SignatureDecodeError(_))
        ));
    }

    #[test]
    fn test_trim_retry() {
        let signed = SignedMessage::new(
            "1CPBDkm8ER3o7r2HANcvNoVHsBYKcUHTp9",
            "   Three spaces both sides   ",
            "H0X6iDaOzAVqUndwAl8Ca1k8T+zbzDpfrEaXbh/FlF08bDsquG5oPnnFIfWU/8Z46jfFUwlWLfDK1iRU/DHZ6n8=",
        );

        assert_eq!(verify(&signed), Ok(true));
    }

    #[test]
    fn test_failed_retry_reports_untrimmed_error() {
        let signed = SignedMessage::new("INVALID", "  padded  ", "AAAA");

        assert!(matches!(verify(&signed), Err(Error::AddressDecodeError(_))));
    }
}
