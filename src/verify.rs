//! The two verification paths.
//!
//! The legacy path recovers a public key from a compact signature and checks
//! that it derives the claimed address. The BIP-322 path rebuilds the virtual
//! transaction pair and executes the decoded witness against it.

use alloc::string::ToString;

use bitcoin::{sign_message::MessageSignature, PublicKey};
use tracing::{debug, trace};

use crate::{
    decode_simple_signature, interpreter, signed_message_digest, to_sign, to_spend,
    validate_address, AddressKind, CompactSignature, DecodedAddress, Error, SecpCtx,
};

/// Verifies a 65-byte compact signature over `message` against `address`.
pub fn verify_legacy(
    address: &DecodedAddress,
    message: &str,
    signature: &[u8],
) -> Result<(), Error> {
    let signature = CompactSignature::from_slice(signature)?;
    let flag = signature.flag;
    trace!(
        flag = flag.to_u8(),
        family = %flag.family(),
        key_id = flag.key_id(),
        "parsed compact signature"
    );

    let digest = signed_message_digest(message);

    let secp = SecpCtx::new();
    let recovered = MessageSignature::from_slice(&signature.to_recovery_bytes())
        .map_err(|e| Error::PublicKeyRecoveryFailure(e.to_string()))?
        .recover_pubkey(&secp, digest)
        .map_err(|e| Error::PublicKeyRecoveryFailure(e.to_string()))?;

    // Trezor flags are recovered as uncompressed but sign with compressed keys
    if !flag.family().is_trezor() && recovered.compressed != flag.is_compressed() {
        return Err(Error::CompressionMismatch {
            expected_compressed: flag.is_compressed(),
        });
    }

    let public_key = PublicKey {
        compressed: flag.is_compressed(),
        inner: recovered.inner,
    };
    trace!(compressed = public_key.compressed, "recovered public key");

    signature.verify(&public_key.to_bytes(), &digest)?;

    validate_address(flag, &public_key, address)
}

/// Verifies a BIP-322 "simple" signature over `message` against `address`.
pub fn verify_simple(
    address: &DecodedAddress,
    message: &str,
    signature: &[u8],
) -> Result<(), Error> {
    match address.kind() {
        AddressKind::NativeSegwit(_) | AddressKind::Taproot(_) => {}
        kind => return Err(Error::UnsupportedAddressType(kind.name().to_string())),
    }

    let to_spend = to_spend(&address.script_pubkey(), message);
    let witness = decode_simple_signature(signature)?;
    trace!(items = witness.len(), "decoded witness stack");

    let mut to_sign = to_sign(&to_spend);
    to_sign.input[0].witness = witness;

    interpreter::verify_input(&to_spend.output[0], &to_sign, 0).map_err(|e| {
        debug!(error = %e, "script execution failed");
        Error::ScriptExecutionFailed(e.to_string())
    })
}
