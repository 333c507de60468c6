//! Witness execution for the two program types a simple signature can spend.
//!
//! Only P2WPKH and P2TR key-path spends are executed. They are checked under
//! the same standardness rules a relaying node applies, so strict DER, low-S,
//! compressed segwit keys and NULLFAIL are all enforced.

use alloc::{string::String, string::ToString, vec::Vec};
use core::fmt;

use bitcoin::{
    hashes::{hash160, Hash},
    secp256k1::{ecdsa, schnorr, Message, PublicKey, XOnlyPublicKey},
    sighash::{Annex, Prevouts, SighashCache},
    taproot::{
        TAPROOT_ANNEX_PREFIX, TAPROOT_CONTROL_BASE_SIZE, TAPROOT_CONTROL_MAX_NODE_COUNT,
        TAPROOT_CONTROL_NODE_SIZE,
    },
    EcdsaSighashType, TapSighashType, Transaction, TxIn, TxOut,
};

use crate::SecpCtx;

/// Largest stack element a witness may push.
const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Why the spending input does not satisfy the output it spends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScriptError {
    InputIndexOutOfBounds(usize),
    UnsupportedProgram,
    ScriptSigNotEmpty,
    EmptyWitness,
    WitnessItemCount { expected: usize, actual: usize },
    PushSize(usize),
    EqualVerify,
    SigHashType(u32),
    SigDer(String),
    SigHighS,
    WitnessPubKeyType,
    NullFail,
    EvalFalse,
    SchnorrSigSize(usize),
    SchnorrSigHashType(u8),
    SchnorrSig,
    InvalidOutputKey,
    ControlBlockTooSmall(usize),
    ControlBlockProofSize(usize),
    ControlBlockTooLarge(usize),
    ScriptPathUnsupported,
    Sighash(String),
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::InputIndexOutOfBounds(index) => {
                write!(f, "transaction has no input at index {}", index)
            }
            Self::UnsupportedProgram => write!(f, "unsupported witness program"),
            Self::ScriptSigNotEmpty => {
                write!(f, "native witness program cannot also have a signature script")
            }
            Self::EmptyWitness => write!(f, "witness program empty passed empty witness"),
            Self::WitnessItemCount { expected, actual } => write!(
                f,
                "should have exactly {} items in witness, instead have {}",
                expected, actual
            ),
            Self::PushSize(size) => write!(
                f,
                "element size {} exceeds max allowed size {}",
                size, MAX_SCRIPT_ELEMENT_SIZE
            ),
            Self::EqualVerify => write!(f, "OP_EQUALVERIFY failed"),
            Self::SigHashType(hash_type) => write!(f, "invalid hash type 0x{:x}", hash_type),
            Self::SigDer(e) => write!(f, "malformed signature: {}", e),
            Self::SigHighS => write!(
                f,
                "signature is not canonical due to unnecessarily high S value"
            ),
            Self::WitnessPubKeyType => {
                write!(f, "only compressed keys are accepted post-segwit")
            }
            Self::NullFail => write!(f, "signature not empty on failed checksig"),
            Self::EvalFalse => write!(f, "false stack entry at end of script execution"),
            Self::SchnorrSigSize(size) => write!(f, "invalid schnorr signature length: {}", size),
            Self::SchnorrSigHashType(hash_type) => {
                write!(f, "invalid taproot hash type 0x{:x}", hash_type)
            }
            Self::SchnorrSig => write!(f, "invalid schnorr signature"),
            Self::InvalidOutputKey => write!(f, "taproot output key is not a valid x-only key"),
            Self::ControlBlockTooSmall(size) => write!(
                f,
                "control block too small: {} < {}",
                size, TAPROOT_CONTROL_BASE_SIZE
            ),
            Self::ControlBlockProofSize(size) => write!(
                f,
                "control block proof is not a multiple of {}: {}",
                TAPROOT_CONTROL_NODE_SIZE, size
            ),
            Self::ControlBlockTooLarge(size) => write!(f, "control block is too large: {}", size),
            Self::ScriptPathUnsupported => {
                write!(f, "taproot script path spends are not supported")
            }
            Self::Sighash(e) => write!(f, "could not compute sighash: {}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ScriptError {}

/// Checks that input `input_index` of `tx` validly spends `prevout`.
///
/// `prevout` must be the only output spent by `tx`, which is always the case
/// for a to-sign transaction.
pub fn verify_input(
    prevout: &TxOut,
    tx: &Transaction,
    input_index: usize,
) -> Result<(), ScriptError> {
    let input = tx
        .input
        .get(input_index)
        .ok_or(ScriptError::InputIndexOutOfBounds(input_index))?;

    let script_pubkey = &prevout.script_pubkey;
    if !script_pubkey.is_p2wpkh() && !script_pubkey.is_p2tr() {
        return Err(ScriptError::UnsupportedProgram);
    }
    if !input.script_sig.is_empty() {
        return Err(ScriptError::ScriptSigNotEmpty);
    }

    if script_pubkey.is_p2wpkh() {
        verify_p2wpkh(prevout, tx, input, input_index)
    } else {
        verify_p2tr(prevout, tx, input, input_index)
    }
}

/// Runs `OP_DUP OP_HASH160 <program> OP_EQUALVERIFY OP_CHECKSIG` over the witness.
fn verify_p2wpkh(
    prevout: &TxOut,
    tx: &Transaction,
    input: &TxIn,
    input_index: usize,
) -> Result<(), ScriptError> {
    let witness = &input.witness;
    let (Some(signature), Some(public_key), 2) = (witness.nth(0), witness.nth(1), witness.len())
    else {
        return Err(ScriptError::WitnessItemCount {
            expected: 2,
            actual: witness.len(),
        });
    };

    for item in [signature, public_key] {
        if item.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(ScriptError::PushSize(item.len()));
        }
    }

    let program = &prevout.script_pubkey.as_bytes()[2..];
    if hash160::Hash::hash(public_key).as_byte_array()[..] != *program {
        return Err(ScriptError::EqualVerify);
    }

    let Some((&hash_type, der)) = signature.split_last() else {
        // an empty signature fails the check without tripping NULLFAIL
        check_compressed(public_key)?;
        return Err(ScriptError::EvalFalse);
    };

    let sighash_type = EcdsaSighashType::from_standard(u32::from(hash_type))
        .map_err(|_| ScriptError::SigHashType(u32::from(hash_type)))?;
    let signature =
        ecdsa::Signature::from_der(der).map_err(|e| ScriptError::SigDer(e.to_string()))?;

    let mut normalized = signature;
    normalized.normalize_s();
    if normalized != signature {
        return Err(ScriptError::SigHighS);
    }

    check_compressed(public_key)?;
    let public_key = PublicKey::from_slice(public_key).map_err(|_| ScriptError::NullFail)?;

    let sighash = SighashCache::new(tx)
        .p2wpkh_signature_hash(
            input_index,
            &prevout.script_pubkey,
            prevout.value,
            sighash_type,
        )
        .map_err(|e| ScriptError::Sighash(e.to_string()))?;

    let secp = SecpCtx::new();
    let message = Message::from_digest(sighash.to_byte_array());
    secp.verify_ecdsa(&message, &signature, &public_key)
        .map_err(|_| ScriptError::NullFail)
}

fn check_compressed(public_key: &[u8]) -> Result<(), ScriptError> {
    match public_key {
        [0x02 | 0x03, rest @ ..] if rest.len() == 32 => Ok(()),
        _ => Err(ScriptError::WitnessPubKeyType),
    }
}

fn verify_p2tr(
    prevout: &TxOut,
    tx: &Transaction,
    input: &TxIn,
    input_index: usize,
) -> Result<(), ScriptError> {
    let mut stack: Vec<&[u8]> = input.witness.iter().collect();
    if stack.is_empty() {
        return Err(ScriptError::EmptyWitness);
    }

    let mut annex = None;
    if stack.len() >= 2 {
        if let Some(&last) = stack.last() {
            if last.first() == Some(&TAPROOT_ANNEX_PREFIX) {
                annex = Some(Annex::new(last).map_err(|e| ScriptError::Sighash(e.to_string()))?);
                stack.pop();
            }
        }
    }

    match stack.as_slice() {
        [signature] => verify_key_path(prevout, tx, input_index, signature, annex),
        [.., control_block] => {
            check_control_block(control_block)?;
            Err(ScriptError::ScriptPathUnsupported)
        }
        [] => Err(ScriptError::EmptyWitness),
    }
}

fn verify_key_path(
    prevout: &TxOut,
    tx: &Transaction,
    input_index: usize,
    signature: &[u8],
    annex: Option<Annex>,
) -> Result<(), ScriptError> {
    let (signature, sighash_type) = match signature.len() {
        64 => (signature, TapSighashType::Default),
        65 => {
            let hash_type = signature[64];
            let sighash_type = TapSighashType::from_consensus_u8(hash_type)
                .ok()
                .filter(|ty| *ty != TapSighashType::Default)
                .ok_or(ScriptError::SchnorrSigHashType(hash_type))?;
            (&signature[..64], sighash_type)
        }
        len => return Err(ScriptError::SchnorrSigSize(len)),
    };

    let signature =
        schnorr::Signature::from_slice(signature).map_err(|_| ScriptError::SchnorrSig)?;
    let output_key = XOnlyPublicKey::from_slice(&prevout.script_pubkey.as_bytes()[2..])
        .map_err(|_| ScriptError::InvalidOutputKey)?;

    let prevouts = [prevout];
    let sighash = SighashCache::new(tx)
        .taproot_signature_hash(
            input_index,
            &Prevouts::All(&prevouts),
            annex,
            None,
            sighash_type,
        )
        .map_err(|e| ScriptError::Sighash(e.to_string()))?;

    let secp = SecpCtx::new();
    let message = Message::from_digest(sighash.to_byte_array());
    secp.verify_schnorr(&signature, &message, &output_key)
        .map_err(|_| ScriptError::SchnorrSig)
}

fn check_control_block(control_block: &[u8]) -> Result<(), ScriptError> {
    let size = control_block.len();
    let Some(proof) = size.checked_sub(TAPROOT_CONTROL_BASE_SIZE) else {
        return Err(ScriptError::ControlBlockTooSmall(size));
    };
    if proof % TAPROOT_CONTROL_NODE_SIZE != 0 {
        return Err(ScriptError::ControlBlockProofSize(proof));
    }
    if proof / TAPROOT_CONTROL_NODE_SIZE > TAPROOT_CONTROL_MAX_NODE_COUNT {
        return Err(ScriptError::ControlBlockTooLarge(size));
    }
    Ok(())
}
