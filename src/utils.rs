//! Message hashing and the virtual transactions used by both signing schemes.

use alloc::vec::Vec;

use bitcoin::{
    absolute::LockTime,
    consensus::encode::{serialize, VarInt},
    hashes::{sha256, sha256d, Hash, HashEngine},
    opcodes::{all::OP_RETURN, OP_0},
    script::Builder,
    secp256k1::{All, Secp256k1},
    transaction::Version,
    Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid, Witness,
};

/// Prefix of every legacy signed message, the leading byte is the length of the text.
pub const MESSAGE_PREFIX: &[u8] = b"\x18Bitcoin Signed Message:\n";

const TAG: &str = "BIP0322-signed-message";

/// Builds the exact byte string hashed by legacy message signing:
/// `prefix || compact_size(len) || message`.
pub fn magic_message(message: &str) -> Vec<u8> {
    let length = serialize(&VarInt(message.len() as u64));

    let mut buffer = Vec::with_capacity(MESSAGE_PREFIX.len() + length.len() + message.len());
    buffer.extend_from_slice(MESSAGE_PREFIX);
    buffer.extend_from_slice(&length);
    buffer.extend_from_slice(message.as_bytes());
    buffer
}

/// The double SHA-256 digest that legacy signatures commit to.
pub fn signed_message_digest(message: &str) -> sha256d::Hash {
    sha256d::Hash::hash(&magic_message(message))
}

/// Creates a tagged hash of a message according to the BIP322 specification.
///
/// Unlike the legacy scheme, the message is hashed without a length prefix.
pub fn tagged_message_hash(message: &[u8]) -> sha256::Hash {
    let mut engine = sha256::Hash::engine();

    let tag_hash = sha256::Hash::hash(TAG.as_bytes());
    engine.input(&tag_hash[..]);
    engine.input(&tag_hash[..]);
    engine.input(message);

    sha256::Hash::from_engine(engine)
}

/// Constructs the "to_spend" transaction according to the BIP322 specification.
pub fn to_spend(script_pubkey: &ScriptBuf, message: &str) -> Transaction {
    let txid = Txid::from_slice(&[0u8; 32]).expect("Txid slice error");

    let outpoint = OutPoint {
        txid,
        vout: 0xFFFFFFFF,
    };
    let message_hash = tagged_message_hash(message.as_bytes());
    let script_sig = Builder::new()
        .push_opcode(OP_0)
        .push_slice(message_hash.to_byte_array())
        .into_script();

    Transaction {
        version: Version(0),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: outpoint,
            script_sig,
            sequence: Sequence::ZERO,
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(0),
            script_pubkey: script_pubkey.clone(),
        }],
    }
}

/// Constructs the "to_sign" transaction spending the single output of `to_spend`.
///
/// The witness is left empty, the caller attaches the one under test. The
/// output is `OP_RETURN` so the transaction can never be relayed.
pub fn to_sign(to_spend: &Transaction) -> Transaction {
    let outpoint = OutPoint {
        txid: to_spend.compute_txid(),
        vout: 0x00,
    };
    let script_pubkey = Builder::new().push_opcode(OP_RETURN).into_script();

    Transaction {
        version: Version(0),
        lock_time: LockTime::ZERO,
        input: vec![TxIn {
            previous_output: outpoint,
            sequence: Sequence::ZERO,
            script_sig: ScriptBuf::new(),
            witness: Witness::new(),
        }],
        output: vec![TxOut {
            value: Amount::from_sat(0),
            script_pubkey,
        }],
    }
}

pub(crate) type SecpCtx = Secp256k1<All>;
