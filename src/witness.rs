//! Decoding of BIP-322 "simple" signatures.
//!
//! A simple signature is a consensus encoded witness stack: a compact size
//! item count followed by each item as a compact size length and its bytes.

use alloc::{string::ToString, vec::Vec};

use bitcoin::{
    consensus::encode::{self, deserialize_partial, VarInt},
    Witness,
};

use crate::Error;

/// Upper bound on the number of witness items, keeps the weight under the consensus limit.
pub const MAX_WITNESS_ITEMS: u64 = 4_000_000;
/// Upper bound on a single witness item.
pub const MAX_WITNESS_ITEM_SIZE: u64 = 4_000_000;

/// Decodes a simple signature into a witness stack.
///
/// Both bounds are checked before anything is allocated. Bytes left over after
/// the last declared item are ignored.
pub fn decode_simple_signature(signature: &[u8]) -> Result<Witness, Error> {
    let mut cursor = 0;

    let count = read_compact_size(signature, &mut cursor)?;
    if count > MAX_WITNESS_ITEMS {
        return Err(Error::TooManyWitnessItems {
            count,
            max: MAX_WITNESS_ITEMS,
        });
    }

    let mut items = Vec::new();
    for _ in 0..count {
        let size = read_compact_size(signature, &mut cursor)?;
        if size > MAX_WITNESS_ITEM_SIZE {
            return Err(Error::WitnessItemTooLarge {
                size,
                max: MAX_WITNESS_ITEM_SIZE,
            });
        }

        let end = cursor
            .checked_add(size as usize)
            .filter(|end| *end <= signature.len())
            .ok_or(Error::TruncatedInput)?;
        items.push(signature[cursor..end].to_vec());
        cursor = end;
    }

    Ok(Witness::from_slice(&items))
}

fn read_compact_size(data: &[u8], cursor: &mut usize) -> Result<u64, Error> {
    match deserialize_partial::<VarInt>(&data[*cursor..]) {
        Ok((VarInt(value), consumed)) => {
            *cursor += consumed;
            Ok(value)
        }
        Err(encode::Error::Io(_)) => Err(Error::TruncatedInput),
        Err(e) => Err(Error::DecodeError(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use bitcoin::base64::{engine::general_purpose, Engine};
    use bitcoin::consensus::serialize;
    use hex_literal::hex;

    use super::*;

    #[test]
    fn test_decode_simple_signature() {
        let signature = general_purpose::STANDARD
            .decode("AkcwRAIgbAFRpM0rhdBlXr7qe5eEf3XgSeausCm2XTmZVxSYpcsCIDcbR87wF9DTrvdw1czYEEzOjso52dOSaw8VrC4GgzFRASECO5NGNFlPClJnTHNDW94h7pPL5D7xbl6FBNTrGaYpYcA=")
            .unwrap();

        let witness = decode_simple_signature(&signature).unwrap();

        assert_eq!(witness.len(), 2);
        assert_eq!(
            witness.nth(0).unwrap(),
            hex!("304402206c0151a4cd2b85d0655ebeea7b97847f75e049e6aeb029b65d3999571498a5cb0220371b47cef017d0d3aef770d5ccd8104cce8eca39d9d3926b0f15ac2e0683315101")
        );
        assert_eq!(
            witness.nth(1).unwrap(),
            hex!("023b934634594f0a52674c73435bde21ee93cbe43ef16e5e8504d4eb19a62961c0")
        );
        assert_eq!(serialize(&witness), signature);
    }

    #[test]
    fn test_decode_empty_stack() {
        let witness = decode_simple_signature(&[0x00]).unwrap();
        assert!(witness.is_empty());
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let witness = decode_simple_signature(&[0x01, 0x02, 0xAA, 0xBB, 0xCC]).unwrap();

        assert_eq!(witness.len(), 1);
        assert_eq!(witness.nth(0).unwrap(), [0xAA, 0xBB]);
    }

    #[test]
    fn test_too_many_items() {
        // 0xFE prefix, 4_000_001 little endian
        assert_eq!(
            decode_simple_signature(&hex!("fe01093d00")),
            Err(Error::TooManyWitnessItems {
                count: 4_000_001,
                max: MAX_WITNESS_ITEMS,
            })
        );
    }

    #[test]
    fn test_item_too_large() {
        assert_eq!(
            decode_simple_signature(&hex!("01fe01093d00")),
            Err(Error::WitnessItemTooLarge {
                size: 4_000_001,
                max: MAX_WITNESS_ITEM_SIZE,
            })
        );
    }

    #[test]
    fn test_truncated() {
        assert_eq!(decode_simple_signature(&[]), Err(Error::TruncatedInput));
        assert_eq!(
            decode_simple_signature(&[0x02, 0x01, 0xAA]),
            Err(Error::TruncatedInput)
        );
        assert_eq!(
            decode_simple_signature(&[0x01, 0x05, 0xAA, 0xBB]),
            Err(Error::TruncatedInput)
        );
        assert_eq!(decode_simple_signature(&[0xFD, 0x01]), Err(Error::TruncatedInput));
    }
}
