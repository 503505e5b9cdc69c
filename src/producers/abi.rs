//! Minimal ABI encoding for the handful of view calls the producers make.
//!
//! Only static 32-byte words and the dynamic `string` return type are
//! supported.

use crate::producers::ProducerError;
use alloy_primitives::{keccak256, Address, U256};

const WORD: usize = 32;

/// 4-byte function selector of a canonical signature, e.g. `"decimals()"`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Calldata for `signature` with the given static word arguments.
pub fn call_data(signature: &str, args: &[U256]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * WORD);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(&arg.to_be_bytes::<WORD>());
    }
    data
}

/// The `index`-th 32-byte word of return data.
pub fn word(data: &[u8], index: usize) -> Result<U256, ProducerError> {
    let start = index * WORD;
    data.get(start..start + WORD)
        .map(U256::from_be_slice)
        .ok_or_else(|| {
            ProducerError::Decode(format!(
                "expected at least {} bytes of return data, got {}",
                start + WORD,
                data.len()
            ))
        })
}

fn word_to_usize(value: U256) -> Result<usize, ProducerError> {
    usize::try_from(value).map_err(|_| ProducerError::Decode("offset out of range".to_string()))
}

/// Decode a `uint8`-sized word.
pub fn decode_u8(data: &[u8], index: usize) -> Result<u8, ProducerError> {
    let value = word(data, index)?;
    u8::try_from(value).map_err(|_| ProducerError::Decode(format!("{} does not fit in u8", value)))
}

/// Decode a `bool` word.
pub fn decode_bool(data: &[u8], index: usize) -> Result<bool, ProducerError> {
    Ok(!word(data, index)?.is_zero())
}

/// Decode an `address` word.
pub fn decode_address(data: &[u8], index: usize) -> Result<Address, ProducerError> {
    let bytes = word(data, index)?.to_be_bytes::<WORD>();
    Ok(Address::from_slice(&bytes[12..]))
}

/// Whether a two's-complement `int256` word is negative.
pub fn is_negative(value: U256) -> bool {
    value.bit(255)
}

/// Decode a dynamic `string` return value.
///
/// Some older tokens return `bytes32` for `name()`/`symbol()`; a bare
/// 32-byte payload is read that way with trailing NULs stripped.
pub fn decode_string(data: &[u8]) -> Result<String, ProducerError> {
    if data.len() == WORD {
        let trimmed: Vec<u8> = data.iter().copied().take_while(|b| *b != 0).collect();
        return Ok(String::from_utf8_lossy(&trimmed).into_owned());
    }

    let past_offset = || ProducerError::Decode("string offset past end of data".to_string());
    let past_length = || ProducerError::Decode("string length past end of data".to_string());

    let offset = word_to_usize(word(data, 0)?)?;
    let start = offset.checked_add(WORD).ok_or_else(past_offset)?;
    let length_bytes = data.get(offset..start).ok_or_else(past_offset)?;
    let length = word_to_usize(U256::from_be_slice(length_bytes))?;
    let end = start.checked_add(length).ok_or_else(past_length)?;
    let bytes = data.get(start..end).ok_or_else(past_length)?;

    Ok(String::from_utf8_lossy(bytes).into_owned())
}

/// Lossy conversion of an unsigned word to `f64`.
pub fn u256_to_f64(value: U256) -> f64 {
    value.to_string().parse().unwrap_or(0.0)
}
