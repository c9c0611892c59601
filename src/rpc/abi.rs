//! Minimal ABI encoding for constructor arguments.
//!
//! Only static 32-byte types are supported, which covers address-threading plans:
//! addresses, unsigned integers, booleans and raw `bytes32` words.

use crate::core::ArgValue;
use crate::core::error::FactoryError;

const WORD: usize = 32;

/// Function selector of `upgradeTo(address)`.
pub const UPGRADE_TO_SELECTOR: [u8; 4] = [0x36, 0x59, 0xcf, 0xe6];

/// Encodes `args` as consecutive 32-byte words, in order.
pub fn encode_args(args: &[ArgValue]) -> Result<Vec<u8>, FactoryError> {
    let mut out = Vec::with_capacity(args.len() * WORD);
    for (position, arg) in args.iter().enumerate() {
        let word = encode_word(arg).map_err(|reason| {
            FactoryError::Rejected(format!("argument {} ({}): {}", position, arg, reason))
        })?;
        out.extend_from_slice(&word);
    }
    Ok(out)
}

/// Calldata for `upgradeTo(implementation)`.
pub fn encode_upgrade_to(implementation: &str) -> Result<Vec<u8>, FactoryError> {
    let mut out = UPGRADE_TO_SELECTOR.to_vec();
    out.extend(encode_args(&[ArgValue::String(implementation.to_string())])?);
    Ok(out)
}

fn encode_word(arg: &ArgValue) -> Result<[u8; WORD], String> {
    match arg {
        ArgValue::Bool(flag) => Ok(uint_word(u128::from(*flag))),
        ArgValue::Number(number) => number
            .as_u64()
            .map(|n| uint_word(u128::from(n)))
            .ok_or_else(|| "only non-negative integers are supported".to_string()),
        ArgValue::String(text) => {
            if let Some(hex_digits) = text.strip_prefix("0x") {
                hex_word(hex_digits)
            } else {
                text.parse::<u128>()
                    .map(uint_word)
                    .map_err(|e| format!("not an address, word or decimal integer: {}", e))
            }
        }
        _ => Err("unsupported argument type".to_string()),
    }
}

fn uint_word(value: u128) -> [u8; WORD] {
    let mut word = [0u8; WORD];
    word[WORD - 16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Left-pads a 20-byte address, or takes a full 32-byte word as-is.
fn hex_word(hex_digits: &str) -> Result<[u8; WORD], String> {
    let bytes = hex::decode(hex_digits).map_err(|e| e.to_string())?;
    if bytes.len() != 20 && bytes.len() != WORD {
        return Err(format!("expected 20 or 32 bytes, got {}", bytes.len()));
    }
    let mut word = [0u8; WORD];
    word[WORD - bytes.len()..].copy_from_slice(&bytes);
    Ok(word)
}
