//! Adaptive dictionary coding.
//!
//! The dictionary starts seeded with every single-unit string below the
//! seed size and grows by one entry per emitted code: the longest known
//! prefix plus the character that broke it. The encoder emits the code of
//! the longest known prefix at each step and flushes the pending prefix at
//! end of input. Codes are written out as `char`s; indices in the UTF-16
//! surrogate range are skipped when the dictionary grows, and growth stops
//! at the last scalar value, so the output is always a valid string. The
//! decoder mirrors both rules.

use std::collections::HashMap;

use super::{from_byte_units, to_byte_units, DecodeError};

const DEFAULT_DICT_SIZE: u32 = 256;
const SURROGATE_START: u32 = 0xD800;
const SURROGATE_END: u32 = 0xDFFF;
const MAX_CODE: u32 = char::MAX as u32;

/// Compress `text` with the default 256-entry seed dictionary.
pub fn compress(text: &str) -> String {
    compress_with_dict(text, DEFAULT_DICT_SIZE)
}

/// Compress `text` with a dictionary seeded with the single-unit strings
/// `0..dict_size`.
///
/// `dict_size` must stay below the surrogate range (0xD800); byte-oriented
/// inputs use the default 256.
pub fn compress_with_dict(text: &str, dict_size: u32) -> String {
    debug_assert!(dict_size <= SURROGATE_START, "seed codes must be valid scalars");

    let mut dictionary: HashMap<Vec<char>, u32> = (0..dict_size)
        .map(|i| (vec![seed_unit(i)], i))
        .collect();
    let mut next_code = dict_size;

    let mut out = String::new();
    let mut prefix: Vec<char> = Vec::new();

    for c in to_byte_units(text) {
        let mut extended = prefix.clone();
        extended.push(c);
        if dictionary.contains_key(&extended) {
            prefix = extended;
        } else {
            out.push(code_unit(dictionary[&prefix]));
            if next_code <= MAX_CODE {
                dictionary.insert(extended, next_code);
                next_code = bump(next_code);
            }
            prefix = vec![c];
        }
    }

    if !prefix.is_empty() {
        out.push(code_unit(dictionary[&prefix]));
    }

    out
}

/// Invert [`compress`].
pub fn decompress(text: &str) -> Result<String, DecodeError> {
    decompress_with_dict(text, DEFAULT_DICT_SIZE)
}

/// Invert [`compress_with_dict`] for the same `dict_size`.
pub fn decompress_with_dict(text: &str, dict_size: u32) -> Result<String, DecodeError> {
    let mut dictionary: HashMap<u32, Vec<char>> = (0..dict_size)
        .map(|i| (i, vec![seed_unit(i)]))
        .collect();
    let mut next_code = dict_size;

    let mut codes = text.chars().map(u32::from);
    let Some(first) = codes.next() else {
        return Ok(String::new());
    };
    let mut previous = dictionary
        .get(&first)
        .ok_or(DecodeError::UnknownCode(first))?
        .clone();
    let mut out = previous.clone();

    for code in codes {
        let entry = if let Some(known) = dictionary.get(&code) {
            known.clone()
        } else if code == next_code {
            // the one code the encoder can emit before defining it:
            // previous prefix plus its own first unit
            let mut implied = previous.clone();
            implied.push(previous[0]);
            implied
        } else {
            return Err(DecodeError::UnknownCode(code));
        };

        out.extend(&entry);

        if next_code <= MAX_CODE {
            let mut grown = previous.clone();
            grown.push(entry[0]);
            dictionary.insert(next_code, grown);
            next_code = bump(next_code);
        }
        previous = entry;
    }

    from_byte_units(&out)
}

fn bump(code: u32) -> u32 {
    match code + 1 {
        SURROGATE_START => SURROGATE_END + 1,
        next => next,
    }
}

fn seed_unit(code: u32) -> char {
    char::from_u32(code).expect("seed codes are below the surrogate range")
}

fn code_unit(code: u32) -> char {
    char::from_u32(code).expect("dictionary codes skip the surrogate range")
}
