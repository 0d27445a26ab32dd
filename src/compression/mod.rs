//! String compression codecs used to shrink serialized movies.
//!
//! Two independent, per-call-stateless compressors: [`lz77`] (sliding
//! window match encoding) and [`lzw`] (adaptive dictionary coding). Both
//! operate on an 8-bit-safe re-encoding of the input — the UTF-8 bytes of
//! the text re-expressed one byte per `char` — so the algorithms stay
//! byte-oriented regardless of the characters in the movie. Neither codec
//! participates in the player protocol; they only trade replay-time decode
//! cost for transport size.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub mod lz77;
pub mod lzw;

/// Compression mode applied to a serialized movie.
///
/// The chosen mode is communicated out-of-band; the document itself does
/// not record it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Compression {
    /// Plain JSON text.
    #[default]
    None,
    /// Sliding-window match encoding.
    Lz77,
    /// Adaptive dictionary coding.
    Lzw,
}

impl Compression {
    /// Run the codec over `text`.
    pub fn compress(&self, text: &str) -> String {
        match self {
            Compression::None => text.to_owned(),
            Compression::Lz77 => lz77::compress(text),
            Compression::Lzw => lzw::compress(text),
        }
    }

    /// Invert [`Compression::compress`].
    pub fn decompress(&self, text: &str) -> Result<String, DecodeError> {
        match self {
            Compression::None => Ok(text.to_owned()),
            Compression::Lz77 => lz77::decompress(text),
            Compression::Lzw => lzw::decompress(text),
        }
    }
}

impl fmt::Display for Compression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Compression::None => "NONE",
            Compression::Lz77 => "LZ77",
            Compression::Lzw => "LZW",
        };
        f.write_str(name)
    }
}

impl FromStr for Compression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NONE" => Ok(Compression::None),
            "LZ77" => Ok(Compression::Lz77),
            "LZW" => Ok(Compression::Lzw),
            other => Err(format!("unknown compression mode '{other}'")),
        }
    }
}

/// Failure decoding a compressed document.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input length is not a whole number of tokens.
    #[error("truncated token stream")]
    TruncatedToken,
    /// A token references data before the start of the output.
    #[error("token references past the window start")]
    InvalidReference,
    /// A dictionary code was never assigned.
    #[error("unknown dictionary code {0}")]
    UnknownCode(u32),
    /// A decoded unit is not a byte.
    #[error("unit {0} is not a byte")]
    InvalidUnit(u32),
    /// The decoded bytes are not valid UTF-8.
    #[error("decoded bytes are not valid UTF-8")]
    InvalidUtf8,
}

/// Re-express the UTF-8 bytes of `text` one byte per char.
pub(crate) fn to_byte_units(text: &str) -> Vec<char> {
    text.bytes().map(char::from).collect()
}

/// Invert [`to_byte_units`].
pub(crate) fn from_byte_units(units: &[char]) -> Result<String, DecodeError> {
    let mut bytes = Vec::with_capacity(units.len());
    for &unit in units {
        let code = u32::from(unit);
        let byte = u8::try_from(code).map_err(|_| DecodeError::InvalidUnit(code))?;
        bytes.push(byte);
    }
    String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_units_round_trip_multibyte_text() {
        let text = "órbita κύκλος 軌道";
        let units = to_byte_units(text);
        assert!(units.iter().all(|&c| u32::from(c) < 256));
        assert_eq!(from_byte_units(&units).unwrap(), text);
    }

    #[test]
    fn mode_parses_from_its_display_form() {
        for mode in [Compression::None, Compression::Lz77, Compression::Lzw] {
            assert_eq!(mode.to_string().parse::<Compression>().unwrap(), mode);
        }
        assert!("ZIP".parse::<Compression>().is_err());
    }

    #[test]
    fn none_mode_is_the_identity() {
        let text = r#"{"header":{"title":"t"},"frames":[]}"#;
        assert_eq!(Compression::None.compress(text), text);
        assert_eq!(Compression::None.decompress(text).unwrap(), text);
    }
}
