//! Sliding-window match encoding.
//!
//! For each input position the encoder scans backward, up to the window
//! size, for the longest earlier occurrence of the upcoming text. A match
//! becomes the three-unit token `(distance, length, next-literal)`; a
//! position with no match becomes `(0, 0, literal)`. Ties between
//! equal-length matches go to the nearest one — encoder simplicity is
//! preferred over optimal ratio. Match length is bounded by the distance
//! and by the need for a trailing literal, so every token has the same
//! shape and all three units stay valid scalar values.

use super::{from_byte_units, to_byte_units, DecodeError};

const DEFAULT_WINDOW_SIZE: usize = 8192;

/// Compress `text` with the default 8192-unit window.
pub fn compress(text: &str) -> String {
    compress_with_window(text, DEFAULT_WINDOW_SIZE)
}

/// Compress `text`, scanning back at most `window_size` units for matches.
///
/// `window_size` must stay below the surrogate range (0xD800) so distance
/// and length units remain valid `char`s.
pub fn compress_with_window(text: &str, window_size: usize) -> String {
    debug_assert!(window_size < 0xD800, "window size must fit in a scalar value");

    let units = to_byte_units(text);
    let n = units.len();
    let mut out = String::new();

    let mut i = 0;
    while i < n {
        let mut best_len = 0usize;
        let mut best_dist = 0usize;

        let window_start = i.saturating_sub(window_size);
        for s in (window_start..i).rev() {
            if units[s] != units[i] {
                continue;
            }
            let dist = s.abs_diff(i);
            // room for the trailing literal, and no self-overlap
            let limit = dist.min(n - i - 1);
            let mut len = 0;
            while len < limit && units[s + len] == units[i + len] {
                len += 1;
            }
            if len > best_len {
                best_len = len;
                best_dist = dist;
            }
        }

        if best_len > 0 {
            out.push(unit(best_dist));
            out.push(unit(best_len));
            out.push(units[i + best_len]);
            i += best_len + 1;
        } else {
            out.push('\0');
            out.push('\0');
            out.push(units[i]);
            i += 1;
        }
    }

    out
}

/// Invert [`compress`].
pub fn decompress(text: &str) -> Result<String, DecodeError> {
    let tokens: Vec<char> = text.chars().collect();
    if tokens.len() % 3 != 0 {
        return Err(DecodeError::TruncatedToken);
    }

    let mut out: Vec<char> = Vec::new();
    for token in tokens.chunks(3) {
        let dist = u32::from(token[0]) as usize;
        let len = u32::from(token[1]) as usize;
        let literal = token[2];

        if dist > 0 && len > 0 {
            if dist > out.len() || len > dist {
                return Err(DecodeError::InvalidReference);
            }
            let start = out.len() - dist;
            for k in 0..len {
                out.push(out[start + k]);
            }
        }
        out.push(literal);
    }

    from_byte_units(&out)
}

fn unit(value: usize) -> char {
    char::from_u32(value as u32).expect("window-bounded values are valid scalars")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(text: &str) {
        let packed = compress(text);
        assert_eq!(decompress(&packed).unwrap(), text, "input: {text:?}");
    }

    #[test]
    fn round_trips_plain_text() {
        round_trip("");
        round_trip("a");
        round_trip("abcabcabcabc");
        round_trip("the quick brown fox jumps over the lazy dog");
        round_trip(&"na ".repeat(500));
    }

    #[test]
    fn round_trips_multibyte_text() {
        round_trip("órbita órbita órbita");
        round_trip("κύκλος κύκλος 軌道軌道軌道 🛰");
    }

    #[test]
    fn round_trips_movie_shaped_json() {
        let json = r#"{"header":{"title":"demo","players":{"p1":"Alice","p2":"Bob"}},"frames":[{"items":[{"sprite":"ball","x":1,"y":2}]},{"items":[{"sprite":"ball","x":3,"y":2}]}]}"#;
        round_trip(json);
    }

    #[test]
    fn repeated_text_shrinks() {
        let text = "abcdefgh".repeat(100);
        let packed = compress(&text);
        assert!(packed.chars().count() < text.len());
    }

    #[test]
    fn literal_runs_use_zero_tokens() {
        // four distinct units, no matches possible
        let packed = compress("abcd");
        let tokens: Vec<char> = packed.chars().collect();
        assert_eq!(tokens.len(), 12);
        assert!(tokens.chunks(3).all(|t| t[0] == '\0' && t[1] == '\0'));
    }

    #[test]
    fn respects_a_tiny_window() {
        // matches farther back than the window must be ignored
        let text = "abcdefgh__abcdefgh";
        let packed = compress_with_window(text, 4);
        assert_eq!(decompress(&packed).unwrap(), text);
    }

    #[test]
    fn rejects_corrupt_input() {
        assert_eq!(decompress("ab"), Err(DecodeError::TruncatedToken));
        // distance of 1 with nothing decoded yet
        let bogus: String = ['\u{1}', '\u{1}', 'x'].iter().collect();
        assert_eq!(decompress(&bogus), Err(DecodeError::InvalidReference));
    }
}
