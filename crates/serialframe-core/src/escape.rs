//! Escaped byte strings for terminators, boundaries and strip sets.
//!
//! Markers are written as text with C-style escapes so they can live in
//! a config file or on the command line:
//!
//! ```rust
//! use serialframe_core::{format_escaped, parse_escaped};
//!
//! assert_eq!(parse_escaped(r"\r\n").unwrap(), vec![0x0D, 0x0A]);
//! assert_eq!(parse_escaped(r"\x0D").unwrap(), vec![0x0D]);
//! assert_eq!(format_escaped(b"OK\r\n"), r"OK\r\n");
//! ```

use crate::settings::SettingsError;

/// Parses a string with `\r`, `\n`, `\t`, `\0`, `\\` and `\xHH` escapes.
pub fn parse_escaped(input: &str) -> Result<Vec<u8>, SettingsError> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'\\' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }

        let Some(&kind) = bytes.get(i + 1) else {
            return Err(invalid(i, "trailing backslash"));
        };

        match kind {
            b'r' => out.push(b'\r'),
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'0' => out.push(0),
            b'\\' => out.push(b'\\'),
            b'x' | b'X' => {
                let hex = bytes
                    .get(i + 2..i + 4)
                    .ok_or_else(|| invalid(i, "\\x needs two hex digits"))?;
                if !hex.iter().all(u8::is_ascii_hexdigit) {
                    let shown = String::from_utf8_lossy(hex);
                    return Err(invalid(i, &format!("bad hex digits {:?}", shown)));
                }
                let value = hex
                    .iter()
                    .filter_map(|&d| char::from(d).to_digit(16))
                    .fold(0u8, |acc, digit| (acc << 4) | digit as u8);
                out.push(value);
                i += 4;
                continue;
            }
            other => {
                return Err(invalid(
                    i,
                    &format!("unknown escape \\{}", char::from(other)),
                ));
            }
        }
        i += 2;
    }

    Ok(out)
}

/// Renders bytes back into the escaped form accepted by [`parse_escaped`].
pub fn format_escaped(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\r' => out.push_str("\\r"),
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\\' => out.push_str("\\\\"),
            0x20..=0x7E => out.push(char::from(b)),
            _ => out.push_str(&format!("\\x{:02X}", b)),
        }
    }
    out
}

fn invalid(offset: usize, reason: &str) -> SettingsError {
    SettingsError::InvalidEscape {
        offset,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(parse_escaped("AT+CSQ?").unwrap(), b"AT+CSQ?".to_vec());
    }

    #[test]
    fn control_escapes() {
        assert_eq!(parse_escaped(r"\r\n\t\0\\").unwrap(), vec![13, 10, 9, 0, b'\\']);
    }

    #[test]
    fn hex_escapes() {
        assert_eq!(parse_escaped(r"\x0d\x0A").unwrap(), vec![0x0D, 0x0A]);
        assert_eq!(parse_escaped(r"A\xFFB").unwrap(), vec![b'A', 0xFF, b'B']);
    }

    #[test]
    fn malformed_escapes() {
        assert!(matches!(
            parse_escaped("abc\\"),
            Err(SettingsError::InvalidEscape { offset: 3, .. })
        ));
        assert!(parse_escaped(r"\x1").is_err());
        assert!(parse_escaped(r"\xZZ").is_err());
        assert!(parse_escaped(r"\q").is_err());
    }

    #[test]
    fn hex_escape_rejects_signs() {
        for input in [r"\x+1", r"\x-1", r"\x 1", r"AT\x+F"] {
            assert!(
                matches!(parse_escaped(input), Err(SettingsError::InvalidEscape { .. })),
                "{input} should be rejected"
            );
        }
        assert!(matches!(
            parse_escaped(r"OK\x+1"),
            Err(SettingsError::InvalidEscape { offset: 2, .. })
        ));
    }

    #[test]
    fn format_is_inverse_of_parse() {
        let raw = vec![b'O', b'K', 0x0D, 0x0A, 0x00, 0x7F, b'\\'];
        let text = format_escaped(&raw);
        assert_eq!(text, r"OK\r\n\x00\x7F\\");
        assert_eq!(parse_escaped(&text).unwrap(), raw);
    }
}
