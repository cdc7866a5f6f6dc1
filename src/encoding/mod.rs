//! Character encoding detection and decoding.
//!
//! Documents read from disk may be in any encoding `encoding_rs` knows.
//! The encoding is chosen by, in order: a byte order mark, the `encoding`
//! pseudo-attribute of the XML declaration, and finally UTF-8.

use encoding_rs::{Encoding, UTF_8};

use crate::error::{ParseError, SourceLocation};

/// Decodes raw XML bytes into a UTF-8 string with any BOM removed.
///
/// # Errors
///
/// Returns [`ParseError`] if the bytes are malformed for the detected
/// encoding.
///
/// # Examples
///
/// ```
/// use xmlpath::encoding::decode_to_utf8;
///
/// let latin1 = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><n>\xE9</n>";
/// assert!(decode_to_utf8(latin1).unwrap().ends_with("<n>\u{e9}</n>"));
/// ```
pub fn decode_to_utf8(bytes: &[u8]) -> Result<String, ParseError> {
    let (encoding, bom_len) = match Encoding::for_bom(bytes) {
        Some((encoding, len)) => (encoding, len),
        None => (declared_encoding(bytes).unwrap_or(UTF_8), 0),
    };

    let (text, had_errors) = encoding.decode_without_bom_handling(&bytes[bom_len..]);
    if had_errors {
        return Err(ParseError {
            message: format!("malformed byte sequence for encoding {}", encoding.name()),
            location: SourceLocation::default(),
        });
    }
    Ok(text.into_owned())
}

/// Reads the `encoding` pseudo-attribute from an ASCII-compatible XML
/// declaration. Unknown labels fall back to UTF-8 with a warning.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let scan = &bytes[..bytes.len().min(200)];
    if !scan.starts_with(b"<?xml") {
        return None;
    }
    let decl = &scan[..scan.windows(2).position(|w| w == b"?>")?];
    let at = decl.windows(8).position(|w| w == b"encoding")?;
    let rest = trim_ascii_start(&decl[at + 8..]);
    let rest = trim_ascii_start(rest.strip_prefix(b"=")?);
    let (&quote, rest) = rest.split_first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let label = &rest[..rest.iter().position(|&b| b == quote)?];

    let encoding = Encoding::for_label(label);
    if encoding.is_none() {
        tracing::warn!(
            label = %String::from_utf8_lossy(label),
            "unsupported declared encoding, decoding as UTF-8"
        );
    }
    encoding
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes
        .iter()
        .take_while(|b| b.is_ascii_whitespace())
        .count();
    &bytes[skip..]
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_utf8() {
        assert_eq!(decode_to_utf8(b"<r>\xC3\xA9</r>").unwrap(), "<r>\u{e9}</r>");
    }

    #[test]
    fn test_utf8_bom_is_stripped() {
        assert_eq!(decode_to_utf8(b"\xEF\xBB\xBF<r/>").unwrap(), "<r/>");
    }

    #[test]
    fn test_utf16le_bom() {
        let bytes = b"\xFF\xFE<\x00r\x00/\x00>\x00";
        assert_eq!(decode_to_utf8(bytes).unwrap(), "<r/>");
    }

    #[test]
    fn test_declared_latin1() {
        let bytes = b"<?xml version='1.0' encoding = 'iso-8859-1'?><r>\xFC</r>";
        assert!(decode_to_utf8(bytes).unwrap().ends_with("<r>\u{fc}</r>"));
    }

    #[test]
    fn test_unknown_label_falls_back_to_utf8() {
        let bytes = b"<?xml version=\"1.0\" encoding=\"x-bogus\"?><r/>";
        assert!(decode_to_utf8(bytes).unwrap().ends_with("<r/>"));
    }

    #[test]
    fn test_malformed_utf8_is_an_error() {
        let err = decode_to_utf8(b"<r>\xFF\xFE\xFD</r>").unwrap_err();
        assert!(err.message.contains("UTF-8"));
    }
}
