//! ROM image decoding.
//!
//! A ROM is a flat byte sequence, optionally base64-encoded for
//! embedding in text. Copying the bytes into machine memory is the
//! interpreter's job; this module only produces the byte sequence.
use base64::{
    alphabet,
    engine::{DecodePaddingMode, Engine, GeneralPurpose, GeneralPurposeConfig},
};

use crate::error::{OktoError, OktoResult};

/// Standard alphabet, padding optional. ROMs copied out of web pages
/// tend to arrive both with and without trailing `=`.
const ROM_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes a base64-encoded ROM image. Embedded whitespace such as
/// line breaks is tolerated.
pub fn decode_base64(encoded: &str) -> OktoResult<Vec<u8>> {
    let compact: String = encoded
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    ROM_ENGINE
        .decode(compact.as_bytes())
        .map_err(|err| OktoError::Rom(err.to_string()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_padded() {
        assert_eq!(decode_base64("AOCiKg==").unwrap(), [0x00, 0xE0, 0xA2, 0x2A]);
    }

    #[test]
    fn test_decode_unpadded() {
        assert_eq!(decode_base64("AOCiKg").unwrap(), [0x00, 0xE0, 0xA2, 0x2A]);
    }

    #[test]
    fn test_decode_with_line_breaks() {
        assert_eq!(
            decode_base64("AOCi\nKg==\n").unwrap(),
            [0x00, 0xE0, 0xA2, 0x2A]
        );
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_base64("!!!!"), Err(OktoError::Rom(_))));
    }
}
