//! Base64 transport for binary values.
//!
//! Store values are arbitrary bytes; query strings and JSON are text. Every
//! value crossing the HTTP boundary is standard (padded) base64. Keys are
//! passed through untouched.
//!
//! Decoding is tolerant in two ways: line breaks are skipped, so wrapped
//! output from `base64` tools is accepted, and non-zero trailing bits in the
//! last symbol are ignored.

use std::borrow::Cow;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::{DecodeError, Engine as _};

const TRANSPORT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::RequireCanonical)
        .with_decode_allow_trailing_bits(true),
);

/// Encode raw store bytes for the response envelope.
pub fn encode(bytes: &[u8]) -> String {
    TRANSPORT.encode(bytes)
}

/// Strictly decode a `value` parameter.
pub fn decode(text: &str) -> Result<Vec<u8>, DecodeError> {
    TRANSPORT.decode(strip_line_breaks(text).as_bytes())
}

/// Decode as much as possible.
///
/// On malformed input this returns the bytes of every complete 4-character
/// group before the one containing the error, together with the error. A
/// group that ends in padding before more input is kept.
pub fn decode_lenient(text: &str) -> (Vec<u8>, Option<DecodeError>) {
    let text = strip_line_breaks(text);
    let err = match TRANSPORT.decode(text.as_bytes()) {
        Ok(bytes) => return (bytes, None),
        Err(err) => err,
    };

    let bad_at = match err {
        DecodeError::InvalidByte(offset, b'=') => {
            let group_end = (offset / 4 + 1) * 4;
            if group_end <= text.len() {
                if let Ok(bytes) = TRANSPORT.decode(&text.as_bytes()[..group_end]) {
                    return (bytes, Some(err));
                }
            }
            offset
        }
        DecodeError::InvalidByte(offset, _) | DecodeError::InvalidLastSymbol(offset, _) => offset,
        DecodeError::InvalidLength(len) => len,
        DecodeError::InvalidPadding => text.len().saturating_sub(1),
    };
    let cut = (bad_at / 4 * 4).min(text.len());
    let prefix = TRANSPORT.decode(&text.as_bytes()[..cut]).unwrap_or_default();

    (prefix, Some(err))
}

fn strip_line_breaks(text: &str) -> Cow<'_, str> {
    if text.contains(['\r', '\n']) {
        Cow::Owned(text.chars().filter(|c| !matches!(c, '\r' | '\n')).collect())
    } else {
        Cow::Borrowed(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_binary() {
        let samples: [&[u8]; 5] = [
            b"",
            b"\0",
            b"hello\0world",
            &[0xff, 0x00, 0xfe, 0x80, 0x7f],
            "snowman \u{2603}".as_bytes(),
        ];
        for sample in samples {
            assert_eq!(decode(&encode(sample)).unwrap(), sample);
        }
    }

    #[test]
    fn encodes_with_padding() {
        assert_eq!(encode(b"a"), "YQ==");
        assert_eq!(encode(b""), "");
    }

    #[test]
    fn lenient_decode_of_valid_input_has_no_error() {
        let (bytes, err) = decode_lenient("aGVsbG8=");
        assert_eq!(bytes, b"hello");
        assert!(err.is_none());
    }

    #[test]
    fn lenient_decode_keeps_whole_groups_before_bad_byte() {
        // "aGVs" decodes to "hel"; the second group holds an invalid '!'.
        let (bytes, err) = decode_lenient("aGVsb!8=");
        assert_eq!(bytes, b"hel");
        assert!(matches!(err, Some(DecodeError::InvalidByte(_, b'!'))));
    }

    #[test]
    fn lenient_decode_drops_truncated_tail() {
        let (bytes, err) = decode_lenient("aGVsbG8");
        assert_eq!(bytes, b"hel");
        assert!(err.is_some());
    }

    #[test]
    fn lenient_decode_of_garbage_is_empty() {
        let (bytes, err) = decode_lenient("!!!!");
        assert!(bytes.is_empty());
        assert!(err.is_some());
    }

    #[test]
    fn wrapped_input_decodes_whole_value() {
        assert_eq!(decode("aGVs\nbG8=").unwrap(), b"hello");
        assert_eq!(decode("aGVs\r\nbG8=\r\n").unwrap(), b"hello");

        let (bytes, err) = decode_lenient("aGVs\nbG8=");
        assert_eq!(bytes, b"hello");
        assert!(err.is_none());
    }

    #[test]
    fn wrapped_cli_output_round_trips() {
        let raw: Vec<u8> = (0..200u32).map(|i| (i * 7 % 256) as u8).collect();
        let encoded = encode(&raw);
        let wrapped = encoded
            .as_bytes()
            .chunks(76)
            .map(|line| std::str::from_utf8(line).unwrap())
            .collect::<Vec<_>>()
            .join("\n");
        assert!(wrapped.contains('\n'));
        assert_eq!(decode(&wrapped).unwrap(), raw);
    }

    #[test]
    fn non_zero_trailing_bits_are_ignored() {
        assert_eq!(decode("YR==").unwrap(), b"a");
        assert_eq!(decode_lenient("YR==").0, b"a");
        assert_eq!(decode("aGVsbG9=").unwrap(), b"hello");
    }

    #[test]
    fn lenient_decode_keeps_group_ending_in_padding() {
        let (bytes, err) = decode_lenient("YQ==YQ==");
        assert_eq!(bytes, b"a");
        assert!(err.is_some());

        let (bytes, err) = decode_lenient("aGVsbG8=aGk=");
        assert_eq!(bytes, b"hello");
        assert!(err.is_some());
    }

    #[test]
    fn encoding_stays_canonical() {
        assert_eq!(encode(b"hello"), "aGVsbG8=");
        assert_eq!(encode(&[0xfb, 0xff]), "+/8=");
    }

    #[test]
    fn strict_decode_rejects_garbage() {
        assert!(decode("not base64!").is_err());
    }
}
