//! Property-based tests for the transcoding primitives.

use proptest::prelude::*;
use tl_utils::unicode::{
    decode_utf16, decode_utf8, utf32_to_utf16, utf32_to_utf8, Endian,
};

proptest! {
    /// Encoding any scalar value and decoding it back is the identity.
    #[test]
    fn utf8_encode_decode_roundtrip(c in any::<char>()) {
        let mut buf = [0u8; 4];
        let n = utf32_to_utf8(u32::from(c), &mut buf);
        let decoded: Vec<char> = decode_utf8(&buf[..n]).collect();
        prop_assert_eq!(decoded, vec![c]);
    }

    #[test]
    fn utf16_encode_decode_roundtrip(c in any::<char>()) {
        let mut units = [0u16; 2];
        let n = utf32_to_utf16(u32::from(c), &mut units);

        let mut le = Vec::new();
        let mut be = Vec::new();
        for &u in &units[..n] {
            le.extend_from_slice(&u.to_le_bytes());
            be.extend_from_slice(&u.to_be_bytes());
        }

        prop_assert_eq!(decode_utf16(&le, Endian::Little).collect::<Vec<_>>(), vec![c]);
        prop_assert_eq!(decode_utf16(&be, Endian::Big).collect::<Vec<_>>(), vec![c]);
    }

    /// Whole strings survive a trip through the UTF-8 decoder.
    #[test]
    fn utf8_decoder_matches_std(s in "\\PC{0,64}") {
        let decoded: String = decode_utf8(s.as_bytes()).collect();
        prop_assert_eq!(decoded, s);
    }

    /// The decoder never panics and always consumes all input, whatever the
    /// bytes are.
    #[test]
    fn utf8_decoder_total(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = decode_utf8(&bytes).count();
    }
}
