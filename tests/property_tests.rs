//! Property-based tests for the glyph codec, frame builders and decoder.
//!
//! Uses proptest with 500 cases to verify:
//! - every encoded field is five cells, and never carries a dot on a blank
//! - decoding an encoded field yields the canonical form of the input
//! - frames have fixed lengths and trailers
//! - decoding is a pure function of the report sequence

use proptest::prelude::*;
use saitek_panels::glyph::{canonicalize, decode, encode, encode_strict, glyph_count};
use saitek_panels::{build_multi_frame, build_radio_frame, Decoder, PanelKind};
use std::time::Instant;

/// Display text of at most five cells, with dots sprinkled anywhere.
fn field_text() -> impl Strategy<Value = String> {
    "[0-9 .\\-]{0,9}".prop_filter("at most five cells", |s| glyph_count(s) <= 5)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_field_is_five_cells(text in field_text()) {
        let field = encode(&text).unwrap();
        prop_assert_eq!(field.len(), 5);
    }

    #[test]
    fn prop_decode_encode_is_canonical(text in field_text()) {
        let field = encode(&text).unwrap();
        prop_assert_eq!(decode(&field), canonicalize(&text));
    }

    #[test]
    fn prop_no_dot_on_blank_and_single_dot(text in field_text()) {
        let field = encode(&text).unwrap();
        let dots = field.iter().filter(|c| *c & 0xF0 == 0xD0).count();
        prop_assert!(dots <= 1, "{} dots in {:02X?}", dots, field);
        for cell in field {
            prop_assert!(cell != 0xDF, "dot on blank cell for {:?}", text);
        }
    }

    #[test]
    fn prop_strict_agrees_when_accepted(text in field_text()) {
        if let Ok(strict) = encode_strict(&text) {
            prop_assert_eq!(strict, encode(&text).unwrap());
        }
    }

    #[test]
    fn prop_overflow_rejected(text in "[0-9]{6,10}") {
        prop_assert!(encode(&text).is_err());
    }

    #[test]
    fn prop_radio_frame_shape(
        a in field_text(),
        b in field_text(),
        c in field_text(),
        d in field_text(),
    ) {
        let frame = build_radio_frame(&a, &b, &c, &d).unwrap();
        prop_assert_eq!(frame.len(), 22);
        prop_assert_eq!(frame[20], 0x00);
        prop_assert_eq!(frame[21], 0x00);
    }

    #[test]
    fn prop_multi_frame_shape(top in field_text(), bottom in field_text(), leds in any::<u8>()) {
        let frame = build_multi_frame(&top, &bottom, leds).unwrap();
        prop_assert_eq!(frame.len(), 12);
        prop_assert_eq!(frame[10], leds);
        prop_assert_eq!(frame[11], 0xFF);
    }

    #[test]
    fn prop_decoder_deterministic(
        reports in proptest::collection::vec(proptest::array::uniform3(any::<u8>()), 1..20)
    ) {
        let decode_all = |timestamp: Instant| {
            let mut decoder = Decoder::new(PanelKind::Radio);
            reports
                .iter()
                .flat_map(|r| decoder.feed_at(r, timestamp))
                .map(|e| (e.kind, e.code, e.delta))
                .collect::<Vec<_>>()
        };
        prop_assert_eq!(decode_all(Instant::now()), decode_all(Instant::now()));
    }
}
