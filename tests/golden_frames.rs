//! Byte-exact encodings and frame layouts the panels are known to accept.

use saitek_panels::glyph::{self, encode, encode_strict};
use saitek_panels::{build_multi_frame, build_radio_frame, Error};

#[test]
fn test_golden_field_encodings() {
    // (input, expected field)
    let cases: [(&str, [u8; 5]); 8] = [
        ("118.00", [0x01, 0x01, 0xD8, 0x00, 0x00]),
        ("118.50", [0x01, 0x01, 0xD8, 0x05, 0x00]),
        ("121.30", [0x01, 0x02, 0xD1, 0x03, 0x00]),
        ("121.90", [0x01, 0x02, 0xD1, 0x09, 0x00]),
        ("128.30", [0x01, 0x02, 0xD8, 0x03, 0x00]),
        ("113.70", [0x01, 0x01, 0xD3, 0x07, 0x00]),
        ("   12", [0x0F, 0x0F, 0x0F, 0x01, 0x02]),
        ("-", [0x0E, 0x0F, 0x0F, 0x0F, 0x0F]),
    ];
    for (input, expected) in cases {
        assert_eq!(
            encode(input).unwrap(),
            expected,
            "Encoding of '{}' mismatch",
            input
        );
    }
}

#[test]
fn test_empty_field_is_blank() {
    assert_eq!(encode("").unwrap(), [0x0F; 5]);
}

#[test]
fn test_overflow() {
    match encode("123456") {
        Err(Error::EncodeOverflow { input, glyphs }) => {
            assert_eq!(input, "123456");
            assert_eq!(glyphs, 6);
        }
        other => panic!("Expected EncodeOverflow, got {:?}", other),
    }
    // Dots take no cell, so this still fits.
    assert!(encode("12345.").is_ok());
}

#[test]
fn test_dot_placement_rules() {
    // Leading dot: dropped, or rejected in strict mode.
    assert_eq!(encode(".5").unwrap(), [0x05, 0x0F, 0x0F, 0x0F, 0x0F]);
    assert!(matches!(
        encode_strict(".5"),
        Err(Error::EncodeBadDot { position: 0, .. })
    ));

    // Dot after a blank cell.
    assert_eq!(encode("1 .2").unwrap(), [0x01, 0x0F, 0x02, 0x0F, 0x0F]);
    assert!(matches!(
        encode_strict("1 .2"),
        Err(Error::EncodeBadDot { position: 2, .. })
    ));

    // Second dot.
    assert_eq!(encode("1.2.3").unwrap(), [0xD1, 0x02, 0x03, 0x0F, 0x0F]);
    assert!(matches!(
        encode_strict("1.2.3"),
        Err(Error::EncodeBadDot { position: 3, .. })
    ));

    assert!(encode_strict("118.25").is_ok());
}

#[test]
fn test_no_dot_on_blank_cell() {
    for input in [" .", "  . 1", ".", "1 . 2", " 3.4"] {
        let field = encode(input).unwrap();
        for cell in field {
            if cell & 0x0F == 0x0F {
                assert_eq!(cell, 0x0F, "Dot on blank cell for '{}'", input);
            }
        }
    }
}

#[test]
fn test_decode_golden() {
    assert_eq!(glyph::decode(&[0x01, 0x02, 0xD1, 0x03, 0x00]), "121.30");
    assert_eq!(glyph::decode(&[0x0E, 0x0F, 0x0F, 0x0F, 0x0F]), "-    ");
}

#[test]
fn test_radio_frame_s1() {
    let frame = build_radio_frame("118.00", "118.50", "121.30", "121.90").unwrap();
    let expected: [u8; 22] = [
        0x01, 0x01, 0xD8, 0x00, 0x00, // COM1 active
        0x01, 0x01, 0xD8, 0x05, 0x00, // COM1 standby
        0x01, 0x02, 0xD1, 0x03, 0x00, // COM2 active
        0x01, 0x02, 0xD1, 0x09, 0x00, // COM2 standby
        0x00, 0x00,
    ];
    assert_eq!(frame, expected);
}

#[test]
fn test_multi_frame_s2() {
    let frame = build_multi_frame("  250", " 3000", 0x11).unwrap();
    assert_eq!(frame.len(), 12);
    assert_eq!(&frame[0..5], &encode("  250").unwrap());
    assert_eq!(&frame[5..10], &encode(" 3000").unwrap());
    assert_eq!(frame[10], 0x11);
    assert_eq!(frame[11], 0xFF);
}

#[test]
fn test_frame_overflow_never_builds() {
    assert!(matches!(
        build_radio_frame("118.00", "123456", "", ""),
        Err(Error::EncodeOverflow { .. })
    ));
    assert!(matches!(
        build_multi_frame("1", "-12345", 0),
        Err(Error::EncodeOverflow { .. })
    ));
}
