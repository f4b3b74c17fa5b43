//! Seven-segment glyph codec shared by the Radio and Multi panels.
//!
//! A display field is five digit cells. Each cell is one byte: the low nibble
//! selects the glyph (`0-9`, `0x0E` minus, `0x0F` blank) and a high nibble of
//! `0xD` lights the decimal point to the right of the glyph. A `.` in the
//! input therefore attaches to the cell on its left and does not take a cell
//! of its own: `"121.30"` encodes as `01 02 D1 03 00`.
//!
//! The encoder is left-aligned. Right alignment (the Multi panel's numeric
//! readouts) is done with [`right_align`] before encoding.

use crate::consts::glyph::{BLANK, DIGIT_MASK, DOT_FLAG, DOT_MASK, FIELD_WIDTH, MINUS};
use crate::error::{Error, Result};
use log::trace;

/// One encoded display field.
pub type Field = [u8; FIELD_WIDTH];

/// A field with every cell blank.
pub const BLANK_FIELD: Field = [BLANK; FIELD_WIDTH];

/// Looks up the cell code of a display character.
#[inline]
pub fn glyph_code(ch: char) -> Option<u8> {
    match ch {
        '0'..='9' => Some(ch as u8 - b'0'),
        ' ' => Some(BLANK),
        '-' => Some(MINUS),
        _ => None,
    }
}

/// Number of display cells `text` occupies (every character except `.`).
pub fn glyph_count(text: &str) -> usize {
    text.chars().filter(|&c| c != '.').count()
}

/// Encodes `text` into a field, silently dropping decimal points that have no
/// digit to attach to.
pub fn encode(text: &str) -> Result<Field> {
    encode_with(text, false)
}

/// Encodes `text` into a field, rejecting misplaced decimal points with
/// [`Error::EncodeBadDot`] and undisplayable characters with
/// [`Error::EncodeNoGlyph`].
pub fn encode_strict(text: &str) -> Result<Field> {
    encode_with(text, true)
}

/// Encodes `text` into a field.
///
/// Fails with [`Error::EncodeOverflow`] when more than five cells are needed.
/// A `.` at the start, after a blank, or after the field already shows a
/// decimal point is dropped; with `strict` set it fails with
/// [`Error::EncodeBadDot`] instead. Characters outside the digit table
/// encode as blank, or fail with [`Error::EncodeNoGlyph`] when `strict`.
pub fn encode_with(text: &str, strict: bool) -> Result<Field> {
    let glyphs = glyph_count(text);
    if glyphs > FIELD_WIDTH {
        return Err(Error::EncodeOverflow {
            input: text.to_string(),
            glyphs,
        });
    }

    let mut out = BLANK_FIELD;
    let mut pos = 0;
    let mut has_dot = false;
    for (index, ch) in text.chars().enumerate() {
        if ch == '.' {
            let attachable = pos > 0 && out[pos - 1] != BLANK && !has_dot;
            if attachable {
                out[pos - 1] = DOT_FLAG | (out[pos - 1] & DIGIT_MASK);
                has_dot = true;
            } else if strict {
                return Err(Error::EncodeBadDot {
                    input: text.to_string(),
                    position: index,
                });
            } else {
                trace!("Dropping decimal point at index {} of '{}'", index, text);
            }
            continue;
        }

        out[pos] = match glyph_code(ch) {
            Some(code) => code,
            None if strict => {
                return Err(Error::EncodeNoGlyph {
                    input: text.to_string(),
                    position: index,
                    ch,
                });
            }
            None => {
                trace!("Character '{}' in '{}' has no glyph, shown blank", ch, text);
                BLANK
            }
        };
        pos += 1;
    }

    trace!("Encoded '{}' -> {:02X?}", text, out);
    Ok(out)
}

/// Renders an encoded field back to text, one character per cell plus any
/// decimal point. Blank cells render as spaces, so the result of a full field
/// is always five glyphs wide.
pub fn decode(field: &[u8]) -> String {
    let mut text = String::with_capacity(field.len() + 1);
    for &cell in field {
        let ch = match cell & DIGIT_MASK {
            d @ 0..=9 => (b'0' + d) as char,
            c if c == MINUS => '-',
            _ => ' ',
        };
        text.push(ch);
        if cell & DOT_MASK == DOT_FLAG {
            text.push('.');
        }
    }
    text
}

/// The text [`decode`] yields for `encode(text)`: unknown characters become
/// blanks, unattachable decimal points are removed and the field is padded
/// with trailing blanks to five cells.
pub fn canonicalize(text: &str) -> String {
    let mut out = String::with_capacity(FIELD_WIDTH + 1);
    let mut cells = 0;
    let mut has_dot = false;
    let mut last_blank = true;
    for ch in text.chars() {
        if ch == '.' {
            if cells > 0 && !last_blank && !has_dot {
                out.push('.');
                has_dot = true;
            }
            continue;
        }
        let shown = if glyph_code(ch).is_some() { ch } else { ' ' };
        last_blank = shown == ' ';
        out.push(shown);
        cells += 1;
    }
    while cells < FIELD_WIDTH {
        out.push(' ');
        cells += 1;
    }
    out
}

/// Pads `text` on the left with blanks until it covers `width` cells.
/// Decimal points do not count towards the width.
pub fn right_align(text: &str, width: usize) -> String {
    let cells = glyph_count(text);
    if cells >= width {
        return text.to_string();
    }
    let mut aligned = " ".repeat(width - cells);
    aligned.push_str(text);
    aligned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glyph_table() {
        for d in 0..=9u8 {
            assert_eq!(glyph_code((b'0' + d) as char), Some(d));
        }
        assert_eq!(glyph_code(' '), Some(0x0F));
        assert_eq!(glyph_code('-'), Some(0x0E));
        assert_eq!(glyph_code('A'), None);
    }

    #[test]
    fn test_dot_attaches_to_left_cell() {
        assert_eq!(encode("8.").unwrap(), [0xD8, 0x0F, 0x0F, 0x0F, 0x0F]);
        assert_eq!(encode("1.2.3").unwrap(), [0xD1, 0x02, 0x03, 0x0F, 0x0F]);
    }

    #[test]
    fn test_leading_dot_dropped_or_rejected() {
        assert_eq!(encode(".5").unwrap(), [0x05, 0x0F, 0x0F, 0x0F, 0x0F]);
        match encode_strict(".5") {
            Err(Error::EncodeBadDot { position, .. }) => assert_eq!(position, 0),
            other => panic!("Expected EncodeBadDot, got {:?}", other),
        }
    }

    #[test]
    fn test_dot_after_blank() {
        assert_eq!(encode(" .1").unwrap(), [0x0F, 0x01, 0x0F, 0x0F, 0x0F]);
        assert!(matches!(
            encode_strict(" .1"),
            Err(Error::EncodeBadDot { position: 1, .. })
        ));
    }

    #[test]
    fn test_second_dot_rejected_in_strict_mode() {
        assert!(matches!(
            encode_strict("1.2.3"),
            Err(Error::EncodeBadDot { position: 3, .. })
        ));
    }

    #[test]
    fn test_unknown_characters_blank_or_rejected() {
        assert_eq!(encode("1A2").unwrap(), [0x01, 0x0F, 0x02, 0x0F, 0x0F]);
        match encode_strict("1A2") {
            Err(Error::EncodeNoGlyph { position, ch, .. }) => {
                assert_eq!(position, 1);
                assert_eq!(ch, 'A');
            }
            other => panic!("Expected EncodeNoGlyph, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_cells() {
        assert_eq!(decode(&[0x01, 0x02, 0xD1, 0x03, 0x00]), "121.30");
        assert_eq!(decode(&[0x0E, 0x0F, 0x0F, 0x0F, 0x0F]), "-    ");
        assert_eq!(decode(&[0xDE, 0x01, 0x0F, 0x0F, 0x0F]), "-.1   ");
    }

    #[test]
    fn test_right_align_ignores_dots() {
        assert_eq!(right_align("250", 5), "  250");
        assert_eq!(right_align("1.5", 5), "   1.5");
        assert_eq!(right_align("123456", 5), "123456");
    }

    #[test]
    fn test_canonicalize() {
        assert_eq!(canonicalize("118.00"), "118.00");
        assert_eq!(canonicalize("7"), "7    ");
        assert_eq!(canonicalize(".1x"), "1    ");
    }
}
