//! Output frame builders for the Radio (22 byte) and Multi (12 byte) panels.
//!
//! Builders are pure: they take logical field values and return the exact
//! payload of one SET_REPORT control transfer.

use crate::consts::glyph::{BLANK, FIELD_WIDTH};
use crate::consts::{multi, radio};
use crate::error::Result;
use crate::glyph;

/// Payload of one Radio Panel write.
pub type RadioFrame = [u8; radio::FRAME_SIZE];
/// Payload of one Multi Panel write.
pub type MultiFrame = [u8; multi::FRAME_SIZE];

/// The four Radio Panel displays.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RadioDisplay {
    /// Top left.
    pub com1_active: String,
    /// Top right.
    pub com1_standby: String,
    /// Bottom left.
    pub com2_active: String,
    /// Bottom right.
    pub com2_standby: String,
}

impl RadioDisplay {
    pub fn new(com1a: &str, com1s: &str, com2a: &str, com2s: &str) -> Self {
        RadioDisplay {
            com1_active: com1a.to_string(),
            com1_standby: com1s.to_string(),
            com2_active: com2a.to_string(),
            com2_standby: com2s.to_string(),
        }
    }

    /// Builds the display from free-form frequency strings (see [`format_frequency`]).
    pub fn from_frequencies(com1a: &str, com1s: &str, com2a: &str, com2s: &str) -> Self {
        Self::new(
            &format_frequency(com1a),
            &format_frequency(com1s),
            &format_frequency(com2a),
            &format_frequency(com2s),
        )
    }

    pub fn to_frame(&self, strict: bool) -> Result<RadioFrame> {
        build_radio_frame_with(
            &self.com1_active,
            &self.com1_standby,
            &self.com2_active,
            &self.com2_standby,
            strict,
        )
    }
}

/// The two Multi Panel rows and the button LED mask.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiDisplay {
    pub top: String,
    pub bottom: String,
    pub leds: u8,
}

impl MultiDisplay {
    pub fn new(top: &str, bottom: &str, leds: u8) -> Self {
        MultiDisplay {
            top: top.to_string(),
            bottom: bottom.to_string(),
            leds,
        }
    }

    pub fn to_frame(&self, strict: bool) -> Result<MultiFrame> {
        build_multi_frame_with(&self.top, &self.bottom, self.leds, strict)
    }
}

/// Builds a Radio frame: four left-aligned fields followed by `00 00`.
pub fn build_radio_frame(com1a: &str, com1s: &str, com2a: &str, com2s: &str) -> Result<RadioFrame> {
    build_radio_frame_with(com1a, com1s, com2a, com2s, false)
}

/// [`build_radio_frame`] with explicit strict-mode encoding.
pub fn build_radio_frame_with(
    com1a: &str,
    com1s: &str,
    com2a: &str,
    com2s: &str,
    strict: bool,
) -> Result<RadioFrame> {
    let mut frame = [0u8; radio::FRAME_SIZE];
    for (offset, text) in radio::FIELD_OFFSETS
        .iter()
        .zip([com1a, com1s, com2a, com2s])
    {
        let field = glyph::encode_with(text, strict)?;
        frame[*offset..*offset + FIELD_WIDTH].copy_from_slice(&field);
    }
    frame[radio::TRAILER_OFFSET] = 0x00;
    frame[radio::TRAILER_OFFSET + 1] = 0x00;
    Ok(frame)
}

/// Builds a Multi frame: right-aligned top and bottom rows, LED byte, `0xFF`.
pub fn build_multi_frame(top: &str, bottom: &str, leds: u8) -> Result<MultiFrame> {
    build_multi_frame_with(top, bottom, leds, false)
}

/// [`build_multi_frame`] with explicit strict-mode encoding.
pub fn build_multi_frame_with(
    top: &str,
    bottom: &str,
    leds: u8,
    strict: bool,
) -> Result<MultiFrame> {
    let top = glyph::encode_with(&glyph::right_align(top, FIELD_WIDTH), strict)?;
    let bottom = glyph::encode_with(&glyph::right_align(bottom, FIELD_WIDTH), strict)?;

    let mut frame = [0u8; multi::FRAME_SIZE];
    frame[multi::TOP_OFFSET..multi::TOP_OFFSET + FIELD_WIDTH].copy_from_slice(&top);
    frame[multi::BOTTOM_OFFSET..multi::BOTTOM_OFFSET + FIELD_WIDTH].copy_from_slice(&bottom);
    frame[multi::LED_OFFSET] = leds;
    frame[multi::TRAILER_OFFSET] = multi::TRAILER;
    Ok(frame)
}

/// A Multi frame with both rows blank.
pub fn blank_multi_frame(leds: u8) -> MultiFrame {
    let mut frame = [BLANK; multi::FRAME_SIZE];
    frame[multi::LED_OFFSET] = leds;
    frame[multi::TRAILER_OFFSET] = multi::TRAILER;
    frame
}

/// Sets (`on`) or clears the bits of `mask` in `current`.
#[inline]
pub fn set_leds(current: u8, mask: u8, on: bool) -> u8 {
    if on {
        current | mask
    } else {
        current & !mask
    }
}

/// Multi Panel button LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Led {
    Ap,
    Hdg,
    Nav,
    Ias,
    Alt,
    Vs,
    Apr,
    Rev,
}

impl Led {
    pub const ALL: [Led; 8] = [
        Led::Ap,
        Led::Hdg,
        Led::Nav,
        Led::Ias,
        Led::Alt,
        Led::Vs,
        Led::Apr,
        Led::Rev,
    ];

    /// Bit of this LED in the LED byte.
    pub fn mask(&self) -> u8 {
        use multi::led;
        match self {
            Led::Ap => led::AP,
            Led::Hdg => led::HDG,
            Led::Nav => led::NAV,
            Led::Ias => led::IAS,
            Led::Alt => led::ALT,
            Led::Vs => led::VS,
            Led::Apr => led::APR,
            Led::Rev => led::REV,
        }
    }

    /// Combined mask of several LEDs.
    pub fn mask_of(leds: &[Led]) -> u8 {
        leds.iter().fold(0, |acc, l| acc | l.mask())
    }
}

/// Strips everything except digits and `.` from a frequency string,
/// e.g. `"COM 118.25 MHz"` becomes `"118.25"`.
pub fn format_frequency(freq: &str) -> String {
    freq.chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// Keeps digits, `.` and `-` and truncates to the five cells of a Multi row.
pub fn format_multi_value(value: &str) -> String {
    let mut cells = 0;
    let mut out = String::new();
    for c in value
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
    {
        if c != '.' {
            if cells == FIELD_WIDTH {
                break;
            }
            cells += 1;
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_radio_frame_layout() {
        let frame = build_radio_frame("1", "2", "3", "4").unwrap();
        assert_eq!(frame.len(), 22);
        assert_eq!(frame[0], 0x01);
        assert_eq!(frame[5], 0x02);
        assert_eq!(frame[10], 0x03);
        assert_eq!(frame[15], 0x04);
        assert_eq!(&frame[20..], &[0x00, 0x00]);
    }

    #[test]
    fn test_multi_rows_right_aligned() {
        let frame = build_multi_frame("250", "-5", 0).unwrap();
        assert_eq!(&frame[0..5], &[0x0F, 0x0F, 0x02, 0x05, 0x00]);
        assert_eq!(&frame[5..10], &[0x0F, 0x0F, 0x0F, 0x0E, 0x05]);
        assert_eq!(frame[11], 0xFF);
    }

    #[test]
    fn test_set_leds() {
        assert_eq!(set_leds(0x00, Led::Hdg.mask(), true), 0x02);
        assert_eq!(set_leds(0x13, Led::Ap.mask() | Led::Alt.mask(), false), 0x02);
        assert_eq!(set_leds(0x02, 0x02, true), 0x02);
    }

    #[test]
    fn test_led_masks_cover_byte() {
        assert_eq!(Led::mask_of(&Led::ALL), 0xFF);
        assert_eq!(Led::Rev.mask(), 0x80);
    }

    #[test]
    fn test_blank_multi_frame() {
        let frame = blank_multi_frame(0x11);
        assert_eq!(&frame[..10], &[0x0F; 10]);
        assert_eq!(frame[10], 0x11);
        assert_eq!(frame[11], 0xFF);
    }

    #[test]
    fn test_format_helpers() {
        assert_eq!(format_frequency("COM 118.25 MHz"), "118.25");
        assert_eq!(format_multi_value("ALT -123.5ft"), "-123.5");
        assert_eq!(format_multi_value("123456"), "12345");
    }
}
