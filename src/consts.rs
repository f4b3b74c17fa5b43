//! Internal constants: USB identifiers, control-transfer envelope, frame layouts and glyph codes.

// Vendor/Product IDs
/// Saitek (now Logitech) vendor ID shared by all Flight Simulator panels.
pub const SAITEK_VID: u16 = 0x06A3;

/// Product ID of the Flight Radio Panel.
pub const RADIO_PID: u16 = 0x0D05;
/// Product ID of the Flight Multi Panel.
pub const MULTI_PID: u16 = 0x0D06;
/// Product ID of the Flight Instrument Panel (FIP).
pub const FIP_PID: u16 = 0xA2AE;

// --- Control Transfer (all panel writes) ---
pub mod control {
    /// Host to device, class request, interface recipient.
    pub const BM_REQUEST_TYPE: u8 = 0x21;
    /// HID SET_REPORT.
    pub const B_REQUEST: u8 = 0x09;
    /// Report type 3 in the high byte, report ID 0 in the low byte.
    pub const W_VALUE: u16 = 0x0300;
    pub const W_INDEX: u16 = 0;
}

// --- Seven-segment glyphs ---
pub mod glyph {
    /// Number of digit cells in one display field.
    pub const FIELD_WIDTH: usize = 5;
    pub const BLANK: u8 = 0x0F;
    pub const MINUS: u8 = 0x0E;
    /// High nibble marking "digit followed by a decimal point".
    pub const DOT_FLAG: u8 = 0xD0;
    pub const DOT_MASK: u8 = 0xF0;
    pub const DIGIT_MASK: u8 = 0x0F;
}

// --- Radio Panel output frame ---
pub mod radio {
    pub const FRAME_SIZE: usize = 22;
    /// Offsets of COM1 active, COM1 standby, COM2 active, COM2 standby.
    pub const FIELD_OFFSETS: [usize; 4] = [0, 5, 10, 15];
    /// Offset of the two trailing zero bytes.
    pub const TRAILER_OFFSET: usize = 20;
    pub const REPORT_SIZE: usize = 3;
}

// --- Multi Panel output frame ---
pub mod multi {
    pub const FRAME_SIZE: usize = 12;
    pub const TOP_OFFSET: usize = 0;
    pub const BOTTOM_OFFSET: usize = 5;
    pub const LED_OFFSET: usize = 10;
    pub const TRAILER_OFFSET: usize = 11;
    pub const TRAILER: u8 = 0xFF;
    pub const REPORT_SIZE: usize = 3;

    /// Button LED bits (byte 10), LSB first.
    pub mod led {
        pub const AP: u8 = 0x01;
        pub const HDG: u8 = 0x02;
        pub const NAV: u8 = 0x04;
        pub const IAS: u8 = 0x08;
        pub const ALT: u8 = 0x10;
        pub const VS: u8 = 0x20;
        pub const APR: u8 = 0x40;
        pub const REV: u8 = 0x80;
    }
}

// --- Flight Instrument Panel ---
pub mod fip {
    pub const REPORT_SIZE: usize = 2;
}

/// Largest input report any panel sends; used to size read buffers.
pub const MAX_REPORT_SIZE: usize = 8;
