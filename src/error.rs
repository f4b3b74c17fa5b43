use crate::panel::PanelKind;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when driving Saitek panels.
///
/// Codec errors (`EncodeOverflow`, `EncodeBadDot`, `InvalidFrame`) are caller
/// bugs and never reach the USB layer. Transport errors (`IoTimeout`,
/// `IoFailed`, `ShortWrite`) are retried once by the [`Manager`](crate::Manager)
/// after reopening the panel.
#[derive(Error, Debug)]
pub enum Error {
    /// Error from the underlying HID API layer.
    #[error("HID API error: {0}")]
    Hid(#[from] hidapi::HidError),
    /// No panel of the requested kind is present.
    #[error("No {kind} panel found")]
    NotFound {
        /// The panel kind that was looked for.
        kind: PanelKind,
    },
    /// The operating system refused to hand out the device.
    #[error("Permission denied opening {kind} panel: {message}")]
    PermissionDenied {
        /// The panel that could not be opened.
        kind: PanelKind,
        /// Actionable guidance for the user.
        message: String,
    },
    /// Another process holds the device.
    #[error("{kind} panel is busy (claimed by another process)")]
    DeviceBusy {
        /// The panel that is busy.
        kind: PanelKind,
    },
    /// The text needs more display cells than a field has.
    #[error("Text '{input}' needs {glyphs} display cells (max 5)")]
    EncodeOverflow {
        /// The rejected input.
        input: String,
        /// Number of non-dot glyphs found.
        glyphs: usize,
    },
    /// A decimal point cannot be shown where it was placed (strict mode only).
    #[error("Decimal point at index {position} of '{input}' has no digit to attach to")]
    EncodeBadDot {
        /// The rejected input.
        input: String,
        /// Character index of the offending `.`.
        position: usize,
    },
    /// A character has no seven-segment glyph (strict mode only).
    #[error("Character '{ch}' at index {position} of '{input}' cannot be displayed")]
    EncodeNoGlyph {
        /// The rejected input.
        input: String,
        /// Character index of the offending character.
        position: usize,
        /// The character itself.
        ch: char,
    },
    /// A control transfer did not complete within the write deadline.
    #[error("Write to {kind} panel timed out after {timeout:?}")]
    IoTimeout {
        /// The panel being written.
        kind: PanelKind,
        /// The deadline that expired.
        timeout: Duration,
    },
    /// The transport reported an I/O failure.
    #[error("I/O failure on {kind} panel: {message}")]
    IoFailed {
        /// The panel being accessed.
        kind: PanelKind,
        /// Error details from the transport.
        message: String,
    },
    /// The device accepted fewer bytes than were sent.
    #[error("Short write to {kind} panel (expected {expected} bytes, wrote {actual})")]
    ShortWrite {
        /// The panel being written.
        kind: PanelKind,
        /// Bytes handed to the transport.
        expected: usize,
        /// Bytes the transport reported as written.
        actual: usize,
    },
    /// Operation on a manager that has been stopped.
    #[error("Panel manager is closed")]
    Closed,
    /// A frame of the wrong size was submitted for a panel.
    #[error("Invalid frame for {kind} panel (expected {expected} bytes, got {actual})")]
    InvalidFrame {
        /// Target panel.
        kind: PanelKind,
        /// Required frame size.
        expected: usize,
        /// Submitted frame size.
        actual: usize,
    },
    /// The manager configuration cannot work as given.
    #[error("Invalid manager configuration: {0}")]
    InvalidConfig(String),
    /// The requested operation does not apply to this panel.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
    /// Operating system error outside the HID layer (e.g. spawning a worker thread).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Transport-level failures the manager recovers from by reopening the panel.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::IoTimeout { .. }
                | Error::IoFailed { .. }
                | Error::ShortWrite { .. }
                | Error::Hid(_)
        )
    }
}

/// Result type alias for panel operations.
pub type Result<T> = std::result::Result<T, Error>;

pub(crate) fn permission_guidance(kind: PanelKind) -> String {
    if cfg!(target_os = "macos") {
        format!(
            "grant Input Monitoring to this application (System Settings > Privacy & Security > Input Monitoring), then reconnect the {} panel",
            kind
        )
    } else if cfg!(target_os = "linux") {
        format!(
            "add a udev rule for the {} panel: SUBSYSTEM==\"hidraw\", ATTRS{{idVendor}}==\"06a3\", ATTRS{{idProduct}}==\"{:04x}\", MODE=\"0666\"",
            kind,
            kind.product_id()
        )
    } else {
        format!("check that no driver or application has locked the {} panel", kind)
    }
}
