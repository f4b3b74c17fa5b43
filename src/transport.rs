//! The transport seam between the manager and the USB stack.
//!
//! The manager only needs two blocking primitives per panel, a control OUT
//! and an interrupt IN read, plus a way to enumerate and open panels.
//! [`crate::device`] implements them on top of `hidapi`; [`crate::mock`]
//! implements them in memory for tests.

use crate::consts::control;
use crate::error::Result;
use crate::panel::{PanelInfo, PanelKind};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// The setup packet of a control transfer (without `wLength`, which is the
/// length of the data stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlRequest {
    pub request_type: u8,
    pub request: u8,
    pub value: u16,
    pub index: u16,
}

impl ControlRequest {
    /// HID SET_REPORT, report type 3, report ID 0, interface 0: the request
    /// every panel display/LED update uses.
    pub const SET_REPORT: ControlRequest = ControlRequest {
        request_type: control::BM_REQUEST_TYPE,
        request: control::B_REQUEST,
        value: control::W_VALUE,
        index: control::W_INDEX,
    };

    /// Report type from the high byte of `wValue`.
    #[inline]
    pub fn report_type(&self) -> u8 {
        (self.value >> 8) as u8
    }

    /// Report ID from the low byte of `wValue`.
    #[inline]
    pub fn report_id(&self) -> u8 {
        (self.value & 0xFF) as u8
    }
}

impl fmt::Display for ControlRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bmRequestType=0x{:02X} bRequest=0x{:02X} wValue=0x{:04X} wIndex={}",
            self.request_type, self.request, self.value, self.index
        )
    }
}

/// An open panel handle.
///
/// Implementations must allow one thread to block in [`read`](PanelIo::read)
/// while another issues [`control`](PanelIo::control) transfers.
pub trait PanelIo: Send + Sync {
    fn kind(&self) -> PanelKind;

    /// Performs a control OUT transfer and returns the number of data bytes
    /// the device accepted.
    ///
    /// Returns `IoTimeout` if the transfer could not start within `timeout`;
    /// nothing reached the device in that case. A transfer that started is
    /// allowed to finish.
    fn control(&self, request: ControlRequest, data: &[u8], timeout: Duration) -> Result<usize>;

    /// Reads one input report into `buf`, waiting at most `timeout`.
    /// Returns `Ok(0)` when no report arrived in time.
    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Releases the handle. Later calls fail.
    fn close(&self);
}

/// Enumerates and opens panels.
pub trait HidBackend: Send {
    /// Lists the panels currently attached.
    fn enumerate(&mut self) -> Result<Vec<PanelInfo>>;

    /// Opens `info`, releasing the OS HID driver first when `auto_detach` is set.
    fn open(&mut self, info: &PanelInfo, auto_detach: bool) -> Result<Arc<dyn PanelIo>>;
}
