//! Panel discovery and `hidapi`-backed handles.

use crate::consts::control;
use crate::error::{permission_guidance, Error, Result};
use crate::panel::{PanelInfo, PanelKind};
use crate::transport::{ControlRequest, HidBackend, PanelIo};
use hidapi::{HidApi, HidDevice, HidError};
use log::{debug, trace, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

// HID report types carried in the high byte of wValue.
const REPORT_TYPE_OUTPUT: u8 = 0x02;
const REPORT_TYPE_FEATURE: u8 = 0x03;

/// Finds all attached Saitek panels.
///
/// Uses the device list cached by `hid_api`; call `refresh_devices()` first
/// to pick up hot-plugged panels.
pub fn find_panels(hid_api: &HidApi) -> Vec<PanelInfo> {
    hid_api
        .device_list()
        .filter(|info| info.vendor_id() == crate::consts::SAITEK_VID)
        .filter_map(|info| {
            let kind = PanelKind::from_product_id(info.product_id())?;
            debug!(
                "Found {} panel: VID={:04X}, PID={:04X}, Path={:?}, SN={:?}",
                kind,
                info.vendor_id(),
                info.product_id(),
                info.path(),
                info.serial_number()
            );
            Some(PanelInfo {
                kind,
                path: info.path().to_owned(),
                serial_number: info.serial_number().map(|s| s.to_string()),
                product_string: info.product_string().map(|s| s.to_string()),
                interface_number: info.interface_number(),
            })
        })
        .collect()
}

/// Finds the first attached panel of `kind`.
pub fn find_panel(hid_api: &HidApi, kind: PanelKind) -> Result<PanelInfo> {
    find_panels(hid_api)
        .into_iter()
        .find(|p| p.kind == kind)
        .ok_or(Error::NotFound { kind })
}

/// Maps an open failure onto the panel error taxonomy.
///
/// hidapi only reports a message, so the platform error text is inspected:
/// `EACCES`/`kIOReturnNotPermitted` mean permission, `EBUSY`/
/// `kIOReturnExclusiveAccess` mean another process holds the device.
pub(crate) fn classify_open_error(kind: PanelKind, err: &HidError) -> Error {
    let message = err.to_string();
    let lower = message.to_lowercase();
    if lower.contains("permission")
        || lower.contains("not permitted")
        || lower.contains("access denied")
        || lower.contains("e00002e2")
    {
        Error::PermissionDenied {
            kind,
            message: permission_guidance(kind),
        }
    } else if lower.contains("busy") || lower.contains("exclusive") || lower.contains("e00002c5") {
        Error::DeviceBusy { kind }
    } else if lower.contains("no such") || lower.contains("not found") {
        Error::NotFound { kind }
    } else {
        Error::IoFailed { kind, message }
    }
}

/// The process-wide hidapi context, owned by a [`Manager`](crate::Manager).
pub struct HidApiBackend {
    api: HidApi,
}

impl HidApiBackend {
    /// Initializes hidapi.
    pub fn new() -> Result<Self> {
        let api = HidApi::new()?;
        Ok(HidApiBackend { api })
    }

    /// Wraps an existing hidapi context.
    pub fn from_api(api: HidApi) -> Self {
        HidApiBackend { api }
    }

    pub fn api(&self) -> &HidApi {
        &self.api
    }
}

impl HidBackend for HidApiBackend {
    fn enumerate(&mut self) -> Result<Vec<PanelInfo>> {
        if let Err(e) = self.api.refresh_devices() {
            debug!("Failed to refresh device list: {}", e);
        }
        Ok(find_panels(&self.api))
    }

    fn open(&mut self, info: &PanelInfo, auto_detach: bool) -> Result<Arc<dyn PanelIo>> {
        // Exclusive open is how hidapi detaches the macOS HID driver; hidraw
        // on Linux shares the device with the kernel driver already.
        #[cfg(target_os = "macos")]
        {
            self.api.set_open_exclusive(auto_detach);
        }
        #[cfg(not(target_os = "macos"))]
        {
            trace!("auto_detach={} has no effect on this platform", auto_detach);
        }

        let device = self
            .api
            .open_path(&info.path)
            .map_err(|e| classify_open_error(info.kind, &e))?;
        debug!("Opened {} panel at {:?}", info.kind, info.path);
        Ok(Arc::new(HidPanel::new(info.kind, device)))
    }
}

/// An open panel backed by a `hidapi` device handle.
///
/// The handle sits behind a mutex so the read loop and the writer can share
/// it. Reads hold it for one short timeout at a time; a writer waits at most
/// its transfer timeout for it.
pub struct HidPanel {
    kind: PanelKind,
    device: Mutex<Option<HidDevice>>,
}

impl HidPanel {
    pub fn new(kind: PanelKind, device: HidDevice) -> Self {
        HidPanel {
            kind,
            device: Mutex::new(Some(device)),
        }
    }

    fn io_error(&self, e: impl std::fmt::Display) -> Error {
        Error::IoFailed {
            kind: self.kind,
            message: e.to_string(),
        }
    }
}

impl PanelIo for HidPanel {
    fn kind(&self) -> PanelKind {
        self.kind
    }

    fn control(&self, request: ControlRequest, data: &[u8], timeout: Duration) -> Result<usize> {
        if request.request_type != control::BM_REQUEST_TYPE
            || request.request != control::B_REQUEST
        {
            return Err(Error::Unsupported(format!(
                "hidapi can only issue SET_REPORT, not {}",
                request
            )));
        }

        let mut buf = Vec::with_capacity(data.len() + 1);
        buf.push(request.report_id());
        buf.extend_from_slice(data);
        trace!("{} control OUT ({}): {:02X?}", self.kind, request, data);

        // The reader holds the handle for at most one poll interval.
        let guard = self
            .device
            .try_lock_for(timeout)
            .ok_or(Error::IoTimeout {
                kind: self.kind,
                timeout,
            })?;
        let device = guard.as_ref().ok_or_else(|| self.io_error("handle closed"))?;
        let started = Instant::now();
        let written = match request.report_type() {
            REPORT_TYPE_FEATURE => {
                device
                    .send_feature_report(&buf)
                    .map_err(|e| self.io_error(e))?;
                data.len()
            }
            REPORT_TYPE_OUTPUT => {
                let written = device.write(&buf).map_err(|e| self.io_error(e))?;
                if written < buf.len() {
                    warn!(
                        "hidapi write returned unexpected length: {} (expected {})",
                        written,
                        buf.len()
                    );
                }
                written.saturating_sub(1)
            }
            other => {
                return Err(Error::Unsupported(format!(
                    "report type 0x{:02X} cannot be written",
                    other
                )));
            }
        };
        // hidapi cannot abort a transfer in flight, so a slow one still counts.
        let elapsed = started.elapsed();
        if elapsed > timeout {
            warn!(
                "{} panel took {:?} to accept a {} byte report",
                self.kind,
                elapsed,
                data.len()
            );
        }
        Ok(written)
    }

    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let guard = self.device.lock();
        let device = guard.as_ref().ok_or_else(|| self.io_error("handle closed"))?;
        let timeout_ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let n = device
            .read_timeout(buf, timeout_ms)
            .map_err(|e| self.io_error(e))?;
        if n > 0 {
            trace!("{} interrupt IN ({} bytes): {:02X?}", self.kind, n, &buf[..n]);
        }
        Ok(n)
    }

    fn close(&self) {
        if self.device.lock().take().is_some() {
            debug!("Closed {} panel handle", self.kind);
        }
    }
}
