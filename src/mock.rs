//! In-memory panels for testing the manager without hardware.
//!
//! [`MockBackend`] implements [`HidBackend`] over a shared, scriptable
//! device table. Every accepted control transfer is recorded so tests can
//! assert on the exact bytes a real panel would have received, and faults
//! (failed or short writes, slow writes, busy/denied opens, unplugs) can be
//! injected per panel.
//!
//! # Example
//!
//! ```
//! use saitek_panels::mock::MockBackend;
//! use saitek_panels::{Manager, ManagerConfig, PanelKind};
//!
//! let backend = MockBackend::new();
//! backend.attach(PanelKind::Radio);
//!
//! let manager = Manager::with_backend(ManagerConfig::default(), Box::new(backend.clone()));
//! manager.start().unwrap();
//! manager.send_radio("118.00", "118.50", "121.30", "121.90").unwrap();
//! manager.stop();
//!
//! assert_eq!(backend.transfers().len(), 1);
//! ```

use crate::error::{permission_guidance, Error, Result};
use crate::panel::{PanelInfo, PanelKind};
use crate::transport::{ControlRequest, HidBackend, PanelIo};
use log::trace;
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::ffi::CString;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Upper bound on how long an idle mock read sleeps.
const IDLE_READ_SLICE: Duration = Duration::from_millis(2);

/// How an injected open failure presents itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenFailure {
    Busy,
    PermissionDenied,
    NotFound,
}

impl OpenFailure {
    fn into_error(self, kind: PanelKind) -> Error {
        match self {
            OpenFailure::Busy => Error::DeviceBusy { kind },
            OpenFailure::PermissionDenied => Error::PermissionDenied {
                kind,
                message: permission_guidance(kind),
            },
            OpenFailure::NotFound => Error::NotFound { kind },
        }
    }
}

/// One control transfer accepted by a mock panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub kind: PanelKind,
    pub request: ControlRequest,
    pub data: Vec<u8>,
}

#[derive(Debug)]
struct MockDevice {
    info: PanelInfo,
    attached: bool,
    /// Bumped on every unplug; handles from an older generation are dead.
    generation: u64,
    opens: usize,
    open_failures: VecDeque<OpenFailure>,
    write_failures: usize,
    short_writes: usize,
    write_delay: Duration,
    read_failures: usize,
    reports: VecDeque<Vec<u8>>,
}

impl MockDevice {
    fn new(kind: PanelKind) -> Self {
        let path = CString::new(format!("mock://{}", kind.to_string().to_lowercase()))
            .unwrap_or_default();
        MockDevice {
            info: PanelInfo {
                kind,
                path,
                serial_number: Some(format!("MOCK-{:04X}", kind.product_id())),
                product_string: Some(kind.name().to_string()),
                interface_number: 0,
            },
            attached: true,
            generation: 0,
            opens: 0,
            open_failures: VecDeque::new(),
            write_failures: 0,
            short_writes: 0,
            write_delay: Duration::ZERO,
            read_failures: 0,
            reports: VecDeque::new(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    devices: BTreeMap<PanelKind, MockDevice>,
    transfers: Vec<Transfer>,
}

/// A scriptable set of panels. Clones share the same device table.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<State>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plugs in a panel of `kind` (or re-plugs an unplugged one).
    pub fn attach(&self, kind: PanelKind) {
        let mut state = self.state.lock();
        state
            .devices
            .entry(kind)
            .or_insert_with(|| MockDevice::new(kind))
            .attached = true;
    }

    /// Unplugs the panel. Open handles fail from now on, even after a re-plug.
    pub fn unplug(&self, kind: PanelKind) {
        if let Some(device) = self.state.lock().devices.get_mut(&kind) {
            device.attached = false;
            device.generation += 1;
            device.reports.clear();
        }
    }

    /// Plugs a previously unplugged panel back in.
    pub fn plug(&self, kind: PanelKind) {
        self.attach(kind);
    }

    /// The next `count` writes to `kind` fail with `IoFailed`.
    pub fn fail_next_writes(&self, kind: PanelKind, count: usize) {
        self.with_device(kind, |d| d.write_failures += count);
    }

    /// The next write to `kind` reports one byte fewer than it was given.
    pub fn short_next_write(&self, kind: PanelKind) {
        self.with_device(kind, |d| d.short_writes += 1);
    }

    /// Every write to `kind` stalls for `delay` before the device accepts it.
    /// A stall longer than the transfer timeout fails with `IoTimeout` and
    /// nothing is recorded.
    pub fn delay_writes(&self, kind: PanelKind, delay: Duration) {
        self.with_device(kind, |d| d.write_delay = delay);
    }

    /// The next open of `kind` fails with `failure`. Calls queue up.
    pub fn fail_next_open(&self, kind: PanelKind, failure: OpenFailure) {
        self.with_device(kind, |d| d.open_failures.push_back(failure));
    }

    /// The next `count` reads from `kind` fail with `IoFailed`.
    pub fn fail_reads(&self, kind: PanelKind, count: usize) {
        self.with_device(kind, |d| d.read_failures += count);
    }

    /// Queues an input report for the panel's interrupt IN endpoint.
    pub fn push_report(&self, kind: PanelKind, report: &[u8]) {
        self.with_device(kind, |d| d.reports.push_back(report.to_vec()));
    }

    /// Number of queued reports not yet read.
    pub fn pending_reports(&self, kind: PanelKind) -> usize {
        self.state
            .lock()
            .devices
            .get(&kind)
            .map_or(0, |d| d.reports.len())
    }

    /// All accepted transfers, in arrival order.
    pub fn transfers(&self) -> Vec<Transfer> {
        self.state.lock().transfers.clone()
    }

    /// Payloads accepted by one panel, in arrival order.
    pub fn frames(&self, kind: PanelKind) -> Vec<Vec<u8>> {
        self.state
            .lock()
            .transfers
            .iter()
            .filter(|t| t.kind == kind)
            .map(|t| t.data.clone())
            .collect()
    }

    pub fn clear_transfers(&self) {
        self.state.lock().transfers.clear();
    }

    /// How many times `kind` has been opened successfully.
    pub fn open_count(&self, kind: PanelKind) -> usize {
        self.state.lock().devices.get(&kind).map_or(0, |d| d.opens)
    }

    fn with_device(&self, kind: PanelKind, f: impl FnOnce(&mut MockDevice)) {
        let mut state = self.state.lock();
        let device = state
            .devices
            .entry(kind)
            .or_insert_with(|| {
                let mut device = MockDevice::new(kind);
                device.attached = false;
                device
            });
        f(device);
    }
}

impl HidBackend for MockBackend {
    fn enumerate(&mut self) -> Result<Vec<PanelInfo>> {
        Ok(self
            .state
            .lock()
            .devices
            .values()
            .filter(|d| d.attached)
            .map(|d| d.info.clone())
            .collect())
    }

    fn open(&mut self, info: &PanelInfo, _auto_detach: bool) -> Result<Arc<dyn PanelIo>> {
        let kind = info.kind;
        let mut state = self.state.lock();
        let device = state
            .devices
            .get_mut(&kind)
            .filter(|d| d.attached)
            .ok_or(Error::NotFound { kind })?;
        if let Some(failure) = device.open_failures.pop_front() {
            return Err(failure.into_error(kind));
        }
        device.opens += 1;
        trace!("mock: opened {} panel (open #{})", kind, device.opens);
        Ok(Arc::new(MockPanel {
            kind,
            generation: device.generation,
            state: Arc::clone(&self.state),
            closed: AtomicBool::new(false),
        }))
    }
}

/// An open handle onto a [`MockBackend`] panel.
pub struct MockPanel {
    kind: PanelKind,
    generation: u64,
    state: Arc<Mutex<State>>,
    closed: AtomicBool,
}

impl MockPanel {
    fn io_failed(&self, message: &str) -> Error {
        Error::IoFailed {
            kind: self.kind,
            message: message.to_string(),
        }
    }

    /// Runs `f` on the device if this handle is still connected to it.
    fn live_device<T>(
        &self,
        state: &mut State,
        f: impl FnOnce(&mut MockDevice) -> Result<T>,
    ) -> Result<T> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(self.io_failed("handle closed"));
        }
        match state.devices.get_mut(&self.kind) {
            Some(device) if device.attached && device.generation == self.generation => f(device),
            _ => Err(self.io_failed("device disconnected")),
        }
    }
}

impl PanelIo for MockPanel {
    fn kind(&self) -> PanelKind {
        self.kind
    }

    fn control(&self, request: ControlRequest, data: &[u8], timeout: Duration) -> Result<usize> {
        let delay = {
            let mut state = self.state.lock();
            self.live_device(&mut state, |d| Ok(d.write_delay))?
        };
        if delay > timeout {
            thread::sleep(timeout);
            return Err(Error::IoTimeout {
                kind: self.kind,
                timeout,
            });
        }
        if !delay.is_zero() {
            thread::sleep(delay);
        }

        let mut state = self.state.lock();
        let accepted = self.live_device(&mut state, |d| {
            if d.write_failures > 0 {
                d.write_failures -= 1;
                return Err(Error::IoFailed {
                    kind: d.info.kind,
                    message: "injected write failure".to_string(),
                });
            }
            if d.short_writes > 0 {
                d.short_writes -= 1;
                return Ok(None);
            }
            Ok(Some(data.len()))
        })?;

        match accepted {
            Some(n) => {
                state.transfers.push(Transfer {
                    kind: self.kind,
                    request,
                    data: data.to_vec(),
                });
                Ok(n)
            }
            None => Ok(data.len().saturating_sub(1)),
        }
    }

    fn read(&self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let report = {
            let mut state = self.state.lock();
            self.live_device(&mut state, |d| {
                if d.read_failures > 0 {
                    d.read_failures -= 1;
                    return Err(Error::IoFailed {
                        kind: d.info.kind,
                        message: "injected read failure".to_string(),
                    });
                }
                Ok(d.reports.pop_front())
            })?
        };

        match report {
            Some(report) => {
                let n = report.len().min(buf.len());
                buf[..n].copy_from_slice(&report[..n]);
                Ok(n)
            }
            None => {
                thread::sleep(timeout.min(IDLE_READ_SLICE));
                Ok(0)
            }
        }
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}
