//! The panel manager: discovery, serialized writes, read loops and reconnects.
//!
//! Each known panel gets a writer thread that drains a FIFO queue of frames;
//! each open panel gets a reader thread that decodes input reports and
//! pushes [`Event`]s to the subscribed sinks. A single reconnect thread
//! reopens panels that were lost or are not plugged in yet.
//!
//! Lock order: `backend` before `panels`. The graveyard and the sink list are
//! leaf locks.

use crate::config::ManagerConfig;
use crate::consts::{multi, MAX_REPORT_SIZE};
use crate::error::{Error, Result};
use crate::frame::{self, MultiDisplay, RadioDisplay};
use crate::input::{Decoder, Event, EventSink};
use crate::panel::{PanelInfo, PanelKind, PanelSet, PanelStatus};
use crate::transport::{ControlRequest, HidBackend, PanelIo};
use log::{debug, error, info, trace, warn};
use parking_lot::{Condvar, Mutex, RwLock};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// What a writer sends back for one command: `Started` when it dequeues the
/// command, then the outcome.
enum Reply<T> {
    Started,
    Done(Result<T>),
}

enum WriteCommand {
    Frame {
        frame: Vec<u8>,
        reply: mpsc::Sender<Reply<()>>,
    },
    Leds {
        mask: u8,
        on: bool,
        reply: mpsc::Sender<Reply<u8>>,
    },
}

/// A write that has been queued but not necessarily sent yet.
///
/// Dropping it does not cancel the write.
#[must_use = "call wait() to learn whether the write succeeded"]
pub struct PendingWrite<T> {
    kind: PanelKind,
    rx: mpsc::Receiver<Reply<T>>,
    deadline: Duration,
}

impl<T> PendingWrite<T> {
    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    /// Blocks until the writer reports the outcome.
    ///
    /// Time spent queued behind earlier writes is not limited. Once the
    /// writer picks the write up, returns `IoTimeout` if no outcome arrives
    /// within the manager's reply deadline. Returns `Closed` if the writer
    /// went away.
    pub fn wait(self) -> Result<T> {
        let mut started = false;
        loop {
            let reply = if started {
                match self.rx.recv_timeout(self.deadline) {
                    Ok(reply) => reply,
                    Err(mpsc::RecvTimeoutError::Timeout) => {
                        return Err(Error::IoTimeout {
                            kind: self.kind,
                            timeout: self.deadline,
                        });
                    }
                    Err(mpsc::RecvTimeoutError::Disconnected) => return Err(Error::Closed),
                }
            } else {
                self.rx.recv().map_err(|_| Error::Closed)?
            };
            match reply {
                Reply::Started => started = true,
                Reply::Done(result) => return result,
            }
        }
    }
}

struct Writer {
    tx: mpsc::Sender<WriteCommand>,
    handle: JoinHandle<()>,
}

struct Reader {
    cancel: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

struct PanelSlot {
    info: Option<PanelInfo>,
    status: PanelStatus,
    io: Option<Arc<dyn PanelIo>>,
    /// Incremented on every successful open. Errors from an older handle
    /// must not demote the current one.
    generation: u64,
    writer: Option<Writer>,
    reader: Option<Reader>,
    permission_denied: bool,
}

impl PanelSlot {
    fn new(info: Option<PanelInfo>) -> Self {
        let status = if info.is_some() {
            PanelStatus::Closed
        } else {
            PanelStatus::Missing
        };
        PanelSlot {
            info,
            status,
            io: None,
            generation: 0,
            writer: None,
            reader: None,
            permission_denied: false,
        }
    }

    /// Cancels the reader and closes the handle.
    fn retire(&mut self, graveyard: &Mutex<Vec<JoinHandle<()>>>) {
        if let Some(reader) = self.reader.take() {
            reader.cancel.store(true, Ordering::SeqCst);
            let mut graveyard = graveyard.lock();
            graveyard.retain(|h| !h.is_finished());
            graveyard.push(reader.handle);
        }
        if let Some(io) = self.io.take() {
            io.close();
        }
    }
}

struct Shared {
    config: ManagerConfig,
    backend: Mutex<Box<dyn HidBackend>>,
    panels: Mutex<BTreeMap<PanelKind, PanelSlot>>,
    sinks: RwLock<Vec<Arc<dyn EventSink>>>,
    started: AtomicBool,
    stopping: AtomicBool,
    wake_lock: Mutex<()>,
    wake: Condvar,
    /// Reader threads of retired handles, joined on stop.
    graveyard: Mutex<Vec<JoinHandle<()>>>,
}

impl Shared {
    fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    fn wake_reconnect(&self) {
        let _guard = self.wake_lock.lock();
        self.wake.notify_all();
    }

    fn dispatch(&self, events: Vec<Event>) {
        let sinks = self.sinks.read();
        for event in events {
            for sink in sinks.iter() {
                sink.on_event(event.clone());
            }
        }
    }

    fn report_lost(&self, kind: PanelKind) {
        error!("{} panel lost; reconnecting in the background", kind);
        self.dispatch(vec![Event::panel_lost(kind)]);
        self.wake_reconnect();
    }

    /// Returns the open handle of `kind`, opening it first if needed.
    fn ensure_open(self: &Arc<Self>, kind: PanelKind) -> Result<(Arc<dyn PanelIo>, u64)> {
        {
            let panels = self.panels.lock();
            let slot = panels.get(&kind).ok_or(Error::NotFound { kind })?;
            if let (PanelStatus::Open, Some(io)) = (slot.status, &slot.io) {
                return Ok((Arc::clone(io), slot.generation));
            }
        }
        self.reopen(kind, None)
    }

    /// (Re)opens `kind`.
    ///
    /// `stale` is the generation of a handle that just failed; if the slot
    /// has already moved past it (another thread reopened the panel), the
    /// current handle is returned instead of opening again.
    fn reopen(
        self: &Arc<Self>,
        kind: PanelKind,
        stale: Option<u64>,
    ) -> Result<(Arc<dyn PanelIo>, u64)> {
        let mut backend = self.backend.lock();

        {
            let mut panels = self.panels.lock();
            if self.is_stopping() {
                return Err(Error::Closed);
            }
            let slot = panels.get_mut(&kind).ok_or(Error::NotFound { kind })?;
            if let (PanelStatus::Open, Some(io)) = (slot.status, &slot.io) {
                if stale != Some(slot.generation) {
                    return Ok((Arc::clone(io), slot.generation));
                }
            }
            slot.retire(&self.graveyard);
        }

        // Paths change across replugs on some platforms, so look the panel up again.
        let found = match backend.enumerate() {
            Ok(found) => found.into_iter().find(|p| p.kind == kind),
            Err(e) => {
                debug!("Enumeration failed while reopening {} panel: {}", kind, e);
                None
            }
        };
        let Some(info) = found else {
            self.set_failed(kind, &Error::NotFound { kind });
            return Err(Error::NotFound { kind });
        };

        let mut delay = self.config.busy_backoff;
        let mut attempt = 0;
        let io = loop {
            match backend.open(&info, self.config.auto_detach_kernel_driver) {
                Ok(io) => break io,
                Err(Error::DeviceBusy { .. })
                    if attempt < self.config.busy_retries && !self.is_stopping() =>
                {
                    attempt += 1;
                    debug!(
                        "{} panel busy, retry {}/{} in {:?}",
                        kind, attempt, self.config.busy_retries, delay
                    );
                    thread::sleep(delay);
                    delay = delay.saturating_mul(2);
                }
                Err(e) => {
                    self.set_failed(kind, &e);
                    return Err(e);
                }
            }
        };

        let mut panels = self.panels.lock();
        let Some(slot) = panels.get_mut(&kind) else {
            io.close();
            return Err(Error::NotFound { kind });
        };
        if self.is_stopping() {
            io.close();
            return Err(Error::Closed);
        }

        slot.generation += 1;
        let generation = slot.generation;
        let cancel = Arc::new(AtomicBool::new(false));
        let handle = {
            let weak = Arc::downgrade(self);
            let io = Arc::clone(&io);
            let cancel = Arc::clone(&cancel);
            let poll = self.config.read_poll_interval;
            thread::Builder::new()
                .name(format!("saitek-{}-reader", kind.to_string().to_lowercase()))
                .spawn(move || read_loop(weak, kind, io, generation, cancel, poll))
        };
        let handle = match handle {
            Ok(handle) => handle,
            Err(e) => {
                io.close();
                slot.status = PanelStatus::Degraded;
                return Err(e.into());
            }
        };

        slot.info = Some(info);
        slot.io = Some(Arc::clone(&io));
        slot.reader = Some(Reader { cancel, handle });
        slot.status = PanelStatus::Open;
        slot.permission_denied = false;
        info!("{} panel open (generation {})", kind, generation);
        Ok((io, generation))
    }

    fn set_failed(&self, kind: PanelKind, err: &Error) {
        let mut panels = self.panels.lock();
        let Some(slot) = panels.get_mut(&kind) else {
            return;
        };
        slot.status = match err {
            Error::NotFound { .. } => PanelStatus::Missing,
            _ => PanelStatus::Degraded,
        };
        if let Error::PermissionDenied { .. } = err {
            if !slot.permission_denied {
                error!("{}", err);
            }
            slot.permission_denied = true;
        }
    }

    fn mark_degraded(&self, kind: PanelKind, generation: u64) {
        let mut panels = self.panels.lock();
        if let Some(slot) = panels.get_mut(&kind) {
            if slot.generation == generation && slot.status == PanelStatus::Open {
                slot.status = PanelStatus::Degraded;
            }
        }
    }

    /// Retires the handle of `generation` after an unrecoverable error.
    /// Returns false if that handle was already replaced or retired.
    fn demote(&self, kind: PanelKind, generation: u64) -> bool {
        let mut panels = self.panels.lock();
        let Some(slot) = panels.get_mut(&kind) else {
            return false;
        };
        if slot.generation != generation || slot.io.is_none() {
            return false;
        }
        slot.retire(&self.graveyard);
        slot.status = PanelStatus::Degraded;
        true
    }

    /// One control transfer, checked for length.
    fn transfer(&self, kind: PanelKind, io: &dyn PanelIo, data: &[u8]) -> Result<()> {
        let started = Instant::now();
        let written = io.control(ControlRequest::SET_REPORT, data, self.config.write_timeout)?;
        if written != data.len() {
            return Err(Error::ShortWrite {
                kind,
                expected: data.len(),
                actual: written,
            });
        }
        trace!("{} panel: wrote {} bytes in {:?}", kind, written, started.elapsed());
        Ok(())
    }

    /// Writes `data`, reopening the panel once on a transport error.
    fn transmit(self: &Arc<Self>, kind: PanelKind, data: &[u8]) -> Result<()> {
        let (io, generation) = self.ensure_open(kind)?;
        let first = match self.transfer(kind, io.as_ref(), data) {
            Ok(()) => return Ok(()),
            Err(e) if e.is_transport() => e,
            Err(e) => return Err(e),
        };
        drop(io);

        warn!("Write to {} panel failed ({}); reopening", kind, first);
        self.mark_degraded(kind, generation);
        let (io, generation) = match self.reopen(kind, Some(generation)) {
            Ok(opened) => opened,
            Err(Error::Closed) => return Err(Error::Closed),
            Err(e @ Error::PermissionDenied { .. }) => {
                self.report_lost(kind);
                return Err(e);
            }
            Err(e) => {
                self.report_lost(kind);
                return Err(Error::IoFailed {
                    kind,
                    message: format!("reopen after '{}' failed: {}", first, e),
                });
            }
        };

        match self.transfer(kind, io.as_ref(), data) {
            Ok(()) => {
                info!("{} panel recovered after reopen", kind);
                Ok(())
            }
            Err(e) => {
                if self.demote(kind, generation) {
                    self.report_lost(kind);
                }
                match e {
                    timeout @ Error::IoTimeout { .. } => Err(timeout),
                    e if e.is_transport() => Err(Error::IoFailed {
                        kind,
                        message: e.to_string(),
                    }),
                    e => Err(e),
                }
            }
        }
    }
}

fn read_loop(
    weak: Weak<Shared>,
    kind: PanelKind,
    io: Arc<dyn PanelIo>,
    generation: u64,
    cancel: Arc<AtomicBool>,
    poll: Duration,
) {
    debug!("{} reader started (generation {})", kind, generation);
    let mut decoder = Decoder::new(kind);
    let mut buf = [0u8; MAX_REPORT_SIZE];

    while !cancel.load(Ordering::SeqCst) {
        match io.read(&mut buf, poll) {
            Ok(0) => continue,
            Ok(n) => {
                let events = decoder.feed(&buf[..n]);
                if events.is_empty() {
                    continue;
                }
                let Some(shared) = weak.upgrade() else {
                    break;
                };
                shared.dispatch(events);
            }
            Err(e) => {
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                warn!("Read from {} panel failed: {}", kind, e);
                if let Some(shared) = weak.upgrade() {
                    if !shared.is_stopping() && shared.demote(kind, generation) {
                        shared.report_lost(kind);
                    }
                }
                break;
            }
        }
    }
    debug!("{} reader stopped (generation {})", kind, generation);
}

fn write_loop(weak: Weak<Shared>, kind: PanelKind, rx: mpsc::Receiver<WriteCommand>) {
    debug!("{} writer started", kind);
    // Last Multi frame that reached the panel; LED updates patch its LED byte.
    let mut shadow: Option<Vec<u8>> = None;

    while let Ok(command) = rx.recv() {
        let Some(shared) = weak.upgrade() else {
            break;
        };
        match command {
            WriteCommand::Frame { frame, reply } => {
                let _ = reply.send(Reply::Started);
                let result = shared.transmit(kind, &frame);
                if result.is_ok() && kind == PanelKind::Multi {
                    shadow = Some(frame);
                }
                let _ = reply.send(Reply::Done(result));
            }
            WriteCommand::Leds { mask, on, reply } => {
                let _ = reply.send(Reply::Started);
                let mut next = shadow
                    .clone()
                    .unwrap_or_else(|| frame::blank_multi_frame(0).to_vec());
                let leds = frame::set_leds(next[multi::LED_OFFSET], mask, on);
                next[multi::LED_OFFSET] = leds;
                let result = shared.transmit(kind, &next).map(|()| leds);
                if result.is_ok() {
                    shadow = Some(next);
                }
                let _ = reply.send(Reply::Done(result));
            }
        }
    }
    debug!("{} writer stopped", kind);
}

fn reconnect_loop(weak: Weak<Shared>, interval: Duration) {
    debug!("Reconnect thread started");
    loop {
        let Some(shared) = weak.upgrade() else {
            break;
        };
        {
            let mut guard = shared.wake_lock.lock();
            if !shared.is_stopping() {
                shared.wake.wait_for(&mut guard, interval);
            }
        }
        if shared.is_stopping() {
            break;
        }

        let pending: Vec<PanelKind> = shared
            .panels
            .lock()
            .iter()
            .filter(|(_, slot)| {
                matches!(slot.status, PanelStatus::Degraded | PanelStatus::Missing)
                    && !slot.permission_denied
            })
            .map(|(kind, _)| *kind)
            .collect();

        for kind in pending {
            if shared.is_stopping() {
                break;
            }
            match shared.reopen(kind, None) {
                Ok(_) => info!("{} panel reconnected", kind),
                Err(e) => trace!("{} panel still unavailable: {}", kind, e),
            }
        }
    }
    debug!("Reconnect thread stopped");
}

/// Owns the panels and every thread that talks to them.
///
/// All methods take `&self`, so a manager can be shared between threads
/// behind an `Arc`. Dropping the manager stops it.
pub struct Manager {
    shared: Arc<Shared>,
    reconnect: Mutex<Option<JoinHandle<()>>>,
}

impl Manager {
    /// Creates a manager driving real panels through hidapi.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        let backend = crate::device::HidApiBackend::new()?;
        Ok(Self::with_backend(config, Box::new(backend)))
    }

    /// Creates a manager on top of any [`HidBackend`].
    pub fn with_backend(config: ManagerConfig, backend: Box<dyn HidBackend>) -> Self {
        Manager {
            shared: Arc::new(Shared {
                config,
                backend: Mutex::new(backend),
                panels: Mutex::new(BTreeMap::new()),
                sinks: RwLock::new(Vec::new()),
                started: AtomicBool::new(false),
                stopping: AtomicBool::new(false),
                wake_lock: Mutex::new(()),
                wake: Condvar::new(),
                graveyard: Mutex::new(Vec::new()),
            }),
            reconnect: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.shared.config
    }

    /// Enumerates panels, starts the writer threads and (with `eager_open`)
    /// opens every panel found.
    ///
    /// Open failures are logged and left to the reconnect thread; only
    /// enumeration or thread creation errors fail the start.
    pub fn start(&self) -> Result<PanelSet> {
        let shared = &self.shared;
        if shared.is_stopping() {
            return Err(Error::Closed);
        }
        shared.config.validate()?;
        if shared.started.swap(true, Ordering::SeqCst) {
            return Ok(self.panel_set());
        }

        let found = match shared.backend.lock().enumerate() {
            Ok(found) => found,
            Err(e) => {
                shared.started.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };
        let set = PanelSet::from_found(found);
        info!("Found {} panel(s): {:?}", set.len(), set.kinds());

        let kinds: BTreeSet<PanelKind> = set
            .kinds()
            .into_iter()
            .chain(shared.config.expected.iter().copied())
            .collect();
        {
            let mut panels = shared.panels.lock();
            for kind in kinds {
                let mut slot = PanelSlot::new(set.get(kind).cloned());
                if slot.status == PanelStatus::Missing {
                    warn!("Expected {} panel is not connected", kind);
                }
                let (tx, rx) = mpsc::channel();
                let weak = Arc::downgrade(shared);
                let handle = thread::Builder::new()
                    .name(format!("saitek-{}-writer", kind.to_string().to_lowercase()))
                    .spawn(move || write_loop(weak, kind, rx))?;
                slot.writer = Some(Writer { tx, handle });
                panels.insert(kind, slot);
            }
        }

        if shared.config.eager_open {
            for info in set.iter() {
                if let Err(e) = shared.reopen(info.kind, None) {
                    warn!("Failed to open {} panel: {}", info.kind, e);
                }
            }
        }

        let weak = Arc::downgrade(shared);
        let interval = shared.config.reconnect_interval;
        let handle = thread::Builder::new()
            .name("saitek-reconnect".to_string())
            .spawn(move || reconnect_loop(weak, interval))?;
        *self.reconnect.lock() = Some(handle);

        Ok(set)
    }

    /// Stops every thread and closes every panel.
    ///
    /// Queued writes are still sent; later calls fail with [`Error::Closed`].
    /// Returns once all threads have exited. Calling it again is a no-op.
    pub fn stop(&self) {
        let shared = &self.shared;
        if shared.stopping.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Stopping panel manager");
        shared.wake_reconnect();
        if let Some(handle) = self.reconnect.lock().take() {
            let _ = handle.join();
        }

        let writers: Vec<Writer> = shared
            .panels
            .lock()
            .values_mut()
            .filter_map(|slot| slot.writer.take())
            .collect();
        for writer in writers {
            drop(writer.tx);
            let _ = writer.handle.join();
        }

        {
            let mut panels = shared.panels.lock();
            for slot in panels.values_mut() {
                slot.retire(&shared.graveyard);
                slot.status = PanelStatus::Closed;
            }
        }
        let readers: Vec<JoinHandle<()>> = shared.graveyard.lock().drain(..).collect();
        for handle in readers {
            let _ = handle.join();
        }
        info!("Panel manager stopped");
    }

    /// True between a successful [`start`](Self::start) and [`stop`](Self::stop).
    pub fn is_running(&self) -> bool {
        self.shared.started.load(Ordering::SeqCst) && !self.shared.is_stopping()
    }

    /// Queues `frame` for `kind` without waiting for it to be sent.
    ///
    /// Radio and Multi frames must be exactly 22 and 12 bytes; FIP frames
    /// are passed through as-is.
    pub fn enqueue(&self, kind: PanelKind, frame: Vec<u8>) -> Result<PendingWrite<()>> {
        if let Some(expected) = kind.frame_size() {
            if frame.len() != expected {
                return Err(Error::InvalidFrame {
                    kind,
                    expected,
                    actual: frame.len(),
                });
            }
        }
        let (reply, rx) = mpsc::channel();
        self.submit(kind, WriteCommand::Frame { frame, reply })?;
        Ok(self.pending(kind, rx))
    }

    /// Sends `frame` to `kind` and waits for the transfer to finish.
    pub fn send(&self, kind: PanelKind, frame: &[u8]) -> Result<()> {
        self.enqueue(kind, frame.to_vec())?.wait()
    }

    /// Shows four frequencies on the Radio Panel.
    pub fn send_radio(&self, com1a: &str, com1s: &str, com2a: &str, com2s: &str) -> Result<()> {
        let strict = self.shared.config.strict;
        let frame = frame::build_radio_frame_with(com1a, com1s, com2a, com2s, strict)?;
        self.send(PanelKind::Radio, &frame)
    }

    /// Shows two rows and sets the LED mask on the Multi Panel.
    pub fn send_multi(&self, top: &str, bottom: &str, leds: u8) -> Result<()> {
        let frame = frame::build_multi_frame_with(top, bottom, leds, self.shared.config.strict)?;
        self.send(PanelKind::Multi, &frame)
    }

    pub fn set_radio_display(&self, display: &RadioDisplay) -> Result<()> {
        let frame = display.to_frame(self.shared.config.strict)?;
        self.send(PanelKind::Radio, &frame)
    }

    pub fn set_multi_display(&self, display: &MultiDisplay) -> Result<()> {
        let frame = display.to_frame(self.shared.config.strict)?;
        self.send(PanelKind::Multi, &frame)
    }

    /// Turns the Multi Panel LEDs in `mask` on or off, keeping the rows
    /// last sent. Returns the new LED byte.
    pub fn set_leds(&self, mask: u8, on: bool) -> Result<u8> {
        let (reply, rx) = mpsc::channel();
        self.submit(PanelKind::Multi, WriteCommand::Leds { mask, on, reply })?;
        self.pending(PanelKind::Multi, rx).wait()
    }

    /// Writes an opaque output report (page bitmap) to the FIP.
    pub fn send_fip(&self, data: &[u8]) -> Result<()> {
        self.send(PanelKind::Fip, data)
    }

    /// Registers a sink for input events from every panel.
    pub fn subscribe<S: EventSink + 'static>(&self, sink: S) {
        self.shared.sinks.write().push(Arc::new(sink));
    }

    /// Connection state of `kind`, or `None` if the manager does not track it.
    pub fn status(&self, kind: PanelKind) -> Option<PanelStatus> {
        self.shared.panels.lock().get(&kind).map(|slot| slot.status)
    }

    /// Every tracked panel with its state.
    pub fn panels(&self) -> Vec<(PanelKind, PanelStatus)> {
        self.shared
            .panels
            .lock()
            .iter()
            .map(|(kind, slot)| (*kind, slot.status))
            .collect()
    }

    fn panel_set(&self) -> PanelSet {
        PanelSet::from_found(
            self.shared
                .panels
                .lock()
                .values()
                .filter_map(|slot| slot.info.clone()),
        )
    }

    fn submit(&self, kind: PanelKind, command: WriteCommand) -> Result<()> {
        let panels = self.shared.panels.lock();
        if self.shared.is_stopping() {
            return Err(Error::Closed);
        }
        let slot = panels.get(&kind).ok_or(Error::NotFound { kind })?;
        let writer = slot.writer.as_ref().ok_or(Error::Closed)?;
        writer.tx.send(command).map_err(|_| Error::Closed)
    }

    fn pending<T>(&self, kind: PanelKind, rx: mpsc::Receiver<Reply<T>>) -> PendingWrite<T> {
        PendingWrite {
            kind,
            rx,
            deadline: self.shared.config.reply_deadline(),
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.stop();
    }
}
