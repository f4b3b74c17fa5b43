//! # saitek-panels
//!
//! A Rust crate for driving the Saitek (now Logitech) Flight Simulator
//! panels over USB HID:
//!
//! *   **Flight Radio Panel** (`06A3:0D05`): four 5-digit frequency displays,
//!     two mode selectors, two dual concentric encoders.
//! *   **Flight Multi Panel** (`06A3:0D06`): two 5-digit rows, eight button
//!     LEDs, selector knob, tuning encoder, auto-throttle, flaps and trim.
//! *   **Flight Instrument Panel** (`06A3:A2AE`): soft buttons and scroll
//!     wheels; its display is driven as an opaque byte pipe.
//!
//! This crate uses the `hidapi` crate for cross-platform USB HID communication.
//!
//! ## Features
//!
//! *   Panel discovery without opening anything (`find_panels`).
//! *   Seven-segment glyph codec (`glyph::encode`, `glyph::decode`), with a
//!     strict mode that rejects misplaced decimal points and undisplayable
//!     characters.
//! *   Pure frame builders for the Radio (22 bytes) and Multi (12 bytes)
//!     panels (`build_radio_frame`, `build_multi_frame`, `Led`).
//! *   Input decoding into typed button/encoder events (`Decoder`, `codes`).
//! *   A `Manager` that owns the panels:
//!     *   One writer thread per panel; writes are strictly FIFO.
//!     *   One reader thread per open panel, pushing `Event`s to `EventSink`s.
//!     *   Transparent reopen-and-retry on a failed write, `PanelLost`
//!         events when recovery fails.
//!     *   Background reconnect of unplugged or degraded panels.
//!     *   Multi Panel LED updates that keep the last displayed rows (`set_leds`).
//! *   An in-memory backend (`mock::MockBackend`) for testing code built on
//!     the manager without hardware.
//!
//! ## Installation
//!
//! ```toml
//! [dependencies]
//! saitek-panels = "0.1.0"
//! log = "0.4"          # Optional, for logging
//!
//! [dev-dependencies]
//! env_logger = "0.11"
//! ```
//!
//! You also need the `hidapi` library installed on your system. See the [`hidapi` crate documentation](https://docs.rs/hidapi/) for details.
//!
//! ## Basic Usage
//!
//! ```no_run
//! use saitek_panels::{codes, EventKind, Led, Manager, ManagerConfig, PanelKind, Result};
//!
//! fn main() -> Result<()> {
//!     // Optional: Initialize logging
//!     // env_logger::init();
//!
//!     let manager = Manager::new(ManagerConfig::default())?;
//!     manager.subscribe(|event: saitek_panels::Event| {
//!         if event.panel == PanelKind::Multi
//!             && event.kind == EventKind::ButtonDown
//!             && event.code == codes::multi::HDG
//!         {
//!             println!("HDG pressed");
//!         }
//!     });
//!
//!     let panels = manager.start()?;
//!     println!("Found: {:?}", panels.kinds());
//!
//!     if panels.contains(PanelKind::Radio) {
//!         manager.send_radio("118.00", "118.50", "121.30", "121.90")?;
//!     }
//!     if panels.contains(PanelKind::Multi) {
//!         manager.send_multi("250", "3000", Led::Hdg.mask())?;
//!         manager.set_leds(Led::Alt.mask(), true)?;
//!     }
//!
//!     manager.stop();
//!     Ok(())
//! }
//! ```
//!
//! ## Display Encoding
//!
//! Each display field has five cells. A `.` lights the decimal point of the
//! cell to its left and takes no cell of its own, so `"118.25"` fits.
//! Radio fields are left-aligned; Multi rows are right-aligned. More than
//! five glyphs is an `Error::EncodeOverflow`.
//!
//! ## Platform Notes
//!
//! *   **Linux udev Rules:** Grant user permission to the panels. Create `/etc/udev/rules.d/99-saitek.rules`:
//!     ```udev
//!     # Saitek Flight Radio, Multi and Instrument panels
//!     SUBSYSTEM=="hidraw", ATTRS{idVendor}=="06a3", ATTRS{idProduct}=="0d05", MODE="0666", GROUP="plugdev"
//!     SUBSYSTEM=="hidraw", ATTRS{idVendor}=="06a3", ATTRS{idProduct}=="0d06", MODE="0666", GROUP="plugdev"
//!     SUBSYSTEM=="hidraw", ATTRS{idVendor}=="06a3", ATTRS{idProduct}=="a2ae", MODE="0666", GROUP="plugdev"
//!     ```
//!     Reload: `sudo udevadm control --reload-rules && sudo udevadm trigger`
//! *   **macOS:** Reading panel input requires Input Monitoring permission
//!     for the host application (System Settings > Privacy & Security).
//!     Without it opens fail with `Error::PermissionDenied`, whose message
//!     says what to enable.
//!
//! ## License
//!
//! This project is licensed under the WTFPL.

pub mod config;
pub mod consts;
pub mod device;
mod error;
pub mod frame;
pub mod glyph;
pub mod input;
pub mod manager;
pub mod mock;
pub mod panel;
pub mod transport;

pub use config::ManagerConfig;
pub use consts::{FIP_PID, MULTI_PID, RADIO_PID, SAITEK_VID};
pub use device::{find_panel, find_panels, HidApiBackend, HidPanel};
pub use error::{Error, Result};
pub use frame::{
    build_multi_frame, build_radio_frame, format_frequency, format_multi_value, Led, MultiDisplay,
    MultiFrame, RadioDisplay, RadioFrame,
};
pub use input::{channel_sink, codes, ChannelSink, Decoder, Event, EventKind, EventSink};
pub use manager::{Manager, PendingWrite};
pub use panel::{PanelInfo, PanelKind, PanelSet, PanelStatus};
pub use transport::{ControlRequest, HidBackend, PanelIo};
