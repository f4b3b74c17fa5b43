//! Input report decoding for all three panels.
//!
//! Every panel sends a small fixed-size report whenever a switch, button or
//! encoder changes. The [`Decoder`] keeps the previous report and turns the
//! difference into [`Event`]s. Codes are the bit index of the control inside
//! the report (`byte * 8 + bit`), see [`codes`].

use crate::panel::PanelKind;
use log::{trace, warn};
use std::sync::mpsc;
use std::time::Instant;

/// What happened on a panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ButtonDown,
    ButtonUp,
    /// One detent of a rotary encoder; see [`Event::delta`].
    EncoderTick,
    /// The panel was demoted after an unrecoverable transport error.
    PanelLost,
}

/// A decoded input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub panel: PanelKind,
    /// Time the report was received.
    pub timestamp: Instant,
    pub kind: EventKind,
    /// Control code from [`codes`]; `0` for [`EventKind::PanelLost`].
    pub code: u8,
    /// `+1` clockwise, `-1` counter-clockwise; only set for encoder ticks.
    pub delta: Option<i8>,
}

impl Event {
    pub fn panel_lost(panel: PanelKind) -> Self {
        Event {
            panel,
            timestamp: Instant::now(),
            kind: EventKind::PanelLost,
            code: 0,
            delta: None,
        }
    }

    /// Name of the control that produced this event, if known.
    pub fn control_name(&self) -> Option<&'static str> {
        codes::name(self.panel, self.code)
    }
}

/// Stable control codes per panel.
pub mod codes {
    use super::{Control, ControlKind};
    use crate::panel::PanelKind;

    /// Radio Panel: two mode selectors, two ACT/STBY buttons, two dual encoders.
    pub mod radio {
        pub const UPPER_COM1: u8 = 0;
        pub const UPPER_COM2: u8 = 1;
        pub const UPPER_NAV1: u8 = 2;
        pub const UPPER_NAV2: u8 = 3;
        pub const UPPER_ADF: u8 = 4;
        pub const UPPER_DME: u8 = 5;
        pub const UPPER_XPDR: u8 = 6;
        pub const LOWER_COM1: u8 = 7;
        pub const LOWER_COM2: u8 = 8;
        pub const LOWER_NAV1: u8 = 9;
        pub const LOWER_NAV2: u8 = 10;
        pub const LOWER_ADF: u8 = 11;
        pub const LOWER_DME: u8 = 12;
        pub const LOWER_XPDR: u8 = 13;
        pub const UPPER_ACT_STBY: u8 = 14;
        pub const LOWER_ACT_STBY: u8 = 15;
        /// Upper encoder, inner knob (two-bit field).
        pub const ENC1_INNER: u8 = 16;
        /// Upper encoder, outer knob.
        pub const ENC1_OUTER: u8 = 18;
        /// Lower encoder, inner knob.
        pub const ENC2_INNER: u8 = 20;
        /// Lower encoder, outer knob.
        pub const ENC2_OUTER: u8 = 22;
    }

    /// Multi Panel: push buttons (same bit order as the LEDs), selector knob,
    /// tuning encoder, auto-throttle, flaps and pitch trim.
    ///
    /// **Note:** This layout is unverified on hardware. Byte 0 holding the
    /// buttons is inferred from a captured HDG press; other tools place the
    /// knob, encoder and AP in byte 0 and HDG..REV with the throttle in byte 1.
    pub mod multi {
        pub const AP: u8 = 0;
        pub const HDG: u8 = 1;
        pub const NAV: u8 = 2;
        pub const IAS: u8 = 3;
        pub const ALT: u8 = 4;
        pub const VS: u8 = 5;
        pub const APR: u8 = 6;
        pub const REV: u8 = 7;
        pub const SEL_ALT: u8 = 8;
        pub const SEL_VS: u8 = 9;
        pub const SEL_IAS: u8 = 10;
        pub const SEL_HDG: u8 = 11;
        pub const SEL_CRS: u8 = 12;
        /// Tuning encoder (two-bit field).
        pub const TUNE: u8 = 13;
        pub const AUTO_THROTTLE: u8 = 15;
        pub const FLAPS_UP: u8 = 16;
        pub const FLAPS_DOWN: u8 = 17;
        pub const TRIM_DOWN: u8 = 18;
        pub const TRIM_UP: u8 = 19;
    }

    /// Flight Instrument Panel: six soft buttons, page up/down, two scroll wheels.
    pub mod fip {
        pub const S1: u8 = 0;
        pub const S2: u8 = 1;
        pub const S3: u8 = 2;
        pub const S4: u8 = 3;
        pub const S5: u8 = 4;
        pub const S6: u8 = 5;
        pub const PAGE_UP: u8 = 6;
        pub const PAGE_DOWN: u8 = 7;
        /// Right scroll wheel (two-bit field).
        pub const RIGHT_WHEEL: u8 = 8;
        /// Left scroll wheel (two-bit field).
        pub const LEFT_WHEEL: u8 = 10;
    }

    const fn button(code: u8, name: &'static str) -> Control {
        Control {
            code,
            name,
            kind: ControlKind::Button,
        }
    }

    const fn encoder(code: u8, name: &'static str) -> Control {
        Control {
            code,
            name,
            kind: ControlKind::Encoder,
        }
    }

    pub(crate) const RADIO: &[Control] = &[
        button(radio::UPPER_COM1, "UPPER_COM1"),
        button(radio::UPPER_COM2, "UPPER_COM2"),
        button(radio::UPPER_NAV1, "UPPER_NAV1"),
        button(radio::UPPER_NAV2, "UPPER_NAV2"),
        button(radio::UPPER_ADF, "UPPER_ADF"),
        button(radio::UPPER_DME, "UPPER_DME"),
        button(radio::UPPER_XPDR, "UPPER_XPDR"),
        button(radio::LOWER_COM1, "LOWER_COM1"),
        button(radio::LOWER_COM2, "LOWER_COM2"),
        button(radio::LOWER_NAV1, "LOWER_NAV1"),
        button(radio::LOWER_NAV2, "LOWER_NAV2"),
        button(radio::LOWER_ADF, "LOWER_ADF"),
        button(radio::LOWER_DME, "LOWER_DME"),
        button(radio::LOWER_XPDR, "LOWER_XPDR"),
        button(radio::UPPER_ACT_STBY, "UPPER_ACT_STBY"),
        button(radio::LOWER_ACT_STBY, "LOWER_ACT_STBY"),
        encoder(radio::ENC1_INNER, "ENC1_INNER"),
        encoder(radio::ENC1_OUTER, "ENC1_OUTER"),
        encoder(radio::ENC2_INNER, "ENC2_INNER"),
        encoder(radio::ENC2_OUTER, "ENC2_OUTER"),
    ];

    pub(crate) const MULTI: &[Control] = &[
        button(multi::AP, "AP"),
        button(multi::HDG, "HDG"),
        button(multi::NAV, "NAV"),
        button(multi::IAS, "IAS"),
        button(multi::ALT, "ALT"),
        button(multi::VS, "VS"),
        button(multi::APR, "APR"),
        button(multi::REV, "REV"),
        button(multi::SEL_ALT, "SEL_ALT"),
        button(multi::SEL_VS, "SEL_VS"),
        button(multi::SEL_IAS, "SEL_IAS"),
        button(multi::SEL_HDG, "SEL_HDG"),
        button(multi::SEL_CRS, "SEL_CRS"),
        encoder(multi::TUNE, "TUNE"),
        button(multi::AUTO_THROTTLE, "AUTO_THROTTLE"),
        button(multi::FLAPS_UP, "FLAPS_UP"),
        button(multi::FLAPS_DOWN, "FLAPS_DOWN"),
        button(multi::TRIM_DOWN, "TRIM_DOWN"),
        button(multi::TRIM_UP, "TRIM_UP"),
    ];

    pub(crate) const FIP: &[Control] = &[
        button(fip::S1, "S1"),
        button(fip::S2, "S2"),
        button(fip::S3, "S3"),
        button(fip::S4, "S4"),
        button(fip::S5, "S5"),
        button(fip::S6, "S6"),
        button(fip::PAGE_UP, "PAGE_UP"),
        button(fip::PAGE_DOWN, "PAGE_DOWN"),
        encoder(fip::RIGHT_WHEEL, "RIGHT_WHEEL"),
        encoder(fip::LEFT_WHEEL, "LEFT_WHEEL"),
    ];

    /// Control table of a panel.
    pub(crate) fn layout(kind: PanelKind) -> &'static [Control] {
        match kind {
            PanelKind::Radio => RADIO,
            PanelKind::Multi => MULTI,
            PanelKind::Fip => FIP,
        }
    }

    /// Name of a control code on the given panel.
    pub fn name(kind: PanelKind, code: u8) -> Option<&'static str> {
        layout(kind).iter().find(|c| c.code == code).map(|c| c.name)
    }

    /// Whether `code` names a rotary encoder on the given panel.
    pub fn is_encoder(kind: PanelKind, code: u8) -> bool {
        layout(kind)
            .iter()
            .any(|c| c.code == code && c.kind == ControlKind::Encoder)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlKind {
    /// One bit: 1 = pressed / switch position active.
    Button,
    /// Two bits: `01` clockwise, `10` counter-clockwise.
    Encoder,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Control {
    code: u8,
    name: &'static str,
    kind: ControlKind,
}

const ENCODER_CW: u32 = 0b01;
const ENCODER_CCW: u32 = 0b10;

/// Per-panel report differ. Owned by the panel's read loop.
#[derive(Debug, Clone)]
pub struct Decoder {
    kind: PanelKind,
    last: u32,
}

impl Decoder {
    /// A decoder that treats every control as released before the first report.
    pub fn new(kind: PanelKind) -> Self {
        Decoder { kind, last: 0 }
    }

    pub fn kind(&self) -> PanelKind {
        self.kind
    }

    /// Forgets the previous report (used after a reconnect).
    pub fn reset(&mut self) {
        self.last = 0;
    }

    /// Decodes `report`, timestamping events with the current time.
    pub fn feed(&mut self, report: &[u8]) -> Vec<Event> {
        self.feed_at(report, Instant::now())
    }

    /// Decodes `report`, stamping every resulting event with `timestamp`.
    ///
    /// Reports shorter than the panel's report size are ignored; extra
    /// trailing bytes are ignored.
    pub fn feed_at(&mut self, report: &[u8], timestamp: Instant) -> Vec<Event> {
        let size = self.kind.report_size();
        if report.len() < size {
            warn!(
                "Ignoring short {} report ({} bytes, expected {}): {:02X?}",
                self.kind,
                report.len(),
                size,
                report
            );
            return Vec::new();
        }
        trace!("{} report: {:02X?}", self.kind, &report[..size]);

        let current = report[..size]
            .iter()
            .enumerate()
            .fold(0u32, |acc, (i, b)| acc | (u32::from(*b) << (8 * i)));
        let previous = self.last;
        self.last = current;
        if current == previous {
            return Vec::new();
        }

        let mut events = Vec::new();
        for control in codes::layout(self.kind) {
            let shift = u32::from(control.code);
            match control.kind {
                ControlKind::Button => {
                    let now = (current >> shift) & 1;
                    let before = (previous >> shift) & 1;
                    if now != before {
                        let kind = if now == 1 {
                            EventKind::ButtonDown
                        } else {
                            EventKind::ButtonUp
                        };
                        events.push(Event {
                            panel: self.kind,
                            timestamp,
                            kind,
                            code: control.code,
                            delta: None,
                        });
                    }
                }
                ControlKind::Encoder => {
                    let now = (current >> shift) & 0b11;
                    let before = (previous >> shift) & 0b11;
                    if now == before {
                        continue;
                    }
                    let delta = match now {
                        ENCODER_CW => 1,
                        ENCODER_CCW => -1,
                        _ => continue,
                    };
                    events.push(Event {
                        panel: self.kind,
                        timestamp,
                        kind: EventKind::EncoderTick,
                        code: control.code,
                        delta: Some(delta),
                    });
                }
            }
        }
        events
    }
}

/// Receives events from the manager's read loops.
///
/// Sinks are called on the reader thread of the panel that produced the
/// event and must not block.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: Event);
}

impl<F> EventSink for F
where
    F: Fn(Event) + Send + Sync,
{
    fn on_event(&self, event: Event) {
        self(event)
    }
}

/// An [`EventSink`] forwarding into a standard channel.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<Event>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Event>) -> Self {
        ChannelSink { tx }
    }
}

impl EventSink for ChannelSink {
    fn on_event(&self, event: Event) {
        // A dropped receiver just means nobody is listening any more.
        let _ = self.tx.send(event);
    }
}

/// Creates a channel-backed sink and the receiver to drain it.
pub fn channel_sink() -> (ChannelSink, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel();
    (ChannelSink::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_unique_per_panel() {
        for kind in PanelKind::ALL {
            let table = codes::layout(kind);
            for (i, a) in table.iter().enumerate() {
                for b in &table[i + 1..] {
                    assert_ne!(a.code, b.code, "{} code {} duplicated", kind, a.code);
                }
                assert!(
                    (a.code as usize) < kind.report_size() * 8,
                    "{} code {} outside report",
                    kind,
                    a.code
                );
            }
        }
    }

    #[test]
    fn test_short_report_ignored() {
        let mut decoder = Decoder::new(PanelKind::Radio);
        assert!(decoder.feed(&[0xFF, 0xFF]).is_empty());
        // Short report must not update the stored state.
        let events = decoder.feed(&[0x01, 0x00, 0x00]);
        assert_eq!(events.len(), 1);
    }

    #[test]
    fn test_unchanged_report_silent() {
        let mut decoder = Decoder::new(PanelKind::Fip);
        assert_eq!(decoder.feed(&[0x01, 0x00]).len(), 1);
        assert!(decoder.feed(&[0x01, 0x00]).is_empty());
    }

    #[test]
    fn test_encoder_both_bits_ignored() {
        let mut decoder = Decoder::new(PanelKind::Fip);
        assert!(decoder.feed(&[0x00, 0b11]).is_empty());
    }

    #[test]
    fn test_control_names() {
        assert_eq!(codes::name(PanelKind::Multi, codes::multi::HDG), Some("HDG"));
        assert_eq!(codes::name(PanelKind::Radio, 23), None);
        assert!(codes::is_encoder(PanelKind::Radio, codes::radio::ENC2_OUTER));
        assert!(!codes::is_encoder(PanelKind::Radio, codes::radio::UPPER_COM1));
    }
}
