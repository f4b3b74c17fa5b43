//! Panel identity: the three supported panel kinds and what discovery reports about them.

use crate::consts;
use std::ffi::CString;
use std::fmt;

/// The Saitek panel families this crate drives.
///
/// Each kind carries its own USB product ID, output frame size and input
/// report size, so code that handles "any panel" dispatches on the kind
/// rather than on separate panel types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PanelKind {
    /// Flight Radio Panel: four 5-digit frequency displays.
    Radio,
    /// Flight Multi Panel: two 5-digit rows and eight button LEDs.
    Multi,
    /// Flight Instrument Panel: 320x240 display with soft buttons.
    Fip,
}

impl PanelKind {
    /// All supported kinds, in discovery order.
    pub const ALL: [PanelKind; 3] = [PanelKind::Radio, PanelKind::Multi, PanelKind::Fip];

    /// USB vendor ID (the same for every panel).
    #[inline]
    pub fn vendor_id(&self) -> u16 {
        consts::SAITEK_VID
    }

    /// USB product ID.
    pub fn product_id(&self) -> u16 {
        match self {
            PanelKind::Radio => consts::RADIO_PID,
            PanelKind::Multi => consts::MULTI_PID,
            PanelKind::Fip => consts::FIP_PID,
        }
    }

    /// Maps a product ID back to its panel kind.
    pub fn from_product_id(pid: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.product_id() == pid)
    }

    /// Human-readable product name.
    pub fn name(&self) -> &'static str {
        match self {
            PanelKind::Radio => "Saitek Flight Radio Panel",
            PanelKind::Multi => "Saitek Flight Multi Panel",
            PanelKind::Fip => "Saitek Flight Instrument Panel",
        }
    }

    /// Size of one input report on the interrupt IN endpoint.
    pub fn report_size(&self) -> usize {
        match self {
            PanelKind::Radio => consts::radio::REPORT_SIZE,
            PanelKind::Multi => consts::multi::REPORT_SIZE,
            PanelKind::Fip => consts::fip::REPORT_SIZE,
        }
    }

    /// Required output frame size, or `None` when frames are opaque (FIP pages).
    pub fn frame_size(&self) -> Option<usize> {
        match self {
            PanelKind::Radio => Some(consts::radio::FRAME_SIZE),
            PanelKind::Multi => Some(consts::multi::FRAME_SIZE),
            PanelKind::Fip => None,
        }
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PanelKind::Radio => "Radio",
            PanelKind::Multi => "Multi",
            PanelKind::Fip => "FIP",
        })
    }
}

/// A panel found during enumeration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelInfo {
    pub kind: PanelKind,
    /// Platform-specific HID path; the handle to reopen this exact device.
    pub path: CString,
    pub serial_number: Option<String>,
    pub product_string: Option<String>,
    pub interface_number: i32,
}

impl PanelInfo {
    /// Info for a panel known only by kind and path.
    pub fn new(kind: PanelKind, path: CString) -> Self {
        PanelInfo {
            kind,
            path,
            serial_number: None,
            product_string: None,
            interface_number: 0,
        }
    }
}

/// The panels present when the manager started, at most one per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelSet {
    panels: Vec<PanelInfo>,
}

impl PanelSet {
    /// Builds a set keeping the first panel found for each kind.
    pub fn from_found(found: impl IntoIterator<Item = PanelInfo>) -> Self {
        let mut panels: Vec<PanelInfo> = Vec::new();
        for info in found {
            if !panels.iter().any(|p| p.kind == info.kind) {
                panels.push(info);
            }
        }
        panels.sort_by_key(|p| p.kind);
        PanelSet { panels }
    }

    pub fn get(&self, kind: PanelKind) -> Option<&PanelInfo> {
        self.panels.iter().find(|p| p.kind == kind)
    }

    pub fn contains(&self, kind: PanelKind) -> bool {
        self.get(kind).is_some()
    }

    pub fn kinds(&self) -> Vec<PanelKind> {
        self.panels.iter().map(|p| p.kind).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PanelInfo> {
        self.panels.iter()
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }
}

/// Connection state of one panel inside the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelStatus {
    /// Known but not opened yet (lazy open).
    Closed,
    /// Handle open, reader and writer running.
    Open,
    /// A transport error occurred; the reconnect thread is trying to reopen it.
    Degraded,
    /// Expected but not currently enumerated.
    Missing,
}
