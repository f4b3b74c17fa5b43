//! Input report decoding for the Radio, Multi and FIP panels.

use saitek_panels::{codes, Decoder, Event, EventKind, PanelKind};
use std::time::Instant;

fn summary(events: &[Event]) -> Vec<(EventKind, u8, Option<i8>)> {
    events.iter().map(|e| (e.kind, e.code, e.delta)).collect()
}

#[test]
fn test_multi_hdg_press_release() {
    let mut decoder = Decoder::new(PanelKind::Multi);

    let down = decoder.feed(&[0x02, 0x00, 0x00]);
    assert_eq!(
        summary(&down),
        vec![(EventKind::ButtonDown, codes::multi::HDG, None)]
    );
    assert_eq!(down[0].panel, PanelKind::Multi);
    assert_eq!(down[0].control_name(), Some("HDG"));

    let up = decoder.feed(&[0x00, 0x00, 0x00]);
    assert_eq!(
        summary(&up),
        vec![(EventKind::ButtonUp, codes::multi::HDG, None)]
    );
}

#[test]
fn test_radio_single_clockwise_tick() {
    let mut decoder = Decoder::new(PanelKind::Radio);
    let mut events = decoder.feed(&[0x00, 0x00, 0x01]);
    events.extend(decoder.feed(&[0x00, 0x00, 0x00]));
    assert_eq!(
        summary(&events),
        vec![(EventKind::EncoderTick, codes::radio::ENC1_INNER, Some(1))]
    );
}

#[test]
fn test_radio_counter_clockwise_ticks() {
    let mut decoder = Decoder::new(PanelKind::Radio);
    let mut events = Vec::new();
    for report in [[0x00, 0x00, 0x80], [0x00, 0x00, 0x00], [0x00, 0x00, 0x80]] {
        events.extend(decoder.feed(&report));
    }
    assert_eq!(
        summary(&events),
        vec![
            (EventKind::EncoderTick, codes::radio::ENC2_OUTER, Some(-1)),
            (EventKind::EncoderTick, codes::radio::ENC2_OUTER, Some(-1)),
        ]
    );
}

#[test]
fn test_radio_selectors_and_act_stby() {
    let mut decoder = Decoder::new(PanelKind::Radio);
    // Upper selector on NAV1 (bit 2), lower on COM2 (bit 8), upper ACT/STBY pressed (bit 14).
    let events = decoder.feed(&[0x04, 0x41, 0x00]);
    assert_eq!(
        summary(&events),
        vec![
            (EventKind::ButtonDown, codes::radio::UPPER_NAV1, None),
            (EventKind::ButtonDown, codes::radio::LOWER_COM2, None),
            (EventKind::ButtonDown, codes::radio::UPPER_ACT_STBY, None),
        ]
    );
}

#[test]
fn test_multi_knob_and_tune() {
    let mut decoder = Decoder::new(PanelKind::Multi);
    // Knob on ALT (bit 8).
    let events = decoder.feed(&[0x00, 0x01, 0x00]);
    assert_eq!(
        summary(&events),
        vec![(EventKind::ButtonDown, codes::multi::SEL_ALT, None)]
    );

    // Knob moves to VS, tuning wheel one step clockwise (bits 13..14 = 01).
    let events = decoder.feed(&[0x00, 0x02 | 0x20, 0x00]);
    assert_eq!(
        summary(&events),
        vec![
            (EventKind::ButtonUp, codes::multi::SEL_ALT, None),
            (EventKind::ButtonDown, codes::multi::SEL_VS, None),
            (EventKind::EncoderTick, codes::multi::TUNE, Some(1)),
        ]
    );
}

#[test]
fn test_multi_flaps_and_trim() {
    let mut decoder = Decoder::new(PanelKind::Multi);
    let events = decoder.feed(&[0x00, 0x80, 0x09]);
    assert_eq!(
        summary(&events),
        vec![
            (EventKind::ButtonDown, codes::multi::AUTO_THROTTLE, None),
            (EventKind::ButtonDown, codes::multi::FLAPS_UP, None),
            (EventKind::ButtonDown, codes::multi::TRIM_UP, None),
        ]
    );
}

#[test]
fn test_fip_buttons_and_wheels() {
    let mut decoder = Decoder::new(PanelKind::Fip);
    let events = decoder.feed(&[0x41, 0x00]);
    assert_eq!(
        summary(&events),
        vec![
            (EventKind::ButtonDown, codes::fip::S1, None),
            (EventKind::ButtonDown, codes::fip::PAGE_UP, None),
        ]
    );

    let events = decoder.feed(&[0x00, 0b0000_1001]);
    assert_eq!(
        summary(&events),
        vec![
            (EventKind::ButtonUp, codes::fip::S1, None),
            (EventKind::ButtonUp, codes::fip::PAGE_UP, None),
            (EventKind::EncoderTick, codes::fip::RIGHT_WHEEL, Some(1)),
            (EventKind::EncoderTick, codes::fip::LEFT_WHEEL, Some(-1)),
        ]
    );
}

#[test]
fn test_unknown_bits_ignored() {
    let mut decoder = Decoder::new(PanelKind::Multi);
    // Byte 2 bits 4..7 carry no control.
    assert!(decoder.feed(&[0x00, 0x00, 0xF0]).is_empty());
}

#[test]
fn test_long_report_truncated() {
    let mut decoder = Decoder::new(PanelKind::Fip);
    let events = decoder.feed(&[0x01, 0x00, 0xFF, 0xFF]);
    assert_eq!(
        summary(&events),
        vec![(EventKind::ButtonDown, codes::fip::S1, None)]
    );
}

#[test]
fn test_decoder_is_deterministic() {
    let reports: [[u8; 3]; 5] = [
        [0x02, 0x00, 0x00],
        [0x03, 0x21, 0x00],
        [0x00, 0x41, 0x04],
        [0x00, 0x01, 0x00],
        [0x00, 0x00, 0x00],
    ];

    let run = |timestamp: Instant| {
        let mut decoder = Decoder::new(PanelKind::Multi);
        reports
            .iter()
            .flat_map(|r| decoder.feed_at(r, timestamp))
            .map(|e| (e.kind, e.code, e.delta))
            .collect::<Vec<_>>()
    };

    let early = run(Instant::now());
    std::thread::sleep(std::time::Duration::from_millis(2));
    let late = run(Instant::now());
    assert!(!early.is_empty());
    assert_eq!(early, late);
}

#[test]
fn test_reset_forgets_state() {
    let mut decoder = Decoder::new(PanelKind::Multi);
    decoder.feed(&[0x02, 0x00, 0x00]);
    decoder.reset();
    let events = decoder.feed(&[0x02, 0x00, 0x00]);
    assert_eq!(
        summary(&events),
        vec![(EventKind::ButtonDown, codes::multi::HDG, None)]
    );
}
