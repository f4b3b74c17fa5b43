// tests/hardware_tests.rs
//! Tests against real panels. Run with `cargo test -- --ignored` with the
//! panels plugged in and USB permissions set up.

use hidapi::HidApi;
use saitek_panels::{
    channel_sink, find_panels, Led, Manager, ManagerConfig, PanelKind, PanelStatus, Result,
};
use std::{thread, time::Duration};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// Helper to start a manager, panics if the panel under test is absent
fn start_with(kind: PanelKind) -> Manager {
    let manager = Manager::new(ManagerConfig::default()).expect("Failed to create HID API");
    let panels = manager.start().expect("Failed to start manager");
    assert!(
        panels.contains(kind),
        "No {} panel found. Is it connected and permissions set?",
        kind
    );
    assert_eq!(manager.status(kind), Some(PanelStatus::Open));
    manager
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_enumeration() -> Result<()> {
    init_logger();
    let hid_api = HidApi::new()?;
    let panels = find_panels(&hid_api);
    for panel in &panels {
        println!(
            "{}: path={:?} serial={:?} product={:?}",
            panel.kind, panel.path, panel.serial_number, panel.product_string
        );
    }
    assert!(!panels.is_empty(), "No Saitek panels found");
    Ok(())
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_radio_display_cycle() -> Result<()> {
    init_logger();
    let manager = start_with(PanelKind::Radio);

    manager.send_radio("118.00", "118.50", "121.30", "121.90")?;
    thread::sleep(Duration::from_millis(500));
    manager.send_radio("-", "   12", "128.30", "113.70")?;
    thread::sleep(Duration::from_millis(500));
    manager.send_radio("", "", "", "")?;
    Ok(())
}

#[test]
#[ignore] // Ignore by default, requires hardware
fn test_multi_leds_walk() -> Result<()> {
    init_logger();
    let manager = start_with(PanelKind::Multi);

    manager.send_multi("250", "3000", 0)?;
    for led in Led::ALL {
        manager.set_leds(led.mask(), true)?;
        thread::sleep(Duration::from_millis(150));
    }
    assert_eq!(manager.set_leds(0xFF, false)?, 0x00);
    Ok(())
}

#[test]
#[ignore] // Ignore by default, requires hardware and a human
fn test_multi_button_press() -> Result<()> {
    init_logger();
    let manager = start_with(PanelKind::Multi);
    let (sink, events) = channel_sink();
    manager.subscribe(sink);

    println!("Press any button on the Multi panel within 10 seconds...");
    let event = events
        .recv_timeout(Duration::from_secs(10))
        .expect("No event received");
    println!("Got {:?} ({:?})", event, event.control_name());
    assert_eq!(event.panel, PanelKind::Multi);
    Ok(())
}
