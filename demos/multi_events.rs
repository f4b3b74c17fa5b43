use saitek_panels::{
    channel_sink, codes, EventKind, Led, Manager, ManagerConfig, MultiDisplay, PanelKind, Result,
};
use std::time::Duration;

fn led_for(code: u8) -> Option<Led> {
    // The eight push buttons share their bit positions with the LEDs.
    if code <= codes::multi::REV {
        Led::ALL.get(usize::from(code)).copied()
    } else {
        None
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let config = ManagerConfig::default().with_expected(vec![PanelKind::Multi]);
    let manager = Manager::new(config)?;
    let (sink, events) = channel_sink();
    manager.subscribe(sink);
    manager.start()?;

    let mut altitude: i32 = 3000;
    let mut display = MultiDisplay::new("250", &altitude.to_string(), 0);
    if let Err(e) = manager.set_multi_display(&display) {
        eprintln!("Multi panel not ready yet: {}", e);
    }

    println!(
        "Press Multi panel buttons (toggles LEDs), turn the wheel to change the bottom row. \
         Ctrl-C to quit."
    );
    loop {
        let Ok(event) = events.recv_timeout(Duration::from_secs(60)) else {
            break;
        };
        println!(
            "{} {:?} {} {:?}",
            event.panel,
            event.kind,
            event.control_name().unwrap_or("?"),
            event.delta
        );

        match (event.panel, event.kind) {
            (PanelKind::Multi, EventKind::ButtonDown) => {
                if let Some(led) = led_for(event.code) {
                    let lit = display.leds & led.mask() == 0;
                    match manager.set_leds(led.mask(), lit) {
                        Ok(leds) => display.leds = leds,
                        Err(e) => eprintln!("LED update failed: {}", e),
                    }
                }
            }
            (PanelKind::Multi, EventKind::EncoderTick) if event.code == codes::multi::TUNE => {
                altitude += 100 * i32::from(event.delta.unwrap_or(0));
                display.bottom = altitude.to_string();
                if let Err(e) = manager.set_multi_display(&display) {
                    eprintln!("Display update failed: {}", e);
                }
            }
            (_, EventKind::PanelLost) => {
                println!("{} panel lost, waiting for it to come back", event.panel)
            }
            _ => {}
        }
    }

    manager.stop();
    Ok(())
}
