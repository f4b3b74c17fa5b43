use saitek_panels::{Manager, ManagerConfig, PanelKind, RadioDisplay, Result};
use std::{env, thread, time::Duration};

fn main() -> Result<()> {
    env_logger::init();

    // Frequencies from the command line, e.g. `118.00 118.50 121.30 121.90`
    let args: Vec<String> = env::args().skip(1).collect();
    let field = |i: usize, default: &str| {
        args.get(i)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    };

    let manager = Manager::new(ManagerConfig::default())?;
    let panels = manager.start()?;
    if !panels.contains(PanelKind::Radio) {
        eprintln!("No Radio panel found. Is it connected and are permissions set?");
        return Ok(());
    }

    let display = RadioDisplay::from_frequencies(
        &field(0, "118.00"),
        &field(1, "118.50"),
        &field(2, "121.30"),
        &field(3, "121.90"),
    );
    println!("Showing {:?}", display);
    manager.set_radio_display(&display)?;

    // Count the standby frequency of COM2 up in 25 kHz steps.
    let mut khz = 121_900u32;
    for _ in 0..20 {
        thread::sleep(Duration::from_millis(250));
        khz += 25;
        let standby = format!("{}.{:02}", khz / 1000, (khz % 1000) / 10);
        manager.send_radio(
            &display.com1_active,
            &display.com1_standby,
            &display.com2_active,
            &standby,
        )?;
    }

    manager.stop();
    Ok(())
}
