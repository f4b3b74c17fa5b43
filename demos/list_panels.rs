use hidapi::HidApi;
use saitek_panels::{self, PanelKind, Result};

fn main() -> Result<()> {
    env_logger::init();
    let hid_api = HidApi::new()?;

    println!(
        "Searching for Saitek panels (VID=0x{:04X}, PID=0x{:04X}/0x{:04X}/0x{:04X})...",
        saitek_panels::SAITEK_VID,
        saitek_panels::RADIO_PID,
        saitek_panels::MULTI_PID,
        saitek_panels::FIP_PID
    );
    let panels = saitek_panels::find_panels(&hid_api);

    if panels.is_empty() {
        println!("No panels found.");
        return Ok(());
    }

    println!("Found {} panel(s):", panels.len());
    for (i, info) in panels.iter().enumerate() {
        println!(
            "  {}: {} ({}) PID=0x{:04X}, Interface={}, Path={:?}, Serial='{}', Product='{}'",
            i,
            info.kind,
            info.kind.name(),
            info.kind.product_id(),
            info.interface_number,
            info.path,
            info.serial_number.as_deref().unwrap_or("N/A"),
            info.product_string.as_deref().unwrap_or("N/A"),
        );
    }

    for kind in PanelKind::ALL {
        if !panels.iter().any(|p| p.kind == kind) {
            println!("Not connected: {}", kind.name());
        }
    }
    Ok(())
}
