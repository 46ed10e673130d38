//! Modem list output

use std::collections::HashMap;
use std::io::Write;

use modem_watch::Modem;

/// Write `modems` as an aligned table, sorted by USB path
pub fn write_table<W: Write>(out: &mut W, modems: &HashMap<String, Modem>) -> std::io::Result<()> {
    if modems.is_empty() {
        return writeln!(out, "No modems ready");
    }

    let mut rows: Vec<_> = modems.iter().collect();
    rows.sort_by(|a, b| a.0.cmp(b.0));

    writeln!(
        out,
        "{:<24} {:<10} {:<16} {}",
        "USB DEVICE", "INTERFACE", "PORT", "IDENTIFIER"
    )?;
    for (path, modem) in rows {
        writeln!(
            out,
            "{:<24} {:<10} {:<16} {}",
            path,
            modem.network_interface.as_deref().unwrap_or("-"),
            modem.serial_port.as_deref().unwrap_or("-"),
            modem.hardware_id.as_deref().unwrap_or("-"),
        )?;
    }
    Ok(())
}

/// Write `modems` as one JSON object per line
pub fn write_json<W: Write>(out: &mut W, modems: &HashMap<String, Modem>) -> anyhow::Result<()> {
    serde_json::to_writer(&mut *out, modems)?;
    writeln!(out)?;
    Ok(())
}
