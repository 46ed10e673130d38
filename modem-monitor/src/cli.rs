//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;
use modem_watch::UsbFilter;

use crate::settings::Settings;

/// Watch for USB modems and report their identity
#[derive(Parser, Debug)]
#[clap(author, version, about)]
pub struct Args {
    /// Track modems with this vendor and product ID (e.g. 12d1:1506)
    #[clap(long = "filter", value_name = "VID:PID", value_parser = parse_filter)]
    pub filters: Vec<UsbFilter>,

    /// Settings file to use instead of the default location
    #[clap(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Seconds between modem list reports
    #[clap(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Print modem lists as JSON
    #[clap(long)]
    pub json: bool,

    /// Wait before talking to a new command port, in milliseconds
    #[clap(long, value_name = "MS")]
    pub settle_ms: Option<u64>,

    /// Idle poll interval, in milliseconds
    #[clap(long, value_name = "MS")]
    pub poll_ms: Option<u64>,

    /// Write the resulting settings back to the settings file
    #[clap(long)]
    pub save: bool,
}

impl Args {
    /// Layer command-line values over `settings`
    pub fn apply(&self, settings: &mut Settings) {
        for filter in &self.filters {
            settings.add_filter(filter.clone());
        }
        if let Some(secs) = self.interval {
            settings.list_interval_secs = secs;
        }
        if self.settle_ms.is_some() {
            settings.settle_ms = self.settle_ms;
        }
        if self.poll_ms.is_some() {
            settings.poll_ms = self.poll_ms;
        }
    }
}

/// Parse `VID:PID` as lowercase hex, the way sysfs reports it
pub fn parse_filter(s: &str) -> Result<UsbFilter, String> {
    let (vid, pid) = s
        .split_once(':')
        .ok_or_else(|| format!("expected VID:PID, got '{}'", s))?;

    for id in [vid, pid] {
        if id.len() != 4 || !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("'{}' is not a four-digit hex ID", id));
        }
    }

    Ok(UsbFilter::new(
        vid.to_ascii_lowercase(),
        pid.to_ascii_lowercase(),
    ))
}
