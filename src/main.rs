use std::env;
use std::rc::Rc;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{info, warn};

use usbfly_model::port::device_handle::{RusbPort, DEFAULT_TIMEOUT};
use usbfly_model::UsbDevice;

/// Read a USB device's descriptors and strings and print the resulting model.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Vendor id, hex (e.g. 1d50)
    #[arg(long, value_parser = parse_hex_u16)]
    vid: u16,

    /// Product id, hex (e.g. 615b)
    #[arg(long, value_parser = parse_hex_u16)]
    pid: u16,

    /// Control transfer timeout (e.g. 500ms, 2s)
    #[arg(long, value_parser = humantime::parse_duration, default_value = "1s")]
    timeout: Duration,

    /// Language id for the JSON summary, hex; defaults to the device's first language
    #[arg(long, value_parser = parse_hex_u16)]
    language: Option<u16>,

    /// Print a JSON summary instead of the text dump
    #[arg(long)]
    json: bool,
}

const DEFAULT_LOG_FILTERS: &str = "info,usbfly_model=debug,rusb=warn";

/// `RUST_LOG` when set, otherwise the default filters.
fn log_filters(rust_log: Option<String>) -> String {
    rust_log
        .filter(|filters| !filters.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTERS.to_string())
}

fn parse_hex_u16(s: &str) -> std::result::Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("'{}' is not a hex u16: {}", s, e))
}

fn main() -> Result<()> {
    pretty_env_logger::formatted_builder()
        .parse_filters(&log_filters(env::var("RUST_LOG").ok()))
        .init();

    let args = Args::parse();
    info!("Starting usbfly-describe v{}", env!("CARGO_PKG_VERSION"));

    if args.timeout != DEFAULT_TIMEOUT {
        info!("Using control transfer timeout {:?}", args.timeout);
    }

    let port = RusbPort::open(args.vid, args.pid, args.timeout).ok_or_else(|| {
        warn!("On Linux, try running with sudo or add udev rules for USB device access");
        anyhow!("No accessible device VID:{:04x} PID:{:04x}", args.vid, args.pid)
    })?;

    let device = UsbDevice::from_port(Rc::new(port)).with_context(|| {
        format!(
            "Failed to read descriptors from VID:{:04x} PID:{:04x}",
            args.vid, args.pid
        )
    })?;

    if args.json {
        let summary = device.summary(args.language);
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print!("{}", device);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_ids() {
        assert_eq!(parse_hex_u16("1d50"), Ok(0x1D50));
        assert_eq!(parse_hex_u16("0x0409"), Ok(0x0409));
        assert!(parse_hex_u16("xyz").is_err());
    }

    #[test]
    fn rust_log_overrides_default_filters() {
        assert_eq!(log_filters(None), DEFAULT_LOG_FILTERS);
        assert_eq!(log_filters(Some(String::new())), DEFAULT_LOG_FILTERS);
        assert_eq!(log_filters(Some("usbfly_model=trace".into())), "usbfly_model=trace");

        let logger = pretty_env_logger::formatted_builder()
            .parse_filters(&log_filters(Some("warn,usbfly_model=trace".into())))
            .build();
        assert_eq!(logger.filter(), log::LevelFilter::Trace);

        let logger = pretty_env_logger::formatted_builder()
            .parse_filters(&log_filters(None))
            .build();
        assert_eq!(logger.filter(), log::LevelFilter::Debug);
    }

    #[test]
    fn parses_arguments() {
        let args = Args::try_parse_from([
            "usbfly-describe", "--vid", "1d50", "--pid", "615b", "--timeout", "250ms", "--json",
        ])
        .unwrap();
        assert_eq!((args.vid, args.pid), (0x1D50, 0x615B));
        assert_eq!(args.timeout, Duration::from_millis(250));
        assert_eq!(args.language, None);
        assert!(args.json);
    }
}
