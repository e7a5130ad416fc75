//! PEAK Trace Reader CLI Application
//!
//! Command-line front end for the trc-decoder library:
//! - `console`: print (or follow) the records of a trace
//! - `convert`: export traces as CSV tables
//! - `info`: show the header and record statistics of traces

use anyhow::{Context, Result};
use chrono::{Duration, NaiveDateTime};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use trc_decoder::{ErrorPolicy, MessageKind, ReaderConfig, TraceHandle};

mod config;
mod console;
mod convert;

use config::AppConfig;

/// PEAK Trace Reader - Read CAN and LIN text traces
#[derive(Parser, Debug)]
#[command(name = "trc")]
#[command(about = "Read PEAK CAN (*.trc) and LIN (*.ltrc) text traces", long_about = None)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the records of a trace
    Console(console::ConsoleArgs),
    /// Convert traces to CSV files
    Convert(convert::ConvertArgs),
    /// Show header and record statistics of traces
    Info {
        /// Trace files (*.trc or *.ltrc)
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.verbose, args.quiet);

    log::info!("PEAK Trace Reader v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", trc_decoder::VERSION);

    let app = match &args.config {
        Some(path) => config::load_config(path)?,
        None => AppConfig::default(),
    };

    match &args.command {
        Command::Console(console_args) => console::run(console_args, &app.reader),
        Command::Convert(convert_args) => convert::run(convert_args, &app.reader, &app.convert),
        Command::Info { files } => {
            for file in files {
                show_info(file)?;
            }
            Ok(())
        }
    }
}

fn show_info(path: &Path) -> Result<()> {
    let trace = TraceHandle::open(path).with_context(|| format!("Failed to open trace {:?}", path))?;
    let header = trace.header()?;

    // Count every record; malformed lines are reported and skipped
    let config = ReaderConfig::new().with_error_policy(ErrorPolicy::Skip);
    let mut counts = [0usize; 4];
    let mut last_offset = None;
    for record in trace.records(&config)? {
        let record = record?;
        if let Some(offset) = record.text("TIMESTAMP") {
            last_offset = Some(offset.to_string());
        }
        let slot = match trace.dialect().classify(&record) {
            MessageKind::Data => 0,
            MessageKind::RemoteRequest => 1,
            MessageKind::Error => 2,
            MessageKind::Event => 3,
        };
        counts[slot] += 1;
    }

    let end_time = header
        .start_time
        .zip(last_offset)
        .and_then(|(start, offset)| time_at(start, &offset));

    println!("{}", path.display());
    println!("  Dialect:    {}", trace.dialect());
    println!("  Start time: {}", format_time(header.start_time));
    println!("  End time:   {}", format_time(end_time));
    if let Some(columns) = &header.columns {
        println!("  Columns:    {}", columns.join(","));
    }
    println!(
        "  Records:    {} data, {} remote request, {} error, {} event",
        counts[0], counts[1], counts[2], counts[3]
    );
    Ok(())
}

/// Absolute time of a record whose TIMESTAMP is `offset_ms` after `start`
fn time_at(start: NaiveDateTime, offset_ms: &str) -> Option<NaiveDateTime> {
    let millis: f64 = offset_ms.parse().ok()?;
    if !millis.is_finite() {
        return None;
    }
    start.checked_add_signed(Duration::microseconds((millis * 1000.0).round() as i64))
}

fn format_time(time: Option<NaiveDateTime>) -> String {
    match time {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => "-".to_string(),
    }
}

/// Initialize logging based on verbosity
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;
    use std::io::Write;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2009, 3, 6)
            .and_then(|d| d.and_hms_milli_opt(16, 15, 12, 317))
            .unwrap()
    }

    #[test]
    fn test_time_at_offset() {
        assert_eq!(
            time_at(start(), "1841.5"),
            NaiveDate::from_ymd_opt(2009, 3, 6).and_then(|d| d.and_hms_micro_opt(16, 15, 14, 158_500))
        );
        assert_eq!(time_at(start(), "0"), Some(start()));
        assert_eq!(time_at(start(), "1)"), None);
        assert_eq!(time_at(start(), "inf"), None);
    }

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(Some(start())), "2009-03-06 16:15:12.317");
        assert_eq!(format_time(None), "-");
    }
}
