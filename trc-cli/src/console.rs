//! `trc console`: print the records of a trace, optionally following it

use anyhow::{Context, Result};
use clap::Args;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use trc_decoder::{ErrorPolicy, FieldValue, MessageRecord, ReaderConfig, TraceHandle};

#[derive(Args, Debug)]
pub struct ConsoleArgs {
    /// Trace file (*.trc or *.ltrc)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Keep printing records as the trace grows (Ctrl-C to stop)
    #[arg(short, long)]
    pub follow: bool,

    /// With --follow: skip what is already in the trace
    #[arg(long, requires = "follow")]
    pub from_end: bool,

    /// With --follow: poll interval in milliseconds
    #[arg(long, value_name = "MS")]
    pub interval_ms: Option<u64>,

    /// Also print error, event and remote request records
    #[arg(short, long)]
    pub all: bool,

    /// Print one JSON object per record
    #[arg(long)]
    pub json: bool,

    /// Warn about malformed lines instead of stopping
    #[arg(long)]
    pub skip_errors: bool,
}

/// Reader configuration for this run: file config overridden by flags
pub fn reader_config(args: &ConsoleArgs, base: &ReaderConfig) -> ReaderConfig {
    let mut config = base
        .clone()
        .with_messages_only(!args.all)
        .with_start_at_end(args.from_end || base.start_at_end);

    if args.skip_errors {
        config = config.with_error_policy(ErrorPolicy::Skip);
    }
    if let Some(ms) = args.interval_ms {
        config = config.with_poll_interval(Duration::from_millis(ms));
    }

    config
}

pub fn run(args: &ConsoleArgs, base: &ReaderConfig) -> Result<()> {
    let trace = TraceHandle::open(&args.file)
        .with_context(|| format!("Failed to open trace {:?}", args.file))?;
    let config = reader_config(args, base);
    log::info!("{:?}: {} trace, version {}", args.file, trace.protocol(), trace.version());

    let stdout = io::stdout();
    let mut out = stdout.lock();

    let count = if args.follow {
        let follow = trace.follow(&config)?;
        let stop = follow.stop_signal();
        ctrlc::set_handler(move || stop.stop()).context("Failed to set Ctrl-C handler")?;
        print_records(&mut out, follow, args.json)?
    } else {
        print_records(&mut out, trace.records(&config)?, args.json)?
    };

    log::info!("Printed {} records", count);
    Ok(())
}

fn print_records<W, I>(out: &mut W, records: I, json: bool) -> Result<usize>
where
    W: Write,
    I: Iterator<Item = trc_decoder::Result<MessageRecord>>,
{
    let mut count = 0;

    for record in records {
        let record = compact(&record?);
        if json {
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{}", format_record(&record))?;
        }
        out.flush()?;
        count += 1;
    }

    Ok(count)
}

/// Drop empty and `-` values and the `)` suffix of the message number
pub fn compact(record: &MessageRecord) -> MessageRecord {
    record
        .iter()
        .filter(|(_, value)| match value {
            FieldValue::Text(s) => !s.is_empty() && s != "-",
            FieldValue::List(items) => !items.is_empty(),
        })
        .map(|(key, value)| match (key, value) {
            ("#", FieldValue::Text(n)) => (key, FieldValue::Text(n.trim_end_matches(')').to_string())),
            _ => (key, value.clone()),
        })
        .collect()
}

/// One line of `KEY=value` pairs, lists in brackets
pub fn format_record(record: &MessageRecord) -> String {
    record
        .iter()
        .map(|(key, value)| match value {
            FieldValue::Text(s) => format!("{}={}", key, s),
            FieldValue::List(items) => format!("{}=[{}]", key, items.join(" ")),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
