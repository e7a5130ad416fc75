//! `trc convert`: export traces as CSV tables
//!
//! Every trace becomes one CSV file whose header is the expanded field
//! layout of the trace's dialect. Files are converted in parallel.

use crate::config::ConvertConfig;
use anyhow::{bail, Context, Result};
use clap::Args;
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use trc_decoder::{ErrorPolicy, ReaderConfig, TraceHandle};

#[derive(Args, Debug)]
pub struct ConvertArgs {
    /// Trace files (*.trc or *.ltrc)
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Directory for the CSV files (default: next to each trace)
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// CSV field delimiter
    #[arg(short, long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Only export data messages
    #[arg(long)]
    pub messages_only: bool,

    /// Warn about malformed lines instead of failing the file
    #[arg(long)]
    pub skip_errors: bool,
}

/// Result of converting one trace
#[derive(Debug)]
pub struct Converted {
    pub input: PathBuf,
    pub output: PathBuf,
    pub rows: usize,
}

pub fn run(args: &ConvertArgs, base: &ReaderConfig, settings: &ConvertConfig) -> Result<()> {
    let delimiter = delimiter_byte(args.delimiter.unwrap_or(settings.delimiter))?;
    let output_dir = args.output_dir.as_deref().or(settings.output_dir.as_deref());
    let jobs = plan_outputs(&args.files, output_dir)?;

    if let Some(dir) = output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    }

    let mut config = base.clone();
    if args.messages_only {
        config = config.with_messages_only(true);
    }
    if args.skip_errors {
        config = config.with_error_policy(ErrorPolicy::Skip);
    }

    let results: Vec<Result<Converted>> = jobs
        .par_iter()
        .map(|(input, output)| convert_file(input, output, &config, delimiter))
        .collect();

    let mut failed = 0;
    for result in results {
        match result {
            Ok(converted) => println!(
                "{} -> {} ({} rows)",
                converted.input.display(),
                converted.output.display(),
                converted.rows
            ),
            Err(e) => {
                log::error!("{:#}", e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{} of {} traces failed to convert", failed, args.files.len());
    }
    Ok(())
}

fn delimiter_byte(delimiter: char) -> Result<u8> {
    if !delimiter.is_ascii() {
        bail!("CSV delimiter must be an ASCII character, got {:?}", delimiter);
    }
    Ok(delimiter as u8)
}

/// `bus.trc` becomes `bus.csv`, placed in `output_dir` when given
pub fn output_path(input: &Path, output_dir: Option<&Path>) -> PathBuf {
    let target = input.with_extension("csv");
    match (output_dir, target.file_name()) {
        (Some(dir), Some(name)) => dir.join(name),
        _ => target,
    }
}

/// Pair every input with its CSV path; two inputs may not share one
pub fn plan_outputs<'a>(
    files: &'a [PathBuf],
    output_dir: Option<&Path>,
) -> Result<Vec<(&'a Path, PathBuf)>> {
    let mut claimed: HashMap<PathBuf, &Path> = HashMap::new();
    let mut jobs = Vec::with_capacity(files.len());

    for input in files {
        let output = output_path(input, output_dir);
        if let Some(previous) = claimed.insert(output.clone(), input) {
            bail!(
                "{:?} and {:?} would both be written to {:?}",
                previous,
                input,
                output
            );
        }
        jobs.push((input.as_path(), output));
    }

    Ok(jobs)
}

pub fn convert_file(
    input: &Path,
    output: &Path,
    config: &ReaderConfig,
    delimiter: u8,
) -> Result<Converted> {
    let trace = TraceHandle::open(input)
        .with_context(|| format!("Failed to open trace {:?}", input))?;
    let columns = trace.dialect().field_layout(true);
    let known: HashSet<&str> = columns.iter().map(String::as_str).collect();

    log::debug!("{:?}: {} ({} columns)", input, trace.dialect(), columns.len());

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_path(output)
        .with_context(|| format!("Failed to create {:?}", output))?;
    writer.write_record(&columns)?;

    let mut rows = 0;
    for record in trace.records(config)? {
        let record = record.with_context(|| format!("Failed to read {:?}", input))?;
        let expanded = record.expand();

        let dropped = expanded.keys().filter(|k| !known.contains(k)).count();
        if dropped > 0 {
            log::warn!(
                "{:?}: message {} has {} values beyond the {} layout",
                input,
                record.text("#").unwrap_or("?"),
                dropped,
                trace.dialect()
            );
        }

        writer.write_record(expanded.row(&columns))?;
        rows += 1;
    }
    writer.flush()?;

    log::info!("Wrote {} rows to {:?}", rows, output);
    Ok(Converted {
        input: input.to_path_buf(),
        output: output.to_path_buf(),
        rows,
    })
}
