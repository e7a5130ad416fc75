//! Trace header sniffing
//!
//! The first line of a trace names its file version (`;$FILEVERSION=2.1`).
//! CAN traces from before versioning start with `;###` instead and are
//! version 1.0. The rest of the leading comment block may carry a start
//! time and a column list.

use crate::tokenizer::{decode_line, COMMENT};
use crate::types::{Protocol, Result, TraceError};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

const VERSION_MARKER: &str = ";$FILEVERSION=";
const START_TIME_MARKER: &str = ";$STARTTIME=";
const COLUMNS_MARKER: &str = ";$COLUMNS=";
const LEGACY_MARKER: &str = ";###";
const LEGACY_START_TIME_MARKER: &str = "Start time:";
const LEGACY_START_TIME_FORMAT: &str = "%d.%m.%Y %H:%M:%S%.f";

/// Longest first line the sniffer looks at
const MAX_HEADER_LINE: u64 = 4096;

/// Version assumed for unversioned CAN traces
const LEGACY_VERSION: &str = "1.0";

const MICROS_PER_DAY: i64 = 24 * 60 * 60 * 1_000_000;

/// Extract the file version from a trace's first line
pub fn version_from_line(line: &str, protocol: Protocol) -> Option<String> {
    let line = line.trim_start_matches('\u{feff}');

    if let Some(token) = line
        .strip_prefix(VERSION_MARKER)
        .and_then(|rest| rest.split_whitespace().next())
    {
        return Some(token.to_string());
    }

    if protocol == Protocol::Can && line.starts_with(LEGACY_MARKER) {
        return Some(LEGACY_VERSION.to_string());
    }

    None
}

/// Read the version of the trace at `path`
///
/// Only the first line is read, and no more than a few kilobytes of it.
pub fn sniff_version(path: &Path, protocol: Protocol) -> Result<String> {
    let mut reader = BufReader::new(File::open(path)?).take(MAX_HEADER_LINE);
    let mut first = Vec::new();
    reader.read_until(b'\n', &mut first)?;

    let version = version_from_line(&decode_line(&first), protocol).ok_or_else(|| {
        TraceError::VersionNotFound {
            path: path.to_path_buf(),
        }
    })?;

    log::debug!("Sniffed {} version {} from {:?}", protocol, version, path);
    Ok(version)
}

/// Directives found in the leading comment block of a trace
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TraceHeader {
    /// `$FILEVERSION` of the first line (or the legacy default)
    pub version: Option<String>,
    /// `$STARTTIME`, decoded; legacy traces give a `Start time:` comment
    pub start_time: Option<NaiveDateTime>,
    /// `$COLUMNS`, split on commas
    pub columns: Option<Vec<String>>,
}

impl TraceHeader {
    /// Read the comment block at the top of `path`
    ///
    /// Stops at the first line that is not a comment.
    pub fn read(path: &Path, protocol: Protocol) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path)?);
        let mut header = TraceHeader::default();
        let mut buf = Vec::new();
        let mut first = true;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                break;
            }

            let raw = decode_line(&buf);
            let line = raw.trim();

            if first {
                header.version = version_from_line(&raw, protocol);
                first = false;
            }

            if line.is_empty() {
                continue;
            }
            if !line.starts_with(COMMENT) {
                break;
            }

            if let Some(value) = line.strip_prefix(START_TIME_MARKER) {
                header.start_time = decode_start_time(value);
                if header.start_time.is_none() {
                    log::warn!("Ignoring invalid start time {:?} in {:?}", value, path);
                }
            } else if let Some(value) = line.strip_prefix(COLUMNS_MARKER) {
                header.columns = Some(value.split(',').map(|c| c.trim().to_string()).collect());
            } else if let Some(value) = line.trim_start_matches(COMMENT).trim_start().strip_prefix(LEGACY_START_TIME_MARKER) {
                if header.start_time.is_none() {
                    header.start_time = decode_timestamp(value);
                }
            }
        }

        Ok(header)
    }
}

/// Midnight of 1899-12-30, day zero of the start time encoding
fn ole_epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)
}

/// Decode a `$STARTTIME` value: days since 1899-12-30 plus a fractional day
///
/// The fraction is resolved to microseconds.
pub fn decode_start_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    let (days, fraction) = value.split_once('.').unwrap_or((value, "0"));

    let days: i64 = days.parse().ok()?;
    let fraction: f64 = format!("0.{}", fraction).parse().ok()?;
    let micros = (fraction * MICROS_PER_DAY as f64).round() as i64;

    ole_epoch()?
        .checked_add_signed(Duration::try_days(days)?)?
        .checked_add_signed(Duration::microseconds(micros))
}

/// Decode the `dd.mm.yyyy HH:MM:SS.fff` start time of legacy traces
pub fn decode_timestamp(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value.trim(), LEGACY_START_TIME_FORMAT).ok()
}

/// Encode a time as a `$STARTTIME` value
pub fn encode_start_time(time: NaiveDateTime) -> Option<String> {
    let delta = time.signed_duration_since(ole_epoch()?);
    let days = delta.num_days();
    let micros = (delta - Duration::try_days(days)?).num_microseconds()?;

    Some(format!("{}", days as f64 + micros as f64 / MICROS_PER_DAY as f64))
}
