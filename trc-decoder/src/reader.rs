//! Trace reader
//!
//! A [`TraceHandle`] binds a trace file to its protocol, version and
//! dialect. From it, the file can be read once from top to bottom
//! ([`TraceHandle::records`]) or tailed as it grows ([`TraceHandle::follow`]).
//!
//! Both sequences own their file cursor. Dropping a sequence closes the
//! file; no background thread is involved.

use crate::config::{ErrorPolicy, ReaderConfig};
use crate::dialects::Dialect;
use crate::header::{sniff_version, TraceHeader};
use crate::message::MessageRecord;
use crate::tokenizer::{decode_line, tokenize};
use crate::types::{Protocol, Result, TraceError};
use std::fs::File;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom};
use std::iter::FusedIterator;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// An opened trace: path plus resolved dialect
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceHandle {
    path: PathBuf,
    protocol: Protocol,
    version: String,
    dialect: Dialect,
}

impl TraceHandle {
    /// Open a trace, picking the protocol from the file extension
    ///
    /// `*.trc` files are CAN traces, `*.ltrc` files LIN traces.
    ///
    /// # Example
    /// ```no_run
    /// use trc_decoder::{ReaderConfig, TraceHandle};
    ///
    /// let trace = TraceHandle::open("bus.trc").unwrap();
    /// for record in trace.records(&ReaderConfig::new()).unwrap() {
    ///     println!("{:?}", record.unwrap());
    /// }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let protocol = Protocol::from_extension(extension)
            .ok_or_else(|| TraceError::UnsupportedExtension(extension.to_string()))?;

        Self::open_as(path, protocol)
    }

    /// Open a trace of a known protocol, whatever its file name
    pub fn open_as(path: impl AsRef<Path>, protocol: Protocol) -> Result<Self> {
        let path = path.as_ref();
        log::info!("Opening {} trace: {:?}", protocol, path);

        let version = sniff_version(path, protocol)?;
        let dialect = Dialect::lookup(protocol, &version)?;
        log::debug!("Resolved dialect {} for {:?}", dialect, path);

        Ok(Self {
            path: path.to_path_buf(),
            protocol,
            version,
            dialect,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// File version as found in the header
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Header directives of the trace (start time, columns)
    pub fn header(&self) -> Result<TraceHeader> {
        TraceHeader::read(&self.path, self.protocol)
    }

    /// Read the trace once, from the top
    ///
    /// The sequence ends at end of file, or after the first error unless
    /// the configuration skips malformed lines.
    pub fn records(&self, config: &ReaderConfig) -> Result<Records> {
        log::info!("Reading {} trace: {:?}", self.dialect, self.path);
        let file = File::open(&self.path)?;

        Ok(Records {
            reader: BufReader::new(file),
            lines: LineParser::new(self.dialect, config),
            buf: Vec::new(),
            done: false,
        })
    }

    /// Tail the trace as it grows
    ///
    /// At end of file the sequence sleeps for the configured poll interval
    /// and checks again. It only ends when its [`StopSignal`] is raised,
    /// on an I/O error, or on a malformed line under [`ErrorPolicy::Abort`].
    /// Line numbers in errors count from where following started.
    pub fn follow(&self, config: &ReaderConfig) -> Result<Follow> {
        log::info!(
            "Following {} trace: {:?} (poll every {:?})",
            self.dialect,
            self.path,
            config.poll_interval()
        );
        let mut file = File::open(&self.path)?;
        let mut mid_line = false;

        if config.start_at_end {
            let offset = file.seek(SeekFrom::End(0))?;
            log::debug!("Skipping {} bytes already in {:?}", offset, self.path);

            // The writer may be halfway through a line; its rest is dropped
            if offset > 0 {
                let mut last = [0u8; 1];
                file.seek(SeekFrom::Start(offset - 1))?;
                file.read_exact(&mut last)?;
                mid_line = last[0] != b'\n';
            }
        }

        Ok(Follow {
            reader: BufReader::new(file),
            lines: LineParser::new(self.dialect, config),
            pending: Vec::new(),
            mid_line,
            poll_interval: config.poll_interval(),
            stop: StopSignal::new(),
            done: false,
        })
    }
}

/// Turns raw lines into records under one configuration
struct LineParser {
    dialect: Dialect,
    on_error: ErrorPolicy,
    messages_only: bool,
    line: usize,
}

impl LineParser {
    fn new(dialect: Dialect, config: &ReaderConfig) -> Self {
        Self {
            dialect,
            on_error: config.on_error,
            messages_only: config.messages_only,
            line: 0,
        }
    }

    /// `None` if the line yields nothing (comment, blank, filtered, skipped)
    fn process(&mut self, raw: &[u8]) -> Option<Result<MessageRecord>> {
        self.line += 1;

        let text = decode_line(raw);
        let tokens = tokenize(&text)?;

        match self.dialect.parse(&tokens) {
            Ok(record) => {
                if self.messages_only && !self.dialect.is_msg(&record) {
                    log::trace!("Line {}: dropping non-message record", self.line);
                    return None;
                }
                log::trace!("Line {}: {:?}", self.line, record);
                Some(Ok(record))
            }
            Err(source) => match self.on_error {
                ErrorPolicy::Skip => {
                    log::warn!("Skipping malformed line {}: {}", self.line, source);
                    None
                }
                ErrorPolicy::Abort => Some(Err(TraceError::MalformedLine {
                    line: self.line,
                    source,
                })),
            },
        }
    }
}

/// Single pass over a trace file, see [`TraceHandle::records`]
pub struct Records {
    reader: BufReader<File>,
    lines: LineParser,
    buf: Vec<u8>,
    done: bool,
}

impl Iterator for Records {
    type Item = Result<MessageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    if let Some(item) = self.lines.process(&self.buf) {
                        self.done = item.is_err();
                        return Some(item);
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }

        None
    }
}

impl FusedIterator for Records {}

/// Cooperative stop flag for a [`Follow`] sequence
///
/// Clones share the flag, so one can be handed to a signal handler while
/// the sequence is consumed elsewhere.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the sequence to end at its next poll
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Endless tail of a growing trace, see [`TraceHandle::follow`]
pub struct Follow {
    reader: BufReader<File>,
    lines: LineParser,
    /// Bytes of a line whose newline has not been written yet
    pending: Vec<u8>,
    /// Started inside a line whose head was skipped
    mid_line: bool,
    poll_interval: Duration,
    stop: StopSignal,
    done: bool,
}

impl Follow {
    /// Handle to end this sequence from elsewhere
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }
}

impl Iterator for Follow {
    type Item = Result<MessageRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done && !self.stop.is_stopped() {
            match self.reader.read_until(b'\n', &mut self.pending) {
                Ok(_) if !self.pending.ends_with(b"\n") => {
                    thread::sleep(self.poll_interval);
                }
                Ok(_) if self.mid_line => {
                    log::debug!("Dropping rest of a partly skipped line");
                    self.mid_line = false;
                    self.pending.clear();
                }
                Ok(_) => {
                    let item = self.lines.process(&self.pending);
                    self.pending.clear();

                    if let Some(item) = item {
                        self.done = item.is_err();
                        return Some(item);
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }

        log::debug!("Follow stopped");
        None
    }
}

impl FusedIterator for Follow {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    fn trace_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_open_picks_protocol_from_extension() {
        let file = trace_file(".ltrc", ";$FILEVERSION=1.1\n");
        let trace = TraceHandle::open(file.path()).unwrap();

        assert_eq!(trace.protocol(), Protocol::Lin);
        assert_eq!(trace.version(), "1.1");
        assert_eq!(trace.dialect(), Dialect::Lin11);
    }

    #[test]
    fn test_open_unknown_extension() {
        let file = trace_file(".asc", ";$FILEVERSION=2.1\n");
        assert!(matches!(
            TraceHandle::open(file.path()),
            Err(TraceError::UnsupportedExtension(ext)) if ext == "asc"
        ));
    }

    #[test]
    fn test_open_unsupported_version() {
        let file = trace_file(".trc", ";$FILEVERSION=9.9\n");
        match TraceHandle::open(file.path()) {
            Err(TraceError::UnsupportedVersion { version, .. }) => assert_eq!(version, "9.9"),
            other => panic!("expected UnsupportedVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_records_abort_on_malformed_line() {
        let file = trace_file(".trc", ";$FILEVERSION=2.0\n1) 1.0 DT 0300 Rx 1 AA\n2) 2.0\n3) 3.0 DT 0300 Rx 1 BB\n");
        let trace = TraceHandle::open(file.path()).unwrap();
        let items: Vec<_> = trace.records(&ReaderConfig::new()).unwrap().collect();

        assert_eq!(items.len(), 2);
        assert!(items[0].is_ok());
        match &items[1] {
            Err(TraceError::MalformedLine { line, .. }) => assert_eq!(*line, 3),
            other => panic!("expected MalformedLine, got {:?}", other),
        }
    }

    #[test]
    fn test_records_skip_malformed_line() {
        let file = trace_file(".trc", ";$FILEVERSION=2.0\n1) 1.0 DT 0300 Rx 1 AA\n2) 2.0\n3) 3.0 DT 0300 Rx 1 BB\n");
        let trace = TraceHandle::open(file.path()).unwrap();
        let config = ReaderConfig::new().with_error_policy(ErrorPolicy::Skip);
        let records: Vec<_> = trace
            .records(&config)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].text("#"), Some("3)"));
    }

    #[test]
    fn test_stop_signal_ends_follow() {
        let file = trace_file(".trc", ";$FILEVERSION=2.0\n1) 1.0 DT 0300 Rx 1 AA\n");
        let trace = TraceHandle::open(file.path()).unwrap();
        let config = ReaderConfig::new().with_poll_interval(Duration::from_millis(5));
        let mut follow = trace.follow(&config).unwrap();

        assert!(matches!(follow.next(), Some(Ok(_))));

        follow.stop_signal().stop();
        assert!(follow.next().is_none());
        assert!(follow.next().is_none());
    }
}
