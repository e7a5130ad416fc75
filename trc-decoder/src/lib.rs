//! PEAK Trace Decoder Library
//!
//! A stateless library for reading text trace files (`*.trc` for CAN,
//! `*.ltrc` for LIN) written by bus analyzer tools, across all their file
//! format versions.
//!
//! # Architecture
//!
//! - The header sniffer reads the `$FILEVERSION` tag from the first line
//! - A closed registry maps (protocol, version) to a [`Dialect`]
//! - Each data line is tokenized and parsed by the dialect into a
//!   [`MessageRecord`], which the dialect can also classify
//! - Records can be expanded into fixed-width columns for tabular export
//!
//! The library does NOT:
//! - Convert binary traces or write CSV files
//! - Decode signals or validate identifiers and payload bytes
//! - Cache parsed results
//!
//! All of that is left to the application layer (trc-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use trc_decoder::{ErrorPolicy, ReaderConfig, TraceHandle};
//!
//! let trace = TraceHandle::open("bus.trc").unwrap();
//! let config = ReaderConfig::new()
//!     .with_error_policy(ErrorPolicy::Skip)
//!     .with_messages_only(true);
//!
//! let columns = trace.dialect().field_layout(true);
//! for record in trace.records(&config).unwrap() {
//!     match record {
//!         Ok(record) => println!("{:?}", record.expand().row(&columns)),
//!         Err(e) => eprintln!("Read error: {}", e),
//!     }
//! }
//! ```

// Public modules
pub mod config;
pub mod dialects;
pub mod header;
pub mod message;
pub mod reader;
pub mod tokenizer;
pub mod types;

// Re-export main types for convenience
pub use config::{ErrorPolicy, ReaderConfig};
pub use dialects::Dialect;
pub use header::{decode_start_time, decode_timestamp, encode_start_time, sniff_version, TraceHeader};
pub use message::{ExpandedRecord, FieldValue, MessageRecord};
pub use reader::{Follow, Records, StopSignal, TraceHandle};
pub use types::{LineError, MessageKind, Protocol, Result, TraceError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_basics() {
        // Smoke test: every dialect parses a line of its own leading fields
        for dialect in Dialect::all() {
            let tokens = vec!["0"; dialect.leading_fields().len()];
            assert!(dialect.parse(&tokens).is_ok());
        }
    }
}
