//! Core types for the trace decoder library
//!
//! This module defines the protocol and classification enums plus the error
//! types shared by every stage of the engine. The decoder is stateless per
//! file - it only turns raw trace lines into records.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, TraceError>;

/// Bus protocol of a trace file
///
/// Each protocol owns an independent version space and its own set of
/// dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Protocol {
    /// CAN / CAN-FD traces (`*.trc`)
    Can,
    /// LIN traces (`*.ltrc`)
    Lin,
}

impl Protocol {
    /// Pick the protocol from a file extension (without the dot)
    ///
    /// The comparison ignores case. Unknown extensions yield `None`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "trc" => Some(Protocol::Can),
            "ltrc" => Some(Protocol::Lin),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Can => write!(f, "CAN"),
            Protocol::Lin => write!(f, "LIN"),
        }
    }
}

/// Classification of a parsed record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Actual payload traffic
    Data,
    /// Bus error, error counter or status record
    Error,
    /// Event / annotation record
    Event,
    /// Remote transmission request
    RemoteRequest,
}

impl MessageKind {
    /// True only for payload traffic
    pub fn is_msg(self) -> bool {
        self == MessageKind::Data
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::Data => write!(f, "Data"),
            MessageKind::Error => write!(f, "Error"),
            MessageKind::Event => write!(f, "Event"),
            MessageKind::RemoteRequest => write!(f, "RemoteRequest"),
        }
    }
}

/// A data line that a dialect grammar could not turn into a record
///
/// Produced by `Dialect::parse`, which does not know where the line came
/// from; the reader attaches the line number.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct LineError {
    pub reason: String,
}

impl LineError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors that can occur while opening or reading a trace
#[derive(Debug, thiserror::Error)]
pub enum TraceError {
    #[error("File version not found in {path:?}")]
    VersionNotFound { path: PathBuf },

    #[error("{protocol} trace version {version} not supported")]
    UnsupportedVersion { protocol: Protocol, version: String },

    #[error("File extension {0:?} not supported")]
    UnsupportedExtension(String),

    #[error("Malformed line {line}: {source}")]
    MalformedLine {
        line: usize,
        #[source]
        source: LineError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_from_extension() {
        assert_eq!(Protocol::from_extension("trc"), Some(Protocol::Can));
        assert_eq!(Protocol::from_extension("TRC"), Some(Protocol::Can));
        assert_eq!(Protocol::from_extension("ltrc"), Some(Protocol::Lin));
        assert_eq!(Protocol::from_extension("blf"), None);
    }

    #[test]
    fn test_message_kind_is_msg() {
        assert!(MessageKind::Data.is_msg());
        assert!(!MessageKind::Error.is_msg());
        assert!(!MessageKind::Event.is_msg());
        assert!(!MessageKind::RemoteRequest.is_msg());
    }

    #[test]
    fn test_error_display() {
        let err = TraceError::UnsupportedVersion {
            protocol: Protocol::Can,
            version: "9.9".to_string(),
        };
        assert_eq!(format!("{}", err), "CAN trace version 9.9 not supported");

        let err = TraceError::MalformedLine {
            line: 7,
            source: LineError::new("expected 4 leading fields, found 2"),
        };
        assert_eq!(
            format!("{}", err),
            "Malformed line 7: expected 4 leading fields, found 2"
        );
    }
}
