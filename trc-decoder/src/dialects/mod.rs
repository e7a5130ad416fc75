//! Trace dialects (one per protocol and file version)
//!
//! A dialect is the column layout and classification rules of one trace
//! file version. The set is closed: every supported `(protocol, version)`
//! pair is listed in a static registry and resolved once per file.
//!
//! Newer dialects reuse the helpers of older ones (see `can.rs`) rather
//! than sharing any mutable state.

use crate::message::{indexed_key, MessageRecord};
use crate::types::{LineError, MessageKind, Protocol, Result, TraceError};
use std::fmt;

mod can;
mod lin;

/// A supported trace file dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Can10,
    Can11,
    Can12,
    Can13,
    Can20,
    Can21,
    Lin10,
    Lin11,
}

/// Registered dialects, keyed by protocol and `$FILEVERSION` token
const REGISTRY: &[(Protocol, &str, Dialect)] = &[
    (Protocol::Can, "1.0", Dialect::Can10),
    (Protocol::Can, "1.1", Dialect::Can11),
    (Protocol::Can, "1.2", Dialect::Can12),
    (Protocol::Can, "1.3", Dialect::Can13),
    (Protocol::Can, "2.0", Dialect::Can20),
    (Protocol::Can, "2.1", Dialect::Can21),
    (Protocol::Lin, "1.0", Dialect::Lin10),
    (Protocol::Lin, "1.1", Dialect::Lin11),
];

/// Static description of a dialect's columns
pub(crate) struct Grammar {
    /// Fields every data line starts with, in order
    pub leading: &'static [&'static str],
    /// Export columns, in order
    pub layout: &'static [Column],
}

/// One export column of a dialect layout
pub(crate) enum Column {
    /// Scalar field
    Field(&'static str),
    /// List field and its maximum width
    List(&'static str, usize),
}

impl Dialect {
    /// Resolve the dialect registered for `protocol` and `version`
    pub fn lookup(protocol: Protocol, version: &str) -> Result<Dialect> {
        REGISTRY
            .iter()
            .find(|(p, v, _)| *p == protocol && *v == version)
            .map(|(_, _, dialect)| *dialect)
            .ok_or_else(|| TraceError::UnsupportedVersion {
                protocol,
                version: version.to_string(),
            })
    }

    /// All registered dialects
    pub fn all() -> impl Iterator<Item = Dialect> {
        REGISTRY.iter().map(|(_, _, dialect)| *dialect)
    }

    pub fn protocol(self) -> Protocol {
        match self {
            Dialect::Lin10 | Dialect::Lin11 => Protocol::Lin,
            _ => Protocol::Can,
        }
    }

    /// The `$FILEVERSION` token of this dialect
    pub fn version(self) -> &'static str {
        match self {
            Dialect::Can10 | Dialect::Lin10 => "1.0",
            Dialect::Can11 | Dialect::Lin11 => "1.1",
            Dialect::Can12 => "1.2",
            Dialect::Can13 => "1.3",
            Dialect::Can20 => "2.0",
            Dialect::Can21 => "2.1",
        }
    }

    fn grammar(self) -> &'static Grammar {
        match self {
            Dialect::Can10 => &can::V10,
            Dialect::Can11 => &can::V11,
            Dialect::Can12 => &can::V12,
            Dialect::Can13 => &can::V13,
            Dialect::Can20 => &can::V20,
            Dialect::Can21 => &can::V21,
            Dialect::Lin10 | Dialect::Lin11 => &lin::V10,
        }
    }

    /// Fields every record of this dialect carries
    pub fn leading_fields(self) -> &'static [&'static str] {
        self.grammar().leading
    }

    /// Turn the tokens of one data line into a record
    ///
    /// Fails only if the line cannot fill the leading fields, or if a
    /// LENGTH that drives token consumption is not a number.
    pub fn parse(self, tokens: &[&str]) -> std::result::Result<MessageRecord, LineError> {
        match self {
            Dialect::Can10 => can::parse_v10(tokens),
            Dialect::Can11 | Dialect::Can12 | Dialect::Can13 => {
                can::parse_typed(tokens, self.leading_fields())
            }
            Dialect::Can20 => can::parse_v20(tokens),
            Dialect::Can21 => can::parse_v21(tokens),
            Dialect::Lin10 | Dialect::Lin11 => lin::parse(tokens),
        }
    }

    /// Classify a record produced by this dialect
    pub fn classify(self, record: &MessageRecord) -> MessageKind {
        match self {
            Dialect::Can10 => can::classify_v10(record),
            Dialect::Can11 | Dialect::Can12 | Dialect::Can13 => can::classify_typed(record),
            Dialect::Can20 => can::classify_v20(record),
            Dialect::Can21 => can::classify_v21(record),
            Dialect::Lin10 | Dialect::Lin11 => lin::classify(record),
        }
    }

    /// True if the record is payload traffic, not an error, event or
    /// remote request
    pub fn is_msg(self, record: &MessageRecord) -> bool {
        self.classify(record).is_msg()
    }

    /// Column names for tabular export
    ///
    /// With `expand`, list fields are spread into their numbered columns up
    /// to the dialect's maximum width.
    pub fn field_layout(self, expand: bool) -> Vec<String> {
        let mut columns = Vec::new();

        for column in self.grammar().layout {
            match column {
                Column::Field(name) => columns.push(name.to_string()),
                Column::List(name, max) if expand => {
                    columns.extend((0..*max).map(|i| indexed_key(name, i)));
                }
                Column::List(name, _) => columns.push(name.to_string()),
            }
        }

        columns
    }

    /// Maximum width of list field `field`, if the dialect has one
    pub fn max_width(self, field: &str) -> Option<usize> {
        self.grammar().layout.iter().find_map(|column| match column {
            Column::List(name, max) if *name == field => Some(*max),
            _ => None,
        })
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.protocol(), self.version())
    }
}

/// Positional cursor over the tokens of one line
pub(crate) struct Tokens<'a> {
    tokens: &'a [&'a str],
    pos: usize,
}

impl<'a> Tokens<'a> {
    pub fn new(tokens: &'a [&'a str]) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Fill all of `keys`; a short line is malformed
    pub fn leading(
        &mut self,
        record: &mut MessageRecord,
        keys: &[&str],
    ) -> std::result::Result<(), LineError> {
        let available = self.tokens.len() - self.pos;
        if available < keys.len() {
            return Err(LineError::new(format!(
                "expected {} leading fields ({}), found {} tokens",
                keys.len(),
                keys.join(" "),
                available
            )));
        }

        self.fields(record, keys);
        Ok(())
    }

    /// Fill as many of `keys` as tokens remain
    pub fn fields(&mut self, record: &mut MessageRecord, keys: &[&str]) {
        for key in keys {
            match self.next() {
                Some(token) => record.insert(*key, token),
                None => break,
            }
        }
    }

    pub fn next(&mut self) -> Option<&'a str> {
        let token = self.tokens.get(self.pos).copied()?;
        self.pos += 1;
        Some(token)
    }

    pub fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).copied()
    }

    /// Up to `n` tokens
    pub fn take(&mut self, n: usize) -> Vec<String> {
        let end = self.pos.saturating_add(n).min(self.tokens.len());
        let taken = self.tokens[self.pos..end].iter().map(|t| t.to_string()).collect();
        self.pos = end;
        taken
    }

    /// All remaining tokens
    pub fn rest(&mut self) -> Vec<String> {
        self.take(self.tokens.len() - self.pos)
    }

    /// All remaining tokens joined by single spaces
    pub fn rest_joined(&mut self) -> String {
        self.rest().join(" ")
    }
}

/// Insert a list field unless it is empty
pub(crate) fn insert_list(record: &mut MessageRecord, key: &str, items: Vec<String>) {
    if !items.is_empty() {
        record.insert(key, items);
    }
}

/// Insert a joined text field unless it is empty
pub(crate) fn insert_joined(record: &mut MessageRecord, key: &str, text: String) {
    if !text.is_empty() {
        record.insert(key, text);
    }
}

/// Numeric LENGTH of a record whose length drives token consumption
pub(crate) fn length(record: &MessageRecord) -> std::result::Result<usize, LineError> {
    let raw = record.text("LENGTH").unwrap_or_default();
    raw.parse()
        .map_err(|_| LineError::new(format!("invalid LENGTH {:?}", raw)))
}
