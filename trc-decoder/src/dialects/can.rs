//! CAN trace dialects, file versions 1.0 to 2.1
//!
//! Version 1.0 predates the `$FILEVERSION` tag. Versions 1.1 to 1.3 add a
//! TYPE column (plus BUS from 1.2 and REVERSED from 1.3) and share one
//! grammar. Version 2.0 puts TYPE right after the timestamp and 2.1 adds a
//! BUS column and event lines.

use super::{insert_joined, insert_list, length, Column, Grammar, Tokens};
use crate::message::MessageRecord;
use crate::types::{LineError, MessageKind};

/// ID used by 1.0 for error and status lines
const ERROR_ID: &str = "FFFFFFFF";
/// "No value" placeholder in 1.0 error lines
const PLACEHOLDER: &str = "--";
/// Payload token announcing an error frame in 1.0
const ERROR_LITERAL: &str = "ERROR";
/// Payload of a remote request in 1.x
const RTR: &str = "RTR";

/// Bytes an error/status line of 1.0 carries at most
const V10_ERROR_TOKENS: usize = 8;
/// Error bytes of a non-frame line in 1.1 to 1.3
const V11_ERROR_TOKENS: usize = 4;

pub(super) static V10: Grammar = Grammar {
    leading: &["#", "TIMESTAMP", "ID", "LENGTH"],
    layout: &[
        Column::Field("#"),
        Column::Field("TIMESTAMP"),
        Column::Field("ID"),
        Column::Field("LENGTH"),
        Column::List("DATA", 8),
        Column::List("ERROR", V10_ERROR_TOKENS),
        Column::Field("EVENT"),
    ],
};

pub(super) static V11: Grammar = Grammar {
    leading: &["#", "TIMESTAMP", "TYPE", "ID", "LENGTH"],
    layout: &[
        Column::Field("#"),
        Column::Field("TIMESTAMP"),
        Column::Field("TYPE"),
        Column::Field("ID"),
        Column::Field("LENGTH"),
        Column::List("DATA", 8),
        Column::List("ERROR", V11_ERROR_TOKENS),
        Column::Field("EVENT"),
    ],
};

pub(super) static V12: Grammar = Grammar {
    leading: &["#", "TIMESTAMP", "BUS", "TYPE", "ID", "LENGTH"],
    layout: &[
        Column::Field("#"),
        Column::Field("TIMESTAMP"),
        Column::Field("BUS"),
        Column::Field("TYPE"),
        Column::Field("ID"),
        Column::Field("LENGTH"),
        Column::List("DATA", 8),
        Column::List("ERROR", V11_ERROR_TOKENS),
        Column::Field("EVENT"),
    ],
};

pub(super) static V13: Grammar = Grammar {
    leading: &["#", "TIMESTAMP", "BUS", "TYPE", "ID", "REVERSED", "LENGTH"],
    layout: &[
        Column::Field("#"),
        Column::Field("TIMESTAMP"),
        Column::Field("BUS"),
        Column::Field("TYPE"),
        Column::Field("ID"),
        Column::Field("REVERSED"),
        Column::Field("LENGTH"),
        Column::List("DATA", 8),
        Column::List("ERROR", V11_ERROR_TOKENS),
        Column::Field("EVENT"),
    ],
};

pub(super) static V20: Grammar = Grammar {
    leading: &["#", "TIMESTAMP", "TYPE"],
    layout: &[
        Column::Field("#"),
        Column::Field("TIMESTAMP"),
        Column::Field("TYPE"),
        Column::Field("ID"),
        Column::Field("DIRECTION"),
        Column::Field("LENGTH"),
        Column::List("DATA", 64),
        Column::List("ERROR", 5),
    ],
};

pub(super) static V21: Grammar = Grammar {
    leading: &["#", "TIMESTAMP", "TYPE", "BUS"],
    layout: &[
        Column::Field("#"),
        Column::Field("TIMESTAMP"),
        Column::Field("TYPE"),
        Column::Field("BUS"),
        Column::Field("ID"),
        Column::Field("DIRECTION"),
        Column::Field("RESERVED"),
        Column::Field("LENGTH"),
        Column::List("DATA", 64),
        Column::List("ERROR", 5),
        Column::Field("EVENT"),
    ],
};

/// 1.x frame types that carry payload
fn is_frame_type(kind: &str) -> bool {
    matches!(kind, "Rx" | "Tx")
}

/// 2.x status, error and error counter lines
fn is_status_type(kind: &str) -> bool {
    matches!(kind, "ST" | "ER" | "EC")
}

pub(super) fn parse_v10(tokens: &[&str]) -> Result<MessageRecord, LineError> {
    let mut reader = Tokens::new(tokens);
    let mut record = MessageRecord::new();
    reader.leading(&mut record, V10.leading)?;

    if record.text("ID") == Some(ERROR_ID) {
        let error = reader
            .take(V10_ERROR_TOKENS)
            .into_iter()
            .filter(|token| token != PLACEHOLDER)
            .collect();
        insert_list(&mut record, "ERROR", error);
        insert_joined(&mut record, "EVENT", reader.rest_joined());
        return Ok(record);
    }

    match reader.peek() {
        Some(ERROR_LITERAL) => {
            reader.next();
            insert_list(&mut record, "ERROR", reader.rest());
        }
        Some(RTR) => {
            insert_list(&mut record, "DATA", reader.take(1));
        }
        Some(_) => {
            let length = length(&record)?;
            insert_list(&mut record, "DATA", reader.take(length));
        }
        None => {}
    }

    Ok(record)
}

/// Grammar of 1.1, 1.2 and 1.3, which differ only in their leading fields
pub(super) fn parse_typed(
    tokens: &[&str],
    leading: &[&str],
) -> Result<MessageRecord, LineError> {
    let mut reader = Tokens::new(tokens);
    let mut record = MessageRecord::new();
    reader.leading(&mut record, leading)?;

    if record.text("TYPE").is_some_and(is_frame_type) {
        insert_list(&mut record, "DATA", reader.rest());
    } else {
        insert_list(&mut record, "ERROR", reader.take(V11_ERROR_TOKENS));
        insert_joined(&mut record, "EVENT", reader.rest_joined());
    }

    Ok(record)
}

pub(super) fn parse_v20(tokens: &[&str]) -> Result<MessageRecord, LineError> {
    let mut reader = Tokens::new(tokens);
    let mut record = MessageRecord::new();
    reader.leading(&mut record, V20.leading)?;

    if record.text("TYPE").is_some_and(is_status_type) {
        reader.fields(&mut record, &["DIRECTION"]);
        insert_list(&mut record, "ERROR", reader.rest());
    } else {
        reader.fields(&mut record, &["ID", "DIRECTION", "LENGTH"]);
        insert_list(&mut record, "DATA", reader.rest());
    }

    Ok(record)
}

pub(super) fn parse_v21(tokens: &[&str]) -> Result<MessageRecord, LineError> {
    let mut reader = Tokens::new(tokens);
    let mut record = MessageRecord::new();
    reader.leading(&mut record, V21.leading)?;

    if record.text("TYPE") == Some("EV") {
        insert_joined(&mut record, "EVENT", reader.rest_joined());
        return Ok(record);
    }

    reader.fields(&mut record, &["ID", "DIRECTION", "RESERVED", "LENGTH"]);

    let key = if record.text("TYPE").is_some_and(is_status_type) {
        "ERROR"
    } else {
        "DATA"
    };
    insert_list(&mut record, key, reader.rest());

    Ok(record)
}

/// Error list present or remote request payload
fn classify_payload(record: &MessageRecord) -> MessageKind {
    if record.contains_key("ERROR") {
        return MessageKind::Error;
    }

    match record.list("DATA").and_then(|data| data.first()) {
        Some(first) if first == RTR => MessageKind::RemoteRequest,
        _ => MessageKind::Data,
    }
}

pub(super) fn classify_v10(record: &MessageRecord) -> MessageKind {
    if record.text("ID") == Some(ERROR_ID) {
        return MessageKind::Error;
    }

    classify_payload(record)
}

pub(super) fn classify_typed(record: &MessageRecord) -> MessageKind {
    if !record.text("TYPE").is_some_and(is_frame_type) {
        return MessageKind::Error;
    }

    classify_payload(record)
}

pub(super) fn classify_v20(record: &MessageRecord) -> MessageKind {
    match record.text("TYPE").unwrap_or_default() {
        "ST" | "ER" | "EC" => MessageKind::Error,
        "RR" => MessageKind::RemoteRequest,
        _ => MessageKind::Data,
    }
}

pub(super) fn classify_v21(record: &MessageRecord) -> MessageKind {
    if record.text("TYPE") == Some("EV") {
        return MessageKind::Event;
    }

    classify_v20(record)
}

#[cfg(test)]
mod tests {
    use super::super::Dialect;
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_v10_data_frame() {
        let tokens = ["1)", "100.0", "0100", "2", "AA", "BB", "00", "ST"];
        let record = parse_v10(&tokens).unwrap();

        let keys: Vec<_> = record.keys().collect();
        assert_eq!(keys, vec!["#", "TIMESTAMP", "ID", "LENGTH", "DATA"]);
        assert_eq!(record.text("#"), Some("1)"));
        assert_eq!(record.text("TIMESTAMP"), Some("100.0"));
        assert_eq!(record.text("ID"), Some("0100"));
        assert_eq!(record.text("LENGTH"), Some("2"));
        assert_eq!(record.list("DATA"), Some(&strings(&["AA", "BB"])[..]));
        assert_eq!(classify_v10(&record), MessageKind::Data);
        assert!(Dialect::Can10.is_msg(&record));
    }

    #[test]
    fn test_v10_length_beyond_line() {
        let tokens = ["1)", "1.0", "0100", "18446744073709551615", "AA"];
        let record = parse_v10(&tokens).unwrap();

        assert_eq!(record.list("DATA"), Some(&strings(&["AA"])[..]));
    }

    #[test]
    fn test_v10_error_id_drops_placeholders() {
        let tokens = [
            "2)", "100.0", "FFFFFFFF", "0", "ERR1", "--", "--", "--", "--", "--", "--", "--",
        ];
        let record = parse_v10(&tokens).unwrap();

        assert_eq!(record.list("ERROR"), Some(&strings(&["ERR1"])[..]));
        assert!(!record.contains_key("DATA"));
        assert!(!record.contains_key("EVENT"));
        assert_eq!(classify_v10(&record), MessageKind::Error);
        assert!(!Dialect::Can10.is_msg(&record));
    }

    #[test]
    fn test_v10_error_id_event_text() {
        let tokens = [
            "3)", "5.0", "FFFFFFFF", "4", "00", "00", "00", "08", "--", "--", "--", "--", "BUSHEAVY",
            "warning",
        ];
        let record = parse_v10(&tokens).unwrap();

        assert_eq!(record.list("ERROR"), Some(&strings(&["00", "00", "00", "08"])[..]));
        assert_eq!(record.text("EVENT"), Some("BUSHEAVY warning"));
    }

    #[test]
    fn test_v10_error_literal() {
        let tokens = ["4)", "7.5", "0000", "0", "ERROR", "BIT", "STUFF"];
        let record = parse_v10(&tokens).unwrap();

        assert_eq!(record.list("ERROR"), Some(&strings(&["BIT", "STUFF"])[..]));
        assert!(!record.contains_key("DATA"));
        assert_eq!(classify_v10(&record), MessageKind::Error);
    }

    #[test]
    fn test_v10_remote_request() {
        let record = parse_v10(&["5)", "9.1", "0300", "4", "RTR"]).unwrap();

        assert_eq!(record.list("DATA"), Some(&strings(&["RTR"])[..]));
        assert_eq!(classify_v10(&record), MessageKind::RemoteRequest);
    }

    #[test]
    fn test_v10_invalid_length() {
        let err = parse_v10(&["6)", "9.1", "0300", "x", "AA"]).unwrap_err();
        assert_eq!(err.reason, "invalid LENGTH \"x\"");
    }

    #[test]
    fn test_v11_frame_and_error() {
        let record = parse_typed(&["1)", "1.0", "Rx", "0300", "3", "01", "02", "03"], V11.leading).unwrap();
        assert_eq!(record.text("TYPE"), Some("Rx"));
        assert_eq!(record.list("DATA"), Some(&strings(&["01", "02", "03"])[..]));
        assert_eq!(classify_typed(&record), MessageKind::Data);

        let tokens = ["2)", "1.5", "Error", "0000", "4", "00", "01", "02", "03", "Bus", "off"];
        let record = parse_typed(&tokens, V11.leading).unwrap();
        assert_eq!(record.list("ERROR"), Some(&strings(&["00", "01", "02", "03"])[..]));
        assert_eq!(record.text("EVENT"), Some("Bus off"));
        assert_eq!(classify_typed(&record), MessageKind::Error);
    }

    #[test]
    fn test_v11_keeps_placeholders() {
        let tokens = ["2)", "1.5", "Warng", "FFFFFFFF", "4", "--", "--", "00", "--"];
        let record = parse_typed(&tokens, V11.leading).unwrap();

        assert_eq!(record.list("ERROR"), Some(&strings(&["--", "--", "00", "--"])[..]));
    }

    #[test]
    fn test_v11_remote_request() {
        let record = parse_typed(&["3)", "2.0", "Tx", "0300", "4", "RTR"], V11.leading).unwrap();
        assert_eq!(classify_typed(&record), MessageKind::RemoteRequest);
    }

    #[test]
    fn test_v11_type_without_error_bytes() {
        let record = parse_typed(&["4)", "2.0", "Warng", "0000", "0"], V11.leading).unwrap();
        assert!(!record.contains_key("ERROR"));
        assert_eq!(classify_typed(&record), MessageKind::Error);
    }

    #[test]
    fn test_v12_and_v13_leading_fields() {
        let tokens = ["1)", "1.0", "1", "Rx", "0300", "2", "AA", "BB"];
        let record = parse_typed(&tokens, V12.leading).unwrap();
        assert_eq!(record.text("BUS"), Some("1"));
        assert_eq!(record.list("DATA"), Some(&strings(&["AA", "BB"])[..]));

        let tokens = ["1)", "1.0", "1", "Rx", "0300", "-", "2", "AA", "BB"];
        let record = parse_typed(&tokens, V13.leading).unwrap();
        assert_eq!(record.text("REVERSED"), Some("-"));
        assert_eq!(record.text("LENGTH"), Some("2"));
        assert_eq!(record.list("DATA"), Some(&strings(&["AA", "BB"])[..]));
    }

    #[test]
    fn test_v20_status_record() {
        let record = parse_v20(&["3)", "200.0", "ST", "Rx", "BUSOFF"]).unwrap();

        assert_eq!(record.text("TYPE"), Some("ST"));
        assert_eq!(record.text("DIRECTION"), Some("Rx"));
        assert_eq!(record.list("ERROR"), Some(&strings(&["BUSOFF"])[..]));
        assert!(!record.contains_key("ID"));
        assert_eq!(classify_v20(&record), MessageKind::Error);
        assert!(!Dialect::Can20.is_msg(&record));
    }

    #[test]
    fn test_v20_data_frame() {
        let record = parse_v20(&["1)", "1059.9", "DT", "0300", "Rx", "4", "00", "01", "02", "03"]).unwrap();

        assert_eq!(record.text("ID"), Some("0300"));
        assert_eq!(record.text("DIRECTION"), Some("Rx"));
        assert_eq!(record.text("LENGTH"), Some("4"));
        assert_eq!(record.list("DATA").map(|d| d.len()), Some(4));
        assert_eq!(classify_v20(&record), MessageKind::Data);

        let record = parse_v20(&["2)", "1060.0", "RR", "0300", "Tx", "4"]).unwrap();
        assert!(!record.contains_key("DATA"));
        assert_eq!(classify_v20(&record), MessageKind::RemoteRequest);
    }

    #[test]
    fn test_v21_event_and_frames() {
        let record = parse_v21(&["1)", "0.0", "EV", "1", "Trace", "started", "here"]).unwrap();
        assert_eq!(record.text("EVENT"), Some("Trace started here"));
        assert!(!record.contains_key("ID"));
        assert_eq!(classify_v21(&record), MessageKind::Event);

        let record = parse_v21(&["2)", "1.0", "FD", "1", "0300", "Rx", "-", "2", "AA", "BB"]).unwrap();
        assert_eq!(record.text("RESERVED"), Some("-"));
        assert_eq!(record.list("DATA"), Some(&strings(&["AA", "BB"])[..]));
        assert_eq!(classify_v21(&record), MessageKind::Data);

        let record = parse_v21(&["3)", "2.0", "ER", "1", "0000", "Rx", "-", "5", "02", "00", "80", "00", "00"]).unwrap();
        assert_eq!(record.list("ERROR").map(|e| e.len()), Some(5));
        assert!(!record.contains_key("DATA"));
        assert_eq!(classify_v21(&record), MessageKind::Error);
    }
}
