//! LIN trace dialect (file versions 1.0 and 1.1 share one layout)

use super::{insert_joined, insert_list, length, Column, Grammar, Tokens};
use crate::message::MessageRecord;
use crate::types::{LineError, MessageKind};

pub(super) static V10: Grammar = Grammar {
    leading: &["#", "TIMESTAMP", "DIRECTION", "ID", "LENGTH"],
    layout: &[
        Column::Field("#"),
        Column::Field("TIMESTAMP"),
        Column::Field("DIRECTION"),
        Column::Field("ID"),
        Column::Field("LENGTH"),
        Column::List("DATA", 8),
        Column::Field("CHECKSUM"),
        Column::Field("TYPE"),
        Column::Field("ERROR"),
    ],
};

/// LENGTH data bytes, then checksum and checksum type; anything after that
/// is the error text of the frame
pub(super) fn parse(tokens: &[&str]) -> Result<MessageRecord, LineError> {
    let mut reader = Tokens::new(tokens);
    let mut record = MessageRecord::new();
    reader.leading(&mut record, V10.leading)?;

    let length = length(&record)?;
    insert_list(&mut record, "DATA", reader.take(length));
    reader.fields(&mut record, &["CHECKSUM", "TYPE"]);
    insert_joined(&mut record, "ERROR", reader.rest_joined());

    Ok(record)
}

pub(super) fn classify(record: &MessageRecord) -> MessageKind {
    if record.contains_key("ERROR") {
        MessageKind::Error
    } else {
        MessageKind::Data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_with_checksum() {
        let tokens = ["1)", "12.3", "Rx", "21", "2", "1E", "28", "B8", "Enhanced"];
        let record = parse(&tokens).unwrap();

        assert_eq!(record.text("DIRECTION"), Some("Rx"));
        assert_eq!(record.list("DATA").map(|d| d.to_vec()), Some(vec!["1E".to_string(), "28".to_string()]));
        assert_eq!(record.text("CHECKSUM"), Some("B8"));
        assert_eq!(record.text("TYPE"), Some("Enhanced"));
        assert!(!record.contains_key("ERROR"));
        assert_eq!(classify(&record), MessageKind::Data);
    }

    #[test]
    fn test_frame_with_error_text() {
        let tokens = ["2)", "13.0", "Rx", "10", "1", "64", "00", "Classic", "Checksum", "error"];
        let record = parse(&tokens).unwrap();

        assert_eq!(record.text("ERROR"), Some("Checksum error"));
        assert_eq!(classify(&record), MessageKind::Error);
    }

    #[test]
    fn test_invalid_length() {
        assert!(parse(&["3)", "14.0", "Rx", "10", "??"]).is_err());
    }

    #[test]
    fn test_length_beyond_line() {
        let tokens = ["1)", "1.0", "Rx", "10", "18446744073709551615", "AA"];
        let record = parse(&tokens).unwrap();

        assert_eq!(record.list("DATA"), Some(&["AA".to_string()][..]));
        assert!(!record.contains_key("CHECKSUM"));
    }
}
