use crate::strategies::{call_forest, records_of};
use joule_trace::callgraph::CallGraphBuilder;
use joule_trace::trace::{to_trace_text, TraceReader, TraceRecord};
use proptest::prelude::*;
use std::io::Cursor;

proptest! {
    #[test]
    fn written_traces_read_back_unchanged(trees in call_forest()) {
        let records = records_of(&trees);
        let text = to_trace_text(&records);

        let read: Vec<TraceRecord> = TraceReader::new(Cursor::new(text))
            .map(|item| item.map(|(_, record)| record))
            .collect::<Result<_, _>>()
            .unwrap();
        prop_assert_eq!(read, records);
    }

    #[test]
    fn blank_lines_do_not_change_the_forest(
        trees in call_forest(),
        gaps in prop::collection::vec(any::<bool>(), 0..64),
    ) {
        let records = records_of(&trees);
        let mut text = String::new();
        for (i, record) in records.iter().enumerate() {
            if gaps.get(i).copied().unwrap_or(false) {
                text.push('\n');
            }
            text.push_str(&record.to_string());
            text.push('\n');
        }

        let forest = CallGraphBuilder::new().build_from_reader(Cursor::new(text)).unwrap();
        prop_assert_eq!(forest.to_records(), records);
    }

    #[test]
    fn parse_line_never_panics(line in "\\PC{0,40}") {
        let _ = TraceRecord::parse_line(&line);
    }

    #[test]
    fn exit_lines_with_non_numeric_fields_are_rejected(
        method in "[a-c]\\$[a-z]{1,6}",
        junk in "[a-z]{1,5}",
    ) {
        let line = format!("{};{};10", method, junk);
        // "inf" and "nan" parse as floats but are rejected as non-finite.
        prop_assert!(TraceRecord::parse_line(&line).is_err());
    }
}
