//! Tests for the event log
//!

use std::fs;

use world_backup::{EventLog, event_log::EVENT_LOG_FILE};

#[test]
fn appends_timestamped_lines() {
    let directory = tempfile::tempdir().unwrap();
    let logs = directory.path().join("logs");

    {
        let log = EventLog::open_in(&logs).unwrap();
        log.info("first");
        log.warn("second\nwith detail");
    }
    {
        let log = EventLog::open_in(&logs).unwrap();
        log.error("third");
        assert_eq!(log.path(), logs.join(EVENT_LOG_FILE));
    }

    let contents = fs::read_to_string(logs.join(EVENT_LOG_FILE)).unwrap();
    let lines: Vec<_> = contents.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines.iter().all(|line| line.starts_with("UTC: ")));
    assert!(lines[0].ends_with("\tINFO\tfirst"));
    assert!(lines[1].ends_with("\tWARN\tsecond | with detail"));
    assert!(lines[2].ends_with("\tERROR\tthird"));
}
