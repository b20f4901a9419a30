#![no_main]
use gamalog_core::record::{LogHeader, LogRecord, counter_of};
use gamalog_core::simulator::next_record_line;
use libfuzzer_sys::fuzz_target;
use std::time::Duration;

fuzz_target!(|data: &str| {
    for line in data.lines() {
        let _ = LogHeader::parse(line);
        let _ = counter_of(line);
        if let Ok(rec) = LogRecord::parse(line) {
            // a parsed record always has a counter in the second-to-last slot
            // unless the status field was present
            if rec.status.is_none() {
                assert_eq!(counter_of(line).ok(), Some(rec.counter));
            }
        }
        if let Ok(next) = next_record_line(line, Duration::from_secs(2)) {
            assert_eq!(next.split(';').count(), line.split(';').count());
        }
    }
});
