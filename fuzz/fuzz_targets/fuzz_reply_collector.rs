//! Fuzz target: `ReplyCollector`
//!
//! Feeds arbitrary mount bytes into the bounded reply collector and
//! verifies:
//! - No panics under arbitrary byte inputs
//! - The buffer never grows beyond `REPLY_CAPACITY`
//! - Completion is sticky: once complete, further bytes change nothing
//!
//! cargo fuzz run fuzz_reply_collector

#![no_main]

use libfuzzer_sys::fuzz_target;
use nexbridge::bridge::pending::{ReplyCollector, REPLY_CAPACITY};

fuzz_target!(|data: &[u8]| {
    let mut collector = ReplyCollector::new();

    for &byte in data {
        let was_complete = collector.is_complete();
        let len_before = collector.bytes().len();

        let complete = collector.feed(byte);

        assert!(collector.bytes().len() <= REPLY_CAPACITY);
        assert_eq!(complete, collector.is_complete());
        if was_complete {
            assert_eq!(collector.bytes().len(), len_before, "complete is sticky");
        }
        if byte == b'#' {
            assert!(collector.is_complete());
        }
    }

    // The equality check must never read out of bounds either.
    let _ = collector.matches(b"x#");
    let _ = collector.matches(data);
});
