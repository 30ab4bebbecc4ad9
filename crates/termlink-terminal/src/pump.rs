//! The pty output loop: read, filter, answer queries, hand off.
//!
//! Runs on a dedicated thread because pty reads block. The loop is generic
//! over its three edges so it can be driven without a real pty.

use std::io;

use crate::filter::{CursorQueryFilter, Filtered, CURSOR_POSITION_REPLY};
use crate::pty::PtySession;

/// Where synthetic replies are written: the session's input side.
pub trait InputSink {
    fn write_input(&self, bytes: &[u8]) -> io::Result<()>;
}

impl InputSink for PtySession {
    fn write_input(&self, bytes: &[u8]) -> io::Result<()> {
        self.write(bytes)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PumpSummary {
    pub bytes_read: usize,
    pub replies: usize,
    /// The consumer stopped accepting output before end of stream.
    pub receiver_gone: bool,
}

/// Drive `read` until it returns an empty chunk.
///
/// Each queried cursor position gets its own reply, written to `sink`
/// before the surrounding output is passed to `emit`. `emit` returns
/// `false` when the consumer has gone away, which ends the loop.
pub fn pump_output<R, S, E>(mut read: R, sink: &S, mut emit: E) -> PumpSummary
where
    R: FnMut() -> Vec<u8>,
    S: InputSink + ?Sized,
    E: FnMut(Vec<u8>) -> bool,
{
    let mut filter = CursorQueryFilter::new();
    let mut summary = PumpSummary::default();

    loop {
        let chunk = read();
        if chunk.is_empty() {
            break;
        }
        summary.bytes_read += chunk.len();

        let Filtered { output, replies } = filter.feed(&chunk);
        for _ in 0..replies {
            if let Err(e) = sink.write_input(CURSOR_POSITION_REPLY) {
                tracing::debug!(error = %e, "failed to answer cursor query");
            }
        }
        summary.replies += replies;

        if !output.is_empty() && !emit(output) {
            summary.receiver_gone = true;
            return summary;
        }
    }

    let tail = filter.finish();
    if !tail.is_empty() {
        emit(tail);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct RecordingSink {
        writes: RefCell<Vec<Vec<u8>>>,
    }

    impl InputSink for RecordingSink {
        fn write_input(&self, bytes: &[u8]) -> io::Result<()> {
            self.writes.borrow_mut().push(bytes.to_vec());
            Ok(())
        }
    }

    fn reads(chunks: &[&[u8]]) -> impl FnMut() -> Vec<u8> {
        let mut queue: VecDeque<Vec<u8>> = chunks.iter().map(|c| c.to_vec()).collect();
        move || queue.pop_front().unwrap_or_default()
    }

    #[test]
    fn split_query_gets_one_reply() {
        let sink = RecordingSink::default();
        let mut emitted = Vec::new();
        let summary = pump_output(reads(&[b"abc\x1b[", b"6ndef"]), &sink, |chunk| {
            emitted.extend(chunk);
            true
        });

        assert_eq!(emitted, b"abcdef");
        assert_eq!(summary.replies, 1);
        assert_eq!(summary.bytes_read, 10);
        assert_eq!(*sink.writes.borrow(), vec![CURSOR_POSITION_REPLY.to_vec()]);
    }

    #[test]
    fn replies_are_not_batched() {
        let sink = RecordingSink::default();
        pump_output(reads(&[b"\x1b[6n\x1b[6n\x1b[6n"]), &sink, |_| true);
        let writes = sink.writes.borrow();
        assert_eq!(writes.len(), 3);
        assert!(writes.iter().all(|w| w == CURSOR_POSITION_REPLY));
    }

    #[test]
    fn query_only_chunk_emits_nothing() {
        let sink = RecordingSink::default();
        let mut emits = 0;
        pump_output(reads(&[b"\x1b[6n"]), &sink, |_| {
            emits += 1;
            true
        });
        assert_eq!(emits, 0);
    }

    #[test]
    fn carried_prefix_flushed_at_eof() {
        let sink = RecordingSink::default();
        let mut emitted = Vec::new();
        pump_output(reads(&[b"bye\x1b["]), &sink, |chunk| {
            emitted.extend(chunk);
            true
        });
        assert_eq!(emitted, b"bye\x1b[");
        assert!(sink.writes.borrow().is_empty());
    }

    #[test]
    fn stops_when_receiver_gone() {
        let sink = RecordingSink::default();
        let mut calls = 0;
        let summary = pump_output(reads(&[b"one", b"two", b"three"]), &sink, |_| {
            calls += 1;
            false
        });
        assert!(summary.receiver_gone);
        assert_eq!(calls, 1);
        assert_eq!(summary.bytes_read, 3);
    }
}
