//! Cursor-position query interception.
//!
//! Interactive programs query the terminal with `ESC [ 6 n` and block until
//! the terminal answers. A remote client that never answers would stall
//! them, so the query is removed from the output stream and the bridge
//! answers it locally with a fixed `ESC [ 1 ; 1 R`.
//!
//! Reads from a pty split the stream at arbitrary points, so a query may
//! arrive in pieces. [`CursorQueryFilter`] carries a trailing partial query
//! (at most three bytes) into the next call.
//!
//! Removal repeats until nothing forwarded from a read contains the query,
//! including a query that only forms once an inner one is taken out.

/// `ESC [ 6 n`: device status report, cursor position.
pub const CURSOR_POSITION_QUERY: &[u8] = b"\x1b[6n";

/// `ESC [ 1 ; 1 R`: cursor at row 1, column 1.
pub const CURSOR_POSITION_REPLY: &[u8] = b"\x1b[1;1R";

/// Result of feeding one chunk through the filter.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Filtered {
    /// Bytes to forward to the client.
    pub output: Vec<u8>,
    /// Number of queries removed; one reply is owed per query.
    pub replies: usize,
}

#[derive(Debug, Default)]
pub struct CursorQueryFilter {
    carry: Vec<u8>,
}

impl CursorQueryFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Filtered {
        let mut output = std::mem::take(&mut self.carry);
        output.reserve(chunk.len());

        let mut replies = 0;
        for &byte in chunk {
            output.push(byte);
            if output.ends_with(CURSOR_POSITION_QUERY) {
                output.truncate(output.len() - CURSOR_POSITION_QUERY.len());
                replies += 1;
            }
        }

        // Hold back the longest tail that could still become a query.
        let held = (1..CURSOR_POSITION_QUERY.len())
            .rev()
            .find(|&n| output.ends_with(&CURSOR_POSITION_QUERY[..n]))
            .unwrap_or(0);
        self.carry = output.split_off(output.len() - held);

        Filtered { output, replies }
    }

    /// Bytes held back waiting for the rest of a possible query.
    pub fn pending(&self) -> &[u8] {
        &self.carry
    }

    /// Release the carried bytes at end of stream.
    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.carry)
    }
}
