use crate::error::{decompression, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

/// A byte cursor over a sub-range `[start, end)` of a buffer.
///
/// Forward cursors start at `start` and advance; reverse cursors start at
/// `end` and decrement before each read. Both fail with a stream-underflow
/// [`DecodeError::Decompression`] rather than panic, since the range being
/// exhausted early is an adversarial-input condition, not a programmer error.
///
/// `end` is trusted by callers (e.g. a size field parsed from the packed
/// buffer) and is never validated against `bytes.len()` at construction, so
/// `read_byte` bounds-checks every access against the underlying slice via
/// `.get()` in addition to the `[start, end)` range check — an oversized
/// `end` must still fail cleanly rather than index out of bounds.
pub struct InputCursor<'a> {
    bytes: &'a [u8],
    start: usize,
    end: usize,
    pos: usize,
    direction: Direction,
}

impl<'a> InputCursor<'a> {
    pub fn forward(bytes: &'a [u8], start: usize, end: usize) -> Self {
        InputCursor {
            bytes,
            start,
            end,
            pos: start,
            direction: Direction::Forward,
        }
    }

    pub fn reverse(bytes: &'a [u8], start: usize, end: usize) -> Self {
        InputCursor {
            bytes,
            start,
            end,
            pos: end,
            direction: Direction::Reverse,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        match self.direction {
            Direction::Forward => self.end.saturating_sub(self.pos),
            Direction::Reverse => self.pos.saturating_sub(self.start),
        }
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        match self.direction {
            Direction::Forward => {
                if self.pos >= self.end {
                    return Err(decompression(format!(
                        "forward cursor underflow at {} (end {})",
                        self.pos, self.end
                    )));
                }
                let b = *self.bytes.get(self.pos).ok_or_else(|| {
                    decompression(format!(
                        "forward cursor position {} exceeds buffer length {}",
                        self.pos,
                        self.bytes.len()
                    ))
                })?;
                self.pos += 1;
                Ok(b)
            }
            Direction::Reverse => {
                if self.pos <= self.start {
                    return Err(decompression(format!(
                        "reverse cursor underflow at {} (start {})",
                        self.pos, self.start
                    )));
                }
                self.pos -= 1;
                let b = *self.bytes.get(self.pos).ok_or_else(|| {
                    decompression(format!(
                        "reverse cursor position {} exceeds buffer length {}",
                        self.pos,
                        self.bytes.len()
                    ))
                })?;
                Ok(b)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn forward_reads_in_order() {
        let buf = [1, 2, 3, 4];
        let mut c = InputCursor::forward(&buf, 1, 3);
        assert_eq!(c.read_byte().unwrap(), 2);
        assert_eq!(c.read_byte().unwrap(), 3);
        assert!(c.read_byte().is_err());
    }

    #[test_log::test]
    fn reverse_reads_backwards() {
        let buf = [1, 2, 3, 4];
        let mut c = InputCursor::reverse(&buf, 1, 3);
        assert_eq!(c.read_byte().unwrap(), 3);
        assert_eq!(c.read_byte().unwrap(), 2);
        assert!(c.read_byte().is_err());
    }

    /// `end` beyond the real slice length (e.g. an attacker-controlled size
    /// field) must fail cleanly rather than index out of bounds.
    #[test_log::test]
    fn forward_end_past_slice_length_is_an_error_not_a_panic() {
        let buf = [1, 2];
        let mut c = InputCursor::forward(&buf, 0, 10);
        assert_eq!(c.read_byte().unwrap(), 1);
        assert_eq!(c.read_byte().unwrap(), 2);
        assert!(c.read_byte().is_err());
    }
}
