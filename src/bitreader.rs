use crate::cursor::InputCursor;
use crate::error::{decompression, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// `read_bits(n)` extracts the top `n` unconsumed bits of the accumulator.
    Msb,
    /// `read_bits(n)` extracts the bottom `n` bits, shifting the rest down.
    Lsb,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillWidth {
    Byte,
    Word16,
    Dword32,
}

impl FillWidth {
    fn bytes(self) -> u32 {
        match self {
            FillWidth::Byte => 1,
            FillWidth::Word16 => 2,
            FillWidth::Dword32 => 4,
        }
    }
}

/// A bit-level reader over an [`InputCursor`], configurable for either
/// polarity and a refill granularity of 1, 2 or 4 bytes at a time.
///
/// The accumulator is 64 bits wide even though `read_bits` only ever returns
/// up to 32 of them: a refill can add a full 4-byte unit on top of up to 32
/// bits already held without ever needing to split a unit across two
/// refills, so `refill()` can always top up in whole units instead of
/// tracking partial ones.
///
/// `reset()` discards accumulator state so the same reader can be rebound to
/// a new cursor, which HFMN relies on between its two decode passes.
pub struct BitReader<'a> {
    cursor: InputCursor<'a>,
    accumulator: u64,
    valid_bits: u32,
    polarity: Polarity,
    fill_width: FillWidth,
}

impl<'a> BitReader<'a> {
    pub fn new(cursor: InputCursor<'a>, polarity: Polarity, fill_width: FillWidth) -> Self {
        BitReader {
            cursor,
            accumulator: 0,
            valid_bits: 0,
            polarity,
            fill_width,
        }
    }

    pub fn reset(&mut self, cursor: InputCursor<'a>) {
        self.cursor = cursor;
        self.accumulator = 0;
        self.valid_bits = 0;
    }

    pub fn cursor_mut(&mut self) -> &mut InputCursor<'a> {
        &mut self.cursor
    }

    /// Tops the accumulator up by exactly one refill unit. Deliberately not a
    /// loop: a cursor positioned at the last few bytes of its range may hold
    /// fewer bytes than a full unit even though the bits already buffered
    /// are enough to satisfy the pending `read_bits` call, so refilling more
    /// than the caller asked for would fail on trailing short reads that
    /// never actually needed those extra bits.
    fn refill(&mut self) -> Result<()> {
        let unit_bits = self.fill_width.bytes() * 8;
        if self.valid_bits + unit_bits > 64 {
            return Ok(());
        }
        let mut unit: u64 = 0;
        for _ in 0..self.fill_width.bytes() {
            unit = (unit << 8) | u64::from(self.cursor.read_byte()?);
        }
        match self.polarity {
            Polarity::Msb => {
                self.accumulator |= unit << (64 - self.valid_bits - unit_bits);
            }
            Polarity::Lsb => {
                self.accumulator |= unit << self.valid_bits;
            }
        }
        self.valid_bits += unit_bits;
        Ok(())
    }

    /// Reads `n` bits, `1..=32`, refilling from the cursor as needed.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        if n == 0 || n > 32 {
            return Err(decompression(format!("read_bits: invalid width {n}")));
        }
        while self.valid_bits < n {
            self.refill()?;
        }
        let value = match self.polarity {
            Polarity::Msb => {
                let v = self.accumulator >> (64 - n);
                self.accumulator <<= n;
                v
            }
            Polarity::Lsb => {
                let v = self.accumulator & (u64::MAX >> (64 - n));
                self.accumulator >>= n;
                v
            }
        };
        self.valid_bits -= n;
        Ok(value as u32)
    }

    pub fn read_bit(&mut self) -> Result<bool> {
        Ok(self.read_bits(1)? != 0)
    }

    pub fn read_byte_direct(&mut self) -> Result<u8> {
        self.cursor.read_byte()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test_log::test]
    fn msb_reads_top_bits_first() {
        let buf = [0b1011_0010];
        let cursor = InputCursor::forward(&buf, 0, 1);
        let mut r = BitReader::new(cursor, Polarity::Msb, FillWidth::Byte);
        assert_eq!(r.read_bits(1).unwrap(), 1);
        assert_eq!(r.read_bits(1).unwrap(), 0);
        assert_eq!(r.read_bits(1).unwrap(), 1);
        assert_eq!(r.read_bits(1).unwrap(), 1);
        assert_eq!(r.read_bits(4).unwrap(), 0b0010);
    }

    #[test_log::test]
    fn lsb_reads_bottom_bits_first() {
        let buf = [0b1011_0010];
        let cursor = InputCursor::forward(&buf, 0, 1);
        let mut r = BitReader::new(cursor, Polarity::Lsb, FillWidth::Byte);
        assert_eq!(r.read_bits(1).unwrap(), 0);
        assert_eq!(r.read_bits(1).unwrap(), 1);
        assert_eq!(r.read_bits(1).unwrap(), 0);
        assert_eq!(r.read_bits(1).unwrap(), 0);
        assert_eq!(r.read_bits(4).unwrap(), 0b1011);
    }

    #[test_log::test]
    fn dword32_refill_reads_big_endian_units() {
        let buf = [0x12, 0x34, 0x56, 0x78];
        let cursor = InputCursor::forward(&buf, 0, 4);
        let mut r = BitReader::new(cursor, Polarity::Msb, FillWidth::Dword32);
        assert_eq!(r.read_bits(16).unwrap(), 0x1234);
        assert_eq!(r.read_bits(16).unwrap(), 0x5678);
    }

    #[test_log::test]
    fn underflow_is_decompression_error() {
        let buf = [0xFF];
        let cursor = InputCursor::forward(&buf, 0, 1);
        let mut r = BitReader::new(cursor, Polarity::Msb, FillWidth::Byte);
        assert!(r.read_bits(9).is_err());
    }

    /// A read that straddles a refill boundary must not over-fetch: the
    /// cursor here has exactly enough bytes for the bits actually read, with
    /// nothing left over, so a greedy refill that tops the accumulator off
    /// to full capacity before checking how much is needed would fail this.
    #[test_log::test]
    fn reads_spanning_a_refill_boundary_do_not_over_fetch() {
        let buf = [0b1010_1010, 0b1111_0000];
        let cursor = InputCursor::forward(&buf, 0, 2);
        let mut r = BitReader::new(cursor, Polarity::Msb, FillWidth::Byte);
        assert_eq!(r.read_bits(5).unwrap(), 0b10101);
        assert_eq!(r.read_bits(11).unwrap(), 0b010_1111_0000);
    }
}
