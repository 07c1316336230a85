use crate::bitreader::{BitReader, FillWidth, Polarity};
use crate::cursor::InputCursor;
use crate::error::{decompression, Result};
use crate::options::DecodeOptions;
use crate::output::OutputCursor;

/// XPK back-reference format. No framing beyond the 4CC match already
/// consumed by the registry: the entire inner payload is the bitstream.
#[derive(Debug)]
pub(crate) struct Lzw4<'a> {
    payload: &'a [u8],
}

impl<'a> Lzw4<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self> {
        Ok(Lzw4 { payload })
    }

    pub fn declared_packed_size(&self) -> usize {
        self.payload.len()
    }

    pub fn decompress(&self, raw: &mut [u8], _options: &DecodeOptions) -> Result<()> {
        let cursor = InputCursor::forward(self.payload, 0, self.payload.len());
        let mut reader = BitReader::new(cursor, Polarity::Msb, FillWidth::Dword32);
        let mut out = OutputCursor::new(raw, 0, raw.len());
        while !out.eof() {
            if reader.read_bit()? {
                let d = reader.read_bits(16)?;
                if d == 0 {
                    log::warn!("Lzw4::decompress: stream terminated before filling raw buffer");
                    return Err(decompression(
                        "LZW4 stream terminated before filling declared raw size",
                    ));
                }
                let distance = 65536 - d as usize;
                let count = reader.read_bits(8)? as usize + 3;
                out.copy(distance, count)?;
            } else {
                let b = reader.read_bits(8)? as u8;
                out.write_byte(b)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::testutil::BitWriter;

    #[test_log::test]
    fn decodes_literal_run_then_backref() {
        // Three literals 'A','B','C', then a distance=1, count=3 back-ref
        // (minimum count, since count = read byte + 3): "ABC" + "CCC".
        let mut w = BitWriter::new();
        for lit in [b'A', b'B', b'C'] {
            w.push_bit(false);
            w.push_bits(u32::from(lit), 8);
        }
        w.push_bit(true);
        w.push_bits(65536 - 1, 16); // d encodes distance=1
        w.push_bits(0, 8); // count byte 0 -> count = 3
        let packed = w.finish();

        let lzw4 = Lzw4::parse(&packed).unwrap();
        let mut raw = [0u8; 6];
        lzw4.decompress(&mut raw, &DecodeOptions::default()).unwrap();
        assert_eq!(&raw, b"ABCCCC");
    }

    #[test_log::test]
    fn early_termination_before_buffer_full_is_an_error() {
        let mut w = BitWriter::new();
        w.push_bit(true);
        w.push_bits(0, 16); // d == 0 signals termination
        let packed = w.finish();

        let lzw4 = Lzw4::parse(&packed).unwrap();
        let mut raw = [0u8; 4];
        let err = lzw4
            .decompress(&mut raw, &DecodeOptions::default())
            .unwrap_err();
        assert!(matches!(err, DecodeError::Decompression { .. }));
    }

    #[test_log::test]
    fn backref_distance_exceeding_offset_is_an_error() {
        let mut w = BitWriter::new();
        w.push_bit(true);
        w.push_bits(65536 - 5, 16); // distance = 5, but nothing written yet
        w.push_bits(0, 8);
        let packed = w.finish();

        let lzw4 = Lzw4::parse(&packed).unwrap();
        let mut raw = [0u8; 4];
        assert!(lzw4
            .decompress(&mut raw, &DecodeOptions::default())
            .is_err());
    }
}
