use crate::bitreader::{BitReader, FillWidth, Polarity};
use crate::buffer::ByteView;
use crate::cursor::InputCursor;
use crate::error::{decompression, invalid_format, Result};
use crate::huffman::HuffmanTree;
use crate::output::OutputCursor;

/// XPK Huffman: a canonical Huffman table built from a pre-order traversal of
/// the code tree, followed by a single-pass decode.
#[derive(Debug)]
pub(crate) struct Hfmn<'a> {
    packed: &'a [u8],
    hdr_size: usize,
    raw_size: usize,
}

impl<'a> Hfmn<'a> {
    pub fn parse(packed: &'a [u8]) -> Result<Self> {
        let view = ByteView::new(packed);
        let word = view.read_be16(0, true)?;
        // The top 7 bits of this word are unspecified upstream; ignore rather
        // than validate them.
        let hdr_size = usize::from(word & 0x01FF);
        if hdr_size % 4 != 0 {
            log::warn!("Hfmn::parse: hdrSize {hdr_size} is not a multiple of 4");
            return Err(invalid_format(format!(
                "HFMN hdrSize {hdr_size} is not a multiple of 4"
            )));
        }
        let raw_size = usize::from(view.read_be16(hdr_size + 2, true)?);
        if raw_size == 0 {
            log::warn!("Hfmn::parse: raw size field is zero");
            return Err(invalid_format("HFMN raw size field is zero"));
        }
        if hdr_size + 4 > packed.len() {
            log::warn!("Hfmn::parse: header extends past buffer end");
            return Err(invalid_format("HFMN header extends past buffer end"));
        }
        log::debug!("Hfmn::parse: hdrSize={hdr_size} rawSize={raw_size}");
        Ok(Hfmn {
            packed,
            hdr_size,
            raw_size,
        })
    }

    pub fn declared_raw_size(&self) -> usize {
        self.raw_size
    }

    pub fn declared_packed_size(&self) -> usize {
        self.packed.len()
    }

    pub fn decompress(&self, raw: &mut [u8]) -> Result<()> {
        if raw.len() != self.raw_size {
            log::warn!(
                "Hfmn::decompress: raw buffer length {} does not match declared size {}",
                raw.len(),
                self.raw_size
            );
            return Err(decompression(format!(
                "HFMN raw buffer length {} does not match declared size {}",
                raw.len(),
                self.raw_size
            )));
        }

        let table_cursor = InputCursor::forward(self.packed, 2, self.hdr_size);
        let mut table_reader = BitReader::new(table_cursor, Polarity::Msb, FillWidth::Byte);
        let tree = build_tree(&mut table_reader)?;

        let decode_cursor = InputCursor::forward(self.packed, self.hdr_size + 4, self.packed.len());
        let mut reader = BitReader::new(decode_cursor, Polarity::Msb, FillWidth::Byte);
        let mut out = OutputCursor::new(raw, 0, self.raw_size);
        while !out.eof() {
            let byte = *tree.decode(|| reader.read_bit())?;
            out.write_byte(byte)?;
        }
        Ok(())
    }
}

/// Builds the Huffman table from a pre-order walk: a `1` bit descends one
/// level deeper (extending the running code), a `0` bit assigns the next
/// literal byte to the current code and backtracks to the next unvisited
/// sibling.
fn build_tree(reader: &mut BitReader) -> Result<HuffmanTree<u8>> {
    let mut tree = HuffmanTree::new();
    let mut code_bits: u32 = 1;
    let mut code: u32 = 1;
    loop {
        if reader.read_bit()? {
            code = (code << 1) | 1;
            code_bits += 1;
        } else {
            let literal = reader.read_bits(8)? as u8;
            tree.insert(code_bits, code, literal)?;
            while code & 1 == 0 && code_bits > 0 {
                code >>= 1;
                code_bits -= 1;
            }
            if code_bits == 0 {
                break;
            }
            code -= 1;
        }
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;
    use crate::testutil::BitWriter;

    /// Two-symbol table (codes "1"->'A', "0"->0x00) followed by one decoded
    /// byte, hand-traced against `build_tree`'s state machine.
    fn minimal_two_symbol_stream() -> Vec<u8> {
        let mut header = vec![0x00, 0x08]; // hdrSize = 8
        let mut table_bits = BitWriter::new();
        table_bits.push_bit(false);
        table_bits.push_bits(u32::from(b'A'), 8);
        table_bits.push_bit(false);
        table_bits.push_bits(0x00, 8);
        let mut table_bytes = table_bits.finish();
        table_bytes.resize(6, 0);
        header.extend_from_slice(&table_bytes);
        header.extend_from_slice(&[0x00, 0x00]); // reserved
        header.extend_from_slice(&[0x00, 0x01]); // raw size = 1
        header.push(0x80); // decode-phase payload: bit '1' -> 'A'
        header
    }

    #[test_log::test]
    fn decodes_minimal_stream() {
        let packed = minimal_two_symbol_stream();
        let hfmn = Hfmn::parse(&packed).unwrap();
        assert_eq!(hfmn.declared_raw_size(), 1);
        let mut raw = [0u8; 1];
        hfmn.decompress(&mut raw).unwrap();
        assert_eq!(raw, [b'A']);
    }

    #[test_log::test]
    fn oversize_raw_is_decompression_error_before_decoding() {
        // hdrSize=0, raw size field = 5; buffer ends right after framing, so
        // any attempt to actually decode would underflow immediately.
        let packed = [0x00u8, 0x00, 0x00, 0x05];
        let hfmn = Hfmn::parse(&packed).unwrap();
        let mut raw = [0u8; 4];
        let err = hfmn.decompress(&mut raw).unwrap_err();
        assert!(matches!(err, DecodeError::Decompression { .. }));
    }

    #[test_log::test]
    fn rejects_hdr_size_not_multiple_of_four() {
        let packed = [0x00u8, 0x02, 0x00, 0x00];
        assert!(matches!(
            Hfmn::parse(&packed),
            Err(DecodeError::InvalidFormat { .. })
        ));
    }
}
