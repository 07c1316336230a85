use crate::bitreader::{BitReader, FillWidth, Polarity};
use crate::buffer::ByteView;
use crate::cursor::InputCursor;
use crate::error::{decompression, invalid_format, verification, Result};
use crate::format::fourcc;
use crate::options::DecodeOptions;

const FLAG_COMPRESSED: u16 = 0x0001;
const FLAG_DELTA: u16 = 0x0002;
const FLAG_16BIT: u16 = 0x0004;
const FLAG_STEREO: u16 = 0x0100;
const FLAG_ABS16: u16 = 0x0200;
const FLAG_BIG_ENDIAN: u16 = 0x0400;

const THRESHOLD8: [u32; 8] = [1, 3, 7, 15, 30, 60, 120, 248];
const EXTRA8: [u32; 8] = [3, 3, 3, 3, 2, 1, 0, 0];

const THRESHOLD16: [u32; 16] = [
    1, 3, 7, 15, 30, 60, 120, 240, 496, 1008, 2032, 4080, 8176, 16368, 32752, 65520,
];
const EXTRA16: [u32; 16] = [4, 4, 4, 4, 3, 2, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0];

/// Standalone block/PCM container. Bit-compressed symbol streams are read
/// LSB-first, the convention MMCMP-family trackers use (the spec is explicit
/// about MSB order for HFMN and LZW4 but silent here).
#[derive(Debug)]
pub(crate) struct Mmcmp<'a> {
    packed: &'a [u8],
    block_count: usize,
    raw_size: usize,
    block_table_offset: usize,
}

impl<'a> Mmcmp<'a> {
    pub fn parse(packed: &'a [u8]) -> Result<Self> {
        let view = ByteView::new(packed);
        if view.read_be32(0, true)? != fourcc(b"ziRC") {
            log::warn!("Mmcmp::parse: magic 'ziRC' missing");
            return Err(invalid_format("MMCMP magic 'ziRC' missing"));
        }
        if view.read_be32(4, true)? != fourcc(b"ONia") {
            log::warn!("Mmcmp::parse: magic 'ONia' missing");
            return Err(invalid_format("MMCMP magic 'ONia' missing"));
        }
        let version = view.read_le16(8, true)?;
        if version != 14 {
            log::warn!("Mmcmp::parse: version field is {version}, expected 14");
            return Err(invalid_format(format!(
                "MMCMP version field is {version}, expected 14"
            )));
        }
        let block_count = usize::from(view.read_le16(12, true)?);
        let raw_size = view.read_le32(14, true)? as usize;
        let block_table_offset = view.read_le32(18, true)? as usize;
        view.slice(block_table_offset, block_count * 4, true)?;
        log::debug!("Mmcmp::parse: blocks={block_count} rawSize={raw_size}");
        Ok(Mmcmp {
            packed,
            block_count,
            raw_size,
            block_table_offset,
        })
    }

    pub fn declared_raw_size(&self) -> usize {
        self.raw_size
    }

    fn block_addrs(&self) -> Result<Vec<usize>> {
        let view = ByteView::new(self.packed);
        (0..self.block_count)
            .map(|i| {
                view.read_le32(self.block_table_offset + i * 4, true)
                    .map(|v| v as usize)
            })
            .collect()
    }

    pub fn declared_packed_size(&self) -> Result<usize> {
        let view = ByteView::new(self.packed);
        let mut end = self.block_table_offset + self.block_count * 4;
        for addr in self.block_addrs()? {
            let packed_block_size = view.read_le32(addr + 4, false)? as usize;
            let sub_block_count = usize::from(view.read_le16(addr + 12, false)?);
            let block_len = packed_block_size + sub_block_count * 8 + 20;
            end = end.max(addr + block_len);
        }
        Ok(end)
    }

    pub fn decompress(&self, raw: &mut [u8], options: &DecodeOptions) -> Result<()> {
        if raw.len() < self.raw_size {
            log::warn!(
                "Mmcmp::decompress: raw buffer length {} is smaller than declared size {}",
                raw.len(),
                self.raw_size
            );
            return Err(decompression(format!(
                "MMCMP raw buffer length {} is smaller than declared size {}",
                raw.len(),
                self.raw_size
            )));
        }
        raw.fill(0);
        let view = ByteView::new(self.packed);
        for addr in self.block_addrs()? {
            self.decode_block(&view, addr, raw, options)?;
        }
        Ok(())
    }

    fn decode_block(
        &self,
        view: &ByteView,
        addr: usize,
        raw: &mut [u8],
        options: &DecodeOptions,
    ) -> Result<()> {
        let unpacked_block_size = view.read_le32(addr, false)? as usize;
        let packed_block_size = view.read_le32(addr + 4, false)? as usize;
        let header_checksum = view.read_le32(addr + 8, false)?;
        let sub_block_count = usize::from(view.read_le16(addr + 12, false)?);
        let flags = view.read_le16(addr + 14, false)?;
        let pack_table_size = usize::from(view.read_le16(addr + 16, false)?);
        let initial_bit_count = usize::from(view.read_le16(addr + 18, false)?);

        let descriptors_off = addr + 20;
        let mut descriptors = Vec::with_capacity(sub_block_count);
        for i in 0..sub_block_count {
            let off = descriptors_off + i * 8;
            let out_offset = view.read_le32(off, false)? as usize;
            let out_len = view.read_le32(off + 4, false)? as usize;
            descriptors.push((out_offset, out_len));
        }
        let payload_off = descriptors_off + sub_block_count * 8;
        let payload_end = payload_off
            .checked_add(packed_block_size)
            .filter(|&end| end <= self.packed.len())
            .ok_or_else(|| {
                decompression(format!(
                    "MMCMP block packed size {packed_block_size} at offset {payload_off} exceeds buffer length {}",
                    self.packed.len()
                ))
            })?;

        let mut out = BlockOutput::new(raw, &descriptors);
        let mut checksum = 0u32;

        if flags & FLAG_COMPRESSED == 0 {
            let mut cursor = InputCursor::forward(self.packed, payload_off, payload_end);
            for _ in 0..packed_block_size {
                let b = cursor.read_byte()?;
                out.write_byte(b)?;
                checksum = checksum_step(checksum, b);
            }
        } else if flags & FLAG_16BIT == 0 {
            decode_8bit(
                self.packed,
                payload_off,
                payload_end,
                pack_table_size,
                initial_bit_count,
                flags,
                unpacked_block_size,
                &mut out,
                &mut checksum,
            )?;
        } else {
            decode_16bit(
                self.packed,
                payload_off,
                payload_end,
                initial_bit_count,
                flags,
                unpacked_block_size,
                &mut out,
                &mut checksum,
            )?;
        }

        if options.verify && checksum != header_checksum {
            log::warn!(
                "Mmcmp::decode_block: checksum mismatch, computed {checksum:08x} header {header_checksum:08x}"
            );
            return Err(verification(format!(
                "MMCMP block checksum mismatch: computed {checksum:08x}, header {header_checksum:08x}"
            )));
        }
        Ok(())
    }
}

fn checksum_step(cs: u32, b: u8) -> u32 {
    (cs ^ u32::from(b)).rotate_left(1)
}

/// Chases a block's sub-block descriptors, redirecting the write position
/// into the raw buffer whenever the current sub-block fills.
struct BlockOutput<'a, 'b> {
    raw: &'a mut [u8],
    descriptors: &'b [(usize, usize)],
    idx: usize,
    written_in_current: usize,
}

impl<'a, 'b> BlockOutput<'a, 'b> {
    fn new(raw: &'a mut [u8], descriptors: &'b [(usize, usize)]) -> Self {
        BlockOutput {
            raw,
            descriptors,
            idx: 0,
            written_in_current: 0,
        }
    }

    fn write_byte(&mut self, b: u8) -> Result<()> {
        loop {
            let Some(&(offset, len)) = self.descriptors.get(self.idx) else {
                return Err(decompression("MMCMP block ran off its last sub-block"));
            };
            if self.written_in_current < len {
                let pos = offset + self.written_in_current;
                let slot = self
                    .raw
                    .get_mut(pos)
                    .ok_or_else(|| decompression("MMCMP sub-block offset exceeds raw buffer"))?;
                *slot = b;
                self.written_in_current += 1;
                return Ok(());
            }
            self.idx += 1;
            self.written_in_current = 0;
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn decode_8bit(
    packed: &[u8],
    payload_off: usize,
    payload_end: usize,
    pack_table_size: usize,
    initial_bit_count: usize,
    flags: u16,
    unpacked_block_size: usize,
    out: &mut BlockOutput,
    checksum: &mut u32,
) -> Result<()> {
    let pack_table = packed
        .get(payload_off..payload_off + pack_table_size)
        .ok_or_else(|| decompression("MMCMP pack table exceeds buffer"))?;
    let bitstream_off = payload_off + pack_table_size;
    let cursor = InputCursor::forward(packed, bitstream_off, payload_end);
    let mut reader = BitReader::new(cursor, Polarity::Lsb, FillWidth::Byte);
    let mut bit_count = (initial_bit_count & 7) as u32;
    let delta = flags & FLAG_DELTA != 0;
    let stereo = flags & FLAG_STEREO != 0;
    let mut acc = [0i32; 2];
    let mut channel = 0usize;
    let mut written = 0usize;

    loop {
        if written >= unpacked_block_size {
            break;
        }
        let v = reader.read_bits(bit_count + 1)?;
        let index: u32 = if v >= THRESHOLD8[bit_count as usize] {
            let extra_width = EXTRA8[bit_count as usize];
            let extras = if extra_width == 0 {
                0
            } else {
                reader.read_bits(extra_width)?
            };
            let new_bit_count = extras + ((v - THRESHOLD8[bit_count as usize]) << extra_width);
            if new_bit_count != bit_count {
                bit_count = new_bit_count & 7;
                continue;
            }
            let escape = 0xF8 | reader.read_bits(3)?;
            if escape == 0xFF && reader.read_bit()? {
                break;
            }
            // escape == 0xFF with the terminator bit clear deliberately falls
            // through and indexes the pack table with 0xFF, which fails the
            // bounds check below unless the table is full-width.
            escape
        } else {
            v
        };
        let packed_value = *pack_table
            .get(index as usize)
            .ok_or_else(|| decompression(format!("MMCMP pack table index {index} out of range")))?;
        let mut sample = i32::from(packed_value);
        if delta {
            acc[channel] = acc[channel].wrapping_add(sample);
            sample = acc[channel];
            if stereo {
                channel ^= 1;
            }
        }
        let byte = sample as u8;
        out.write_byte(byte)?;
        *checksum = checksum_step(*checksum, byte);
        written += 1;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn decode_16bit(
    packed: &[u8],
    payload_off: usize,
    payload_end: usize,
    initial_bit_count: usize,
    flags: u16,
    unpacked_block_size: usize,
    out: &mut BlockOutput,
    checksum: &mut u32,
) -> Result<()> {
    let cursor = InputCursor::forward(packed, payload_off, payload_end);
    let mut reader = BitReader::new(cursor, Polarity::Lsb, FillWidth::Byte);
    let mut bit_count = (initial_bit_count & 15) as u32;
    let delta = flags & FLAG_DELTA != 0;
    let stereo = flags & FLAG_STEREO != 0;
    let abs16 = flags & FLAG_ABS16 != 0;
    let big_endian = flags & FLAG_BIG_ENDIAN != 0;
    let mut acc = [0i32; 2];
    let mut channel = 0usize;
    let mut written = 0usize;

    loop {
        if written >= unpacked_block_size {
            break;
        }
        let v = reader.read_bits(bit_count + 1)?;
        let code = if v >= THRESHOLD16[bit_count as usize] {
            let extra_width = EXTRA16[bit_count as usize];
            let extras = if extra_width == 0 {
                0
            } else {
                reader.read_bits(extra_width)?
            };
            let new_bit_count = extras + ((v - THRESHOLD16[bit_count as usize]) << extra_width);
            if new_bit_count != bit_count {
                bit_count = new_bit_count & 15;
                continue;
            }
            v
        } else {
            v
        };
        let temp: i64 = if code & 1 != 0 {
            -(i64::from(code)) - 1
        } else {
            i64::from(code)
        };
        let mut sample = (temp >> 1) as i32;
        if delta {
            acc[channel] = acc[channel].wrapping_add(sample);
            sample = acc[channel];
            if stereo {
                channel ^= 1;
            }
        }
        let mut sample16 = sample as i16 as u16;
        if abs16 {
            sample16 ^= 0x8000;
        }
        let bytes = if big_endian {
            sample16.to_be_bytes()
        } else {
            sample16.to_le_bytes()
        };
        out.write_byte(bytes[0])?;
        *checksum = checksum_step(*checksum, bytes[0]);
        out.write_byte(bytes[1])?;
        *checksum = checksum_step(*checksum, bytes[1]);
        written += 2;
    }
    Ok(())
}
