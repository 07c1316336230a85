use crate::buffer::ByteView;
use crate::error::{invalid_format, recursion_limit, Result};
use crate::format::Format;
use crate::options::DecodeOptions;

const OUTER_HEADER_LEN: usize = 32;

/// The XPK outer container: a 32-byte preamble identifying an inner 4CC and
/// slicing out the inner payload. Outer-header validation beyond what is
/// needed to reach the inner payload (flags, sub-version, header checksum)
/// is the facade's concern, per spec; the checksum's algorithm is not
/// specified anywhere in the source material, so it is read but not verified.
#[derive(Debug)]
pub(crate) struct Xpk<'a> {
    inner_fourcc: u32,
    packed_size_field: usize,
    payload: &'a [u8],
}

impl<'a> Xpk<'a> {
    pub fn parse(packed: &'a [u8]) -> Result<Self> {
        let view = ByteView::new(packed);
        if view.read_be32(0, true)? != super::fourcc(b"XPKF") {
            log::warn!("Xpk::parse: magic 'XPKF' missing");
            return Err(invalid_format("XPK magic 'XPKF' missing"));
        }
        let packed_size_field = view.read_be32(4, true)? as usize;
        let inner_fourcc = view.read_be32(8, true)?;
        let _flags = view.byte(12, true)?;
        let _sub_version = view.byte(13, true)?;
        let _header_checksum = view.read_be16(14, true)?;
        view.slice(16, 16, true)?; // reserved
        let payload = view.slice(OUTER_HEADER_LEN, packed.len() - OUTER_HEADER_LEN, true)?;
        log::debug!("Xpk::parse: inner={inner_fourcc:08x} payloadLen={}", payload.len());
        Ok(Xpk {
            inner_fourcc,
            packed_size_field,
            payload,
        })
    }

    pub fn declared_packed_size(&self) -> usize {
        8 + self.packed_size_field
    }

    pub fn inner(&self) -> Result<Format<'a>> {
        Format::parse_xpk_inner(self.inner_fourcc, self.payload)
    }

    pub fn decompress(&self, raw: &mut [u8], options: &DecodeOptions, depth: u32) -> Result<()> {
        if depth >= options.max_recursion_depth {
            log::warn!(
                "Xpk::decompress: recursion depth {depth} reached cap {}",
                options.max_recursion_depth
            );
            return Err(recursion_limit(depth, options.max_recursion_depth));
        }
        self.inner()?.decompress(raw, options, depth + 1)
    }
}
