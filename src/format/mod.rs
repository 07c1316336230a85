mod hfmn;
mod lzw4;
mod mmcmp;
mod xpk;

use crate::buffer::ByteView;
use crate::error::{invalid_format, Result};
use crate::options::DecodeOptions;

pub(crate) fn fourcc(tag: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*tag)
}

type Detector = fn(u32) -> bool;

const STANDALONE_REGISTRY: &[(Detector, &str)] = &[
    (|h| h == fourcc(b"ziRC"), "MMCMP"),
    (|h| h == fourcc(b"XPKF"), "XPK"),
];

const XPK_INNER_REGISTRY: &[(Detector, &str)] = &[
    (|h| h == fourcc(b"HFMN"), "HFMN"),
    (|h| h == fourcc(b"LZW4"), "LZW4"),
    (|h| h == fourcc(b"XPKF"), "XPK"),
];

/// The closed set of formats this crate knows how to decode, dispatched via a
/// tagged enum rather than a dynamic registry: each variant owns its own
/// framing state and the set of variants is fixed at compile time.
#[derive(Debug)]
pub(crate) enum Format<'a> {
    Hfmn(hfmn::Hfmn<'a>),
    Mmcmp(mmcmp::Mmcmp<'a>),
    Lzw4(lzw4::Lzw4<'a>),
    Xpk(xpk::Xpk<'a>),
}

impl<'a> Format<'a> {
    /// Classifies and validates framing for a standalone packed buffer.
    pub fn parse(packed: &'a [u8]) -> Result<Self> {
        let header = ByteView::new(packed).read_be32(0, true)?;
        for (detect, name) in STANDALONE_REGISTRY {
            if detect(header) {
                log::debug!("Format::parse: matched standalone format {name}");
                return match *name {
                    "MMCMP" => mmcmp::Mmcmp::parse(packed).map(Format::Mmcmp),
                    "XPK" => xpk::Xpk::parse(packed).map(Format::Xpk),
                    _ => unreachable!("registry name without a constructor"),
                };
            }
        }
        log::warn!("Format::parse: no standalone format recognizes header {header:08x}");
        Err(invalid_format(format!(
            "no standalone format recognizes header {header:08x}"
        )))
    }

    /// Classifies and validates framing for an XPK-wrapped inner payload,
    /// identified by the 4CC carried in the outer container.
    pub(crate) fn parse_xpk_inner(inner_fourcc: u32, payload: &'a [u8]) -> Result<Self> {
        for (detect, name) in XPK_INNER_REGISTRY {
            if detect(inner_fourcc) {
                log::debug!("Format::parse_xpk_inner: matched {name}");
                return match *name {
                    "HFMN" => hfmn::Hfmn::parse(payload).map(Format::Hfmn),
                    "LZW4" => lzw4::Lzw4::parse(payload).map(Format::Lzw4),
                    "XPK" => xpk::Xpk::parse(payload).map(Format::Xpk),
                    _ => unreachable!("registry name without a constructor"),
                };
            }
        }
        log::warn!("Format::parse_xpk_inner: no format recognizes 4CC {inner_fourcc:08x}");
        Err(invalid_format(format!(
            "no XPK-inner format recognizes 4CC {inner_fourcc:08x}"
        )))
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Hfmn(_) => "HFMN",
            Format::Mmcmp(_) => "MMCMP",
            Format::Lzw4(_) => "LZW4",
            Format::Xpk(_) => "XPK",
        }
    }

    /// `None` when the format carries no declared raw size of its own
    /// (LZW4, whose decode is bounded entirely by the caller's buffer).
    pub fn declared_raw_size(&self) -> Result<Option<usize>> {
        match self {
            Format::Hfmn(f) => Ok(Some(f.declared_raw_size())),
            Format::Mmcmp(f) => Ok(Some(f.declared_raw_size())),
            Format::Lzw4(_) => Ok(None),
            Format::Xpk(f) => f.inner()?.declared_raw_size(),
        }
    }

    pub fn declared_packed_size(&self) -> Result<usize> {
        match self {
            Format::Hfmn(f) => Ok(f.declared_packed_size()),
            Format::Mmcmp(f) => f.declared_packed_size(),
            Format::Lzw4(f) => Ok(f.declared_packed_size()),
            Format::Xpk(f) => Ok(f.declared_packed_size()),
        }
    }

    pub fn decompress(&self, raw: &mut [u8], options: &DecodeOptions, depth: u32) -> Result<()> {
        match self {
            Format::Hfmn(f) => f.decompress(raw),
            Format::Mmcmp(f) => f.decompress(raw, options),
            Format::Lzw4(f) => f.decompress(raw, options),
            Format::Xpk(f) => f.decompress(raw, options, depth),
        }
    }
}
