/// Tunable knobs for a decompression call.
///
/// Neither field changes *what* a well-formed packed buffer decodes to; both
/// bound the work done on adversarial input, per the resource model: how
/// much the decoder is willing to trust an embedded checksum, and how deep
/// an XPK container is allowed to nest before the facade gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeOptions {
    /// Verify embedded/trailing checksums where the format defines one.
    pub verify: bool,
    /// Recursion cap for XPK containers nested inside XPK containers.
    pub max_recursion_depth: u32,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            verify: false,
            max_recursion_depth: 4,
        }
    }
}
