use thiserror::Error;

/// Error taxonomy for the HTJ2K / JPEG 2000 Part 1 codec core.
///
/// Variants are grouped by the failure taxonomy: parse errors, invalid
/// parameter combinations, buffer/overflow errors, codestream corruption,
/// and unsupported features. Parser-facing variants carry the byte offset
/// and/or marker code at which the problem was detected, per the
/// "typed error carrying the marker code and byte offset" contract.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Jpeg2000Error {
    // --- ParseError family -------------------------------------------
    #[error("truncated codestream at offset {offset}")]
    Truncated { offset: usize },
    #[error("unexpected marker {marker:#06x} at offset {offset}")]
    UnexpectedMarker { marker: u16, offset: usize },
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(UnsupportedFeature),
    #[error("invalid field in marker {marker:#06x} at offset {offset}")]
    InvalidField { marker: u16, offset: usize },

    // --- InvalidParameter family --------------------------------------
    #[error("image extent or tile size is zero")]
    ZeroExtent,
    #[error("tile offset exceeds image offset")]
    InvalidTileOffset,
    #[error("top-left tile does not intersect the image")]
    TileDoesNotIntersectImage,
    #[error("color transform requires at least 3 components")]
    ColorTransformTooFewComponents,
    #[error("color transform requires matching downsampling on the first 3 components")]
    ColorTransformDownsamplingMismatch,
    #[error("RPCL/PCRL progression requires power-of-two component downsampling")]
    NonPowerOfTwoDownsampling,
    #[error("component {0} is out of range")]
    ComponentOutOfRange(u32),
    #[error("COC/QCC references non-existent component {0}")]
    UnknownComponentReference(u32),
    #[error("wavelet id references absent ATK entry {0}")]
    MissingAtk(u32),
    #[error("DFS index {0} is undefined")]
    MissingDfs(u32),

    // --- BufferOverflow family -----------------------------------------
    #[error("reversible transform overflowed a 32-bit buffer; 64-bit operands required")]
    BufferOverflow,
    #[error("destination buffer too small")]
    DestinationTooSmall,
    #[error("block coder coefficient buffer does not match width*height")]
    BlockDimensionMismatch,

    // --- CodestreamCorruption family ------------------------------------
    #[error("block coder reported inconsistent length for code-block at ({x},{y})")]
    CodestreamCorruption { x: u32, y: u32 },
    #[error("tile-part data runs past its declared Psot length")]
    TilePartOverrun,
    #[error("block coder byte stream ended before its declared sections")]
    BlockCoderTruncated,

    // --- Unsupported family ----------------------------------------------
    #[error("ATK segment declares an unsupported configuration: {0}")]
    UnsupportedAtk(&'static str),
}

/// Specific unsupported-feature reasons, kept distinct from the generic
/// `Unsupported` bucket because the parser needs to name exactly which
/// ATK constraint was violated (§4.1/§7).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedFeature {
    #[error("arbitrary-filter ATK (LCatk>1)")]
    ArbitraryFilterAtk,
    #[error("more than 6 ATK lifting steps")]
    TooManyAtkSteps,
    #[error("non-zero m_init")]
    NonZeroMInit,
    #[error("multiple tiles per image")]
    MultipleTiles,
}

pub type Result<T> = core::result::Result<T, Jpeg2000Error>;
