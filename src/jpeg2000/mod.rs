//! HTJ2K (ITU-T T.814 / Part 15) and legacy JPEG 2000 Part 1 (T.800) codec.
//!
//! - `markers` / `params`: the marker taxonomy and the Parameter Store
//!   built from SIZ/COD/QCD/CAP/ATK/DFS (and their per-component COC/QCC
//!   overrides).
//! - `parser` / `writer`: codestream syntax, main header and tile-part
//!   marker segments.
//! - `jp2`: locating the codestream and ICC profile inside a JP2/JPH box
//!   wrapper.
//! - `tile`: geometric derivation of tile/component/resolution/subband/
//!   code-block/precinct rectangles.
//! - `line_buffer`: the typed line-buffer pool shared by the DWT and
//!   color-transform kernels.
//! - `dwt`: the 5/3, 9/7, and arbitrary-ATK wavelets, 1D kernels plus the
//!   2D per-tile-component driver.
//! - `color`: RCT/ICT/NLT component transforms.
//! - `quantization`: scalar dead-zone quantization.
//! - `block_coder` / `ht_block_coder` / `bit_plane_coder` / `mq_coder`:
//!   the Block Coder Interface and its two implementors (HT and legacy
//!   MQ/EBCOT).
//! - `tag_tree` / `packet`: Tier-2 packet header coding.
//! - `encoder` / `decoder`: top-level orchestration tying the above
//!   together into whole-image encode/decode.

pub mod bit_io;
pub mod bit_plane_coder;
pub mod block_coder;
pub mod color;
pub mod decoder;
pub mod dwt;
pub mod encoder;
pub mod ht_block_coder;
pub mod image;
pub mod jp2;
pub mod line_buffer;
pub mod mq_coder;
pub mod packet;
pub mod params;
pub mod parser;
pub mod quantization;
pub mod tag_tree;
pub mod tile;
pub mod markers;
pub mod writer;
