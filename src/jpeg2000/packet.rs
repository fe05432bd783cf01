//! Tier-2 packet header coding (§4.8): per-precinct, per-layer
//! code-block inclusion, zero-bitplane count, and coded-data length,
//! built on the tag tree (§B.10.2) and the packet bit I/O of
//! `bit_io.rs`. Coding-pass counts are carried as a plain fixed-width
//! field rather than the standard's variable-length Table B-4 code;
//! that table only matters for cross-decoder bit-exactness, which this
//! crate's block coder interface explicitly does not promise.

use crate::error::Jpeg2000Error;
use crate::jpeg2000::bit_io::{PacketBitReader, PacketBitWriter};
use crate::jpeg2000::tag_tree::TagTree;

const NUM_PASSES_BITS: u8 = 8;
const INITIAL_LBLOCK: u32 = 3;

/// Per-precinct decoding/encoding state that persists across quality
/// layers: the two tag trees plus each code-block's running `Lblock`
/// and whether it has already been included in an earlier layer.
pub struct PrecinctState {
    inclusion: TagTree,
    zero_bp: TagTree,
    included_before: Vec<bool>,
    lblock: Vec<u32>,
    grid_width: u32,
    grid_height: u32,
}

impl PrecinctState {
    pub fn new(grid_width: u32, grid_height: u32) -> Self {
        let count = (grid_width * grid_height) as usize;
        Self {
            inclusion: TagTree::new(grid_width, grid_height),
            zero_bp: TagTree::new(grid_width, grid_height),
            included_before: vec![false; count],
            lblock: vec![INITIAL_LBLOCK; count],
            grid_width,
            grid_height,
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        (y * self.grid_width + x) as usize
    }

    /// Encoder-side setup: records the layer at which a code-block
    /// first becomes included and its zero-bitplane count, so the tag
    /// trees can reveal both across whatever layer thresholds
    /// `encode_packet` is later called with. `first_included_layer` of
    /// `None` means the code-block is never included (all-zero).
    pub fn prepare_code_block(&mut self, x: u32, y: u32, first_included_layer: Option<u32>, zero_bitplanes: u32) {
        self.inclusion.set_value(x, y, first_included_layer.unwrap_or(u32::MAX));
        self.zero_bp.set_value(x, y, zero_bitplanes);
    }
}

#[derive(Debug, Clone)]
pub struct CodeBlockPacketEntry {
    pub x: u32,
    pub y: u32,
    pub zero_bitplanes: u32,
    pub num_passes: u32,
    pub data_len: u32,
}

pub struct PacketHeader {
    pub layer: u32,
    pub empty: bool,
    pub entries: Vec<CodeBlockPacketEntry>,
}

fn bits_needed(value: u32) -> u32 {
    if value == 0 {
        1
    } else {
        32 - value.leading_zeros()
    }
}

impl PacketHeader {
    /// Encodes one precinct's packet header for `layer`. `bodies` maps
    /// each included code-block (by grid coordinate) to its coded
    /// length in bytes; a code-block absent from `bodies` or with a
    /// zero length is treated as not included this layer.
    pub fn encode(
        writer: &mut PacketBitWriter,
        state: &mut PrecinctState,
        layer: u32,
        bodies: &[(u32, u32, u32, u32)], // (x, y, num_passes, data_len)
    ) {
        if bodies.is_empty() {
            writer.write_bit(0);
            return;
        }
        writer.write_bit(1);

        for y in 0..state.grid_height {
            for x in 0..state.grid_width {
                let idx = state.index(x, y);
                let entry = bodies.iter().find(|&&(ex, ey, _, _)| ex == x && ey == y);

                if !state.included_before[idx] {
                    state.inclusion.encode(writer, x, y, layer + 1);
                    let Some(&(_, _, num_passes, data_len)) = entry else { continue };
                    state.included_before[idx] = true;
                    state.zero_bp.encode_value(writer, x, y);
                    writer.write_bits(num_passes, NUM_PASSES_BITS);
                    write_data_length(writer, &mut state.lblock[idx], data_len);
                } else {
                    match entry {
                        Some(&(_, _, num_passes, data_len)) => {
                            writer.write_bit(1);
                            writer.write_bits(num_passes, NUM_PASSES_BITS);
                            write_data_length(writer, &mut state.lblock[idx], data_len);
                        }
                        None => writer.write_bit(0),
                    }
                }
            }
        }
    }

    pub fn decode(reader: &mut PacketBitReader, state: &mut PrecinctState, layer: u32) -> Result<Self, Jpeg2000Error> {
        let mut header = PacketHeader { layer, empty: false, entries: Vec::new() };

        let non_empty = reader.read_bit()? == 1;
        if !non_empty {
            header.empty = true;
            return Ok(header);
        }

        for y in 0..state.grid_height {
            for x in 0..state.grid_width {
                let idx = state.index(x, y);
                let first_inclusion = !state.included_before[idx];

                let included = if first_inclusion {
                    let included = state.inclusion.decode(reader, x, y, layer + 1)?;
                    if included {
                        state.included_before[idx] = true;
                    }
                    included
                } else {
                    reader.read_bit()? == 1
                };

                if !included {
                    continue;
                }

                let zero_bitplanes = if first_inclusion { state.zero_bp.decode_value(reader, x, y)? } else { 0 };
                let num_passes = reader.read_bits(NUM_PASSES_BITS)?;
                let data_len = read_data_length(reader, &mut state.lblock[idx])?;

                header.entries.push(CodeBlockPacketEntry { x, y, zero_bitplanes, num_passes, data_len });
            }
        }

        Ok(header)
    }
}

fn write_data_length(writer: &mut PacketBitWriter, lblock: &mut u32, data_len: u32) {
    let needed = bits_needed(data_len).max(1);
    while *lblock < needed {
        writer.write_bit(1);
        *lblock += 1;
    }
    writer.write_bit(0);
    writer.write_bits(data_len, *lblock as u8);
}

fn read_data_length(reader: &mut PacketBitReader, lblock: &mut u32) -> Result<u32, Jpeg2000Error> {
    loop {
        if reader.read_bit()? == 0 {
            break;
        }
        *lblock += 1;
    }
    reader.read_bits(*lblock as u8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_packet_round_trips() {
        let mut state = PrecinctState::new(2, 2);
        for y in 0..2 {
            for x in 0..2 {
                state.prepare_code_block(x, y, None, 0);
            }
        }
        let mut writer = PacketBitWriter::new();
        PacketHeader::encode(&mut writer, &mut state, 0, &[]);
        let bytes = writer.finish();

        let mut dec_state = PrecinctState::new(2, 2);
        let mut reader = PacketBitReader::new(&bytes);
        let header = PacketHeader::decode(&mut reader, &mut dec_state, 0).unwrap();
        assert!(header.empty);
        assert!(header.entries.is_empty());
    }

    #[test]
    fn single_layer_inclusion_round_trips() {
        let mut state = PrecinctState::new(2, 2);
        state.prepare_code_block(0, 0, Some(0), 3);
        state.prepare_code_block(1, 0, None, 0);
        state.prepare_code_block(0, 1, Some(0), 1);
        state.prepare_code_block(1, 1, None, 0);

        let bodies = [(0u32, 0u32, 6u32, 120u32), (0u32, 1u32, 2u32, 9u32)];
        let mut writer = PacketBitWriter::new();
        PacketHeader::encode(&mut writer, &mut state, 0, &bodies);
        let bytes = writer.finish();

        let mut dec_state = PrecinctState::new(2, 2);
        let mut reader = PacketBitReader::new(&bytes);
        let header = PacketHeader::decode(&mut reader, &mut dec_state, 0).unwrap();
        assert!(!header.empty);
        assert_eq!(header.entries.len(), 2);

        let first = header.entries.iter().find(|e| e.x == 0 && e.y == 0).unwrap();
        assert_eq!(first.zero_bitplanes, 3);
        assert_eq!(first.num_passes, 6);
        assert_eq!(first.data_len, 120);

        let second = header.entries.iter().find(|e| e.x == 0 && e.y == 1).unwrap();
        assert_eq!(second.zero_bitplanes, 1);
        assert_eq!(second.num_passes, 2);
        assert_eq!(second.data_len, 9);
    }

    #[test]
    fn lblock_grows_to_cover_a_large_length() {
        let mut state = PrecinctState::new(1, 1);
        state.prepare_code_block(0, 0, Some(0), 0);
        let bodies = [(0u32, 0u32, 1u32, 5000u32)];
        let mut writer = PacketBitWriter::new();
        PacketHeader::encode(&mut writer, &mut state, 0, &bodies);
        let bytes = writer.finish();

        let mut dec_state = PrecinctState::new(1, 1);
        let mut reader = PacketBitReader::new(&bytes);
        let header = PacketHeader::decode(&mut reader, &mut dec_state, 0).unwrap();
        assert_eq!(header.entries[0].data_len, 5000);
    }
}
