//! Tag tree (Annex B.10.2): the hierarchical min-value structure used
//! in packet headers to signal per-code-block inclusion and
//! zero-bitplane counts a few bits at a time, one quality layer per
//! call. Grounded conceptually on the per-bit streaming shape of
//! `examples/iszak-jpeg2000/jpc/src/tag_tree.rs`; the node/level layout
//! here is self-authored since that reference exposes a
//! `push_bit`-style API rather than the `(x, y, threshold)` entry
//! points the packet layer needs.

use crate::error::Jpeg2000Error;
use crate::jpeg2000::bit_io::{PacketBitReader, PacketBitWriter};

#[derive(Debug, Clone, Copy)]
struct Node {
    value: u32,
    low: u32,
    known: bool,
}

impl Default for Node {
    fn default() -> Self {
        Node { value: u32::MAX, low: 0, known: false }
    }
}

struct Level {
    w: u32,
    h: u32,
    nodes: Vec<Node>,
}

fn div_ceil(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

/// Upper bound on a revealable literal value (zero-bitplane counts
/// never approach this); keeps `decode_value` from looping forever on
/// corrupt input.
const MAX_REVEALABLE_VALUE: u32 = 2048;

pub struct TagTree {
    levels: Vec<Level>,
    finalized: bool,
}

impl TagTree {
    pub fn new(width: u32, height: u32) -> Self {
        let (mut lw, mut lh) = (width.max(1), height.max(1));
        let mut levels = Vec::new();
        loop {
            levels.push(Level { w: lw, h: lh, nodes: vec![Node::default(); (lw * lh) as usize] });
            if lw == 1 && lh == 1 {
                break;
            }
            lw = div_ceil(lw, 2);
            lh = div_ceil(lh, 2);
        }
        TagTree { levels, finalized: false }
    }

    fn ancestor_path(&self, x: u32, y: u32) -> Vec<(usize, usize)> {
        let mut path = Vec::with_capacity(self.levels.len());
        let (mut cx, mut cy) = (x, y);
        for (level, l) in self.levels.iter().enumerate() {
            path.push((level, (cy * l.w + cx) as usize));
            cx /= 2;
            cy /= 2;
        }
        path
    }

    /// Sets a leaf's true value. Encoder-only; ancestors are
    /// recomputed lazily on first `encode` call.
    pub fn set_value(&mut self, x: u32, y: u32, value: u32) {
        let w = self.levels[0].w;
        self.levels[0].nodes[(y * w + x) as usize].value = value;
        self.finalized = false;
    }

    fn finalize_if_needed(&mut self) {
        if self.finalized {
            return;
        }
        for level in 1..self.levels.len() {
            let (pw, ph) = (self.levels[level].w, self.levels[level].h);
            let (cw, ch) = (self.levels[level - 1].w, self.levels[level - 1].h);
            for py in 0..ph {
                for px in 0..pw {
                    let mut min_val = u32::MAX;
                    for dy in 0..2 {
                        for dx in 0..2 {
                            let gx = px * 2 + dx;
                            let gy = py * 2 + dy;
                            if gx < cw && gy < ch {
                                min_val = min_val.min(self.levels[level - 1].nodes[(gy * cw + gx) as usize].value);
                            }
                        }
                    }
                    self.levels[level].nodes[(py * pw + px) as usize].value = min_val;
                }
            }
        }
        self.finalized = true;
    }

    /// Reveals whether the leaf's value is `<= threshold`, writing only
    /// the bits not already implied by an earlier (lower-threshold)
    /// call for the same leaf.
    pub fn encode(&mut self, writer: &mut PacketBitWriter, x: u32, y: u32, threshold: u32) {
        self.finalize_if_needed();
        let path = self.ancestor_path(x, y);
        let mut low = 0u32;
        for &(level, idx) in path.iter().rev() {
            let value = self.levels[level].nodes[idx].value;
            let node = &mut self.levels[level].nodes[idx];
            if low > node.low {
                node.low = low;
            } else {
                low = node.low;
            }
            while !node.known && node.low < threshold {
                if node.low >= value {
                    writer.write_bit(1);
                    node.known = true;
                } else {
                    writer.write_bit(0);
                    node.low += 1;
                }
            }
            low = node.low;
        }
    }

    pub fn decode(&mut self, reader: &mut PacketBitReader, x: u32, y: u32, threshold: u32) -> Result<bool, Jpeg2000Error> {
        let path = self.ancestor_path(x, y);
        let mut low = 0u32;
        let (mut leaf_low, mut leaf_known) = (0u32, false);
        for &(level, idx) in path.iter().rev() {
            let node = &mut self.levels[level].nodes[idx];
            if low > node.low {
                node.low = low;
            } else {
                low = node.low;
            }
            while !node.known && node.low < threshold {
                let bit = reader.read_bit()?;
                if bit == 1 {
                    node.known = true;
                } else {
                    node.low += 1;
                }
            }
            low = node.low;
            leaf_low = node.low;
            leaf_known = node.known;
        }
        Ok(leaf_low < threshold || (leaf_low == threshold && leaf_known))
    }

    /// Encodes a leaf's full value in one shot (used for zero-bitplane
    /// counts, which are not tested incrementally against a threshold
    /// per layer the way inclusion is).
    pub fn encode_value(&mut self, writer: &mut PacketBitWriter, x: u32, y: u32) {
        self.finalize_if_needed();
        let w = self.levels[0].w;
        let value = self.levels[0].nodes[(y * w + x) as usize].value;
        self.encode(writer, x, y, value + 1);
    }

    pub fn decode_value(&mut self, reader: &mut PacketBitReader, x: u32, y: u32) -> Result<u32, Jpeg2000Error> {
        self.decode(reader, x, y, MAX_REVEALABLE_VALUE)?;
        let path = self.ancestor_path(x, y);
        let (level, idx) = path[0];
        Ok(self.levels[level].nodes[idx].low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveals_inclusion_threshold_across_layers() {
        let mut enc = TagTree::new(4, 4);
        // code-block (2, 1) first becomes included at layer 2.
        for y in 0..4u32 {
            for x in 0..4u32 {
                enc.set_value(x, y, if (x, y) == (2, 1) { 2 } else { 5 });
            }
        }
        let mut writer = PacketBitWriter::new();
        for layer in 0..4u32 {
            enc.encode(&mut writer, 2, 1, layer);
        }
        let bytes = writer.finish();

        let mut dec = TagTree::new(4, 4);
        let mut reader = PacketBitReader::new(&bytes);
        let mut results = Vec::new();
        for layer in 0..4u32 {
            results.push(dec.decode(&mut reader, 2, 1, layer).unwrap());
        }
        assert_eq!(results, vec![false, false, true, true]);
    }

    #[test]
    fn round_trips_a_literal_value() {
        let mut enc = TagTree::new(3, 3);
        for y in 0..3u32 {
            for x in 0..3u32 {
                enc.set_value(x, y, (x + y * 3) * 2);
            }
        }
        let mut writer = PacketBitWriter::new();
        for y in 0..3u32 {
            for x in 0..3u32 {
                enc.encode_value(&mut writer, x, y);
            }
        }
        let bytes = writer.finish();

        let mut dec = TagTree::new(3, 3);
        let mut reader = PacketBitReader::new(&bytes);
        for y in 0..3u32 {
            for x in 0..3u32 {
                let v = dec.decode_value(&mut reader, x, y).unwrap();
                assert_eq!(v, (x + y * 3) * 2);
            }
        }
    }

    #[test]
    fn single_leaf_tree_works() {
        let mut enc = TagTree::new(1, 1);
        enc.set_value(0, 0, 7);
        let mut writer = PacketBitWriter::new();
        enc.encode_value(&mut writer, 0, 0);
        let bytes = writer.finish();

        let mut dec = TagTree::new(1, 1);
        let mut reader = PacketBitReader::new(&bytes);
        assert_eq!(dec.decode_value(&mut reader, 0, 0).unwrap(), 7);
    }
}
