//! DFS marker segment: downsampling-factor styles (non-standard
//! per-level decomposition trees).
//!
//! Grounded on `param_dfs` in `ojph_params_local.h`: `Ddfs` packs one
//! 2-bit split-type code per decomposition sub-level, finest first.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DwtSplit {
    /// No transform at this level; samples pass through unchanged.
    None = 0,
    /// Conventional two-axis (horizontal + vertical) DWT.
    Bidirectional = 1,
    /// Horizontal-only DWT; vertical axis passes through.
    Horizontal = 2,
    /// Vertical-only DWT; horizontal axis passes through.
    Vertical = 3,
}

impl DwtSplit {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x3 {
            0 => Self::None,
            1 => Self::Bidirectional,
            2 => Self::Horizontal,
            _ => Self::Vertical,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dfs {
    pub index: u16,
    /// One entry per decomposition sub-level, starting at sub-level 1
    /// (finest).
    pub levels: Vec<DwtSplit>,
}

impl Dfs {
    pub fn from_packed_bytes(index: u16, num_levels: u8, packed: &[u8]) -> Self {
        let mut levels = Vec::with_capacity(num_levels as usize);
        for i in 0..num_levels as usize {
            let byte = packed[i / 4];
            let shift = (i % 4) * 2;
            levels.push(DwtSplit::from_bits(byte >> shift));
        }
        Dfs { index, levels }
    }

    /// Split type at decomposition level `level` (1 = finest). Levels
    /// beyond the declared table default to the conventional transform.
    pub fn split_at(&self, level: u32) -> DwtSplit {
        self.levels
            .get(level as usize - 1)
            .copied()
            .unwrap_or(DwtSplit::Bidirectional)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unpacks_2_bit_codes_in_order() {
        // byte 0b_11_10_01_00 => level1=None(0), level2=Bidir(1), level3=Horz(2), level4=Vert(3)
        let dfs = Dfs::from_packed_bytes(0, 4, &[0b11_10_01_00]);
        assert_eq!(dfs.split_at(1), DwtSplit::None);
        assert_eq!(dfs.split_at(2), DwtSplit::Bidirectional);
        assert_eq!(dfs.split_at(3), DwtSplit::Horizontal);
        assert_eq!(dfs.split_at(4), DwtSplit::Vertical);
    }

    #[test]
    fn defaults_to_bidirectional_past_table() {
        let dfs = Dfs::from_packed_bytes(0, 1, &[0b01]);
        assert_eq!(dfs.split_at(5), DwtSplit::Bidirectional);
    }
}
