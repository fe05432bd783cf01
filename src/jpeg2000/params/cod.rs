//! COD/COC marker segment: default and per-component coding style.
//!
//! Grounded on `param_cod`/`cod_SPcod`/`cod_SGcod` in `ojph_params_local.h`:
//! block-coding-style bit layout, progression-order enum, and the
//! `wavelet_trans` values that double as synthetic ATK registry indices
//! (see DESIGN.md "ATK registry indices").

use crate::error::Jpeg2000Error;
use crate::jpeg2000::params::siz::Siz;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ProgressionOrder {
    Lrcp = 0,
    Rlcp = 1,
    Rpcl = 2,
    Pcrl = 3,
    Cprl = 4,
}

impl ProgressionOrder {
    pub fn from_u8(v: u8) -> Result<Self, Jpeg2000Error> {
        match v {
            0 => Ok(Self::Lrcp),
            1 => Ok(Self::Rlcp),
            2 => Ok(Self::Rpcl),
            3 => Ok(Self::Pcrl),
            4 => Ok(Self::Cprl),
            _ => Err(Jpeg2000Error::InvalidField { marker: 0xFF52, offset: 0 }),
        }
    }

    /// RPCL and PCRL require power-of-two component downsampling (§3).
    pub fn requires_power_of_two_downsampling(self) -> bool {
        matches!(self, Self::Rpcl | Self::Pcrl)
    }
}

pub const BLOCK_STYLE_VERT_CAUSAL: u8 = 0x8;
pub const BLOCK_STYLE_HT_MODE: u8 = 0x40;

/// Synthetic ATK registry indices for the two standard wavelets, per
/// `param_cod::dwt_type` (`DWT_IRV97 = 0`, `DWT_REV53 = 1`).
pub const WAVELET_IRREVERSIBLE_97: u8 = 0;
pub const WAVELET_REVERSIBLE_53: u8 = 1;

#[derive(Debug, Clone)]
pub struct Cod {
    pub scod: u8,
    pub progression_order: ProgressionOrder,
    pub num_layers: u16,
    pub use_color_transform: bool,
    /// Bit 7 of the raw byte flags a DFS reference in the low nibble.
    pub num_decomp_raw: u8,
    pub block_width_exp: u8,
    pub block_height_exp: u8,
    pub block_style: u8,
    pub wavelet_id: u8,
    /// Present only when `scod & 1 != 0`; log2 `(PPx, PPy)` per resolution.
    pub precinct_sizes: Vec<(u8, u8)>,
}

impl Cod {
    pub fn num_decompositions(&self) -> u8 {
        self.num_decomp_raw & 0x7F
    }

    pub fn is_dfs_defined(&self) -> bool {
        self.num_decomp_raw & 0x80 != 0
    }

    pub fn dfs_index(&self) -> u8 {
        self.num_decomp_raw & 0xF
    }

    pub fn is_ht_mode(&self) -> bool {
        self.block_style & BLOCK_STYLE_HT_MODE != 0
    }

    pub fn is_vertically_causal(&self) -> bool {
        self.block_style & BLOCK_STYLE_VERT_CAUSAL != 0
    }

    pub fn block_dims(&self) -> (u32, u32) {
        (
            1u32 << (self.block_width_exp as u32 + 2),
            1u32 << (self.block_height_exp as u32 + 2),
        )
    }

    pub fn has_explicit_precincts(&self) -> bool {
        self.scod & 1 != 0
    }

    pub fn may_use_sop(&self) -> bool {
        self.scod & 2 != 0
    }

    pub fn uses_eph(&self) -> bool {
        self.scod & 4 != 0
    }

    /// Log2 precinct size at resolution `r`, defaulting to 15 (§4.2).
    pub fn log_precinct_size(&self, r: u32) -> (u8, u8) {
        if self.has_explicit_precincts() {
            self.precinct_sizes
                .get(r as usize)
                .copied()
                .unwrap_or((15, 15))
        } else {
            (15, 15)
        }
    }

    pub fn check_validity(&self, siz: &Siz) -> Result<(), Jpeg2000Error> {
        let num_comps = siz.num_components();
        if self.use_color_transform {
            if num_comps < 3 {
                return Err(Jpeg2000Error::ColorTransformTooFewComponents);
            }
            let (x0, y0) = siz.component(0)?.downsampling();
            for i in 1..3 {
                let (xi, yi) = siz.component(i)?.downsampling();
                if xi != x0 || yi != y0 {
                    return Err(Jpeg2000Error::ColorTransformDownsamplingMismatch);
                }
            }
        }
        if self.progression_order.requires_power_of_two_downsampling() {
            for i in 0..num_comps {
                let (xr, yr) = siz.component(i)?.downsampling();
                if xr & (xr - 1) != 0 || yr & (yr - 1) != 0 {
                    return Err(Jpeg2000Error::NonPowerOfTwoDownsampling);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg2000::params::siz::SizComponentInfo;

    fn siz_with_downsampling(ds: &[(u8, u8)]) -> Siz {
        Siz {
            rsiz: 0x4000,
            x_siz: 64,
            y_siz: 64,
            x_osiz: 0,
            y_osiz: 0,
            xt_siz: 64,
            yt_siz: 64,
            xt_osiz: 0,
            yt_osiz: 0,
            components: ds
                .iter()
                .map(|&(x, y)| SizComponentInfo { s_siz: 7, x_rsiz: x, y_rsiz: y })
                .collect(),
        }
    }

    fn base_cod() -> Cod {
        Cod {
            scod: 0,
            progression_order: ProgressionOrder::Rpcl,
            num_layers: 1,
            use_color_transform: true,
            num_decomp_raw: 5,
            block_width_exp: 4,
            block_height_exp: 4,
            block_style: BLOCK_STYLE_HT_MODE,
            wavelet_id: WAVELET_REVERSIBLE_53,
            precinct_sizes: vec![],
        }
    }

    #[test]
    fn block_dims_decode_log2_minus_2_encoding() {
        let cod = base_cod();
        assert_eq!(cod.block_dims(), (64, 64));
    }

    #[test]
    fn rpcl_rejects_non_power_of_two_downsampling() {
        let siz = siz_with_downsampling(&[(1, 1), (3, 3), (3, 3)]);
        let cod = base_cod();
        assert_eq!(
            cod.check_validity(&siz),
            Err(Jpeg2000Error::NonPowerOfTwoDownsampling)
        );
    }

    #[test]
    fn color_transform_requires_three_matching_components() {
        let siz = siz_with_downsampling(&[(1, 1), (1, 1)]);
        let cod = base_cod();
        assert_eq!(
            cod.check_validity(&siz),
            Err(Jpeg2000Error::ColorTransformTooFewComponents)
        );
    }

    #[test]
    fn ht_mode_bit_is_respected() {
        let cod = base_cod();
        assert!(cod.is_ht_mode());
    }
}
