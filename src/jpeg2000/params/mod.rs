//! Parameter Store: the validated, cross-linked configuration derived
//! from marker-segment data (§4.2).
//!
//! Parent/child links across markers (COC→COD, SIZ→COD, SIZ→DFS) are
//! resolved once here into plain indices/lookups rather than the mutable
//! back-pointers `ojph_params_local.h` uses, per the Design Note in
//! SPEC_FULL.md §9.

pub mod atk;
pub mod cap;
pub mod cod;
pub mod dfs;
pub mod qcd;
pub mod siz;
pub mod sot;

use crate::error::Jpeg2000Error;
use crate::jpeg2000::tile::SubbandOrientation;
use atk::Atk;
use cap::Cap;
use cod::{Cod, ProgressionOrder};
use dfs::Dfs;
use qcd::Qcd;
use siz::Siz;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepSize {
    Reversible(u8),
    Irreversible(f32),
}

#[derive(Debug, Clone)]
pub struct ParameterStore {
    pub siz: Siz,
    pub cod: Cod,
    pub qcd: Qcd,
    pub cap: Option<Cap>,
    /// Per-component COC/QCC overrides, keyed by component index.
    pub coc: HashMap<u32, Cod>,
    pub qcc: HashMap<u32, Qcd>,
    pub atks: Vec<Atk>,
    pub dfss: Vec<Dfs>,
}

impl ParameterStore {
    pub fn new(
        siz: Siz,
        cod: Cod,
        qcd: Qcd,
        cap: Option<Cap>,
        atks: Vec<Atk>,
        dfss: Vec<Dfs>,
    ) -> Result<Self, Jpeg2000Error> {
        let store = ParameterStore {
            siz,
            cod,
            qcd,
            cap,
            coc: HashMap::new(),
            qcc: HashMap::new(),
            atks,
            dfss,
        };
        store.check_validity()?;
        Ok(store)
    }

    pub fn with_component_overrides(
        mut self,
        coc: HashMap<u32, Cod>,
        qcc: HashMap<u32, Qcd>,
    ) -> Result<Self, Jpeg2000Error> {
        self.coc = coc;
        self.qcc = qcc;
        self.check_validity()?;
        Ok(self)
    }

    /// Validation performed once before any tile processing (§4.2).
    pub fn check_validity(&self) -> Result<(), Jpeg2000Error> {
        self.siz.check_validity()?;
        self.cod.check_validity(&self.siz)?;
        self.qcd.check_validity(&self.cod)?;
        for &comp in self.coc.keys() {
            if comp >= self.siz.num_components() {
                return Err(Jpeg2000Error::UnknownComponentReference(comp));
            }
        }
        for &comp in self.qcc.keys() {
            if comp >= self.siz.num_components() {
                return Err(Jpeg2000Error::UnknownComponentReference(comp));
            }
        }
        if self.cod.is_dfs_defined() && self.dfs_for(self.cod.dfs_index() as u32).is_none() {
            return Err(Jpeg2000Error::MissingDfs(self.cod.dfs_index() as u32));
        }
        if self.cod.wavelet_id as usize >= 2 && self.atk_for(self.cod.wavelet_id as u32).is_none() {
            return Err(Jpeg2000Error::MissingAtk(self.cod.wavelet_id as u32));
        }
        Ok(())
    }

    pub fn num_components(&self) -> u32 {
        self.siz.num_components()
    }

    pub fn component_size(&self, c: u32) -> Result<(u32, u32), Jpeg2000Error> {
        Ok((self.siz.width(c)?, self.siz.height(c)?))
    }

    /// Reconstruction size at `skipped_resolutions` (§4.2): each skipped
    /// resolution halves (with ceiling division) the full-resolution
    /// component size.
    pub fn reconstruction_size(&self, c: u32, skipped_resolutions: u32) -> Result<(u32, u32), Jpeg2000Error> {
        let (w, h) = self.component_size(c)?;
        let div = 1u32 << skipped_resolutions;
        Ok(((w + div - 1) / div, (h + div - 1) / div))
    }

    pub fn cod_for_component(&self, c: u32) -> Result<&Cod, Jpeg2000Error> {
        if c >= self.num_components() {
            return Err(Jpeg2000Error::ComponentOutOfRange(c));
        }
        Ok(self.coc.get(&c).unwrap_or(&self.cod))
    }

    pub fn qcd_for_component(&self, c: u32) -> Result<&Qcd, Jpeg2000Error> {
        if c >= self.num_components() {
            return Err(Jpeg2000Error::ComponentOutOfRange(c));
        }
        Ok(self.qcc.get(&c).unwrap_or(&self.qcd))
    }

    pub fn resolution_count(&self, c: u32) -> Result<u8, Jpeg2000Error> {
        Ok(self.cod_for_component(c)?.num_decompositions() + 1)
    }

    pub fn precinct_size(&self, c: u32, r: u32) -> Result<(u32, u32), Jpeg2000Error> {
        let (log_w, log_h) = self.cod_for_component(c)?.log_precinct_size(r);
        Ok((1u32 << log_w, 1u32 << log_h))
    }

    /// Integer `Kmax` (reversible) or float `delta` (irreversible) for
    /// subband `(r, orientation)` of component `c` (§4.2).
    pub fn get_step_size(
        &self,
        c: u32,
        r: u32,
        orientation: SubbandOrientation,
    ) -> Result<StepSize, Jpeg2000Error> {
        let cod = self.cod_for_component(c)?;
        let qcd = self.qcd_for_component(c)?;
        if cod.wavelet_id == cod::WAVELET_REVERSIBLE_53 {
            Ok(StepSize::Reversible(qcd.kmax(r, orientation)?))
        } else {
            Ok(StepSize::Irreversible(qcd.delta(r, orientation)?))
        }
    }

    pub fn progression_order(&self) -> ProgressionOrder {
        self.cod.progression_order
    }

    pub fn dfs_for(&self, index: u32) -> Option<&Dfs> {
        self.dfss.iter().find(|d| d.index as u32 == index)
    }

    pub fn atk_for(&self, index: u32) -> Option<&Atk> {
        self.atks.iter().find(|a| a.index as u32 == index)
    }

    /// Number of guard bits from QCD's `Sqcd` high bits (§4.1).
    pub fn num_guard_bits(&self, c: u32) -> Result<u8, Jpeg2000Error> {
        Ok(self.qcd_for_component(c)?.guard_bits)
    }

    /// Maximum magnitude-bitplane count across all subbands, used by
    /// CAP's `Bp` field and the block-coder interface's
    /// `num_magnitude_bitplanes` contract parameter (§4.2, §4.7).
    pub fn magnitude_bitplanes(&self, c: u32) -> Result<u32, Jpeg2000Error> {
        let cod = self.cod_for_component(c)?;
        let qcd = self.qcd_for_component(c)?;
        let guard = qcd.guard_bits as u32;
        let mut max_kmax = 0u32;
        for r in 0..=cod.num_decompositions() as u32 {
            let orientations: &[SubbandOrientation] = if r == 0 {
                &[SubbandOrientation::Ll]
            } else {
                &[
                    SubbandOrientation::Hl,
                    SubbandOrientation::Lh,
                    SubbandOrientation::Hh,
                ]
            };
            for &o in orientations {
                if let Ok(k) = qcd.kmax(r, o) {
                    max_kmax = max_kmax.max(k as u32);
                }
            }
        }
        Ok(max_kmax + guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg2000::params::cod::WAVELET_REVERSIBLE_53;
    use crate::jpeg2000::params::qcd::{QuantStep, QuantizationStyle};
    use crate::jpeg2000::params::siz::SizComponentInfo;

    fn base_store() -> ParameterStore {
        let siz = Siz {
            rsiz: 0x4000,
            x_siz: 352,
            y_siz: 288,
            x_osiz: 0,
            y_osiz: 0,
            xt_siz: 352,
            yt_siz: 288,
            xt_osiz: 0,
            yt_osiz: 0,
            components: vec![
                SizComponentInfo { s_siz: 7, x_rsiz: 1, y_rsiz: 1 },
                SizComponentInfo { s_siz: 7, x_rsiz: 2, y_rsiz: 2 },
                SizComponentInfo { s_siz: 7, x_rsiz: 2, y_rsiz: 2 },
            ],
        };
        let cod = Cod {
            scod: 0,
            progression_order: ProgressionOrder::Lrcp,
            num_layers: 1,
            use_color_transform: true,
            num_decomp_raw: 5,
            block_width_exp: 4,
            block_height_exp: 4,
            block_style: 0x40,
            wavelet_id: WAVELET_REVERSIBLE_53,
            precinct_sizes: vec![],
        };
        let qcd = Qcd {
            style: QuantizationStyle::ScalarDerived,
            guard_bits: 2,
            steps: vec![QuantStep { exponent: 0, mantissa: 0 }],
        };
        ParameterStore::new(siz, cod, qcd, None, vec![], vec![]).unwrap()
    }

    #[test]
    fn s6_scenario_component_sizes_and_color_transform() {
        let store = base_store();
        assert_eq!(store.component_size(0).unwrap(), (352, 288));
        assert_eq!(store.component_size(1).unwrap(), (176, 144));
        assert_eq!(store.component_size(2).unwrap(), (176, 144));
        assert!(store.cod.use_color_transform);
    }

    #[test]
    fn rejects_coc_referencing_unknown_component() {
        let store = base_store();
        let mut coc = HashMap::new();
        coc.insert(99, store.cod.clone());
        assert!(store.with_component_overrides(coc, HashMap::new()).is_err());
    }

    #[test]
    fn reconstruction_size_halves_per_skip() {
        let store = base_store();
        assert_eq!(store.reconstruction_size(0, 1).unwrap(), (176, 144));
        assert_eq!(store.reconstruction_size(0, 2).unwrap(), (88, 72));
    }
}
