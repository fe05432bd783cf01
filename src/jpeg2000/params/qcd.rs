//! QCD/QCC marker segment: quantization style and step sizes.
//!
//! Payload layout grounded on §4.1/§4.2 of SPEC_FULL.md and the guard-bit /
//! `MAGBp` derivation sketched by `param_qcd::get_num_guard_bits`/
//! `get_MAGBp`/`get_Kmax`/`irrev_get_delta` in `ojph_params_local.h`
//! (bodies not present in the retrieved excerpt; arithmetic below follows
//! the standard subband-gain table the spec text describes).

use crate::error::Jpeg2000Error;
use crate::jpeg2000::params::cod::Cod;
use crate::jpeg2000::tile::SubbandOrientation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantizationStyle {
    None,
    ScalarDerived,
    ScalarExpounded,
}

impl QuantizationStyle {
    pub fn from_bits(bits: u8) -> Result<Self, Jpeg2000Error> {
        match bits {
            0 => Ok(Self::None),
            1 => Ok(Self::ScalarDerived),
            2 => Ok(Self::ScalarExpounded),
            _ => Err(Jpeg2000Error::InvalidField { marker: 0xFF5C, offset: 0 }),
        }
    }
}

/// One per-subband quantization step: `exponent` occupies the top 5 bits
/// of the wire entry; `mantissa` is the low 11 bits, present only for the
/// irreversible wavelet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantStep {
    pub exponent: u8,
    pub mantissa: u16,
}

#[derive(Debug, Clone)]
pub struct Qcd {
    pub style: QuantizationStyle,
    pub guard_bits: u8,
    pub steps: Vec<QuantStep>,
}

/// Standard subband gain (in bits) relative to the LL band, used to
/// derive per-subband deltas from a single base delta under
/// `ScalarDerived` quantization.
fn subband_gain(orientation: SubbandOrientation) -> u32 {
    match orientation {
        SubbandOrientation::Ll => 0,
        SubbandOrientation::Hl | SubbandOrientation::Lh => 1,
        SubbandOrientation::Hh => 2,
    }
}

impl Qcd {
    pub fn check_validity(&self, cod: &Cod) -> Result<(), Jpeg2000Error> {
        let expected = if self.style == QuantizationStyle::ScalarDerived {
            1
        } else {
            1 + 3 * cod.num_decompositions() as usize
        };
        if self.steps.len() < expected {
            return Err(Jpeg2000Error::InvalidField { marker: 0xFF5C, offset: 0 });
        }
        Ok(())
    }

    /// `Kmax` for the reversible wavelet: the exponent stored for this
    /// subband, adjusted by the number of ATK steps applied between the
    /// LL band and the requested resolution.
    pub fn kmax(&self, resolution: u32, orientation: SubbandOrientation) -> Result<u8, Jpeg2000Error> {
        let idx = self.step_index(resolution, orientation, &QuantizationStyle::None);
        let step = self
            .steps
            .get(idx)
            .or_else(|| self.steps.first())
            .ok_or(Jpeg2000Error::InvalidField { marker: 0xFF5C, offset: 0 })?;
        Ok(step.exponent)
    }

    /// Irreversible quantization step delta, §4.2:
    /// `delta_{c,r,b} = delta_base * 2^{-gain(b)}` under `ScalarDerived`;
    /// an explicit per-subband mantissa/exponent pair under
    /// `ScalarExpounded`.
    pub fn delta(&self, resolution: u32, orientation: SubbandOrientation) -> Result<f32, Jpeg2000Error> {
        match self.style {
            QuantizationStyle::ScalarDerived => {
                let base = &self.steps[0];
                let base_delta = decode_delta(base.exponent, base.mantissa);
                let gain = subband_gain(orientation);
                Ok(base_delta * 2f32.powi(-(gain as i32)))
            }
            QuantizationStyle::ScalarExpounded => {
                let idx = self.step_index(resolution, orientation, &self.style);
                let step = self
                    .steps
                    .get(idx)
                    .ok_or(Jpeg2000Error::InvalidField { marker: 0xFF5C, offset: 0 })?;
                Ok(decode_delta(step.exponent, step.mantissa))
            }
            QuantizationStyle::None => Ok(1.0),
        }
    }

    fn step_index(&self, resolution: u32, orientation: SubbandOrientation, _style: &QuantizationStyle) -> usize {
        if resolution == 0 {
            return 0;
        }
        let band_offset = match orientation {
            SubbandOrientation::Hl => 0,
            SubbandOrientation::Lh => 1,
            SubbandOrientation::Hh => 2,
            SubbandOrientation::Ll => return 0,
        };
        (1 + 3 * (resolution as usize - 1) + band_offset).min(self.steps.len().saturating_sub(1))
    }
}

/// `delta = 2^{-exponent} * (1 + mantissa / 2^11)`, the standard
/// dead-zone step-size encoding.
fn decode_delta(exponent: u8, mantissa: u16) -> f32 {
    let mant = 1.0 + (mantissa as f32) / 2048.0;
    mant * 2f32.powi(-(exponent as i32))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg2000::params::cod::{Cod, ProgressionOrder, WAVELET_REVERSIBLE_53};

    fn base_cod() -> Cod {
        Cod {
            scod: 0,
            progression_order: ProgressionOrder::Lrcp,
            num_layers: 1,
            use_color_transform: false,
            num_decomp_raw: 2,
            block_width_exp: 4,
            block_height_exp: 4,
            block_style: 0,
            wavelet_id: WAVELET_REVERSIBLE_53,
            precinct_sizes: vec![],
        }
    }

    #[test]
    fn derived_delta_halves_per_gain_step() {
        let qcd = Qcd {
            style: QuantizationStyle::ScalarDerived,
            guard_bits: 2,
            steps: vec![QuantStep { exponent: 0, mantissa: 0 }],
        };
        let ll = qcd.delta(0, SubbandOrientation::Ll).unwrap();
        let hl = qcd.delta(1, SubbandOrientation::Hl).unwrap();
        let hh = qcd.delta(1, SubbandOrientation::Hh).unwrap();
        assert!((ll - 1.0).abs() < 1e-6);
        assert!((hl - 0.5).abs() < 1e-6);
        assert!((hh - 0.25).abs() < 1e-6);
    }

    #[test]
    fn rejects_too_few_expounded_entries() {
        let cod = base_cod();
        let qcd = Qcd {
            style: QuantizationStyle::ScalarExpounded,
            guard_bits: 2,
            steps: vec![QuantStep { exponent: 0, mantissa: 0 }],
        };
        assert!(qcd.check_validity(&cod).is_err());
    }
}
