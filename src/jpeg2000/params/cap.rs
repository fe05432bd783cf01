//! CAP marker segment: HTJ2K capability flags.
//!
//! Grounded on `param_cap::check_validity` in `ojph_params_local.h`: the
//! `Bp` derivation from the maximum magnitude-bitplane count, and the
//! `Pcap` bit-14 (MSB-counted) HTJ2K/JPH marker.

use crate::jpeg2000::params::cod::Cod;

#[derive(Debug, Clone)]
pub struct Cap {
    pub pcap: u32,
    pub ccap: Vec<u16>,
}

impl Cap {
    /// `Pcap` bit 15 (1-indexed from the MSB, i.e. bit index 14 from the
    /// LSB of the low 16 bits) signals HTJ2K capability, matching
    /// `Rsiz`'s JPH bit.
    pub fn is_htj2k(&self) -> bool {
        self.pcap & 0x0000_8000 != 0 || self.pcap & 0x0002_0000 != 0
    }

    /// `Ccap0` bit 6: this codestream's samples were converted with the
    /// NLT type-3 sign fold (§4.6) rather than the plain level shift, a
    /// detail the decoder otherwise has no way to recover since neither
    /// SIZ nor COD carries it.
    pub fn uses_nlt_type3(&self) -> bool {
        self.ccap.first().is_some_and(|&c| c & 0x0040 != 0)
    }

    pub fn from_magnitude_bitplanes(cod: &Cod, magnitude_bitplanes: u32, nlt_type3: bool) -> Self {
        let bp: u32 = if magnitude_bitplanes <= 8 {
            0
        } else if magnitude_bitplanes < 28 {
            magnitude_bitplanes - 8
        } else if magnitude_bitplanes < 48 {
            13 + (magnitude_bitplanes >> 2)
        } else {
            31
        };
        let mut ccap0: u16 = if cod.is_ht_mode() { 0x0020 } else { 0x0000 };
        if nlt_type3 {
            ccap0 |= 0x0040;
        }
        ccap0 &= 0xFFE0;
        ccap0 |= bp as u16;
        Cap {
            pcap: 0x0002_0000,
            ccap: vec![ccap0],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg2000::params::cod::{Cod, ProgressionOrder, WAVELET_REVERSIBLE_53};

    #[test]
    fn detects_htj2k_bit() {
        let cap = Cap { pcap: 0x0002_0000, ccap: vec![] };
        assert!(cap.is_htj2k());
        let not_ht = Cap { pcap: 0, ccap: vec![] };
        assert!(!not_ht.is_htj2k());
    }

    #[test]
    fn bp_zero_for_shallow_bitdepth() {
        let cod = Cod {
            scod: 0,
            progression_order: ProgressionOrder::Lrcp,
            num_layers: 1,
            use_color_transform: false,
            num_decomp_raw: 5,
            block_width_exp: 4,
            block_height_exp: 4,
            block_style: 0x40,
            wavelet_id: WAVELET_REVERSIBLE_53,
            precinct_sizes: vec![],
        };
        let cap = Cap::from_magnitude_bitplanes(&cod, 6, false);
        assert_eq!(cap.ccap[0] & 0x1F, 0);
        assert!(!cap.uses_nlt_type3());
    }

    #[test]
    fn nlt_type3_bit_round_trips() {
        let cod = Cod {
            scod: 0,
            progression_order: ProgressionOrder::Lrcp,
            num_layers: 1,
            use_color_transform: false,
            num_decomp_raw: 5,
            block_width_exp: 4,
            block_height_exp: 4,
            block_style: 0x40,
            wavelet_id: WAVELET_REVERSIBLE_53,
            precinct_sizes: vec![],
        };
        let cap = Cap::from_magnitude_bitplanes(&cod, 6, true);
        assert!(cap.uses_nlt_type3());
    }
}
