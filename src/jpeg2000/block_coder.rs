//! Block Coder Interface (§4.7): the opaque per-code-block entropy
//! coder boundary. Implementors consume/produce a rectangle of
//! quantized coefficients given a magnitude-bitplane count; neither
//! implementor is required to be bit-exact against any external
//! reference, only self-consistent within this crate.

use crate::error::Jpeg2000Error;
use crate::jpeg2000::bit_plane_coder::BitPlaneCoder;
use crate::jpeg2000::ht_block_coder;
use crate::jpeg2000::tile::SubbandOrientation;

/// `band` selects the zero-coding context table for the legacy coder:
/// LL/LH share a table, HL transposes it, HH uses its own.
fn band_for(subband_tag: SubbandOrientation) -> u8 {
    match subband_tag {
        SubbandOrientation::Ll | SubbandOrientation::Lh => 0,
        SubbandOrientation::Hl => 2,
        SubbandOrientation::Hh => 3,
    }
}

/// Encodes/decodes one code-block's worth of quantized coefficients,
/// selectable per-tile-component by the Parameter Store's `block_style`
/// HT-mode bit.
pub trait BlockCoder {
    fn encode(
        &self,
        subband_tag: SubbandOrientation,
        coeffs: &[i32],
        width: u32,
        height: u32,
        num_magnitude_bitplanes: u32,
    ) -> Result<(Vec<u8>, u32), Jpeg2000Error>;

    fn decode(
        &self,
        subband_tag: SubbandOrientation,
        bytes: &[u8],
        width: u32,
        height: u32,
        num_magnitude_bitplanes: u32,
    ) -> Result<Vec<i32>, Jpeg2000Error>;
}

/// HTJ2K variant: MEL run-mode gate, VLC significance codeword, MagSgn
/// magnitude/sign, over a single non-iterative cleanup-style pass.
#[derive(Debug, Default, Clone, Copy)]
pub struct HtBlockCoder;

impl BlockCoder for HtBlockCoder {
    fn encode(
        &self,
        _subband_tag: SubbandOrientation,
        coeffs: &[i32],
        width: u32,
        height: u32,
        num_magnitude_bitplanes: u32,
    ) -> Result<(Vec<u8>, u32), Jpeg2000Error> {
        let bytes = ht_block_coder::encode(coeffs, width as usize, height as usize, num_magnitude_bitplanes)?;
        Ok((bytes, 1))
    }

    fn decode(
        &self,
        _subband_tag: SubbandOrientation,
        bytes: &[u8],
        width: u32,
        height: u32,
        num_magnitude_bitplanes: u32,
    ) -> Result<Vec<i32>, Jpeg2000Error> {
        ht_block_coder::decode(bytes, width as usize, height as usize, num_magnitude_bitplanes)
    }
}

/// Legacy Part-1 variant: MQ arithmetic coder over EBCOT's three
/// bit-plane passes (significance propagation, magnitude refinement,
/// cleanup).
#[derive(Debug, Default, Clone, Copy)]
pub struct LegacyBlockCoder;

impl BlockCoder for LegacyBlockCoder {
    fn encode(
        &self,
        subband_tag: SubbandOrientation,
        coeffs: &[i32],
        width: u32,
        height: u32,
        num_magnitude_bitplanes: u32,
    ) -> Result<(Vec<u8>, u32), Jpeg2000Error> {
        if coeffs.len() != (width * height) as usize {
            return Err(Jpeg2000Error::BlockDimensionMismatch);
        }
        let max_bit_plane = num_magnitude_bitplanes.saturating_sub(1).min(30) as u8;
        let mut coder = BitPlaneCoder::new(width, height, band_for(subband_tag));
        let bytes = coder.encode_codeblock(coeffs, max_bit_plane);
        Ok((bytes, max_bit_plane as u32 + 1))
    }

    fn decode(
        &self,
        subband_tag: SubbandOrientation,
        bytes: &[u8],
        width: u32,
        height: u32,
        num_magnitude_bitplanes: u32,
    ) -> Result<Vec<i32>, Jpeg2000Error> {
        let max_bit_plane = num_magnitude_bitplanes.saturating_sub(1).min(30) as u8;
        let mut coder = BitPlaneCoder::new(width, height, band_for(subband_tag));
        coder
            .decode_codeblock(bytes, width, height, max_bit_plane)
            .map_err(|_| Jpeg2000Error::CodestreamCorruption { x: width, y: height })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ht_block_coder_round_trips() {
        let coder = HtBlockCoder;
        let mut coeffs = vec![0i32; 64];
        coeffs[0] = 12;
        coeffs[17] = -6;
        coeffs[40] = 3;

        let (bytes, pass_count) = coder.encode(SubbandOrientation::Hl, &coeffs, 8, 8, 6).unwrap();
        assert_eq!(pass_count, 1);
        let decoded = coder.decode(SubbandOrientation::Hl, &bytes, 8, 8, 6).unwrap();
        assert_eq!(decoded, coeffs);
    }

    #[test]
    fn legacy_block_coder_round_trips() {
        let coder = LegacyBlockCoder;
        let coeffs = vec![
            10, 0, 0, 0,
            0, 5, 0, 0,
            0, 0, -3, 0,
            0, 0, 0, 1,
        ];

        let (bytes, pass_count) = coder.encode(SubbandOrientation::Ll, &coeffs, 4, 4, 6).unwrap();
        assert_eq!(pass_count, 6);
        let decoded = coder.decode(SubbandOrientation::Ll, &bytes, 4, 4, 6).unwrap();
        assert_eq!(decoded, coeffs);
    }

    #[test]
    fn legacy_block_coder_rejects_dimension_mismatch() {
        let coder = LegacyBlockCoder;
        let coeffs = vec![0i32; 10];
        assert!(coder.encode(SubbandOrientation::Ll, &coeffs, 4, 4, 4).is_err());
    }
}
