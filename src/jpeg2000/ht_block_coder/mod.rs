//! High-Throughput (HT) block coder: the MEL/VLC/MagSgn variant of the
//! block coder interface (§4.7). Samples are processed as 2x2 quads in
//! raster order; MEL gates each quad's significance, VLC carries the
//! per-position significance pattern for significant quads, and MagSgn
//! carries each newly-significant sample's sign and magnitude.
//!
//! The three sub-streams are emitted as separate length-prefixed
//! sections rather than the dual-growth-direction packing of a real HT
//! codestream, since the block coder is an external collaborator here
//! and only a self-consistent round trip is required, not bit-exact
//! agreement with any reference bitstream.

pub mod bitstream;
pub mod mag_sgn;
pub mod mel;
pub mod vlc;

use crate::error::Jpeg2000Error;
use bitstream::{BitReader, BitWriter};
use mag_sgn::{MagSgnDecoder, MagSgnEncoder};
use mel::{MelDecoder, MelEncoder};

fn quad_coords(x: usize, y: usize) -> [(usize, usize); 4] {
    [(x, y), (x + 1, y), (x, y + 1), (x + 1, y + 1)]
}

/// 0/1 if either already-coded left or above neighbor is non-zero, else 0.
/// Both encode and decode derive this from samples decoded earlier in
/// scan order, so the two sides agree without needing to exchange it.
fn neighbor_context(coeffs: &[i32], width: usize, height: usize, x: usize, y: usize) -> u8 {
    let mut has_neighbor = false;
    if x > 0 && y < height && coeffs[y * width + x - 1] != 0 {
        has_neighbor = true;
    }
    if y > 0 && x < width && coeffs[(y - 1) * width + x] != 0 {
        has_neighbor = true;
    }
    has_neighbor as u8
}

fn write_length_prefixed(out: &mut Vec<u8>, section: &[u8]) {
    out.extend_from_slice(&(section.len() as u32).to_be_bytes());
    out.extend_from_slice(section);
}

pub fn encode(coeffs: &[i32], width: usize, height: usize, num_magnitude_bitplanes: u32) -> Result<Vec<u8>, Jpeg2000Error> {
    if coeffs.len() != width * height {
        return Err(Jpeg2000Error::BlockDimensionMismatch);
    }

    let mut mel = MelEncoder::new();
    let mut vlc_writer = BitWriter::new();
    let mut magsgn = MagSgnEncoder::new();

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let coords = quad_coords(x, y);
            let mut rho = 0u8;
            let mut values = [0i32; 4];
            for (i, &(px, py)) in coords.iter().enumerate() {
                if px < width && py < height {
                    let v = coeffs[py * width + px];
                    values[i] = v;
                    if v != 0 {
                        rho |= 1 << i;
                    }
                }
            }

            let significant = rho != 0;
            mel.encode(significant);

            if significant {
                let context = neighbor_context(coeffs, width, height, x, y);
                let code = vlc::encode_vlc(rho, context);
                vlc_writer.write_bits(code as u32, 4);

                for (i, &v) in values.iter().enumerate() {
                    if (rho >> i) & 1 == 1 {
                        magsgn.encode_sample(v < 0, v.unsigned_abs(), num_magnitude_bitplanes);
                    }
                }
            }

            x += 2;
        }
        y += 2;
    }

    let mel_bytes = mel.finish();
    let vlc_bytes = vlc_writer.finish();
    let magsgn_bytes = magsgn.finish();

    let mut out = Vec::new();
    write_length_prefixed(&mut out, &mel_bytes);
    write_length_prefixed(&mut out, &vlc_bytes);
    out.extend_from_slice(&magsgn_bytes);
    Ok(out)
}

pub fn decode(bytes: &[u8], width: usize, height: usize, num_magnitude_bitplanes: u32) -> Result<Vec<i32>, Jpeg2000Error> {
    if bytes.len() < 8 {
        return Err(Jpeg2000Error::BlockCoderTruncated);
    }
    let mel_len = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let vlc_len = u32::from_be_bytes(bytes[4..8].try_into().unwrap()) as usize;
    let mel_start = 8;
    let vlc_start = mel_start + mel_len;
    let magsgn_start = vlc_start + vlc_len;
    if magsgn_start > bytes.len() {
        return Err(Jpeg2000Error::BlockCoderTruncated);
    }

    let mut mel = MelDecoder::new(&bytes[mel_start..vlc_start]);
    let mut vlc_reader = BitReader::new(&bytes[vlc_start..magsgn_start]);
    let mut magsgn = MagSgnDecoder::new(&bytes[magsgn_start..]);

    let mut coeffs = vec![0i32; width * height];

    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let significant = mel.decode();

            if significant {
                let context = neighbor_context(&coeffs, width, height, x, y);
                let code = vlc_reader.read_bits(4) as u8;
                let rho = vlc::decode_vlc(code, context);

                for (i, &(px, py)) in quad_coords(x, y).iter().enumerate() {
                    if (rho >> i) & 1 == 1 {
                        let (negative, magnitude) = magsgn.decode_sample(num_magnitude_bitplanes);
                        if px < width && py < height {
                            let v = magnitude as i32;
                            coeffs[py * width + px] = if negative { -v } else { v };
                        }
                    }
                }
            }

            x += 2;
        }
        y += 2;
    }

    Ok(coeffs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_sparse_block() {
        let width = 8;
        let height = 8;
        let mut coeffs = vec![0i32; width * height];
        coeffs[0] = 10;
        coeffs[9] = -5;
        coeffs[20] = 3;
        coeffs[63] = -1;

        let bytes = encode(&coeffs, width, height, 6).unwrap();
        let decoded = decode(&bytes, width, height, 6).unwrap();
        assert_eq!(decoded, coeffs);
    }

    #[test]
    fn round_trips_an_all_zero_block() {
        let width = 4;
        let height = 4;
        let coeffs = vec![0i32; width * height];
        let bytes = encode(&coeffs, width, height, 4).unwrap();
        let decoded = decode(&bytes, width, height, 4).unwrap();
        assert_eq!(decoded, coeffs);
    }

    #[test]
    fn round_trips_a_dense_block() {
        let width = 6;
        let height = 6;
        let coeffs: Vec<i32> = (0..36).map(|i| if i % 2 == 0 { i - 18 } else { -(i - 18) }).collect();
        let bytes = encode(&coeffs, width, height, 7).unwrap();
        let decoded = decode(&bytes, width, height, 7).unwrap();
        assert_eq!(decoded, coeffs);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let coeffs = vec![0i32; 10];
        assert!(encode(&coeffs, 4, 4, 4).is_err());
    }
}
