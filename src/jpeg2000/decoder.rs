//! Top-level decode orchestration: the inverse of `encoder::encode`.
//! Parses a codestream into a validated Parameter Store, walks the same
//! `(resolution, component, subband)` packet order the encoder emits,
//! decodes each code-block through the Block Coder Interface,
//! dequantizes, reassembles subband planes, drives the DWT Engine's
//! synthesis side, and applies the backward color transform (§6).
//!
//! Mirrors `encoder.rs`'s single-tile, single-quality-layer scope: a
//! codestream with more than one tile-part is rejected rather than
//! silently truncated.

use log::debug;

use crate::error::Jpeg2000Error;
use crate::jpeg2000::bit_io::PacketBitReader;
use crate::jpeg2000::block_coder::{BlockCoder, HtBlockCoder, LegacyBlockCoder};
use crate::jpeg2000::color;
use crate::jpeg2000::dwt::{self, FloatKernel, IntegerKernel};
use crate::jpeg2000::image::{ComponentSamples, Image};
use crate::jpeg2000::jp2::Jp2Reader;
use crate::jpeg2000::packet::{PacketHeader, PrecinctState};
use crate::jpeg2000::params::cod::WAVELET_REVERSIBLE_53;
use crate::jpeg2000::parser;
use crate::jpeg2000::quantization;
use crate::jpeg2000::tile::{Point, Size, TileBuilder};

fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        32 - (n - 1).leading_zeros()
    }
}

/// Inverse of `encoder::level_shift_forward_i32`: re-centers unsigned
/// samples back onto `[0, 2^B)`; signed samples pass through unchanged.
fn level_shift_backward_i32(coeffs: &[i32], bit_depth: u32, signed: bool) -> Vec<i32> {
    if signed {
        coeffs.to_vec()
    } else {
        let half = 1i32 << (bit_depth - 1);
        coeffs.iter().map(|&v| v + half).collect()
    }
}

/// Inverse of `encoder::sample_to_float` (§4.6 "Float decode rounds to
/// nearest, clamps to the `B`-bit range").
fn float_to_sample(plane: &[f32], bit_depth: u32, signed: bool) -> Vec<i32> {
    let scale = (1u64 << bit_depth) as f32;
    let (lo, hi) = if signed {
        (-(1i64 << (bit_depth - 1)), (1i64 << (bit_depth - 1)) - 1)
    } else {
        (0i64, (1i64 << bit_depth) - 1)
    };
    plane
        .iter()
        .map(|&f| {
            let unshifted = if signed { f } else { f + 0.5 };
            let raw = (unshifted * scale).round() as i64;
            raw.clamp(lo, hi) as i32
        })
        .collect()
}

fn store_rect_i32(plane: &mut [i32], stride: usize, origin: Point, size: Size, rect_data: &[i32]) {
    for y in 0..size.h {
        let row = (origin.y + y) as usize * stride + origin.x as usize;
        let src_row = (y * size.w) as usize;
        plane[row..row + size.w as usize].copy_from_slice(&rect_data[src_row..src_row + size.w as usize]);
    }
}

fn store_rect_f32(plane: &mut [f32], stride: usize, origin: Point, size: Size, rect_data: &[f32]) {
    for y in 0..size.h {
        let row = (origin.y + y) as usize * stride + origin.x as usize;
        let src_row = (y * size.w) as usize;
        plane[row..row + size.w as usize].copy_from_slice(&rect_data[src_row..src_row + size.w as usize]);
    }
}

fn store_local_i32(buf: &mut [i32], stride: usize, origin: Point, size: Size, block_data: &[i32]) {
    for y in 0..size.h {
        let row = (origin.y + y) as usize * stride + origin.x as usize;
        let src_row = (y * size.w) as usize;
        buf[row..row + size.w as usize].copy_from_slice(&block_data[src_row..src_row + size.w as usize]);
    }
}

/// Decodes a complete J2C/HTJ2K codestream (optionally JP2/JPH-wrapped)
/// back into whole-image samples.
pub fn decode(data: &[u8]) -> Result<Image, Jpeg2000Error> {
    let unwrapped = {
        let mut jp2_reader = Jp2Reader::new(data);
        jp2_reader.find_codestream()?
    };
    let codestream = unwrapped.unwrap_or(data);

    let parsed = parser::parse_codestream(codestream)?;
    let store = parsed.store;
    let num_components = store.num_components();
    let (width, height) = store.component_size(0)?;
    let num_decomp = store.cod.num_decompositions() as u32;
    let reversible = store.cod.wavelet_id == WAVELET_REVERSIBLE_53;
    let nlt_type3 = store.cap.as_ref().is_some_and(|cap| cap.uses_nlt_type3());
    let is_ht = store.cod.is_ht_mode();
    let coder: &dyn BlockCoder = if is_ht { &HtBlockCoder } else { &LegacyBlockCoder };

    debug!(
        "jpeg2000 decode: {}x{} x{} components, {} decompositions, reversible={}",
        width, height, num_components, num_decomp, reversible
    );

    let use_64bit_rct = store.cod.use_color_transform
        && reversible
        && store.siz.component(0)?.bit_depth() + num_decomp + ceil_log2(num_components) > 31;

    let plane_len = (width * height) as usize;
    let mut planes_i32: Vec<Vec<i32>> = Vec::new();
    let mut planes_f32: Vec<Vec<f32>> = Vec::new();
    for _ in 0..num_components {
        if reversible {
            planes_i32.push(vec![0i32; plane_len]);
        } else {
            planes_f32.push(vec![0f32; plane_len]);
        }
    }

    let tile_builder = TileBuilder::new(&store);
    let mut layouts = Vec::with_capacity(num_components as usize);
    let mut mags = Vec::with_capacity(num_components as usize);
    for c in 0..num_components {
        layouts.push(tile_builder.subband_layout(c, Size { w: width, h: height })?);
        mags.push(store.magnitude_bitplanes(c)?);
    }

    let tile_part = parsed
        .tile_parts
        .first()
        .ok_or(Jpeg2000Error::Truncated { offset: codestream.len() })?;
    let mut tile_bytes = &codestream[tile_part.1.clone()];

    for r in 0..=num_decomp {
        for c in 0..num_components {
            let subbands = &layouts[c as usize][r as usize].1;
            for (orientation, rect) in subbands {
                let step = store.get_step_size(c, r, *orientation)?;
                let (gx, gy) = tile_builder.code_block_grid(c, rect.size)?;
                let mut state = PrecinctState::new(gx, gy);
                for j in 0..gy {
                    for i in 0..gx {
                        state.prepare_code_block(i, j, Some(0), 0);
                    }
                }

                let mut bit_reader = PacketBitReader::new(tile_bytes);
                let header = PacketHeader::decode(&mut bit_reader, &mut state, 0)?;
                let mut offset = bit_reader.bytes_consumed();

                let mut subband_buf = vec![0i32; (rect.size.w * rect.size.h) as usize];
                for j in 0..gy {
                    for i in 0..gx {
                        let cb_rect = tile_builder.code_block_rect(c, rect.size, i, j)?;
                        if cb_rect.is_empty() {
                            continue;
                        }
                        let entry = header.entries.iter().find(|e| e.x == i && e.y == j);
                        let coeffs = match entry {
                            Some(e) => {
                                let data_len = e.data_len as usize;
                                if offset + data_len > tile_bytes.len() {
                                    return Err(Jpeg2000Error::TilePartOverrun);
                                }
                                let block_bytes = &tile_bytes[offset..offset + data_len];
                                offset += data_len;
                                coder.decode(*orientation, block_bytes, cb_rect.size.w, cb_rect.size.h, mags[c as usize])?
                            }
                            None => vec![0i32; (cb_rect.size.w * cb_rect.size.h) as usize],
                        };
                        store_local_i32(&mut subband_buf, rect.size.w as usize, cb_rect.origin, cb_rect.size, &coeffs);
                    }
                }

                if reversible {
                    store_rect_i32(&mut planes_i32[c as usize], width as usize, rect.origin, rect.size, &subband_buf);
                } else {
                    let dequantized: Vec<f32> =
                        subband_buf.iter().map(|&q| quantization::dequantize(q, step)).collect();
                    store_rect_f32(&mut planes_f32[c as usize], width as usize, rect.origin, rect.size, &dequantized);
                }

                tile_bytes = &tile_bytes[offset..];
            }
        }
    }

    let kernel_i32 = IntegerKernel::Reversible53;
    let kernel_f32 = FloatKernel::Irreversible97;
    for c in 0..num_components as usize {
        if reversible {
            dwt::inverse_dwt_2d_i32(&mut planes_i32[c], width, height, num_decomp, &[], &kernel_i32)?;
        } else {
            dwt::inverse_dwt_2d_f32(&mut planes_f32[c], width, height, num_decomp, &[], &kernel_f32)?;
        }
    }

    if store.cod.use_color_transform {
        if reversible {
            if use_64bit_rct {
                let y: Vec<i64> = planes_i32[0].iter().map(|&v| v as i64).collect();
                let cb: Vec<i64> = planes_i32[1].iter().map(|&v| v as i64).collect();
                let cr: Vec<i64> = planes_i32[2].iter().map(|&v| v as i64).collect();
                color::rct_backward_i64(&y, &cb, &cr, &mut planes_i32[0], &mut planes_i32[1], &mut planes_i32[2]);
            } else {
                let (y, cb, cr) = (planes_i32[0].clone(), planes_i32[1].clone(), planes_i32[2].clone());
                color::rct_backward_i32(&y, &cb, &cr, &mut planes_i32[0], &mut planes_i32[1], &mut planes_i32[2]);
            }
        } else {
            let (y, cb, cr) = (planes_f32[0].clone(), planes_f32[1].clone(), planes_f32[2].clone());
            color::ict_backward(&y, &cb, &cr, &mut planes_f32[0], &mut planes_f32[1], &mut planes_f32[2]);
        }
    }

    let mut components = Vec::with_capacity(num_components as usize);
    for c in 0..num_components {
        let comp_info = store.siz.component(c)?;
        let bit_depth = comp_info.bit_depth();
        let signed = comp_info.is_signed();
        let data = if reversible {
            if nlt_type3 && signed {
                let mut dst = vec![0i32; planes_i32[c as usize].len()];
                color::nlt_type3_backward_i32(&planes_i32[c as usize], color::nlt_type3_signed_bias(bit_depth), &mut dst);
                dst
            } else {
                level_shift_backward_i32(&planes_i32[c as usize], bit_depth, signed)
            }
        } else if nlt_type3 {
            let mut dst = vec![0i32; planes_f32[c as usize].len()];
            color::nlt_type3_backward_f32(&planes_f32[c as usize], bit_depth, signed, &mut dst);
            dst
        } else {
            float_to_sample(&planes_f32[c as usize], bit_depth, signed)
        };
        components.push(ComponentSamples::new(data, width, height, bit_depth, signed));
    }

    Ok(Image::new(components))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_input() {
        assert!(decode(&[]).is_err());
    }

    #[test]
    fn rejects_garbage_that_is_not_a_codestream() {
        let garbage = [0u8; 16];
        assert!(decode(&garbage).is_err());
    }
}
