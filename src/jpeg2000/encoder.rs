//! Top-level encode orchestration: takes a whole [`image::Image`] and
//! drives it through sample/coefficient conversion, the multi-component
//! color transform, the DWT Engine, quantization, the Block Coder
//! Interface, and Tier-2 packet assembly down to a single-tile
//! codestream (§6).
//!
//! One packet is emitted per `(component, resolution, subband)` rather
//! than grouping every subband of a resolution into one precinct packet
//! as the standard does — see DESIGN.md "Tier-2 packet granularity".
//! Only a single image tile and a single quality layer are produced;
//! larger tile grids are rejected up front rather than silently
//! truncated.

use log::debug;

use crate::error::{Jpeg2000Error, UnsupportedFeature};
use crate::jpeg2000::block_coder::{BlockCoder, HtBlockCoder, LegacyBlockCoder};
use crate::jpeg2000::bit_io::PacketBitWriter;
use crate::jpeg2000::color;
use crate::jpeg2000::dwt::{self, FloatKernel, IntegerKernel};
use crate::jpeg2000::image::Image;
use crate::jpeg2000::packet::PacketHeader;
use crate::jpeg2000::packet::PrecinctState;
use crate::jpeg2000::params::cap::Cap;
use crate::jpeg2000::params::cod::{Cod, ProgressionOrder, BLOCK_STYLE_HT_MODE, WAVELET_IRREVERSIBLE_97, WAVELET_REVERSIBLE_53};
use crate::jpeg2000::params::qcd::{QuantStep, Qcd, QuantizationStyle};
use crate::jpeg2000::params::siz::{Siz, SizComponentInfo};
use crate::jpeg2000::params::ParameterStore;
use crate::jpeg2000::quantization;
use crate::jpeg2000::tile::{Point, Rect, Size, TileBuilder};
use crate::jpeg2000::writer;

/// Knobs exposed by the CLI's `compress` subcommand (§6).
#[derive(Debug, Clone)]
pub struct EncoderOptions {
    pub num_decomps: u8,
    pub reversible: bool,
    /// Base irreversible quantization step; ignored when `reversible`.
    pub qstep: f32,
    /// Must equal the image dimensions when present: only a single tile
    /// is supported (§9 "Single-tile scope").
    pub tile_size: Option<(u32, u32)>,
    pub block_size: (u32, u32),
    pub image_offset: (u32, u32),
    /// Use the NLT type-3 sign fold instead of the plain level shift for
    /// the sample→coefficient conversion (§4.6 "NLT type 3"), for images
    /// whose signed samples are not symmetric around zero. Recorded in
    /// the codestream's CAP marker so the decoder can recover it.
    pub nlt_type3: bool,
}

impl Default for EncoderOptions {
    fn default() -> Self {
        EncoderOptions {
            num_decomps: 5,
            reversible: false,
            qstep: 1.0 / 256.0,
            tile_size: None,
            block_size: (64, 64),
            image_offset: (0, 0),
            nlt_type3: false,
        }
    }
}

/// Smallest `exp` with `4 << exp >= requested`, the inverse of
/// `Cod::block_dims`'s `1 << (exp + 2)` encoding.
fn size_to_block_exp(requested: u32) -> u8 {
    let mut exp = 0u8;
    while exp < 8 && (4u32 << exp) < requested {
        exp += 1;
    }
    exp
}

/// `delta = (1 + mantissa/2048) * 2^-exponent`, inverted: normalizes
/// `delta` into `[1, 2) * 2^-exponent` and rounds the fractional part
/// into an 11-bit mantissa.
fn encode_step_size(delta: f32) -> (u8, u16) {
    if !delta.is_finite() || delta <= 0.0 {
        return (0, 0);
    }
    let mut exponent = 0i32;
    let mut mant = delta;
    while mant >= 2.0 && exponent < 31 {
        mant /= 2.0;
        exponent += 1;
    }
    while mant < 1.0 && exponent > 0 {
        mant *= 2.0;
        exponent -= 1;
    }
    let mantissa = (((mant - 1.0) * 2048.0).round().clamp(0.0, 2047.0)) as u16;
    (exponent as u8, mantissa)
}

fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        32 - (n - 1).leading_zeros()
    }
}

/// Reversible DC-level-shift sample→coefficient conversion (§4.6):
/// unsigned samples are re-centered around zero by the component's
/// half-range; signed samples pass through unchanged. Grounded on
/// `gen_rev_convert` in `ojph_colour.cpp`.
fn level_shift_forward_i32(raw: &[i32], bit_depth: u32, signed: bool) -> Vec<i32> {
    if signed {
        raw.to_vec()
    } else {
        let half = 1i32 << (bit_depth - 1);
        raw.iter().map(|&v| v - half).collect()
    }
}

/// Irreversible float sample→coefficient conversion (§4.6): `s / 2^B -
/// 0.5` for unsigned samples, `s / 2^B` for signed, grounded on
/// `gen_cnvrt_si32_to_float_shftd` in `ojph_colour.cpp`.
fn sample_to_float(raw: &[i32], bit_depth: u32, signed: bool) -> Vec<f32> {
    let scale = 1.0f32 / ((1u64 << bit_depth) as f32);
    raw.iter()
        .map(|&v| {
            let f = v as f32 * scale;
            if signed {
                f
            } else {
                f - 0.5
            }
        })
        .collect()
}

fn extract_rect_i32(plane: &[i32], stride: usize, origin: Point, size: Size) -> Vec<i32> {
    let mut out = Vec::with_capacity((size.w * size.h) as usize);
    for y in 0..size.h {
        let row = (origin.y + y) as usize * stride + origin.x as usize;
        out.extend_from_slice(&plane[row..row + size.w as usize]);
    }
    out
}

fn extract_rect_f32(plane: &[f32], stride: usize, origin: Point, size: Size) -> Vec<f32> {
    let mut out = Vec::with_capacity((size.w * size.h) as usize);
    for y in 0..size.h {
        let row = (origin.y + y) as usize * stride + origin.x as usize;
        out.extend_from_slice(&plane[row..row + size.w as usize]);
    }
    out
}

fn extract_local_i32(buf: &[i32], stride: usize, origin: Point, size: Size) -> Vec<i32> {
    let mut out = Vec::with_capacity((size.w * size.h) as usize);
    for y in 0..size.h {
        let row = (origin.y + y) as usize * stride + origin.x as usize;
        out.extend_from_slice(&buf[row..row + size.w as usize]);
    }
    out
}

/// Builds the single-tile Parameter Store for `image` under `opts`.
fn build_parameter_store(image: &Image, opts: &EncoderOptions) -> Result<ParameterStore, Jpeg2000Error> {
    let num_components = image.components.len() as u32;
    if num_components == 0 {
        return Err(Jpeg2000Error::ZeroExtent);
    }
    let (width, height) = (image.components[0].width, image.components[0].height);
    for comp in &image.components {
        if comp.width != width || comp.height != height {
            return Err(Jpeg2000Error::ColorTransformDownsamplingMismatch);
        }
    }

    let tile_size = opts.tile_size.unwrap_or((width, height));
    if tile_size != (width, height) {
        return Err(Jpeg2000Error::UnsupportedFeature(UnsupportedFeature::MultipleTiles));
    }

    let components: Vec<SizComponentInfo> = image
        .components
        .iter()
        .map(|comp| SizComponentInfo {
            s_siz: ((comp.signed as u8) << 7) | ((comp.bit_depth - 1) as u8 & 0x7F),
            x_rsiz: 1,
            y_rsiz: 1,
        })
        .collect();

    let siz = Siz {
        rsiz: 0x4000,
        x_siz: opts.image_offset.0 + width,
        y_siz: opts.image_offset.1 + height,
        x_osiz: opts.image_offset.0,
        y_osiz: opts.image_offset.1,
        xt_siz: tile_size.0,
        yt_siz: tile_size.1,
        xt_osiz: opts.image_offset.0,
        yt_osiz: opts.image_offset.1,
        components,
    };

    let use_color_transform = num_components >= 3;
    let (block_width_exp, block_height_exp) = (size_to_block_exp(opts.block_size.0), size_to_block_exp(opts.block_size.1));
    let wavelet_id = if opts.reversible { WAVELET_REVERSIBLE_53 } else { WAVELET_IRREVERSIBLE_97 };

    let cod = Cod {
        scod: 0,
        progression_order: ProgressionOrder::Lrcp,
        num_layers: 1,
        use_color_transform,
        num_decomp_raw: opts.num_decomps & 0x7F,
        block_width_exp,
        block_height_exp,
        block_style: BLOCK_STYLE_HT_MODE,
        wavelet_id,
        precinct_sizes: vec![],
    };

    let bit_depth0 = image.components[0].bit_depth;
    let qcd = if opts.reversible {
        let exponent = (bit_depth0 + opts.num_decomps as u32 + 2).min(31) as u8;
        Qcd {
            style: QuantizationStyle::ScalarDerived,
            guard_bits: 2,
            steps: vec![QuantStep { exponent, mantissa: 0 }],
        }
    } else {
        let (exponent, mantissa) = encode_step_size(opts.qstep);
        Qcd {
            style: QuantizationStyle::ScalarDerived,
            guard_bits: 2,
            steps: vec![QuantStep { exponent, mantissa }],
        }
    };

    let mut store = ParameterStore::new(siz, cod, qcd, None, vec![], vec![])?;
    let mut max_bp = 0u32;
    for c in 0..num_components {
        max_bp = max_bp.max(store.magnitude_bitplanes(c)?);
    }
    store.cap = Some(Cap::from_magnitude_bitplanes(&store.cod, max_bp, opts.nlt_type3));

    if store.siz.tile_grid() != (1, 1) {
        return Err(Jpeg2000Error::UnsupportedFeature(UnsupportedFeature::MultipleTiles));
    }
    Ok(store)
}

/// Encodes `image` into a complete J2C/HTJ2K codestream per `opts`.
pub fn encode(image: &Image, opts: &EncoderOptions) -> Result<Vec<u8>, Jpeg2000Error> {
    let store = build_parameter_store(image, opts)?;
    let num_components = store.num_components();
    let (width, height) = store.component_size(0)?;
    let num_decomp = store.cod.num_decompositions() as u32;
    let reversible = opts.reversible;
    let is_ht = store.cod.is_ht_mode();
    let coder: &dyn BlockCoder = if is_ht { &HtBlockCoder } else { &LegacyBlockCoder };

    debug!(
        "jpeg2000 encode: {}x{} x{} components, {} decompositions, reversible={}",
        width, height, num_components, num_decomp, reversible
    );

    let use_64bit_rct = store.cod.use_color_transform
        && reversible
        && image.components[0].bit_depth + num_decomp + ceil_log2(num_components) > 31;

    let mut planes_i32: Vec<Vec<i32>> = Vec::with_capacity(num_components as usize);
    let mut planes_f32: Vec<Vec<f32>> = Vec::with_capacity(num_components as usize);

    for comp in &image.components {
        if reversible {
            if opts.nlt_type3 && comp.signed {
                let mut dst = vec![0i32; comp.data.len()];
                color::nlt_type3_forward_i32(&comp.data, color::nlt_type3_signed_bias(comp.bit_depth), &mut dst);
                planes_i32.push(dst);
            } else {
                planes_i32.push(level_shift_forward_i32(&comp.data, comp.bit_depth, comp.signed));
            }
        } else if opts.nlt_type3 {
            let mut dst = vec![0f32; comp.data.len()];
            color::nlt_type3_forward_f32(&comp.data, comp.bit_depth, comp.signed, &mut dst);
            planes_f32.push(dst);
        } else {
            planes_f32.push(sample_to_float(&comp.data, comp.bit_depth, comp.signed));
        }
    }

    if store.cod.use_color_transform {
        if reversible {
            if use_64bit_rct {
                let (r, g, b) = (planes_i32[0].clone(), planes_i32[1].clone(), planes_i32[2].clone());
                let mut y = vec![0i64; r.len()];
                let mut cb = vec![0i64; r.len()];
                let mut cr = vec![0i64; r.len()];
                color::rct_forward_i64(&r, &g, &b, &mut y, &mut cb, &mut cr);
                for i in 0..r.len() {
                    planes_i32[0][i] = y[i] as i32;
                    planes_i32[1][i] = cb[i] as i32;
                    planes_i32[2][i] = cr[i] as i32;
                }
            } else {
                let (r, g, b) = (planes_i32[0].clone(), planes_i32[1].clone(), planes_i32[2].clone());
                color::rct_forward_i32(&r, &g, &b, &mut planes_i32[0], &mut planes_i32[1], &mut planes_i32[2]);
            }
        } else {
            let (r, g, b) = (planes_f32[0].clone(), planes_f32[1].clone(), planes_f32[2].clone());
            color::ict_forward(&r, &g, &b, &mut planes_f32[0], &mut planes_f32[1], &mut planes_f32[2]);
        }
    }

    let kernel_i32 = IntegerKernel::Reversible53;
    let kernel_f32 = FloatKernel::Irreversible97;
    for c in 0..num_components as usize {
        if reversible {
            dwt::forward_dwt_2d_i32(&mut planes_i32[c], width, height, num_decomp, &[], &kernel_i32)?;
        } else {
            dwt::forward_dwt_2d_f32(&mut planes_f32[c], width, height, num_decomp, &[], &kernel_f32)?;
        }
    }

    let tile_builder = TileBuilder::new(&store);
    let mut layouts = Vec::with_capacity(num_components as usize);
    let mut mags = Vec::with_capacity(num_components as usize);
    for c in 0..num_components {
        layouts.push(tile_builder.subband_layout(c, Size { w: width, h: height })?);
        mags.push(store.magnitude_bitplanes(c)?);
    }

    let mut packets: Vec<Vec<u8>> = Vec::new();
    for r in 0..=num_decomp {
        for c in 0..num_components {
            let subbands = &layouts[c as usize][r as usize].1;
            for (orientation, rect) in subbands {
                let step = store.get_step_size(c, r, *orientation)?;
                let subband_buf: Vec<i32> = if reversible {
                    extract_rect_i32(&planes_i32[c as usize], width as usize, rect.origin, rect.size)
                } else {
                    extract_rect_f32(&planes_f32[c as usize], width as usize, rect.origin, rect.size)
                        .into_iter()
                        .map(|v| quantization::quantize(v, step))
                        .collect()
                };

                let (gx, gy) = tile_builder.code_block_grid(c, rect.size)?;
                let mut state = PrecinctState::new(gx, gy);
                for j in 0..gy {
                    for i in 0..gx {
                        state.prepare_code_block(i, j, Some(0), 0);
                    }
                }

                let mut bodies = Vec::with_capacity((gx * gy) as usize);
                let mut coded = Vec::with_capacity((gx * gy) as usize);
                for j in 0..gy {
                    for i in 0..gx {
                        let cb_rect: Rect = tile_builder.code_block_rect(c, rect.size, i, j)?;
                        let coeffs = extract_local_i32(&subband_buf, rect.size.w as usize, cb_rect.origin, cb_rect.size);
                        let (bytes, pass_count) = coder.encode(*orientation, &coeffs, cb_rect.size.w, cb_rect.size.h, mags[c as usize])?;
                        bodies.push((i, j, pass_count, bytes.len() as u32));
                        coded.push(bytes);
                    }
                }

                let mut writer_bits = PacketBitWriter::new();
                PacketHeader::encode(&mut writer_bits, &mut state, 0, &bodies);
                let mut packet_bytes = writer_bits.finish();
                for bytes in &coded {
                    packet_bytes.extend_from_slice(bytes);
                }
                packets.push(packet_bytes);
            }
        }
    }

    let mut out = writer::write_main_header(&store)?;
    let sot_offset = writer::begin_tile_part(&mut out, 0, 0, 1);
    writer::write_sod(&mut out);
    for packet in &packets {
        out.extend_from_slice(packet);
    }
    writer::finish_tile_part(&mut out, sot_offset)?;
    writer::write_eoc(&mut out);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg2000::decoder;
    use crate::jpeg2000::image::ComponentSamples;

    fn ramp_component(width: u32, height: u32, bit_depth: u32) -> ComponentSamples {
        let max = (1i32 << bit_depth) - 1;
        let data = (0..width * height).map(|i| (i as i32 * 7) % (max + 1)).collect();
        ComponentSamples::new(data, width, height, bit_depth, false)
    }

    #[test]
    fn reversible_grayscale_round_trips_losslessly() {
        let image = Image::new(vec![ramp_component(16, 16, 8)]);
        let opts = EncoderOptions { num_decomps: 2, reversible: true, ..Default::default() };
        let bytes = encode(&image, &opts).unwrap();
        let decoded = decoder::decode(&bytes).unwrap();
        assert_eq!(decoded.components[0].data, image.components[0].data);
    }

    #[test]
    fn reversible_rgb_round_trips_losslessly() {
        let image = Image::new(vec![ramp_component(16, 16, 8), ramp_component(16, 16, 8), ramp_component(16, 16, 8)]);
        let opts = EncoderOptions { num_decomps: 2, reversible: true, ..Default::default() };
        let bytes = encode(&image, &opts).unwrap();
        let decoded = decoder::decode(&bytes).unwrap();
        for c in 0..3 {
            assert_eq!(decoded.components[c].data, image.components[c].data);
        }
    }

    #[test]
    fn irreversible_grayscale_round_trips_within_tolerance() {
        let image = Image::new(vec![ramp_component(16, 16, 8)]);
        let opts = EncoderOptions { num_decomps: 2, reversible: false, qstep: 1.0 / 64.0, ..Default::default() };
        let bytes = encode(&image, &opts).unwrap();
        let decoded = decoder::decode(&bytes).unwrap();
        for (a, b) in image.components[0].data.iter().zip(&decoded.components[0].data) {
            assert!((a - b).abs() <= 12, "{} vs {}", a, b);
        }
    }

    #[test]
    fn mismatched_tile_size_is_rejected() {
        let image = Image::new(vec![ramp_component(16, 16, 8)]);
        let opts = EncoderOptions { tile_size: Some((8, 8)), ..Default::default() };
        assert!(encode(&image, &opts).is_err());
    }

    #[test]
    fn nlt_type3_round_trips_a_signed_component_losslessly() {
        let max = (1i32 << 8) - 1;
        let data: Vec<i32> = (0..16 * 16).map(|i| ((i as i32 * 7) % (max + 1)) - 128).collect();
        let image = Image::new(vec![ComponentSamples::new(data.clone(), 16, 16, 8, true)]);
        let opts = EncoderOptions { num_decomps: 2, reversible: true, nlt_type3: true, ..Default::default() };
        let bytes = encode(&image, &opts).unwrap();
        let decoded = decoder::decode(&bytes).unwrap();
        assert_eq!(decoded.components[0].data, data);
    }

    #[test]
    fn block_exp_rounds_up_to_the_next_power_of_two() {
        assert_eq!(size_to_block_exp(64), 4);
        assert_eq!(size_to_block_exp(1), 0);
        assert_eq!(size_to_block_exp(100), 5);
    }
}
