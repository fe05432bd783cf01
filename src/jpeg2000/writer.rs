//! Codestream Writer: turns a validated Parameter Store (plus tile-part
//! payloads handed to it by the encoder) back into `J2C`/`JPH` bytes
//! (§4.1, §7). Mirrors `parser.rs` marker-by-marker so every field this
//! writer emits is read back by the matching `parse_*` function there.

use crate::error::Jpeg2000Error;
use crate::jpeg2000::markers::JpegMarkerCode;
use crate::jpeg2000::params::atk::{Atk, LiftingStep};
use crate::jpeg2000::params::cod::Cod;
use crate::jpeg2000::params::dfs::{Dfs, DwtSplit};
use crate::jpeg2000::params::qcd::{QuantizationStyle, Qcd};
use crate::jpeg2000::params::ParameterStore;

fn push_marker(out: &mut Vec<u8>, marker: JpegMarkerCode) {
    out.extend_from_slice(&(marker as u16).to_be_bytes());
}

/// Writes `marker` followed by a 2-byte length prefix and `body`, the
/// length counting itself (per §A.2's `Lxxx` convention).
fn push_segment(out: &mut Vec<u8>, marker: JpegMarkerCode, body: &[u8]) -> Result<(), Jpeg2000Error> {
    push_marker(out, marker);
    let len = body.len() + 2;
    let len: u16 = len.try_into().map_err(|_| Jpeg2000Error::DestinationTooSmall)?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(body);
    Ok(())
}

fn write_siz_body(store: &ParameterStore) -> Vec<u8> {
    let siz = &store.siz;
    let mut body = Vec::new();
    body.extend_from_slice(&siz.rsiz.to_be_bytes());
    body.extend_from_slice(&siz.x_siz.to_be_bytes());
    body.extend_from_slice(&siz.y_siz.to_be_bytes());
    body.extend_from_slice(&siz.x_osiz.to_be_bytes());
    body.extend_from_slice(&siz.y_osiz.to_be_bytes());
    body.extend_from_slice(&siz.xt_siz.to_be_bytes());
    body.extend_from_slice(&siz.yt_siz.to_be_bytes());
    body.extend_from_slice(&siz.xt_osiz.to_be_bytes());
    body.extend_from_slice(&siz.yt_osiz.to_be_bytes());
    body.extend_from_slice(&(siz.components.len() as u16).to_be_bytes());
    for comp in &siz.components {
        body.push(comp.s_siz);
        body.push(comp.x_rsiz);
        body.push(comp.y_rsiz);
    }
    body
}

/// Shared COD/COC tail: decomposition count, code-block geometry,
/// style, wavelet id, and (if explicit precincts are in force) one
/// packed `(PPx, PPy)` byte per resolution level.
fn write_spcod_tail(body: &mut Vec<u8>, cod: &Cod) {
    body.push(cod.num_decomp_raw);
    body.push(cod.block_width_exp);
    body.push(cod.block_height_exp);
    body.push(cod.block_style);
    body.push(cod.wavelet_id);
    if cod.has_explicit_precincts() {
        for &(log_w, log_h) in &cod.precinct_sizes {
            body.push((log_w & 0xF) | ((log_h & 0xF) << 4));
        }
    }
}

fn write_cod_body(cod: &Cod) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(cod.scod);
    body.push(cod.progression_order as u8);
    body.extend_from_slice(&cod.num_layers.to_be_bytes());
    body.push(u8::from(cod.use_color_transform));
    write_spcod_tail(&mut body, cod);
    body
}

fn write_coc_body(component: u32, num_components: u32, cod: &Cod) -> Vec<u8> {
    let mut body = Vec::new();
    if num_components < 257 {
        body.push(component as u8);
    } else {
        body.extend_from_slice(&(component as u16).to_be_bytes());
    }
    body.push(cod.scod);
    write_spcod_tail(&mut body, cod);
    body
}

fn write_quant_steps(body: &mut Vec<u8>, style: QuantizationStyle, qcd: &Qcd) {
    for step in &qcd.steps {
        if style == QuantizationStyle::None {
            body.push(step.exponent << 3);
        } else {
            let v = ((step.exponent as u16) << 11) | (step.mantissa & 0x7FF);
            body.extend_from_slice(&v.to_be_bytes());
        }
    }
}

fn write_qcd_body(qcd: &Qcd) -> Vec<u8> {
    let mut body = Vec::new();
    let style_bits: u8 = match qcd.style {
        QuantizationStyle::None => 0,
        QuantizationStyle::ScalarDerived => 1,
        QuantizationStyle::ScalarExpounded => 2,
    };
    body.push(style_bits | (qcd.guard_bits << 5));
    write_quant_steps(&mut body, qcd.style, qcd);
    body
}

fn write_qcc_body(component: u32, num_components: u32, qcd: &Qcd) -> Vec<u8> {
    let mut body = Vec::new();
    if num_components < 257 {
        body.push(component as u8);
    } else {
        body.extend_from_slice(&(component as u16).to_be_bytes());
    }
    let style_bits: u8 = match qcd.style {
        QuantizationStyle::None => 0,
        QuantizationStyle::ScalarDerived => 1,
        QuantizationStyle::ScalarExpounded => 2,
    };
    body.push(style_bits | (qcd.guard_bits << 5));
    write_quant_steps(&mut body, qcd.style, qcd);
    body
}

fn write_cap_body(pcap: u32, ccap: &[u16]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&pcap.to_be_bytes());
    for &c in ccap {
        body.extend_from_slice(&c.to_be_bytes());
    }
    body
}

/// This crate's own wire layout for the ATK segment, matching
/// `parser::parse_atk`: `index`(1), `flags`(1, bit0 = reversible,
/// bits1-3 = step count), `K`(4, only when irreversible), then one step
/// per entry (5 bytes reversible: `e,b,a`; 4 bytes irreversible: `a`).
fn write_atk_body(atk: &Atk) -> Vec<u8> {
    let mut body = Vec::new();
    body.push(atk.index);
    let flags = u8::from(atk.reversible) | ((atk.steps.len() as u8 & 0x7) << 1);
    body.push(flags);
    if !atk.reversible {
        body.extend_from_slice(&atk.k.to_bits().to_be_bytes());
    }
    for step in &atk.steps {
        match *step {
            LiftingStep::Reversible { e, b, a } => {
                body.push(e);
                body.extend_from_slice(&(b as u16).to_be_bytes());
                body.extend_from_slice(&(a as u16).to_be_bytes());
            }
            LiftingStep::Irreversible { a } => {
                body.extend_from_slice(&a.to_bits().to_be_bytes());
            }
        }
    }
    body
}

fn dwt_split_bits(split: DwtSplit) -> u8 {
    match split {
        DwtSplit::None => 0,
        DwtSplit::Bidirectional => 1,
        DwtSplit::Horizontal => 2,
        DwtSplit::Vertical => 3,
    }
}

fn write_dfs_body(dfs: &Dfs) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&dfs.index.to_be_bytes());
    body.push(dfs.levels.len() as u8);
    let mut packed = vec![0u8; dfs.levels.len().div_ceil(4)];
    for (i, &level) in dfs.levels.iter().enumerate() {
        packed[i / 4] |= dwt_split_bits(level) << ((i % 4) * 2);
    }
    body.extend_from_slice(&packed);
    body
}

/// Writes the main header: `SOC`, `SIZ`, `CAP` (if HTJ2K capability was
/// recorded), `COD` plus any per-component `COC` overrides, `QCD` plus
/// any `QCC` overrides, then every `ATK`/`DFS` segment the store
/// carries. Everything up to (not including) the first tile's `SOT` is
/// produced here; tile-part framing is `begin_tile_part`/
/// `finish_tile_part`/`write_eoc` below.
pub fn write_main_header(store: &ParameterStore) -> Result<Vec<u8>, Jpeg2000Error> {
    let mut out = Vec::new();
    push_marker(&mut out, JpegMarkerCode::Soc);
    push_segment(&mut out, JpegMarkerCode::Siz, &write_siz_body(store))?;

    if let Some(cap) = &store.cap {
        push_segment(&mut out, JpegMarkerCode::Cap, &write_cap_body(cap.pcap, &cap.ccap))?;
    }

    push_segment(&mut out, JpegMarkerCode::Cod, &write_cod_body(&store.cod))?;
    let num_components = store.num_components();
    let mut coc_components: Vec<&u32> = store.coc.keys().collect();
    coc_components.sort();
    for &component in coc_components {
        let cod = &store.coc[component];
        push_segment(&mut out, JpegMarkerCode::Coc, &write_coc_body(*component, num_components, cod))?;
    }

    push_segment(&mut out, JpegMarkerCode::Qcd, &write_qcd_body(&store.qcd))?;
    let mut qcc_components: Vec<&u32> = store.qcc.keys().collect();
    qcc_components.sort();
    for &component in qcc_components {
        let qcd = &store.qcc[component];
        push_segment(&mut out, JpegMarkerCode::Qcc, &write_qcc_body(*component, num_components, qcd))?;
    }

    for atk in &store.atks {
        push_segment(&mut out, JpegMarkerCode::Atk, &write_atk_body(atk))?;
    }
    for dfs in &store.dfss {
        push_segment(&mut out, JpegMarkerCode::Dfs, &write_dfs_body(dfs))?;
    }

    Ok(out)
}

/// Appends a tile-part's `SOT` header with a placeholder `Psot` of 0 and
/// returns the byte offset of the segment's own `0xFF` marker byte, to
/// be passed to `finish_tile_part` once the tile-part's coded data has
/// been appended.
pub fn begin_tile_part(out: &mut Vec<u8>, isot: u16, tpsot: u8, tnsot: u8) -> usize {
    let start = out.len();
    push_marker(out, JpegMarkerCode::Sot);
    out.extend_from_slice(&10u16.to_be_bytes()); // Lsot
    out.extend_from_slice(&isot.to_be_bytes());
    out.extend_from_slice(&0u32.to_be_bytes()); // Psot placeholder
    out.push(tpsot);
    out.push(tnsot);
    start
}

/// Appends the `SOD` marker that ends a tile-part's header and begins
/// its packet data.
pub fn write_sod(out: &mut Vec<u8>) {
    push_marker(out, JpegMarkerCode::Sod);
}

/// Patches the `Psot` field at `sot_offset` (as returned by
/// `begin_tile_part`) once every byte of this tile-part, including its
/// own `SOT`/`SOD` markers and coded data, has been appended to `out`.
pub fn finish_tile_part(out: &mut [u8], sot_offset: usize) -> Result<(), Jpeg2000Error> {
    let psot = out.len().checked_sub(sot_offset).ok_or(Jpeg2000Error::DestinationTooSmall)?;
    let psot: u32 = psot.try_into().map_err(|_| Jpeg2000Error::DestinationTooSmall)?;
    let field = sot_offset + 6;
    out.get_mut(field..field + 4)
        .ok_or(Jpeg2000Error::DestinationTooSmall)?
        .copy_from_slice(&psot.to_be_bytes());
    Ok(())
}

pub fn write_eoc(out: &mut Vec<u8>) {
    push_marker(out, JpegMarkerCode::Eoc);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg2000::params::atk::{Atk, LiftingStep};
    use crate::jpeg2000::params::cod::{Cod, ProgressionOrder};
    use crate::jpeg2000::params::dfs::{Dfs, DwtSplit};
    use crate::jpeg2000::params::qcd::{QuantStep, QuantizationStyle, Qcd};
    use crate::jpeg2000::params::siz::{Siz, SizComponentInfo};
    use crate::jpeg2000::parser::parse_codestream;

    fn sample_store() -> ParameterStore {
        let siz = Siz {
            rsiz: 0x4000,
            x_siz: 32,
            y_siz: 32,
            x_osiz: 0,
            y_osiz: 0,
            xt_siz: 32,
            yt_siz: 32,
            xt_osiz: 0,
            yt_osiz: 0,
            components: vec![SizComponentInfo { s_siz: 7, x_rsiz: 1, y_rsiz: 1 }],
        };
        let cod = Cod {
            scod: 0,
            progression_order: ProgressionOrder::Lrcp,
            num_layers: 1,
            use_color_transform: false,
            num_decomp_raw: 2,
            block_width_exp: 4,
            block_height_exp: 4,
            block_style: 0x40,
            wavelet_id: 1,
            precinct_sizes: vec![],
        };
        let qcd = Qcd { style: QuantizationStyle::ScalarDerived, guard_bits: 2, steps: vec![QuantStep { exponent: 4, mantissa: 0 }] };
        ParameterStore::new(siz, cod, qcd, None, vec![], vec![]).unwrap()
    }

    #[test]
    fn writes_soc_siz_cod_qcd_in_order() {
        let store = sample_store();
        let bytes = write_main_header(&store).unwrap();
        assert_eq!(&bytes[0..2], &[0xFF, 0x4F]); // SOC
        assert_eq!(&bytes[2..4], &[0xFF, 0x51]); // SIZ
    }

    #[test]
    fn includes_cap_atk_and_dfs_segments() {
        let mut store = sample_store();
        store.cap = Some(crate::jpeg2000::params::cap::Cap { pcap: 0x0002_0000, ccap: vec![0x0020] });
        store.atks.push(Atk { index: 2, reversible: true, k: 1.0, steps: vec![LiftingStep::Reversible { e: 1, b: 0, a: -1 }] });
        store.dfss.push(Dfs { index: 0, levels: vec![DwtSplit::Horizontal, DwtSplit::Vertical] });

        let bytes = write_main_header(&store).unwrap();
        assert!(bytes.windows(2).any(|w| w == [0xFF, 0x50])); // CAP
        assert!(bytes.windows(2).any(|w| w == [0xFF, 0x79])); // ATK
        assert!(bytes.windows(2).any(|w| w == [0xFF, 0x72])); // DFS
    }

    #[test]
    fn patches_psot_to_span_the_whole_tile_part() {
        let mut out = Vec::new();
        let start = begin_tile_part(&mut out, 0, 0, 1);
        write_sod(&mut out);
        out.extend_from_slice(&[1, 2, 3, 4]);
        finish_tile_part(&mut out, start).unwrap();

        let psot = u32::from_be_bytes(out[start + 6..start + 10].try_into().unwrap());
        assert_eq!(psot as usize, out.len() - start);
    }

    #[test]
    fn round_trips_a_whole_codestream_with_one_empty_tile_part() {
        let store = sample_store();
        let mut out = write_main_header(&store).unwrap();
        let start = begin_tile_part(&mut out, 0, 0, 1);
        write_sod(&mut out);
        out.extend_from_slice(&[0xAA, 0xBB]);
        finish_tile_part(&mut out, start).unwrap();
        write_eoc(&mut out);

        let parsed = parse_codestream(&out).unwrap();
        assert_eq!(parsed.store.siz.x_siz, store.siz.x_siz);
        assert_eq!(parsed.tile_parts.len(), 1);
        assert_eq!(parsed.tile_parts[0].0.isot, 0);
    }
}
