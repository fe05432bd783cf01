//! Codestream Parser: turns a raw `J2C`/`JPH` byte slice into a
//! validated Parameter Store plus tile-part byte ranges (§4.1, §7).
//!
//! Marker-segment field layouts ground on the SIZ/COD/COC/QCD/QCC/CAP/
//! ATK/DFS/SOT structs in `jpeg2000::params`; the ATK wire layout (not
//! present in the retrieved reference excerpt) is this crate's own
//! self-consistent encoding, documented in DESIGN.md.

use crate::error::Jpeg2000Error;
use crate::jpeg2000::markers::JpegMarkerCode;
use crate::jpeg2000::params::atk::{Atk, LiftingStep, MAX_ATK_STEPS};
use crate::jpeg2000::params::cap::Cap;
use crate::jpeg2000::params::cod::{Cod, ProgressionOrder};
use crate::jpeg2000::params::dfs::Dfs;
use crate::jpeg2000::params::qcd::{QuantStep, QuantizationStyle, Qcd};
use crate::jpeg2000::params::siz::{Siz, SizComponentInfo};
use crate::jpeg2000::params::sot::Sot;
use crate::jpeg2000::params::ParameterStore;
use std::collections::HashMap;
use std::convert::TryFrom;

/// Big-endian byte cursor over the codestream, independent of any
/// particular marker taxonomy.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn require(&self, n: usize) -> Result<(), Jpeg2000Error> {
        if self.pos + n > self.data.len() {
            Err(Jpeg2000Error::Truncated { offset: self.pos })
        } else {
            Ok(())
        }
    }

    fn read_u8(&mut self) -> Result<u8, Jpeg2000Error> {
        self.require(1)?;
        let v = self.data[self.pos];
        self.pos += 1;
        Ok(v)
    }

    fn read_u16(&mut self) -> Result<u16, Jpeg2000Error> {
        self.require(2)?;
        let v = u16::from_be_bytes([self.data[self.pos], self.data[self.pos + 1]]);
        self.pos += 2;
        Ok(v)
    }

    fn read_u32(&mut self) -> Result<u32, Jpeg2000Error> {
        self.require(4)?;
        let v = u32::from_be_bytes(self.data[self.pos..self.pos + 4].try_into().unwrap());
        self.pos += 4;
        Ok(v)
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], Jpeg2000Error> {
        self.require(n)?;
        let s = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(s)
    }

    fn advance(&mut self, n: usize) -> Result<(), Jpeg2000Error> {
        self.require(n)?;
        self.pos += n;
        Ok(())
    }
}

/// The outcome of parsing one codestream: its validated parameter set
/// and the byte range (within the original slice) of each tile-part's
/// payload, in the order encountered.
pub struct ParsedCodestream {
    pub store: ParameterStore,
    pub tile_parts: Vec<(Sot, std::ops::Range<usize>)>,
}

fn parse_siz(cur: &mut Cursor) -> Result<Siz, Jpeg2000Error> {
    let _len = cur.read_u16()?;
    let rsiz = cur.read_u16()?;
    let x_siz = cur.read_u32()?;
    let y_siz = cur.read_u32()?;
    let x_osiz = cur.read_u32()?;
    let y_osiz = cur.read_u32()?;
    let xt_siz = cur.read_u32()?;
    let yt_siz = cur.read_u32()?;
    let xt_osiz = cur.read_u32()?;
    let yt_osiz = cur.read_u32()?;
    let num_comps = cur.read_u16()?;

    let mut components = Vec::with_capacity(num_comps as usize);
    for _ in 0..num_comps {
        let s_siz = cur.read_u8()?;
        let x_rsiz = cur.read_u8()?;
        let y_rsiz = cur.read_u8()?;
        components.push(SizComponentInfo { s_siz, x_rsiz, y_rsiz });
    }

    Ok(Siz { rsiz, x_siz, y_siz, x_osiz, y_osiz, xt_siz, yt_siz, xt_osiz, yt_osiz, components })
}

/// Shared tail of COD/COC: decomposition levels, code-block geometry,
/// style, wavelet id, and (if `has_precincts`) one precinct-size byte
/// pair per resolution.
fn parse_spcod_tail(cur: &mut Cursor, has_precincts: bool) -> Result<(u8, u8, u8, u8, u8, Vec<(u8, u8)>), Jpeg2000Error> {
    let num_decomp_raw = cur.read_u8()?;
    let block_width_exp = cur.read_u8()?;
    let block_height_exp = cur.read_u8()?;
    let block_style = cur.read_u8()?;
    let wavelet_id = cur.read_u8()?;

    let mut precinct_sizes = Vec::new();
    if has_precincts {
        let count = (num_decomp_raw & 0x7F) as usize + 1;
        for _ in 0..count {
            let b = cur.read_u8()?;
            precinct_sizes.push((b & 0xF, (b >> 4) & 0xF));
        }
    }
    Ok((num_decomp_raw, block_width_exp, block_height_exp, block_style, wavelet_id, precinct_sizes))
}

fn parse_cod(cur: &mut Cursor) -> Result<Cod, Jpeg2000Error> {
    let _len = cur.read_u16()?;
    let scod = cur.read_u8()?;
    let sprog = cur.read_u8()?;
    let num_layers = cur.read_u16()?;
    let mct = cur.read_u8()?;
    let has_precincts = scod & 1 != 0;
    let (num_decomp_raw, block_width_exp, block_height_exp, block_style, wavelet_id, precinct_sizes) =
        parse_spcod_tail(cur, has_precincts)?;

    Ok(Cod {
        scod,
        progression_order: ProgressionOrder::from_u8(sprog)?,
        num_layers,
        use_color_transform: mct & 1 != 0,
        num_decomp_raw,
        block_width_exp,
        block_height_exp,
        block_style,
        wavelet_id,
        precinct_sizes,
    })
}

fn parse_coc(cur: &mut Cursor, parent: &Cod, num_components: u32) -> Result<(u32, Cod), Jpeg2000Error> {
    let _len = cur.read_u16()?;
    let ccoc = if num_components < 257 { cur.read_u8()? as u32 } else { cur.read_u16()? as u32 };
    let scoc = cur.read_u8()?;
    let has_precincts = scoc & 1 != 0;
    let (num_decomp_raw, block_width_exp, block_height_exp, block_style, wavelet_id, precinct_sizes) =
        parse_spcod_tail(cur, has_precincts)?;

    Ok((
        ccoc,
        Cod {
            scod: scoc,
            num_decomp_raw,
            block_width_exp,
            block_height_exp,
            block_style,
            wavelet_id,
            precinct_sizes,
            ..parent.clone()
        },
    ))
}

fn parse_qcd(cur: &mut Cursor) -> Result<Qcd, Jpeg2000Error> {
    let len = cur.read_u16()?;
    let sqcd = cur.read_u8()?;
    let style = QuantizationStyle::from_bits(sqcd & 0x1F)?;
    let guard_bits = (sqcd >> 5) & 0x7;
    let remaining = (len as usize).saturating_sub(3);

    let steps = if style == QuantizationStyle::None {
        let raw = cur.read_bytes(remaining)?;
        raw.iter().map(|&b| QuantStep { exponent: b >> 3, mantissa: 0 }).collect()
    } else {
        let count = remaining / 2;
        let mut steps = Vec::with_capacity(count);
        for _ in 0..count {
            let v = cur.read_u16()?;
            steps.push(QuantStep { exponent: (v >> 11) as u8, mantissa: v & 0x7FF });
        }
        steps
    };

    Ok(Qcd { style, guard_bits, steps })
}

fn parse_qcc(cur: &mut Cursor, num_components: u32) -> Result<(u32, Qcd), Jpeg2000Error> {
    let len = cur.read_u16()?;
    let ccqc_len = if num_components < 257 { 1 } else { 2 };
    let cqcc = if ccqc_len == 1 { cur.read_u8()? as u32 } else { cur.read_u16()? as u32 };
    let sqcc = cur.read_u8()?;
    let style = QuantizationStyle::from_bits(sqcc & 0x1F)?;
    let guard_bits = (sqcc >> 5) & 0x7;
    let remaining = (len as usize).saturating_sub(2 + ccqc_len + 1);

    let steps = if style == QuantizationStyle::None {
        let raw = cur.read_bytes(remaining)?;
        raw.iter().map(|&b| QuantStep { exponent: b >> 3, mantissa: 0 }).collect()
    } else {
        let count = remaining / 2;
        let mut steps = Vec::with_capacity(count);
        for _ in 0..count {
            let v = cur.read_u16()?;
            steps.push(QuantStep { exponent: (v >> 11) as u8, mantissa: v & 0x7FF });
        }
        steps
    };

    Ok((cqcc, Qcd { style, guard_bits, steps }))
}

fn parse_cap(cur: &mut Cursor) -> Result<Cap, Jpeg2000Error> {
    let len = cur.read_u16()?;
    if len < 6 {
        return Err(Jpeg2000Error::InvalidField { marker: JpegMarkerCode::Cap as u16, offset: cur.pos });
    }
    let pcap = cur.read_u32()?;
    let mut bytes_left = (len as usize).saturating_sub(6);
    let mut ccap = Vec::new();
    while bytes_left >= 2 {
        ccap.push(cur.read_u16()?);
        bytes_left -= 2;
    }
    cur.advance(bytes_left)?;
    Ok(Cap { pcap, ccap })
}

/// This crate's own wire layout for the ATK segment: `index`(1),
/// `flags`(1, bit0 = reversible, bits1-3 = step count), `K`(4, only
/// when irreversible), then one step per entry (5 bytes reversible:
/// `e,b,a`; 4 bytes irreversible: `a`).
fn parse_atk(cur: &mut Cursor) -> Result<Atk, Jpeg2000Error> {
    let _len = cur.read_u16()?;
    let index = cur.read_u8()?;
    let flags = cur.read_u8()?;
    let reversible = flags & 1 != 0;
    let num_steps = ((flags >> 1) & 0x7) as usize;
    if num_steps > MAX_ATK_STEPS {
        return Err(Jpeg2000Error::UnsupportedFeature(crate::error::UnsupportedFeature::TooManyAtkSteps));
    }
    let k = if reversible { 1.0 } else { f32::from_bits(cur.read_u32()?) };

    let mut steps = Vec::with_capacity(num_steps);
    for _ in 0..num_steps {
        if reversible {
            let e = cur.read_u8()?;
            let b = cur.read_u16()? as i16;
            let a = cur.read_u16()? as i16;
            steps.push(LiftingStep::Reversible { e, b, a });
        } else {
            let a = f32::from_bits(cur.read_u32()?);
            steps.push(LiftingStep::Irreversible { a });
        }
    }

    Ok(Atk { index, reversible, k, steps })
}

fn parse_dfs(cur: &mut Cursor) -> Result<Dfs, Jpeg2000Error> {
    let _len = cur.read_u16()?;
    let index = cur.read_u16()?;
    let num_levels = cur.read_u8()?;
    let packed = cur.read_bytes(num_levels.div_ceil(4) as usize)?;
    Ok(Dfs::from_packed_bytes(index, num_levels, packed))
}

fn skip_unknown(cur: &mut Cursor) -> Result<(), Jpeg2000Error> {
    let len = cur.read_u16()?;
    if len < 2 {
        return Err(Jpeg2000Error::InvalidField { marker: 0, offset: cur.pos });
    }
    cur.advance(len as usize - 2)
}

fn expect_marker(cur: &mut Cursor) -> Result<JpegMarkerCode, Jpeg2000Error> {
    let b1 = cur.read_u8()?;
    if b1 != 0xFF {
        return Err(Jpeg2000Error::UnexpectedMarker { marker: b1 as u16, offset: cur.pos - 1 });
    }
    let b2 = cur.read_u8()?;
    JpegMarkerCode::try_from(0xFF00u16 | b2 as u16)
}

/// Parses the main header (`SOC` through the marker preceding the first
/// `SOT`) into a validated `ParameterStore`.
pub(crate) fn parse_main_header(cur: &mut Cursor) -> Result<ParameterStore, Jpeg2000Error> {
    let soc = expect_marker(cur)?;
    if soc != JpegMarkerCode::Soc {
        return Err(Jpeg2000Error::UnexpectedMarker { marker: soc as u16, offset: 0 });
    }

    let mut siz: Option<Siz> = None;
    let mut cod: Option<Cod> = None;
    let mut qcd: Option<Qcd> = None;
    let mut cap: Option<Cap> = None;
    let mut coc: HashMap<u32, Cod> = HashMap::new();
    let mut qcc: HashMap<u32, Qcd> = HashMap::new();
    let mut atks: Vec<Atk> = Vec::new();
    let mut dfss: Vec<Dfs> = Vec::new();

    loop {
        let marker = expect_marker(cur)?;
        match marker {
            JpegMarkerCode::Sot => break,
            JpegMarkerCode::Siz => siz = Some(parse_siz(cur)?),
            JpegMarkerCode::Cod => cod = Some(parse_cod(cur)?),
            JpegMarkerCode::Coc => {
                let parent = cod.as_ref().ok_or(Jpeg2000Error::UnexpectedMarker { marker: marker as u16, offset: cur.pos })?;
                let num_comps = siz.as_ref().map(|s| s.num_components()).unwrap_or(0);
                let (c, value) = parse_coc(cur, parent, num_comps)?;
                coc.insert(c, value);
            }
            JpegMarkerCode::Qcd => qcd = Some(parse_qcd(cur)?),
            JpegMarkerCode::Qcc => {
                let num_comps = siz.as_ref().map(|s| s.num_components()).unwrap_or(0);
                let (c, value) = parse_qcc(cur, num_comps)?;
                qcc.insert(c, value);
            }
            JpegMarkerCode::Cap => cap = Some(parse_cap(cur)?),
            JpegMarkerCode::Atk => atks.push(parse_atk(cur)?),
            JpegMarkerCode::Dfs => dfss.push(parse_dfs(cur)?),
            JpegMarkerCode::Eoc => return Err(Jpeg2000Error::Truncated { offset: cur.pos }),
            _ => skip_unknown(cur)?,
        }
    }
    cur.pos -= 2; // rewind onto the SOT marker so the tile-part loop can re-read it

    let siz = siz.ok_or(Jpeg2000Error::Truncated { offset: cur.pos })?;
    let cod = cod.ok_or(Jpeg2000Error::Truncated { offset: cur.pos })?;
    let qcd = qcd.ok_or(Jpeg2000Error::Truncated { offset: cur.pos })?;

    let store = ParameterStore::new(siz, cod, qcd, cap, atks, dfss)?;
    store.with_component_overrides(coc, qcc)
}

/// Parses one tile-part's `SOT` header (and any tile-header markers up
/// to `SOD`), returning the parsed header and the payload's byte range.
fn parse_tile_part(cur: &mut Cursor) -> Result<(Sot, std::ops::Range<usize>), Jpeg2000Error> {
    let tile_part_start = cur.pos;
    let marker = expect_marker(cur)?;
    if marker != JpegMarkerCode::Sot {
        return Err(Jpeg2000Error::UnexpectedMarker { marker: marker as u16, offset: cur.pos });
    }
    let _lsot = cur.read_u16()?;
    let isot = cur.read_u16()?;
    let psot = cur.read_u32()?;
    let tpsot = cur.read_u8()?;
    let tnsot = cur.read_u8()?;
    let sot = Sot { isot, psot, tpsot, tnsot };

    loop {
        let marker = expect_marker(cur)?;
        match marker {
            JpegMarkerCode::Sod => break,
            _ => skip_unknown(cur)?,
        }
    }

    // Psot counts every byte of this tile-part starting at the SOT
    // marker's own 0xFF byte, through the end of its coded data.
    let payload_start = cur.pos;
    let payload_len = if sot.psot == 0 {
        cur.data.len() - payload_start
    } else {
        (sot.psot as usize).saturating_sub(payload_start - tile_part_start)
    };
    let end = (payload_start + payload_len).min(cur.data.len());
    cur.advance(end - payload_start)?;

    Ok((sot, payload_start..end))
}

/// Parses an entire codestream buffer into its parameter set and the
/// byte ranges of each tile-part's payload.
pub fn parse_codestream(data: &[u8]) -> Result<ParsedCodestream, Jpeg2000Error> {
    let mut cur = Cursor::new(data);
    let store = parse_main_header(&mut cur)?;

    let mut tile_parts = Vec::new();
    loop {
        if cur.pos + 2 > data.len() {
            break;
        }
        if data[cur.pos] == 0xFF && data[cur.pos + 1] == (JpegMarkerCode::Eoc as u16 & 0xFF) as u8 {
            break;
        }
        let (sot, range) = parse_tile_part(&mut cur)?;
        tile_parts.push((sot, range));
    }

    Ok(ParsedCodestream { store, tile_parts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg2000::writer;

    fn sample_store() -> ParameterStore {
        let siz = Siz {
            rsiz: 0x4000,
            x_siz: 64,
            y_siz: 64,
            x_osiz: 0,
            y_osiz: 0,
            xt_siz: 64,
            yt_siz: 64,
            xt_osiz: 0,
            yt_osiz: 0,
            components: vec![SizComponentInfo { s_siz: 7, x_rsiz: 1, y_rsiz: 1 }],
        };
        let cod = Cod {
            scod: 0,
            progression_order: ProgressionOrder::Lrcp,
            num_layers: 1,
            use_color_transform: false,
            num_decomp_raw: 3,
            block_width_exp: 4,
            block_height_exp: 4,
            block_style: 0x40,
            wavelet_id: 1,
            precinct_sizes: vec![],
        };
        let qcd = Qcd { style: QuantizationStyle::ScalarDerived, guard_bits: 2, steps: vec![QuantStep { exponent: 5, mantissa: 0 }] };
        ParameterStore::new(siz, cod, qcd, None, vec![], vec![]).unwrap()
    }

    #[test]
    fn round_trips_main_header_through_writer() {
        let store = sample_store();
        let bytes = writer::write_main_header(&store).unwrap();

        let mut cur = Cursor::new(&bytes);
        // Append a synthetic SOT so parse_main_header finds its terminator.
        let mut with_sot = bytes.clone();
        with_sot.extend_from_slice(&[0xFF, 0x90, 0x00, 0x0A, 0, 0, 0, 0, 0, 0, 0, 0]);
        let mut cur2 = Cursor::new(&with_sot);
        let parsed = parse_main_header(&mut cur2).unwrap();

        assert_eq!(parsed.siz.x_siz, store.siz.x_siz);
        assert_eq!(parsed.siz.y_siz, store.siz.y_siz);
        assert_eq!(parsed.cod.num_decompositions(), store.cod.num_decompositions());
        assert_eq!(parsed.qcd.guard_bits, store.qcd.guard_bits);
        let _ = cur.pos;
    }
}
