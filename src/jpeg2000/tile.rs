//! Tile Builder: computes concrete tile/component/resolution/subband/
//! code-block/precinct rectangles from a validated Parameter Store.
//!
//! Grounded on SPEC_FULL.md §4.3; DFS-aware subband enumeration grounded
//! on `param_dfs::get_dwt_type` in
//! `examples/original_source/src/core/codestream/ojph_params_local.h`.

use crate::error::Jpeg2000Error;
use crate::jpeg2000::params::dfs::DwtSplit;
use crate::jpeg2000::params::ParameterStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub w: u32,
    pub h: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    pub fn is_empty(&self) -> bool {
        self.size.w == 0 || self.size.h == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubbandOrientation {
    Ll,
    Hl,
    Lh,
    Hh,
}

fn div_ceil(a: u32, b: u32) -> u32 {
    (a + b - 1) / b
}

/// Tile index `(tx, ty)` in the row-major tile grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileIndex {
    pub tx: u32,
    pub ty: u32,
}

pub struct TileBuilder<'a> {
    store: &'a ParameterStore,
}

impl<'a> TileBuilder<'a> {
    pub fn new(store: &'a ParameterStore) -> Self {
        TileBuilder { store }
    }

    /// Tile rectangle in the reference (component-0) grid, per §3: tiles
    /// are `(XTsiz,YTsiz)`-sized, offset by `(XTOsiz,YTOsiz)`, and clipped
    /// to the image extent at the right/bottom edges.
    pub fn tile_rect(&self, tile: TileIndex) -> Rect {
        let siz = &self.store.siz;
        let x0 = siz.xt_osiz + tile.tx * siz.xt_siz;
        let y0 = siz.yt_osiz + tile.ty * siz.yt_siz;
        let x1 = (x0 + siz.xt_siz).min(siz.x_siz);
        let y1 = (y0 + siz.yt_siz).min(siz.y_siz);
        let x0 = x0.max(siz.x_osiz);
        let y0 = y0.max(siz.y_osiz);
        Rect {
            origin: Point { x: x0, y: y0 },
            size: Size {
                w: x1.saturating_sub(x0),
                h: y1.saturating_sub(y0),
            },
        }
    }

    /// Number of decomposition levels for component `c`, i.e. the number
    /// of resolutions minus one.
    pub fn num_decompositions(&self, c: u32) -> Result<u8, Jpeg2000Error> {
        Ok(self.store.cod_for_component(c)?.num_decompositions())
    }

    /// LL-band size at decomposition level (resolution index counted
    /// from the full-resolution component down) `level`, where `level=0`
    /// is the full-resolution component and `level=N` is the coarsest LL.
    pub fn ll_size_at_level(&self, comp_size: Size, level: u32) -> Size {
        let div = 1u32 << level;
        Size {
            w: div_ceil(comp_size.w, div),
            h: div_ceil(comp_size.h, div),
        }
    }

    /// Subband sizes produced by decomposing a resolution-`level-1` LL
    /// band of size `parent_ll` into resolution `level`'s HL/LH/HH per
    /// the DFS split type at that level (§4.5's DFS interaction note).
    /// Low/high split counts follow `dwt::half_widths(_, even=true)`: the
    /// even (LL-bound) phase gets the ceiling count, the odd (detail)
    /// phase the floor, matching the in-place 2D driver's deinterleave so
    /// subband rectangles line up with what `forward_dwt_2d_i32` actually
    /// wrote into the tile-component plane.
    pub fn subband_sizes(
        &self,
        parent_ll: Size,
        split: DwtSplit,
    ) -> (Size, Size, Size, Size) {
        let low_w = (parent_ll.w + 1) / 2;
        let high_w = parent_ll.w / 2;
        let low_h = (parent_ll.h + 1) / 2;
        let high_h = parent_ll.h / 2;
        match split {
            DwtSplit::None => (parent_ll, Size { w: 0, h: 0 }, Size { w: 0, h: 0 }, Size { w: 0, h: 0 }),
            DwtSplit::Bidirectional => (
                Size { w: low_w, h: low_h },
                Size { w: high_w, h: low_h },
                Size { w: low_w, h: high_h },
                Size { w: high_w, h: high_h },
            ),
            DwtSplit::Horizontal => (
                Size { w: low_w, h: parent_ll.h },
                Size { w: high_w, h: parent_ll.h },
                Size { w: 0, h: 0 },
                Size { w: 0, h: 0 },
            ),
            DwtSplit::Vertical => (
                Size { w: parent_ll.w, h: low_h },
                Size { w: 0, h: 0 },
                Size { w: parent_ll.w, h: high_h },
                Size { w: 0, h: 0 },
            ),
        }
    }

    /// Code-block grid dimensions for a subband of the given size, using
    /// component `c`'s nominal code-block size (§4.3 "Code-block grids
    /// are tile-origin aligned; partial blocks ... carry reduced
    /// dimensions").
    pub fn code_block_grid(&self, c: u32, subband_size: Size) -> Result<(u32, u32), Jpeg2000Error> {
        let (bw, bh) = self.store.cod_for_component(c)?.block_dims();
        Ok((div_ceil(subband_size.w, bw), div_ceil(subband_size.h, bh)))
    }

    /// Code-block `(i,j)` rectangle within a subband of the given size.
    pub fn code_block_rect(
        &self,
        c: u32,
        subband_size: Size,
        i: u32,
        j: u32,
    ) -> Result<Rect, Jpeg2000Error> {
        let (bw, bh) = self.store.cod_for_component(c)?.block_dims();
        let x0 = (i * bw).min(subband_size.w);
        let y0 = (j * bh).min(subband_size.h);
        let x1 = ((i + 1) * bw).min(subband_size.w);
        let y1 = ((j + 1) * bh).min(subband_size.h);
        Ok(Rect {
            origin: Point { x: x0, y: y0 },
            size: Size {
                w: x1.saturating_sub(x0),
                h: y1.saturating_sub(y0),
            },
        })
    }

    /// Precinct grid dimensions at resolution `r` for component `c`,
    /// covering a resolution rectangle of size `res_size` (§4.3
    /// "Precinct partitioning").
    pub fn precinct_grid(&self, c: u32, r: u32, res_size: Size) -> Result<(u32, u32), Jpeg2000Error> {
        let (log_w, log_h) = self.store.cod_for_component(c)?.log_precinct_size(r);
        let pw = 1u32 << log_w;
        let ph = 1u32 << log_h;
        Ok((div_ceil(res_size.w, pw), div_ceil(res_size.h, ph)))
    }

    /// Full subband layout for component `c` over a tile-component plane
    /// of size `full_size`: one entry per resolution, from the coarsest
    /// LL (resolution 0) up to the finest detail bands, each carrying
    /// its orientation and its rectangle *within the transformed plane*
    /// (the in-place layout `dwt::forward_dwt_2d_i32`/`_f32` produce —
    /// LL always nests at the plane's origin, HL/LH/HH fill the rest of
    /// the region that level's decomposition consumed).
    pub fn subband_layout(&self, c: u32, full_size: Size) -> Result<Vec<(u32, Vec<(SubbandOrientation, Rect)>)>, Jpeg2000Error> {
        let cod = self.store.cod_for_component(c)?;
        let num_decomp = cod.num_decompositions() as u32;
        let dfs = if cod.is_dfs_defined() {
            self.store.dfs_for(cod.dfs_index() as u32)
        } else {
            None
        };

        let mut layouts = Vec::new();
        let mut cur = full_size;
        for lvl in 0..num_decomp {
            let split = dfs.map(|d| d.split_at(lvl + 1)).unwrap_or(DwtSplit::Bidirectional);
            let (ll, hl, lh, hh) = self.subband_sizes(cur, split);
            let resolution = num_decomp - lvl;
            let mut subbands = Vec::new();
            if hl.w != 0 && hl.h != 0 {
                subbands.push((SubbandOrientation::Hl, Rect { origin: Point { x: ll.w, y: 0 }, size: hl }));
            }
            if lh.w != 0 && lh.h != 0 {
                subbands.push((SubbandOrientation::Lh, Rect { origin: Point { x: 0, y: ll.h }, size: lh }));
            }
            if hh.w != 0 && hh.h != 0 {
                subbands.push((SubbandOrientation::Hh, Rect { origin: Point { x: ll.w, y: ll.h }, size: hh }));
            }
            layouts.push((resolution, subbands));
            cur = ll;
        }
        layouts.push((0, vec![(SubbandOrientation::Ll, Rect { origin: Point { x: 0, y: 0 }, size: cur })]));
        layouts.reverse();
        Ok(layouts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jpeg2000::params::cod::{Cod, ProgressionOrder, WAVELET_REVERSIBLE_53};
    use crate::jpeg2000::params::qcd::{Qcd, QuantStep, QuantizationStyle};
    use crate::jpeg2000::params::siz::{Siz, SizComponentInfo};

    fn store() -> ParameterStore {
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
    fn tile_rect_covers_whole_image_for_single_tile() {
        let store = store();
        let builder = TileBuilder::new(&store);
        let rect = builder.tile_rect(TileIndex { tx: 0, ty: 0 });
        assert_eq!(rect.size, Size { w: 352, h: 288 });
    }

    #[test]
    fn ll_size_at_level_matches_s6_scenario() {
        let store = store();
        let builder = TileBuilder::new(&store);
        assert_eq!(
            builder.ll_size_at_level(Size { w: 352, h: 288 }, 0),
            Size { w: 352, h: 288 }
        );
    }

    #[test]
    fn bidirectional_split_produces_three_detail_bands() {
        let store = store();
        let builder = TileBuilder::new(&store);
        let (ll, hl, lh, hh) = builder.subband_sizes(Size { w: 64, h: 64 }, DwtSplit::Bidirectional);
        assert_eq!(ll, Size { w: 32, h: 32 });
        assert_eq!(hl, Size { w: 32, h: 32 });
        assert_eq!(lh, Size { w: 32, h: 32 });
        assert_eq!(hh, Size { w: 32, h: 32 });
    }

    #[test]
    fn horizontal_only_split_skips_vertical_axis() {
        let store = store();
        let builder = TileBuilder::new(&store);
        let (ll, hl, lh, hh) = builder.subband_sizes(Size { w: 64, h: 64 }, DwtSplit::Horizontal);
        assert_eq!(ll.h, 64);
        assert_eq!(hl.h, 64);
        assert_eq!(lh, Size { w: 0, h: 0 });
        assert_eq!(hh, Size { w: 0, h: 0 });
    }

    #[test]
    fn code_block_grid_counts_partial_blocks() {
        let store = store();
        let builder = TileBuilder::new(&store);
        let (gx, gy) = builder.code_block_grid(0, Size { w: 100, h: 70 }).unwrap();
        assert_eq!((gx, gy), (2, 2));
        let rect = builder.code_block_rect(0, Size { w: 100, h: 70 }, 1, 1).unwrap();
        assert_eq!(rect.size, Size { w: 36, h: 6 });
    }
}
