//! Legacy Part-1 EBCOT bit-plane coder: three passes per bit-plane
//! (significance propagation, magnitude refinement, cleanup) over an
//! MQ arithmetic coder, the `LegacyBlockCoder` half of the block coder
//! interface (§4.7).

use super::mq_coder::MqCoder;

pub struct BitPlaneCoder {
    pub width: u32,
    pub height: u32,
    /// Subband this code-block belongs to: 0/1 = LL/LH, 2 = HL, 3 = HH,
    /// selecting the zero-coding context table (Table C-1 analog).
    pub band: u8,
    pub state: Vec<u8>,
    pub mq: MqCoder,
}

impl BitPlaneCoder {
    pub fn new(width: u32, height: u32, band: u8) -> Self {
        let size = (width * height) as usize;
        let mut mq = MqCoder::new();
        mq.init_contexts(19);

        Self { width, height, band, state: vec![0; size], mq }
    }

    const SIG: u8 = 1 << 0;
    const VISITED: u8 = 1 << 1;
    const REFINE: u8 = 1 << 2;
    const SIGN: u8 = 1 << 3;

    pub fn get_neighbors(&self, x: u32, y: u32) -> (u8, u8, u8) {
        let w = self.width as i32;
        let h = self.height as i32;
        let ix = x as i32;
        let iy = y as i32;

        let mut h_cnt = 0;
        let mut v_cnt = 0;
        let mut d_cnt = 0;

        let idx = |cnx, cny| (cny * w + cnx) as usize;

        if ix > 0 && (self.state[idx(ix - 1, iy)] & Self::SIG) != 0 { h_cnt += 1; }
        if ix < w - 1 && (self.state[idx(ix + 1, iy)] & Self::SIG) != 0 { h_cnt += 1; }

        if iy > 0 && (self.state[idx(ix, iy - 1)] & Self::SIG) != 0 { v_cnt += 1; }
        if iy < h - 1 && (self.state[idx(ix, iy + 1)] & Self::SIG) != 0 { v_cnt += 1; }

        if ix > 0 && iy > 0 && (self.state[idx(ix - 1, iy - 1)] & Self::SIG) != 0 { d_cnt += 1; }
        if ix < w - 1 && iy > 0 && (self.state[idx(ix + 1, iy - 1)] & Self::SIG) != 0 { d_cnt += 1; }
        if ix > 0 && iy < h - 1 && (self.state[idx(ix - 1, iy + 1)] & Self::SIG) != 0 { d_cnt += 1; }
        if ix < w - 1 && iy < h - 1 && (self.state[idx(ix + 1, iy + 1)] & Self::SIG) != 0 { d_cnt += 1; }

        (h_cnt, v_cnt, d_cnt)
    }

    fn get_zc_context(&self, band: u8, h: u8, v: u8, d: u8) -> usize {
        match band {
            0 | 1 => match (h, v, d) {
                (2, _, _) => 8,
                (1, v, _) if v >= 1 => 7,
                (1, 0, d) if d >= 1 => 6,
                (1, 0, 0) => 5,
                (0, 2, _) => 4,
                (0, 1, _) => 3,
                (0, 0, d) if d >= 2 => 2,
                (0, 0, 1) => 1,
                _ => 0,
            },
            2 => match (v, h, d) {
                (2, _, _) => 8,
                (1, h, _) if h >= 1 => 7,
                (1, 0, d) if d >= 1 => 6,
                (1, 0, 0) => 5,
                (0, 2, _) => 4,
                (0, 1, _) => 3,
                (0, 0, d) if d >= 2 => 2,
                (0, 0, 1) => 1,
                _ => 0,
            },
            _ => match (h, v, d) {
                (2, _, _) | (_, 2, _) => 8,
                (1, v, _) if v >= 1 => 7,
                (h, 1, _) if h >= 1 => 7,
                (1, 0, d) if d >= 1 => 6,
                (0, 1, d) if d >= 1 => 6,
                (1, 0, 0) | (0, 1, 0) => 5,
                (0, 0, d) if d >= 2 => 2,
                (0, 0, 1) => 1,
                _ => 0,
            },
        }
    }

    /// Encodes `data` (quantized coefficients, `width * height` long) over
    /// bit-planes `max_bit_plane` down to 0 and returns the MQ-coded byte
    /// stream.
    pub fn encode_codeblock(&mut self, data: &[i32], max_bit_plane: u8) -> Vec<u8> {
        for bp in (0..=max_bit_plane).rev() {
            self.significance_propagation(data, bp);
            self.magnitude_refinement(data, bp);
            self.cleanup(data, bp);
            for s in self.state.iter_mut() {
                *s &= !Self::VISITED;
            }
        }
        self.mq.flush();
        self.mq.get_buffer().to_vec()
    }

    /// Decodes a codeblock from compressed data.
    pub fn decode_codeblock(&mut self, data: &[u8], width: u32, height: u32, max_bit_plane: u8) -> Result<Vec<i32>, ()> {
        self.mq.init_contexts(19);
        self.mq.init_decoder(data);

        let size = (width * height) as usize;
        self.state = vec![0; size];

        let mut coefficients = vec![0i32; size];

        for bp in (0..=max_bit_plane).rev() {
            for i in 0..size {
                self.state[i] &= !Self::VISITED;
            }

            self.decode_significance_propagation(bp, width, height, &mut coefficients)?;
            self.decode_magnitude_refinement(bp, width, height, &mut coefficients)?;
            self.decode_cleanup(bp, width, height, &mut coefficients)?;
        }

        Ok(coefficients)
    }

    fn decode_significance_propagation(&mut self, bit_plane: u8, width: u32, height: u32, coefficients: &mut [i32]) -> Result<(), ()> {
        let stripe_height = 4;

        for y_stripe in (0..height).step_by(stripe_height as usize) {
            for x in 0..width {
                for y_offset in 0..stripe_height.min(height - y_stripe) {
                    let y = y_stripe + y_offset;
                    let idx = (y * width + x) as usize;

                    if idx >= self.state.len() {
                        continue;
                    }

                    let state = self.state[idx];

                    if (state & (Self::SIG | Self::VISITED)) == 0 {
                        let (hc, vc, dc) = self.get_neighbors(x, y);
                        if hc > 0 || vc > 0 || dc > 0 {
                            let cx = self.get_zc_context(self.band, hc, vc, dc);
                            let bit = self.mq.decode_bit(cx);

                            if bit != 0 {
                                self.state[idx] |= Self::SIG | Self::VISITED;

                                let sc_ctx = self.get_sign_context(x, y, width, height);
                                let sign_bit = self.mq.decode_bit(sc_ctx);
                                if sign_bit != 0 {
                                    self.state[idx] |= Self::SIGN;
                                    coefficients[idx] = -(1 << bit_plane);
                                } else {
                                    coefficients[idx] = 1 << bit_plane;
                                }
                            } else {
                                self.state[idx] |= Self::VISITED;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn decode_magnitude_refinement(&mut self, bit_plane: u8, width: u32, height: u32, coefficients: &mut [i32]) -> Result<(), ()> {
        let size = (width * height) as usize;

        let mut indices_to_process = Vec::new();
        for i in 0..size {
            let state = self.state[i];
            if (state & Self::SIG) != 0 && (state & Self::VISITED) == 0 {
                let mr_ctx = self.get_magnitude_refinement_context(i, width, height);
                indices_to_process.push((i, state, mr_ctx));
            }
        }

        for (i, state, mr_ctx) in indices_to_process {
            self.state[i] |= Self::VISITED;

            let bit = self.mq.decode_bit(mr_ctx);

            if bit != 0 {
                if (state & Self::SIGN) != 0 {
                    coefficients[i] -= 1 << bit_plane;
                } else {
                    coefficients[i] += 1 << bit_plane;
                }
            }

            self.state[i] |= Self::REFINE;
        }
        Ok(())
    }

    fn decode_cleanup(&mut self, bit_plane: u8, width: u32, height: u32, coefficients: &mut [i32]) -> Result<(), ()> {
        let stripe_height = 4;

        for y_stripe in (0..height).step_by(stripe_height as usize) {
            for x in 0..width {
                for y_offset in 0..stripe_height.min(height - y_stripe) {
                    let y = y_stripe + y_offset;
                    let idx = (y * width + x) as usize;

                    if idx >= self.state.len() {
                        continue;
                    }

                    let state = self.state[idx];

                    if (state & Self::VISITED) == 0 {
                        let (hc, vc, dc) = self.get_neighbors(x, y);

                        let cx = self.get_zc_context(self.band, hc, vc, dc);
                        let bit = self.mq.decode_bit(cx);

                        if bit != 0 {
                            self.state[idx] |= Self::SIG;

                            let sc_ctx = self.get_sign_context(x, y, width, height);
                            let sign_bit = self.mq.decode_bit(sc_ctx);
                            if sign_bit != 0 {
                                self.state[idx] |= Self::SIGN;
                                coefficients[idx] = -(1 << bit_plane);
                            } else {
                                coefficients[idx] = 1 << bit_plane;
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn get_sign_context(&self, x: u32, y: u32, width: u32, height: u32) -> usize {
        let mut h_sign = 0;
        let mut v_sign = 0;

        let w = width as i32;
        let h = height as i32;
        let ix = x as i32;
        let iy = y as i32;

        let idx = |cx, cy| (cy * w + cx) as usize;

        if ix > 0 {
            let s = self.state[idx(ix - 1, iy)];
            if (s & Self::SIG) != 0 {
                h_sign = if (s & Self::SIGN) != 0 { 1 } else { 0 };
            }
        }
        if ix < w - 1 {
            let s = self.state[idx(ix + 1, iy)];
            if (s & Self::SIG) != 0 {
                h_sign += if (s & Self::SIGN) != 0 { 1 } else { 0 };
            }
        }

        if iy > 0 {
            let s = self.state[idx(ix, iy - 1)];
            if (s & Self::SIG) != 0 {
                v_sign = if (s & Self::SIGN) != 0 { 1 } else { 0 };
            }
        }
        if iy < h - 1 {
            let s = self.state[idx(ix, iy + 1)];
            if (s & Self::SIG) != 0 {
                v_sign += if (s & Self::SIGN) != 0 { 1 } else { 0 };
            }
        }

        9 + (h_sign.min(2) as usize) + (v_sign.min(2) as usize) * 3
    }

    fn get_magnitude_refinement_context(&self, idx: usize, width: u32, _height: u32) -> usize {
        let state = self.state[idx];
        let refined = if (state & Self::REFINE) != 0 { 1 } else { 0 };

        let x = (idx % width as usize) as u32;
        let y = (idx / width as usize) as u32;
        let (hc, vc, _dc) = self.get_neighbors(x, y);
        let has_neighbors = if hc > 0 || vc > 0 { 1 } else { 0 };

        14 + refined + has_neighbors
    }

    fn significance_propagation(&mut self, data: &[i32], bit_plane: u8) {
        let w = self.width;
        let h = self.height;

        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) as usize;
                let state = self.state[idx];

                if (state & (Self::SIG | Self::VISITED)) == 0 {
                    let (hc, vc, dc) = self.get_neighbors(x, y);
                    if hc > 0 || vc > 0 || dc > 0 {
                        let val = data[idx];
                        let bit = (val.unsigned_abs() >> bit_plane) & 1;

                        let cx = self.get_zc_context(self.band, hc, vc, dc);
                        self.mq.encode(bit as u8, cx);

                        if bit == 1 {
                            let sign = if val < 0 { 1 } else { 0 };
                            self.state[idx] |= Self::SIG | Self::VISITED;
                            if sign == 1 { self.state[idx] |= Self::SIGN; }

                            let sc_ctx = self.get_sign_context(x, y, self.width, self.height);
                            self.mq.encode(sign as u8, sc_ctx);
                        } else {
                            self.state[idx] |= Self::VISITED;
                        }
                    }
                }
            }
        }
    }

    fn magnitude_refinement(&mut self, data: &[i32], bit_plane: u8) {
        let w = self.width;
        let h = self.height;
        for i in 0..(w * h) as usize {
            let state = self.state[i];
            if (state & Self::SIG) != 0 && (state & Self::VISITED) == 0 {
                self.state[i] |= Self::VISITED;
                let val = data[i];
                let bit = (val.unsigned_abs() >> bit_plane) & 1;

                let mr_ctx = self.get_magnitude_refinement_context(i, w, h);
                self.mq.encode(bit as u8, mr_ctx);
                self.state[i] |= Self::REFINE;
            }
        }
    }

    fn cleanup(&mut self, data: &[i32], bit_plane: u8) {
        let w = self.width;
        let h = self.height;

        for y in 0..h {
            for x in 0..w {
                let idx = (y * w + x) as usize;
                let state = self.state[idx];
                if (state & Self::VISITED) == 0 {
                    let (hc, vc, dc) = self.get_neighbors(x, y);

                    let cx = self.get_zc_context(self.band, hc, vc, dc);
                    let val = data[idx];
                    let bit = (val.unsigned_abs() >> bit_plane) & 1;

                    self.mq.encode(bit as u8, cx);

                    if bit == 1 {
                        let sign = if val < 0 { 1 } else { 0 };
                        self.state[idx] |= Self::SIG;
                        if sign == 1 { self.state[idx] |= Self::SIGN; }

                        let sc_ctx = self.get_sign_context(x, y, self.width, self.height);
                        self.mq.encode(sign as u8, sc_ctx);
                    }
                }
            }
        }
    }
}
