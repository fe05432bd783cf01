//! Magnitude and sign coding (MagSgn): a sign bit followed by a fixed
//! `num_magnitude_bitplanes`-wide magnitude for each sample that the
//! VLC stage marked significant (§4.7).

use super::bitstream::{BitReader, BitWriter};

pub struct MagSgnEncoder {
    w: BitWriter,
}

impl Default for MagSgnEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MagSgnEncoder {
    pub fn new() -> Self {
        Self { w: BitWriter::new() }
    }

    /// Encodes one newly-significant sample: `negative` as a single
    /// sign bit, then `magnitude`'s low `num_magnitude_bitplanes` bits.
    pub fn encode_sample(&mut self, negative: bool, magnitude: u32, num_magnitude_bitplanes: u32) {
        self.w.write_bit(negative as u8);
        let bits = num_magnitude_bitplanes.min(32) as u8;
        if bits > 0 {
            self.w.write_bits(magnitude, bits);
        }
    }

    pub fn finish(self) -> Vec<u8> {
        self.w.finish()
    }
}

pub struct MagSgnDecoder<'a> {
    r: BitReader<'a>,
}

impl<'a> MagSgnDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { r: BitReader::new(data) }
    }

    pub fn decode_sample(&mut self, num_magnitude_bitplanes: u32) -> (bool, u32) {
        let negative = self.r.read_bit() != 0;
        let bits = num_magnitude_bitplanes.min(32) as u8;
        let magnitude = if bits > 0 { self.r.read_bits(bits) } else { 0 };
        (negative, magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_decodes_samples_in_order() {
        let samples = [(false, 5u32), (true, 200u32), (false, 0u32), (true, 1u32)];
        let mut enc = MagSgnEncoder::new();
        for &(neg, mag) in &samples {
            enc.encode_sample(neg, mag, 9);
        }
        let bytes = enc.finish();

        let mut dec = MagSgnDecoder::new(&bytes);
        for &(neg, mag) in &samples {
            assert_eq!(dec.decode_sample(9), (neg, mag));
        }
    }
}
