//! Scalar dead-zone quantization (§4.2/§8): maps the irreversible DWT's
//! float coefficients to the signed integers the Block Coder Interface
//! expects, and reconstructs an approximation on the way back. The
//! reversible pipeline's integers pass through unchanged since the 5/3
//! wavelet already produces exact integer coefficients.

use crate::jpeg2000::params::StepSize;

/// `q = sign(coeff) * floor(|coeff| / delta)`, the standard dead-zone
/// quantizer around zero.
pub fn quantize(coeff: f32, step: StepSize) -> i32 {
    match step {
        StepSize::Reversible(_) => coeff.round() as i32,
        StepSize::Irreversible(delta) => {
            if delta <= 0.0 {
                return coeff.round() as i32;
            }
            let magnitude = (coeff.abs() / delta).floor();
            if coeff < 0.0 {
                -(magnitude as i32)
            } else {
                magnitude as i32
            }
        }
    }
}

/// Midpoint reconstruction of the dead-zone bin `q` occupies.
pub fn dequantize(q: i32, step: StepSize) -> f32 {
    match step {
        StepSize::Reversible(_) => q as f32,
        StepSize::Irreversible(delta) => {
            if q == 0 {
                0.0
            } else if q > 0 {
                (q as f32 + 0.5) * delta
            } else {
                (q as f32 - 0.5) * delta
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reversible_quantize_is_a_round_trip_identity() {
        let step = StepSize::Reversible(8);
        assert_eq!(quantize(-42.0, step), -42);
        assert_eq!(dequantize(-42, step), -42.0);
    }

    #[test]
    fn irreversible_quantize_buckets_around_the_dead_zone() {
        let step = StepSize::Irreversible(2.0);
        assert_eq!(quantize(0.9, step), 0);
        assert_eq!(quantize(-0.9, step), 0);
        assert_eq!(quantize(3.1, step), 1);
        assert_eq!(quantize(-3.1, step), -1);
    }

    #[test]
    fn dequantize_reconstructs_bin_midpoint() {
        let step = StepSize::Irreversible(2.0);
        assert_eq!(dequantize(0, step), 0.0);
        assert_eq!(dequantize(1, step), 3.0);
        assert_eq!(dequantize(-1, step), -3.0);
    }
}
