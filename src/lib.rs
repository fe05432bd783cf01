/*!
# htj2k-rs

`htj2k-rs` is a pure Rust library implementing the HTJ2K (ITU-T T.814 /
ISO/IEC 15444-15) high-throughput block coder on top of the JPEG 2000
Part 1 (ITU-T T.800 / ISO/IEC 15444-1) codestream syntax and coding
pipeline.

## Modules

- **Codestream**: marker parsing and writing for the main and tile-part
  headers (SOC, CAP, SIZ, COD/COC, QCD/QCC, TLM, SOT, SOD, EOC) — see
  [`jpeg2000::parser`] and [`jpeg2000::writer`].
- **Parameter Store**: validated, cross-linked configuration resolved
  once from marker data — see [`jpeg2000::params`].
- **DWT Engine**: reversible 5/3 and irreversible 9/7 lifting transforms
  — see [`jpeg2000::dwt`].
- **Color Transform**: RCT/ICT multi-component decorrelation — see
  [`jpeg2000::color`].
- **Tier-2**: tag-tree packet header coding — see [`jpeg2000::packet`]
  and [`jpeg2000::tag_tree`].
- **Block Coder Interface**: the HTJ2K (MEL/VLC/MagSgn) and legacy
  (MQ/EBCOT) code-block coders behind one trait — see
  [`jpeg2000::block_coder`].
- **Encoder/Decoder**: whole-image orchestration — see
  [`jpeg2000::encoder`] and [`jpeg2000::decoder`].
*/

pub mod error;
pub mod jpeg2000;
pub mod jpeg_stream_reader;

pub use error::Jpeg2000Error;

#[cfg(test)]
mod tests {
    use crate::jpeg2000::encoder::{self, EncoderOptions};
    use crate::jpeg2000::decoder;
    use crate::jpeg2000::image::{ComponentSamples, Image};

    #[test]
    fn round_trips_a_small_reversible_image_through_the_public_api() {
        let width = 16;
        let height = 16;
        let data: Vec<i32> = (0..width * height).map(|i| (i % 251) as i32).collect();
        let image = Image::new(vec![ComponentSamples::new(data.clone(), width, height, 8, false)]);

        let opts = EncoderOptions {
            reversible: true,
            num_decomps: 2,
            ..EncoderOptions::default()
        };
        let codestream = encoder::encode(&image, &opts).unwrap();
        let decoded = decoder::decode(&codestream).unwrap();

        assert_eq!(decoded.components[0].data, data);
    }
}
