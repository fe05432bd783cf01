//! jpegexp - HTJ2K (ITU-T T.814 / Part 15) and legacy JPEG 2000 Part 1
//! (T.800) command-line codec.
//!
//! This binary is the application shell around the core codec library:
//! CLI argument parsing and PPM/PGM sample file I/O. Neither belongs to
//! the core codestream pipeline.

use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;

use htj2k_rs::error::Jpeg2000Error;
use htj2k_rs::jpeg2000::decoder;
use htj2k_rs::jpeg2000::encoder::{self, EncoderOptions};
use htj2k_rs::jpeg2000::image::{ComponentSamples, Image};

/// HTJ2K / JPEG 2000 Part 1 still-image codec
#[derive(Parser)]
#[command(name = "jpegexp")]
#[command(author = "htj2k-rs contributors")]
#[command(version)]
#[command(about = "Compress and expand HTJ2K / JPEG 2000 Part 1 codestreams", long_about = None)]
#[command(after_help = "EXAMPLES:
    jpegexp compress -i image.ppm -o image.j2c --reversible true
    jpegexp compress -i image.ppm -o image.j2c --qstep 0.1 --num-decomps 6
    jpegexp expand -i image.j2c -o image.ppm")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a PPM/PGM sample file into a J2C/HTJ2K codestream
    #[command(visible_alias = "c")]
    Compress {
        /// Input PPM (P6) or PGM (P5) sample file
        #[arg(short, long)]
        input: PathBuf,

        /// Output J2C/HTJ2K codestream path
        #[arg(short, long)]
        output: PathBuf,

        /// Irreversible (9/7) base quantization step; ignored when `--reversible true`
        #[arg(long, default_value_t = 1.0 / 256.0)]
        qstep: f32,

        /// Use the 5/3 reversible wavelet and lossless coding
        #[arg(long, default_value_t = false)]
        reversible: bool,

        /// Tile size as `w,h`; defaults to the whole image (single tile)
        #[arg(long)]
        tile_size: Option<String>,

        /// Code-block size as `w,h`
        #[arg(long, default_value = "64,64")]
        block_size: String,

        /// Number of DWT decomposition levels
        #[arg(long, default_value_t = 5)]
        num_decomps: u8,

        /// Image origin offset as `x,y`
        #[arg(long, default_value = "0,0")]
        image_offset: String,

        /// Use the NLT type-3 sign fold instead of a plain level shift
        /// for signed samples that are not symmetric around zero
        #[arg(long, default_value_t = false)]
        nlt_type3: bool,
    },

    /// Decode a J2C/HTJ2K/JPH codestream into a PPM/PGM sample file
    #[command(visible_alias = "e")]
    Expand {
        /// Input J2C/HTJ2K/JPH codestream
        #[arg(short, long)]
        input: PathBuf,

        /// Output PPM (P6) or PGM (P5) sample file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn parse_pair(s: &str, what: &str) -> Result<(u32, u32), Box<dyn std::error::Error>> {
    let (a, b) = s
        .split_once(',')
        .ok_or_else(|| format!("{} must be `w,h`, got {:?}", what, s))?;
    Ok((a.trim().parse()?, b.trim().parse()?))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            qstep,
            reversible,
            tile_size,
            block_size,
            num_decomps,
            image_offset,
            nlt_type3,
        } => compress(
            &input,
            &output,
            qstep,
            reversible,
            tile_size.as_deref(),
            &block_size,
            num_decomps,
            &image_offset,
            nlt_type3,
        ),
        Commands::Expand { input, output } => expand(&input, &output),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn compress(
    input: &PathBuf,
    output: &PathBuf,
    qstep: f32,
    reversible: bool,
    tile_size: Option<&str>,
    block_size: &str,
    num_decomps: u8,
    image_offset: &str,
    nlt_type3: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let image = read_ppm(&bytes)?;

    let opts = EncoderOptions {
        num_decomps,
        reversible,
        qstep,
        tile_size: tile_size.map(|s| parse_pair(s, "--tile-size")).transpose()?,
        block_size: parse_pair(block_size, "--block-size")?,
        image_offset: parse_pair(image_offset, "--image-offset")?,
        nlt_type3,
    };

    let codestream = encoder::encode(&image, &opts)?;
    fs::write(output, &codestream)?;

    println!(
        "compressed {}x{} ({} components) -> {:?} ({} bytes)",
        image.components[0].width,
        image.components[0].height,
        image.components.len(),
        output,
        codestream.len()
    );
    Ok(())
}

fn expand(input: &PathBuf, output: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = fs::read(input)?;
    let image = decoder::decode(&bytes)?;
    write_ppm(output, &image)?;

    println!(
        "expanded {:?} -> {}x{} ({} components) {:?}",
        input,
        image.components[0].width,
        image.components[0].height,
        image.components.len(),
        output
    );
    Ok(())
}

/// Reads a binary PPM (`P6`, 1 or 2 bytes/sample) or PGM (`P5`) file into
/// an [`Image`] of planar [`ComponentSamples`].
fn read_ppm(bytes: &[u8]) -> Result<Image, Jpeg2000Error> {
    let mut cursor = PpmCursor::new(bytes);
    let magic = cursor.token()?;
    let num_components = match magic.as_str() {
        "P5" => 1,
        "P6" => 3,
        _ => return Err(Jpeg2000Error::InvalidField { marker: 0, offset: 0 }),
    };
    let width: u32 = cursor
        .token()?
        .parse()
        .map_err(|_| Jpeg2000Error::InvalidField { marker: 0, offset: 0 })?;
    let height: u32 = cursor
        .token()?
        .parse()
        .map_err(|_| Jpeg2000Error::InvalidField { marker: 0, offset: 0 })?;
    let maxval: u32 = cursor
        .token()?
        .parse()
        .map_err(|_| Jpeg2000Error::InvalidField { marker: 0, offset: 0 })?;
    let bit_depth = if maxval <= 255 { 8 } else { 16 };
    let raw = cursor.remaining();

    let pixel_count = (width * height) as usize;
    let mut planes: Vec<Vec<i32>> = vec![Vec::with_capacity(pixel_count); num_components];

    let bytes_per_sample = if bit_depth == 8 { 1 } else { 2 };
    let expected = pixel_count * num_components * bytes_per_sample;
    if raw.len() < expected {
        return Err(Jpeg2000Error::Truncated { offset: bytes.len() });
    }

    let mut pos = 0;
    for _ in 0..pixel_count {
        for plane in planes.iter_mut() {
            let sample = if bit_depth == 8 {
                raw[pos] as i32
            } else {
                ((raw[pos] as i32) << 8) | raw[pos + 1] as i32
            };
            pos += bytes_per_sample;
            plane.push(sample);
        }
    }

    let components = planes
        .into_iter()
        .map(|data| ComponentSamples::new(data, width, height, bit_depth, false))
        .collect();
    Ok(Image::new(components))
}

/// Writes an [`Image`] back out as a binary PPM/PGM, 8 or 16 bits per
/// sample depending on the first component's bit depth.
fn write_ppm(path: &PathBuf, image: &Image) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;

    let num_components = image.components.len();
    let width = image.components[0].width;
    let height = image.components[0].height;
    let bit_depth = image.components[0].bit_depth;
    let maxval = (1u32 << bit_depth) - 1;

    let mut file = fs::File::create(path)?;
    writeln!(file, "{}", if num_components == 1 { "P5" } else { "P6" })?;
    writeln!(file, "{} {}", width, height)?;
    writeln!(file, "{}", maxval)?;

    let pixel_count = (width * height) as usize;
    let mut out = Vec::with_capacity(pixel_count * num_components * if bit_depth > 8 { 2 } else { 1 });
    for i in 0..pixel_count {
        for comp in &image.components {
            let v = comp.data[i].clamp(0, maxval as i32) as u32;
            if bit_depth > 8 {
                out.push((v >> 8) as u8);
                out.push((v & 0xFF) as u8);
            } else {
                out.push(v as u8);
            }
        }
    }
    file.write_all(&out)?;
    Ok(())
}

/// Minimal whitespace/comment-skipping tokenizer for PPM/PGM headers.
struct PpmCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PpmCursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            while self.pos < self.data.len() && self.data[self.pos].is_ascii_whitespace() {
                self.pos += 1;
            }
            if self.pos < self.data.len() && self.data[self.pos] == b'#' {
                while self.pos < self.data.len() && self.data[self.pos] != b'\n' {
                    self.pos += 1;
                }
                continue;
            }
            break;
        }
    }

    fn token(&mut self) -> Result<String, Jpeg2000Error> {
        self.skip_whitespace_and_comments();
        let start = self.pos;
        while self.pos < self.data.len() && !self.data[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if start == self.pos {
            return Err(Jpeg2000Error::Truncated { offset: self.pos });
        }
        let tok = std::str::from_utf8(&self.data[start..self.pos])
            .map_err(|_| Jpeg2000Error::InvalidField { marker: 0, offset: start })?
            .to_string();
        // A single whitespace byte separates the header's last token
        // from the raster data; consume exactly that one byte.
        if self.pos < self.data.len() {
            self.pos += 1;
        }
        Ok(tok)
    }

    fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}
