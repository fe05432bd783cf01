//! Minimal big-endian byte cursor shared by the CLI and the codestream
//! parser's callers. The codestream syntax itself (marker segments,
//! tile-part framing) is parsed by `jpeg2000::parser`, which owns its
//! own `Cursor`; this type only wraps a raw byte slice at the point
//! where a JP2/JPH box is unwrapped into a codestream for that parser.

use crate::error::Jpeg2000Error;

pub struct JpegStreamReader<'a> {
    source: &'a [u8],
    position: usize,
}

impl<'a> JpegStreamReader<'a> {
    pub fn new(source: &'a [u8]) -> Self {
        Self { source, position: 0 }
    }

    pub fn read_u8(&mut self) -> Result<u8, Jpeg2000Error> {
        if self.position >= self.source.len() {
            return Err(Jpeg2000Error::Truncated { offset: self.position });
        }
        let b = self.source[self.position];
        self.position += 1;
        Ok(b)
    }

    pub fn read_u16(&mut self) -> Result<u16, Jpeg2000Error> {
        let b1 = self.read_u8()? as u16;
        let b2 = self.read_u8()? as u16;
        Ok((b1 << 8) | b2)
    }

    pub fn read_u32(&mut self) -> Result<u32, Jpeg2000Error> {
        let b1 = self.read_u8()? as u32;
        let b2 = self.read_u8()? as u32;
        let b3 = self.read_u8()? as u32;
        let b4 = self.read_u8()? as u32;
        Ok((b1 << 24) | (b2 << 16) | (b3 << 8) | b4)
    }

    pub fn remaining_data(&self) -> &'a [u8] {
        &self.source[self.position..]
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn advance(&mut self, count: usize) {
        self.position += count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_integers_in_sequence() {
        let data = [0x00, 0xFF, 0x12, 0x34, 0x56, 0x78, 0x9A];
        let mut reader = JpegStreamReader::new(&data);
        assert_eq!(reader.read_u8().unwrap(), 0x00);
        assert_eq!(reader.read_u16().unwrap(), 0xFF12);
        assert_eq!(reader.read_u32().unwrap(), 0x3456789A);
    }

    #[test]
    fn advance_and_remaining_data_track_position() {
        let data = [1u8, 2, 3, 4, 5];
        let mut reader = JpegStreamReader::new(&data);
        reader.advance(2);
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.remaining_data(), &[3, 4, 5]);
    }

    #[test]
    fn read_past_end_reports_truncated() {
        let data = [0xAAu8];
        let mut reader = JpegStreamReader::new(&data);
        reader.read_u8().unwrap();
        assert_eq!(reader.read_u8(), Err(Jpeg2000Error::Truncated { offset: 1 }));
    }
}
