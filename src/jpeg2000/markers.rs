//! JPEG 2000 / HTJ2K marker codes.
//!
//! Values and names follow the `JP2K_MARKER` table; every marker the
//! codestream can legally contain is represented here, even the ones the
//! core only skips by announced length (RGN, POC, PPM/PPT, PLM/PLT, CRG,
//! COM, SOP/EPH, PRF/CPF, ADS) so the parser never mistakes a known-but-
//! uninterpreted marker for `UnexpectedMarker`.

use crate::error::Jpeg2000Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum JpegMarkerCode {
    /// Start of codestream (required).
    Soc = 0xFF4F,
    /// Extended capability (HTJ2K).
    Cap = 0xFF50,
    /// Image and tile size (required).
    Siz = 0xFF51,
    /// Coding style default (required).
    Cod = 0xFF52,
    /// Coding style component.
    Coc = 0xFF53,
    /// Tile-part lengths.
    Tlm = 0xFF55,
    /// Profile.
    Prf = 0xFF56,
    /// Packet length, main header.
    Plm = 0xFF57,
    /// Packet length, tile-part header.
    Plt = 0xFF58,
    /// Corresponding profile values.
    Cpf = 0xFF59,
    /// Quantization default (required).
    Qcd = 0xFF5C,
    /// Quantization component.
    Qcc = 0xFF5D,
    /// Region of interest.
    Rgn = 0xFF5E,
    /// Progression order change.
    Poc = 0xFF5F,
    /// Packed packet headers, main header.
    Ppm = 0xFF60,
    /// Packed packet headers, tile-part header.
    Ppt = 0xFF61,
    /// Component registration.
    Crg = 0xFF63,
    /// Comment.
    Com = 0xFF64,
    /// Downsampling factor styles.
    Dfs = 0xFF72,
    /// Arbitrary decomposition styles.
    Ads = 0xFF73,
    /// Arbitrary transformation kernels.
    Atk = 0xFF79,
    /// Start of tile-part.
    Sot = 0xFF90,
    /// Start of packet.
    Sop = 0xFF91,
    /// End of packet.
    Eph = 0xFF92,
    /// Start of data.
    Sod = 0xFF93,
    /// End of codestream (required).
    Eoc = 0xFFD9,
}

impl JpegMarkerCode {
    /// True for markers that carry an explicit `L` length field
    /// immediately following the 2-byte marker code, and so can be
    /// skipped wholesale when not otherwise interpreted.
    pub fn has_length_field(self) -> bool {
        !matches!(self, Self::Soc | Self::Eoc | Self::Sod)
    }
}

impl std::convert::TryFrom<u16> for JpegMarkerCode {
    type Error = Jpeg2000Error;
    fn try_from(v: u16) -> Result<Self, Self::Error> {
        match v {
            0xFF4F => Ok(Self::Soc),
            0xFF50 => Ok(Self::Cap),
            0xFF51 => Ok(Self::Siz),
            0xFF52 => Ok(Self::Cod),
            0xFF53 => Ok(Self::Coc),
            0xFF55 => Ok(Self::Tlm),
            0xFF56 => Ok(Self::Prf),
            0xFF57 => Ok(Self::Plm),
            0xFF58 => Ok(Self::Plt),
            0xFF59 => Ok(Self::Cpf),
            0xFF5C => Ok(Self::Qcd),
            0xFF5D => Ok(Self::Qcc),
            0xFF5E => Ok(Self::Rgn),
            0xFF5F => Ok(Self::Poc),
            0xFF60 => Ok(Self::Ppm),
            0xFF61 => Ok(Self::Ppt),
            0xFF63 => Ok(Self::Crg),
            0xFF64 => Ok(Self::Com),
            0xFF72 => Ok(Self::Dfs),
            0xFF73 => Ok(Self::Ads),
            0xFF79 => Ok(Self::Atk),
            0xFF90 => Ok(Self::Sot),
            0xFF91 => Ok(Self::Sop),
            0xFF92 => Ok(Self::Eph),
            0xFF93 => Ok(Self::Sod),
            0xFFD9 => Ok(Self::Eoc),
            other => Err(Jpeg2000Error::UnexpectedMarker {
                marker: other,
                offset: 0,
            }),
        }
    }
}

pub const MARKER_START_BYTE: u8 = 0xFF;

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::TryFrom;

    #[test]
    fn round_trips_required_markers() {
        for &code in &[0xFF4Fu16, 0xFF51, 0xFF52, 0xFF5C, 0xFF90, 0xFF93, 0xFFD9] {
            let marker = JpegMarkerCode::try_from(code).unwrap();
            assert_eq!(marker as u16, code);
        }
    }

    #[test]
    fn soc_eoc_sod_have_no_length_field() {
        assert!(!JpegMarkerCode::Soc.has_length_field());
        assert!(!JpegMarkerCode::Eoc.has_length_field());
        assert!(!JpegMarkerCode::Sod.has_length_field());
        assert!(JpegMarkerCode::Siz.has_length_field());
    }

    #[test]
    fn rejects_unknown_marker() {
        assert!(JpegMarkerCode::try_from(0xFF01).is_err());
    }
}
