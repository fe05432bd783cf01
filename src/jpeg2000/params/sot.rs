//! SOT tile-part header and TLM tile-part length table.
//!
//! Grounded on `param_sot`/`param_tlm` in `ojph_params_local.h`.

#[derive(Debug, Clone, Copy)]
pub struct Sot {
    pub isot: u16,
    pub psot: u32,
    pub tpsot: u8,
    pub tnsot: u8,
}

impl Sot {
    pub fn payload_length(&self) -> u32 {
        self.psot.saturating_sub(12)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TlmEntry {
    pub ttlm: u16,
    pub ptlm: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Tlm {
    pub entries: Vec<TlmEntry>,
}
