//! Whole-image sample container at the encoder/decoder boundary (§6:
//! "a sequence of line buffers with an announced `(Size, BitDepth,
//! Signedness)` per component").

/// One component's raw samples, row-major, plus the announced geometry
/// and sample format that feed directly into SIZ's per-component fields.
#[derive(Debug, Clone)]
pub struct ComponentSamples {
    pub data: Vec<i32>,
    pub width: u32,
    pub height: u32,
    pub bit_depth: u32,
    pub signed: bool,
}

impl ComponentSamples {
    pub fn new(data: Vec<i32>, width: u32, height: u32, bit_depth: u32, signed: bool) -> Self {
        ComponentSamples { data, width, height, bit_depth, signed }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Image {
    pub components: Vec<ComponentSamples>,
}

impl Image {
    pub fn new(components: Vec<ComponentSamples>) -> Self {
        Image { components }
    }
}
