//! The RGB(A) raster produced by the Photometric Converter (spec 4.F), ready to hand to an image
//! encoder. Distinct from `array::Array`: this is always 8-bit and pixel-interleaved `(H, W, C)`,
//! the layout `ppm.rs` writes straight out to disk.
pub use crate::tiff::data_types::InternalDataType as DataType;

pub struct ImageBuffer {
    pub width: usize,
    pub height: usize,
    pub nbands: usize,
    pub has_alpha: bool,
    pub data_type: DataType,
    /// Pixel-interleaved row-major `(H, W, C)` - `data[(row * width + col) * nbands + band]`.
    pub data: Vec<u8>,
}
