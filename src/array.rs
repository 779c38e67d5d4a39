//! The typed pixel buffer returned by every read (spec 3 "Array", 4.D "Read Planner / Stitcher"
//! output).
use crate::colormap::Colormap;
use crate::tiff::crs::Crs;
use crate::tiff::data_types::InternalDataType;
use crate::tiff::tags::PhotometricInterpretation;
use crate::transform::Affine;
use crate::Error;

/// A decoded raster window: band-major `(count, height, width)`, native-endian samples.
#[derive(Debug, Clone)]
pub struct Array {
    pub data: Vec<u8>,
    pub dtype: InternalDataType,
    pub width: usize,
    pub height: usize,
    pub count: usize,
    /// `true` where the pixel is valid, one entry per `(row, col)`. `None` when the source
    /// carries no mask directory.
    pub mask: Option<Vec<bool>>,
    pub transform: Affine,
    pub crs: Crs,
    pub nodata: Option<f64>,
}

impl Array {
    fn sample_offset(&self, band: usize, row: usize, col: usize) -> usize {
        let size = self.dtype.size_bytes();
        (band * self.height * self.width + row * self.width + col) * size
    }

    /// Reads one sample as `f64`, whatever the underlying dtype - the common case for photometric
    /// math, which only ever needs approximate magnitude, not bit-exact round-tripping.
    pub fn sample_f64(&self, band: usize, row: usize, col: usize) -> f64 {
        let off = self.sample_offset(band, row, col);
        let size = self.dtype.size_bytes();
        let bytes = &self.data[off..off + size];
        use InternalDataType::*;
        match self.dtype {
            Uint8 => bytes[0] as f64,
            Int8 => (bytes[0] as i8) as f64,
            Uint16 => u16::from_ne_bytes(bytes.try_into().unwrap()) as f64,
            Int16 => i16::from_ne_bytes(bytes.try_into().unwrap()) as f64,
            Uint32 => u32::from_ne_bytes(bytes.try_into().unwrap()) as f64,
            Int32 => i32::from_ne_bytes(bytes.try_into().unwrap()) as f64,
            Uint64 => u64::from_ne_bytes(bytes.try_into().unwrap()) as f64,
            Int64 => i64::from_ne_bytes(bytes.try_into().unwrap()) as f64,
            Float32 => f32::from_ne_bytes(bytes.try_into().unwrap()) as f64,
            Float64 => f64::from_ne_bytes(bytes.try_into().unwrap()),
        }
    }

    /// Reads one sample as a signed byte - CIELab's `a*`/`b*` channels are stored this way
    /// regardless of the image's nominal dtype (spec 4.F).
    pub fn sample_i8(&self, band: usize, row: usize, col: usize) -> i8 {
        self.data[self.sample_offset(band, row, col)] as i8
    }

    /// Converts to a normalized 8-bit RGB image (spec 4.F, 9 "the photometric transform lives on
    /// `Array.to_rgb`, not on the view").
    pub fn to_rgb(
        &self,
        photometric: PhotometricInterpretation,
        colormap: Option<&Colormap>,
    ) -> Result<crate::image::ImageBuffer, Error> {
        crate::photometric::to_rgb(self, photometric, colormap)
    }

    /// Copies out the top-left `valid_width x valid_height` sub-rectangle of every band (and the
    /// mask, if present) - used by the Read Planner to trim edge tiles down to their valid extent
    /// when `boundless=false` (spec 4.D step 5).
    pub(crate) fn clip(&self, valid_width: usize, valid_height: usize) -> Array {
        let size = self.dtype.size_bytes();
        let mut data = vec![0u8; self.count * valid_height * valid_width * size];
        for band in 0..self.count {
            for row in 0..valid_height {
                let src = (band * self.height * self.width + row * self.width) * size;
                let dst = (band * valid_height * valid_width + row * valid_width) * size;
                data[dst..dst + valid_width * size]
                    .copy_from_slice(&self.data[src..src + valid_width * size]);
            }
        }
        let mask = self.mask.as_ref().map(|m| {
            let mut out = vec![false; valid_height * valid_width];
            for row in 0..valid_height {
                let src = row * self.width;
                let dst = row * valid_width;
                out[dst..dst + valid_width].copy_from_slice(&m[src..src + valid_width]);
            }
            out
        });
        Array {
            data,
            dtype: self.dtype,
            width: valid_width,
            height: valid_height,
            count: self.count,
            mask,
            transform: self.transform,
            crs: self.crs.clone(),
            nodata: self.nodata,
        }
    }
}

/// One fetched tile, located in its view's tile grid (spec 4.D `fetch_tile`/`fetch_tiles`).
#[derive(Debug, Clone)]
pub struct Tile {
    pub x: u64,
    pub y: u64,
    pub array: Array,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_array(dtype: InternalDataType, data: Vec<u8>, width: usize, height: usize, count: usize) -> Array {
        Array {
            data,
            dtype,
            width,
            height,
            count,
            mask: None,
            transform: Affine::IDENTITY,
            crs: json!({}),
            nodata: None,
        }
    }

    #[test]
    fn test_sample_f64_uint8() {
        let a = test_array(InternalDataType::Uint8, vec![10, 20, 30, 40], 2, 2, 1);
        assert_eq!(a.sample_f64(0, 0, 0), 10.0);
        assert_eq!(a.sample_f64(0, 1, 1), 40.0);
    }

    #[test]
    fn test_sample_f64_uint16_native_endian() {
        let v: u16 = 1234;
        let a = test_array(InternalDataType::Uint16, v.to_ne_bytes().to_vec(), 1, 1, 1);
        assert_eq!(a.sample_f64(0, 0, 0), 1234.0);
    }

    #[test]
    fn test_sample_i8_signed() {
        let a = test_array(InternalDataType::Uint8, vec![(-5i8) as u8], 1, 1, 1);
        assert_eq!(a.sample_i8(0, 0, 0), -5);
    }

    #[test]
    fn test_clip_trims_band_major_rows() {
        // 2 bands, 2x3 (h=2,w=3), clip down to 2x2
        #[rustfmt::skip]
        let data = vec![
            1, 2, 3,
            4, 5, 6,
            // band 1
            7, 8, 9,
            10, 11, 12,
        ];
        let a = test_array(InternalDataType::Uint8, data, 3, 2, 2);
        let clipped = a.clip(2, 2);
        assert_eq!(clipped.width, 2);
        assert_eq!(clipped.height, 2);
        assert_eq!(clipped.data, vec![1, 2, 4, 5, 7, 8, 10, 11]);
    }
}
