//! The TIFF Colormap tag (320), parsed into the RGB lookup table the Photometric Converter (spec
//! 4.F `RgbPalette` case) indexes into.
use std::collections::BTreeMap;

use crate::sources::ByteSource;
use crate::tiff::ifd::{IFDTag, IFDValue, ImageFileDirectory};
use crate::Error;

/// Either width of lookup table the caller asked for (spec 3.A `Colormap.as_array(dtype)`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColormapDtype {
    Uint8,
    Uint16,
}

#[derive(Debug, Clone)]
pub enum ColormapArray {
    Uint8(Vec<[u8; 3]>),
    Uint16(Vec<[u16; 3]>),
}

/// A palette of `(r, g, b)` entries, indexed by raw pixel value. The TIFF tag stores all reds,
/// then all greens, then all blues, each as uint16 regardless of the image's own bit depth.
#[derive(Debug, Clone)]
pub struct Colormap {
    entries: Vec<[u16; 3]>,
}

impl Colormap {
    pub fn from_raw(raw: &[u16]) -> Result<Colormap, Error> {
        if raw.is_empty() || raw.len() % 3 != 0 {
            return Err(Error::InvalidData(format!(
                "Colormap tag length {} is not a non-zero multiple of 3",
                raw.len()
            )));
        }
        let n = raw.len() / 3;
        let entries = (0..n).map(|i| [raw[i], raw[n + i], raw[2 * n + i]]).collect();
        Ok(Colormap { entries })
    }

    /// Reads the Colormap tag off `ifd`, if present.
    pub async fn read_from_ifd<S: ByteSource>(
        source: &mut S,
        ifd: &ImageFileDirectory,
    ) -> Result<Option<Colormap>, Error> {
        if !ifd.has_tag(IFDTag::Colormap) {
            return Ok(None);
        }
        match ifd.get_tag_value(source, IFDTag::Colormap).await? {
            IFDValue::Short(v) => Ok(Some(Colormap::from_raw(&v)?)),
            value => Err(Error::TagHasWrongType(IFDTag::Colormap, value)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<[u16; 3]> {
        self.entries.get(index).copied()
    }

    fn as_array_u8(&self) -> Vec<[u8; 3]> {
        // TIFF colormap entries are always full-scale uint16; narrowing to uint8 takes the high
        // byte, matching how GDAL/libtiff render 8-bit palette previews.
        self.entries
            .iter()
            .map(|e| [(e[0] >> 8) as u8, (e[1] >> 8) as u8, (e[2] >> 8) as u8])
            .collect()
    }

    pub fn as_array(&self, dtype: ColormapDtype) -> ColormapArray {
        match dtype {
            ColormapDtype::Uint8 => ColormapArray::Uint8(self.as_array_u8()),
            ColormapDtype::Uint16 => ColormapArray::Uint16(self.entries.clone()),
        }
    }

    pub fn as_dict(&self) -> BTreeMap<u16, (u16, u16, u16)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i as u16, (e[0], e[1], e[2])))
            .collect()
    }

    /// rasterio's `colormap()` shape: `{index: (r, g, b, a)}` in 8-bit, with the nodata index (if
    /// any) made fully transparent.
    pub fn as_rasterio(&self, nodata: Option<u16>) -> BTreeMap<u16, (u8, u8, u8, u8)> {
        self.as_array_u8()
            .iter()
            .enumerate()
            .map(|(i, [r, g, b])| {
                let alpha = if nodata == Some(i as u16) { 0 } else { 255 };
                (i as u16, (*r, *g, *b, alpha))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_rejects_bad_length() {
        assert!(Colormap::from_raw(&[]).is_err());
        assert!(Colormap::from_raw(&[1, 2]).is_err());
    }

    #[test]
    fn test_from_raw_splits_planar_triples() {
        // 2 entries: reds=[10,20] greens=[30,40] blues=[50,60]
        let raw = [10, 20, 30, 40, 50, 60];
        let cmap = Colormap::from_raw(&raw).unwrap();
        assert_eq!(cmap.len(), 2);
        assert_eq!(cmap.get(0), Some([10, 30, 50]));
        assert_eq!(cmap.get(1), Some([20, 40, 60]));
    }

    #[test]
    fn test_as_array_u8_takes_high_byte() {
        let raw = [0xffff, 0x0000, 0x8080, 0x0000, 0x0000, 0x0000];
        let cmap = Colormap::from_raw(&raw).unwrap();
        match cmap.as_array(ColormapDtype::Uint8) {
            ColormapArray::Uint8(v) => {
                assert_eq!(v[0], [0xff, 0x00, 0x00]);
                assert_eq!(v[1], [0x80, 0x00, 0x00]);
            }
            _ => panic!("expected Uint8"),
        }
    }

    #[test]
    fn test_as_rasterio_marks_nodata_transparent() {
        let raw = [10, 20, 30, 40, 50, 60];
        let cmap = Colormap::from_raw(&raw).unwrap();
        let dict = cmap.as_rasterio(Some(0));
        assert_eq!(dict[&0].3, 0);
        assert_eq!(dict[&1].3, 255);
    }

    #[test]
    fn test_as_dict_roundtrips_raw_values() {
        let raw = [10, 20, 30, 40, 50, 60];
        let cmap = Colormap::from_raw(&raw).unwrap();
        let dict = cmap.as_dict();
        assert_eq!(dict[&0], (10, 30, 50));
        assert_eq!(dict[&1], (20, 40, 60));
    }
}
