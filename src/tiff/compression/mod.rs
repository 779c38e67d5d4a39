//! Tile decompression dispatch (spec 4.D step 2, "decode both in parallel").
//!
//! Dispatches directly on `tags::CompressionTag` rather than carrying a second, redundant
//! compression enum. Codecs the corpus doesn't actually wire up (WebP, LZMA, Zstd, LERC,
//! CCITTFax, JPEG2000 - spec 9's documented non-validated set) are recognized at the tag-parsing
//! level but fail with `Error::UnsupportedCompression` here, at decode time.

mod deflate;
#[cfg(feature = "jpeg")]
mod jpeg;
#[cfg(feature = "lzw")]
mod lzw;

use crate::errors::Error;
use crate::tiff::tags::CompressionTag;

pub fn decompress_raw(data: Vec<u8>) -> Result<Vec<u8>, Error> {
    Ok(data)
}

/// Decompress one tile (or mask tile). `jpeg_tables` is the IFD's JPEGTables tag contents,
/// required when `tag == CompressionTag::Jpeg`; `tile_width`/`tile_height` are passed through to
/// the JPEG decoder for sanity checking only.
pub fn decompress(
    tag: CompressionTag,
    data: Vec<u8>,
    jpeg_tables: Option<&[u8]>,
    tile_width: usize,
    tile_height: usize,
) -> Result<Vec<u8>, Error> {
    match tag {
        CompressionTag::None => decompress_raw(data),
        CompressionTag::Deflate => deflate::decompress_deflate(data),
        #[cfg(feature = "lzw")]
        CompressionTag::Lzw => lzw::decompress(&data),
        #[cfg(not(feature = "lzw"))]
        CompressionTag::Lzw => Err(Error::UnsupportedCompression(
            "LZW support not compiled in (enable the `lzw` feature)".to_string(),
        )),
        #[cfg(feature = "jpeg")]
        CompressionTag::Jpeg => {
            let tables = jpeg_tables.ok_or_else(|| {
                Error::DecompressionError(
                    "JPEG tile without a JPEGTables tag on its IFD".to_string(),
                )
            })?;
            jpeg::Decompressor::new(tables)?.decompress(data, tile_width, tile_height)
        }
        #[cfg(not(feature = "jpeg"))]
        CompressionTag::Jpeg => Err(Error::UnsupportedCompression(
            "JPEG support not compiled in (enable the `jpeg` feature)".to_string(),
        )),
        CompressionTag::WebP => Err(Error::UnsupportedCompression("WebP".to_string())),
        CompressionTag::Lzma => Err(Error::UnsupportedCompression("LZMA".to_string())),
        CompressionTag::Zstd => Err(Error::UnsupportedCompression("Zstd".to_string())),
        CompressionTag::Lerc => Err(Error::UnsupportedCompression("LERC".to_string())),
        CompressionTag::CcittFax => Err(Error::UnsupportedCompression("CCITTFax".to_string())),
        CompressionTag::Jpeg2000 => Err(Error::UnsupportedCompression("JPEG2000".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_passthrough() {
        let data = vec![1u8, 2, 3];
        assert_eq!(
            decompress(CompressionTag::None, data.clone(), None, 1, 3).unwrap(),
            data
        );
    }

    #[test]
    fn test_unsupported_codecs_error() {
        assert!(decompress(CompressionTag::WebP, vec![], None, 0, 0).is_err());
        assert!(decompress(CompressionTag::Lzma, vec![], None, 0, 0).is_err());
        assert!(decompress(CompressionTag::Zstd, vec![], None, 0, 0).is_err());
        assert!(decompress(CompressionTag::Lerc, vec![], None, 0, 0).is_err());
        assert!(decompress(CompressionTag::CcittFax, vec![], None, 0, 0).is_err());
        assert!(decompress(CompressionTag::Jpeg2000, vec![], None, 0, 0).is_err());
    }
}
