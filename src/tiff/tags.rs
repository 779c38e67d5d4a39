use crate::sources::ByteSource;
use crate::Error;

use super::ifd::{IFDTag, IFDValue, ImageFileDirectory};

/// TIFF PhotometricInterpretation (tag 262), expanded to every variant the Photometric Converter
/// (spec 4.F) knows how to convert to RGB, plus `TransparencyMask` which the Directory Classifier
/// (spec 4.B) uses to recognize mask IFDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotometricInterpretation {
    WhiteIsZero,
    BlackIsZero,
    Rgb,
    RgbPalette,
    TransparencyMask,
    Cmyk,
    YCbCr,
    CieLab,
}

impl PhotometricInterpretation {
    pub fn decode(v: u16) -> Result<PhotometricInterpretation, Error> {
        match v {
            0 => Ok(PhotometricInterpretation::WhiteIsZero),
            1 => Ok(PhotometricInterpretation::BlackIsZero),
            2 => Ok(PhotometricInterpretation::Rgb),
            3 => Ok(PhotometricInterpretation::RgbPalette),
            4 => Ok(PhotometricInterpretation::TransparencyMask),
            5 => Ok(PhotometricInterpretation::Cmyk),
            6 => Ok(PhotometricInterpretation::YCbCr),
            8 => Ok(PhotometricInterpretation::CieLab),
            v => Err(Error::UnsupportedTagValue(
                IFDTag::PhotometricInterpretation,
                format!("{:?}", v),
            )),
        }
    }

    pub async fn read_from_ifd<S: ByteSource>(
        source: &mut S,
        ifd: &ImageFileDirectory,
    ) -> Result<PhotometricInterpretation, Error> {
        match ifd
            .get_tag_value(source, IFDTag::PhotometricInterpretation)
            .await?
        {
            IFDValue::Short(v) => match v[..] {
                [v0] => PhotometricInterpretation::decode(v0),
                _ => Err(Error::UnsupportedTagValue(
                    IFDTag::PhotometricInterpretation,
                    format!("{:?}", v),
                )),
            },
            value => Err(Error::TagHasWrongType(
                IFDTag::PhotometricInterpretation,
                value,
            )),
        }
    }
}

/// TIFF Compression (tag 259). Decompressors for Deflate/LZW/JPEG live under
/// `tiff::compression`; the rest are recognized but rejected at decode time (spec 4.A Non-goals,
/// §9: "LERC, CCITTFax, and JPEG2000 ... are claimed by the compression enum but not validated
/// against real data").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionTag {
    None,
    Deflate,
    Lzw,
    Jpeg,
    WebP,
    Lzma,
    Zstd,
    Lerc,
    CcittFax,
    Jpeg2000,
}

impl CompressionTag {
    pub fn decode(v: u16) -> Result<CompressionTag, Error> {
        // https://www.awaresystems.be/imaging/tiff/tifftags/compression.html
        match v {
            1 => Ok(CompressionTag::None),
            // Using COMPRESS=DEFLATE with GDAL generates tag 8 ("Adobe deflate")
            8 | 32946 => Ok(CompressionTag::Deflate),
            5 => Ok(CompressionTag::Lzw),
            7 | 6 => Ok(CompressionTag::Jpeg),
            34887 => Ok(CompressionTag::WebP),
            34925 => Ok(CompressionTag::Lzma),
            50000 => Ok(CompressionTag::Zstd),
            34888 => Ok(CompressionTag::Lerc),
            2 | 3 | 4 => Ok(CompressionTag::CcittFax),
            34712 => Ok(CompressionTag::Jpeg2000),
            v => Err(Error::UnsupportedCompression(format!("{}", v))),
        }
    }
}

/// PlanarConfiguration (tag 284): whether samples are stored pixel-interleaved (`(H, W, C)` on
/// the wire) or one plane per band (`(C, H, W)` on the wire). The Read Planner (spec 4.D step 4)
/// only needs to transpose in the `Chunky` case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanarConfiguration {
    Chunky,
    Planar,
}

impl PlanarConfiguration {
    pub fn decode(v: u16) -> Result<PlanarConfiguration, Error> {
        match v {
            1 => Ok(PlanarConfiguration::Chunky),
            2 => Ok(PlanarConfiguration::Planar),
            v => Err(Error::UnsupportedTagValue(
                IFDTag::PlanarConfiguration,
                format!("{:?}", v),
            )),
        }
    }

    pub async fn read_from_ifd<S: ByteSource>(
        source: &mut S,
        ifd: &ImageFileDirectory,
    ) -> Result<PlanarConfiguration, Error> {
        // Defaults to Chunky when absent, per the TIFF 6.0 spec.
        if !ifd.has_tag(IFDTag::PlanarConfiguration) {
            return Ok(PlanarConfiguration::Chunky);
        }
        match ifd
            .get_tag_value(source, IFDTag::PlanarConfiguration)
            .await?
        {
            IFDValue::Short(v) => match v[..] {
                [v0] => PlanarConfiguration::decode(v0),
                _ => Err(Error::UnsupportedTagValue(
                    IFDTag::PlanarConfiguration,
                    format!("{:?}", v),
                )),
            },
            value => Err(Error::TagHasWrongType(IFDTag::PlanarConfiguration, value)),
        }
    }
}

/// SampleFormat (tag 339).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    UnsignedInt,
    SignedInt,
    Float,
}

impl SampleFormat {
    pub fn decode(v: u16) -> Result<SampleFormat, Error> {
        match v {
            1 => Ok(SampleFormat::UnsignedInt),
            2 => Ok(SampleFormat::SignedInt),
            3 => Ok(SampleFormat::Float),
            v => Err(Error::UnsupportedDataType(format!("SampleFormat={}", v))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_photometric() {
        assert_eq!(
            PhotometricInterpretation::decode(2).unwrap(),
            PhotometricInterpretation::Rgb
        );
        assert_eq!(
            PhotometricInterpretation::decode(4).unwrap(),
            PhotometricInterpretation::TransparencyMask
        );
        assert!(PhotometricInterpretation::decode(99).is_err());
    }

    #[test]
    fn test_decode_planar_configuration() {
        assert_eq!(
            PlanarConfiguration::decode(1).unwrap(),
            PlanarConfiguration::Chunky
        );
        assert_eq!(
            PlanarConfiguration::decode(2).unwrap(),
            PlanarConfiguration::Planar
        );
        assert!(PlanarConfiguration::decode(3).is_err());
    }
}
