use super::ifd::{IFDTag, ImageFileDirectory};
use super::low_level::{decode_f32, decode_f64, decode_u16, decode_u32, decode_u64, ByteOrder};
use super::tags::SampleFormat;
use crate::errors::Error;
use crate::sources::ByteSource;

/// The canonical (SampleFormat, BitsPerSample) -> numeric type mapping (spec 4.C `dtype`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InternalDataType {
    Uint8,
    Int8,
    Uint16,
    Int16,
    Uint32,
    Int32,
    Uint64,
    Int64,
    Float32,
    Float64,
}

impl InternalDataType {
    pub fn size_bytes(&self) -> usize {
        match self {
            InternalDataType::Uint8 | InternalDataType::Int8 => 1,
            InternalDataType::Uint16 | InternalDataType::Int16 => 2,
            InternalDataType::Uint32 | InternalDataType::Int32 | InternalDataType::Float32 => 4,
            InternalDataType::Uint64 | InternalDataType::Int64 | InternalDataType::Float64 => 8,
        }
    }

    pub fn from_format_and_bits(format: SampleFormat, bits: u16) -> Result<InternalDataType, Error> {
        use InternalDataType::*;
        use SampleFormat::*;
        match (format, bits) {
            (UnsignedInt, 8) => Ok(Uint8),
            (UnsignedInt, 16) => Ok(Uint16),
            (UnsignedInt, 32) => Ok(Uint32),
            (UnsignedInt, 64) => Ok(Uint64),
            (SignedInt, 8) => Ok(Int8),
            (SignedInt, 16) => Ok(Int16),
            (SignedInt, 32) => Ok(Int32),
            (SignedInt, 64) => Ok(Int64),
            (Float, 32) => Ok(Float32),
            (Float, 64) => Ok(Float64),
            (f, b) => Err(Error::UnsupportedDataType(format!(
                "SampleFormat={:?}, BitsPerSample={}",
                f, b
            ))),
        }
    }

    /// Re-encodes `raw` (samples of this dtype, stored in the TIFF's own `byte_order`) into the
    /// platform's native byte order, so that every later consumer (the stitcher, the photometric
    /// converter) can read samples with `from_ne_bytes` without threading byte order through them.
    /// A no-op for single-byte types.
    pub fn to_native_bytes(&self, raw: &[u8], byte_order: ByteOrder) -> Vec<u8> {
        let size = self.size_bytes();
        if size == 1 {
            return raw.to_vec();
        }
        let mut out = vec![0u8; raw.len()];
        for (src, dst) in raw.chunks_exact(size).zip(out.chunks_exact_mut(size)) {
            match self {
                InternalDataType::Uint16 | InternalDataType::Int16 => dst
                    .copy_from_slice(&decode_u16(src.try_into().unwrap(), byte_order).to_ne_bytes()),
                InternalDataType::Uint32 | InternalDataType::Int32 => dst
                    .copy_from_slice(&decode_u32(src.try_into().unwrap(), byte_order).to_ne_bytes()),
                InternalDataType::Uint64 | InternalDataType::Int64 => dst
                    .copy_from_slice(&decode_u64(src.try_into().unwrap(), byte_order).to_ne_bytes()),
                InternalDataType::Float32 => dst
                    .copy_from_slice(&decode_f32(src.try_into().unwrap(), byte_order).to_ne_bytes()),
                InternalDataType::Float64 => dst
                    .copy_from_slice(&decode_f64(src.try_into().unwrap(), byte_order).to_ne_bytes()),
                InternalDataType::Uint8 | InternalDataType::Int8 => unreachable!(),
            }
        }
        out
    }
}

fn check_all_same(numbers: &[u16]) -> Result<u16, Error> {
    if numbers.is_empty() {
        return Err(Error::InvalidData(
            "Expected at least one value, got an empty list".to_string(),
        ));
    }
    let first_value = numbers[0];
    for num in numbers {
        if *num != first_value {
            return Err(Error::UnsupportedDataType(format!(
                "mixed sample formats/bit depths across bands are not supported: {:?}",
                numbers
            )));
        }
    }
    Ok(first_value)
}

/// `sample_format` defaults to 1 (unsigned integer) when absent, per the TIFF spec.
async fn sample_format<S: ByteSource>(ifd: &ImageFileDirectory, source: &mut S) -> Result<u16, Error> {
    match ifd.get_vec_short_tag_value(source, IFDTag::SampleFormat).await {
        Ok(v) => check_all_same(&v),
        Err(Error::RequiredTagNotFound(_)) => Ok(1),
        Err(e) => Err(e),
    }
}

pub async fn data_type_from_ifd<S: ByteSource>(
    ifd: &ImageFileDirectory,
    source: &mut S,
) -> Result<InternalDataType, Error> {
    let format = SampleFormat::decode(sample_format(ifd, source).await?)?;
    let bits = check_all_same(
        &ifd.get_vec_short_tag_value(source, IFDTag::BitsPerSample)
            .await?,
    )?;
    InternalDataType::from_format_and_bits(format, bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_matrix() {
        assert_eq!(
            InternalDataType::from_format_and_bits(SampleFormat::UnsignedInt, 8).unwrap(),
            InternalDataType::Uint8
        );
        assert_eq!(
            InternalDataType::from_format_and_bits(SampleFormat::Float, 64).unwrap(),
            InternalDataType::Float64
        );
        assert!(InternalDataType::from_format_and_bits(SampleFormat::UnsignedInt, 12).is_err());
    }
}
