/// Async, lazily-valued TIFF IFD (ImageFileDirectory) reader.
///
/// Directory *structure* (the tag/type/count/offset quintuple for every entry, and the chain of
/// next-IFD offsets) is discovered up front by `TIFFReader::open` against a `CachedSource` - this
/// is the bulk of spec 4.A, the Opener. Tag *values* are decoded lazily, on first access, via
/// `ImageFileDirectory::get_*_tag_value`, generic over anything that implements `ByteSource` so
/// the same code path serves both the growing prefetch buffer (during open) and the plain
/// `Source` (once metadata discovery is done and tile fetches start).
use super::low_level::*;
use crate::cache::CachedSource;
use crate::errors::Error;
use crate::sources::{ByteSource, Source};

#[derive(Clone, Copy)]
enum IFDType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SignedByte,
    SignedShort,
    SignedLong,
    SignedRational,
    Float,
    Double,
    UndefinedRawBytes,
}

fn type_size(ifd_type: IFDType) -> usize {
    match ifd_type {
        IFDType::Byte => 1,
        IFDType::Ascii => 1,
        IFDType::Short => 2,
        IFDType::Long => 4,
        IFDType::Rational => 8,
        IFDType::SignedByte => 1,
        IFDType::SignedShort => 2,
        IFDType::SignedLong => 4,
        IFDType::SignedRational => 8,
        IFDType::Float => 4,
        IFDType::Double => 8,
        IFDType::UndefinedRawBytes => 1,
    }
}

#[derive(Debug, Clone)]
pub enum IFDValue {
    Byte(Vec<u8>),
    Ascii(String),
    Short(Vec<u16>),
    Long(Vec<u32>),
    Rational(Vec<(u32, u32)>),
    SignedByte(Vec<i8>),
    UndefinedRawBytes(Vec<u8>),
    SignedShort(Vec<i16>),
    SignedLong(Vec<i32>),
    SignedRational(Vec<(i32, i32)>),
    Float(Vec<f32>),
    Double(Vec<f64>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IFDTag {
    PhotometricInterpretation,
    Compression,
    ImageLength,
    ImageWidth,
    ResolutionUnit,
    XResolution,
    YResolution,
    RowsPerStrip,
    StripOffsets,
    StripByteCounts,
    BitsPerSample,
    Colormap,
    SamplesPerPixel,
    ExtraSamples,
    PlanarConfiguration,
    Orientation,
    TileLength,
    TileWidth,
    TileOffsets,
    TileByteCounts,
    NewSubfileType,
    SampleFormat,
    Predictor,
    JPEGTables,
    // Geotiff tags
    ModelPixelScaleTag,
    ModelTiepointTag,
    ModelTransformationTag,
    GeoKeyDirectoryTag,
    GeoDoubleParamsTag,
    GeoAsciiParamsTag,
    // GDAL specific: https://www.awaresystems.be/imaging/tiff/tifftags/gdal_metadata.html
    GdalMetadata,
    GdalNodata,
    UnknownTag(u16),
}

// Raw tag numbers, exposed for the GeoKeyDirectory's TIFFTagLocation dispatch (spec 4.E), which
// refers to these fields by their packed tag number rather than by decoded `IFDTag`.
pub const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
pub const GEO_DOUBLE_PARAMS_TAG: u16 = 34736;
pub const GEO_ASCII_PARAMS_TAG: u16 = 34737;

fn decode_tag(tag: u16) -> IFDTag {
    match tag {
        262 => IFDTag::PhotometricInterpretation,
        259 => IFDTag::Compression,
        257 => IFDTag::ImageLength,
        256 => IFDTag::ImageWidth,
        296 => IFDTag::ResolutionUnit,
        282 => IFDTag::XResolution,
        283 => IFDTag::YResolution,
        278 => IFDTag::RowsPerStrip,
        273 => IFDTag::StripOffsets,
        279 => IFDTag::StripByteCounts,
        258 => IFDTag::BitsPerSample,
        320 => IFDTag::Colormap,
        277 => IFDTag::SamplesPerPixel,
        338 => IFDTag::ExtraSamples,
        284 => IFDTag::PlanarConfiguration,
        274 => IFDTag::Orientation,
        323 => IFDTag::TileLength,
        322 => IFDTag::TileWidth,
        324 => IFDTag::TileOffsets,
        325 => IFDTag::TileByteCounts,
        254 => IFDTag::NewSubfileType,
        339 => IFDTag::SampleFormat,
        317 => IFDTag::Predictor,
        347 => IFDTag::JPEGTables,
        33550 => IFDTag::ModelPixelScaleTag,
        33922 => IFDTag::ModelTiepointTag,
        34264 => IFDTag::ModelTransformationTag,
        GEO_KEY_DIRECTORY_TAG => IFDTag::GeoKeyDirectoryTag,
        GEO_DOUBLE_PARAMS_TAG => IFDTag::GeoDoubleParamsTag,
        GEO_ASCII_PARAMS_TAG => IFDTag::GeoAsciiParamsTag,
        42112 => IFDTag::GdalMetadata,
        42113 => IFDTag::GdalNodata,
        v => IFDTag::UnknownTag(v),
    }
}

#[derive(Debug, Clone, Copy)]
enum EntryData {
    Inline([u8; 4]),
    Offset(u32),
}

/// The cheap-to-parse half of an IFD entry: tag/type/count/offset-or-inline-bytes. Decoding the
/// actual value (`IFDValue`) is deferred to `ImageFileDirectory::get_tag_value`.
#[derive(Debug, Clone)]
pub struct IFDEntry {
    pub tag: IFDTag,
    field_type: IFDType,
    count: u32,
    data: EntryData,
}

impl IFDEntry {
    fn byte_len(&self) -> usize {
        type_size(self.field_type) * self.count as usize
    }

    async fn read_raw<S: ByteSource>(&self, source: &mut S, byte_order: ByteOrder) -> Result<Vec<u8>, Error> {
        match self.data {
            EntryData::Inline(arr) => Ok(arr[0..self.byte_len()].to_vec()),
            EntryData::Offset(offset) => {
                let mut buf = vec![0u8; self.byte_len()];
                let n = source.read_exact(offset as u64, &mut buf).await?;
                if n != buf.len() {
                    return Err(Error::OutOfBoundsRead(format!(
                        "short read decoding tag {:?}: wanted {} bytes at offset {}, got {}",
                        self.tag,
                        buf.len(),
                        offset,
                        n
                    )));
                }
                let _ = byte_order;
                Ok(buf)
            }
        }
    }

    async fn decode<S: ByteSource>(&self, source: &mut S, byte_order: ByteOrder) -> Result<IFDValue, Error> {
        let data = self.read_raw(source, byte_order).await?;
        let count = self.count as usize;
        Ok(match self.field_type {
            IFDType::Byte => IFDValue::Byte(decode_vec(&data, count, decode_u8, byte_order)),
            IFDType::Ascii => IFDValue::Ascii(decode_string(&data, byte_order)?),
            IFDType::Short => IFDValue::Short(decode_vec(&data, count, decode_u16, byte_order)),
            IFDType::Long => IFDValue::Long(decode_vec(&data, count, decode_u32, byte_order)),
            IFDType::Rational => {
                IFDValue::Rational(decode_vec(&data, count, decode_u32_pair, byte_order))
            }
            IFDType::SignedByte => IFDValue::SignedByte(decode_vec(&data, count, decode_i8, byte_order)),
            IFDType::UndefinedRawBytes => IFDValue::UndefinedRawBytes(data),
            IFDType::SignedShort => {
                IFDValue::SignedShort(decode_vec(&data, count, decode_i16, byte_order))
            }
            IFDType::SignedLong => IFDValue::SignedLong(decode_vec(&data, count, decode_i32, byte_order)),
            IFDType::SignedRational => {
                IFDValue::SignedRational(decode_vec(&data, count, decode_i32_pair, byte_order))
            }
            IFDType::Float => IFDValue::Float(decode_vec(&data, count, decode_f32, byte_order)),
            IFDType::Double => IFDValue::Double(decode_vec(&data, count, decode_f64, byte_order)),
        })
    }
}

enum RawEntryResult {
    KnownType(IFDEntry),
    UnknownType(u16),
    InvalidCount(u32),
}

fn decode_entry_type(field_type: u16) -> Option<IFDType> {
    Some(match field_type {
        1 => IFDType::Byte,
        2 => IFDType::Ascii,
        3 => IFDType::Short,
        4 => IFDType::Long,
        5 => IFDType::Rational,
        6 => IFDType::SignedByte,
        7 => IFDType::UndefinedRawBytes,
        8 => IFDType::SignedShort,
        9 => IFDType::SignedLong,
        10 => IFDType::SignedRational,
        11 => IFDType::Float,
        12 => IFDType::Double,
        _ => return None,
    })
}

fn parse_entry_header(buf: [u8; 12], byte_order: ByteOrder) -> RawEntryResult {
    let tag = decode_u16([buf[0], buf[1]], byte_order);
    let field_type = decode_u16([buf[2], buf[3]], byte_order);
    let field_type = match decode_entry_type(field_type) {
        Some(t) => t,
        None => return RawEntryResult::UnknownType(field_type),
    };
    let count = decode_u32([buf[4], buf[5], buf[6], buf[7]], byte_order);
    if count == 0 {
        return RawEntryResult::InvalidCount(count);
    }
    let data = if type_size(field_type) * count as usize <= 4 {
        EntryData::Inline([buf[8], buf[9], buf[10], buf[11]])
    } else {
        EntryData::Offset(decode_u32([buf[8], buf[9], buf[10], buf[11]], byte_order))
    };
    RawEntryResult::KnownType(IFDEntry {
        tag: decode_tag(tag),
        field_type,
        count,
        data,
    })
}

#[derive(Debug, Clone)]
pub struct ImageFileDirectory {
    entries: Vec<IFDEntry>,
    byte_order: ByteOrder,
}

impl ImageFileDirectory {
    fn find(&self, tag: IFDTag) -> Result<&IFDEntry, Error> {
        self.entries
            .iter()
            .find(|e| e.tag == tag)
            .ok_or(Error::RequiredTagNotFound(tag))
    }

    pub fn has_tag(&self, tag: IFDTag) -> bool {
        self.entries.iter().any(|e| e.tag == tag)
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub async fn get_tag_value<S: ByteSource>(&self, source: &mut S, tag: IFDTag) -> Result<IFDValue, Error> {
        self.find(tag)?.decode(source, self.byte_order).await
    }

    pub async fn get_u64_tag_value<S: ByteSource>(&self, source: &mut S, tag: IFDTag) -> Result<u64, Error> {
        Ok(self.get_vec_u64_tag_value(source, tag).await?[0])
    }

    pub async fn get_vec_u64_tag_value<S: ByteSource>(
        &self,
        source: &mut S,
        tag: IFDTag,
    ) -> Result<Vec<u64>, Error> {
        match self.get_tag_value(source, tag).await? {
            IFDValue::Short(v) => Ok(v.iter().map(|x| *x as u64).collect()),
            IFDValue::Long(v) => Ok(v.iter().map(|x| *x as u64).collect()),
            value => Err(Error::TagHasWrongType(tag, value)),
        }
    }

    pub async fn get_vec_short_tag_value<S: ByteSource>(
        &self,
        source: &mut S,
        tag: IFDTag,
    ) -> Result<Vec<u16>, Error> {
        match self.get_tag_value(source, tag).await? {
            IFDValue::Short(v) => Ok(v),
            value => Err(Error::TagHasWrongType(tag, value)),
        }
    }

    pub async fn get_vec_double_tag_value<S: ByteSource>(
        &self,
        source: &mut S,
        tag: IFDTag,
    ) -> Result<Vec<f64>, Error> {
        match self.get_tag_value(source, tag).await? {
            IFDValue::Double(v) => Ok(v),
            value => Err(Error::TagHasWrongType(tag, value)),
        }
    }

    pub async fn get_string_tag_value<S: ByteSource>(
        &self,
        source: &mut S,
        tag: IFDTag,
    ) -> Result<String, Error> {
        match self.get_tag_value(source, tag).await? {
            IFDValue::Ascii(v) => Ok(v),
            value => Err(Error::TagHasWrongType(tag, value)),
        }
    }
}

async fn read_image_file_directory<S: ByteSource>(
    source: &mut S,
    offset: u64,
    byte_order: ByteOrder,
) -> Result<(ImageFileDirectory, u64), Error> {
    let mut count_buf = [0u8; 2];
    source.read_exact(offset, &mut count_buf).await?;
    let fields_count = decode_u16(count_buf, byte_order);

    let mut entries = vec![];
    let mut cursor = offset + 2;
    for _ in 0..fields_count {
        let mut buf = [0u8; 12];
        source.read_exact(cursor, &mut buf).await?;
        cursor += 12;
        match parse_entry_header(buf, byte_order) {
            RawEntryResult::KnownType(e) => entries.push(e),
            RawEntryResult::UnknownType(_) | RawEntryResult::InvalidCount(_) => {
                // Tolerate unknown/empty fields - not every tag in a real-world file is one we
                // model, and a malformed single entry shouldn't sink the whole open.
            }
        }
    }
    let mut next_buf = [0u8; 4];
    source.read_exact(cursor, &mut next_buf).await?;
    let next_ifd_offset = decode_u32(next_buf, byte_order) as u64;

    Ok((ImageFileDirectory { entries, byte_order }, next_ifd_offset))
}

#[derive(Debug)]
pub struct TIFFReader {
    pub ifds: Vec<ImageFileDirectory>,
    pub source: Source,
}

impl TIFFReader {
    /// The Opener (spec 4.A): issue a bounded, geometrically-growing sequence of range reads
    /// against `source` until the whole IFD chain has been discovered.
    pub async fn open(source: Source, prefetch: u64, multiplier: f64) -> Result<TIFFReader, Error> {
        let mut cache = CachedSource::new(source, prefetch, multiplier).await?;

        let mut header = [0u8; 2];
        cache.read_exact(0, &mut header).await?;
        let byte_order = if header[0] == 0x49 && header[1] == 0x49 {
            ByteOrder::LittleEndian
        } else if header[0] == 0x4D && header[1] == 0x4D {
            ByteOrder::BigEndian
        } else {
            return Err(Error::NotACOG(format!("invalid byte order marker {:?}", header)));
        };

        let mut magic_buf = [0u8; 2];
        cache.read_exact(2, &mut magic_buf).await?;
        let magic_number = decode_u16(magic_buf, byte_order);
        if magic_number != 42 {
            return Err(Error::NotACOG(format!("invalid magic number {}", magic_number)));
        }

        let mut first_offset_buf = [0u8; 4];
        cache.read_exact(4, &mut first_offset_buf).await?;
        let mut ifd_offset = decode_u32(first_offset_buf, byte_order) as u64;

        let mut ifds = vec![];
        while ifd_offset > 0 {
            let (ifd, next_ifd_offset) =
                read_image_file_directory(&mut cache, ifd_offset, byte_order).await?;
            ifds.push(ifd);
            ifd_offset = next_ifd_offset;
        }

        if ifds.is_empty() {
            return Err(Error::NotACOG("no IFDs found".to_string()));
        }
        if !ifds[0].has_tag(IFDTag::GeoKeyDirectoryTag) {
            return Err(Error::NotACOG(
                "first IFD carries no GeoKeyDirectory".to_string(),
            ));
        }

        Ok(TIFFReader {
            ifds,
            source: cache.into_source(),
        })
    }

    pub async fn open_from_source_spec(
        source_spec: &str,
        prefetch: u64,
        multiplier: f64,
    ) -> Result<TIFFReader, Error> {
        let source = Source::open(source_spec).await?;
        TIFFReader::open(source, prefetch, multiplier).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_geo_tags() {
        assert_eq!(decode_tag(34735), IFDTag::GeoKeyDirectoryTag);
        assert_eq!(decode_tag(34736), IFDTag::GeoDoubleParamsTag);
        assert_eq!(decode_tag(34737), IFDTag::GeoAsciiParamsTag);
        assert_eq!(decode_tag(9999), IFDTag::UnknownTag(9999));
    }
}
