/// The packed GeoKeyDirectory (spec 3, 4.E): a flat table of (key id, value) pairs describing
/// CRS and projection parameters, stored TIFF-tag-style (either inline or pointing into one of
/// GeoDoubleParamsTag/GeoAsciiParamsTag/GeoKeyDirectoryTag itself).
use super::ifd::{
    IFDTag, ImageFileDirectory, GEO_ASCII_PARAMS_TAG, GEO_DOUBLE_PARAMS_TAG, GEO_KEY_DIRECTORY_TAG,
};
use crate::sources::ByteSource;
use crate::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeoKeyId {
    GTModelType,
    GTRasterType,
    GTCitation,
    GeographicType,
    GeogCitation,
    GeogGeodeticDatum,
    GeogPrimeMeridian,
    GeogLinearUnits,
    GeogLinearUnitSize,
    GeogAngularUnits,
    GeogAngularUnitSize,
    GeogEllipsoid,
    GeogSemiMajorAxis,
    GeogSemiMinorAxis,
    GeogInvFlattening,
    GeogAzimuthUnits,
    GeogPrimeMeridianLong,
    ProjectedType,
    PCSCitation,
    Projection,
    ProjCoordTrans,
    ProjLinearUnits,
    ProjLinearUnitSize,
    ProjStdParallel1,
    ProjStdParallel2,
    ProjNatOriginLong,
    ProjNatOriginLat,
    ProjFalseEasting,
    ProjFalseNorthing,
    ProjFalseOriginLong,
    ProjFalseOriginLat,
    ProjFalseOriginEasting,
    ProjFalseOriginNorthing,
    ProjCenterLong,
    ProjCenterLat,
    ProjCenterEasting,
    ProjCenterNorthing,
    ProjScaleAtNatOrigin,
    ProjScaleAtCenter,
    ProjAzimuthAngle,
    ProjStraightVertPoleLong,
    ProjRectifiedGridAngle,
    UnknownKey(u16),
}

fn decode_key_id(v: u16) -> GeoKeyId {
    match v {
        1024 => GeoKeyId::GTModelType,
        1025 => GeoKeyId::GTRasterType,
        1026 => GeoKeyId::GTCitation,
        2048 => GeoKeyId::GeographicType,
        2049 => GeoKeyId::GeogCitation,
        2050 => GeoKeyId::GeogGeodeticDatum,
        2051 => GeoKeyId::GeogPrimeMeridian,
        2052 => GeoKeyId::GeogLinearUnits,
        2053 => GeoKeyId::GeogLinearUnitSize,
        2054 => GeoKeyId::GeogAngularUnits,
        2055 => GeoKeyId::GeogAngularUnitSize,
        2056 => GeoKeyId::GeogEllipsoid,
        2057 => GeoKeyId::GeogSemiMajorAxis,
        2058 => GeoKeyId::GeogSemiMinorAxis,
        2059 => GeoKeyId::GeogInvFlattening,
        2060 => GeoKeyId::GeogAzimuthUnits,
        2061 => GeoKeyId::GeogPrimeMeridianLong,
        3072 => GeoKeyId::ProjectedType,
        3073 => GeoKeyId::PCSCitation,
        3074 => GeoKeyId::Projection,
        3075 => GeoKeyId::ProjCoordTrans,
        3076 => GeoKeyId::ProjLinearUnits,
        3077 => GeoKeyId::ProjLinearUnitSize,
        3078 => GeoKeyId::ProjStdParallel1,
        3079 => GeoKeyId::ProjStdParallel2,
        3080 => GeoKeyId::ProjNatOriginLong,
        3081 => GeoKeyId::ProjNatOriginLat,
        3082 => GeoKeyId::ProjFalseEasting,
        3083 => GeoKeyId::ProjFalseNorthing,
        3084 => GeoKeyId::ProjFalseOriginLong,
        3085 => GeoKeyId::ProjFalseOriginLat,
        3086 => GeoKeyId::ProjFalseOriginEasting,
        3087 => GeoKeyId::ProjFalseOriginNorthing,
        3088 => GeoKeyId::ProjCenterLong,
        3089 => GeoKeyId::ProjCenterLat,
        3090 => GeoKeyId::ProjCenterEasting,
        3091 => GeoKeyId::ProjCenterNorthing,
        3092 => GeoKeyId::ProjScaleAtNatOrigin,
        3093 => GeoKeyId::ProjScaleAtCenter,
        3094 => GeoKeyId::ProjAzimuthAngle,
        3095 => GeoKeyId::ProjStraightVertPoleLong,
        3096 => GeoKeyId::ProjRectifiedGridAngle,
        v => GeoKeyId::UnknownKey(v),
    }
}

#[derive(Debug, Clone)]
pub enum KeyValue {
    Short(Vec<u16>),
    Ascii(String),
    Double(Vec<f64>),
}

#[derive(Debug)]
struct GeoKeyEntry {
    pub id: GeoKeyId,
    pub value: KeyValue,
}

impl GeoKeyEntry {
    async fn decode<S: ByteSource>(
        data: &[u16],
        ifd: &ImageFileDirectory,
        source: &mut S,
    ) -> Result<GeoKeyEntry, Error> {
        if data.len() < 4 {
            return Err(Error::NotACOG(format!(
                "Trying to decode a geokey from less than 4 shorts: got {}",
                data.len()
            )));
        }
        let id = decode_key_id(data[0]);
        let tiff_tag_location = data[1];
        let count = data[2];
        let value_offset = data[3];
        let value: KeyValue = match tiff_tag_location {
            0 => {
                if count != 1 {
                    return Err(Error::NotACOG(format!(
                        "Got TIFFTagLocation=0, but count != 1, got {}",
                        count
                    )));
                }
                KeyValue::Short(vec![value_offset])
            }
            GEO_DOUBLE_PARAMS_TAG => {
                let values = ifd
                    .get_vec_double_tag_value(source, IFDTag::GeoDoubleParamsTag)
                    .await?;
                let end = value_offset as usize + count as usize;
                if value_offset as usize > values.len() || end > values.len() {
                    return Err(Error::NotACOG(format!(
                        "Out of bounds read on GeoDoubleParamsTag, got range {} to {}, len is {}",
                        value_offset,
                        end,
                        values.len()
                    )));
                }
                KeyValue::Double(values[value_offset as usize..end].to_vec())
            }
            GEO_ASCII_PARAMS_TAG => {
                // The spec is a bit unclear whether 'count' should be used here, but in practice
                // it looks like as for TIFF tags, the value_offset and count are to be interpreted
                // as characters
                let values = ifd
                    .get_string_tag_value(source, IFDTag::GeoAsciiParamsTag)
                    .await?;
                if value_offset as usize > values.len()
                    || (value_offset + count) as usize > values.len()
                {
                    return Err(Error::NotACOG(format!(
                        "Out of bounds read on GeoAsciiParamsTag, got value_offset={}, count={}, len is {}",
                        value_offset,
                        count,
                        values.len()
                    )));
                }
                // GeoTIFF uses '|' as the delimiter (instead of \0) for reasons explained in the
                // "Note on ASCII Keys." comment of section B.1.4 of the GeoTIFF spec. We strip the
                // ending | here
                let val =
                    values[value_offset as usize..(value_offset + count) as usize].to_string();
                let val = match val.strip_suffix('|') {
                    Some(v) => v.to_string(),
                    None => {
                        return Err(Error::NotACOG(format!(
                            "Expected | to separate strings, but didn't get it in val={}",
                            val
                        )));
                    }
                };
                KeyValue::Ascii(val)
            }
            GEO_KEY_DIRECTORY_TAG => {
                // Arrays of short will be placed at the end of the geo key directory tag array
                let values = ifd
                    .get_vec_short_tag_value(source, IFDTag::GeoKeyDirectoryTag)
                    .await?;
                let end = value_offset as usize + count as usize;
                if value_offset as usize > values.len() || end > values.len() {
                    return Err(Error::NotACOG(format!(
                        "Out of bounds read on GeoKeyDirectoryTag, got range {} to {}, len is {}",
                        value_offset,
                        end,
                        values.len()
                    )));
                }
                KeyValue::Short(values[value_offset as usize..end].to_vec())
            }
            v => {
                return Err(Error::NotACOG(format!(
                    "Got invalid TIFFTagLocation: {}",
                    v
                )))
            }
        };
        Ok(GeoKeyEntry { id, value })
    }
}

#[derive(Debug)]
pub struct GeoKeyDirectory {
    keys: Vec<GeoKeyEntry>,
}

impl GeoKeyDirectory {
    fn get_key_value(&self, id: GeoKeyId) -> Result<&KeyValue, Error> {
        let entry = self.keys.iter().find(|e| e.id == id);
        match entry {
            Some(e) => Ok(&e.value),
            None => Err(Error::RequiredGeoKeyNotFound(id)),
        }
    }

    pub fn has_key(&self, id: GeoKeyId) -> bool {
        self.keys.iter().any(|e| e.id == id)
    }

    pub fn get_vec_short_key_value(&self, id: GeoKeyId) -> Result<&Vec<u16>, Error> {
        match self.get_key_value(id)? {
            KeyValue::Short(values) => Ok(values),
            value => Err(Error::GeoKeyHasWrongType(id, value.clone())),
        }
    }

    pub fn get_short_key_value(&self, id: GeoKeyId) -> Result<u16, Error> {
        Ok(self.get_vec_short_key_value(id)?[0])
    }

    pub fn get_short_key_value_or(&self, id: GeoKeyId, default: u16) -> Result<u16, Error> {
        match self.get_short_key_value(id) {
            Ok(v) => Ok(v),
            Err(Error::RequiredGeoKeyNotFound(_)) => Ok(default),
            Err(e) => Err(e),
        }
    }

    pub fn get_vec_double_key_value(&self, id: GeoKeyId) -> Result<&Vec<f64>, Error> {
        match self.get_key_value(id)? {
            KeyValue::Double(values) => Ok(values),
            value => Err(Error::GeoKeyHasWrongType(id, value.clone())),
        }
    }

    pub fn get_double_key_value(&self, id: GeoKeyId) -> Result<f64, Error> {
        Ok(self.get_vec_double_key_value(id)?[0])
    }

    pub fn get_double_key_value_or(&self, id: GeoKeyId, default: f64) -> Result<f64, Error> {
        match self.get_double_key_value(id) {
            Ok(v) => Ok(v),
            Err(Error::RequiredGeoKeyNotFound(_)) => Ok(default),
            Err(e) => Err(e),
        }
    }

    pub fn get_ascii_key_value(&self, id: GeoKeyId) -> Result<&str, Error> {
        match self.get_key_value(id)? {
            KeyValue::Ascii(v) => Ok(v.as_str()),
            value => Err(Error::GeoKeyHasWrongType(id, value.clone())),
        }
    }

    pub async fn from_ifd<S: ByteSource>(
        ifd: &ImageFileDirectory,
        source: &mut S,
    ) -> Result<GeoKeyDirectory, Error> {
        let directory = ifd
            .get_vec_short_tag_value(source, IFDTag::GeoKeyDirectoryTag)
            .await?;
        // Header len check
        if directory.len() < 4 {
            return Err(Error::NotACOG(format!(
                "GeoKeyDirectoryTag len < 4: {}",
                directory.len(),
            )));
        }
        // Version check
        {
            let version = directory[0];
            if version != 1 {
                return Err(Error::NotACOG(format!(
                    "Unsupported GeoKeyDirectoryTag version. Expected 1, got {}",
                    version
                )));
            }
        }
        // Revision (major + minor)
        {
            let revision = directory[1];
            if revision != 1 {
                return Err(Error::NotACOG(format!(
                    "Unsupported GeoKeyDirectoryTag revision. Expected 1, got {}",
                    revision
                )));
            }
            let minor = directory[2];
            if minor != 0 && minor != 1 {
                return Err(Error::NotACOG(format!(
                    "Unsupported GeoKeyDirectoryTag minor revision. Expected 0 or 1, got {}",
                    minor
                )));
            }
        }
        // Number of keys
        let keys_count = directory[3] as usize;
        {
            let expected_min_len = 4 + keys_count * 4;
            if directory.len() < expected_min_len {
                return Err(Error::NotACOG(format!(
                    "GeoKeyDirectoryTag keys_count={}, so expected a min len of {}; got {}",
                    keys_count,
                    expected_min_len,
                    directory.len()
                )));
            }
        }
        let mut keys = vec![];
        for i in 0..keys_count {
            let key_data = &directory[4 + i * 4..4 + (i + 1) * 4];
            keys.push(GeoKeyEntry::decode(key_data, ifd, source).await?);
        }
        Ok(GeoKeyDirectory { keys })
    }
}
