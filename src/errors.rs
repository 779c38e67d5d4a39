use crate::tiff::geo_keys::{GeoKeyId, KeyValue};
use crate::tiff::ifd::{IFDTag, IFDValue};
use std::io;

#[derive(Debug)]
pub enum Error {
    IO(io::Error),
    Http(reqwest::Error),
    Json(serde_json::Error),
    EnvVar(std::env::VarError),
    InvalidData(String),
    RequiredTagNotFound(IFDTag),
    TagHasWrongType(IFDTag, IFDValue),
    UnsupportedTagValue(IFDTag, String),
    NotACOG(String),
    RequiredGeoKeyNotFound(GeoKeyId),
    GeoKeyHasWrongType(GeoKeyId, KeyValue),
    UnsupportedProjection(String),
    UnsupportedDataType(String),
    UnsupportedCompression(String),
    DecompressionError(String),
    OutOfBoundsRead(String),
    UnsupportedCOG(String),
    UnsupportedPhotometric(String),
    WindowError(String),
    OtherError(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for Error {}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::IO(value)
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Error::Http(value)
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::Json(value)
    }
}

impl From<std::env::VarError> for Error {
    fn from(value: std::env::VarError) -> Self {
        Error::EnvVar(value)
    }
}

impl From<std::ffi::NulError> for Error {
    fn from(value: std::ffi::NulError) -> Self {
        Error::OtherError(format!("nul byte in string: {}", value))
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(value: std::num::TryFromIntError) -> Self {
        Error::OtherError(format!("integer conversion error: {}", value))
    }
}

#[cfg(feature = "gcs")]
impl From<jsonwebtoken::errors::Error> for Error {
    fn from(value: jsonwebtoken::errors::Error) -> Self {
        Error::OtherError(format!("jwt error: {}", value))
    }
}

#[cfg(feature = "gcs")]
impl From<std::time::SystemTimeError> for Error {
    fn from(value: std::time::SystemTimeError) -> Self {
        Error::OtherError(format!("system time error: {}", value))
    }
}
