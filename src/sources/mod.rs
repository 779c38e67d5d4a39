use std::fmt;

mod file;
mod http;
mod memory;

pub use file::FileSource;
pub use http::HttpSource;
pub use memory::MemorySource;

use crate::errors::Error;

/// A generic byte-range-addressable source. Constructed once per opened
/// GeoTIFF and handed to `CachedSource` during metadata discovery; after
/// `open()` completes, tile reads go straight through this, bypassing the
/// cache.
pub enum Source {
    File(FileSource),
    Memory(MemorySource),
    Http(HttpSource),
}

impl fmt::Debug for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File(_) => f.debug_tuple("File").finish(),
            Self::Memory(_) => f.debug_tuple("Memory").finish(),
            Self::Http(_) => f.debug_tuple("Http").finish(),
        }
    }
}

/// A byte-range source that can be handed to IFD tag readers. Implemented by both the plain
/// `Source` (used for tile data, after open) and `CachedSource` (used while discovering IFDs, so
/// that re-reads of already-buffered bytes don't hit the store again).
pub trait ByteSource {
    async fn read_exact(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error>;
}

impl ByteSource for Source {
    async fn read_exact(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        Source::read_exact(self, offset, buf).await
    }
}

impl Source {
    /// Parse a GDAL-style `/vsis3/bucket/key` or `/vsigs/bucket/key` path, or
    /// fall back to treating `source_spec` as a local file path.
    pub async fn open(source_spec: &str) -> Result<Source, Error> {
        if let Some(rest) = source_spec.strip_prefix("/vsis3/") {
            let host = std::env::var("AWS_S3_ENDPOINT").unwrap_or("localhost:9000".to_string());
            Ok(Source::Http(HttpSource::new_s3(&host, rest).await?))
        } else if let Some(rest) = source_spec.strip_prefix("/vsigs/") {
            let slash = rest.find('/').ok_or_else(|| {
                Error::OtherError(format!("Failed to extract bucket_name from {}", rest))
            })?;
            let (bucket, blob) = rest.split_at(slash);
            Ok(Source::Http(
                HttpSource::new_gcs(bucket, blob.trim_start_matches('/')).await?,
            ))
        } else if source_spec.starts_with("http://") || source_spec.starts_with("https://") {
            Ok(Source::Http(HttpSource::new_anonymous(source_spec).await?))
        } else {
            Ok(Source::File(FileSource::new(source_spec).await?))
        }
    }

    /// See https://docs.rs/tokio/latest/tokio/io/trait.AsyncReadExt.html#method.read_exact
    pub async fn read_exact(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        match self {
            Source::File(s) => s.read(offset, buf).await,
            Source::Memory(s) => s.read(offset, buf).await,
            Source::Http(s) => s.read(offset, buf).await,
        }
    }

    pub fn get_stats(&self) -> String {
        match self {
            Source::File(s) => s.get_stats(),
            Source::Memory(s) => s.get_stats(),
            Source::Http(s) => s.get_stats(),
        }
    }
}
