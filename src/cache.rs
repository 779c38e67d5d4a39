//! The Opener's geometric-prefetch wrapper (spec 4.A).
//!
//! `CachedSource` buffers the first `prefetch` bytes of a `Source` and serves reads out of that
//! buffer. When a read reaches past the buffered region, the buffer is thrown away and replaced
//! by a new read of `buffer.len() * multiplier` bytes from the start of the file. This bounds the
//! number of range requests needed to discover an arbitrarily long IFD chain to
//! O(log(ifd_bytes / prefetch)) instead of one request per IFD.
//!
//! Tile data reads happen after `open()` has returned the plain `Source`, bypassing this cache
//! entirely - see `CachedSource::into_source`.
use crate::errors::Error;
use crate::sources::{ByteSource, Source};

pub struct CachedSource {
    source: Source,
    buffer: Vec<u8>,
    multiplier: f64,
}

impl CachedSource {
    pub async fn new(source: Source, prefetch: u64, multiplier: f64) -> Result<CachedSource, Error> {
        if multiplier <= 1.0 {
            return Err(Error::OtherError(format!(
                "multiplier must be > 1.0, got {}",
                multiplier
            )));
        }
        let mut cache = CachedSource {
            source,
            buffer: vec![],
            multiplier,
        };
        cache.grow_to(prefetch).await?;
        Ok(cache)
    }

    /// Re-reads `[0, size)` from the underlying source, replacing the buffer. No-op if the buffer
    /// already covers `size` bytes (or the source has fewer than `size` bytes in total).
    async fn grow_to(&mut self, size: u64) -> Result<(), Error> {
        if (self.buffer.len() as u64) >= size {
            return Ok(());
        }
        let mut buf = vec![0u8; size as usize];
        let n = self.source.read_exact(0, &mut buf).await?;
        buf.truncate(n);
        self.buffer = buf;
        Ok(())
    }

    /// Grows the buffer geometrically (current size * multiplier) until it covers `end`, or the
    /// underlying source is exhausted (in which case an out-of-bounds read will surface as a
    /// short read to the caller).
    async fn ensure(&mut self, end: u64) -> Result<(), Error> {
        while (self.buffer.len() as u64) < end {
            let prev_len = self.buffer.len();
            let next_len = ((prev_len as f64) * self.multiplier).ceil() as u64;
            let next_len = next_len.max(end).max(prev_len as u64 + 1);
            self.grow_to(next_len).await?;
            if self.buffer.len() == prev_len {
                // Underlying source is shorter than requested; nothing more to fetch.
                break;
            }
        }
        Ok(())
    }

    /// Read through the growing prefetch buffer. Used only during metadata discovery.
    pub async fn read_exact(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        let end = offset + buf.len() as u64;
        self.ensure(end).await?;
        let available = self.buffer.len() as u64;
        if offset >= available {
            return Ok(0);
        }
        let n = std::cmp::min(buf.len() as u64, available - offset) as usize;
        buf[..n].copy_from_slice(&self.buffer[offset as usize..offset as usize + n]);
        Ok(n)
    }

    /// Bypasses the prefetch buffer entirely, reading straight from the underlying source. Tile
    /// offsets point far past the metadata prefix, so routing them through the cache would just
    /// force it to grow to cover the whole file.
    pub async fn read_exact_direct(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        self.source.read_exact(offset, buf).await
    }

    pub fn get_stats(&self) -> String {
        self.source.get_stats()
    }

    /// Hand back ownership of the plain source once metadata discovery is complete.
    pub fn into_source(self) -> Source {
        self.source
    }
}

impl ByteSource for CachedSource {
    async fn read_exact(&mut self, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        CachedSource::read_exact(self, offset, buf).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemorySource;

    #[tokio::test]
    async fn test_growth_is_geometric_and_bounded() {
        let data = vec![7u8; 1000];
        let source = Source::Memory(MemorySource::new(data));
        let mut cache = CachedSource::new(source, 16, 2.0).await.unwrap();
        assert_eq!(cache.buffer.len(), 16);
        let mut buf = vec![0u8; 100];
        cache.read_exact(50, &mut buf).await.unwrap();
        // 16 -> 32 -> 64 -> 128 (>= 150) in powers of two, capped at the requested `end`.
        assert!(cache.buffer.len() >= 150);
        assert_eq!(buf, vec![7u8; 100]);
    }

    #[tokio::test]
    async fn test_rejects_non_growing_multiplier() {
        let source = Source::Memory(MemorySource::new(vec![0u8; 10]));
        assert!(CachedSource::new(source, 4, 1.0).await.is_err());
    }
}
