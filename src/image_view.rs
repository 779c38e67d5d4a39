//! `ImageView`: the contract shared by the primary image and every overview (spec 4.C, 9 "no
//! single teacher file modeled this - the primary GeoTIFF and each Overview are two concrete
//! types behind one trait so the Read Planner (4.D) is written once"). Implementors supply the
//! per-level metadata and `fetch_tile`/`fetch_tiles`; `read` is a default method built purely out
//! of those.
use crate::array::{Array, Tile};
use crate::colormap::Colormap;
use crate::tiff::crs::Crs;
use crate::tiff::data_types::InternalDataType;
use crate::tiff::tags::PhotometricInterpretation;
use crate::transform::Affine;
use crate::window::Window;
use crate::Error;

/// Rounding mode for `ImageView::index` (spec 4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexOp {
    Floor,
    Ceil,
    Round,
}

/// Which corner (or center) of a pixel `ImageView::xy` resolves to (spec 4.C).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelOffset {
    Center,
    UpperLeft,
    UpperRight,
    LowerLeft,
    LowerRight,
}

impl PixelOffset {
    fn delta(&self) -> (f64, f64) {
        match self {
            PixelOffset::Center => (0.5, 0.5),
            PixelOffset::UpperLeft => (0.0, 0.0),
            PixelOffset::UpperRight => (1.0, 0.0),
            PixelOffset::LowerLeft => (0.0, 1.0),
            PixelOffset::LowerRight => (1.0, 1.0),
        }
    }
}

pub trait ImageView {
    fn width(&self) -> u64;
    fn height(&self) -> u64;
    fn tile_width(&self) -> u64;
    fn tile_height(&self) -> u64;
    fn bands(&self) -> usize;
    fn dtype(&self) -> InternalDataType;
    fn transform(&self) -> Affine;
    fn nodata(&self) -> Option<f64>;
    fn colormap(&self) -> Option<&Colormap>;
    fn photometric_interpretation(&self) -> PhotometricInterpretation;
    fn has_mask(&self) -> bool;
    /// Resolved lazily on first access and cached (spec 9 "Lazy CRS"): safe to call concurrently,
    /// idempotent to race.
    fn crs(&self) -> Result<&Crs, Error>;

    async fn fetch_tile(&self, x: u64, y: u64, boundless: bool) -> Result<Tile, Error>;
    async fn fetch_tiles(&self, xy: &[(u64, u64)], boundless: bool) -> Result<Vec<Tile>, Error>;

    /// Ground resolution along each pixel axis (spec 4.C `res`).
    fn res(&self) -> (f64, f64) {
        self.transform().res()
    }

    /// Pixel `(row, col)` -> world `(x, y)` at the given corner/center of that pixel.
    fn xy(&self, row: i64, col: i64, offset: PixelOffset) -> (f64, f64) {
        let (dx, dy) = offset.delta();
        self.transform().apply(col as f64 + dx, row as f64 + dy)
    }

    /// World `(x, y)` -> pixel `(row, col)`, via the inverse transform, quantized with `op`.
    fn index(&self, x: f64, y: f64, op: IndexOp) -> Result<(i64, i64), Error> {
        let (col, row) = self.transform().inverse()?.apply(x, y);
        let quantize = |v: f64| -> i64 {
            match op {
                IndexOp::Floor => v.floor() as i64,
                IndexOp::Ceil => v.ceil() as i64,
                IndexOp::Round => v.round() as i64,
            }
        };
        Ok((quantize(row), quantize(col)))
    }

    /// The Read Planner / Stitcher (spec 4.D): plans the tile grid covering `window` (the full
    /// image when `None`), fetches every covering tile boundless, and copies each tile's overlap
    /// with `window` into one contiguous `Array`.
    async fn read(&self, window: Option<Window>) -> Result<Array, Error> {
        let window = match window {
            Some(w) => w,
            None => Window::new(0, 0, self.width() as i64, self.height() as i64)?,
        };
        if window.col_stop() > self.width() as i64 || window.row_stop() > self.height() as i64 {
            return Err(Error::WindowError(format!(
                "window {:?} extends past image bounds ({}x{})",
                window,
                self.width(),
                self.height()
            )));
        }

        let tw = self.tile_width() as i64;
        let th = self.tile_height() as i64;
        let tx_start = window.col_off / tw;
        let tx_stop = (window.col_off + window.width - 1) / tw + 1;
        let ty_start = window.row_off / th;
        let ty_stop = (window.row_off + window.height - 1) / th + 1;

        let mut xy = Vec::with_capacity(((tx_stop - tx_start) * (ty_stop - ty_start)) as usize);
        for ty in ty_start..ty_stop {
            for tx in tx_start..tx_stop {
                xy.push((tx as u64, ty as u64));
            }
        }
        let tiles = self.fetch_tiles(&xy, true).await?;

        let bands = self.bands();
        let dtype = self.dtype();
        let size = dtype.size_bytes();
        let w = window.width as usize;
        let h = window.height as usize;
        let mut data = vec![0u8; bands * h * w * size];
        let mut mask = if self.has_mask() {
            Some(vec![true; h * w])
        } else {
            None
        };

        for tile in &tiles {
            let tile_window = Window::new(
                (tile.x * self.tile_width()) as i64,
                (tile.y * self.tile_height()) as i64,
                tile.array.width as i64,
                tile.array.height as i64,
            )?;
            let overlap = window.intersection(&tile_window)?;
            let src_col0 = (overlap.col_off - tile_window.col_off) as usize;
            let src_row0 = (overlap.row_off - tile_window.row_off) as usize;
            let dst_col0 = (overlap.col_off - window.col_off) as usize;
            let dst_row0 = (overlap.row_off - window.row_off) as usize;
            let cols = overlap.width as usize;
            let rows = overlap.height as usize;

            for band in 0..bands {
                for row in 0..rows {
                    let src = (band * tile.array.height * tile.array.width
                        + (src_row0 + row) * tile.array.width
                        + src_col0)
                        * size;
                    let dst = (band * h * w + (dst_row0 + row) * w + dst_col0) * size;
                    data[dst..dst + cols * size]
                        .copy_from_slice(&tile.array.data[src..src + cols * size]);
                }
            }
            if let (Some(out_mask), Some(tile_mask)) = (mask.as_mut(), tile.array.mask.as_ref()) {
                for row in 0..rows {
                    let src = (src_row0 + row) * tile.array.width + src_col0;
                    let dst = (dst_row0 + row) * w + dst_col0;
                    out_mask[dst..dst + cols].copy_from_slice(&tile_mask[src..src + cols]);
                }
            }
        }

        let transform = self.transform() * Affine::translation(window.col_off as f64, window.row_off as f64);
        Ok(Array {
            data,
            dtype,
            width: w,
            height: h,
            count: bands,
            mask,
            transform,
            crs: self.crs()?.clone(),
            nodata: self.nodata(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_offset_delta() {
        assert_eq!(PixelOffset::Center.delta(), (0.5, 0.5));
        assert_eq!(PixelOffset::UpperLeft.delta(), (0.0, 0.0));
        assert_eq!(PixelOffset::LowerRight.delta(), (1.0, 1.0));
    }
}
