pub mod array;
pub mod auth;
pub mod cache;
pub mod cog;
pub mod colormap;
mod errors;
mod hex;
pub mod image;
mod image_view;
pub mod npy;
pub mod photometric;
pub mod ppm;
pub mod sources;
pub mod tiff;
pub mod transform;
pub mod window;

pub use cog::{GeoTIFF, Overview};
pub use errors::Error;
pub use image_view::ImageView;
pub use tiff::data_types::InternalDataType;
pub use window::Window;

/// Open a GeoTIFF from a source spec.
///
/// `source_spec` is either a local file path, or a `/vsis3/bucket/key` or
/// `/vsigs/bucket/key` GDAL-style virtual path for range reads over HTTP.
pub async fn open(source_spec: &str) -> Result<GeoTIFF, Error> {
    GeoTIFF::open(source_spec).await
}
