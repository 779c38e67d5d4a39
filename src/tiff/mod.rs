pub mod compression;
pub mod crs;
pub mod data_types;
pub mod epsg;
pub mod geo_keys;
pub mod georef;
pub mod ifd;
pub mod low_level;
pub mod tags;
