//! Basic types: tile coordinates, bounding boxes, blobs and tile formats.

mod blob;
mod geo_bbox;
mod tile_bbox;
mod tile_coord;
mod tile_format;

pub use blob::Blob;
pub use geo_bbox::GeoBBox;
pub use tile_bbox::TileBBox;
pub use tile_coord::TileCoord;
pub use tile_format::TileFormat;
