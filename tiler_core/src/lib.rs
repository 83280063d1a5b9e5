//! Domain types and primitives for the tiler map-tile harvester.
//!
//! Contains tile coordinates, bounding boxes, blobs, tile formats, the
//! tile-cover enumeration, GeoJSON loading, gzip helpers and progress bars.

pub mod cover;
pub mod geojson;
pub mod progress;
pub mod types;
pub use types::*;
pub mod utils;
