//! Bulk map-tile harvester.
//!
//! Enumerates every XYZ tile covering the configured regions, fetches each
//! tile over HTTP with bounded concurrency, and writes the results into an
//! MBTiles container or a `z/x/y` file tree.

pub mod config;
pub mod sink;
pub mod task;
pub mod tilemap;
