//! Destination sinks for downloaded tiles.
//!
//! Exactly one consumer drains the save channel into a sink; sinks are
//! therefore written single-threaded. Per-tile write errors are non-fatal to
//! the task: the consumer logs and keeps draining.

mod directory;
mod mbtiles;

pub use directory::DirectorySink;
pub use mbtiles::MBTilesSink;

use anyhow::Result;
use tiler_core::{Blob, TileCoord};

/// A destination for tile payloads.
///
/// `write` consumes the payload. An integrity conflict (duplicate coordinate)
/// is reported as `Ok(())` so that re-runs stay idempotent.
pub trait TileSink: Send {
	fn write(&mut self, coord: TileCoord, blob: Blob) -> Result<()>;

	/// Called once after the save channel is drained.
	fn finish(&mut self) -> Result<()> {
		Ok(())
	}
}
