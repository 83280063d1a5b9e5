//! MBTiles sink: a single SQLite file with the `tiles` and `metadata` tables.
//!
//! The connection is tuned for bulk loading (`synchronous=0`,
//! `locking_mode=EXCLUSIVE`, `journal_mode=DELETE`), which is only safe
//! because exactly one consumer writes. Rows store the TMS-flipped y.

use super::TileSink;
use anyhow::{Context, Result};
use log::warn;
use r2d2::Pool;
use r2d2_sqlite::{
	SqliteConnectionManager,
	rusqlite::{Error as SqliteError, ErrorCode, params},
};
use std::{fs, path::Path};
use tiler_core::{Blob, TileCoord};

pub struct MBTilesSink {
	pool: Pool<SqliteConnectionManager>,
}

impl MBTilesSink {
	/// Creates the database at `path`, replacing any pre-existing file, and
	/// writes the schema and the metadata rows.
	///
	/// Failures here are fatal to the task.
	pub fn new(path: &Path, metadata: &[(String, String)]) -> Result<MBTilesSink> {
		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent).with_context(|| format!("unable to create output directory {parent:?}"))?;
		}
		if path.exists() {
			fs::remove_file(path).with_context(|| format!("unable to replace {path:?}"))?;
		}

		let manager = SqliteConnectionManager::file(path);
		// locking_mode=EXCLUSIVE: one connection, one writer.
		let pool = Pool::builder().max_size(1).build(manager)?;

		let conn = pool.get()?;
		conn
			.execute_batch(
				"PRAGMA synchronous=0;
				PRAGMA locking_mode=EXCLUSIVE;
				PRAGMA journal_mode=DELETE;",
			)
			.context("unable to apply database pragmas")?;
		conn
			.execute_batch(
				"CREATE TABLE IF NOT EXISTS tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);
				CREATE TABLE IF NOT EXISTS metadata (name TEXT, value TEXT);
				CREATE UNIQUE INDEX IF NOT EXISTS tile_index ON tiles (zoom_level, tile_column, tile_row);
				CREATE UNIQUE INDEX IF NOT EXISTS name ON metadata (name);",
			)
			.context("unable to create mbtiles schema")?;

		for (name, value) in metadata {
			conn.execute(
				"INSERT OR REPLACE INTO metadata (name, value) VALUES (?1, ?2)",
				params![name, value],
			)?;
		}

		Ok(MBTilesSink { pool })
	}
}

impl TileSink for MBTilesSink {
	fn write(&mut self, coord: TileCoord, blob: Blob) -> Result<()> {
		let result = self.pool.get()?.execute(
			"INSERT INTO tiles (zoom_level, tile_column, tile_row, tile_data) VALUES (?1, ?2, ?3, ?4)",
			params![coord.z, coord.x, coord.flip_y(), blob.as_slice()],
		);
		match result {
			Ok(_) => Ok(()),
			// Duplicate coordinate: idempotent re-run, keep the stored tile.
			Err(e) if is_unique_violation(&e) => {
				warn!("tile {coord:?} is already stored, skipped");
				Ok(())
			}
			Err(e) => Err(e).with_context(|| format!("unable to store tile {coord:?}")),
		}
	}

	fn finish(&mut self) -> Result<()> {
		self
			.pool
			.get()?
			.execute_batch("ANALYZE;")
			.context("unable to analyze the tiles database")?;
		Ok(())
	}
}

fn is_unique_violation(error: &SqliteError) -> bool {
	matches!(
		error,
		SqliteError::SqliteFailure(failure, _) if failure.code == ErrorCode::ConstraintViolation
	)
}

#[cfg(test)]
mod tests {
	use super::*;
	use r2d2_sqlite::rusqlite::Connection;

	fn metadata() -> Vec<(String, String)> {
		vec![
			("name".to_string(), "test".to_string()),
			("version".to_string(), "1.2".to_string()),
		]
	}

	#[test]
	fn creates_schema_and_metadata() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let path = dir.path().join("test.mbtiles");
		let sink = MBTilesSink::new(&path, &metadata())?;
		drop(sink);

		let conn = Connection::open(&path)?;
		let version: String = conn.query_row("SELECT value FROM metadata WHERE name = 'version'", [], |row| {
			row.get(0)
		})?;
		assert_eq!(version, "1.2");
		let tiles: i64 = conn.query_row("SELECT count(*) FROM tiles", [], |row| row.get(0))?;
		assert_eq!(tiles, 0);
		Ok(())
	}

	#[test]
	fn replaces_pre_existing_file() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let path = dir.path().join("test.mbtiles");
		fs::write(&path, b"not a database")?;
		let _sink = MBTilesSink::new(&path, &metadata())?;
		Ok(())
	}

	#[test]
	fn stores_flipped_rows() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let path = dir.path().join("test.mbtiles");
		let mut sink = MBTilesSink::new(&path, &metadata())?;

		let coord = TileCoord::new(2, 1, 0)?;
		sink.write(coord, Blob::from(&[1u8, 2, 3]))?;
		drop(sink);

		let conn = Connection::open(&path)?;
		let (z, x, row, data): (u8, u32, u32, Vec<u8>) =
			conn.query_row("SELECT zoom_level, tile_column, tile_row, tile_data FROM tiles", [], |r| {
				Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?))
			})?;
		assert_eq!((z, x, row), (2, 1, 3));
		assert_eq!(data, vec![1, 2, 3]);
		// y-flip round-trip
		assert_eq!((1u32 << z) - 1 - row, coord.y);
		Ok(())
	}

	#[test]
	fn duplicate_insert_is_a_warning_not_an_error() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let path = dir.path().join("test.mbtiles");
		let mut sink = MBTilesSink::new(&path, &metadata())?;

		let coord = TileCoord::new(3, 5, 6)?;
		sink.write(coord, Blob::from(&[0xaa]))?;
		sink.write(coord, Blob::from(&[0xbb]))?;
		drop(sink);

		let conn = Connection::open(&path)?;
		let count: i64 = conn.query_row("SELECT count(*) FROM tiles", [], |row| row.get(0))?;
		assert_eq!(count, 1);
		// The original payload wins.
		let data: Vec<u8> = conn.query_row("SELECT tile_data FROM tiles", [], |row| row.get(0))?;
		assert_eq!(data, vec![0xaa]);
		Ok(())
	}
}
