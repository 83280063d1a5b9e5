//! Directory sink: writes each tile to `<root>/<z>/<x>/<y>.<ext>`, creating
//! directories on demand.

use super::TileSink;
use anyhow::{Context, Result};
use std::{
	fs,
	path::{Path, PathBuf},
};
use tiler_core::{Blob, TileCoord, TileFormat};

pub struct DirectorySink {
	root: PathBuf,
	extension: String,
}

impl DirectorySink {
	pub fn new(root: &Path, format: TileFormat) -> Result<DirectorySink> {
		fs::create_dir_all(root).with_context(|| format!("unable to create output directory {root:?}"))?;
		Ok(DirectorySink {
			root: root.to_path_buf(),
			extension: format.extension().to_string(),
		})
	}

	fn tile_path(&self, coord: &TileCoord) -> PathBuf {
		self
			.root
			.join(coord.z.to_string())
			.join(coord.x.to_string())
			.join(format!("{}.{}", coord.y, self.extension))
	}
}

impl TileSink for DirectorySink {
	fn write(&mut self, coord: TileCoord, blob: Blob) -> Result<()> {
		let path = self.tile_path(&coord);
		let parent = path.parent().unwrap();
		if !parent.exists() {
			fs::create_dir_all(parent).with_context(|| format!("unable to create tile directory {parent:?}"))?;
		}
		fs::write(&path, blob.as_slice()).with_context(|| format!("unable to write tile {path:?}"))?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn writes_the_tile_tree() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let mut sink = DirectorySink::new(dir.path(), TileFormat::Png)?;

		sink.write(TileCoord::new(0, 0, 0)?, Blob::from(&[0x01]))?;
		sink.write(TileCoord::new(3, 5, 2)?, Blob::from(&[0x02, 0x03]))?;

		assert_eq!(fs::read(dir.path().join("0/0/0.png"))?, vec![0x01]);
		assert_eq!(fs::read(dir.path().join("3/5/2.png"))?, vec![0x02, 0x03]);
		Ok(())
	}

	#[test]
	fn extension_follows_format() -> Result<()> {
		let dir = tempfile::tempdir()?;
		let mut sink = DirectorySink::new(dir.path(), TileFormat::Pbf)?;
		sink.write(TileCoord::new(1, 0, 1)?, Blob::from(&[0xff]))?;
		assert!(dir.path().join("1/0/1.pbf").exists());
		Ok(())
	}
}
