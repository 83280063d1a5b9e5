//! This module defines the [`TileCoord`] structure, a tile address in the XYZ
//! addressing convention (origin at the top-left of the web-mercator square).
//!
//! # Examples
//!
//! ```
//! use tiler_core::TileCoord;
//!
//! let coord = TileCoord::new(2, 1, 0).unwrap();
//! assert_eq!(coord.z, 2);
//! assert_eq!(coord.flip_y(), 3); // TMS row
//! ```

use crate::GeoBBox;
use anyhow::{Result, ensure};
use std::{
	f64::consts::PI,
	fmt::{self, Debug},
};

/// Maximum zoom level accepted by the harvester.
pub const MAX_ZOOM: u8 = 24;

#[derive(Eq, PartialEq, Clone, Hash, Copy)]
pub struct TileCoord {
	pub z: u8,
	pub x: u32,
	pub y: u32,
}

impl TileCoord {
	pub fn new(z: u8, x: u32, y: u32) -> Result<TileCoord> {
		ensure!(z <= MAX_ZOOM, "zoom ({z}) must be <= {MAX_ZOOM}");
		let max = 1u32 << z;
		ensure!(x < max, "x ({x}) must be < {max} at zoom {z}");
		ensure!(y < max, "y ({y}) must be < {max} at zoom {z}");
		Ok(TileCoord { z, x, y })
	}

	/// The TMS row of this tile: `2^z - 1 - y`.
	///
	/// MBTiles stores rows in TMS orientation (origin bottom-left).
	pub fn flip_y(&self) -> u32 {
		(1u32 << self.z) - 1 - self.y
	}

	/// The geographic footprint of this tile in WGS84.
	pub fn as_geo_bbox(&self) -> GeoBBox {
		let n: f64 = 2.0f64.powi(i32::from(self.z));
		let lat = |y: f64| ((PI * (1.0 - 2.0 * y / n)).exp().atan() / PI - 0.25) * 360.0;

		GeoBBox {
			x_min: (f64::from(self.x) / n - 0.5) * 360.0,
			y_min: lat(f64::from(self.y + 1)),
			x_max: (f64::from(self.x + 1) / n - 0.5) * 360.0,
			y_max: lat(f64::from(self.y)),
		}
	}

	pub fn is_valid(&self) -> bool {
		if self.z > MAX_ZOOM {
			return false;
		}
		let max = 1u32 << self.z;
		(self.x < max) && (self.y < max)
	}
}

impl Debug for TileCoord {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_fmt(format_args!("TileCoord({}, [{}, {}])", &self.z, &self.x, &self.y))
	}
}

impl PartialOrd for TileCoord {
	fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for TileCoord {
	fn cmp(&self, other: &Self) -> std::cmp::Ordering {
		self
			.z
			.cmp(&other.z)
			.then(self.y.cmp(&other.y))
			.then(self.x.cmp(&other.x))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn new_and_getters() {
		let coord = TileCoord::new(5, 3, 4).unwrap();
		assert_eq!(coord.z, 5);
		assert_eq!(coord.x, 3);
		assert_eq!(coord.y, 4);
	}

	#[test]
	fn new_rejects_out_of_range() {
		assert!(TileCoord::new(25, 0, 0).is_err());
		assert!(TileCoord::new(2, 4, 0).is_err());
		assert!(TileCoord::new(2, 0, 4).is_err());
		assert!(TileCoord::new(0, 0, 0).is_ok());
	}

	#[test]
	fn flip_y_round_trip() {
		for z in 0..=8u8 {
			let max = 1u32 << z;
			for y in [0, max / 2, max - 1] {
				let coord = TileCoord::new(z, 0, y).unwrap();
				let flipped = coord.flip_y();
				assert_eq!((1u32 << z) - 1 - flipped, y);
			}
		}
	}

	#[test]
	fn tms_row_example() {
		// tile (2,1,0) has TMS row 3
		assert_eq!(TileCoord::new(2, 1, 0).unwrap().flip_y(), 3);
	}

	#[test]
	fn geo_footprint() {
		let bbox = TileCoord::new(5, 3, 4).unwrap().as_geo_bbox();
		assert_eq!(
			bbox.as_array(),
			[-146.25, 76.84081641443098, -135.0, 79.17133464081945]
		);
	}

	#[test]
	fn ordering() {
		use std::cmp::Ordering::*;
		let c = TileCoord::new(2, 2, 2).unwrap();
		assert_eq!(TileCoord::new(1, 3, 3).unwrap().cmp(&c), Less);
		assert_eq!(TileCoord::new(2, 1, 2).unwrap().cmp(&c), Less);
		assert_eq!(TileCoord::new(2, 2, 2).unwrap().cmp(&c), Equal);
		assert_eq!(TileCoord::new(2, 0, 3).unwrap().cmp(&c), Greater);
	}

	#[test]
	fn debug_format() {
		let coord = TileCoord::new(3, 1, 2).unwrap();
		assert_eq!(format!("{coord:?}"), "TileCoord(3, [1, 2])");
	}
}
