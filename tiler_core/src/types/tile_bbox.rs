//! An inclusive rectangle of tile indices at one zoom level, with a row-major
//! coordinate iterator. Built by projecting a [`GeoBBox`] onto the tile grid.

use crate::{GeoBBox, TileCoord, types::geo_bbox::MAX_MERCATOR_LAT};
use anyhow::{Result, ensure};
use itertools::Itertools;
use std::f64::consts::PI;
use std::fmt::Debug;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct TileBBox {
	pub level: u8,
	pub x_min: u32,
	pub y_min: u32,
	pub x_max: u32,
	pub y_max: u32,
}

impl TileBBox {
	pub fn new(level: u8, x_min: u32, y_min: u32, x_max: u32, y_max: u32) -> Result<TileBBox> {
		let max = 1u32 << level;
		ensure!(x_max < max && y_max < max, "tile indices must be < {max} at zoom {level}");
		ensure!(x_min <= x_max, "x_min ({x_min}) must be <= x_max ({x_max})");
		ensure!(y_min <= y_max, "y_min ({y_min}) must be <= y_max ({y_max})");
		Ok(TileBBox {
			level,
			x_min,
			y_min,
			x_max,
			y_max,
		})
	}

	/// Projects a geographic bbox onto the tile grid at `level`.
	///
	/// Latitudes are clamped to the mercator limit first, so a bbox touching
	/// the poles still maps to valid rows.
	pub fn from_geo(level: u8, bbox: &GeoBBox) -> Result<TileBBox> {
		ensure!(level <= 24, "zoom ({level}) must be <= 24");
		let x_min = lon_to_x(bbox.x_min, level);
		let x_max = lon_to_x(bbox.x_max, level);
		let y_min = lat_to_y(bbox.y_max, level);
		let y_max = lat_to_y(bbox.y_min, level);
		TileBBox::new(level, x_min, y_min, x_max, y_max)
	}

	pub fn count_tiles(&self) -> u64 {
		u64::from(self.x_max - self.x_min + 1) * u64::from(self.y_max - self.y_min + 1)
	}

	/// Iterates all coordinates in the box in row-major order.
	pub fn iter_coords(&self) -> impl Iterator<Item = TileCoord> + '_ {
		let y_range = self.y_min..=self.y_max;
		let x_range = self.x_min..=self.x_max;
		y_range
			.cartesian_product(x_range)
			.map(|(y, x)| TileCoord { z: self.level, x, y })
	}

	/// Consumes the box and iterates all coordinates in row-major order.
	pub fn into_iter_coords(self) -> impl Iterator<Item = TileCoord> {
		let y_range = self.y_min..=self.y_max;
		let x_range = self.x_min..=self.x_max;
		y_range
			.cartesian_product(x_range)
			.map(move |(y, x)| TileCoord { z: self.level, x, y })
	}
}

impl Debug for TileBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_fmt(format_args!(
			"TileBBox({}: [{},{},{},{}])",
			self.level, self.x_min, self.y_min, self.x_max, self.y_max
		))
	}
}

/// Longitude (deg) to tile column at `zoom`, clamped to the grid.
fn lon_to_x(lon: f64, zoom: u8) -> u32 {
	let n = f64::from(1u32 << zoom);
	let x = ((lon + 180.0) / 360.0 * n).floor();
	(x.max(0.0) as u32).min((1u32 << zoom) - 1)
}

/// Latitude (deg) to tile row at `zoom`, clamped to the grid.
fn lat_to_y(lat: f64, zoom: u8) -> u32 {
	let n = f64::from(1u32 << zoom);
	let lat_rad = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
	let y = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0 * n).floor();
	(y.max(0.0) as u32).min((1u32 << zoom) - 1)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn world_covers_whole_grid() {
		for level in 0..=4u8 {
			let bbox = TileBBox::from_geo(level, &GeoBBox::world()).unwrap();
			assert_eq!(bbox.x_min, 0);
			assert_eq!(bbox.y_min, 0);
			assert_eq!(bbox.x_max, (1u32 << level) - 1);
			assert_eq!(bbox.y_max, (1u32 << level) - 1);
			assert_eq!(bbox.count_tiles(), 4u64.pow(u32::from(level)));
		}
	}

	#[test]
	fn origin_point() {
		let bbox = GeoBBox::new(0.0, 0.0, 0.0, 0.0).unwrap();
		let tiles = TileBBox::from_geo(2, &bbox).unwrap();
		assert_eq!((tiles.x_min, tiles.y_min, tiles.x_max, tiles.y_max), (2, 2, 2, 2));
	}

	#[test]
	fn row_major_iteration() {
		let bbox = TileBBox::new(2, 1, 2, 2, 3).unwrap();
		let coords: Vec<(u32, u32)> = bbox.iter_coords().map(|c| (c.x, c.y)).collect();
		assert_eq!(coords, vec![(1, 2), (2, 2), (1, 3), (2, 3)]);
	}

	#[test]
	fn new_rejects_inverted() {
		assert!(TileBBox::new(2, 3, 0, 1, 0).is_err());
		assert!(TileBBox::new(2, 0, 0, 4, 0).is_err());
	}

	#[test]
	fn poles_clamp_to_grid() {
		let bbox = GeoBBox::new(-180.0, -90.0, 180.0, 90.0).unwrap();
		let tiles = TileBBox::from_geo(3, &bbox).unwrap();
		assert_eq!(tiles.y_min, 0);
		assert_eq!(tiles.y_max, 7);
	}
}
