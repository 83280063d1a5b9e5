//! A geographical bounding box in WGS84 (lon/lat) used for aggregate layer
//! bounds and MBTiles metadata.

use anyhow::{Result, ensure};
use std::fmt::Debug;

/// Latitude limit of the web-mercator projection.
pub static MAX_MERCATOR_LAT: f64 = 85.051_128_779_806_59;

/// A rectangular area on the map: `x_min` (west), `y_min` (south),
/// `x_max` (east), `y_max` (north).
///
/// # Examples
///
/// ```
/// use tiler_core::GeoBBox;
///
/// let mut bbox = GeoBBox::new(-10.0, -5.0, 10.0, 5.0).unwrap();
/// bbox.extend(&GeoBBox::new(-12.0, -3.0, 8.0, 6.0).unwrap());
/// assert_eq!(bbox.as_array(), [-12.0, -5.0, 10.0, 6.0]);
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct GeoBBox {
	pub x_min: f64,
	pub y_min: f64,
	pub x_max: f64,
	pub y_max: f64,
}

impl GeoBBox {
	pub fn new(x_min: f64, y_min: f64, x_max: f64, y_max: f64) -> Result<GeoBBox> {
		ensure!(x_min <= x_max, "x_min ({x_min}) must be <= x_max ({x_max})");
		ensure!(y_min <= y_max, "y_min ({y_min}) must be <= y_max ({y_max})");
		ensure!(x_min >= -180.0 && x_max <= 180.0, "longitudes must be within [-180, 180]");
		ensure!(y_min >= -90.0 && y_max <= 90.0, "latitudes must be within [-90, 90]");
		Ok(GeoBBox {
			x_min,
			y_min,
			x_max,
			y_max,
		})
	}

	/// The full web-mercator square.
	pub fn world() -> GeoBBox {
		GeoBBox {
			x_min: -180.0,
			y_min: -MAX_MERCATOR_LAT,
			x_max: 180.0,
			y_max: MAX_MERCATOR_LAT,
		}
	}

	/// Grows this bbox to also contain `other`.
	pub fn extend(&mut self, other: &GeoBBox) {
		self.x_min = self.x_min.min(other.x_min);
		self.y_min = self.y_min.min(other.y_min);
		self.x_max = self.x_max.max(other.x_max);
		self.y_max = self.y_max.max(other.y_max);
	}

	pub fn center(&self) -> (f64, f64) {
		((self.x_min + self.x_max) / 2.0, (self.y_min + self.y_max) / 2.0)
	}

	pub fn as_array(&self) -> [f64; 4] {
		[self.x_min, self.y_min, self.x_max, self.y_max]
	}

	/// "west,south,east,north", the MBTiles `bounds` metadata encoding.
	pub fn as_string_list(&self) -> String {
		format!("{},{},{},{}", self.x_min, self.y_min, self.x_max, self.y_max)
	}
}

impl From<geo::Rect<f64>> for GeoBBox {
	fn from(rect: geo::Rect<f64>) -> Self {
		GeoBBox {
			x_min: rect.min().x.clamp(-180.0, 180.0),
			y_min: rect.min().y.clamp(-90.0, 90.0),
			x_max: rect.max().x.clamp(-180.0, 180.0),
			y_max: rect.max().y.clamp(-90.0, 90.0),
		}
	}
}

impl Debug for GeoBBox {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_fmt(format_args!(
			"GeoBBox({}, {}, {}, {})",
			self.x_min, self.y_min, self.x_max, self.y_max
		))
	}
}
