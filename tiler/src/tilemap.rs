//! The tile-map and layer model.
//!
//! A [`TileMap`] describes the remote tile source and supplies the MBTiles
//! metadata; a [`Layer`] is one (geometry, zoom, URL-template) triple, the
//! unit of scheduling. Layers with an empty template inherit the map URL once,
//! at registration time.

use crate::config::TileMapConfig;
use geo::{BoundingRect, Geometry};
use log::warn;
use std::sync::Arc;
use tiler_core::{GeoBBox, TileFormat, cover};

/// Tile size of the harvested layers, recorded as `pixel_scale` metadata.
const TILE_SIZE: u32 = 256;

/// MBTiles revision written to the `version` metadata key.
const MBTILES_VERSION: &str = "1.2";

/// Tile addressing convention of the remote server.
///
/// Both schemas are fetched with the same template machinery; TMS servers are
/// addressed with the `{-y}` placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileSchema {
	Xyz,
	Tms,
}

impl TileSchema {
	pub fn parse_str(value: &str) -> Option<TileSchema> {
		match value.to_lowercase().as_str() {
			"xyz" | "" => Some(TileSchema::Xyz),
			"tms" => Some(TileSchema::Tms),
			_ => None,
		}
	}
}

/// The remote tile source and the aggregate facts recorded in metadata.
#[derive(Debug, Clone)]
pub struct TileMap {
	pub name: String,
	pub description: String,
	pub attribution: String,
	pub schema: TileSchema,
	pub format: TileFormat,
	pub min_zoom: u8,
	pub max_zoom: u8,
	/// Default URL template for layers without their own.
	pub url: String,
	pub token: String,
	/// Free-form JSON recorded under the `json` metadata key.
	pub json: String,
}

impl TileMap {
	/// Builds a `TileMap` from config, falling back on bad enum values.
	pub fn from_config(config: &TileMapConfig) -> TileMap {
		let format = TileFormat::parse_str(&config.format).unwrap_or_else(|e| {
			warn!("{e:#}, assuming png");
			TileFormat::Png
		});
		let schema = TileSchema::parse_str(&config.schema).unwrap_or_else(|| {
			warn!("unknown tile schema {:?}, assuming xyz", config.schema);
			TileSchema::Xyz
		});
		if !config.json.is_empty() && serde_json::from_str::<serde_json::Value>(&config.json).is_err() {
			warn!("tm.json is not valid JSON, storing it anyway");
		}
		TileMap {
			name: config.name.clone(),
			description: config.description.clone(),
			attribution: config.attribution.clone(),
			schema,
			format,
			min_zoom: config.min,
			max_zoom: config.max,
			url: config.url.clone(),
			token: config.token.clone(),
			json: config.json.clone(),
		}
	}

	/// The MBTiles metadata rows, written once during sink setup.
	pub fn metadata_items(&self, id: &str, basename: &str, bounds: &GeoBBox) -> Vec<(String, String)> {
		let (lon, lat) = bounds.center();
		let items = [
			("id", id.to_string()),
			("name", self.name.clone()),
			("description", self.description.clone()),
			("attribution", self.attribution.clone()),
			("basename", basename.to_string()),
			("format", self.format.extension().to_string()),
			("type", "baselayer".to_string()),
			("pixel_scale", TILE_SIZE.to_string()),
			("version", MBTILES_VERSION.to_string()),
			("bounds", bounds.as_string_list()),
			("center", format!("{lon},{lat},{}", self.min_zoom)),
			("minzoom", self.min_zoom.to_string()),
			("maxzoom", self.max_zoom.to_string()),
			("json", self.json.clone()),
		];
		items.into_iter().map(|(name, value)| (name.to_string(), value)).collect()
	}
}

/// One (geometry, zoom, URL-template) triple; the unit of scheduling.
pub struct Layer {
	pub url: String,
	pub zoom: u8,
	pub collection: Arc<Vec<Geometry<f64>>>,
	/// Exact tile count of this layer's cover, fixed at construction.
	pub count: u64,
}

impl Layer {
	pub fn new(url: &str, zoom: u8, collection: Arc<Vec<Geometry<f64>>>, default_url: &str) -> Layer {
		let url = if url.is_empty() {
			default_url.to_string()
		} else {
			url.to_string()
		};
		let count = cover::count(&collection, zoom);
		Layer {
			url,
			zoom,
			collection,
			count,
		}
	}

	/// The geographic bounds of this layer's geometries.
	pub fn bounds(&self) -> Option<GeoBBox> {
		let mut bounds: Option<GeoBBox> = None;
		for geometry in self.collection.iter() {
			if let Some(rect) = geometry.bounding_rect() {
				let bbox = GeoBBox::from(rect);
				match &mut bounds {
					Some(b) => b.extend(&bbox),
					None => bounds = Some(bbox),
				}
			}
		}
		bounds
	}
}

/// Union of all layer bounds; the whole mercator square when nothing is known.
pub fn aggregate_bounds(layers: &[Layer]) -> GeoBBox {
	let mut bounds: Option<GeoBBox> = None;
	for layer in layers {
		if let Some(bbox) = layer.bounds() {
			match &mut bounds {
				Some(b) => b.extend(&bbox),
				None => bounds = Some(bbox),
			}
		}
	}
	bounds.unwrap_or_else(GeoBBox::world)
}

#[cfg(test)]
mod tests {
	use super::*;
	use geo::{Rect, coord, point};

	fn small_map() -> TileMap {
		TileMap::from_config(&TileMapConfig {
			name: "osm".to_string(),
			format: "png".to_string(),
			schema: "xyz".to_string(),
			min: 3,
			max: 5,
			url: "http://tile.example.org/{z}/{x}/{y}.png".to_string(),
			..TileMapConfig::default()
		})
	}

	#[test]
	fn from_config_parses_enums() {
		let tilemap = small_map();
		assert_eq!(tilemap.format, TileFormat::Png);
		assert_eq!(tilemap.schema, TileSchema::Xyz);
	}

	#[test]
	fn from_config_falls_back_on_bad_values() {
		let tilemap = TileMap::from_config(&TileMapConfig {
			format: "tiff".to_string(),
			schema: "wmts".to_string(),
			..TileMapConfig::default()
		});
		assert_eq!(tilemap.format, TileFormat::Png);
		assert_eq!(tilemap.schema, TileSchema::Xyz);
	}

	#[test]
	fn layer_inherits_default_url() {
		let collection = Arc::new(vec![Geometry::Point(point! { x: 0.0, y: 0.0 })]);
		let layer = Layer::new("", 0, collection.clone(), "http://fallback/{z}/{x}/{y}");
		assert_eq!(layer.url, "http://fallback/{z}/{x}/{y}");

		let layer = Layer::new("http://own/{z}/{x}/{y}", 0, collection, "http://fallback/{z}/{x}/{y}");
		assert_eq!(layer.url, "http://own/{z}/{x}/{y}");
	}

	#[test]
	fn layer_count_is_precomputed() {
		let world = Arc::new(vec![Geometry::Rect(Rect::new(
			coord! { x: -180.0, y: -85.0 },
			coord! { x: 180.0, y: 85.0 },
		))]);
		let layer = Layer::new("http://h/{z}/{x}/{y}", 2, world, "");
		assert_eq!(layer.count, 16);
	}

	#[test]
	fn metadata_items_contents() {
		let tilemap = small_map();
		let bounds = GeoBBox::new(-10.0, -10.0, 10.0, 10.0).unwrap();
		let items = tilemap.metadata_items("abc123", "osm-z3-5.abc123.mbtiles", &bounds);
		let get = |key: &str| {
			items
				.iter()
				.find(|(name, _)| name == key)
				.map(|(_, value)| value.clone())
				.unwrap()
		};

		assert_eq!(get("id"), "abc123");
		assert_eq!(get("version"), "1.2");
		assert_eq!(get("minzoom"), "3");
		assert_eq!(get("maxzoom"), "5");
		assert_eq!(get("type"), "baselayer");
		assert_eq!(get("pixel_scale"), "256");
		assert_eq!(get("bounds"), "-10,-10,10,10");
		assert_eq!(get("center").split(',').count(), 3);
		assert_eq!(get("center"), "0,0,3");
	}

	#[test]
	fn aggregate_bounds_is_union() {
		let a = Arc::new(vec![Geometry::Rect(Rect::new(
			coord! { x: -20.0, y: 0.0 },
			coord! { x: 0.0, y: 10.0 },
		))]);
		let b = Arc::new(vec![Geometry::Rect(Rect::new(
			coord! { x: -5.0, y: 5.0 },
			coord! { x: 30.0, y: 40.0 },
		))]);
		let layers = vec![
			Layer::new("http://h/{z}/{x}/{y}", 1, a, ""),
			Layer::new("http://h/{z}/{x}/{y}", 1, b, ""),
		];
		let bounds = aggregate_bounds(&layers);
		assert_eq!(bounds.as_array(), [-20.0, 0.0, 30.0, 40.0]);
	}

	#[test]
	fn aggregate_bounds_of_nothing_is_world() {
		assert_eq!(aggregate_bounds(&[]).as_array(), GeoBBox::world().as_array());
	}
}
