//! Loads GeoJSON files into a collection of [`geo::Geometry`] values.
//!
//! Accepts a bare `Geometry`, a single `Feature` or a whole
//! `FeatureCollection` (each feature contributing one geometry). Coordinates
//! are expected in WGS84 lon/lat.

use anyhow::{Context, Result, anyhow};
use geo::Geometry;
use geojson::GeoJson;
use std::{fs, path::Path};

/// Reads `path` and returns its geometries.
///
/// Unparseable input is an error; features without a geometry are skipped.
pub fn load_geometry_collection(path: &Path) -> Result<Vec<Geometry<f64>>> {
	let data = fs::read_to_string(path).with_context(|| format!("unable to read geojson file {path:?}"))?;
	parse_geometry_collection(&data).with_context(|| format!("unable to parse geojson file {path:?}"))
}

/// Parses a GeoJSON string into its geometries.
pub fn parse_geometry_collection(data: &str) -> Result<Vec<Geometry<f64>>> {
	let geojson: GeoJson = data.parse::<GeoJson>().map_err(|e| anyhow!("{e}"))?;

	let mut collection = Vec::new();
	match geojson {
		GeoJson::Geometry(geometry) => collection.push(convert(geometry)?),
		GeoJson::Feature(feature) => {
			if let Some(geometry) = feature.geometry {
				collection.push(convert(geometry)?);
			}
		}
		GeoJson::FeatureCollection(features) => {
			for feature in features.features {
				if let Some(geometry) = feature.geometry {
					collection.push(convert(geometry)?);
				}
			}
		}
	}
	Ok(collection)
}

fn convert(geometry: geojson::Geometry) -> Result<Geometry<f64>> {
	Geometry::<f64>::try_from(geometry).map_err(|e| anyhow!("unsupported geometry: {e}"))
}
