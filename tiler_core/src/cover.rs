//! Tile-cover enumeration: which tiles at a given zoom does a geometry touch?
//!
//! The cover of a geometry is the set of tiles whose footprint intersects it
//! (any non-zero overlap counts). For a collection the cover is the union over
//! all members, duplicates elided. [`enumerate`] is lazy, [`count`] is exact,
//! and [`spawn_stream`] publishes the sequence through a bounded channel so a
//! consumer can apply back-pressure to the producer.
//!
//! # Examples
//!
//! ```
//! use geo::{Geometry, point};
//! use tiler_core::cover;
//!
//! let geometries = vec![Geometry::Point(point! { x: 0.0, y: 0.0 })];
//! let tiles: Vec<_> = cover::enumerate(&geometries, 0).collect();
//! assert_eq!(tiles.len(), 1);
//! assert_eq!(cover::count(&geometries, 0), 1);
//! ```

use crate::{TileBBox, TileCoord};
use geo::{BoundingRect, Geometry, Intersects, Rect, coord};
use log::debug;
use std::{collections::HashSet, sync::Arc};
use tokio::sync::mpsc;

/// Lazily enumerates all distinct tiles at `zoom` intersecting any geometry
/// in the collection.
///
/// The sequence is finite and deterministic (row-major per geometry, union in
/// collection order) but callers must not rely on any particular order. It is
/// not restartable; call again for a second pass.
pub fn enumerate<'a>(geometries: &'a [Geometry<f64>], zoom: u8) -> impl Iterator<Item = TileCoord> + 'a {
	// Dedup is only needed when several geometries can cover the same tile.
	let dedup = geometries.len() > 1;
	let mut seen: HashSet<TileCoord> = HashSet::new();
	geometries
		.iter()
		.flat_map(move |geometry| cover_geometry(geometry, zoom))
		.filter(move |coord| !dedup || seen.insert(*coord))
}

/// Exact number of tiles [`enumerate`] would yield, without keeping them.
pub fn count(geometries: &[Geometry<f64>], zoom: u8) -> u64 {
	enumerate(geometries, zoom).count() as u64
}

/// Runs the enumeration on a blocking task and publishes coordinates through
/// a bounded channel of `buffer` slots.
///
/// The producer blocks when the buffer is full; dropping the receiver
/// terminates the producer (this is the abort path).
pub fn spawn_stream(geometries: Arc<Vec<Geometry<f64>>>, zoom: u8, buffer: usize) -> mpsc::Receiver<TileCoord> {
	let (tx, rx) = mpsc::channel(buffer.max(1));
	tokio::task::spawn_blocking(move || {
		for coord in enumerate(&geometries, zoom) {
			if tx.blocking_send(coord).is_err() {
				debug!("cover stream at zoom {zoom} closed by receiver");
				break;
			}
		}
	});
	rx
}

/// Tiles of one geometry: its bounding box projected onto the tile grid,
/// filtered by the intersection predicate.
fn cover_geometry(geometry: &Geometry<f64>, zoom: u8) -> Box<dyn Iterator<Item = TileCoord> + '_> {
	let Some(rect) = geometry.bounding_rect() else {
		return Box::new(std::iter::empty());
	};
	let Ok(bbox) = TileBBox::from_geo(zoom, &rect.into()) else {
		return Box::new(std::iter::empty());
	};
	Box::new(
		bbox
			.into_iter_coords()
			.filter(move |coord| geometry.intersects(&tile_footprint(coord).to_polygon())),
	)
}

fn tile_footprint(coord: &TileCoord) -> Rect<f64> {
	let bbox = coord.as_geo_bbox();
	Rect::new(
		coord! { x: bbox.x_min, y: bbox.y_min },
		coord! { x: bbox.x_max, y: bbox.y_max },
	)
}
