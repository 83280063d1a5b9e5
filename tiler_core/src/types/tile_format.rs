//! This module defines the [`TileFormat`] enum, the payload formats the
//! harvester knows how to store, with projections to a file extension and a
//! MIME content type.
//!
//! # Examples
//!
//! ```
//! use tiler_core::TileFormat;
//!
//! assert_eq!(TileFormat::Png.extension(), "png");
//! assert_eq!(TileFormat::Pbf.content_type(), "application/x-protobuf");
//! assert_eq!(TileFormat::parse_str("jpeg").unwrap(), TileFormat::Jpg);
//! ```

use anyhow::{Result, bail};
use std::fmt::Display;

/// Supported tile payload formats.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TileFormat {
	Png,
	Jpg,
	Pbf,
	Webp,
	Gzip,
	Zlib,
	Unknown,
}

impl Display for TileFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.extension())
	}
}

impl TileFormat {
	/// Lowercase extension, without a leading dot. Used for file paths and the
	/// MBTiles `format` metadata value.
	pub fn extension(&self) -> &str {
		match self {
			TileFormat::Png => "png",
			TileFormat::Jpg => "jpg",
			TileFormat::Pbf => "pbf",
			TileFormat::Webp => "webp",
			TileFormat::Gzip => "gzip",
			TileFormat::Zlib => "zlib",
			TileFormat::Unknown => "bin",
		}
	}

	/// MIME content type of the payload.
	///
	/// For `Pbf` the stored bytes are gzip-wrapped, so a server delivering them
	/// must add `Content-Encoding: gzip`.
	pub fn content_type(&self) -> &str {
		match self {
			TileFormat::Png => "image/png",
			TileFormat::Jpg => "image/jpeg",
			TileFormat::Pbf => "application/x-protobuf",
			TileFormat::Webp => "image/webp",
			TileFormat::Gzip => "application/gzip",
			TileFormat::Zlib => "application/zlib",
			TileFormat::Unknown => "application/octet-stream",
		}
	}

	pub fn parse_str(value: &str) -> Result<Self> {
		Ok(match value.to_lowercase().trim_matches([' ', '.']) {
			"png" => TileFormat::Png,
			"jpg" | "jpeg" => TileFormat::Jpg,
			"pbf" | "mvt" => TileFormat::Pbf,
			"webp" => TileFormat::Webp,
			"gzip" => TileFormat::Gzip,
			"zlib" => TileFormat::Zlib,
			_ => bail!("unknown tile format {value:?}"),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn format_to_extension() {
		fn test(format: TileFormat, expected: &str) {
			assert_eq!(format.extension(), expected);
		}

		test(TileFormat::Png, "png");
		test(TileFormat::Jpg, "jpg");
		test(TileFormat::Pbf, "pbf");
		test(TileFormat::Webp, "webp");
		test(TileFormat::Gzip, "gzip");
		test(TileFormat::Zlib, "zlib");
		test(TileFormat::Unknown, "bin");
	}

	#[test]
	fn format_to_content_type() {
		assert_eq!(TileFormat::Png.content_type(), "image/png");
		assert_eq!(TileFormat::Jpg.content_type(), "image/jpeg");
		assert_eq!(TileFormat::Pbf.content_type(), "application/x-protobuf");
		assert_eq!(TileFormat::Webp.content_type(), "image/webp");
	}

	#[test]
	fn parse() {
		assert_eq!(TileFormat::parse_str("PNG").unwrap(), TileFormat::Png);
		assert_eq!(TileFormat::parse_str(".jpeg").unwrap(), TileFormat::Jpg);
		assert_eq!(TileFormat::parse_str("pbf").unwrap(), TileFormat::Pbf);
		assert!(TileFormat::parse_str("tiff").is_err());
	}
}
