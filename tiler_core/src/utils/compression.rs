//! Gzip helpers for wrapping vector-tile payloads before storage.
//!
//! MBTiles stores `pbf` tiles gzip-compressed by convention; the fetcher wraps
//! raw vector-tile bodies with [`compress_gzip`] before handing them to the
//! sink.

use crate::Blob;
use anyhow::{Context, Result};
use flate2::bufread::{GzDecoder, GzEncoder};
use std::io::Read;

/// Compresses a blob with gzip.
pub fn compress_gzip(blob: &Blob) -> Result<Blob> {
	let mut encoder = GzEncoder::new(blob.as_slice(), flate2::Compression::best());
	let mut compressed = Vec::new();
	encoder
		.read_to_end(&mut compressed)
		.context("failed to compress data using gzip")?;
	Ok(Blob::from(compressed))
}

/// Decompresses a gzip-compressed blob.
pub fn decompress_gzip(blob: &Blob) -> Result<Blob> {
	let mut decoder = GzDecoder::new(blob.as_slice());
	let mut decompressed = Vec::new();
	decoder
		.read_to_end(&mut decompressed)
		.context("failed to decompress data using gzip")?;
	Ok(Blob::from(decompressed))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trip() -> Result<()> {
		let data = Blob::from(vec![7u8; 10_000]);
		let compressed = compress_gzip(&data)?;
		assert!(compressed.len() < data.len());
		let decompressed = decompress_gzip(&compressed)?;
		assert_eq!(data, decompressed);
		Ok(())
	}

	#[test]
	fn gzip_magic_bytes() -> Result<()> {
		let compressed = compress_gzip(&Blob::from("tile body"))?;
		assert_eq!(&compressed.as_slice()[0..2], &[0x1f, 0x8b]);
		Ok(())
	}

	#[test]
	fn garbage_fails_to_decompress() {
		assert!(decompress_gzip(&Blob::from("definitely not gzip")).is_err());
	}
}
