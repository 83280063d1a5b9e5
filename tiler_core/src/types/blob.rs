//! This module provides the [`Blob`] struct, a thin wrapper around `Vec<u8>`
//! for tile payloads moving from the fetcher to the sink.

use std::fmt::Debug;

/// A byte buffer holding one tile payload as stored.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Blob(Vec<u8>);

impl Blob {
	pub fn new_empty() -> Blob {
		Blob(Vec::new())
	}

	pub fn as_slice(&self) -> &[u8] {
		&self.0
	}

	pub fn into_vec(self) -> Vec<u8> {
		self.0
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<Vec<u8>> for Blob {
	fn from(value: Vec<u8>) -> Self {
		Blob(value)
	}
}

impl From<&[u8]> for Blob {
	fn from(value: &[u8]) -> Self {
		Blob(value.to_vec())
	}
}

impl<const N: usize> From<&[u8; N]> for Blob {
	fn from(value: &[u8; N]) -> Self {
		Blob(value.to_vec())
	}
}

impl From<&str> for Blob {
	fn from(value: &str) -> Self {
		Blob(value.as_bytes().to_vec())
	}
}

impl Debug for Blob {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_fmt(format_args!("Blob({} bytes)", self.0.len()))
	}
}
