//! TOML configuration loader.
//!
//! ## TOML shape
//!
//! ```toml
//! [app]
//! title = "MapCloud Tiler"
//!
//! [output]
//! format = "mbtiles"        # or "files"
//! directory = "output"
//!
//! [task]
//! workers = 4               # max concurrent fetches
//! savepipe = 1              # save-channel buffer
//! mergebuf = 16             # cover-stream buffer
//! timedelay = 0             # ms between admissions
//!
//! [tm]
//! name = "osm"
//! min = 0
//! max = 8
//! format = "png"
//! schema = "xyz"
//! url = "http://tile.openstreetmap.org/{z}/{x}/{y}.png"
//!
//! [[lrs]]
//! min = 0
//! max = 8
//! geojson = "region.geojson"
//! url = ""                  # empty: inherit tm.url
//! ```
//!
//! Every section is optional and falls back to defaults; a missing or broken
//! config file is a warning, not an error. Any scalar key can also be injected
//! through the environment, matching the dotted or underscored key name
//! case-insensitively (`OUTPUT_FORMAT=files`, `task.workers=8`).

use anyhow::{Context, Result};
use log::warn;
use serde::Deserialize;
use std::{env, fmt::Display, fs, path::Path, path::PathBuf};

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
	pub app: AppConfig,
	pub output: OutputConfig,
	pub task: TaskConfig,
	pub tm: TileMapConfig,
	pub lrs: Vec<LayerConfig>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
	pub title: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
	pub format: OutputFormat,
	pub directory: String,
}

/// Which sink receives the downloaded tiles.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
	#[default]
	Mbtiles,
	Files,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct TaskConfig {
	/// Max concurrent in-flight HTTP fetches.
	pub workers: usize,
	/// Capacity of the save-channel buffer.
	pub savepipe: usize,
	/// Capacity of the per-layer cover-stream buffer.
	pub mergebuf: usize,
	/// Minimum spacing between successive worker admissions, in milliseconds.
	pub timedelay: u64,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct TileMapConfig {
	pub name: String,
	pub description: String,
	pub attribution: String,
	pub min: u8,
	pub max: u8,
	pub format: String,
	/// "xyz" or "tms".
	pub schema: String,
	pub json: String,
	pub url: String,
	pub token: String,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayerConfig {
	pub min: u8,
	pub max: u8,
	pub geojson: PathBuf,
	pub url: String,
}

impl Default for AppConfig {
	fn default() -> Self {
		AppConfig {
			title: "MapCloud Tiler".to_string(),
		}
	}
}

impl Default for OutputConfig {
	fn default() -> Self {
		OutputConfig {
			format: OutputFormat::Mbtiles,
			directory: "output".to_string(),
		}
	}
}

impl Default for TaskConfig {
	fn default() -> Self {
		TaskConfig {
			workers: 4,
			savepipe: 1,
			mergebuf: 16,
			timedelay: 0,
		}
	}
}

impl Display for OutputFormat {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(match self {
			OutputFormat::Mbtiles => "mbtiles",
			OutputFormat::Files => "files",
		})
	}
}

impl Config {
	/// Parses a TOML string.
	pub fn from_string(data: &str) -> Result<Config> {
		toml::from_str(data).context("unable to parse config")
	}

	/// Loads the config file at `path`, falling back to defaults when the file
	/// is missing or broken, then applies environment overrides.
	pub fn from_path(path: &Path) -> Config {
		let mut config = match fs::read_to_string(path) {
			Ok(data) => match Config::from_string(&data) {
				Ok(config) => config,
				Err(e) => {
					warn!("config file {path:?} is not valid, using defaults: {e:#}");
					Config::default()
				}
			},
			Err(e) => {
				warn!("config file {path:?} not readable, using defaults: {e}");
				Config::default()
			}
		};
		config.apply_env_overrides();
		config
	}

	/// Overrides scalar keys from matching environment variables.
	pub fn apply_env_overrides(&mut self) {
		override_string("app", "title", &mut self.app.title);
		if let Some(value) = env_value("output", "format") {
			match value.to_lowercase().as_str() {
				"mbtiles" => self.output.format = OutputFormat::Mbtiles,
				"files" => self.output.format = OutputFormat::Files,
				other => warn!("ignoring output.format override {other:?}"),
			}
		}
		override_string("output", "directory", &mut self.output.directory);

		override_number("task", "workers", &mut self.task.workers);
		override_number("task", "savepipe", &mut self.task.savepipe);
		override_number("task", "mergebuf", &mut self.task.mergebuf);
		override_number("task", "timedelay", &mut self.task.timedelay);

		override_string("tm", "name", &mut self.tm.name);
		override_string("tm", "description", &mut self.tm.description);
		override_string("tm", "attribution", &mut self.tm.attribution);
		override_number("tm", "min", &mut self.tm.min);
		override_number("tm", "max", &mut self.tm.max);
		override_string("tm", "format", &mut self.tm.format);
		override_string("tm", "schema", &mut self.tm.schema);
		override_string("tm", "json", &mut self.tm.json);
		override_string("tm", "url", &mut self.tm.url);
		override_string("tm", "token", &mut self.tm.token);
	}
}

/// Finds `section.key` or `section_key` in the environment, case-insensitive.
fn env_value(section: &str, key: &str) -> Option<String> {
	let dotted = format!("{section}.{key}");
	let underscored = format!("{section}_{key}");
	env::vars().find_map(|(name, value)| {
		let name = name.to_lowercase();
		(name == dotted || name == underscored).then_some(value)
	})
}

fn override_string(section: &str, key: &str, target: &mut String) {
	if let Some(value) = env_value(section, key) {
		*target = value;
	}
}

fn override_number<T: std::str::FromStr>(section: &str, key: &str, target: &mut T) {
	if let Some(value) = env_value(section, key) {
		match value.parse() {
			Ok(parsed) => *target = parsed,
			Err(_) => warn!("ignoring non-numeric {section}.{key} override {value:?}"),
		}
	}
}
