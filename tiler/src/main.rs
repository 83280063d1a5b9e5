use anyhow::{Context, Result};
use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use log::{info, warn};
use std::{path::PathBuf, sync::Arc, time::Instant};
use tiler::{
	config::Config,
	task::{Task, TaskOptions},
	tilemap::{Layer, TileMap},
};
use tiler_core::geojson::load_geometry_collection;

// Define the command-line interface using the clap crate
#[derive(Parser, Debug)]
#[command(
	author,
	version,
	about,
	long_about = None,
	disable_help_subcommand = true,
)]
struct Cli {
	/// Path of the config file
	#[arg(short = 'c', long = "config", value_name = "FILE", default_value = "conf.toml")]
	config: PathBuf,

	#[command(flatten)]
	verbose: Verbosity<InfoLevel>,
}

fn main() -> Result<()> {
	let cli = Cli::parse();

	env_logger::Builder::new()
		.filter_level(cli.verbose.log_level_filter())
		.format_timestamp(None)
		.init();

	tokio::runtime::Builder::new_multi_thread()
		.enable_all()
		.build()
		.context("unable to start the runtime")?
		.block_on(run(cli))
}

async fn run(cli: Cli) -> Result<()> {
	let start = Instant::now();
	let config = Config::from_path(&cli.config);
	info!("{}", config.app.title);

	let tilemap = TileMap::from_config(&config.tm);
	if config.lrs.is_empty() {
		warn!("no [[lrs]] entries configured, nothing to download");
	}

	let mut layers = Vec::new();
	for lrs in &config.lrs {
		let collection = Arc::new(load_geometry_collection(&lrs.geojson)?);
		for zoom in lrs.min..=lrs.max {
			layers.push(Layer::new(&lrs.url, zoom, collection.clone(), &tilemap.url));
		}
	}

	let task = Task::new(layers, tilemap, TaskOptions::from_config(&config));
	info!("task {}: {} tiles into {:?}", task.id, task.total, task.file);
	task.download().await?;

	info!("{:.3}s finished", start.elapsed().as_secs_f64());
	Ok(())
}
