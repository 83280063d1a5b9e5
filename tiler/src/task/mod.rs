//! The download task: a pipelined, bounded-concurrency harvest over all
//! layers.
//!
//! Data flow: per layer, a cover-stream producer feeds tile coordinates into
//! the admission loop. Each admission takes a worker slot from a bounded
//! semaphore, waits the configured pacing delay, bumps the progress counters
//! and spawns a fetcher. Completed payloads travel through the save channel
//! into the single sink consumer. Layer N+1 never starts before every fetcher
//! of layer N has returned.
//!
//! Control: [`TaskControl`] carries idempotent pause/resume/abort signals.
//! Pause blocks further admissions, abort additionally closes the cover
//! stream; in-flight fetchers always run to completion, and no exit path
//! leaks a worker slot.

mod fetcher;

pub use fetcher::{Fetcher, USER_AGENT, expand_url};

use crate::{
	config::{Config, OutputFormat},
	sink::{DirectorySink, MBTilesSink, TileSink},
	tilemap::{Layer, TileMap, aggregate_bounds},
};
use anyhow::{Context, Result};
use log::{debug, error, info, warn};
use std::{
	path::PathBuf,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
	time::Duration,
};
use tiler_core::{
	Blob, TileCoord, cover,
	progress::{ProgressTrait, get_progress_bar},
};
use tokio::{
	sync::{OwnedSemaphorePermit, Semaphore, mpsc, watch},
	task::JoinSet,
	time::sleep,
};

/// Runtime options of a task, distilled from the loaded [`Config`].
#[derive(Debug, Clone)]
pub struct TaskOptions {
	/// Max concurrent in-flight HTTP fetches.
	pub workers: usize,
	/// Save-channel buffer capacity.
	pub savepipe: usize,
	/// Cover-stream buffer capacity.
	pub mergebuf: usize,
	/// Minimum spacing between successive admissions.
	pub timedelay: Duration,
	pub output_format: OutputFormat,
	pub output_directory: PathBuf,
	/// Optional Referer header sent with every fetch.
	pub referer: Option<String>,
}

impl TaskOptions {
	pub fn from_config(config: &Config) -> TaskOptions {
		TaskOptions {
			workers: config.task.workers.max(1),
			savepipe: config.task.savepipe.max(1),
			mergebuf: config.task.mergebuf.max(1),
			timedelay: Duration::from_millis(config.task.timedelay),
			output_format: config.output.format,
			output_directory: PathBuf::from(&config.output.directory),
			referer: None,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ControlState {
	Running,
	Paused,
	Aborted,
}

/// Cloneable handle carrying pause/resume/abort signals into a running task.
///
/// All signals are idempotent; abort is final.
#[derive(Clone)]
pub struct TaskControl {
	sender: watch::Sender<ControlState>,
}

impl TaskControl {
	pub fn pause(&self) {
		self.sender.send_if_modified(|state| match *state {
			ControlState::Running => {
				*state = ControlState::Paused;
				true
			}
			_ => false,
		});
	}

	pub fn resume(&self) {
		self.sender.send_if_modified(|state| match *state {
			ControlState::Paused => {
				*state = ControlState::Running;
				true
			}
			_ => false,
		});
	}

	pub fn abort(&self) {
		self.sender.send_if_modified(|state| {
			if *state == ControlState::Aborted {
				false
			} else {
				*state = ControlState::Aborted;
				true
			}
		});
	}
}

/// Admission counters, global and per layer.
///
/// Incremented exactly once per admission (not per success), never
/// decremented.
pub struct TaskProgress {
	total: u64,
	admitted: AtomicU64,
	per_layer: Vec<AtomicU64>,
}

impl TaskProgress {
	fn new(total: u64, layers: usize) -> TaskProgress {
		TaskProgress {
			total,
			admitted: AtomicU64::new(0),
			per_layer: (0..layers).map(|_| AtomicU64::new(0)).collect(),
		}
	}

	fn inc(&self, layer: usize) {
		self.admitted.fetch_add(1, Ordering::Relaxed);
		self.per_layer[layer].fetch_add(1, Ordering::Relaxed);
	}

	pub fn total(&self) -> u64 {
		self.total
	}

	pub fn admitted(&self) -> u64 {
		self.admitted.load(Ordering::Relaxed)
	}

	pub fn layer_admitted(&self, layer: usize) -> u64 {
		self.per_layer[layer].load(Ordering::Relaxed)
	}
}

/// One download run over a list of layers into one destination.
pub struct Task {
	/// Opaque short unique id, minted at creation.
	pub id: String,
	pub name: String,
	/// Destination path: the `.mbtiles` file, or the root of the file tree.
	pub file: PathBuf,
	/// Σ layer.count, fixed at creation.
	pub total: u64,
	layers: Vec<Layer>,
	tilemap: TileMap,
	options: TaskOptions,
	control: watch::Sender<ControlState>,
	progress: Arc<TaskProgress>,
}

impl Task {
	/// Builds the task. Tile counts are already fixed inside the layers; the
	/// database is not opened here.
	pub fn new(layers: Vec<Layer>, tilemap: TileMap, options: TaskOptions) -> Task {
		let id = short_id();
		let name = if tilemap.name.is_empty() {
			id.clone()
		} else {
			tilemap.name.clone()
		};
		let total = layers.iter().map(|layer| layer.count).sum();
		let basename = format!("{name}-z{}-{}.{id}", tilemap.min_zoom, tilemap.max_zoom);
		let file = match options.output_format {
			OutputFormat::Mbtiles => options.output_directory.join(format!("{basename}.mbtiles")),
			OutputFormat::Files => options.output_directory.join(basename),
		};
		let (control, _) = watch::channel(ControlState::Running);
		let progress = Arc::new(TaskProgress::new(total, layers.len()));

		Task {
			id,
			name,
			file,
			total,
			layers,
			tilemap,
			options,
			control,
			progress,
		}
	}

	/// A control handle usable while [`download`](Task::download) runs.
	pub fn control(&self) -> TaskControl {
		TaskControl {
			sender: self.control.clone(),
		}
	}

	pub fn progress(&self) -> Arc<TaskProgress> {
		self.progress.clone()
	}

	pub fn pause(&self) {
		self.control().pause();
	}

	pub fn resume(&self) {
		self.control().resume();
	}

	pub fn abort(&self) {
		self.control().abort();
	}

	/// Runs the whole pipeline; returns when the last layer is drained or an
	/// abort has been observed.
	///
	/// Only setup failures are returned as errors; per-tile failures are
	/// logged and skipped.
	pub async fn download(&self) -> Result<()> {
		let sink = self.open_sink()?;
		let (save_tx, save_rx) = mpsc::channel::<(TileCoord, Blob)>(self.options.savepipe.max(1));
		let saver = spawn_saver(sink, save_rx);

		let semaphore = Arc::new(Semaphore::new(self.options.workers.max(1)));
		let fetcher = Arc::new(Fetcher::new(self.tilemap.format, self.options.referer.clone())?);
		let mut bar = get_progress_bar(&format!("downloading {}", self.name), self.total);

		let mut control = self.control.subscribe();
		for index in 0..self.layers.len() {
			let aborted = self
				.run_layer(index, &semaphore, &fetcher, &save_tx, &mut control, bar.as_mut())
				.await;
			if aborted {
				info!("task {} aborted after {} admissions", self.id, self.progress.admitted());
				break;
			}
		}

		// Closing the save channel lets the consumer drain and stop.
		drop(save_tx);
		saver.await.context("save consumer failed")??;
		bar.finish();
		Ok(())
	}

	/// Drains one layer's cover stream into the worker pool. Returns true when
	/// an abort was observed.
	async fn run_layer(
		&self,
		index: usize,
		semaphore: &Arc<Semaphore>,
		fetcher: &Arc<Fetcher>,
		save_tx: &mpsc::Sender<(TileCoord, Blob)>,
		control: &mut watch::Receiver<ControlState>,
		bar: &mut dyn ProgressTrait,
	) -> bool {
		let layer = &self.layers[index];
		debug!("layer z{}: {} tiles over {:?}", layer.zoom, layer.count, layer.url);

		let mut stream = cover::spawn_stream(layer.collection.clone(), layer.zoom, self.options.mergebuf);
		let mut workers = JoinSet::new();
		let mut aborted = false;

		loop {
			let coord = tokio::select! {
				received = stream.recv() => match received {
					Some(coord) => coord,
					None => break,
				},
				_ = wait_for_abort(control) => {
					aborted = true;
					break;
				}
			};

			if wait_while_paused(control).await == ControlState::Aborted {
				aborted = true;
				break;
			}

			let permit = tokio::select! {
				permit = semaphore.clone().acquire_owned() => match permit {
					Ok(permit) => permit,
					Err(_) => {
						error!("worker semaphore closed unexpectedly");
						aborted = true;
						break;
					}
				},
				_ = wait_for_abort(control) => {
					aborted = true;
					break;
				}
			};

			if !self.options.timedelay.is_zero() {
				sleep(self.options.timedelay).await;
			}

			self.progress.inc(index);
			bar.inc(1);

			let url = expand_url(&layer.url, &coord);
			let fetcher = fetcher.clone();
			let save_tx = save_tx.clone();
			workers.spawn(async move {
				fetch_one(&fetcher, &url, coord, &save_tx, permit).await;
			});
		}

		// Dropping the receiver closes the cover stream.
		drop(stream);

		// Admitted fetchers always run to completion, abort included.
		while workers.join_next().await.is_some() {}

		debug!(
			"layer z{} done: {}/{} admitted",
			layer.zoom,
			self.progress.layer_admitted(index),
			layer.count
		);
		aborted
	}

	fn open_sink(&self) -> Result<Box<dyn TileSink>> {
		match self.options.output_format {
			OutputFormat::Mbtiles => {
				let bounds = aggregate_bounds(&self.layers);
				let basename = self
					.file
					.file_name()
					.map(|name| name.to_string_lossy().into_owned())
					.unwrap_or_default();
				let metadata = self.tilemap.metadata_items(&self.id, &basename, &bounds);
				Ok(Box::new(MBTilesSink::new(&self.file, &metadata)?))
			}
			OutputFormat::Files => Ok(Box::new(DirectorySink::new(&self.file, self.tilemap.format)?)),
		}
	}
}

/// One worker: fetch, post-process, publish. The semaphore permit travels
/// with the worker and frees the slot on every exit path.
async fn fetch_one(
	fetcher: &Fetcher,
	url: &str,
	coord: TileCoord,
	save_tx: &mpsc::Sender<(TileCoord, Blob)>,
	permit: OwnedSemaphorePermit,
) {
	match fetcher.fetch(url).await {
		Ok(Some(blob)) => {
			if save_tx.send((coord, blob)).await.is_err() {
				error!("save channel closed, dropping tile {coord:?}");
			}
		}
		Ok(None) => warn!("nil tile {coord:?} from {url}, skipped"),
		Err(e) => warn!("failed to fetch tile {coord:?}: {e:#}"),
	}
	drop(permit);
}

/// The single sink consumer. Write errors are logged and skipped; the task
/// keeps running.
fn spawn_saver(
	mut sink: Box<dyn TileSink>,
	mut rx: mpsc::Receiver<(TileCoord, Blob)>,
) -> tokio::task::JoinHandle<Result<()>> {
	tokio::task::spawn_blocking(move || {
		while let Some((coord, blob)) = rx.blocking_recv() {
			if let Err(e) = sink.write(coord, blob) {
				error!("unable to save tile {coord:?}: {e:#}");
			}
		}
		sink.finish()
	})
}

/// Blocks while the task is paused; returns the state that ended the wait.
async fn wait_while_paused(control: &mut watch::Receiver<ControlState>) -> ControlState {
	loop {
		let state = *control.borrow_and_update();
		match state {
			ControlState::Paused => {
				if control.changed().await.is_err() {
					return ControlState::Aborted;
				}
			}
			other => return other,
		}
	}
}

/// Resolves once an abort is observed (or the task is torn down).
async fn wait_for_abort(control: &watch::Receiver<ControlState>) {
	let mut control = control.clone();
	loop {
		if *control.borrow_and_update() == ControlState::Aborted {
			return;
		}
		if control.changed().await.is_err() {
			return;
		}
	}
}

fn short_id() -> String {
	uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn short_ids_are_short_and_unique() {
		let a = short_id();
		let b = short_id();
		assert_eq!(a.len(), 8);
		assert_ne!(a, b);
	}

	#[test]
	fn control_signals_are_idempotent() {
		let (sender, receiver) = watch::channel(ControlState::Running);
		let control = TaskControl { sender };

		control.pause();
		control.pause();
		assert_eq!(*receiver.borrow(), ControlState::Paused);

		control.resume();
		assert_eq!(*receiver.borrow(), ControlState::Running);

		control.abort();
		control.resume(); // abort is final
		assert_eq!(*receiver.borrow(), ControlState::Aborted);
	}

	#[test]
	fn progress_counts_per_layer() {
		let progress = TaskProgress::new(10, 2);
		progress.inc(0);
		progress.inc(1);
		progress.inc(1);
		assert_eq!(progress.admitted(), 3);
		assert_eq!(progress.layer_admitted(0), 1);
		assert_eq!(progress.layer_admitted(1), 2);
		assert_eq!(progress.total(), 10);
	}

	#[tokio::test]
	async fn wait_while_paused_resumes() {
		let (sender, mut receiver) = watch::channel(ControlState::Paused);
		let control = TaskControl { sender: sender.clone() };

		let waiter = tokio::spawn(async move { wait_while_paused(&mut receiver).await });
		tokio::time::sleep(Duration::from_millis(10)).await;
		control.resume();
		assert_eq!(waiter.await.unwrap(), ControlState::Running);
	}
}
