//! Progress reporting for long-running downloads.
//!
//! [`get_progress_bar`] returns a terminal progress bar, or a silent drain
//! when the `test` feature is active (so test output stays clean). Rendering
//! is best-effort; the authoritative counters live with the task.

mod progress_bar;
mod progress_drain;
mod traits;

pub use progress_bar::ProgressBar;
pub use progress_drain::ProgressDrain;
pub use traits::ProgressTrait;

/// Creates a progress indicator for a task of `max_value` steps.
pub fn get_progress_bar(message: &str, max_value: u64) -> Box<dyn ProgressTrait> {
	#[cfg(not(any(feature = "test", test)))]
	let mut progress = ProgressBar::new();
	#[cfg(any(feature = "test", test))]
	let mut progress = ProgressDrain::new();
	progress.init(message, max_value);
	Box::new(progress)
}
