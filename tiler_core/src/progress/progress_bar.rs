//! Terminal progress bar: message, bar, pos/len, percentage, rate and ETA,
//! redrawn in place on stderr.

use super::ProgressTrait;
use std::{
	env,
	fmt::Write as _,
	io::{self, Write},
	sync::{Arc, Mutex},
	time::{Duration, Instant},
};

/// Redraws are rate-limited to keep terminal output cheap.
const REDRAW_INTERVAL: Duration = Duration::from_millis(100);

struct Inner {
	message: String,
	len: u64,
	pos: u64,
	start: Instant,
	last_draw: Instant,
	finished: bool,
}

/// A thread-safe terminal progress bar.
pub struct ProgressBar {
	inner: Arc<Mutex<Inner>>,
}

impl ProgressTrait for ProgressBar {
	fn new() -> Self {
		let now = Instant::now();
		ProgressBar {
			inner: Arc::new(Mutex::new(Inner {
				message: String::new(),
				len: 0,
				pos: 0,
				start: now,
				last_draw: now.checked_sub(REDRAW_INTERVAL).unwrap_or(now),
				finished: false,
			})),
		}
	}

	fn init(&mut self, message: &str, max_value: u64) {
		let mut inner = self.inner.lock().unwrap();
		inner.message = message.to_string();
		inner.len = max_value;
		inner.pos = 0;
		inner.start = Instant::now();
		redraw(&mut inner, false);
	}

	fn set_position(&mut self, value: u64) {
		let mut inner = self.inner.lock().unwrap();
		inner.pos = value.min(inner.len);
		redraw(&mut inner, false);
	}

	fn inc(&mut self, value: u64) {
		let mut inner = self.inner.lock().unwrap();
		inner.pos = inner.pos.saturating_add(value).min(inner.len);
		redraw(&mut inner, false);
	}

	fn finish(&mut self) {
		let mut inner = self.inner.lock().unwrap();
		inner.pos = inner.len;
		inner.finished = true;
		redraw(&mut inner, true);
		let mut stderr = io::stderr();
		let _ = stderr.write_all(b"\n");
		let _ = stderr.flush();
	}

	fn remove(&mut self) {
		let mut inner = self.inner.lock().unwrap();
		inner.finished = true;
		drop(inner);
		let mut stderr = io::stderr();
		let _ = stderr.write_all(b"\r\x1b[2K");
		let _ = stderr.flush();
	}
}

fn redraw(inner: &mut Inner, force: bool) {
	if !force && inner.last_draw.elapsed() < REDRAW_INTERVAL {
		return;
	}
	inner.last_draw = Instant::now();

	let len = inner.len.max(1);
	let pos = inner.pos.min(len);
	let elapsed = inner.start.elapsed().as_secs_f64();
	let per_sec = if elapsed > 0.0 { pos as f64 / elapsed } else { 0.0 };
	let eta = if per_sec > 0.0 {
		Duration::from_secs_f64((len - pos) as f64 / per_sec)
	} else {
		Duration::ZERO
	};
	let percent = pos * 100 / len;

	let right = format!(
		" {pos}/{len} ({percent:>3}%) {:>7} {:>5}",
		format_rate(per_sec),
		format_eta(eta)
	);
	let width = bar_width(&inner.message, &right);
	let filled = (pos as f64 / len as f64 * width as f64).round() as usize;

	let mut line = String::new();
	let _ = write!(&mut line, "{}▕", inner.message);
	for i in 0..width {
		line.push(if i < filled { '█' } else { ' ' });
	}
	let _ = write!(&mut line, "▏{right}");

	let mut stderr = io::stderr();
	let _ = write!(stderr, "\r\x1b[2K{line}");
	let _ = stderr.flush();
}

// Prefer $COLUMNS, fall back to 80 columns.
fn bar_width(message: &str, right: &str) -> usize {
	let total = env::var("COLUMNS")
		.ok()
		.and_then(|v| v.parse::<usize>().ok())
		.unwrap_or(80)
		.max(20);
	let taken = message.chars().count() + right.chars().count() + 2;
	if total > taken + 10 { total - taken } else { 10 }
}

fn format_rate(per_sec: f64) -> String {
	if per_sec >= 1_000_000.0 {
		format!("{:.1}M/s", per_sec / 1_000_000.0)
	} else if per_sec >= 1_000.0 {
		format!("{:.1}k/s", per_sec / 1_000.0)
	} else {
		format!("{per_sec:.0}/s")
	}
}

fn format_eta(eta: Duration) -> String {
	let total = eta.as_secs();
	let (h, m, s) = (total / 3600, (total % 3600) / 60, total % 60);
	if h > 0 {
		format!("{h}:{m:02}:{s:02}")
	} else {
		format!("{m:02}:{s:02}")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn positions_are_clamped_to_len() {
		let mut progress = ProgressBar::new();
		progress.init("test", 100);
		progress.set_position(50);
		progress.inc(200);
		assert_eq!(progress.inner.lock().unwrap().pos, 100);
	}

	#[test]
	fn finish_fills_the_bar() {
		let mut progress = ProgressBar::new();
		progress.init("test", 10);
		progress.inc(3);
		progress.finish();
		let inner = progress.inner.lock().unwrap();
		assert_eq!(inner.pos, 10);
		assert!(inner.finished);
	}

	#[test]
	fn rate_and_eta_formatting() {
		assert_eq!(format_rate(12.0), "12/s");
		assert_eq!(format_rate(2500.0), "2.5k/s");
		assert_eq!(format_eta(Duration::from_secs(75)), "01:15");
		assert_eq!(format_eta(Duration::from_secs(3700)), "1:01:40");
	}
}
