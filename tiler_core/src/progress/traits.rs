/// Interface shared by the terminal progress bar and the silent drain.
pub trait ProgressTrait: Send + Sync {
	/// Creates a new, uninitialized instance.
	fn new() -> Self
	where
		Self: Sized;

	/// Sets the message and the maximum value.
	fn init(&mut self, message: &str, max_value: u64);

	/// Sets the absolute position.
	fn set_position(&mut self, value: u64);

	/// Advances the position by `value`.
	fn inc(&mut self, value: u64);

	/// Completes the progress and keeps the final line.
	fn finish(&mut self);

	/// Removes the progress line from the terminal.
	fn remove(&mut self);
}
