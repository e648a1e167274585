//! Terminal display utilities for the CLI.

pub mod progress;

pub use progress::create_progress_bar;
