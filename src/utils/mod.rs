//! Shared helpers for Arrow value extraction and progress reporting

pub mod arrow_utils;
pub mod progress;

pub use arrow_utils::{arrow_array_to_f64, arrow_array_to_string};
pub use progress::create_main_progress_bar;
