//! File Watcher (C9): debounced, deduplicated filesystem change batches
//! that drive the Analysis Engine's incremental re-analysis.

pub mod watcher;

pub use watcher::{WatchEvent, WatcherService};
