//! Read-only library summaries, recomputed from current state on every call.

pub mod summary;

pub use summary::{LibrarySummary, summarize};
