//! Sync pipeline: content rewriting, incremental download, watch loop.

pub mod rewrite;
pub mod sync;
pub mod watch;

pub use rewrite::ContentRewriter;
pub use sync::SyncEngine;
pub use watch::watch;
