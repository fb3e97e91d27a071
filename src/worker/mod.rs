//! Process launch layer.
//!
//! Spawns one OS process per admitted job with piped stdout/stderr and a
//! shared environment. Pipes are drained by background tasks from the moment
//! of launch so a child producing large output never blocks on a full pipe;
//! the captured bytes are collected at reap time.

pub mod launcher;

pub use launcher::ProcessLauncher;
