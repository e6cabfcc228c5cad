//! ABOUTME: Small filesystem and path helpers shared by the lineage, CLI, and
//! ABOUTME: agent crates — kept as their own crate so none of them has to
//! ABOUTME: depend on another for two small free functions
//!
//! This workspace's retrieved teacher tree has no standalone `*-utils`
//! crate of its own to ground this one on; it's instead grounded on the two
//! places this workspace already solved the same problems —
//! `forgeflow_lineage::FileLineageBackend::write_event`'s temp-file-then-
//! rename sequence and `forgeflow_agents::DiscoveryAgent::scan_dir`'s path
//! normalization — generalized into reusable functions so `forgeflow-cli`'s
//! workflow-state persistence doesn't have to duplicate either.

pub mod fs;
pub mod path;

pub use fs::{atomic_write, AtomicWriteError};
pub use path::{normalize_relative, to_forward_slash};
