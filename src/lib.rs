//! gphotos-sync-rs: local sync state for a remote photo library.
//!
//! Keeps an SQLite index of every remote media item, the collision-free
//! local name chosen for it and whether it has been downloaded. Local names
//! are sanitized for the filesystem under the sync root, whose capabilities
//! are probed once at startup.

#![warn(clippy::all)]

pub mod cli;
pub mod config;
pub mod dates;
pub mod filesystem;
pub mod indexer;
pub mod media;
pub mod state;
pub mod types;
