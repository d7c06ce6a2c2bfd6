//! Content loaders for reading ruleset data from files.
//!
//! This module provides loaders that convert RON/TOML files into the
//! formats defined in [`crate::formats`], plus the builders that assemble
//! `rules-core` actors out of them.

pub mod actors;
pub mod config;
pub mod factory;
pub mod item;
pub mod profile;

pub use actors::ActorLoader;
pub use config::ConfigLoader;
pub use factory::{ContentFactory, build_character, build_encounter};
pub use item::EquipmentLoader;
pub use profile::ProfileLoader;

use std::path::Path;

/// Common result type for loaders.
pub type LoadResult<T> = anyhow::Result<T>;

/// Helper function to read file contents.
pub(crate) fn read_file(path: &Path) -> LoadResult<String> {
    std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Failed to read file {}: {}", path.display(), e))
}
