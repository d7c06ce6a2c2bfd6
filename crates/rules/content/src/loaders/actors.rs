//! Actor catalog loader: pre-built character sheets and encounters.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::formats::{CharacterSpec, EncounterDef};
use crate::loaders::{LoadResult, read_file};

/// Character catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterCatalog {
    pub characters: Vec<CharacterSpec>,
}

/// Encounter catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncounterCatalog {
    pub encounters: Vec<EncounterDef>,
}

/// Loader for actor catalogs from RON files.
pub struct ActorLoader;

impl ActorLoader {
    /// Load the character sheet catalog from a RON file.
    pub fn load_characters(path: &Path) -> LoadResult<Vec<CharacterSpec>> {
        let content = read_file(path)?;
        let catalog: CharacterCatalog = ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse character catalog RON: {}", e))?;

        Ok(catalog.characters)
    }

    /// Load the encounter catalog from a RON file.
    pub fn load_encounters(path: &Path) -> LoadResult<Vec<EncounterDef>> {
        let content = read_file(path)?;
        let catalog: EncounterCatalog = ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse encounter catalog RON: {}", e))?;

        Ok(catalog.encounters)
    }
}
