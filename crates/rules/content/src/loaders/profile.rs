//! Profile catalog loader: profiles with their paths and capacities.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::formats::ProfileDef;
use crate::loaders::{LoadResult, read_file};

/// Profile catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileCatalog {
    pub profiles: Vec<ProfileDef>,
}

/// Loader for the profile catalog from RON files.
pub struct ProfileLoader;

impl ProfileLoader {
    /// Load the profile catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<ProfileDef>> {
        let content = read_file(path)?;
        let catalog: ProfileCatalog = ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse profile catalog RON: {}", e))?;

        Ok(catalog.profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules_core::ArchetypeFamily;
    use std::io::Write;

    #[test]
    fn parses_a_profile_with_a_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(
    profiles: [
        (
            name: "Warrior",
            family: Warrior,
            paths: [
                (
                    name: "Path of the Blade",
                    capacities: [
                        (name: "Overhand Strike"),
                        (name: "Iron Skin", modifiers: [
                            (target: Combat(Defense), value: Literal(1)),
                        ]),
                    ],
                ),
            ],
        ),
    ],
)"#
        )
        .unwrap();

        let profiles = ProfileLoader::load(file.path()).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].family, ArchetypeFamily::Warrior);
        assert_eq!(profiles[0].paths[0].capacities.len(), 2);
        assert_eq!(profiles[0].paths[0].capacities[1].modifiers.len(), 1);
    }
}
