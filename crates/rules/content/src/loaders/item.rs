//! Equipment catalog loader.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::formats::EquipmentDef;
use crate::loaders::{LoadResult, read_file};

/// Equipment catalog structure for RON files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentCatalog {
    pub equipment: Vec<EquipmentDef>,
}

/// Loader for the equipment catalog from RON files.
pub struct EquipmentLoader;

impl EquipmentLoader {
    /// Load the equipment catalog from a RON file.
    pub fn load(path: &Path) -> LoadResult<Vec<EquipmentDef>> {
        let content = read_file(path)?;
        let catalog: EquipmentCatalog = ron::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse equipment catalog RON: {}", e))?;

        Ok(catalog.equipment)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rules_core::{EquipmentKind, ItemKind};
    use std::io::Write;

    #[test]
    fn parses_a_weapon_entry() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"(
    equipment: [
        (
            name: "Longsword",
            tags: ["blade"],
            kind: Weapon(hands: 1, ammo: None),
            actions: [
                (kind: Attack, activable: true, resolvers: [
                    (kind: Melee, skill: "@atc", dmg: "1d8 + @str"),
                ]),
            ],
        ),
    ],
)"#
        )
        .unwrap();

        let equipment = EquipmentLoader::load(file.path()).unwrap();
        assert_eq!(equipment.len(), 1);

        let item = equipment[0].build(true);
        assert_eq!(item.name, "Longsword");
        let ItemKind::Equipment(data) = &item.kind else {
            panic!("expected equipment");
        };
        assert!(data.equipped);
        assert!(matches!(data.kind, EquipmentKind::Weapon(weapon) if weapon.hands == 1));
        assert_eq!(item.actions.len(), 1);
        assert_eq!(item.actions[0].resolvers[0].dmg.formula, "1d8 + @str");
    }
}
