//! Rules configuration loader.

use std::path::Path;

use rules_core::RulesConfig;

use crate::loaders::{LoadResult, read_file};

/// Loader for the rules configuration from TOML files.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load a [`RulesConfig`] from a TOML file.
    pub fn load(path: &Path) -> LoadResult<RulesConfig> {
        let content = read_file(path)?;
        let config: RulesConfig = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config TOML: {}", e))?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_tuned_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
base_defense = 12
base_initiative = 5
base_critical = 20
critical_floor = 16
base_fortune = 3
base_recovery = 5
base_movement = 10
level_bonus_cap = 10
combo_roll = true
difficulty_display = "All"
"#
        )
        .unwrap();

        let config = ConfigLoader::load(file.path()).unwrap();
        assert_eq!(config.base_defense, 12);
        assert_eq!(config.base_initiative, 5);
        assert!(config.combo_roll);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(ConfigLoader::load(Path::new("/nonexistent/config.toml")).is_err());
    }
}
