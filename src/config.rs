use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings a profile (or the `[defaults]` table) may provide;
/// command-line flags take precedence over all of them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Profile {
    pub drafts: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub batch_size: Option<i64>,
    pub cache_size: Option<i64>,
    pub max_conflict_retries: Option<u32>,
    pub chunk: Option<usize>,
    pub unique_fields: Option<Vec<String>>,
    pub check_references: Option<bool>,
    pub resource_label: Option<String>,
    pub verbose: Option<u8>,
    pub quiet: Option<bool>,
}

/// Contents of `<config_dir>/catsync/config.toml`
///
/// ```toml
/// [defaults]
/// batch_size = 50
///
/// [profiles.products]
/// drafts = "exports/products.json"
/// catalog = "catalog.json"
/// unique_fields = ["slug"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub defaults: Profile,
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        let dir = dirs::config_dir().context("Could not determine the config directory")?;
        Ok(dir.join("catsync").join("config.toml"))
    }

    /// Load the config file, or an empty config when there is none.
    /// `CATSYNC_CONFIG` overrides the default location.
    pub fn load() -> Result<Self> {
        let path = match std::env::var_os("CATSYNC_CONFIG") {
            Some(path) => PathBuf::from(path),
            None => Self::config_path()?,
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn list_profiles(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    /// Named profile layered over `[defaults]`
    pub fn get_profile(&self, name: &str) -> Option<Profile> {
        self.profiles
            .get(name)
            .map(|profile| profile.clone().or(&self.defaults))
    }

    pub fn show_profile(&self, name: &str) -> Option<String> {
        let profile = self.get_profile(name)?;
        let body = toml::to_string_pretty(&profile).ok()?;
        Some(format!("[profiles.{}]\n{}", name, body))
    }
}

impl Profile {
    /// Fill every unset setting from `fallback`
    pub fn or(self, fallback: &Profile) -> Profile {
        Profile {
            drafts: self.drafts.or_else(|| fallback.drafts.clone()),
            catalog: self.catalog.or_else(|| fallback.catalog.clone()),
            batch_size: self.batch_size.or(fallback.batch_size),
            cache_size: self.cache_size.or(fallback.cache_size),
            max_conflict_retries: self.max_conflict_retries.or(fallback.max_conflict_retries),
            chunk: self.chunk.or(fallback.chunk),
            unique_fields: self
                .unique_fields
                .or_else(|| fallback.unique_fields.clone()),
            check_references: self.check_references.or(fallback.check_references),
            resource_label: self
                .resource_label
                .or_else(|| fallback.resource_label.clone()),
            verbose: self.verbose.or(fallback.verbose),
            quiet: self.quiet.or(fallback.quiet),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SAMPLE: &str = r#"
[defaults]
batch_size = 50
cache_size = 200

[profiles.products]
drafts = "products.json"
catalog = "catalog.json"
batch_size = 10
unique_fields = ["slug"]

[profiles.types]
drafts = "types.json"
"#;

    #[test]
    fn test_missing_file_is_empty_config() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(config.list_profiles().is_empty());
    }

    #[test]
    fn test_profiles_inherit_defaults() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.list_profiles(), vec!["products", "types"]);

        let products = config.get_profile("products").unwrap();
        assert_eq!(products.batch_size, Some(10));
        assert_eq!(products.cache_size, Some(200));
        assert_eq!(products.unique_fields, Some(vec!["slug".to_string()]));

        let types = config.get_profile("types").unwrap();
        assert_eq!(types.batch_size, Some(50));
        assert_eq!(types.catalog, None);
        assert!(config.get_profile("missing").is_none());
    }

    #[test]
    fn test_show_profile() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let shown = config.show_profile("products").unwrap();
        assert!(shown.starts_with("[profiles.products]"));
        assert!(shown.contains("batch_size = 10"));
    }

    #[test]
    fn test_unknown_keys_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[profiles.bad]\nbatchsize = 3\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
