use crate::model::TargetType;
use anyhow::{Context, Result};
use chrono::TimeDelta;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Directory under the project root holding the catalog and its config.
pub const CATALOG_DIR: &str = ".tally";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub voting: VotingConfig,
    #[serde(default)]
    pub edits: EditConfig,
    #[serde(default)]
    pub fingerprints: FingerprintConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingConfig {
    /// Net votes needed to accept (or reject) an edit. Zero disables
    /// vote-driven resolution.
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: u32,
    #[serde(default = "default_voting_period_secs")]
    pub voting_period_secs: u64,
    #[serde(default = "default_min_destructive_voting_period_secs")]
    pub min_destructive_voting_period_secs: u64,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            accept_threshold: default_accept_threshold(),
            voting_period_secs: default_voting_period_secs(),
            min_destructive_voting_period_secs: default_min_destructive_voting_period_secs(),
        }
    }
}

impl VotingConfig {
    #[must_use]
    pub fn voting_period(&self) -> TimeDelta {
        seconds(self.voting_period_secs)
    }

    #[must_use]
    pub fn min_destructive_voting_period(&self) -> TimeDelta {
        seconds(self.min_destructive_voting_period_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditConfig {
    /// How many times an owner may amend a pending edit.
    #[serde(default = "default_update_limit")]
    pub update_limit: u32,
    #[serde(default = "default_enabled_targets")]
    pub enabled_targets: Vec<TargetType>,
}

impl Default for EditConfig {
    fn default() -> Self {
        Self {
            update_limit: default_update_limit(),
            enabled_targets: default_enabled_targets(),
        }
    }
}

impl EditConfig {
    #[must_use]
    pub fn is_enabled(&self, target_type: TargetType) -> bool {
        self.enabled_targets.contains(&target_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerprintConfig {
    #[serde(default = "default_max_batch")]
    pub max_batch: usize,
    #[serde(default = "default_max_scene_batch")]
    pub max_scene_batch: usize,
    /// Maximum Hamming distance for perceptual hash matches; 0 means exact.
    #[serde(default)]
    pub phash_distance: u32,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            max_batch: default_max_batch(),
            max_scene_batch: default_max_scene_batch(),
            phash_distance: 0,
        }
    }
}

/// Per-user settings from the platform config directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    /// Default identity when neither `--user` nor `TALLY_USER` is set.
    #[serde(default)]
    pub user: Option<String>,
}

/// Load `.tally/config.toml`, falling back to defaults when it is absent.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<CatalogConfig> {
    let path = project_root.join(CATALOG_DIR).join("config.toml");
    if !path.exists() {
        return Ok(CatalogConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<CatalogConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Load `<config dir>/tally/config.toml`, falling back to defaults.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("tally/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Render a config as TOML, used to seed `.tally/config.toml` on init.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn to_toml(config: &CatalogConfig) -> Result<String> {
    toml::to_string_pretty(config).context("serialize catalog config")
}

fn seconds(secs: u64) -> TimeDelta {
    i64::try_from(secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .unwrap_or(TimeDelta::MAX)
}

const fn default_accept_threshold() -> u32 {
    3
}

const fn default_voting_period_secs() -> u64 {
    7 * 24 * 60 * 60
}

const fn default_min_destructive_voting_period_secs() -> u64 {
    2 * 24 * 60 * 60
}

const fn default_update_limit() -> u32 {
    1
}

fn default_enabled_targets() -> Vec<TargetType> {
    TargetType::ALL.to_vec()
}

const fn default_max_batch() -> usize {
    100
}

const fn default_max_scene_batch() -> usize {
    40
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        let config = load_project_config(dir.path()).expect("load");
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.voting.accept_threshold, 3);
        assert_eq!(config.fingerprints.max_batch, 100);
        assert_eq!(config.fingerprints.max_scene_batch, 40);
        assert!(config.edits.is_enabled(TargetType::Scene));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join(CATALOG_DIR)).expect("mkdir");
        std::fs::write(
            dir.path().join(CATALOG_DIR).join("config.toml"),
            "[voting]\naccept_threshold = 0\n\n[edits]\nenabled_targets = [\"tag\"]\n",
        )
        .expect("write config");

        let config = load_project_config(dir.path()).expect("load");
        assert_eq!(config.voting.accept_threshold, 0);
        assert_eq!(config.voting.voting_period_secs, 604_800);
        assert!(config.edits.is_enabled(TargetType::Tag));
        assert!(!config.edits.is_enabled(TargetType::Performer));
        assert_eq!(config.edits.update_limit, 1);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(dir.path().join(CATALOG_DIR)).expect("mkdir");
        std::fs::write(
            dir.path().join(CATALOG_DIR).join("config.toml"),
            "[voting\naccept_threshold = 3",
        )
        .expect("write config");

        let err = load_project_config(dir.path()).expect_err("must fail");
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn defaults_round_trip_through_toml() {
        let rendered = to_toml(&CatalogConfig::default()).expect("render");
        let parsed: CatalogConfig = toml::from_str(&rendered).expect("parse");
        assert_eq!(parsed, CatalogConfig::default());
    }

    #[test]
    fn huge_periods_saturate() {
        let voting = VotingConfig {
            voting_period_secs: u64::MAX,
            ..VotingConfig::default()
        };
        assert_eq!(voting.voting_period(), TimeDelta::MAX);
    }
}
