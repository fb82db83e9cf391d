//! Application configuration for coursepath.
//!
//! User config lives at `~/.coursepath/coursepath.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoursePathError, Result};
use crate::types::Term;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "coursepath.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".coursepath";

// ---------------------------------------------------------------------------
// Config structs (matching coursepath.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Dataset locations and output defaults.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// Requirement matching policy.
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Remaining-course planning policy.
    #[serde(default)]
    pub planning: PlanningConfig,
}

/// `[defaults]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Requirement schema file (JSON or TOML).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_path: Option<String>,

    /// Course-offerings index file (JSON or TOML).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_path: Option<String>,

    /// Output format: "text" or "json".
    #[serde(default = "default_format")]
    pub format: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            schema_path: None,
            index_path: None,
            format: default_format(),
        }
    }
}

fn default_format() -> String {
    "text".into()
}

/// What to do when the same course appears in several terms.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RetakePolicy {
    /// Keep every listing.
    #[default]
    KeepAll,
    /// Keep the listing that counts toward requirements, latest term first.
    KeepBest,
}

/// `[matching]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Credit in-progress courses toward requirement slots.
    #[serde(default = "default_true")]
    pub count_in_progress: bool,

    /// Credit incomplete (`I`) grades toward requirement slots.
    #[serde(default)]
    pub count_incomplete: bool,

    #[serde(default)]
    pub retake_policy: RetakePolicy,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            count_in_progress: true,
            count_incomplete: false,
            retake_policy: RetakePolicy::KeepAll,
        }
    }
}

fn default_true() -> bool {
    true
}

/// `[planning]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanningConfig {
    /// Drop offerings earlier than this term label (e.g. "Autumn 2025").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before_term: Option<String>,

    /// Cap on candidates listed per outstanding slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_candidates_per_slot: Option<usize>,
}

impl PlanningConfig {
    /// Resolve `not_before_term` into a [`Term`].
    pub fn not_before(&self) -> Result<Option<Term>> {
        self.not_before_term
            .as_deref()
            .map(|label| {
                Term::parse(label).ok_or_else(|| {
                    CoursePathError::config(format!("invalid planning.not_before_term '{label}'"))
                })
            })
            .transpose()
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.coursepath/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CoursePathError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.coursepath/coursepath.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| CoursePathError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        CoursePathError::config(format!("failed to parse {}: {e}", path.display()))
    })?;

    // Surface a bad term label at load time rather than mid-pipeline.
    config.planning.not_before()?;

    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CoursePathError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CoursePathError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CoursePathError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Season;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("count_in_progress = true"));
        assert!(toml_str.contains("retake_policy = \"keep-all\""));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.defaults.format, "text");
        assert!(parsed.matching.count_in_progress);
        assert!(!parsed.matching.count_incomplete);
    }

    #[test]
    fn config_with_policies() {
        let toml_str = r#"
[defaults]
schema_path = "/data/requirements.json"

[matching]
count_in_progress = false
retake_policy = "keep-best"

[planning]
not_before_term = "Winter 2026"
max_candidates_per_slot = 5
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(
            config.defaults.schema_path.as_deref(),
            Some("/data/requirements.json")
        );
        assert!(!config.matching.count_in_progress);
        assert_eq!(config.matching.retake_policy, RetakePolicy::KeepBest);
        assert_eq!(config.planning.max_candidates_per_slot, Some(5));
        assert_eq!(
            config.planning.not_before().expect("term"),
            Some(Term::new(Season::Winter, 2026))
        );
    }

    #[test]
    fn invalid_not_before_term_is_a_config_error() {
        let planning = PlanningConfig {
            not_before_term: Some("someday".into()),
            max_candidates_per_slot: None,
        };
        let err = planning.not_before().unwrap_err();
        assert!(err.to_string().contains("not_before_term"));
    }
}
