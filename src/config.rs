//! Configuration management
//!
//! Manages where state is stored, tutor pacing, custom correction rules and
//! the login requirement.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the state document lives
    #[serde(default)]
    pub storage: StorageConfig,
    /// Tutor behaviour
    #[serde(default)]
    pub tutor: TutorConfig,
    /// Login gating
    #[serde(default)]
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Override for the state file (defaults to the data directory)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TutorConfig {
    /// Pause between storing the learner's message and storing the reply
    #[serde(default = "default_reply_delay_ms")]
    pub reply_delay_ms: u64,
    /// How many recent corrections the dashboard shows
    #[serde(default = "default_recent_mistakes")]
    pub recent_mistakes: usize,
    /// Extra rules, checked after the built-in ones
    #[serde(default)]
    pub custom_rules: Vec<RuleConfig>,
}

fn default_reply_delay_ms() -> u64 {
    450
}

fn default_recent_mistakes() -> usize {
    4
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            reply_delay_ms: default_reply_delay_ms(),
            recent_mistakes: default_recent_mistakes(),
            custom_rules: Vec::new(),
        }
    }
}

impl TutorConfig {
    pub fn reply_delay(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.reply_delay_ms)
    }
}

/// A correction rule declared in `config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleConfig {
    pub name: String,
    pub category: String,
    /// Regex that triggers the rule and selects the span to rewrite
    pub pattern: String,
    /// Replacement for each match; `$1` refers to capture groups
    pub replacement: String,
    pub explanation: String,
    /// Regex that, when present anywhere, suppresses the rule
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unless: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Practice commands need a logged-in session
    #[serde(default = "default_true")]
    pub require_login: bool,
}

fn default_true() -> bool {
    true
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            require_login: true,
        }
    }
}

impl Config {
    /// Load configuration from the default location, creating it if missing
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if path.exists() {
            Self::load_from(&path)
        } else {
            let config = Config::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&contents)
            .context("Failed to parse config file")?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let parent = path.parent()
            .context("Config path has no parent")?;

        std::fs::create_dir_all(parent)
            .context("Failed to create config directory")?;

        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;

        std::fs::write(path, contents)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Resolved path of the state file
    pub fn state_path(&self) -> Result<PathBuf> {
        match &self.storage.state_file {
            Some(path) => Ok(path.clone()),
            None => crate::state::FileSlot::default_path(),
        }
    }
}

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "sparck", "sparck")
        .context("Failed to get project directories")
}

/// Get the configuration file path
pub fn config_path() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.toml"))
}

/// Get the data directory path
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

/// Show current configuration
pub fn show_config() -> Result<()> {
    let config = Config::load()?;

    println!("Configuration ({})", config_path()?.display());
    println!("  state file:       {}", config.state_path()?.display());
    println!("  reply delay:      {} ms", config.tutor.reply_delay_ms);
    println!("  recent mistakes:  {}", config.tutor.recent_mistakes);
    println!("  require login:    {}", config.auth.require_login);
    let engine = crate::tutor::CorrectionEngine::from_config(&config.tutor)?;
    println!("  active rules:     {}", engine.rule_names().join(", "));
    if config.tutor.custom_rules.is_empty() {
        println!("  custom rules:     none");
    } else {
        println!("  custom rules:");
        for rule in &config.tutor.custom_rules {
            println!("    - {} [{}] /{}/ -> {}", rule.name, rule.category, rule.pattern, rule.replacement);
        }
    }

    Ok(())
}

/// Get default configuration as TOML string
pub fn default_config_toml() -> String {
    toml::to_string_pretty(&Config::default()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tutor.reply_delay_ms, 450);
        assert_eq!(config.tutor.recent_mistakes, 4);
        assert!(config.tutor.custom_rules.is_empty());
        assert!(config.auth.require_login);
        assert!(config.storage.state_file.is_none());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str("[tutor]\nreply_delay_ms = 0\n").unwrap();
        assert_eq!(config.tutor.reply_delay_ms, 0);
        assert_eq!(config.tutor.recent_mistakes, 4);
        assert!(config.auth.require_login);
    }

    #[test]
    fn test_custom_rules_parse() {
        let raw = r#"
[storage]
state_file = "/tmp/sparck.json"

[[tutor.custom_rules]]
name = "merci"
category = "Spelling"
pattern = "(?i)mersi"
replacement = "merci"
explanation = "It is spelled 'merci'."

[[tutor.custom_rules]]
name = "bonne-nuit"
category = "Usage"
pattern = "(?i)bonne soir\\b"
replacement = "bonne soirée"
explanation = "Say 'bonne soirée'."
unless = "(?i)soirée"
"#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.state_path().unwrap(), PathBuf::from("/tmp/sparck.json"));
        assert_eq!(config.tutor.custom_rules.len(), 2);
        assert_eq!(config.tutor.custom_rules[0].unless, None);
        assert_eq!(config.tutor.custom_rules[1].unless.as_deref(), Some("(?i)soirée"));
    }

    #[test]
    fn test_save_and_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.tutor.reply_delay_ms = 10;
        config.auth.require_login = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.tutor.reply_delay_ms, 10);
        assert!(!loaded.auth.require_login);
    }

    #[test]
    fn test_default_toml_parses() {
        let toml = default_config_toml();
        let config: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config.tutor.reply_delay_ms, 450);
    }
}
