use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Project file opened when no path is given on the command line
    pub project_path: PathBuf,
    #[serde(default)]
    pub card: CardDefaults,
}

/// Settings for newly created cards
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardDefaults {
    pub width: u32,
    pub padding: String,
    pub font_family: String,
    pub font_size: String,
    pub color: String,
    pub line_height: f64,
    pub background_color: String,
    pub placeholder: String,
}

impl Default for CardDefaults {
    fn default() -> Self {
        Self {
            width: 600,
            padding: "40px".to_string(),
            font_family: "Inter, sans-serif".to_string(),
            font_size: "16px".to_string(),
            color: "#000000".to_string(),
            line_height: 1.5,
            background_color: "#ffffff".to_string(),
            placeholder: "Start editing your card...".to_string(),
        }
    }
}

impl Config {
    pub fn new(project_path: PathBuf) -> Self {
        Self {
            project_path,
            card: CardDefaults::default(),
        }
    }

    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| ConfigError::ConfigReadError {
            config_path: config_path.to_path_buf(),
            source,
        })?;

        let mut config: Config = toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
            config_path: config_path.to_path_buf(),
            source,
        })?;

        config.project_path = Self::expand_path(&config.project_path).unwrap_or(config.project_path);

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(Self::config_path())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to_path(Self::config_path())
    }

    pub fn config_dir() -> PathBuf {
        PathBuf::from(shellexpand::tilde("~/.config/cardmark").as_ref())
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Where the terminal front end writes its log
    pub fn log_path() -> PathBuf {
        Self::config_dir().join("cardmark.log")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        shellexpand::full(&path_str)
            .ok()
            .map(|expanded| PathBuf::from(expanded.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let path_str = Config::config_path().to_string_lossy().into_owned();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/cardmark/config.toml"));
        assert_eq!(Config::log_path().parent(), Config::config_path().parent());
    }

    #[test]
    fn test_card_defaults_fill_missing_fields() {
        let config: Config = toml::from_str(
            r#"
project_path = "/tmp/cards.json"

[card]
width = 800
"#,
        )
        .unwrap();

        assert_eq!(config.card.width, 800);
        assert_eq!(config.card.padding, "40px");
        assert_eq!(config.card.line_height, 1.5);
        assert_eq!(config.card.placeholder, "Start editing your card...");
    }

    #[test]
    fn test_card_section_is_optional() {
        let config: Config = toml::from_str(r#"project_path = "/tmp/cards.json""#).unwrap();
        assert_eq!(config, Config::new(PathBuf::from("/tmp/cards.json")));
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path(&PathBuf::from("~/cards/project.json")).unwrap();

        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("cards/project.json"));
    }

    #[test]
    fn test_expand_path_with_env_var() {
        unsafe {
            env::set_var("CARDMARK_TEST_ROOT", "/test/env/path");
        }

        let expanded = Config::expand_path(&PathBuf::from("$CARDMARK_TEST_ROOT/cards.json")).unwrap();
        assert_eq!(expanded, PathBuf::from("/test/env/path/cards.json"));

        unsafe {
            env::remove_var("CARDMARK_TEST_ROOT");
        }
    }

    #[test]
    fn test_relative_path_is_kept() {
        let path = PathBuf::from("relative/cards.json");
        assert_eq!(Config::expand_path(&path).unwrap(), path);
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let result = Config::load_from_path(temp_dir.path().join("nonexistent.toml")).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_config_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "project_path = 3").unwrap();

        assert!(matches!(
            Config::load_from_path(&config_file),
            Err(ConfigError::ConfigParseError { .. })
        ));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut config = Config::new(PathBuf::from("/tmp/cards.json"));
        config.card.background_color = "#222222".to_string();

        config.save_to_path(&config_file).unwrap();
        let loaded = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded, config);
    }
}
