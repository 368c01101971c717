//! Configuration management for probe.
//!
//! Loads configuration from ${PROBE_HOME}/config.toml with sensible defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::backend::ClientConfig;

/// Per-request deadlines in seconds. Zero disables a deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub health_check: u64,
    pub api_validation: u64,
    pub standard_generation: u64,
    /// Bounds the entire stream body, not only connection setup
    pub stream_generation: u64,
    pub vision_analysis: u64,
    /// Bounds the entire stream body, not only connection setup
    pub vision_stream: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            health_check: 10,
            api_validation: 15,
            standard_generation: 60,
            stream_generation: 120,
            vision_analysis: 90,
            vision_stream: 120,
        }
    }
}

/// Resolved per-operation deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub health_check: Option<Duration>,
    pub api_validation: Option<Duration>,
    pub standard_generation: Option<Duration>,
    pub stream_generation: Option<Duration>,
    pub vision_analysis: Option<Duration>,
    pub vision_stream: Option<Duration>,
}

impl From<&TimeoutsConfig> for Timeouts {
    fn from(config: &TimeoutsConfig) -> Self {
        let secs = |value: u64| (value > 0).then(|| Duration::from_secs(value));
        Self {
            health_check: secs(config.health_check),
            api_validation: secs(config.api_validation),
            standard_generation: secs(config.standard_generation),
            stream_generation: secs(config.stream_generation),
            vision_analysis: secs(config.vision_analysis),
            vision_stream: secs(config.vision_stream),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self::from(&TimeoutsConfig::default())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Diagnostic `tracing` filter directive (e.g. "warn", "probe_core=debug")
    pub level: String,
    /// Prefix operation log lines with a local timestamp
    pub show_timestamps: bool,
    /// Operation log lines kept in memory
    pub max_log_lines: usize,
    /// Optional file receiving diagnostics in addition to stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            show_timestamps: true,
            max_log_lines: 100,
            file: None,
        }
    }
}

fn default_questions() -> BTreeMap<String, String> {
    [
        ("simple", "Hello, please reply briefly"),
        (
            "complex",
            "Explain in detail the history of traditional Chinese divination and how it is used today",
        ),
        (
            "liuyao",
            "Use six-line (liuyao) divination to forecast today's fortune and explain the hexagram in detail",
        ),
        (
            "qimen",
            "Use Qimen Dunjia to analyze the current situation and suggest a strategy",
        ),
    ]
    .into_iter()
    .map(|(name, question)| (name.to_string(), question.to_string()))
    .collect()
}

fn default_vision_questions() -> BTreeMap<String, String> {
    [
        (
            "general",
            "Please analyze this image in detail and describe what you see",
        ),
        (
            "palm",
            "Please analyze this palm image and interpret the meaning of the lines",
        ),
        (
            "divination",
            "Is this image related to divination or fortune telling? Explain its meaning",
        ),
    ]
    .into_iter()
    .map(|(name, question)| (name.to_string(), question.to_string()))
    .collect()
}

/// Returns the default config template with comments.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for probe configuration.
    //!
    //! PROBE_HOME resolution order:
    //! 1. PROBE_HOME environment variable (if set)
    //! 2. ~/.config/probe (default)

    use std::path::PathBuf;

    /// Returns the probe home directory.
    pub fn probe_home() -> PathBuf {
        if let Ok(home) = std::env::var("PROBE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir().map_or_else(
            || PathBuf::from(".probe"),
            |h| h.join(".config").join("probe"),
        )
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        probe_home().join("config.toml")
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend under test
    pub backend_url: String,

    /// `maxTokens` sent with streaming generation requests
    pub stream_max_tokens: u32,

    #[serde(default)]
    pub timeouts: TimeoutsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Text question presets
    #[serde(default = "default_questions")]
    pub questions: BTreeMap<String, String>,

    /// Vision question presets
    #[serde(default = "default_vision_questions")]
    pub vision_questions: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: Self::DEFAULT_BACKEND_URL.to_string(),
            stream_max_tokens: Self::DEFAULT_STREAM_MAX_TOKENS,
            timeouts: TimeoutsConfig::default(),
            logging: LoggingConfig::default(),
            questions: default_questions(),
            vision_questions: default_vision_questions(),
        }
    }
}

impl Config {
    pub const DEFAULT_BACKEND_URL: &str = "http://localhost:3001";
    const DEFAULT_STREAM_MAX_TOKENS: u32 = 4096;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Builds the client configuration for one backend.
    ///
    /// `backend_override` (CLI flag or `PROBE_BACKEND_URL`) wins over the
    /// config file.
    pub fn client_config(&self, backend_override: Option<&str>) -> Result<ClientConfig> {
        let base_url = resolve_backend_url(backend_override, &self.backend_url)?;
        Ok(ClientConfig {
            base_url,
            timeouts: Timeouts::from(&self.timeouts),
            stream_max_tokens: self.stream_max_tokens,
        })
    }

    /// Looks up a text question preset.
    pub fn question(&self, name: &str) -> Result<&str> {
        lookup_preset(&self.questions, name)
    }

    /// Looks up a vision question preset.
    pub fn vision_question(&self, name: &str) -> Result<&str> {
        lookup_preset(&self.vision_questions, name)
    }

    /// Creates a default config file at the given path.
    /// Returns an error if the file already exists.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Uses the embedded template for structure/comments and merges
    /// generated values from `Config::default()` into it.
    pub fn generate() -> Result<String> {
        use toml_edit::{DocumentMut, Item};

        fn merge(target: &mut toml_edit::Table, source: &toml_edit::Table) {
            for (key, value) in source.iter() {
                match value {
                    Item::Value(v) => {
                        target[key] = Item::Value(v.clone());
                    }
                    Item::Table(src_table) => {
                        if let Some(Item::Table(target_table)) = target.get_mut(key) {
                            merge(target_table, src_table);
                        } else {
                            target[key] = Item::Table(src_table.clone());
                        }
                    }
                    Item::ArrayOfTables(arr) => {
                        target[key] = Item::ArrayOfTables(arr.clone());
                    }
                    Item::None => {}
                }
            }
        }

        let config = Config::default();
        let generated_toml =
            toml::to_string(&config).context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;
        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        merge(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

fn lookup_preset<'a>(presets: &'a BTreeMap<String, String>, name: &str) -> Result<&'a str> {
    presets.get(name).map(String::as_str).with_context(|| {
        let known: Vec<&str> = presets.keys().map(String::as_str).collect();
        format!(
            "Unknown question preset '{name}'. Available: {}",
            known.join(", ")
        )
    })
}

/// Resolves the backend URL with precedence: override > config > default.
///
/// Trailing slashes are stripped so endpoint paths can be appended.
///
/// # Errors
/// Returns an error if the chosen URL does not parse.
pub fn resolve_backend_url(backend_override: Option<&str>, config_url: &str) -> Result<String> {
    let chosen = backend_override
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .or_else(|| Some(config_url.trim()).filter(|url| !url.is_empty()))
        .unwrap_or(Config::DEFAULT_BACKEND_URL);

    url::Url::parse(chosen).with_context(|| format!("Invalid backend URL: {chosen}"))?;
    Ok(chosen.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("nonexistent.toml");

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.backend_url, "http://localhost:3001");
        assert_eq!(config.stream_max_tokens, 4096);
    }

    #[test]
    fn test_load_partial_config_merges_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(
            &config_path,
            "backend_url = \"http://10.0.0.5:8080\"\n[timeouts]\nhealth_check = 3\n",
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.backend_url, "http://10.0.0.5:8080");
        assert_eq!(config.timeouts.health_check, 3);
        assert_eq!(config.timeouts.stream_generation, 120);
        assert_eq!(config.logging.max_log_lines, 100);
        assert!(config.questions.contains_key("simple"));
    }

    #[test]
    fn test_load_invalid_toml_fails() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");
        fs::write(&config_path, "backend_url = [").unwrap();

        let err = Config::load_from(&config_path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config"));
    }

    #[test]
    fn test_default_template_matches_defaults() {
        let parsed: Config = toml::from_str(default_config_template()).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_init_creates_config_with_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("subdir").join("config.toml");

        Config::init(&config_path).unwrap();

        assert!(config_path.exists());
        let contents = fs::read_to_string(&config_path).unwrap();
        assert!(contents.contains("backend_url = \"http://localhost:3001\""));
        assert!(contents.contains("# file ="));
    }

    #[test]
    fn test_init_fails_if_exists() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("config.toml");

        fs::write(&config_path, "").unwrap();

        let result = Config::init(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn test_generate_keeps_comments_and_values() {
        let generated = Config::generate().unwrap();
        assert!(generated.contains("# Backend under test."));
        assert!(generated.contains("# Stream deadlines cover the whole stream"));
        let parsed: Config = toml::from_str(&generated).unwrap();
        assert_eq!(parsed, Config::default());
    }

    #[test]
    fn test_resolve_backend_url_precedence() {
        assert_eq!(
            resolve_backend_url(Some("http://override:1/"), "http://config:2").unwrap(),
            "http://override:1"
        );
        assert_eq!(
            resolve_backend_url(Some("  "), "http://config:2").unwrap(),
            "http://config:2"
        );
        assert_eq!(
            resolve_backend_url(None, "").unwrap(),
            "http://localhost:3001"
        );
        assert!(resolve_backend_url(Some("not a url"), "http://config:2").is_err());
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let config = TimeoutsConfig {
            health_check: 0,
            ..TimeoutsConfig::default()
        };
        let timeouts = Timeouts::from(&config);
        assert_eq!(timeouts.health_check, None);
        assert_eq!(timeouts.api_validation, Some(Duration::from_secs(15)));
    }

    #[test]
    fn test_question_presets() {
        let config = Config::default();
        assert_eq!(config.question("simple").unwrap(), "Hello, please reply briefly");
        assert!(config.vision_question("palm").unwrap().contains("palm"));

        let err = config.question("missing").unwrap_err().to_string();
        assert!(err.contains("Unknown question preset 'missing'"));
        assert!(err.contains("simple"));
    }

    #[test]
    fn test_client_config_uses_override() {
        let config = Config::default();
        let client = config.client_config(Some("http://example.test:9000/")).unwrap();
        assert_eq!(client.base_url, "http://example.test:9000");
        assert_eq!(client.stream_max_tokens, 4096);
        assert_eq!(
            client.timeouts.vision_analysis,
            Some(Duration::from_secs(90))
        );
    }
}
