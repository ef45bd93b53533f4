use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub domain: DomainConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub fetch: FetchConfig,

    #[serde(default)]
    pub youtube: YoutubeConfig,

    #[serde(default)]
    pub feeds: Vec<FeedConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainConfig {
    #[serde(default = "default_focus")]
    pub focus: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub directory: String,

    #[serde(default = "default_reading_time")]
    pub reading_time_minutes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_days_back")]
    pub days_back: u32,

    #[serde(default = "default_feed_timeout")]
    pub feed_timeout_secs: u64,

    #[serde(default = "default_min_items")]
    pub min_items: usize,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoutubeConfig {
    #[serde(default)]
    pub urls: Vec<String>,

    #[serde(default = "default_transcript_dir")]
    pub transcript_dir: String,
}

/// One configured feed source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<Vec<String>>,
}

impl FeedConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
            max_items: None,
            keywords: None,
        }
    }

    /// Configured name, or a positional label for the 1-based `position`.
    pub fn display_name(&self, position: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("Feed {position}"))
    }
}

fn default_focus() -> String {
    "drug discovery".to_string()
}

fn default_model() -> String {
    "anthropic/claude-sonnet-4-20250514".to_string()
}

fn default_output_dir() -> String {
    "~/distils".to_string()
}

fn default_reading_time() -> u32 {
    5
}

fn default_days_back() -> u32 {
    7
}

fn default_feed_timeout() -> u64 {
    30
}

fn default_min_items() -> usize {
    1
}

fn default_batch_size() -> usize {
    3
}

fn default_transcript_dir() -> String {
    "transcripts".to_string()
}

impl Default for DomainConfig {
    fn default() -> Self {
        Self {
            focus: default_focus(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key: None,
            base_url: None,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            reading_time_minutes: default_reading_time(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            days_back: default_days_back(),
            feed_timeout_secs: default_feed_timeout(),
            min_items: default_min_items(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            transcript_dir: default_transcript_dir(),
        }
    }
}

impl Config {
    /// Loads the config at `path`, or at the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::config_path);

        if !config_path.exists() {
            return Err(AppError::Config(format!(
                "config file not found: {} (run `distil init` to create one)",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config = Self::from_toml(&content)?;
        tracing::debug!(
            "Loaded config from {} ({} feeds)",
            config_path.display(),
            config.feeds.len()
        );
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.fetch.batch_size == 0 {
            return Err(AppError::Config("fetch.batch_size must be at least 1".into()));
        }
        if let Some(i) = config.feeds.iter().position(|f| f.url.trim().is_empty()) {
            return Err(AppError::Config(format!("feed {} has an empty url", i + 1)));
        }
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// `./config.toml` when present, otherwise the per-user config directory.
    pub fn config_path() -> PathBuf {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("distil")
            .join(CONFIG_FILE_NAME)
    }

    /// Starter configuration written by `distil init`.
    pub fn sample() -> Self {
        Self {
            feeds: vec![
                FeedConfig {
                    url: "https://www.nature.com/nature.rss".to_string(),
                    name: Some("Nature".to_string()),
                    max_items: Some(10),
                    keywords: None,
                },
                FeedConfig {
                    url: "https://www.biorxiv.org/rss/subject/bioinformatics".to_string(),
                    name: Some("bioRxiv Bioinformatics".to_string()),
                    max_items: Some(15),
                    keywords: Some(vec!["drug".to_string(), "protein".to_string()]),
                },
            ],
            ..Self::default()
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        expand_home(&self.output.directory)
    }

    pub fn transcript_dir(&self) -> PathBuf {
        expand_home(&self.youtube.transcript_dir)
    }
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let home = || dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));
    if path == "~" {
        home()
    } else if let Some(rest) = path.strip_prefix("~/") {
        home().join(rest)
    } else {
        PathBuf::from(path)
    }
}
