//! Configuration for reelforge.
//!
//! Configuration sources (highest priority first):
//! 1. Command-line overrides (applied by the CLI)
//! 2. Environment variables (REELFORGE_HOME, API credentials)
//! 3. Config file (.reelforge/config.yaml)
//! 4. Defaults (~/.reelforge)
//!
//! Config file discovery:
//! - Searches current directory and parents for .reelforge/config.yaml
//! - Paths in config file are relative to the .reelforge/ directory
//!
//! The resolved [`Config`] is built once and handed to each component's
//! constructor; nothing reads it from global state.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Directory holding the config file, searched for upwards from cwd
pub const CONFIG_DIR: &str = ".reelforge";

/// Environment variable names
pub const ENV_HOME: &str = "REELFORGE_HOME";
pub const ENV_ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_HF_TOKEN: &str = "HF_TOKEN";
pub const ENV_YOUTUBE_ACCESS_TOKEN: &str = "YOUTUBE_ACCESS_TOKEN";

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub content: Option<ContentConfig>,
    #[serde(default)]
    pub models: Option<ModelsConfig>,
    #[serde(default)]
    pub video: Option<VideoConfig>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub publish: Option<PublishConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PathsConfig {
    /// State directory (relative to .reelforge/)
    pub home: Option<String>,
    /// Ledger file (relative to .reelforge/)
    pub ledger: Option<String>,
    /// Transient artifact directory (relative to .reelforge/)
    pub artifacts: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentConfig {
    pub niche: Option<String>,
    pub num_ideas: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelsConfig {
    pub text: Option<String>,
    pub video: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VideoConfig {
    pub duration_secs: Option<u32>,
    pub fps: Option<u32>,
    pub height: Option<u32>,
    pub width: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub max_attempts: Option<u32>,
    pub base_wait_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishConfig {
    pub privacy_status: Option<String>,
    pub category_id: Option<String>,
}

/// Resolved configuration with absolute paths
#[derive(Debug, Clone)]
pub struct Config {
    /// Absolute path to reelforge home (state)
    pub home: PathBuf,
    /// Ledger file (JSONL)
    pub ledger_path: PathBuf,
    /// Where rendered videos live until published
    pub artifacts_dir: PathBuf,
    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
    pub content: ContentSettings,
    pub text_model: TextModelSettings,
    pub video: VideoSettings,
    pub retry: RetrySettings,
    pub publish: PublishSettings,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub niche: String,
    pub num_ideas: usize,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            niche: "motivation and self-improvement".to_string(),
            num_ideas: 3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TextModelSettings {
    pub model: String,
    pub api_key: Option<String>,
}

impl Default for TextModelSettings {
    fn default() -> Self {
        Self {
            model: "claude-3-5-haiku-20241022".to_string(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct VideoSettings {
    pub model: String,
    pub duration_secs: u32,
    pub fps: u32,
    pub height: u32,
    pub width: u32,
    pub api_token: Option<String>,
}

impl Default for VideoSettings {
    fn default() -> Self {
        Self {
            model: "ali-vilab/text-to-video-ms-1.7b".to_string(),
            duration_secs: 8,
            fps: 8,
            height: 576,
            width: 1024,
            api_token: None,
        }
    }
}

impl VideoSettings {
    /// Frames requested from the render model
    pub fn num_frames(&self) -> u32 {
        self.duration_secs * self.fps
    }
}

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_wait_secs: u64,
    pub timeout_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_wait_secs: 20,
            timeout_secs: 300,
        }
    }
}

impl RetrySettings {
    pub fn base_wait(&self) -> Duration {
        Duration::from_secs(self.base_wait_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone)]
pub struct PublishSettings {
    pub access_token: Option<String>,
    pub privacy_status: String,
    pub category_id: String,
}

impl Default for PublishSettings {
    fn default() -> Self {
        Self {
            access_token: None,
            privacy_status: "public".to_string(),
            // People & Blogs
            category_id: "22".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the config file (if any) and the process environment
    pub fn load() -> Result<Self> {
        let config_file = find_config_file();
        let parsed = match config_file {
            Some(ref path) => Some((path.clone(), load_config_file(path)?)),
            None => None,
        };
        Self::resolve(parsed, |key| std::env::var(key).ok())
    }

    /// Build a config from an optional parsed file and an environment lookup
    pub fn resolve<F>(file: Option<(PathBuf, ConfigFile)>, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let default_home = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(CONFIG_DIR);

        let (config_file, parsed) = match file {
            Some((path, parsed)) => (Some(path), parsed),
            None => (None, ConfigFile::default()),
        };

        // Relative paths in the file resolve against .reelforge/
        let config_dir = config_file
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf);

        let home = if let Some(env_home) = env(ENV_HOME) {
            PathBuf::from(env_home)
        } else if let (Some(dir), Some(home)) = (&config_dir, &parsed.paths.home) {
            resolve_path(dir, home)
        } else {
            default_home
        };

        let ledger_path = match (&config_dir, &parsed.paths.ledger) {
            (Some(dir), Some(ledger)) => resolve_path(dir, ledger),
            _ => home.join("ledger.jsonl"),
        };

        let artifacts_dir = match (&config_dir, &parsed.paths.artifacts) {
            (Some(dir), Some(artifacts)) => resolve_path(dir, artifacts),
            _ => home.join("artifacts"),
        };

        let mut content = ContentSettings::default();
        if let Some(c) = parsed.content {
            content.niche = c.niche.unwrap_or(content.niche);
            content.num_ideas = c.num_ideas.unwrap_or(content.num_ideas);
        }

        let mut text_model = TextModelSettings::default();
        let mut video = VideoSettings::default();
        if let Some(models) = parsed.models {
            text_model.model = models.text.unwrap_or(text_model.model);
            video.model = models.video.unwrap_or(video.model);
        }
        if let Some(v) = parsed.video {
            video.duration_secs = v.duration_secs.unwrap_or(video.duration_secs);
            video.fps = v.fps.unwrap_or(video.fps);
            video.height = v.height.unwrap_or(video.height);
            video.width = v.width.unwrap_or(video.width);
        }
        text_model.api_key = env(ENV_ANTHROPIC_API_KEY);
        video.api_token = env(ENV_HF_TOKEN);

        let mut retry = RetrySettings::default();
        if let Some(r) = parsed.retry {
            retry.max_attempts = r.max_attempts.unwrap_or(retry.max_attempts);
            retry.base_wait_secs = r.base_wait_secs.unwrap_or(retry.base_wait_secs);
            retry.timeout_secs = r.timeout_secs.unwrap_or(retry.timeout_secs);
        }

        let mut publish = PublishSettings::default();
        if let Some(p) = parsed.publish {
            publish.privacy_status = p.privacy_status.unwrap_or(publish.privacy_status);
            publish.category_id = p.category_id.unwrap_or(publish.category_id);
        }
        publish.access_token = env(ENV_YOUTUBE_ACCESS_TOKEN);

        Ok(Self {
            home,
            ledger_path,
            artifacts_dir,
            config_file,
            content,
            text_model,
            video,
            retry,
            publish,
        })
    }

    /// Anthropic API key, required for idea and prompt generation
    pub fn anthropic_api_key(&self) -> Result<&str> {
        self.text_model
            .api_key
            .as_deref()
            .with_context(|| format!("{} environment variable required", ENV_ANTHROPIC_API_KEY))
    }

    /// Hugging Face token, required for rendering
    pub fn hf_token(&self) -> Result<&str> {
        self.video
            .api_token
            .as_deref()
            .with_context(|| format!("{} environment variable required", ENV_HF_TOKEN))
    }

    /// YouTube OAuth access token, required for publishing
    pub fn youtube_access_token(&self) -> Result<&str> {
        self.publish
            .access_token
            .as_deref()
            .with_context(|| {
                format!("{} environment variable required", ENV_YOUTUBE_ACCESS_TOKEN)
            })
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(CONFIG_DIR).join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}
