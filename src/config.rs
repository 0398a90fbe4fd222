//! TOML configuration.
//!
//! Every artifact and store location comes from the config file. Relative
//! paths are resolved against the directory containing the config file, once,
//! in [`load_config`], so the process never depends on its working directory.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub ratings: RatingsConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

/// Which pair of encoder/classifier implementations to load.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Fitted TF-IDF vectorizer plus a linear model, both exported as JSON.
    Linear,
    /// HuggingFace `tokenizer.json` plus an ONNX sequence classifier.
    Transformer,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Linear => "linear",
            Backend::Transformer => "transformer",
        }
    }
}

/// How a classifier label turns into a rating.
///
/// Required in every config; each deployed model states which convention it
/// was trained with.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LabelMapping {
    /// The label is the rating.
    Direct,
    /// The label is a zero-based class index; rating = label + 1.
    Offset,
}

impl LabelMapping {
    pub fn apply(&self, label: i64) -> i64 {
        match self {
            LabelMapping::Direct => label,
            LabelMapping::Offset => label + 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LabelMapping::Direct => "direct",
            LabelMapping::Offset => "offset",
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub backend: Backend,
    pub encoder_path: PathBuf,
    pub classifier_path: PathBuf,
    pub label_mapping: LabelMapping,
    /// Tokenizer truncation length (transformer backend).
    #[serde(default = "default_max_length")]
    pub max_length: usize,
    /// Width of the logits vector (transformer backend).
    #[serde(default = "default_num_labels")]
    pub num_labels: usize,
}

fn default_max_length() -> usize {
    256
}
fn default_num_labels() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct RatingsConfig {
    #[serde(default = "default_min_rating")]
    pub min: i64,
    #[serde(default = "default_max_rating")]
    pub max: i64,
}

impl Default for RatingsConfig {
    fn default() -> Self {
        Self {
            min: default_min_rating(),
            max: default_max_rating(),
        }
    }
}

fn default_min_rating() -> i64 {
    1
}
fn default_max_rating() -> i64 {
    5
}

impl RatingsConfig {
    pub fn contains(&self, rating: i64) -> bool {
        (self.min..=self.max).contains(&rating)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

impl Config {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.ratings.min > self.ratings.max {
            bail!(
                "ratings.min ({}) must be <= ratings.max ({})",
                self.ratings.min,
                self.ratings.max
            );
        }

        if self.model.max_length == 0 {
            bail!("model.max_length must be > 0");
        }

        if self.model.backend == Backend::Transformer && self.model.num_labels == 0 {
            bail!("model.num_labels must be > 0 for the transformer backend");
        }

        Ok(())
    }

    /// Rewrite relative paths so they are relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.db.path = resolve(base, &self.db.path);
        self.model.encoder_path = resolve(base, &self.model.encoder_path);
        self.model.classifier_path = resolve(base, &self.model.classifier_path);
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Parse and validate a config from TOML text, without touching paths.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let mut config = parse_config(&content)?;

    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    config.resolve_paths(base);

    Ok(config)
}
