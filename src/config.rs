use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::DEFAULT_TTL;
use crate::controller::MAX_RETRIES;
use crate::db::{DocumentConfig, GraphConfig, PostgresConfig};
use crate::llm::LlmConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub max_retries: usize,
    pub cache_ttl_secs: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
        }
    }
}

impl EngineSettings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub postgres: PostgresConfig,
    pub graph: GraphConfig,
    pub document: DocumentConfig,
    pub llm: LlmConfig,
    pub engine: EngineSettings,
}

impl AppConfig {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("crossquery")
            .join("config.toml")
    }

    /// Load from `path` or the default location. A missing file yields the
    /// defaults; secrets left empty are filled from the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let default_path = Self::default_path();
        let path = path.unwrap_or(&default_path);
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config: {}", path.display()))?;
            Self::parse(&content)
                .with_context(|| format!("Invalid config: {}", path.display()))?
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Write the non-secret settings back out.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        fill(&mut self.postgres.password, var("PGPASSWORD"));
        fill(&mut self.graph.password, var("NEO4J_PASSWORD"));
        fill(&mut self.llm.api_key, var("OPENAI_API_KEY"));
        if let Some(uri) = var("MONGO_URI").filter(|u| !u.is_empty()) {
            self.document.uri = uri;
        }
    }
}

fn fill(slot: &mut String, value: Option<String>) {
    if slot.is_empty() {
        if let Some(value) = value {
            *slot = value;
        }
    }
}
