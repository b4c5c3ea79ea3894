use anyhow::{anyhow, Context, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use spendlens_core::DEFAULT_CONFIDENCE_THRESHOLD;
use spendlens_finance::oracle::gemini::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_MODEL};
use spendlens_finance::{GeminiConfig, WorkflowConfig, DEFAULT_BATCH_SIZE};

use crate::state::ensure_spendlens_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub oracle: OracleSection,
    pub workflow: WorkflowSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSection {
    pub model: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSection {
    pub batch_size: usize,
    pub threshold: f64,
    /// IANA zone for monthly budget windows
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            oracle: OracleSection {
                model: DEFAULT_MODEL.to_string(),
                api_key_env: DEFAULT_API_KEY_ENV.to_string(),
                base_url: DEFAULT_BASE_URL.to_string(),
            },
            workflow: WorkflowSection {
                batch_size: DEFAULT_BATCH_SIZE,
                threshold: DEFAULT_CONFIDENCE_THRESHOLD,
                timezone: default_timezone(),
            },
        }
    }
}

impl Config {
    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            model: self.oracle.model.clone(),
            base_url: self.oracle.base_url.clone(),
            ..GeminiConfig::from_env(&self.oracle.api_key_env)
        }
    }

    pub fn workflow(&self) -> Result<WorkflowConfig> {
        let timezone: Tz = self
            .workflow
            .timezone
            .parse()
            .map_err(|e| anyhow!("invalid timezone {:?}: {e}", self.workflow.timezone))?;
        Ok(WorkflowConfig {
            batch_size: self.workflow.batch_size,
            threshold: self.workflow.threshold,
            timezone,
        })
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(ensure_spendlens_home()?.join("config.toml"))
}

pub fn load_config() -> Result<Config> {
    let p = config_path()?;
    if !p.exists() {
        return Ok(Config::default());
    }
    let s = fs::read_to_string(&p).with_context(|| format!("read {}", p.display()))?;
    toml::from_str(&s).context("parse config.toml")
}

pub fn save_config(cfg: &Config) -> Result<()> {
    let p = config_path()?;
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(&p, s).with_context(|| format!("write {}", p.display()))?;
    Ok(())
}

pub fn init_config() -> Result<()> {
    let p = config_path()?;
    if p.exists() {
        println!("Config already exists: {}", p.display());
        return Ok(());
    }
    save_config(&Config::default())?;
    println!("Wrote {}", p.display());
    Ok(())
}
