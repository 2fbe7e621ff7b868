use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::ai::OPENAI_CHAT_COMPLETIONS_URL;
use crate::error::ControlError;
use crate::model::AiModel;
use crate::state::{ConfigUpdate, Configuration, DEFAULT_SYSTEM_PROMPT};

/// Settings persisted between sessions in `<config_dir>/ai-assistant/config.json`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub prompt: Option<String>,
    pub allow_system_prompt: Option<bool>,
    pub endpoint: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self {
            model: Some(AiModel::default().as_str().to_string()),
            system_prompt: Some(DEFAULT_SYSTEM_PROMPT.to_string()),
            allow_system_prompt: Some(true),
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("ai-assistant"))
    }

    pub fn get_config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// `OPENAI_API_KEY` wins over the stored key.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| self.api_key.clone())
    }

    pub fn endpoint(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(OPENAI_CHAT_COMPLETIONS_URL)
    }

    /// Builds the initial control configuration. An unknown stored model is
    /// an error rather than a silent fallback.
    pub fn to_configuration(&self) -> Result<Configuration, ControlError> {
        let defaults = Configuration::default();
        let model = match &self.model {
            Some(id) => id.parse()?,
            None => defaults.model,
        };
        Ok(Configuration {
            api_key: self.resolve_api_key().unwrap_or_default(),
            model,
            system_prompt: self.system_prompt.clone().unwrap_or(defaults.system_prompt),
            prompt: defaults.prompt,
            allow_system_prompt_edit: self
                .allow_system_prompt
                .unwrap_or(defaults.allow_system_prompt_edit),
        })
    }

    /// Initial prompt text, applied before the control is mounted.
    pub fn initial_update(&self) -> ConfigUpdate {
        ConfigUpdate {
            prompt: self.prompt.clone(),
            ..ConfigUpdate::default()
        }
    }

    /// Records the host-owned part of `configuration`. The API key is only
    /// written back when one was already stored.
    pub fn remember(&mut self, configuration: &Configuration) {
        self.model = Some(configuration.model.as_str().to_string());
        self.system_prompt = Some(configuration.system_prompt.clone());
        self.allow_system_prompt = Some(configuration.allow_system_prompt_edit);
        if self.api_key.is_some() {
            self.api_key = Some(configuration.api_key.clone());
        }
    }
}
