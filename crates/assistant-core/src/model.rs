use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ControlError;

/// Chat models the control can be configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AiModel {
    #[serde(rename = "gpt-4")]
    Gpt4,
    #[serde(rename = "gpt-4-32k")]
    Gpt4_32k,
    #[default]
    #[serde(rename = "gpt-3.5-turbo")]
    Gpt35Turbo,
    #[serde(rename = "gpt-3.5-turbo-16k")]
    Gpt35Turbo16k,
}

impl AiModel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AiModel::Gpt4 => "gpt-4",
            AiModel::Gpt4_32k => "gpt-4-32k",
            AiModel::Gpt35Turbo => "gpt-3.5-turbo",
            AiModel::Gpt35Turbo16k => "gpt-3.5-turbo-16k",
        }
    }

    pub fn from_id(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gpt-4" => Some(AiModel::Gpt4),
            "gpt-4-32k" => Some(AiModel::Gpt4_32k),
            "gpt-3.5-turbo" => Some(AiModel::Gpt35Turbo),
            "gpt-3.5-turbo-16k" => Some(AiModel::Gpt35Turbo16k),
            _ => None,
        }
    }

    pub fn all() -> Vec<AiModel> {
        vec![
            AiModel::Gpt4,
            AiModel::Gpt4_32k,
            AiModel::Gpt35Turbo,
            AiModel::Gpt35Turbo16k,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AiModel::Gpt4 => "GPT-4",
            AiModel::Gpt4_32k => "GPT-4 (32k context)",
            AiModel::Gpt35Turbo => "GPT-3.5 Turbo",
            AiModel::Gpt35Turbo16k => "GPT-3.5 Turbo (16k context)",
        }
    }

    /// The model after this one in `all()`, wrapping around.
    pub fn next(&self) -> AiModel {
        let all = Self::all();
        let idx = all.iter().position(|m| m == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }
}

impl fmt::Display for AiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiModel {
    type Err = ControlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_id(s).ok_or_else(|| ControlError::UnknownModel(s.to_string()))
    }
}
