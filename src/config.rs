use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::sheets::SettlePolicy;

/// Default config file looked up in the current directory.
pub const CONFIG_FILE: &str = ".lab-grader.toml";

/// Phrase that opens the variants section of a lab README.
pub const DEFAULT_VARIANTS_MARKER: &str = "Варіанти завдань";

pub const DEFAULT_PROMPT: &str = "You are a teacher reviewing a student's code.
You should give only advice, not complete code.
Check the code for conventions and give advice about best practices.
Your answer is posted as a pull request comment, so use GitHub markdown.
The student has submitted the following files for review:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .lab-grader.toml.
///
/// Every section is optional; secrets may come from the environment instead.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub sheets: SheetsConfig,

    #[serde(default)]
    pub columns: ColumnConfig,

    #[serde(default)]
    pub lab: LabConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,
    pub api_url: String,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.github.com".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// If None, falls back to OPENAI_API_KEY env var.
    pub api_key: Option<String>,
    pub model: String,
    /// Base URL of an OpenAI-compatible chat completions API
    pub api_url: String,
    /// System prompt used when the prompts sheet has no entry for the lab
    pub default_prompt: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            api_url: "https://api.openai.com/v1".to_string(),
            default_prompt: DEFAULT_PROMPT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SheetsConfig {
    /// If None, falls back to SPREADSHEET_ID env var.
    pub spreadsheet_id: Option<String>,
    /// OAuth access token. If None, falls back to GOOGLE_SHEETS_TOKEN env var.
    pub access_token: Option<String>,
    pub api_url: String,
    pub roster: String,
    pub variants: String,
    pub template: String,
    pub prompts: String,
    pub settle_attempts: u32,
    pub settle_initial_delay_ms: u64,
    pub settle_max_delay_ms: u64,
}

impl Default for SheetsConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: None,
            access_token: None,
            api_url: "https://sheets.googleapis.com/v4/spreadsheets".to_string(),
            roster: "roster".to_string(),
            variants: "variants".to_string(),
            template: "template".to_string(),
            prompts: "prompts".to_string(),
            settle_attempts: 6,
            settle_initial_delay_ms: 250,
            settle_max_delay_ms: 4000,
        }
    }
}

impl SheetsConfig {
    pub fn settle_policy(&self) -> SettlePolicy {
        SettlePolicy {
            attempts: self.settle_attempts.max(1),
            initial_delay: Duration::from_millis(self.settle_initial_delay_ms),
            max_delay: Duration::from_millis(self.settle_max_delay_ms),
        }
    }
}

/// Column labels of the externally maintained roster, variants and prompts sheets.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub roster_identity: String,
    pub roster_name: String,
    pub variants_name: String,
    pub variants_number: String,
    pub prompts_lab: String,
    pub prompts_prompt: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            roster_identity: "github_username".to_string(),
            roster_name: "ПІБ".to_string(),
            variants_name: "ПІБ".to_string(),
            variants_number: "Номер варіанту".to_string(),
            prompts_lab: "lab".to_string(),
            prompts_prompt: "prompt".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LabConfig {
    /// Known lab names, matched against repository names in order
    pub names: Vec<String>,
    pub variants_marker: String,
    /// Assign `roster_position % variant_count + 1` when the variants sheet has no row
    pub roster_position_fallback: bool,
}

impl Default for LabConfig {
    fn default() -> Self {
        Self {
            names: Vec::new(),
            variants_marker: DEFAULT_VARIANTS_MARKER.to_string(),
            roster_position_fallback: false,
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from .lab-grader.toml in the current
    /// directory. Returns default config if the default file doesn't exist.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match path {
            Some(path) => Self::load_from(path)?,
            None => {
                let default_path = Path::new(CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from(default_path)?
                } else {
                    Config::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from a specific path without consulting the environment.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill unset secrets from the environment; file values take precedence.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        fill(&mut self.github.token, lookup("GITHUB_TOKEN"));
        fill(&mut self.model.api_key, lookup("OPENAI_API_KEY"));
        fill(&mut self.sheets.access_token, lookup("GOOGLE_SHEETS_TOKEN"));
        fill(&mut self.sheets.spreadsheet_id, lookup("SPREADSHEET_ID"));
    }
}

fn fill(slot: &mut Option<String>, value: Option<String>) {
    if slot.is_none() {
        *slot = value.filter(|v| !v.is_empty());
    }
}
