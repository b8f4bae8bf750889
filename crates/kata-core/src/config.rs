//! Typed configuration for the labs
//!
//! One TOML file, loaded once per process into an owned [`Config`] that is
//! passed explicitly to whatever needs it. There is no global config state.
//! Required-vs-optional validation for the active provider happens in
//! [`crate::providers::resolve`], which names the offending key on failure.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::usage::ModelPricing;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub openai: Option<OpenAiConfig>,
    #[serde(default)]
    pub ollama: Option<OllamaConfig>,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub usage: UsageConfig,
    #[serde(default)]
    pub serve: ServeConfig,
}

impl Config {
    /// Load and parse the config file. A missing file is an error; the labs
    /// cannot run without configuration.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.display().to_string(),
                source,
            },
            other => other,
        })?;

        if let Some(openai) = &config.openai
            && let Some(key) = &openai.api_key
            && key.starts_with("sk-")
        {
            warn!(
                "OpenAI API key is hardcoded in the config file. For security, use an \
                 environment variable: api_key = \"${{OPENAI_API_KEY}}\""
            );
        }

        Ok(config)
    }

    /// Parse config from a TOML string, expanding allowlisted `${VAR}`
    /// references first.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|source| ConfigError::Parse {
            path: "<inline>".to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiConfig {
    /// `"openai"` or `"ollama"`, matched case-insensitively.
    /// Defaults to the OpenAI path when unset.
    #[serde(default)]
    pub provider: Option<String>,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub base_url: Option<String>,
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("api_key", &self.api_key.as_deref().map(mask_secret))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_instructions")]
    pub instructions: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            instructions: default_instructions(),
            max_tokens: default_max_tokens(),
            temperature: None,
        }
    }
}

fn default_instructions() -> String {
    "You are a concise, helpful assistant.".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Overrides and additions to the built-in price table (USD per million tokens).
    #[serde(default)]
    pub model_prices: HashMap<String, ModelPricing>,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model_prices: HashMap::new(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ServeConfig {
    #[serde(default = "default_serve_bind")]
    pub bind: String,
    #[serde(default = "default_serve_port")]
    pub port: u16,
    /// Optional bearer token; when set, chat requests must carry it.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for ServeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServeConfig")
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_deref().map(mask_secret))
            .finish()
    }
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            bind: default_serve_bind(),
            port: default_serve_port(),
            auth_token: None,
        }
    }
}

fn default_serve_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_serve_port() -> u16 {
    8787
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// Environment variables that may be expanded in config files. Keeping this
/// an allowlist prevents a config file from reading arbitrary process state.
const ALLOWED_ENV_VARS: &[&str] = &[
    "OPENAI_API_KEY",
    "OPENAI_MODEL",
    "OLLAMA_ENDPOINT",
    "OLLAMA_MODEL",
    "KATA_SERVE_TOKEN",
    "HOME",
    "USER",
];

fn expand_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    let mut pos = 0;
    while pos < result.len() {
        if let Some(start) = result[pos..].find("${") {
            let abs_start = pos + start;
            if let Some(end) = result[abs_start..].find('}') {
                let var_name = result[abs_start + 2..abs_start + end].to_string();

                let value = if ALLOWED_ENV_VARS.contains(&var_name.as_str()) {
                    std::env::var(&var_name).unwrap_or_default()
                } else {
                    warn!(
                        "Skipping expansion of unrecognized env var '{}' in config (not in allowlist)",
                        var_name
                    );
                    // Leave the ${VAR} unexpanded so it's obvious
                    pos = abs_start + end + 1;
                    continue;
                };

                let value_len = value.len();
                result = format!(
                    "{}{}{}",
                    &result[..abs_start],
                    value,
                    &result[abs_start + end + 1..]
                );
                pos = abs_start + value_len;
            } else {
                break;
            }
        } else {
            break;
        }
    }
    result
}

/// Mask a secret string for safe display in Debug output / logs.
/// Shows first 3 and last 4 chars for values longer than 7 chars, otherwise "***".
pub(crate) fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "(empty)".to_string();
    }
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 7 {
        let prefix: String = chars[..3].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::from_toml("").unwrap();
        assert!(config.ai.provider.is_none());
        assert!(config.openai.is_none());
        assert!(config.ollama.is_none());
        assert_eq!(config.agent.max_tokens, 1024);
        assert!(config.usage.enabled);
        assert_eq!(config.serve.bind, "127.0.0.1");
        assert_eq!(config.serve.port, 8787);
    }

    #[test]
    fn test_parse_full() {
        let config = Config::from_toml(
            r#"
[ai]
provider = "ollama"

[openai]
api_key = "sk-test"
model = "gpt-4o"

[ollama]
endpoint = "http://localhost:11434"
model = "llama3.2"

[agent]
instructions = "Answer in one sentence."
max_tokens = 256

[serve]
port = 9000
"#,
        )
        .unwrap();

        assert_eq!(config.ai.provider.as_deref(), Some("ollama"));
        assert_eq!(
            config.openai.as_ref().unwrap().api_key.as_deref(),
            Some("sk-test")
        );
        assert_eq!(
            config.ollama.as_ref().unwrap().endpoint.as_deref(),
            Some("http://localhost:11434")
        );
        assert_eq!(config.agent.instructions, "Answer in one sentence.");
        assert_eq!(config.agent.max_tokens, 256);
        assert_eq!(config.serve.port, 9000);
        assert_eq!(config.serve.bind, "127.0.0.1"); // default
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let result = Config::load("/nonexistent/kata-config.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[ai]\nprovider = \"openai\"").unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.ai.provider.as_deref(), Some("openai"));
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_toml("[ai\nprovider = ");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_env_expansion_allowlisted() {
        // HOME is allowlisted and present in any test environment
        let expanded = expand_env_vars("dir = \"${HOME}/kata\"");
        assert!(!expanded.contains("${HOME}"));
    }

    #[test]
    fn test_env_expansion_skips_unknown() {
        let expanded = expand_env_vars("key = \"${DEFINITELY_NOT_ALLOWLISTED}\"");
        assert!(expanded.contains("${DEFINITELY_NOT_ALLOWLISTED}"));
    }

    #[test]
    fn test_model_price_override() {
        let config = Config::from_toml(
            r#"
[usage.model_prices."gpt-4o"]
input_per_mtok = 2.5
output_per_mtok = 10.0
"#,
        )
        .unwrap();
        let pricing = config.usage.model_prices.get("gpt-4o").unwrap();
        assert!((pricing.input_per_mtok - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(empty)");
        assert_eq!(mask_secret("short"), "***");
        assert_eq!(mask_secret("sk-abcdefgh1234"), "sk-...1234");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let config = Config::from_toml(
            r#"
[openai]
api_key = "sk-very-secret-key-value"

[serve]
auth_token = "token-value-9999"
"#,
        )
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("sk-very-secret-key-value"));
        assert!(!debug.contains("token-value-9999"));
    }
}
