//! Configuration loading and provider factory.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use biolab_core::session::{SessionConfig, DEFAULT_TEACHER_PASSPHRASE};
use biolab_core::traits::{GenerationConfig, LlmProvider};

use crate::anthropic::AnthropicProvider;
use crate::gemini::GeminiProvider;
use crate::mock::{MockProvider, MockRule};
use crate::openai::OpenAiProvider;

/// Configuration for a single provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    Gemini {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        org_id: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    Anthropic {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    /// Canned responses, for demos and tests without network access.
    Mock {
        #[serde(default)]
        responses: Vec<MockRule>,
        #[serde(default)]
        default_response: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::Gemini {
                api_key: _,
                base_url,
                timeout_secs,
            } => f
                .debug_struct("Gemini")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("timeout_secs", timeout_secs)
                .finish(),
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                org_id,
                timeout_secs,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("org_id", org_id)
                .field("timeout_secs", timeout_secs)
                .finish(),
            ProviderConfig::Anthropic {
                api_key: _,
                base_url,
                timeout_secs,
            } => f
                .debug_struct("Anthropic")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("timeout_secs", timeout_secs)
                .finish(),
            ProviderConfig::Mock { responses, .. } => f
                .debug_struct("Mock")
                .field("responses", &responses.len())
                .finish(),
        }
    }
}

impl ProviderConfig {
    fn api_key_mut(&mut self) -> Option<&mut String> {
        match self {
            ProviderConfig::Gemini { api_key, .. }
            | ProviderConfig::OpenAI { api_key, .. }
            | ProviderConfig::Anthropic { api_key, .. } => Some(api_key),
            ProviderConfig::Mock { .. } => None,
        }
    }
}

/// Top-level biolab configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct BiolabConfig {
    /// Provider configurations keyed by name.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    #[serde(default = "default_provider")]
    pub default_provider: String,
    #[serde(default = "default_model")]
    pub default_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Shared secret that unlocks the teacher role.
    #[serde(default = "default_passphrase")]
    pub teacher_passphrase: String,
    /// How long quiz feedback stays visible before the next question.
    #[serde(default = "default_feedback_delay")]
    pub feedback_delay_ms: u64,
}

impl std::fmt::Debug for BiolabConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BiolabConfig")
            .field("providers", &self.providers)
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("teacher_passphrase", &"***")
            .field("feedback_delay_ms", &self.feedback_delay_ms)
            .finish()
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    GenerationConfig::default().model
}
fn default_temperature() -> f64 {
    GenerationConfig::default().temperature
}
fn default_max_tokens() -> u32 {
    GenerationConfig::default().max_tokens
}
fn default_passphrase() -> String {
    DEFAULT_TEACHER_PASSPHRASE.to_string()
}
fn default_feedback_delay() -> u64 {
    1200
}

impl Default for BiolabConfig {
    fn default() -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider(),
            default_model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            teacher_passphrase: default_passphrase(),
            feedback_delay_ms: default_feedback_delay(),
        }
    }
}

impl BiolabConfig {
    pub fn generation_config(&self) -> GenerationConfig {
        GenerationConfig {
            model: self.default_model.clone(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            generation: self.generation_config(),
            teacher_passphrase: self.teacher_passphrase.clone(),
            feedback_delay: Duration::from_millis(self.feedback_delay_ms),
        }
    }

    /// Look up a provider by name, falling back to `default_provider`.
    pub fn provider(&self, name: Option<&str>) -> Result<(&str, &ProviderConfig)> {
        let name = name.unwrap_or(&self.default_provider);
        self.providers
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .with_context(|| {
                format!("provider '{name}' is not configured (run `biolab init` or check biolab.toml)")
            })
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };
        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        result.push_str(&std::env::var(var_name).unwrap_or_default());
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    result
}

fn resolve_provider_config(config: &mut ProviderConfig) {
    match config {
        ProviderConfig::Gemini {
            api_key, base_url, ..
        }
        | ProviderConfig::Anthropic {
            api_key, base_url, ..
        } => {
            *api_key = resolve_env_vars(api_key);
            if let Some(url) = base_url {
                *url = resolve_env_vars(url);
            }
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
            ..
        } => {
            *api_key = resolve_env_vars(api_key);
            if let Some(url) = base_url {
                *url = resolve_env_vars(url);
            }
            if let Some(org) = org_id {
                *org = resolve_env_vars(org);
            }
        }
        ProviderConfig::Mock { .. } => {}
    }
}

/// Set the API key of provider `name` from `var`, creating the entry if needed.
fn apply_key_override(
    config: &mut BiolabConfig,
    name: &str,
    var: &str,
    empty: impl FnOnce() -> ProviderConfig,
) {
    let Ok(key) = std::env::var(var) else {
        return;
    };
    let entry = config.providers.entry(name.to_string()).or_insert_with(empty);
    if let Some(api_key) = entry.api_key_mut() {
        *api_key = key;
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `biolab.toml` in the current directory
/// 2. `~/.config/biolab/config.toml`
///
/// Environment variable overrides: `BIOLAB_GEMINI_KEY`, `BIOLAB_OPENAI_KEY`,
/// `BIOLAB_ANTHROPIC_KEY`.
pub fn load_config() -> Result<BiolabConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<BiolabConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("biolab.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|dir| dir.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            toml::from_str::<BiolabConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?
        }
        None => BiolabConfig::default(),
    };

    apply_key_override(&mut config, "gemini", "BIOLAB_GEMINI_KEY", || {
        ProviderConfig::Gemini {
            api_key: String::new(),
            base_url: None,
            timeout_secs: None,
        }
    });
    apply_key_override(&mut config, "openai", "BIOLAB_OPENAI_KEY", || {
        ProviderConfig::OpenAI {
            api_key: String::new(),
            base_url: None,
            org_id: None,
            timeout_secs: None,
        }
    });
    apply_key_override(&mut config, "anthropic", "BIOLAB_ANTHROPIC_KEY", || {
        ProviderConfig::Anthropic {
            api_key: String::new(),
            base_url: None,
            timeout_secs: None,
        }
    });

    config.providers.values_mut().for_each(resolve_provider_config);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("biolab"))
}

fn require_key(name: &str, api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        anyhow::bail!("provider '{name}' has no API key; set it in biolab.toml or via the environment");
    }
    Ok(())
}

/// Create a provider instance from its configuration.
pub fn create_provider(name: &str, config: &ProviderConfig) -> Result<Box<dyn LlmProvider>> {
    let provider: Box<dyn LlmProvider> = match config {
        ProviderConfig::Gemini {
            api_key,
            base_url,
            timeout_secs,
        } => {
            require_key(name, api_key)?;
            Box::new(GeminiProvider::new(api_key, base_url.clone(), *timeout_secs)?)
        }
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            org_id,
            timeout_secs,
        } => {
            require_key(name, api_key)?;
            Box::new(OpenAiProvider::new(
                api_key,
                base_url.clone(),
                org_id.clone(),
                *timeout_secs,
            )?)
        }
        ProviderConfig::Anthropic {
            api_key,
            base_url,
            timeout_secs,
        } => {
            require_key(name, api_key)?;
            Box::new(AnthropicProvider::new(api_key, base_url.clone(), *timeout_secs)?)
        }
        ProviderConfig::Mock {
            responses,
            default_response,
        } => {
            let mut mock = MockProvider::new(responses.clone());
            if let Some(default) = default_response {
                mock = mock.with_default(default);
            }
            Box::new(mock)
        }
    };
    Ok(provider)
}
