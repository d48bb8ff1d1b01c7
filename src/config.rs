use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

use crate::persona::Personality;

/// Top-level configuration loaded from TOML.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct WaifuConfig {
    pub gateway: GatewayConfig,
    pub ai: AiConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Browser origins allowed by CORS (the chat frontend).
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind: default_bind(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl GatewayConfig {
    pub fn is_loopback(&self) -> bool {
        self.bind == "127.0.0.1" || self.bind == "::1" || self.bind == "localhost"
    }
}

fn default_port() -> u16 {
    4000
}
fn default_bind() -> String {
    "127.0.0.1".into()
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".into()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiConfig {
    /// `gemini`, or `ollama` (`local` is accepted as an alias).
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_url")]
    pub gemini_url: String,
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,
    #[serde(default = "default_ollama_model")]
    pub ollama_model: String,
    #[serde(default)]
    pub personality: Personality,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: None,
            gemini_url: default_gemini_url(),
            ollama_url: default_ollama_url(),
            ollama_model: default_ollama_model(),
            personality: Personality::default(),
        }
    }
}

impl AiConfig {
    pub fn is_local(&self) -> bool {
        matches!(self.provider.as_str(), "ollama" | "local")
    }
}

fn default_provider() -> String {
    "gemini".into()
}
fn default_model() -> String {
    "gemini-1.5-flash".into()
}
fn default_gemini_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_ollama_url() -> String {
    "http://localhost:11434".into()
}
fn default_ollama_model() -> String {
    "llama3.2".into()
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Turns kept per session (user and assistant turns count separately).
    #[serde(default = "default_max_window_turns")]
    pub max_window_turns: usize,
    /// Lifetime of a session's context, counted from its first message.
    #[serde(default = "default_context_ttl_secs")]
    pub context_ttl_secs: u64,
    #[serde(default = "default_response_ttl_secs")]
    pub response_ttl_secs: u64,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_response_cache_enabled")]
    pub response_cache_enabled: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_window_turns: default_max_window_turns(),
            context_ttl_secs: default_context_ttl_secs(),
            response_ttl_secs: default_response_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            response_cache_enabled: default_response_cache_enabled(),
        }
    }
}

fn default_max_window_turns() -> usize {
    20
}
fn default_context_ttl_secs() -> u64 {
    1800
}
fn default_response_ttl_secs() -> u64 {
    300
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_response_cache_enabled() -> bool {
    true
}

/// Load configuration from file or use defaults.
///
/// Search order:
/// 1. `WAIFU_CONFIG` env var
/// 2. `~/.waifu-chat/config.toml`
/// 3. Zero-config defaults (no file needed)
pub fn load() -> anyhow::Result<WaifuConfig> {
    let path = config_path();

    let mut config = if path.exists() {
        let content = std::fs::read_to_string(&path)
            .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
        let config = parse(&content)
            .map_err(|e| anyhow::anyhow!("invalid config at {}: {e}", path.display()))?;
        info!("loaded config from {}", path.display());
        config
    } else {
        info!("no config file found, using zero-config defaults");
        WaifuConfig::default()
    };

    apply_env_overrides(&mut config);
    validate(&config)?;
    Ok(config)
}

/// Parse a TOML document into a config, without env overrides or validation.
pub fn parse(content: &str) -> anyhow::Result<WaifuConfig> {
    Ok(toml::from_str(content)?)
}

fn config_path() -> PathBuf {
    if let Ok(path) = std::env::var("WAIFU_CONFIG") {
        return PathBuf::from(path);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
    PathBuf::from(home).join(".waifu-chat").join("config.toml")
}

/// Provider settings from the environment take precedence over the file.
fn apply_env_overrides(config: &mut WaifuConfig) {
    if let Ok(provider) = std::env::var("AI_PROVIDER") {
        config.ai.provider = provider.trim().to_ascii_lowercase();
    }
    if let Ok(url) = std::env::var("OLLAMA_URL") {
        config.ai.ollama_url = url;
    }
    if let Ok(model) = std::env::var("OLLAMA_MODEL") {
        config.ai.ollama_model = model;
    }
    resolve_api_key(config);
}

/// Resolve API key from environment variables if not set in config.
fn resolve_api_key(config: &mut WaifuConfig) {
    if config.ai.api_key.is_none() && config.ai.provider == "gemini" {
        config.ai.api_key = std::env::var("GEMINI_API_KEY").ok();
    }
}

/// Upper bound for every configured TTL and interval.
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// Validate the config and return clear error messages.
pub fn validate(config: &WaifuConfig) -> anyhow::Result<()> {
    let valid_providers = ["gemini", "ollama", "local"];
    if !valid_providers.contains(&config.ai.provider.as_str()) {
        anyhow::bail!(
            "invalid provider '{}': must be one of {:?}",
            config.ai.provider,
            valid_providers
        );
    }

    let endpoint = if config.ai.is_local() {
        ("ai.ollama_url", &config.ai.ollama_url)
    } else {
        ("ai.gemini_url", &config.ai.gemini_url)
    };
    if let Err(e) = url::Url::parse(endpoint.1) {
        anyhow::bail!("{} '{}' is not a valid URL: {e}", endpoint.0, endpoint.1);
    }

    if config.cache.max_window_turns == 0 {
        anyhow::bail!("cache.max_window_turns must be > 0");
    }
    let durations = [
        ("cache.context_ttl_secs", config.cache.context_ttl_secs),
        ("cache.response_ttl_secs", config.cache.response_ttl_secs),
        ("cache.sweep_interval_secs", config.cache.sweep_interval_secs),
    ];
    for (key, secs) in durations {
        if secs == 0 {
            anyhow::bail!("{key} must be > 0");
        }
        if secs > MAX_DURATION_SECS {
            anyhow::bail!("{key} must be at most {MAX_DURATION_SECS} (one year)");
        }
    }

    Ok(())
}
