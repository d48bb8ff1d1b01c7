use waifu_chat::config::{MAX_DURATION_SECS, WaifuConfig, load, parse, validate};
use waifu_chat::persona::Personality;

#[test]
fn default_config_has_sensible_values() {
    let config = WaifuConfig::default();
    assert_eq!(config.gateway.port, 4000);
    assert_eq!(config.gateway.bind, "127.0.0.1");
    assert_eq!(config.gateway.cors_origins, vec!["http://localhost:5173"]);
    assert_eq!(config.ai.provider, "gemini");
    assert_eq!(config.ai.model, "gemini-1.5-flash");
    assert_eq!(config.ai.ollama_url, "http://localhost:11434");
    assert_eq!(config.ai.personality, Personality::Friendly);
    assert!(config.ai.api_key.is_none());
    assert_eq!(config.cache.max_window_turns, 20);
    assert_eq!(config.cache.context_ttl_secs, 1800);
    assert_eq!(config.cache.response_ttl_secs, 300);
    assert_eq!(config.cache.sweep_interval_secs, 60);
    assert!(config.cache.response_cache_enabled);
}

#[test]
fn valid_toml_parses_successfully() {
    let toml_str = r#"
[gateway]
port = 8080
bind = "0.0.0.0"
cors_origins = ["https://chat.example.com"]

[ai]
provider = "ollama"
ollama_url = "http://gpu-box:11434"
ollama_model = "mistral"
personality = "kuudere"

[cache]
max_window_turns = 6
context_ttl_secs = 600
response_cache_enabled = false
"#;

    let config = parse(toml_str).unwrap();
    assert_eq!(config.gateway.port, 8080);
    assert_eq!(config.gateway.bind, "0.0.0.0");
    assert!(!config.gateway.is_loopback());
    assert_eq!(config.gateway.cors_origins, vec!["https://chat.example.com"]);
    assert_eq!(config.ai.provider, "ollama");
    assert!(config.ai.is_local());
    assert_eq!(config.ai.ollama_model, "mistral");
    assert_eq!(config.ai.personality, Personality::Kuudere);
    assert_eq!(config.cache.max_window_turns, 6);
    assert_eq!(config.cache.context_ttl_secs, 600);
    assert!(!config.cache.response_cache_enabled);
    // Unset keys keep their defaults
    assert_eq!(config.cache.response_ttl_secs, 300);
    assert!(validate(&config).is_ok());
}

#[test]
fn empty_toml_uses_all_defaults() {
    let config = parse("").unwrap();
    assert_eq!(config.gateway.port, 4000);
    assert_eq!(config.ai.provider, "gemini");
    assert_eq!(config.cache.max_window_turns, 20);
}

#[test]
fn malformed_toml_returns_parse_error() {
    let result = parse("this is not valid toml {{{");
    assert!(result.is_err());
}

#[test]
fn unknown_personality_rejected_at_parse() {
    let result = parse("[ai]\npersonality = \"robot\"\n");
    assert!(result.is_err());
}

#[test]
fn invalid_provider_detected_by_validate() {
    let config = parse("[ai]\nprovider = \"deepmind\"\n").unwrap();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("deepmind"), "unexpected error: {err}");
}

#[test]
fn local_is_accepted_as_ollama_alias() {
    let config = parse("[ai]\nprovider = \"local\"\n").unwrap();
    assert!(config.ai.is_local());
    assert!(validate(&config).is_ok());
}

#[test]
fn bad_ollama_url_rejected() {
    let config = parse("[ai]\nprovider = \"ollama\"\nollama_url = \"not a url\"\n").unwrap();
    let err = validate(&config).unwrap_err().to_string();
    assert!(err.contains("ai.ollama_url"), "unexpected error: {err}");
}

#[test]
fn zero_window_rejected() {
    let config = parse("[cache]\nmax_window_turns = 0\n").unwrap();
    assert!(validate(&config).is_err());
}

#[test]
fn zero_ttls_rejected() {
    for key in ["context_ttl_secs", "response_ttl_secs", "sweep_interval_secs"] {
        let config = parse(&format!("[cache]\n{key} = 0\n")).unwrap();
        let err = validate(&config).unwrap_err().to_string();
        assert!(err.contains(key), "expected {key} in: {err}");
    }
}

#[test]
fn oversized_ttls_rejected() {
    for key in ["context_ttl_secs", "response_ttl_secs", "sweep_interval_secs"] {
        for secs in [MAX_DURATION_SECS + 1, 10_000_000_000_000, i64::MAX as u64] {
            let config = parse(&format!("[cache]\n{key} = {secs}\n")).unwrap();
            let err = validate(&config).unwrap_err().to_string();
            assert!(err.contains(key), "expected {key} in: {err}");
        }
    }
}

#[test]
fn one_year_ttl_accepted() {
    let config = parse(&format!("[cache]\ncontext_ttl_secs = {MAX_DURATION_SECS}\n")).unwrap();
    assert!(validate(&config).is_ok());
}

#[test]
fn config_file_env_var_override() {
    let tmp_config = std::env::temp_dir().join("waifu-chat-test-config.toml");
    std::fs::write(
        &tmp_config,
        r#"
[gateway]
port = 9999

[ai]
provider = "ollama"
"#,
    )
    .unwrap();

    // SAFETY: no other test in this binary reads or writes WAIFU_CONFIG
    unsafe {
        std::env::set_var("WAIFU_CONFIG", &tmp_config);
    }
    let result = load();
    unsafe {
        std::env::remove_var("WAIFU_CONFIG");
    }
    std::fs::remove_file(&tmp_config).ok();

    let config = result.unwrap();
    assert_eq!(config.gateway.port, 9999);
}
