use kitchen_helper::config::Config;
use kitchen_helper::{Provider, ProviderConfig};
use std::collections::HashMap;
use std::fs;
use std::time::Duration;
use tempfile::TempDir;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let config = Config::load_from(&dir.path().join("absent.toml")).expect("defaults load");

    assert_eq!(config.admission.max_concurrent, 2);
    assert_eq!(config.probe.interval(), Some(Duration::from_secs(30)));
    assert!(config.catalog.seed_path.is_none());
    assert!(!config.provider_config(Provider::Gemini).has_api_key());
}

#[test]
fn test_save_and_load_round_trip() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.admission.max_concurrent = 4;
    config.probe.interval_secs = 0;
    config.update(
        Provider::Ollama,
        None,
        Some("mistral".to_string()),
        Some("http://kitchen-pi:11434".to_string()),
        Some(240),
    );
    config.save_to(&path).expect("Failed to save config");

    let loaded = Config::load_from(&path).expect("Failed to load config");
    assert_eq!(loaded.admission.max_concurrent, 4);
    assert_eq!(loaded.probe.interval(), None);

    let ollama = loaded.provider_config(Provider::Ollama);
    assert_eq!(ollama.model, "mistral");
    assert_eq!(ollama.base_url.as_deref(), Some("http://kitchen-pi:11434"));
    assert_eq!(
        ollama.effective_timeout(Provider::Ollama),
        Duration::from_secs(240)
    );
}

#[test]
fn test_partial_file_keeps_other_defaults() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let path = dir.path().join("config.toml");
    fs::write(
        &path,
        r#"
[admission]
max_concurrent = 1

[providers.gemini]
api_key = "from-file"
"#,
    )
    .expect("Failed to write config");

    let config = Config::load_from(&path).expect("Failed to load config");
    assert_eq!(config.admission.max_concurrent, 1);
    assert_eq!(config.probe.interval_secs, 30);
    assert_eq!(config.provider_config(Provider::Gemini).api_key, "from-file");
    assert_eq!(
        config.provider_config(Provider::Ollama),
        ProviderConfig::with_defaults(Provider::Ollama)
    );
}

#[test]
fn test_env_fills_unset_values() {
    let mut config = Config::default();
    config.apply_env(env(&[
        ("GOOGLE_AI_API_KEY", "env-key"),
        ("OLLAMA_MODEL", "qwen2.5"),
        ("OLLAMA_BASE_URL", "http://10.0.0.5:11434"),
    ]));

    assert_eq!(config.provider_config(Provider::Gemini).api_key, "env-key");
    let ollama = config.provider_config(Provider::Ollama);
    assert_eq!(ollama.model, "qwen2.5");
    assert_eq!(ollama.base_url.as_deref(), Some("http://10.0.0.5:11434"));
}

#[test]
fn test_file_values_win_over_env() {
    let mut config = Config::default();
    config.update(
        Provider::Gemini,
        Some("from-file".to_string()),
        Some("gemini-1.5-pro".to_string()),
        Some("https://proxy.example.com".to_string()),
        None,
    );
    config.apply_env(env(&[
        ("GOOGLE_AI_API_KEY", "env-key"),
        ("GEMINI_MODEL", "gemini-env"),
        ("GEMINI_BASE_URL", "https://env.example.com"),
    ]));

    let gemini = config.provider_config(Provider::Gemini);
    assert_eq!(gemini.api_key, "from-file");
    assert_eq!(gemini.model, "gemini-1.5-pro");
    assert_eq!(gemini.base_url.as_deref(), Some("https://proxy.example.com"));
}

#[test]
fn test_blank_env_values_are_ignored() {
    let mut config = Config::default();
    config.apply_env(env(&[("GOOGLE_AI_API_KEY", "   ")]));
    assert!(!config.provider_config(Provider::Gemini).has_api_key());
}

#[test]
fn test_validation_failures() {
    let mut config = Config::default();
    config.admission.max_concurrent = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.update(
        Provider::Ollama,
        None,
        None,
        Some("not a url".to_string()),
        None,
    );
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.catalog.seed_path = Some("/definitely/not/here/catalog.json".into());
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config
        .providers
        .insert("openai".to_string(), ProviderConfig::default());
    assert!(config.validate().is_err());
}

#[test]
fn test_invalid_toml_reports_path() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[admission\nmax_concurrent = ").expect("Failed to write config");

    let err = Config::load_from(&path).expect_err("syntax error");
    assert!(format!("{err:#}").contains("config.toml"));
}

#[test]
fn test_google_section_is_not_a_provider() {
    let dir = TempDir::new().expect("Failed to create temporary directory");
    let path = dir.path().join("config.toml");
    fs::write(&path, "[providers.google]\napi_key = \"abc\"\n").expect("Failed to write config");

    let config = Config::load_from(&path).expect("Failed to load config");
    assert!(!config.provider_config(Provider::Gemini).has_api_key());
    assert!(config.validate().is_err());
}
