//! Configuration layering: defaults, TOML file, environment.

use std::collections::HashMap;
use std::time::Duration;

use qualia::config::{Config, FileConfig, SummarizerBackend};
use qualia::error::QualiaError;

fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn defaults_without_file_or_env() {
    let config = Config::resolve(FileConfig::default(), env_from(&[])).unwrap();

    assert_eq!(config.bind_addr, "0.0.0.0:8000");
    assert_eq!(config.request_timeout, Duration::from_secs(900));
    assert_eq!(config.chunking.size(), 3000);
    assert_eq!(config.chunking.overlap(), 300);
    assert_eq!(config.ollama.host, "http://localhost:11434");
    assert_eq!(config.ollama.default_model, "codellama:latest");
    assert!(config.gemini.is_none());
    assert_eq!(
        config.summarizer,
        SummarizerBackend::Ollama {
            model: "codellama:latest".to_string()
        }
    );
    assert!(config.transcriber_url.is_none());
    assert!(config.extractor_url.is_none());
}

#[test]
fn file_values_apply() {
    let file = FileConfig::parse(
        r#"
bind = "127.0.0.1:9000"
request_timeout_secs = 120
transcriber_url = "http://whisper:9000"

[chunking]
size = 2000
overlap = 200

[ollama]
host = "http://gpu-box:11434"
default_model = "llava:latest"
reasoning_models = ["deepseek-r1:14b"]

[gemini]
api_key = "file-key"

[summarizer]
url = "http://bart:8080"

[prompts]
analyse_opinions = "Avis : {summaries}"
"#,
    )
    .unwrap();
    let config = Config::resolve(file, env_from(&[])).unwrap();

    assert_eq!(config.bind_addr, "127.0.0.1:9000");
    assert_eq!(config.request_timeout, Duration::from_secs(120));
    assert_eq!(config.chunking.size(), 2000);
    assert_eq!(config.chunking.overlap(), 200);
    assert_eq!(config.ollama.host, "http://gpu-box:11434");
    assert_eq!(config.ollama.default_model, "llava:latest");
    assert_eq!(config.ollama.reasoning_models, vec!["deepseek-r1:14b".to_string()]);
    assert_eq!(config.ollama.standard_models[0], "auto");

    let gemini = config.gemini.as_ref().unwrap();
    assert_eq!(gemini.api_key, "file-key");
    assert_eq!(gemini.model, "gemini-1.5-flash");

    assert_eq!(
        config.summarizer,
        SummarizerBackend::Http {
            base_url: "http://bart:8080".to_string()
        }
    );
    assert_eq!(config.transcriber_url.as_deref(), Some("http://whisper:9000"));
    assert_eq!(config.prompts.render("analyse_opinions", "X"), "Avis : X");
}

#[test]
fn env_overrides_file() {
    let file = FileConfig::parse(
        r#"
bind = "127.0.0.1:9000"
[chunking]
size = 2000
[gemini]
api_key = "file-key"
"#,
    )
    .unwrap();
    let env = env_from(&[
        ("QUALIA_BIND", "0.0.0.0:7000"),
        ("QUALIA_CHUNK_SIZE", "5000"),
        ("GOOGLE_API_KEY", "env-key"),
        ("GEMINI_MODEL", "gemini-2.0-flash"),
        ("OLLAMA_HOST", "http://ollama:11434"),
        ("QUALIA_SUMMARIZER_MODEL", "mistral:7b"),
        ("QUALIA_EXTRACTOR_URL", "http://tika:9998"),
    ]);
    let config = Config::resolve(file, env).unwrap();

    assert_eq!(config.bind_addr, "0.0.0.0:7000");
    assert_eq!(config.chunking.size(), 5000);
    assert_eq!(config.chunking.overlap(), 300);
    assert_eq!(config.ollama.host, "http://ollama:11434");
    let gemini = config.gemini.unwrap();
    assert_eq!(gemini.api_key, "env-key");
    assert_eq!(gemini.model, "gemini-2.0-flash");
    assert_eq!(
        config.summarizer,
        SummarizerBackend::Ollama {
            model: "mistral:7b".to_string()
        }
    );
    assert_eq!(config.extractor_url.as_deref(), Some("http://tika:9998"));
}

#[test]
fn invalid_chunking_fails_at_startup() {
    let env = env_from(&[("QUALIA_CHUNK_SIZE", "200"), ("QUALIA_CHUNK_OVERLAP", "300")]);
    assert!(matches!(
        Config::resolve(FileConfig::default(), env),
        Err(QualiaError::InvalidChunking {
            size: 200,
            overlap: 300
        })
    ));
}

#[test]
fn non_numeric_env_is_a_config_error() {
    let env = env_from(&[("QUALIA_REQUEST_TIMEOUT_SECS", "fifteen")]);
    let err = Config::resolve(FileConfig::default(), env).unwrap_err();
    assert!(matches!(err, QualiaError::Config(_)));
    assert!(err.to_string().contains("QUALIA_REQUEST_TIMEOUT_SECS"));
}

#[test]
fn zero_request_timeout_is_rejected() {
    let env = env_from(&[("QUALIA_REQUEST_TIMEOUT_SECS", "0")]);
    assert!(matches!(
        Config::resolve(FileConfig::default(), env),
        Err(QualiaError::Config(_))
    ));

    let file = FileConfig::parse("request_timeout_secs = 0").unwrap();
    assert!(matches!(
        Config::resolve(file, env_from(&[])),
        Err(QualiaError::Config(_))
    ));
}

#[test]
fn unknown_file_keys_are_rejected() {
    assert!(FileConfig::parse("chunk_size = 10").is_err());
    assert!(FileConfig::parse("[ollama]\nmodel = \"x\"").is_err());
}

#[test]
fn prompt_override_must_keep_the_slot() {
    let file = FileConfig::parse("[prompts]\nresume_general = \"Résume.\"").unwrap();
    assert!(Config::resolve(file, env_from(&[])).is_err());
}

#[test]
fn gemini_key_is_redacted_in_debug() {
    let config = Config::resolve(
        FileConfig::default(),
        env_from(&[("GOOGLE_API_KEY", "super-secret")]),
    )
    .unwrap();
    let debug = format!("{config:?}");
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("[REDACTED]"));
}
