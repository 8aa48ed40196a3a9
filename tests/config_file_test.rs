use atayal_webui::config::Config;
use atayal_webui::relay::RelayConvention;
use atayal_webui::services::OperationKind;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

fn temp_config_path() -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("atayal_webui_config_{}.toml", uuid::Uuid::new_v4()));
    path
}

#[test]
fn test_load_config_with_custom_relays() {
    let path = temp_config_path();

    let toml = r#"
[server]
host = "0.0.0.0"
port = 8088
max_request_size_mb = 40

[services]
translation_base_url = "http://127.0.0.1:9001/atayal_trans"
asr_base_url = "http://127.0.0.1:9002/atayal_asr"
tts_base_url = "http://127.0.0.1:9003/atayal_tts"
timeout_seconds = 45

[[relays]]
name = "allorigins"
base_url = "https://api.allorigins.win/raw"
convention = "encoded-query"

[[relays]]
name = "thingproxy"
base_url = "https://thingproxy.freeboard.io/fetch/"
convention = "concatenate"

[candidates]
translate = ["direct", "thingproxy"]
transcribe = ["allorigins", "direct"]

[webui]
title = "泰雅語學習"
max_file_size_mb = 20
allowed_extensions = ["wav", "webm"]

[practice]
pass_threshold = 0.8
"#;

    fs::write(&path, toml).expect("failed to write config file");

    let config = Config::load_or_create_default(&path).expect("failed to load config file");
    assert_eq!(config.server.port, 8088);
    assert_eq!(config.services.asr_base_url, "http://127.0.0.1:9002/atayal_asr");
    assert_eq!(config.service_timeout(), Some(Duration::from_secs(45)));
    assert_eq!(config.translation.max_length, 128);
    assert_eq!(config.webui.title, "泰雅語學習");
    assert_eq!(config.webui.theme_color, "#f57983");
    assert_eq!(config.practice.pass_threshold, 0.8);
    assert_eq!(config.practice.sentences.len(), 4);
    assert!(config.capture.microphone_enabled);

    let translate = config.candidates_for(OperationKind::Translate);
    assert_eq!(translate.len(), 2);
    assert_eq!(translate[0].convention, RelayConvention::Direct);
    assert_eq!(translate[1].name, "thingproxy");
    assert_eq!(
        translate[1].resolve("http://a/b"),
        "https://thingproxy.freeboard.io/fetch/http://a/b"
    );

    let transcribe = config.candidates_for(OperationKind::Transcribe);
    let names: Vec<_> = transcribe.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["allorigins", "direct"]);

    // omitted lists keep their defaults
    assert_eq!(config.candidates.score, vec!["direct".to_string()]);
    assert_eq!(config.candidates.synthesize, vec!["direct".to_string()]);

    let _ = fs::remove_file(&path);
}

#[test]
fn test_missing_file_writes_default_config() {
    let path = temp_config_path();

    let created = Config::load_or_create_default(&path).expect("failed to create default config");
    assert!(path.exists());
    assert_eq!(created.server.port, 3000);
    assert_eq!(created.service_timeout(), None);

    let reloaded = Config::load_or_create_default(&path).expect("failed to reload default config");
    assert_eq!(reloaded.webui.title, created.webui.title);
    assert_eq!(reloaded.relays.len(), 2);
    assert_eq!(reloaded.relays[0].convention, RelayConvention::EncodedQuery);
    assert_eq!(reloaded.relays[1].convention, RelayConvention::Concatenate);
    assert_eq!(reloaded.candidates.translate, created.candidates.translate);
    assert_eq!(reloaded.practice.sentences, created.practice.sentences);

    let _ = fs::remove_file(&path);
}

#[test]
fn test_relayed_scoring_is_rejected_on_load() {
    let path = temp_config_path();

    let toml = r#"
[server]
host = "127.0.0.1"
port = 3000

[services]
translation_base_url = "https://service.dltechlab.top/atayal_trans"
asr_base_url = "https://service.dltechlab.top/atayal_asr"
tts_base_url = "https://service.dltechlab.top/atayal_tts"

[candidates]
score = ["direct", "allorigins"]

[webui]
title = "Atayal"
max_file_size_mb = 10
allowed_extensions = ["wav"]
"#;

    fs::write(&path, toml).expect("failed to write config file");

    let err = Config::load_or_create_default(&path).unwrap_err();
    assert!(err.to_string().contains("scoring"));

    let _ = fs::remove_file(&path);
}
