use crate::relay::{EndpointCandidate, RelayConvention, DIRECT};
use crate::services::OperationKind;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub services: ServicesConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default = "Config::default_relays")]
    pub relays: Vec<RelayConfig>,
    #[serde(default)]
    pub candidates: CandidatesConfig,
    pub webui: WebUIConfig,
    #[serde(default)]
    pub practice: PracticeConfig,
    #[serde(default)]
    pub capture: CaptureConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    #[serde(default = "ServerConfig::default_max_request_size_mb")]
    pub max_request_size_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServicesConfig {
    pub translation_base_url: String,
    pub asr_base_url: String,
    pub tts_base_url: String,
    /// Unset means the HTTP client's own default (no overall timeout).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default = "TranslationConfig::default_max_length")]
    pub max_length: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    pub name: String,
    pub base_url: String,
    pub convention: RelayConvention,
}

/// Candidate names per operation, tried in the listed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatesConfig {
    #[serde(default = "CandidatesConfig::default_relayed")]
    pub translate: Vec<String>,
    #[serde(default = "CandidatesConfig::default_relayed")]
    pub transcribe: Vec<String>,
    #[serde(default = "CandidatesConfig::default_direct_only")]
    pub score: Vec<String>,
    #[serde(default = "CandidatesConfig::default_direct_only")]
    pub synthesize: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebUIConfig {
    pub title: String,
    pub max_file_size_mb: u64,
    pub allowed_extensions: Vec<String>,
    #[serde(default = "WebUIConfig::default_theme_color")]
    pub theme_color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PracticeConfig {
    #[serde(default = "PracticeConfig::default_pass_threshold")]
    pub pass_threshold: f64,
    #[serde(default = "PracticeConfig::default_sentences")]
    pub sentences: Vec<PracticeSentence>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PracticeSentence {
    pub atayal: String,
    pub phonetic: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    #[serde(default = "CaptureConfig::default_microphone_enabled")]
    pub microphone_enabled: bool,
    #[serde(default = "CaptureConfig::default_mime_type")]
    pub mime_type: String,
}

impl ServerConfig {
    const fn default_max_request_size_mb() -> u64 {
        30
    }
}

impl TranslationConfig {
    const fn default_max_length() -> u32 {
        128
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            max_length: Self::default_max_length(),
        }
    }
}

impl CandidatesConfig {
    fn default_relayed() -> Vec<String> {
        vec![
            DIRECT.to_string(),
            "allorigins".to_string(),
            "cors-anywhere".to_string(),
        ]
    }

    fn default_direct_only() -> Vec<String> {
        vec![DIRECT.to_string()]
    }

    pub fn names_for(&self, kind: OperationKind) -> &[String] {
        match kind {
            OperationKind::Translate => &self.translate,
            OperationKind::Transcribe => &self.transcribe,
            OperationKind::Score => &self.score,
            OperationKind::Synthesize => &self.synthesize,
        }
    }
}

impl Default for CandidatesConfig {
    fn default() -> Self {
        Self {
            translate: Self::default_relayed(),
            transcribe: Self::default_relayed(),
            score: Self::default_direct_only(),
            synthesize: Self::default_direct_only(),
        }
    }
}

impl WebUIConfig {
    fn default_theme_color() -> String {
        "#f57983".to_string()
    }
}

impl PracticeConfig {
    const fn default_pass_threshold() -> f64 {
        0.75
    }

    fn default_sentences() -> Vec<PracticeSentence> {
        [
            ("mita", "mi-ta"),
            ("squliq", "su-liq"),
            ("yutas", "yu-tas"),
            ("patas", "pa-tas"),
        ]
        .iter()
        .map(|(atayal, phonetic)| PracticeSentence {
            atayal: atayal.to_string(),
            phonetic: phonetic.to_string(),
        })
        .collect()
    }
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            pass_threshold: Self::default_pass_threshold(),
            sentences: Self::default_sentences(),
        }
    }
}

impl CaptureConfig {
    const fn default_microphone_enabled() -> bool {
        true
    }

    fn default_mime_type() -> String {
        "audio/webm".to_string()
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            microphone_enabled: Self::default_microphone_enabled(),
            mime_type: Self::default_mime_type(),
        }
    }
}

impl Config {
    fn default_relays() -> Vec<RelayConfig> {
        vec![
            RelayConfig {
                name: "allorigins".to_string(),
                base_url: "https://api.allorigins.win/raw".to_string(),
                convention: RelayConvention::EncodedQuery,
            },
            RelayConfig {
                name: "cors-anywhere".to_string(),
                base_url: "https://cors-anywhere.herokuapp.com/".to_string(),
                convention: RelayConvention::Concatenate,
            },
        ]
    }

    pub fn load_or_create_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();

        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            let default_config = Self::default();
            let content = toml::to_string(&default_config)?;
            fs::write(path, content)?;
            log::info!("wrote default configuration to {}", path.display());
            Ok(default_config)
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.port == 0 {
            return Err(anyhow::anyhow!("server port is invalid"));
        }

        if self.server.max_request_size_mb == 0 {
            return Err(anyhow::anyhow!("max request size is invalid"));
        }

        if self.server.max_request_size_mb < self.webui.max_file_size_mb {
            return Err(anyhow::anyhow!(
                "max request size must be at least the max file size"
            ));
        }

        Self::validate_base_url(&self.services.translation_base_url, "translation service")?;
        Self::validate_base_url(&self.services.asr_base_url, "speech recognition service")?;
        Self::validate_base_url(&self.services.tts_base_url, "speech synthesis service")?;

        if self.services.timeout_seconds == Some(0) {
            return Err(anyhow::anyhow!("service timeout must be positive when set"));
        }

        if self.translation.max_length == 0 {
            return Err(anyhow::anyhow!("translation max length is invalid"));
        }

        let mut relay_names = HashSet::new();
        for relay in &self.relays {
            if relay.name == DIRECT {
                return Err(anyhow::anyhow!("relay name '{}' is reserved", DIRECT));
            }
            if relay.convention == RelayConvention::Direct {
                return Err(anyhow::anyhow!(
                    "relay '{}' needs an encoded-query or concatenate convention",
                    relay.name
                ));
            }
            if !relay_names.insert(relay.name.as_str()) {
                return Err(anyhow::anyhow!("relay '{}' is declared twice", relay.name));
            }
            Self::validate_base_url(&relay.base_url, &format!("relay '{}'", relay.name))?;
        }

        for kind in OperationKind::ALL {
            for name in self.candidates.names_for(kind) {
                if name != DIRECT && !relay_names.contains(name.as_str()) {
                    return Err(anyhow::anyhow!(
                        "candidate '{}' for {} is not a declared relay",
                        name,
                        kind.label()
                    ));
                }
            }
        }

        // relays re-encode the multipart body the scoring API needs verbatim
        if self.candidates.score.iter().any(|name| name != DIRECT) {
            return Err(anyhow::anyhow!("pronunciation scoring only supports the direct endpoint"));
        }

        if self.webui.title.trim().is_empty() {
            return Err(anyhow::anyhow!("page title is not set"));
        }

        if self.webui.max_file_size_mb == 0 {
            return Err(anyhow::anyhow!("max file size is invalid"));
        }

        if !(0.0..=1.0).contains(&self.practice.pass_threshold) {
            return Err(anyhow::anyhow!("pass threshold must be between 0 and 1"));
        }

        if self.capture.mime_type.trim().is_empty() {
            return Err(anyhow::anyhow!("capture mime type is not set"));
        }

        Ok(())
    }

    fn validate_base_url(value: &str, label: &str) -> anyhow::Result<()> {
        if value.trim().is_empty() {
            return Err(anyhow::anyhow!("{} URL is not set", label));
        }
        let url = reqwest::Url::parse(value)
            .map_err(|e| anyhow::anyhow!("{} URL is invalid: {}", label, e))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(anyhow::anyhow!("{} URL has unsupported scheme {}", label, other)),
        }
    }

    /// Resolves the ordered candidate list of `kind`. Unknown names are skipped.
    pub fn candidates_for(&self, kind: OperationKind) -> Vec<EndpointCandidate> {
        self.candidates
            .names_for(kind)
            .iter()
            .filter_map(|name| {
                if name == DIRECT {
                    return Some(EndpointCandidate::direct());
                }
                let relay = self.relays.iter().find(|relay| &relay.name == name);
                if relay.is_none() {
                    log::warn!("ignoring unknown candidate '{}' for {}", name, kind.label());
                }
                relay.map(|relay| {
                    EndpointCandidate::relay(&relay.name, &relay.base_url, relay.convention)
                })
            })
            .collect()
    }

    pub fn service_timeout(&self) -> Option<Duration> {
        self.services.timeout_seconds.map(Duration::from_secs)
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn max_file_size_bytes(&self) -> usize {
        (self.webui.max_file_size_mb * 1024 * 1024) as usize
    }

    pub fn max_request_size_bytes(&self) -> usize {
        (self.server.max_request_size_mb * 1024 * 1024) as usize
    }

    pub fn is_allowed_extension(&self, extension: &str) -> bool {
        self.webui
            .allowed_extensions
            .iter()
            .any(|ext| ext.eq_ignore_ascii_case(extension))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
                max_request_size_mb: ServerConfig::default_max_request_size_mb(),
            },
            services: ServicesConfig {
                translation_base_url: "https://service.dltechlab.top/atayal_trans".to_string(),
                asr_base_url: "https://service.dltechlab.top/atayal_asr".to_string(),
                tts_base_url: "https://service.dltechlab.top/atayal_tts".to_string(),
                timeout_seconds: None,
            },
            translation: TranslationConfig::default(),
            relays: Self::default_relays(),
            candidates: CandidatesConfig::default(),
            webui: WebUIConfig {
                title: "Atayal Language Studio".to_string(),
                max_file_size_mb: 25,
                allowed_extensions: vec![
                    "wav".to_string(),
                    "mp3".to_string(),
                    "m4a".to_string(),
                    "flac".to_string(),
                    "ogg".to_string(),
                    "webm".to_string(),
                    "mp4".to_string(),
                ],
                theme_color: WebUIConfig::default_theme_color(),
            },
            practice: PracticeConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}
