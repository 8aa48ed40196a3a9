//! The five remote operations the pages use.

use crate::client::{OperationRequest, RemoteClient};
use crate::config::Config;
use crate::error::{RemoteError, ServiceError};
use crate::normalize::{self, PronunciationResult};
use crate::playback::AudioClip;
use crate::relay::EndpointCandidate;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Translate,
    Transcribe,
    Score,
    Synthesize,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Translate,
        OperationKind::Transcribe,
        OperationKind::Score,
        OperationKind::Synthesize,
    ];

    pub fn label(self) -> &'static str {
        match self {
            OperationKind::Translate => "translation",
            OperationKind::Transcribe => "transcription",
            OperationKind::Score => "pronunciation scoring",
            OperationKind::Synthesize => "speech synthesis",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranslationDirection {
    #[serde(rename = "zh-to-atayal")]
    ChineseToAtayal,
    #[serde(rename = "atayal-to-zh")]
    AtayalToChinese,
}

impl TranslationDirection {
    fn path(self) -> &'static str {
        match self {
            TranslationDirection::ChineseToAtayal => "/translate/chinese-to-atayal",
            TranslationDirection::AtayalToChinese => "/translate/atayal-to-chinese",
        }
    }

    pub fn language_id(self) -> &'static str {
        match self {
            TranslationDirection::ChineseToAtayal => "zh",
            TranslationDirection::AtayalToChinese => "atayal",
        }
    }

    pub fn result_field(self) -> &'static str {
        match self {
            TranslationDirection::ChineseToAtayal => "atayal_text",
            TranslationDirection::AtayalToChinese => "chinese_text",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionTarget {
    Chinese,
    Atayal,
}

impl TranscriptionTarget {
    fn path(self) -> &'static str {
        match self {
            TranscriptionTarget::Chinese => "/to_chinese/",
            TranscriptionTarget::Atayal => "/to_atayal/",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chinese" | "zh" => Some(TranscriptionTarget::Chinese),
            "atayal" => Some(TranscriptionTarget::Atayal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    #[default]
    Male,
    Female,
}

impl Voice {
    pub fn speaker_id(self) -> u8 {
        match self {
            Voice::Female => 0,
            Voice::Male => 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TranslationRequest<'a> {
    pub language_id: &'static str,
    pub max_length: u32,
    pub reference_id: String,
    pub text: &'a str,
}

impl<'a> TranslationRequest<'a> {
    pub fn new(direction: TranslationDirection, text: &'a str, max_length: u32) -> Self {
        Self {
            language_id: direction.language_id(),
            max_length,
            reference_id: format!("req-{}", chrono::Utc::now().timestamp_millis()),
            text,
        }
    }
}

#[derive(Debug, Clone)]
struct CandidateSets {
    translate: Vec<EndpointCandidate>,
    transcribe: Vec<EndpointCandidate>,
    score: Vec<EndpointCandidate>,
    synthesize: Vec<EndpointCandidate>,
}

#[derive(Debug, Clone)]
pub struct AtayalServices {
    client: RemoteClient,
    translation_base_url: String,
    asr_base_url: String,
    tts_base_url: String,
    max_length: u32,
    candidates: CandidateSets,
}

impl AtayalServices {
    pub fn new(config: &Config) -> Result<Self, RemoteError> {
        let client = RemoteClient::new(config.service_timeout())?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: RemoteClient, config: &Config) -> Self {
        Self {
            client,
            translation_base_url: trim_base(&config.services.translation_base_url),
            asr_base_url: trim_base(&config.services.asr_base_url),
            tts_base_url: trim_base(&config.services.tts_base_url),
            max_length: config.translation.max_length,
            candidates: CandidateSets {
                translate: config.candidates_for(OperationKind::Translate),
                transcribe: config.candidates_for(OperationKind::Transcribe),
                score: config.candidates_for(OperationKind::Score),
                synthesize: config.candidates_for(OperationKind::Synthesize),
            },
        }
    }

    pub fn candidates(&self, kind: OperationKind) -> &[EndpointCandidate] {
        match kind {
            OperationKind::Translate => &self.candidates.translate,
            OperationKind::Transcribe => &self.candidates.transcribe,
            OperationKind::Score => &self.candidates.score,
            OperationKind::Synthesize => &self.candidates.synthesize,
        }
    }

    pub async fn translate(
        &self,
        direction: TranslationDirection,
        text: &str,
    ) -> Result<String, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "text to translate is empty".to_string(),
            ));
        }

        let url = format!("{}{}", self.translation_base_url, direction.path());
        let body = TranslationRequest::new(direction, text, self.max_length);
        let body = serde_json::to_value(&body)
            .map_err(|e| ServiceError::InvalidInput(format!("translation request: {}", e)))?;
        let request = OperationRequest::post_json(url, body);

        let raw = self
            .client
            .deliver(&request, self.candidates(OperationKind::Translate))
            .await?;
        Ok(normalize::translation_text(&raw.body, direction.result_field())?)
    }

    pub async fn transcribe(
        &self,
        audio: Bytes,
        file_name: &str,
        mime_type: Option<&str>,
        target: TranscriptionTarget,
    ) -> Result<String, ServiceError> {
        let url = format!("{}{}", self.asr_base_url, target.path());
        log::info!("transcribing {} ({} bytes) to {:?}", file_name, audio.len(), target);
        let request = OperationRequest::post_file(url, file_name, mime_type, audio);

        let raw = self
            .client
            .deliver(&request, self.candidates(OperationKind::Transcribe))
            .await?;
        Ok(normalize::transcript_text(&raw.body)?)
    }

    pub async fn score(
        &self,
        audio: Bytes,
        reference: &str,
    ) -> Result<PronunciationResult, ServiceError> {
        if reference.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "reference sentence is empty".to_string(),
            ));
        }

        let url = format!(
            "{}{}?ans={}",
            self.asr_base_url,
            TranscriptionTarget::Atayal.path(),
            urlencoding::encode(reference)
        );
        let request = OperationRequest::post_file(url, "recording.wav", Some("audio/wav"), audio);

        let raw = self
            .client
            .deliver(&request, self.candidates(OperationKind::Score))
            .await?;
        Ok(normalize::pronunciation(&raw.body)?)
    }

    pub async fn synthesize(
        &self,
        text: &str,
        voice: Voice,
        label: &str,
    ) -> Result<AudioClip, ServiceError> {
        if text.trim().is_empty() {
            return Err(ServiceError::InvalidInput(
                "text to synthesize is empty".to_string(),
            ));
        }

        let speaker_id = voice.speaker_id().to_string();
        let url = reqwest::Url::parse_with_params(
            &format!("{}/inference", self.tts_base_url),
            &[("text", text), ("spkid", speaker_id.as_str()), ("filename", label)],
        )
        .map_err(|e| ServiceError::InvalidInput(format!("synthesis URL: {}", e)))?;
        let request = OperationRequest::get(url.as_str());

        let raw = self
            .client
            .deliver(&request, self.candidates(OperationKind::Synthesize))
            .await?;
        Ok(AudioClip {
            mime_type: raw
                .content_type
                .unwrap_or_else(|| "audio/wav".to_string()),
            bytes: raw.body,
        })
    }
}

fn trim_base(value: &str) -> String {
    value.trim().trim_end_matches('/').to_string()
}
