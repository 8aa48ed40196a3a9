use crate::capture::{BrowserMicrophone, SessionStatus, SpeechCapture};
use crate::config::{Config, PracticeSentence};
use crate::error::{CaptureError, PlaybackError, RemoteError, ServiceError};
use crate::playback::{AudioPlayer, ObjectUrlStore, PlaybackTicket};
use crate::services::{AtayalServices, OperationKind, TranscriptionTarget, TranslationDirection, Voice};
use axum::{
    extract::{Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const AUDIO_URL_PREFIX: &str = "/api/audio";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub services: Arc<AtayalServices>,
    pub capture: Arc<Mutex<SpeechCapture<BrowserMicrophone>>>,
    pub player: Arc<AudioPlayer<ObjectUrlStore>>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, RemoteError> {
        let services = AtayalServices::new(&config)?;
        let capture = SpeechCapture::new(
            BrowserMicrophone::new(config.capture.microphone_enabled),
            config.capture.mime_type.clone(),
        );

        Ok(Self {
            services: Arc::new(services),
            capture: Arc::new(Mutex::new(capture)),
            player: Arc::new(AudioPlayer::new(ObjectUrlStore::new(AUDIO_URL_PREFIX))),
            config: Arc::new(config),
        })
    }
}

fn encode_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn respond<T>(message: &str, data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        message: message.to_string(),
        data,
    }))
}

fn reject(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: error.into(),
        }),
    )
}

pub fn status_for(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ServiceError::Capture(CaptureError::PermissionDenied(_)) => StatusCode::FORBIDDEN,
        ServiceError::Capture(_) => StatusCode::CONFLICT,
        ServiceError::Remote(RemoteError::Client(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        ServiceError::Remote(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Playback(PlaybackError::EmptyAudio) => StatusCode::BAD_GATEWAY,
        ServiceError::Playback(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// User-facing wording; network failures are told apart from service failures.
pub fn describe_failure(kind: OperationKind, err: &ServiceError) -> String {
    match err {
        ServiceError::InvalidInput(message) => message.clone(),
        ServiceError::Capture(capture) => capture.to_string(),
        _ if err.is_network() => {
            "Network error: please check your internet connection and try again.".to_string()
        }
        _ => format!("The {} service is temporarily unavailable: {}", kind.label(), err),
    }
}

fn service_failure(kind: OperationKind, err: ServiceError) -> ApiError {
    log::error!("{} failed: {}", kind.label(), err);
    reject(status_for(&err), describe_failure(kind, &err))
}

fn capture_failure(err: CaptureError) -> ApiError {
    log::warn!("recording request rejected: {}", err);
    let err = ServiceError::from(err);
    reject(status_for(&err), err.to_string())
}

pub async fn index(State(state): State<AppState>) -> Html<String> {
    let webui = &state.config.webui;
    let accept_types = webui
        .allowed_extensions
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");
    let title = encode_html(&webui.title);

    let practice_rows = state
        .config
        .practice
        .sentences
        .iter()
        .enumerate()
        .map(|(index, sentence)| {
            let atayal = encode_html(&sentence.atayal);
            format!(
                r#"                <li class="practice-row" data-row="{index}" data-reference="{atayal}">
                    <span class="phonetic">{phonetic}</span>
                    <span class="atayal">{atayal}</span>
                    <button type="button" class="listen-btn" data-voice="male" data-label="learn_{index}">♂</button>
                    <button type="button" class="listen-btn" data-voice="female" data-label="learn_{index}">♀</button>
                    <button type="button" class="record-btn">Record</button>
                    <span class="compare-result"></span>
                </li>
"#,
                index = index,
                atayal = atayal,
                phonetic = encode_html(&sentence.phonetic),
            )
        })
        .collect::<String>();

    let html = format!(
        r#"<!DOCTYPE html>
<html lang="zh-Hant">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <style>:root {{ --theme-color: {theme}; }}</style>
</head>
<body>
    <div id="app-config" data-pass-threshold="{threshold}" data-max-file-size-mb="{max_mb}" data-capture-mime="{capture_mime}" data-audio-prefix="{audio_prefix}" style="display: none;"></div>
    <header><h1>{title}</h1></header>
    <main>
        <section id="translate-zh-atayal" data-direction="zh-to-atayal">
            <h2>中文 → 泰雅語 / Chinese to Atayal</h2>
            <textarea class="translate-input" placeholder="請輸入中文"></textarea>
            <button type="button" class="translate-btn">Translate</button>
            <div class="translate-output"></div>
        </section>
        <section id="translate-atayal-zh" data-direction="atayal-to-zh">
            <h2>泰雅語 → 中文 / Atayal to Chinese</h2>
            <textarea class="translate-input" placeholder="Atayal text"></textarea>
            <button type="button" class="translate-btn">Translate</button>
            <div class="translate-output"></div>
        </section>
        <section id="transcribe">
            <h2>語音辨識 / Speech Recognition</h2>
            <select id="transcribe-target">
                <option value="chinese">中文</option>
                <option value="atayal">泰雅語</option>
            </select>
            <input type="file" id="file-input" accept="{accept}">
            <button type="button" id="record-btn">Record</button>
            <div id="transcript-output"></div>
        </section>
        <section id="practice">
            <h2>學習目標句 / Learn Atayal Sentences</h2>
            <ul class="practice-list">
{rows}            </ul>
        </section>
    </main>
</body>
</html>
"#,
        title = title,
        theme = encode_html(&webui.theme_color),
        threshold = state.config.practice.pass_threshold,
        max_mb = webui.max_file_size_mb,
        capture_mime = encode_html(&state.config.capture.mime_type),
        audio_prefix = AUDIO_URL_PREFIX,
        accept = accept_types,
        rows = practice_rows,
    );

    Html(html)
}

#[derive(Debug, Serialize)]
pub struct SentencesData {
    pub pass_threshold: f64,
    pub sentences: Vec<PracticeSentence>,
}

pub async fn sentences(State(state): State<AppState>) -> ApiResult<SentencesData> {
    respond(
        "practice sentences",
        SentencesData {
            pass_threshold: state.config.practice.pass_threshold,
            sentences: state.config.practice.sentences.clone(),
        },
    )
}

#[derive(Debug, Deserialize)]
pub struct TranslateForm {
    pub text: String,
    pub direction: TranslationDirection,
}

#[derive(Debug, Serialize)]
pub struct TranslationData {
    pub text: String,
    pub direction: TranslationDirection,
}

pub async fn translate(
    State(state): State<AppState>,
    Json(form): Json<TranslateForm>,
) -> ApiResult<TranslationData> {
    let text = state
        .services
        .translate(form.direction, &form.text)
        .await
        .map_err(|e| service_failure(OperationKind::Translate, e))?;

    respond(
        "translation completed",
        TranslationData {
            text,
            direction: form.direction,
        },
    )
}

struct UploadForm {
    file_data: Bytes,
    filename: String,
    mime_type: Option<String>,
    target: Option<String>,
    reference: Option<String>,
}

async fn read_upload(config: &Config, mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut file_data: Option<Bytes> = None;
    let mut filename: Option<String> = None;
    let mut mime_type: Option<String> = None;
    let mut target: Option<String> = None;
    let mut reference: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        reject(
            StatusCode::BAD_REQUEST,
            format!("could not read multipart data: {}", e),
        )
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                mime_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| {
                    reject(
                        StatusCode::BAD_REQUEST,
                        format!("could not read file data: {}", e),
                    )
                })?;

                if data.len() > config.max_file_size_bytes() {
                    return Err(reject(
                        StatusCode::PAYLOAD_TOO_LARGE,
                        format!(
                            "file exceeds the size limit ({} MB)",
                            config.webui.max_file_size_mb
                        ),
                    ));
                }

                file_data = Some(data);
            }
            "target" | "reference" => {
                let value = field.text().await.map_err(|e| {
                    reject(
                        StatusCode::BAD_REQUEST,
                        format!("could not read {} field: {}", field_name, e),
                    )
                })?;
                if !value.trim().is_empty() {
                    if field_name == "target" {
                        target = Some(value);
                    } else {
                        reference = Some(value);
                    }
                }
            }
            _ => {}
        }
    }

    let file_data = file_data
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "no audio file was uploaded"))?;
    let filename =
        filename.ok_or_else(|| reject(StatusCode::BAD_REQUEST, "uploaded file has no name"))?;

    if let Some(ext) = filename.rsplit('.').next() {
        if !config.is_allowed_extension(ext) {
            return Err(reject(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                format!(
                    "unsupported file type; allowed: {}",
                    config.webui.allowed_extensions.join(", ")
                ),
            ));
        }
    }

    Ok(UploadForm {
        file_data,
        filename,
        mime_type,
        target,
        reference,
    })
}

fn parse_target(value: Option<&str>) -> Result<TranscriptionTarget, ApiError> {
    let value =
        value.ok_or_else(|| reject(StatusCode::BAD_REQUEST, "target language is not specified"))?;
    TranscriptionTarget::parse(value).ok_or_else(|| {
        reject(
            StatusCode::BAD_REQUEST,
            format!("unknown target language: {}", value),
        )
    })
}

#[derive(Debug, Serialize)]
pub struct TranscriptData {
    pub text: String,
    pub target: TranscriptionTarget,
}

pub async fn transcribe(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<TranscriptData> {
    let upload = read_upload(&state.config, multipart).await?;
    let target = parse_target(upload.target.as_deref())?;

    let text = state
        .services
        .transcribe(
            upload.file_data,
            &upload.filename,
            upload.mime_type.as_deref(),
            target,
        )
        .await
        .map_err(|e| service_failure(OperationKind::Transcribe, e))?;

    respond("transcription completed", TranscriptData { text, target })
}

#[derive(Debug, Serialize)]
pub struct ScoreData {
    pub reference: String,
    pub transcription: String,
    pub score: Option<f64>,
    pub passed: Option<bool>,
}

async fn score_recording(
    state: &AppState,
    audio: Bytes,
    reference: String,
) -> Result<ScoreData, ApiError> {
    let result = state
        .services
        .score(audio, &reference)
        .await
        .map_err(|e| service_failure(OperationKind::Score, e))?;

    Ok(ScoreData {
        passed: result.passes(state.config.practice.pass_threshold),
        reference,
        transcription: result.transcription,
        score: result.score,
    })
}

pub async fn score(State(state): State<AppState>, multipart: Multipart) -> ApiResult<ScoreData> {
    let upload = read_upload(&state.config, multipart).await?;
    let reference = upload
        .reference
        .ok_or_else(|| reject(StatusCode::BAD_REQUEST, "reference sentence is not specified"))?;

    let data = score_recording(&state, upload.file_data, reference).await?;
    respond("pronunciation scored", data)
}

#[derive(Debug, Deserialize)]
pub struct SpeechForm {
    pub text: String,
    #[serde(default)]
    pub voice: Voice,
    #[serde(default)]
    pub label: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PlaybackData {
    #[serde(flatten)]
    pub ticket: PlaybackTicket,
    pub mime_type: String,
    pub bytes: usize,
}

pub async fn speech(
    State(state): State<AppState>,
    Json(form): Json<SpeechForm>,
) -> ApiResult<PlaybackData> {
    let label = form.label.as_deref().unwrap_or("test");
    let clip = state
        .services
        .synthesize(&form.text, form.voice, label)
        .await
        .map_err(|e| service_failure(OperationKind::Synthesize, e))?;

    let mime_type = clip.mime_type.clone();
    let bytes = clip.bytes.len();
    let ticket = state
        .player
        .play(clip)
        .map_err(|e| service_failure(OperationKind::Synthesize, e.into()))?;

    respond(
        "speech ready",
        PlaybackData {
            ticket,
            mime_type,
            bytes,
        },
    )
}

pub async fn audio(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.player.backend().fetch(&id) {
        Some(clip) => ([(header::CONTENT_TYPE, clip.mime_type)], clip.bytes).into_response(),
        None => reject(StatusCode::NOT_FOUND, "audio is no longer available").into_response(),
    }
}

pub async fn audio_ended(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    let released = state.player.finished(&id);
    respond("playback finished", json!({ "released": released }))
}

pub async fn audio_stop(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let stopped = state.player.stop();
    respond("playback stopped", json!({ "stopped": stopped }))
}

pub async fn recording_start(State(state): State<AppState>) -> ApiResult<SessionStatus> {
    state.capture.lock().start().map_err(capture_failure)?;
    respond(
        "recording started",
        SessionStatus {
            chunk_count: 0,
            buffered_bytes: 0,
        },
    )
}

pub async fn recording_chunk(
    State(state): State<AppState>,
    chunk: Bytes,
) -> ApiResult<SessionStatus> {
    let mut capture = state.capture.lock();
    let status = capture.push_chunk(chunk).map_err(capture_failure)?;

    if status.buffered_bytes > state.config.max_file_size_bytes() {
        capture.cancel();
        return Err(reject(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "recording exceeds the size limit ({} MB)",
                state.config.webui.max_file_size_mb
            ),
        ));
    }

    respond("chunk buffered", status)
}

#[derive(Debug, Deserialize)]
pub struct RecordingStopParams {
    pub target: Option<String>,
    pub reference: Option<String>,
}

pub async fn recording_stop(
    State(state): State<AppState>,
    Query(params): Query<RecordingStopParams>,
) -> ApiResult<serde_json::Value> {
    let reference = params.reference.filter(|value| !value.trim().is_empty());
    // a bad target must not consume the session
    let target = match (&reference, params.target.as_deref()) {
        (None, Some(value)) => Some(parse_target(Some(value))?),
        _ => None,
    };

    let recorded = state.capture.lock().stop().map_err(capture_failure)?;
    let recording = json!({
        "bytes": recorded.len(),
        "chunks": recorded.chunk_count,
        "mime_type": recorded.mime_type,
    });

    if let Some(reference) = reference {
        let data = score_recording(&state, recorded.bytes, reference).await?;
        return respond(
            "pronunciation scored",
            json!({ "recording": recording, "score": data }),
        );
    }

    if let Some(target) = target {
        let text = state
            .services
            .transcribe(
                recorded.bytes.clone(),
                &recorded.file_name(),
                Some(recorded.mime_type.as_str()),
                target,
            )
            .await
            .map_err(|e| service_failure(OperationKind::Transcribe, e))?;
        return respond(
            "transcription completed",
            json!({ "recording": recording, "transcript": TranscriptData { text, target } }),
        );
    }

    respond("recording stopped", json!({ "recording": recording }))
}

pub async fn recording_cancel(State(state): State<AppState>) -> ApiResult<serde_json::Value> {
    let cancelled = state.capture.lock().cancel();
    respond("recording cancelled", json!({ "cancelled": cancelled }))
}
