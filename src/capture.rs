//! Microphone capture, one session at a time.
//!
//! The browser owns the real microphone; it streams encoder chunks here as
//! they become available. The session buffers them and produces one audio
//! object only when it is stopped.

use crate::error::CaptureError;
use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// An opened input device. Released exactly once when its session ends.
pub trait InputDevice: Send {
    fn label(&self) -> &str;
    fn release(&mut self);
}

/// Grants or refuses access to an input device.
pub trait MicrophoneAccess: Send + Sync {
    fn request(&self) -> Result<Box<dyn InputDevice>, CaptureError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedAudio {
    pub bytes: Bytes,
    pub mime_type: String,
    pub chunk_count: usize,
}

impl RecordedAudio {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn file_name(&self) -> String {
        let subtype = self
            .mime_type
            .split(';')
            .next()
            .and_then(|essence| essence.split('/').nth(1))
            .map(str::trim)
            .filter(|subtype| !subtype.is_empty())
            .unwrap_or("webm");
        let extension = match subtype {
            "x-wav" | "wave" => "wav",
            "mpeg" => "mp3",
            other => other,
        };
        format!("recording.{}", extension)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub chunk_count: usize,
    pub buffered_bytes: usize,
}

struct RecordingSession {
    device: Box<dyn InputDevice>,
    chunks: Vec<Bytes>,
    started_at: DateTime<Utc>,
}

impl RecordingSession {
    fn status(&self) -> SessionStatus {
        SessionStatus {
            chunk_count: self.chunks.len(),
            buffered_bytes: self.chunks.iter().map(Bytes::len).sum(),
        }
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        log::debug!("releasing input device {}", self.device.label());
        self.device.release();
    }
}

pub struct SpeechCapture<A> {
    access: A,
    mime_type: String,
    session: Option<RecordingSession>,
}

impl<A: MicrophoneAccess> SpeechCapture<A> {
    pub fn new(access: A, mime_type: impl Into<String>) -> Self {
        Self {
            access,
            mime_type: mime_type.into(),
            session: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.session.is_some() {
            return Err(CaptureError::AlreadyRecording);
        }

        let device = self.access.request()?;
        log::info!("recording started on {}", device.label());
        self.session = Some(RecordingSession {
            device,
            chunks: Vec::new(),
            started_at: Utc::now(),
        });
        Ok(())
    }

    pub fn push_chunk(&mut self, chunk: Bytes) -> Result<SessionStatus, CaptureError> {
        let session = self.session.as_mut().ok_or(CaptureError::NotRecording)?;
        if !chunk.is_empty() {
            session.chunks.push(chunk);
        }
        Ok(session.status())
    }

    /// Ends the session and joins every chunk into one buffer.
    pub fn stop(&mut self) -> Result<RecordedAudio, CaptureError> {
        let session = self.session.take().ok_or(CaptureError::NotRecording)?;

        let status = session.status();
        let mut buffer = BytesMut::with_capacity(status.buffered_bytes);
        for chunk in &session.chunks {
            buffer.extend_from_slice(chunk);
        }

        let elapsed = Utc::now() - session.started_at;
        log::info!(
            "recording stopped after {} ms: {} chunks, {} bytes",
            elapsed.num_milliseconds(),
            status.chunk_count,
            status.buffered_bytes
        );

        Ok(RecordedAudio {
            bytes: buffer.freeze(),
            mime_type: self.mime_type.clone(),
            chunk_count: status.chunk_count,
        })
    }

    /// Drops the session without producing audio.
    pub fn cancel(&mut self) -> bool {
        self.session.take().is_some()
    }
}

/// Access gate for chunks uploaded by the browser's recorder.
#[derive(Debug, Clone)]
pub struct BrowserMicrophone {
    enabled: bool,
}

impl BrowserMicrophone {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl MicrophoneAccess for BrowserMicrophone {
    fn request(&self) -> Result<Box<dyn InputDevice>, CaptureError> {
        if !self.enabled {
            return Err(CaptureError::PermissionDenied(
                "microphone capture is disabled".to_string(),
            ));
        }
        Ok(Box::new(UploadedStream {
            label: format!("browser-recorder-{}", uuid::Uuid::new_v4()),
        }))
    }
}

struct UploadedStream {
    label: String,
}

impl InputDevice for UploadedStream {
    fn label(&self) -> &str {
        &self.label
    }

    fn release(&mut self) {}
}
