//! Exclusive audio playback.
//!
//! A clip becomes a transient resource (an object URL the page's audio
//! element loads). Only one resource is alive: starting a new clip halts and
//! releases the previous one first.

use crate::error::PlaybackError;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub bytes: Bytes,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaybackTicket {
    pub id: String,
    pub url: String,
}

pub trait PlaybackBackend: Send + Sync {
    fn create(&self, clip: AudioClip) -> Result<PlaybackTicket, PlaybackError>;
    fn start(&self, ticket: &PlaybackTicket) -> Result<(), PlaybackError>;
    fn halt(&self, ticket: &PlaybackTicket);
    fn release(&self, ticket: &PlaybackTicket);
}

pub struct AudioPlayer<B> {
    backend: B,
    current: Mutex<Option<PlaybackTicket>>,
}

impl<B: PlaybackBackend> AudioPlayer<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            current: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn current(&self) -> Option<PlaybackTicket> {
        self.current.lock().clone()
    }

    /// Replaces whatever is playing with `clip`. The most recent call wins.
    pub fn play(&self, clip: AudioClip) -> Result<PlaybackTicket, PlaybackError> {
        if clip.bytes.is_empty() {
            return Err(PlaybackError::EmptyAudio);
        }

        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            log::debug!("stopping playback {} for a newer clip", previous.id);
            self.backend.halt(&previous);
            self.backend.release(&previous);
        }

        let ticket = self.backend.create(clip)?;
        if let Err(err) = self.backend.start(&ticket) {
            self.backend.release(&ticket);
            return Err(err);
        }

        *current = Some(ticket.clone());
        Ok(ticket)
    }

    /// Natural end of playback. Completions for superseded clips are ignored.
    pub fn finished(&self, id: &str) -> bool {
        let mut current = self.current.lock();
        match current.as_ref() {
            Some(ticket) if ticket.id == id => {
                if let Some(ticket) = current.take() {
                    self.backend.release(&ticket);
                }
                true
            }
            _ => false,
        }
    }

    pub fn stop(&self) -> bool {
        match self.current.lock().take() {
            Some(ticket) => {
                self.backend.halt(&ticket);
                self.backend.release(&ticket);
                true
            }
            None => false,
        }
    }
}

struct StoredClip {
    clip: AudioClip,
    playing: bool,
    created_at: DateTime<Utc>,
}

/// In-memory object URLs served under `url_prefix`.
pub struct ObjectUrlStore {
    url_prefix: String,
    clips: Mutex<HashMap<String, StoredClip>>,
}

impl ObjectUrlStore {
    pub fn new(url_prefix: impl Into<String>) -> Self {
        Self {
            url_prefix: url_prefix.into(),
            clips: Mutex::new(HashMap::new()),
        }
    }

    pub fn fetch(&self, id: &str) -> Option<AudioClip> {
        self.clips.lock().get(id).map(|stored| stored.clip.clone())
    }

    pub fn is_playing(&self, id: &str) -> bool {
        self.clips
            .lock()
            .get(id)
            .map(|stored| stored.playing)
            .unwrap_or(false)
    }

    pub fn live_count(&self) -> usize {
        self.clips.lock().len()
    }
}

impl PlaybackBackend for ObjectUrlStore {
    fn create(&self, clip: AudioClip) -> Result<PlaybackTicket, PlaybackError> {
        let id = uuid::Uuid::new_v4().to_string();
        let ticket = PlaybackTicket {
            url: format!("{}/{}", self.url_prefix.trim_end_matches('/'), id),
            id: id.clone(),
        };
        self.clips.lock().insert(
            id,
            StoredClip {
                clip,
                playing: false,
                created_at: Utc::now(),
            },
        );
        Ok(ticket)
    }

    fn start(&self, ticket: &PlaybackTicket) -> Result<(), PlaybackError> {
        match self.clips.lock().get_mut(&ticket.id) {
            Some(stored) => {
                stored.playing = true;
                Ok(())
            }
            None => Err(PlaybackError::Resource(format!(
                "object URL {} was already revoked",
                ticket.url
            ))),
        }
    }

    fn halt(&self, ticket: &PlaybackTicket) {
        if let Some(stored) = self.clips.lock().get_mut(&ticket.id) {
            stored.playing = false;
        }
    }

    fn release(&self, ticket: &PlaybackTicket) {
        if let Some(stored) = self.clips.lock().remove(&ticket.id) {
            let lifetime = Utc::now() - stored.created_at;
            log::debug!(
                "revoked {} after {} ms",
                ticket.url,
                lifetime.num_milliseconds()
            );
        }
    }
}
