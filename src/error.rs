use thiserror::Error;

/// Why a single endpoint candidate did not produce a usable response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttemptFailure {
    #[error("{candidate}: network unreachable: {message}")]
    Unreachable { candidate: String, message: String },
    #[error("{candidate}: HTTP {status}: {body}")]
    Service {
        candidate: String,
        status: u16,
        body: String,
    },
}

impl AttemptFailure {
    pub fn candidate(&self) -> &str {
        match self {
            AttemptFailure::Unreachable { candidate, .. } => candidate,
            AttemptFailure::Service { candidate, .. } => candidate,
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("all {attempts} endpoint candidates failed ({})", describe_last(.last))]
    AllCandidatesExhausted {
        attempts: usize,
        last: Option<AttemptFailure>,
    },
    #[error("response could not be decoded: {0}")]
    Decode(String),
    #[error("HTTP client could not be created: {0}")]
    Client(String),
}

fn describe_last(last: &Option<AttemptFailure>) -> String {
    match last {
        Some(failure) => format!("last error: {}", failure),
        None => "no candidates configured".to_string(),
    }
}

impl RemoteError {
    /// True when the final attempt never reached a server.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            RemoteError::AllCandidatesExhausted {
                last: Some(AttemptFailure::Unreachable { .. }),
                ..
            }
        )
    }

    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        match self {
            RemoteError::AllCandidatesExhausted { last, .. } => last.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),
    #[error("a recording session is already active")]
    AlreadyRecording,
    #[error("no recording session is active")]
    NotRecording,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("audio payload is empty")]
    EmptyAudio,
    #[error("playback resource failed: {0}")]
    Resource(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Capture(#[from] CaptureError),
    #[error(transparent)]
    Playback(#[from] PlaybackError),
    #[error("invalid request: {0}")]
    InvalidInput(String),
}

impl ServiceError {
    pub fn is_network(&self) -> bool {
        matches!(self, ServiceError::Remote(err) if err.is_network())
    }
}
