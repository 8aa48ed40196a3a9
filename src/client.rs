use crate::error::{AttemptFailure, RemoteError};
use crate::relay::EndpointCandidate;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

#[derive(Debug, Clone)]
pub enum Payload {
    None,
    Json(serde_json::Value),
    File {
        field: String,
        file_name: String,
        mime_type: Option<String>,
        bytes: Bytes,
    },
}

/// One logical remote call, independent of the candidate that carries it.
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub method: Method,
    pub target_url: String,
    pub headers: Vec<(&'static str, String)>,
    pub payload: Payload,
}

impl OperationRequest {
    pub fn get(target_url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            target_url: target_url.into(),
            headers: Vec::new(),
            payload: Payload::None,
        }
    }

    pub fn post_json(target_url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            method: Method::Post,
            target_url: target_url.into(),
            headers: vec![("accept", "application/json".to_string())],
            payload: Payload::Json(body),
        }
    }

    pub fn post_file(
        target_url: impl Into<String>,
        file_name: &str,
        mime_type: Option<&str>,
        bytes: Bytes,
    ) -> Self {
        Self {
            method: Method::Post,
            target_url: target_url.into(),
            headers: vec![("accept", "application/json".to_string())],
            payload: Payload::File {
                field: "file".to_string(),
                file_name: file_name.to_string(),
                mime_type: mime_type.map(str::to_string),
                bytes,
            },
        }
    }
}

/// A successful response, fully read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub candidate: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

/// Best-effort delivery over an ordered candidate list.
///
/// Each candidate gets exactly one attempt, in order, with no backoff. The
/// first 2xx response wins. Nothing is cached between calls.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    client: reqwest::Client,
}

impl RemoteClient {
    pub fn new(timeout: Option<Duration>) -> Result<Self, RemoteError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| RemoteError::Client(e.to_string()))?;

        Ok(Self { client })
    }

    pub async fn deliver(
        &self,
        request: &OperationRequest,
        candidates: &[EndpointCandidate],
    ) -> Result<RawResponse, RemoteError> {
        let mut last: Option<AttemptFailure> = None;
        let mut attempts = 0;

        for candidate in candidates {
            attempts += 1;
            let url = candidate.resolve(&request.target_url);
            log::debug!(
                "{} {} via {} ({})",
                method_name(request.method),
                request.target_url,
                candidate.name,
                url
            );

            let response = match self.attempt(request, &url).await {
                Ok(response) => response,
                Err(err) => {
                    log::warn!("candidate {} unreachable: {}", candidate.name, err);
                    last = Some(AttemptFailure::Unreachable {
                        candidate: candidate.name.clone(),
                        message: err.to_string(),
                    });
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                log::warn!("candidate {} answered HTTP {}: {}", candidate.name, status, body);
                last = Some(AttemptFailure::Service {
                    candidate: candidate.name.clone(),
                    status: status.as_u16(),
                    body,
                });
                continue;
            }

            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await.map_err(|e| {
                RemoteError::Decode(format!("reading body from {}: {}", candidate.name, e))
            })?;

            if candidate.requires_proxy_encoding() {
                log::info!("{} delivered through relay {}", request.target_url, candidate.name);
            }

            return Ok(RawResponse {
                candidate: candidate.name.clone(),
                status: status.as_u16(),
                content_type,
                body,
            });
        }

        Err(RemoteError::AllCandidatesExhausted { attempts, last })
    }

    async fn attempt(
        &self,
        request: &OperationRequest,
        url: &str,
    ) -> Result<reqwest::Response, reqwest::Error> {
        let mut builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        };

        for (name, value) in &request.headers {
            builder = builder.header(*name, value.as_str());
        }

        // multipart bodies are consumed by send, so the form is rebuilt per attempt
        builder = match &request.payload {
            Payload::None => builder,
            Payload::Json(body) => builder.json(body),
            Payload::File {
                field,
                file_name,
                mime_type,
                bytes,
            } => {
                let mut part = Part::bytes(bytes.to_vec()).file_name(file_name.clone());
                if let Some(mime_type) = mime_type {
                    part = part.mime_str(mime_type)?;
                }
                builder.multipart(Form::new().part(field.clone(), part))
            }
        };

        builder.send().await
    }
}

fn method_name(method: Method) -> &'static str {
    match method {
        Method::Get => "GET",
        Method::Post => "POST",
    }
}
