//! HTTP half of the AI panel subsystem: wire DTOs, the error taxonomy,
//! the `reqwest` client for the backend AI proxy, and the
//! block-and-retry-once core that works around a rate-limited code.

use crate::config::Settings;
use crate::keypool::{Code, KeyRotator};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum AiError {
    /// HTTP 429: recoverable, triggers quarantine plus a single retry.
    #[error("AI endpoint rate limited the request")]
    RateLimited,
    /// Any other non-2xx status: terminal for this attempt.
    #[error("AI endpoint returned HTTP {status}")]
    Upstream { status: StatusCode },
    #[error("request timed out")]
    Timeout,
    #[error("network failure: {0}")]
    Network(#[source] reqwest::Error),
    #[error("undecodable response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Base attributes of the heritage record, immutable for the page session
/// and cloned into every ask. Fields are trimmed the way the backend
/// normalizes them.
#[derive(Debug, Clone)]
pub struct EntityPayload {
    pub name: String,
    pub address: String,
    pub content: String,
}

impl EntityPayload {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into().trim().to_string(),
            address: address.into().trim().to_string(),
            content: content.into().trim().to_string(),
        }
    }
}

/// POST body for `/heritage/{id}/ai`.
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: Code,
    pub name: String,
    pub address: String,
    pub content: String,
}

impl AskRequest {
    pub fn new(kind: &str, code: Code, payload: &EntityPayload) -> Self {
        Self {
            kind: kind.to_string(),
            code,
            name: payload.name.clone(),
            address: payload.address.clone(),
            content: payload.content.clone(),
        }
    }
}

/// POST body for `/heritage/{id}/ai/reset`.
#[derive(Debug, Clone, Serialize)]
pub struct ResetRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub code: Code,
}

/// Avatar action metadata the wire format carries alongside the content.
/// The panels only consume `content`, but the field must deserialize
/// cleanly when present.
#[derive(Debug, Clone, Deserialize)]
pub struct AiAction {
    pub name: Option<String>,
    pub speak: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AskResponse {
    pub content: Option<String>,
    pub action: Option<AiAction>,
}

/// Client for the backend AI proxy. Requests carry the configured timeout
/// and, when configured, the CSRF header pair.
pub struct AiClient {
    client: Client,
    base: Url,
    csrf: Option<crate::config::CsrfHeader>,
}

impl AiClient {
    pub fn new(settings: &Settings) -> Result<Self, crate::config::SettingsError> {
        let base = settings.validate()?;
        let client = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| crate::config::SettingsError::HttpClient(e.to_string()))?;
        Ok(Self {
            client,
            base,
            csrf: settings.csrf.clone(),
        })
    }

    /// POST `/heritage/{entity_id}/ai`. 2xx parses the JSON body, 429 maps
    /// to `RateLimited`, any other status to `Upstream`.
    pub async fn ask(&self, entity_id: u64, req: &AskRequest) -> Result<AskResponse, AiError> {
        let url = self.endpoint(entity_id, "ai");
        let response = self.post(url, req).await?;
        match response.status() {
            s if s.is_success() => response.json().await.map_err(AiError::Decode),
            StatusCode::TOO_MANY_REQUESTS => Err(AiError::RateLimited),
            status => Err(AiError::Upstream { status }),
        }
    }

    /// POST `/heritage/{entity_id}/ai/reset`. Only the status class matters;
    /// the backend answers 204 with no body.
    pub async fn reset(&self, entity_id: u64, req: &ResetRequest) -> Result<(), AiError> {
        let url = self.endpoint(entity_id, "ai/reset");
        let response = self.post(url, req).await?;
        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::TOO_MANY_REQUESTS => Err(AiError::RateLimited),
            status => Err(AiError::Upstream { status }),
        }
    }

    async fn post<B: Serialize>(&self, url: Url, body: &B) -> Result<reqwest::Response, AiError> {
        let mut request = self.client.post(url).json(body);
        if let Some(csrf) = &self.csrf {
            request = request.header(&csrf.header, &csrf.token);
        }
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                AiError::Timeout
            } else {
                AiError::Network(e)
            }
        })
    }

    // Appends to the base path rather than replacing it, so a reverse-proxy
    // prefix on the configured base URL survives.
    fn endpoint(&self, entity_id: u64, tail: &str) -> Url {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .expect("validated base URL can carry a path");
            segments.pop_if_empty();
            segments.push("heritage");
            segments.push(&entity_id.to_string());
            segments.extend(tail.split('/'));
        }
        url
    }
}

/// One logical ask, transparently working around a single rate-limited
/// attempt: on 429 the offending code is quarantined, a replacement is
/// drawn from the rotator, and the request is re-issued exactly once.
/// Returns the final result together with the code that was actually used
/// last. Only `RateLimited` mutates rotator state; every other error is
/// terminal with no side effects.
pub async fn ask_with_rotation(
    client: &AiClient,
    rotator: &KeyRotator,
    entity_id: u64,
    request: &AskRequest,
) -> (Result<AskResponse, AiError>, Code) {
    match client.ask(entity_id, request).await {
        Err(AiError::RateLimited) => {
            warn!(code = request.code, "rate limited, quarantining and retrying once");
            rotator.block(request.code);
            let retry_code = rotator.next();
            let mut retry = request.clone();
            retry.code = retry_code;
            (client.ask(entity_id, &retry).await, retry_code)
        }
        other => (other, request.code),
    }
}
