//! Binds page lifecycle and refresh actions to AI fetches, one independent
//! lifecycle per panel.

use crate::client::{ask_with_rotation, AiClient, AskRequest, EntityPayload, ResetRequest};
use crate::config::{Settings, SettingsError};
use crate::keypool::{Code, KeyRotator};
use crate::panel::traits::PanelRenderer;
use crate::panel::types::{messages, FetchOutcome, PanelKind, PanelState};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{error, info, warn};

pub struct PanelController {
    client: AiClient,
    rotator: KeyRotator,
    entity_id: u64,
    payload: EntityPayload,
    renderer: Arc<dyn PanelRenderer>,
    states: Mutex<HashMap<PanelKind, PanelState>>,
}

impl PanelController {
    pub fn new(
        settings: &Settings,
        entity_id: u64,
        payload: EntityPayload,
        renderer: Arc<dyn PanelRenderer>,
    ) -> Result<Self, SettingsError> {
        let client = AiClient::new(settings)?;
        let rotator = KeyRotator::new(settings.codes.clone(), settings.blacklist_ttl());
        let states = PanelKind::ALL
            .iter()
            .map(|&panel| (panel, PanelState::Idle))
            .collect();
        Ok(Self {
            client,
            rotator,
            entity_id,
            payload,
            renderer,
            states: Mutex::new(states),
        })
    }

    /// Shared handle to the rotator, e.g. for an affordance layer that
    /// wants to demote a fixed code after use.
    pub fn rotator(&self) -> KeyRotator {
        self.rotator.clone()
    }

    /// Initial page load: rotate the pool to a random offset once, then
    /// fetch all four panels concurrently. Panels are isolated, one
    /// failure leaves the others untouched. Outcomes come back in boot
    /// order.
    pub async fn boot(&self) -> Vec<(PanelKind, FetchOutcome)> {
        self.rotator.init_offset();
        let fetches: Vec<_> = PanelKind::ALL
            .iter()
            .map(|&panel| {
                let code = self.rotator.next();
                self.fetch_content(panel, code)
            })
            .collect();
        let outcomes = futures::future::join_all(fetches).await;
        PanelKind::ALL.iter().copied().zip(outcomes).collect()
    }

    /// Manual refresh. A fixed code on the control wins over the rotator;
    /// the rotator is never consulted for an override. The backend caches
    /// AI responses by `(entity, type, code)`, so a reset goes out first;
    /// its failure is logged and swallowed, never blocking the fetch.
    pub async fn refresh(&self, panel: PanelKind, code_override: Option<Code>) -> FetchOutcome {
        let code = code_override.unwrap_or_else(|| self.rotator.next());
        let reset = ResetRequest {
            kind: panel.wire_name().to_string(),
            code,
        };
        match self.client.reset(self.entity_id, &reset).await {
            Ok(()) => info!(panel = %panel, code, "reset acknowledged"),
            Err(e) => warn!(panel = %panel, code, error = %e, "reset failed, continuing"),
        }
        self.fetch_content(panel, code).await
    }

    /// One full fetch lifecycle for a panel: mark it loading, run the ask
    /// with rotation, render content or the fixed failure text, and always
    /// unmark loading at the end so the refresh affordance comes back.
    pub async fn fetch_content(&self, panel: PanelKind, code: Code) -> FetchOutcome {
        let start = Instant::now();
        self.set_state(panel, PanelState::Loading);
        self.notify(self.renderer.loading_started(panel).await, panel);

        let request = AskRequest::new(panel.wire_name(), code, &self.payload);
        let (result, used_code) =
            ask_with_rotation(&self.client, &self.rotator, self.entity_id, &request).await;

        let outcome = match result {
            Ok(response) => {
                let markdown = response
                    .content
                    .filter(|c| !c.trim().is_empty())
                    .unwrap_or_else(|| messages::EMPTY_RESPONSE.to_string());
                self.set_state(panel, PanelState::Rendered);
                self.notify(self.renderer.content_ready(panel, &markdown).await, panel);
                FetchOutcome::Rendered { markdown }
            }
            Err(e) => {
                self.set_state(panel, PanelState::Failed);
                error!(panel = %panel, code = used_code, error = %e, "panel fetch failed");
                self.notify(
                    self.renderer.content_failed(panel, messages::AI_FAILED).await,
                    panel,
                );
                FetchOutcome::Failed { error: e }
            }
        };

        self.notify(self.renderer.loading_finished(panel).await, panel);
        info!(
            panel = %panel,
            code = used_code,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "panel fetch finished"
        );
        outcome
    }

    pub fn state(&self, panel: PanelKind) -> PanelState {
        self.states
            .lock()
            .unwrap()
            .get(&panel)
            .copied()
            .unwrap_or(PanelState::Idle)
    }

    pub fn states(&self) -> HashMap<PanelKind, PanelState> {
        self.states.lock().unwrap().clone()
    }

    fn set_state(&self, panel: PanelKind, state: PanelState) {
        self.states.lock().unwrap().insert(panel, state);
    }

    // A broken sink must not poison the fetch lifecycle.
    fn notify(&self, result: anyhow::Result<()>, panel: PanelKind) {
        if let Err(e) = result {
            warn!(panel = %panel, error = %e, "renderer rejected lifecycle event");
        }
    }
}
