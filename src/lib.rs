//! kleio — the AI panel subsystem of a heritage discovery application.
//!
//! A heritage detail page carries four independently loaded AI content
//! panels (recommendations, weather, news, summary). This crate owns the
//! logic behind them: a round-robin pool of client codes with a TTL
//! quarantine for rate-limited ones ([`KeyRotator`]), a fetch against the
//! backend AI proxy that transparently works around a single 429
//! ([`AiClient`] + [`ask_with_rotation`]), and a per-panel lifecycle
//! controller ([`panel::PanelController`]). Rendering happens on the other
//! side of the [`panel::PanelRenderer`] seam.

pub mod client;
pub mod config;
pub mod keypool;
pub mod panel;

pub use client::{ask_with_rotation, AiClient, AiError, AskRequest, AskResponse, EntityPayload, ResetRequest};
pub use config::{CsrfHeader, Settings, SettingsError};
pub use keypool::{Code, KeyRotator};
pub use panel::{FetchOutcome, PanelController, PanelKind, PanelRenderer, PanelState, TracingRenderer};
