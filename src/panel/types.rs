//! Shared panel types and the fixed user-visible messages.

use crate::client::AiError;
use std::fmt;

/// The four content slots of a heritage detail page, in boot order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PanelKind {
    Recommends,
    Weather,
    News,
    Summary,
}

impl PanelKind {
    pub const ALL: [PanelKind; 4] = [
        PanelKind::Recommends,
        PanelKind::Weather,
        PanelKind::News,
        PanelKind::Summary,
    ];

    /// Name the wire format uses for this panel's `type` field.
    pub fn wire_name(self) -> &'static str {
        match self {
            PanelKind::Recommends => "recommends",
            PanelKind::Weather => "weather",
            PanelKind::News => "news",
            PanelKind::Summary => "summary",
        }
    }

    /// Parse the `type` carried by a refresh control.
    pub fn from_wire(raw: &str) -> Option<Self> {
        match raw {
            "recommends" => Some(PanelKind::Recommends),
            "weather" => Some(PanelKind::Weather),
            "news" => Some(PanelKind::News),
            "summary" => Some(PanelKind::Summary),
            _ => None,
        }
    }
}

impl fmt::Display for PanelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Per-panel lifecycle, re-entrant back to `Loading` via boot or refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelState {
    Idle,
    Loading,
    Rendered,
    Failed,
}

/// Result of one panel fetch, also forwarded to the renderer.
#[derive(Debug)]
pub enum FetchOutcome {
    Rendered { markdown: String },
    Failed { error: AiError },
}

impl FetchOutcome {
    pub fn is_rendered(&self) -> bool {
        matches!(self, FetchOutcome::Rendered { .. })
    }
}

/// Fixed texts shown in place of content. No structured error crosses the
/// controller boundary.
pub mod messages {
    pub const EMPTY_RESPONSE: &str = "The response came back empty.";
    pub const AI_FAILED: &str = "Could not load the AI response.";
}
