//! Rendering seam. Markdown-to-HTML conversion and the real UI live on the
//! other side of this trait; the controller only reports lifecycle events.

use crate::panel::types::PanelKind;
use tracing::{info, warn};

#[async_trait::async_trait]
pub trait PanelRenderer: Send + Sync {
    async fn loading_started(&self, panel: PanelKind) -> anyhow::Result<()>;
    async fn content_ready(&self, panel: PanelKind, markdown: &str) -> anyhow::Result<()>;
    async fn content_failed(&self, panel: PanelKind, message: &str) -> anyhow::Result<()>;
    async fn loading_finished(&self, panel: PanelKind) -> anyhow::Result<()>;
}

/// Renderer that only logs. Useful default for headless hosts and tests.
pub struct TracingRenderer;

#[async_trait::async_trait]
impl PanelRenderer for TracingRenderer {
    async fn loading_started(&self, panel: PanelKind) -> anyhow::Result<()> {
        info!(panel = %panel, "loading");
        Ok(())
    }

    async fn content_ready(&self, panel: PanelKind, markdown: &str) -> anyhow::Result<()> {
        info!(panel = %panel, bytes = markdown.len(), "content ready");
        Ok(())
    }

    async fn content_failed(&self, panel: PanelKind, message: &str) -> anyhow::Result<()> {
        warn!(panel = %panel, message, "content failed");
        Ok(())
    }

    async fn loading_finished(&self, panel: PanelKind) -> anyhow::Result<()> {
        info!(panel = %panel, "loading finished");
        Ok(())
    }
}
