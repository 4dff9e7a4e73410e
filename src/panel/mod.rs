//! Per-panel fetch lifecycles for the four AI content slots of a heritage
//! detail page: concurrent boot, manual reset-then-refetch refresh, and
//! the rendering seam.

pub mod controller;
pub mod traits;
pub mod types;

pub use controller::PanelController;
pub use traits::{PanelRenderer, TracingRenderer};
pub use types::{messages, FetchOutcome, PanelKind, PanelState};
