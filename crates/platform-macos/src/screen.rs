//! Window-system screens the displays are matched against.

use serde::{Deserialize, Serialize};
use vidmode_platform_core::Rect;

use crate::services::DisplayId;

/// A logical screen as the window system presents it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalScreen {
    /// The screen's `NSScreenNumber`, a display id.
    pub display_id: DisplayId,
    /// Backing scale factor.
    pub content_scale: f64,
    /// Area not covered by the menu bar or dock, top-left origin.
    pub work_area: Rect,
}

/// Source of logical screens.
pub trait ScreenLookup {
    fn screens(&self) -> Vec<LogicalScreen>;
}

/// A fixed screen list, for headless hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct StaticScreens(pub Vec<LogicalScreen>);

impl ScreenLookup for StaticScreens {
    fn screens(&self) -> Vec<LogicalScreen> {
        self.0.clone()
    }
}
