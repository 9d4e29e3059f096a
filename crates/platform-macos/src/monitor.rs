//! Monitor records.

use vidmode_platform_core::{GammaRamp, SameMonitor};

use crate::services::DisplayId;

/// Video mode override state of a monitor.
#[derive(Debug)]
pub enum ModeState<M> {
    /// The user's desktop mode is active.
    Unmodified,
    /// A requested mode is active and the display is captured. `previous`
    /// is the mode to restore.
    Overridden { previous: M },
}

impl<M> Default for ModeState<M> {
    fn default() -> Self {
        Self::Unmodified
    }
}

impl<M> ModeState<M> {
    pub fn is_overridden(&self) -> bool {
        matches!(self, Self::Overridden { .. })
    }

    pub fn previous(&self) -> Option<&M> {
        match self {
            Self::Overridden { previous } => Some(previous),
            Self::Unmodified => None,
        }
    }
}

/// One physical display, matched to its window-system screen.
///
/// Only the id of the matched screen is kept; its geometry changes with the
/// video mode and is looked up when queried. `M` is the native mode handle
/// held while the mode is overridden; dropping the monitor releases it.
#[derive(Debug)]
pub struct Monitor<M> {
    pub(crate) name: String,
    pub(crate) width_mm: u32,
    pub(crate) height_mm: u32,
    pub(crate) display_id: DisplayId,
    pub(crate) unit_number: u32,
    pub(crate) screen_id: DisplayId,
    pub(crate) mode_state: ModeState<M>,
    pub(crate) original_ramp: Option<GammaRamp>,
}

impl<M> Monitor<M> {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Physical size in millimetres.
    pub fn physical_size_mm(&self) -> (u32, u32) {
        (self.width_mm, self.height_mm)
    }

    pub fn display_id(&self) -> DisplayId {
        self.display_id
    }

    pub fn unit_number(&self) -> u32 {
        self.unit_number
    }

    /// Display id of the window-system screen matched at the last
    /// enumeration.
    pub fn screen_id(&self) -> DisplayId {
        self.screen_id
    }

    pub fn mode_state(&self) -> &ModeState<M> {
        &self.mode_state
    }

    /// Ramp saved before the first gamma change, if any.
    pub fn original_gamma_ramp(&self) -> Option<&GammaRamp> {
        self.original_ramp.as_ref()
    }
}

impl<M> SameMonitor for Monitor<M> {
    fn is_same_monitor(&self, other: &Self) -> bool {
        self.display_id == other.display_id
    }

    fn update_from(&mut self, fresh: Self) {
        self.name = fresh.name;
        self.width_mm = fresh.width_mm;
        self.height_mm = fresh.height_mm;
        self.unit_number = fresh.unit_number;
        self.screen_id = fresh.screen_id;
    }
}
