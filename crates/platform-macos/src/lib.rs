//! macOS monitor enumeration and video mode switching.
//!
//! [`DisplayAdapter`] implements the backend over two seams:
//! [`DisplayServices`] for Quartz Display Services and [`ScreenLookup`] for
//! AppKit screens. On macOS, [`quartz_adapter`] wires up the real ones; the
//! seams can be implemented by fakes anywhere.

pub mod adapter;
pub mod mode;
pub mod monitor;
pub mod screen;
pub mod services;

#[cfg(target_os = "macos")]
mod appkit;
#[cfg(target_os = "macos")]
mod iokit;
#[cfg(target_os = "macos")]
mod quartz;

pub use adapter::DisplayAdapter;
pub use monitor::{ModeState, Monitor};
pub use screen::{LogicalScreen, ScreenLookup, StaticScreens};
pub use services::{DisplayId, DisplayServices, NULL_DISPLAY};

#[cfg(target_os = "macos")]
pub use appkit::AppKitScreens;
#[cfg(target_os = "macos")]
pub use quartz::{QuartzMode, QuartzServices};

/// The adapter over the live display stack.
#[cfg(target_os = "macos")]
pub type QuartzAdapter = DisplayAdapter<QuartzServices, AppKitScreens>;

/// Build the adapter over Quartz and AppKit. Must be called on the main
/// thread.
#[cfg(target_os = "macos")]
pub fn quartz_adapter(
    config: &vidmode_common::config::VidmodeConfig,
) -> vidmode_common::error::DisplayResult<QuartzAdapter> {
    let screens = AppKitScreens::new()?;
    tracing::debug!("Initialized Quartz display adapter");
    Ok(DisplayAdapter::new(QuartzServices::new(), screens, config))
}
