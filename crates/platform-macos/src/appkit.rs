//! `NSScreen` lookup.

use objc2::rc::Retained;
use objc2_app_kit::NSScreen;
use objc2_foundation::{ns_string, MainThreadMarker, NSNumber};
use vidmode_common::error::{DisplayError, DisplayResult};
use vidmode_platform_core::Rect;

use crate::screen::{LogicalScreen, ScreenLookup};

/// Screens as AppKit reports them. Must live on the main thread.
#[derive(Debug, Clone, Copy)]
pub struct AppKitScreens {
    mtm: MainThreadMarker,
}

impl AppKitScreens {
    pub fn new() -> DisplayResult<Self> {
        MainThreadMarker::new()
            .map(|mtm| Self { mtm })
            .ok_or_else(|| DisplayError::platform("NSScreen can only be queried from the main thread"))
    }
}

impl ScreenLookup for AppKitScreens {
    fn screens(&self) -> Vec<LogicalScreen> {
        let screens = NSScreen::screens(self.mtm);

        // Cocoa frames are bottom-left based on the primary screen.
        let primary_height = match screens.firstObject() {
            Some(primary) => primary.frame().size.height,
            None => return Vec::new(),
        };

        screens
            .iter()
            .filter_map(|screen| {
                let description = screen.deviceDescription();
                let number = description.objectForKey(ns_string!("NSScreenNumber"))?;
                let number: Retained<NSNumber> = unsafe { Retained::cast(number) };

                let visible = screen.visibleFrame();
                Some(LogicalScreen {
                    display_id: number.unsignedIntValue(),
                    content_scale: screen.backingScaleFactor(),
                    work_area: Rect {
                        x: visible.origin.x,
                        y: primary_height - (visible.origin.y + visible.size.height),
                        width: visible.size.width,
                        height: visible.size.height,
                    },
                })
            })
            .collect()
    }
}
