//! CoreGraphics/CoreVideo implementation of [`DisplayServices`].

use std::ptr;

use core_foundation::array::{CFArray, CFArrayGetValueAtIndex};
use core_foundation::base::TCFType;
use core_foundation::string::{CFString, CFStringRef};
use core_graphics::display::CGDisplay;
use vidmode_common::error::{DisplayError, DisplayResult};
use vidmode_platform_core::Rect;

use crate::iokit;
use crate::services::{
    DisplayId, DisplayServices, FadeDirection, FadeToken, IoFlags, NativeModeInfo, PixelEncoding,
    RefreshPeriod,
};

#[allow(non_camel_case_types, non_upper_case_globals)]
mod ffi {
    use std::os::raw::c_void;

    use core_foundation::array::CFArrayRef;
    use core_foundation::dictionary::CFDictionaryRef;
    use core_foundation::string::CFStringRef;

    pub type CGError = i32;
    pub type CGDirectDisplayID = u32;
    pub type CGDisplayModeRef = *mut c_void;
    pub type CGDisplayFadeReservationToken = u32;
    pub type CGDisplayBlendFraction = f32;
    pub type boolean_t = i32;
    pub type CVDisplayLinkRef = *mut c_void;
    pub type CVReturn = i32;

    pub const kCGErrorSuccess: CGError = 0;
    pub const kCGDisplayBlendNormal: CGDisplayBlendFraction = 0.0;
    pub const kCGDisplayBlendSolidColor: CGDisplayBlendFraction = 1.0;
    pub const kCGDisplayFadeReservationInvalidToken: CGDisplayFadeReservationToken = 0;
    pub const kCVReturnSuccess: CVReturn = 0;
    pub const kCVTimeIsIndefinite: i32 = 1 << 0;

    #[repr(C)]
    #[derive(Debug, Clone, Copy)]
    pub struct CVTime {
        pub time_value: i64,
        pub time_scale: i32,
        pub flags: i32,
    }

    #[link(name = "CoreGraphics", kind = "framework")]
    extern "C" {
        pub fn CGDisplayCopyDisplayMode(display: CGDirectDisplayID) -> CGDisplayModeRef;
        pub fn CGDisplayCopyAllDisplayModes(
            display: CGDirectDisplayID,
            options: CFDictionaryRef,
        ) -> CFArrayRef;
        pub fn CGDisplaySetDisplayMode(
            display: CGDirectDisplayID,
            mode: CGDisplayModeRef,
            options: CFDictionaryRef,
        ) -> CGError;
        pub fn CGDisplayModeRetain(mode: CGDisplayModeRef) -> CGDisplayModeRef;
        pub fn CGDisplayModeRelease(mode: CGDisplayModeRef);
        pub fn CGDisplayModeGetWidth(mode: CGDisplayModeRef) -> usize;
        pub fn CGDisplayModeGetHeight(mode: CGDisplayModeRef) -> usize;
        pub fn CGDisplayModeGetRefreshRate(mode: CGDisplayModeRef) -> f64;
        pub fn CGDisplayModeGetIOFlags(mode: CGDisplayModeRef) -> u32;
        pub fn CGDisplayModeCopyPixelEncoding(mode: CGDisplayModeRef) -> CFStringRef;

        pub fn CGDisplayCapture(display: CGDirectDisplayID) -> CGError;
        pub fn CGDisplayRelease(display: CGDirectDisplayID) -> CGError;

        pub fn CGAcquireDisplayFadeReservation(
            seconds: f32,
            token: *mut CGDisplayFadeReservationToken,
        ) -> CGError;
        pub fn CGDisplayFade(
            token: CGDisplayFadeReservationToken,
            duration: f32,
            start_blend: CGDisplayBlendFraction,
            end_blend: CGDisplayBlendFraction,
            red: f32,
            green: f32,
            blue: f32,
            synchronous: boolean_t,
        ) -> CGError;
        pub fn CGReleaseDisplayFadeReservation(token: CGDisplayFadeReservationToken) -> CGError;

        pub fn CGDisplayGammaTableCapacity(display: CGDirectDisplayID) -> u32;
        pub fn CGGetDisplayTransferByTable(
            display: CGDirectDisplayID,
            capacity: u32,
            red: *mut f32,
            green: *mut f32,
            blue: *mut f32,
            sample_count: *mut u32,
        ) -> CGError;
        pub fn CGSetDisplayTransferByTable(
            display: CGDirectDisplayID,
            size: u32,
            red: *const f32,
            green: *const f32,
            blue: *const f32,
        ) -> CGError;
    }

    #[link(name = "CoreVideo", kind = "framework")]
    extern "C" {
        pub fn CVDisplayLinkCreateWithCGDisplay(
            display: CGDirectDisplayID,
            link: *mut CVDisplayLinkRef,
        ) -> CVReturn;
        pub fn CVDisplayLinkGetNominalOutputVideoRefreshPeriod(link: CVDisplayLinkRef) -> CVTime;
        pub fn CVDisplayLinkRelease(link: CVDisplayLinkRef);
    }
}

fn check(call: &'static str, status: ffi::CGError) -> DisplayResult<()> {
    if status == ffi::kCGErrorSuccess {
        Ok(())
    } else {
        Err(DisplayError::os(call, status))
    }
}

/// A retained `CGDisplayModeRef`.
#[derive(Debug)]
pub struct QuartzMode(ffi::CGDisplayModeRef);

impl QuartzMode {
    /// Take ownership of a reference obtained under the create rule.
    fn from_create(mode: ffi::CGDisplayModeRef) -> Option<Self> {
        (!mode.is_null()).then_some(Self(mode))
    }

    /// Retain a reference borrowed from a container.
    fn retain(mode: ffi::CGDisplayModeRef) -> Self {
        Self(unsafe { ffi::CGDisplayModeRetain(mode) })
    }
}

impl Drop for QuartzMode {
    fn drop(&mut self) {
        unsafe { ffi::CGDisplayModeRelease(self.0) }
    }
}

/// A CoreVideo timing link, released on drop.
struct DisplayLink(ffi::CVDisplayLinkRef);

impl DisplayLink {
    fn new(display: DisplayId) -> DisplayResult<Self> {
        let mut link = ptr::null_mut();
        let status = unsafe { ffi::CVDisplayLinkCreateWithCGDisplay(display, &mut link) };
        if status != ffi::kCVReturnSuccess || link.is_null() {
            return Err(DisplayError::os("CVDisplayLinkCreateWithCGDisplay", status));
        }
        Ok(Self(link))
    }

    fn nominal_period(&self) -> RefreshPeriod {
        let time = unsafe { ffi::CVDisplayLinkGetNominalOutputVideoRefreshPeriod(self.0) };
        if time.flags & ffi::kCVTimeIsIndefinite != 0 {
            RefreshPeriod::Indefinite
        } else {
            RefreshPeriod::Nominal {
                time_value: time.time_value,
                time_scale: time.time_scale,
            }
        }
    }
}

impl Drop for DisplayLink {
    fn drop(&mut self) {
        unsafe { ffi::CVDisplayLinkRelease(self.0) }
    }
}

/// Quartz Display Services.
///
/// Not `Send`: display reconfiguration belongs on the main thread.
#[derive(Debug, Default)]
pub struct QuartzServices {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl QuartzServices {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DisplayServices for QuartzServices {
    type Mode = QuartzMode;

    fn active_displays(&self) -> DisplayResult<Vec<DisplayId>> {
        CGDisplay::active_displays().map_err(|code| DisplayError::os("CGGetActiveDisplayList", code))
    }

    fn unit_number(&self, display: DisplayId) -> u32 {
        CGDisplay::new(display).unit_number()
    }

    fn display_name(&self, display: DisplayId, locale: &str) -> Option<String> {
        iokit::display_product_name(display, locale)
    }

    fn physical_size_mm(&self, display: DisplayId) -> (u32, u32) {
        let size = CGDisplay::new(display).screen_size();
        (size.width as u32, size.height as u32)
    }

    fn bounds(&self, display: DisplayId) -> Rect {
        let bounds = CGDisplay::new(display).bounds();
        Rect {
            x: bounds.origin.x,
            y: bounds.origin.y,
            width: bounds.size.width,
            height: bounds.size.height,
        }
    }

    fn copy_display_mode(&self, display: DisplayId) -> DisplayResult<QuartzMode> {
        QuartzMode::from_create(unsafe { ffi::CGDisplayCopyDisplayMode(display) }).ok_or_else(
            || DisplayError::platform(format!("Failed to query the mode of display {display}")),
        )
    }

    fn copy_all_display_modes(&self, display: DisplayId) -> DisplayResult<Vec<QuartzMode>> {
        let raw = unsafe { ffi::CGDisplayCopyAllDisplayModes(display, ptr::null()) };
        if raw.is_null() {
            return Err(DisplayError::platform(format!(
                "Failed to list the modes of display {display}"
            )));
        }
        let array: CFArray = unsafe { TCFType::wrap_under_create_rule(raw) };

        let modes = (0..array.len())
            .map(|index| {
                let mode = unsafe { CFArrayGetValueAtIndex(array.as_concrete_TypeRef(), index) };
                QuartzMode::retain(mode as ffi::CGDisplayModeRef)
            })
            .collect();
        Ok(modes)
    }

    fn mode_info(&self, mode: &QuartzMode) -> NativeModeInfo {
        let encoding = unsafe {
            let raw: CFStringRef = ffi::CGDisplayModeCopyPixelEncoding(mode.0);
            if raw.is_null() {
                PixelEncoding::Other(String::new())
            } else {
                let encoding: CFString = TCFType::wrap_under_create_rule(raw);
                PixelEncoding::from_io_string(&encoding.to_string())
            }
        };

        unsafe {
            NativeModeInfo {
                width: ffi::CGDisplayModeGetWidth(mode.0) as u32,
                height: ffi::CGDisplayModeGetHeight(mode.0) as u32,
                refresh_rate: ffi::CGDisplayModeGetRefreshRate(mode.0),
                io_flags: IoFlags::from_bits_retain(ffi::CGDisplayModeGetIOFlags(mode.0)),
                pixel_encoding: encoding,
            }
        }
    }

    fn nominal_refresh_period(&self, display: DisplayId) -> DisplayResult<RefreshPeriod> {
        Ok(DisplayLink::new(display)?.nominal_period())
    }

    fn acquire_fade_reservation(&self, seconds: f32) -> Option<FadeToken> {
        let mut token = ffi::kCGDisplayFadeReservationInvalidToken;
        let status = unsafe { ffi::CGAcquireDisplayFadeReservation(seconds, &mut token) };
        if status != ffi::kCGErrorSuccess || token == ffi::kCGDisplayFadeReservationInvalidToken {
            tracing::debug!(status, "No display fade reservation available");
            return None;
        }
        Some(FadeToken(token))
    }

    fn fade(&self, token: FadeToken, seconds: f32, direction: FadeDirection) -> DisplayResult<()> {
        let (start, end, synchronous) = match direction {
            FadeDirection::ToBlack => (ffi::kCGDisplayBlendNormal, ffi::kCGDisplayBlendSolidColor, 1),
            FadeDirection::FromBlack => {
                (ffi::kCGDisplayBlendSolidColor, ffi::kCGDisplayBlendNormal, 0)
            }
        };
        let status =
            unsafe { ffi::CGDisplayFade(token.0, seconds, start, end, 0.0, 0.0, 0.0, synchronous) };
        check("CGDisplayFade", status)
    }

    fn release_fade_reservation(&self, token: FadeToken) {
        let status = unsafe { ffi::CGReleaseDisplayFadeReservation(token.0) };
        if status != ffi::kCGErrorSuccess {
            tracing::warn!(status, "Failed to release display fade reservation");
        }
    }

    fn capture_display(&self, display: DisplayId) -> DisplayResult<()> {
        check("CGDisplayCapture", unsafe { ffi::CGDisplayCapture(display) })
    }

    fn release_display(&self, display: DisplayId) -> DisplayResult<()> {
        check("CGDisplayRelease", unsafe { ffi::CGDisplayRelease(display) })
    }

    fn set_display_mode(&self, display: DisplayId, mode: &QuartzMode) -> DisplayResult<()> {
        let status = unsafe { ffi::CGDisplaySetDisplayMode(display, mode.0, ptr::null()) };
        check("CGDisplaySetDisplayMode", status)
    }

    fn gamma_table_capacity(&self, display: DisplayId) -> u32 {
        unsafe { ffi::CGDisplayGammaTableCapacity(display) }
    }

    fn transfer_table(
        &self,
        display: DisplayId,
        capacity: u32,
    ) -> DisplayResult<(Vec<f32>, Vec<f32>, Vec<f32>)> {
        let mut red = vec![0.0f32; capacity as usize];
        let mut green = vec![0.0f32; capacity as usize];
        let mut blue = vec![0.0f32; capacity as usize];
        let mut samples = 0u32;

        let status = unsafe {
            ffi::CGGetDisplayTransferByTable(
                display,
                capacity,
                red.as_mut_ptr(),
                green.as_mut_ptr(),
                blue.as_mut_ptr(),
                &mut samples,
            )
        };
        check("CGGetDisplayTransferByTable", status)?;

        let samples = (samples as usize).min(capacity as usize);
        red.truncate(samples);
        green.truncate(samples);
        blue.truncate(samples);
        Ok((red, green, blue))
    }

    fn set_transfer_table(
        &self,
        display: DisplayId,
        red: &[f32],
        green: &[f32],
        blue: &[f32],
    ) -> DisplayResult<()> {
        let size = red.len().min(green.len()).min(blue.len()) as u32;
        let status = unsafe {
            ffi::CGSetDisplayTransferByTable(
                display,
                size,
                red.as_ptr(),
                green.as_ptr(),
                blue.as_ptr(),
            )
        };
        check("CGSetDisplayTransferByTable", status)
    }
}
