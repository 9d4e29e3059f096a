//! The native display API the adapter drives.
//!
//! [`DisplayServices`] is the single seam between the adapter and
//! CoreGraphics/CoreVideo/IOKit. The Quartz implementation lives in
//! `quartz`; tests substitute a scripted fake.

use bitflags::bitflags;
use vidmode_common::error::DisplayResult;
use vidmode_platform_core::Rect;

/// CoreGraphics display identifier (`CGDirectDisplayID`).
pub type DisplayId = u32;

/// `kCGNullDirectDisplay`.
pub const NULL_DISPLAY: DisplayId = 0;

bitflags! {
    /// IOKit display mode flags (`kDisplayMode*Flag`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IoFlags: u32 {
        const VALID = 0x0000_0001;
        const SAFE = 0x0000_0002;
        const DEFAULT = 0x0000_0004;
        const ALWAYS_SHOW = 0x0000_0008;
        const NOT_RESIZE = 0x0000_0010;
        const REQUIRES_PAN = 0x0000_0020;
        const INTERLACED = 0x0000_0040;
        const NEVER_SHOW = 0x0000_0080;
        const SIMULSCAN = 0x0000_0100;
        const NOT_PRESET = 0x0000_0200;
        const BUILT_IN = 0x0000_0400;
        const STRETCHED = 0x0000_0800;
        const NOT_GRAPHICS_QUALITY = 0x0000_1000;
        const TELEVISION = 0x0010_0000;
        const VALID_FOR_MIRRORING = 0x0020_0000;
        const NATIVE = 0x0200_0000;
    }
}

/// IOKit pixel encoding string of a 16-bit direct mode.
pub const IO_16BIT_DIRECT_PIXELS: &str = "-RRRRRGGGGGBBBBB";
/// IOKit pixel encoding string of a 32-bit direct mode.
pub const IO_32BIT_DIRECT_PIXELS: &str = "--------RRRRRRRRGGGGGGGGBBBBBBBB";

/// Pixel layout of a native mode.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PixelEncoding {
    Direct16,
    Direct32,
    Other(String),
}

impl PixelEncoding {
    pub fn from_io_string(encoding: &str) -> Self {
        match encoding {
            IO_16BIT_DIRECT_PIXELS => Self::Direct16,
            IO_32BIT_DIRECT_PIXELS => Self::Direct32,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Properties read from a native mode handle.
#[derive(Debug, Clone, PartialEq)]
pub struct NativeModeInfo {
    pub width: u32,
    pub height: u32,
    /// Reported refresh rate; 0.0 for many fixed-rate panels.
    pub refresh_rate: f64,
    pub io_flags: IoFlags,
    pub pixel_encoding: PixelEncoding,
}

/// Nominal output refresh period from the video timing link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshPeriod {
    Nominal { time_value: i64, time_scale: i32 },
    Indefinite,
}

impl RefreshPeriod {
    /// Refresh rate in Hz, 0 when the period is unknown.
    pub fn rate_hz(self) -> u32 {
        match self {
            Self::Nominal {
                time_value,
                time_scale,
            } if time_value > 0 && time_scale > 0 => {
                (time_scale as f64 / time_value as f64).round() as u32
            }
            _ => 0,
        }
    }
}

/// Handle to an acquired fade reservation (`CGDisplayFadeReservationToken`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FadeToken(pub u32);

/// Direction of a fade blend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    /// Normal image to solid black; blocks until complete.
    ToBlack,
    /// Solid black back to the normal image.
    FromBlack,
}

/// Native display-configuration API.
///
/// Every call that can fail on the OS side returns a result. Mode handles
/// own their native reference and release it on drop.
pub trait DisplayServices {
    /// Retained native display mode.
    type Mode;

    /// Currently active displays, in OS order.
    fn active_displays(&self) -> DisplayResult<Vec<DisplayId>>;

    /// Logical unit number; stable across GPU switches.
    fn unit_number(&self, display: DisplayId) -> u32;

    /// Localized product name, `None` when the display has none.
    fn display_name(&self, display: DisplayId, locale: &str) -> Option<String>;

    /// Physical size in millimetres.
    fn physical_size_mm(&self, display: DisplayId) -> (u32, u32);

    /// Bounds in the global desktop space.
    fn bounds(&self, display: DisplayId) -> Rect;

    fn copy_display_mode(&self, display: DisplayId) -> DisplayResult<Self::Mode>;

    fn copy_all_display_modes(&self, display: DisplayId) -> DisplayResult<Vec<Self::Mode>>;

    fn mode_info(&self, mode: &Self::Mode) -> NativeModeInfo;

    /// Nominal refresh period of the display's video timing.
    fn nominal_refresh_period(&self, display: DisplayId) -> DisplayResult<RefreshPeriod>;

    /// `None` when no reservation is available; the switch then proceeds
    /// without blanking.
    fn acquire_fade_reservation(&self, seconds: f32) -> Option<FadeToken>;

    fn fade(&self, token: FadeToken, seconds: f32, direction: FadeDirection) -> DisplayResult<()>;

    fn release_fade_reservation(&self, token: FadeToken);

    /// Take exclusive control of the display.
    fn capture_display(&self, display: DisplayId) -> DisplayResult<()>;

    fn release_display(&self, display: DisplayId) -> DisplayResult<()>;

    fn set_display_mode(&self, display: DisplayId, mode: &Self::Mode) -> DisplayResult<()>;

    /// Number of entries in the hardware gamma table.
    fn gamma_table_capacity(&self, display: DisplayId) -> u32;

    /// Current transfer table as red, green and blue channels in `0.0..=1.0`.
    fn transfer_table(
        &self,
        display: DisplayId,
        capacity: u32,
    ) -> DisplayResult<(Vec<f32>, Vec<f32>, Vec<f32>)>;

    fn set_transfer_table(
        &self,
        display: DisplayId,
        red: &[f32],
        green: &[f32],
        blue: &[f32],
    ) -> DisplayResult<()>;
}
