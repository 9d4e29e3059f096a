//! Native mode filtering and conversion.

use vidmode_platform_core::VideoMode;

use crate::services::{IoFlags, NativeModeInfo, PixelEncoding};

/// Whether a native mode is usable for rendering.
///
/// The mode must be flagged valid and safe, must be progressive and
/// unstretched, and must use a 16-bit or 32-bit direct pixel layout.
pub fn is_mode_good(info: &NativeModeInfo) -> bool {
    let required = IoFlags::VALID | IoFlags::SAFE;
    if !info.io_flags.contains(required) {
        return false;
    }
    if info
        .io_flags
        .intersects(IoFlags::INTERLACED | IoFlags::STRETCHED)
    {
        return false;
    }
    matches!(
        info.pixel_encoding,
        PixelEncoding::Direct16 | PixelEncoding::Direct32
    )
}

/// Convert a native mode.
///
/// `fallback_rate` is consulted only when the mode reports no refresh
/// rate, so callers can defer the timing query until it is needed.
pub fn to_video_mode<E>(
    info: &NativeModeInfo,
    fallback_rate: impl FnOnce() -> Result<u32, E>,
) -> Result<VideoMode, E> {
    let mut refresh_rate = info.refresh_rate.round() as u32;
    if refresh_rate == 0 {
        refresh_rate = fallback_rate()?;
    }

    let bits = match info.pixel_encoding {
        PixelEncoding::Direct16 => 5,
        _ => 8,
    };

    Ok(VideoMode {
        width: info.width,
        height: info.height,
        refresh_rate,
        red_bits: bits,
        green_bits: bits,
        blue_bits: bits,
    })
}
