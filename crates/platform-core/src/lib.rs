//! vidmode platform core contracts.
//!
//! This crate contains the platform-neutral video mode model and the
//! selection/comparison rules used by every display backend, without
//! coupling to a concrete OS API.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

pub mod gamma;
pub mod registry;

pub use gamma::GammaRamp;
pub use registry::{MonitorChanges, MonitorRegistry, SameMonitor};

/// One resolution, refresh rate and colour depth combination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct VideoMode {
    /// Resolution in pixels.
    pub width: u32,
    pub height: u32,
    /// Refresh rate in Hz; 0 when unknown.
    pub refresh_rate: u32,
    /// Bit depth of each colour channel.
    pub red_bits: u32,
    pub green_bits: u32,
    pub blue_bits: u32,
}

impl VideoMode {
    /// Total colour bits per pixel.
    pub fn bits_per_pixel(&self) -> u32 {
        self.red_bits + self.green_bits + self.blue_bits
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// A requested video mode. Unset fields mean "don't care".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct VideoModeRequest {
    pub width: u32,
    pub height: u32,
    pub red_bits: Option<u32>,
    pub green_bits: Option<u32>,
    pub blue_bits: Option<u32>,
    pub refresh_rate: Option<u32>,
}

impl VideoModeRequest {
    /// Request a resolution, leaving depth and rate to the monitor.
    pub fn size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_refresh_rate(mut self, hz: u32) -> Self {
        self.refresh_rate = Some(hz);
        self
    }

    pub fn with_bits(mut self, red: u32, green: u32, blue: u32) -> Self {
        self.red_bits = Some(red);
        self.green_bits = Some(green);
        self.blue_bits = Some(blue);
        self
    }
}

impl From<VideoMode> for VideoModeRequest {
    fn from(mode: VideoMode) -> Self {
        Self {
            width: mode.width,
            height: mode.height,
            red_bits: Some(mode.red_bits),
            green_bits: Some(mode.green_bits),
            blue_bits: Some(mode.blue_bits),
            refresh_rate: Some(mode.refresh_rate),
        }
    }
}

/// A rectangle in the global desktop space, top-left origin.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Total order over video modes: bits per pixel, then area, then width,
/// then refresh rate.
///
/// `Ordering::Equal` is the notion of "same mode" used when matching a
/// selected mode back to a native one.
pub fn compare_video_modes(a: &VideoMode, b: &VideoMode) -> Ordering {
    a.bits_per_pixel()
        .cmp(&b.bits_per_pixel())
        .then_with(|| a.area().cmp(&b.area()))
        .then_with(|| a.width.cmp(&b.width))
        .then_with(|| a.refresh_rate.cmp(&b.refresh_rate))
}

/// Sort ascending and drop modes equal to their predecessor.
pub fn sort_video_modes(modes: &mut Vec<VideoMode>) {
    modes.sort_by(compare_video_modes);
    modes.dedup_by(|a, b| compare_video_modes(a, b) == Ordering::Equal);
}

/// Pick the mode closest to `request`.
///
/// Colour distance dominates, then the squared size distance, then the
/// refresh rate distance. Without a requested rate the highest rate wins.
/// Ties keep the earliest candidate.
pub fn choose_video_mode(modes: &[VideoMode], request: &VideoModeRequest) -> Option<VideoMode> {
    modes
        .iter()
        .min_by_key(|mode| mode_distance(mode, request))
        .copied()
}

fn mode_distance(mode: &VideoMode, request: &VideoModeRequest) -> (u64, u64, u64) {
    let channel = |have: u32, want: Option<u32>| want.map_or(0, |w| have.abs_diff(w) as u64);
    let color_diff = channel(mode.red_bits, request.red_bits)
        + channel(mode.green_bits, request.green_bits)
        + channel(mode.blue_bits, request.blue_bits);

    let dw = mode.width.abs_diff(request.width) as u64;
    let dh = mode.height.abs_diff(request.height) as u64;
    let size_diff = dw * dw + dh * dh;

    let rate_diff = match request.refresh_rate {
        Some(rate) => mode.refresh_rate.abs_diff(rate) as u64,
        None => (u32::MAX - mode.refresh_rate) as u64,
    };

    (color_diff, size_diff, rate_diff)
}

/// Split a packed bit depth into red, green and blue channel depths.
pub fn split_bpp(bpp: u32) -> (u32, u32, u32) {
    // Alpha is not a colour channel.
    let bpp = if bpp == 32 { 24 } else { bpp };

    let mut red = bpp / 3;
    let mut green = red;
    let blue = red;
    let delta = bpp - red * 3;
    if delta >= 1 {
        green += 1;
    }
    if delta == 2 {
        red += 1;
    }
    (red, green, blue)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mode(width: u32, height: u32, refresh_rate: u32, bits: u32) -> VideoMode {
        VideoMode {
            width,
            height,
            refresh_rate,
            red_bits: bits,
            green_bits: bits,
            blue_bits: bits,
        }
    }

    #[test]
    fn compare_orders_depth_before_area() {
        let deep_small = mode(640, 480, 60, 8);
        let shallow_large = mode(2560, 1440, 60, 5);
        assert_eq!(
            compare_video_modes(&shallow_large, &deep_small),
            Ordering::Less
        );
    }

    #[test]
    fn compare_ignores_channel_split_with_equal_total() {
        let a = VideoMode {
            red_bits: 5,
            green_bits: 6,
            blue_bits: 5,
            ..mode(1024, 768, 60, 0)
        };
        let b = VideoMode {
            red_bits: 6,
            green_bits: 5,
            blue_bits: 5,
            ..mode(1024, 768, 60, 0)
        };
        assert_eq!(compare_video_modes(&a, &b), Ordering::Equal);
    }

    #[test]
    fn sort_removes_duplicates() {
        let mut modes = vec![
            mode(1920, 1080, 60, 8),
            mode(1280, 720, 60, 8),
            mode(1920, 1080, 60, 8),
            mode(1280, 720, 60, 5),
        ];
        sort_video_modes(&mut modes);
        assert_eq!(
            modes,
            vec![
                mode(1280, 720, 60, 5),
                mode(1280, 720, 60, 8),
                mode(1920, 1080, 60, 8),
            ]
        );
    }

    #[test]
    fn choose_prefers_exact_size_then_highest_rate() {
        let modes = [
            mode(1280, 720, 60, 8),
            mode(1920, 1080, 60, 8),
            mode(1920, 1080, 120, 8),
            mode(2560, 1440, 144, 8),
        ];
        let chosen = choose_video_mode(&modes, &VideoModeRequest::size(1920, 1080)).unwrap();
        assert_eq!(chosen, mode(1920, 1080, 120, 8));
    }

    #[test]
    fn choose_honours_requested_rate_and_depth() {
        let modes = [
            mode(1920, 1080, 60, 5),
            mode(1920, 1080, 60, 8),
            mode(1920, 1080, 120, 8),
        ];
        let request = VideoModeRequest::size(1920, 1080)
            .with_refresh_rate(60)
            .with_bits(5, 5, 5);
        assert_eq!(
            choose_video_mode(&modes, &request),
            Some(mode(1920, 1080, 60, 5))
        );
    }

    #[test]
    fn choose_falls_back_to_nearest_size() {
        let modes = [mode(800, 600, 60, 8), mode(1024, 768, 60, 8)];
        let chosen = choose_video_mode(&modes, &VideoModeRequest::size(1000, 700)).unwrap();
        assert_eq!(chosen, mode(1024, 768, 60, 8));
    }

    #[test]
    fn choose_on_empty_list_is_none() {
        assert!(choose_video_mode(&[], &VideoModeRequest::size(640, 480)).is_none());
    }

    #[test]
    fn split_bpp_distributes_remainder() {
        assert_eq!(split_bpp(32), (8, 8, 8));
        assert_eq!(split_bpp(24), (8, 8, 8));
        assert_eq!(split_bpp(16), (5, 6, 5));
        assert_eq!(split_bpp(15), (5, 5, 5));
        assert_eq!(split_bpp(8), (3, 3, 2));
    }

    fn arb_mode() -> impl Strategy<Value = VideoMode> {
        (1u32..4000, 1u32..3000, 0u32..240, prop_oneof![Just(5u32), Just(8u32)])
            .prop_map(|(w, h, r, bits)| mode(w, h, r, bits))
    }

    proptest! {
        #[test]
        fn compare_is_antisymmetric(a in arb_mode(), b in arb_mode()) {
            prop_assert_eq!(compare_video_modes(&a, &b), compare_video_modes(&b, &a).reverse());
        }

        #[test]
        fn chosen_mode_comes_from_the_list(
            modes in prop::collection::vec(arb_mode(), 1..16),
            w in 1u32..4000,
            h in 1u32..3000,
        ) {
            let chosen = choose_video_mode(&modes, &VideoModeRequest::size(w, h)).unwrap();
            prop_assert!(modes.contains(&chosen));
        }

        #[test]
        fn requesting_a_listed_mode_selects_an_equal_mode(
            modes in prop::collection::vec(arb_mode(), 1..16),
            pick in any::<prop::sample::Index>(),
        ) {
            let wanted = *pick.get(&modes);
            let chosen = choose_video_mode(&modes, &wanted.into()).unwrap();
            prop_assert_eq!(compare_video_modes(&chosen, &wanted), Ordering::Equal);
        }
    }
}
