//! Scripted in-memory display stack.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use vidmode_common::config::VidmodeConfig;
use vidmode_common::error::{DisplayError, DisplayResult, RecordingSink};
use vidmode_platform_core::Rect;
use vidmode_platform_macos::screen::{LogicalScreen, ScreenLookup};
use vidmode_platform_macos::services::{
    DisplayId, DisplayServices, FadeDirection, FadeToken, IoFlags, NativeModeInfo, PixelEncoding,
    RefreshPeriod,
};
use vidmode_platform_macos::DisplayAdapter;

pub type FakeAdapter = DisplayAdapter<FakeServices, SharedScreens>;

/// Screen list the test can change while the adapter holds it, as AppKit
/// does after a mode switch.
#[derive(Debug, Clone, Default)]
pub struct SharedScreens(Rc<RefCell<Vec<LogicalScreen>>>);

impl SharedScreens {
    pub fn new(screens: Vec<LogicalScreen>) -> Self {
        Self(Rc::new(RefCell::new(screens)))
    }

    pub fn replace(&self, screens: Vec<LogicalScreen>) {
        *self.0.borrow_mut() = screens;
    }

    pub fn update(&self, id: DisplayId, f: impl FnOnce(&mut LogicalScreen)) {
        let mut screens = self.0.borrow_mut();
        let screen = screens
            .iter_mut()
            .find(|s| s.display_id == id)
            .unwrap_or_else(|| panic!("unknown screen {id}"));
        f(screen);
    }
}

impl ScreenLookup for SharedScreens {
    fn screens(&self) -> Vec<LogicalScreen> {
        self.0.borrow().clone()
    }
}

/// Every call that changes display state.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Capture(DisplayId),
    Release(DisplayId),
    SetMode(DisplayId, u32, u32, u32),
    AcquireFade,
    Fade(FadeDirection),
    ReleaseFade,
    SetGamma(DisplayId),
}

pub fn native(width: u32, height: u32, rate: f64, encoding: PixelEncoding) -> NativeModeInfo {
    NativeModeInfo {
        width,
        height,
        refresh_rate: rate,
        io_flags: IoFlags::VALID | IoFlags::SAFE,
        pixel_encoding: encoding,
    }
}

/// A usable 32-bit mode.
pub fn good(width: u32, height: u32, rate: f64) -> NativeModeInfo {
    native(width, height, rate, PixelEncoding::Direct32)
}

#[derive(Debug, Clone)]
pub struct FakeDisplay {
    pub id: DisplayId,
    pub unit: u32,
    pub name: Option<String>,
    pub size_mm: (u32, u32),
    pub bounds: Rect,
    pub modes: Vec<NativeModeInfo>,
    pub current: NativeModeInfo,
    pub period: RefreshPeriod,
    pub gamma: Vec<f32>,
    pub captured: bool,
}

impl FakeDisplay {
    /// A display whose first mode is active.
    pub fn new(id: DisplayId, name: &str, modes: Vec<NativeModeInfo>) -> Self {
        let current = modes.first().cloned().unwrap_or_else(|| good(1024, 768, 60.0));
        Self {
            id,
            unit: id,
            name: Some(name.to_string()),
            size_mm: (600, 340),
            bounds: Rect {
                x: 0.0,
                y: 0.0,
                width: current.width as f64,
                height: current.height as f64,
            },
            modes,
            current,
            period: RefreshPeriod::Nominal {
                time_value: 1000,
                time_scale: 60000,
            },
            gamma: vec![0.0, 0.25, 0.5, 1.0],
            captured: false,
        }
    }

    pub fn at(mut self, x: f64, y: f64) -> Self {
        self.bounds.x = x;
        self.bounds.y = y;
        self
    }

    pub fn unit(mut self, unit: u32) -> Self {
        self.unit = unit;
        self
    }

    pub fn unnamed(mut self) -> Self {
        self.name = None;
        self
    }

    pub fn current(mut self, mode: NativeModeInfo) -> Self {
        self.current = mode;
        self
    }

    pub fn period(mut self, period: RefreshPeriod) -> Self {
        self.period = period;
        self
    }

    pub fn screen(&self) -> LogicalScreen {
        LogicalScreen {
            display_id: self.id,
            content_scale: 2.0,
            work_area: Rect {
                x: self.bounds.x,
                y: self.bounds.y + 25.0,
                width: self.bounds.width,
                height: self.bounds.height - 25.0,
            },
        }
    }
}

/// Native mode handle; counts how many are alive.
#[derive(Debug)]
pub struct FakeMode {
    pub info: NativeModeInfo,
    live: Rc<Cell<usize>>,
}

impl FakeMode {
    fn new(info: NativeModeInfo, live: &Rc<Cell<usize>>) -> Self {
        live.set(live.get() + 1);
        Self {
            info,
            live: Rc::clone(live),
        }
    }
}

impl Drop for FakeMode {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

#[derive(Debug, Default)]
pub struct FakeServices {
    displays: RefCell<Vec<FakeDisplay>>,
    calls: RefCell<Vec<Call>>,
    live_modes: Rc<Cell<usize>>,
    timing_queries: Cell<usize>,
    next_token: Cell<u32>,
    outstanding_fades: Cell<i32>,
    no_fade_reservation: Cell<bool>,
    fail_set_mode: Cell<bool>,
    fail_timing: Cell<bool>,
    vanish_after_listing: RefCell<Option<(DisplayId, u32, u32)>>,
}

impl FakeServices {
    pub fn new(displays: Vec<FakeDisplay>) -> Self {
        Self {
            displays: RefCell::new(displays),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    /// Captures, releases and mode changes.
    pub fn mutations(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| {
                matches!(
                    call,
                    Call::Capture(_) | Call::Release(_) | Call::SetMode(..)
                )
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn current(&self, id: DisplayId) -> NativeModeInfo {
        self.with_display(id, |d| d.current.clone())
    }

    pub fn is_captured(&self, id: DisplayId) -> bool {
        self.with_display(id, |d| d.captured)
    }

    pub fn gamma(&self, id: DisplayId) -> Vec<f32> {
        self.with_display(id, |d| d.gamma.clone())
    }

    pub fn live_modes(&self) -> usize {
        self.live_modes.get()
    }

    pub fn timing_queries(&self) -> usize {
        self.timing_queries.get()
    }

    pub fn outstanding_fade_reservations(&self) -> i32 {
        self.outstanding_fades.get()
    }

    pub fn deny_fade_reservations(&self) {
        self.no_fade_reservation.set(true);
    }

    pub fn fail_set_mode(&self, fail: bool) {
        self.fail_set_mode.set(fail);
    }

    /// Make the display timing query fail.
    pub fn fail_timing(&self, fail: bool) {
        self.fail_timing.set(fail);
    }

    /// Drop a mode from the display right after the next listing, as if the
    /// configuration changed between selection and lookup.
    pub fn vanish_after_listing(&self, id: DisplayId, width: u32, height: u32) {
        *self.vanish_after_listing.borrow_mut() = Some((id, width, height));
    }

    pub fn disconnect(&self, id: DisplayId) {
        self.displays.borrow_mut().retain(|d| d.id != id);
    }

    pub fn connect(&self, display: FakeDisplay) {
        self.displays.borrow_mut().push(display);
    }

    fn with_display<T>(&self, id: DisplayId, f: impl FnOnce(&mut FakeDisplay) -> T) -> T {
        let mut displays = self.displays.borrow_mut();
        let display = displays
            .iter_mut()
            .find(|d| d.id == id)
            .unwrap_or_else(|| panic!("unknown display {id}"));
        f(display)
    }

    fn record(&self, call: Call) {
        self.calls.borrow_mut().push(call);
    }
}

impl DisplayServices for FakeServices {
    type Mode = FakeMode;

    fn active_displays(&self) -> DisplayResult<Vec<DisplayId>> {
        Ok(self.displays.borrow().iter().map(|d| d.id).collect())
    }

    fn unit_number(&self, display: DisplayId) -> u32 {
        self.displays
            .borrow()
            .iter()
            .find(|d| d.id == display)
            .map_or(u32::MAX - display, |d| d.unit)
    }

    fn display_name(&self, display: DisplayId, locale: &str) -> Option<String> {
        assert_eq!(locale, "en_US");
        self.with_display(display, |d| d.name.clone())
    }

    fn physical_size_mm(&self, display: DisplayId) -> (u32, u32) {
        self.with_display(display, |d| d.size_mm)
    }

    fn bounds(&self, display: DisplayId) -> Rect {
        self.with_display(display, |d| d.bounds)
    }

    fn copy_display_mode(&self, display: DisplayId) -> DisplayResult<FakeMode> {
        let info = self.current(display);
        Ok(FakeMode::new(info, &self.live_modes))
    }

    fn copy_all_display_modes(&self, display: DisplayId) -> DisplayResult<Vec<FakeMode>> {
        let infos = self.with_display(display, |d| d.modes.clone());
        let modes = infos
            .into_iter()
            .map(|info| FakeMode::new(info, &self.live_modes))
            .collect();

        if let Some((id, width, height)) = self.vanish_after_listing.borrow_mut().take() {
            self.with_display(id, |d| {
                d.modes.retain(|m| m.width != width || m.height != height)
            });
        }
        Ok(modes)
    }

    fn mode_info(&self, mode: &FakeMode) -> NativeModeInfo {
        mode.info.clone()
    }

    fn nominal_refresh_period(&self, display: DisplayId) -> DisplayResult<RefreshPeriod> {
        self.timing_queries.set(self.timing_queries.get() + 1);
        if self.fail_timing.get() {
            return Err(DisplayError::os("CVDisplayLinkCreateWithCGDisplay", -6661));
        }
        Ok(self.with_display(display, |d| d.period))
    }

    fn acquire_fade_reservation(&self, seconds: f32) -> Option<FadeToken> {
        assert!(seconds > 0.0);
        if self.no_fade_reservation.get() {
            return None;
        }
        self.record(Call::AcquireFade);
        self.outstanding_fades.set(self.outstanding_fades.get() + 1);
        let token = self.next_token.get() + 1;
        self.next_token.set(token);
        Some(FadeToken(token))
    }

    fn fade(&self, _token: FadeToken, _seconds: f32, direction: FadeDirection) -> DisplayResult<()> {
        self.record(Call::Fade(direction));
        Ok(())
    }

    fn release_fade_reservation(&self, _token: FadeToken) {
        self.record(Call::ReleaseFade);
        self.outstanding_fades.set(self.outstanding_fades.get() - 1);
    }

    fn capture_display(&self, display: DisplayId) -> DisplayResult<()> {
        self.record(Call::Capture(display));
        self.with_display(display, |d| d.captured = true);
        Ok(())
    }

    fn release_display(&self, display: DisplayId) -> DisplayResult<()> {
        self.record(Call::Release(display));
        self.with_display(display, |d| d.captured = false);
        Ok(())
    }

    fn set_display_mode(&self, display: DisplayId, mode: &FakeMode) -> DisplayResult<()> {
        let info = &mode.info;
        self.record(Call::SetMode(
            display,
            info.width,
            info.height,
            info.refresh_rate.round() as u32,
        ));
        if self.fail_set_mode.get() {
            return Err(DisplayError::os("CGDisplaySetDisplayMode", 1001));
        }
        self.with_display(display, |d| d.current = info.clone());
        Ok(())
    }

    fn gamma_table_capacity(&self, display: DisplayId) -> u32 {
        self.with_display(display, |d| d.gamma.len() as u32)
    }

    fn transfer_table(
        &self,
        display: DisplayId,
        capacity: u32,
    ) -> DisplayResult<(Vec<f32>, Vec<f32>, Vec<f32>)> {
        let mut table = self.gamma(display);
        table.truncate(capacity as usize);
        Ok((table.clone(), table.clone(), table))
    }

    fn set_transfer_table(
        &self,
        display: DisplayId,
        red: &[f32],
        _green: &[f32],
        _blue: &[f32],
    ) -> DisplayResult<()> {
        self.record(Call::SetGamma(display));
        self.with_display(display, |d| d.gamma = red.to_vec());
        Ok(())
    }
}

/// Adapter over `displays`, each with a matching screen.
pub fn adapter(displays: Vec<FakeDisplay>) -> (FakeAdapter, RecordingSink) {
    let screens = displays.iter().map(FakeDisplay::screen).collect();
    adapter_with_screens(displays, screens)
}

pub fn adapter_with_screens(
    displays: Vec<FakeDisplay>,
    screens: Vec<LogicalScreen>,
) -> (FakeAdapter, RecordingSink) {
    vidmode_common::logging::init_test_logging();
    let sink = RecordingSink::new();
    let adapter = DisplayAdapter::new(
        FakeServices::new(displays),
        SharedScreens::new(screens),
        &VidmodeConfig::default(),
    )
    .with_error_sink(sink.clone());
    (adapter, sink)
}
