//! Monitor enumeration and video mode switching.

use std::cmp::Ordering;

use vidmode_common::config::{DisplayConfig, FadeConfig, VidmodeConfig};
use vidmode_common::error::{DisplayError, DisplayResult, ErrorSink, TracingSink};
use vidmode_platform_core::gamma::DEFAULT_RAMP_SIZE;
use vidmode_platform_core::{
    choose_video_mode, compare_video_modes, sort_video_modes, GammaRamp, MonitorChanges,
    MonitorRegistry, VideoMode, VideoModeRequest,
};

use crate::mode::{is_mode_good, to_video_mode};
use crate::monitor::{ModeState, Monitor};
use crate::screen::{LogicalScreen, ScreenLookup};
use crate::services::{
    DisplayId, DisplayServices, FadeDirection, FadeToken, NativeModeInfo, NULL_DISPLAY,
};

/// Bridges the platform-neutral monitor model and the native display API.
///
/// The adapter keeps no per-display state of its own: everything is read
/// from [`DisplayServices`] at call time, and the override state lives in
/// each [`Monitor`]. All calls are expected on the event-loop thread.
pub struct DisplayAdapter<S, L> {
    services: S,
    screens: L,
    fade: FadeConfig,
    display: DisplayConfig,
    sink: Box<dyn ErrorSink>,
    initialized: bool,
}

impl<S: DisplayServices, L: ScreenLookup> DisplayAdapter<S, L> {
    pub fn new(services: S, screens: L, config: &VidmodeConfig) -> Self {
        Self {
            services,
            screens,
            fade: config.fade.clone(),
            display: config.display.clone(),
            sink: Box::new(TracingSink),
            initialized: true,
        }
    }

    /// Route diagnostics somewhere other than the log.
    pub fn with_error_sink(mut self, sink: impl ErrorSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn screens(&self) -> &L {
        &self.screens
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Enumerate the active displays that have a window-system screen.
    pub fn get_monitors(&self) -> DisplayResult<Vec<Monitor<S::Mode>>> {
        let result = self.require_init().and_then(|()| self.enumerate_monitors());
        self.reported(result)
    }

    /// Re-enumerate and reconcile with `registry`, keeping the records (and
    /// override state) of monitors that are still connected.
    pub fn refresh_monitors(
        &self,
        registry: &mut MonitorRegistry<Monitor<S::Mode>>,
    ) -> DisplayResult<MonitorChanges<Monitor<S::Mode>>> {
        let fresh = self.get_monitors()?;
        let changes = registry.refresh(fresh);
        for &index in &changes.connected {
            let monitor = &registry.monitors()[index];
            tracing::info!(monitor = %monitor.name, display = monitor.display_id, "Monitor connected");
        }
        for monitor in &changes.disconnected {
            tracing::info!(monitor = %monitor.name, display = monitor.display_id, "Monitor disconnected");
        }
        Ok(changes)
    }

    /// Whether both records are the same physical display.
    pub fn is_same_monitor(&self, a: &Monitor<S::Mode>, b: &Monitor<S::Mode>) -> bool {
        a.display_id == b.display_id
    }

    /// Top-left corner of the monitor in the global desktop space.
    pub fn get_monitor_position(&self, monitor: &Monitor<S::Mode>) -> (i32, i32) {
        let bounds = self.services.bounds(monitor.display_id);
        (bounds.x as i32, bounds.y as i32)
    }

    /// Area of the monitor not covered by the menu bar or dock, as
    /// `(x, y, width, height)`. All zero when the monitor has lost its
    /// screen.
    pub fn get_monitor_workarea(&self, monitor: &Monitor<S::Mode>) -> (i32, i32, i32, i32) {
        let Some(screen) = self.current_screen(monitor) else {
            return (0, 0, 0, 0);
        };
        let area = screen.work_area;
        (
            area.x as i32,
            area.y as i32,
            area.width as i32,
            area.height as i32,
        )
    }

    /// Backing scale of the monitor's screen, zero when it has none.
    pub fn get_monitor_content_scale(&self, monitor: &Monitor<S::Mode>) -> (f32, f32) {
        let Some(screen) = self.current_screen(monitor) else {
            return (0.0, 0.0);
        };
        let scale = screen.content_scale as f32;
        (scale, scale)
    }

    /// Usable modes in native enumeration order.
    pub fn get_video_modes(&self, monitor: &Monitor<S::Mode>) -> DisplayResult<Vec<VideoMode>> {
        let result = self
            .require_init()
            .and_then(|()| self.video_modes(monitor.display_id));
        self.reported(result)
    }

    /// The active mode, whether or not it would pass the usability filter.
    pub fn get_video_mode(&self, monitor: &Monitor<S::Mode>) -> DisplayResult<VideoMode> {
        let result = self
            .require_init()
            .and_then(|()| self.current_mode(monitor.display_id));
        self.reported(result)
    }

    /// Switch the monitor to the mode closest to `request`.
    ///
    /// Succeeds without touching the display when the closest mode is
    /// already active. The first successful switch saves the desktop mode
    /// for [`restore_video_mode`](Self::restore_video_mode); later switches
    /// keep that saved mode.
    pub fn set_video_mode(
        &self,
        monitor: &mut Monitor<S::Mode>,
        request: &VideoModeRequest,
    ) -> DisplayResult<()> {
        let result = self
            .require_init()
            .and_then(|()| self.switch_mode(monitor, request));
        self.reported(result)
    }

    /// Put back the mode saved by the first [`set_video_mode`](Self::set_video_mode)
    /// and release the display. Does nothing when the mode was never changed.
    pub fn restore_video_mode(&self, monitor: &mut Monitor<S::Mode>) -> DisplayResult<()> {
        let result = self
            .require_init()
            .and_then(|()| self.restore_mode(monitor));
        self.reported(result)
    }

    /// Raw `CGDirectDisplayID` for direct OS interop.
    ///
    /// Returns [`NULL_DISPLAY`] once the adapter has been terminated.
    pub fn native_display_id(&self, monitor: &Monitor<S::Mode>) -> DisplayId {
        if !self.initialized {
            self.sink.report_error(&DisplayError::NotInitialized);
            return NULL_DISPLAY;
        }
        monitor.display_id
    }

    pub fn get_gamma_ramp(&self, monitor: &Monitor<S::Mode>) -> DisplayResult<GammaRamp> {
        let result = self
            .require_init()
            .and_then(|()| self.read_gamma_ramp(monitor.display_id));
        self.reported(result)
    }

    /// Apply a gamma ramp, saving the current one first if this is the
    /// monitor's first change.
    pub fn set_gamma_ramp(
        &self,
        monitor: &mut Monitor<S::Mode>,
        ramp: &GammaRamp,
    ) -> DisplayResult<()> {
        let result = self
            .require_init()
            .and_then(|()| self.apply_gamma_ramp(monitor, ramp));
        self.reported(result)
    }

    /// Apply the power curve for `gamma`.
    pub fn set_gamma(&self, monitor: &mut Monitor<S::Mode>, gamma: f32) -> DisplayResult<()> {
        let ramp = self.reported(GammaRamp::from_exponent(gamma, DEFAULT_RAMP_SIZE))?;
        self.set_gamma_ramp(monitor, &ramp)
    }

    /// Restore every overridden mode and saved gamma ramp, then stop
    /// serving requests. Returns the first failure after attempting all
    /// monitors.
    pub fn terminate(&mut self, monitors: &mut [Monitor<S::Mode>]) -> DisplayResult<()> {
        if !self.initialized {
            return Ok(());
        }

        let mut first_error = None;
        for monitor in monitors.iter_mut() {
            if let Err(err) = self.restore_video_mode(monitor) {
                first_error.get_or_insert(err);
            }
            if let Some(original) = monitor.original_ramp.take() {
                let restored = self.write_gamma_ramp(monitor.display_id, &original);
                if let Err(err) = self.reported(restored) {
                    first_error.get_or_insert(err);
                }
            }
        }

        self.initialized = false;
        tracing::debug!("Display adapter terminated");
        first_error.map_or(Ok(()), Err)
    }

    fn require_init(&self) -> DisplayResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(DisplayError::NotInitialized)
        }
    }

    /// Forward a failure to the diagnostic sink exactly once.
    fn reported<T>(&self, result: DisplayResult<T>) -> DisplayResult<T> {
        if let Err(err) = &result {
            self.sink.report_error(err);
        }
        result
    }

    /// Screens are matched by unit number, so mirrored displays share one.
    fn find_screen<'a>(
        &self,
        screens: &'a [LogicalScreen],
        unit_number: u32,
    ) -> Option<&'a LogicalScreen> {
        screens
            .iter()
            .find(|screen| self.services.unit_number(screen.display_id) == unit_number)
    }

    /// The screen backing `monitor` right now; its geometry follows mode
    /// switches.
    fn current_screen(&self, monitor: &Monitor<S::Mode>) -> Option<LogicalScreen> {
        let screens = self.screens.screens();
        let screen = self.find_screen(&screens, monitor.unit_number).cloned();
        if screen.is_none() {
            self.sink.report_error(&DisplayError::platform(format!(
                "Failed to find a screen for monitor {}",
                monitor.name
            )));
        }
        screen
    }

    fn enumerate_monitors(&self) -> DisplayResult<Vec<Monitor<S::Mode>>> {
        let displays = self.services.active_displays()?;
        let screens = self.screens.screens();

        let mut monitors = Vec::with_capacity(displays.len());
        for id in displays {
            let unit_number = self.services.unit_number(id);

            let name = match self.services.display_name(id, &self.display.name_locale) {
                Some(name) => name,
                None => {
                    self.sink.report_error(&DisplayError::platform(format!(
                        "Failed to retrieve name of display {id}"
                    )));
                    self.display.fallback_name.clone()
                }
            };

            let Some(screen) = self.find_screen(&screens, unit_number) else {
                self.sink.report_error(&DisplayError::platform(format!(
                    "Failed to find a screen for monitor {name}"
                )));
                continue;
            };

            let (width_mm, height_mm) = self.services.physical_size_mm(id);
            tracing::debug!(display = id, unit_number, %name, width_mm, height_mm, "Found monitor");

            monitors.push(Monitor {
                name,
                width_mm,
                height_mm,
                display_id: id,
                unit_number,
                screen_id: screen.display_id,
                mode_state: ModeState::Unmodified,
                original_ramp: None,
            });
        }

        Ok(monitors)
    }

    fn video_modes(&self, id: DisplayId) -> DisplayResult<Vec<VideoMode>> {
        let natives = self.services.copy_all_display_modes(id)?;

        let mut fallback_rate = None;
        let mut modes = Vec::with_capacity(natives.len());
        for native in &natives {
            let info = self.services.mode_info(native);
            if !is_mode_good(&info) {
                continue;
            }
            modes.push(self.convert(id, &info, &mut fallback_rate)?);
        }

        tracing::debug!(display = id, total = natives.len(), usable = modes.len(), "Listed video modes");
        Ok(modes)
    }

    fn current_mode(&self, display: DisplayId) -> DisplayResult<VideoMode> {
        let native = self.services.copy_display_mode(display)?;
        let info = self.services.mode_info(&native);
        self.convert(display, &info, &mut None)
    }

    /// Convert one native mode; the timing fallback is queried at most once
    /// per `fallback_rate` cache.
    fn convert(
        &self,
        display: DisplayId,
        info: &NativeModeInfo,
        fallback_rate: &mut Option<u32>,
    ) -> DisplayResult<VideoMode> {
        to_video_mode(info, || match *fallback_rate {
            Some(rate) => Ok(rate),
            None => {
                let rate = self.services.nominal_refresh_period(display)?.rate_hz();
                *fallback_rate = Some(rate);
                Ok(rate)
            }
        })
    }

    fn find_native_mode(
        &self,
        display: DisplayId,
        target: &VideoMode,
    ) -> DisplayResult<Option<S::Mode>> {
        let mut fallback_rate = None;
        for native in self.services.copy_all_display_modes(display)? {
            let info = self.services.mode_info(&native);
            if !is_mode_good(&info) {
                continue;
            }
            let mode = self.convert(display, &info, &mut fallback_rate)?;
            if compare_video_modes(&mode, target) == Ordering::Equal {
                return Ok(Some(native));
            }
        }
        Ok(None)
    }

    fn switch_mode(
        &self,
        monitor: &mut Monitor<S::Mode>,
        request: &VideoModeRequest,
    ) -> DisplayResult<()> {
        let id = monitor.display_id;

        let mut modes = self.video_modes(id)?;
        sort_video_modes(&mut modes);
        let target = choose_video_mode(&modes, request).ok_or_else(|| {
            DisplayError::platform(format!("Monitor {} has no usable video modes", monitor.name))
        })?;

        let current = self.current_mode(id)?;
        if compare_video_modes(&current, &target) == Ordering::Equal {
            tracing::debug!(monitor = %monitor.name, ?target, "Video mode already active");
            return Ok(());
        }

        let native = self.find_native_mode(id, &target)?.ok_or_else(|| {
            DisplayError::platform(format!(
                "Monitor {} has no native mode matching {}x{} @ {} Hz",
                monitor.name, target.width, target.height, target.refresh_rate
            ))
        })?;

        // Only the first override of a session snapshots the desktop mode
        // and captures the display.
        let previous = match monitor.mode_state {
            ModeState::Unmodified => Some(self.services.copy_display_mode(id)?),
            ModeState::Overridden { .. } => None,
        };
        let capture = previous.is_some();

        self.with_fade(|| {
            if capture {
                self.services.capture_display(id)?;
            }
            if let Err(err) = self.services.set_display_mode(id, &native) {
                if capture {
                    if let Err(release_err) = self.services.release_display(id) {
                        tracing::warn!(display = id, %release_err, "Failed to release display");
                    }
                }
                return Err(err);
            }
            Ok(())
        })?;

        if let Some(previous) = previous {
            monitor.mode_state = ModeState::Overridden { previous };
        }
        tracing::info!(
            monitor = %monitor.name,
            width = target.width,
            height = target.height,
            refresh_rate = target.refresh_rate,
            "Switched video mode"
        );
        Ok(())
    }

    fn restore_mode(&self, monitor: &mut Monitor<S::Mode>) -> DisplayResult<()> {
        let display = monitor.display_id;
        let ModeState::Overridden { previous } = &monitor.mode_state else {
            tracing::debug!(monitor = %monitor.name, "No saved video mode to restore");
            return Ok(());
        };

        self.with_fade(|| self.services.set_display_mode(display, previous))?;
        monitor.mode_state = ModeState::Unmodified;
        self.services.release_display(display)?;

        tracing::info!(monitor = %monitor.name, "Restored video mode");
        Ok(())
    }

    fn read_gamma_ramp(&self, display: DisplayId) -> DisplayResult<GammaRamp> {
        let capacity = self.services.gamma_table_capacity(display);
        let (red, green, blue) = self.services.transfer_table(display, capacity)?;
        GammaRamp::new(
            channel_to_u16(&red),
            channel_to_u16(&green),
            channel_to_u16(&blue),
        )
    }

    fn apply_gamma_ramp(&self, monitor: &mut Monitor<S::Mode>, ramp: &GammaRamp) -> DisplayResult<()> {
        if monitor.original_ramp.is_none() {
            monitor.original_ramp = Some(self.read_gamma_ramp(monitor.display_id)?);
        }
        self.write_gamma_ramp(monitor.display_id, ramp)
    }

    fn write_gamma_ramp(&self, display: DisplayId, ramp: &GammaRamp) -> DisplayResult<()> {
        self.services.set_transfer_table(
            display,
            &channel_to_f32(ramp.red()),
            &channel_to_f32(ramp.green()),
            &channel_to_f32(ramp.blue()),
        )
    }

    /// Run `apply` inside a fade-to-black transition.
    fn with_fade<T>(&self, apply: impl FnOnce() -> DisplayResult<T>) -> DisplayResult<T> {
        let _fade = FadeReservation::begin(&self.services, &self.fade);
        apply()
    }
}

/// Blanks the displays for the lifetime of the guard.
///
/// Fading back in and releasing the reservation happen on drop, so the
/// screen comes back on every exit path.
struct FadeReservation<'a, S: DisplayServices> {
    services: &'a S,
    token: Option<FadeToken>,
    fade_in_secs: f32,
}

impl<'a, S: DisplayServices> FadeReservation<'a, S> {
    fn begin(services: &'a S, config: &FadeConfig) -> Self {
        let token = if config.enabled {
            services.acquire_fade_reservation(config.reservation_secs)
        } else {
            None
        };

        if let Some(token) = token {
            if let Err(err) = services.fade(token, config.fade_out_secs, FadeDirection::ToBlack) {
                tracing::warn!(%err, "Fade to black failed");
            }
        }

        Self {
            services,
            token,
            fade_in_secs: config.fade_in_secs,
        }
    }
}

impl<S: DisplayServices> Drop for FadeReservation<'_, S> {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            if let Err(err) = self
                .services
                .fade(token, self.fade_in_secs, FadeDirection::FromBlack)
            {
                tracing::warn!(%err, "Fade from black failed");
            }
            self.services.release_fade_reservation(token);
        }
    }
}

fn channel_to_u16(values: &[f32]) -> Vec<u16> {
    values
        .iter()
        .map(|&v| (v.clamp(0.0, 1.0) * 65535.0).round() as u16)
        .collect()
}

fn channel_to_f32(values: &[u16]) -> Vec<f32> {
    values.iter().map(|&v| v as f32 / 65535.0).collect()
}
