//! Gamma ramps.

use serde::{Deserialize, Serialize};
use vidmode_common::error::{DisplayError, DisplayResult};

/// Number of entries in a ramp generated from a gamma exponent.
pub const DEFAULT_RAMP_SIZE: usize = 256;

/// Per-channel lookup tables applied by the display hardware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GammaRamp {
    red: Vec<u16>,
    green: Vec<u16>,
    blue: Vec<u16>,
}

impl GammaRamp {
    /// Build a ramp from three channels of the same non-zero length.
    pub fn new(red: Vec<u16>, green: Vec<u16>, blue: Vec<u16>) -> DisplayResult<Self> {
        if red.is_empty() {
            return Err(DisplayError::invalid_value("gamma ramp must not be empty"));
        }
        if red.len() != green.len() || red.len() != blue.len() {
            return Err(DisplayError::invalid_value(format!(
                "gamma ramp channels differ in size ({}, {}, {})",
                red.len(),
                green.len(),
                blue.len()
            )));
        }
        Ok(Self { red, green, blue })
    }

    /// Ramp for the power curve `value^(1/gamma)`.
    pub fn from_exponent(gamma: f32, size: usize) -> DisplayResult<Self> {
        if !gamma.is_finite() || gamma <= 0.0 {
            return Err(DisplayError::invalid_value(format!(
                "invalid gamma value {gamma}"
            )));
        }
        if size < 2 {
            return Err(DisplayError::invalid_value(format!(
                "gamma ramp size {size} is too small"
            )));
        }

        let exponent = 1.0 / gamma as f64;
        let values: Vec<u16> = (0..size)
            .map(|i| {
                let linear = i as f64 / (size - 1) as f64;
                let value = linear.powf(exponent) * 65535.0 + 0.5;
                value.clamp(0.0, 65535.0) as u16
            })
            .collect();

        Ok(Self {
            red: values.clone(),
            green: values.clone(),
            blue: values,
        })
    }

    pub fn size(&self) -> usize {
        self.red.len()
    }

    pub fn red(&self) -> &[u16] {
        &self.red
    }

    pub fn green(&self) -> &[u16] {
        &self.green
    }

    pub fn blue(&self) -> &[u16] {
        &self.blue
    }
}
