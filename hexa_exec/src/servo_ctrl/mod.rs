//! # Servo Controller Module
//!
//! This module provides a unified servo control interface which can abstract over different types
//! of servo driver boards.
//!
//! A [`ServoHat`] wraps one 16 channel PWM board (a "bank"), converting logical servo angles into
//! duty cycle values and remembering the last angle commanded on each channel. The board itself is
//! accessed through the [`PwmDriver`] trait, so that the same mapping can drive real hardware or a
//! simulated board.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// [`PwmDriver`] implementation for the Adafruit PCA9685 16 channel servo driver board.
pub mod pca9685;

/// Simulated [`PwmDriver`] which logs and optionally records every write.
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use util::raise_error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of PWM channels on a single board.
pub const NUM_CHANNELS: usize = 16;

/// Lowest valid channel index.
pub const MIN_CHANNEL: u8 = 0;

/// Highest valid channel index.
pub const MAX_CHANNEL: u8 = (NUM_CHANNELS - 1) as u8;

/// Lowest angle a servo can be commanded to.
///
/// Units: degrees
pub const MIN_ANGLE_DEG: f64 = 0.0;

/// Highest angle a servo can be commanded to.
///
/// Units: degrees
pub const MAX_ANGLE_DEG: f64 = 180.0;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Trait to provide a unified API for accessing servo driver boards.
pub trait PwmDriver {

    /// Set the PWM frequency of the board. Called once when the board is brought up.
    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), ServoError>;

    /// Set the on and off ticks of a channel.
    ///
    /// ## Arguments
    /// - `channel` - The channel to set, between 0 and 15
    /// - `on_tick` - The tick within the PWM period at which the output turns on
    /// - `off_tick` - The tick within the PWM period at which the output turns off
    fn set_pwm(&mut self, channel: u8, on_tick: u16, off_tick: u16) -> Result<(), ServoError>;

    /// Release the board. Called exactly once when the owning bank is closed.
    fn close(&mut self) -> Result<(), ServoError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// PWM timing of a servo board, used to map pulse widths onto duty cycles.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PwmTiming {
    /// PWM output frequency.
    ///
    /// Units: hertz
    pub frequency_hz: u32,

    /// Number of ticks in one PWM period (4096 for a 12 bit board).
    pub resolution_ticks: u32,

    /// Pulse width commanding the servo to `MIN_ANGLE_DEG`.
    ///
    /// Units: milliseconds
    pub min_pulse_ms: f64,

    /// Pulse width commanding the servo to `MAX_ANGLE_DEG`.
    ///
    /// Units: milliseconds
    pub max_pulse_ms: f64,
}

/// A single servo board (bank) with the last commanded angle of each of its channels.
pub struct ServoHat<D: PwmDriver> {
    /// Name used in logs, for instance "right" or "left"
    name: String,

    driver: D,

    timing: PwmTiming,

    /// Last commanded angle of each channel.
    ///
    /// Units: degrees
    angles_deg: [f64; NUM_CHANNELS],

    closed: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(thiserror::Error, Debug)]
pub enum ServoError {
    #[error("An I2C error occured")]
    I2c,

    #[error("Duty cycle is outside of the board's resolution")]
    InvalidDutyCycle,

    #[error("Channel {0} does not exist on the board")]
    InvalidChannel(u8),

    #[error("Invalid PWM timing: {0}")]
    InvalidTiming(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for PwmTiming {
    fn default() -> Self {
        Self {
            frequency_hz: 50,
            resolution_ticks: 4096,
            min_pulse_ms: 0.5,
            max_pulse_ms: 2.0,
        }
    }
}

impl PwmTiming {

    /// Length of one tick in whole microseconds.
    ///
    /// Integer arithmetic is used throughout to match the duty cycles the legs were calibrated
    /// against, at 50 Hz and 4096 ticks this is 4 us.
    pub fn pulse_length_us(&self) -> u32 {
        (1_000_000 / self.frequency_hz) / self.resolution_ticks
    }

    /// Get the duty cycle (off tick) which corresponds to the given angle.
    ///
    /// The angle is not range checked, callers must do so first.
    pub fn duty_cycle(&self, angle_deg: f64) -> u16 {
        let normalised = (angle_deg - MIN_ANGLE_DEG) / (MAX_ANGLE_DEG - MIN_ANGLE_DEG);
        let pulse_ms = self.min_pulse_ms + (self.max_pulse_ms - self.min_pulse_ms) * normalised;

        // Truncation, not rounding
        (pulse_ms * 1000.0 / self.pulse_length_us() as f64) as u16
    }

    /// Check that the timing produces usable duty cycles.
    pub fn validate(&self) -> Result<(), ServoError> {
        if self.frequency_hz == 0 || self.resolution_ticks == 0 {
            return Err(ServoError::InvalidTiming(format!(
                "frequency ({} Hz) and resolution ({} ticks) must be non-zero",
                self.frequency_hz, self.resolution_ticks
            )))
        }

        // Duty cycles are written to the board as 16 bit ticks
        if self.resolution_ticks > u16::MAX as u32 + 1 {
            return Err(ServoError::InvalidTiming(format!(
                "resolution of {} ticks does not fit in 16 bits",
                self.resolution_ticks
            )))
        }

        if self.pulse_length_us() == 0 {
            return Err(ServoError::InvalidTiming(format!(
                "a tick at {} Hz with {} ticks is shorter than 1 us",
                self.frequency_hz, self.resolution_ticks
            )))
        }

        if !(0.0..self.max_pulse_ms).contains(&self.min_pulse_ms) {
            return Err(ServoError::InvalidTiming(format!(
                "pulse range [{}, {}] ms is invalid",
                self.min_pulse_ms, self.max_pulse_ms
            )))
        }

        let max_duty = self.duty_cycle(MAX_ANGLE_DEG) as u32;
        if max_duty >= self.resolution_ticks {
            return Err(ServoError::InvalidTiming(format!(
                "maximum duty cycle {} exceeds the resolution of {} ticks",
                max_duty, self.resolution_ticks
            )))
        }

        Ok(())
    }
}

impl<D: PwmDriver> ServoHat<D> {

    /// Bring up a new servo board.
    ///
    /// The board's frequency is set from `timing` and every channel's last angle starts at 0.
    pub fn new(name: &str, mut driver: D, timing: PwmTiming) -> Result<Self, ServoError> {
        timing.validate()?;

        driver.set_frequency(timing.frequency_hz)?;

        debug!(
            "Servo hat \"{}\" up at {} Hz ({} us per tick)",
            name,
            timing.frequency_hz,
            timing.pulse_length_us()
        );

        Ok(Self {
            name: name.to_string(),
            driver,
            timing,
            angles_deg: [0.0; NUM_CHANNELS],
            closed: false,
        })
    }

    /// Command the servo on `channel` to `angle_deg`.
    ///
    /// Channels outside `[MIN_CHANNEL, MAX_CHANNEL]` and angles outside
    /// `[MIN_ANGLE_DEG, MAX_ANGLE_DEG]` are ignored, neither the stored angle nor the board is
    /// touched. Values are never clamped.
    ///
    /// # Panics
    /// - If the hat has already been closed.
    pub fn set_angle(&mut self, channel: u8, angle_deg: f64) {
        if self.closed {
            raise_error!("Servo hat \"{}\" commanded after it was closed", self.name);
        }

        if !(MIN_CHANNEL..=MAX_CHANNEL).contains(&channel)
            || !(MIN_ANGLE_DEG..=MAX_ANGLE_DEG).contains(&angle_deg)
        {
            trace!(
                "{}[{}]: dropping out of range angle {:.2} deg",
                self.name, channel, angle_deg
            );
            return;
        }

        let duty_cycle = self.timing.duty_cycle(angle_deg);

        self.angles_deg[channel as usize] = angle_deg;

        trace!(
            "{}[{}]: {:.2} deg -> duty cycle {}",
            self.name, channel, angle_deg, duty_cycle
        );

        // The board is fire and forget, faults are reported but never retried
        if let Err(e) = self.driver.set_pwm(channel, 0, duty_cycle) {
            warn!("{}[{}]: could not set duty cycle: {}", self.name, channel, e);
        }
    }

    /// Get the last angle commanded on `channel`, or 0 if the channel doesn't exist.
    pub fn get_angle(&self, channel: u8) -> f64 {
        self.angles_deg
            .get(channel as usize)
            .copied()
            .unwrap_or(0.0)
    }

    /// Release the board. A hat which is dropped while still open is released at that point.
    ///
    /// # Panics
    /// - If the hat has already been closed.
    pub fn close(&mut self) {
        if self.closed {
            raise_error!("Servo hat \"{}\" closed twice", self.name);
        }

        if let Err(e) = self.driver.close() {
            warn!("Could not cleanly release servo hat \"{}\": {}", self.name, e);
        }
        self.closed = true;

        debug!("Servo hat \"{}\" closed", self.name);
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<D: PwmDriver> Drop for ServoHat<D> {
    fn drop(&mut self) {
        if !self.closed {
            warn!("Servo hat \"{}\" dropped without being closed, releasing it", self.name);
            self.close();
        }
    }
}
