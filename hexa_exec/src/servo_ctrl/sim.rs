//! Simulated servo board
//!
//! [`SimDriver`] stands in for a real board when running away from the robot. Every write is
//! logged at trace level and, when built with [`SimDriver::recording`], appended to a shared
//! [`SimLog`] so that the exact sequence of hardware commands can be inspected afterwards.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use log::trace;

use super::{PwmDriver, ServoError, MAX_CHANNEL};
use crate::gait_ctrl::Suspend;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Shared, ordered log of simulated hardware events.
///
/// Clones share the same underlying log, so one log can be given to several drivers to observe
/// the interleaving of writes across banks.
#[derive(Clone, Debug, Default)]
pub struct SimLog {
    events: Arc<Mutex<Vec<SimEvent>>>,
}

/// A simulated PWM board.
#[derive(Debug)]
pub struct SimDriver {
    bank: String,
    log: Option<SimLog>,
}

/// A [`Suspend`] implementation which records the requested delays instead of sleeping.
#[derive(Debug)]
pub struct SimSuspend {
    log: SimLog,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An event observed by the simulation.
#[derive(Clone, Debug, PartialEq)]
pub enum SimEvent {
    SetFrequency {
        bank: String,
        frequency_hz: u32,
    },
    SetPwm {
        bank: String,
        channel: u8,
        on_tick: u16,
        off_tick: u16,
    },
    Close {
        bank: String,
    },
    Suspend(Duration),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the log.
    pub fn push(&self, event: SimEvent) {
        self.lock().push(event);
    }

    /// Get a copy of all events recorded so far.
    pub fn events(&self) -> Vec<SimEvent> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<SimEvent>> {
        // A panicking writer can't leave a Vec half pushed, so a poisoned log is still usable
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SimDriver {
    /// Create a driver which only logs its writes.
    pub fn new(bank: &str) -> Self {
        Self {
            bank: bank.to_string(),
            log: None,
        }
    }

    /// Create a driver which logs its writes and records them into `log`.
    pub fn recording(bank: &str, log: SimLog) -> Self {
        Self {
            bank: bank.to_string(),
            log: Some(log),
        }
    }

    fn record(&self, event: SimEvent) {
        if let Some(ref log) = self.log {
            log.push(event);
        }
    }
}

impl PwmDriver for SimDriver {
    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), ServoError> {
        trace!("sim {}: frequency {} Hz", self.bank, frequency_hz);
        self.record(SimEvent::SetFrequency {
            bank: self.bank.clone(),
            frequency_hz,
        });
        Ok(())
    }

    fn set_pwm(&mut self, channel: u8, on_tick: u16, off_tick: u16) -> Result<(), ServoError> {
        if channel > MAX_CHANNEL {
            return Err(ServoError::InvalidChannel(channel));
        }

        trace!("sim {}[{}]: on {} off {}", self.bank, channel, on_tick, off_tick);
        self.record(SimEvent::SetPwm {
            bank: self.bank.clone(),
            channel,
            on_tick,
            off_tick,
        });
        Ok(())
    }

    fn close(&mut self) -> Result<(), ServoError> {
        trace!("sim {}: closed", self.bank);
        self.record(SimEvent::Close {
            bank: self.bank.clone(),
        });
        Ok(())
    }
}

impl SimSuspend {
    pub fn recording(log: SimLog) -> Self {
        Self { log }
    }
}

impl Suspend for SimSuspend {
    fn suspend_for(&mut self, duration: Duration) {
        self.log.push(SimEvent::Suspend(duration));
    }
}
