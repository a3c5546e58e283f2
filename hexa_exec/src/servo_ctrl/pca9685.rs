//! [`PwmDriver`] implementation for the PCA9685 driver

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use pwm_pca9685::{Channel, Pca9685};
use embedded_hal::blocking::i2c::{Write, WriteRead};

use super::{PwmDriver, ServoError};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Frequency of the PCA9685's internal oscillator.
const OSC_CLOCK_HZ: f64 = 25_000_000.0;

const MAX_PWM: u16 = 4096;

/// Lowest prescale value accepted by the chip.
const MIN_PRESCALE: f64 = 3.0;

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl<I2C, E> PwmDriver for Pca9685<I2C>
where
    I2C: Write<Error = E> + WriteRead<Error = E>
{
    fn set_frequency(&mut self, frequency_hz: u32) -> Result<(), ServoError> {
        let prescale = prescale_for(frequency_hz)?;

        self.set_prescale(prescale).map_err(map_pca_err)?;
        self.enable().map_err(map_pca_err)
    }

    fn set_pwm(
        &mut self,
        channel: u8,
        on_tick: u16,
        off_tick: u16
    ) -> Result<(), ServoError> {

        // If the ticks are out of range return an error
        if on_tick >= MAX_PWM || off_tick >= MAX_PWM {
            return Err(ServoError::InvalidDutyCycle)
        }

        self.set_channel_on_off(to_channel(channel)?, on_tick, off_tick)
            .map_err(map_pca_err)
    }

    fn close(&mut self) -> Result<(), ServoError> {
        // Putting the chip to sleep turns every output off
        self.disable().map_err(map_pca_err)
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Open a PCA9685 board on the given Raspberry Pi I2C bus and bring it up as a servo hat.
#[cfg(all(target_arch = "arm", target_os = "linux"))]
pub fn open_hat(
    name: &str,
    bus: u8,
    address: u8,
    timing: super::PwmTiming
) -> Result<super::ServoHat<Pca9685<rppal::i2c::I2c>>, ServoError> {
    let i2c = rppal::i2c::I2c::with_bus(bus).map_err(|e| {
        log::error!("Could not open I2C bus {}: {}", bus, e);
        ServoError::I2c
    })?;

    let pca = Pca9685::new(i2c, address).map_err(map_pca_err)?;

    super::ServoHat::new(name, pca, timing)
}

/// Get the prescale register value giving the closest frequency to `frequency_hz`.
fn prescale_for(frequency_hz: u32) -> Result<u8, ServoError> {
    if frequency_hz == 0 {
        return Err(ServoError::InvalidTiming(String::from("frequency must be non-zero")))
    }

    let prescale = (OSC_CLOCK_HZ / (MAX_PWM as f64 * frequency_hz as f64)).round() - 1.0;

    if prescale < MIN_PRESCALE || prescale > u8::MAX as f64 {
        return Err(ServoError::InvalidTiming(format!(
            "{} Hz is outside of the PCA9685's frequency range",
            frequency_hz
        )))
    }

    Ok(prescale as u8)
}

fn to_channel(channel: u8) -> Result<Channel, ServoError> {
    Ok(match channel {
        0 => Channel::C0,
        1 => Channel::C1,
        2 => Channel::C2,
        3 => Channel::C3,
        4 => Channel::C4,
        5 => Channel::C5,
        6 => Channel::C6,
        7 => Channel::C7,
        8 => Channel::C8,
        9 => Channel::C9,
        10 => Channel::C10,
        11 => Channel::C11,
        12 => Channel::C12,
        13 => Channel::C13,
        14 => Channel::C14,
        15 => Channel::C15,
        c => return Err(ServoError::InvalidChannel(c))
    })
}

fn map_pca_err<E>(e: pwm_pca9685::Error<E>) -> ServoError {
    match e {
        pwm_pca9685::Error::I2C(_) => ServoError::I2c,
        pwm_pca9685::Error::InvalidInputData => ServoError::InvalidDutyCycle
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_prescale() {
        assert_eq!(prescale_for(50).unwrap(), 121);
        assert_eq!(prescale_for(60).unwrap(), 101);
        assert!(prescale_for(0).is_err());
        assert!(prescale_for(5000).is_err());
        assert!(prescale_for(10).is_err());
    }

    #[test]
    fn test_to_channel() {
        assert!(matches!(to_channel(0), Ok(Channel::C0)));
        assert!(matches!(to_channel(15), Ok(Channel::C15)));
        assert!(matches!(to_channel(16), Err(ServoError::InvalidChannel(16))));
    }
}
