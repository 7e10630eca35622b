//! INA228 20-bit I2C power monitor driver.
//!
//! The device computes current and power internally once `SHUNT_CAL` is
//! programmed; this driver only scales the raw register values:
//!
//! ```text
//! current_lsb = max_current / 2^19
//! SHUNT_CAL   = 13107.2e6 * current_lsb * R_shunt   (ADCRANGE = 0)
//! V_bus       = VBUS[23:4]    * 195.3125 uV
//! I           = CURRENT[23:4] * current_lsb          (two's complement)
//! P           = POWER         * 3.2 * current_lsb
//! ```

use embedded_hal::i2c::I2c;

use crate::config::{ConversionProfile, PowerMonitorConfig};
use crate::sensors::{MONITOR_READ_FAILED, PowerMonitor};

/// Default 7-bit address (A0 and A1 tied to GND).
pub const INA228_ADDRESS: u8 = 0x40;

const REG_CONFIG: u8 = 0x00;
const REG_ADC_CONFIG: u8 = 0x01;
const REG_SHUNT_CAL: u8 = 0x02;
const REG_VBUS: u8 = 0x05;
const REG_CURRENT: u8 = 0x07;
const REG_POWER: u8 = 0x08;
const REG_MANUFACTURER_ID: u8 = 0x3E;
const REG_DEVICE_ID: u8 = 0x3F;

const CONFIG_RESET: u16 = 0x8000;
const ADC_MODE_CONTINUOUS_ALL: u16 = 0xF << 12;
const TEMPERATURE_CONVERSION_1052_US: u16 = 0b101 << 3;

const MANUFACTURER_TI: u16 = 0x5449;
const DEVICE_INA228: u16 = 0x228;

const SHUNT_CAL_SCALE: f32 = 13107.2e6;
const SHUNT_CAL_MAX: f32 = 0x7FFF as f32;
const CURRENT_LSB_DIVISOR: f32 = 524_288.0;
const VBUS_LSB_VOLTS: f32 = 195.3125e-6;
const POWER_LSB_FACTOR: f32 = 3.2;

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("i2c transaction failed: {0:?}")]
    Bus(E),
    #[error("unexpected device: manufacturer {manufacturer:#06x}, device {device:#05x}")]
    UnexpectedDevice { manufacturer: u16, device: u16 },
    #[error("shunt calibration {value} does not fit the SHUNT_CAL register")]
    CalibrationOutOfRange { value: f32 },
}

/// Number of conversions averaged per reported value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum AveragingCount {
    Count1,
    Count4,
    Count16,
    Count64,
    Count128,
    Count256,
    Count512,
    Count1024,
}

impl AveragingCount {
    fn bits(self) -> u16 {
        match self {
            AveragingCount::Count1 => 0,
            AveragingCount::Count4 => 1,
            AveragingCount::Count16 => 2,
            AveragingCount::Count64 => 3,
            AveragingCount::Count128 => 4,
            AveragingCount::Count256 => 5,
            AveragingCount::Count512 => 6,
            AveragingCount::Count1024 => 7,
        }
    }
}

/// Per-conversion time of the bus or shunt voltage ADC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum ConversionTime {
    Us50,
    Us84,
    Us150,
    Us280,
    Us540,
    Us1052,
    Us2074,
    Us4120,
}

impl ConversionTime {
    fn bits(self) -> u16 {
        match self {
            ConversionTime::Us50 => 0,
            ConversionTime::Us84 => 1,
            ConversionTime::Us150 => 2,
            ConversionTime::Us280 => 3,
            ConversionTime::Us540 => 4,
            ConversionTime::Us1052 => 5,
            ConversionTime::Us2074 => 6,
            ConversionTime::Us4120 => 7,
        }
    }
}

pub struct Ina228<I2C> {
    i2c: I2C,
    address: u8,
    current_lsb: f32,
}

impl<I2C> Ina228<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            current_lsb: 0.0,
        }
    }

    /// Resets the device, verifies its identity and applies calibration and
    /// conversion settings.
    pub fn init(
        &mut self,
        monitor: &PowerMonitorConfig,
        profile: &ConversionProfile,
    ) -> Result<(), Error<I2C::Error>> {
        self.write_register(REG_CONFIG, CONFIG_RESET)?;

        let manufacturer = self.read_register16(REG_MANUFACTURER_ID)?;
        let device = self.read_register16(REG_DEVICE_ID)? >> 4;
        if manufacturer != MANUFACTURER_TI || device != DEVICE_INA228 {
            return Err(Error::UnexpectedDevice {
                manufacturer,
                device,
            });
        }

        self.set_shunt(monitor.shunt_ohms, monitor.max_current_amps)?;
        self.set_adc_config(
            profile.averaging,
            profile.bus_conversion,
            profile.shunt_conversion,
        )?;

        debug!(
            "INA228 at {=u8:#x} initialized, current lsb {=f32} A",
            self.address,
            self.current_lsb
        );
        Ok(())
    }

    /// Programs `SHUNT_CAL` for the given shunt and expected maximum current.
    pub fn set_shunt(
        &mut self,
        shunt_ohms: f32,
        max_current_amps: f32,
    ) -> Result<(), Error<I2C::Error>> {
        let current_lsb = max_current_amps / CURRENT_LSB_DIVISOR;
        let shunt_cal = SHUNT_CAL_SCALE * current_lsb * shunt_ohms;
        if !(0.0..=SHUNT_CAL_MAX).contains(&shunt_cal) {
            return Err(Error::CalibrationOutOfRange { value: shunt_cal });
        }

        self.write_register(REG_SHUNT_CAL, (shunt_cal + 0.5) as u16)?;
        self.current_lsb = current_lsb;
        Ok(())
    }

    /// Writes `ADC_CONFIG`: continuous bus, shunt and temperature conversions.
    pub fn set_adc_config(
        &mut self,
        averaging: AveragingCount,
        bus_conversion: ConversionTime,
        shunt_conversion: ConversionTime,
    ) -> Result<(), Error<I2C::Error>> {
        let value = ADC_MODE_CONTINUOUS_ALL
            | bus_conversion.bits() << 9
            | shunt_conversion.bits() << 6
            | TEMPERATURE_CONVERSION_1052_US
            | averaging.bits();
        self.write_register(REG_ADC_CONFIG, value)
    }

    pub fn bus_voltage(&mut self) -> Result<f32, Error<I2C::Error>> {
        let raw = self.read_register24(REG_VBUS)? >> 4;
        Ok(raw as f32 * VBUS_LSB_VOLTS)
    }

    pub fn current(&mut self) -> Result<f32, Error<I2C::Error>> {
        let raw = self.read_register24(REG_CURRENT)?;
        // Sign-extend the 24-bit register, then drop the 4 reserved bits.
        let signed = ((raw << 8) as i32) >> 12;
        Ok(signed as f32 * self.current_lsb)
    }

    pub fn power(&mut self) -> Result<f32, Error<I2C::Error>> {
        let raw = self.read_register24(REG_POWER)?;
        Ok(raw as f32 * POWER_LSB_FACTOR * self.current_lsb)
    }

    fn write_register(&mut self, register: u8, value: u16) -> Result<(), Error<I2C::Error>> {
        let [msb, lsb] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[register, msb, lsb])
            .map_err(Error::Bus)
    }

    fn read_register16(&mut self, register: u8) -> Result<u16, Error<I2C::Error>> {
        let mut data = [0; 2];
        self.i2c
            .write_read(self.address, &[register], &mut data)
            .map_err(Error::Bus)?;
        Ok(u16::from_be_bytes(data))
    }

    fn read_register24(&mut self, register: u8) -> Result<u32, Error<I2C::Error>> {
        let mut data = [0; 3];
        self.i2c
            .write_read(self.address, &[register], &mut data)
            .map_err(Error::Bus)?;
        Ok(u32::from_be_bytes([0, data[0], data[1], data[2]]))
    }
}

fn or_sentinel<E: core::fmt::Debug>(quantity: &str, reading: Result<f32, Error<E>>) -> f32 {
    match reading {
        Ok(value) => value,
        Err(e) => {
            warn!(
                "INA228 {=str} read failed: {}",
                quantity,
                defmt::Debug2Format(&e)
            );
            MONITOR_READ_FAILED
        }
    }
}

impl<I2C> PowerMonitor for Ina228<I2C>
where
    I2C: I2c,
{
    fn read_bus_voltage(&mut self) -> f32 {
        or_sentinel("bus voltage", self.bus_voltage())
    }

    fn read_current(&mut self) -> f32 {
        or_sentinel("current", self.current())
    }

    fn read_power(&mut self) -> f32 {
        or_sentinel("power", self.power())
    }
}
