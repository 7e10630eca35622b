//! ADS1115 16-bit, 4-channel I2C ADC driver.
//!
//! Only what the recorder needs: single-shot, single-ended conversions with a
//! configurable PGA gain and data rate. Each conversion is started by writing
//! the config register and completed by polling its OS bit.

use embedded_hal::i2c::I2c;

use crate::sensors::{ADC_READ_FAILED, AnalogChannel, AnalogFrontEnd};

/// Default 7-bit address (ADDR pin tied to GND).
pub const ADS1115_ADDRESS: u8 = 0x48;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

const CONFIG_OS_SINGLE: u16 = 0x8000;
const CONFIG_MUX_SINGLE_BASE: u16 = 0x4;
const CONFIG_MODE_SINGLE: u16 = 0x0100;
const CONFIG_COMP_QUE_DISABLE: u16 = 0x0003;

/// Config register polls before a conversion is declared stuck.
const MAX_CONVERSION_POLLS: u32 = 500;

#[derive(Debug, thiserror::Error)]
pub enum Error<E> {
    #[error("i2c transaction failed: {0:?}")]
    Bus(E),
    #[error("conversion did not complete after {polls} polls")]
    ConversionTimeout { polls: u32 },
}

/// Programmable gain amplifier setting, named after the gain factor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Gain {
    /// ±6.144 V
    #[default]
    TwoThirds,
    /// ±4.096 V
    One,
    /// ±2.048 V
    Two,
    /// ±1.024 V
    Four,
    /// ±0.512 V
    Eight,
    /// ±0.256 V
    Sixteen,
}

impl Gain {
    /// Full-scale input range in volts.
    pub fn full_scale_volts(self) -> f32 {
        match self {
            Gain::TwoThirds => 6.144,
            Gain::One => 4.096,
            Gain::Two => 2.048,
            Gain::Four => 1.024,
            Gain::Eight => 0.512,
            Gain::Sixteen => 0.256,
        }
    }

    fn bits(self) -> u16 {
        let pga: u16 = match self {
            Gain::TwoThirds => 0b000,
            Gain::One => 0b001,
            Gain::Two => 0b010,
            Gain::Four => 0b011,
            Gain::Eight => 0b100,
            Gain::Sixteen => 0b101,
        };
        pga << 9
    }
}

/// Conversion data rate in samples per second.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum DataRate {
    Sps8,
    Sps16,
    Sps32,
    Sps64,
    #[default]
    Sps128,
    Sps250,
    Sps475,
    Sps860,
}

impl DataRate {
    fn bits(self) -> u16 {
        let dr: u16 = match self {
            DataRate::Sps8 => 0b000,
            DataRate::Sps16 => 0b001,
            DataRate::Sps32 => 0b010,
            DataRate::Sps64 => 0b011,
            DataRate::Sps128 => 0b100,
            DataRate::Sps250 => 0b101,
            DataRate::Sps475 => 0b110,
            DataRate::Sps860 => 0b111,
        };
        dr << 5
    }
}

pub struct Ads1115<I2C> {
    i2c: I2C,
    address: u8,
    gain: Gain,
    data_rate: DataRate,
}

impl<I2C> Ads1115<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            gain: Gain::default(),
            data_rate: DataRate::default(),
        }
    }

    pub fn set_gain(&mut self, gain: Gain) {
        self.gain = gain;
    }

    pub fn set_data_rate(&mut self, data_rate: DataRate) {
        self.data_rate = data_rate;
    }

    /// Checks that the device answers on the bus.
    pub fn init(&mut self) -> Result<(), Error<I2C::Error>> {
        let config = self.read_register(REG_CONFIG)?;
        debug!(
            "ADS1115 at {=u8:#x} initialized, config {=u16:#x}",
            self.address,
            config
        );
        Ok(())
    }

    /// Runs one single-shot conversion and returns the signed code.
    pub fn read_raw(&mut self, channel: AnalogChannel) -> Result<i16, Error<I2C::Error>> {
        let mux = (CONFIG_MUX_SINGLE_BASE + u16::from(channel.index())) << 12;
        let config = CONFIG_OS_SINGLE
            | mux
            | self.gain.bits()
            | CONFIG_MODE_SINGLE
            | self.data_rate.bits()
            | CONFIG_COMP_QUE_DISABLE;
        self.write_register(REG_CONFIG, config)?;

        let mut polls = 0;
        while self.read_register(REG_CONFIG)? & CONFIG_OS_SINGLE == 0 {
            polls += 1;
            if polls >= MAX_CONVERSION_POLLS {
                return Err(Error::ConversionTimeout { polls });
            }
        }

        let raw = self.read_register(REG_CONVERSION)? as i16;
        trace!("ADS1115 channel {=u8}: {=i16}", channel.index(), raw);
        Ok(raw)
    }

    fn write_register(&mut self, register: u8, value: u16) -> Result<(), Error<I2C::Error>> {
        let [msb, lsb] = value.to_be_bytes();
        self.i2c
            .write(self.address, &[register, msb, lsb])
            .map_err(Error::Bus)
    }

    fn read_register(&mut self, register: u8) -> Result<u16, Error<I2C::Error>> {
        let mut data = [0; 2];
        self.i2c
            .write_read(self.address, &[register], &mut data)
            .map_err(Error::Bus)?;
        Ok(u16::from_be_bytes(data))
    }
}

impl<I2C> AnalogFrontEnd for Ads1115<I2C>
where
    I2C: I2c,
{
    fn read_single_ended(&mut self, channel: AnalogChannel) -> i16 {
        match self.read_raw(channel) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "ADS1115 channel {=u8} read failed: {}",
                    channel.index(),
                    defmt::Debug2Format(&e)
                );
                ADC_READ_FAILED
            }
        }
    }

    fn compute_volts(&self, raw: i16) -> f32 {
        f32::from(raw) * (self.gain.full_scale_volts() / 32768.0)
    }
}
