//! Sensor contracts consumed by the sample pipeline.
//!
//! These traits are the seam between the recording core and the peripheral
//! drivers. They are deliberately infallible: a driver that fails a bus
//! transaction logs it and hands back a sentinel value, which the pipeline
//! forwards unchanged.

/// Value reported for an analog channel whose conversion failed.
pub const ADC_READ_FAILED: i16 = i16::MIN;

/// Value reported for a power-monitor quantity whose read failed.
pub const MONITOR_READ_FAILED: f32 = f32::NAN;

/// Single-ended input of the 4-channel ADC.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum AnalogChannel {
    Ain0,
    Ain1,
    Ain2,
    Ain3,
}

impl AnalogChannel {
    /// All channels in sampling order.
    pub const ALL: [AnalogChannel; 4] = [
        AnalogChannel::Ain0,
        AnalogChannel::Ain1,
        AnalogChannel::Ain2,
        AnalogChannel::Ain3,
    ];

    pub fn index(self) -> u8 {
        match self {
            AnalogChannel::Ain0 => 0,
            AnalogChannel::Ain1 => 1,
            AnalogChannel::Ain2 => 2,
            AnalogChannel::Ain3 => 3,
        }
    }
}

/// Multi-channel analog-to-digital converter.
pub trait AnalogFrontEnd {
    /// Raw signed conversion code of one single-ended channel.
    fn read_single_ended(&mut self, channel: AnalogChannel) -> i16;

    /// Converts a raw code to volts at the input pin using the device's
    /// fixed linear transfer function.
    fn compute_volts(&self, raw: i16) -> f32;
}

/// Shunt-based power monitor. Quantities are returned in final units.
pub trait PowerMonitor {
    /// Bus voltage in volts.
    fn read_bus_voltage(&mut self) -> f32;

    /// Shunt current in amperes.
    fn read_current(&mut self) -> f32;

    /// Power in watts.
    fn read_power(&mut self) -> f32;
}
