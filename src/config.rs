//! Recorder configuration.
//!
//! Sampling rate, active sinks and power monitor calibration are runtime
//! values. The firmware builds one [`RecorderConfig`] at boot, validates it
//! and hands it to the controller.

use crate::ads1115::DataRate;
use crate::ina228::{AveragingCount, ConversionTime};

/// Rates at or above this use the fast conversion preset.
pub const FAST_PROFILE_MIN_RATE_HZ: u32 = 100;

/// Highest rate the millisecond loop can honor.
pub const MAX_SAMPLE_RATE_HZ: u32 = 1000;

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("sample rate {0} Hz is outside 1..=1000 Hz")]
    SampleRate(u32),
    #[error("channel scale {0} must be finite and positive")]
    ChannelScale(f32),
    #[error("shunt calibration needs positive resistance and current, got {shunt_ohms} ohm / {max_current_amps} A")]
    ShuntCalibration {
        shunt_ohms: f32,
        max_current_amps: f32,
    },
}

/// How the controller decides that a sampling tick is due.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum Cadence {
    /// Deadline scheduler: one row per `1000 / rate` ms, missed deadlines
    /// are skipped rather than replayed.
    Periodic,
    /// Legacy gate: fires whenever `now_ms % (100 / rate) == 0`. Can fire
    /// twice within one millisecond or miss an interval entirely.
    WallClockModulo,
}

/// Column labels written at session start.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum HeaderLayout {
    /// Labels expected by existing tooling. The last three labels do not
    /// match the order of the data columns.
    Legacy,
    /// Labels in the same order as the data columns.
    MatchingColumns,
}

impl HeaderLayout {
    pub fn header(self) -> &'static str {
        match self {
            HeaderLayout::Legacy => "Time,ADC0,ADC1,ADC2,ADC3,Current,Voltage,Power",
            HeaderLayout::MatchingColumns => "Time,ADC0,ADC1,ADC2,ADC3,Voltage,Current,Power",
        }
    }
}

/// Destinations for header and data rows.
///
/// Status lines always go to the console; this only selects where rows go.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct SinkSelection {
    pub console: bool,
    pub file: bool,
}

impl SinkSelection {
    pub const CONSOLE: Self = Self {
        console: true,
        file: false,
    };
    pub const FILE: Self = Self {
        console: false,
        file: true,
    };
    pub const BOTH: Self = Self {
        console: true,
        file: true,
    };
}

/// Power monitor shunt calibration.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct PowerMonitorConfig {
    pub shunt_ohms: f32,
    pub max_current_amps: f32,
}

/// Averaging and conversion-time preset, chosen from the sample rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct ConversionProfile {
    pub averaging: AveragingCount,
    pub bus_conversion: ConversionTime,
    pub shunt_conversion: ConversionTime,
    pub adc_data_rate: DataRate,
}

impl ConversionProfile {
    pub const FAST: Self = Self {
        averaging: AveragingCount::Count16,
        bus_conversion: ConversionTime::Us50,
        shunt_conversion: ConversionTime::Us50,
        adc_data_rate: DataRate::Sps860,
    };

    pub const PRECISE: Self = Self {
        averaging: AveragingCount::Count64,
        bus_conversion: ConversionTime::Us150,
        shunt_conversion: ConversionTime::Us150,
        adc_data_rate: DataRate::Sps128,
    };

    pub fn for_sample_rate(rate_hz: u32) -> Self {
        if rate_hz >= FAST_PROFILE_MIN_RATE_HZ {
            Self::FAST
        } else {
            Self::PRECISE
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub struct RecorderConfig {
    pub sample_rate_hz: u32,
    pub cadence: Cadence,
    pub sinks: SinkSelection,
    pub header: HeaderLayout,
    /// Voltage divider scale applied to every ADC channel.
    pub channel_scale: f32,
    pub power_monitor: PowerMonitorConfig,
}

impl RecorderConfig {
    pub const DEFAULT: Self = Self {
        sample_rate_hz: 1,
        cadence: Cadence::Periodic,
        sinks: SinkSelection::CONSOLE,
        header: HeaderLayout::Legacy,
        channel_scale: 10.0,
        power_monitor: PowerMonitorConfig {
            shunt_ohms: 0.02,
            max_current_amps: 8.0,
        },
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_SAMPLE_RATE_HZ).contains(&self.sample_rate_hz) {
            return Err(ConfigError::SampleRate(self.sample_rate_hz));
        }
        if !self.channel_scale.is_finite() || self.channel_scale <= 0.0 {
            return Err(ConfigError::ChannelScale(self.channel_scale));
        }
        let PowerMonitorConfig {
            shunt_ohms,
            max_current_amps,
        } = self.power_monitor;
        if !(shunt_ohms > 0.0 && max_current_amps > 0.0) {
            return Err(ConfigError::ShuntCalibration {
                shunt_ohms,
                max_current_amps,
            });
        }
        Ok(())
    }

    /// Period of the deadline scheduler in milliseconds.
    /// Never zero: rates above 1000 Hz sample on every millisecond tick.
    pub fn interval_ms(&self) -> u64 {
        u64::from((1000 / self.sample_rate_hz.max(1)).max(1))
    }

    /// Divisor of the legacy wall-clock gate (hundredths of a second / rate).
    pub fn legacy_gate_ms(&self) -> u64 {
        u64::from((100 / self.sample_rate_hz.max(1)).max(1))
    }

    pub fn conversion_profile(&self) -> ConversionProfile {
        ConversionProfile::for_sample_rate(self.sample_rate_hz)
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
