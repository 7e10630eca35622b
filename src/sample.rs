//! One read cycle across both peripherals, and its CSV rendering.

use core::fmt::{self, Write};

use heapless::String;

use crate::sensors::{AnalogChannel, AnalogFrontEnd, PowerMonitor};

/// Room for the widest row any reading can produce: `u64::MAX` elapsed time
/// (20 digits), four channels at `-f32::MAX` with 3 decimals (44 bytes plus
/// a comma each) and three monitor values at `f32::MIN` with 2 decimals
/// (43 bytes plus a comma each).
pub const LINE_CAPACITY: usize = 20 + 4 * 45 + 3 * 44;

pub type CsvLine = String<LINE_CAPACITY>;

/// One sampling tick worth of readings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SampleRow {
    /// Milliseconds since the session started.
    pub elapsed_ms: u64,
    /// Channel voltages after the divider scale, in volts.
    pub channels: [f32; 4],
    pub bus_voltage: f32,
    pub current: f32,
    pub power: f32,
}

impl SampleRow {
    /// Writes the row as `time,adc0..adc3,voltage,current,power` without a
    /// line terminator.
    pub fn write_csv<W: Write>(&self, out: &mut W) -> fmt::Result {
        write!(out, "{}", self.elapsed_ms)?;
        for volts in self.channels {
            write!(out, ",{:.3}", volts)?;
        }
        write!(
            out,
            ",{:.2},{:.2},{:.2}",
            self.bus_voltage, self.current, self.power
        )
    }

    pub fn to_line(&self) -> Result<CsvLine, fmt::Error> {
        let mut line = CsvLine::new();
        self.write_csv(&mut line)?;
        Ok(line)
    }
}

/// Reads the four ADC channels and the power monitor, in that order.
pub struct SamplePipeline<A, P> {
    adc: A,
    monitor: P,
    channel_scale: f32,
}

impl<A, P> SamplePipeline<A, P>
where
    A: AnalogFrontEnd,
    P: PowerMonitor,
{
    pub fn new(adc: A, monitor: P, channel_scale: f32) -> Self {
        Self {
            adc,
            monitor,
            channel_scale,
        }
    }

    /// Performs one full read cycle. Sentinel values from failed reads are
    /// passed through untouched.
    pub fn sample(&mut self, elapsed_ms: u64) -> SampleRow {
        let mut channels = [0.0; 4];
        for (volts, channel) in channels.iter_mut().zip(AnalogChannel::ALL) {
            let raw = self.adc.read_single_ended(channel);
            *volts = self.adc.compute_volts(raw) * self.channel_scale;
        }

        SampleRow {
            elapsed_ms,
            channels,
            bus_voltage: self.monitor.read_bus_voltage(),
            current: self.monitor.read_current(),
            power: self.monitor.read_power(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::ADC_READ_FAILED;
    use crate::testing::{FakeAnalog, FakePowerMonitor};

    fn reference_pipeline() -> SamplePipeline<FakeAnalog, FakePowerMonitor> {
        SamplePipeline::new(
            FakeAnalog::uniform(1000),
            FakePowerMonitor::new(5.0, 0.1, 0.5),
            10.0,
        )
    }

    #[test]
    fn reference_inputs_render_expected_row() {
        let row = reference_pipeline().sample(1234);
        assert_eq!(
            row.to_line().unwrap().as_str(),
            "1234,1.875,1.875,1.875,1.875,5.00,0.10,0.50"
        );
    }

    #[test]
    fn channels_are_read_in_order() {
        let mut pipeline = reference_pipeline();
        pipeline.sample(0);
        assert_eq!(pipeline.adc.reads, AnalogChannel::ALL.to_vec());
    }

    #[test]
    fn each_channel_keeps_its_own_value() {
        let adc = FakeAnalog::with_codes([0, 1000, -1000, 32767]);
        let mut pipeline = SamplePipeline::new(adc, FakePowerMonitor::new(0.0, 0.0, 0.0), 10.0);
        let row = pipeline.sample(0);

        assert_eq!(row.channels[0], 0.0);
        assert!((row.channels[1] - 1.875).abs() < 1e-5);
        assert!((row.channels[2] + 1.875).abs() < 1e-5);
        assert!((row.channels[3] - 61.4381).abs() < 1e-3);
    }

    #[test]
    fn sentinels_pass_through() {
        let adc = FakeAnalog::uniform(ADC_READ_FAILED);
        let monitor = FakePowerMonitor::new(f32::NAN, f32::NAN, f32::NAN);
        let row = SamplePipeline::new(adc, monitor, 10.0).sample(7);

        assert_eq!(
            row.to_line().unwrap().as_str(),
            "7,-61.440,-61.440,-61.440,-61.440,NaN,NaN,NaN"
        );
    }

    #[test]
    fn widest_possible_row_fits_the_line_buffer() {
        let row = SampleRow {
            elapsed_ms: u64::MAX,
            channels: [-f32::MAX; 4],
            bus_voltage: f32::MIN,
            current: f32::MIN,
            power: f32::MIN,
        };
        let line = row.to_line().unwrap();

        assert_eq!(line.len(), LINE_CAPACITY);
        assert!(line.starts_with("18446744073709551615,-340282346638528859811704183484516925440.000,"));
        assert!(line.ends_with(",-340282346638528859811704183484516925440.00"));
    }
}
