//! Firmware for a button-controlled four channel voltage and power recorder.
//!
//! # Overview
//!
//! Pressing the RECORD button starts a session: a status line and a CSV
//! header are written, then one row per sample period carrying the elapsed
//! time, four scaled ADS1115 channel voltages and the INA228 bus voltage,
//! current and power. Pressing it again stops the session.
//!
//! Rows go to the console UART, to `/data_NNNN.csv` on the SD card, or to
//! both, depending on [`RECORDER_CONFIG`].
//!
//! # Hardware
//!
//! - **MCU**: STM32L073RZ (NUCLEO-L073RZ)
//! - **ADC**: ADS1115, 4 single-ended channels behind a 10:1 divider
//! - **Power monitor**: INA228 with a 20 mΩ shunt
//! - **Storage**: SD card on SPI2
//!
//! # Module Organization
//!
//! - [`hardware`] - Pin mappings and peripheral initialization
//! - [`button`] - Record button interrupt task
//! - [`storage`] - SD card file store
//!
//! Sampling, session handling and output live in the `sensor_recorder`
//! library.

#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod button;
#[cfg(target_os = "none")]
mod hardware;
#[cfg(target_os = "none")]
mod storage;

#[cfg(target_os = "none")]
use core::cell::RefCell;

#[cfg(target_os = "none")]
use embassy_executor::Spawner;
#[cfg(target_os = "none")]
use embassy_stm32::{Config, rcc};
#[cfg(target_os = "none")]
use embassy_time::{Duration, Instant, Ticker, Timer};
#[cfg(target_os = "none")]
use embedded_hal_bus::i2c::RefCellDevice;
#[cfg(target_os = "none")]
use sensor_recorder::{
    ads1115::{ADS1115_ADDRESS, Ads1115},
    config::{RecorderConfig, SinkSelection},
    controller::{RecordingController, STATUS_MOUNT_FAILED},
    ina228::{INA228_ADDRESS, Ina228},
    sample::SamplePipeline,
    sink::{Console, SerialConsole},
};
#[cfg(target_os = "none")]
use static_cell::StaticCell;
#[cfg(target_os = "none")]
use {defmt_rtt as _, panic_probe as _};

#[cfg(target_os = "none")]
use crate::button::{RECORD_TOGGLE, button_task};
#[cfg(target_os = "none")]
use crate::hardware::{Board, SensorBus};
#[cfg(target_os = "none")]
use crate::storage::SdCardStore;

/// Recorder settings compiled into the firmware.
#[cfg(target_os = "none")]
const RECORDER_CONFIG: RecorderConfig = RecorderConfig {
    sinks: SinkSelection::BOTH,
    ..RecorderConfig::DEFAULT
};

/// Loop period. Sample deadlines are checked this often.
#[cfg(target_os = "none")]
const TICK: Duration = Duration::from_millis(1);

#[cfg(target_os = "none")]
static SENSOR_BUS: StaticCell<RefCell<SensorBus>> = StaticCell::new();

/// Clock configuration for STM32L073.
///
/// # Clock Settings
///
/// - **HSI16**: 16 MHz system clock (no PLL), enough for 400 kHz I2C
/// - **MSI**: off
/// - **Voltage scale**: Range 1
///
/// Everything else keeps the embassy defaults.
#[cfg(target_os = "none")]
fn create_clock_config() -> rcc::Config {
    let mut config = rcc::Config::default();
    config.hsi = true;
    config.msi = None;
    config.sys = rcc::Sysclk::HSI;
    config.ahb_pre = rcc::AHBPrescaler::DIV1;
    config.apb1_pre = rcc::APBPrescaler::DIV1;
    config.apb2_pre = rcc::APBPrescaler::DIV1;
    config.voltage_scale = rcc::VoltageScale::RANGE1;
    config
}

/// Main entry point for the recorder firmware.
///
/// # Initialization Sequence
///
/// 1. Configure clocks and initialize STM32 peripherals
/// 2. Validate [`RECORDER_CONFIG`], falling back to defaults
/// 3. Bring up the console, the ADS1115 and the INA228
/// 4. Mount the SD card if file output is selected
/// 5. Spawn the button task
/// 6. Enter the sampling loop
///
/// A peripheral that fails to initialize is logged and left in place;
/// its columns then carry the read failure sentinel.
#[cfg(target_os = "none")]
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut config = Config::default();
    config.rcc = create_clock_config();

    let p = embassy_stm32::init(config);

    defmt::info!("Sensor recorder firmware starting...");

    #[cfg(feature = "debug-mode")]
    {
        defmt::info!("Waiting 3 seconds for debugger connection...");
        Timer::after_secs(3).await;
    }

    let board = match Board::new(p) {
        Ok(board) => board,
        Err(e) => {
            defmt::error!("Board setup failed: {}", defmt::Debug2Format(&e));
            loop {
                Timer::after_secs(1).await;
            }
        }
    };

    let recorder_config = match RECORDER_CONFIG.validate() {
        Ok(()) => RECORDER_CONFIG,
        Err(e) => {
            defmt::warn!(
                "Invalid recorder config ({}), using defaults",
                defmt::Debug2Format(&e)
            );
            RecorderConfig::DEFAULT
        }
    };
    let profile = recorder_config.conversion_profile();
    defmt::info!(
        "Sampling at {} Hz, profile {}",
        recorder_config.sample_rate_hz,
        profile
    );

    let mut console = SerialConsole::new(board.console);

    let bus = SENSOR_BUS.init(RefCell::new(board.sensor_bus));

    let mut adc = Ads1115::new(RefCellDevice::new(bus), ADS1115_ADDRESS);
    adc.set_data_rate(profile.adc_data_rate);
    if let Err(e) = adc.init() {
        defmt::warn!("ADS1115 init failed: {}", defmt::Debug2Format(&e));
    }

    let mut monitor = Ina228::new(RefCellDevice::new(bus), INA228_ADDRESS);
    if let Err(e) = monitor.init(&recorder_config.power_monitor, &profile) {
        defmt::warn!("INA228 init failed: {}", defmt::Debug2Format(&e));
    }

    let files = if recorder_config.sinks.file {
        match SdCardStore::mount(board.sd_spi, board.sd_cs) {
            Ok(store) => Some(store),
            Err(e) => {
                defmt::warn!("SD card mount failed: {}", defmt::Debug2Format(&e));
                console.write_line(STATUS_MOUNT_FAILED);
                None
            }
        }
    } else {
        None
    };

    let pipeline = SamplePipeline::new(adc, monitor, recorder_config.channel_scale);
    let mut controller =
        RecordingController::new(recorder_config, pipeline, console, files, board.led);

    spawner.spawn(button_task(board.button)).unwrap();

    defmt::info!("Ready, press RECORD to start");

    let mut ticker = Ticker::every(TICK);
    loop {
        controller.poll(Instant::now().as_millis(), &RECORD_TOGGLE);
        ticker.next().await;
    }
}

#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("sensor-recorder is firmware; build it for thumbv6m-none-eabi");
}
