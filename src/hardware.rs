//! Hardware abstraction and peripheral initialization.
//!
//! This module defines the pin mappings and peripheral initialization for
//! the sensor recorder on a NUCLEO-L073RZ board.
//!
//! # Pin Assignments
//!
//! ## Operator Interface
//! - **PC13**: RECORD button (B1), active low, external pull-up. A falling
//!   edge toggles recording.
//! - **PA5**: SAMPLE LED (LD2), high while a sample is being taken
//!
//! ## Console (USART2, ST-LINK virtual COM port)
//! - **PA2**: TX
//! - **PA3**: RX (unused)
//!
//! ## Sensor Bus (I2C1, 400 kHz)
//! - **PB8**: SCL
//! - **PB9**: SDA
//! - ADS1115 at 0x48, INA228 at 0x40
//!
//! ## SD Card (SPI2, 400 kHz during card init, 8 MHz after)
//! - **PB13**: SCK
//! - **PB14**: MISO
//! - **PB15**: MOSI
//! - **PB12**: CS, active low
//!
//! ## Debug (SWD)
//! - **PA13**: SWDIO
//! - **PA14**: SWCLK

use embassy_stm32::exti::ExtiInput;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::i2c::{self, I2c};
use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use embassy_stm32::usart::{self, UartTx};

/// Console baud rate.
const CONSOLE_BAUD: u32 = 115_200;

/// Sensor bus clock.
const I2C_FREQUENCY: Hertz = Hertz(400_000);

/// SD cards must be initialized at or below 400 kHz.
const SD_SPI_INIT_FREQUENCY: Hertz = Hertz(400_000);

/// SPI2 clock once the card is initialized (PCLK1 / 2 with HSI16).
pub const SD_SPI_TRANSFER_FREQUENCY: Hertz = Hertz(8_000_000);

pub type SensorBus = I2c<'static, Blocking>;
pub type ConsolePort = UartTx<'static, Blocking>;
pub type SdSpiBus = Spi<'static, Blocking>;

/// Top-level peripheral container for the sensor recorder.
///
/// Owns every peripheral the firmware uses, configured and ready to be
/// handed to the drivers.
pub struct Board {
    /// Shared I2C bus for the ADC and power monitor
    pub sensor_bus: SensorBus,
    /// Transmit half of the console UART
    pub console: ConsolePort,
    /// SPI bus of the SD card socket
    pub sd_spi: SdSpiBus,
    /// SD card chip select, idle high
    pub sd_cs: Output<'static>,
    /// Record toggle button
    pub button: ExtiInput<'static>,
    /// Sampling indicator LED
    pub led: Output<'static>,
}

impl Board {
    /// Initializes all peripherals from the STM32 peripheral singleton.
    ///
    /// # Initial GPIO States
    ///
    /// - PA5 (LED): Low
    /// - PB12 (SD CS): High (card deselected)
    ///
    /// # Errors
    ///
    /// Fails only if the console UART rejects its configuration.
    pub fn new(p: embassy_stm32::Peripherals) -> Result<Self, usart::ConfigError> {
        let mut i2c_config = i2c::Config::default();
        i2c_config.frequency = I2C_FREQUENCY;

        let mut console_config = usart::Config::default();
        console_config.baudrate = CONSOLE_BAUD;

        let mut spi_config = spi::Config::default();
        spi_config.frequency = SD_SPI_INIT_FREQUENCY;

        Ok(Self {
            sensor_bus: I2c::new_blocking(p.I2C1, p.PB8, p.PB9, i2c_config),
            console: UartTx::new_blocking(p.USART2, p.PA2, console_config)?,
            sd_spi: Spi::new_blocking(p.SPI2, p.PB13, p.PB15, p.PB14, spi_config),
            sd_cs: Output::new(p.PB12, Level::High, Speed::VeryHigh),
            button: ExtiInput::new(p.PC13, p.EXTI13, Pull::None),
            led: Output::new(p.PA5, Level::Low, Speed::Low),
        })
    }
}
