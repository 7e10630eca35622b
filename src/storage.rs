//! SD card file store.
//!
//! FAT16/32 volume 0 of an SPI-attached SD card, accessed through
//! embedded-sdmmc. The library has no long file name support, so artifact
//! names are mapped to 8.3 names (`/data_0003.csv` -> `DATA0003.CSV`).
//!
//! Files are created (or truncated) on open and their directory entry is
//! only brought up to date on close.

use embassy_stm32::gpio::Output;
use embassy_stm32::spi;
use embassy_time::Delay;
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::{
    Mode, RawDirectory, RawFile, SdCard, SdCardError, TimeSource, Timestamp, VolumeIdx,
    VolumeManager,
};
use sensor_recorder::sink::{ArtifactName, FileStore, fat_short_name, truncated};

use crate::hardware::{SD_SPI_TRANSFER_FREQUENCY, SdSpiBus};

type SdDevice = ExclusiveDevice<SdSpiBus, Output<'static>, Delay>;
type SdBlockDevice = SdCard<SdDevice, Delay>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("SD card chip select could not be driven")]
    ChipSelect,
    #[error("{0} has no FAT short name")]
    Name(ArtifactName),
    #[error("SD card: {0:?}")]
    Card(embedded_sdmmc::Error<SdCardError>),
}

impl From<embedded_sdmmc::Error<SdCardError>> for Error {
    fn from(e: embedded_sdmmc::Error<SdCardError>) -> Self {
        Error::Card(e)
    }
}

/// The board has no RTC; every file gets the same timestamp.
pub struct FixedClock;

impl TimeSource for FixedClock {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 56,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub struct SdCardStore {
    volume_mgr: VolumeManager<SdBlockDevice, FixedClock>,
    root: RawDirectory,
}

impl SdCardStore {
    /// Brings up the card and opens the root directory of its first volume.
    ///
    /// The card is initialized on the slow bus clock, then the bus is
    /// switched to [`SD_SPI_TRANSFER_FREQUENCY`] for file traffic.
    pub fn mount(bus: SdSpiBus, cs: Output<'static>) -> Result<Self, Error> {
        let device = ExclusiveDevice::new(bus, cs, Delay).map_err(|_| Error::ChipSelect)?;
        let card = SdCard::new(device, Delay);

        let size = card
            .num_bytes()
            .map_err(|e| Error::Card(embedded_sdmmc::Error::DeviceError(e)))?;
        defmt::info!("SD card size: {=u64} bytes", size);

        let mut fast = spi::Config::default();
        fast.frequency = SD_SPI_TRANSFER_FREQUENCY;
        if card.spi(|device| device.bus_mut().set_config(&fast)).is_err() {
            defmt::warn!("SD card bus speed unchanged, staying at init clock");
        }

        let volume_mgr = VolumeManager::new(card, FixedClock);

        let volume = volume_mgr.open_raw_volume(VolumeIdx(0))?;
        let root = volume_mgr.open_root_dir(volume)?;

        defmt::info!("SD card mounted");
        Ok(Self { volume_mgr, root })
    }
}

impl FileStore for SdCardStore {
    type File = RawFile;
    type Error = Error;

    fn open(&mut self, name: &str) -> Result<RawFile, Error> {
        let short = fat_short_name(name).ok_or_else(|| Error::Name(truncated(name)))?;

        let file = self.volume_mgr.open_file_in_dir(
            self.root,
            short.as_str(),
            Mode::ReadWriteCreateOrTruncate,
        )?;
        defmt::debug!("Opened {=str} as {=str}", name, short.as_str());
        Ok(file)
    }

    fn write(&mut self, file: &mut RawFile, bytes: &[u8]) -> Result<(), Error> {
        self.volume_mgr.write(*file, bytes)?;
        Ok(())
    }

    fn close(&mut self, file: RawFile) -> Result<(), Error> {
        self.volume_mgr.close_file(file)?;
        Ok(())
    }
}
