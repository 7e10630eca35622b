//! Output destinations for status lines, headers and data rows.
//!
//! Every line written to a sink is terminated with CRLF.

use core::fmt::Write as _;

use embedded_io::Write;
use heapless::String;

pub const LINE_ENDING: &str = "\r\n";

/// `/data_` + up to 10 digits + `.csv`
pub type ArtifactName = String<24>;

/// Name of the file artifact for a session sequence number.
pub fn artifact_name(sequence: u32) -> ArtifactName {
    let mut name = ArtifactName::new();
    // At most 20 bytes, always fits.
    let _ = write!(name, "/data_{:04}.csv", sequence);
    name
}

/// Copies as many leading characters of `text` as fit into `N` bytes.
pub fn truncated<const N: usize>(text: &str) -> String<N> {
    let mut out = String::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// `NNNNNNNN.EEE`
pub type ShortName = String<12>;

/// Maps an artifact name onto a FAT 8.3 name for storage without long file
/// name support: `/data_0007.csv` becomes `DATA0007.CSV`.
///
/// Returns `None` if the result does not fit 8.3.
pub fn fat_short_name(name: &str) -> Option<ShortName> {
    let name = name.trim_start_matches('/');
    let (base, extension) = name.rsplit_once('.').unwrap_or((name, ""));

    let mut short = ShortName::new();
    let mut base_len = 0;
    for c in base.chars().filter(|c| *c != '_') {
        base_len += 1;
        if base_len > 8 || !c.is_ascii_alphanumeric() {
            return None;
        }
        short.push(c.to_ascii_uppercase()).ok()?;
    }
    if base_len == 0 || extension.len() > 3 {
        return None;
    }
    if !extension.is_empty() {
        short.push('.').ok()?;
        for c in extension.chars() {
            if !c.is_ascii_alphanumeric() {
                return None;
            }
            short.push(c.to_ascii_uppercase()).ok()?;
        }
    }
    Some(short)
}

/// Line-oriented console stream. Status lines always go here.
pub trait Console {
    fn write_line(&mut self, line: &str);
}

/// Console over any blocking byte stream (UART, USB CDC, ...).
pub struct SerialConsole<W> {
    port: W,
}

impl<W> SerialConsole<W>
where
    W: Write,
{
    pub fn new(port: W) -> Self {
        Self { port }
    }
}

impl<W> Console for SerialConsole<W>
where
    W: Write,
{
    fn write_line(&mut self, line: &str) {
        let result = self
            .port
            .write_all(line.as_bytes())
            .and_then(|()| self.port.write_all(LINE_ENDING.as_bytes()));
        if let Err(e) = result {
            warn!("Console write failed: {}", defmt::Debug2Format(&e));
        }
    }
}

/// Storage that can hold one recording file per session.
///
/// `close` consumes the handle, so a file closed at session stop cannot be
/// written by a later session.
pub trait FileStore {
    type File;
    type Error: core::fmt::Debug;

    fn open(&mut self, name: &str) -> Result<Self::File, Self::Error>;

    fn write(&mut self, file: &mut Self::File, bytes: &[u8]) -> Result<(), Self::Error>;

    fn close(&mut self, file: Self::File) -> Result<(), Self::Error>;

    fn write_line(&mut self, file: &mut Self::File, line: &str) -> Result<(), Self::Error> {
        self.write(file, line.as_bytes())?;
        self.write(file, LINE_ENDING.as_bytes())
    }
}
