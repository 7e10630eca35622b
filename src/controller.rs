//! Recording controller.
//!
//! Owns every piece of mutable recording state: the last observed toggle
//! position, the active session, the file sequence counter, the sinks and the
//! sampling indicator. The main loop calls [`RecordingController::tick`] once
//! per iteration with the current time and toggle position:
//!
//! ```text
//! observed  requested   action
//! Idle      false       nothing
//! Idle      true        start edge: new session, header, open file
//! Active    false       stop edge: close file, "Recording stopped"
//! Active    true        sample if the cadence says a row is due
//! ```
//!
//! The indicator is driven high only while a sample is being taken and is
//! driven low at the end of every tick.

use core::fmt::Write as _;

use embedded_hal::digital::OutputPin;

use crate::config::{Cadence, RecorderConfig};
use crate::sample::{SamplePipeline, SampleRow};
use crate::sensors::{AnalogFrontEnd, PowerMonitor};
use crate::sink::{Console, FileStore, artifact_name};
use crate::toggle::ToggleSignal;

pub const STATUS_SERIAL_STARTED: &str = "Serial Output Started";
pub const STATUS_FILE_ERROR: &str = "Error opening file for recording";
pub const STATUS_STOPPED: &str = "Recording stopped";
pub const STATUS_FILE_STARTED_PREFIX: &str = "Recording started - File: ";
pub const STATUS_MOUNT_FAILED: &str = "Card Mount Failed";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum RecordingState {
    #[default]
    Idle,
    Active,
}

impl RecordingState {
    fn requested(requested: bool) -> Self {
        if requested {
            RecordingState::Active
        } else {
            RecordingState::Idle
        }
    }
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TickOutcome {
    /// Not recording and no start requested.
    Idle,
    /// Recording, but no row was due.
    Waiting,
    Started { sequence: u32 },
    Stopped { rows: u32 },
    Sampled(SampleRow),
}

/// One continuous recording interval, from start edge to stop edge.
struct Session<H> {
    sequence: u32,
    started_at_ms: u64,
    next_due_ms: u64,
    file: Option<H>,
    rows: u32,
    file_write_failed: bool,
}

impl<H> Session<H> {
    fn take_due(&mut self, now_ms: u64, config: &RecorderConfig) -> bool {
        match config.cadence {
            Cadence::Periodic => {
                if now_ms < self.next_due_ms {
                    return false;
                }
                let interval = config.interval_ms();
                let missed = (now_ms - self.next_due_ms) / interval;
                self.next_due_ms += (missed + 1) * interval;
                true
            }
            Cadence::WallClockModulo => now_ms % config.legacy_gate_ms() == 0,
        }
    }
}

pub struct RecordingController<A, P, C, F, L>
where
    F: FileStore,
{
    config: RecorderConfig,
    pipeline: SamplePipeline<A, P>,
    console: C,
    files: Option<F>,
    indicator: L,
    observed: RecordingState,
    session: Option<Session<F::File>>,
    next_sequence: u32,
}

impl<A, P, C, F, L> RecordingController<A, P, C, F, L>
where
    A: AnalogFrontEnd,
    P: PowerMonitor,
    C: Console,
    F: FileStore,
    L: OutputPin,
{
    /// `files` is `None` when no storage is available; file output is then
    /// skipped for every session even if selected in `config.sinks`.
    pub fn new(
        config: RecorderConfig,
        pipeline: SamplePipeline<A, P>,
        console: C,
        files: Option<F>,
        indicator: L,
    ) -> Self {
        Self {
            config,
            pipeline,
            console,
            files,
            indicator,
            observed: RecordingState::Idle,
            session: None,
            next_sequence: 0,
        }
    }

    pub fn state(&self) -> RecordingState {
        self.observed
    }

    /// Sequence number the next session will use.
    pub fn next_sequence(&self) -> u32 {
        self.next_sequence
    }

    /// Runs one tick against the current position of a shared toggle.
    pub fn poll(&mut self, now_ms: u64, toggle: &ToggleSignal) -> TickOutcome {
        self.tick(now_ms, toggle.is_set())
    }

    pub fn tick(&mut self, now_ms: u64, requested: bool) -> TickOutcome {
        let outcome = match (self.observed, RecordingState::requested(requested)) {
            (RecordingState::Idle, RecordingState::Idle) => TickOutcome::Idle,
            (RecordingState::Active, RecordingState::Active) => self.sample_if_due(now_ms),
            (RecordingState::Idle, RecordingState::Active) => self.start(now_ms),
            (RecordingState::Active, RecordingState::Idle) => self.stop(),
        };
        self.set_indicator(false);
        outcome
    }

    fn start(&mut self, now_ms: u64) -> TickOutcome {
        self.observed = RecordingState::Active;
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let header = self.config.header.header();
        if self.config.sinks.console {
            self.console.write_line(STATUS_SERIAL_STARTED);
            self.console.write_line(header);
        }

        let file = if self.config.sinks.file {
            self.open_artifact(sequence, header)
        } else {
            None
        };

        self.session = Some(Session {
            sequence,
            started_at_ms: now_ms,
            next_due_ms: now_ms,
            file,
            rows: 0,
            file_write_failed: false,
        });

        info!(
            "Recording session {=u32} started at {=u64} ms",
            sequence,
            now_ms
        );
        TickOutcome::Started { sequence }
    }

    fn open_artifact(&mut self, sequence: u32, header: &str) -> Option<F::File> {
        let Some(store) = self.files.as_mut() else {
            debug!("No file store mounted, session {=u32} is console only", sequence);
            return None;
        };

        let name = artifact_name(sequence);
        let mut file = match store.open(&name) {
            Ok(file) => file,
            Err(e) => {
                error!(
                    "Failed to open {=str}: {}",
                    name.as_str(),
                    defmt::Debug2Format(&e)
                );
                self.console.write_line(STATUS_FILE_ERROR);
                return None;
            }
        };

        let mut status: heapless::String<64> = heapless::String::new();
        if write!(status, "{}{}", STATUS_FILE_STARTED_PREFIX, name).is_ok() {
            self.console.write_line(&status);
        }

        if let Err(e) = store.write_line(&mut file, header) {
            warn!(
                "Failed to write header to {=str}: {}",
                name.as_str(),
                defmt::Debug2Format(&e)
            );
        }
        Some(file)
    }

    fn stop(&mut self) -> TickOutcome {
        self.observed = RecordingState::Idle;

        let mut rows = 0;
        if let Some(session) = self.session.take() {
            rows = session.rows;
            if let (Some(file), Some(store)) = (session.file, self.files.as_mut()) {
                if let Err(e) = store.close(file) {
                    warn!(
                        "Failed to close file of session {=u32}: {}",
                        session.sequence,
                        defmt::Debug2Format(&e)
                    );
                }
            }
            info!(
                "Recording session {=u32} stopped after {=u32} rows",
                session.sequence,
                rows
            );
        }

        self.console.write_line(STATUS_STOPPED);
        TickOutcome::Stopped { rows }
    }

    fn sample_if_due(&mut self, now_ms: u64) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::Waiting;
        };
        if !session.take_due(now_ms, &self.config) {
            return TickOutcome::Waiting;
        }
        let elapsed_ms = now_ms.saturating_sub(session.started_at_ms);

        self.set_indicator(true);
        let row = self.pipeline.sample(elapsed_ms);
        self.emit_row(&row);
        TickOutcome::Sampled(row)
    }

    fn emit_row(&mut self, row: &SampleRow) {
        let Some(session) = self.session.as_mut() else {
            return;
        };

        let line = match row.to_line() {
            Ok(line) => line,
            Err(_) => {
                error!("Row at {=u64} ms does not fit the line buffer", row.elapsed_ms);
                return;
            }
        };
        trace!("{=str}", line.as_str());
        session.rows += 1;

        if self.config.sinks.console {
            self.console.write_line(&line);
        }

        if let (Some(file), Some(store)) = (session.file.as_mut(), self.files.as_mut()) {
            if let Err(e) = store.write_line(file, &line) {
                // Keep trying every row, but only report the first failure.
                if !session.file_write_failed {
                    session.file_write_failed = true;
                    warn!(
                        "Write to session {=u32} file failed: {}",
                        session.sequence,
                        defmt::Debug2Format(&e)
                    );
                }
            }
        }
    }

    fn set_indicator(&mut self, on: bool) {
        let result = if on {
            self.indicator.set_high()
        } else {
            self.indicator.set_low()
        };
        if let Err(e) = result {
            warn!("Indicator update failed: {}", defmt::Debug2Format(&e));
        }
    }
}
