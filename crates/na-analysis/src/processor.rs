//! Event loop: JSON Lines input and the module driver.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use na_core::{Error, Event, Result};
use na_hist::HistDir;
use tracing::{debug, info};

use crate::module::AnalysisModule;

const PROGRESS_EVERY: u64 = 10_000;

/// Iterator over the events of a JSON Lines stream (one event per line).
///
/// Blank lines are skipped. Malformed lines yield an error naming the
/// source and line number.
pub struct JsonlEvents<R> {
    reader: R,
    source: String,
    line_no: usize,
    buf: String,
}

impl JsonlEvents<BufReader<File>> {
    /// Open a JSON Lines file.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| {
            Error::Io(std::io::Error::new(e.kind(), format!("{}: {e}", path.display())))
        })?;
        Ok(Self::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: BufRead> JsonlEvents<R> {
    /// Wrap a reader; `source` labels error messages.
    pub fn new(reader: R, source: impl Into<String>) -> Self {
        Self { reader, source: source.into(), line_no: 0, buf: String::new() }
    }
}

impl<R: BufRead> Iterator for JsonlEvents<R> {
    type Item = Result<Event>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            self.line_no += 1;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(e.into())),
            }
            let line = self.buf.trim();
            if line.is_empty() {
                continue;
            }
            return Some(Event::from_json(line).map_err(|e| {
                Error::Validation(format!("{}:{}: malformed event: {e}", self.source, self.line_no))
            }));
        }
    }
}

/// Event counters of one job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProcessStats {
    /// Events handed to the module.
    pub events_read: u64,
    /// Events the module accepted.
    pub events_accepted: u64,
}

/// Drives one module through `begin_job`, `analyze` and `end_job`.
pub struct Processor<M> {
    module: M,
    max_events: Option<u64>,
    stats: ProcessStats,
    started: bool,
}

impl<M: AnalysisModule> Processor<M> {
    /// Wrap a module; nothing is booked until [`Processor::begin`].
    pub fn new(module: M) -> Self {
        Self { module, max_events: None, stats: ProcessStats::default(), started: false }
    }

    /// Stop after `max_events` events in total (`None` for no limit).
    pub fn with_max_events(mut self, max_events: Option<u64>) -> Self {
        self.max_events = max_events;
        self
    }

    /// The driven module.
    pub fn module(&self) -> &M {
        &self.module
    }

    /// Counters so far.
    pub fn stats(&self) -> ProcessStats {
        self.stats
    }

    /// Whether the event limit has been reached.
    pub fn is_full(&self) -> bool {
        self.max_events.is_some_and(|max| self.stats.events_read >= max)
    }

    /// Book the module.
    pub fn begin(&mut self) -> Result<()> {
        self.module.begin_job()?;
        self.started = true;
        info!(module = self.module.name(), max_events = ?self.max_events, "job started");
        Ok(())
    }

    /// Feed events until the source or the event limit is exhausted.
    /// Returns the number of events read from this source.
    pub fn process<I>(&mut self, events: I) -> Result<u64>
    where
        I: IntoIterator<Item = Result<Event>>,
    {
        if !self.started {
            return Err(Error::Validation("process called before begin".into()));
        }
        let mut read = 0;
        for event in events {
            if self.is_full() {
                break;
            }
            let event = event?;
            read += 1;
            self.stats.events_read += 1;
            if self.module.analyze(&event)? {
                self.stats.events_accepted += 1;
            }
            if self.stats.events_read % PROGRESS_EVERY == 0 {
                debug!(
                    read = self.stats.events_read,
                    accepted = self.stats.events_accepted,
                    "progress"
                );
            }
        }
        Ok(read)
    }

    /// Finalize the module into a directory named `dir_name`.
    pub fn finish(mut self, dir_name: &str) -> Result<(HistDir, ProcessStats)> {
        let mut dir = HistDir::new(dir_name);
        self.module.end_job(&mut dir)?;
        info!(
            module = self.module.name(),
            read = self.stats.events_read,
            accepted = self.stats.events_accepted,
            objects = dir.len(),
            "job finished"
        );
        Ok((dir, self.stats))
    }
}
