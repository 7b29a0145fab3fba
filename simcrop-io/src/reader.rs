//! JSON Lines event dump reader.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

use simcrop_core::summary::{event_set, EventSet};
use simcrop_core::SimEvent;

use crate::{Error, Result};

/// Streaming reader of simulated events.
///
/// Each non-blank line holds one JSON `SimEvent`. Events are decoded lazily
/// as the iterator advances.
pub struct EventFileReader<R = BufReader<File>> {
    lines: Lines<R>,
    line_number: usize,
    allowed_telescopes: Option<BTreeSet<u32>>,
    max_events: Option<usize>,
    emitted: usize,
}

impl EventFileReader {
    /// Opens an event dump.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        log::debug!("reading events from {}", path.as_ref().display());
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> EventFileReader<R> {
    /// Reads events from any buffered reader.
    pub fn from_reader(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_number: 0,
            allowed_telescopes: None,
            max_events: None,
            emitted: 0,
        }
    }

    /// Keeps only these telescopes in every event.
    #[must_use]
    pub fn with_allowed_telescopes<I: IntoIterator<Item = u32>>(mut self, telescopes: I) -> Self {
        self.allowed_telescopes = Some(telescopes.into_iter().collect());
        self
    }

    /// Stops after `max_events` events.
    #[must_use]
    pub fn with_max_events(mut self, max_events: usize) -> Self {
        self.max_events = Some(max_events);
        self
    }

    /// Scans forward to the event with `event_id`.
    ///
    /// # Errors
    /// `EventNotFound` if the stream ends first, or any read/parse error.
    pub fn find_event(&mut self, event_id: u64) -> Result<SimEvent> {
        for event in self.by_ref() {
            let event = event?;
            if event.event_id == event_id {
                return Ok(event);
            }
        }
        Err(Error::EventNotFound(event_id))
    }

    fn parse_line(&self, line: &str) -> Result<SimEvent> {
        let mut event: SimEvent = serde_json::from_str(line).map_err(|err| {
            Error::InvalidFormat(format!("line {}: {}", self.line_number, err))
        })?;
        if let Some(allowed) = &self.allowed_telescopes {
            event.retain_telescopes(|tel_id| allowed.contains(&tel_id));
        }
        Ok(event)
    }
}

impl<R: BufRead> Iterator for EventFileReader<R> {
    type Item = Result<SimEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.max_events.is_some_and(|max| self.emitted >= max) {
            return None;
        }
        loop {
            let line = self.lines.next()?;
            self.line_number += 1;
            let line = match line {
                Ok(line) => line,
                Err(err) => return Some(Err(err.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            self.emitted += 1;
            return Some(self.parse_line(&line));
        }
    }
}

/// Reads the triggered (event, telescope) pairs of a dump.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_event_set<P: AsRef<Path>>(path: P) -> Result<EventSet> {
    let events = EventFileReader::open(path)?.collect::<Result<Vec<_>>>()?;
    Ok(event_set(&events))
}
