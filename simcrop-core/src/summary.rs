//! Event and telescope bookkeeping over an event stream.

use std::collections::{BTreeMap, BTreeSet};

use crate::event::SimEvent;

/// Streaming summary of which telescopes triggered on which events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventSummary {
    total_events: usize,
    events_per_telescope: BTreeMap<u32, Vec<u64>>,
    telescopes_per_event: BTreeMap<u64, Vec<u32>>,
}

impl EventSummary {
    /// Creates an empty summary.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one event.
    pub fn record(&mut self, event: &SimEvent) {
        self.total_events += 1;
        for &tel_id in &event.triggered_telescopes {
            self.events_per_telescope
                .entry(tel_id)
                .or_default()
                .push(event.event_id);
        }
        self.telescopes_per_event
            .entry(event.event_id)
            .or_default()
            .extend_from_slice(&event.triggered_telescopes);
    }

    /// Number of events recorded.
    #[must_use]
    pub fn total_events(&self) -> usize {
        self.total_events
    }

    /// Number of triggered events per telescope.
    #[must_use]
    pub fn event_counts(&self) -> BTreeMap<u32, usize> {
        self.events_per_telescope
            .iter()
            .map(|(&tel_id, events)| (tel_id, events.len()))
            .collect()
    }

    /// Event ids per telescope, in stream order.
    #[must_use]
    pub fn events_per_telescope(&self) -> &BTreeMap<u32, Vec<u64>> {
        &self.events_per_telescope
    }

    /// Triggered telescopes per event.
    #[must_use]
    pub fn telescopes_per_event(&self) -> &BTreeMap<u64, Vec<u32>> {
        &self.telescopes_per_event
    }
}

impl<'a> Extend<&'a SimEvent> for EventSummary {
    fn extend<I: IntoIterator<Item = &'a SimEvent>>(&mut self, iter: I) {
        for event in iter {
            self.record(event);
        }
    }
}

/// Set of (event id, telescope id) pairs from one file.
pub type EventSet = BTreeSet<(u64, u32)>;

/// Collects the triggered (event, telescope) pairs of an event stream.
pub fn event_set<'a, I: IntoIterator<Item = &'a SimEvent>>(events: I) -> EventSet {
    events
        .into_iter()
        .flat_map(|event| {
            event
                .triggered_telescopes
                .iter()
                .map(move |&tel_id| (event.event_id, tel_id))
        })
        .collect()
}

/// Operation combining the event sets of several files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOperation {
    /// Pairs present in any file.
    Union,
    /// Pairs present in every file.
    Intersection,
    /// Pairs present in some but not all files.
    Difference,
}

impl SetOperation {
    /// Applies the operation. An empty list yields an empty set.
    ///
    /// Files without any triggered pair take no part in the operation, so an
    /// empty file does not empty an intersection.
    #[must_use]
    pub fn apply(self, sets: &[EventSet]) -> EventSet {
        let sets: Vec<&EventSet> = sets.iter().filter(|set| !set.is_empty()).collect();
        match self {
            Self::Union => union(&sets),
            Self::Intersection => intersection(&sets),
            Self::Difference => union(&sets)
                .difference(&intersection(&sets))
                .copied()
                .collect(),
        }
    }
}

fn union(sets: &[&EventSet]) -> EventSet {
    sets.iter().copied().flatten().copied().collect()
}

fn intersection(sets: &[&EventSet]) -> EventSet {
    let Some((first, rest)) = sets.split_first() else {
        return EventSet::new();
    };
    first
        .iter()
        .filter(|pair| rest.iter().all(|set| set.contains(*pair)))
        .copied()
        .collect()
}
