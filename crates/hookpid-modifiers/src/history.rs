//! [`History`] – bounded look-back record of every event a chain sees.
//!
//! Each event reaching the modifier is copied into a [`Record`] with a
//! sequence number and a UTC timestamp.  The buffer keeps the newest
//! `capacity` records; per-kind counters keep counting past evictions.
//!
//! # Example
//!
//! ```rust
//! use hookpid_core::{Controller, Shared};
//! use hookpid_modifiers::History;
//! use hookpid_types::{EventKind, Gains};
//!
//! let history = Shared::new(History::new(16).unwrap());
//! let mut pid = Controller::new(Gains::new(1.0, 0.0, 0.0), vec![Box::new(history.clone())]).unwrap();
//!
//! let mark = history.borrow().marker();
//! pid.compute(1.0, Some(0.5)).unwrap();
//!
//! let log = history.borrow();
//! let kinds: Vec<_> = log.since(mark).map(|r| r.event.kind()).collect();
//! assert_eq!(kinds, [EventKind::BaseTerms, EventKind::ModifyTerms, EventKind::CalculateU]);
//! assert_eq!(log.counts(EventKind::Attached), 1);
//! ```

use std::collections::{BTreeMap, VecDeque};

use chrono::{DateTime, Utc};
use hookpid_core::{Controller, Event, Flow, HookResult, Modifier};
use hookpid_types::{EventKind, PidError, PidResult};

/// One recorded event.
#[derive(Debug, Clone)]
pub struct Record {
    /// Position in the overall stream, starting at zero.
    pub seq: u64,
    /// When the event was recorded.
    pub at: DateTime<Utc>,
    pub event: Event,
}

/// A point in the record stream, for [`History::since`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Marker(u64);

// ─────────────────────────────────────────────────────────────────────────────
// History
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct History {
    capacity: usize,
    records: VecDeque<Record>,
    next_seq: u64,
    counts: BTreeMap<EventKind, u64>,
}

impl History {
    /// Keep the newest `capacity` events.
    ///
    /// # Errors
    ///
    /// [`PidError::InvalidArg`] for a zero capacity.
    pub fn new(capacity: usize) -> PidResult<Self> {
        check_capacity(capacity)?;
        Ok(Self {
            capacity,
            records: VecDeque::with_capacity(capacity),
            next_seq: 0,
            counts: BTreeMap::new(),
        })
    }

    fn record(&mut self, event: &Event) {
        self.records.push_back(Record {
            seq: self.next_seq,
            at: Utc::now(),
            event: event.clone(),
        });
        self.next_seq += 1;
        *self.counts.entry(event.kind()).or_default() += 1;
        while self.records.len() > self.capacity {
            self.records.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    /// Events of `kind` seen since creation or the last [`History::clear`],
    /// evicted ones included.
    pub fn counts(&self, kind: EventKind) -> u64 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Marks the current end of the stream.
    pub fn marker(&self) -> Marker {
        Marker(self.next_seq)
    }

    /// Retained records made after `marker` was taken.
    pub fn since(&self, marker: Marker) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(move |r| r.seq >= marker.0)
    }

    /// Most recent retained record of `kind`.
    pub fn latest(&self, kind: EventKind) -> Option<&Record> {
        self.records.iter().rev().find(|r| r.event.kind() == kind)
    }

    /// Change the capacity.  With `preserve` the newest records that fit are
    /// kept, otherwise the buffer is emptied.
    pub fn resize(&mut self, capacity: usize, preserve: bool) -> PidResult<()> {
        check_capacity(capacity)?;
        self.capacity = capacity;
        if preserve {
            while self.records.len() > capacity {
                self.records.pop_front();
            }
        } else {
            self.records.clear();
        }
        Ok(())
    }

    /// Drop all records and counters.  Sequence numbers keep increasing so
    /// earlier markers stay meaningful.
    pub fn clear(&mut self) {
        self.records.clear();
        self.counts.clear();
    }
}

fn check_capacity(capacity: usize) -> PidResult<()> {
    if capacity == 0 {
        return Err(PidError::InvalidArg(
            "history capacity must be at least 1".to_string(),
        ));
    }
    Ok(())
}

impl Modifier for History {
    fn on_default(&mut self, event: &mut Event, _pid: &mut Controller) -> HookResult {
        self.record(event);
        Ok(Flow::Continue)
    }
}
