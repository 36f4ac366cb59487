//! Nested episode counters with wrap-and-carry semantics.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::CounterLimits;

/// Number of nested counter scales.
pub const NUM_SCALES: usize = 7;

/// Time scales, outermost first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scale {
    Run,
    Epoch,
    Trial,
    Tick,
    Event,
    Scene,
    Episode,
}

impl Scale {
    pub const ALL: [Self; NUM_SCALES] = [
        Self::Run,
        Self::Epoch,
        Self::Trial,
        Self::Tick,
        Self::Event,
        Self::Scene,
        Self::Episode,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Run => "Run",
            Self::Epoch => "Epoch",
            Self::Trial => "Trial",
            Self::Tick => "Tick",
            Self::Event => "Event",
            Self::Scene => "Scene",
            Self::Episode => "Episode",
        }
    }

    /// The next-outer scale, if any.
    #[must_use]
    pub const fn outer(self) -> Option<Self> {
        match self {
            Self::Run => None,
            Self::Epoch => Some(Self::Run),
            Self::Trial => Some(Self::Epoch),
            Self::Tick => Some(Self::Trial),
            Self::Event => Some(Self::Tick),
            Self::Scene => Some(Self::Event),
            Self::Episode => Some(Self::Scene),
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Scale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot returned to external readers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterReading {
    pub cur: u64,
    pub prv: u64,
    /// `cur != prv`: the counter crossed a boundary since the last snapshot.
    pub changed: bool,
}

/// Current/previous value with an optional wrap limit.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counter {
    pub cur: u64,
    pub prv: u64,
    pub max: Option<u64>,
}

impl Counter {
    #[must_use]
    pub const fn new(max: Option<u64>) -> Self {
        Self { cur: 0, prv: 0, max }
    }

    /// Advance by one. Returns `true` when the counter reached `max` and wrapped to 0.
    pub fn increment(&mut self) -> bool {
        self.prv = self.cur;
        self.cur += 1;
        match self.max {
            Some(max) if self.cur >= max => {
                self.cur = 0;
                true
            }
            _ => false,
        }
    }

    /// Record the current value as previous without advancing.
    pub fn same(&mut self) {
        self.prv = self.cur;
    }

    /// Set both values to `value`.
    pub fn set(&mut self, value: u64) {
        self.cur = value;
        self.prv = value;
    }

    #[must_use]
    pub const fn reading(&self) -> CounterReading {
        CounterReading {
            cur: self.cur,
            prv: self.prv,
            changed: self.cur != self.prv,
        }
    }
}

/// The seven nested counters of one environment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EpisodeCounters {
    counters: [Counter; NUM_SCALES],
}

impl EpisodeCounters {
    #[must_use]
    pub fn new(limits: &CounterLimits) -> Self {
        Self {
            counters: Scale::ALL.map(|scale| Counter::new(limits.max(scale))),
        }
    }

    #[must_use]
    pub const fn get(&self, scale: Scale) -> &Counter {
        &self.counters[scale.index()]
    }

    pub fn get_mut(&mut self, scale: Scale) -> &mut Counter {
        &mut self.counters[scale.index()]
    }

    /// Advance `scale` only; the caller carries into the outer scale on wrap.
    pub fn increment(&mut self, scale: Scale) -> bool {
        self.get_mut(scale).increment()
    }

    /// Snapshot `scale` without advancing it.
    pub fn same(&mut self, scale: Scale) {
        self.get_mut(scale).same();
    }

    #[must_use]
    pub const fn reading(&self, scale: Scale) -> CounterReading {
        self.get(scale).reading()
    }

    /// Zero every scale nested inside `scale`, keeping limits.
    pub fn reset_within(&mut self, scale: Scale) {
        for inner in Scale::ALL.iter().filter(|inner| **inner > scale) {
            self.get_mut(*inner).set(0);
        }
    }
}
