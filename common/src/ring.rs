use std::fmt;

use serde::{Deserialize, Serialize};

use crate::input::ControlWord;

/// Control state that became active at `timestamp` and stays active until
/// the next sample supersedes it.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct InputSample {
    pub timestamp: f64,
    pub input: ControlWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryError {
    Exhausted { steps: usize, capacity: usize },
}

impl fmt::Display for HistoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryError::Exhausted { steps, capacity } => write!(
                f,
                "input history exhausted: needed {} steps back but only {} samples are retained",
                steps, capacity
            ),
        }
    }
}

impl std::error::Error for HistoryError {}

/// Fixed-capacity ring of input samples. Unoccupied slots are `None`.
#[derive(Clone, Debug)]
pub struct History {
    slots: Box<[Option<InputSample>]>,
    head: usize, // The "write" cursor: most recent sample written.
}

impl History {
    pub fn new(capacity: usize, initial: InputSample) -> Self {
        let mut slots = vec![None; capacity.max(1)].into_boxed_slice();
        slots[0] = Some(initial);

        Self { slots, head: 0 }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn head(&self) -> usize {
        self.head
    }

    /// The currently active input. The head slot is written on construction
    /// and never cleared, so it is always occupied.
    pub fn current(&self) -> InputSample {
        self.slots[self.head].unwrap_or(InputSample {
            timestamp: 0.0,
            input: ControlWord::NONE,
        })
    }

    pub fn get(&self, index: usize) -> Option<&InputSample> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Advances the write cursor, overwriting the oldest retained sample once
    /// the ring is full.
    pub fn push(&mut self, sample: InputSample) {
        self.head = (self.head + 1) % self.capacity();
        self.slots[self.head] = Some(sample);
    }

    pub fn walk_back(&self, from: usize, steps: usize) -> Result<usize, HistoryError> {
        let capacity = self.capacity();
        if steps >= capacity {
            return Err(HistoryError::Exhausted { steps, capacity });
        }

        Ok((from % capacity + capacity - steps) % capacity)
    }

    pub fn oldest(&self) -> InputSample {
        self.iter_back(f64::INFINITY)
            .last()
            .map(|(sample, _)| sample)
            .unwrap_or_else(|| self.current())
    }

    /// Walks from the head towards older samples. Each item is a sample paired
    /// with the end of the interval during which it was active: `now` for the
    /// head, the next newer sample's timestamp otherwise.
    pub fn iter_back(&self, now: f64) -> HistoryIter<'_> {
        HistoryIter {
            history: self,
            steps: 0,
            interval_end: now,
        }
    }
}

pub struct HistoryIter<'a> {
    history: &'a History,
    steps: usize,
    interval_end: f64,
}

impl Iterator for HistoryIter<'_> {
    type Item = (InputSample, f64);

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.history.walk_back(self.history.head, self.steps).ok()?;
        let sample = *self.history.get(index)?;

        let interval_end = self.interval_end;
        self.interval_end = sample.timestamp;
        self.steps += 1;

        Some((sample, interval_end))
    }
}
