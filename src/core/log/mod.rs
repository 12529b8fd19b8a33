use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use serde::Serialize;

use crate::core::error::LightError;
use crate::core::event::PhaseChange;
use crate::core::phase::Phase;

/// Ordered record of the transitions a light went through.
///
/// Unbounded by default; with a limit only the newest entries are kept,
/// while `recorded` still counts every transition.
#[derive(Clone, Debug, Default)]
pub struct TransitionLog {
    pub(crate) entries: VecDeque<PhaseChange>,
    limit: Option<usize>,
    recorded: u64,
}

impl TransitionLog {
    pub fn new() -> Self {
        Self { entries: VecDeque::new(), limit: None, recorded: 0 }
    }

    /// Keep at most `limit` entries, dropping the oldest first
    pub fn with_limit(limit: Option<usize>) -> Self {
        Self { limit, ..Self::new() }
    }

    /// Record a transition
    pub fn record(&mut self, change: PhaseChange) {
        // --- Negative-space assertion: phases alternate starting from red ---
        let previous = self.entries.back().map_or(Phase::Red, |last| last.phase);
        assert_ne!(previous, change.phase, "Consecutive transitions must change the phase");

        // --- Negative-space assertion: sequence ids grow ---
        if let Some(last) = self.entries.back() {
            assert!(change.sequence > last.sequence, "Transition sequence must increase");
        }

        if self.limit.is_some_and(|limit| self.entries.len() >= limit) {
            self.entries.pop_front();
        }
        let before = self.entries.len();
        self.entries.push_back(change);
        self.recorded += 1;

        // --- Negative-space assertion: log length increased exactly by 1 ---
        assert_eq!(
            self.entries.len(),
            before + 1,
            "TransitionLog must increase by exactly one entry"
        );
    }

    pub fn entries(&self) -> impl Iterator<Item = &PhaseChange> {
        self.entries.iter()
    }

    /// Entries currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&PhaseChange> {
        self.entries.back()
    }

    /// Every transition ever recorded, including dropped ones
    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}

/// Append entries to `path` as NDJSON, one object per line
pub fn append_logs<T: Serialize>(log: &[T], path: impl AsRef<Path>) -> Result<(), LightError> {
    let mut file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;

    for entry in log {
        let json = serde_json::to_string(entry)?;
        writeln!(file, "{}", json)?; // one JSON object per line
    }
    Ok(())
}

/// Thread-safe wrapper
pub type SafeTransitionLog = Arc<Mutex<TransitionLog>>;
