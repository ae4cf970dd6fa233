//! Step outcomes and the optional per-step journal.

use std::fmt::Write as _;

/// Why a step did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// Allocated bytes already at, or would pass, the memory budget.
    BudgetExhausted,
    /// Size model returned the sentinel zero.
    ZeroSize,
    /// The allocator refused the request.
    AllocationFailed,
    /// The slot under the cursor held nothing.
    EmptySlot,
    /// No slot holds a live vertex.
    NoLiveVertex,
    /// Source vertex has no free edge slot.
    NoVacantEdge,
    /// Source vertex has no outgoing edge.
    NoEdge,
    /// The Markov draw matched no column.
    UnmatchedTransition,
    /// CREATE_VERTEX landed on an occupied slot.
    OccupiedSlot,
}

impl SkipReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BudgetExhausted => "budget_exhausted",
            Self::ZeroSize => "zero_size",
            Self::AllocationFailed => "allocation_failed",
            Self::EmptySlot => "empty_slot",
            Self::NoLiveVertex => "no_live_vertex",
            Self::NoVacantEdge => "no_vacant_edge",
            Self::NoEdge => "no_edge",
            Self::UnmatchedTransition => "unmatched_transition",
            Self::OccupiedSlot => "occupied_slot",
        }
    }
}

/// Result of one primitive operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepOutcome {
    Applied,
    Skipped(SkipReason),
}

impl StepOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped(reason) => reason.as_str(),
        }
    }
}

/// One journal line.
///
/// Batch operations record one event per primitive call, all sharing the
/// step number of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    pub step: u64,
    pub operation: &'static str,
    pub slot: Option<usize>,
    pub size: Option<usize>,
    pub outcome: StepOutcome,
}

/// Append-only, opt-in journal of primitive operations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceJournal {
    events: Vec<TraceEvent>,
}

impl TraceJournal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: TraceEvent) {
        self.events.push(event);
    }

    #[must_use]
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events whose outcome is [`StepOutcome::Applied`].
    pub fn applied(&self) -> impl Iterator<Item = &TraceEvent> {
        self.events.iter().filter(|e| e.outcome.is_applied())
    }

    /// Canonical one-line-per-event rendering hashed by [`digest`](Self::digest).
    #[must_use]
    pub fn canonical_lines(&self) -> String {
        let mut out = String::with_capacity(self.events.len() * 32);
        for e in &self.events {
            let _ = write!(out, "{}|{}|", e.step, e.operation);
            match e.slot {
                Some(slot) => {
                    let _ = write!(out, "{slot}");
                }
                None => out.push('-'),
            }
            out.push('|');
            match e.size {
                Some(size) => {
                    let _ = write!(out, "{size}");
                }
                None => out.push('-'),
            }
            let _ = writeln!(out, "|{}", e.outcome.as_str());
        }
        out
    }

    /// blake3 hex digest of the canonical rendering.
    #[must_use]
    pub fn digest(&self) -> String {
        blake3::hash(self.canonical_lines().as_bytes())
            .to_hex()
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(step: u64, outcome: StepOutcome) -> TraceEvent {
        TraceEvent {
            step,
            operation: "alloc_single",
            slot: Some(3),
            size: Some(16),
            outcome,
        }
    }

    #[test]
    fn canonical_lines_mark_missing_fields() {
        let mut j = TraceJournal::new();
        j.push(event(0, StepOutcome::Applied));
        j.push(TraceEvent {
            step: 1,
            operation: "dealloc_single",
            slot: None,
            size: None,
            outcome: StepOutcome::Skipped(SkipReason::EmptySlot),
        });
        assert_eq!(
            j.canonical_lines(),
            "0|alloc_single|3|16|applied\n1|dealloc_single|-|-|empty_slot\n"
        );
        assert_eq!(j.applied().count(), 1);
    }

    #[test]
    fn digest_tracks_content() {
        let mut a = TraceJournal::new();
        let mut b = TraceJournal::new();
        assert_eq!(a.digest(), b.digest());
        a.push(event(0, StepOutcome::Applied));
        b.push(event(0, StepOutcome::Skipped(SkipReason::BudgetExhausted)));
        assert_ne!(a.digest(), b.digest());
        assert_eq!(a.digest().len(), 64);
    }
}
