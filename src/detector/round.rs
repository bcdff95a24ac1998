use std::time::{Duration, Instant};

use tracing::debug;

use crate::types::{CompletedRound, Sample};

/// Infers round boundaries from presence/absence transitions of the on-page
/// coefficient. The page exposes no end-of-round event; the only observable
/// signal is the coefficient text turning unreadable once a round resolves
/// and before the next one begins. A stable-gap debounce keeps a single
/// dropped poll (transient DOM mutation, mid-render snapshot) from counting
/// as a boundary.
///
/// Owned by the poll loop alone. All decisions are driven by the sample's
/// `observed_at` clock, so the state machine is deterministic under test.
pub struct RoundTracker {
    /// Most recent non-empty coefficient, cleared after every emission.
    last_coefficient: Option<String>,
    /// Total-bets text paired with `last_coefficient`.
    last_total_bets: Option<String>,
    /// When the current absence run began. Stamped on the first miss of each
    /// run and re-anchored after every emission.
    gap_started_at: Instant,
    /// Consecutive ticks with no readable coefficient.
    consecutive_misses: u32,
    /// Number the next completed round will carry. Never reused.
    next_round: u64,
    /// Minimum absence duration before a gap counts as a round boundary.
    stable_gap: Duration,
}

impl RoundTracker {
    pub fn new(stable_gap: Duration, first_round: u64, now: Instant) -> Self {
        Self {
            last_coefficient: None,
            last_total_bets: None,
            gap_started_at: now,
            consecutive_misses: 0,
            next_round: first_round,
            stable_gap,
        }
    }

    /// Feed one poll sample through the state machine. Returns a completed
    /// round when, and only when, a held stable value's absence run has
    /// outlasted the stable gap. At most one round is pending at any time;
    /// a run of absences emits at most once.
    pub fn observe(&mut self, sample: &Sample) -> Option<CompletedRound> {
        let coefficient = sample
            .coefficient
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty());

        if let Some(coefficient) = coefficient {
            self.last_coefficient = Some(coefficient.to_string());
            self.last_total_bets = sample.total_bets.clone();
            self.consecutive_misses = 0;
            return None;
        }

        if self.consecutive_misses == 0 {
            self.gap_started_at = sample.observed_at;
        }
        self.consecutive_misses += 1;

        let coefficient = self.last_coefficient.as_ref()?;
        if sample.observed_at.duration_since(self.gap_started_at) < self.stable_gap {
            return None;
        }

        let round = CompletedRound {
            number: self.next_round,
            coefficient: coefficient.clone(),
            total_bets: self.last_total_bets.take(),
        };
        debug!(
            round = round.number,
            coefficient = %round.coefficient,
            misses = self.consecutive_misses,
            "round boundary confirmed"
        );

        self.next_round += 1;
        self.last_coefficient = None;
        self.gap_started_at = sample.observed_at;
        self.consecutive_misses = 0;
        Some(round)
    }

    /// Number the next confirmed round will carry.
    pub fn next_round(&self) -> u64 {
        self.next_round
    }
}
