use serde::Serialize;
use std::time::Instant;

// ---------------------------------------------------------------------------
// Poll samples
// ---------------------------------------------------------------------------

/// One page observation. Produced by the reader every tick, consumed
/// immediately by the round tracker, never persisted.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Coefficient text as shown, None when the element could not be read.
    pub coefficient: Option<String>,
    /// Total-bets text observed alongside the coefficient.
    pub total_bets: Option<String>,
    pub observed_at: Instant,
}

impl Sample {
    /// A fully absent observation. Fetch and parse failures collapse to this.
    pub fn absent(observed_at: Instant) -> Self {
        Self {
            coefficient: None,
            total_bets: None,
            observed_at,
        }
    }
}

// ---------------------------------------------------------------------------
// Round lifecycle
// ---------------------------------------------------------------------------

/// Emitted by the tracker when a round boundary is confirmed. Carries the
/// last stable values observed before the coefficient disappeared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedRound {
    pub number: u64,
    pub coefficient: String,
    pub total_bets: Option<String>,
}

// ---------------------------------------------------------------------------
// Persisted record
// ---------------------------------------------------------------------------

/// One store row per completed round. Serde field names map to the exact
/// column headers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GameRecord {
    pub game_number: u64,
    pub coefficient: String,
    pub total_bets: Option<String>,
    /// Local wall clock, "%Y-%m-%d %H:%M:%S".
    pub end_time: String,
    /// Full weekday name in the configured locale.
    pub day_of_week: String,
}
