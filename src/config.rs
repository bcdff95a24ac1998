use chrono::Locale;

use crate::error::{AppError, Result};

pub const GAME_URL: &str = "https://gwnw47x.life/games/crash";

/// Selector for the live coefficient inside the round timer widget.
pub const COEFFICIENT_SELECTOR: &str = "div.ratio-timer span";

/// The page swaps the timer element's class while a round resolves, so a
/// primary miss is retried against this selector before counting as absence.
pub const COEFFICIENT_FALLBACK_SELECTOR: &str = "div.ratio-timer__white span";

/// Selector for the running total-bets display.
pub const TOTAL_BETS_SELECTOR: &str = "div.head-list__crash span";

/// How long the coefficient must stay unreadable before the gap counts as a
/// round boundary. Must be shorter than the pause between rounds (or two
/// rounds merge into one record) and longer than single-frame DOM flicker
/// (or one round records twice).
pub const DEFAULT_STABLE_GAP_MS: u64 = 50;

/// Poll cadence.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Page fetch timeout (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 10;

/// Diagnostics log line interval (seconds).
pub const DIAG_INTERVAL_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Config {
    /// Crash game page to poll (GAME_URL)
    pub game_url: String,
    /// Loop cadence in milliseconds (POLL_INTERVAL_MS)
    pub poll_interval_ms: u64,
    /// Round-boundary debounce in milliseconds (STABLE_GAP_MS)
    pub stable_gap_ms: u64,
    /// Record store path (CSV_PATH)
    pub csv_path: String,
    /// Tracing env-filter string (LOG_LEVEL)
    pub log_level: String,
    /// Operational log file; logs go to stderr when unset (LOG_FILE)
    pub log_file: Option<String>,
    /// Locale for the DayOfWeek column (LOCALE)
    pub locale: Locale,
    /// CSS selector overrides for when the page structure shifts
    /// (COEFFICIENT_SELECTOR, COEFFICIENT_FALLBACK_SELECTOR, TOTAL_BETS_SELECTOR)
    pub coefficient_selector: String,
    pub coefficient_fallback_selector: String,
    pub total_bets_selector: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let locale_name = std::env::var("LOCALE").unwrap_or_else(|_| "en_US".to_string());
        let locale = Locale::try_from(locale_name.as_str())
            .map_err(|_| AppError::Config(format!("unknown locale: {locale_name}")))?;

        let poll_interval_ms = env_millis("POLL_INTERVAL_MS", DEFAULT_POLL_INTERVAL_MS)?;
        if poll_interval_ms == 0 {
            return Err(AppError::Config(
                "POLL_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            game_url: std::env::var("GAME_URL").unwrap_or_else(|_| GAME_URL.to_string()),
            poll_interval_ms,
            stable_gap_ms: env_millis("STABLE_GAP_MS", DEFAULT_STABLE_GAP_MS)?,
            csv_path: std::env::var("CSV_PATH").unwrap_or_else(|_| "data.csv".to_string()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_file: std::env::var("LOG_FILE").ok().filter(|p| !p.is_empty()),
            locale,
            coefficient_selector: std::env::var("COEFFICIENT_SELECTOR")
                .unwrap_or_else(|_| COEFFICIENT_SELECTOR.to_string()),
            coefficient_fallback_selector: std::env::var("COEFFICIENT_FALLBACK_SELECTOR")
                .unwrap_or_else(|_| COEFFICIENT_FALLBACK_SELECTOR.to_string()),
            total_bets_selector: std::env::var("TOTAL_BETS_SELECTOR")
                .unwrap_or_else(|_| TOTAL_BETS_SELECTOR.to_string()),
        })
    }
}

fn env_millis(name: &str, default: u64) -> Result<u64> {
    match std::env::var(name) {
        Ok(v) => v
            .parse::<u64>()
            .map_err(|_| AppError::Config(format!("{name} must be an integer millisecond value"))),
        Err(_) => Ok(default),
    }
}
