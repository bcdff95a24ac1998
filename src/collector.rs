use std::time::{Duration, Instant};

use chrono::{DateTime, Local, Locale};
use tokio::sync::watch;
use tokio::time::interval;
use tracing::info;

use crate::config::{Config, DIAG_INTERVAL_SECS};
use crate::detector::RoundTracker;
use crate::error::Result;
use crate::reader::PageReader;
use crate::sink::CsvSink;
use crate::stats::PollStats;
use crate::types::{CompletedRound, GameRecord};

/// Drives the poll loop: one page sample per tick, fed through the round
/// tracker, with every confirmed round stamped and appended to the sink
/// before the next tick runs. The tracker state is owned here and touched by
/// nothing else.
pub struct Collector<R: PageReader> {
    reader: R,
    tracker: RoundTracker,
    sink: CsvSink,
    locale: Locale,
    poll_interval: Duration,
    stats: PollStats,
    last_diag_at: Instant,
}

impl<R: PageReader> Collector<R> {
    pub fn new(cfg: &Config, reader: R, sink: CsvSink) -> Self {
        let tracker = RoundTracker::new(
            Duration::from_millis(cfg.stable_gap_ms),
            sink.first_round(),
            Instant::now(),
        );
        Self {
            reader,
            tracker,
            sink,
            locale: cfg.locale,
            poll_interval: Duration::from_millis(cfg.poll_interval_ms),
            stats: PollStats::new(),
            last_diag_at: Instant::now(),
        }
    }

    /// Poll until the shutdown signal flips, then flush and return. A sink
    /// write failure aborts the loop: skipping a committed round would leave
    /// a gap in the numbering.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            poll_interval_ms = self.poll_interval.as_millis() as u64,
            first_round = self.tracker.next_round(),
            "collector started"
        );

        let mut ticker = interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick().await?;
                    self.maybe_log_diagnostics();
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        self.sink.flush()?;
        info!(
            ticks = self.stats.ticks,
            rounds = self.stats.rounds,
            "collector stopped, record store flushed"
        );
        Ok(())
    }

    /// One loop iteration: sample, update tracker state, persist any
    /// confirmed round. Factored out of `run` so tests can drive the loop
    /// tick by tick.
    pub async fn tick(&mut self) -> Result<()> {
        let started = Instant::now();
        let sample = self.reader.sample().await;
        self.stats.record_read(started.elapsed());
        self.stats.ticks += 1;
        if sample.coefficient.is_none() {
            self.stats.misses += 1;
        }

        let Some(round) = self.tracker.observe(&sample) else {
            return Ok(());
        };

        let record = stamp(round, Local::now(), self.locale);
        self.sink.append(&record)?;
        self.stats.rounds += 1;
        info!(
            game = record.game_number,
            coefficient = %record.coefficient,
            total_bets = record.total_bets.as_deref().unwrap_or(""),
            end_time = %record.end_time,
            "round recorded"
        );
        Ok(())
    }

    fn maybe_log_diagnostics(&mut self) {
        if self.last_diag_at.elapsed() < Duration::from_secs(DIAG_INTERVAL_SECS) {
            return;
        }
        self.last_diag_at = Instant::now();

        match self.stats.read_percentiles() {
            Some((p50, p95, p99)) => info!(
                ticks = self.stats.ticks,
                misses = self.stats.misses,
                rounds = self.stats.rounds,
                "poll diag | read latency p50={p50}us p95={p95}us p99={p99}us"
            ),
            None => info!(ticks = self.stats.ticks, "poll diag | no reads sampled yet"),
        }
    }
}

/// Stamp a confirmed round with the local wall clock.
fn stamp(round: CompletedRound, now: DateTime<Local>, locale: Locale) -> GameRecord {
    GameRecord {
        game_number: round.number,
        coefficient: round.coefficient,
        total_bets: round.total_bets,
        end_time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
        day_of_week: now.format_localized("%A", locale).to_string(),
    }
}
