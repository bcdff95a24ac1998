use std::fs::{File, OpenOptions};
use std::path::Path;

use csv::{ReaderBuilder, Writer, WriterBuilder};
use tracing::{info, warn};

use crate::error::Result;
use crate::types::GameRecord;

/// Record store column headers, written once when the file is created.
pub const HEADERS: [&str; 5] = [
    "GameNumber",
    "Coefficient",
    "TotalBets",
    "EndTime",
    "DayOfWeek",
];

/// Append-only CSV store for completed rounds. The file handle stays open
/// for the process lifetime; every append is flushed before returning, so a
/// crash loses at most the in-flight row.
pub struct CsvSink {
    writer: Writer<File>,
    first_round: u64,
}

impl CsvSink {
    /// Open the store at `path`. A new or empty file gets the header row; an
    /// existing file is appended to, with numbering resumed after its last
    /// recorded round so the GameNumber sequence stays gapless across
    /// restarts.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let has_content = std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
        let last_recorded = if has_content {
            last_recorded_round(path)?
        } else {
            None
        };

        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        if !has_content {
            writer.write_record(HEADERS)?;
            writer.flush()?;
        }

        let first_round = last_recorded.map(|n| n + 1).unwrap_or(1);
        info!(
            path = %path.display(),
            first_round,
            resumed = last_recorded.is_some(),
            "record store ready"
        );
        Ok(Self {
            writer,
            first_round,
        })
    }

    /// Round number the next record should carry: 1 for a fresh store, last
    /// recorded + 1 when resuming an existing one.
    pub fn first_round(&self) -> u64 {
        self.first_round
    }

    /// Append one row and flush it before returning.
    pub fn append(&mut self, record: &GameRecord) -> Result<()> {
        self.writer.serialize(record)?;
        self.writer.flush()?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Last GameNumber in an existing store file. Tolerates a truncated trailing
/// line (interrupted write) by stopping at the first unreadable row.
fn last_recorded_round(path: &Path) -> Result<Option<u64>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut last = None;
    for row in reader.records() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("unreadable row in existing record store, resuming before it: {e}");
                break;
            }
        };
        if let Some(n) = row.get(0).and_then(|v| v.parse::<u64>().ok()) {
            last = Some(n);
        }
    }
    Ok(last)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: u64, coefficient: &str, bets: Option<&str>) -> GameRecord {
        GameRecord {
            game_number: n,
            coefficient: coefficient.to_string(),
            total_bets: bets.map(str::to_string),
            end_time: "2024-03-01 21:14:55".to_string(),
            day_of_week: "Friday".to_string(),
        }
    }

    #[test]
    fn fresh_file_gets_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        assert_eq!(sink.first_round(), 1);
        sink.append(&record(1, "1.23", Some("540"))).unwrap();
        sink.append(&record(2, "8.01", None)).unwrap();
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        assert_eq!(
            lines.next(),
            Some("GameNumber,Coefficient,TotalBets,EndTime,DayOfWeek")
        );
        assert_eq!(lines.next(), Some("1,1.23,540,2024-03-01 21:14:55,Friday"));
        assert_eq!(lines.next(), Some("2,8.01,,2024-03-01 21:14:55,Friday"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn rows_are_on_disk_before_the_next_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        sink.append(&record(1, "2.50", Some("1200"))).unwrap();

        // sink still open: the row must already be readable
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn reopening_resumes_numbering_without_a_second_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.csv");

        let mut sink = CsvSink::open(&path).unwrap();
        sink.append(&record(1, "1.50", None)).unwrap();
        sink.append(&record(2, "3.10", None)).unwrap();
        drop(sink);

        let mut sink = CsvSink::open(&path).unwrap();
        assert_eq!(sink.first_round(), 3);
        sink.append(&record(3, "7.77", Some("90"))).unwrap();
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "GameNumber,Coefficient,TotalBets,EndTime,DayOfWeek");
        assert!(lines[3].starts_with("3,7.77,90,"));
    }

    #[test]
    fn header_only_file_still_starts_at_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rounds.csv");

        drop(CsvSink::open(&path).unwrap());
        let sink = CsvSink::open(&path).unwrap();
        assert_eq!(sink.first_round(), 1);
        drop(sink);

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 1, "header must not repeat");
    }
}
