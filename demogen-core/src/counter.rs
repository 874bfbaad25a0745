//! Daily branch counter
//!
//! The counter file holds a single line `YYYYMMDD <count>`. Advancing it on
//! the stored day increments the count; on any other day it restarts at 1.
//!
//! There is no locking: two runs sharing a counter file can read the same
//! value and hand out the same branch suffix. Demogen assumes one runner
//! per counter file.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use crate::{Error, Result};

/// Date format used in the counter file and in branch names
pub const DATE_FORMAT: &str = "%Y%m%d";

/// Parsed contents of the counter file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterState {
    /// Day the count belongs to
    pub date: NaiveDate,
    /// Number of branches handed out on that day
    pub count: u32,
}

impl CounterState {
    /// Parse a `YYYYMMDD <count>` line
    pub fn parse(contents: &str) -> Result<Self> {
        let mut tokens = contents.split_whitespace();

        let (date, count) = match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(date), Some(count), None) => (date, count),
            _ => {
                return Err(Error::Counter(format!(
                    "expected 'YYYYMMDD <count>', found '{}'",
                    contents.trim()
                )))
            }
        };

        let date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|e| Error::Counter(format!("invalid date '{}': {}", date, e)))?;
        let count = count
            .parse::<u32>()
            .map_err(|e| Error::Counter(format!("invalid count '{}': {}", count, e)))?;

        Ok(Self { date, count })
    }

    /// Render the state as stored on disk
    pub fn render(&self) -> String {
        format!("{} {}", self.date.format(DATE_FORMAT), self.count)
    }
}

/// File-backed counter that resets every day
#[derive(Debug, Clone)]
pub struct BranchCounter {
    path: PathBuf,
}

impl BranchCounter {
    /// Create a counter backed by the given file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored state without changing it
    ///
    /// Returns `None` if the counter file doesn't exist yet
    pub fn peek(&self) -> Result<Option<CounterState>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(&self.path)?;
        CounterState::parse(&contents).map(Some)
    }

    /// Advance the counter for `today` and persist it
    pub fn advance(&self, today: NaiveDate) -> Result<u32> {
        let count = match self.peek()? {
            Some(state) if state.date == today => state.count.checked_add(1).ok_or_else(|| {
                Error::Counter(format!(
                    "count {} for {} cannot be advanced",
                    state.count,
                    state.date.format(DATE_FORMAT)
                ))
            })?,
            _ => 1,
        };

        let state = CounterState { date: today, count };
        fs::write(&self.path, state.render())?;

        debug!(path = %self.path.display(), count, "Advanced branch counter");

        Ok(count)
    }
}
