//! Persisted record definition.

use chrono::{DateTime, Utc};
use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// A single row of the `fileHash` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Randomly generated identifier, primary key.
    pub hash: String,
    /// Informational filename derived from the hash.
    pub filename: String,
    /// Unix epoch seconds of the last write.
    pub last_checked: i64,
}

impl Record {
    /// Decode a row selected as `hash, filename, lastChecked`.
    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            hash: row.get(0)?,
            filename: row.get(1)?,
            last_checked: row.get(2)?,
        })
    }

    /// The `last_checked` timestamp as a UTC date, if it is in range.
    #[must_use]
    pub fn last_checked_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.last_checked, 0)
    }

    /// Timestamp formatted as `MM/DD/YY HH:MM:SS` for log output.
    #[must_use]
    pub fn last_checked_display(&self) -> String {
        match self.last_checked_at() {
            Some(ts) => ts.format("%m/%d/%y %H:%M:%S").to_string(),
            None => self.last_checked.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(last_checked: i64) -> Record {
        Record {
            hash: "abc".to_string(),
            filename: "abc.temp".to_string(),
            last_checked,
        }
    }

    #[test]
    fn test_last_checked_display() {
        // 2021-03-04 05:06:07 UTC
        assert_eq!(record(1_614_834_367).last_checked_display(), "03/04/21 05:06:07");
    }

    #[test]
    fn test_last_checked_out_of_range_falls_back() {
        let r = record(i64::MAX);
        assert!(r.last_checked_at().is_none());
        assert_eq!(r.last_checked_display(), i64::MAX.to_string());
    }
}
