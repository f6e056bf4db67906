//! Synchronous journal reader with iterator interface
//!
//! Provides a streaming iterator over journal commands from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Design
//!
//! The SyncReader uses csv::Reader to deserialize journal rows one at a time,
//! converting each row into a `JournalCommand` tagged with its line number.
//! The file is never loaded into memory as a whole.
//!
//! ```no_run
//! use remittance_settlement_engine::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("journal.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(entry) => println!("line {}: {}", entry.line, entry.command.op()),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, unreadable header) are returned from `new()`
//! - Row-level parse and conversion errors are yielded as `ParseError` items
//!   carrying the line number, and iteration continues with the next row

use crate::core::batch_processor::JournalCommand;
use crate::io::csv_format::{convert_journal_record, JournalRecord};
use crate::types::{Result, SettlementError};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous journal reader
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: u64,
}

impl SyncReader {
    /// Open a journal file for streaming iteration
    ///
    /// The CSV reader trims whitespace from all fields, allows rows with
    /// trailing columns left off, and uses an 8KB buffer.
    ///
    /// # Errors
    ///
    /// * `IoError` - The file could not be opened
    pub fn new(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| SettlementError::IoError {
            message: format!("Failed to open file '{}': {}", path.display(), e),
        })?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 1,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<JournalCommand>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.reader.deserialize::<JournalRecord>().next()?;
        self.line_num += 1;
        let line = self.line_num;

        let parsed = row
            .map_err(|e| e.to_string())
            .and_then(|record| convert_journal_record(record).map_err(|e| e.to_string()));

        Some(
            parsed
                .map(|command| JournalCommand { line, command })
                .map_err(|message| SettlementError::ParseError {
                    line: Some(line),
                    message,
                }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::command::Command;
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str =
        "op,tenant,branch,ref,other_ref,sender,recipient,amount,rate,received,fee,currency,strategy,actor,note,at\n";

    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(HEADER.as_bytes())
            .expect("Failed to write to temp file");
        file.write_all(rows.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_reader_fails_on_missing_file() {
        match SyncReader::new(Path::new("nonexistent.csv")) {
            Err(SettlementError::IoError { message }) => {
                assert!(message.contains("Failed to open file"))
            }
            other => panic!("Expected IoError, got {:?}", other),
        }
    }

    #[test]
    fn test_sync_reader_reads_journal_in_order() {
        let file = create_temp_csv(
            "outgoing,1,1,O1,,Ali,Sara,1000,85000,,,USD,,,,\n\
             incoming,1,2,I1,,Reza,Nima,600,86000,,,USD,,,,\n\
             settle,1,,O1,I1,,,600,,,,,,ops,first leg,\n\
             auto_settle,1,,O1,,,,,,,,,best_rate,,,\n",
        );

        let entries: Vec<_> = SyncReader::new(file.path())
            .unwrap()
            .map(|entry| entry.unwrap())
            .collect();

        assert_eq!(entries.len(), 4);
        assert_eq!(
            entries.iter().map(|e| e.line).collect::<Vec<_>>(),
            vec![2, 3, 4, 5]
        );
        assert_eq!(
            entries.iter().map(|e| e.command.op()).collect::<Vec<_>>(),
            vec!["outgoing", "incoming", "settle", "auto_settle"]
        );
        match &entries[2].command {
            Command::Settle { amount, actor, .. } => {
                assert_eq!(*amount, Decimal::from(600));
                assert_eq!(actor, "ops");
            }
            other => panic!("Expected Settle, got {:?}", other),
        }
    }

    #[test]
    fn test_sync_reader_accepts_short_rows() {
        let file = create_temp_csv("payout,3,,I9\n");

        let entries: Vec<_> = SyncReader::new(file.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
        let entry = entries[0].as_ref().unwrap();
        assert_eq!(entry.command.tenant(), 3);
        assert_eq!(entry.command.op(), "payout");
    }

    #[test]
    fn test_sync_reader_handles_whitespace() {
        let file = create_temp_csv("  cancel , 2 ,  , O1 ,,,,,,,,,,  teller  , duplicate ,\n");

        let entries: Vec<_> = SyncReader::new(file.path()).unwrap().collect();
        match &entries[0].as_ref().unwrap().command {
            Command::Cancel {
                tenant,
                reference,
                actor,
                reason,
            } => {
                assert_eq!(*tenant, 2);
                assert_eq!(reference, "O1");
                assert_eq!(actor, "teller");
                assert_eq!(reason, "duplicate");
            }
            other => panic!("Expected Cancel, got {:?}", other),
        }
    }

    #[test]
    fn test_sync_reader_reports_line_and_continues() {
        let file = create_temp_csv(
            "payout,1,,I1\n\
             settle,1,,O1,I1,,,lots\n\
             transfer,1\n\
             payout,1,,I2\n",
        );

        let entries: Vec<_> = SyncReader::new(file.path()).unwrap().collect();
        assert_eq!(entries.len(), 4);
        assert!(entries[0].is_ok());
        assert!(entries[3].is_ok());

        match &entries[1] {
            Err(SettlementError::ParseError { line, message }) => {
                assert_eq!(*line, Some(3));
                assert!(message.contains("amount"));
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
        match &entries[2] {
            Err(SettlementError::ParseError { line, message }) => {
                assert_eq!(*line, Some(4));
                assert!(message.contains("transfer"));
            }
            other => panic!("Expected ParseError, got {:?}", other),
        }
    }

    #[test]
    fn test_sync_reader_rejects_bad_tenant() {
        let file = create_temp_csv("payout,abc,,I1\n");

        let entries: Vec<_> = SyncReader::new(file.path()).unwrap().collect();
        assert!(matches!(
            entries[0],
            Err(SettlementError::ParseError { line: Some(2), .. })
        ));
    }

    #[test]
    fn test_sync_reader_handles_empty_journal() {
        let file = create_temp_csv("");
        assert_eq!(SyncReader::new(file.path()).unwrap().count(), 0);
    }
}
