//! Asynchronous journal reader with batch interface
//!
//! Reads journal rows with csv-async and hands them out in batches of
//! `JournalCommand`s for the async pipeline.
//!
//! ```text
//! Journal file → AsyncReader → Batches of JournalCommands
//!                    ↓
//!             csv_format module
//!   (JournalRecord, convert_journal_record)
//! ```

use crate::core::batch_processor::JournalCommand;
use crate::io::csv_format::{convert_journal_record, JournalRecord};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;

/// Asynchronous journal reader
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
    line_num: u64,
    rejected: usize,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self {
            csv_reader,
            line_num: 1,
            rejected: 0,
        }
    }

    /// Read up to `batch_size` journal commands
    ///
    /// Rows that fail to parse or convert are logged and skipped; they do not
    /// count towards the batch size. Returns an empty vector at end of input.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<JournalCommand> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<JournalRecord>();

        while batch.len() < batch_size {
            let row = match records.next().await {
                Some(row) => row,
                None => break,
            };
            self.line_num += 1;
            let line = self.line_num;

            match row {
                Ok(record) => match convert_journal_record(record) {
                    Ok(command) => batch.push(JournalCommand { line, command }),
                    Err(e) => {
                        self.rejected += 1;
                        tracing::warn!(line, "journal row rejected: {}", e);
                    }
                },
                Err(e) => {
                    self.rejected += 1;
                    tracing::warn!(line, "journal row unreadable: {}", e);
                }
            }
        }

        batch
    }

    /// Rows skipped so far because they could not be parsed or converted
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}
