//! PostgreSQL adapter implementing the database traits

use async_trait::async_trait;
use bytes::Bytes;
use futures::{pin_mut, SinkExt, StreamExt};
use std::path::Path;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_postgres::IsolationLevel;

use crate::adapters::database::traits::{CopyOutRequest, SourceDatabase, TargetDatabase};
use crate::adapters::postgresql::catalog::{
    column_from_row, sequence_from_row, COLUMNS_QUERY, SEQUENCES_QUERY, TABLE_EXISTS_QUERY,
};
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::adapters::postgresql::sql::{qualified, quote_ident, quote_literal};
use crate::domain::{ColumnRecord, ObfuscatorError, Result, SequenceRecord};

const COPY_CHUNK_BYTES: usize = 64 * 1024;

pub struct PostgreSQLAdapter {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLAdapter {
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl SourceDatabase for PostgreSQLAdapter {
    async fn fetch_columns(&self, schema: &str) -> Result<Vec<ColumnRecord>> {
        let client = self.client.get_connection().await?;
        let rows = client.query(COLUMNS_QUERY, &[&schema]).await?;

        let records = rows.iter().map(column_from_row).collect::<Result<Vec<_>>>()?;
        tracing::debug!(schema = %schema, records = records.len(), "Fetched column catalog");
        Ok(records)
    }

    async fn copy_out_snapshot(&self, requests: &[CopyOutRequest]) -> Result<Vec<u64>> {
        let mut client = self.client.get_connection().await?;
        let transaction = client
            .build_transaction()
            .isolation_level(IsolationLevel::RepeatableRead)
            .read_only(true)
            .start()
            .await?;

        let mut counts = Vec::with_capacity(requests.len());
        for request in requests {
            let stream = transaction.copy_out(request.statement.as_str()).await?;
            pin_mut!(stream);

            let mut file = tokio::fs::File::create(&request.output).await?;
            let mut counter = CsvRowCounter::default();
            while let Some(chunk) = stream.next().await {
                let chunk = chunk?;
                counter.feed(&chunk);
                file.write_all(&chunk).await?;
            }
            file.flush().await?;

            tracing::debug!(
                output = %request.output.display(),
                rows = counter.data_rows(),
                "Copy out finished"
            );
            counts.push(counter.data_rows());
        }

        transaction.commit().await?;
        Ok(counts)
    }
}

#[async_trait]
impl TargetDatabase for PostgreSQLAdapter {
    async fn table_exists(&self, schema: &str, table: &str) -> Result<bool> {
        let client = self.client.get_connection().await?;
        let row = client.query_one(TABLE_EXISTS_QUERY, &[&schema, &table]).await?;
        row.try_get(0)
            .map_err(|e| ObfuscatorError::Database(format!("Unexpected existence check result: {e}")))
    }

    async fn batch_execute(&self, sql: &str) -> Result<()> {
        let client = self.client.get_connection().await?;
        client.batch_execute(sql).await?;
        Ok(())
    }

    async fn copy_in(&self, statement: &str, input: &Path) -> Result<u64> {
        let client = self.client.get_connection().await?;
        let mut file = tokio::fs::File::open(input).await?;

        let sink = client.copy_in::<_, Bytes>(statement).await?;
        pin_mut!(sink);

        let mut buffer = vec![0u8; COPY_CHUNK_BYTES];
        loop {
            let read = file.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            sink.send(Bytes::copy_from_slice(&buffer[..read])).await?;
        }

        let rows = sink.finish().await?;
        tracing::debug!(input = %input.display(), rows, "Copy in finished");
        Ok(rows)
    }

    async fn fetch_sequences(&self, schema: &str) -> Result<Vec<SequenceRecord>> {
        let client = self.client.get_connection().await?;
        let rows = client.query(SEQUENCES_QUERY, &[&schema]).await?;
        rows.iter().map(sequence_from_row).collect()
    }

    async fn reset_sequence(&self, schema: &str, sequence: &SequenceRecord) -> Result<()> {
        let statement = setval_statement(schema, sequence);
        tracing::info!(
            sequence = %sequence.sequence_name,
            table = %sequence.table_name,
            column = %sequence.column_name,
            "Updating sequence"
        );

        let client = self.client.get_connection().await?;
        client.batch_execute(&statement).await?;
        Ok(())
    }
}

/// `setval` to the current column maximum
///
/// An empty table leaves the sequence uncalled so `nextval` returns 1.
pub fn setval_statement(schema: &str, sequence: &SequenceRecord) -> String {
    let column = quote_ident(&sequence.column_name);
    let table = qualified(schema, &sequence.table_name);
    format!(
        "SELECT setval({seq}, COALESCE(max_value, 1), max_value IS NOT NULL) \
         FROM (SELECT MAX({column}) AS max_value FROM {table}) AS seq_max",
        seq = quote_literal(&qualified(schema, &sequence.sequence_name)),
    )
}

/// Counts CSV records across arbitrary chunk boundaries
///
/// Newlines inside quoted fields are not record separators.
#[derive(Debug, Default)]
pub struct CsvRowCounter {
    in_quotes: bool,
    records: u64,
}

impl CsvRowCounter {
    pub fn feed(&mut self, chunk: &[u8]) {
        for byte in chunk {
            match byte {
                b'"' => self.in_quotes = !self.in_quotes,
                b'\n' if !self.in_quotes => self.records += 1,
                _ => {}
            }
        }
    }

    /// Records seen, minus the header row
    pub fn data_rows(&self) -> u64 {
        self.records.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_counter_ignores_quoted_newlines() {
        let mut counter = CsvRowCounter::default();
        counter.feed(b"id,note\n1,\"multi");
        counter.feed(b"\nline\"\n2,\"say \"\"hi\"\"\"\n");
        assert_eq!(counter.data_rows(), 2);
    }

    #[test]
    fn test_row_counter_empty_stream() {
        let counter = CsvRowCounter::default();
        assert_eq!(counter.data_rows(), 0);
    }

    #[test]
    fn test_setval_statement() {
        let sequence = SequenceRecord {
            sequence_name: "users_id_seq".to_string(),
            table_name: "users".to_string(),
            column_name: "id".to_string(),
        };
        assert_eq!(
            setval_statement("public", &sequence),
            "SELECT setval('\"public\".\"users_id_seq\"', COALESCE(max_value, 1), max_value IS NOT NULL) \
             FROM (SELECT MAX(\"id\") AS max_value FROM \"public\".\"users\") AS seq_max"
        );
    }
}
