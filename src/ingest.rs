//! CSV schema validation, row parsing/filtering, and ordering.
//!
//! Parses with the `csv` crate in flexible mode (rows of ragged length must
//! not panic the reader, the same idiom the pack's `tx-csv-001` reference
//! uses) and validates fields the way small `validate_*`
//! helpers do: one check, one early continue/return.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use tracing::warn;

use crate::config::Config;
use crate::error::AnalysisError;
use crate::model::{IngestDiagnostics, Transaction};

const REQUIRED_COLUMNS: [&str; 5] = [
    "transaction_id",
    "sender_id",
    "receiver_id",
    "amount",
    "timestamp",
];

/// Parse raw CSV text into an ordered transaction sequence plus diagnostics.
///
/// Returns a fatal `AnalysisError` for a missing header, an oversized batch,
/// or zero surviving rows. Individual malformed rows are dropped silently
/// and counted in the returned `IngestDiagnostics`.
pub fn parse(csv_text: &str, config: &Config) -> Result<(Vec<Transaction>, IngestDiagnostics), AnalysisError> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(csv_text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| AnalysisError::internal("ingest", format!("failed to read CSV header: {e}")))?
        .clone();

    let index = build_column_index(&headers)?;

    let mut diagnostics = IngestDiagnostics::default();
    let mut transactions = Vec::new();

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(_) => {
                diagnostics.rows_read += 1;
                diagnostics.dropped_field_count += 1;
                continue;
            }
        };
        diagnostics.rows_read += 1;

        if record.len() < 5 {
            diagnostics.dropped_field_count += 1;
            continue;
        }

        let transaction_id = record.get(index["transaction_id"]).unwrap_or("").trim();
        let sender = record.get(index["sender_id"]).unwrap_or("").trim();
        let receiver = record.get(index["receiver_id"]).unwrap_or("").trim();
        let amount_str = record.get(index["amount"]).unwrap_or("").trim();
        let timestamp_str = record.get(index["timestamp"]).unwrap_or("").trim();

        if transaction_id.is_empty() || sender.is_empty() || receiver.is_empty() {
            diagnostics.dropped_empty_id += 1;
            continue;
        }

        let amount: f64 = match amount_str.parse() {
            Ok(a) => a,
            Err(_) => {
                diagnostics.dropped_bad_amount += 1;
                continue;
            }
        };
        if amount < 0.0 {
            diagnostics.dropped_negative_amount += 1;
            continue;
        }

        let timestamp = match parse_timestamp(timestamp_str) {
            Some(ts) => ts,
            None => {
                diagnostics.dropped_bad_timestamp += 1;
                continue;
            }
        };

        transactions.push(Transaction {
            transaction_id: transaction_id.to_string(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            amount,
            timestamp,
        });
        diagnostics.rows_parsed += 1;
    }

    if diagnostics.total_dropped() > 0 {
        warn!(
            dropped = diagnostics.total_dropped(),
            rows_read = diagnostics.rows_read,
            "ingest dropped malformed rows"
        );
    }

    if transactions.len() > config.max_transactions {
        return Err(AnalysisError::TooManyTransactionsError {
            observed: transactions.len(),
            cap: config.max_transactions,
        });
    }

    if transactions.is_empty() {
        return Err(AnalysisError::EmptyBatchError);
    }

    // Stable sort: ties broken by original input order, since `sort_by` is
    // a stable sort and rows were pushed in input order.
    transactions.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    Ok((transactions, diagnostics))
}

/// Map each required (lowercased) column name to its position in `headers`.
fn build_column_index(headers: &csv::StringRecord) -> Result<HashMap<&'static str, usize>, AnalysisError> {
    let mut found: HashMap<String, usize> = HashMap::new();
    for (pos, name) in headers.iter().enumerate() {
        found.insert(name.trim().to_lowercase(), pos);
    }

    let mut missing = Vec::new();
    let mut index = HashMap::new();
    for column in REQUIRED_COLUMNS {
        match found.get(column) {
            Some(&pos) => {
                index.insert(column, pos);
            }
            None => missing.push(column.to_string()),
        }
    }

    if !missing.is_empty() {
        return Err(AnalysisError::SchemaError(missing));
    }

    Ok(index)
}

/// Accept RFC 3339 / ISO 8601 (offset or naive) and `YYYY-MM-DD HH:MM:SS`
/// with optional fractional seconds. Naive timestamps are assumed UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let formats = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
    for fmt in formats {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
        }
    }

    None
}
