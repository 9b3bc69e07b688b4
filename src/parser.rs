//! Decoders for raw session records, as returned by the IndyStats API or as
//! saved to CSV by the `fetch` command.

use anyhow::{Context, Result};
use serde_json::{Map, Value};

/// One vendor record: field name to JSON value, fields may be missing or null.
pub type RawRecord = Map<String, Value>;

/// Decodes a JSON array of record objects.
///
/// # Errors
///
/// Returns an error if the bytes are not a JSON array of objects.
pub fn parse_records_json(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    serde_json::from_slice(bytes).context("expected a JSON array of record objects")
}

/// Decodes CSV with a header row. Empty cells become `null`, every other cell
/// is kept as a string for the normalizer to coerce.
///
/// # Errors
///
/// Returns an error on malformed CSV (e.g. a row with the wrong field count).
pub fn parse_records_csv(bytes: &[u8]) -> Result<Vec<RawRecord>> {
    let mut rdr = csv::Reader::from_reader(bytes);
    let headers = rdr.headers()?.clone();

    let mut records = Vec::new();
    for result in rdr.records() {
        let row = result?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .map(|(name, cell)| {
                let value = if cell.is_empty() {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (name.to_string(), value)
            })
            .collect();
        records.push(record);
    }

    Ok(records)
}
