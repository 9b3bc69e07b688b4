//! Output formatting and persistence for session tables and driver summaries.
//!
//! Tables are written as CSV, optionally gzip-compressed, under an output
//! directory. Summaries can also be logged as pretty-printed JSON.

use anyhow::{Context, Result};
use csv::Writer;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde_json::Value;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::analyzers::types::{DriverSummary, SessionTable};
use crate::parser::RawRecord;

/// Logs driver summaries using Rust's debug pretty-print format.
pub fn print_pretty(summaries: &[DriverSummary]) {
    debug!("{:#?}", summaries);
}

/// Logs driver summaries as pretty-printed JSON.
pub fn print_json(summaries: &[DriverSummary]) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(summaries)?);
    Ok(())
}

/// Returns `<dir>/<name>.csv` (or `.csv.gz`), creating `dir` if needed.
pub fn output_path(dir: &str, name: &str, gzip: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating output directory {dir}"))?;
    let extension = if gzip { "csv.gz" } else { "csv" };
    Ok(Path::new(dir).join(format!("{name}.{extension}")))
}

/// Writes the table's present columns, in canonical order, with a header row.
pub fn write_records(path: &Path, table: &SessionTable, gzip: bool) -> Result<()> {
    let columns: Vec<_> = table.columns().collect();
    let bytes = to_csv_bytes(|wtr| {
        wtr.write_record(columns.iter().map(|c| c.name()))?;
        for row in table.rows() {
            wtr.write_record(columns.iter().map(|c| row.value(*c)))?;
        }
        Ok(())
    })?;

    write_bytes(path, bytes, gzip)?;
    debug!(path = %path.display(), rows = table.len(), columns = columns.len(), "Records written");
    Ok(())
}

/// Writes one CSV row per summary. Nothing but an empty file for no summaries.
pub fn write_summaries(path: &Path, summaries: &[DriverSummary], gzip: bool) -> Result<()> {
    let bytes = to_csv_bytes(|wtr| {
        for summary in summaries {
            wtr.serialize(summary)?;
        }
        Ok(())
    })?;

    write_bytes(path, bytes, gzip)?;
    debug!(path = %path.display(), rows = summaries.len(), "Summaries written");
    Ok(())
}

/// Writes raw vendor records; the header is the union of every record's
/// fields in first-seen order.
pub fn write_raw(path: &Path, records: &[RawRecord], gzip: bool) -> Result<()> {
    let mut fields: Vec<&str> = Vec::new();
    for record in records {
        for key in record.keys() {
            if !fields.contains(&key.as_str()) {
                fields.push(key.as_str());
            }
        }
    }

    let bytes = to_csv_bytes(|wtr| {
        if fields.is_empty() {
            return Ok(());
        }
        wtr.write_record(&fields)?;
        for record in records {
            wtr.write_record(fields.iter().map(|f| cell(record.get(*f))))?;
        }
        Ok(())
    })?;

    write_bytes(path, bytes, gzip)?;
    debug!(
        path = %path.display(),
        rows = records.len(),
        fields = fields.len(),
        "Raw records written"
    );
    Ok(())
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn to_csv_bytes(fill: impl FnOnce(&mut Writer<Vec<u8>>) -> Result<()>) -> Result<Vec<u8>> {
    let mut wtr = Writer::from_writer(Vec::new());
    fill(&mut wtr)?;
    wtr.into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV buffer: {}", e.error()))
}

fn write_bytes(path: &Path, bytes: Vec<u8>, gzip: bool) -> Result<()> {
    let body = if gzip {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&bytes)?;
        encoder.finish()?
    } else {
        bytes
    };
    std::fs::write(path, body).with_context(|| format!("writing {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::types::{Column, SessionResult, SessionType, Status};
    use flate2::read::GzDecoder;
    use std::env;
    use std::fs;
    use std::io::Read;

    fn temp_dir(name: &str) -> String {
        format!("{}/{}", env::temp_dir().display(), name)
    }

    fn summary(name: &str, season: Option<i32>) -> DriverSummary {
        DriverSummary {
            driver_name: name.to_string(),
            season,
            races_completed: 2,
            average_starting_position: 4.5,
            average_finish_position: 3.0,
            finish_percentile_index: Some(75.0),
            finish_rate: 100.0,
            adj_finish_rate: 100.0,
            points_earned: 80,
            points_per_race: 40.0,
            race_performance_index: Some(85.71),
        }
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        print_pretty(&[summary("A", None)]);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        print_json(&[summary("A", None)]).unwrap();
    }

    #[test]
    fn test_output_path_creates_dir() {
        let dir = temp_dir("indycar_rater_test_output_path");
        let _ = fs::remove_dir_all(&dir);

        let path = output_path(&dir, "summary", true).unwrap();

        assert!(Path::new(&dir).is_dir());
        assert!(path.to_string_lossy().ends_with("summary.csv.gz"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_records_only_present_columns() {
        let dir = temp_dir("indycar_rater_test_records");
        let path = output_path(&dir, "records", false).unwrap();
        let mut row = SessionResult::new(3, "Driver, A", SessionType::Race, Status::Running);
        row.finish_percentile = Some(50.0);
        let table = SessionTable::new(
            [Column::Status, Column::EventId, Column::DriverName, Column::FinishPercentile],
            vec![row],
        );

        write_records(&path, &table, false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines[0], "event_id,driver_name,status,finish_percentile");
        assert_eq!(lines[1], "3,\"Driver, A\",Running,50");
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_summaries_with_and_without_season() {
        let dir = temp_dir("indycar_rater_test_summaries");
        let plain = output_path(&dir, "plain", false).unwrap();
        let seasons = output_path(&dir, "seasons", false).unwrap();

        write_summaries(&plain, &[summary("A", None)], false).unwrap();
        write_summaries(&seasons, &[summary("A", Some(2023))], false).unwrap();

        let plain = fs::read_to_string(&plain).unwrap();
        let seasons = fs::read_to_string(&seasons).unwrap();
        assert!(plain.starts_with("driver_name,races_completed,"));
        assert!(seasons.starts_with("driver_name,season,races_completed,"));
        assert!(plain.lines().nth(1).unwrap().ends_with(",85.71"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_gzip_round_trips() {
        let dir = temp_dir("indycar_rater_test_gzip");
        let path = output_path(&dir, "summary", true).unwrap();

        write_summaries(&path, &[summary("A", None)], true).unwrap();

        let mut decoded = String::new();
        GzDecoder::new(fs::File::open(&path).unwrap())
            .read_to_string(&mut decoded)
            .unwrap();
        assert!(decoded.starts_with("driver_name,"));
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_write_raw_union_of_fields() {
        let dir = temp_dir("indycar_rater_test_raw");
        let path = output_path(&dir, "raw", false).unwrap();
        let records: Vec<RawRecord> = vec![
            serde_json::from_str(r#"{"EventID": 1, "DriverName": "A"}"#).unwrap(),
            serde_json::from_str(r#"{"EventID": 2, "BestSpeed": 201.5, "DriverName": null}"#)
                .unwrap(),
        ];

        write_raw(&path, &records, false).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        // record keys iterate in sorted order
        assert_eq!(lines, vec!["DriverName,EventID,BestSpeed", "A,1,", ",2,201.5"]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
