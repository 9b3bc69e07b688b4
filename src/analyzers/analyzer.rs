use crate::analyzers::aggregate::{summarize, unique_drivers};
use crate::analyzers::pipeline::enrich;
use crate::analyzers::types::{DriverIdentity, DriverSummary, SessionFilter, SessionTable};
use crate::config::AnalysisConfig;
use crate::normalize::normalize;
use crate::output::{output_path, write_records, write_summaries};
use crate::parser::{RawRecord, parse_records_csv, parse_records_json};
use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::info;

/// Reads raw records from a `.json`, `.csv` or `.csv.gz` file.
pub fn load_records(path: &str) -> Result<Vec<RawRecord>> {
    let raw = fs::read(path).with_context(|| format!("reading {path}"))?;

    let records = if path.ends_with(".gz") {
        let mut decoded = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut decoded)
            .with_context(|| format!("decompressing {path}"))?;
        parse_by_extension(path.trim_end_matches(".gz"), &decoded)?
    } else {
        parse_by_extension(path, &raw)?
    };

    info!(path, records = records.len(), "Records loaded");
    Ok(records)
}

fn parse_by_extension(path: &str, bytes: &[u8]) -> Result<Vec<RawRecord>> {
    if path.ends_with(".json") {
        parse_records_json(bytes)
    } else {
        parse_records_csv(bytes)
    }
}

/// Loads and normalizes the records in `path`.
pub fn load_table(path: &str, filter: SessionFilter) -> Result<SessionTable> {
    let records = load_records(path)?;
    Ok(normalize(&records, filter)?)
}

/// Enriches the records in `input` and writes `<stem>_enriched.csv[.gz]` to `output_dir`.
pub fn enrich_file(
    input: &str,
    filter: SessionFilter,
    output_dir: &str,
    gzip: bool,
) -> Result<PathBuf> {
    let table = enrich(load_table(input, filter)?)?;

    let path = output_path(output_dir, &format!("{}_enriched", stem(input)), gzip)?;
    write_records(&path, &table, gzip)?;

    info!(path = %path.display(), rows = table.len(), "Enriched records written");
    Ok(path)
}

/// Summarizes the records in `input` and writes `<stem>_rpi.csv[.gz]`
/// (`<stem>_rpi_by_season` when grouping by season) to `output_dir`.
pub fn summarize_file(
    input: &str,
    config: &AnalysisConfig,
    output_dir: &str,
    gzip: bool,
) -> Result<(PathBuf, Vec<DriverSummary>)> {
    let table = load_table(input, config.session_type)?;
    let summaries = summarize(table, &config.summary)?;

    let suffix = if config.summary.by_season {
        "rpi_by_season"
    } else {
        "rpi"
    };
    let path = output_path(output_dir, &format!("{}_{suffix}", stem(input)), gzip)?;
    write_summaries(&path, &summaries, gzip)?;

    info!(path = %path.display(), drivers = summaries.len(), "Driver summaries written");
    Ok((path, summaries))
}

/// Lists the distinct drivers in `input`.
pub fn drivers_in_file(input: &str, filter: SessionFilter) -> Result<Vec<DriverIdentity>> {
    let table = load_table(input, filter)?;
    Ok(unique_drivers(&table)?)
}

/// File name without directory and without `.csv`, `.json` or `.gz` extensions.
fn stem(path: &str) -> String {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("records");
    name.trim_end_matches(".gz")
        .trim_end_matches(".csv")
        .trim_end_matches(".json")
        .to_string()
}
