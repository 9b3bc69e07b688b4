//! Domain errors raised while normalizing and analyzing session records.

use crate::analyzers::types::Column;

/// Validation failures from the normalizer, the metric stages and the aggregator.
///
/// None of these are retried; callers are expected to fail fast and report
/// the offending column or row.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("stage `{stage}` requires missing column(s): {}", join_columns(.columns))]
    MissingColumns {
        stage: &'static str,
        columns: Vec<Column>,
    },
    #[error("required field `{0}` is missing from every record")]
    MissingField(&'static str),
    #[error("record {row}: invalid value {value:?} for field `{field}`")]
    InvalidValue {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error("unknown session type {0:?} (expected R, P, Q, W or All)")]
    InvalidSessionType(String),
}

fn join_columns(columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(", ")
}
