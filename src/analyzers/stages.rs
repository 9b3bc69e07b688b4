//! Column-wise enrichment stages.
//!
//! Each stage is a pure function from table to table. A stage checks the
//! columns it reads before touching any row, so it can run on its own against
//! a table seeded with the columns an earlier stage would have produced.

use std::collections::HashMap;
use tracing::debug;

use crate::analyzers::types::{Column, SessionTable, SessionType};
use crate::analyzers::utility::round_to;
use crate::error::AnalysisError;

/// One enrichment step with its declared column dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    RunningCounts,
    FinishedRanking,
    FinishPercentile,
    RelativeBestLap,
    PositionChange,
}

impl Stage {
    /// Every stage in a valid execution order.
    pub const ALL: [Stage; 5] = [
        Stage::RunningCounts,
        Stage::FinishedRanking,
        Stage::FinishPercentile,
        Stage::RelativeBestLap,
        Stage::PositionChange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::RunningCounts => "add_running_counts",
            Stage::FinishedRanking => "add_finished_ranking",
            Stage::FinishPercentile => "add_finish_percentile",
            Stage::RelativeBestLap => "add_relative_best_lap",
            Stage::PositionChange => "add_position_change",
        }
    }

    pub fn requires(self) -> &'static [Column] {
        match self {
            Stage::RunningCounts => &[Column::Status, Column::EventId],
            Stage::FinishedRanking => &[
                Column::RunningCars,
                Column::Status,
                Column::EventId,
                Column::PositionFinish,
            ],
            Stage::FinishPercentile => &[
                Column::RunningCars,
                Column::PositionFinishOnly,
                Column::Status,
            ],
            Stage::RelativeBestLap => &[Column::BestSpeed, Column::EventsSessionsId],
            Stage::PositionChange => &[
                Column::SessionType,
                Column::PositionStart,
                Column::PositionFinish,
            ],
        }
    }

    pub fn produces(self) -> &'static [Column] {
        match self {
            Stage::RunningCounts => &[Column::RunningCars],
            Stage::FinishedRanking => &[Column::PositionFinishOnly],
            Stage::FinishPercentile => &[Column::FinishPercentile],
            Stage::RelativeBestLap => &[Column::BestLapPercentage],
            Stage::PositionChange => &[Column::PositionChange],
        }
    }

    /// Intermediate columns consumed and dropped by the stage.
    pub fn removes(self) -> &'static [Column] {
        match self {
            Stage::FinishPercentile => &[Column::PositionFinishOnly],
            _ => &[],
        }
    }

    /// The stage whose output includes `column`, if any.
    pub fn producing(column: Column) -> Option<Stage> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.produces().contains(&column))
    }

    pub fn apply(self, table: SessionTable) -> Result<SessionTable, AnalysisError> {
        match self {
            Stage::RunningCounts => add_running_counts(table),
            Stage::FinishedRanking => add_finished_ranking(table),
            Stage::FinishPercentile => add_finish_percentile(table),
            Stage::RelativeBestLap => add_relative_best_lap(table),
            Stage::PositionChange => add_position_change(table),
        }
    }

    fn check(self, table: &SessionTable) -> Result<(), AnalysisError> {
        table.require(self.name(), self.requires())
    }
}

/// Adds `running_cars`: the number of `Running` rows sharing the row's `event_id`.
pub fn add_running_counts(mut table: SessionTable) -> Result<SessionTable, AnalysisError> {
    Stage::RunningCounts.check(&table)?;

    let mut counts: HashMap<i64, u32> = HashMap::new();
    for row in table.rows().iter().filter(|r| r.status.is_running()) {
        *counts.entry(row.event_id).or_default() += 1;
    }

    for row in table.rows_mut() {
        row.running_cars = Some(counts.get(&row.event_id).copied().unwrap_or(0));
    }
    table.insert_column(Column::RunningCars);

    debug!(events = counts.len(), rows = table.len(), "Running counts added");
    Ok(table)
}

/// Adds `position_finish_only`: the finishing rank among `Running` rows of the
/// same event, with tied positions sharing the lowest rank (1, 2, 2, 4).
///
/// Rows that did not finish running are left unranked.
pub fn add_finished_ranking(mut table: SessionTable) -> Result<SessionTable, AnalysisError> {
    Stage::FinishedRanking.check(&table)?;

    let mut finishes: HashMap<i64, Vec<i64>> = HashMap::new();
    for row in table.rows().iter().filter(|r| r.status.is_running()) {
        finishes
            .entry(row.event_id)
            .or_default()
            .push(row.position_finish);
    }
    for positions in finishes.values_mut() {
        positions.sort_unstable();
    }

    for row in table.rows_mut() {
        row.position_finish_only = if row.status.is_running() {
            finishes.get(&row.event_id).map(|positions| {
                let ahead = positions.partition_point(|p| *p < row.position_finish);
                ahead as u32 + 1
            })
        } else {
            None
        };
    }
    table.insert_column(Column::PositionFinishOnly);

    debug!(events = finishes.len(), "Finished ranking added");
    Ok(table)
}

/// Adds `finish_percentile` for `Running` rows:
/// `(running_cars - rank) / (running_cars - 1) * 100`, rounded to 2 decimals.
///
/// Events with a single running car have no percentile. Consumes
/// `position_finish_only`.
pub fn add_finish_percentile(mut table: SessionTable) -> Result<SessionTable, AnalysisError> {
    Stage::FinishPercentile.check(&table)?;

    let mut undefined = 0usize;
    for row in table.rows_mut() {
        let running = row.status.is_running();
        row.finish_percentile = match (running, row.running_cars, row.position_finish_only) {
            (true, Some(cars), Some(rank)) if cars > 1 => {
                let cars = f64::from(cars);
                Some(round_to((cars - f64::from(rank)) / (cars - 1.0) * 100.0, 2))
            }
            (true, _, _) => {
                undefined += 1;
                None
            }
            _ => None,
        };
        row.position_finish_only = None;
    }
    table.insert_column(Column::FinishPercentile);
    table.remove_column(Column::PositionFinishOnly);

    debug!(undefined, "Finish percentile added");
    Ok(table)
}

/// Adds `best_lap_percentage`: the row's `best_speed` as a percentage of the
/// fastest `best_speed` in the same `events_sessions_id`, rounded to 2 decimals.
///
/// Rows without a speed or a session id, and sessions whose fastest speed is
/// not positive, get no percentage.
pub fn add_relative_best_lap(mut table: SessionTable) -> Result<SessionTable, AnalysisError> {
    Stage::RelativeBestLap.check(&table)?;

    let mut fastest: HashMap<i64, f64> = HashMap::new();
    for row in table.rows() {
        if let (Some(session), Some(speed)) = (row.events_sessions_id, row.best_speed) {
            fastest
                .entry(session)
                .and_modify(|best| *best = best.max(speed))
                .or_insert(speed);
        }
    }

    for row in table.rows_mut() {
        let best = row
            .events_sessions_id
            .and_then(|session| fastest.get(&session).copied());
        row.best_lap_percentage = match (row.best_speed, best) {
            (Some(speed), Some(best)) if best > 0.0 => Some(round_to(speed / best * 100.0, 2)),
            _ => None,
        };
    }
    table.insert_column(Column::BestLapPercentage);

    debug!(sessions = fastest.len(), "Relative best lap added");
    Ok(table)
}

/// Adds `position_change` (`position_start - position_finish`) for race rows;
/// other session types get none.
pub fn add_position_change(mut table: SessionTable) -> Result<SessionTable, AnalysisError> {
    Stage::PositionChange.check(&table)?;

    for row in table.rows_mut() {
        row.position_change = (row.session_type == SessionType::Race)
            .then(|| row.position_start - row.position_finish);
    }
    table.insert_column(Column::PositionChange);

    Ok(table)
}
