use crate::analyzers::pipeline::Pipeline;
use crate::analyzers::types::{
    Column, DriverIdentity, DriverSummary, SessionResult, SessionTable, SessionType,
};
use crate::analyzers::utility::{harmonic_mean, mean, pct, round_to};
use crate::error::AnalysisError;
use serde::Deserialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Grouping and filtering applied by [`summarize`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SummaryOptions {
    /// Group by `(season, driver_name)` instead of `driver_name` alone.
    pub by_season: bool,
    /// Drop groups with fewer races than this; 0 keeps every group.
    pub min_races: u32,
}

/// Aggregates race rows into one [`DriverSummary`] per driver (or per season
/// and driver), ranked best first by `race_performance_index`.
///
/// Runs the percentile stages first when `finish_percentile` is absent.
/// Practice, qualifying and warmup rows never contribute.
pub fn summarize(
    table: SessionTable,
    options: &SummaryOptions,
) -> Result<Vec<DriverSummary>, AnalysisError> {
    let table = if table.has(Column::FinishPercentile) {
        table
    } else {
        Pipeline::resolve(&[Column::FinishPercentile], table.schema()).run(table)?
    };

    let mut required = vec![
        Column::SessionType,
        Column::DriverName,
        Column::Status,
        Column::PositionStart,
        Column::PositionFinish,
        Column::PointsEarned,
        Column::FinishPercentile,
    ];
    if options.by_season {
        required.push(Column::Season);
    }
    table.require("summarize", &required)?;

    let mut groups: BTreeMap<(Option<i32>, &str), Vec<&SessionResult>> = BTreeMap::new();
    let mut seasonless = 0usize;
    for row in table
        .rows()
        .iter()
        .filter(|r| r.session_type == SessionType::Race)
    {
        let season = if options.by_season {
            match row.season {
                Some(season) => Some(season),
                None => {
                    seasonless += 1;
                    continue;
                }
            }
        } else {
            None
        };
        groups
            .entry((season, row.driver_name.as_str()))
            .or_default()
            .push(row);
    }

    let group_count = groups.len();
    let mut summaries: Vec<DriverSummary> = groups
        .into_iter()
        .map(|((season, driver_name), rows)| summarize_group(driver_name, season, &rows))
        .filter(|s| options.min_races == 0 || s.races_completed >= options.min_races)
        .collect();

    summaries.sort_by(|a, b| {
        by_index_descending(a.race_performance_index, b.race_performance_index)
    });

    debug!(
        groups = group_count,
        kept = summaries.len(),
        seasonless,
        "Driver summaries computed"
    );
    Ok(summaries)
}

fn summarize_group(
    driver_name: &str,
    season: Option<i32>,
    rows: &[&SessionResult],
) -> DriverSummary {
    let races = rows.len();
    let running = rows.iter().filter(|r| r.status.is_running()).count();
    let mechanical = rows.iter().filter(|r| r.status.is_mechanical()).count();

    let starts: Vec<f64> = rows.iter().map(|r| r.position_start as f64).collect();
    let finishes: Vec<f64> = rows.iter().map(|r| r.position_finish as f64).collect();
    let percentiles: Vec<f64> = rows.iter().filter_map(|r| r.finish_percentile).collect();

    let finish_percentile_index = (!percentiles.is_empty()).then(|| mean(&percentiles));
    let finish_rate = pct(running, races);
    // mechanical failures are not held against the driver
    let adj_finish_rate = pct(running, races - mechanical);

    let points_earned: i64 = rows.iter().map(|r| r.points_earned).sum();
    let points_per_race = round_to(points_earned as f64 / races as f64, 1);

    let race_performance_index =
        finish_percentile_index.map(|fpi| round_to(harmonic_mean(fpi, adj_finish_rate), 2));

    DriverSummary {
        driver_name: driver_name.to_string(),
        season,
        races_completed: races as u32,
        average_starting_position: round_to(mean(&starts), 1),
        average_finish_position: round_to(mean(&finishes), 1),
        finish_percentile_index: finish_percentile_index.map(|v| round_to(v, 2)),
        finish_rate: round_to(finish_rate, 2),
        adj_finish_rate: round_to(adj_finish_rate, 2),
        points_earned,
        points_per_race,
        race_performance_index,
    }
}

/// Descending by index; groups without an index sort last.
fn by_index_descending(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => b.total_cmp(&a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Distinct `(driver_name, drivers_id)` pairs, sorted by name.
pub fn unique_drivers(table: &SessionTable) -> Result<Vec<DriverIdentity>, AnalysisError> {
    table.require("unique_drivers", &[Column::DriverName])?;
    let with_ids = table.has(Column::DriversId);

    let drivers: BTreeSet<DriverIdentity> = table
        .rows()
        .iter()
        .map(|r| DriverIdentity {
            driver_name: r.driver_name.clone(),
            drivers_id: if with_ids { r.drivers_id } else { None },
        })
        .collect();

    Ok(drivers.into_iter().collect())
}
