//! Data types shared by the normalizer, the metric stages and the aggregator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::error::AnalysisError;

/// Kind of on-track session, canonicalized to its single-letter code.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SessionType {
    #[default]
    Race,
    Practice,
    Qualifying,
    Warmup,
}

impl SessionType {
    pub fn code(self) -> &'static str {
        match self {
            SessionType::Race => "R",
            SessionType::Practice => "P",
            SessionType::Qualifying => "Q",
            SessionType::Warmup => "W",
        }
    }

    /// Fragment the IndyStats API uses in session names, e.g. "Qualifications".
    pub fn name_fragment(self) -> &'static str {
        match self {
            SessionType::Race => "Race",
            SessionType::Practice => "Practice",
            SessionType::Qualifying => "Qualif",
            SessionType::Warmup => "Warm",
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SessionType {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "r" | "race" => Ok(SessionType::Race),
            "p" | "practice" => Ok(SessionType::Practice),
            "q" | "qualifying" | "qualification" | "qualifications" => {
                Ok(SessionType::Qualifying)
            }
            "w" | "warmup" | "warm-up" => Ok(SessionType::Warmup),
            _ => Err(AnalysisError::InvalidSessionType(s.to_string())),
        }
    }
}

/// Session-type selector: `R`, `P`, `Q`, `W` or `All`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum SessionFilter {
    All,
    Only(SessionType),
}

impl SessionFilter {
    pub fn matches(self, session_type: SessionType) -> bool {
        match self {
            SessionFilter::All => true,
            SessionFilter::Only(wanted) => wanted == session_type,
        }
    }
}

impl Default for SessionFilter {
    fn default() -> Self {
        SessionFilter::Only(SessionType::Race)
    }
}

impl fmt::Display for SessionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionFilter::All => f.write_str("All"),
            SessionFilter::Only(t) => t.fmt(f),
        }
    }
}

impl FromStr for SessionFilter {
    type Err = AnalysisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(SessionFilter::All)
        } else {
            s.parse().map(SessionFilter::Only)
        }
    }
}

impl TryFrom<String> for SessionFilter {
    type Error = AnalysisError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Terminal state of a driver's session.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// Finished under power.
    #[default]
    Running,
    Mechanical,
    Other(String),
}

impl Status {
    pub fn is_running(&self) -> bool {
        matches!(self, Status::Running)
    }

    pub fn is_mechanical(&self) -> bool {
        matches!(self, Status::Mechanical)
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        match s.trim() {
            "Running" => Status::Running,
            "Mechanical" => Status::Mechanical,
            other => Status::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Running => f.write_str("Running"),
            Status::Mechanical => f.write_str("Mechanical"),
            Status::Other(s) => f.write_str(s),
        }
    }
}

/// Every canonical column a [`SessionTable`] can carry, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    EventId,
    EventsSessionsId,
    Season,
    EventName,
    EventDate,
    EventType,
    TrackName,
    TrackType,
    SessionType,
    DriverName,
    DriversId,
    CarNumber,
    PositionStart,
    PositionFinish,
    Status,
    LapsComplete,
    LapsLed,
    TimesLed,
    PitStops,
    BestLapTime,
    BestSpeed,
    ElapsedTime,
    PointsEarned,
    IsDeleted,
    RunningCars,
    PositionFinishOnly,
    FinishPercentile,
    BestLapPercentage,
    PositionChange,
}

impl Column {
    pub const ALL: [Column; 29] = [
        Column::EventId,
        Column::EventsSessionsId,
        Column::Season,
        Column::EventName,
        Column::EventDate,
        Column::EventType,
        Column::TrackName,
        Column::TrackType,
        Column::SessionType,
        Column::DriverName,
        Column::DriversId,
        Column::CarNumber,
        Column::PositionStart,
        Column::PositionFinish,
        Column::Status,
        Column::LapsComplete,
        Column::LapsLed,
        Column::TimesLed,
        Column::PitStops,
        Column::BestLapTime,
        Column::BestSpeed,
        Column::ElapsedTime,
        Column::PointsEarned,
        Column::IsDeleted,
        Column::RunningCars,
        Column::PositionFinishOnly,
        Column::FinishPercentile,
        Column::BestLapPercentage,
        Column::PositionChange,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::EventId => "event_id",
            Column::EventsSessionsId => "events_sessions_id",
            Column::Season => "season",
            Column::EventName => "event_name",
            Column::EventDate => "event_date",
            Column::EventType => "event_type",
            Column::TrackName => "track_name",
            Column::TrackType => "track_type",
            Column::SessionType => "session_type",
            Column::DriverName => "driver_name",
            Column::DriversId => "drivers_id",
            Column::CarNumber => "car_number",
            Column::PositionStart => "position_start",
            Column::PositionFinish => "position_finish",
            Column::Status => "status",
            Column::LapsComplete => "laps_complete",
            Column::LapsLed => "laps_led",
            Column::TimesLed => "times_led",
            Column::PitStops => "pit_stops",
            Column::BestLapTime => "best_lap_time",
            Column::BestSpeed => "best_speed",
            Column::ElapsedTime => "elapsed_time",
            Column::PointsEarned => "points_earned",
            Column::IsDeleted => "is_deleted",
            Column::RunningCars => "running_cars",
            Column::PositionFinishOnly => "position_finish_only",
            Column::FinishPercentile => "finish_percentile",
            Column::BestLapPercentage => "best_lap_percentage",
            Column::PositionChange => "position_change",
        }
    }

    /// Field name in the IndyStats payload; `None` for derived columns.
    pub fn source_field(self) -> Option<&'static str> {
        let field = match self {
            Column::EventId => "EventID",
            Column::EventsSessionsId => "EventsSessionsID",
            Column::Season => "Season",
            Column::EventName => "EventName",
            Column::EventDate => "EventDate",
            Column::EventType => "EventType",
            Column::TrackName => "TrackName",
            Column::TrackType => "TrackType",
            Column::SessionType => "SessionType",
            Column::DriverName => "DriverName",
            Column::DriversId => "DriversID",
            Column::CarNumber => "CarNumber",
            Column::PositionStart => "PositionStart",
            Column::PositionFinish => "PositionFinish",
            Column::Status => "Status",
            Column::LapsComplete => "LapsComplete",
            Column::LapsLed => "LapsLed",
            Column::TimesLed => "TimesLed",
            Column::PitStops => "PitStops",
            Column::BestLapTime => "BestLapTime",
            Column::BestSpeed => "BestSpeed",
            Column::ElapsedTime => "ElapsedTime",
            Column::PointsEarned => "PointsEarned",
            Column::IsDeleted => "IsDeleted",
            _ => return None,
        };
        Some(field)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One row per (driver, session), plus the columns the metric stages derive.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SessionResult {
    pub event_id: i64,
    pub events_sessions_id: Option<i64>,
    pub season: Option<i32>,
    pub event_name: Option<String>,
    pub event_date: Option<String>,
    pub event_type: Option<String>,
    pub track_name: Option<String>,
    pub track_type: Option<String>,
    pub session_type: SessionType,
    pub driver_name: String,
    pub drivers_id: Option<i64>,
    pub car_number: Option<String>,
    pub position_start: i64,
    pub position_finish: i64,
    pub status: Status,
    pub laps_complete: Option<i64>,
    pub laps_led: i64,
    pub times_led: i64,
    pub pit_stops: i64,
    pub best_lap_time: Option<String>,
    pub best_speed: Option<f64>,
    pub elapsed_time: Option<String>,
    pub points_earned: i64,
    pub is_deleted: Option<bool>,

    // derived
    pub running_cars: Option<u32>,
    pub position_finish_only: Option<u32>,
    pub finish_percentile: Option<f64>,
    pub best_lap_percentage: Option<f64>,
    pub position_change: Option<i64>,
}

impl SessionResult {
    pub fn new(
        event_id: i64,
        driver_name: &str,
        session_type: SessionType,
        status: Status,
    ) -> Self {
        SessionResult {
            event_id,
            driver_name: driver_name.to_string(),
            session_type,
            status,
            ..Default::default()
        }
    }

    /// Renders one cell for tabular output; absent values render empty.
    pub fn value(&self, column: Column) -> String {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(T::to_string).unwrap_or_default()
        }

        match column {
            Column::EventId => self.event_id.to_string(),
            Column::EventsSessionsId => opt(&self.events_sessions_id),
            Column::Season => opt(&self.season),
            Column::EventName => opt(&self.event_name),
            Column::EventDate => opt(&self.event_date),
            Column::EventType => opt(&self.event_type),
            Column::TrackName => opt(&self.track_name),
            Column::TrackType => opt(&self.track_type),
            Column::SessionType => self.session_type.to_string(),
            Column::DriverName => self.driver_name.clone(),
            Column::DriversId => opt(&self.drivers_id),
            Column::CarNumber => opt(&self.car_number),
            Column::PositionStart => self.position_start.to_string(),
            Column::PositionFinish => self.position_finish.to_string(),
            Column::Status => self.status.to_string(),
            Column::LapsComplete => opt(&self.laps_complete),
            Column::LapsLed => self.laps_led.to_string(),
            Column::TimesLed => self.times_led.to_string(),
            Column::PitStops => self.pit_stops.to_string(),
            Column::BestLapTime => opt(&self.best_lap_time),
            Column::BestSpeed => opt(&self.best_speed),
            Column::ElapsedTime => opt(&self.elapsed_time),
            Column::PointsEarned => self.points_earned.to_string(),
            Column::IsDeleted => opt(&self.is_deleted),
            Column::RunningCars => opt(&self.running_cars),
            Column::PositionFinishOnly => opt(&self.position_finish_only),
            Column::FinishPercentile => opt(&self.finish_percentile),
            Column::BestLapPercentage => opt(&self.best_lap_percentage),
            Column::PositionChange => opt(&self.position_change),
        }
    }
}

/// Rows plus the set of columns they carry.
///
/// A column outside the set is treated as absent even if the row struct has a
/// default value for it; stages check the set before reading.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionTable {
    columns: BTreeSet<Column>,
    rows: Vec<SessionResult>,
}

impl SessionTable {
    pub fn new(columns: impl IntoIterator<Item = Column>, rows: Vec<SessionResult>) -> Self {
        SessionTable {
            columns: columns.into_iter().collect(),
            rows,
        }
    }

    /// Marks `column` present, for seeding a table before running a single stage.
    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.insert(column);
        self
    }

    pub fn has(&self, column: Column) -> bool {
        self.columns.contains(&column)
    }

    /// Present columns in canonical order.
    pub fn columns(&self) -> impl Iterator<Item = Column> + '_ {
        self.columns.iter().copied()
    }

    pub(crate) fn schema(&self) -> &BTreeSet<Column> {
        &self.columns
    }

    pub fn rows(&self) -> &[SessionResult] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut [SessionResult] {
        &mut self.rows
    }

    pub fn into_rows(self) -> Vec<SessionResult> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn insert_column(&mut self, column: Column) {
        self.columns.insert(column);
    }

    pub(crate) fn remove_column(&mut self, column: Column) {
        self.columns.remove(&column);
    }

    /// Fails with [`AnalysisError::MissingColumns`] naming every absent column.
    pub fn require(&self, stage: &'static str, columns: &[Column]) -> Result<(), AnalysisError> {
        let missing: Vec<Column> = columns.iter().copied().filter(|c| !self.has(*c)).collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AnalysisError::MissingColumns {
                stage,
                columns: missing,
            })
        }
    }
}

/// Per-driver (optionally per season) aggregate, ranked by `race_performance_index`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DriverSummary {
    pub driver_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season: Option<i32>,
    pub races_completed: u32,
    pub average_starting_position: f64,
    pub average_finish_position: f64,
    pub finish_percentile_index: Option<f64>,
    pub finish_rate: f64,
    pub adj_finish_rate: f64,
    pub points_earned: i64,
    pub points_per_race: f64,
    pub race_performance_index: Option<f64>,
}

/// A distinct driver seen in the records.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DriverIdentity {
    pub driver_name: String,
    pub drivers_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_type_accepts_codes_and_words() {
        assert_eq!("R".parse::<SessionType>().unwrap(), SessionType::Race);
        assert_eq!("race".parse::<SessionType>().unwrap(), SessionType::Race);
        assert_eq!(
            "Qualifications".parse::<SessionType>().unwrap(),
            SessionType::Qualifying
        );
        assert_eq!(" w ".parse::<SessionType>().unwrap(), SessionType::Warmup);
        assert!("X".parse::<SessionType>().is_err());
    }

    #[test]
    fn test_session_filter_parse() {
        assert_eq!("All".parse::<SessionFilter>().unwrap(), SessionFilter::All);
        assert_eq!("all".parse::<SessionFilter>().unwrap(), SessionFilter::All);
        assert_eq!(
            "P".parse::<SessionFilter>().unwrap(),
            SessionFilter::Only(SessionType::Practice)
        );
        assert!("Sprint".parse::<SessionFilter>().is_err());
    }

    #[test]
    fn test_session_filter_matches() {
        assert!(SessionFilter::All.matches(SessionType::Warmup));
        assert!(SessionFilter::Only(SessionType::Race).matches(SessionType::Race));
        assert!(!SessionFilter::Only(SessionType::Race).matches(SessionType::Qualifying));
    }

    #[test]
    fn test_status_from_trimmed_text() {
        assert_eq!(Status::from(" Running "), Status::Running);
        assert_eq!(Status::from("Mechanical"), Status::Mechanical);
        assert_eq!(
            Status::from("Contact "),
            Status::Other("Contact".to_string())
        );
        assert_eq!(Status::from("Contact").to_string(), "Contact");
    }

    #[test]
    fn test_columns_iterate_in_canonical_order() {
        let table = SessionTable::new(
            [Column::Status, Column::EventId, Column::DriverName],
            vec![],
        );
        let cols: Vec<_> = table.columns().collect();
        assert_eq!(cols, vec![Column::EventId, Column::DriverName, Column::Status]);
    }

    #[test]
    fn test_require_reports_only_missing_columns() {
        let table = SessionTable::new([Column::Status], vec![]);
        let err = table
            .require("x", &[Column::Status, Column::EventId, Column::BestSpeed])
            .unwrap_err();
        match err {
            AnalysisError::MissingColumns { stage, columns } => {
                assert_eq!(stage, "x");
                assert_eq!(columns, vec![Column::EventId, Column::BestSpeed]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_value_renders_absent_as_empty() {
        let row = SessionResult::new(7, "Driver A", SessionType::Race, Status::Running);
        assert_eq!(row.value(Column::EventId), "7");
        assert_eq!(row.value(Column::SessionType), "R");
        assert_eq!(row.value(Column::FinishPercentile), "");
    }

    #[test]
    fn test_every_source_column_has_a_field_name() {
        for col in Column::ALL {
            let derived = col >= Column::RunningCars;
            assert_eq!(col.source_field().is_none(), derived, "{col}");
        }
    }
}
