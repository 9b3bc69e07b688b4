//! Maps raw vendor records onto the canonical [`SessionTable`] schema.

use chrono::{Datelike, NaiveDate};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::debug;

use crate::analyzers::types::{
    Column, SessionFilter, SessionResult, SessionTable, SessionType, Status,
};
use crate::error::AnalysisError;
use crate::parser::RawRecord;

const REQUIRED: [Column; 4] = [
    Column::EventId,
    Column::DriverName,
    Column::SessionType,
    Column::Status,
];

const EVENT_DATE_FORMAT: &str = "%m/%d/%Y";

/// Builds the canonical table from raw records.
///
/// Rows outside `filter` are skipped, including rows whose session type is
/// missing or unknown when `filter` names a session type. Status is trimmed, integer fields
/// default to 0, `best_speed` is coerced to a float, and the season is derived
/// from the event date when the record carries none. Columns that are empty
/// across every kept row are left out of the schema, as is `is_deleted` when
/// its non-null values are all the same.
///
/// Fields are looked up by vendor name first (`PositionFinish`) and then by
/// canonical name (`position_finish`).
///
/// # Errors
///
/// [`AnalysisError::MissingField`] when a required field is absent from every
/// record; [`AnalysisError::InvalidValue`] when a kept row's event id is
/// missing, a numeric field cannot be coerced, or, with
/// [`SessionFilter::All`], a session type is missing or unknown.
pub fn normalize(raw: &[RawRecord], filter: SessionFilter) -> Result<SessionTable, AnalysisError> {
    if !raw.is_empty() {
        for column in REQUIRED {
            if raw.iter().all(|r| lookup(r, column).is_none()) {
                return Err(AnalysisError::MissingField(field_name(column)));
            }
        }
    }

    let mut seen: BTreeSet<Column> = REQUIRED.into_iter().collect();
    let mut rows = Vec::new();

    for (index, record) in raw.iter().enumerate() {
        let mut reader = RowReader {
            raw: record,
            index,
            seen: &mut seen,
        };
        if let Some(row) = reader.read(filter)? {
            rows.push(row);
        }
    }

    drop_constant_deleted_flag(&mut seen, &mut rows);

    let dropped: Vec<&str> = Column::ALL
        .iter()
        .filter(|c| c.source_field().is_some() && !seen.contains(c))
        .map(|c| c.name())
        .collect();
    debug!(
        input = raw.len(),
        kept = rows.len(),
        filter = %filter,
        ?dropped,
        "Records normalized"
    );

    Ok(SessionTable::new(seen, rows))
}

fn drop_constant_deleted_flag(seen: &mut BTreeSet<Column>, rows: &mut [SessionResult]) {
    if !seen.contains(&Column::IsDeleted) {
        return;
    }
    let distinct: BTreeSet<bool> = rows.iter().filter_map(|r| r.is_deleted).collect();
    if distinct.len() <= 1 {
        seen.remove(&Column::IsDeleted);
        for row in rows.iter_mut() {
            row.is_deleted = None;
        }
    }
}

fn lookup(raw: &RawRecord, column: Column) -> Option<&Value> {
    column
        .source_field()
        .and_then(|field| raw.get(field))
        .filter(|v| !v.is_null())
        .or_else(|| raw.get(column.name()).filter(|v| !v.is_null()))
}

fn field_name(column: Column) -> &'static str {
    column.source_field().unwrap_or(column.name())
}

/// Reads one record, marking every column it finds a value for.
struct RowReader<'a> {
    raw: &'a RawRecord,
    index: usize,
    seen: &'a mut BTreeSet<Column>,
}

impl<'a> RowReader<'a> {
    fn read(&mut self, filter: SessionFilter) -> Result<Option<SessionResult>, AnalysisError> {
        let parsed = match self.text(Column::SessionType) {
            Some(text) => text
                .parse::<SessionType>()
                .map_err(|_| self.invalid(Column::SessionType, text)),
            None => Err(self.invalid(Column::SessionType, String::new())),
        };
        let session_type = match (parsed, filter) {
            (Ok(session_type), _) => session_type,
            // an unknown session type never matches a specific one
            (Err(e), SessionFilter::Only(_)) => {
                debug!(error = %e, "Skipping row with unknown session type");
                return Ok(None);
            }
            (Err(e), SessionFilter::All) => return Err(e),
        };
        if !filter.matches(session_type) {
            return Ok(None);
        }

        let event_id = self
            .int(Column::EventId)?
            .ok_or_else(|| self.invalid(Column::EventId, String::new()))?;
        let event_date = self.text(Column::EventDate);
        let season = match self.int(Column::Season)? {
            Some(season) => Some(season as i32),
            None => event_date.as_deref().and_then(season_from_date),
        };
        if season.is_some() {
            self.seen.insert(Column::Season);
        }

        Ok(Some(SessionResult {
            event_id,
            events_sessions_id: self.int(Column::EventsSessionsId)?,
            season,
            event_name: self.text(Column::EventName),
            event_date,
            event_type: self.text(Column::EventType),
            track_name: self.text(Column::TrackName),
            track_type: self.text(Column::TrackType),
            session_type,
            driver_name: self.text(Column::DriverName).unwrap_or_default(),
            drivers_id: self.int(Column::DriversId)?,
            car_number: self.text(Column::CarNumber),
            position_start: self.int(Column::PositionStart)?.unwrap_or(0),
            position_finish: self.int(Column::PositionFinish)?.unwrap_or(0),
            status: Status::from(self.text(Column::Status).unwrap_or_default().as_str()),
            laps_complete: self.int(Column::LapsComplete)?,
            laps_led: self.int(Column::LapsLed)?.unwrap_or(0),
            times_led: self.int(Column::TimesLed)?.unwrap_or(0),
            pit_stops: self.int(Column::PitStops)?.unwrap_or(0),
            best_lap_time: self.text(Column::BestLapTime),
            best_speed: self.float(Column::BestSpeed)?,
            elapsed_time: self.text(Column::ElapsedTime),
            points_earned: self.int(Column::PointsEarned)?.unwrap_or(0),
            is_deleted: self.flag(Column::IsDeleted)?,
            ..Default::default()
        }))
    }

    fn value(&mut self, column: Column) -> Option<&'a Value> {
        let value = lookup(self.raw, column)?;
        self.seen.insert(column);
        Some(value)
    }

    fn invalid(&self, column: Column, value: String) -> AnalysisError {
        AnalysisError::InvalidValue {
            row: self.index,
            field: field_name(column),
            value,
        }
    }

    fn text(&mut self, column: Column) -> Option<String> {
        match self.value(column)? {
            Value::String(s) => Some(s.trim().to_string()),
            other => Some(display(other)),
        }
    }

    fn int(&mut self, column: Column) -> Result<Option<i64>, AnalysisError> {
        let Some(value) = self.value(column) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
            Value::String(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(integral))
            }
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| self.invalid(column, display(value)))
    }

    fn float(&mut self, column: Column) -> Result<Option<f64>, AnalysisError> {
        let Some(value) = self.value(column) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| self.invalid(column, display(value)))
    }

    fn flag(&mut self, column: Column) -> Result<Option<bool>, AnalysisError> {
        let Some(value) = self.value(column) else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_i64().map(|n| n != 0),
            Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| self.invalid(column, display(value)))
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn integral(f: f64) -> Option<i64> {
    (f.fract() == 0.0 && f.is_finite()).then_some(f as i64)
}

/// Year of an IndyStats date such as `5/28/2023` or `5/28/2023 12:00:00 PM`.
pub fn season_from_date(date: &str) -> Option<i32> {
    let day = date.split_whitespace().next()?;
    NaiveDate::parse_from_str(day, EVENT_DATE_FORMAT)
        .ok()
        .map(|d| d.year())
}
