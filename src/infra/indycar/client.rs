use anyhow::Result;
use async_trait::async_trait;
use indycar_rater::fetch::{HttpClient, fetch_json};
use indycar_rater::normalize::season_from_date;
use indycar_rater::parser::RawRecord;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::infra::tracks::TrackLookup;
use crate::services::results_api::{ResultsApi, SessionRef};

const BASE_URL: &str = "https://www.indycar.com/Services/IndyStats.svc";
const SEASON_DROP_DOWN_ID: &str = "b856a4f1-e85c-4fac-8c36-fd58d962227a";

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Season {
    year: Year,
    #[serde(default)]
    events: Vec<Event>,
}

/// The dropdown has served the year both as a number and as a string.
#[derive(Deserialize)]
#[serde(untagged)]
enum Year {
    Number(i32),
    Text(String),
}

impl Year {
    fn value(&self) -> Option<i32> {
        match self {
            Year::Number(y) => Some(*y),
            Year::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Event {
    #[serde(rename = "EventID")]
    event_id: i64,
    event_name: String,
    #[serde(default)]
    sessions: Vec<Session>,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Session {
    #[serde(rename = "EventsSessionID")]
    events_session_id: i64,
    session_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct SessionDetails {
    event_name: String,
    session_date: String,
    session_name: Option<String>,
    session_type: Option<String>,
    track_type: Option<String>,
    #[serde(rename = "records", default)]
    records: Vec<RawRecord>,
}

/// IndyStats client. Every request goes through `http`, so pacing is the
/// transport's concern.
pub struct IndyCarClient<C> {
    http: C,
    base_url: String,
    tracks: TrackLookup,
}

impl<C: HttpClient> IndyCarClient<C> {
    pub fn new(http: C) -> Self {
        Self {
            http,
            base_url: BASE_URL.to_string(),
            tracks: TrackLookup::default(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_tracks(mut self, tracks: TrackLookup) -> Self {
        self.tracks = tracks;
        self
    }
}

#[async_trait]
impl<C: HttpClient> ResultsApi for IndyCarClient<C> {
    async fn list_sessions(&self, from_year: i32, to_year: i32) -> Result<Vec<SessionRef>> {
        let url = format!("{}/SeasonDropDown?id={}", self.base_url, SEASON_DROP_DOWN_ID);
        let seasons: Vec<Season> = fetch_json(&self.http, &url).await?;

        let mut sessions = Vec::new();
        for season in seasons {
            let Some(year) = season.year.value() else {
                continue;
            };
            if year < from_year || year > to_year {
                continue;
            }
            for event in season.events {
                for session in event.sessions {
                    sessions.push(SessionRef {
                        year,
                        event_id: event.event_id,
                        event_name: event.event_name.clone(),
                        session_id: session.events_session_id,
                        session_name: session.session_name,
                    });
                }
            }
        }

        debug!(from_year, to_year, sessions = sessions.len(), "Sessions listed");
        Ok(sessions)
    }

    async fn session_records(&self, session: &SessionRef) -> Result<Vec<RawRecord>> {
        let url = format!("{}/EventsSessionDetails?id={}", self.base_url, session.session_id);
        let details: SessionDetails = fetch_json(&self.http, &url).await?;

        let track_name = self
            .tracks
            .track_name(&details.event_name)
            .map_or(Value::Null, Value::from);
        let season = season_from_date(&details.session_date).map_or(Value::Null, Value::from);
        let text = |v: &Option<String>| v.clone().map_or(Value::Null, Value::from);

        let records = details
            .records
            .into_iter()
            .map(|mut record| {
                record.insert("EventName".into(), Value::from(details.event_name.as_str()));
                record.insert("TrackName".into(), track_name.clone());
                record.insert("EventDate".into(), Value::from(details.session_date.as_str()));
                record.insert("EventType".into(), text(&details.session_name));
                record.insert("SessionType".into(), text(&details.session_type));
                record.insert("TrackType".into(), text(&details.track_type));
                record.insert("EventID".into(), Value::from(session.session_id));
                record.insert("Season".into(), season.clone());
                record
            })
            .collect::<Vec<_>>();

        debug!(
            session_id = session.session_id,
            records = records.len(),
            "Session records fetched"
        );
        Ok(records)
    }
}
