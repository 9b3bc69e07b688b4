//! Trait and types for interacting with a session results provider.

use anyhow::Result;
use indycar_rater::analyzers::types::SessionFilter;
use indycar_rater::parser::RawRecord;
use tracing::{info, warn};

/// A single on-track session listed by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRef {
    pub year: i32,
    pub event_id: i64,
    pub event_name: String,
    pub session_id: i64,
    /// Provider label, e.g. "Race", "Practice 2", "Qualifications".
    pub session_name: String,
}

impl SessionRef {
    /// Matches on the session name, which is all the listing carries.
    pub fn matches(&self, filter: SessionFilter) -> bool {
        match filter {
            SessionFilter::All => true,
            SessionFilter::Only(kind) => self.session_name.contains(kind.name_fragment()),
        }
    }
}

/// Abstraction over a session results provider (e.g., IndyStats).
#[async_trait::async_trait]
pub trait ResultsApi: Send + Sync {
    /// Returns every session of every event in seasons `from_year..=to_year`.
    async fn list_sessions(&self, from_year: i32, to_year: i32) -> Result<Vec<SessionRef>>;

    /// Returns the raw per-driver result records of one session.
    async fn session_records(&self, session: &SessionRef) -> Result<Vec<RawRecord>>;
}

/// Records gathered by [`collect_records`].
#[derive(Debug, Default)]
pub struct Collected {
    pub records: Vec<RawRecord>,
    /// Sessions that failed to download and are missing from `records`.
    pub failed: usize,
}

/// Downloads the records of every matching session, one session at a time.
///
/// A session that fails to download is logged, skipped and counted in
/// [`Collected::failed`]; failing to list sessions fails the whole call.
pub async fn collect_records<A: ResultsApi + ?Sized>(
    api: &A,
    from_year: i32,
    to_year: i32,
    filter: SessionFilter,
) -> Result<Collected> {
    let sessions: Vec<SessionRef> = api
        .list_sessions(from_year, to_year)
        .await?
        .into_iter()
        .filter(|s| s.matches(filter))
        .collect();
    info!(sessions = sessions.len(), %filter, "Downloading session records");

    let mut records = Vec::new();
    let mut failed = 0usize;
    for session in &sessions {
        match api.session_records(session).await {
            Ok(batch) => records.extend(batch),
            Err(e) => {
                failed += 1;
                warn!(
                    session_id = session.session_id,
                    event = %session.event_name,
                    error = %e,
                    "Session download failed, skipping"
                );
            }
        }
    }

    info!(records = records.len(), failed, "Session records downloaded");
    Ok(Collected { records, failed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use indycar_rater::analyzers::types::SessionType;
    use serde_json::json;

    fn session(id: i64, name: &str) -> SessionRef {
        SessionRef {
            year: 2023,
            event_id: 1,
            event_name: "Indianapolis 500".to_string(),
            session_id: id,
            session_name: name.to_string(),
        }
    }

    #[test]
    fn test_session_name_matching() {
        let quali = session(1, "Qualifications");
        let practice = session(2, "Practice 3");
        let warmup = session(3, "Warmup");

        assert!(quali.matches(SessionFilter::Only(SessionType::Qualifying)));
        assert!(!quali.matches(SessionFilter::Only(SessionType::Race)));
        assert!(practice.matches(SessionFilter::Only(SessionType::Practice)));
        assert!(warmup.matches(SessionFilter::Only(SessionType::Warmup)));
        assert!(warmup.matches(SessionFilter::All));
    }

    struct StubApi;

    #[async_trait::async_trait]
    impl ResultsApi for StubApi {
        async fn list_sessions(&self, _from: i32, _to: i32) -> Result<Vec<SessionRef>> {
            Ok(vec![session(10, "Race"), session(11, "Practice 1"), session(12, "Race 2")])
        }

        async fn session_records(&self, session: &SessionRef) -> Result<Vec<RawRecord>> {
            if session.session_id == 12 {
                anyhow::bail!("HTTP 500");
            }
            let record = json!({"EventID": session.session_id, "DriverName": "A"});
            Ok(vec![record.as_object().cloned().unwrap_or_default()])
        }
    }

    #[tokio::test]
    async fn test_collect_records_filters_and_skips_failures() {
        let collected = collect_records(
            &StubApi,
            2023,
            2023,
            SessionFilter::Only(SessionType::Race),
        )
        .await
        .unwrap();

        assert_eq!(collected.records.len(), 1);
        assert_eq!(collected.records[0]["EventID"], json!(10));
        assert_eq!(collected.failed, 1);
    }
}
