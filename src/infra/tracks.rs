use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TrackRow {
    event_name: String,
    track_name: String,
}

/// Maps event names to the track they are held at.
///
/// Stored as a `;`-separated file with a header row:
/// ```text
/// EventName;TrackName
/// Indianapolis 500;Indianapolis Motor Speedway
/// Grand Prix of Long Beach;Streets of Long Beach
/// ```
#[derive(Debug, Default)]
pub struct TrackLookup {
    entries: HashMap<String, String>,
}

impl TrackLookup {
    /// Loads the lookup from the file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read(path).with_context(|| format!("reading track lookup {path}"))?;
        Self::from_csv(&content)
    }

    pub fn from_csv(bytes: &[u8]) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .trim(csv::Trim::All)
            .from_reader(bytes);

        let mut entries = HashMap::new();
        for result in rdr.deserialize() {
            let row: TrackRow = result?;
            entries.insert(row.event_name, row.track_name);
        }
        Ok(Self { entries })
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let entries = pairs
            .into_iter()
            .map(|(event, track)| (event.to_string(), track.to_string()))
            .collect();
        Self { entries }
    }

    /// Returns the track for `event_name`, if one is configured.
    pub fn track_name(&self, event_name: &str) -> Option<&str> {
        self.entries.get(event_name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_csv() {
        let lookup = TrackLookup::from_csv(
            b"EventName;TrackName\n\
              Indianapolis 500 ; Indianapolis Motor Speedway\n\
              Grand Prix of Long Beach;Streets of Long Beach\n",
        )
        .unwrap();

        assert_eq!(lookup.len(), 2);
        assert_eq!(
            lookup.track_name("Indianapolis 500"),
            Some("Indianapolis Motor Speedway")
        );
        assert_eq!(lookup.track_name("Unknown"), None);
    }

    #[test]
    fn test_from_csv_missing_column() {
        assert!(TrackLookup::from_csv(b"Event;Track\nA;B\n").is_err());
    }
}
