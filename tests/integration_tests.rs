use indycar_rater::analyzers::analyzer::{drivers_in_file, enrich_file, summarize_file};
use indycar_rater::analyzers::types::{Column, SessionFilter, SessionType, Status};
use indycar_rater::config::AnalysisConfig;
use indycar_rater::parser::parse_records_csv;
use indycar_rater::{SummaryOptions, enrich, summarize};

const FIXTURE: &str = "tests/fixtures/sessions_sample.csv";

fn fixture_table(filter: SessionFilter) -> indycar_rater::SessionTable {
    let bytes = include_bytes!("fixtures/sessions_sample.csv");
    let records = parse_records_csv(bytes).expect("Failed to parse fixture");
    indycar_rater::normalize::normalize(&records, filter).expect("Failed to normalize fixture")
}

#[test]
fn test_normalize_fixture() {
    let table = fixture_table(SessionFilter::All);

    assert_eq!(table.len(), 10);
    assert!(!table.has(Column::TrackName), "empty column should be dropped");
    assert!(!table.has(Column::IsDeleted), "constant flag should be dropped");
    assert!(table.has(Column::BestSpeed));
    assert_eq!(table.rows()[0].status, Status::Running);

    let races = fixture_table(SessionFilter::Only(SessionType::Race));
    assert_eq!(races.len(), 8);
}

#[test]
fn test_enrich_fixture() {
    let table = enrich(fixture_table(SessionFilter::All)).expect("Failed to enrich");
    let rows = table.rows();

    // Spring 500: three running cars, two tied on second
    assert!(rows[..4].iter().all(|r| r.running_cars == Some(3)));
    assert_eq!(rows[0].finish_percentile, Some(100.0));
    assert_eq!(rows[1].finish_percentile, Some(50.0));
    assert_eq!(rows[2].finish_percentile, Some(50.0));
    assert_eq!(rows[3].finish_percentile, None);

    assert_eq!(rows[0].best_lap_percentage, Some(100.0));
    assert!(rows[1].best_lap_percentage.unwrap() < 100.0);

    assert_eq!(rows[0].position_change, Some(1));
    assert_eq!(rows[2].position_change, Some(3));
    assert_eq!(rows[8].position_change, None, "practice rows have no change");
    assert_eq!(rows[9].best_lap_percentage, Some(100.0));
}

#[test]
fn test_summary_fixture() {
    let summaries = summarize(
        fixture_table(SessionFilter::All),
        &SummaryOptions::default(),
    )
    .expect("Failed to summarize");

    assert_eq!(summaries.len(), 4);
    let names: Vec<_> = summaries.iter().map(|s| s.driver_name.as_str()).collect();
    // A and D tie on 66.67 and keep name order
    assert_eq!(names, vec!["Driver B", "Driver A", "Driver D", "Driver C"]);
    assert_eq!(summaries[0].race_performance_index, Some(85.71));
    assert_eq!(summaries[3].race_performance_index, Some(40.0));

    let a = &summaries[1];
    assert_eq!(a.races_completed, 2, "practice rows are not counted");
    assert_eq!(a.finish_rate, 50.0);
    assert_eq!(a.adj_finish_rate, 50.0);
    assert_eq!(a.points_earned, 63);
    assert_eq!(a.points_per_race, 31.5);
    assert_eq!(a.finish_percentile_index, Some(100.0));
    assert_eq!(a.race_performance_index, Some(66.67));

    let d = &summaries[2];
    assert_eq!(d.finish_rate, 50.0);
    assert_eq!(d.adj_finish_rate, 100.0);
    assert_eq!(d.finish_percentile_index, Some(50.0));
    assert_eq!(d.race_performance_index, Some(66.67));

    for pair in summaries.windows(2) {
        assert!(pair[0].race_performance_index >= pair[1].race_performance_index);
    }
}

#[test]
fn test_file_round_trip() {
    let out = format!("{}/indycar_rater_it", std::env::temp_dir().display());
    let _ = std::fs::remove_dir_all(&out);

    let enriched = enrich_file(FIXTURE, SessionFilter::All, &out, false).expect("enrich_file");
    let content = std::fs::read_to_string(&enriched).unwrap();
    let header = content.lines().next().unwrap();
    assert!(enriched.ends_with("sessions_sample_enriched.csv"));
    assert!(header.contains("finish_percentile"));
    assert!(!header.contains("position_finish_only"));

    let config = AnalysisConfig {
        summary: SummaryOptions {
            by_season: true,
            min_races: 2,
        },
        ..AnalysisConfig::default()
    };
    let (path, summaries) = summarize_file(FIXTURE, &config, &out, true).expect("summarize_file");
    assert!(path.to_string_lossy().ends_with("sessions_sample_rpi_by_season.csv.gz"));
    assert_eq!(summaries.len(), 4);
    assert!(summaries.iter().all(|s| s.season == Some(2023)));

    let drivers = drivers_in_file(FIXTURE, SessionFilter::All).expect("drivers_in_file");
    assert_eq!(drivers.len(), 4);
    assert_eq!(drivers[0].drivers_id, Some(101));

    std::fs::remove_dir_all(&out).unwrap();
}
