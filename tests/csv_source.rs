use std::fs;
use std::path::PathBuf;

use patient_dynamics::io::{load_events, read_state_changes, EventSourceError};
use patient_dynamics::{
    ChangeKind, DateConfig, Dynamics, DynamicsBuilder, DynamicsConfig, DynamicsError,
    EventNormalizer,
};

const TABLE: &str = "PatientID,StateName,StateValue,Date,ChangeType\n\
                     P1,Hospital,H1,2017-05-20,+\n\
                     P1,Ward,W1,2017-05-22,+\n\
                     P2,Hospital,H1,2017-05-25,+\n\
                     P2,Ward,W1,2017-05-25,+\n\
                     P1,Ward,,2017-06-01,-\n\
                     P3,Ward,W1,2017-06-20,+\n";

fn write_table(name: &str, contents: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("patient-dynamics-{}", std::process::id()));
    fs::create_dir_all(&dir).expect("create temp dir");
    let path = dir.join(name);
    fs::write(&path, contents).expect("write table");
    path
}

fn normalizer() -> EventNormalizer {
    EventNormalizer::new(DateConfig::with_default_format("2017-06-16").expect("date parses"))
}

#[test]
fn table_round_trips_into_dynamics() {
    let path = write_table("changes.csv", TABLE);
    let raw = read_state_changes(&path).expect("table reads");
    assert_eq!(raw.len(), 6);
    assert_eq!(raw[4].kind, ChangeKind::Deactivate);

    let config = DynamicsConfig::new(Vec::<String>::new()).with_variable_list("Hospital, Ward");
    let dynamics = DynamicsBuilder::new(config)
        .build_from_raw(&normalizer(), &raw)
        .expect("dynamics builds");

    let subjects = dynamics
        .universe()
        .subjects()
        .iter()
        .map(|s| s.to_string())
        .collect::<Vec<_>>();
    assert_eq!(subjects, vec!["P1", "P2", "P3"]);
    // P3's admission lies after the final sample and is dropped.
    assert_eq!(dynamics.epoch_table().epoch_times(), &[14.0, 22.0, 25.0, 27.0]);
    assert_eq!(dynamics.epoch_count(), 4);
    assert_eq!(dynamics.value_at(20.0, "P1", "Ward").expect("known names"), Some("W1"));
    assert_eq!(dynamics.value_at(10.0, "P1", "Ward").expect("known names"), None);
    assert_eq!(dynamics.value_at(10.0, "P3", "Ward").expect("known names"), None);
}

#[test]
fn load_events_reports_bad_dates() {
    let path = write_table(
        "bad_date.csv",
        "PatientID,StateName,StateValue,Date,ChangeType\nP1,Ward,W1,20/05/2017,+\n",
    );
    let err = load_events(&path, &normalizer()).expect_err("date should not parse");
    assert!(matches!(
        err,
        EventSourceError::Dynamics(DynamicsError::MalformedDate { .. })
    ));
}

#[test]
fn missing_file_is_io_error() {
    let err = read_state_changes("/nonexistent/patient-dynamics/changes.csv")
        .expect_err("file does not exist");
    assert!(matches!(err, EventSourceError::Io(_)));
}
