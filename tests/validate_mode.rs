use anyhow::Result;
use serde_json::json;
use std::io::Write;
use tempfile::NamedTempFile;

use higher_ed_import::error::ImportError;
use higher_ed_import::pipeline::{run_validation, RunState, RunTracker};

fn write_feed(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn clean_feed_has_no_issues() -> Result<()> {
    let feed = write_feed(
        &json!([{
            "name": "Uni A",
            "category": "Public",
            "domains": [{ "domain_name": "CS", "grade": "Licence", "mentions": ["Systems"] }]
        }])
        .to_string(),
    );
    let mut tracker = RunTracker::new();

    let report = run_validation(feed.path(), &mut tracker)?;

    assert!(report.is_valid());
    assert_eq!(report.total_records, 1);
    assert_eq!(tracker.state(), RunState::Validating);
    Ok(())
}

#[test]
fn issues_are_reported_per_record_including_departments() -> Result<()> {
    let feed = write_feed(
        &json!([
            { "name": "Uni A", "category": "Public" },
            { "category": "Public" },
            {
                "name": "Uni B",
                "category": "Privé",
                "departments": [{
                    "name": "Sciences",
                    "domains": [{
                        "domain_name": "Physique",
                        "grade": "",
                        "mentions": ["Optique"],
                        "reference": { "decree_number": "" }
                    }]
                }]
            }
        ])
        .to_string(),
    );
    let mut tracker = RunTracker::new();

    let report = run_validation(feed.path(), &mut tracker)?;

    assert!(!report.is_valid());
    assert_eq!(report.total_records, 3);
    assert_eq!(report.invalid_records(), 2);

    let unnamed = &report.records[0];
    assert_eq!(unnamed.index, 1);
    assert!(unnamed.issues.iter().any(|i| i.contains("name")));

    let uni_b = &report.records[1];
    assert_eq!(uni_b.label, "Uni B");
    assert!(uni_b.issues.iter().any(|i| i.contains("grade")));
    assert!(uni_b.issues.iter().any(|i| i.contains("decree_number")));
    Ok(())
}

#[test]
fn invalid_json_is_fatal() {
    let feed = write_feed("[{\"name\": \"Uni A\",");
    let mut tracker = RunTracker::new();
    let err = run_validation(feed.path(), &mut tracker).unwrap_err();
    assert!(matches!(err, ImportError::Json(_)));
}
