//! Session-level tests: reports, plans, multi-folder runs

mod helpers;

use geofill_cascade::plan::{folder_plans, parse_plan_document, read_plan_json, PlanDocument};
use geofill_cascade::{ActionKind, CascadeError, PipelineOptions};
use helpers::*;
use serde_json::json;
use std::fs;

#[tokio::test]
async fn test_report_csv_written_with_header() {
    // Given
    let harness = Harness::new();
    harness.add_photo("IMG_1.jpg", 8, Some(PARIS));
    harness.add_photo("IMG_2.jpg", 9, None);

    // When
    let mut session = harness.session(PipelineOptions::default());
    let report = session.run_single(&harness.photos_dir(), None, None).await.unwrap();

    // Then: one CSV row per ledger event
    assert_eq!(report.report_path, harness.report_dir().join("result.csv"));
    let mut reader = csv::Reader::from_path(&report.report_path).unwrap();
    let headers = reader.headers().unwrap().clone();
    assert_eq!(
        headers.iter().collect::<Vec<_>>(),
        vec!["file", "action", "lat", "lon", "source"]
    );
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
    assert_eq!(rows.len(), report.ledger.len());
    assert_eq!(&rows[0][1], "skip_has_gps");
    assert_eq!(&rows[0][2], "48.856600");
    assert_eq!(&rows[rows.len() - 1][1], "write_last_known");

    let summary = report.summary();
    assert!(summary.contains("Files in folder: 2"));
    assert!(summary.contains("skip_has_gps"));
}

#[tokio::test]
async fn test_empty_folder_still_writes_header() {
    let harness = Harness::new();
    let _ = harness.photos_dir();

    let mut session = harness.session(PipelineOptions::default());
    let report = session.run_single(&harness.photos_dir(), None, None).await.unwrap();

    assert!(report.ledger.is_empty());
    let content = fs::read_to_string(&report.report_path).unwrap();
    assert_eq!(content.trim(), "file,action,lat,lon,source");
}

#[tokio::test]
async fn test_plan_issues_become_plan_error_rows() {
    // Given: one malformed entry and one hint that does not geocode
    let harness = Harness::new();
    harness
        .geocoder
        .place("eiffel", EIFFEL_TOWER, "Tour Eiffel, Paris");
    let photo = harness.add_photo("IMG_1.jpg", 8, None);
    let plan = json!([
        {"range": [1, 2], "hint": "Eiffel Tower"},
        {"range": [3], "hint": "Nowhere"},
        {"range": [4, 5], "hint": "Atlantis"}
    ]);

    // When
    let mut session = harness.session(PipelineOptions::default());
    let report = session
        .run_single(&harness.photos_dir(), Some(plan), None)
        .await
        .unwrap();

    // Then: issues recorded first, processing continues
    let plan_rows: Vec<_> = report.ledger.for_file("(plan)").collect();
    assert_eq!(plan_rows.len(), 2);
    assert!(plan_rows.iter().all(|r| r.action == ActionKind::PlanError));
    assert_eq!(plan_rows[0].source, "plan_item_1_invalid_range");
    assert_eq!(plan_rows[1].source, "hint_unresolved:Atlantis");
    assert_eq!(
        final_record(&report.ledger, &photo).action,
        ActionKind::WritePlanSeed
    );
}

#[tokio::test]
async fn test_unavailable_writer_fails_before_processing() {
    let harness = Harness::new();
    harness.add_photo("IMG_1.jpg", 8, None);
    harness.writer.set_available(false);

    let mut session = harness.session(PipelineOptions::default());
    let result = session.run_single(&harness.photos_dir(), None, None).await;

    assert!(matches!(result, Err(CascadeError::Config(_))));
    assert!(harness.vision.calls(VisionCall::Landmark).is_empty());
    assert!(!harness.report_dir().exists());
}

#[tokio::test]
async fn test_dry_run_does_not_need_writer() {
    let harness = Harness::new();
    harness.add_photo("IMG_1.jpg", 8, Some(PARIS));
    harness.add_photo("IMG_2.jpg", 9, None);
    harness.writer.set_available(false);

    let options = PipelineOptions {
        dry_run: true,
        ..PipelineOptions::default()
    };
    let mut session = harness.session(options);
    let report = session.run_single(&harness.photos_dir(), None, None).await.unwrap();

    assert_eq!(report.ledger.count(ActionKind::WriteLastKnown), 1);
    assert!(harness.writer.writes().is_empty());
}

#[tokio::test]
async fn test_missing_folder_is_an_error_in_single_mode() {
    let harness = Harness::new();
    let mut session = harness.session(PipelineOptions::default());

    let result = session
        .run_single(&harness.dir.path().join("absent"), None, None)
        .await;

    assert!(matches!(result, Err(CascadeError::Scan(_))));
}

#[tokio::test]
async fn test_multi_plan_runs_each_folder_independently() {
    // Given: two folders and an entry whose folder does not exist
    let harness = Harness::new();
    harness
        .knowledge_base
        .article("louvre", "Musée du Louvre", "Art museum in Paris", LOUVRE);
    let day1 = harness.folder("day1");
    let day2 = harness.folder("day2");
    harness.add_photo_in(&day1, "D1_1.jpg", 8, Some(MADRID));
    harness.add_photo_in(&day1, "D1_2.jpg", 9, None);
    harness.vision.web_labels("D1_2.jpg", &["Louvre Museum"]);
    harness.fingerprinter.set("D1_2.jpg", 31);
    let reused = harness.add_photo_in(&day2, "D2_1.jpg", 8, None);
    let orphan = harness.add_photo_in(&day2, "D2_2.jpg", 9, None);
    harness.fingerprinter.set("D2_1.jpg", 31);

    let plan = json!([
        {"name": "day1", "tags": []},
        {"name": "missing day", "tags": []},
        {"name": "day2", "tags": []}
    ]);
    let folders = folder_plans(&plan, Some(harness.dir.path())).unwrap();

    // When
    let mut session = harness.session(PipelineOptions::default());
    let reports = session.run_multi(&folders).await.unwrap();

    // Then: the missing folder is skipped and each folder has its own report
    assert_eq!(reports.len(), 2);
    assert_eq!(
        reports[0].report_path,
        harness.report_dir().join("result_day1.csv")
    );
    assert!(reports[1].report_path.exists());

    // The hash cache spans folders
    let day2_ledger = &reports[1].ledger;
    assert_eq!(
        actions_for(day2_ledger, &reused),
        vec!["landmark_empty", "write_phash"]
    );
    // LastKnown does not: folder 1's Madrid GPS is never seen here, photo 2
    // follows the position photo 1 just reused
    assert_eq!(
        final_record(day2_ledger, &orphan).action,
        ActionKind::WriteLastKnown
    );
    assert_eq!(final_record(day2_ledger, &orphan).coordinate, Some(LOUVRE));
    assert!(final_record(day2_ledger, &orphan)
        .source
        .starts_with("assigned_last_known:[phash]"));
}

#[tokio::test]
async fn test_multi_plan_folder_without_seed_has_no_source() {
    let harness = Harness::new();
    let day1 = harness.folder("day1");
    let day2 = harness.folder("day2");
    harness.add_photo_in(&day1, "D1_1.jpg", 8, Some(MADRID));
    let photo = harness.add_photo_in(&day2, "D2_1.jpg", 8, None);

    let plan = json!([
        {"name": "day1", "tags": []},
        {"name": "day2", "tags": []}
    ]);
    let folders = folder_plans(&plan, Some(harness.dir.path())).unwrap();

    let mut session = harness.session(PipelineOptions::default());
    let reports = session.run_multi(&folders).await.unwrap();

    assert_eq!(
        actions_for(&reports[1].ledger, &photo),
        vec!["landmark_empty", "web_empty", "ocr_empty", "skip_no_source"]
    );
}

#[tokio::test]
async fn test_multi_report_named_after_folder_basename() {
    let harness = Harness::new();
    let folder = harness.folder("2024-05-01");
    harness.add_photo_in(&folder, "IMG_1.jpg", 8, Some(PARIS));

    let plan = json!([{
        "name": "Day One: Paris",
        "path": folder.display().to_string(),
        "tags": [{"range": [1, 1]}]
    }]);
    let folders = folder_plans(&plan, None).unwrap();

    let mut session = harness.session(PipelineOptions::default());
    let reports = session.run_multi(&folders).await.unwrap();

    assert_eq!(
        reports[0].report_path,
        harness.report_dir().join("result_2024-05-01.csv")
    );
    let plan_rows: Vec<_> = reports[0].ledger.for_file("(plan)").collect();
    assert_eq!(plan_rows[0].source, "plan_item_0_parse_error");
}

#[test]
fn test_plan_file_detection() {
    let temp = tempfile::TempDir::new().unwrap();
    let single = temp.path().join("single.json");
    let multi = temp.path().join("multi.json");
    fs::write(&single, r#"[{"range": [1, 4], "hint": "Toledo"}]"#).unwrap();
    fs::write(
        &multi,
        r#"[{"name": "Day 1", "path": "", "tags": [{"range": [1, 2], "hint": "Segovia"}]}]"#,
    )
    .unwrap();

    let parsed = parse_plan_document(read_plan_json(&single).unwrap(), None).unwrap();
    assert!(matches!(parsed, PlanDocument::Single(_)));

    let parsed = parse_plan_document(read_plan_json(&multi).unwrap(), Some(temp.path())).unwrap();
    let PlanDocument::Multi(folders) = parsed else {
        panic!("expected a multi-folder plan");
    };
    assert_eq!(folders[0].path, temp.path().join("Day 1"));
    assert_eq!(folders[0].tags[0]["hint"], "Segovia");
}

#[test]
fn test_invalid_plan_files_are_fatal() {
    let temp = tempfile::TempDir::new().unwrap();
    let broken = temp.path().join("broken.json");
    fs::write(&broken, "{not json").unwrap();

    assert!(matches!(read_plan_json(&broken), Err(CascadeError::Input(_))));
    assert!(matches!(
        read_plan_json(&temp.path().join("absent.json")),
        Err(CascadeError::Input(_))
    ));
    assert!(matches!(
        parse_plan_document(json!({"range": [1, 2]}), None),
        Err(CascadeError::Input(_))
    ));
    assert!(matches!(
        parse_plan_document(json!([{"foo": 1}]), None),
        Err(CascadeError::Input(_))
    ));
}
