use dumpview_core::api::ProcessResponse;
use dumpview_core::results::{ResultsView, PAGE_SIZE};
use dumpview_core::tagging::{group_rows, merge_results};
use dumpview_core::SearchMetadata;
use serde_json::json;

fn view() -> ResultsView {
    let meta = SearchMetadata::new(
        ["Study Accession", "Study Title", "Run Accession", "Download Links"].iter().map(|s| s.to_string()).collect(),
        serde_json::from_value(json!([
            ["S1", "First", "R1", ["http://x/r1a", "http://x/r1b"]],
            ["S1", "First", "R2", []],
            ["S2", "Second", "R3", "http://x/r3"],
            ["S3", "Third", "R4", null]
        ]))
        .unwrap(),
    );
    let groups = group_rows(&meta, "Study Accession", &["Study Title"]).unwrap();
    let resp: ProcessResponse = serde_json::from_value(json!({ "results": [
        { "id": "S1", "result": { "Gene": ["BRCA1"], "Species": ["mouse"] } },
        { "id": "S2", "result": { "Species": ["mouse"] } },
        { "id": "S3", "result": {} }
    ]}))
    .unwrap();
    ResultsView::new(merge_results(groups, &resp, &meta.columns))
}

#[test]
fn filter_limits_visible_groups() {
    let mut v = view();
    assert_eq!(v.visible_groups().count(), 3);
    v.toggle_filter("BRCA1");
    let ids: Vec<_> = v.visible_groups().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["S1"]);
    v.toggle_filter("mouse");
    assert_eq!(v.visible_groups().count(), 2);
    v.toggle_filter("BRCA1");
    v.toggle_filter("mouse");
    assert!(v.filters().is_empty());
    assert_eq!(v.visible_groups().count(), 3);
}

#[test]
fn exports_follow_live_state() {
    let mut v = view();
    assert_eq!(
        v.export_rows().unwrap(),
        "Study Accession\tStudy Title\tRun Accession\tDownload Links\n\
         S1\tFirst\tR1\thttp://x/r1a,http://x/r1b\n\
         S1\tFirst\tR2\t\n\
         S2\tSecond\tR3\thttp://x/r3\n\
         S3\tThird\tR4\t\n"
    );
    assert_eq!(v.export_tags().unwrap(), "ID\tTAGS\nS1\tBRCA1, mouse\nS2\tmouse\nS3\t\n");
    assert_eq!(v.export_downloads(), "wget http://x/r1a\nwget http://x/r1b\nwget http://x/r3\n");

    v.toggle_filter("mouse");
    v.toggle_included("S2");
    assert_eq!(v.export_tags().unwrap(), "ID\tTAGS\nS1\tBRCA1, mouse\n");
    assert_eq!(v.export_downloads(), "wget http://x/r1a\nwget http://x/r1b\n");
}

#[test]
fn exclusion_hides_from_exports_not_from_list() {
    let mut v = view();
    v.set_included("S1", false);
    assert_eq!(v.visible_groups().count(), 3);
    assert!(!v.cards()[0].included);
    assert!(!v.export_rows().unwrap().contains("S1"));
    assert!(!v.export_tags().unwrap().contains("S1"));
    assert!(!v.export_downloads().contains("r1a"));
}

#[test]
fn export_is_idempotent() {
    let mut v = view();
    v.toggle_filter("mouse");
    assert_eq!(v.export_rows().unwrap(), v.export_rows().unwrap());
    assert_eq!(v.export_tags().unwrap(), v.export_tags().unwrap());
    assert_eq!(v.export_downloads(), v.export_downloads());
}

#[test]
fn tag_list_and_cards() {
    let mut v = view();
    v.toggle_filter("BRCA1");
    let tags = v.tag_list();
    assert_eq!(tags[0].label, "mouse (2)");
    assert!(!tags[0].checked);
    assert!(tags[1].checked);

    let card = v.card(v.ai().group("S1").unwrap());
    assert_eq!(card.expand_label, "Expand Experiments (2)");
    assert_eq!(card.description, vec![("Study Title".to_string(), "First".to_string()), ("Study Abstract".to_string(), String::new())]);
    assert!(card.chips[0].highlighted);
    assert!(!card.chips[1].highlighted);
}

#[test]
fn grid_hides_non_default_columns() {
    let v = view();
    let mut grid = v.grid("S1").unwrap();
    assert_eq!(grid.visible_columns(), vec!["Run Accession", "Download Links"]);
    assert_eq!(grid.columns[0].width, "Run Accession".len() * 8 + 10);
    assert_eq!(grid.page(0), vec![vec!["R1".to_string(), "http://x/r1a,http://x/r1b".to_string()], vec!["R2".to_string(), String::new()]]);
    assert!(grid.toggle_column("Download Links"));
    assert_eq!(grid.page(0)[0], vec!["R1".to_string()]);
    assert_eq!(grid.page_count(), 1);
    assert!(grid.page(1).is_empty());
    assert_eq!(PAGE_SIZE, 50);
}

#[test]
fn write_exports_creates_three_files() {
    let v = view();
    let dir = tempfile::tempdir().unwrap();
    let paths = v.write_exports(dir.path()).unwrap();
    assert_eq!(paths.len(), 3);
    let tags = std::fs::read_to_string(dir.path().join("ai_processed.tsv")).unwrap();
    assert!(tags.starts_with("ID\tTAGS\n"));
    assert!(dir.path().join("downloads.txt").exists());
}
