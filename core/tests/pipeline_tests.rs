use dumpview_core::api::{ProcessResponse, TagResult};
use dumpview_core::profile::profile_columns;
use dumpview_core::tagging::{build_request, group_rows, merge_results};
use dumpview_core::{SearchMetadata, TagCount};
use serde_json::json;

fn meta(columns: &[&str], data: serde_json::Value) -> SearchMetadata {
    SearchMetadata::new(columns.iter().map(|c| c.to_string()).collect(), serde_json::from_value(data).unwrap())
}

fn tagged(id: &str, tags: &[&str]) -> TagResult {
    serde_json::from_value(json!({ "id": id, "result": { "Gene": tags } })).unwrap()
}

#[test]
fn fill_ratio_and_examples() {
    let m = meta(&["A", "B"], json!([["x", ""], ["y", "z"]]));
    let p = profile_columns(&m);
    assert_eq!(p[0].fill_percent, 100);
    assert_eq!(p[1].fill_percent, 50);
    assert_eq!(p[0].examples, vec![("x".to_string(), 1), ("y".to_string(), 1)]);
    assert_eq!(p[1].examples, vec![("z".to_string(), 1)]);
}

#[test]
fn groups_by_key_in_first_seen_order() {
    let m = meta(&["SID", "V"], json!([["S1", "a"], ["S1", "b"], ["S2", "c"], ["S1", "a"]]));
    let groups = group_rows(&m, "SID", &["V"]).unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].id, "S1");
    assert_eq!(groups[0].rows.len(), 3);
    assert_eq!(groups[0].text(), "a\nb");
    assert_eq!(groups[1].text(), "c");

    let req = build_request(&groups);
    assert_eq!(req.entries.len(), 2);
    assert_eq!(req.entries[1].id, "S2");
}

#[test]
fn summary_counts_each_group_once() {
    let m = meta(&["SID", "V"], json!([["S1", "a"], ["S2", "b"]]));
    let groups = group_rows(&m, "SID", &["V"]).unwrap();
    let mut s1: TagResult = tagged("S1", &["x", "y"]);
    // same tag from a second category must not count twice
    s1.result.insert("Disease".into(), vec!["y".into()]);
    let resp = ProcessResponse { results: vec![s1, tagged("S2", &["y"]), tagged("S9", &["z"])] };
    let ai = merge_results(groups, &resp, &m.columns);

    assert_eq!(ai.tag_summary, vec![TagCount { tag: "y".into(), count: 2 }, TagCount { tag: "x".into(), count: 1 }]);
    assert_eq!(ai.groups[0].tagline, vec!["x", "y"]);
    assert_eq!(ai.groups[1].tagline, vec!["y"]);
    assert_eq!(ai.tag_count("z"), 0);
}

#[test]
fn description_and_grid_columns() {
    let m = meta(
        &["Study Accession", "Study Title", "Study Abstract", "Run Accession"],
        json!([["S1", "Title", "Abstract", "R1"], ["S1", "Title", "Abstract", "R2"]]),
    );
    let groups = group_rows(&m, "Study Accession", &["Study Title", "Study Abstract"]).unwrap();
    assert_eq!(groups[0].text(), "Title\nAbstract");
    let ai = merge_results(groups, &ProcessResponse::default(), &m.columns);
    let g = &ai.groups[0];
    assert_eq!(g.description, vec![("Study Title".to_string(), "Title".to_string()), ("Study Abstract".to_string(), "Abstract".to_string())]);
    assert!(g.tagline.is_empty());
    assert_eq!(ai.grid_columns(), vec![(3, "Run Accession")]);
}
