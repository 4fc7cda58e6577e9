//! Folding search rows into study groups and merging NLP tags back into them.

use crate::api::{Entry, ProcessRequest, ProcessResponse, MODEL_TYPE};
use crate::model::{cell_text, Row, SearchMetadata, DEFAULT_COLUMNS, PRIMARY_KEY};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaggingError {
    #[error("primary key column {0:?} not found")]
    MissingPrimaryKey(String),
    #[error("no columns selected")]
    EmptySelection,
}

/// Rows sharing one primary-key value, plus the text sent for tagging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudyGroup {
    pub id: String,
    pub rows: Vec<Row>,
    /// Distinct non-empty selected-column values, first-seen order.
    pub texts: Vec<String>,
    pub tags: Vec<String>,
}

impl StudyGroup {
    pub fn text(&self) -> String { self.texts.join("\n") }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagCount {
    pub tag: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupRecord {
    pub id: String,
    /// (column, text) pairs taken from the first row of the group.
    pub description: Vec<(String, String)>,
    /// Full source rows, aligned to `AiResult::columns`.
    pub rows: Vec<Row>,
    pub tagline: Vec<String>,
}

impl GroupRecord {
    pub fn has_any_tag(&self, tags: &[String]) -> bool { self.tagline.iter().any(|t| tags.contains(t)) }
}

/// Tagged study groups, ready for the results viewer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AiResult {
    /// Number of groups carrying each tag, most frequent first.
    pub tag_summary: Vec<TagCount>,
    pub groups: Vec<GroupRecord>,
    pub columns: Vec<String>,
}

impl AiResult {
    pub fn group(&self, id: &str) -> Option<&GroupRecord> { self.groups.iter().find(|g| g.id == id) }

    pub fn tag_count(&self, tag: &str) -> usize {
        self.tag_summary.iter().find(|t| t.tag == tag).map_or(0, |t| t.count)
    }

    /// Columns shown in an expanded group grid: all but the description columns and the primary key.
    pub fn grid_columns(&self) -> Vec<(usize, &str)> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.as_str() != PRIMARY_KEY && !DEFAULT_COLUMNS.contains(&c.as_str()))
            .map(|(i, c)| (i, c.as_str()))
            .collect()
    }
}

/// Group rows by `primary_key`, gathering the distinct values of `selected` columns per group.
pub fn group_rows(meta: &SearchMetadata, primary_key: &str, selected: &[&str]) -> Result<Vec<StudyGroup>, TaggingError> {
    let pk = meta
        .column_index(primary_key)
        .ok_or_else(|| TaggingError::MissingPrimaryKey(primary_key.to_string()))?;
    if selected.is_empty() {
        return Err(TaggingError::EmptySelection);
    }
    let picked: Vec<usize> = meta
        .columns
        .iter()
        .enumerate()
        .filter(|(_, c)| selected.contains(&c.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut groups: Vec<StudyGroup> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();
    for row in &meta.data {
        let key = row.get(pk).map(cell_text).unwrap_or_default();
        let gi = *slot.entry(key.clone()).or_insert_with(|| {
            groups.push(StudyGroup { id: key, ..Default::default() });
            groups.len() - 1
        });
        let group = &mut groups[gi];
        for &ci in &picked {
            let text = row.get(ci).map(cell_text).unwrap_or_default();
            if text.is_empty() || group.texts.contains(&text) { continue; }
            group.texts.push(text);
        }
        group.rows.push(row.clone());
    }
    Ok(groups)
}

/// One batched request covering every group.
pub fn build_request(groups: &[StudyGroup]) -> ProcessRequest {
    ProcessRequest {
        entries: groups.iter().map(|g| Entry { id: g.id.clone(), text: g.text() }).collect(),
        model_type: MODEL_TYPE.to_string(),
    }
}

/// Attach returned tags to their groups and build the tag summary.
pub fn merge_results(mut groups: Vec<StudyGroup>, response: &ProcessResponse, columns: &[String]) -> AiResult {
    let slot: HashMap<String, usize> = groups.iter().enumerate().map(|(i, g)| (g.id.clone(), i)).collect();
    for res in &response.results {
        let Some(&gi) = slot.get(&res.id) else {
            tracing::warn!(id = %res.id, "tagging result for unknown group ignored");
            continue;
        };
        let tags = &mut groups[gi].tags;
        for tag in res.tagline() {
            if !tags.contains(&tag) { tags.push(tag); }
        }
    }

    let mut summary: Vec<TagCount> = Vec::new();
    let mut summary_slot: HashMap<String, usize> = HashMap::new();
    for g in &groups {
        for tag in &g.tags {
            match summary_slot.get(tag) {
                Some(&i) => summary[i].count += 1,
                None => {
                    summary_slot.insert(tag.clone(), summary.len());
                    summary.push(TagCount { tag: tag.clone(), count: 1 });
                }
            }
        }
    }
    summary.sort_by(|a, b| b.count.cmp(&a.count));

    let desc_idx: Vec<(&str, Option<usize>)> =
        DEFAULT_COLUMNS.iter().map(|c| (*c, columns.iter().position(|x| x == c))).collect();
    let records = groups
        .into_iter()
        .map(|g| {
            let description = desc_idx
                .iter()
                .map(|(c, idx)| {
                    let text = idx.and_then(|i| g.rows.first().and_then(|r| r.get(i))).map(cell_text).unwrap_or_default();
                    (c.to_string(), text)
                })
                .collect();
            GroupRecord { id: g.id, description, rows: g.rows, tagline: g.tags }
        })
        .collect();

    AiResult { tag_summary: summary, groups: records, columns: columns.to_vec() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_primary_key_is_typed() {
        let meta = SearchMetadata::new(vec!["V".into()], vec![vec![json!("a")]]);
        assert_eq!(group_rows(&meta, PRIMARY_KEY, &["V"]), Err(TaggingError::MissingPrimaryKey(PRIMARY_KEY.into())));
    }

    #[test]
    fn request_carries_model_type() {
        let g = StudyGroup { id: "S1".into(), texts: vec!["a".into(), "b".into()], ..Default::default() };
        let req = build_request(&[g]);
        assert_eq!(req.model_type, "aioner");
        assert_eq!(req.entries[0].text, "a\nb");
    }
}
