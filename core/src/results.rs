//! Results viewer state: tag filters, group inclusion, cards, grids and exports.

use crate::export::{self, download_links, to_tsv, wget_script};
use crate::model::{cell_text, Row, DEFAULT_VISIBLE_COLUMNS, DOWNLOAD_LINKS};
use crate::tagging::{AiResult, GroupRecord};
use anyhow::Result;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const PAGE_SIZE: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagEntry {
    pub tag: String,
    pub count: usize,
    pub checked: bool,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TagChip {
    pub tag: String,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupCard {
    pub id: String,
    pub included: bool,
    pub description: Vec<(String, String)>,
    pub chips: Vec<TagChip>,
    pub row_count: usize,
    pub expand_label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GridColumn {
    pub name: String,
    pub width: usize,
    pub visible: bool,
}

/// Paginated row grid of one expanded group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataGrid {
    pub columns: Vec<GridColumn>,
    indices: Vec<usize>,
    rows: Vec<Row>,
}

impl DataGrid {
    fn new(ai: &AiResult, group: &GroupRecord) -> Self {
        let grid_cols = ai.grid_columns();
        let columns = grid_cols
            .iter()
            .map(|(_, name)| GridColumn {
                name: name.to_string(),
                width: name.chars().count() * 8 + 10,
                visible: DEFAULT_VISIBLE_COLUMNS.contains(name),
            })
            .collect();
        Self { columns, indices: grid_cols.iter().map(|(i, _)| *i).collect(), rows: group.rows.clone() }
    }

    pub fn toggle_column(&mut self, name: &str) -> bool {
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(c) => {
                c.visible = !c.visible;
                true
            }
            None => false,
        }
    }

    pub fn visible_columns(&self) -> Vec<&str> {
        self.columns.iter().filter(|c| c.visible).map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize { self.rows.len() }

    pub fn page_count(&self) -> usize { self.rows.len().div_ceil(PAGE_SIZE).max(1) }

    /// Visible cells of page `n` (zero based); an out-of-range page is empty.
    pub fn page(&self, n: usize) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .skip(n * PAGE_SIZE)
            .take(PAGE_SIZE)
            .map(|row| {
                self.columns
                    .iter()
                    .zip(&self.indices)
                    .filter(|(c, _)| c.visible)
                    .map(|(_, &i)| row.get(i).map(cell_text).unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ResultsView {
    ai: AiResult,
    filters: Vec<String>,
    excluded: HashSet<String>,
}

impl ResultsView {
    pub fn new(ai: AiResult) -> Self { Self { ai, filters: Vec::new(), excluded: HashSet::new() } }

    pub fn ai(&self) -> &AiResult { &self.ai }

    pub fn filters(&self) -> &[String] { &self.filters }

    /// Add or remove a tag from the filter set. Shared by the tag list and the word cloud.
    pub fn toggle_filter(&mut self, tag: &str) {
        match self.filters.iter().position(|f| f == tag) {
            Some(i) => {
                self.filters.remove(i);
            }
            None => self.filters.push(tag.to_string()),
        }
    }

    pub fn clear_filters(&mut self) { self.filters.clear(); }

    pub fn is_included(&self, id: &str) -> bool { !self.excluded.contains(id) }

    pub fn set_included(&mut self, id: &str, included: bool) {
        if included {
            self.excluded.remove(id);
        } else {
            self.excluded.insert(id.to_string());
        }
    }

    pub fn toggle_included(&mut self, id: &str) {
        let now = self.is_included(id);
        self.set_included(id, !now);
    }

    /// Shown in the list: no filter, or the tagline hits at least one filtered tag.
    pub fn is_visible(&self, group: &GroupRecord) -> bool {
        self.filters.is_empty() || group.has_any_tag(&self.filters)
    }

    pub fn visible_groups(&self) -> impl Iterator<Item = &GroupRecord> {
        self.ai.groups.iter().filter(move |g| self.is_visible(g))
    }

    /// Groups taking part in exports: visible and included.
    pub fn exported_groups(&self) -> impl Iterator<Item = &GroupRecord> {
        self.visible_groups().filter(move |g| self.is_included(&g.id))
    }

    pub fn tag_list(&self) -> Vec<TagEntry> {
        self.ai
            .tag_summary
            .iter()
            .map(|t| TagEntry {
                tag: t.tag.clone(),
                count: t.count,
                checked: self.filters.contains(&t.tag),
                label: format!("{} ({})", t.tag, t.count),
            })
            .collect()
    }

    pub fn card(&self, group: &GroupRecord) -> GroupCard {
        GroupCard {
            id: group.id.clone(),
            included: self.is_included(&group.id),
            description: group.description.clone(),
            chips: group
                .tagline
                .iter()
                .map(|t| TagChip { tag: t.clone(), highlighted: !self.filters.is_empty() && self.filters.contains(t) })
                .collect(),
            row_count: group.rows.len(),
            expand_label: format!("Expand Experiments ({})", group.rows.len()),
        }
    }

    pub fn cards(&self) -> Vec<GroupCard> { self.visible_groups().map(|g| self.card(g)).collect() }

    pub fn grid(&self, id: &str) -> Option<DataGrid> { self.ai.group(id).map(|g| DataGrid::new(&self.ai, g)) }

    /// `results.tsv`: every source row of the exported groups under the metadata header.
    pub fn export_rows(&self) -> Result<String> {
        let columns = &self.ai.columns;
        let mut records: Vec<Vec<String>> = vec![columns.clone()];
        for g in self.exported_groups() {
            for row in &g.rows {
                records.push((0..columns.len()).map(|i| row.get(i).map(cell_text).unwrap_or_default()).collect());
            }
        }
        to_tsv(records)
    }

    /// `ai_processed.tsv`: one line per exported group with its comma-joined tagline.
    pub fn export_tags(&self) -> Result<String> {
        let mut records: Vec<Vec<String>> = vec![vec!["ID".into(), "TAGS".into()]];
        records.extend(self.exported_groups().map(|g| vec![g.id.clone(), g.tagline.join(", ")]));
        to_tsv(records)
    }

    /// `downloads.txt`: a `wget` line for every download link of the exported groups.
    pub fn export_downloads(&self) -> String {
        let Some(li) = self.ai.columns.iter().position(|c| c == DOWNLOAD_LINKS) else {
            return String::new();
        };
        let urls = self
            .exported_groups()
            .flat_map(|g| g.rows.iter())
            .flat_map(|row| download_links(row.get(li).unwrap_or(&Value::Null)));
        wget_script(urls)
    }

    pub fn write_exports(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        Ok(vec![
            export::write_file(dir, export::ROWS_FILE, &self.export_rows()?)?,
            export::write_file(dir, export::TAGS_FILE, &self.export_tags()?)?,
            export::write_file(dir, export::DOWNLOADS_FILE, &self.export_downloads())?,
        ])
    }
}
