use crate::model::{cell_text, is_filled, SearchMetadata};
use crate::text::{compact_text, CHIP_LIMIT};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FillLevel {
    Full,
    Normal,
    Sparse,
}

impl FillLevel {
    pub fn from_percent(pc: u32) -> Self {
        if pc == 100 { FillLevel::Full } else if pc > 30 { FillLevel::Normal } else { FillLevel::Sparse }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub index: usize,
    pub name: String,
    pub fill_percent: u32,
    pub fill_level: FillLevel,
    /// Compacted cell text with its count, most frequent first.
    pub examples: Vec<(String, usize)>,
}

/// Histogram of filled cells, keyed by compacted text, sorted by descending
/// count with ties kept in first-seen order.
pub fn histogram<'a, I>(cells: I, limit: usize) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = &'a serde_json::Value>,
{
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut slot: HashMap<String, usize> = HashMap::new();
    for cell in cells {
        if !is_filled(cell) { continue; }
        let key = compact_text(&cell_text(cell), limit);
        match slot.get(&key) {
            Some(&i) => order[i].1 += 1,
            None => {
                slot.insert(key.clone(), order.len());
                order.push((key, 1));
            }
        }
    }
    // stable sort keeps first-seen order among equal counts
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order
}

pub fn profile_column(meta: &SearchMetadata, index: usize) -> ColumnProfile {
    let cells: Vec<&serde_json::Value> = meta.data.iter().filter_map(|row| row.get(index)).collect();
    let filled = cells.iter().filter(|c| is_filled(c)).count();
    let fill_percent = if meta.data.is_empty() {
        0
    } else {
        (100.0 * filled as f64 / meta.data.len() as f64).round() as u32
    };
    ColumnProfile {
        index,
        name: meta.columns.get(index).cloned().unwrap_or_default(),
        fill_percent,
        fill_level: FillLevel::from_percent(fill_percent),
        examples: histogram(cells, CHIP_LIMIT),
    }
}

pub fn profile_columns(meta: &SearchMetadata) -> Vec<ColumnProfile> {
    (0..meta.columns.len()).map(|i| profile_column(meta, i)).collect()
}
