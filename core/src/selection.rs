use crate::model::DEFAULT_COLUMNS;
use serde::Serialize;

/// Header checkbox state of the column table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckState {
    Checked,
    Indeterminate,
    Unchecked,
}

/// Columns picked for tagging. Always reported in column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection {
    columns: Vec<String>,
    selected: Vec<bool>,
}

impl ColumnSelection {
    /// Starts from the default columns that are actually present.
    pub fn new(columns: &[String]) -> Self {
        let selected = columns.iter().map(|c| DEFAULT_COLUMNS.contains(&c.as_str())).collect();
        Self { columns: columns.to_vec(), selected }
    }

    pub fn columns(&self) -> &[String] { &self.columns }

    pub fn is_selected(&self, name: &str) -> bool {
        self.columns.iter().position(|c| c == name).map_or(false, |i| self.selected[i])
    }

    /// Flip one column; returns false for a name not in the table.
    pub fn toggle(&mut self, name: &str) -> bool {
        match self.columns.iter().position(|c| c == name) {
            Some(i) => {
                self.selected[i] = !self.selected[i];
                true
            }
            None => false,
        }
    }

    pub fn set(&mut self, name: &str, on: bool) -> bool {
        match self.columns.iter().position(|c| c == name) {
            Some(i) => {
                self.selected[i] = on;
                true
            }
            None => false,
        }
    }

    pub fn select_all(&mut self) { self.selected.iter_mut().for_each(|s| *s = true); }

    pub fn select_none(&mut self) { self.selected.iter_mut().for_each(|s| *s = false); }

    /// Header checkbox click: a fully selected table clears, anything else selects all.
    pub fn toggle_all(&mut self) {
        if self.check_state() == CheckState::Checked { self.select_none() } else { self.select_all() }
    }

    pub fn count(&self) -> usize { self.selected.iter().filter(|s| **s).count() }

    pub fn is_empty(&self) -> bool { self.count() == 0 }

    pub fn check_state(&self) -> CheckState {
        let n = self.count();
        if n == 0 {
            CheckState::Unchecked
        } else if n == self.columns.len() {
            CheckState::Checked
        } else {
            CheckState::Indeterminate
        }
    }

    pub fn selected(&self) -> Vec<&str> {
        self.columns.iter().zip(&self.selected).filter(|(_, s)| **s).map(|(c, _)| c.as_str()).collect()
    }
}
