pub mod api;
pub mod cloud;
pub mod export;
pub mod model;
pub mod profile;
pub mod results;
pub mod selection;
pub mod tagging;
pub mod text;

pub use model::{cell_text, is_filled, Cell, MetadataError, Row, SearchMetadata, DEFAULT_COLUMNS, PRIMARY_KEY};
pub use profile::{profile_columns, ColumnProfile, FillLevel};
pub use selection::{CheckState, ColumnSelection};
pub use tagging::{AiResult, GroupRecord, StudyGroup, TagCount, TaggingError};

/// Column profiles plus the user's column choice for one search result.
#[derive(Debug, Clone)]
pub struct MetadataTable {
    pub meta: SearchMetadata,
    pub profiles: Vec<ColumnProfile>,
    pub selection: ColumnSelection,
}

impl MetadataTable {
    pub fn new(meta: SearchMetadata) -> Self {
        let profiles = profile_columns(&meta);
        let selection = ColumnSelection::new(&meta.columns);
        Self { meta, profiles, selection }
    }

    pub fn row_count(&self) -> usize { self.meta.data.len() }
}
