//! Top-level view state. Everything the screens show is owned here; callers
//! read snapshots and ask for changes through methods.

use crate::gateway::{Gateway, GatewayError};
use crate::search::{Advisory, SearchConfig, SearchInput, SearchSnapshot, SubmitOutcome};
use crate::tagger::{TagOutcome, Tagger, TaggerError};
use dumpview_core::cloud::{CloudConfig, CloudView};
use dumpview_core::results::ResultsView;
use dumpview_core::{CheckState, MetadataTable};
use std::sync::Arc;
use tracing::warn;

pub struct App {
    gateway: Arc<Gateway>,
    search: SearchInput,
    tagger: Tagger,
    table: Option<MetadataTable>,
    results: Option<ResultsView>,
    cloud: Option<CloudView>,
    cloud_config: CloudConfig,
}

impl App {
    pub fn new(gateway: Arc<Gateway>, search: SearchConfig, cloud_config: CloudConfig) -> Self {
        Self {
            search: SearchInput::new(gateway.clone(), search),
            tagger: Tagger::new(gateway.clone()),
            gateway,
            table: None,
            results: None,
            cloud: None,
            cloud_config,
        }
    }

    pub fn gateway(&self) -> &Gateway { &self.gateway }

    // --- search box ---

    /// New search text. The previous result table no longer applies.
    pub fn type_text(&mut self, text: &str) {
        self.search.on_input(text);
        self.table = None;
    }

    pub async fn settle_preview(&mut self) { self.search.settled().await }

    pub fn preview_pending(&self) -> bool { self.search.preview_pending() }

    pub fn search(&self) -> SearchSnapshot { self.search.state() }

    pub fn advisory(&self) -> Option<Advisory> { self.search.advisory() }

    pub fn can_submit(&self) -> bool { self.search.can_submit() }

    pub fn search_busy(&self) -> bool { self.gateway.is_loading(dumpview_core::api::FETCH_PATH) }

    pub async fn submit_search(&mut self) -> Result<SubmitOutcome, GatewayError> {
        let outcome = self.search.submit().await?;
        if let SubmitOutcome::Published(meta) = &outcome {
            if let Err(e) = meta.validate() {
                warn!(error = %e, "search metadata is malformed, ignoring it");
                return Ok(SubmitOutcome::NoMetadata);
            }
            self.table = Some(MetadataTable::new(meta.clone()));
        }
        Ok(outcome)
    }

    // --- column table ---

    pub fn table(&self) -> Option<&MetadataTable> { self.table.as_ref() }

    pub fn toggle_column(&mut self, name: &str) -> bool {
        self.table.as_mut().map_or(false, |t| t.selection.toggle(name))
    }

    pub fn set_column(&mut self, name: &str, on: bool) -> bool {
        self.table.as_mut().map_or(false, |t| t.selection.set(name, on))
    }

    pub fn toggle_all_columns(&mut self) {
        if let Some(t) = self.table.as_mut() {
            t.selection.toggle_all();
        }
    }

    pub fn select_all_columns(&mut self, on: bool) {
        if let Some(t) = self.table.as_mut() {
            if on { t.selection.select_all() } else { t.selection.select_none() }
        }
    }

    pub fn header_state(&self) -> Option<CheckState> { self.table.as_ref().map(|t| t.selection.check_state()) }

    pub fn tagging_pending(&self) -> bool { self.tagger.is_pending() }

    pub fn can_continue(&self) -> bool { self.table.as_ref().map_or(false, |t| self.tagger.can_continue(&t.selection)) }

    /// "Continue": tag the current result set and open the results view.
    /// Returns false when there is nothing to tag or the request was overtaken.
    pub async fn continue_to_tagging(&mut self) -> Result<bool, TaggerError> {
        let Some(table) = self.table.as_ref() else { return Ok(false) };
        match self.tagger.submit(&table.meta, &table.selection).await? {
            TagOutcome::Tagged(ai) => {
                self.cloud = Some(CloudView::new(&ai.tag_summary, self.cloud_config.clone()));
                self.results = Some(ResultsView::new(ai));
                Ok(true)
            }
            TagOutcome::Superseded => Ok(false),
        }
    }

    // --- results ---

    pub fn results(&self) -> Option<&ResultsView> { self.results.as_ref() }

    pub fn cloud(&self) -> Option<&CloudView> { self.cloud.as_ref() }

    /// Same filter whether clicked in the tag list or in the word cloud.
    pub fn toggle_filter(&mut self, tag: &str) {
        if let Some(r) = self.results.as_mut() {
            r.toggle_filter(tag);
        }
    }

    pub fn toggle_included(&mut self, id: &str) {
        if let Some(r) = self.results.as_mut() {
            r.toggle_included(id);
        }
    }

    /// A click on the word cloud at centre-relative coordinates.
    pub fn click_cloud(&mut self, x: f64, y: f64) -> Option<String> {
        let tag = self.cloud.as_ref()?.hit(x, y)?.to_string();
        self.toggle_filter(&tag);
        Some(tag)
    }

    pub fn resize_cloud(&mut self, width: f64) -> bool { self.cloud.as_mut().map_or(false, |c| c.resize(width)) }

    pub fn cloud_svg(&self) -> anyhow::Result<Option<String>> {
        let filters = self.results.as_ref().map(|r| r.filters().to_vec()).unwrap_or_default();
        self.cloud.as_ref().map(|c| c.svg(&filters)).transpose()
    }

    pub fn close_results(&mut self) {
        self.results = None;
        self.cloud = None;
    }
}
