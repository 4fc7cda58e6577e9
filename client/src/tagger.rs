use crate::gateway::{Gateway, GatewayError, Outcome};
use dumpview_core::api::{ProcessResponse, PROCESS_PATH};
use dumpview_core::tagging::{build_request, group_rows, merge_results};
use dumpview_core::{AiResult, ColumnSelection, SearchMetadata, TaggingError, PRIMARY_KEY};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum TaggerError {
    #[error("a tagging request is already pending")]
    Busy,
    #[error(transparent)]
    Tagging(#[from] TaggingError),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum TagOutcome {
    Tagged(AiResult),
    Superseded,
}

// Resets the busy flag however the submission ends.
struct Pending(Arc<AtomicBool>);

impl Drop for Pending {
    fn drop(&mut self) { self.0.store(false, Ordering::SeqCst); }
}

/// Sends the grouped study text to the NLP service, one submission at a time.
pub struct Tagger {
    gateway: Arc<Gateway>,
    pending: Arc<AtomicBool>,
    primary_key: String,
}

impl Tagger {
    pub fn new(gateway: Arc<Gateway>) -> Self {
        Self { gateway, pending: Arc::new(AtomicBool::new(false)), primary_key: PRIMARY_KEY.to_string() }
    }

    pub fn with_primary_key(mut self, key: &str) -> Self {
        self.primary_key = key.to_string();
        self
    }

    pub fn is_pending(&self) -> bool { self.pending.load(Ordering::SeqCst) }

    /// State of the "Continue" control.
    pub fn can_continue(&self, selection: &ColumnSelection) -> bool { !selection.is_empty() && !self.is_pending() }

    pub async fn submit(&self, meta: &SearchMetadata, selection: &ColumnSelection) -> Result<TagOutcome, TaggerError> {
        if self.pending.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            return Err(TaggerError::Busy);
        }
        let _pending = Pending(self.pending.clone());

        let groups = group_rows(meta, &self.primary_key, &selection.selected()).map_err(|e| {
            warn!(error = %e, "tagging aborted");
            e
        })?;
        let req = build_request(&groups);
        info!(groups = groups.len(), "submitting study text for tagging");
        let resp: ProcessResponse = match self.gateway.post(PROCESS_PATH, &req).await? {
            Outcome::Done(r) => r,
            Outcome::Superseded => return Ok(TagOutcome::Superseded),
        };
        let ai = merge_results(groups, &resp, &meta.columns);
        info!(groups = ai.groups.len(), tags = ai.tag_summary.len(), "tagging finished");
        Ok(TagOutcome::Tagged(ai))
    }
}
