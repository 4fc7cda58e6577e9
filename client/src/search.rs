//! Debounced search box: previews the match count, then submits the full search.

use crate::gateway::{Gateway, GatewayError, Method, Outcome};
use dumpview_core::api::{peek_path, FetchRequest, FetchResponse, PeekResponse, FETCH_PATH, PEEK_PATH};
use dumpview_core::SearchMetadata;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// What happens to a term whose count exceeds `max_results`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OverflowPolicy {
    /// Warn, but still allow the search; the backend returns at most `max_results` rows.
    Advisory,
    /// Treat the term as invalid until it is narrowed down.
    Reject,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermMode {
    /// Send the whole input as one term.
    Whole,
    SplitWhitespace,
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub debounce: Duration,
    pub max_results: usize,
    pub overflow: OverflowPolicy,
    pub term_mode: TermMode,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(1500),
            max_results: 1000,
            overflow: OverflowPolicy::Advisory,
            term_mode: TermMode::Whole,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchPhase {
    #[default]
    Idle,
    Typing,
    Previewing,
    Valid,
    Invalid,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advisory {
    NoResults,
    TooMany { max: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchSnapshot {
    pub text: String,
    pub phase: SearchPhase,
    /// Count reported by the last preview of the current text.
    pub count: Option<u64>,
    pub valid: bool,
    epoch: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Published(SearchMetadata),
    /// The backend answered without metadata; nothing to show.
    NoMetadata,
    /// Submission is not allowed in the current state.
    Blocked,
    /// The input changed or a newer search replaced this one.
    Superseded,
}

pub struct SearchInput {
    gateway: Arc<Gateway>,
    config: SearchConfig,
    state: Arc<Mutex<SearchSnapshot>>,
    timer: Option<JoinHandle<()>>,
}

impl SearchInput {
    pub fn new(gateway: Arc<Gateway>, config: SearchConfig) -> Self {
        Self { gateway, config, state: Arc::new(Mutex::new(SearchSnapshot::default())), timer: None }
    }

    pub fn config(&self) -> &SearchConfig { &self.config }

    pub fn state(&self) -> SearchSnapshot { self.state.lock().clone() }

    /// A keystroke: forget the previous preview and restart the quiet period.
    pub fn on_input(&mut self, text: &str) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
        let epoch = {
            let mut st = self.state.lock();
            st.epoch += 1;
            st.text = text.to_string();
            st.count = None;
            st.valid = false;
            st.phase = if text.trim().is_empty() { SearchPhase::Idle } else { SearchPhase::Typing };
            st.epoch
        };
        let term = text.trim().to_string();
        if term.is_empty() { return; }

        let gateway = self.gateway.clone();
        let state = self.state.clone();
        let debounce = self.config.debounce;
        let max = self.config.max_results as u64;
        let overflow = self.config.overflow;
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            {
                let mut st = state.lock();
                if st.epoch != epoch { return; }
                st.phase = SearchPhase::Previewing;
            }
            debug!(%term, "previewing search term");
            let applied = gateway
                .request_then(&peek_path(&term), Method::Get, None, |body| {
                    let resp = serde_json::from_value::<PeekResponse>(body)?;
                    let mut st = state.lock();
                    if st.epoch == epoch {
                        st.count = Some(resp.count);
                        st.valid = resp.count > 0 && (overflow == OverflowPolicy::Advisory || resp.count < max);
                        st.phase = if st.valid { SearchPhase::Valid } else { SearchPhase::Invalid };
                    }
                    Ok::<_, serde_json::Error>(())
                })
                .await;
            let failed = match applied {
                Ok(Outcome::Done(Err(e))) => {
                    // same as a failed request: no count, no advisory
                    warn!(error = %e, "peek response without a usable count");
                    gateway.clear_loader();
                    true
                }
                Err(_) => true,
                Ok(_) => false,
            };
            if failed {
                let mut st = state.lock();
                if st.epoch == epoch {
                    st.phase = SearchPhase::Invalid;
                }
            }
        }));
    }

    /// Whether a preview is still scheduled or in flight.
    pub fn preview_pending(&self) -> bool { self.timer.as_ref().map_or(false, |t| !t.is_finished()) }

    /// Wait for the scheduled preview, if any, to finish.
    pub async fn settled(&mut self) {
        if let Some(timer) = self.timer.as_mut() {
            let _ = timer.await;
            self.timer = None;
        }
    }

    pub fn advisory(&self) -> Option<Advisory> {
        match self.state.lock().count {
            Some(0) => Some(Advisory::NoResults),
            Some(n) if n > self.config.max_results as u64 => Some(Advisory::TooMany { max: self.config.max_results }),
            _ => None,
        }
    }

    pub fn can_submit(&self) -> bool {
        // gateway first: its lock is taken before ours when a preview lands
        if self.gateway.is_loading(FETCH_PATH) || self.gateway.is_loading(PEEK_PATH) {
            return false;
        }
        let st = self.state.lock();
        !st.text.trim().is_empty() && st.valid && st.count.map_or(false, |c| c > 0) && st.phase != SearchPhase::Previewing
    }

    fn terms(&self, text: &str) -> Vec<String> {
        match self.config.term_mode {
            TermMode::Whole => vec![text.trim().to_string()],
            TermMode::SplitWhitespace => text.split_whitespace().map(str::to_string).collect(),
        }
    }

    /// Run the full search for the current text.
    pub async fn submit(&self) -> Result<SubmitOutcome, GatewayError> {
        if !self.can_submit() {
            return Ok(SubmitOutcome::Blocked);
        }
        let (text, epoch) = {
            let st = self.state.lock();
            (st.text.clone(), st.epoch)
        };
        let req = FetchRequest { terms: self.terms(&text), max_results: self.config.max_results };
        info!(terms = ?req.terms, max_results = req.max_results, "submitting search");
        let resp: FetchResponse = match self.gateway.post(FETCH_PATH, &req).await? {
            Outcome::Done(r) => r,
            Outcome::Superseded => return Ok(SubmitOutcome::Superseded),
        };
        let mut st = self.state.lock();
        if st.epoch != epoch {
            return Ok(SubmitOutcome::Superseded);
        }
        match resp.metadata {
            Some(meta) => {
                st.phase = SearchPhase::Submitted;
                info!(rows = meta.data.len(), columns = meta.columns.len(), "search results received");
                Ok(SubmitOutcome::Published(meta))
            }
            None => {
                info!("search response carried no metadata");
                Ok(SubmitOutcome::NoMetadata)
            }
        }
    }
}

impl Drop for SearchInput {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}
