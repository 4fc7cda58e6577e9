pub mod app;
pub mod gateway;
pub mod repl;
pub mod search;
pub mod tagger;

pub use app::App;
pub use gateway::{Gateway, GatewayError, HttpTransport, Method, Outcome, Transport, TransportError};
pub use search::{Advisory, OverflowPolicy, SearchConfig, SearchInput, SearchPhase, SearchSnapshot, SubmitOutcome, TermMode};
pub use tagger::{TagOutcome, Tagger, TaggerError};

use dumpview_core::ColumnProfile;
use std::fmt::Write;

/// Plain-text rendering of the column table used by the CLI and the repl.
pub fn format_profiles(profiles: &[ColumnProfile], selected: &dyn Fn(&str) -> bool) -> String {
    let mut out = String::new();
    for p in profiles {
        let mark = if selected(&p.name) { "[x]" } else { "[ ]" };
        let examples: Vec<String> = p.examples.iter().take(3).map(|(t, n)| format!("{t} ({n})")).collect();
        let _ = writeln!(out, "{mark} {:<32} {:>4}%  {}", p.name, p.fill_percent, examples.join(" | "));
    }
    out
}

pub fn advisory_text(advisory: Advisory) -> String {
    match advisory {
        Advisory::NoResults => "Nothing was found for your request.".to_string(),
        Advisory::TooMany { max } => format!(
            "There are too many results. Please specify your request or only the first {max} experiments will be included in the results."
        ),
    }
}
