//! Line-driven front end. Plain lines replace the search text; lines starting
//! with ':' are commands.

use crate::{advisory_text, format_profiles, App, SubmitOutcome};
use anyhow::Result;
use dumpview_core::export::{write_file, CLOUD_FILE};
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Text(String),
    Submit,
    Wait,
    Status,
    Columns,
    Column(String),
    AllColumns,
    Continue,
    Tags,
    Filter(String),
    Include(String),
    Cards,
    Grid { id: String, page: usize },
    CloudWidth(f64),
    Click { x: f64, y: f64 },
    Export(PathBuf),
    Close,
    Help,
    Quit,
    Unknown(String),
}

pub fn parse_line(line: &str) -> Command {
    let Some(cmd) = line.strip_prefix(':') else {
        return Command::Text(line.to_string());
    };
    let (name, arg) = match cmd.split_once(' ') {
        Some((n, a)) => (n, a.trim()),
        None => (cmd.trim(), ""),
    };
    match (name, arg) {
        ("submit", _) => Command::Submit,
        ("wait", _) => Command::Wait,
        ("status", _) => Command::Status,
        ("cols", _) => Command::Columns,
        ("col", a) if !a.is_empty() => Command::Column(a.to_string()),
        ("all", _) => Command::AllColumns,
        ("continue", _) => Command::Continue,
        ("tags", _) => Command::Tags,
        ("filter", a) if !a.is_empty() => Command::Filter(a.to_string()),
        ("include", a) if !a.is_empty() => Command::Include(a.to_string()),
        ("cards", _) => Command::Cards,
        ("grid", a) if !a.is_empty() => {
            let mut parts = a.split_whitespace();
            let id = parts.next().unwrap_or_default().to_string();
            let page = parts.next().and_then(|p| p.parse::<usize>().ok()).unwrap_or(1).max(1) - 1;
            Command::Grid { id, page }
        }
        ("click", a) => {
            let xy: Vec<f64> = a.split_whitespace().filter_map(|v| v.parse().ok()).collect();
            match xy[..] {
                [x, y] => Command::Click { x, y },
                _ => Command::Unknown(line.to_string()),
            }
        }
        ("cloud", a) => a.parse::<f64>().map(Command::CloudWidth).unwrap_or_else(|_| Command::Unknown(line.to_string())),
        ("export", a) => Command::Export(PathBuf::from(if a.is_empty() { "." } else { a })),
        ("close", _) => Command::Close,
        ("help", _) => Command::Help,
        ("quit", _) | ("q", _) => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

const HELP: &str = "\
plain text      set the search text (previewed after a pause)
:wait           wait for the match count preview
:submit         run the search
:status         show the search box state
:cols           show the column table
:col NAME       toggle a column
:all            toggle all columns
:continue       tag the selected columns
:tags           list tags with counts
:filter TAG     toggle a tag filter
:include ID     toggle a study's export inclusion
:cards          list visible studies
:grid ID [N]    show page N of a study's rows
:cloud WIDTH    resize the word cloud and list label positions
:click X Y      click the word cloud (centre-relative)
:export DIR     write results.tsv, ai_processed.tsv, downloads.txt, wordcloud.svg
:close          close the results
:quit";

fn print_preview<W: Write>(app: &App, out: &mut W) -> Result<()> {
    let st = app.search();
    if let Some(count) = st.count {
        writeln!(out, "{} match(es) for {:?}{}", count, st.text.trim(), if st.valid { "" } else { " (cannot submit)" })?;
    }
    if let Some(a) = app.advisory() {
        writeln!(out, "{}", advisory_text(a))?;
    }
    Ok(())
}

fn print_table<W: Write>(app: &App, out: &mut W) -> Result<()> {
    match app.table() {
        Some(t) => {
            writeln!(out, "Results found: {}. Selected columns: {}", t.row_count(), t.selection.count())?;
            write!(out, "{}", format_profiles(&t.profiles, &|name| t.selection.is_selected(name)))?;
        }
        None => writeln!(out, "no search results")?,
    }
    Ok(())
}

/// Run one command; returns false when the session should end.
pub async fn handle<W: Write>(app: &mut App, cmd: Command, out: &mut W) -> Result<bool> {
    match cmd {
        Command::Text(t) => app.type_text(&t),
        Command::Submit => {
            if !app.can_submit() {
                writeln!(out, "nothing to submit yet")?;
                return Ok(true);
            }
            match app.submit_search().await {
                Ok(SubmitOutcome::Published(_)) => print_table(app, out)?,
                Ok(other) => writeln!(out, "search finished without results ({other:?})")?,
                Err(e) => writeln!(out, "search failed: {e}")?,
            }
        }
        Command::Wait => {
            app.settle_preview().await;
            print_preview(app, out)?;
        }
        Command::Status => {
            let st = app.search();
            writeln!(out, "text={:?} phase={:?} count={:?} valid={}", st.text, st.phase, st.count, st.valid)?;
        }
        Command::Columns => print_table(app, out)?,
        Command::Column(name) => {
            if !app.toggle_column(&name) {
                writeln!(out, "unknown column {name:?}")?;
            }
        }
        Command::AllColumns => {
            app.toggle_all_columns();
            writeln!(out, "{:?}", app.header_state())?;
        }
        Command::Continue => {
            if !app.can_continue() {
                writeln!(out, "select at least one column first")?;
                return Ok(true);
            }
            match app.continue_to_tagging().await {
                Ok(true) => writeln!(out, "tagged {} studies", app.results().map_or(0, |r| r.ai().groups.len()))?,
                Ok(false) => writeln!(out, "tagging was interrupted")?,
                Err(e) => writeln!(out, "tagging failed: {e}")?,
            }
        }
        Command::Tags => {
            if let Some(r) = app.results() {
                for t in r.tag_list() {
                    writeln!(out, "{} {}", if t.checked { "[x]" } else { "[ ]" }, t.label)?;
                }
            }
        }
        Command::Filter(tag) => app.toggle_filter(&tag),
        Command::Include(id) => app.toggle_included(&id),
        Command::Cards => {
            if let Some(r) = app.results() {
                for card in r.cards() {
                    let chips: Vec<String> =
                        card.chips.iter().map(|c| if c.highlighted { format!("*{}*", c.tag) } else { c.tag.clone() }).collect();
                    writeln!(out, "{} {} [{}] {}", if card.included { "[x]" } else { "[ ]" }, card.id, chips.join(", "), card.expand_label)?;
                    for (col, text) in &card.description {
                        writeln!(out, "    {col}: {text}")?;
                    }
                }
            }
        }
        Command::Grid { id, page } => match app.results().and_then(|r| r.grid(&id)) {
            Some(grid) => {
                writeln!(out, "{}", grid.visible_columns().join("\t"))?;
                for row in grid.page(page) {
                    writeln!(out, "{}", row.join("\t"))?;
                }
                writeln!(out, "page {}/{}", page + 1, grid.page_count())?;
            }
            None => writeln!(out, "no study {id:?}")?,
        },
        Command::CloudWidth(w) => {
            app.resize_cloud(w);
            if let Some(cloud) = app.cloud() {
                for p in cloud.placed() {
                    writeln!(out, "{} {} at ({:.1}, {:.1})", p.text, p.size, p.x, p.y)?;
                }
            }
        }
        Command::Click { x, y } => match app.click_cloud(x, y) {
            Some(tag) => writeln!(out, "filter {tag}: {}", if app.results().map_or(false, |r| r.filters().contains(&tag)) { "on" } else { "off" })?,
            None => writeln!(out, "no label there")?,
        },
        Command::Export(dir) => match app.results() {
            Some(r) => {
                let mut paths = r.write_exports(&dir)?;
                if let Some(svg) = app.cloud_svg()? {
                    paths.push(write_file(&dir, CLOUD_FILE, &svg)?);
                }
                for p in paths {
                    writeln!(out, "wrote {}", p.display())?;
                }
            }
            None => writeln!(out, "no results to export")?,
        },
        Command::Close => app.close_results(),
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Quit => return Ok(false),
        Command::Unknown(l) => writeln!(out, "unknown command {l:?}, try :help")?,
    }
    Ok(true)
}

pub async fn run<R, W>(app: &mut App, input: R, out: &mut W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !handle(app, parse_line(&line), out).await? { break; }
            }
            _ = app.settle_preview(), if app.preview_pending() => print_preview(app, out)?,
        }
    }
    Ok(())
}
