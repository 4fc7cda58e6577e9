use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand};
use dumpview_client::{advisory_text, format_profiles, repl, App, Gateway, OverflowPolicy, SearchConfig, SubmitOutcome, TermMode};
use dumpview_core::cloud::CloudConfig;
use dumpview_core::export::{write_file, CLOUD_FILE};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "dumpview")]
#[command(about = "Search NCBI dump metadata, tag studies with the NLP service and export the results", long_about = None)]
struct Cli {
    /// Base URL of the backend API
    #[arg(long, default_value = "http://localhost:9090/api/v1/")]
    api: String,
    /// Maximum number of results requested from the backend
    #[arg(long, default_value_t = 1000)]
    max_results: usize,
    /// How to treat a term matching more than --max-results records
    #[arg(long, value_enum, default_value_t = OverflowPolicy::Advisory)]
    overflow: OverflowPolicy,
    /// Send each whitespace-separated word as its own term
    #[arg(long, default_value_t = false)]
    split_terms: bool,
    /// Quiet period before the match count is previewed
    #[arg(long, default_value_t = 1500)]
    debounce_ms: u64,
    /// Request timeout seconds (0 = none)
    #[arg(long, default_value_t = 0)]
    timeout_secs: u64,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print how many records match a term
    Peek { term: String },
    /// Search, tag and export in one go
    Search {
        term: String,
        /// Column to send for tagging (repeatable); defaults to title and abstract
        #[arg(long = "column")]
        columns: Vec<String>,
        /// Send every column for tagging
        #[arg(long, default_value_t = false)]
        all_columns: bool,
        /// Only keep studies carrying one of these tags (repeatable)
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Leave a study out of the exports (repeatable)
        #[arg(long = "exclude")]
        excludes: Vec<String>,
        /// Output directory for the exported files
        #[arg(long, default_value = "./out")]
        out: PathBuf,
        /// Word cloud width in pixels
        #[arg(long, default_value_t = 1000.0)]
        cloud_width: f64,
    },
    /// Interactive session reading commands from stdin
    Repl,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    let timeout = (cli.timeout_secs > 0).then(|| Duration::from_secs(cli.timeout_secs));
    let gateway = Arc::new(Gateway::http(&cli.api, timeout)?);
    let config = SearchConfig {
        debounce: Duration::from_millis(cli.debounce_ms),
        max_results: cli.max_results,
        overflow: cli.overflow,
        term_mode: if cli.split_terms { TermMode::SplitWhitespace } else { TermMode::Whole },
    };

    match cli.command {
        Commands::Peek { term } => {
            let mut app = App::new(gateway, SearchConfig { debounce: Duration::ZERO, ..config }, CloudConfig::default());
            app.type_text(&term);
            app.settle_preview().await;
            let st = app.search();
            let count = st.count.ok_or_else(|| anyhow!("preview failed for {:?}", term))?;
            println!("{count}");
            if let Some(a) = app.advisory() {
                eprintln!("{}", advisory_text(a));
            }
            Ok(())
        }
        Commands::Search { term, columns, all_columns, filters, excludes, out, cloud_width } => {
            let cloud = CloudConfig { width: cloud_width, ..Default::default() };
            let mut app = App::new(gateway, SearchConfig { debounce: Duration::ZERO, ..config }, cloud);
            run_search(&mut app, &term, &columns, all_columns, &filters, &excludes, &out).await
        }
        Commands::Repl => {
            let mut app = App::new(gateway, config, CloudConfig::default());
            eprintln!("dumpview: type search text, :help for commands");
            repl::run(&mut app, BufReader::new(tokio::io::stdin()), &mut std::io::stdout()).await
        }
    }
}

async fn run_search(
    app: &mut App,
    term: &str,
    columns: &[String],
    all_columns: bool,
    filters: &[String],
    excludes: &[String],
    out: &Path,
) -> Result<()> {
    app.type_text(term);
    app.settle_preview().await;
    let st = app.search();
    eprintln!("search: term={:?} count={:?}", term, st.count);
    if let Some(a) = app.advisory() {
        eprintln!("{}", advisory_text(a));
    }
    if !app.can_submit() {
        bail!("term {:?} cannot be submitted", term);
    }

    match app.submit_search().await? {
        SubmitOutcome::Published(_) => {}
        other => bail!("search returned no metadata ({:?})", other),
    }

    if all_columns {
        app.select_all_columns(true);
    } else if !columns.is_empty() {
        app.select_all_columns(false);
        for c in columns {
            if !app.set_column(c, true) {
                tracing::warn!(column = %c, "unknown column ignored");
            }
        }
    }
    if let Some(t) = app.table() {
        println!("Results found: {}", t.row_count());
        print!("{}", format_profiles(&t.profiles, &|name| t.selection.is_selected(name)));
    }
    if !app.can_continue() {
        bail!("no columns selected for tagging");
    }
    if !app.continue_to_tagging().await? {
        bail!("tagging was interrupted");
    }

    for f in filters {
        app.toggle_filter(f);
    }
    for id in excludes {
        app.toggle_included(id);
    }

    let results = app.results().ok_or_else(|| anyhow!("no tagging results"))?;
    for t in results.tag_list() {
        println!("{} {}", if t.checked { "[x]" } else { "[ ]" }, t.label);
    }
    let mut written = results.write_exports(out)?;
    if let Some(svg) = app.cloud_svg()? {
        written.push(write_file(out, CLOUD_FILE, &svg)?);
    }
    eprintln!(
        "done: studies={} exported={} -> {}",
        results.ai().groups.len(),
        results.exported_groups().count(),
        out.display()
    );
    for p in written {
        eprintln!("  {}", p.display());
    }
    Ok(())
}
