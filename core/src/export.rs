use anyhow::Result;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::Value;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const ROWS_FILE: &str = "results.tsv";
pub const TAGS_FILE: &str = "ai_processed.tsv";
pub const DOWNLOADS_FILE: &str = "downloads.txt";
pub const CLOUD_FILE: &str = "wordcloud.svg";

/// Tab-separated table; a field is quoted only when it holds a tab, newline or quote.
pub fn to_tsv<R, F>(records: R) -> Result<String>
where
    R: IntoIterator<Item = Vec<F>>,
    F: AsRef<[u8]>,
{
    let mut w = WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(Vec::new());
    for rec in records {
        w.write_record(rec)?;
    }
    let bytes = w.into_inner().map_err(|e| anyhow::anyhow!("flush tsv: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

/// URLs held by a "Download Links" cell: an array of links or a single link.
pub fn download_links(cell: &Value) -> Vec<String> {
    match cell {
        Value::Array(items) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Value::String(s) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

pub fn wget_script<I: IntoIterator<Item = String>>(urls: I) -> String {
    urls.into_iter().map(|u| format!("wget {u}\n")).collect()
}

pub fn write_file(dir: &Path, name: &str, contents: &str) -> Result<PathBuf> {
    create_dir_all(dir)?;
    let path = dir.join(name);
    let mut f = File::create(&path)?;
    f.write_all(contents.as_bytes())?;
    Ok(path)
}
