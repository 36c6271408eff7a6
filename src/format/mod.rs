//! Output document writing and the end-of-run summary.

use crate::models::{OutputDocument, SourceStatus};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::info;

static UNSAFE_CHARS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r#"[<>:"|?*\\/\s]"#).unwrap());
static UNDERSCORE_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"_{2,}").unwrap());

const MAX_FILENAME_LEN: usize = 100;

/// Makes `name` safe to use as a file name component.
pub fn sanitize_filename(name: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(name, "_");
    let collapsed = UNDERSCORE_RUNS.replace_all(&replaced, "_");
    let trimmed: String = collapsed
        .trim_matches(|c| c == '_' || c == '.')
        .chars()
        .take(MAX_FILENAME_LEN)
        .collect();

    if trimmed.is_empty() {
        "reviews".to_string()
    } else {
        trimmed
    }
}

/// `reviews_<company>_<YYYYMMDD_HHMMSS>.json`
pub fn default_file_name(company: &str, at: DateTime<Utc>) -> String {
    format!("reviews_{}_{}.json", sanitize_filename(company), at.format("%Y%m%d_%H%M%S"))
}

/// Writes `document` as pretty-printed JSON and returns the path written.
///
/// Without an explicit path the file goes to `output_dir` under
/// [`default_file_name`]. Explicit paths must end in `.json`.
pub fn write_document(
    document: &OutputDocument,
    explicit_path: Option<&Path>,
    output_dir: &Path,
) -> Result<PathBuf> {
    let path = match explicit_path {
        Some(path) => {
            let is_json = path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
            if !is_json {
                anyhow::bail!("Output file must have a .json extension: {}", path.display());
            }
            path.to_path_buf()
        }
        None => output_dir
            .join(default_file_name(&document.company_name, document.scraping_timestamp)),
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(document).context("Failed to serialize results")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write output file: {}", path.display()))?;

    info!("Results saved to {}", path.display());
    Ok(path)
}

/// Renders the human-readable end-of-run summary.
pub fn summary(document: &OutputDocument, path: Option<&Path>) -> String {
    let source_width = 12;
    let count_width = 8;
    let pages_width = 6;

    let mut lines = Vec::new();

    lines.push(format!("Company:  {}", document.company_name));
    lines.push(format!(
        "Range:    {} to {}",
        document.date_range.start(),
        document.date_range.end()
    ));
    lines.push(format!("Reviews:  {}", document.total_reviews()));
    lines.push(String::new());

    lines.push(format!(
        "   {:<source_width$}  {:>count_width$}  {:>pages_width$}  {}",
        "Source", "Reviews", "Pages", "Status"
    ));
    lines.push(format!(
        "   {:-<source_width$}  {:-<count_width$}  {:-<pages_width$}  {:-<10}",
        "", "", "", ""
    ));

    for (source, result) in &document.sources {
        let mark = if result.is_success() { "✓" } else { "✗" };
        let status = match (&result.status, &result.error) {
            (SourceStatus::Success, _) => "success".to_string(),
            (SourceStatus::Partial, Some(e)) => format!("partial: {}", e.message),
            (SourceStatus::Failed, Some(e)) => format!("failed: {}", e.message),
            (status, None) => format!("{:?}", status).to_lowercase(),
        };

        lines.push(format!(
            "{}  {:<source_width$}  {:>count_width$}  {:>pages_width$}  {}",
            mark, source.to_string(), result.total_reviews, result.pages_visited, status
        ));
    }

    if let Some(path) = path {
        lines.push(String::new());
        lines.push(format!("Saved to: {}", path.display()));
    }

    lines.join("\n")
}
