//! Flat-file tables used by the link verifier.
//!
//! Input: any delimited table with a `URL` column. Output: `URL,title,snippet`,
//! written in one go after a batch completes.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use tracing::{debug, info};

use coursewise_shared::{COL_URL, CoursewiseError, Result, ScrapeResult};

/// Header row of the verification output table.
pub const OUTPUT_HEADERS: [&str; 3] = ["URL", "title", "snippet"];

/// Read the non-empty values of the `URL` column from a delimited file.
pub fn read_url_column(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| CoursewiseError::io(path, e))?;
    let urls = read_url_column_from(file)?;
    info!(path = %path.display(), urls = urls.len(), "read URL column");
    Ok(urls)
}

/// Read the `URL` column from any CSV source. Rows with an empty or missing
/// URL are dropped.
pub fn read_url_column_from<R: Read>(reader: R) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let url_idx = reader
        .headers()
        .map_err(|e| CoursewiseError::parse(format!("table header: {e}")))?
        .iter()
        .position(|h| h.trim() == COL_URL)
        .ok_or_else(|| CoursewiseError::validation(format!("input table has no `{COL_URL}` column")))?;

    let mut urls = Vec::new();
    let mut dropped = 0usize;
    for (row, result) in reader.records().enumerate() {
        let record =
            result.map_err(|e| CoursewiseError::parse(format!("table row {}: {e}", row + 1)))?;
        match record.get(url_idx).map(str::trim) {
            Some(url) if !url.is_empty() => urls.push(url.to_string()),
            _ => dropped += 1,
        }
    }

    if dropped > 0 {
        debug!(dropped, "rows without URL dropped");
    }
    Ok(urls)
}

/// Write verification results to `path`, replacing any existing file.
pub fn write_scrape_results(path: &Path, results: &[ScrapeResult]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| CoursewiseError::io(parent, e))?;
        }
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .map_err(|e| csv_to_error(path, e))?;

    writer
        .write_record(OUTPUT_HEADERS)
        .map_err(|e| csv_to_error(path, e))?;
    for result in results {
        writer.serialize(result).map_err(|e| csv_to_error(path, e))?;
    }
    writer.flush().map_err(|e| CoursewiseError::io(path, e))?;

    info!(path = %path.display(), rows = results.len(), "wrote verification results");
    Ok(())
}

fn csv_to_error(path: &Path, err: csv::Error) -> CoursewiseError {
    if err.is_io_error() {
        match err.into_kind() {
            csv::ErrorKind::Io(source) => CoursewiseError::io(path, source),
            other => CoursewiseError::parse(format!("{}: {other:?}", path.display())),
        }
    } else {
        CoursewiseError::parse(format!("{}: {err}", path.display()))
    }
}
