//! Batch link verification loop.
//!
//! For each URL: navigate the page, record the title and a body-text snippet,
//! or record the failure, then report progress. Failures are data; the batch
//! never aborts because one URL failed and never retries.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, instrument, warn};

use coursewise_shared::{CoursewiseError, FetchError, Result, ScrapeResult, VerifierConfig};

use crate::browser::{Browser, Page};
use crate::extract::make_snippet;
use crate::http::HttpBrowser;

/// Progress callback: receives `completed / total` after every URL.
pub type ProgressFn<'a> = &'a mut dyn FnMut(f64);

// ---------------------------------------------------------------------------
// Entry points
// ---------------------------------------------------------------------------

/// Verify `urls` with a freshly launched [`HttpBrowser`].
pub async fn scrape_urls(
    urls: &[String],
    config: &VerifierConfig,
    progress: Option<ProgressFn<'_>>,
) -> Result<Vec<ScrapeResult>> {
    let browser = HttpBrowser::launch(config)?;
    verify_links(browser, urls, config, progress).await
}

/// Read the `URL` column of `path` and verify every URL.
///
/// Blocking: the batch runs on a new single-threaded runtime created for this
/// call only. Must not be called from inside an async context.
pub fn scrape_from_csv(
    path: &Path,
    config: &VerifierConfig,
    progress: Option<ProgressFn<'_>>,
) -> Result<Vec<ScrapeResult>> {
    let urls = coursewise_catalog::read_url_column(path)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CoursewiseError::Network(format!("failed to start verifier runtime: {e}")))?;

    runtime.block_on(scrape_urls(&urls, config, progress))
}

/// Verify `urls` in order using pages from `browser`.
///
/// Returns exactly one result per input URL, in input order. The browser is
/// closed before returning, whatever happened to individual URLs. Only a
/// failure to open a page is returned as an error.
#[instrument(skip_all, fields(urls = urls.len(), concurrency = config.concurrency))]
pub async fn verify_links<B: Browser>(
    browser: B,
    urls: &[String],
    config: &VerifierConfig,
    mut progress: Option<ProgressFn<'_>>,
) -> Result<Vec<ScrapeResult>> {
    let start = Instant::now();
    info!(
        timeout_ms = config.timeout.as_millis() as u64,
        snippet_chars = config.snippet_chars,
        "starting link verification"
    );

    let results = if config.concurrency <= 1 || urls.len() <= 1 {
        verify_sequential(&browser, urls, config, &mut progress).await
    } else {
        verify_pooled(&browser, urls, config, &mut progress).await
    };
    browser.close().await;
    let results = results?;

    let failed = results.iter().filter(|r| r.is_error()).count();
    info!(
        verified = results.len() - failed,
        failed,
        duration_ms = start.elapsed().as_millis() as u64,
        "link verification completed"
    );

    Ok(results)
}

// ---------------------------------------------------------------------------
// Sequential: one page, one URL at a time
// ---------------------------------------------------------------------------

async fn verify_sequential<B: Browser>(
    browser: &B,
    urls: &[String],
    config: &VerifierConfig,
    progress: &mut Option<ProgressFn<'_>>,
) -> Result<Vec<ScrapeResult>> {
    let mut page = browser.new_page().await?;
    let total = urls.len();
    let mut results = Vec::with_capacity(total);

    for (i, url) in urls.iter().enumerate() {
        let result = visit(&mut page, url, config).await;
        log_result(&result);
        results.push(result);
        report(progress, i + 1, total);
    }

    page.close().await;
    Ok(results)
}

// ---------------------------------------------------------------------------
// Pooled: N pages, each owned by one worker
// ---------------------------------------------------------------------------

async fn verify_pooled<B: Browser>(
    browser: &B,
    urls: &[String],
    config: &VerifierConfig,
    progress: &mut Option<ProgressFn<'_>>,
) -> Result<Vec<ScrapeResult>> {
    let total = urls.len();
    let workers = config.concurrency.min(total);

    let mut pages = Vec::with_capacity(workers);
    for _ in 0..workers {
        match browser.new_page().await {
            Ok(page) => pages.push(page),
            Err(e) => {
                for page in pages {
                    page.close().await;
                }
                return Err(e);
            }
        }
    }

    let queue: Arc<Mutex<VecDeque<(usize, String)>>> =
        Arc::new(Mutex::new(urls.iter().cloned().enumerate().collect()));
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, ScrapeResult)>();

    let mut handles = Vec::with_capacity(workers);
    for mut page in pages {
        let queue = queue.clone();
        let tx = tx.clone();
        let config = config.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let next = queue.lock().await.pop_front();
                let Some((idx, url)) = next else {
                    break;
                };
                let result = visit(&mut page, &url, &config).await;
                if tx.send((idx, result)).is_err() {
                    break;
                }
            }
            page
        }));
    }
    drop(tx);

    let mut slots: Vec<Option<ScrapeResult>> = vec![None; total];
    let mut completed = 0usize;
    while let Some((idx, result)) = rx.recv().await {
        log_result(&result);
        slots[idx] = Some(result);
        completed += 1;
        report(progress, completed, total);
    }

    for handle in handles {
        match handle.await {
            Ok(page) => page.close().await,
            Err(e) => warn!(error = %e, "verification worker failed"),
        }
    }

    // A worker that died mid-navigation leaves its URL without a result.
    let mut results = Vec::with_capacity(total);
    for (idx, slot) in slots.into_iter().enumerate() {
        let result = match slot {
            Some(result) => result,
            None => {
                let url = urls[idx].clone();
                let result = ScrapeResult::failure(
                    url.clone(),
                    FetchError::Network {
                        url,
                        message: "verification worker aborted".into(),
                    },
                );
                completed += 1;
                report(progress, completed, total);
                result
            }
        };
        results.push(result);
    }

    Ok(results)
}

// ---------------------------------------------------------------------------
// Per-URL work
// ---------------------------------------------------------------------------

/// Navigate `page` to `url` and turn the outcome into a result record.
async fn visit<P: Page>(page: &mut P, url: &str, config: &VerifierConfig) -> ScrapeResult {
    match load(page, url, config).await {
        Ok((title, snippet)) => ScrapeResult::success(url, title, snippet),
        Err(e) => ScrapeResult::failure(url, e),
    }
}

async fn load<P: Page>(
    page: &mut P,
    url: &str,
    config: &VerifierConfig,
) -> std::result::Result<(String, String), FetchError> {
    page.goto(url, config.timeout).await?;
    let title = page.title().await?;
    let body = page.text_content("body").await?.unwrap_or_default();
    Ok((title, make_snippet(&body, config.snippet_chars)))
}

fn log_result(result: &ScrapeResult) {
    match &result.error {
        Some(e) => warn!(url = %result.url, kind = e.kind(), error = %e, "link check failed"),
        None => debug!(url = %result.url, title = %result.title, "link ok"),
    }
}

fn report(progress: &mut Option<ProgressFn<'_>>, completed: usize, total: usize) {
    if let Some(callback) = progress.as_deref_mut() {
        callback(completed as f64 / total as f64);
    }
}
