//! Admin link-verification pipeline: URL column → verifier → results table.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use coursewise_shared::{AppConfig, Result, ScrapeResult, VerifierConfig};

use crate::session::Session;

/// Configuration for [`verify_catalog_links`].
#[derive(Debug, Clone)]
pub struct VerifyLinksConfig {
    /// Table whose `URL` column lists the links to check.
    pub input_path: PathBuf,
    /// Where to write `URL,title,snippet`; `None` keeps results in memory only.
    pub output_path: Option<PathBuf>,
    pub verifier: VerifierConfig,
}

impl VerifyLinksConfig {
    /// Paths from `[defaults]`, verifier settings from `[verifier]`.
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            input_path: PathBuf::from(&config.defaults.catalog_path),
            output_path: Some(PathBuf::from(&config.defaults.scraped_path)),
            verifier: VerifierConfig::from(config),
        }
    }
}

/// Result of a link-verification run.
#[derive(Debug)]
pub struct VerifyLinksResult {
    /// One entry per input URL, in input order.
    pub results: Vec<ScrapeResult>,
    /// Where the table was written, if it was.
    pub output_path: Option<PathBuf>,
    pub ok: usize,
    pub failed: usize,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each URL with the completed fraction of the batch.
    fn progress(&self, fraction: f64);
    /// Called when the pipeline completes.
    fn done(&self, result: &VerifyLinksResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn progress(&self, _fraction: f64) {}
    fn done(&self, _result: &VerifyLinksResult) {}
}

/// Run the admin link check.
///
/// 1. Check the session is an admin's
/// 2. Read the `URL` column of the input table
/// 3. Verify every URL
/// 4. Write the results table (if an output path is set)
#[instrument(skip_all, fields(input = %config.input_path.display()))]
pub async fn verify_catalog_links(
    config: &VerifyLinksConfig,
    session: &Session,
    progress: &dyn ProgressReporter,
) -> Result<VerifyLinksResult> {
    session.require_admin()?;

    let started_at = Utc::now();
    let start = Instant::now();

    progress.phase("Reading URLs");
    let urls = coursewise_catalog::read_url_column(&config.input_path)?;
    info!(urls = urls.len(), "starting catalog link check");

    progress.phase("Verifying links");
    let mut forward = |fraction: f64| progress.progress(fraction);
    let results = coursewise_verifier::scrape_urls(&urls, &config.verifier, Some(&mut forward)).await?;

    if let Some(path) = &config.output_path {
        progress.phase("Writing results");
        coursewise_catalog::write_scrape_results(path, &results)?;
    }

    let failed = results.iter().filter(|r| r.is_error()).count();
    let result = VerifyLinksResult {
        ok: results.len() - failed,
        failed,
        results,
        output_path: config.output_path.clone(),
        started_at,
        elapsed: start.elapsed(),
    };

    info!(
        ok = result.ok,
        failed = result.failed,
        elapsed_ms = result.elapsed.as_millis() as u64,
        "catalog link check completed"
    );
    progress.done(&result);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use wiremock::matchers::path;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use coursewise_shared::CoursewiseError;

    use crate::auth::UserDirectory;

    use super::*;

    #[derive(Default)]
    struct RecordingProgress {
        phases: Mutex<Vec<String>>,
        fractions: Mutex<Vec<f64>>,
        done: Mutex<usize>,
    }

    impl ProgressReporter for RecordingProgress {
        fn phase(&self, name: &str) {
            self.phases.lock().unwrap().push(name.to_string());
        }
        fn progress(&self, fraction: f64) {
            self.fractions.lock().unwrap().push(fraction);
        }
        fn done(&self, _result: &VerifyLinksResult) {
            *self.done.lock().unwrap() += 1;
        }
    }

    fn session_as(username: &str, password: &str) -> Session {
        let mut session = Session::new();
        session
            .login(
                &UserDirectory::new(("admin", "s3cret"), ("user", "letmein")),
                username,
                password,
            )
            .unwrap();
        session
    }

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("coursewise-admin-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn admin_run_writes_results_table() {
        let server = MockServer::start().await;
        Mock::given(path("/credit-risk"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<html><head><title>Credit Risk</title></head><body>Learn\ncredit risk.</body></html>",
            ))
            .mount(&server)
            .await;

        let dir = scratch_dir();
        let input = dir.join("courses.csv");
        std::fs::write(
            &input,
            format!(
                "Course Title, URL \nCredit,{0}/credit-risk\nNo link,\nGone,{0}/gone\n",
                server.uri()
            ),
        )
        .unwrap();
        let output = dir.join("out").join("scraped.csv");
        let config = VerifyLinksConfig {
            input_path: input,
            output_path: Some(output.clone()),
            verifier: VerifierConfig::default(),
        };
        let progress = RecordingProgress::default();

        let result = verify_catalog_links(&config, &session_as("admin", "s3cret"), &progress)
            .await
            .unwrap();

        assert_eq!(result.results.len(), 2);
        assert_eq!(result.ok, 1);
        assert_eq!(result.failed, 1);
        assert_eq!(result.output_path.as_deref(), Some(output.as_path()));
        assert_eq!(*progress.fractions.lock().unwrap(), vec![0.5, 1.0]);
        assert_eq!(*progress.done.lock().unwrap(), 1);
        assert_eq!(
            *progress.phases.lock().unwrap(),
            vec!["Reading URLs", "Verifying links", "Writing results"]
        );

        let written = std::fs::read_to_string(&output).unwrap();
        let mut lines = written.lines();
        assert_eq!(lines.next(), Some("URL,title,snippet"));
        assert_eq!(
            lines.next(),
            Some(format!("{}/credit-risk,Credit Risk,Learn credit risk.", server.uri()).as_str())
        );
        assert!(lines.next().unwrap().contains(",Error,HTTP 404 returned by"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn non_admin_is_refused_before_reading() {
        let config = VerifyLinksConfig {
            input_path: PathBuf::from("/nonexistent/courses.csv"),
            output_path: None,
            verifier: VerifierConfig::default(),
        };

        let err = verify_catalog_links(&config, &session_as("user", "letmein"), &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, CoursewiseError::Auth(_)));
        assert_eq!(err.to_string(), "access denied: this action is for admin users only");
    }

    #[tokio::test]
    async fn missing_input_table_is_an_error() {
        let config = VerifyLinksConfig {
            input_path: PathBuf::from("/nonexistent/courses.csv"),
            output_path: None,
            verifier: VerifierConfig::default(),
        };

        let err = verify_catalog_links(&config, &session_as("admin", "s3cret"), &SilentProgress)
            .await
            .unwrap_err();

        assert!(matches!(err, CoursewiseError::Io { .. }));
    }

    #[test]
    fn config_paths_come_from_defaults_section() {
        let config = VerifyLinksConfig::from_app_config(&AppConfig::default());
        assert_eq!(config.input_path, PathBuf::from("data/courses.csv"));
        assert_eq!(
            config.output_path,
            Some(PathBuf::from("data/courses_with_scraped_info.csv"))
        );
    }
}
