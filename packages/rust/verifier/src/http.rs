//! HTTP-backed browser: navigation is a GET (redirects followed), the
//! response body is the loaded document.

use std::error::Error as _;
use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use coursewise_shared::{CoursewiseError, FetchError, Result, VerifierConfig};

use crate::browser::{Browser, Page};
use crate::extract;

/// Maximum redirects followed by a single navigation.
const MAX_REDIRECTS: usize = 10;

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8";

// ---------------------------------------------------------------------------
// HttpBrowser
// ---------------------------------------------------------------------------

/// Browser whose pages share one HTTP client (and its connection pool).
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    /// Start a browser configured from `config`.
    pub fn launch(config: &VerifierConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| CoursewiseError::Network(format!("failed to build HTTP client: {e}")))?;

        debug!(user_agent = %config.user_agent, "browser launched");
        Ok(Self { client })
    }
}

impl Browser for HttpBrowser {
    type Page = HttpPage;

    async fn new_page(&self) -> Result<HttpPage> {
        Ok(HttpPage {
            client: self.client.clone(),
            document: None,
        })
    }

    async fn close(self) {
        debug!("browser closed");
    }
}

// ---------------------------------------------------------------------------
// HttpPage
// ---------------------------------------------------------------------------

/// A page holding the most recently loaded document.
pub struct HttpPage {
    client: Client,
    document: Option<String>,
}

impl Page for HttpPage {
    async fn goto(&mut self, url: &str, timeout: Duration) -> std::result::Result<(), FetchError> {
        self.document = None;

        let parsed = Url::parse(url).map_err(|e| FetchError::Parse {
            url: url.to_string(),
            message: format!("invalid URL: {e}"),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(FetchError::Parse {
                url: url.to_string(),
                message: format!("unsupported scheme `{}`", parsed.scheme()),
            });
        }

        let timeout_ms = timeout.as_millis() as u64;
        let client = self.client.clone();
        let navigation = async move {
            let response = client
                .get(parsed)
                .header(reqwest::header::ACCEPT, ACCEPT_HTML)
                .send()
                .await
                .map_err(|e| classify(url, &e, timeout_ms))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            response.text().await.map_err(|e| classify(url, &e, timeout_ms))
        };

        let body = match tokio::time::timeout(timeout, navigation).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::Timeout {
                    url: url.to_string(),
                    timeout_ms,
                });
            }
        };

        self.document = Some(body);
        Ok(())
    }

    async fn title(&self) -> std::result::Result<String, FetchError> {
        Ok(self
            .document
            .as_deref()
            .map(extract::document_title)
            .unwrap_or_default())
    }

    async fn text_content(&self, selector: &str) -> std::result::Result<Option<String>, FetchError> {
        Ok(self
            .document
            .as_deref()
            .and_then(|html| extract::text_content(html, selector)))
    }

    async fn close(self) {}
}

/// Map a transport error onto the per-URL error taxonomy.
fn classify(url: &str, err: &reqwest::Error, timeout_ms: u64) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout {
            url: url.to_string(),
            timeout_ms,
        }
    } else if err.is_decode() || err.is_builder() {
        FetchError::Parse {
            url: url.to_string(),
            message: error_chain(err),
        }
    } else {
        FetchError::Network {
            url: url.to_string(),
            message: error_chain(err),
        }
    }
}

/// `err` followed by its sources, joined with `: `.
fn error_chain(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> HttpPage {
        let browser = HttpBrowser::launch(&VerifierConfig::default()).unwrap();
        HttpPage {
            client: browser.client,
            document: None,
        }
    }

    #[tokio::test]
    async fn blank_page_has_no_title_or_text() {
        let page = page();
        assert_eq!(page.title().await.unwrap(), "");
        assert!(page.text_content("body").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejects_malformed_url() {
        let mut page = page();
        let err = page
            .goto("not a url", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
        assert!(err.to_string().contains("invalid URL"));
    }

    #[tokio::test]
    async fn rejects_non_http_scheme() {
        let mut page = page();
        let err = page
            .goto("ftp://files.example.com/brochure.pdf", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Parse { .. }));
        assert!(err.to_string().contains("unsupported scheme `ftp`"));
    }

    #[tokio::test]
    async fn loads_document_and_reports_status() {
        let server = wiremock::MockServer::start().await;
        wiremock::Mock::given(wiremock::matchers::path("/course"))
            .respond_with(wiremock::ResponseTemplate::new(200).set_body_string(
                "<html><head><title>Treasury Basics</title></head><body><p>Cash</p></body></html>",
            ))
            .mount(&server)
            .await;
        wiremock::Mock::given(wiremock::matchers::path("/gone"))
            .respond_with(wiremock::ResponseTemplate::new(410))
            .mount(&server)
            .await;

        let mut page = page();
        page.goto(&format!("{}/course", server.uri()), Duration::from_secs(5))
            .await
            .expect("navigate");
        assert_eq!(page.title().await.unwrap(), "Treasury Basics");
        assert_eq!(
            page.text_content("body").await.unwrap().as_deref(),
            Some("Cash")
        );

        let err = page
            .goto(&format!("{}/gone", server.uri()), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            FetchError::HttpStatus {
                url: format!("{}/gone", server.uri()),
                status: 410,
            }
        );
        // The failed navigation discards the previous document.
        assert_eq!(page.title().await.unwrap(), "");
    }
}
