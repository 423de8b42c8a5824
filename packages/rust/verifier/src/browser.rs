//! Browser and page abstraction driven by the verification loop.
//!
//! A [`Browser`] hands out [`Page`]s; a page navigates to one URL at a time and
//! exposes the loaded document's title and text. The shipped implementation is
//! [`HttpBrowser`](crate::http::HttpBrowser); a headless engine can slot in
//! behind the same traits.

use std::future::Future;
use std::time::Duration;

use coursewise_shared::{FetchError, Result};

/// A single tab. Reused across navigations; the previous document is
/// discarded by every `goto`.
pub trait Page: Send + Sync + 'static {
    /// Navigate to `url`, failing if the load takes longer than `timeout`.
    fn goto(
        &mut self,
        url: &str,
        timeout: Duration,
    ) -> impl Future<Output = std::result::Result<(), FetchError>> + Send;

    /// Title of the loaded document (`""` if it has none).
    fn title(&self) -> impl Future<Output = std::result::Result<String, FetchError>> + Send;

    /// Text content of the first element matching `selector`.
    fn text_content(
        &self,
        selector: &str,
    ) -> impl Future<Output = std::result::Result<Option<String>, FetchError>> + Send;

    /// Release the page.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// A browser instance owning the resources its pages share.
pub trait Browser: Send + Sync {
    type Page: Page;

    /// Open a new blank page.
    fn new_page(&self) -> impl Future<Output = Result<Self::Page>> + Send;

    /// Shut the browser down.
    fn close(self) -> impl Future<Output = ()> + Send;
}
