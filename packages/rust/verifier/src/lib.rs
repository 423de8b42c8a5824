//! Link verifier: batch title/snippet extraction over a list of URLs.
//!
//! This crate provides:
//! - [`browser`] — the [`Browser`]/[`Page`] traits the batch loop drives
//! - [`HttpBrowser`] — the shipped browser, backed by an HTTP client
//! - [`engine`] — the batch loop and its sync/async entry points
//! - [`extract`] — title, body text and snippet helpers

pub mod browser;
pub mod engine;
pub mod extract;
pub mod http;

pub use browser::{Browser, Page};
pub use engine::{ProgressFn, scrape_from_csv, scrape_urls, verify_links};
pub use http::{HttpBrowser, HttpPage};
