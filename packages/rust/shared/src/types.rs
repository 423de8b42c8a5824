//! Core domain types: course records, chat messages, scrape results.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FetchError;

/// Catalog column holding the competency name.
pub const COL_COMPETENCY: &str = "Competency";
/// Catalog column holding the course title.
pub const COL_TITLE: &str = "Course Title";
/// Catalog column holding the proficiency level.
pub const COL_PROFICIENCY: &str = "Proficiency Level";
/// Catalog column holding the course provider.
pub const COL_PROVIDER: &str = "Course Provider";
/// Column holding a course or page URL (catalog and verifier input).
pub const COL_URL: &str = "URL";

/// Title recorded for every URL that could not be verified.
pub const ERROR_TITLE: &str = "Error";

// ---------------------------------------------------------------------------
// SessionId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for session identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new time-sortable session identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CourseRecord
// ---------------------------------------------------------------------------

/// One catalog row: column name → cell value.
///
/// Missing cells are stored as empty strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseRecord {
    pub fields: BTreeMap<String, String>,
}

impl CourseRecord {
    /// Build a record from `(column, value)` pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Cell value for `column`, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.fields.get(column).map(String::as_str).unwrap_or("")
    }

    /// Trimmed course title (the lookup key).
    pub fn title(&self) -> &str {
        self.get(COL_TITLE).trim()
    }

    /// Trimmed competency name.
    pub fn competency(&self) -> &str {
        self.get(COL_COMPETENCY).trim()
    }

    pub fn url(&self) -> &str {
        self.get(COL_URL).trim()
    }
}

// ---------------------------------------------------------------------------
// Conversation messages
// ---------------------------------------------------------------------------

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

/// A single message of a conversation (also the completion API wire shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ScrapeResult
// ---------------------------------------------------------------------------

/// Outcome of verifying one URL.
///
/// Serializes to the `URL,title,snippet` output table; the typed error is
/// kept in memory only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeResult {
    #[serde(rename = "URL")]
    pub url: String,
    /// Page title, or [`ERROR_TITLE`] on failure.
    pub title: String,
    /// Body text snippet, or the error message on failure.
    pub snippet: String,
    #[serde(skip)]
    pub error: Option<FetchError>,
}

impl ScrapeResult {
    /// A successfully verified page.
    pub fn success(url: impl Into<String>, title: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: title.into(),
            snippet: snippet.into(),
            error: None,
        }
    }

    /// A page that could not be verified.
    pub fn failure(url: impl Into<String>, error: FetchError) -> Self {
        Self {
            url: url.into(),
            title: ERROR_TITLE.to_string(),
            snippet: error.to_string(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn course_record_accessors_trim() {
        let record = CourseRecord::from_pairs([
            (COL_TITLE, "  Risk Management Essentials "),
            (COL_COMPETENCY, "Risk "),
            (COL_URL, " https://example.com/risk"),
        ]);
        assert_eq!(record.title(), "Risk Management Essentials");
        assert_eq!(record.competency(), "Risk");
        assert_eq!(record.url(), "https://example.com/risk");
        assert_eq!(record.get("Cost"), "");
    }

    #[test]
    fn course_record_serializes_as_flat_map() {
        let record = CourseRecord::from_pairs([(COL_TITLE, "Treasury 101"), ("Cost", "$500")]);
        let json = serde_json::to_string(&record).expect("serialize");
        assert_eq!(json, r#"{"Cost":"$500","Course Title":"Treasury 101"}"#);
    }

    #[test]
    fn chat_message_wire_shape() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).expect("serialize");
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn scrape_failure_uses_error_title() {
        let err = FetchError::Network {
            url: "https://nonexistent.invalid".into(),
            message: "dns error".into(),
        };
        let result = ScrapeResult::failure("https://nonexistent.invalid", err.clone());
        assert_eq!(result.title, ERROR_TITLE);
        assert_eq!(result.snippet, err.to_string());
        assert!(result.is_error());

        let ok = ScrapeResult::success("https://example.com", "Example Domain", "text");
        assert!(!ok.is_error());
    }

    #[test]
    fn page_titled_error_is_not_a_failure() {
        let page = ScrapeResult::success("https://example.com/oops", ERROR_TITLE, "Something went wrong");
        assert!(!page.is_error());
    }
}
