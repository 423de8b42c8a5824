//! Conversation and admin workflows for Coursewise.
//!
//! This crate ties the catalog, the completion collaborator and the link
//! verifier into the two things a session can do: ask about courses
//! ([`ConversationHandler`]) and, for admins, check every catalog link
//! ([`verify_catalog_links`]).

pub mod admin;
pub mod auth;
pub mod completion;
pub mod conversation;
pub mod prompts;
pub mod session;

pub use admin::{
    ProgressReporter, SilentProgress, VerifyLinksConfig, VerifyLinksResult, verify_catalog_links,
};
pub use auth::{Role, UserDirectory};
pub use completion::{CompletionClient, ModerationVerdict, OpenRouterClient};
pub use conversation::{ChatReply, ConversationHandler, CourseMatch, parse_matches};
pub use session::Session;
