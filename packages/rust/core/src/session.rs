//! Per-user conversation context.

use tracing::info;

use coursewise_shared::{ChatMessage, CourseRecord, CoursewiseError, Result, SessionId};

use crate::auth::{Role, UserDirectory};
use crate::prompts::GREETING;

/// Everything one user's interaction carries: who they are, what has been
/// said, and which courses the last turn matched.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    role: Option<Role>,
    history: Vec<ChatMessage>,
    matched_courses: Vec<CourseRecord>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// A fresh, logged-out session whose history holds the greeting.
    pub fn new() -> Self {
        Self {
            id: SessionId::new(),
            role: None,
            history: vec![ChatMessage::system(GREETING)],
            matched_courses: Vec::new(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_logged_in(&self) -> bool {
        self.role.is_some()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn matched_courses(&self) -> &[CourseRecord] {
        &self.matched_courses
    }

    /// Check credentials against `directory`. A failed attempt logs the
    /// session out.
    pub fn login(&mut self, directory: &UserDirectory, username: &str, password: &str) -> Result<Role> {
        match directory.authenticate(username, password) {
            Some(role) => {
                info!(session = %self.id, %role, "logged in");
                self.role = Some(role);
                Ok(role)
            }
            None => {
                self.role = None;
                Err(CoursewiseError::Auth("invalid username or password".into()))
            }
        }
    }

    /// Drop the role, the conversation and its matches; start over under a new id.
    pub fn logout(&mut self) {
        info!(session = %self.id, "logged out");
        *self = Self::new();
    }

    /// Start a new conversation without logging out.
    pub fn reset_conversation(&mut self) {
        self.history = vec![ChatMessage::system(GREETING)];
        self.matched_courses.clear();
    }

    pub fn require_login(&self) -> Result<Role> {
        self.role
            .ok_or_else(|| CoursewiseError::Auth("login required".into()))
    }

    pub fn require_admin(&self) -> Result<()> {
        match self.role {
            Some(Role::Admin) => Ok(()),
            _ => Err(CoursewiseError::Auth(
                "access denied: this action is for admin users only".into(),
            )),
        }
    }

    pub(crate) fn push(&mut self, message: ChatMessage) {
        self.history.push(message);
    }

    pub(crate) fn set_matched_courses(&mut self, courses: Vec<CourseRecord>) {
        self.matched_courses = courses;
    }
}
