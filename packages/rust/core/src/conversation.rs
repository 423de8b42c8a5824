//! One conversation turn: classify the question against the catalog, look
//! up the matching courses, and answer from their details.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use coursewise_catalog::Catalog;
use coursewise_shared::{ChatMessage, CourseRecord, CoursewiseError, MessageRole, Result};

use crate::completion::CompletionClient;
use crate::prompts::{self, REFUSAL};
use crate::session::Session;

/// One `{competency, course_name}` pair picked by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseMatch {
    #[serde(default)]
    pub competency: String,
    #[serde(default)]
    pub course_name: String,
}

/// The answer to one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatReply {
    pub reply: String,
    /// Full records of the courses the reply is based on, in match order.
    pub courses: Vec<CourseRecord>,
    /// Whether moderation replaced the reply with a refusal.
    pub refused: bool,
}

impl ChatReply {
    fn refusal() -> Self {
        Self {
            reply: REFUSAL.to_string(),
            courses: Vec::new(),
            refused: true,
        }
    }
}

/// Answers user messages from the catalog with the help of a completion client.
pub struct ConversationHandler<C> {
    client: C,
    catalog: Catalog,
    moderation: bool,
}

impl<C: CompletionClient> ConversationHandler<C> {
    pub fn new(client: C, catalog: Catalog) -> Self {
        Self {
            client,
            catalog,
            moderation: true,
        }
    }

    /// Enable or disable moderation of input and replies.
    pub fn with_moderation(mut self, enabled: bool) -> Self {
        self.moderation = enabled;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Handle one user message within `session`.
    ///
    /// Once the session is known to be logged in, the user message is appended
    /// to the history, so a turn that fails later still leaves it there. The assistant reply and the
    /// matched courses are stored only when the turn completes.
    #[instrument(skip_all, fields(session = %session.id(), chars = user_text.len()))]
    pub async fn process_user_message(&self, session: &mut Session, user_text: &str) -> Result<ChatReply> {
        session.require_login()?;
        session.push(ChatMessage::user(user_text));

        if self.moderation && self.client.moderate(user_text).await?.is_flagged() {
            warn!("user message flagged by moderation");
            return Ok(self.finish_refused(session));
        }

        let matches = self.identify_courses(user_text).await?;
        let courses = self
            .catalog
            .courses_named(matches.iter().map(|m| m.course_name.as_str()));
        debug!(matched = matches.len(), found = courses.len(), "courses resolved");

        let reply = self.generate_reply(session, user_text, &courses).await?;

        if self.moderation && self.client.moderate(&reply).await?.is_flagged() {
            warn!("generated reply flagged by moderation");
            return Ok(self.finish_refused(session));
        }

        info!(courses = courses.len(), "reply generated");
        session.push(ChatMessage::assistant(reply.clone()));
        session.set_matched_courses(courses.clone());
        Ok(ChatReply {
            reply,
            courses,
            refused: false,
        })
    }

    /// Ask the model which competencies and courses `user_text` is about.
    pub async fn identify_courses(&self, user_text: &str) -> Result<Vec<CourseMatch>> {
        let messages = [
            ChatMessage::system(prompts::identify_system_prompt(self.catalog.competencies())?),
            ChatMessage::user(prompts::delimited(user_text)),
        ];
        let answer = self.client.complete(&messages).await?;
        parse_matches(&answer)
    }

    async fn generate_reply(
        &self,
        session: &Session,
        user_text: &str,
        courses: &[CourseRecord],
    ) -> Result<String> {
        let history = session.history();
        // The current user message is last; it is re-sent below in delimited form.
        let prior = &history[..history.len().saturating_sub(1)];

        let mut messages = Vec::with_capacity(prior.len() + 2);
        messages.push(ChatMessage::system(prompts::reply_system_prompt(courses)?));
        messages.extend(
            prior
                .iter()
                .filter(|m| m.role != MessageRole::System)
                .cloned(),
        );
        messages.push(ChatMessage::user(prompts::delimited(user_text)));

        let answer = self.client.complete(&messages).await?;
        Ok(prompts::final_step(&answer).to_string())
    }

    fn finish_refused(&self, session: &mut Session) -> ChatReply {
        session.push(ChatMessage::assistant(REFUSAL));
        session.set_matched_courses(Vec::new());
        ChatReply::refusal()
    }
}

/// Parse the model's course list. Single quotes are read as double quotes;
/// anything else that is not a JSON list of objects is an error.
pub fn parse_matches(answer: &str) -> Result<Vec<CourseMatch>> {
    let normalized = answer.replace('\'', "\"");
    serde_json::from_str(&normalized).map_err(|e| {
        CoursewiseError::parse(format!("model returned an invalid course list: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use crate::auth::UserDirectory;
    use crate::completion::ModerationVerdict;

    use super::*;

    /// Answers completions from a queue and flags any text containing `flag_word`.
    #[derive(Default)]
    struct ScriptedClient {
        answers: Mutex<VecDeque<String>>,
        requests: Mutex<Vec<Vec<ChatMessage>>>,
        flag_word: Option<&'static str>,
    }

    impl ScriptedClient {
        fn answering(answers: &[&str]) -> Self {
            Self {
                answers: Mutex::new(answers.iter().map(|a| a.to_string()).collect()),
                ..Self::default()
            }
        }
    }

    impl CompletionClient for ScriptedClient {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.requests.lock().unwrap().push(messages.to_vec());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| CoursewiseError::Completion("no scripted answer left".into()))
        }

        async fn moderate(&self, text: &str) -> Result<ModerationVerdict> {
            Ok(match self.flag_word {
                Some(word) if text.contains(word) => ModerationVerdict::Flagged,
                _ => ModerationVerdict::Allowed,
            })
        }
    }

    fn catalog() -> Catalog {
        Catalog::load(std::path::Path::new("../../../fixtures/csv/courses.fixture.csv")).unwrap()
    }

    fn logged_in() -> Session {
        let mut session = Session::new();
        session
            .login(&UserDirectory::new(("admin", "a"), ("user", "u")), "user", "u")
            .unwrap();
        session
    }

    const MATCH_MARKET: &str =
        "[{'competency': 'Risk Management', 'course_name': 'Market Risk Modelling'}]";

    #[tokio::test]
    async fn turn_matches_courses_and_answers() {
        let handler = ConversationHandler::new(
            ScriptedClient::answering(&[
                MATCH_MARKET,
                "Step 1:#### reasoning\nStep 2:#### more\nStep 3:#### Market Risk Modelling costs $1,200.",
            ]),
            catalog(),
        );
        let mut session = logged_in();

        let reply = handler
            .process_user_message(&mut session, "How much is market risk training?")
            .await
            .unwrap();

        assert_eq!(reply.reply, "Market Risk Modelling costs $1,200.");
        assert!(!reply.refused);
        assert_eq!(reply.courses.len(), 1);
        assert_eq!(reply.courses[0].title(), "Market Risk Modelling");
        assert_eq!(session.matched_courses(), reply.courses.as_slice());

        let roles: Vec<MessageRole> = session.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![MessageRole::System, MessageRole::User, MessageRole::Assistant]
        );

        let requests = handler.client.requests.lock().unwrap();
        assert!(requests[0][0].content.contains("Risk Management"));
        assert_eq!(requests[0][1].content, "####How much is market risk training?####");
        assert!(requests[1][0].content.contains("$1,200"));
    }

    #[tokio::test]
    async fn reply_prompt_carries_prior_turns() {
        let handler = ConversationHandler::new(
            ScriptedClient::answering(&["[]", "####First answer", MATCH_MARKET, "####Second answer"]),
            catalog(),
        );
        let mut session = logged_in();

        handler.process_user_message(&mut session, "hi").await.unwrap();
        handler
            .process_user_message(&mut session, "and market risk?")
            .await
            .unwrap();

        let requests = handler.client.requests.lock().unwrap();
        let second_reply = &requests[3];
        let contents: Vec<&str> = second_reply.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents[1..], ["hi", "First answer", "####and market risk?####"]);
    }

    #[tokio::test]
    async fn unknown_course_names_are_skipped() {
        let handler = ConversationHandler::new(
            ScriptedClient::answering(&[
                r#"[{"competency": "Risk Management", "course_name": "Underwater Basket Weaving"},
                   {"competency": "Data Analytics", "course_name": "Python for Finance Professionals"}]"#,
                "####Try Python for Finance Professionals.",
            ]),
            catalog(),
        );
        let mut session = logged_in();

        let reply = handler.process_user_message(&mut session, "data?").await.unwrap();

        let titles: Vec<&str> = reply.courses.iter().map(|c| c.title()).collect();
        assert_eq!(titles, vec!["Python for Finance Professionals"]);
    }

    #[tokio::test]
    async fn malformed_course_list_is_a_parse_error() {
        let handler = ConversationHandler::new(
            ScriptedClient::answering(&["Here are some courses: Market Risk Modelling"]),
            catalog(),
        );
        let mut session = logged_in();

        let err = handler
            .process_user_message(&mut session, "anything on risk?")
            .await
            .unwrap_err();

        assert!(matches!(err, CoursewiseError::Parse { .. }));
        let last = session.history().last().unwrap();
        assert_eq!(last.role, MessageRole::User);
        assert_eq!(last.content, "anything on risk?");
    }

    #[tokio::test]
    async fn flagged_input_gets_refusal_without_completion() {
        let handler = ConversationHandler::new(
            ScriptedClient {
                flag_word: Some("forbidden"),
                ..ScriptedClient::default()
            },
            catalog(),
        );
        let mut session = logged_in();

        let reply = handler
            .process_user_message(&mut session, "something forbidden")
            .await
            .unwrap();

        assert!(reply.refused);
        assert_eq!(reply.reply, REFUSAL);
        assert!(reply.courses.is_empty());
        assert!(handler.client.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn flagged_reply_is_replaced() {
        let handler = ConversationHandler::new(
            ScriptedClient {
                answers: Mutex::new(
                    [MATCH_MARKET, "####a forbidden answer"]
                        .iter()
                        .map(|s| s.to_string())
                        .collect(),
                ),
                flag_word: Some("forbidden"),
                ..ScriptedClient::default()
            },
            catalog(),
        );
        let mut session = logged_in();

        let reply = handler.process_user_message(&mut session, "risk?").await.unwrap();

        assert!(reply.refused);
        assert!(session.matched_courses().is_empty());
        assert_eq!(session.history().last().unwrap().content, REFUSAL);
    }

    #[tokio::test]
    async fn moderation_can_be_disabled() {
        let handler = ConversationHandler::new(
            ScriptedClient {
                answers: Mutex::new(["[]", "####fine, forbidden"].iter().map(|s| s.to_string()).collect()),
                flag_word: Some("forbidden"),
                ..ScriptedClient::default()
            },
            catalog(),
        )
        .with_moderation(false);
        let mut session = logged_in();

        let reply = handler
            .process_user_message(&mut session, "forbidden?")
            .await
            .unwrap();

        assert!(!reply.refused);
        assert_eq!(reply.reply, "fine, forbidden");
    }

    #[tokio::test]
    async fn logged_out_session_is_refused() {
        let handler = ConversationHandler::new(ScriptedClient::default(), catalog());
        let mut session = Session::new();

        let err = handler.process_user_message(&mut session, "hi").await.unwrap_err();

        assert!(matches!(err, CoursewiseError::Auth(_)));
        assert_eq!(session.history().len(), 1);
    }

    #[test]
    fn parse_matches_accepts_single_quotes_and_empty_list() {
        assert_eq!(parse_matches("[]").unwrap(), vec![]);
        let parsed = parse_matches(MATCH_MARKET).unwrap();
        assert_eq!(
            parsed,
            vec![CourseMatch {
                competency: "Risk Management".into(),
                course_name: "Market Risk Modelling".into(),
            }]
        );
    }
}
