//! UI-agnostic conversation state
//!
//! [`Conversation`] owns the turn history, the draft and the single
//! outstanding reply request. The terminal layer only reads it and forwards
//! user intent to it.

use std::sync::Arc;

use futures_util::FutureExt;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::reply::{ReplyError, ReplyService};

/// First bot turn of every new conversation
pub const GREETING: &str = "Hi there! How can I help you today?";

/// Bot turn appended when a reply cannot be obtained
pub const FAILURE_WARNING: &str = "⚠️ Failed to fetch response.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sender {
    User,
    Bot,
}

/// One message in the conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub sender: Sender,
    pub text: String,
}

impl Turn {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
        }
    }
}

type ReplyTask = JoinHandle<Result<String, ReplyError>>;

pub struct Conversation {
    turns: Vec<Turn>,
    draft: String,
    pending: Option<ReplyTask>,
    service: Arc<dyn ReplyService>,
}

impl Conversation {
    pub fn new(service: Arc<dyn ReplyService>) -> Self {
        Self {
            turns: vec![Turn::bot(GREETING)],
            draft: String::new(),
            pending: None,
            service,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// True while exactly one reply request is outstanding
    pub fn is_awaiting(&self) -> bool {
        self.pending.is_some()
    }

    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Submit the current draft
    pub fn submit_draft(&mut self) -> bool {
        let text = self.draft.clone();
        self.submit(&text)
    }

    /// Append `text` as a user turn and request a reply for it.
    ///
    /// Blank text, or any call made while a reply is outstanding, is ignored
    /// and returns `false`. The text is sent exactly as given; trimming is
    /// only used to decide whether it is blank.
    ///
    /// Must be called from within a tokio runtime.
    pub fn submit(&mut self, text: &str) -> bool {
        if text.trim().is_empty() {
            debug!("ignoring blank submission");
            return false;
        }
        if self.is_awaiting() {
            debug!("ignoring submission while a reply is outstanding");
            return false;
        }

        self.turns.push(Turn::user(text));
        self.draft.clear();

        info!(chars = text.chars().count(), "submitting message");
        let service = Arc::clone(&self.service);
        let message = text.to_string();
        self.pending = Some(tokio::spawn(async move {
            service.reply(&message).await
        }));
        true
    }

    /// Empty the history. Does not touch the draft or the outstanding request.
    pub fn clear(&mut self) {
        info!(turns = self.turns.len(), "clearing conversation");
        self.turns.clear();
    }

    /// Apply the outstanding reply if it has already arrived.
    ///
    /// Returns `true` when a reply was settled by this call.
    pub fn poll_reply(&mut self) -> bool {
        let Some(task) = self.pending.as_mut() else {
            return false;
        };
        if !task.is_finished() {
            return false;
        }
        let Some(outcome) = task.now_or_never() else {
            return false;
        };
        self.pending = None;
        self.settle(outcome);
        true
    }

    /// Wait for the outstanding reply, if any, and apply it
    pub async fn await_reply(&mut self) -> bool {
        let Some(task) = self.pending.take() else {
            return false;
        };
        let outcome = task.await;
        self.settle(outcome);
        true
    }

    fn settle(&mut self, outcome: Result<Result<String, ReplyError>, JoinError>) {
        let text = match outcome {
            Ok(Ok(reply)) => {
                info!(chars = reply.chars().count(), "reply received");
                reply
            }
            Ok(Err(e)) => {
                warn!(error = %e, "reply request failed");
                FAILURE_WARNING.to_string()
            }
            Err(e) => {
                let e = ReplyError::TaskFailed(e.to_string());
                warn!(error = %e, "reply request failed");
                FAILURE_WARNING.to_string()
            }
        };
        self.turns.push(Turn::bot(text));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reply::testing::{transport_error, MockReplyService, PanickingReplyService};
    use reqwest::StatusCode;

    fn conversation_with(service: MockReplyService) -> (Conversation, Arc<MockReplyService>) {
        let service = Arc::new(service);
        (Conversation::new(service.clone()), service)
    }

    #[tokio::test]
    async fn test_new_conversation_is_seeded_with_greeting() {
        let (conv, _) = conversation_with(MockReplyService::new());
        assert_eq!(conv.turns(), &[Turn::bot(GREETING)]);
        assert!(!conv.is_awaiting());
        assert_eq!(conv.draft(), "");
    }

    #[tokio::test]
    async fn test_submit_appends_user_turn_and_awaits_synchronously() {
        let (mut conv, _) = conversation_with(MockReplyService::new().with_reply("**hi**"));
        conv.update_draft("hello");

        assert!(conv.submit_draft());

        assert_eq!(conv.turns().len(), 2);
        assert_eq!(conv.turns()[1], Turn::user("hello"));
        assert!(conv.is_awaiting());
        assert_eq!(conv.draft(), "");
    }

    #[tokio::test]
    async fn test_successful_reply_is_appended_as_bot_turn() {
        let (mut conv, _) = conversation_with(MockReplyService::new().with_reply("**hi**"));

        conv.submit("hello");
        assert!(conv.await_reply().await);

        assert_eq!(conv.turns().len(), 3);
        assert_eq!(conv.turns()[2], Turn::bot("**hi**"));
        assert!(!conv.is_awaiting());
    }

    #[tokio::test]
    async fn test_network_failure_becomes_warning_turn() {
        let error = transport_error().await;
        assert!(matches!(error, ReplyError::Transport(_)));
        let (mut conv, _) = conversation_with(MockReplyService::new().with_error(error));

        conv.submit("hello");
        conv.await_reply().await;

        assert_eq!(conv.turns().len(), 3);
        assert_eq!(conv.turns()[2], Turn::bot(FAILURE_WARNING));
        assert!(!conv.is_awaiting());
    }

    #[tokio::test]
    async fn test_error_status_becomes_warning_turn() {
        let (mut conv, _) = conversation_with(
            MockReplyService::new().with_error(ReplyError::Status(StatusCode::INTERNAL_SERVER_ERROR)),
        );

        conv.submit("hello");
        conv.await_reply().await;

        assert_eq!(conv.turns().last(), Some(&Turn::bot(FAILURE_WARNING)));
    }

    #[tokio::test]
    async fn test_malformed_reply_becomes_warning_turn() {
        let (mut conv, _) = conversation_with(
            MockReplyService::new().with_error(ReplyError::Malformed("missing field `reply`".to_string())),
        );

        conv.submit("hello");
        conv.await_reply().await;

        assert_eq!(conv.turns().last(), Some(&Turn::bot(FAILURE_WARNING)));
    }

    #[tokio::test]
    async fn test_panicked_reply_task_becomes_warning_turn() {
        let mut conv = Conversation::new(Arc::new(PanickingReplyService));

        assert!(conv.submit("hello"));
        assert!(conv.await_reply().await);

        assert_eq!(conv.turns().len(), 3);
        assert_eq!(conv.turns()[2], Turn::bot(FAILURE_WARNING));
        assert!(!conv.is_awaiting());

        // Still usable afterwards
        assert!(conv.submit("again"));
    }

    #[tokio::test]
    async fn test_blank_submissions_are_ignored() {
        let (mut conv, service) = conversation_with(MockReplyService::new());

        assert!(!conv.submit(""));
        assert!(!conv.submit("   "));
        assert!(!conv.submit("\n\t"));

        assert_eq!(conv.turns().len(), 1);
        assert!(!conv.is_awaiting());
        assert!(!conv.await_reply().await);
        assert!(service.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_blank_draft_is_kept_when_ignored() {
        let (mut conv, _) = conversation_with(MockReplyService::new());
        conv.update_draft("   ");

        assert!(!conv.submit_draft());
        assert_eq!(conv.draft(), "   ");
    }

    #[tokio::test]
    async fn test_second_submit_while_awaiting_is_dropped() {
        let (mut conv, service) =
            conversation_with(MockReplyService::new().with_reply("one").with_reply("two"));

        assert!(conv.submit("a"));
        assert!(!conv.submit("b"));

        assert_eq!(conv.turns().len(), 2);
        assert_eq!(conv.turns()[1], Turn::user("a"));
        assert_eq!(conv.draft(), "");

        conv.await_reply().await;
        assert_eq!(conv.turns().len(), 3);
        assert_eq!(service.recorded_requests(), vec!["a".to_string()]);
    }

    #[tokio::test]
    async fn test_draft_can_be_edited_while_awaiting() {
        let (mut conv, _) = conversation_with(MockReplyService::new().with_reply("ok"));

        conv.submit("first");
        conv.update_draft("second");
        assert_eq!(conv.draft(), "second");
        assert!(!conv.submit_draft());
        assert_eq!(conv.draft(), "second");

        conv.await_reply().await;
        assert!(conv.submit_draft());
        assert_eq!(conv.turns()[3], Turn::user("second"));
    }

    #[tokio::test]
    async fn test_submitted_text_is_sent_untrimmed() {
        let (mut conv, service) = conversation_with(MockReplyService::new().with_reply("ok"));

        conv.submit("  padded message \n");
        conv.await_reply().await;

        assert_eq!(conv.turns()[1], Turn::user("  padded message \n"));
        assert_eq!(
            service.recorded_requests(),
            vec!["  padded message \n".to_string()]
        );
    }

    #[tokio::test]
    async fn test_clear_empties_history_only() {
        let (mut conv, _) = conversation_with(MockReplyService::new());
        conv.update_draft("still typing");

        conv.clear();

        assert!(conv.turns().is_empty());
        assert_eq!(conv.draft(), "still typing");
        conv.clear();
        assert!(conv.turns().is_empty());
    }

    #[tokio::test]
    async fn test_late_reply_after_clear_is_still_appended() {
        let (mut conv, _) = conversation_with(MockReplyService::new().with_reply("late"));

        conv.submit("hello");
        conv.clear();
        assert!(conv.turns().is_empty());
        assert!(conv.is_awaiting());

        conv.await_reply().await;
        assert_eq!(conv.turns(), &[Turn::bot("late")]);
        assert!(!conv.is_awaiting());
    }

    #[tokio::test]
    async fn test_poll_reply_settles_once_finished() {
        let (mut conv, _) = conversation_with(MockReplyService::new().with_reply("pong"));

        conv.submit("ping");
        // Let the spawned request run to completion
        while conv.pending.as_ref().is_some_and(|t| !t.is_finished()) {
            tokio::task::yield_now().await;
        }

        assert!(conv.poll_reply());
        assert!(!conv.poll_reply());
        assert_eq!(conv.turns().len(), 3);
        assert_eq!(conv.turns()[2], Turn::bot("pong"));
        assert!(!conv.is_awaiting());
    }

    #[tokio::test]
    async fn test_poll_reply_without_request_is_noop() {
        let (mut conv, _) = conversation_with(MockReplyService::new());
        assert!(!conv.poll_reply());
        assert_eq!(conv.turns().len(), 1);
    }
}
