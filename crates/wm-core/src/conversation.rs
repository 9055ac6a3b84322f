//! Conversation state: the append-only transcript, the composer draft, and
//! the awaiting-response flag that gates sending.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::message::Message;
use crate::service::ChatService;

#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    draft: String,
    awaiting_response: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing transcript (e.g. a seeded example exchange).
    pub fn with_messages(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    pub fn is_awaiting_response(&self) -> bool {
        self.awaiting_response
    }

    /// Whether the send action is enabled for the current draft.
    pub fn can_send(&self) -> bool {
        !self.awaiting_response && !self.draft.trim().is_empty()
    }

    /// Append a message. No reordering and no deduplication by id.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Synchronous half of a submission.
    ///
    /// Returns the text to send to the messaging collaborator, or `None` when
    /// `text` is blank or a reply is already outstanding. On `Some`, a user
    /// message has been appended, the draft cleared, and the awaiting flag set;
    /// the caller must eventually hand the outcome to [`finish_turn`].
    ///
    /// [`finish_turn`]: Conversation::finish_turn
    pub fn begin_turn(&mut self, text: &str) -> Option<String> {
        if text.trim().is_empty() {
            return None;
        }
        if self.awaiting_response {
            debug!("Ignoring submission while a reply is outstanding");
            return None;
        }

        let message = Message::user(text);
        debug!(id = %message.id, len = text.len(), "User turn started");
        self.append(message);
        self.draft.clear();
        self.awaiting_response = true;
        Some(text.to_string())
    }

    /// Asynchronous half of a submission: clears the awaiting flag and appends
    /// the reply on success. Errors are returned with the transcript untouched.
    pub fn finish_turn(&mut self, result: Result<Message, Error>) -> Result<(), Error> {
        self.awaiting_response = false;
        match result {
            Ok(reply) => {
                info!(id = %reply.id, citations = reply.citations.len(), "Reply received");
                self.append(reply);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Reply failed; conversation unchanged");
                Err(e)
            }
        }
    }

    /// Submit `text` and wait for the reply.
    ///
    /// Returns `Ok(false)` when the submission was ignored (blank text),
    /// `Ok(true)` when a reply was appended.
    pub async fn submit(&mut self, text: &str, service: &dyn ChatService) -> Result<bool, Error> {
        self.submit_with_cancel(text, service, &CancellationToken::new())
            .await
    }

    /// Like [`submit`](Conversation::submit), but gives up with
    /// [`Error::Cancelled`] once `cancel` fires.
    pub async fn submit_with_cancel(
        &mut self,
        text: &str,
        service: &dyn ChatService,
        cancel: &CancellationToken,
    ) -> Result<bool, Error> {
        let Some(request) = self.begin_turn(text) else {
            return Ok(false);
        };

        let mut turn = PendingTurn::new(self);
        let reply = fetch_reply(service, &request, cancel)
            .await
            .inspect_err(|e| warn!(error = %e, "Reply failed; conversation unchanged"))?;
        turn.complete(reply);
        Ok(true)
    }
}

/// Ask `service` for a reply to `text`, racing it against `cancel`.
pub async fn fetch_reply(
    service: &dyn ChatService,
    text: &str,
    cancel: &CancellationToken,
) -> Result<Message, Error> {
    debug!(service = service.name(), "Requesting reply");
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        reply = service.send_chat_message(text) => reply,
    }
}

/// Clears the awaiting flag when dropped, however the turn ends.
struct PendingTurn<'a> {
    conversation: &'a mut Conversation,
}

impl<'a> PendingTurn<'a> {
    fn new(conversation: &'a mut Conversation) -> Self {
        Self { conversation }
    }

    fn complete(&mut self, reply: Message) {
        info!(id = %reply.id, citations = reply.citations.len(), "Reply received");
        self.conversation.append(reply);
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        self.conversation.awaiting_response = false;
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::message::{Citation, Role};
    use crate::testing::{MockChatService, StalledChatService};

    #[tokio::test]
    async fn test_blank_submissions_are_ignored() {
        let service = MockChatService::new();
        let mut conversation = Conversation::new();

        for text in ["", "   ", "\n\t "] {
            let sent = conversation.submit(text, &service).await.unwrap();
            assert!(!sent);
        }

        assert_eq!(conversation.len(), 0);
        assert!(!conversation.is_awaiting_response());
        assert_eq!(service.request_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_appends_user_then_reply() {
        let service = MockChatService::new();
        service.queue_reply("Hi there");
        let mut conversation = Conversation::new();
        conversation.set_draft("hello");

        let sent = conversation.submit("hello", &service).await.unwrap();

        assert!(sent);
        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].role, Role::User);
        assert_eq!(conversation.messages()[0].content, "hello");
        assert_eq!(conversation.messages()[1].role, Role::Assistant);
        assert_eq!(conversation.messages()[1].content, "Hi there");
        assert!(!conversation.is_awaiting_response());
        assert!(conversation.draft().is_empty());
        assert_eq!(service.last_request().as_deref(), Some("hello"));
    }

    #[tokio::test]
    async fn test_failure_keeps_user_turn_and_clears_flag() {
        let service = MockChatService::new();
        service.queue_error(Error::api(500, "boom"));
        let mut conversation = Conversation::new();

        let err = conversation.submit("question", &service).await.unwrap_err();

        assert!(matches!(err, Error::Api { status: 500, .. }));
        assert_eq!(conversation.len(), 1);
        assert!(conversation.messages()[0].is_user());
        assert!(!conversation.is_awaiting_response());
    }

    #[tokio::test]
    async fn test_reply_citations_are_kept() {
        let service = MockChatService::new();
        service.queue_message(
            Message::assistant("Roadmap [1]")
                .with_citations(vec![Citation::new(1, "Q1 Roadmap", "Priority 1")]),
        );
        let mut conversation = Conversation::new();

        conversation.submit("roadmap?", &service).await.unwrap();

        let reply = conversation.last_message().unwrap();
        assert_eq!(reply.citations.len(), 1);
        assert_eq!(reply.citation(1).unwrap().source, "Q1 Roadmap");
    }

    #[tokio::test]
    async fn test_cancelled_submission() {
        let service = StalledChatService;
        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut conversation = Conversation::new();

        let err = conversation
            .submit_with_cancel("slow", &service, &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert_eq!(conversation.len(), 1);
        assert!(!conversation.is_awaiting_response());
    }

    #[tokio::test]
    async fn test_dropped_submission_clears_flag() {
        let service = StalledChatService;
        let mut conversation = Conversation::new();

        let outcome = tokio::time::timeout(
            Duration::from_millis(10),
            conversation.submit("never answered", &service),
        )
        .await;

        assert!(outcome.is_err());
        assert!(!conversation.is_awaiting_response());
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_split_turn() {
        let mut conversation = Conversation::new();
        conversation.set_draft("draft text");
        assert!(conversation.can_send());

        let request = conversation.begin_turn("draft text").unwrap();
        assert_eq!(request, "draft text");
        assert!(conversation.is_awaiting_response());
        assert!(!conversation.can_send());
        assert!(conversation.draft().is_empty());

        // A second submission while awaiting is refused.
        assert!(conversation.begin_turn("another").is_none());
        assert_eq!(conversation.len(), 1);

        conversation
            .finish_turn(Ok(Message::assistant("answer")))
            .unwrap();
        assert!(!conversation.is_awaiting_response());
        assert_eq!(conversation.len(), 2);
    }

    #[test]
    fn test_finish_turn_error() {
        let mut conversation = Conversation::new();
        conversation.begin_turn("q").unwrap();

        let result = conversation.finish_turn(Err(Error::network("refused")));

        assert!(result.is_err());
        assert!(!conversation.is_awaiting_response());
        assert_eq!(conversation.len(), 1);
    }

    #[test]
    fn test_append_does_not_deduplicate() {
        let mut conversation = Conversation::new();
        let message = Message::assistant("same").with_id("1");
        conversation.append(message.clone());
        conversation.append(message);
        assert_eq!(conversation.len(), 2);
    }
}
