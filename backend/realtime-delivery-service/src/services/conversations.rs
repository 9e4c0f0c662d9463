use crate::error::{AppError, AppResult};
use crate::models::{Conversation, ConversationSummary, Message};
use crate::repository::Repositories;
use crate::session::PresenceOracle;
use uuid::Uuid;

/// Read side of direct conversations.
#[derive(Clone)]
pub struct ConversationService {
    repos: Repositories,
    presence: PresenceOracle,
}

impl ConversationService {
    pub fn new(repos: Repositories, presence: PresenceOracle) -> Self {
        Self { repos, presence }
    }

    /// Same conversation for `(a, b)` and `(b, a)`, created on first use.
    pub async fn get_or_create(&self, requester: &str, other: &str) -> AppResult<Conversation> {
        if requester == other {
            return Err(AppError::Validation(
                "Cannot start a conversation with yourself".to_string(),
            ));
        }
        if self.repos.users.find_user(other).await?.is_none() {
            return Err(AppError::NotFound("user".into()));
        }

        let (a, b) = Conversation::ordered_pair(requester, other);
        let conversation = self
            .repos
            .conversations
            .find_or_create_conversation(a, b)
            .await?;

        tracing::debug!(conversation_id = %conversation.id, "conversation resolved");
        Ok(conversation)
    }

    /// Message log for `viewer`, oldest first.
    ///
    /// Incoming messages are marked seen only while the viewer is online.
    pub async fn open(&self, conversation_id: Uuid, viewer: &str) -> AppResult<Vec<Message>> {
        self.authorize(conversation_id, viewer).await?;

        if self.presence.is_online(viewer) {
            let marked = self
                .repos
                .messages
                .mark_seen(conversation_id, viewer)
                .await?;
            if marked > 0 {
                tracing::debug!(conversation_id = %conversation_id, viewer = %viewer, marked, "messages marked seen");
            }
        }

        self.repos.messages.list_messages(conversation_id).await
    }

    pub async fn unread_count(&self, conversation_id: Uuid, viewer: &str) -> AppResult<i64> {
        self.authorize(conversation_id, viewer).await?;
        self.repos
            .messages
            .count_unseen(conversation_id, viewer)
            .await
    }

    /// Conversations of `viewer`, most recent activity first.
    pub async fn list(&self, viewer: &str) -> AppResult<Vec<ConversationSummary>> {
        let conversations = self.repos.conversations.list_conversations(viewer).await?;

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let other_participant = match conversation.other_participant(viewer) {
                Some(other) => other.to_string(),
                None => continue,
            };
            let unread_count = self
                .repos
                .messages
                .count_unseen(conversation.id, viewer)
                .await?;
            summaries.push(ConversationSummary {
                conversation,
                other_participant,
                unread_count,
            });
        }

        summaries.sort_by(|x, y| {
            let x_at = x.conversation.last_message_time.unwrap_or(x.conversation.created_at);
            let y_at = y.conversation.last_message_time.unwrap_or(y.conversation.created_at);
            y_at.cmp(&x_at)
        });
        Ok(summaries)
    }

    async fn authorize(&self, conversation_id: Uuid, viewer: &str) -> AppResult<Conversation> {
        let conversation = self
            .repos
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("conversation".into()))?;

        if !conversation.has_participant(viewer) {
            return Err(AppError::Forbidden);
        }
        Ok(conversation)
    }
}
