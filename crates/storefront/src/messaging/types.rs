//! Normalized direct-message records.

use bazaar_core::{AttachmentId, FileType, MemberId, MessageId, ThreadId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A participant in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    pub id: MemberId,
    pub username: String,
}

/// A conversation between two members.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Thread {
    pub id: ThreadId,
    pub participant1_id: Option<MemberId>,
    pub participant2_id: Option<MemberId>,
    pub participant1: Option<Member>,
    pub participant2: Option<Member>,
    pub last_message_at: Option<DateTime<Utc>>,
}

impl Thread {
    /// The participant who is not `me`, if known.
    #[must_use]
    pub fn partner(&self, me: MemberId) -> Option<&Member> {
        if self.participant1_id == Some(me) {
            self.participant2.as_ref()
        } else if self.participant2_id == Some(me) {
            self.participant1.as_ref()
        } else {
            None
        }
    }

    /// Whether `member` takes part in this conversation.
    #[must_use]
    pub fn involves(&self, member: MemberId) -> bool {
        self.participant1_id == Some(member) || self.participant2_id == Some(member)
    }
}

/// One message in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Post {
    pub id: Option<MessageId>,
    pub thread_id: Option<ThreadId>,
    pub sender_id: Option<MemberId>,
    pub sender: Option<Member>,
    pub content: String,
    pub is_read: bool,
    pub edited_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub attachments: Vec<Attachment>,
}

impl Post {
    /// Whether `member` wrote this message.
    #[must_use]
    pub fn is_from(&self, member: MemberId) -> bool {
        self.sender_id == Some(member)
    }
}

/// A file attached to a message. `file_url` is always absolute (or empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attachment {
    pub id: Option<AttachmentId>,
    pub post_id: Option<MessageId>,
    pub file_url: String,
    pub file_type: FileType,
}

/// A file uploaded for a message that has not been sent yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub file_url: String,
    pub file_type: FileType,
}
