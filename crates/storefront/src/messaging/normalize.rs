//! Reconcile the messaging endpoints' mixed field naming into one shape.
//!
//! Every accessor reads an ordered list of candidate keys. Missing or
//! malformed fields become defaults; normalization never fails.

use bazaar_core::{AttachmentId, FileType, MemberId, MessageId, ThreadId};
use serde_json::Value;
use url::Url;

use super::types::{Attachment, Member, Post, Thread};
use crate::payload::{array_field, bool_field, field, str_field, timestamp_field, u64_field};

const ID: &[&str] = &["ID", "id"];
const USERNAME: &[&str] = &["username", "UserName", "userName"];

const ATTACHMENT_POST_ID: &[&str] = &["postId", "post_id", "messageId", "message_id"];
const ATTACHMENT_URL: &[&str] = &["fileUrl", "file_url", "url"];
const ATTACHMENT_TYPE: &[&str] = &["fileType", "file_type", "type"];

const POST_THREAD_ID: &[&str] = &["threadId", "thread_id", "ThreadID"];
const POST_SENDER_ID: &[&str] = &["senderId", "sender_id", "SenderID"];
const POST_SENDER: &[&str] = &["sender", "Sender"];
const POST_CONTENT: &[&str] = &["content", "Content"];
const POST_IS_READ: &[&str] = &["isRead", "is_read", "IsRead"];
const POST_EDITED_AT: &[&str] = &["editedAt", "edited_at", "EditedAt"];
const POST_CREATED_AT: &[&str] = &["CreatedAt", "createdAt", "created_at"];
const POST_FILES: &[&str] = &["Files", "files", "Attachments", "attachments"];

const THREAD_USER1_ID: &[&str] = &["user1Id", "user1_id", "User1ID", "participant1Id"];
const THREAD_USER2_ID: &[&str] = &["user2Id", "user2_id", "User2ID", "participant2Id"];
const THREAD_USER1: &[&str] = &["user1", "User1", "participant1"];
const THREAD_USER2: &[&str] = &["user2", "User2", "participant2"];
const THREAD_LAST_MESSAGE_AT: &[&str] = &["lastMessageAt", "last_message_at", "LastMessageAt"];

/// Resolve an upload path against the asset host.
///
/// Trims, turns backslashes into slashes, and returns `""` for blank input.
/// Anything not already starting with `http://` or `https://`
/// (case-insensitive) gets one leading `/` and the host prefixed.
/// Applying it twice gives the same result as applying it once, as long as
/// `host` is empty or itself starts with `http://` or `https://`.
#[must_use]
pub fn make_absolute_url(host: &str, raw: &str) -> String {
    let cleaned = raw.trim().replace('\\', "/");
    if cleaned.is_empty() {
        return String::new();
    }
    if has_http_scheme(&cleaned) {
        return cleaned;
    }
    if cleaned.starts_with('/') {
        format!("{host}{cleaned}")
    } else {
        format!("{host}/{cleaned}")
    }
}

fn has_http_scheme(s: &str) -> bool {
    let lower = s.get(..8).unwrap_or(s).to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// Asset host for an API base URL: the base with a trailing `/api` removed.
#[must_use]
pub fn asset_host(api_base: &Url) -> String {
    let base = api_base.as_str().trim_end_matches('/');
    base.strip_suffix("/api").unwrap_or(base).to_string()
}

/// Normalizes messaging payloads against one asset host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalizer {
    host: String,
}

impl Normalizer {
    /// Normalizer for the backend at `api_base`.
    #[must_use]
    pub fn new(api_base: &Url) -> Self {
        Self {
            host: asset_host(api_base),
        }
    }

    /// Host that relative upload paths are resolved against.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// See [`make_absolute_url`].
    #[must_use]
    pub fn make_absolute_url(&self, raw: &str) -> String {
        make_absolute_url(&self.host, raw)
    }

    /// Normalize a member record; `None` without an id.
    #[must_use]
    pub fn normalize_member(&self, raw: &Value) -> Option<Member> {
        let id = u64_field(raw, ID)?;
        Some(Member {
            id: MemberId::new(id),
            username: str_field(raw, USERNAME).unwrap_or_default(),
        })
    }

    /// Normalize a file attachment.
    #[must_use]
    pub fn normalize_attachment(&self, raw: &Value) -> Attachment {
        Attachment {
            id: u64_field(raw, ID).map(AttachmentId::new),
            post_id: u64_field(raw, ATTACHMENT_POST_ID).map(MessageId::new),
            file_url: self.make_absolute_url(&str_field(raw, ATTACHMENT_URL).unwrap_or_default()),
            file_type: FileType::parse(&str_field(raw, ATTACHMENT_TYPE).unwrap_or_default()),
        }
    }

    /// Normalize a message and its attachments.
    #[must_use]
    pub fn normalize_post(&self, raw: &Value) -> Post {
        Post {
            id: u64_field(raw, ID).map(MessageId::new),
            thread_id: u64_field(raw, POST_THREAD_ID).map(ThreadId::new),
            sender_id: u64_field(raw, POST_SENDER_ID).map(MemberId::new),
            sender: field(raw, POST_SENDER).and_then(|m| self.normalize_member(m)),
            content: str_field(raw, POST_CONTENT).unwrap_or_default(),
            is_read: bool_field(raw, POST_IS_READ).unwrap_or(false),
            edited_at: timestamp_field(raw, POST_EDITED_AT),
            created_at: timestamp_field(raw, POST_CREATED_AT),
            attachments: array_field(raw, POST_FILES)
                .iter()
                .map(|f| self.normalize_attachment(f))
                .collect(),
        }
    }

    /// Normalize a conversation; `None` without an id.
    #[must_use]
    pub fn normalize_thread(&self, raw: &Value) -> Option<Thread> {
        let id = u64_field(raw, ID)?;
        let participant1 = field(raw, THREAD_USER1).and_then(|m| self.normalize_member(m));
        let participant2 = field(raw, THREAD_USER2).and_then(|m| self.normalize_member(m));
        Some(Thread {
            id: ThreadId::new(id),
            participant1_id: u64_field(raw, THREAD_USER1_ID)
                .map(MemberId::new)
                .or_else(|| participant1.as_ref().map(|m| m.id)),
            participant2_id: u64_field(raw, THREAD_USER2_ID)
                .map(MemberId::new)
                .or_else(|| participant2.as_ref().map(|m| m.id)),
            participant1,
            participant2,
            last_message_at: timestamp_field(raw, THREAD_LAST_MESSAGE_AT),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    const HOST: &str = "http://localhost:8080";

    fn normalizer() -> Normalizer {
        Normalizer::new(&Url::parse("http://localhost:8080/api").unwrap())
    }

    #[test]
    fn test_asset_host_strips_api_suffix() {
        assert_eq!(asset_host(&Url::parse("http://h:1/api").unwrap()), "http://h:1");
        assert_eq!(asset_host(&Url::parse("http://h:1/api/").unwrap()), "http://h:1");
        assert_eq!(
            asset_host(&Url::parse("https://h/v2/api").unwrap()),
            "https://h/v2"
        );
        assert_eq!(
            asset_host(&Url::parse("https://h/backend").unwrap()),
            "https://h/backend"
        );
    }

    #[test]
    fn test_make_absolute_url_cases() {
        assert_eq!(make_absolute_url(HOST, ""), "");
        assert_eq!(make_absolute_url(HOST, "   "), "");
        assert_eq!(
            make_absolute_url(HOST, "uploads\\a.png"),
            "http://localhost:8080/uploads/a.png"
        );
        assert_eq!(
            make_absolute_url(HOST, " /uploads/b.mp4 "),
            "http://localhost:8080/uploads/b.mp4"
        );
        assert_eq!(
            make_absolute_url(HOST, "HTTPS://cdn.example.com/x.png"),
            "HTTPS://cdn.example.com/x.png"
        );
    }

    #[test]
    fn test_normalize_attachment_snake_case() {
        let attachment = normalizer()
            .normalize_attachment(&json!({"file_url": "uploads\\a.png", "file_type": "IMAGE"}));
        assert_eq!(attachment.file_url, "http://localhost:8080/uploads/a.png");
        assert_eq!(attachment.file_type, FileType::Image);
        assert!(attachment.id.is_none());
    }

    #[test]
    fn test_normalize_attachment_defaults() {
        let attachment = normalizer().normalize_attachment(&json!({"ID": 3, "message_id": 9}));
        assert_eq!(attachment.id, Some(AttachmentId::new(3)));
        assert_eq!(attachment.post_id, Some(MessageId::new(9)));
        assert_eq!(attachment.file_url, "");
        assert_eq!(attachment.file_type, FileType::File);
    }

    #[test]
    fn test_normalize_post_reads_any_file_list_key() {
        for key in ["Files", "files", "Attachments", "attachments"] {
            let mut raw = json!({
                "ID": 1,
                "threadId": 2,
                "senderId": 7,
                "sender": {"ID": 7, "UserName": "alice"},
                "content": "hi",
                "isRead": true,
                "CreatedAt": "2025-05-01T09:00:00+07:00"
            });
            raw[key] = json!([{"url": "/uploads/x.bin", "type": "pdf"}]);

            let post = normalizer().normalize_post(&raw);
            assert_eq!(post.attachments.len(), 1, "key {key}");
            assert_eq!(post.attachments[0].file_url, "http://localhost:8080/uploads/x.bin");
            assert_eq!(post.attachments[0].file_type, FileType::Other("pdf".to_string()));
            assert_eq!(post.sender.as_ref().unwrap().username, "alice");
            assert!(post.is_read);
            assert!(post.created_at.is_some());
            assert!(post.is_from(MemberId::new(7)));
        }
    }

    #[test]
    fn test_normalize_post_tolerates_garbage() {
        let post = normalizer().normalize_post(&json!({"content": 5, "files": {"no": "list"}}));
        assert!(post.id.is_none());
        assert_eq!(post.content, "5");
        assert!(post.attachments.is_empty());
        assert!(!post.is_read);

        let post = normalizer().normalize_post(&Value::Null);
        assert!(post.attachments.is_empty());
    }

    #[test]
    fn test_normalize_thread_and_partner() {
        let thread = normalizer()
            .normalize_thread(&json!({
                "ID": 4,
                "user1Id": 7,
                "user2Id": 9,
                "user1": {"ID": 7, "username": "alice"},
                "user2": {"id": 9, "userName": "bob"},
                "lastMessageAt": "2025-05-01T10:00:00Z"
            }))
            .unwrap();
        assert_eq!(thread.id, ThreadId::new(4));
        assert_eq!(thread.partner(MemberId::new(7)).unwrap().username, "bob");
        assert_eq!(thread.partner(MemberId::new(9)).unwrap().username, "alice");
        assert!(thread.partner(MemberId::new(1)).is_none());
        assert!(thread.last_message_at.is_some());
    }

    #[test]
    fn test_normalize_thread_infers_ids_from_members() {
        let thread = normalizer()
            .normalize_thread(&json!({"id": 1, "User1": {"ID": 2}, "User2": {"ID": 3}}))
            .unwrap();
        assert_eq!(thread.participant1_id, Some(MemberId::new(2)));
        assert!(thread.involves(MemberId::new(3)));
        assert!(normalizer().normalize_thread(&json!({"user1Id": 1})).is_none());
    }

    proptest! {
        #[test]
        fn make_absolute_url_is_idempotent(raw in ".{0,40}") {
            let once = make_absolute_url(HOST, &raw);
            let twice = make_absolute_url(HOST, &once);
            prop_assert_eq!(&once, &twice);
        }

        #[test]
        fn make_absolute_url_is_idempotent_for_paths(raw in "[ \\\\/a-zA-Z0-9._-]{0,30}") {
            let once = make_absolute_url(HOST, &raw);
            prop_assert_eq!(make_absolute_url(HOST, &once), once.clone());
            if !raw.trim().is_empty() {
                prop_assert!(once.starts_with(HOST));
            }
        }
    }
}
