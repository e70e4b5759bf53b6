//! Direct messages between members.
//!
//! The messaging endpoints identify the caller by member id rather than by
//! the login token: requests carry `Authorization: Bearer uid:<id>` and an
//! `X-User-Id` header whenever a user is held, and fall back to the stored
//! token only when it looks usable. Every payload goes through
//! [`Normalizer`] before it reaches callers.

mod normalize;
mod types;

pub use normalize::{Normalizer, asset_host, make_absolute_url};
pub use types::{Attachment, Member, Post, Thread, UploadedFile};

use std::path::{Path, PathBuf};

use bazaar_core::{FileType, MemberId, MessageId, ThreadId};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::Form;
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, warn};

use crate::api::{ApiClient, ApiError, file_part};
use crate::payload::{str_field, unwrap_data};
use crate::store::Store;

/// Posts fetched per conversation.
pub const PAGE_LIMIT: u32 = 100;

const X_USER_ID: &str = "x-user-id";

/// Whether a stored token can be sent as-is: a three-part JWT or a
/// `uid:` credential.
#[must_use]
pub fn is_usable_token(token: &str) -> bool {
    let token = token.trim();
    if token.is_empty() {
        return false;
    }
    token.starts_with("uid:") || (token.split('.').count() == 3 && !token.contains(char::is_whitespace))
}

/// Strip surrounding whitespace and one leading and one trailing quote.
fn clean_username(raw: &str) -> String {
    let trimmed = raw.trim();
    let trimmed = trimmed
        .strip_prefix(['"', '\''])
        .unwrap_or(trimmed);
    let trimmed = trimmed.strip_suffix(['"', '\'']).unwrap_or(trimmed);
    trimmed.trim().to_string()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OpenThreadBody<'a> {
    current_user_id: MemberId,
    friend_username: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SendPostBody<'a> {
    sender_id: MemberId,
    content: &'a str,
    attachments: &'a [UploadedFile],
}

/// Client for the `dm/*` endpoints.
#[derive(Debug, Clone)]
pub struct DmClient {
    api: ApiClient,
    store: Store,
    normalizer: Normalizer,
}

impl DmClient {
    /// Create a messaging client. Relative upload paths resolve against the
    /// API base with its `/api` suffix removed.
    #[must_use]
    pub fn new(api: ApiClient, store: Store) -> Self {
        let normalizer = Normalizer::new(api.base_url());
        Self {
            api,
            store,
            normalizer,
        }
    }

    /// The normalizer used for every payload.
    #[must_use]
    pub const fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Member id of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotAuthenticated`] when no user is held.
    pub fn me(&self) -> Result<MemberId, ApiError> {
        self.store
            .snapshot()
            .session
            .member_id()
            .ok_or(ApiError::NotAuthenticated)
    }

    /// Headers identifying the caller to the messaging endpoints.
    #[must_use]
    pub fn identity_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let snapshot = self.store.snapshot();
        let session = &snapshot.session;

        let bearer = if let Some(id) = session.member_id() {
            headers.insert(HeaderName::from_static(X_USER_ID), HeaderValue::from(id.get()));
            Some(format!("Bearer uid:{id}"))
        } else {
            session
                .token_str()
                .filter(|t| is_usable_token(t))
                .map(|t| format!("Bearer {}", t.trim()))
        };

        if let Some(bearer) = bearer {
            match HeaderValue::from_str(&bearer) {
                Ok(mut value) => {
                    value.set_sensitive(true);
                    headers.insert(AUTHORIZATION, value);
                }
                Err(e) => warn!(error = %e, "Messaging credential is not a valid header value"),
            }
        }
        headers
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        Ok(self.api.request(method, path)?.headers(self.identity_headers()))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, ApiError> {
        Ok(unwrap_data(self.api.send_value(request).await?))
    }

    fn post_from(&self, value: &Value) -> Result<Post, ApiError> {
        if !value.is_object() {
            return Err(ApiError::InvalidResponse("missing post".to_string()));
        }
        Ok(self.normalizer.normalize_post(value))
    }

    /// Conversations the signed-in member takes part in.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out or when the request fails.
    #[instrument(skip(self))]
    pub async fn list_threads(&self) -> Result<Vec<Thread>, ApiError> {
        let me = self.me()?;
        let mut url = self.api.url("dm/threads")?;
        url.query_pairs_mut()
            .append_pair("memberId", &me.to_string());

        let request = self
            .api
            .request_url(Method::GET, url)
            .headers(self.identity_headers());
        let value = self.send(request).await?;
        let threads: Vec<Thread> = value
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter_map(|t| self.normalizer.normalize_thread(t))
            .collect();
        debug!(count = threads.len(), "Loaded threads");
        Ok(threads)
    }

    /// One page of posts in `thread`, in the order the backend returns them.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    #[instrument(skip(self), fields(thread_id = %thread))]
    pub async fn list_posts(
        &self,
        thread: ThreadId,
        offset: u32,
        limit: u32,
    ) -> Result<Vec<Post>, ApiError> {
        let mut url = self.api.url(&format!("dm/threads/{thread}/posts"))?;
        url.query_pairs_mut()
            .append_pair("offset", &offset.to_string())
            .append_pair("limit", &limit.to_string());

        let request = self
            .api
            .request_url(Method::GET, url)
            .headers(self.identity_headers());
        let value = self.send(request).await?;
        Ok(value
            .as_array()
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|p| self.normalizer.normalize_post(p))
            .collect())
    }

    /// Mark every post in `thread` as read by the signed-in member.
    ///
    /// # Errors
    ///
    /// Returns an error when signed out or when the request fails.
    #[instrument(skip(self), fields(thread_id = %thread))]
    pub async fn mark_read(&self, thread: ThreadId) -> Result<(), ApiError> {
        let me = self.me()?;
        let request = self
            .request(Method::PATCH, &format!("dm/threads/{thread}/read"))?
            .json(&json!({ "memberId": me }));
        self.send(request).await?;
        Ok(())
    }

    /// Load the first [`PAGE_LIMIT`] posts of `thread` and mark them read.
    ///
    /// A failure to mark the thread read is logged and does not fail the
    /// load.
    ///
    /// # Errors
    ///
    /// Returns an error when the posts cannot be fetched.
    pub async fn load_conversation(&self, thread: ThreadId) -> Result<Vec<Post>, ApiError> {
        let posts = self.list_posts(thread, 0, PAGE_LIMIT).await?;
        if let Err(e) = self.mark_read(thread).await {
            warn!(error = %e, thread_id = %thread, "Failed to mark thread read");
        }
        Ok(posts)
    }

    /// Open (or reuse) the conversation with `username`.
    ///
    /// Surrounding whitespace and quotes are stripped first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidInput`] for a blank name, otherwise an
    /// error when signed out or when the request fails.
    #[instrument(skip(self))]
    pub async fn open_thread(&self, username: &str) -> Result<Thread, ApiError> {
        let friend = clean_username(username);
        if friend.is_empty() {
            return Err(ApiError::InvalidInput("username is required".to_string()));
        }
        let me = self.me()?;
        let request = self
            .request(Method::POST, "dm/threads/open")?
            .json(&OpenThreadBody {
                current_user_id: me,
                friend_username: &friend,
            });
        let value = self.send(request).await?;
        self.normalizer
            .normalize_thread(&value)
            .ok_or_else(|| ApiError::InvalidResponse("missing thread".to_string()))
    }

    /// Upload one file for a message.
    ///
    /// The returned URL is absolute; the attachment type is derived from the
    /// file extension.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read, the request fails, or
    /// the backend returns no URL.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload(&self, path: &Path) -> Result<UploadedFile, ApiError> {
        let form = Form::new().part("file", file_part(path).await?);
        let request = self.request(Method::POST, "dm/upload")?.multipart(form);
        let value = self.send(request).await?;
        let file_url = str_field(&value, &["url", "fileUrl"])
            .map(|u| self.normalizer.make_absolute_url(&u))
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ApiError::InvalidResponse("upload returned no url".to_string()))?;
        Ok(UploadedFile {
            file_url,
            file_type: FileType::from_file_name(&path.to_string_lossy()),
        })
    }

    /// Send a message to `thread`, uploading `files` first.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidInput`] when there is neither text nor a
    /// file, otherwise an error when signed out, an upload fails, or the
    /// request fails.
    #[instrument(skip(self, text, files), fields(thread_id = %thread, files = files.len()))]
    pub async fn send_post(
        &self,
        thread: ThreadId,
        text: &str,
        files: &[PathBuf],
    ) -> Result<Post, ApiError> {
        let content = text.trim();
        if content.is_empty() && files.is_empty() {
            return Err(ApiError::InvalidInput(
                "message needs text or an attachment".to_string(),
            ));
        }
        let me = self.me()?;

        let mut attachments = Vec::with_capacity(files.len());
        for file in files {
            attachments.push(self.upload(file).await?);
        }

        let request = self
            .request(Method::POST, &format!("dm/threads/{thread}/posts"))?
            .json(&SendPostBody {
                sender_id: me,
                content,
                attachments: &attachments,
            });
        let value = self.send(request).await?;
        self.post_from(&value)
    }

    /// Replace the text of a post.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidInput`] for blank text, otherwise an error
    /// when the request fails.
    #[instrument(skip(self, text), fields(post_id = %post))]
    pub async fn edit_post(&self, post: MessageId, text: &str) -> Result<Post, ApiError> {
        let content = text.trim();
        if content.is_empty() {
            return Err(ApiError::InvalidInput("message text is required".to_string()));
        }
        let request = self
            .request(Method::PATCH, &format!("dm/posts/{post}"))?
            .json(&json!({ "content": content }));
        let value = self.send(request).await?;
        self.post_from(&value)
    }

    /// Delete a single post.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    #[instrument(skip(self), fields(post_id = %post))]
    pub async fn delete_post(&self, post: MessageId) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("dm/posts/{post}"))?;
        self.send(request).await?;
        Ok(())
    }

    /// Delete a whole conversation.
    ///
    /// # Errors
    ///
    /// Returns an error when the request fails.
    #[instrument(skip(self), fields(thread_id = %thread))]
    pub async fn delete_thread(&self, thread: ThreadId) -> Result<(), ApiError> {
        let request = self.request(Method::DELETE, &format!("dm/threads/{thread}"))?;
        self.send(request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::User;
    use crate::store::persist::MemoryStorage;
    use crate::store::session::Session;
    use secrecy::SecretString;
    use std::sync::Arc;
    use url::Url;

    fn client() -> (Store, DmClient) {
        let store = Store::open(Arc::new(MemoryStorage::new()));
        let api = ApiClient::new(
            &Url::parse("http://localhost:8080/api").unwrap(),
            None,
            Arc::new(store.clone()),
        )
        .unwrap();
        let dm = DmClient::new(api, store.clone());
        (store, dm)
    }

    #[test]
    fn test_usable_tokens() {
        assert!(is_usable_token("uid:7"));
        assert!(is_usable_token("aaa.bbb.ccc"));
        assert!(!is_usable_token("tok123"));
        assert!(!is_usable_token("a.b"));
        assert!(!is_usable_token("   "));
    }

    #[test]
    fn test_clean_username() {
        assert_eq!(clean_username("  \"bob\" "), "bob");
        assert_eq!(clean_username("'carol'"), "carol");
        assert_eq!(clean_username("dave"), "dave");
        assert_eq!(clean_username(" '' "), "");
    }

    #[test]
    fn test_identity_headers_prefer_member_id() {
        let (store, dm) = client();
        store.commit_session(Session::signed_in(
            User::new(MemberId::new(7), "alice"),
            SecretString::from("aaa.bbb.ccc"),
        ));

        let headers = dm.identity_headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer uid:7");
        assert_eq!(headers.get("x-user-id").unwrap(), "7");
        assert_eq!(dm.me().unwrap(), MemberId::new(7));
    }

    #[test]
    fn test_identity_headers_fall_back_to_usable_token() {
        let (store, dm) = client();
        store.commit_session(Session {
            token: Some(SecretString::from("aaa.bbb.ccc")),
            ..Session::default()
        });
        let headers = dm.identity_headers();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer aaa.bbb.ccc");
        assert!(headers.get("x-user-id").is_none());

        store.commit_session(Session {
            token: Some(SecretString::from("opaque")),
            ..Session::default()
        });
        assert!(dm.identity_headers().is_empty());
        assert!(matches!(dm.me(), Err(ApiError::NotAuthenticated)));
    }

    #[test]
    fn test_normalizer_uses_asset_host() {
        let (_, dm) = client();
        assert_eq!(dm.normalizer().host(), "http://localhost:8080");
        let attachment = dm
            .normalizer()
            .normalize_attachment(&json!({"url": "a.png", "type": "image"}));
        assert_eq!(attachment.file_url, "http://localhost:8080/a.png");
    }

    #[tokio::test]
    async fn test_send_post_rejects_empty_message() {
        let (_, dm) = client();
        let err = dm.send_post(ThreadId::new(1), "   ", &[]).await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = dm.edit_post(MessageId::new(1), "").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));

        let err = dm.open_thread(" \"\" ").await.unwrap_err();
        assert!(matches!(err, ApiError::InvalidInput(_)));
    }
}
