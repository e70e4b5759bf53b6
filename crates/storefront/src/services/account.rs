//! Sign-in, registration and profile refresh.
//!
//! These are the only operations that write a credential into the
//! [`Store`]. Each one commits a complete session or leaves the session
//! empty; a token is never committed without its user.

use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::api::{ApiClient, ApiError, decode};
use crate::error::{add_breadcrumb, set_sentry_user};
use crate::models::{RegisterRequest, User};
use crate::payload::{bool_field, error_message, field, str_field, unwrap_data};
use crate::store::Store;
use crate::store::session::Session;

/// Username and password for `POST /api/login`.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

impl Credentials {
    /// Credentials for `username`.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    username: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    birthday: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    address: Option<&'a str>,
    #[serde(rename = "genderID", skip_serializing_if = "Option::is_none")]
    gender_id: Option<u64>,
}

impl<'a> From<&'a RegisterRequest> for RegisterBody<'a> {
    fn from(req: &'a RegisterRequest) -> Self {
        Self {
            username: &req.username,
            password: req.password.expose_secret(),
            first_name: &req.first_name,
            last_name: &req.last_name,
            email: req.email.as_deref(),
            age: req.age,
            phone: req.phone.as_deref(),
            birthday: req.birthday.as_deref(),
            address: req.address.as_deref(),
            gender_id: req.gender_id,
        }
    }
}

/// Result of a registration.
///
/// `token` is `Some` only when the backend signed the new member in, in which
/// case the session has been committed.
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub user: User,
    pub token: Option<SecretString>,
}

impl RegisterOutcome {
    /// Whether registration also signed the member in.
    #[must_use]
    pub const fn signed_in(&self) -> bool {
        self.token.is_some()
    }
}

/// Account operations over the API client and the store.
#[derive(Debug, Clone)]
pub struct AccountService {
    api: ApiClient,
    store: Store,
}

impl AccountService {
    /// Create the service.
    #[must_use]
    pub const fn new(api: ApiClient, store: Store) -> Self {
        Self { api, store }
    }

    /// Sign in and commit the session.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidResponse`] when the backend omits the user or
    /// the token, or the underlying request error. The session is cleared on
    /// every failure.
    #[instrument(skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        match self.try_login(credentials).await {
            Ok(session) => {
                self.store.commit_session(session.clone());
                if let Some(user) = &session.user {
                    set_sentry_user(&user.id, None);
                }
                add_breadcrumb("auth", "Signed in", None);
                info!(has_shop = session.has_shop(), "Signed in");
                Ok(session)
            }
            Err(e) => {
                warn!(error = %e, "Sign-in failed");
                self.store.reset_session();
                Err(e)
            }
        }
    }

    async fn try_login(&self, credentials: &Credentials) -> Result<Session, ApiError> {
        let body = LoginBody {
            username: credentials.username.trim(),
            password: credentials.password.expose_secret(),
        };
        let value = self.api.send_json(Method::POST, "login", &body).await?;

        let (Some(user), Some(token)) = (user_of(&value)?, token_of(&value)) else {
            return Err(ApiError::InvalidResponse(
                error_message(&value).unwrap_or_else(|| "Invalid login response".to_string()),
            ));
        };
        let has_shop = shop_flag(&value, &user);
        let mut session = Session::signed_in(user, token);
        session.has_shop = Some(has_shop);
        Ok(session)
    }

    /// Create an account.
    ///
    /// When the backend also returns a token the new member is signed in;
    /// otherwise the session is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidResponse`] when the backend omits the user,
    /// or the underlying request error.
    #[instrument(skip(self, request), fields(username = %request.username))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<RegisterOutcome, ApiError> {
        let value = self
            .api
            .send_json(Method::POST, "register", &RegisterBody::from(request))
            .await?;

        let user = user_of(&value)?.ok_or_else(|| {
            ApiError::InvalidResponse(
                error_message(&value).unwrap_or_else(|| "Invalid register response".to_string()),
            )
        })?;
        let token = token_of(&value);

        if let Some(token) = &token {
            let has_shop = shop_flag(&value, &user);
            let mut session = Session::signed_in(user.clone(), token.clone());
            session.has_shop = Some(has_shop);
            self.store.commit_session(session);
            set_sentry_user(&user.id, None);
            add_breadcrumb("auth", "Registered and signed in", None);
        }
        info!(signed_in = token.is_some(), "Registered");
        Ok(RegisterOutcome { user, token })
    }

    /// Re-read the signed-in member from the backend.
    ///
    /// Returns `None` without a request when no credential is held, and
    /// `None` without changing anything when the body has no user.
    ///
    /// # Errors
    ///
    /// Returns the request error. A 401 has already cleared the session by the
    /// time it is returned; other failures leave the store unchanged.
    #[instrument(skip(self))]
    pub async fn refresh_user(&self) -> Result<Option<User>, ApiError> {
        if !self.store.snapshot().session.is_authenticated() {
            return Ok(None);
        }

        let value = self
            .api
            .send_value(self.api.request(Method::GET, "current-user")?)
            .await?;
        let Some(user) = user_of(&value)? else {
            warn!("current-user response had no user");
            return Ok(None);
        };

        let has_shop = shop_flag(&value, &user);
        self.store.commit_user(user.clone(), has_shop);
        Ok(Some(user))
    }

    /// Sign out locally. With `wipe`, the durable record and the legacy
    /// keys are removed as well.
    pub fn logout(&self, wipe: bool) {
        if wipe {
            self.store.clear_persisted_store();
        } else {
            self.store.logout();
        }
    }
}

/// The `user` record of an auth response, looking inside `data` too.
fn user_of(value: &Value) -> Result<Option<User>, ApiError> {
    let raw = field(value, &["user"])
        .or_else(|| value.get("data").and_then(|d| field(d, &["user"])));
    match raw {
        Some(raw) if raw.is_object() => decode(raw.clone()).map(Some),
        _ => Ok(None),
    }
}

fn token_of(value: &Value) -> Option<SecretString> {
    str_field(value, &["token", "access_token"])
        .or_else(|| str_field(&unwrap_data(value.clone()), &["token"]))
        .filter(|t| !t.trim().is_empty())
        .map(SecretString::from)
}

/// `has_shop` on the body, else the user's own flag or seller id.
fn shop_flag(value: &Value, user: &User) -> bool {
    bool_field(value, &["has_shop", "hasShop"]).unwrap_or_else(|| user.owns_shop())
}
