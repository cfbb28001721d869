//! Bearer token verification and role checks.
//!
//! Tokens are issued elsewhere. This module only resolves an already issued
//! access token into the calling [`User`] and decides whether that user may
//! reach role-restricted routes.

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::entity::{Role, User};
use crate::error::{ApiError, AuthError};

/// Scope every access token must carry.
pub const ACCESS_TOKEN_SCOPE: &str = "access_token";

/// Resolves transport credentials into a user.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, token: &str) -> Result<User, AuthError>;
}

/// The `sub` claim: a user id, encoded either as a JSON integer or a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Subject {
    Id(i64),
    Text(String),
}

impl Subject {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Subject::Id(id) => Some(*id),
            Subject::Text(text) => text.trim().parse().ok(),
        }
    }
}

impl From<i64> for Subject {
    fn from(id: i64) -> Self {
        Subject::Id(id)
    }
}

impl From<&str> for Subject {
    fn from(text: &str) -> Self {
        Subject::Text(text.to_string())
    }
}

impl From<String> for Subject {
    fn from(text: String) -> Self {
        Subject::Text(text)
    }
}

/// Claims carried by an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Subject,
    pub username: String,
    pub email: String,
    #[serde(default = "default_role")]
    pub role: Role,
    pub scope: String,
    pub exp: i64,
}

fn default_role() -> Role {
    Role::User
}

impl TryFrom<Claims> for User {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        if claims.scope != ACCESS_TOKEN_SCOPE {
            return Err(AuthError::InvalidScope);
        }
        let id = claims.sub.user_id().ok_or(AuthError::InvalidSubject)?;
        Ok(User {
            id,
            username: claims.username,
            email: claims.email,
            role: claims.role,
        })
    }
}

/// HS256 access token verifier.
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("key", &"[REDACTED]")
            .field("algorithms", &self.validation.algorithms)
            .finish()
    }
}

impl JwtAuthenticator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, token: &str) -> Result<User, AuthError> {
        let data = decode::<Claims>(token, &self.key, &self.validation).map_err(|err| {
            tracing::debug!(error = %err, "rejected bearer token");
            AuthError::InvalidToken
        })?;
        User::try_from(data.claims)
    }
}

/// Role gate for routes that bypass per-owner scoping.
#[derive(Debug, Clone)]
pub struct RoleAccess {
    allowed: HashSet<Role>,
}

impl RoleAccess {
    pub fn new(allowed: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }

    /// Roles allowed to list every user's contacts.
    pub fn elevated() -> Self {
        Self::new([Role::Admin, Role::Moderator])
    }

    pub fn permits(&self, user: &User) -> bool {
        self.allowed.contains(&user.role)
    }

    pub fn check(&self, user: &User) -> Result<(), ApiError> {
        if self.permits(user) {
            Ok(())
        } else {
            tracing::info!(user_id = user.id, role = %user.role, "role check failed");
            Err(ApiError::forbidden("Operation not permitted"))
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    const SECRET: &str = "unit-test-secret";

    fn claims(role: Role) -> Claims {
        Claims {
            sub: "17".into(),
            username: "grace".into(),
            email: "grace@example.com".into(),
            role,
            scope: ACCESS_TOKEN_SCOPE.into(),
            exp: chrono::Utc::now().timestamp() + 600,
        }
    }

    fn sign(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn valid_token_resolves_user() {
        let auth = JwtAuthenticator::new(SECRET);
        let user = auth
            .authenticate(&sign(&claims(Role::Moderator), SECRET))
            .await
            .unwrap();

        assert_eq!(user.id, 17);
        assert_eq!(user.username, "grace");
        assert_eq!(user.role, Role::Moderator);
    }

    #[tokio::test]
    async fn wrong_secret_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let err = auth
            .authenticate(&sign(&claims(Role::User), "other-secret"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn expired_token_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let mut expired = claims(Role::User);
        expired.exp = chrono::Utc::now().timestamp() - 3600;
        let err = auth.authenticate(&sign(&expired, SECRET)).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }

    #[tokio::test]
    async fn refresh_scope_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let mut refresh = claims(Role::User);
        refresh.scope = "refresh_token".into();
        let err = auth.authenticate(&sign(&refresh, SECRET)).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidScope);
    }

    #[tokio::test]
    async fn non_numeric_subject_is_rejected() {
        let auth = JwtAuthenticator::new(SECRET);
        let mut odd = claims(Role::User);
        odd.sub = "grace@example.com".into();
        let err = auth.authenticate(&sign(&odd, SECRET)).await.unwrap_err();
        assert_eq!(err, AuthError::InvalidSubject);
    }

    #[tokio::test]
    async fn integer_and_string_subjects_resolve_to_same_user() {
        let auth = JwtAuthenticator::new(SECRET);

        let mut numeric = claims(Role::User);
        numeric.sub = Subject::Id(17);
        let from_int = auth.authenticate(&sign(&numeric, SECRET)).await.unwrap();

        let from_str = auth
            .authenticate(&sign(&claims(Role::User), SECRET))
            .await
            .unwrap();

        assert_eq!(from_int.id, 17);
        assert_eq!(from_int, from_str);
    }

    #[test]
    fn subject_deserializes_from_integer_or_string() {
        let int: Subject = serde_json::from_str("5").unwrap();
        let text: Subject = serde_json::from_str("\"5\"").unwrap();
        assert_eq!(int, Subject::Id(5));
        assert_eq!(text.user_id(), Some(5));
        assert_eq!(Subject::from("five").user_id(), None);
    }

    #[tokio::test]
    async fn token_without_subject_is_rejected() {
        #[derive(Serialize)]
        struct NoSubject {
            username: &'static str,
            email: &'static str,
            scope: &'static str,
            exp: i64,
        }
        let token = encode(
            &Header::new(Algorithm::HS256),
            &NoSubject {
                username: "grace",
                email: "grace@example.com",
                scope: ACCESS_TOKEN_SCOPE,
                exp: chrono::Utc::now().timestamp() + 600,
            },
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();

        let err = JwtAuthenticator::new(SECRET)
            .authenticate(&token)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidToken);
    }

    #[test]
    fn elevated_access_admits_admins_and_moderators() {
        let access = RoleAccess::elevated();
        let mut user = User::try_from(claims(Role::Admin)).unwrap();
        assert!(access.check(&user).is_ok());

        user.role = Role::Moderator;
        assert!(access.permits(&user));

        user.role = Role::User;
        let err = access.check(&user).unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }
}
