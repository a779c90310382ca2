use crate::http::cookie;
use crate::http::error::Error;
use crate::http::ApiContext;
use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts, Path};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use std::convert::Infallible;
use time::OffsetDateTime;

pub const SESSION_COOKIE: &str = "warbler_session";

const DEFAULT_SESSION_LENGTH: time::Duration = time::Duration::weeks(2);

/// Add this as a parameter to a handler function to require the user to be logged in.
///
/// Parses the signed `warbler_session` cookie and pulls the current user's id out of it.
/// If the cookie is missing, forged or expired, the handler never runs and the client is
/// redirected with an "Access unauthorized." flash instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: i64,
}

/// Add this as a parameter to a handler function to optionally check if the user is logged in.
///
/// A session cookie that fails to verify is treated like no cookie at all, since the pages that
/// use this still make sense for anonymous visitors.
///
/// This is not just `Option<CurrentUser>` because `Option<T>` as an extractor swallows every
/// rejection, and spelling out the intent reads better at the call site.
#[derive(Debug, Clone, Copy, Default)]
pub struct MaybeCurrentUser(pub Option<CurrentUser>);

#[derive(serde::Serialize, serde::Deserialize)]
struct SessionClaims {
    user_id: i64,
    /// Standard JWT `exp` claim.
    exp: i64,
}

impl CurrentUser {
    pub(in crate::http) fn to_session_token(&self, hmac_key: &str) -> anyhow::Result<String> {
        cookie::sign(
            SessionClaims {
                user_id: self.user_id,
                exp: (OffsetDateTime::now_utc() + DEFAULT_SESSION_LENGTH).unix_timestamp(),
            },
            hmac_key,
        )
    }

    fn from_headers(headers: &HeaderMap, hmac_key: &str) -> Option<Self> {
        let token = cookie::read_cookie(headers, SESSION_COOKIE)?;
        let claims: SessionClaims = cookie::verify(&token, hmac_key)?;

        // `jwt` doesn't check `exp` for us.
        if claims.exp < OffsetDateTime::now_utc().unix_timestamp() {
            log::debug!("session for user {} has expired", claims.user_id);
            return None;
        }

        Some(Self {
            user_id: claims.user_id,
        })
    }
}

impl MaybeCurrentUser {
    pub fn user_id(&self) -> Option<i64> {
        self.0.map(|user| user.user_id)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    ApiContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = ApiContext::from_ref(state);

        Self::from_headers(&parts.headers, &ctx.config.hmac_key).ok_or(Error::Unauthorized)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeCurrentUser
where
    ApiContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = ApiContext::from_ref(state);

        Ok(Self(CurrentUser::from_headers(
            &parts.headers,
            &ctx.config.hmac_key,
        )))
    }
}

/// The numeric id in a route like `/messages/:message_id`.
///
/// Anything that doesn't parse as an id can't name a row, so it's a 404 rather than axum's 400.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for PathId
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|e| {
                log::debug!("unusable id in {}: {}", parts.uri.path(), e);
                Error::NotFound
            })?;

        Ok(Self(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::COOKIE;
    use axum::http::HeaderValue;

    const KEY: &str = "Yabba Dabba Doo!";

    fn headers_with_cookie(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn session_token_round_trips_the_user_id() {
        let token = CurrentUser { user_id: 42 }.to_session_token(KEY).unwrap();
        let headers = headers_with_cookie(&format!("{}={}", SESSION_COOKIE, token));

        assert_eq!(
            CurrentUser::from_headers(&headers, KEY),
            Some(CurrentUser { user_id: 42 })
        );
    }

    #[test]
    fn expired_session_is_rejected() {
        let token = cookie::sign(
            SessionClaims {
                user_id: 42,
                exp: (OffsetDateTime::now_utc() - time::Duration::minutes(1)).unix_timestamp(),
            },
            KEY,
        )
        .unwrap();
        let headers = headers_with_cookie(&format!("{}={}", SESSION_COOKIE, token));

        assert_eq!(CurrentUser::from_headers(&headers, KEY), None);
    }

    #[test]
    fn session_signed_with_another_key_is_rejected() {
        let token = CurrentUser { user_id: 42 }
            .to_session_token("some other key")
            .unwrap();
        let headers = headers_with_cookie(&format!("{}={}", SESSION_COOKIE, token));

        assert_eq!(CurrentUser::from_headers(&headers, KEY), None);
    }
}
