use crate::http::cookie;
use crate::http::ApiContext;
use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

pub const FLASH_COOKIE: &str = "warbler_flash";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FlashCategory {
    Success,
    Danger,
}

/// A one-shot message for the user, shown on the next page they render.
///
/// Handlers attach one to a response as an `Extension<Flash>`; the session middleware
/// appends it to whatever is already pending in the flash cookie.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Flash {
    pub category: FlashCategory,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Success,
            message: message.into(),
        }
    }

    pub fn danger(message: impl Into<String>) -> Self {
        Self {
            category: FlashCategory::Danger,
            message: message.into(),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct FlashClaims {
    flashes: Vec<Flash>,
}

pub(crate) fn read_flashes(headers: &HeaderMap, hmac_key: &str) -> Vec<Flash> {
    cookie::read_cookie(headers, FLASH_COOKIE)
        .and_then(|token| cookie::verify::<FlashClaims>(&token, hmac_key))
        .map(|claims| claims.flashes)
        .unwrap_or_default()
}

pub(crate) fn sign_flashes(flashes: Vec<Flash>, hmac_key: &str) -> anyhow::Result<String> {
    cookie::sign(FlashClaims { flashes }, hmac_key)
}

/// The flash messages waiting to be shown with this request.
///
/// Handing these to a `Page` marks them as shown, which clears the cookie.
#[derive(Debug, Default)]
pub struct Flashes(pub Vec<Flash>);

#[async_trait]
impl<S> FromRequestParts<S> for Flashes
where
    ApiContext: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let ctx = ApiContext::from_ref(state);
        Ok(Self(read_flashes(&parts.headers, &ctx.config.hmac_key)))
    }
}

/// Response marker telling the session middleware the pending flashes were rendered.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FlashesConsumed;

/// A rendered view: the data a template would receive, plus the flashes to display with it.
pub struct Page<T> {
    flashes: Vec<Flash>,
    body: T,
}

impl<T> Page<T> {
    pub fn new(flashes: Flashes, body: T) -> Self {
        Self {
            flashes: flashes.0,
            body,
        }
    }
}

#[derive(Serialize)]
struct PageBody<'a, T> {
    flashes: &'a [Flash],
    #[serde(flatten)]
    body: &'a T,
}

impl<T: Serialize> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let mut response = Json(PageBody {
            flashes: &self.flashes,
            body: &self.body,
        })
        .into_response();

        if !self.flashes.is_empty() {
            response.extensions_mut().insert(FlashesConsumed);
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Body {
        form: &'static str,
    }

    #[test]
    fn page_flattens_body_next_to_flashes() {
        let page = Page::new(
            Flashes(vec![Flash::danger("Invalid credentials.")]),
            Body { form: "login" },
        );

        let value = serde_json::to_value(PageBody {
            flashes: &page.flashes,
            body: &page.body,
        })
        .unwrap();

        assert_eq!(value["form"], "login");
        assert_eq!(value["flashes"][0]["category"], "danger");
        assert_eq!(value["flashes"][0]["message"], "Invalid credentials.");
    }

    #[test]
    fn rendering_flashes_marks_them_consumed() {
        let shown = Page::new(Flashes(vec![Flash::success("hi")]), Body { form: "x" });
        assert!(shown
            .into_response()
            .extensions()
            .get::<FlashesConsumed>()
            .is_some());

        let nothing = Page::new(Flashes::default(), Body { form: "x" });
        assert!(nothing
            .into_response()
            .extensions()
            .get::<FlashesConsumed>()
            .is_none());
    }
}
