//! Shared plumbing for the handler tests: a router over mocked controllers,
//! forged session cookies, and a response type that's easy to assert on.

use crate::config::Config;
use crate::http::extractor::{CurrentUser, SESSION_COOKIE};
use crate::http::flash::{self, Flash, FLASH_COOKIE};
use crate::http::server::api_router;
use crate::http::types::Timestamptz;
use crate::http::ApiContext;
use crate::models::like::{DynLikeCtrl, MockLikeCtrlTrait};
use crate::models::message::{Author, DynMessageCtrl, MessageView, MockMessageCtrlTrait};
use crate::models::profile::{DynProfileCtrl, MockProfileCtrlTrait};
use crate::models::user::{DynUserCtrl, MockUserCtrlTrait, User, DEFAULT_IMAGE_URL};
use crate::models::MockStoreTrait;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use std::sync::Arc;
use time::OffsetDateTime;
use tower::ServiceExt;

pub(crate) const HMAC_KEY: &str = "Yabba Dabba Doo!";

/// One mock per controller. Anything not configured panics when called, which is how the
/// tests check that a rejected request never reached the database.
#[derive(Default)]
pub(crate) struct MockCtrls {
    pub user: MockUserCtrlTrait,
    pub profile: MockProfileCtrlTrait,
    pub message: MockMessageCtrlTrait,
    pub like: MockLikeCtrlTrait,
}

impl MockCtrls {
    pub fn into_app(self) -> Router {
        let user: DynUserCtrl = Arc::new(self.user);
        let profile: DynProfileCtrl = Arc::new(self.profile);
        let message: DynMessageCtrl = Arc::new(self.message);
        let like: DynLikeCtrl = Arc::new(self.like);

        let mut store = MockStoreTrait::new();
        store.expect_user().returning(move || user.clone());
        store.expect_profile().returning(move || profile.clone());
        store.expect_message().returning(move || message.clone());
        store.expect_like().returning(move || like.clone());

        api_router(ApiContext {
            store: Arc::new(store),
            config: Arc::new(Config {
                hmac_key: HMAC_KEY.to_string(),
                ..Default::default()
            }),
        })
    }
}

/// The `Cookie` header value a browser logged in as `user_id` would send.
pub(crate) fn logged_in_as(user_id: i64) -> String {
    let token = CurrentUser { user_id }
        .to_session_token(HMAC_KEY)
        .unwrap();
    format!("{}={}", SESSION_COOKIE, token)
}

pub(crate) fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

pub(crate) fn post_form(uri: &str, cookie: Option<&str>, form: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(form.to_string())).unwrap()
}

pub(crate) struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

pub(crate) async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = hyper::body::to_bytes(response.into_body())
        .await
        .unwrap()
        .to_vec();

    TestResponse {
        status,
        headers,
        body,
    }
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    /// The value this response sets cookie `name` to. An expired cookie comes back as `""`.
    pub fn set_cookie(&self, name: &str) -> Option<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    }

    /// The flash messages the browser would be carrying after this response.
    pub fn flashes(&self) -> Vec<Flash> {
        let Some(token) = self.set_cookie(FLASH_COOKIE) else {
            return Vec::new();
        };
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("{}={}", FLASH_COOKIE, token)).unwrap(),
        );
        flash::read_flashes(&headers, HMAC_KEY)
    }

    pub fn assert_unauthorized(&self) {
        assert_eq!(self.status, StatusCode::FOUND);
        assert_eq!(self.location(), Some("/"));
        assert_eq!(self.flashes(), vec![Flash::danger("Access unauthorized.")]);
    }
}

pub(crate) fn sample_user(id: i64, username: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: format!("{}@test.com", username),
        image_url: DEFAULT_IMAGE_URL.to_string(),
        header_image_url: "/static/images/warbler-hero.jpg".to_string(),
        bio: None,
        location: None,
        password: "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA".to_string(),
    }
}

pub(crate) fn sample_message(id: i64, author: &User, text: &str) -> MessageView {
    MessageView {
        id,
        text: text.to_string(),
        timestamp: Timestamptz(OffsetDateTime::UNIX_EPOCH),
        liked: false,
        author: Author {
            id: author.id,
            username: author.username.clone(),
            image_url: author.image_url.clone(),
        },
    }
}
