use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Defines a common error type to use for all request handlers.
mod error;

/// Contains definitions for application-specific parameters to handler functions,
/// such as `CurrentUser` which checks for the signed `warbler_session` cookie in the request
/// and pulls the current user's id out of it.
pub mod extractor;

/// One-shot messages carried across redirects, and the `Page` wrapper that renders them.
pub mod flash;

/// The middleware that turns session and flash changes on a response into `Set-Cookie` headers.
pub mod session;

mod cookie;

/// A catch-all module for other common types in the API.
pub mod types;

// Modules introducing routes. `users` covers the account itself (signup, login, editing),
// `profiles` is everything about looking at and following other users.
mod home;
mod messages;
mod profiles;
mod users;

pub mod server;
pub use server::serve;

pub mod api_context;
pub use api_context::ApiContext;

pub use error::{Error, ResultExt};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// `302 Found`.
///
/// axum's own `Redirect` only offers 303/307/308; browsers treat 302 after a form `POST`
/// the same as 303, and it's what the rest of the world expects from a login form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Found(pub String);

impl Found {
    pub fn to(location: impl Into<String>) -> Self {
        Self(location.into())
    }
}

impl IntoResponse for Found {
    fn into_response(self) -> Response {
        (StatusCode::FOUND, [(LOCATION, self.0)]).into_response()
    }
}

#[cfg(test)]
mod test_support;
