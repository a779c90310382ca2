use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use sqlx::error::DatabaseError;
use std::borrow::Cow;
use std::collections::HashMap;

use crate::http::flash::Flash;

/// A common error type that can be used throughout the app.
///
/// Every variant turns into something a browser can act on: a redirect carrying a flash
/// message, a status code, or a form-error document. Database and internal errors are
/// logged and reduced to a bare 500 so nothing sensitive leaks to the client.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Return `302 Found` back to `/` with an "Access unauthorized." flash.
    ///
    /// Used both when there is no current user and when the current user
    /// doesn't own the thing they're trying to change.
    #[error("access unauthorized")]
    Unauthorized,

    /// Return `404 Not Found`
    #[error("request path not found")]
    NotFound,

    /// Return `422 Unprocessable Entity`
    ///
    /// The body is `{"errors": {"<field>": ["<message>", ...]}}`, which is what a signup or
    /// message form re-renders next to its fields.
    #[error("error in the request body")]
    UnprocessableEntity {
        errors: HashMap<Cow<'static, str>, Vec<Cow<'static, str>>>,
    },

    /// Automatically return `500 Internal Server Error` on a `sqlx::Error`.
    #[error("an error occurred with the database")]
    Sqlx(#[from] sqlx::Error),

    /// Return `500 Internal Server Error` on a `anyhow::Error`.
    #[error("an internal server error occurred")]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    /// Convenient constructor for `Error::UnprocessableEntity`.
    ///
    /// Multiple for the same key are collected into a list for that key.
    pub fn unprocessable_entity<K, V>(errors: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<Cow<'static, str>>,
        V: Into<Cow<'static, str>>,
    {
        let mut error_map = HashMap::new();

        for (key, val) in errors {
            error_map
                .entry(key.into())
                .or_insert_with(Vec::new)
                .push(val.into());
        }

        Self::UnprocessableEntity { errors: error_map }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::FOUND,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::UnprocessableEntity { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Sqlx(_) | Self::Anyhow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Self::Unauthorized => {
                return (
                    self.status_code(),
                    [(LOCATION, "/")],
                    Extension(Flash::danger("Access unauthorized.")),
                )
                    .into_response();
            }

            Self::UnprocessableEntity { errors } => {
                #[derive(serde::Serialize)]
                struct Errors {
                    errors: HashMap<Cow<'static, str>, Vec<Cow<'static, str>>>,
                }

                return (StatusCode::UNPROCESSABLE_ENTITY, Json(Errors { errors })).into_response();
            }

            // Other errors get mapped normally.
            //
            // Only the internal ones are worth logging; the rest are the client's doing.
            Self::Sqlx(ref e) => {
                log::error!("SQLx error: {:?}", e);
            }

            Self::Anyhow(ref e) => {
                log::error!("Generic error: {:?}", e);
            }

            Self::NotFound => (),
        }

        (self.status_code(), self.to_string()).into_response()
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::unprocessable_entity(errors.field_errors().into_iter().flat_map(
            |(field, errors)| {
                errors.iter().map(move |e| {
                    (
                        field,
                        e.message.clone().unwrap_or_else(|| e.code.clone()),
                    )
                })
            },
        ))
    }
}

/// A little helper trait for more easily converting database constraint errors into API errors.
///
/// ```rust,ignore
/// let user_id = sqlx::query_scalar::<_, i64>(
///     r#"insert into users (username, email, password) values ($1, $2, $3) returning id"#,
/// )
/// .bind(username)
/// .bind(email)
/// .bind(password_hash)
/// .fetch_one(&pool)
/// .await
/// .on_constraint("users_username_key", |_| Error::unprocessable_entity([("username", "Username already taken")]))?;
/// ```
///
/// Something like this would ideally live in a `sqlx-axum` crate if it made sense to author one,
/// however its definition is tied pretty intimately to the `Error` type, which is itself
/// tied directly to application semantics.
pub trait ResultExt<T> {
    /// If `self` contains a SQLx database constraint error with the given name,
    /// transform the error.
    ///
    /// Otherwise, the result is passed through unchanged.
    fn on_constraint(
        self,
        name: &str,
        f: impl FnOnce(Box<dyn DatabaseError>) -> Error,
    ) -> Result<T, Error>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<Error>,
{
    fn on_constraint(
        self,
        name: &str,
        map_err: impl FnOnce(Box<dyn DatabaseError>) -> Error,
    ) -> Result<T, Error> {
        self.map_err(|e| match e.into() {
            Error::Sqlx(sqlx::Error::Database(dbe)) if dbe.constraint() == Some(name) => {
                map_err(dbe)
            }
            e => e,
        })
    }
}
