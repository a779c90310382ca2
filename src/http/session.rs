use crate::http::cookie;
use crate::http::extractor::{CurrentUser, SESSION_COOKIE};
use crate::http::flash::{self, Flash, FlashesConsumed, FLASH_COOKIE};
use crate::http::ApiContext;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::{HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Attach to a response as an `Extension` to log a user in or out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionChange {
    Login(i64),
    Logout,
}

/// Turns the `SessionChange`, `Flash` and `FlashesConsumed` response extensions into cookies.
///
/// Doing it here keeps the signing key out of handlers and out of `Error::into_response()`,
/// which has no access to the application state.
pub(crate) async fn write_cookies<B>(
    State(ctx): State<ApiContext>,
    request: Request<B>,
    next: Next<B>,
) -> Response {
    let hmac_key = ctx.config.hmac_key.clone();
    let pending = flash::read_flashes(request.headers(), &hmac_key);

    let mut response = next.run(request).await;
    let mut cookies = Vec::new();

    match response.extensions_mut().remove::<SessionChange>() {
        Some(SessionChange::Login(user_id)) => {
            match (CurrentUser { user_id }).to_session_token(&hmac_key) {
                Ok(token) => cookies.push(cookie::set_cookie(SESSION_COOKIE, &token)),
                Err(e) => log::error!("could not sign session for user {}: {:?}", user_id, e),
            }
        }
        Some(SessionChange::Logout) => cookies.push(cookie::expire_cookie(SESSION_COOKIE)),
        None => (),
    }

    if let Some(new_flash) = response.extensions_mut().remove::<Flash>() {
        let mut flashes = pending;
        flashes.push(new_flash);

        match flash::sign_flashes(flashes, &hmac_key) {
            Ok(token) => cookies.push(cookie::set_cookie(FLASH_COOKIE, &token)),
            Err(e) => log::error!("could not sign flash messages: {:?}", e),
        }
    } else if response
        .extensions_mut()
        .remove::<FlashesConsumed>()
        .is_some()
    {
        cookies.push(cookie::expire_cookie(FLASH_COOKIE));
    }

    for cookie in cookies {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(e) => log::error!("invalid Set-Cookie value: {}", e),
        }
    }

    response
}
