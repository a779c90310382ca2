use crate::http::extractor::MaybeCurrentUser;
use crate::http::flash::{Flashes, Page};
use crate::http::session::SessionChange;
use crate::http::{ApiContext, Error, Result};
use crate::models::message::{DynMessageCtrl, MessageView};
use crate::models::user::{DynUserCtrl, User};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Router};

pub(crate) fn router() -> Router<ApiContext> {
    Router::new().route("/", get(homepage))
}

#[derive(serde::Serialize)]
struct HomeBody {
    /// `None` renders the anonymous landing page.
    user: Option<User>,
    messages: Vec<MessageView>,
}

async fn homepage(
    maybe_current_user: MaybeCurrentUser,
    flashes: Flashes,
    user_ctrl: State<DynUserCtrl>,
    message_ctrl: State<DynMessageCtrl>,
) -> Result<Response> {
    let anonymous = HomeBody {
        user: None,
        messages: Vec::new(),
    };

    let Some(current_user) = maybe_current_user.0 else {
        return Ok(Page::new(flashes, anonymous).into_response());
    };

    let user = match user_ctrl.user_by_id(current_user.user_id).await {
        Ok(user) => user,
        // The account was deleted out from under a live session.
        Err(Error::NotFound) => {
            return Ok((
                Extension(SessionChange::Logout),
                Page::new(flashes, anonymous),
            )
                .into_response())
        }
        Err(e) => return Err(e),
    };

    let messages = message_ctrl.timeline(user.id).await?;

    Ok(Page::new(
        flashes,
        HomeBody {
            user: Some(user),
            messages,
        },
    )
    .into_response())
}
