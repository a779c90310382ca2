use crate::http::extractor::{CurrentUser, MaybeCurrentUser, PathId};
use crate::http::flash::{Flash, Flashes, Page};
use crate::http::{ApiContext, Error, Found, Result};
use crate::models::like::DynLikeCtrl;
use crate::models::message::{DynMessageCtrl, MessageView, NewMessage};
use axum::extract::{FromRef, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Router};
use validator::Validate;

pub(crate) fn router() -> Router<ApiContext> {
    Router::new()
        .route("/messages/new", get(new_message_form).post(create_message))
        .route("/messages/:message_id", get(show_message))
        .route("/messages/:message_id/delete", post(delete_message))
        .route("/users/handle_like/:message_id", post(handle_like))
}

impl FromRef<ApiContext> for DynMessageCtrl {
    fn from_ref(ctx: &ApiContext) -> DynMessageCtrl {
        ctx.store.message()
    }
}

impl FromRef<ApiContext> for DynLikeCtrl {
    fn from_ref(ctx: &ApiContext) -> DynLikeCtrl {
        ctx.store.like()
    }
}

#[derive(serde::Serialize)]
struct FormBody {
    form: &'static str,
}

#[derive(serde::Serialize)]
struct MessageBody {
    message: MessageView,
}

async fn new_message_form(_: CurrentUser, flashes: Flashes) -> Page<FormBody> {
    Page::new(flashes, FormBody { form: "message" })
}

async fn create_message(
    current_user: CurrentUser,
    message_ctrl: State<DynMessageCtrl>,
    Form(req): Form<NewMessage>,
) -> Result<Found> {
    if matches!(req.user_id, Some(id) if id != current_user.user_id) {
        return Err(Error::Unauthorized);
    }

    req.validate()?;

    message_ctrl
        .create_message(current_user.user_id, req.text)
        .await?;

    Ok(Found::to(format!("/users/{}", current_user.user_id)))
}

async fn show_message(
    maybe_current_user: MaybeCurrentUser,
    flashes: Flashes,
    message_ctrl: State<DynMessageCtrl>,
    PathId(message_id): PathId,
) -> Result<Page<MessageBody>> {
    let message = message_ctrl
        .get_message(maybe_current_user.user_id(), message_id)
        .await?;

    Ok(Page::new(flashes, MessageBody { message }))
}

async fn delete_message(
    current_user: CurrentUser,
    message_ctrl: State<DynMessageCtrl>,
    PathId(message_id): PathId,
) -> Result<Found> {
    message_ctrl
        .delete_message(current_user.user_id, message_id)
        .await?;

    log::info!("user {} deleted message {}", current_user.user_id, message_id);

    Ok(Found::to(format!("/users/{}", current_user.user_id)))
}

async fn handle_like(
    current_user: CurrentUser,
    message_ctrl: State<DynMessageCtrl>,
    like_ctrl: State<DynLikeCtrl>,
    PathId(message_id): PathId,
) -> Result<Response> {
    let message = message_ctrl
        .get_message(Some(current_user.user_id), message_id)
        .await?;

    if message.author.id == current_user.user_id {
        return Ok((
            Extension(Flash::danger("You cannot like your own warble.")),
            Found::to("/"),
        )
            .into_response());
    }

    like_ctrl
        .toggle_like(current_user.user_id, message_id)
        .await?;

    Ok(Found::to("/").into_response())
}
