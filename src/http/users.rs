use crate::http::extractor::{CurrentUser, MaybeCurrentUser};
use crate::http::flash::{Flash, Flashes, Page};
use crate::http::session::SessionChange;
use crate::http::{ApiContext, Found, Result};
use crate::models::user::{DynUserCtrl, LoginUser, NewUser, UpdateUser, User};
use axum::extract::{FromRef, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Form, Router};
use validator::Validate;

pub(crate) fn router() -> Router<ApiContext> {
    Router::new()
        .route("/signup", get(signup_form).post(signup))
        .route("/login", get(login_form).post(login))
        .route("/logout", post(logout))
        .route("/users/profile", get(edit_profile_form).post(edit_profile))
        .route("/users/delete", post(delete_user))
}

impl FromRef<ApiContext> for DynUserCtrl {
    fn from_ref(ctx: &ApiContext) -> DynUserCtrl {
        ctx.store.user()
    }
}

#[derive(serde::Serialize)]
struct FormBody {
    form: &'static str,
}

#[derive(serde::Serialize)]
struct UserBody {
    user: User,
}

async fn signup_form(maybe_current_user: MaybeCurrentUser, flashes: Flashes) -> Response {
    if maybe_current_user.0.is_some() {
        return Found::to("/").into_response();
    }

    Page::new(flashes, FormBody { form: "signup" }).into_response()
}

async fn signup(
    user_ctrl: State<DynUserCtrl>,
    Form(req): Form<NewUser>,
) -> Result<impl IntoResponse> {
    let req = req.normalized();
    req.validate()?;

    // A taken username or email comes back as a form error rather than a database error.
    let user = user_ctrl.signup(req).await?;

    log::info!("new signup: {}", user);

    Ok((Extension(SessionChange::Login(user.id)), Found::to("/")))
}

async fn login_form(flashes: Flashes) -> Page<FormBody> {
    Page::new(flashes, FormBody { form: "login" })
}

async fn login(user_ctrl: State<DynUserCtrl>, Form(req): Form<LoginUser>) -> Result<Response> {
    req.validate()?;

    let Some(user) = user_ctrl.authenticate(&req.username, &req.password).await? else {
        log::debug!("failed login attempt for {:?}", req.username);
        return Ok((
            Extension(Flash::danger("Invalid credentials.")),
            Found::to("/login"),
        )
            .into_response());
    };

    Ok((
        Extension(SessionChange::Login(user.id)),
        Extension(Flash::success(format!("Hello, {}!", user.username))),
        Found::to("/"),
    )
        .into_response())
}

async fn logout() -> impl IntoResponse {
    (
        Extension(SessionChange::Logout),
        Extension(Flash::success("You have successfully logged out.")),
        Found::to("/login"),
    )
}

async fn edit_profile_form(
    current_user: CurrentUser,
    flashes: Flashes,
    user_ctrl: State<DynUserCtrl>,
) -> Result<Page<UserBody>> {
    let user = user_ctrl.user_by_id(current_user.user_id).await?;

    Ok(Page::new(flashes, UserBody { user }))
}

async fn edit_profile(
    current_user: CurrentUser,
    user_ctrl: State<DynUserCtrl>,
    Form(req): Form<UpdateUser>,
) -> Result<Response> {
    let update = req.normalized();
    let user = user_ctrl.user_by_id(current_user.user_id).await?;

    // Changing anything requires the current password.
    let confirmed = user_ctrl
        .authenticate(&user.username, &update.password)
        .await?;

    if confirmed.is_none() {
        return Ok((
            Extension(Flash::danger("Wrong password, please try again.")),
            Found::to("/"),
        )
            .into_response());
    }

    update.validate()?;

    let user = user_ctrl.update_user(current_user.user_id, update).await?;

    Ok((
        Extension(Flash::success("Profile updated.")),
        Found::to(format!("/users/{}", user.id)),
    )
        .into_response())
}

async fn delete_user(
    current_user: CurrentUser,
    user_ctrl: State<DynUserCtrl>,
) -> Result<impl IntoResponse> {
    user_ctrl.delete_user(current_user.user_id).await?;

    log::info!("deleted user #{}", current_user.user_id);

    Ok((
        Extension(SessionChange::Logout),
        Extension(Flash::success("Your account has been deleted.")),
        Found::to("/signup"),
    ))
}
