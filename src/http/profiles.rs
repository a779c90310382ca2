use crate::http::extractor::{CurrentUser, MaybeCurrentUser, PathId};
use crate::http::flash::{Flash, Flashes, Page};
use crate::http::{ApiContext, Found, Result};
use crate::models::like::DynLikeCtrl;
use crate::models::message::{DynMessageCtrl, MessageView};
use crate::models::profile::{DynProfileCtrl, Profile};
use crate::models::user::{DynUserCtrl, PublicUser, User};
use axum::extract::{FromRef, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Router};

pub(crate) fn router() -> Router<ApiContext> {
    Router::new()
        .route("/users", get(list_users))
        .route("/users/:user_id", get(show_user))
        .route("/users/:user_id/following", get(show_following))
        .route("/users/:user_id/followers", get(show_followers))
        .route("/users/:user_id/likes", get(show_likes))
        .route("/users/follow/:user_id", post(follow_user))
        .route("/users/stop-following/:user_id", post(stop_following))
}

impl FromRef<ApiContext> for DynProfileCtrl {
    fn from_ref(ctx: &ApiContext) -> DynProfileCtrl {
        ctx.store.profile()
    }
}

#[derive(serde::Deserialize, Default)]
#[serde(default)]
struct SearchQuery {
    q: Option<String>,
}

#[derive(serde::Serialize)]
struct UsersBody {
    users: Vec<PublicUser>,
}

#[derive(serde::Serialize)]
struct ProfileBody {
    profile: Profile,
    messages: Vec<MessageView>,
}

#[derive(serde::Serialize)]
struct FollowingBody {
    user: PublicUser,
    following: Vec<PublicUser>,
}

#[derive(serde::Serialize)]
struct FollowersBody {
    user: PublicUser,
    followers: Vec<PublicUser>,
}

#[derive(serde::Serialize)]
struct LikesBody {
    user: PublicUser,
    messages: Vec<MessageView>,
}

fn public(users: Vec<User>) -> Vec<PublicUser> {
    users.into_iter().map(PublicUser::from).collect()
}

async fn list_users(
    flashes: Flashes,
    user_ctrl: State<DynUserCtrl>,
    Query(query): Query<SearchQuery>,
) -> Result<Page<UsersBody>> {
    let search = query.q.filter(|q| !q.trim().is_empty());
    let users = public(user_ctrl.search(search).await?);

    Ok(Page::new(flashes, UsersBody { users }))
}

async fn show_user(
    maybe_current_user: MaybeCurrentUser,
    flashes: Flashes,
    profile_ctrl: State<DynProfileCtrl>,
    message_ctrl: State<DynMessageCtrl>,
    PathId(user_id): PathId,
) -> Result<Page<ProfileBody>> {
    let viewer = maybe_current_user.user_id();

    let profile = profile_ctrl.get_profile(viewer, user_id).await?;
    let messages = message_ctrl.user_messages(viewer, user_id).await?;

    Ok(Page::new(flashes, ProfileBody { profile, messages }))
}

// Who other people follow, and who follows them, is only visible to logged in users.
async fn show_following(
    _: CurrentUser,
    flashes: Flashes,
    user_ctrl: State<DynUserCtrl>,
    profile_ctrl: State<DynProfileCtrl>,
    PathId(user_id): PathId,
) -> Result<Page<FollowingBody>> {
    let user = user_ctrl.user_by_id(user_id).await?.into();
    let following = public(profile_ctrl.following(user_id).await?);

    Ok(Page::new(flashes, FollowingBody { user, following }))
}

async fn show_followers(
    _: CurrentUser,
    flashes: Flashes,
    user_ctrl: State<DynUserCtrl>,
    profile_ctrl: State<DynProfileCtrl>,
    PathId(user_id): PathId,
) -> Result<Page<FollowersBody>> {
    let user = user_ctrl.user_by_id(user_id).await?.into();
    let followers = public(profile_ctrl.followers(user_id).await?);

    Ok(Page::new(flashes, FollowersBody { user, followers }))
}

async fn show_likes(
    current_user: CurrentUser,
    flashes: Flashes,
    user_ctrl: State<DynUserCtrl>,
    like_ctrl: State<DynLikeCtrl>,
    PathId(user_id): PathId,
) -> Result<Page<LikesBody>> {
    let user = user_ctrl.user_by_id(user_id).await?.into();
    let messages = like_ctrl
        .liked_messages(current_user.user_id, user_id)
        .await?;

    Ok(Page::new(flashes, LikesBody { user, messages }))
}

async fn follow_user(
    current_user: CurrentUser,
    profile_ctrl: State<DynProfileCtrl>,
    PathId(user_id): PathId,
) -> Result<Response> {
    // The schema would happily store a self-follow, so it's refused here.
    if user_id == current_user.user_id {
        return Ok((
            Extension(Flash::danger("You cannot follow yourself.")),
            Found::to(format!("/users/{}", user_id)),
        )
            .into_response());
    }

    profile_ctrl.follow(current_user.user_id, user_id).await?;

    Ok(Found::to(format!("/users/{}/following", current_user.user_id)).into_response())
}

async fn stop_following(
    current_user: CurrentUser,
    profile_ctrl: State<DynProfileCtrl>,
    PathId(user_id): PathId,
) -> Result<Found> {
    profile_ctrl.unfollow(current_user.user_id, user_id).await?;

    Ok(Found::to(format!(
        "/users/{}/following",
        current_user.user_id
    )))
}
