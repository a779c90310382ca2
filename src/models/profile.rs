use crate::http::{Error, Result, ResultExt};
use crate::models::user::{PublicUser, User};
use async_trait::async_trait;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub user: PublicUser,
    pub messages_count: i64,
    pub following_count: i64,
    pub followers_count: i64,
    pub likes_count: i64,
    /// The viewer follows this user.
    pub is_following: bool,
    /// This user follows the viewer.
    pub is_followed_by: bool,
}

#[derive(FromRow)]
struct ProfileFromQuery {
    id: i64,
    username: String,
    image_url: String,
    header_image_url: String,
    bio: Option<String>,
    location: Option<String>,
    messages_count: i64,
    following_count: i64,
    followers_count: i64,
    likes_count: i64,
    is_following: bool,
    is_followed_by: bool,
}

impl ProfileFromQuery {
    fn into_profile(self) -> Profile {
        Profile {
            user: PublicUser {
                id: self.id,
                username: self.username,
                image_url: self.image_url,
                header_image_url: self.header_image_url,
                bio: self.bio,
                location: self.location,
            },
            messages_count: self.messages_count,
            following_count: self.following_count,
            followers_count: self.followers_count,
            likes_count: self.likes_count,
            is_following: self.is_following,
            is_followed_by: self.is_followed_by,
        }
    }
}

#[derive(Clone)]
pub struct ProfileController {
    pool: PgPool,
}

impl ProfileController {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn ensure_user_exists(&self, user_id: i64) -> Result<()> {
        let exists = sqlx::query_scalar::<_, bool>("select exists(select 1 from users where id = $1)")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        if exists {
            Ok(())
        } else {
            Err(Error::NotFound)
        }
    }
}

pub type DynProfileCtrl = Arc<dyn ProfileCtrlTrait + Send + Sync>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProfileCtrlTrait {
    async fn get_profile(&self, viewer: Option<i64>, user_id: i64) -> Result<Profile>;
    /// Idempotent. Rejecting a self-follow is the caller's job.
    async fn follow(&self, follower: i64, followed: i64) -> Result<()>;
    async fn unfollow(&self, follower: i64, followed: i64) -> Result<()>;
    /// Users that `user_id` follows.
    async fn following(&self, user_id: i64) -> Result<Vec<User>>;
    /// Users following `user_id`.
    async fn followers(&self, user_id: i64) -> Result<Vec<User>>;
}

#[async_trait]
impl ProfileCtrlTrait for ProfileController {
    async fn get_profile(&self, viewer: Option<i64>, user_id: i64) -> Result<Profile> {
        let profile = sqlx::query_as::<_, ProfileFromQuery>(
            r#"
                select
                    users.id,
                    users.username,
                    users.image_url,
                    users.header_image_url,
                    users.bio,
                    users.location,
                    (select count(*) from messages where user_id = users.id) messages_count,
                    (select count(*) from follows where user_following_id = users.id) following_count,
                    (select count(*) from follows where user_being_followed_id = users.id) followers_count,
                    (select count(*) from likes where user_id = users.id) likes_count,
                    exists(
                        select 1 from follows
                        where user_being_followed_id = users.id and user_following_id = $1
                    ) is_following,
                    exists(
                        select 1 from follows
                        where user_being_followed_id = $1 and user_following_id = users.id
                    ) is_followed_by
                from users
                where users.id = $2
            "#,
        )
        .bind(viewer)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound)?
        .into_profile();

        Ok(profile)
    }

    async fn follow(&self, follower: i64, followed: i64) -> Result<()> {
        sqlx::query_scalar::<_, i64>(
            r#"
                with target as (
                    select id from users where id = $2
                ),
                inserted_follow as (
                    insert into follows (user_being_followed_id, user_following_id)
                    select id, $1 from target
                    -- already following
                    on conflict do nothing
                )
                select id from target
            "#,
        )
        .bind(follower)
        .bind(followed)
        .fetch_optional(&self.pool)
        .await
        .on_constraint("follows_user_following_id_fkey", |_| Error::NotFound)?
        .ok_or(Error::NotFound)?;

        Ok(())
    }

    async fn unfollow(&self, follower: i64, followed: i64) -> Result<()> {
        sqlx::query_scalar::<_, i64>(
            r#"
                with target as (
                    select id from users where id = $2
                ),
                deleted_follow as (
                    delete from follows
                    where user_being_followed_id = (select id from target)
                      and user_following_id = $1
                )
                select id from target
            "#,
        )
        .bind(follower)
        .bind(followed)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound)?;

        Ok(())
    }

    async fn following(&self, user_id: i64) -> Result<Vec<User>> {
        self.ensure_user_exists(user_id).await?;

        let users = sqlx::query_as::<_, User>(
            r#"
                select
                    users.id, users.username, users.email, users.image_url,
                    users.header_image_url, users.bio, users.location, users.password
                from follows
                inner join users on users.id = follows.user_being_followed_id
                where follows.user_following_id = $1
                order by users.username
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn followers(&self, user_id: i64) -> Result<Vec<User>> {
        self.ensure_user_exists(user_id).await?;

        let users = sqlx::query_as::<_, User>(
            r#"
                select
                    users.id, users.username, users.email, users.image_url,
                    users.header_image_url, users.bio, users.location, users.password
                from follows
                inner join users on users.id = follows.user_following_id
                where follows.user_being_followed_id = $1
                order by users.username
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }
}
