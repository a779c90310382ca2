use crate::http::{Error, Result, ResultExt};
use crate::models::message::{MessageFromQuery, MessageView};
use async_trait::async_trait;
use futures::TryStreamExt;
use sqlx::PgPool;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

#[derive(Clone)]
pub struct LikeController {
    pool: PgPool,
}

impl LikeController {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub type DynLikeCtrl = Arc<dyn LikeCtrlTrait + Send + Sync>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait LikeCtrlTrait {
    /// Like the message if `user_id` hasn't yet, otherwise take the like back.
    /// Returns whether the message is liked afterwards.
    ///
    /// Doesn't check who wrote the message; the handler refuses likes on one's own warbles.
    async fn toggle_like(&self, user_id: i64, message_id: i64) -> Result<bool>;
    /// Messages `user_id` likes, with `liked` reflecting `viewer`'s likes.
    async fn liked_messages(&self, viewer: i64, user_id: i64) -> Result<Vec<MessageView>>;
}

#[async_trait]
impl LikeCtrlTrait for LikeController {
    async fn toggle_like(&self, user_id: i64, message_id: i64) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("delete from likes where user_id = $1 and message_id = $2")
            .bind(user_id)
            .bind(message_id)
            .execute(&mut tx)
            .await?
            .rows_affected();

        let liked = if removed == 0 {
            // A concurrent toggle may have inserted it since our delete; that still counts as liked.
            sqlx::query(
                r#"
                    insert into likes (user_id, message_id) values ($1, $2)
                    on conflict (user_id, message_id) do nothing
                "#,
            )
            .bind(user_id)
            .bind(message_id)
            .execute(&mut tx)
            .await
            .on_constraint("likes_message_id_fkey", |_| Error::NotFound)
            .on_constraint("likes_user_id_fkey", |_| Error::NotFound)?;
            true
        } else {
            false
        };

        tx.commit().await?;

        Ok(liked)
    }

    async fn liked_messages(&self, viewer: i64, user_id: i64) -> Result<Vec<MessageView>> {
        let exists =
            sqlx::query_scalar::<_, bool>("select exists(select 1 from users where id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;

        if !exists {
            return Err(Error::NotFound);
        }

        let messages = sqlx::query_as::<_, MessageFromQuery>(
            r#"
                select
                    messages.id,
                    messages.text,
                    messages.timestamp,
                    exists(
                        select 1 from likes viewer_likes
                        where viewer_likes.message_id = messages.id and viewer_likes.user_id = $1
                    ) liked,
                    author.id author_id,
                    author.username author_username,
                    author.image_url author_image_url
                from likes
                inner join messages on messages.id = likes.message_id
                inner join users author on author.id = messages.user_id
                where likes.user_id = $2
                order by messages.timestamp desc
            "#,
        )
        .bind(viewer)
        .bind(user_id)
        .fetch(&self.pool)
        .map_ok(MessageFromQuery::into_view)
        .try_collect()
        .await?;

        Ok(messages)
    }
}
