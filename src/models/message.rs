use crate::http::types::Timestamptz;
use crate::http::{Error, Result, ResultExt};
use async_trait::async_trait;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::borrow::Cow;
use std::sync::Arc;
use validator::{Validate, ValidationError};

#[cfg(test)]
use mockall::automock;

/// How many messages the home timeline and profile pages show.
const PAGE_SIZE: i64 = 100;

#[derive(Serialize, FromRow, Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: i64,
    pub text: String,
    pub timestamp: Timestamptz,
    pub user_id: i64,
}

#[derive(Deserialize, Validate, Debug, Clone, Default)]
#[serde(default)]
pub struct NewMessage {
    #[validate(
        custom = "not_blank",
        length(max = 140, message = "Field cannot be longer than 140 characters.")
    )]
    pub text: String,
    /// Messages are always posted as the current user; a form naming anyone else is refused.
    pub user_id: Option<i64>,
}

fn not_blank(text: &str) -> std::result::Result<(), ValidationError> {
    if text.trim().is_empty() {
        let mut error = ValidationError::new("required");
        error.message = Some(Cow::Borrowed("This field is required."));
        return Err(error);
    }
    Ok(())
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub username: String,
    pub image_url: String,
}

/// A message as shown in a list or on its own page.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageView {
    pub id: i64,
    pub text: String,
    pub timestamp: Timestamptz,
    /// Whether the viewing user likes this message; always `false` for anonymous viewers.
    pub liked: bool,
    pub author: Author,
}

// The author comes back as flattened columns and gets nested afterwards.
#[derive(FromRow)]
pub struct MessageFromQuery {
    pub id: i64,
    pub text: String,
    pub timestamp: Timestamptz,
    pub liked: bool,
    pub author_id: i64,
    pub author_username: String,
    pub author_image_url: String,
}

impl MessageFromQuery {
    pub fn into_view(self) -> MessageView {
        MessageView {
            id: self.id,
            text: self.text,
            timestamp: self.timestamp,
            liked: self.liked,
            author: Author {
                id: self.author_id,
                username: self.author_username,
                image_url: self.author_image_url,
            },
        }
    }
}

#[derive(Clone)]
pub struct MessageController {
    pool: PgPool,
}

impl MessageController {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub type DynMessageCtrl = Arc<dyn MessageCtrlTrait + Send + Sync>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait MessageCtrlTrait {
    async fn create_message(&self, user_id: i64, text: String) -> Result<Message>;
    async fn get_message(&self, viewer: Option<i64>, message_id: i64) -> Result<MessageView>;
    /// `Error::NotFound` if there's no such message, `Error::Unauthorized` if
    /// `user_id` doesn't own it.
    async fn delete_message(&self, user_id: i64, message_id: i64) -> Result<()>;
    /// The newest messages by `user_id` and everyone they follow.
    async fn timeline(&self, user_id: i64) -> Result<Vec<MessageView>>;
    async fn user_messages(&self, viewer: Option<i64>, user_id: i64) -> Result<Vec<MessageView>>;
}

#[async_trait]
impl MessageCtrlTrait for MessageController {
    async fn create_message(&self, user_id: i64, text: String) -> Result<Message> {
        let message = sqlx::query_as::<_, Message>(
            r#"
                insert into messages (text, user_id)
                values ($1, $2)
                returning id, text, timestamp, user_id
            "#,
        )
        .bind(text)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        // The session outlived the account.
        .on_constraint("messages_user_id_fkey", |_| Error::NotFound)?;

        Ok(message)
    }

    async fn get_message(&self, viewer: Option<i64>, message_id: i64) -> Result<MessageView> {
        let message = sqlx::query_as::<_, MessageFromQuery>(
            r#"
                select
                    messages.id,
                    messages.text,
                    messages.timestamp,
                    exists(
                        select 1 from likes
                        where likes.message_id = messages.id and likes.user_id = $1
                    ) liked,
                    author.id author_id,
                    author.username author_username,
                    author.image_url author_image_url
                from messages
                inner join users author on author.id = messages.user_id
                where messages.id = $2
            "#,
        )
        .bind(viewer)
        .bind(message_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound)?
        .into_view();

        Ok(message)
    }

    async fn delete_message(&self, user_id: i64, message_id: i64) -> Result<()> {
        // The main query sees the table as it was before the CTE's delete, so one round trip
        // tells us both whether the message existed and whether we were allowed to delete it.
        let (existed, deleted) = sqlx::query_as::<_, (bool, bool)>(
            r#"
                with deleted_message as (
                    delete from messages
                    where id = $1 and user_id = $2
                    returning 1
                )
                select
                    exists(select 1 from messages where id = $1) existed,
                    exists(select 1 from deleted_message) deleted
            "#,
        )
        .bind(message_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        if deleted {
            Ok(())
        } else if existed {
            Err(Error::Unauthorized)
        } else {
            Err(Error::NotFound)
        }
    }

    async fn timeline(&self, user_id: i64) -> Result<Vec<MessageView>> {
        let messages = sqlx::query_as::<_, MessageFromQuery>(
            r#"
                select
                    messages.id,
                    messages.text,
                    messages.timestamp,
                    exists(
                        select 1 from likes
                        where likes.message_id = messages.id and likes.user_id = $1
                    ) liked,
                    author.id author_id,
                    author.username author_username,
                    author.image_url author_image_url
                from messages
                inner join users author on author.id = messages.user_id
                where messages.user_id = $1
                   or messages.user_id in (
                        select user_being_followed_id from follows where user_following_id = $1
                   )
                order by messages.timestamp desc
                limit $2
            "#,
        )
        .bind(user_id)
        .bind(PAGE_SIZE)
        .fetch(&self.pool)
        .map_ok(MessageFromQuery::into_view)
        .try_collect()
        .await?;

        Ok(messages)
    }

    async fn user_messages(&self, viewer: Option<i64>, user_id: i64) -> Result<Vec<MessageView>> {
        let messages = sqlx::query_as::<_, MessageFromQuery>(
            r#"
                select
                    messages.id,
                    messages.text,
                    messages.timestamp,
                    exists(
                        select 1 from likes
                        where likes.message_id = messages.id and likes.user_id = $1
                    ) liked,
                    author.id author_id,
                    author.username author_username,
                    author.image_url author_image_url
                from messages
                inner join users author on author.id = messages.user_id
                where messages.user_id = $2
                order by messages.timestamp desc
                limit $3
            "#,
        )
        .bind(viewer)
        .bind(user_id)
        .bind(PAGE_SIZE)
        .fetch(&self.pool)
        .map_ok(MessageFromQuery::into_view)
        .try_collect()
        .await?;

        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::hello("Hello".to_string(), true)]
    #[case::exactly_140("a".repeat(140), true)]
    #[case::multibyte_140("é".repeat(140), true)]
    #[case::too_long("a".repeat(141), false)]
    #[case::empty(String::new(), false)]
    #[case::whitespace("   ".to_string(), false)]
    fn message_text_validation(#[case] text: String, #[case] ok: bool) {
        let message = NewMessage {
            text,
            user_id: None,
        };
        assert_eq!(message.validate().is_ok(), ok);
    }

    #[test]
    fn overlong_text_reports_the_limit() {
        let err: Error = NewMessage {
            text: "lj;alsjdkfl;j".repeat(20),
            user_id: None,
        }
        .validate()
        .unwrap_err()
        .into();

        let Error::UnprocessableEntity { errors } = err else {
            panic!("expected UnprocessableEntity");
        };
        assert_eq!(
            errors["text"],
            vec!["Field cannot be longer than 140 characters."]
        );
    }
}
