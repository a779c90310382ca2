use crate::http::{Error, Result, ResultExt};
use crate::models::credential::{hash_password, verify_password};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::fmt;
use std::sync::Arc;
use validator::Validate;

#[cfg(test)]
use mockall::automock;

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";

#[derive(Deserialize, Validate, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)] // a missing field should fail validation, not deserialization
pub struct NewUser {
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[validate(email(message = "Invalid email address."))]
    pub email: String,
    #[validate(length(min = 6, message = "Field must be at least 6 characters long."))]
    pub password: String,
    pub image_url: Option<String>,
}

#[derive(Deserialize, Validate, Debug, Clone, Default)]
#[serde(default)]
pub struct LoginUser {
    #[validate(length(min = 1, message = "This field is required."))]
    pub username: String,
    #[validate(length(min = 6, message = "Field must be at least 6 characters long."))]
    pub password: String,
}

/// The edit-profile form. Blank fields leave the stored value alone.
#[derive(Deserialize, Validate, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct UpdateUser {
    pub username: Option<String>,
    #[validate(email(message = "Invalid email address."))]
    pub email: Option<String>,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    /// The current password; confirms the change but is never updated by it.
    pub password: String,
}

#[derive(Serialize, FromRow, Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    #[serde(skip_serializing)]
    pub password: String,
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}

/// What everyone else gets to see of a user. The email address stays with its owner.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicUser {
    pub id: i64,
    pub username: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            image_url: user.image_url,
            header_image_url: user.header_image_url,
            bio: user.bio,
            location: user.location,
        }
    }
}

fn non_blank(field: Option<String>) -> Option<String> {
    field.filter(|value| !value.trim().is_empty())
}

impl NewUser {
    pub fn normalized(self) -> Self {
        Self {
            image_url: non_blank(self.image_url),
            ..self
        }
    }
}

impl UpdateUser {
    /// HTML forms submit empty strings for untouched inputs; treat those as "no change".
    pub fn normalized(self) -> Self {
        Self {
            username: non_blank(self.username),
            email: non_blank(self.email),
            image_url: non_blank(self.image_url),
            header_image_url: non_blank(self.header_image_url),
            bio: non_blank(self.bio),
            location: non_blank(self.location),
            password: self.password,
        }
    }
}

#[derive(Clone)]
pub struct UserController {
    pool: PgPool,
}

impl UserController {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub type DynUserCtrl = Arc<dyn UserCtrlTrait + Send + Sync>;

#[cfg_attr(test, automock)]
#[async_trait]
pub trait UserCtrlTrait {
    /// Hash the password and insert the user. Duplicate usernames and emails come back
    /// as `Error::UnprocessableEntity`.
    async fn signup(&self, new_user: NewUser) -> Result<User>;
    /// `Ok(None)` for an unknown username or a wrong password.
    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>>;
    async fn user_by_id(&self, user_id: i64) -> Result<User>;
    async fn search(&self, query: Option<String>) -> Result<Vec<User>>;
    async fn update_user(&self, user_id: i64, update: UpdateUser) -> Result<User>;
    async fn delete_user(&self, user_id: i64) -> Result<()>;
}

fn map_unique_violations<T>(result: std::result::Result<T, sqlx::Error>) -> Result<T> {
    result
        .on_constraint("users_username_key", |_| {
            Error::unprocessable_entity([("username", "Username already taken")])
        })
        .on_constraint("users_email_key", |_| {
            Error::unprocessable_entity([("email", "Email already taken")])
        })
}

#[async_trait]
impl UserCtrlTrait for UserController {
    async fn signup(&self, new_user: NewUser) -> Result<User> {
        let password_hash = hash_password(new_user.password).await?;

        let user = sqlx::query_as::<_, User>(
            r#"
                insert into users (username, email, password, image_url)
                values ($1, $2, $3, $4)
                returning id, username, email, image_url, header_image_url, bio, location, password
            "#,
        )
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(password_hash)
        .bind(
            new_user
                .image_url
                .unwrap_or_else(|| DEFAULT_IMAGE_URL.to_string()),
        )
        .fetch_one(&self.pool)
        .await;

        map_unique_violations(user)
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
                select id, username, email, image_url, header_image_url, bio, location, password
                from users where username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        if verify_password(password.to_string(), user.password.clone()).await? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    async fn user_by_id(&self, user_id: i64) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
                select id, username, email, image_url, header_image_url, bio, location, password
                from users where id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(Error::NotFound)?;

        Ok(user)
    }

    async fn search(&self, query: Option<String>) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
                select id, username, email, image_url, header_image_url, bio, location, password
                from users
                where $1::text is null or username ilike '%' || $1 || '%'
                order by username
            "#,
        )
        .bind(query)
        .fetch_all(&self.pool)
        .await?;

        Ok(users)
    }

    async fn update_user(&self, user_id: i64, update: UpdateUser) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
                update users
                set username = coalesce($1, users.username),
                    email = coalesce($2, users.email),
                    image_url = coalesce($3, users.image_url),
                    header_image_url = coalesce($4, users.header_image_url),
                    bio = coalesce($5, users.bio),
                    location = coalesce($6, users.location)
                where id = $7
                returning id, username, email, image_url, header_image_url, bio, location, password
            "#,
        )
        .bind(update.username)
        .bind(update.email)
        .bind(update.image_url)
        .bind(update.header_image_url)
        .bind(update.bio)
        .bind(update.location)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;

        map_unique_violations(user)?.ok_or(Error::NotFound)
    }

    async fn delete_user(&self, user_id: i64) -> Result<()> {
        // Messages, follows and likes all go with it via `on delete cascade`.
        let result = sqlx::query("delete from users where id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn new_user(username: &str, email: &str, password: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            image_url: None,
        }
    }

    #[rstest]
    #[case::valid("testuser", "test@test.com", "testuser", true)]
    #[case::missing_username("", "test@test.com", "testuser", false)]
    #[case::bad_email("testuser", "not-an-email", "testuser", false)]
    #[case::short_password("rocky", "email@gmail.com", "bogus", false)]
    fn signup_form_validation(
        #[case] username: &str,
        #[case] email: &str,
        #[case] password: &str,
        #[case] ok: bool,
    ) {
        assert_eq!(new_user(username, email, password).validate().is_ok(), ok);
    }

    #[test]
    fn validation_errors_name_the_offending_field() {
        let err: Error = new_user("", "test@test.com", "bogus")
            .validate()
            .unwrap_err()
            .into();

        let Error::UnprocessableEntity { errors } = err else {
            panic!("expected UnprocessableEntity");
        };
        assert_eq!(errors["username"], vec!["This field is required."]);
        assert_eq!(
            errors["password"],
            vec!["Field must be at least 6 characters long."]
        );
        assert!(!errors.contains_key("email"));
    }

    #[test]
    fn blank_profile_fields_mean_no_change() {
        let update = UpdateUser {
            username: Some("".to_string()),
            email: Some("new@test.com".to_string()),
            bio: Some("   ".to_string()),
            password: "testuser".to_string(),
            ..Default::default()
        }
        .normalized();

        assert_eq!(update.username, None);
        assert_eq!(update.email.as_deref(), Some("new@test.com"));
        assert_eq!(update.bio, None);
        assert!(update.validate().is_ok());
    }

    #[test]
    fn display_and_json_forms_of_a_user() {
        let user = User {
            id: 1,
            username: "testuser".to_string(),
            email: "test@test.com".to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
            header_image_url: "/static/images/warbler-hero.jpg".to_string(),
            bio: None,
            location: None,
            password: "$argon2id$...".to_string(),
        };

        assert_eq!(user.to_string(), "<User #1: testuser, test@test.com>");
        // The hash never leaves the server.
        assert!(serde_json::to_value(&user).unwrap().get("password").is_none());

        let public = serde_json::to_value(PublicUser::from(user)).unwrap();
        assert_eq!(public["username"], "testuser");
        assert!(public.get("email").is_none());
        assert!(public.get("password").is_none());
    }
}
