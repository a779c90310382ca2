use sqlx::PgPool;
use std::sync::Arc;

#[cfg(test)]
use mockall::automock;

pub mod credential;
pub mod like;
pub mod message;
pub mod profile;
pub mod user;

use like::{DynLikeCtrl, LikeController};
use message::{DynMessageCtrl, MessageController};
use profile::{DynProfileCtrl, ProfileController};
use user::{DynUserCtrl, UserController};

pub type DynStore = Arc<dyn StoreTrait + Send + Sync>;

/// Hands out the per-table controllers.
///
/// Handlers only ever see the traits, so their tests can run against `MockStoreTrait`
/// without a database.
#[cfg_attr(test, automock)]
pub trait StoreTrait {
    fn user(&self) -> DynUserCtrl;
    fn profile(&self) -> DynProfileCtrl;
    fn message(&self) -> DynMessageCtrl;
    fn like(&self) -> DynLikeCtrl;
}

#[derive(Clone)]
pub struct Store {
    pub pool: PgPool,
    user: UserController,
    profile: ProfileController,
    message: MessageController,
    like: LikeController,
}

impl Store {
    pub fn new(pool: PgPool) -> Self {
        Self {
            user: UserController::new(pool.clone()),
            profile: ProfileController::new(pool.clone()),
            message: MessageController::new(pool.clone()),
            like: LikeController::new(pool.clone()),
            pool,
        }
    }
}

impl StoreTrait for Store {
    fn user(&self) -> DynUserCtrl {
        Arc::new(self.user.clone())
    }

    fn profile(&self) -> DynProfileCtrl {
        Arc::new(self.profile.clone())
    }

    fn message(&self) -> DynMessageCtrl {
        Arc::new(self.message.clone())
    }

    fn like(&self) -> DynLikeCtrl {
        Arc::new(self.like.clone())
    }
}
