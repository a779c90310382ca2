use crate::config::Config;
use crate::models::DynStore;
use std::sync::Arc;

/// The state every handler gets a clone of.
///
/// `store` is a trait object so the handler tests can swap in mocks.
#[derive(Clone)]
pub struct ApiContext {
    pub config: Arc<Config>,
    pub store: DynStore,
}
