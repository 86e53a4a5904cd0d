//! Process-wide state, built once in `main` and passed to every command.

use crate::config::ConfigFile;
use crate::error::ConfigError;
use crate::models::User;
use crate::store::AccountStore;
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;

pub struct AppContext<S> {
    pub store: Arc<S>,
    pub config: ConfigFile,
}

impl<S> AppContext<S> {
    pub fn new(store: Arc<S>, config: ConfigFile) -> Self {
        Self { store, config }
    }
}

impl<S: AccountStore> AppContext<S> {
    /// The logged-in user, as recorded in the config file.
    pub async fn current_user(&self) -> Result<User> {
        let name = self.config.config.current_user().ok_or(ConfigError::NotLoggedIn)?;
        self.store
            .user_by_name(name)
            .await
            .with_context(|| format!("could not look up user {name}"))?
            .ok_or_else(|| anyhow!("current user {name} does not exist; run `gator register {name}`"))
    }
}
