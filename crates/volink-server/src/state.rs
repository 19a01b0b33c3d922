use crate::config::ServerConfig;
use crate::feed::NotificationFeed;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use volink_ai::MatchEngine;
use volink_notify::Mailer;
use volink_storage::HubStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<HubStore>,
    pub mailer: Arc<dyn Mailer>,
    /// AI matching engine; None when matching is disabled in config
    pub matcher: Option<Arc<dyn MatchEngine>>,
    pub feed: NotificationFeed,
    pub start_time: DateTime<Utc>,
    pub jwt_secret: Arc<String>,
    pub token_expire_secs: u64,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(
        store: Arc<HubStore>,
        mailer: Arc<dyn Mailer>,
        matcher: Option<Arc<dyn MatchEngine>>,
        jwt_secret: String,
        config: ServerConfig,
    ) -> Self {
        let token_expire_secs = config.auth.token_expire_secs;
        Self {
            store,
            mailer,
            matcher,
            feed: NotificationFeed::new(256),
            start_time: Utc::now(),
            jwt_secret: Arc::new(jwt_secret),
            token_expire_secs,
            config: Arc::new(config),
        }
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.start_time).num_seconds()
    }
}
