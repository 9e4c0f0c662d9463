use crate::{
    config::{Config, SchedulerConfig},
    jobs::{ReminderEngine, ReminderScheduler},
    repository::Repositories,
    services::{ConversationService, DeliveryDispatcher, NotificationInbox, ReminderService},
    session::{PresenceOracle, SessionStore},
    websocket::ConnectionRegistry,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub repos: Repositories,
    pub sessions: SessionStore,
    pub presence: PresenceOracle,
    pub registry: ConnectionRegistry,
    pub dispatcher: DeliveryDispatcher,
    pub conversations: ConversationService,
    pub inbox: NotificationInbox,
    pub reminders: ReminderService,
    pub engine: ReminderEngine,
    pub config: Option<Arc<Config>>,
}

impl AppState {
    /// Wire every component over one set of repositories.
    pub fn new(repos: Repositories, config: Option<Arc<Config>>) -> Self {
        let sessions = SessionStore::new();
        let presence = PresenceOracle::new(sessions.clone());
        let registry = ConnectionRegistry::new();
        let dispatcher = DeliveryDispatcher::new(repos.clone(), presence.clone(), registry.clone());

        Self {
            conversations: ConversationService::new(repos.clone(), presence.clone()),
            inbox: NotificationInbox::new(repos.clone(), dispatcher.clone()),
            reminders: ReminderService::new(repos.clone()),
            engine: ReminderEngine::new(repos.clone(), dispatcher.clone()),
            repos,
            sessions,
            presence,
            registry,
            dispatcher,
            config,
        }
    }

    pub fn scheduler(&self) -> ReminderScheduler {
        ReminderScheduler::new(self.engine.clone(), self.scheduler_config())
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        self.config
            .as_ref()
            .map(|c| c.scheduler.clone())
            .unwrap_or_default()
    }

    /// Drop every session and live channel.
    pub async fn shutdown(&self) {
        self.sessions.clear();
        self.registry.clear_all().await;
    }
}
