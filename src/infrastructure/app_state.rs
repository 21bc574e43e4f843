use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::task::JoinHandle;

use crate::infrastructure::auth::JwtService;
use crate::infrastructure::config::Config;
use crate::infrastructure::database;
use crate::infrastructure::database::repositories::{
    SqliteChatroomRepository, SqlitePartyRepository, SqliteUserRepository,
};
use crate::infrastructure::services::{
    EventBus, InProcessVoiceEngine, LobbyEvent, VoiceChannelManager,
};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,

    /// Runtime configuration
    pub config: Arc<Config>,

    /// JWT service for token management
    pub jwt_service: Arc<JwtService>,

    /// User repository
    pub user_repo: Arc<SqliteUserRepository>,

    /// Party repository
    pub party_repo: Arc<SqlitePartyRepository>,

    /// Chatroom and message repository
    pub chatroom_repo: Arc<SqliteChatroomRepository>,

    /// Event broadcaster for SSE
    pub events: EventBus,

    /// Voice sessions of connected users
    pub voice: Arc<VoiceChannelManager>,
}

impl AppState {
    /// Build the state from environment configuration
    pub async fn new() -> anyhow::Result<Self> {
        Self::from_config(Config::from_env()).await
    }

    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        tracing::info!("Connecting to database: {}", config.database_url);

        let db = database::connect(&config.database_url, config.is_in_memory_database()).await?;

        let jwt_service = Arc::new(JwtService::new(&config.jwt_secret));

        // Create repositories
        let user_repo = Arc::new(SqliteUserRepository::new(db.clone()));
        let party_repo = Arc::new(SqlitePartyRepository::new(db.clone()));
        let chatroom_repo = Arc::new(SqliteChatroomRepository::new(db.clone()));

        let events = EventBus::new();
        let voice = Arc::new(VoiceChannelManager::new(
            Arc::new(InProcessVoiceEngine::new()),
            events.clone(),
        ));

        Ok(Self {
            db,
            config: Arc::new(config),
            jwt_service,
            user_repo,
            party_repo,
            chatroom_repo,
            events,
            voice,
        })
    }

    /// Start timers owned by the state (voice auto-eject)
    pub fn spawn_background_tasks(&self) -> Vec<JoinHandle<()>> {
        tracing::info!(
            period_secs = self.config.voice_eject_period.as_secs(),
            "starting voice eject monitor"
        );
        vec![self.voice.spawn_eject_monitor(self.config.voice_eject_period)]
    }

    /// Broadcast an event to all connected SSE clients
    pub fn broadcast_event(&self, event: LobbyEvent) {
        self.events.publish(event);
    }
}
