use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::domain::services::{JoinOutcome, VoiceSession, VoiceSessionError};
use crate::infrastructure::services::{EventBus, LobbyEvent, VoiceEngine, VoiceEngineError};

/// Audio level (0-255) at which a participant counts as speaking
pub const ACTIVE_SPEAKER_THRESHOLD: u8 = 40;

/// Shortest period the auto-eject monitor runs at
pub const MIN_EJECT_PERIOD: Duration = Duration::from_secs(1);

/// Snapshot of one user's voice session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceStatus {
    pub channel_id: Option<String>,
    pub muted: bool,
    pub remote_users: Vec<String>,
}

impl VoiceStatus {
    fn of(session: Option<&VoiceSession>) -> Self {
        let Some(session) = session else {
            return Self {
                channel_id: None,
                muted: false,
                remote_users: Vec::new(),
            };
        };
        let mut remote_users: Vec<_> = session
            .remote_users()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default();
        remote_users.sort();
        Self {
            channel_id: session.channel_id().map(str::to_string),
            muted: session.is_muted(),
            remote_users,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    #[error(transparent)]
    Session(#[from] VoiceSessionError),
    #[error(transparent)]
    Engine(#[from] VoiceEngineError),
}

/// Owns every user's voice session and keeps remote participant sets in sync
pub struct VoiceChannelManager {
    engine: Arc<dyn VoiceEngine>,
    sessions: Mutex<HashMap<String, VoiceSession>>,
    events: EventBus,
}

impl VoiceChannelManager {
    pub fn new(engine: Arc<dyn VoiceEngine>, events: EventBus) -> Self {
        Self {
            engine,
            sessions: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub async fn status(&self, user_id: &str) -> VoiceStatus {
        let sessions = self.sessions.lock().await;
        VoiceStatus::of(sessions.get(user_id))
    }

    /// Join a channel. A no-op when already there, refused when in another one.
    pub async fn join(
        &self,
        user_id: &str,
        channel_id: &str,
    ) -> Result<(JoinOutcome, VoiceStatus), VoiceError> {
        let mut sessions = self.sessions.lock().await;

        let mut session = sessions.get(user_id).cloned().unwrap_or_default();
        if session.check_join(channel_id)? == JoinOutcome::AlreadyJoined {
            return Ok((JoinOutcome::AlreadyJoined, VoiceStatus::of(Some(&session))));
        }

        let present = self.engine.join_channel(channel_id, user_id).await?;
        session.join(channel_id, present)?;
        sessions.insert(user_id.to_string(), session);

        for (other_id, other) in sessions.iter_mut() {
            if other_id != user_id {
                other.remote_joined(channel_id, user_id);
            }
        }

        tracing::info!(user_id, channel_id, "joined voice channel");
        self.publish(&sessions, channel_id, user_id, "joined", serde_json::json!({}));

        Ok((JoinOutcome::Joined, VoiceStatus::of(sessions.get(user_id))))
    }

    /// Leave a channel. Returns false when it is not the user's active channel.
    pub async fn leave(&self, user_id: &str, channel_id: &str) -> Result<bool, VoiceError> {
        let mut sessions = self.sessions.lock().await;
        self.leave_locked(&mut sessions, user_id, channel_id, "left").await
    }

    pub async fn set_muted(&self, user_id: &str, muted: bool) -> Result<VoiceStatus, VoiceError> {
        let mut sessions = self.sessions.lock().await;
        let session = sessions
            .get_mut(user_id)
            .ok_or(VoiceSessionError::NotInChannel)?;
        let channel_id = session
            .channel_id()
            .ok_or(VoiceSessionError::NotInChannel)?
            .to_string();

        self.engine
            .set_local_muted(&channel_id, user_id, muted)
            .await?;
        session.set_muted(muted)?;

        self.publish(
            &sessions,
            &channel_id,
            user_id,
            "muted",
            serde_json::json!({ "muted": muted }),
        );
        Ok(VoiceStatus::of(sessions.get(user_id)))
    }

    /// Report the local audio level. Returns true when announced as active speaker.
    pub async fn report_volume(&self, user_id: &str, level: u8) -> Result<bool, VoiceError> {
        let sessions = self.sessions.lock().await;
        let session = sessions
            .get(user_id)
            .ok_or(VoiceSessionError::NotInChannel)?;
        let channel_id = session
            .channel_id()
            .ok_or(VoiceSessionError::NotInChannel)?;

        if session.is_muted() || level < ACTIVE_SPEAKER_THRESHOLD {
            return Ok(false);
        }

        self.publish(
            &sessions,
            channel_id,
            user_id,
            "activeSpeaker",
            serde_json::json!({ "level": level }),
        );
        Ok(true)
    }

    /// Make every user that is alone in its channel leave it.
    /// Returns the ejected (user, channel) pairs.
    pub async fn eject_lonely_sessions(&self) -> Vec<(String, String)> {
        let mut sessions = self.sessions.lock().await;

        let lonely: Vec<(String, String)> = sessions
            .iter()
            .filter(|(_, s)| s.is_alone())
            .filter_map(|(user, s)| s.channel_id().map(|c| (user.clone(), c.to_string())))
            .collect();

        let mut ejected = Vec::with_capacity(lonely.len());
        for (user_id, channel_id) in lonely {
            match self
                .leave_locked(&mut sessions, &user_id, &channel_id, "ejected")
                .await
            {
                Ok(true) => ejected.push((user_id, channel_id)),
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(user_id, channel_id, error = %e, "failed to eject voice session");
                }
            }
        }

        if !ejected.is_empty() {
            tracing::info!(count = ejected.len(), "ejected lone voice sessions");
        }
        ejected
    }

    /// Periodically eject users left alone in a channel. Periods shorter
    /// than `MIN_EJECT_PERIOD` are raised to it.
    pub fn spawn_eject_monitor(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        if period < MIN_EJECT_PERIOD {
            tracing::warn!(?period, "voice eject period too short, using the minimum");
        }
        let period = period.max(MIN_EJECT_PERIOD);
        let manager = Arc::clone(self);
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                ticker.tick().await;
                manager.eject_lonely_sessions().await;
            }
        })
    }

    async fn leave_locked(
        &self,
        sessions: &mut HashMap<String, VoiceSession>,
        user_id: &str,
        channel_id: &str,
        action: &str,
    ) -> Result<bool, VoiceError> {
        let mut session = sessions.get(user_id).cloned().unwrap_or_default();
        if !session.leave(channel_id) {
            return Ok(false);
        }

        // Captured while the leaving user is still counted in the channel
        let audience = channel_audience(sessions, channel_id);

        self.engine.leave_channel(channel_id, user_id).await?;
        // An idle session carries nothing worth keeping
        sessions.remove(user_id);
        for other in sessions.values_mut() {
            other.remote_left(channel_id, user_id);
        }

        tracing::info!(user_id, channel_id, action, "left voice channel");
        self.publish_to(audience, channel_id, user_id, action, serde_json::json!({}));
        Ok(true)
    }

    fn publish(
        &self,
        sessions: &HashMap<String, VoiceSession>,
        channel_id: &str,
        user_id: &str,
        action: &str,
        data: serde_json::Value,
    ) {
        let audience = channel_audience(sessions, channel_id);
        self.publish_to(audience, channel_id, user_id, action, data);
    }

    fn publish_to(
        &self,
        audience: Vec<String>,
        channel_id: &str,
        user_id: &str,
        action: &str,
        mut data: serde_json::Value,
    ) {
        if let Some(map) = data.as_object_mut() {
            map.insert("channelId".into(), channel_id.into());
        }

        self.events.publish(
            LobbyEvent::new("voiceUpdate")
                .with_action(action)
                .with_user(user_id)
                .with_data(data)
                .with_audience(audience),
        );
    }
}

/// Users whose active channel is `channel_id`
fn channel_audience(sessions: &HashMap<String, VoiceSession>, channel_id: &str) -> Vec<String> {
    sessions
        .iter()
        .filter(|(_, s)| s.channel_id() == Some(channel_id))
        .map(|(user, _)| user.clone())
        .collect()
}
