use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

/// Boundary to the real-time voice provider
#[async_trait]
pub trait VoiceEngine: Send + Sync {
    /// Connect `user_id` to a channel. Returns the participants already present.
    async fn join_channel(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, VoiceEngineError>;

    async fn leave_channel(&self, channel_id: &str, user_id: &str) -> Result<(), VoiceEngineError>;

    async fn set_local_muted(
        &self,
        channel_id: &str,
        user_id: &str,
        muted: bool,
    ) -> Result<(), VoiceEngineError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VoiceEngineError {
    #[error("Channel id must not be empty")]
    InvalidChannel,
    #[error("User {0} is not connected to the channel")]
    NotConnected(String),
    #[error("Voice provider error: {0}")]
    Provider(String),
}

/// Voice engine that only tracks channel membership in this process
#[derive(Default)]
pub struct InProcessVoiceEngine {
    channels: RwLock<HashMap<String, HashSet<String>>>,
}

impl InProcessVoiceEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn participants(&self, channel_id: &str) -> Vec<String> {
        let channels = self.channels.read().await;
        let mut users: Vec<_> = channels
            .get(channel_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default();
        users.sort();
        users
    }
}

#[async_trait]
impl VoiceEngine for InProcessVoiceEngine {
    async fn join_channel(
        &self,
        channel_id: &str,
        user_id: &str,
    ) -> Result<Vec<String>, VoiceEngineError> {
        if channel_id.trim().is_empty() {
            return Err(VoiceEngineError::InvalidChannel);
        }

        let mut channels = self.channels.write().await;
        let members = channels.entry(channel_id.to_string()).or_default();
        let present = members.iter().filter(|m| *m != user_id).cloned().collect();
        members.insert(user_id.to_string());
        Ok(present)
    }

    async fn leave_channel(&self, channel_id: &str, user_id: &str) -> Result<(), VoiceEngineError> {
        let mut channels = self.channels.write().await;
        let members = channels
            .get_mut(channel_id)
            .ok_or_else(|| VoiceEngineError::NotConnected(user_id.to_string()))?;
        if !members.remove(user_id) {
            return Err(VoiceEngineError::NotConnected(user_id.to_string()));
        }
        if members.is_empty() {
            channels.remove(channel_id);
        }
        Ok(())
    }

    async fn set_local_muted(
        &self,
        channel_id: &str,
        user_id: &str,
        _muted: bool,
    ) -> Result<(), VoiceEngineError> {
        let channels = self.channels.read().await;
        let connected = channels
            .get(channel_id)
            .is_some_and(|members| members.contains(user_id));
        if connected {
            Ok(())
        } else {
            Err(VoiceEngineError::NotConnected(user_id.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_reports_existing_participants() {
        let engine = InProcessVoiceEngine::new();
        assert!(engine.join_channel("room", "A").await.unwrap().is_empty());
        assert_eq!(engine.join_channel("room", "B").await.unwrap(), vec!["A"]);
        assert_eq!(engine.participants("room").await, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn empty_channels_are_dropped() {
        let engine = InProcessVoiceEngine::new();
        engine.join_channel("room", "A").await.unwrap();
        engine.leave_channel("room", "A").await.unwrap();
        assert!(engine.participants("room").await.is_empty());
        assert!(engine.leave_channel("room", "A").await.is_err());
        assert!(engine.set_local_muted("room", "A", true).await.is_err());
    }
}
