use std::collections::HashSet;

/// Voice state of a single user
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum VoiceState {
    #[default]
    Idle,
    Joined {
        channel_id: String,
        muted: bool,
        remote_users: HashSet<String>,
    },
}

/// Outcome of a join request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyJoined,
}

/// One user's voice channel lifecycle. At most one channel at a time.
#[derive(Debug, Clone, Default)]
pub struct VoiceSession {
    state: VoiceState,
}

impl VoiceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &VoiceState {
        &self.state
    }

    pub fn channel_id(&self) -> Option<&str> {
        match &self.state {
            VoiceState::Idle => None,
            VoiceState::Joined { channel_id, .. } => Some(channel_id),
        }
    }

    pub fn is_muted(&self) -> bool {
        matches!(self.state, VoiceState::Joined { muted: true, .. })
    }

    pub fn remote_users(&self) -> Option<&HashSet<String>> {
        match &self.state {
            VoiceState::Idle => None,
            VoiceState::Joined { remote_users, .. } => Some(remote_users),
        }
    }

    /// Joined with nobody else in the channel
    pub fn is_alone(&self) -> bool {
        self.remote_users().is_some_and(|r| r.is_empty())
    }

    /// Check whether `join(channel_id)` would be accepted without changing state
    pub fn check_join(&self, channel_id: &str) -> Result<JoinOutcome, VoiceSessionError> {
        match &self.state {
            VoiceState::Idle => Ok(JoinOutcome::Joined),
            VoiceState::Joined { channel_id: active, .. } if active == channel_id => {
                Ok(JoinOutcome::AlreadyJoined)
            }
            VoiceState::Joined { channel_id: active, .. } => {
                Err(VoiceSessionError::BusyInOtherChannel(active.clone()))
            }
        }
    }

    /// Enter a channel with the participants already present
    pub fn join(
        &mut self,
        channel_id: &str,
        present: impl IntoIterator<Item = String>,
    ) -> Result<JoinOutcome, VoiceSessionError> {
        let outcome = self.check_join(channel_id)?;
        if outcome == JoinOutcome::Joined {
            self.state = VoiceState::Joined {
                channel_id: channel_id.to_string(),
                muted: false,
                remote_users: present.into_iter().collect(),
            };
        }
        Ok(outcome)
    }

    /// Leave `channel_id`. Returns false (no-op) when it is not the active channel.
    pub fn leave(&mut self, channel_id: &str) -> bool {
        if self.channel_id() != Some(channel_id) {
            return false;
        }
        self.state = VoiceState::Idle;
        true
    }

    pub fn set_muted(&mut self, value: bool) -> Result<(), VoiceSessionError> {
        match &mut self.state {
            VoiceState::Idle => Err(VoiceSessionError::NotInChannel),
            VoiceState::Joined { muted, .. } => {
                *muted = value;
                Ok(())
            }
        }
    }

    pub fn remote_joined(&mut self, channel_id: &str, user_id: &str) {
        if let VoiceState::Joined {
            channel_id: active,
            remote_users,
            ..
        } = &mut self.state
        {
            if active == channel_id {
                remote_users.insert(user_id.to_string());
            }
        }
    }

    pub fn remote_left(&mut self, channel_id: &str, user_id: &str) {
        if let VoiceState::Joined {
            channel_id: active,
            remote_users,
            ..
        } = &mut self.state
        {
            if active == channel_id {
                remote_users.remove(user_id);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VoiceSessionError {
    #[error("Already in voice channel {0}")]
    BusyInOtherChannel(String),
    #[error("Not in a voice channel")]
    NotInChannel,
}
