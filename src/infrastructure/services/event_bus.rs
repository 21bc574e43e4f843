use async_broadcast::{broadcast, InactiveReceiver, Receiver, Sender, TrySendError};
use serde::Serialize;

/// Events kept for slow subscribers before the oldest are dropped
const EVENT_CAPACITY: usize = 1000;

/// Event pushed to SSE subscribers
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbyEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub party_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    /// Additional data fields (flattened into root)
    #[serde(flatten)]
    pub data: serde_json::Value,
    pub timestamp: i64,
    /// Restricts delivery to these users; `None` is public
    #[serde(skip)]
    pub audience: Option<Vec<String>>,
}

impl LobbyEvent {
    pub fn new(event_type: &str) -> Self {
        Self {
            event_type: event_type.to_string(),
            game_id: None,
            party_id: None,
            user_id: None,
            action: None,
            data: serde_json::Value::Object(serde_json::Map::new()),
            timestamp: chrono::Utc::now().timestamp_millis(),
            audience: None,
        }
    }

    /// `partyUpdate` event for a party of a game
    pub fn party_update(action: &str, game_id: &str, party_id: &str, user_id: &str) -> Self {
        Self::new("partyUpdate")
            .with_action(action)
            .with_game(game_id)
            .with_party(party_id)
            .with_user(user_id)
    }

    pub fn with_action(mut self, action: &str) -> Self {
        self.action = Some(action.to_string());
        self
    }

    pub fn with_game(mut self, game_id: &str) -> Self {
        self.game_id = Some(game_id.to_string());
        self
    }

    pub fn with_party(mut self, party_id: &str) -> Self {
        self.party_id = Some(party_id.to_string());
        self
    }

    pub fn with_user(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_audience(mut self, audience: Vec<String>) -> Self {
        self.audience = Some(audience);
        self
    }

    /// Whether a subscriber (anonymous when `None`) may receive this event
    pub fn is_visible_to(&self, user_id: Option<&str>) -> bool {
        match (&self.audience, user_id) {
            (None, _) => true,
            (Some(audience), Some(user_id)) => audience.iter().any(|u| u == user_id),
            (Some(_), None) => false,
        }
    }
}

/// Fan-out of lobby events to every SSE subscriber
#[derive(Clone)]
pub struct EventBus {
    sender: Sender<LobbyEvent>,
    // Keeps the channel open while nobody is subscribed
    _keepalive: InactiveReceiver<LobbyEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (mut sender, receiver) = broadcast(EVENT_CAPACITY);
        sender.set_overflow(true);
        Self {
            sender,
            _keepalive: receiver.deactivate(),
        }
    }

    pub fn subscribe(&self) -> Receiver<LobbyEvent> {
        self.sender.new_receiver()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Broadcast an event to all connected subscribers
    pub fn publish(&self, event: LobbyEvent) {
        tracing::debug!(
            event_type = %event.event_type,
            action = ?event.action,
            receivers = self.sender.receiver_count(),
            "broadcasting event"
        );
        match self.sender.try_broadcast(event) {
            Ok(None) => {}
            Ok(Some(_)) => {
                tracing::debug!("event buffer full, dropped oldest event");
            }
            Err(TrySendError::Inactive(_)) => {
                tracing::trace!("event dropped, no active subscribers");
            }
            Err(e) => {
                tracing::warn!("Failed to broadcast event: {:?}", e);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new();
        let mut receiver = bus.subscribe();

        bus.publish(LobbyEvent::party_update("playerJoined", "apex", "p1", "A"));

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.event_type, "partyUpdate");
        assert_eq!(event.action.as_deref(), Some("playerJoined"));
        assert_eq!(event.game_id.as_deref(), Some("apex"));
    }

    #[test]
    fn publishing_without_subscribers_is_harmless() {
        let bus = EventBus::new();
        bus.publish(LobbyEvent::new("chatMessage"));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn audience_limits_visibility() {
        let event = LobbyEvent::new("chatMessage").with_audience(vec!["A".into()]);
        assert!(event.is_visible_to(Some("A")));
        assert!(!event.is_visible_to(Some("B")));
        assert!(!event.is_visible_to(None));
        assert!(LobbyEvent::new("partyUpdate").is_visible_to(None));
    }

    #[test]
    fn serializes_flattened_data_without_audience() {
        let event = LobbyEvent::new("partyUpdate")
            .with_data(serde_json::json!({ "chatroomId": "r1" }))
            .with_audience(vec!["A".into()]);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "partyUpdate");
        assert_eq!(json["chatroomId"], "r1");
        assert!(json.get("audience").is_none());
        assert!(json.get("gameId").is_none());
    }
}
