//! Fallback stream envelope.
//!
//! Each SSE `data:` line carries one JSON object tagged by `type`. The
//! notification body is nested under `notification` because it has its own
//! `type` field.

use serde::{Deserialize, Serialize};

use crate::adapters::websocket::Delivery;
use crate::domain::foundation::{ClientId, Timestamp};
use crate::domain::notification::{Notification, SystemNotification};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamMessage {
    /// Handshake acknowledgement, always the first message.
    Connected {
        #[serde(rename = "clientId")]
        client_id: ClientId,
        timestamp: Timestamp,
    },

    /// Liveness signal; carries nothing else.
    Heartbeat { timestamp: Timestamp },

    /// The server is closing the stream on purpose. Clients reconnect.
    Timeout,

    Notification { notification: Notification },

    SystemNotification { notification: SystemNotification },
}

impl From<Delivery> for StreamMessage {
    fn from(delivery: Delivery) -> Self {
        match delivery {
            Delivery::Notification(notification) => StreamMessage::Notification { notification },
            Delivery::SystemNotification(notification) => {
                StreamMessage::SystemNotification { notification }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn timeout_is_bare_tag() {
        assert_eq!(
            serde_json::to_value(StreamMessage::Timeout).unwrap(),
            json!({"type": "timeout"})
        );
    }

    #[test]
    fn connected_uses_camel_case_client_id() {
        let client_id = ClientId::new();
        let json = serde_json::to_value(StreamMessage::Connected {
            client_id,
            timestamp: Timestamp::from_unix_secs(0),
        })
        .unwrap();

        assert_eq!(json["type"], "connected");
        assert_eq!(json["clientId"], client_id.to_string());
    }

    #[test]
    fn notification_is_nested_to_keep_its_type() {
        let raw = json!({
            "type": "notification",
            "notification": {
                "id": "n1",
                "userId": "user-1",
                "type": "post_scheduled",
                "title": "Scheduled",
                "message": "Goes out at noon",
                "read": false,
                "timestamp": "2024-01-15T10:30:00Z"
            }
        });

        match serde_json::from_value::<StreamMessage>(raw).unwrap() {
            StreamMessage::Notification { notification } => {
                assert_eq!(notification.id.as_str(), "n1");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn unknown_type_is_malformed() {
        assert!(serde_json::from_value::<StreamMessage>(json!({"type": "reboot"})).is_err());
    }
}
