//! Front-end payload → relay frame

use serde_json::Value as Json;

use crate::relay::protocol::{Acknowledgment, RelayEvent, RelayIdentity};

/// What to do with one inbound payload
#[derive(Debug, Clone, PartialEq)]
pub enum Translation {
    /// `echo` request: acknowledge to every peer, sender included
    Acknowledge(Acknowledgment),
    /// Chat payload: broadcast to every peer except the sender
    Event(RelayEvent),
    /// Front-end handshake (carries `auth_token`): not forwarded
    Withheld,
}

/// Builds relay frames stamped with a configured identity
#[derive(Debug, Clone, Default)]
pub struct EnvelopeTranslator {
    identity: RelayIdentity,
}

impl EnvelopeTranslator {
    pub fn new(identity: RelayIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &RelayIdentity {
        &self.identity
    }

    /// Translate with the current wall-clock time
    pub fn translate(&self, payload: Json) -> Translation {
        self.translate_at(payload, chrono::Utc::now().timestamp())
    }

    /// Translate with an explicit `time` (seconds since the epoch)
    pub fn translate_at(&self, payload: Json, time: i64) -> Translation {
        if let Json::Object(fields) = &payload {
            if let Some(echo) = fields.get("echo") {
                return Translation::Acknowledge(Acknowledgment::new(&self.identity, echo.clone()));
            }
            if fields.contains_key("auth_token") {
                return Translation::Withheld;
            }
        }

        let message = match payload {
            Json::Array(fragments) => {
                let mut message = Vec::with_capacity(fragments.len() + 1);
                message.push(self.identity.mention());
                message.extend(fragments);
                Json::Array(message)
            }
            other => other,
        };
        Translation::Event(RelayEvent::new(&self.identity, time, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_echo_becomes_acknowledgment() {
        let translator = EnvelopeTranslator::default();
        match translator.translate(json!({"echo": "abc", "action": "send_group_msg"})) {
            Translation::Acknowledge(ack) => {
                assert_eq!(ack.echo, json!("abc"));
                assert_eq!(ack.data.message_id, 1_253_451_396);
            }
            other => panic!("expected acknowledgment, got {:?}", other),
        }
    }

    #[test]
    fn test_array_gets_mention_prefix() {
        let translator = EnvelopeTranslator::default();
        let payload = json!([{"type": "text", "data": {"text": "hi"}}]);
        let Translation::Event(event) = translator.translate_at(payload, 1_739_849_686) else {
            panic!("expected event");
        };
        assert_eq!(event.time, 1_739_849_686);
        assert_eq!(
            event.message,
            json!([
                {"type": "at", "data": {"qq": "1000000", "name": "Eridanus"}},
                {"type": "text", "data": {"text": "hi"}}
            ])
        );
    }

    #[test]
    fn test_object_payload_passes_through() {
        let translator = EnvelopeTranslator::default();
        let Translation::Event(event) = translator.translate_at(json!({"text": "hi"}), 1) else {
            panic!("expected event");
        };
        assert_eq!(event.message, json!({"text": "hi"}));
        assert_eq!(event.self_id, 1_000_000);
        assert_eq!(event.user_id, 111_111_111);
    }

    #[test]
    fn test_handshake_is_withheld() {
        let translator = EnvelopeTranslator::default();
        assert_eq!(translator.translate(json!({"auth_token": "t"})), Translation::Withheld);
    }

    #[test]
    fn test_configured_identity() {
        let identity = RelayIdentity {
            self_id: 42,
            mention_name: "Bot".to_string(),
            ..RelayIdentity::default()
        };
        let translator = EnvelopeTranslator::new(identity);
        let Translation::Event(event) = translator.translate_at(json!([]), 1) else {
            panic!("expected event");
        };
        assert_eq!(event.self_id, 42);
        assert_eq!(event.message, json!([{"type": "at", "data": {"qq": "42", "name": "Bot"}}]));
    }
}
