use serde::{Deserialize, Serialize};

/// Client asks to join a document's group
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JoinMessage {
    pub document_id: String,
}

/// Client pushes a full-content change for a document
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TextMessage {
    pub document_id: String,
    pub content: String,
}

/// Baseline content sent back to the joining connection only
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LoadMessage {
    pub content: String,
}

/// Content relayed to the other members of a group
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveMessage {
    pub content: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PongMessage {
    pub date: String,
}

/// Messages accepted from clients, tagged by event name
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "join-document")]
    Join(JoinMessage),
    #[serde(rename = "send-text")]
    SendText(TextMessage),
    #[serde(rename = "ping")]
    Ping,
}

/// Messages emitted to clients, tagged by event name
#[derive(Serialize, Deserialize, Debug)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "load-document")]
    Load(LoadMessage),
    #[serde(rename = "receive-text")]
    ReceiveText(ReceiveMessage),
    #[serde(rename = "pong")]
    Pong(PongMessage),
}

/// Envelope fanned out over a group's broadcast channel. The sender id lets
/// each subscriber drop its own messages instead of echoing them back.
#[derive(Debug, Clone)]
pub struct BroadcastMessage {
    pub sender_id: String,
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_message_parses_wire_event() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"join-document","documentId":"doc-1"}"#).unwrap();
        match msg {
            ClientMessage::Join(join) => assert_eq!(join.document_id, "doc-1"),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn send_text_parses_wire_event() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type":"send-text","documentId":"doc-1","content":"hello"}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::SendText(text) => {
                assert_eq!(text.document_id, "doc-1");
                assert_eq!(text.content, "hello");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn receive_text_serializes_wire_event() {
        let msg = ServerMessage::ReceiveText(ReceiveMessage {
            content: "hello".to_string(),
        });
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"type":"receive-text","content":"hello"}"#);
    }

    #[test]
    fn unknown_event_is_rejected() {
        let res: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type":"delete-document","documentId":"doc-1"}"#);
        assert!(res.is_err());
    }
}
