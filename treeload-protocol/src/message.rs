//! Outbound control messages and inbound responses

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{json, Value as JsonValue};
use std::fmt;
use std::str::FromStr;
use treeload_core::ChangeRecord;

use crate::error::ProtocolError;

/// Messages a worker sends to the service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OutboundMessage {
    /// Announce the connection, optionally hinting a batch size
    Connect {
        #[serde(rename = "batchSize", default, skip_serializing_if = "Option::is_none")]
        batch_size: Option<u32>,
    },

    /// Submit a batch of edits
    Changes { payload: Vec<ChangeRecord> },

    /// Heartbeat
    Ping,
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::Connect { .. } => "CONNECT",
            OutboundMessage::Changes { .. } => "CHANGES",
            OutboundMessage::Ping => "PING",
        }
    }
}

/// Discriminant carried in every inbound response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseType {
    OnConnect,
    Add,
    AddBulk,
    Delete,
    Changes,
    Pong,
    Ack,
    Nack,
    Unknown,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::OnConnect => "ON_CONNECT",
            ResponseType::Add => "ADD",
            ResponseType::AddBulk => "ADD_BULK",
            ResponseType::Delete => "DELETE",
            ResponseType::Changes => "CHANGES",
            ResponseType::Pong => "PONG",
            ResponseType::Ack => "ACK",
            ResponseType::Nack => "NACK",
            ResponseType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ResponseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseType {
    type Err = std::convert::Infallible;

    /// Unrecognised discriminants map to [`ResponseType::Unknown`]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ON_CONNECT" => ResponseType::OnConnect,
            "ADD" => ResponseType::Add,
            "ADD_BULK" => ResponseType::AddBulk,
            "DELETE" => ResponseType::Delete,
            "CHANGES" => ResponseType::Changes,
            "PONG" => ResponseType::Pong,
            "ACK" => ResponseType::Ack,
            "NACK" => ResponseType::Nack,
            _ => ResponseType::Unknown,
        })
    }
}

impl Serialize for ResponseType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResponseType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(ResponseType::from_str(&raw).unwrap_or(ResponseType::Unknown))
    }
}

/// Payload of a CHANGES response
#[derive(Debug, Clone, PartialEq)]
pub struct ChangesBatch {
    pub changes: Vec<ChangeRecord>,
    pub end_of_stream: bool,
}

/// Decoded response from the service
#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    OnConnect { connection_id: Option<i64> },
    /// Single edit notification
    Add(ChangeRecord),
    AddBulk(Vec<ChangeRecord>),
    Changes(ChangesBatch),
    Delete,
    Pong,
    Ack,
    Nack,
    Unknown,
}

impl InboundMessage {
    pub fn response_type(&self) -> ResponseType {
        match self {
            InboundMessage::OnConnect { .. } => ResponseType::OnConnect,
            InboundMessage::Add(_) => ResponseType::Add,
            InboundMessage::AddBulk(_) => ResponseType::AddBulk,
            InboundMessage::Changes(_) => ResponseType::Changes,
            InboundMessage::Delete => ResponseType::Delete,
            InboundMessage::Pong => ResponseType::Pong,
            InboundMessage::Ack => ResponseType::Ack,
            InboundMessage::Nack => ResponseType::Nack,
            InboundMessage::Unknown => ResponseType::Unknown,
        }
    }

    /// Edit notifications carried by this message, if any
    pub fn into_edits(self) -> Vec<ChangeRecord> {
        match self {
            InboundMessage::Add(record) => vec![record],
            InboundMessage::AddBulk(records) => records,
            InboundMessage::Changes(batch) => batch.changes,
            _ => Vec::new(),
        }
    }
}

/// Envelope shared by every response: `{responseType, payload}`
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ResponseEnvelope {
    #[serde(rename = "responseType")]
    pub response_type: ResponseType,

    #[serde(default)]
    pub payload: JsonValue,
}

#[derive(Deserialize)]
struct RawChanges {
    #[serde(default)]
    changes: Vec<JsonValue>,

    #[serde(rename = "endOfStream", default)]
    end_of_stream: bool,
}

impl TryFrom<ResponseEnvelope> for InboundMessage {
    type Error = ProtocolError;

    fn try_from(envelope: ResponseEnvelope) -> Result<Self, Self::Error> {
        let kind = envelope.response_type;
        let invalid = |e: serde_json::Error| ProtocolError::InvalidPayload {
            response_type: kind.as_str(),
            reason: e.to_string(),
        };

        let message = match kind {
            ResponseType::OnConnect => InboundMessage::OnConnect {
                connection_id: envelope
                    .payload
                    .get("connectionId")
                    .and_then(JsonValue::as_i64),
            },
            ResponseType::Add => {
                InboundMessage::Add(serde_json::from_value(envelope.payload).map_err(invalid)?)
            }
            ResponseType::AddBulk => InboundMessage::AddBulk(decodable_records(
                serde_json::from_value(envelope.payload).map_err(invalid)?,
                kind,
            )),
            ResponseType::Changes => {
                let raw: RawChanges = serde_json::from_value(envelope.payload).map_err(invalid)?;
                InboundMessage::Changes(ChangesBatch {
                    changes: decodable_records(raw.changes, kind),
                    end_of_stream: raw.end_of_stream,
                })
            }
            ResponseType::Delete => InboundMessage::Delete,
            ResponseType::Pong => InboundMessage::Pong,
            ResponseType::Ack => InboundMessage::Ack,
            ResponseType::Nack => InboundMessage::Nack,
            ResponseType::Unknown => InboundMessage::Unknown,
        };

        Ok(message)
    }
}

// Entries that fail to decode are skipped individually.
fn decodable_records(entries: Vec<JsonValue>, kind: ResponseType) -> Vec<ChangeRecord> {
    entries
        .into_iter()
        .filter_map(|entry| match serde_json::from_value(entry) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::trace!(response_type = %kind, error = %e, "Skipping undecodable change entry");
                None
            }
        })
        .collect()
}

impl TryFrom<&InboundMessage> for ResponseEnvelope {
    type Error = ProtocolError;

    fn try_from(message: &InboundMessage) -> Result<Self, Self::Error> {
        let to_json = |value: Result<JsonValue, serde_json::Error>| {
            value.map_err(|e| ProtocolError::SerializationError(e.to_string()))
        };

        let payload = match message {
            InboundMessage::OnConnect { connection_id } => json!({ "connectionId": connection_id }),
            InboundMessage::Add(record) => to_json(serde_json::to_value(record))?,
            InboundMessage::AddBulk(records) => to_json(serde_json::to_value(records))?,
            InboundMessage::Changes(batch) => json!({
                "changes": to_json(serde_json::to_value(&batch.changes))?,
                "endOfStream": batch.end_of_stream,
            }),
            _ => JsonValue::Null,
        };

        Ok(ResponseEnvelope {
            response_type: message.response_type(),
            payload,
        })
    }
}
