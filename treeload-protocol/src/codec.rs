//! MessagePack framing for both directions

use crate::compression::{compress_gzip, decompress_gzip, is_gzip};
use crate::error::ProtocolError;
use crate::message::{InboundMessage, OutboundMessage, ResponseEnvelope};

/// Encodes outbound messages and decodes inbound frames
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Codec {
    accept_compressed: bool,
}

impl Codec {
    /// `accept_compressed` enables gunzipping frames that start with the gzip magic bytes
    pub fn new(accept_compressed: bool) -> Self {
        Self { accept_compressed }
    }

    pub fn accepts_compressed(&self) -> bool {
        self.accept_compressed
    }

    /// Encode a control message as a MessagePack map with named fields
    pub fn encode(&self, message: &OutboundMessage) -> Result<Vec<u8>, ProtocolError> {
        Ok(rmp_serde::to_vec_named(message)?)
    }

    /// Decode a binary frame received from the service
    pub fn decode(&self, frame: &[u8]) -> Result<InboundMessage, ProtocolError> {
        if self.accept_compressed && is_gzip(frame) {
            let inflated = decompress_gzip(frame)?;
            return Self::decode_msgpack(&inflated);
        }
        Self::decode_msgpack(frame)
    }

    /// Decode a text frame carrying the JSON form of a response
    pub fn decode_text(&self, frame: &str) -> Result<InboundMessage, ProtocolError> {
        let envelope: ResponseEnvelope = serde_json::from_str(frame)
            .map_err(|e| ProtocolError::DeserializationError(e.to_string()))?;
        InboundMessage::try_from(envelope)
    }

    /// Decode a frame a worker sent; the service side of the exchange
    pub fn decode_outbound(&self, frame: &[u8]) -> Result<OutboundMessage, ProtocolError> {
        Ok(rmp_serde::from_slice(frame)?)
    }

    /// Encode a response the way the service does, optionally gzipped
    pub fn encode_response(
        &self,
        message: &InboundMessage,
        compress: bool,
    ) -> Result<Vec<u8>, ProtocolError> {
        let envelope = ResponseEnvelope::try_from(message)?;
        let bytes = rmp_serde::to_vec_named(&envelope)?;
        if compress {
            compress_gzip(&bytes)
        } else {
            Ok(bytes)
        }
    }

    fn decode_msgpack(bytes: &[u8]) -> Result<InboundMessage, ProtocolError> {
        let envelope: ResponseEnvelope = rmp_serde::from_slice(bytes)?;
        InboundMessage::try_from(envelope)
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(true)
    }
}
