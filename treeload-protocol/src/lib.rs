//! Wire protocol spoken with the document sync service
//!
//! Outbound control messages are MessagePack maps discriminated by a `type`
//! field. Inbound responses carry a `responseType` discriminant and may be
//! gzip-compressed.

pub mod codec;
pub mod compression;
pub mod error;
pub mod message;

pub use codec::Codec;
pub use compression::{
    compress_gzip, decompress_gzip, decompress_gzip_limited, is_gzip, MAX_INFLATED_SIZE,
};
pub use error::ProtocolError;
pub use message::{ChangesBatch, InboundMessage, OutboundMessage, ResponseType};
