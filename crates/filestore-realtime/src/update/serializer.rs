//! JSON encoding for the wire.

use super::types::{InboundFrame, Update};
use crate::error::HubError;

/// Serialize an update to a JSON text frame.
pub fn encode(update: &Update) -> Result<String, HubError> {
    Ok(serde_json::to_string(update)?)
}

/// Parse an inbound text frame.
pub fn decode_inbound(text: &str) -> Result<InboundFrame, HubError> {
    Ok(serde_json::from_str(text)?)
}
