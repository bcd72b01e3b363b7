//! Inbound frame validation.

use crate::error::HubError;

/// Rejects empty or oversized inbound text frames before parsing.
pub fn validate_inbound(raw: &str, max_bytes: usize) -> Result<(), HubError> {
    if raw.len() > max_bytes {
        return Err(HubError::InvalidFrame(format!(
            "frame exceeds maximum size of {max_bytes} bytes"
        )));
    }

    if raw.trim().is_empty() {
        return Err(HubError::InvalidFrame("empty frame".to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_oversized_and_empty() {
        assert!(validate_inbound(&"x".repeat(17), 16).is_err());
        assert!(validate_inbound("   ", 16).is_err());
        assert!(validate_inbound(r#"{"type":"ping"}"#, 16).is_ok());
    }
}
