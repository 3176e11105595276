//! Binary frame layout
//!
//! Every outbound frame is one WebSocket binary message:
//!
//! ```text
//! +-------------+----------------+------------------+
//! | len (u16be) | JSON header    | payload bytes... |
//! +-------------+----------------+------------------+
//! ```
//!
//! Control frames (`server-hello`, `server-init`) carry an empty payload;
//! media frames carry one chunk of a segment.

use bytes::Bytes;
use serde::Serialize;

use super::error::ProtocolError;

/// Size of the header length prefix
pub const HEADER_LEN_BYTES: usize = 2;

/// Encode the length prefix and JSON header of a frame
pub fn encode_prelude<T: Serialize>(header: &T) -> Result<Vec<u8>, ProtocolError> {
    let json = serde_json::to_vec(header).map_err(ProtocolError::Malformed)?;
    if json.len() > u16::MAX as usize {
        return Err(ProtocolError::HeaderTooLarge(json.len()));
    }
    let mut out = Vec::with_capacity(HEADER_LEN_BYTES + json.len());
    out.extend_from_slice(&(json.len() as u16).to_be_bytes());
    out.extend_from_slice(&json);
    Ok(out)
}

/// Encode a complete frame
pub fn encode_frame<T: Serialize>(header: &T, payload: &[u8]) -> Result<Bytes, ProtocolError> {
    let mut out = encode_prelude(header)?;
    out.extend_from_slice(payload);
    Ok(Bytes::from(out))
}

/// Split a frame back into its header and payload
pub fn decode_frame(frame: &[u8]) -> Result<(serde_json::Value, &[u8]), ProtocolError> {
    if frame.len() < HEADER_LEN_BYTES {
        return Err(ProtocolError::Truncated);
    }
    let len = u16::from_be_bytes([frame[0], frame[1]]) as usize;
    let rest = &frame[HEADER_LEN_BYTES..];
    if rest.len() < len {
        return Err(ProtocolError::Truncated);
    }
    let header = serde_json::from_slice(&rest[..len]).map_err(ProtocolError::Malformed)?;
    Ok((header, &rest[len..]))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_frame_round_trip() {
        let header = json!({"type": "video", "ts": 180_000});
        let frame = encode_frame(&header, &[1, 2, 3]).unwrap();

        let (decoded, payload) = decode_frame(&frame).unwrap();
        assert_eq!(decoded["type"], "video");
        assert_eq!(decoded["ts"], 180_000);
        assert_eq!(payload, &[1, 2, 3]);
    }

    #[test]
    fn test_empty_payload() {
        let frame = encode_frame(&json!({"type": "server-hello"}), &[]).unwrap();
        let (_, payload) = decode_frame(&frame).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn test_truncated_frames_rejected() {
        assert!(matches!(decode_frame(&[0]), Err(ProtocolError::Truncated)));

        let mut frame = encode_frame(&json!({"type": "x"}), &[]).unwrap().to_vec();
        frame[1] += 1; // declared header longer than the frame
        assert!(matches!(
            decode_frame(&frame),
            Err(ProtocolError::Truncated)
        ));
    }
}
