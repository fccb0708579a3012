//! JSON text frames exchanged between browsers and the relay.

use crate::{Color, Point};
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// A single pulse, as sent upstream by the tapping client and fanned out
/// unchanged by the relay.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulseEvent {
    pub x_norm: f64,
    pub y_norm: f64,
    pub color: String,
}

impl PulseEvent {
    pub fn new(origin: Point, color: Color) -> Self {
        Self {
            x_norm: origin.x as f64,
            y_norm: origin.y as f64,
            color: color.to_hex(),
        }
    }

    /// Normalized origin, clamped to the unit square.
    pub fn origin(&self) -> Point {
        Point::new(
            self.x_norm.clamp(0., 1.) as f32,
            self.y_norm.clamp(0., 1.) as f32,
        )
    }
}

/// Every frame on the socket, in either direction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireMessage {
    Pulse(PulseEvent),
}

impl WireMessage {
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn encode(&self) -> String {
        // Only plain strings and finite floats; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

impl From<PulseEvent> for WireMessage {
    fn from(event: PulseEvent) -> Self {
        WireMessage::Pulse(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_shape() {
        let msg = WireMessage::Pulse(PulseEvent {
            x_norm: 0.5,
            y_norm: 0.5,
            color: "#ff0000".into(),
        });
        assert_eq!(
            msg.encode(),
            r##"{"type":"pulse","xNorm":0.5,"yNorm":0.5,"color":"#ff0000"}"##
        );
    }

    #[test]
    fn test_decode_valid() {
        let text = r##"{"color":"#00ff00","yNorm":1,"xNorm":0.25,"type":"pulse"}"##;
        let WireMessage::Pulse(event) = WireMessage::decode(text).unwrap();
        assert_eq!(event.x_norm, 0.25);
        assert_eq!(event.y_norm, 1.0);
        assert_eq!(event.color, "#00ff00");
    }

    #[test]
    fn test_extra_fields_dropped() {
        let text = r##"{"type":"pulse","xNorm":0.1,"yNorm":0.2,"color":"#000000","user":"x"}"##;
        let msg = WireMessage::decode(text).unwrap();
        assert!(!msg.encode().contains("user"));
    }

    #[test]
    fn test_decode_rejects_schema_mismatch() {
        let bad = [
            "not json",
            "",
            "[]",
            r##"{"type":"stroke","xNorm":0.5,"yNorm":0.5,"color":"#ff0000"}"##,
            r##"{"xNorm":0.5,"yNorm":0.5,"color":"#ff0000"}"##,
            r##"{"type":"pulse","yNorm":0.5,"color":"#ff0000"}"##,
            r##"{"type":"pulse","xNorm":"0.5","yNorm":0.5,"color":"#ff0000"}"##,
            r##"{"type":"pulse","xNorm":0.5,"yNorm":null,"color":"#ff0000"}"##,
            r##"{"type":"pulse","xNorm":0.5,"yNorm":0.5,"color":16711680}"##,
        ];
        for text in bad {
            assert!(WireMessage::decode(text).is_err(), "{text} should be rejected");
        }
    }

    #[test]
    fn test_origin_clamped() {
        let event = PulseEvent {
            x_norm: -3.0,
            y_norm: 7.5,
            color: "#ffffff".into(),
        };
        assert_eq!(event.origin(), Point::new(0.0, 1.0));
    }
}
