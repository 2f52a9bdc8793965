//! # WhatsApp Pairing
//!
//! Decodes events from the pairing channel and folds them into the state the
//! admin page renders (current QR code and connection status).

use crate::error::{ShopError, ShopResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairingStatus {
    Loading,
    Qr,
    Connected,
    Timeout,
    Disconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairingEvent {
    /// A new QR code to scan
    Qr(String),
    Status(PairingStatus),
    /// Events this client does not know about
    Unknown(String),
}

#[derive(Deserialize)]
struct Frame {
    event: String,
    #[serde(default)]
    data: serde_json::Value,
}

impl PairingEvent {
    /// Decode a JSON frame `{"event": "...", "data": ...}`
    pub fn from_frame(frame: &str) -> ShopResult<Self> {
        let frame: Frame = serde_json::from_str(frame)?;
        match frame.event.as_str() {
            "whatsapp-qr" => frame
                .data
                .as_str()
                .map(|qr| PairingEvent::Qr(qr.to_string()))
                .ok_or_else(|| ShopError::Serialization("whatsapp-qr payload must be a string".to_string())),
            "whatsapp-status" => {
                let status: PairingStatus = serde_json::from_value(frame.data)?;
                Ok(PairingEvent::Status(status))
            }
            other => Ok(PairingEvent::Unknown(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairingState {
    pub status: PairingStatus,
    /// QR to show; only kept while the status is `qr`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr: Option<String>,
}

impl Default for PairingState {
    fn default() -> Self {
        Self {
            status: PairingStatus::Loading,
            qr: None,
        }
    }
}

impl PairingState {
    pub fn apply(&mut self, event: PairingEvent) {
        match event {
            PairingEvent::Qr(qr) => {
                self.qr = Some(qr);
                self.status = PairingStatus::Qr;
            }
            PairingEvent::Status(status) => {
                self.status = status;
                if status != PairingStatus::Qr {
                    self.qr = None;
                }
            }
            PairingEvent::Unknown(name) => debug!("ignoring pairing event {}", name),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.status == PairingStatus::Connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_frames() {
        assert_eq!(
            PairingEvent::from_frame(r#"{"event":"whatsapp-qr","data":"2@abc"}"#).unwrap(),
            PairingEvent::Qr("2@abc".into())
        );
        assert_eq!(
            PairingEvent::from_frame(r#"{"event":"whatsapp-status","data":"timeout"}"#).unwrap(),
            PairingEvent::Status(PairingStatus::Timeout)
        );
        assert!(matches!(
            PairingEvent::from_frame(r#"{"event":"ping"}"#).unwrap(),
            PairingEvent::Unknown(_)
        ));
        assert!(PairingEvent::from_frame(r#"{"event":"whatsapp-status","data":"bogus"}"#).is_err());
        assert!(PairingEvent::from_frame(r#"{"event":"whatsapp-qr","data":5}"#).is_err());
    }

    #[test]
    fn test_state_drops_qr_once_connected() {
        let mut state = PairingState::default();
        state.apply(PairingEvent::Qr("2@abc".into()));
        assert_eq!(state.status, PairingStatus::Qr);
        assert_eq!(state.qr.as_deref(), Some("2@abc"));

        state.apply(PairingEvent::Status(PairingStatus::Connected));
        assert!(state.is_connected());
        assert!(state.qr.is_none());
    }
}
