use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

use crate::pins::LogicalPin;

/// Lifecycle of a device session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    Refreshing,
    Pushing,
    /// Last refresh or push failed; the models are intact and the caller may retry
    Error(String),
}

impl SessionState {
    /// Whether the pin models are loaded and usable
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            SessionState::Connected
                | SessionState::Refreshing
                | SessionState::Pushing
                | SessionState::Error(_)
        )
    }
}

/// Which half of a push sequence failed
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PushStage {
    Designation,
    Values,
}

impl fmt::Display for PushStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PushStage::Designation => f.write_str("designation"),
            PushStage::Values => f.write_str("values"),
        }
    }
}

/// Summary of a session for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    pub id: Uuid,
    pub host: String,
    pub state: SessionState,
    pub connected_at: Option<DateTime<Utc>>,
    pub last_refreshed: Option<DateTime<Utc>>,
    pub pending_edits: usize,
}

/// Merged model state handed to a consumer after connect or refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinSnapshot {
    pub pins: Vec<LogicalPin>,
    pub taken_at: DateTime<Utc>,
}

/// Device replies of a successful push
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushReport {
    pub designation_reply: Value,
    pub values_reply: Value,
}
