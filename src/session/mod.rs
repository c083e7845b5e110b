pub mod manager;
pub mod models;
pub mod monitor;
pub mod pin_session;

pub use manager::SessionManager;
pub use models::*;
pub use monitor::{RefreshEvent, RefreshMonitor};
pub use pin_session::PinSession;

use crate::gateway::GatewayError;
use crate::pins::{PinError, PinId};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Device unreachable: {0}")]
    DeviceUnreachable(#[source] GatewayError),

    #[error(transparent)]
    Pin(#[from] PinError),

    #[error("Update stopped at {stage} stage: {source}")]
    PartialUpdate {
        stage: PushStage,
        /// Pins whose edits the device has not confirmed
        unconfirmed: Vec<PinId>,
        /// Pins the latest batch edit skipped
        skipped: Vec<PinId>,
        #[source]
        source: GatewayError,
    },

    #[error("Session not connected")]
    NotConnected,

    #[error("Session already connected")]
    AlreadyConnected,

    #[error("Session not found")]
    SessionNotFound,
}

pub type Result<T> = std::result::Result<T, SessionError>;
