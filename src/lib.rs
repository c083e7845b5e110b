pub mod pins;
pub mod gateway;
pub mod session;
pub mod commands;
pub mod config;

pub use config::ClientSettings;
pub use gateway::{DeviceGateway, GatewayError, HttpGateway};
pub use pins::{Designation, PinBoard, PinCatalog, PinError};
pub use session::{PinSession, RefreshMonitor, SessionError, SessionManager};
