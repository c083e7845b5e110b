use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{PinSession, Result, SessionError, SessionInfo};
use crate::config::ClientSettings;
use crate::gateway::{device_key, DeviceGateway, HttpGateway};
use crate::pins::PinCatalog;

/// Owns every open device session.
/// Sessions share no mutable state; one session per device host.
pub struct SessionManager {
    sessions: Arc<RwLock<HashMap<Uuid, Arc<PinSession>>>>,
    catalog: PinCatalog,
    call_timeout: Duration,
}

impl SessionManager {
    pub fn new(catalog: PinCatalog, call_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            catalog,
            call_timeout,
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self::new(settings.catalog(), settings.request_timeout())
    }

    /// Open an HTTP session to `host` and connect it
    pub async fn open(&self, host: &str) -> Result<Arc<PinSession>> {
        let gateway = HttpGateway::new(host, self.call_timeout)
            .map_err(SessionError::DeviceUnreachable)?;
        self.open_with_gateway(Arc::new(gateway)).await
    }

    /// Connect a session over an arbitrary gateway; it is only registered if
    /// the connect succeeds.
    pub async fn open_with_gateway(&self, gateway: Arc<dyn DeviceGateway>) -> Result<Arc<PinSession>> {
        let key = device_key(gateway.host());
        {
            let sessions = self.sessions.read().await;
            if sessions.values().any(|s| device_key(s.host()) == key) {
                log::warn!("Session for {} already open", gateway.host());
                return Err(SessionError::AlreadyConnected);
            }
        }

        let session = Arc::new(PinSession::new(
            gateway,
            self.catalog.clone(),
            self.call_timeout,
        ));
        session.connect().await?;

        let mut sessions = self.sessions.write().await;
        if sessions.values().any(|s| device_key(s.host()) == key) {
            // Lost a race against another open for the same host.
            let _ = session.disconnect().await;
            return Err(SessionError::AlreadyConnected);
        }
        sessions.insert(session.id(), session.clone());
        log::info!("Opened session {} for {}", session.id(), session.host());
        Ok(session)
    }

    /// Unconnected, unregistered session for the passthrough endpoints
    pub fn detached(&self, host: &str) -> crate::gateway::Result<Arc<PinSession>> {
        let gateway = HttpGateway::new(host, self.call_timeout)?;
        Ok(Arc::new(PinSession::new(
            Arc::new(gateway),
            self.catalog.clone(),
            self.call_timeout,
        )))
    }

    pub async fn get(&self, id: &Uuid) -> Result<Arc<PinSession>> {
        let sessions = self.sessions.read().await;
        sessions.get(id).cloned().ok_or(SessionError::SessionNotFound)
    }

    pub async fn find_by_host(&self, host: &str) -> Option<Arc<PinSession>> {
        let key = device_key(host);
        let sessions = self.sessions.read().await;
        sessions.values().find(|s| device_key(s.host()) == key).cloned()
    }

    pub async fn sessions(&self) -> Vec<SessionInfo> {
        let sessions: Vec<Arc<PinSession>> = self.sessions.read().await.values().cloned().collect();
        let mut infos = Vec::with_capacity(sessions.len());
        for session in sessions {
            infos.push(session.info().await);
        }
        infos
    }

    /// Disconnect a session and forget it
    pub async fn close(&self, id: &Uuid) -> Result<()> {
        let session = {
            let mut sessions = self.sessions.write().await;
            sessions.remove(id).ok_or(SessionError::SessionNotFound)?
        };
        match session.disconnect().await {
            Ok(()) | Err(SessionError::NotConnected) => Ok(()),
            Err(e) => Err(e),
        }
    }

    pub async fn close_all(&self) {
        let ids: Vec<Uuid> = self.sessions.read().await.keys().copied().collect();
        for id in ids {
            if let Err(e) = self.close(&id).await {
                log::warn!("Failed to close session {}: {}", id, e);
            }
        }
    }
}
