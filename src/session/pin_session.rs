use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};
use tokio::time::timeout;
use uuid::Uuid;

use super::{PinSnapshot, PushReport, PushStage, Result, SessionError, SessionInfo, SessionState};
use crate::gateway::{self, DesignationPayload, DeviceGateway, GatewayError, ValuesPayload};
use crate::pins::{BatchReport, Designation, LogicalPin, PinBoard, PinCatalog, PinError, PinId};

#[derive(Debug, Clone)]
struct Status {
    state: SessionState,
    connected_at: Option<DateTime<Utc>>,
    last_refreshed: Option<DateTime<Utc>>,
}

/// Reconciliation engine for one device.
///
/// Every gateway call goes through `io`, so fetches and pushes against the
/// device never overlap. Local edits only take the `board` lock and may happen
/// while a fetch is in flight; the merge that follows keeps them.
pub struct PinSession {
    id: Uuid,
    gateway: Arc<dyn DeviceGateway>,
    catalog: PinCatalog,
    call_timeout: Duration,
    status: RwLock<Status>,
    board: Mutex<Option<PinBoard>>,
    io: Mutex<()>,
}

impl std::fmt::Debug for PinSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinSession")
            .field("id", &self.id)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl PinSession {
    pub fn new(gateway: Arc<dyn DeviceGateway>, catalog: PinCatalog, call_timeout: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            gateway,
            catalog,
            call_timeout,
            status: RwLock::new(Status {
                state: SessionState::Disconnected,
                connected_at: None,
                last_refreshed: None,
            }),
            board: Mutex::new(None),
            io: Mutex::new(()),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn host(&self) -> &str {
        self.gateway.host()
    }

    pub fn catalog(&self) -> &PinCatalog {
        &self.catalog
    }

    pub async fn state(&self) -> SessionState {
        self.status.read().await.state.clone()
    }

    pub async fn info(&self) -> SessionInfo {
        let status = self.status.read().await.clone();
        let pending_edits = self
            .board
            .lock()
            .await
            .as_ref()
            .map(|b| b.unconfirmed_ids().len())
            .unwrap_or(0);

        SessionInfo {
            id: self.id,
            host: self.host().to_string(),
            state: status.state,
            connected_at: status.connected_at,
            last_refreshed: status.last_refreshed,
            pending_edits,
        }
    }

    /// Fetch designation then values and build the pin models.
    ///
    /// All-or-nothing: if either fetch fails the session stays disconnected
    /// and no pin state exists.
    pub async fn connect(&self) -> Result<PinSnapshot> {
        let _io = self.io.lock().await;

        if self.state().await.is_connected() {
            return Err(SessionError::AlreadyConnected);
        }
        self.set_state(SessionState::Connecting).await;
        log::info!("Connecting to device at {}", self.host());

        let (designation, values) = match self.fetch_snapshot().await {
            Ok(fetched) => fetched,
            Err(e) => {
                log::error!("Failed to connect to {}: {}", self.host(), e);
                self.set_state(SessionState::Disconnected).await;
                return Err(SessionError::DeviceUnreachable(e));
            }
        };

        let mut board = PinBoard::new(self.catalog.logical_ids());
        board.load_from_snapshot(&designation);
        board.load_values(&values);
        let snapshot = snapshot_of(&board);
        *self.board.lock().await = Some(board);

        let now = Utc::now();
        {
            let mut status = self.status.write().await;
            status.state = SessionState::Connected;
            status.connected_at = Some(now);
            status.last_refreshed = Some(now);
        }
        log::info!(
            "Connected to {}: {} pins",
            self.host(),
            snapshot.pins.len()
        );
        Ok(snapshot)
    }

    /// Re-fetch the device state, keeping unconfirmed local edits
    pub async fn refresh(&self) -> Result<PinSnapshot> {
        let _io = self.io.lock().await;
        self.refresh_locked().await
    }

    /// Refresh unless another gateway operation is in flight, in which case
    /// nothing happens and `None` is returned.
    pub async fn try_refresh(&self) -> Result<Option<PinSnapshot>> {
        let Ok(_io) = self.io.try_lock() else {
            log::debug!("Refresh of {} skipped, device busy", self.host());
            return Ok(None);
        };
        self.refresh_locked().await.map(Some)
    }

    async fn refresh_locked(&self) -> Result<PinSnapshot> {
        if !self.state().await.is_connected() {
            return Err(SessionError::NotConnected);
        }
        self.set_state(SessionState::Refreshing).await;

        let (designation, values) = match self.fetch_snapshot().await {
            Ok(fetched) => fetched,
            Err(e) => {
                log::error!("Refresh of {} failed: {}", self.host(), e);
                self.set_state(SessionState::Error(e.to_string())).await;
                return Err(SessionError::DeviceUnreachable(e));
            }
        };

        let snapshot = {
            let mut guard = self.board.lock().await;
            let board = guard.as_mut().ok_or(SessionError::NotConnected)?;
            board.merge_from_snapshot(&designation);
            board.merge_values(&values);
            snapshot_of(board)
        };

        {
            let mut status = self.status.write().await;
            status.state = SessionState::Connected;
            status.last_refreshed = Some(snapshot.taken_at);
        }
        log::debug!("Refreshed {}", self.host());
        Ok(snapshot)
    }

    /// Push designations, then values once the device accepted the designations
    pub async fn push(&self) -> Result<PushReport> {
        let _io = self.io.lock().await;

        let (designation, revision) = self
            .with_board(|b| (b.designation_payload(), b.revision()))
            .await?;
        self.set_state(SessionState::Pushing).await;
        log::info!(
            "Pushing designation to {}: {} PWM, {} digital",
            self.host(),
            designation.pwm_pins.len(),
            designation.digital_pins.len()
        );

        let designation_reply = match self.call(self.gateway.push_designation(&designation)).await {
            Ok(reply) => reply,
            Err(e) => return Err(self.push_failed(PushStage::Designation, e).await),
        };
        self.with_board_mut(|b| b.confirm_designations(revision)).await?;

        // Edits made during the designation push are included, but only for
        // pins whose family matches what the device was just sent.
        let (payload, held_back, revision) = self
            .with_board(|b| {
                let (payload, held_back) = b.values_payload_for(&designation);
                (payload, held_back, b.revision())
            })
            .await?;
        if !held_back.is_empty() {
            log::info!(
                "Holding back values of pins {:?} on {} until their designation is pushed",
                held_back,
                self.host()
            );
        }
        let values_reply = match self.call(self.gateway.push_values(&payload)).await {
            Ok(reply) => reply,
            Err(e) => return Err(self.push_failed(PushStage::Values, e).await),
        };
        self.with_board_mut(|b| b.confirm_values(revision, &held_back)).await?;

        self.set_state(SessionState::Connected).await;
        log::info!("Pin configuration pushed to {}", self.host());
        Ok(PushReport {
            designation_reply,
            values_reply,
        })
    }

    async fn push_failed(&self, stage: PushStage, source: GatewayError) -> SessionError {
        log::error!("Push to {} failed at {} stage: {}", self.host(), stage, source);
        let (unconfirmed, skipped) = self
            .with_board(|b| (b.unconfirmed_ids(), b.batch_skipped().to_vec()))
            .await
            .unwrap_or_default();
        self.set_state(SessionState::Error(source.to_string())).await;
        SessionError::PartialUpdate {
            stage,
            unconfirmed,
            skipped,
            source,
        }
    }

    /// Drop the pin models and return to `Disconnected`
    pub async fn disconnect(&self) -> Result<()> {
        let _io = self.io.lock().await;
        let board = self.board.lock().await.take();
        if board.is_none() {
            return Err(SessionError::NotConnected);
        }
        if let Some(board) = board.filter(PinBoard::has_pending_edits) {
            log::warn!(
                "Disconnecting from {} with unpushed edits on pins {:?}",
                self.host(),
                board.unconfirmed_ids()
            );
        }

        let mut status = self.status.write().await;
        status.state = SessionState::Disconnected;
        status.connected_at = None;
        log::info!("Disconnected from {}", self.host());
        Ok(())
    }

    pub async fn set_designation(&self, id: PinId, designation: Designation) -> Result<()> {
        self.with_board_mut(|b| b.set_designation(id, designation)).await?
            .map_err(SessionError::from)
    }

    pub async fn set_value(&self, id: PinId, value: i32) -> Result<()> {
        self.with_board_mut(|b| b.set_value(id, value)).await?
            .map_err(SessionError::from)
    }

    pub async fn apply_to_all(&self, designation: Designation, value: i32) -> Result<BatchReport> {
        let report = self
            .with_board_mut(|b| b.apply_to_all(designation, value))
            .await?;
        log::info!(
            "Applied {} to {} pins on {}, {} skipped",
            designation,
            report.applied().len(),
            self.host(),
            report.skipped().len()
        );
        Ok(report)
    }

    pub async fn snapshot(&self) -> Result<PinSnapshot> {
        self.with_board(snapshot_of).await
    }

    /// Bodies `push` would send right now
    pub async fn pending_payloads(&self) -> Result<(DesignationPayload, ValuesPayload)> {
        self.with_board(|b| (b.designation_payload(), b.values_payload()))
            .await
    }

    pub async fn pin(&self, id: PinId) -> Result<LogicalPin> {
        self.with_board(|b| b.pin(id).cloned())
            .await?
            .ok_or(SessionError::Pin(PinError::InvalidPin(id)))
    }

    // Passthrough endpoints, not interpreted here

    pub async fn connect_network(&self, request: &Value) -> Result<Value> {
        let _io = self.io.lock().await;
        self.call(self.gateway.connect_network(request))
            .await
            .map_err(SessionError::DeviceUnreachable)
    }

    pub async fn list_networks(&self) -> Result<Value> {
        let _io = self.io.lock().await;
        self.call(self.gateway.list_networks())
            .await
            .map_err(SessionError::DeviceUnreachable)
    }

    pub async fn save_network(&self, network: &Value) -> Result<Value> {
        let _io = self.io.lock().await;
        self.call(self.gateway.save_network(network))
            .await
            .map_err(SessionError::DeviceUnreachable)
    }

    pub async fn delete_network(&self, network: &Value) -> Result<Value> {
        let _io = self.io.lock().await;
        self.call(self.gateway.delete_network(network))
            .await
            .map_err(SessionError::DeviceUnreachable)
    }

    pub async fn fetch_log(&self, limit: Option<u32>) -> Result<Value> {
        let _io = self.io.lock().await;
        self.call(self.gateway.fetch_log(limit))
            .await
            .map_err(SessionError::DeviceUnreachable)
    }

    pub async fn fetch_device_info(&self) -> Result<Value> {
        let _io = self.io.lock().await;
        self.call(self.gateway.fetch_device_info())
            .await
            .map_err(SessionError::DeviceUnreachable)
    }

    pub async fn fetch_status(&self) -> Result<String> {
        let _io = self.io.lock().await;
        self.call(self.gateway.fetch_status())
            .await
            .map_err(SessionError::DeviceUnreachable)
    }

    async fn fetch_snapshot(
        &self,
    ) -> gateway::Result<(gateway::DesignationReport, gateway::ValuesReport)> {
        let designation = self.call(self.gateway.fetch_designation()).await?;
        let values = self.call(self.gateway.fetch_values()).await?;
        Ok((designation, values))
    }

    /// Run a gateway call under the session's timeout
    async fn call<T, F>(&self, fut: F) -> gateway::Result<T>
    where
        F: Future<Output = gateway::Result<T>>,
    {
        match timeout(self.call_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(GatewayError::Timeout),
        }
    }

    async fn with_board<R>(&self, f: impl FnOnce(&PinBoard) -> R) -> Result<R> {
        let guard = self.board.lock().await;
        guard.as_ref().map(f).ok_or(SessionError::NotConnected)
    }

    async fn with_board_mut<R>(&self, f: impl FnOnce(&mut PinBoard) -> R) -> Result<R> {
        let mut guard = self.board.lock().await;
        guard.as_mut().map(f).ok_or(SessionError::NotConnected)
    }

    async fn set_state(&self, state: SessionState) {
        self.status.write().await.state = state;
    }
}

fn snapshot_of(board: &PinBoard) -> PinSnapshot {
    PinSnapshot {
        pins: board.pins().cloned().collect(),
        taken_at: Utc::now(),
    }
}
