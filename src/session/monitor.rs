use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::time::{interval, timeout, Duration, MissedTickBehavior};
use uuid::Uuid;

use super::{PinSession, SessionError};
use crate::pins::LogicalPin;

/// Published after every successful periodic refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshEvent {
    pub session_id: Uuid,
    pub host: String,
    pub pins: Vec<LogicalPin>,
    pub taken_at: DateTime<Utc>,
}

/// Refresh loop of one session
struct MonitoringSession {
    task_handle: tokio::task::JoinHandle<()>,
    stop_tx: mpsc::Sender<()>,
}

/// Periodic refresh driver.
///
/// A tick that fires while the session is busy with another fetch or push is
/// dropped, never queued.
pub struct RefreshMonitor {
    monitored: Arc<Mutex<HashMap<Uuid, MonitoringSession>>>,
    events: broadcast::Sender<RefreshEvent>,
}

impl RefreshMonitor {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            monitored: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    pub async fn is_monitoring(&self, session_id: &Uuid) -> bool {
        self.monitored.lock().await.contains_key(session_id)
    }

    pub async fn start(&self, session: Arc<PinSession>, period: Duration) -> Result<(), String> {
        let session_id = session.id();
        let mut monitored = self.monitored.lock().await;
        if monitored.contains_key(&session_id) {
            log::warn!("Session {} is already being refreshed", session_id);
            return Err("Session already being monitored".to_string());
        }

        let (stop_tx, stop_rx) = mpsc::channel(1);
        let events = self.events.clone();
        let task_handle = tokio::spawn(async move {
            Self::refresh_loop(session, period, events, stop_rx).await;
        });

        monitored.insert(session_id, MonitoringSession { task_handle, stop_tx });
        log::info!("Started refreshing session {} every {:?}", session_id, period);
        Ok(())
    }

    pub async fn stop(&self, session_id: &Uuid) -> Result<(), String> {
        let session = self.monitored.lock().await.remove(session_id);

        if let Some(session) = session {
            let _ = session.stop_tx.send(()).await;
            let _ = timeout(Duration::from_secs(2), session.task_handle).await;
            log::info!("Stopped refreshing session {}", session_id);
            Ok(())
        } else {
            Err("Session not being monitored".to_string())
        }
    }

    pub async fn stop_all(&self) {
        let ids: Vec<Uuid> = self.monitored.lock().await.keys().copied().collect();
        for id in ids {
            let _ = self.stop(&id).await;
        }
    }

    async fn refresh_loop(
        session: Arc<PinSession>,
        period: Duration,
        events: broadcast::Sender<RefreshEvent>,
        mut stop_rx: mpsc::Receiver<()>,
    ) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately; connect already fetched.
        ticker.tick().await;

        let mut skipped = 0u64;
        loop {
            tokio::select! {
                _ = stop_rx.recv() => {
                    log::debug!("Received stop signal for {}", session.host());
                    break;
                }
                _ = ticker.tick() => {
                    match session.try_refresh().await {
                        Ok(Some(snapshot)) => {
                            let _ = events.send(RefreshEvent {
                                session_id: session.id(),
                                host: session.host().to_string(),
                                pins: snapshot.pins,
                                taken_at: snapshot.taken_at,
                            });
                        }
                        Ok(None) => {
                            skipped += 1;
                            log::debug!("Dropped refresh tick for {} ({} so far)", session.host(), skipped);
                        }
                        Err(SessionError::NotConnected) => {
                            log::info!("Session {} disconnected, stopping refresh", session.host());
                            break;
                        }
                        Err(e) => {
                            // Transient; the next tick retries.
                            log::warn!("Periodic refresh of {} failed: {}", session.host(), e);
                        }
                    }
                }
            }
        }
    }
}

impl Default for RefreshMonitor {
    fn default() -> Self {
        Self::new()
    }
}
