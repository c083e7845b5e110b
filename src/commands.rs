use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde_json::{json, Value};

use crate::pins::{Designation, LogicalPin, PinCatalog, PinId};
use crate::session::{PinSession, RefreshMonitor, SessionError, SessionManager};

/// Parse a designation name as typed on the command line
pub fn parse_designation(s: &str) -> std::result::Result<Designation, String> {
    Designation::from_str(s)
        .ok_or_else(|| format!("Unknown designation '{}' (expected none, pwm, digital or fastled)", s))
}

/// Print the board layout without contacting a device
pub fn print_layout(catalog: &PinCatalog) {
    for pin in catalog.list_pins() {
        if pin.is_power_pin {
            println!("{:>4}  power", pin.label);
        } else {
            println!("{:>4}  gpio", pin.label);
        }
    }
}

/// Render pins in board order, then any pin the layout does not know
pub fn render_pins(catalog: &PinCatalog, pins: &[LogicalPin]) -> String {
    let mut lines = vec![format!("{:>4}  {:<9} {:<10} {}", "PIN", "ROLE", "STATE", "VALUE")];
    let row = |pin: &LogicalPin| {
        let value = pin.value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string());
        let dirty = if pin.is_dirty() { " *" } else { "" };
        format!(
            "{:>4}  {:<9} {:<10} {}{}",
            pin.id,
            pin.role_label(),
            pin.availability.to_string(),
            value,
            dirty
        )
    };

    for physical in catalog.list_pins() {
        match physical.gpio() {
            None => lines.push(format!("{:>4}  {:<9}", physical.label, "power")),
            Some(id) => match pins.iter().find(|p| p.id == id) {
                Some(pin) => lines.push(row(pin)),
                None => lines.push(format!("{:>4}  {:<9} {:<10} -", id, "None", "unknown")),
            },
        }
    }

    let known = catalog.logical_ids();
    for pin in pins.iter().filter(|p| !known.contains(&p.id)) {
        lines.push(row(pin));
    }
    lines.join("\n")
}

pub async fn show(manager: &SessionManager, host: &str) -> Result<()> {
    let session = open(manager, host).await?;
    let snapshot = session.snapshot().await?;
    println!("{}", render_pins(session.catalog(), &snapshot.pins));
    Ok(())
}

/// Edit one pin and push the result
pub async fn set_pin(
    manager: &SessionManager,
    host: &str,
    pin: PinId,
    designation: Option<Designation>,
    value: Option<i32>,
    dry_run: bool,
) -> Result<()> {
    if designation.is_none() && value.is_none() {
        bail!("Nothing to change: give --designation and/or --value");
    }
    let session = open(manager, host).await?;

    if let Some(designation) = designation {
        session
            .set_designation(pin, designation)
            .await
            .with_context(|| format!("Failed to set designation of pin {}", pin))?;
    }
    if let Some(value) = value {
        session
            .set_value(pin, value)
            .await
            .with_context(|| format!("Failed to set value of pin {}", pin))?;
    }

    finish_edit(&session, dry_run).await
}

/// Apply one designation and value to every available pin and push
pub async fn apply_all(
    manager: &SessionManager,
    host: &str,
    designation: Designation,
    value: i32,
    dry_run: bool,
) -> Result<()> {
    let session = open(manager, host).await?;
    let report = session.apply_to_all(designation, value).await?;

    for id in report.applied() {
        println!("pin {:>2}: {} = {}", id, designation, value);
    }
    for (id, error) in report.skipped() {
        println!("pin {:>2}: skipped ({})", id, error);
    }

    finish_edit(&session, dry_run).await
}

async fn finish_edit(session: &PinSession, dry_run: bool) -> Result<()> {
    let snapshot = session.snapshot().await?;
    println!("{}", render_pins(session.catalog(), &snapshot.pins));

    if dry_run {
        let (designation, values) = session.pending_payloads().await?;
        let preview = json!({ "pinDesignation": designation, "pinValues": values });
        println!("{}", serde_json::to_string_pretty(&preview)?);
        return Ok(());
    }

    match session.push().await {
        Ok(report) => {
            log::debug!("Device replies: {:?}", report);
            println!("Pin configuration updated.");
            Ok(())
        }
        Err(SessionError::PartialUpdate {
            stage,
            unconfirmed,
            skipped,
            source,
        }) => {
            bail!(
                "Update stopped at {} stage ({}); unconfirmed pins {:?}, skipped pins {:?}",
                stage,
                source,
                unconfirmed,
                skipped
            )
        }
        Err(e) => Err(e).context("Failed to push pin configuration"),
    }
}

/// Print the pin table on every refresh until interrupted
pub async fn watch(manager: &SessionManager, host: &str, period: Duration) -> Result<()> {
    let session = open(manager, host).await?;
    let snapshot = session.snapshot().await?;
    println!("{}\n", render_pins(session.catalog(), &snapshot.pins));

    let monitor = RefreshMonitor::new();
    let mut events = monitor.subscribe();
    monitor
        .start(session.clone(), period)
        .await
        .map_err(anyhow::Error::msg)?;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => {
                    println!("[{}]", event.taken_at.format("%H:%M:%S"));
                    println!("{}\n", render_pins(session.catalog(), &event.pins));
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("Display fell behind by {} refreshes", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    }

    monitor.stop_all().await;
    manager.close_all().await;
    Ok(())
}

pub async fn device_log(manager: &SessionManager, host: &str, limit: Option<u32>) -> Result<()> {
    let session = passthrough(manager, host).await?;
    print_json(&session.fetch_log(limit).await.context("Failed to read device log")?)
}

pub async fn device_info(manager: &SessionManager, host: &str) -> Result<()> {
    let session = passthrough(manager, host).await?;
    print_json(&session.fetch_device_info().await.context("Failed to read device info")?)
}

pub async fn server_status(manager: &SessionManager, host: &str) -> Result<()> {
    let session = passthrough(manager, host).await?;
    let status = session.fetch_status().await.context("Device did not answer")?;
    println!("{}", status.trim());
    Ok(())
}

pub async fn list_networks(manager: &SessionManager, host: &str) -> Result<()> {
    let session = passthrough(manager, host).await?;
    print_json(&session.list_networks().await.context("Failed to list networks")?)
}

pub async fn add_network(
    manager: &SessionManager,
    host: &str,
    ssid: &str,
    password: &str,
    is_default: bool,
) -> Result<()> {
    let session = passthrough(manager, host).await?;
    let body = json!({ "ssid": ssid, "password": password, "isDefault": is_default });
    print_json(&session.save_network(&body).await.context("Failed to add network")?)
}

pub async fn delete_network(manager: &SessionManager, host: &str, ssid: &str) -> Result<()> {
    let session = passthrough(manager, host).await?;
    let body = json!({ "ssid": ssid });
    print_json(&session.delete_network(&body).await.context("Failed to delete network")?)
}

pub async fn join_network(
    manager: &SessionManager,
    host: &str,
    ssid: &str,
    password: Option<&str>,
) -> Result<()> {
    let session = passthrough(manager, host).await?;
    let mut body = json!({ "ssid": ssid });
    if let Some(password) = password {
        body["password"] = Value::String(password.to_string());
    }
    print_json(&session.connect_network(&body).await.context("Failed to join network")?)
}

async fn open(manager: &SessionManager, host: &str) -> Result<Arc<PinSession>> {
    manager
        .open(host)
        .await
        .with_context(|| format!("Failed to connect to {}", host))
}

/// Session for endpoints that do not need the pin models
async fn passthrough(manager: &SessionManager, host: &str) -> Result<Arc<PinSession>> {
    if let Some(session) = manager.find_by_host(host).await {
        return Ok(session);
    }
    manager
        .detached(host)
        .with_context(|| format!("Invalid device address {}", host))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
