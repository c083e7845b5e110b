#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use pinlink_lib::gateway::protocol::FastLedEntry;
use pinlink_lib::gateway::{
    DesignationPayload, DesignationReport, DeviceGateway, GatewayError, Result, ValuesPayload,
    ValuesReport,
};
use pinlink_lib::pins::Rgb;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Designation report of a small board: PWM 2, 3; Digital 4; a strip on 5;
/// 8 and 9 reserved.
pub fn board_designation() -> DesignationReport {
    DesignationReport {
        pwm_pins: vec![2, 3],
        digital_pins: vec![4],
        fast_led_pins: vec![FastLedEntry::Strip {
            pin: 5,
            strip_type: Some("WS2812".to_string()),
            num_leds: Some(30),
        }],
        reserved_pins: vec![8, 9],
        available_pins: vec![0, 1, 2, 3, 4, 5, 6, 7, 10, 20, 21],
    }
}

pub fn board_values() -> ValuesReport {
    let mut values = ValuesReport::default();
    values.pwm.insert(2, 50);
    values.pwm.insert(3, 0);
    values.digital.insert(4, 1);
    values.fast_led.insert(5, Rgb { r: 255, g: 100, b: 50 });
    values
}

/// Scripted in-memory device.
///
/// Pushes update the scripted state the way firmware would, so a later fetch
/// sees them. Failures and latency are injected per operation name.
pub struct MockGateway {
    host: String,
    designation: Mutex<DesignationReport>,
    values: Mutex<ValuesReport>,
    failing: Mutex<HashSet<&'static str>>,
    delays: Mutex<Vec<(&'static str, Duration)>>,
    calls: Mutex<Vec<&'static str>>,
    pushed_designations: Mutex<Vec<DesignationPayload>>,
    pushed_values: Mutex<Vec<ValuesPayload>>,
}

impl MockGateway {
    pub fn new(host: &str) -> Self {
        Self::with_reports(host, board_designation(), board_values())
    }

    pub fn with_reports(host: &str, designation: DesignationReport, values: ValuesReport) -> Self {
        Self {
            host: host.to_string(),
            designation: Mutex::new(designation),
            values: Mutex::new(values),
            failing: Mutex::new(HashSet::new()),
            delays: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            pushed_designations: Mutex::new(Vec::new()),
            pushed_values: Mutex::new(Vec::new()),
        }
    }

    /// Make `operation` fail with HTTP 500 until `recover` is called
    pub fn fail(&self, operation: &'static str) {
        self.failing.lock().unwrap().insert(operation);
    }

    pub fn recover(&self, operation: &'static str) {
        self.failing.lock().unwrap().remove(operation);
    }

    pub fn delay(&self, operation: &'static str, delay: Duration) {
        self.delays.lock().unwrap().push((operation, delay));
    }

    pub fn set_designation_report(&self, report: DesignationReport) {
        *self.designation.lock().unwrap() = report;
    }

    pub fn set_values_report(&self, report: ValuesReport) {
        *self.values.lock().unwrap() = report;
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, operation: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == operation).count()
    }

    pub fn pushed_designations(&self) -> Vec<DesignationPayload> {
        self.pushed_designations.lock().unwrap().clone()
    }

    pub fn pushed_values(&self) -> Vec<ValuesPayload> {
        self.pushed_values.lock().unwrap().clone()
    }

    async fn enter(&self, operation: &'static str) -> Result<()> {
        self.calls.lock().unwrap().push(operation);
        let delay = self
            .delays
            .lock()
            .unwrap()
            .iter()
            .find(|(op, _)| *op == operation)
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.lock().unwrap().contains(operation) {
            return Err(GatewayError::Status(500));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceGateway for MockGateway {
    fn host(&self) -> &str {
        &self.host
    }

    async fn fetch_designation(&self) -> Result<DesignationReport> {
        self.enter("fetch_designation").await?;
        Ok(self.designation.lock().unwrap().clone())
    }

    async fn push_designation(&self, payload: &DesignationPayload) -> Result<Value> {
        self.enter("push_designation").await?;
        self.pushed_designations.lock().unwrap().push(payload.clone());
        let mut designation = self.designation.lock().unwrap();
        designation.pwm_pins = payload.pwm_pins.clone();
        designation.digital_pins = payload.digital_pins.clone();
        Ok(json!({"message": "Pin designations updated successfully"}))
    }

    async fn fetch_values(&self) -> Result<ValuesReport> {
        self.enter("fetch_values").await?;
        Ok(self.values.lock().unwrap().clone())
    }

    async fn push_values(&self, payload: &ValuesPayload) -> Result<Value> {
        self.enter("push_values").await?;
        self.pushed_values.lock().unwrap().push(payload.clone());
        let mut values = self.values.lock().unwrap();
        values.pwm = payload.pwm.iter().map(|(id, v)| (*id, i64::from(*v))).collect();
        values.digital = payload.digital.iter().map(|(id, v)| (*id, i64::from(*v))).collect();
        Ok(json!({"message": "Pin values updated successfully"}))
    }

    async fn connect_network(&self, request: &Value) -> Result<Value> {
        self.enter("connect_network").await?;
        Ok(json!({"message": format!("Connecting to {}", request["ssid"])}))
    }

    async fn list_networks(&self) -> Result<Value> {
        self.enter("list_networks").await?;
        Ok(json!({"networks": [{"ssid": "workshop", "isDefault": true}]}))
    }

    async fn save_network(&self, _network: &Value) -> Result<Value> {
        self.enter("save_network").await?;
        Ok(json!({"message": "Network saved"}))
    }

    async fn delete_network(&self, _network: &Value) -> Result<Value> {
        self.enter("delete_network").await?;
        Ok(json!({"message": "Network deleted"}))
    }

    async fn fetch_log(&self, limit: Option<u32>) -> Result<Value> {
        self.enter("fetch_log").await?;
        let lines: Vec<String> = (0..limit.unwrap_or(3)).map(|i| format!("line {}", i)).collect();
        Ok(json!({ "logs": lines }))
    }

    async fn fetch_device_info(&self) -> Result<Value> {
        self.enter("fetch_device_info").await?;
        Ok(json!({"chip": "ESP32-C3", "ip": self.host}))
    }

    async fn fetch_status(&self) -> Result<String> {
        self.enter("fetch_status").await?;
        Ok("Server is running".to_string())
    }
}
