// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scripted in-memory controllers for tests.
//
// A `FakeDevice` answers every `DeviceApi` call from local state, can be told
// to fail individual calls, and records what was asked of it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use printfleet_core::error::{FleetError, Result};
use printfleet_core::types::{LedState, PrintStats, Printer, RemoteFile};

use crate::client::{DeviceApi, ListPurpose, led_script};
use crate::connector::DeviceConnector;

/// One controller call, for failure injection and call logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Call {
    Info,
    PrintStats,
    Temperatures,
    ListFiles,
    Upload,
    StartPrint,
    PausePrint,
    ResumePrint,
    CancelPrint,
    LedRead,
    LedWrite,
}

impl Call {
    pub const STATUS: [Call; 4] = [
        Call::Info,
        Call::PrintStats,
        Call::Temperatures,
        Call::ListFiles,
    ];
}

#[derive(Debug)]
struct FakeState {
    print_state: String,
    files: Vec<RemoteFile>,
    led: LedState,
    failing: HashSet<Call>,
    unreachable: bool,
    delay: Option<Duration>,
    log: Vec<String>,
}

/// A scripted controller.
#[derive(Debug)]
pub struct FakeDevice {
    printer_id: String,
    state: Mutex<FakeState>,
}

impl FakeDevice {
    /// An idle controller with no files.
    pub fn new(printer_id: impl Into<String>) -> Self {
        Self {
            printer_id: printer_id.into(),
            state: Mutex::new(FakeState {
                print_state: "standby".into(),
                files: Vec::new(),
                led: LedState::default(),
                failing: HashSet::new(),
                unreachable: false,
                delay: None,
                log: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn set_print_state(&self, state: &str) -> &Self {
        self.state().print_state = state.into();
        self
    }

    pub fn set_files(&self, names: &[&str]) -> &Self {
        self.state().files = names.iter().map(|n| RemoteFile::new(*n)).collect();
        self
    }

    pub fn set_led(&self, value: f64) -> &Self {
        self.state().led = LedState {
            red: value,
            green: value,
            blue: value,
        };
        self
    }

    /// Make `call` answer with a non-success status.
    pub fn fail(&self, call: Call) -> &Self {
        self.state().failing.insert(call);
        self
    }

    /// Make every call fail as if the network were down.
    pub fn go_offline(&self) -> &Self {
        self.state().unreachable = true;
        self
    }

    /// Delay every call, to exercise concurrency and timeouts.
    pub fn set_delay(&self, delay: Duration) -> &Self {
        self.state().delay = Some(delay);
        self
    }

    /// Calls made so far, e.g. `"start_print cube.gcode"`.
    pub fn log(&self) -> Vec<String> {
        self.state().log.clone()
    }

    pub fn led(&self) -> LedState {
        self.state().led
    }

    async fn enter(&self, call: Call, entry: String) -> Result<()> {
        let delay = {
            let mut state = self.state();
            state.log.push(entry);
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if state.unreachable {
            return Err(FleetError::DeviceUnreachable {
                printer_id: self.printer_id.clone(),
                reason: "connection refused".into(),
            });
        }
        if state.failing.contains(&call) {
            return Err(FleetError::DeviceError {
                printer_id: self.printer_id.clone(),
                reason: format!("{call:?} returned status 500"),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceApi for FakeDevice {
    fn printer_id(&self) -> &str {
        &self.printer_id
    }

    async fn get_info(&self) -> Result<Value> {
        self.enter(Call::Info, "get_info".into()).await?;
        Ok(json!({"state": "ready", "hostname": self.printer_id}))
    }

    async fn get_print_stats(&self) -> Result<PrintStats> {
        self.enter(Call::PrintStats, "get_print_stats".into()).await?;
        Ok(PrintStats {
            state: self.state().print_state.clone(),
            ..PrintStats::default()
        })
    }

    async fn get_temperatures(&self) -> Result<Value> {
        self.enter(Call::Temperatures, "get_temperatures".into())
            .await?;
        Ok(json!({
            "heater_bed": {"temperature": 24.0, "target": 0.0},
            "extruder": {"temperature": 25.0, "target": 0.0}
        }))
    }

    async fn list_files(&self, purpose: ListPurpose) -> Result<Vec<RemoteFile>> {
        self.enter(Call::ListFiles, format!("list_files {purpose:?}"))
            .await?;
        Ok(self.state().files.clone())
    }

    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        self.enter(Call::Upload, format!("upload_file {name} {}", bytes.len()))
            .await?;
        self.state().files.push(RemoteFile::new(name));
        Ok(())
    }

    async fn start_print(&self, filename: &str) -> Result<()> {
        self.enter(Call::StartPrint, format!("start_print {filename}"))
            .await?;
        self.state().print_state = "printing".into();
        Ok(())
    }

    async fn pause_print(&self) -> Result<()> {
        self.enter(Call::PausePrint, "pause_print".into()).await?;
        self.state().print_state = "paused".into();
        Ok(())
    }

    async fn resume_print(&self) -> Result<()> {
        self.enter(Call::ResumePrint, "resume_print".into()).await?;
        self.state().print_state = "printing".into();
        Ok(())
    }

    async fn cancel_print(&self) -> Result<()> {
        self.enter(Call::CancelPrint, "cancel_print".into()).await?;
        self.state().print_state = "cancelled".into();
        Ok(())
    }

    async fn get_led_state(&self) -> Result<LedState> {
        self.enter(Call::LedRead, "get_led_state".into()).await?;
        Ok(self.state().led)
    }

    async fn set_led(&self, red: u8, green: u8, blue: u8) -> Result<()> {
        self.enter(Call::LedWrite, led_script(red, green, blue))
            .await?;
        self.state().led = LedState {
            red: f64::from(red),
            green: f64::from(green),
            blue: f64::from(blue),
        };
        Ok(())
    }
}

/// Connector handing out [`FakeDevice`]s keyed by printer id.
///
/// Devices are created on first use, idle and empty; tests grab them with
/// [`FakeConnector::device`] to script behaviour before or after the fact.
#[derive(Default)]
pub struct FakeConnector {
    devices: Mutex<HashMap<String, Arc<FakeDevice>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn device(&self, printer_id: &str) -> Arc<FakeDevice> {
        let mut devices = self.devices.lock().unwrap_or_else(|p| p.into_inner());
        Arc::clone(
            devices
                .entry(printer_id.to_string())
                .or_insert_with(|| Arc::new(FakeDevice::new(printer_id))),
        )
    }
}

impl DeviceConnector for FakeConnector {
    fn connect(&self, printer: &Printer) -> Arc<dyn DeviceApi> {
        self.device(&printer.id)
    }
}
