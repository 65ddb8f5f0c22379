// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Async client for one Moonraker printer controller.
//
// Wraps the REST calls the orchestrator needs:
//   - GET  /printer/info
//   - GET  /printer/objects/query?{print_stats | heater_bed&extruder | led}
//   - GET  /server/files/list
//   - POST /server/files/upload            (multipart, field `file`)
//   - POST /printer/print/{start,pause,resume,cancel}
//   - POST /printer/gcode/script           (LED control)
//
// Every call carries its own timeout.  Transport failures and timeouts map to
// `DeviceUnreachable`; non-success statuses and malformed bodies map to
// `DeviceError`.  Nothing is retried here.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info, instrument, warn};

use printfleet_core::config::DeviceTimeouts;
use printfleet_core::error::{FleetError, Result};
use printfleet_core::types::{LedState, PrintStats, Printer, RemoteFile};

/// Why the file list is being fetched; selects the timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListPurpose {
    /// Part of a status snapshot (short timeout).
    Status,
    /// Browsing files or choosing one to print (longer timeout).
    Browse,
}

/// Operations on one printer controller.
///
/// Implemented by [`MoonrakerClient`] for real devices and by scripted fakes
/// in tests.
#[async_trait]
pub trait DeviceApi: Send + Sync {
    /// Registry id of the printer this client talks to.
    fn printer_id(&self) -> &str;

    async fn get_info(&self) -> Result<Value>;

    async fn get_print_stats(&self) -> Result<PrintStats>;

    /// Heater bed and extruder objects, keyed by object name.
    async fn get_temperatures(&self) -> Result<Value>;

    async fn list_files(&self, purpose: ListPurpose) -> Result<Vec<RemoteFile>>;

    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<()>;

    async fn start_print(&self, filename: &str) -> Result<()>;

    async fn pause_print(&self) -> Result<()>;

    async fn resume_print(&self) -> Result<()>;

    async fn cancel_print(&self) -> Result<()>;

    async fn get_led_state(&self) -> Result<LedState>;

    async fn set_led(&self, red: u8, green: u8, blue: u8) -> Result<()>;
}

/// G-code script that sets all channels of the `led` object.
pub fn led_script(red: u8, green: u8, blue: u8) -> String {
    format!("SET_LED LED=led RED={red} GREEN={green} BLUE={blue}")
}

/// HTTP client bound to a single controller.
pub struct MoonrakerClient {
    printer_id: String,
    base_url: String,
    http: reqwest::Client,
    timeouts: DeviceTimeouts,
}

impl MoonrakerClient {
    /// Create a client for `printer`, sharing `http`'s connection pool.
    pub fn new(printer: &Printer, http: reqwest::Client, timeouts: DeviceTimeouts) -> Self {
        Self {
            printer_id: printer.id.clone(),
            base_url: printer.controller_base_url.trim_end_matches('/').to_string(),
            http,
            timeouts,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn unreachable(&self, reason: String) -> FleetError {
        FleetError::DeviceUnreachable {
            printer_id: self.printer_id.clone(),
            reason,
        }
    }

    fn device_error(&self, reason: String) -> FleetError {
        FleetError::DeviceError {
            printer_id: self.printer_id.clone(),
            reason,
        }
    }

    /// Classify a transport-level failure.
    fn transport_error(&self, what: &str, timeout: Duration, e: reqwest::Error) -> FleetError {
        if e.is_timeout() {
            self.unreachable(format!("{what}: timed out after {}s", timeout.as_secs()))
        } else if e.is_connect() || e.is_request() {
            self.unreachable(format!("{what}: {e}"))
        } else {
            self.device_error(format!("{what}: {e}"))
        }
    }

    /// Send a prepared request and decode its JSON body.
    async fn send(
        &self,
        what: &str,
        request: reqwest::RequestBuilder,
        timeout: Duration,
    ) -> Result<Value> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(what, timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), call = what, "controller rejected request");
            return Err(self.device_error(format!("{what} returned status {}", status.as_u16())));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(what, timeout, e))?;
        if body.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&body)
            .map_err(|e| self.device_error(format!("{what}: malformed body: {e}")))
    }

    async fn get(&self, path: &str, timeout: Duration) -> Result<Value> {
        debug!(path, "GET");
        self.send(path, self.http.get(self.url(path)), timeout).await
    }

    async fn post(&self, path: &str, body: Option<Value>, timeout: Duration) -> Result<Value> {
        debug!(path, "POST");
        let mut request = self.http.post(self.url(path));
        if let Some(body) = body {
            request = request.json(&body);
        }
        self.send(path, request, timeout).await
    }

    /// Pull the sub-object at `pointer` out of a response body.
    fn extract<T: DeserializeOwned>(&self, body: Value, pointer: &str) -> Result<T> {
        let Some(node) = body.pointer(pointer) else {
            return Err(self.device_error(format!("response missing {pointer}")));
        };
        serde_json::from_value(node.clone())
            .map_err(|e| self.device_error(format!("unexpected shape at {pointer}: {e}")))
    }
}

#[async_trait]
impl DeviceApi for MoonrakerClient {
    fn printer_id(&self) -> &str {
        &self.printer_id
    }

    /// The full `/printer/info` body, passed through unchanged.
    #[instrument(skip(self), fields(printer_id = %self.printer_id))]
    async fn get_info(&self) -> Result<Value> {
        self.get("/printer/info", self.timeouts.status()).await
    }

    #[instrument(skip(self), fields(printer_id = %self.printer_id))]
    async fn get_print_stats(&self) -> Result<PrintStats> {
        let body = self
            .get("/printer/objects/query?print_stats", self.timeouts.status())
            .await?;
        self.extract(body, "/result/status/print_stats")
    }

    #[instrument(skip(self), fields(printer_id = %self.printer_id))]
    async fn get_temperatures(&self) -> Result<Value> {
        let body = self
            .get(
                "/printer/objects/query?heater_bed&extruder",
                self.timeouts.status(),
            )
            .await?;
        self.extract(body, "/result/status")
    }

    #[instrument(skip(self), fields(printer_id = %self.printer_id))]
    async fn list_files(&self, purpose: ListPurpose) -> Result<Vec<RemoteFile>> {
        let timeout = match purpose {
            ListPurpose::Status => self.timeouts.status(),
            ListPurpose::Browse => self.timeouts.file_list(),
        };
        let body = self.get("/server/files/list", timeout).await?;
        let files: Vec<RemoteFile> = self.extract(body, "/result")?;
        debug!(count = files.len(), "listed controller files");
        Ok(files)
    }

    #[instrument(skip(self, bytes), fields(printer_id = %self.printer_id, size = bytes.len()))]
    async fn upload_file(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let part = Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| self.device_error(format!("upload: {e}")))?;
        let form = Form::new().part("file", part);

        let request = self.http.post(self.url("/server/files/upload")).multipart(form);
        self.send("/server/files/upload", request, self.timeouts.upload())
            .await?;
        info!(file = name, "file uploaded to controller");
        Ok(())
    }

    #[instrument(skip(self), fields(printer_id = %self.printer_id))]
    async fn start_print(&self, filename: &str) -> Result<()> {
        self.post(
            "/printer/print/start",
            Some(json!({ "filename": filename })),
            self.timeouts.control(),
        )
        .await?;
        info!(file = filename, "print started");
        Ok(())
    }

    #[instrument(skip(self), fields(printer_id = %self.printer_id))]
    async fn pause_print(&self) -> Result<()> {
        self.post("/printer/print/pause", None, self.timeouts.control())
            .await?;
        info!("print paused");
        Ok(())
    }

    #[instrument(skip(self), fields(printer_id = %self.printer_id))]
    async fn resume_print(&self) -> Result<()> {
        self.post("/printer/print/resume", None, self.timeouts.control())
            .await?;
        info!("print resumed");
        Ok(())
    }

    #[instrument(skip(self), fields(printer_id = %self.printer_id))]
    async fn cancel_print(&self) -> Result<()> {
        self.post("/printer/print/cancel", None, self.timeouts.control())
            .await?;
        info!("print cancelled");
        Ok(())
    }

    #[instrument(skip(self), fields(printer_id = %self.printer_id))]
    async fn get_led_state(&self) -> Result<LedState> {
        let body = self
            .get("/printer/objects/query?led", self.timeouts.led_read())
            .await?;
        self.extract(body, "/result/status/led")
    }

    #[instrument(skip(self), fields(printer_id = %self.printer_id))]
    async fn set_led(&self, red: u8, green: u8, blue: u8) -> Result<()> {
        self.post(
            "/printer/gcode/script",
            Some(json!({ "script": led_script(red, green, blue) })),
            self.timeouts.led_write(),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::body::Bytes;
    use axum::extract::{RawQuery, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{get, post};

    use super::*;

    /// Requests seen by the fake controller, as `"METHOD path detail"`.
    type Seen = Arc<Mutex<Vec<String>>>;

    async fn info() -> axum::Json<Value> {
        axum::Json(json!({"result": {"state": "ready", "hostname": "voron"}}))
    }

    async fn query(RawQuery(q): RawQuery) -> (StatusCode, String) {
        let body = match q.as_deref() {
            Some("print_stats") => json!({"result": {"status": {"print_stats": {
                "state": "standby", "filename": "", "print_duration": 0.0
            }}}}),
            Some("heater_bed&extruder") => json!({"result": {"status": {
                "heater_bed": {"temperature": 60.1, "target": 60.0},
                "extruder": {"temperature": 215.3, "target": 215.0}
            }}}),
            Some("led") => json!({"result": {"status": {"led": {"red": 0.0}}}}),
            _ => return (StatusCode::BAD_REQUEST, "unknown object".into()),
        };
        (StatusCode::OK, body.to_string())
    }

    async fn files() -> axum::Json<Value> {
        axum::Json(json!({"result": [
            {"path": "cube.gcode", "size": 1024, "modified": 1700000000.0},
            {"pathname": "notes.txt"}
        ]}))
    }

    async fn upload(State(seen): State<Seen>, headers: HeaderMap, body: Bytes) -> StatusCode {
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let text = String::from_utf8_lossy(&body);
        let named = text.contains("name=\"file\"") && text.contains("filename=\"part.gcode\"");
        seen.lock()
            .unwrap()
            .push(format!("POST upload {content_type} named={named}"));
        StatusCode::CREATED
    }

    async fn record_json(
        State(seen): State<Seen>,
        uri: axum::http::Uri,
        body: Bytes,
    ) -> axum::Json<Value> {
        seen.lock()
            .unwrap()
            .push(format!("POST {} {}", uri.path(), String::from_utf8_lossy(&body)));
        axum::Json(json!({"result": "ok"}))
    }

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr.port().to_string()
    }

    async fn fake_controller() -> (MoonrakerClient, Seen) {
        let seen: Seen = Arc::default();
        let router = Router::new()
            .route("/printer/info", get(info))
            .route("/printer/objects/query", get(query))
            .route("/server/files/list", get(files))
            .route("/server/files/upload", post(upload))
            .route("/printer/print/start", post(record_json))
            .route("/printer/print/pause", post(record_json))
            .route("/printer/print/resume", post(record_json))
            .route("/printer/print/cancel", post(record_json))
            .route("/printer/gcode/script", post(record_json))
            .with_state(Arc::clone(&seen));
        let port = serve(router).await;
        (client_for(port.parse().unwrap(), DeviceTimeouts::default()), seen)
    }

    fn client_for(port: u16, timeouts: DeviceTimeouts) -> MoonrakerClient {
        let printer = Printer::new(
            "ZB3D-001".into(),
            "bench".into(),
            "127.0.0.1".into(),
            port,
            8080,
        );
        MoonrakerClient::new(&printer, reqwest::Client::new(), timeouts)
    }

    #[tokio::test]
    async fn reads_status_sub_objects() {
        let (client, _) = fake_controller().await;

        let info = client.get_info().await.unwrap();
        assert_eq!(
            info,
            json!({"result": {"state": "ready", "hostname": "voron"}})
        );

        let stats = client.get_print_stats().await.unwrap();
        assert!(stats.is_idle());

        let temps = client.get_temperatures().await.unwrap();
        assert_eq!(temps["extruder"]["target"], 215.0);

        let files = client.list_files(ListPurpose::Browse).await.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.pathname.as_str()).collect();
        assert_eq!(names, ["cube.gcode", "notes.txt"]);
    }

    #[tokio::test]
    async fn control_commands_hit_the_right_paths() {
        let (client, seen) = fake_controller().await;

        client.start_print("cube.gcode").await.unwrap();
        client.pause_print().await.unwrap();
        client.resume_print().await.unwrap();
        client.cancel_print().await.unwrap();

        let seen = seen.lock().unwrap().clone();
        assert_eq!(seen.len(), 4);
        assert!(seen[0].starts_with("POST /printer/print/start"));
        assert!(seen[0].contains(r#""filename":"cube.gcode""#));
        assert!(seen[1].starts_with("POST /printer/print/pause"));
        assert!(seen[2].starts_with("POST /printer/print/resume"));
        assert!(seen[3].starts_with("POST /printer/print/cancel"));
    }

    #[tokio::test]
    async fn led_state_and_script() {
        let (client, seen) = fake_controller().await;

        let led = client.get_led_state().await.unwrap();
        assert_eq!(led.red, 0.0);

        client.set_led(255, 255, 255).await.unwrap();
        let seen = seen.lock().unwrap().clone();
        assert!(seen[0].contains("SET_LED LED=led RED=255 GREEN=255 BLUE=255"));
    }

    #[tokio::test]
    async fn upload_is_multipart_with_file_field() {
        let (client, seen) = fake_controller().await;
        client
            .upload_file("part.gcode", b"G28\nG1 X10\n".to_vec())
            .await
            .unwrap();

        let seen = seen.lock().unwrap().clone();
        assert!(seen[0].contains("multipart/form-data"));
        assert!(seen[0].ends_with("named=true"));
    }

    #[tokio::test]
    async fn non_success_status_is_a_device_error() {
        let router = Router::new().route(
            "/printer/print/pause",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "klippy not ready") }),
        );
        let port = serve(router).await;
        let client = client_for(port.parse().unwrap(), DeviceTimeouts::default());

        let err = client.pause_print().await.unwrap_err();
        assert!(matches!(err, FleetError::DeviceError { .. }), "{err:?}");
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn malformed_body_is_a_device_error() {
        let router = Router::new().route("/printer/info", get(|| async { "<html>nginx</html>" }));
        let port = serve(router).await;
        let client = client_for(port.parse().unwrap(), DeviceTimeouts::default());

        let err = client.get_info().await.unwrap_err();
        assert!(matches!(err, FleetError::DeviceError { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn missing_sub_object_is_a_device_error() {
        let router = Router::new().route(
            "/printer/objects/query",
            get(|| async { axum::Json(json!({"result": {"status": {}}})) }),
        );
        let port = serve(router).await;
        let client = client_for(port.parse().unwrap(), DeviceTimeouts::default());

        let err = client.get_print_stats().await.unwrap_err();
        assert!(err.to_string().contains("print_stats"));
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let client = client_for(port, DeviceTimeouts::default());
        let err = client.get_info().await.unwrap_err();
        assert!(matches!(err, FleetError::DeviceUnreachable { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn slow_controller_times_out_as_unreachable() {
        let router = Router::new().route(
            "/printer/info",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                axum::Json(json!({"result": {}}))
            }),
        );
        let port = serve(router).await;
        let timeouts = DeviceTimeouts {
            status_secs: 1,
            ..DeviceTimeouts::default()
        };
        let client = client_for(port.parse().unwrap(), timeouts);

        let started = std::time::Instant::now();
        let err = client.get_info().await.unwrap_err();
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(matches!(err, FleetError::DeviceUnreachable { .. }), "{err:?}");
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn info_body_is_returned_whole() {
        let router = Router::new().route(
            "/printer/info",
            get(|| async { axum::Json(json!({"state": "ready", "hostname": "voron"})) }),
        );
        let port = serve(router).await;
        let client = client_for(port.parse().unwrap(), DeviceTimeouts::default());

        let info = client.get_info().await.unwrap();
        assert_eq!(info, json!({"state": "ready", "hostname": "voron"}));
    }

    async fn stall() -> axum::Json<Value> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        axum::Json(json!({"result": "ok"}))
    }

    /// Every route stalls; each call kind gets a distinct timeout so the
    /// error message shows which one applied.
    async fn stalled_controller() -> MoonrakerClient {
        let router = Router::new()
            .route("/printer/print/pause", post(stall))
            .route("/server/files/upload", post(stall))
            .route("/server/files/list", get(stall))
            .route("/printer/objects/query", get(stall))
            .route("/printer/gcode/script", post(stall));
        let port = serve(router).await;
        let timeouts = DeviceTimeouts {
            status_secs: 4,
            file_list_secs: 2,
            control_secs: 1,
            upload_secs: 2,
            led_read_secs: 1,
            led_write_secs: 2,
        };
        client_for(port.parse().unwrap(), timeouts)
    }

    fn assert_timed_out_after(err: FleetError, secs: u64) {
        assert!(matches!(err, FleetError::DeviceUnreachable { .. }), "{err:?}");
        assert!(
            err.to_string().contains(&format!("timed out after {secs}s")),
            "{err}"
        );
    }

    #[tokio::test]
    async fn control_upload_and_led_calls_use_their_own_timeouts() {
        let client = stalled_controller().await;

        assert_timed_out_after(client.pause_print().await.unwrap_err(), 1);
        assert_timed_out_after(
            client.upload_file("part.gcode", b"G28".to_vec()).await.unwrap_err(),
            2,
        );
        assert_timed_out_after(client.get_led_state().await.unwrap_err(), 1);
        assert_timed_out_after(client.set_led(0, 0, 0).await.unwrap_err(), 2);
        assert_timed_out_after(
            client.list_files(ListPurpose::Browse).await.unwrap_err(),
            2,
        );
    }

    #[test]
    fn script_format() {
        assert_eq!(led_script(0, 0, 0), "SET_LED LED=led RED=0 GREEN=0 BLUE=0");
    }
}
