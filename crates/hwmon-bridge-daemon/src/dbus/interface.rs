//! D-Bus interface implementation using zbus.
//!
//! Provides the `org.hwmonbridge.Daemon1` interface.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use zbus::{interface, object_server::SignalEmitter, Connection};

use crate::config::DbusBusType;
use crate::state::AppState;

/// Well-known bus name of the daemon.
pub const SERVICE_NAME: &str = "org.hwmonbridge.Daemon";

/// Object path of the daemon interface.
pub const OBJECT_PATH: &str = "/org/hwmonbridge/Daemon";

/// D-Bus interface implementation for the daemon.
pub struct Daemon1Interface {
    state: Arc<AppState>,
    shutdown_tx: tokio::sync::mpsc::Sender<()>,
}

impl Daemon1Interface {
    /// Creates a new D-Bus interface.
    pub fn new(state: Arc<AppState>, shutdown_tx: tokio::sync::mpsc::Sender<()>) -> Self {
        Self { state, shutdown_tx }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> zbus::fdo::Result<String> {
    serde_json::to_string(value).map_err(|e| zbus::fdo::Error::Failed(e.to_string()))
}

#[interface(name = "org.hwmonbridge.Daemon1")]
impl Daemon1Interface {
    /// Returns the last good snapshot as JSON.
    fn get_snapshot(&self) -> zbus::fdo::Result<String> {
        let snapshot = self
            .state
            .snapshot()
            .ok_or_else(|| zbus::fdo::Error::Failed("No snapshot yet".to_string()))?;
        to_json(snapshot.as_ref())
    }

    /// Lists published sensors, one JSON object per sensor.
    fn list_sensors(&self) -> zbus::fdo::Result<Vec<String>> {
        self.state.entities().iter().map(to_json).collect()
    }

    /// Returns one sensor as JSON.
    fn get_sensor(&self, key: &str) -> zbus::fdo::Result<String> {
        let entity = self
            .state
            .entity(key)
            .ok_or_else(|| zbus::fdo::Error::InvalidArgs(format!("Unknown sensor: {}", key)))?;
        to_json(&entity)
    }

    /// Returns the poll status as JSON.
    fn get_status(&self) -> zbus::fdo::Result<String> {
        to_json(&self.state.status())
    }

    /// Requests an immediate poll.
    fn refresh(&self) {
        self.state.request_refresh();
        debug!("D-Bus: Refresh");
    }

    /// Shuts down the daemon.
    async fn quit(&self) -> zbus::fdo::Result<()> {
        info!("D-Bus: Quit requested");
        self.shutdown_tx
            .send(())
            .await
            .map_err(|e| zbus::fdo::Error::Failed(e.to_string()))?;
        Ok(())
    }

    /// Emitted after each successful poll.
    #[zbus(signal)]
    async fn snapshot_updated(
        emitter: &SignalEmitter<'_>,
        timestamp: &str,
        sensor_count: u32,
    ) -> zbus::Result<()>;

    // Properties

    /// Whether the most recent poll succeeded.
    #[zbus(property)]
    fn available(&self) -> bool {
        self.state.is_available()
    }

    /// Number of sensors in the last good snapshot.
    #[zbus(property)]
    fn sensor_count(&self) -> u32 {
        self.state.status().sensor_count as u32
    }

    /// Sensor endpoint being polled.
    #[zbus(property)]
    fn url(&self) -> String {
        self.state.config().url.clone()
    }

    /// Capture time of the last good snapshot (empty if none).
    #[zbus(property)]
    fn last_update(&self) -> String {
        self.state
            .snapshot()
            .map(|s| s.timestamp.to_rfc3339())
            .unwrap_or_default()
    }
}

/// Connects to the appropriate D-Bus bus based on configuration.
async fn connect_to_bus(bus_type: DbusBusType) -> anyhow::Result<(Connection, &'static str)> {
    match bus_type {
        DbusBusType::Session => {
            let conn = Connection::session()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to session bus: {}", e))?;
            Ok((conn, "session"))
        }
        DbusBusType::System => {
            let conn = Connection::system()
                .await
                .map_err(|e| anyhow::anyhow!("Failed to connect to system bus: {}", e))?;
            Ok((conn, "system"))
        }
        DbusBusType::Auto => {
            // Try session bus first, fall back to system bus
            match Connection::session().await {
                Ok(conn) => Ok((conn, "session")),
                Err(session_err) => {
                    warn!(
                        "Session bus unavailable ({}), trying system bus",
                        session_err
                    );
                    let conn = Connection::system().await.map_err(|system_err| {
                        anyhow::anyhow!(
                            "Failed to connect to any D-Bus: session={}, system={}",
                            session_err,
                            system_err
                        )
                    })?;
                    Ok((conn, "system"))
                }
            }
        }
    }
}

/// Forwards snapshot updates as `SnapshotUpdated` signals until the
/// connection is gone.
async fn forward_updates(connection: Connection, state: Arc<AppState>) {
    let mut updates = state.subscribe();
    let emitter = match SignalEmitter::new(&connection, OBJECT_PATH) {
        Ok(emitter) => emitter,
        Err(e) => {
            warn!("Failed to create D-Bus signal emitter: {}", e);
            return;
        }
    };

    loop {
        let snapshot = match updates.recv().await {
            Ok(snapshot) => snapshot,
            Err(RecvError::Lagged(skipped)) => {
                debug!("D-Bus signal forwarder skipped {} updates", skipped);
                continue;
            }
            Err(RecvError::Closed) => return,
        };

        let timestamp = snapshot.timestamp.to_rfc3339();
        if let Err(e) =
            Daemon1Interface::snapshot_updated(&emitter, &timestamp, snapshot.len() as u32).await
        {
            warn!("Failed to emit SnapshotUpdated: {}", e);
        }
    }
}

/// Runs the D-Bus server.
pub async fn run_dbus_server(
    state: Arc<AppState>,
    shutdown_tx: tokio::sync::mpsc::Sender<()>,
    bus_type: DbusBusType,
) -> anyhow::Result<Connection> {
    let interface = Daemon1Interface::new(state.clone(), shutdown_tx);

    let (connection, bus_name) = connect_to_bus(bus_type).await?;

    connection
        .object_server()
        .at(OBJECT_PATH, interface)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to register object: {}", e))?;

    connection
        .request_name(SERVICE_NAME)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to request bus name: {}", e))?;

    tokio::spawn(forward_updates(connection.clone(), state));

    info!(
        "D-Bus service registered at {} on {} bus",
        SERVICE_NAME, bus_name
    );
    Ok(connection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::PollError;
    use hwmon_bridge_core::SensorTreeParser;
    use serde_json::{json, Value};
    use tokio::sync::mpsc;

    fn daemon_iface() -> (Daemon1Interface, Arc<AppState>, mpsc::Receiver<()>) {
        let state = Arc::new(AppState::new(Config::default()));
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        (
            Daemon1Interface::new(state.clone(), shutdown_tx),
            state,
            shutdown_rx,
        )
    }

    fn publish(state: &AppState) {
        let snapshot = SensorTreeParser
            .parse_json(&json!({
                "Children": [
                    {"SensorId": "/cpu/0/temperature/2", "Value": "45.2 °C"},
                    {"SensorId": "/cpu/0/load/0", "Value": "20 %"}
                ]
            }))
            .unwrap();
        state.record_success(snapshot);
    }

    #[test]
    fn test_before_first_poll() {
        let (iface, _state, _rx) = daemon_iface();

        assert!(matches!(iface.get_snapshot(), Err(zbus::fdo::Error::Failed(_))));
        assert!(iface.list_sensors().unwrap().is_empty());
        assert!(!iface.available());
        assert_eq!(iface.sensor_count(), 0);
        assert_eq!(iface.last_update(), "");
        assert_eq!(iface.url(), "http://localhost:8085/data.json");
    }

    #[test]
    fn test_methods_after_success() {
        let (iface, state, _rx) = daemon_iface();
        publish(&state);

        let snapshot: Value = serde_json::from_str(&iface.get_snapshot().unwrap()).unwrap();
        assert_eq!(snapshot["sensors"].as_array().unwrap().len(), 2);

        let sensors = iface.list_sensors().unwrap();
        assert_eq!(sensors.len(), 2);
        let first: Value = serde_json::from_str(&sensors[0]).unwrap();
        assert_eq!(first["key"], "cpu_temperature_2");

        let sensor = iface.get_sensor("cpu_usage_0").unwrap();
        let sensor: Value = serde_json::from_str(&sensor).unwrap();
        assert_eq!(sensor["state"], 20.0);
        assert_eq!(sensor["unit"], "%");

        assert!(iface.available());
        assert_eq!(iface.sensor_count(), 2);
        assert!(!iface.last_update().is_empty());
    }

    #[test]
    fn test_unknown_sensor() {
        let (iface, state, _rx) = daemon_iface();
        publish(&state);

        assert!(matches!(
            iface.get_sensor("gpu_power_0"),
            Err(zbus::fdo::Error::InvalidArgs(_))
        ));
    }

    #[test]
    fn test_status_reports_failure() {
        let (iface, state, _rx) = daemon_iface();
        publish(&state);
        state.record_failure(&PollError::Timeout);

        let status: Value = serde_json::from_str(&iface.get_status().unwrap()).unwrap();
        assert_eq!(status["available"], false);
        assert_eq!(status["last_error"], "Request timed out");
        assert!(!iface.available());
        // The last good snapshot stays published.
        assert!(iface.get_snapshot().is_ok());
    }

    #[tokio::test]
    async fn test_refresh_and_quit() {
        let (iface, state, mut rx) = daemon_iface();

        iface.refresh();
        tokio::time::timeout(std::time::Duration::from_secs(1), state.refresh_requested())
            .await
            .expect("refresh should be pending");

        iface.quit().await.unwrap();
        assert_eq!(rx.recv().await, Some(()));
    }
}
