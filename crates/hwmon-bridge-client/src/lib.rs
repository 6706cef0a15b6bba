//! D-Bus client library for communicating with the hwmon bridge daemon.

use anyhow::{Context, Result};
use futures::{Stream, StreamExt};
use tracing::{debug, warn};
use zbus::{proxy, Connection};

/// Well-known bus name of the daemon.
const SERVICE_NAME: &str = "org.hwmonbridge.Daemon";

/// D-Bus bus type selection.
#[derive(Debug, Clone, Copy, Default)]
pub enum BusType {
    /// Session bus (user session).
    Session,
    /// System bus (system-wide).
    System,
    /// Try session first, fall back to system.
    #[default]
    Auto,
}

/// D-Bus proxy for the hwmon bridge daemon.
#[proxy(
    interface = "org.hwmonbridge.Daemon1",
    default_service = "org.hwmonbridge.Daemon",
    default_path = "/org/hwmonbridge/Daemon"
)]
trait Daemon1 {
    /// Last good snapshot as JSON.
    fn get_snapshot(&self) -> zbus::Result<String>;

    /// Published sensors, one JSON object each.
    fn list_sensors(&self) -> zbus::Result<Vec<String>>;

    /// One published sensor as JSON.
    fn get_sensor(&self, key: &str) -> zbus::Result<String>;

    /// Poll status as JSON.
    fn get_status(&self) -> zbus::Result<String>;

    /// Requests an immediate poll.
    fn refresh(&self) -> zbus::Result<()>;

    /// Shuts down the daemon.
    fn quit(&self) -> zbus::Result<()>;

    /// Emitted after each successful poll.
    #[zbus(signal)]
    fn snapshot_updated(&self, timestamp: String, sensor_count: u32) -> zbus::Result<()>;

    /// Whether the most recent poll succeeded.
    #[zbus(property)]
    fn available(&self) -> zbus::Result<bool>;

    /// Number of sensors in the last good snapshot.
    #[zbus(property)]
    fn sensor_count(&self) -> zbus::Result<u32>;

    /// Sensor endpoint being polled.
    #[zbus(property)]
    fn url(&self) -> zbus::Result<String>;

    /// Capture time of the last good snapshot.
    #[zbus(property)]
    fn last_update(&self) -> zbus::Result<String>;
}

/// Payload of a `SnapshotUpdated` signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotUpdate {
    /// RFC 3339 capture time.
    pub timestamp: String,
    pub sensor_count: u32,
}

/// D-Bus client wrapper for the daemon.
pub struct DaemonClient {
    proxy: Daemon1Proxy<'static>,
}

impl DaemonClient {
    /// Connects with auto bus detection.
    pub async fn connect() -> Result<Self> {
        Self::connect_with_bus(BusType::Auto).await
    }

    /// Connects to the daemon on the given bus.
    pub async fn connect_with_bus(bus_type: BusType) -> Result<Self> {
        let connection = match bus_type {
            BusType::Session => {
                debug!("Connecting to session bus");
                Connection::session()
                    .await
                    .context("Failed to connect to session bus")?
            }
            BusType::System => {
                debug!("Connecting to system bus");
                Connection::system()
                    .await
                    .context("Failed to connect to system bus")?
            }
            BusType::Auto => Self::find_daemon().await?,
        };

        let proxy = Daemon1Proxy::new(&connection)
            .await
            .context("Failed to create D-Bus proxy")?;

        Ok(Self { proxy })
    }

    /// Picks whichever bus the daemon is registered on, session first.
    async fn find_daemon() -> Result<Connection> {
        match Connection::session().await {
            Ok(conn) if Self::service_exists(&conn).await => {
                debug!("Found daemon on session bus");
                return Ok(conn);
            }
            Ok(_) => debug!("Daemon not on session bus, trying system bus"),
            Err(e) => debug!("Session bus unavailable ({}), trying system bus", e),
        }

        let conn = Connection::system()
            .await
            .context("Failed to connect to system bus")?;
        if Self::service_exists(&conn).await {
            debug!("Found daemon on system bus");
            Ok(conn)
        } else {
            anyhow::bail!(
                "Daemon service not found on session or system bus. Is hwmonbridged running?"
            )
        }
    }

    /// Checks if the daemon service exists on the given connection.
    async fn service_exists(conn: &Connection) -> bool {
        use zbus::fdo::DBusProxy;
        let Ok(name) = zbus::names::BusName::try_from(SERVICE_NAME) else {
            return false;
        };
        match DBusProxy::new(conn).await {
            Ok(dbus_proxy) => dbus_proxy.name_has_owner(name).await.unwrap_or(false),
            Err(_) => false,
        }
    }

    /// Gets the last good snapshot as JSON.
    pub async fn get_snapshot(&self) -> Result<String> {
        self.proxy
            .get_snapshot()
            .await
            .context("Failed to get snapshot via D-Bus")
    }

    /// Lists published sensors as JSON objects.
    pub async fn list_sensors(&self) -> Result<Vec<String>> {
        self.proxy
            .list_sensors()
            .await
            .context("Failed to list sensors via D-Bus")
    }

    /// Gets one published sensor as JSON.
    pub async fn get_sensor(&self, key: &str) -> Result<String> {
        self.proxy
            .get_sensor(key)
            .await
            .with_context(|| format!("Failed to get sensor {} via D-Bus", key))
    }

    /// Gets the poll status as JSON.
    pub async fn get_status(&self) -> Result<String> {
        self.proxy
            .get_status()
            .await
            .context("Failed to get status via D-Bus")
    }

    /// Requests an immediate poll.
    pub async fn refresh(&self) -> Result<()> {
        self.proxy
            .refresh()
            .await
            .context("Failed to request refresh via D-Bus")
    }

    /// Shuts down the daemon.
    pub async fn quit(&self) -> Result<()> {
        self.proxy
            .quit()
            .await
            .context("Failed to quit daemon via D-Bus")
    }

    /// Checks whether the latest poll succeeded.
    pub async fn is_available(&self) -> Result<bool> {
        self.proxy
            .available()
            .await
            .context("Failed to get availability via D-Bus")
    }

    /// Gets the number of published sensors.
    pub async fn sensor_count(&self) -> Result<u32> {
        self.proxy
            .sensor_count()
            .await
            .context("Failed to get sensor count via D-Bus")
    }

    /// Gets the polled endpoint.
    pub async fn url(&self) -> Result<String> {
        self.proxy
            .url()
            .await
            .context("Failed to get url via D-Bus")
    }

    /// Gets the capture time of the last good snapshot.
    pub async fn last_update(&self) -> Result<String> {
        self.proxy
            .last_update()
            .await
            .context("Failed to get last update via D-Bus")
    }

    /// Streams `SnapshotUpdated` signals.
    pub async fn snapshot_updates(&self) -> Result<impl Stream<Item = SnapshotUpdate>> {
        let signals = self
            .proxy
            .receive_snapshot_updated()
            .await
            .context("Failed to subscribe to SnapshotUpdated")?;

        Ok(signals.filter_map(|signal| async move {
            match signal.args() {
                Ok(args) => Some(SnapshotUpdate {
                    timestamp: args.timestamp().clone(),
                    sensor_count: *args.sensor_count(),
                }),
                Err(e) => {
                    warn!("Malformed SnapshotUpdated signal: {}", e);
                    None
                }
            }
        }))
    }
}
