//! hwmon bridge control tool
//!
//! Queries the daemon over D-Bus, or parses a sensor tree directly.

use std::io::Read;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use hwmon_bridge_client::{BusType, DaemonClient};
use hwmon_bridge_core::{SensorCategory, SensorTreeParser, Snapshot};
use serde_json::Value;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum CliBusType {
    /// Try session bus first, fall back to system bus
    #[default]
    Auto,
    /// Use session bus (for user services)
    Session,
    /// Use system bus (for system services)
    System,
}

impl From<CliBusType> for BusType {
    fn from(bus: CliBusType) -> Self {
        match bus {
            CliBusType::Auto => BusType::Auto,
            CliBusType::Session => BusType::Session,
            CliBusType::System => BusType::System,
        }
    }
}

#[derive(Parser)]
#[command(name = "hwmonbridgectl")]
#[command(about = "Control tool for the hwmon bridge daemon")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// D-Bus bus type to use
    #[arg(long, default_value = "auto", value_enum)]
    bus: CliBusType,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List published sensors
    Sensors {
        /// Only show one category (temperature, power, usage, frequency, memory, network)
        #[arg(long)]
        category: Option<SensorCategory>,
    },
    /// Show one sensor as JSON
    Sensor {
        /// Sensor key (e.g., cpu_temperature_2)
        key: String,
    },
    /// Show poll status
    Status,
    /// Ask the daemon to poll now
    Refresh,
    /// Print a line for every new snapshot
    Watch,
    /// Daemon control commands
    Daemon {
        #[command(subcommand)]
        action: DaemonCommands,
    },
    /// Parse a sensor tree document without the daemon
    Parse {
        /// JSON file, or "-" for stdin
        file: String,
    },
    /// Fetch and parse a sensor endpoint without the daemon
    Fetch {
        /// Endpoint URL (e.g., http://localhost:8085/data.json)
        url: String,

        /// Request timeout in milliseconds
        #[arg(long, default_value = "3000")]
        timeout: u64,
    },
}

#[derive(Subcommand)]
enum DaemonCommands {
    /// Check if daemon is running
    Status,
    /// Request daemon shutdown
    Quit,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        // Offline commands never touch D-Bus
        Commands::Parse { file } => handle_parse(&file),
        Commands::Fetch { url, timeout } => handle_fetch(&url, timeout).await,
        command => {
            let client = DaemonClient::connect_with_bus(cli.bus.into())
                .await
                .context("Failed to connect to daemon. Is hwmonbridged running?")?;
            handle_command(command, &client).await
        }
    }
}

async fn handle_command(command: Commands, client: &DaemonClient) -> Result<()> {
    match command {
        Commands::Sensors { category } => handle_sensors(category, client).await,
        Commands::Sensor { key } => {
            let sensor = client.get_sensor(&key).await?;
            print_json(&sensor)
        }
        Commands::Status => handle_status(client).await,
        Commands::Refresh => {
            client.refresh().await?;
            println!("Refresh requested");
            Ok(())
        }
        Commands::Watch => handle_watch(client).await,
        Commands::Daemon { action } => handle_daemon(action, client).await,
        Commands::Parse { .. } | Commands::Fetch { .. } => {
            anyhow::bail!("Command does not use the daemon")
        }
    }
}

fn print_json(json: &str) -> Result<()> {
    let value: Value = serde_json::from_str(json).context("Daemon returned invalid JSON")?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn handle_sensors(category: Option<SensorCategory>, client: &DaemonClient) -> Result<()> {
    let sensors = client.list_sensors().await?;
    if sensors.is_empty() {
        println!("No sensors published yet");
        return Ok(());
    }

    for json in sensors {
        let sensor: Value = serde_json::from_str(&json).context("Daemon returned invalid JSON")?;
        let sensor_category = sensor["attributes"]["category"].as_str().unwrap_or("");
        if let Some(wanted) = category {
            if sensor_category != wanted.as_str() {
                continue;
            }
        }

        let stale = if sensor["available"].as_bool() == Some(true) {
            ""
        } else {
            " (unavailable)"
        };
        println!(
            "{:<32} {:>10} {:<5} {}{}",
            sensor["key"].as_str().unwrap_or("?"),
            sensor["state"],
            sensor["unit"].as_str().unwrap_or(""),
            sensor["sensor_id"].as_str().unwrap_or(""),
            stale
        );
    }

    Ok(())
}

async fn handle_status(client: &DaemonClient) -> Result<()> {
    let status: Value = serde_json::from_str(&client.get_status().await?)
        .context("Daemon returned invalid JSON")?;
    let available = client.is_available().await?;
    let last_update = client.last_update().await?;

    println!("Endpoint: {}", client.url().await?);
    println!("  Available: {}", if available { "yes" } else { "no" });
    println!("  Sensors: {}", client.sensor_count().await?);
    println!(
        "  Last update: {}",
        if last_update.is_empty() {
            "never"
        } else {
            &last_update
        }
    );
    println!(
        "  Polls: {} ok, {} failed",
        status["successes"], status["failures"]
    );
    if let Some(error) = status["last_error"].as_str() {
        println!("  Last error: {}", error);
    }

    Ok(())
}

async fn handle_watch(client: &DaemonClient) -> Result<()> {
    let updates = client.snapshot_updates().await?;
    let mut updates = std::pin::pin!(updates);

    println!("Waiting for snapshots (Ctrl+C to stop)");
    while let Some(update) = updates.next().await {
        println!("{}  {} sensors", update.timestamp, update.sensor_count);
    }

    debug!("Signal stream ended");
    Ok(())
}

async fn handle_daemon(action: DaemonCommands, client: &DaemonClient) -> Result<()> {
    match action {
        DaemonCommands::Status => {
            let available = client.is_available().await?;
            println!("Daemon: running");
            println!(
                "Sensor endpoint reachable: {}",
                if available { "yes" } else { "no" }
            );
        }
        DaemonCommands::Quit => {
            client.quit().await?;
            println!("Shutdown request sent to daemon");
        }
    }

    Ok(())
}

fn print_snapshot(snapshot: &Snapshot) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(snapshot)?);
    Ok(())
}

fn handle_parse(file: &str) -> Result<()> {
    let mut document = String::new();
    if file == "-" {
        std::io::stdin()
            .read_to_string(&mut document)
            .context("Failed to read stdin")?;
    } else {
        document = std::fs::read_to_string(file)
            .with_context(|| format!("Failed to read {}", file))?;
    }

    let snapshot = SensorTreeParser::new()
        .parse_str(&document)
        .context("Failed to parse sensor tree")?;
    print_snapshot(&snapshot)
}

/// Lower bound for the fetch timeout, same as the daemon's.
const MIN_TIMEOUT_MS: u64 = 100;

fn fetch_timeout(ms: u64) -> Duration {
    Duration::from_millis(ms.max(MIN_TIMEOUT_MS))
}

/// Fetches and parses one document, reporting failures the way the daemon
/// reports a failed poll.
async fn fetch_snapshot(url: &str, timeout: Duration) -> Result<Snapshot> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            anyhow::anyhow!("Request timed out")
        } else {
            anyhow::anyhow!("Request failed: {}", e)
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("Unexpected HTTP status: {}", status.as_u16());
    }

    let document: Value = response.json().await.map_err(|e| {
        if e.is_timeout() {
            anyhow::anyhow!("Request timed out")
        } else {
            anyhow::anyhow!("Invalid response body: {}", e)
        }
    })?;

    let snapshot = SensorTreeParser::new()
        .parse_json(&document)
        .map_err(|e| anyhow::anyhow!("Unparseable response: {}", e))?;
    debug!(sensors = snapshot.len(), "Fetched sensor tree");
    Ok(snapshot)
}

async fn handle_fetch(url: &str, timeout_ms: u64) -> Result<()> {
    let snapshot = fetch_snapshot(url, fetch_timeout(timeout_ms))
        .await
        .with_context(|| format!("Failed to fetch {}", url))?;
    print_snapshot(&snapshot)
}
