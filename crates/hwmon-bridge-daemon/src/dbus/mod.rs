//! D-Bus interface for the hwmon bridge daemon.
//!
//! Provides the `org.hwmonbridge.Daemon1` interface on the session or system bus.

mod interface;

pub use interface::run_dbus_server;
