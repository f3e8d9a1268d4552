//! Voice chat process wiring
//!
//! Everything `main` needs besides the loop itself: building the ports from
//! settings, logging, metrics, and OS shutdown signals.

pub mod metrics;
pub mod ports;
pub mod shutdown;
pub mod telemetry;

pub use metrics::init_metrics;
pub use ports::{build_ports, orchestrator_config, Ports, StartupError};
pub use shutdown::{shutdown_signal, spawn_shutdown_listener};
pub use telemetry::init_tracing;
