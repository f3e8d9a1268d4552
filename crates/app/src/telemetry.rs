//! Tracing setup

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};
use voice_chat_config::ObservabilityConfig;

/// Install the global subscriber
///
/// `RUST_LOG` wins over the configured level. Logs go to stderr; stdout
/// carries the conversation transcript.
pub fn init_tracing(config: &ObservabilityConfig) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_directive(&config.log_level).into());

    let fmt_layer = if config.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };

    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        eprintln!("Tracing subscriber already installed");
    }
}

fn default_directive(level: &str) -> String {
    format!("voice_chat={}", level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive_targets_workspace_crates() {
        assert_eq!(default_directive("debug"), "voice_chat=debug");
    }
}
