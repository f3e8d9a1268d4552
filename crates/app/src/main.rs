//! Voice chat entry point

use std::process::ExitCode;
use std::time::Duration;

use voice_chat_agent::{ConversationOrchestrator, LoopExit};
use voice_chat_app::{
    build_ports, init_metrics, init_tracing, orchestrator_config, spawn_shutdown_listener,
};
use voice_chat_config::{load_settings, Settings};

fn main() -> ExitCode {
    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        },
    };

    let code = runtime.block_on(run());

    // A console read parked on stdin cannot be interrupted; don't wait on it
    runtime.shutdown_timeout(Duration::from_millis(500));
    code
}

async fn run() -> ExitCode {
    // Priority: env vars > config/{env}.yaml > config/default.yaml > defaults
    let env = std::env::var("VOICE_CHAT_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing is not up yet
            eprintln!(
                "Loaded configuration (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        },
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&settings.observability);

    tracing::info!("Starting voice chat v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?settings.environment,
        input = ?settings.conversation.input,
        output = ?settings.conversation.output,
        provider = ?settings.llm.provider,
        "Configuration loaded"
    );

    if settings.observability.metrics_enabled {
        if let Err(e) = init_metrics(settings.observability.metrics_port) {
            tracing::warn!(error = %e, "Metrics exporter disabled");
        }
    }

    let config = match orchestrator_config(&settings) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("Startup failed: {}", e);
            return ExitCode::from(1);
        },
    };

    let ports = match build_ports(&settings) {
        Ok(ports) => ports,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            eprintln!("Startup failed: {}", e);
            return ExitCode::from(1);
        },
    };

    let shutdown_rx = ports.shutdown_receiver();
    let signals = spawn_shutdown_listener(ports.shutdown_handle());

    let orchestrator = ConversationOrchestrator::new(
        ports.input,
        ports.llm,
        ports.output,
        config,
    );

    let exit = orchestrator.run(shutdown_rx).await;

    signals.abort();
    // Releases the microphone, speaker and HTTP clients
    drop(orchestrator);

    match exit {
        LoopExit::StopPhrase => tracing::info!("Conversation ended by stop phrase"),
        LoopExit::Shutdown => tracing::info!("Conversation ended by shutdown signal"),
    }

    ExitCode::SUCCESS
}
