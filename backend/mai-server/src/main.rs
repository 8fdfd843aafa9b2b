use mai_server::{AppState, build_router, logger};

use mai_config::Config;
use mai_engine::EngineSupervisor;

use std::error::Error;

use log::{error, info, warn};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // Load and validate configuration
    let config = Config::load()?;
    config.validate()?;

    // Construct log file path if configured
    let log_file_path = config.log_file_path()?;
    if let Some(log_dir) = log_file_path.as_ref().and_then(|p| p.parent()) {
        std::fs::create_dir_all(log_dir)?;
    }

    // Initialize logger (before any other logging)
    logger::initialize(config.logging.level, log_file_path, config.logging.colored)?;

    info!("Starting mai-server v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let supervisor = EngineSupervisor::new(config.clone())?;

    // Create TCP listener
    let bind_addr = config.bind_addr();
    let listener = TcpListener::bind(&bind_addr).await?;

    // Get actual bound address (important when port is 0 / auto-assigned)
    let actual_addr = listener.local_addr()?;
    supervisor.set_listen_port(actual_addr.port());
    info!("Server listening on {}", actual_addr);

    // Loading weights can take minutes; status routes answer meanwhile
    let starter = supervisor.clone();
    tokio::spawn(async move {
        match starter.start(None).await {
            Ok(()) => info!("Engine ready"),
            Err(e) => {
                warn!("Engine did not start: {e}");
                warn!("{}", e.recovery_hint());
            }
        }
    });

    let shutdown = shutdown_signal();

    info!("Server ready to accept connections");
    axum::serve(listener, build_router(AppState::new(supervisor.clone())))
        .with_graceful_shutdown(async move {
            match shutdown.await {
                Ok(signal) => info!("Received {signal}, initiating graceful shutdown"),
                Err(_) => {
                    error!("Signal listener unavailable, server will run until killed");
                    std::future::pending::<()>().await;
                }
            }
        })
        .await?;

    // Monitor first, then the engine process group
    supervisor.shutdown().await;
    info!("Graceful shutdown complete");

    Ok(())
}

/// Resolves with the name of the first termination signal received.
#[cfg(unix)]
fn shutdown_signal() -> oneshot::Receiver<&'static str> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let (tx, rx) = oneshot::channel();

    let mut signals = match Signals::new([SIGINT, SIGTERM]) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to register signal handlers: {e}");
            return ctrl_c_signal();
        }
    };

    std::thread::spawn(move || {
        if let Some(sig) = signals.forever().next() {
            let name = if sig == SIGTERM { "SIGTERM" } else { "SIGINT" };
            let _ = tx.send(name);
        }
    });

    rx
}

#[cfg(not(unix))]
fn shutdown_signal() -> oneshot::Receiver<&'static str> {
    ctrl_c_signal()
}

fn ctrl_c_signal() -> oneshot::Receiver<&'static str> {
    let (tx, rx) = oneshot::channel();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                let _ = tx.send("Ctrl+C");
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });
    rx
}
