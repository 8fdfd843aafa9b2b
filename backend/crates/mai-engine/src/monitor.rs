//! Background crash detection.

use crate::lifecycle::Inner;

use std::sync::Arc;

use tracing::{error, info, warn};

/// Tick until monitoring is switched off or the supervisor shuts down.
///
/// Only process liveness is checked here; polling a busy engine over HTTP
/// every tick would add load for nothing. A recorded process that vanished
/// was not stopped deliberately (stop clears the handle first), so it goes
/// through bounded recovery.
pub(crate) async fn run(inner: Arc<Inner>) {
    let interval = inner.config.resilience.health_check_interval();
    let mut shutdown_rx = inner.shutdown_tx.subscribe();

    info!("Crash monitor started (interval {interval:?})");

    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown_rx.wait_for(|stop| *stop) => break,
        }

        let mut lc = inner.lifecycle.lock().await;
        if *shutdown_rx.borrow() {
            break;
        }
        if !lc.restart.monitoring_active {
            lc.monitor.take();
            break;
        }

        if let Some(code) = lc.reap_exited() {
            let model = lc
                .last_model
                .clone()
                .unwrap_or_else(|| inner.config.engine.default_model.clone());
            warn!("Engine process for {model} exited unexpectedly (code {code:?})");
            inner.publish(&lc);

            if let Err(e) = inner.recover_locked(&mut lc, &model).await {
                error!("Crash recovery for {model} failed: {e}");
            }
        }

        if !lc.restart.monitoring_active {
            lc.monitor.take();
            break;
        }
    }

    info!("Crash monitor stopped");
}
