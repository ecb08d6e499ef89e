use std::time::Duration;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// How long a SIGTERM waits before stopping the listener, so that deposits
/// already streaming in can finish.
const DEPOSIT_DRAIN_PERIOD: Duration = Duration::from_secs(10);

/// Process shutdown, driven by unix signals or by [`Shutdown::trigger`].
pub struct Shutdown {
    listener: JoinHandle<()>,
    tx: watch::Sender<()>,
}

impl Shutdown {
    /// Install SIGINT and SIGTERM handlers. SIGINT stops at once; SIGTERM
    /// stops after the drain period.
    pub fn install() -> std::io::Result<Self> {
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let (tx, _) = watch::channel(());
        let notify = tx.clone();

        let listener = tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => {
                    tracing::info!("SIGINT received, stopping");
                }
                _ = sigterm.recv() => {
                    tracing::info!(
                        drain_secs = DEPOSIT_DRAIN_PERIOD.as_secs(),
                        "SIGTERM received, draining in-flight deposits"
                    );
                    tokio::time::sleep(DEPOSIT_DRAIN_PERIOD).await;
                }
            }
            let _ = notify.send(());
        });

        Ok(Self { listener, tx })
    }

    pub fn subscribe(&self) -> watch::Receiver<()> {
        self.tx.subscribe()
    }

    /// Stop without waiting for a signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Resolve once a signal has been handled.
    pub async fn wait(self) {
        let _ = self.listener.await;
    }
}

/// Route panics through tracing so they reach the file log.
pub fn log_panics() {
    std::panic::set_hook(Box::new(|panic| {
        let location = panic
            .location()
            .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()));
        tracing::error!(message = %panic, location = location.as_deref(), "panic");
    }));
}
