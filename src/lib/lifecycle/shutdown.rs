use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use tokio::sync::Notify;
use tracing::*;

/// Termination request shared between the signal listener and the control
/// loop.
///
/// Requesting only flips an atomic flag and wakes whoever waits; all teardown
/// happens on the control path that observes the flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    requested: AtomicBool,
    notify: Notify,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true for the first request only.
    pub fn request(&self) -> bool {
        let first = !self.inner.requested.swap(true, Ordering::SeqCst);
        self.inner.notify.notify_waiters();
        first
    }

    pub fn is_requested(&self) -> bool {
        self.inner.requested.load(Ordering::SeqCst)
    }

    /// Resolves once a shutdown has been requested.
    pub async fn wait(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag, so a request in between is not lost
        notified.as_mut().enable();

        if self.is_requested() {
            return;
        }
        notified.await;
    }
}

/// Request a shutdown on SIGINT and SIGTERM.
#[cfg(unix)]
pub fn listen_for_termination(
    signal: ShutdownSignal,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    use tokio::signal::unix::{signal as unix_signal, SignalKind};

    let mut terminate = unix_signal(SignalKind::terminate())?;
    let mut interrupt = unix_signal(SignalKind::interrupt())?;

    Ok(tokio::spawn(async move {
        loop {
            let name = tokio::select! {
                Some(()) = terminate.recv() => "SIGTERM",
                Some(()) = interrupt.recv() => "SIGINT",
                else => break,
            };

            if signal.request() {
                info!("Received {name}, stopping after the current cycle");
            } else {
                debug!("Received {name}, already stopping");
            }
        }
    }))
}

#[cfg(not(unix))]
pub fn listen_for_termination(
    signal: ShutdownSignal,
) -> std::io::Result<tokio::task::JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if signal.request() {
                info!("Received Ctrl-C, stopping after the current cycle");
            }
        }
    }))
}
