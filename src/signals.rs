//! Process signal to control event adapter.
//!
//! The supervisor consumes an abstract stream of [`ControlEvent`]s; this module
//! feeds that stream from unix signals.

use std::io;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Control requests handled by the supervisor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    /// SIGHUP: re-read the configuration and reconcile.
    Reload,
    /// SIGINT: graceful shutdown; a second one forces exit.
    Interrupt,
    /// SIGTERM: graceful shutdown.
    Terminate,
    /// SIGQUIT: immediate forced exit.
    Quit,
}

/// Installs the signal handlers and returns the event stream.
///
/// Handlers are installed before this returns, so signals delivered afterwards
/// are never lost.
pub fn listen() -> io::Result<mpsc::Receiver<ControlEvent>> {
    let mut hangup = signal(SignalKind::hangup())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;
    let mut quit = signal(SignalKind::quit())?;

    let (tx, rx) = mpsc::channel(16);
    tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(()) = hangup.recv() => ControlEvent::Reload,
                Some(()) = interrupt.recv() => ControlEvent::Interrupt,
                Some(()) = terminate.recv() => ControlEvent::Terminate,
                Some(()) = quit.recv() => ControlEvent::Quit,
                else => break,
            };
            info!("Received signal: {:?}", event);
            if tx.send(event).await.is_err() {
                break;
            }
        }
        debug!("Signal listener stopped");
    });

    Ok(rx)
}
