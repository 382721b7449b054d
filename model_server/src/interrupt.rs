//! Two stage interrupt handling: the first interrupt asks to close, the second one forces
//! the process out.

use std::{
    process,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use log::{error, info, warn};
use tokio::{signal, task::JoinHandle};

/// What an interrupt amounts to given the ones before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    /// Closing was requested, the server keeps serving.
    Draining,
    /// Closing had already been requested.
    Force,
}

#[derive(Debug, Default)]
pub struct ShutdownFlag {
    closing: AtomicBool,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an interrupt.
    pub fn on_interrupt(&self) -> Escalation {
        if self.closing.swap(true, Ordering::SeqCst) {
            Escalation::Force
        } else {
            Escalation::Draining
        }
    }

    pub fn closing_requested(&self) -> bool {
        self.closing.load(Ordering::SeqCst)
    }
}

/// Spawns the task that feeds process interrupts into `flag`.
///
/// A second interrupt terminates the process immediately with a non zero status.
pub fn listen(flag: Arc<ShutdownFlag>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if let Err(e) = signal::ctrl_c().await {
                error!("failed to listen for interrupts: {e}");
                return;
            }

            match flag.on_interrupt() {
                Escalation::Draining => {
                    info!("received interrupt, interrupt again to force shutting down")
                }
                Escalation::Force => {
                    warn!("forced shutting down now");
                    process::exit(-1);
                }
            }
        }
    })
}
