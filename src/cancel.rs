//! Cooperative cancellation shared between the acquisition loop, its byte source,
//! and whoever wants to stop it (a signal handler, a UI thread, a test).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Hooks Ctrl-C to this token. Can only be installed once per process.
    pub fn install_ctrlc_handler(&self) -> anyhow::Result<()> {
        let token = self.clone();
        ctrlc::set_handler(move || {
            log::info!("Shutdown signal received, cancelling acquisition");
            token.cancel();
        })?;
        Ok(())
    }
}
