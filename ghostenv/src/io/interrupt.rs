//! Ctrl+C observation.
//!
//! The handler only flips a flag; blocking waits poll it and the controller
//! checks it between lifecycle steps.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use tracing::{debug, info};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    /// A flag that is only set through [`Interrupt::trigger`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag and route Ctrl+C (SIGINT, and console events on Windows) to it.
    ///
    /// Can succeed at most once per process.
    pub fn install() -> Result<Self> {
        let interrupt = Self::new();
        let handle = interrupt.clone();
        ctrlc::set_handler(move || {
            info!("received Ctrl+C");
            handle.trigger();
        })
        .context("set Ctrl+C handler")?;
        debug!("interrupt handler installed");
        Ok(interrupt)
    }

    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Reset the flag, returning whether it was set.
    pub fn clear(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}
