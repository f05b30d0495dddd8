// crates/iolink-rs/src/master.rs
//! The running IO-Link master: one worker thread and the handle to reach it.

use crate::dispatcher::{Dispatcher, MasterHandle};
use crate::hal::{IolinkError, PortServices};
use log::{error, info};
use std::string::String;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

/// Set while a master instance is alive. Only one may exist per process.
static MASTER_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Start-up parameters of the master.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterConfig {
    /// Number of ports, 1 to `MAX_PORTS`.
    pub port_count: u8,
    pub thread_name: String,
    /// Stack size of the worker thread, the platform default if `None`.
    pub stack_size: Option<usize>,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            port_count: 1,
            thread_name: String::from("iolink_m_thread"),
            stack_size: None,
        }
    }
}

/// An IO-Link master with its worker thread.
///
/// Dropping the master shuts the worker down, like `deinit` does.
pub struct Master<S: PortServices + Send + 'static> {
    handle: MasterHandle,
    worker: Option<JoinHandle<Dispatcher<S>>>,
}

impl<S: PortServices + Send + 'static> Master<S> {
    /// Creates the ports and starts the worker.
    ///
    /// Fails with `AlreadyInitialized` while another master is alive.
    pub fn init(config: MasterConfig, services: S) -> Result<Self, IolinkError> {
        if MASTER_ACTIVE
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            error!("[MASTER] A master instance is already running");
            return Err(IolinkError::AlreadyInitialized);
        }

        Self::start(config, services).inspect_err(|_| MASTER_ACTIVE.store(false, Ordering::Release))
    }

    fn start(config: MasterConfig, services: S) -> Result<Self, IolinkError> {
        let (dispatcher, handle) = Dispatcher::new(config.port_count, services)?;

        let mut builder = thread::Builder::new().name(config.thread_name.clone());
        if let Some(size) = config.stack_size {
            builder = builder.stack_size(size);
        }
        let worker = builder.spawn(move || dispatcher.run()).map_err(|e| {
            error!("[MASTER] Failed to spawn {}: {}", config.thread_name, e);
            IolinkError::StateInvalid
        })?;

        info!(
            "[MASTER] Started with {} ports on thread {}",
            config.port_count, config.thread_name
        );
        Ok(Self {
            handle,
            worker: Some(worker),
        })
    }

    /// A handle for submitting requests and lower-layer indications.
    pub fn handle(&self) -> MasterHandle {
        self.handle.clone()
    }

    /// Stops the worker after the queued jobs have run and hands back the
    /// collaborators.
    pub fn deinit(mut self) -> Result<S, IolinkError> {
        self.shutdown().map(Dispatcher::into_services)
    }

    fn shutdown(&mut self) -> Result<Dispatcher<S>, IolinkError> {
        let worker = self.worker.take().ok_or(IolinkError::StateInvalid)?;
        self.handle.close();
        let result = worker.join().map_err(|_| {
            error!("[MASTER] Worker thread panicked");
            IolinkError::StateInvalid
        });
        MASTER_ACTIVE.store(false, Ordering::Release);
        info!("[MASTER] Stopped");
        result
    }
}

impl<S: PortServices + Send + 'static> Drop for Master<S> {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.shutdown();
        }
    }
}
