// crates/iolink-rs/src/dispatcher/mod.rs
//! The job dispatcher: a single consumer executing jobs strictly in arrival
//! order, and the handle producers use to feed it.

pub mod queue;

pub use queue::{Envelope, Job, JobPool, JobSlot};

use crate::hal::{IolinkError, PoolKind, PortServices};
use crate::job::{JobKind, Outbox};
use crate::port::{Context, Port};
use crate::smi::{SmiErrorType, SmiRequest, SmiService};
use crate::types::{
    JOB_POOL_API_SIZE, JOB_POOL_INTERNAL_SIZE, JOB_QUEUE_SIZE, MAX_PORTS, PortNumber, SmPortMode,
};
use crossbeam_channel::{Receiver, Sender, bounded};
use log::{debug, error, info, trace};
use queue::submit;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Owns the ports and the collaborators and runs jobs against them.
///
/// The dispatcher can be driven by a dedicated thread (`run`) or
/// synchronously (`run_until_idle`), which is what tests and single-threaded
/// integrations use.
pub struct Dispatcher<S: PortServices> {
    ports: Vec<Port>,
    services: S,
    sender: Sender<Envelope>,
    receiver: Receiver<Envelope>,
    internal: JobPool,
    api: JobPool,
    outbox: Outbox,
}

impl<S: PortServices> Dispatcher<S> {
    /// Creates the ports, both job pools and the queue.
    pub fn new(port_count: u8, services: S) -> Result<(Self, MasterHandle), IolinkError> {
        if port_count == 0 || port_count > MAX_PORTS {
            error!("[JOB] Invalid port count {}", port_count);
            return Err(IolinkError::ParameterConflict);
        }

        let (sender, receiver) = bounded(JOB_QUEUE_SIZE);
        let internal = JobPool::new(PoolKind::Internal, JOB_POOL_INTERNAL_SIZE);
        let api = JobPool::new(PoolKind::Api, JOB_POOL_API_SIZE);
        let ports = (0..usize::from(port_count))
            .map(|i| Port::new(PortNumber::from_index(i)))
            .collect();

        let handle = MasterHandle {
            sender: sender.clone(),
            internal: internal.clone(),
            api: api.clone(),
            port_count,
            closed: Arc::new(AtomicBool::new(false)),
        };
        debug!("[JOB] Dispatcher created for {} ports", port_count);

        Ok((
            Self {
                ports,
                services,
                sender,
                receiver,
                internal,
                api,
                outbox: Outbox::new(),
            },
            handle,
        ))
    }

    /// Runs queued jobs, including the ones they raise, until the queue is
    /// empty. Returns the number of jobs executed.
    pub fn run_until_idle(&mut self) -> usize {
        let mut executed = 0;
        while let Ok(envelope) = self.receiver.try_recv() {
            match envelope {
                Envelope::Job(job) => {
                    self.process(job);
                    executed += 1;
                }
                Envelope::Exit => break,
            }
        }
        executed
    }

    /// Worker loop. Returns the dispatcher once the exit sentinel arrives or
    /// every producer is gone.
    ///
    /// A producer that passed the closed check just before `close` may have
    /// queued its job behind the sentinel. Such jobs still run, so every
    /// accepted job is executed.
    pub fn run(mut self) -> Self {
        info!("[JOB] Worker started");
        while let Ok(Envelope::Job(job)) = self.receiver.recv() {
            self.process(job);
        }
        let late = self.run_until_idle();
        if late > 0 {
            debug!("[JOB] {} jobs queued behind exit", late);
        }
        info!("[JOB] Worker stopped");
        self
    }

    fn process(&mut self, job: Job) {
        let Job { port, kind, slot } = job;
        trace!("[JOB] Port {}: running {}", port, kind.name());

        let port_count = self.ports.len() as u8;
        match self.ports.get_mut(port.index()) {
            Some(state) => {
                let mut ctx = Context::new(state, &mut self.services, &mut self.outbox, port_count);
                kind.execute(&mut ctx);
            }
            None => error!("[JOB] Port {}: no such port, dropping {}", port, kind.name()),
        }

        match slot.pool() {
            PoolKind::Internal => self.internal.release(slot),
            PoolKind::Api => self.api.release(slot),
        }
        self.flush_outbox();
    }

    /// Submits the jobs raised by the job that just ran.
    fn flush_outbox(&mut self) {
        for (port, kind) in self.outbox.drain() {
            let Ok(slot) = self.internal.acquire() else {
                error!("[JOB] Port {}: dropping {}", port, kind.name());
                continue;
            };
            // A rejected job is logged and its slot returned by `submit`.
            let _ = submit(&self.sender, &self.internal, Job { port, kind, slot });
        }
    }

    pub fn port(&self, port: u8) -> Option<&Port> {
        self.ports.get(PortNumber(port).index()).filter(|_| port != 0)
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn services(&self) -> &S {
        &self.services
    }

    pub fn services_mut(&mut self) -> &mut S {
        &mut self.services
    }

    pub fn into_services(self) -> S {
        self.services
    }

    /// Free job records in a pool.
    pub fn available_jobs(&self, pool: PoolKind) -> usize {
        match pool {
            PoolKind::Internal => self.internal.available(),
            PoolKind::Api => self.api.available(),
        }
    }
}

/// Cloneable producer side of the dispatcher.
///
/// SMI requests are taken from the API pool, lower-layer indications from
/// the internal pool. No call ever blocks.
#[derive(Debug, Clone)]
pub struct MasterHandle {
    sender: Sender<Envelope>,
    internal: JobPool,
    api: JobPool,
    port_count: u8,
    closed: Arc<AtomicBool>,
}

impl MasterHandle {
    pub fn port_count(&self) -> u8 {
        self.port_count
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Rejects further jobs and queues the exit sentinel behind the pending
    /// ones. Blocks while the queue is full.
    pub(crate) fn close(&self) {
        self.closed.store(true, Ordering::Release);
        if self.sender.send(Envelope::Exit).is_err() {
            debug!("[JOB] Worker already gone");
        }
    }

    fn post(&self, pool: PoolKind, port: u8, kind: JobKind) -> Result<(), IolinkError> {
        if self.is_closed() {
            return Err(IolinkError::StateInvalid);
        }
        if port == 0 || port > self.port_count {
            return Err(IolinkError::InvalidPort(port));
        }
        let pool = match pool {
            PoolKind::Internal => &self.internal,
            PoolKind::Api => &self.api,
        };
        let slot = pool.acquire()?;
        submit(
            &self.sender,
            pool,
            Job {
                port: PortNumber(port),
                kind,
                slot,
            },
        )
    }

    fn smi(&self, port: u8, service: SmiService, request: SmiRequest) -> Result<(), IolinkError> {
        self.post(PoolKind::Api, port, JobKind::Smi { service, request })
    }

    // --- SMI services ---

    pub fn smi_master_identification(&self, port: u8, request: SmiRequest) -> Result<(), IolinkError> {
        self.smi(port, SmiService::MasterIdentification, request)
    }

    pub fn smi_port_configuration(&self, port: u8, request: SmiRequest) -> Result<(), IolinkError> {
        self.smi(port, SmiService::PortConfiguration, request)
    }

    pub fn smi_readback_port_configuration(
        &self,
        port: u8,
        request: SmiRequest,
    ) -> Result<(), IolinkError> {
        self.smi(port, SmiService::ReadbackPortConfiguration, request)
    }

    pub fn smi_port_status(&self, port: u8, request: SmiRequest) -> Result<(), IolinkError> {
        self.smi(port, SmiService::PortStatus, request)
    }

    pub fn smi_par_serv_to_ds(&self, port: u8, request: SmiRequest) -> Result<(), IolinkError> {
        self.smi(port, SmiService::ParServToDs, request)
    }

    pub fn smi_ds_to_par_serv(&self, port: u8, request: SmiRequest) -> Result<(), IolinkError> {
        self.smi(port, SmiService::DsToParServ, request)
    }

    // --- Lower layer indications ---

    /// SM_PortMode_ind
    pub fn sm_port_mode_ind(&self, port: u8, mode: SmPortMode) -> Result<(), IolinkError> {
        self.post(PoolKind::Internal, port, JobKind::SmPortModeInd { mode })
    }

    /// AL_Read_cnf for a read issued by Data Storage.
    pub fn al_read_cnf(
        &self,
        port: u8,
        data: &[u8],
        errortype: SmiErrorType,
    ) -> Result<(), IolinkError> {
        let data = heapless::Vec::from_slice(data).map_err(|_| IolinkError::BufferTooShort)?;
        self.post(PoolKind::Internal, port, JobKind::AlReadCnf { data, errortype })
    }

    /// AL_Write_cnf for a write issued by Data Storage.
    pub fn al_write_cnf(&self, port: u8, errortype: SmiErrorType) -> Result<(), IolinkError> {
        self.post(PoolKind::Internal, port, JobKind::AlWriteCnf { errortype })
    }

    /// DS_Upload: the device requested a parameter upload.
    pub fn ds_upload(&self, port: u8) -> Result<(), IolinkError> {
        self.post(PoolKind::Internal, port, JobKind::DsUpload)
    }

    /// DS_Change: the stored parameters changed outside of a transfer.
    pub fn ds_change(&self, port: u8) -> Result<(), IolinkError> {
        self.post(PoolKind::Internal, port, JobKind::DsChange)
    }

    /// New cyclic input data from Process Data.
    pub fn pd_event(&self, port: u8, data: &[u8]) -> Result<(), IolinkError> {
        let data = heapless::Vec::from_slice(data).map_err(|_| IolinkError::BufferTooShort)?;
        self.post(PoolKind::Internal, port, JobKind::PdEvent { data })
    }
}
