// crates/iolink-rs/src/job.rs
//! Job payloads and their dispatch onto the port state machines.
//!
//! A job is the only way work reaches a port: every lower-layer indication,
//! every SMI request and every CM <-> DS notification is turned into a
//! `JobKind` and executed by the single worker, one at a time.

use crate::cm;
use crate::ds;
use crate::port::Context;
use crate::smi::{PortConfig, SmiErrorType, SmiRequest, SmiService};
use crate::types::{DsFault, ISDU_MAX_DATA, PD_MAX_SIZE, PortNumber, SmPortMode};
use alloc::vec::Vec;

/// Payload of a job, one variant per job type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobKind {
    /// SM_PortMode_ind, consumed by CM.
    SmPortModeInd { mode: SmPortMode },
    /// DS_Ready, consumed by CM.
    DsReady,
    /// DS_Change, consumed by CM.
    DsChange,
    /// DS_Fault, consumed by CM.
    DsFault { fault: DsFault },
    /// DS_Startup, consumed by DS.
    DsStartup,
    /// DS_Delete, consumed by DS.
    DsDelete,
    /// DS_Init, consumed by DS.
    DsInit { cfg: PortConfig },
    /// DS_Upload (device requested an upload), consumed by DS.
    DsUpload,
    /// AL_Read_cnf for a read issued by DS.
    AlReadCnf {
        data: heapless::Vec<u8, ISDU_MAX_DATA>,
        errortype: SmiErrorType,
    },
    /// AL_Write_cnf for a write issued by DS.
    AlWriteCnf { errortype: SmiErrorType },
    /// New process input data, forwarded to the SMI listener.
    PdEvent { data: heapless::Vec<u8, PD_MAX_SIZE> },
    /// An SMI service request.
    Smi {
        service: SmiService,
        request: SmiRequest,
    },
}

impl JobKind {
    /// Short name used in trace output.
    pub fn name(&self) -> &'static str {
        match self {
            JobKind::SmPortModeInd { .. } => "SM_PORT_MODE_IND",
            JobKind::DsReady => "DS_READY",
            JobKind::DsChange => "DS_CHANGE",
            JobKind::DsFault { .. } => "DS_FAULT",
            JobKind::DsStartup => "DS_STARTUP",
            JobKind::DsDelete => "DS_DELETE",
            JobKind::DsInit { .. } => "DS_INIT",
            JobKind::DsUpload => "DS_UPLOAD",
            JobKind::AlReadCnf { .. } => "AL_READ_CNF",
            JobKind::AlWriteCnf { .. } => "AL_WRITE_CNF",
            JobKind::PdEvent { .. } => "PD_EVENT",
            JobKind::Smi { .. } => "SMI",
        }
    }

    /// Runs the job against its port.
    pub fn execute(self, ctx: &mut Context<'_>) {
        match self {
            JobKind::SmPortModeInd { mode } => cm::sm_port_mode_ind(ctx, mode),
            JobKind::DsReady => cm::ds_ready(ctx),
            JobKind::DsChange => cm::ds_change(ctx),
            JobKind::DsFault { fault } => cm::ds_fault(ctx, fault),
            JobKind::DsStartup => ds::startup(ctx),
            JobKind::DsDelete => ds::delete(ctx),
            JobKind::DsInit { cfg } => ds::init(ctx, &cfg),
            JobKind::DsUpload => ds::upload(ctx),
            JobKind::AlReadCnf { data, errortype } => ds::al_read_cnf(ctx, &data, errortype),
            JobKind::AlWriteCnf { errortype } => ds::al_write_cnf(ctx, errortype),
            JobKind::PdEvent { data } => {
                let port = ctx.port_number();
                ctx.services.pd_ind(port, &data);
            }
            JobKind::Smi { service, request } => match service {
                SmiService::MasterIdentification => cm::smi_master_identification(ctx, &request),
                SmiService::PortConfiguration => cm::smi_port_configuration(ctx, request),
                SmiService::ReadbackPortConfiguration => {
                    cm::smi_readback_port_configuration(ctx, &request)
                }
                SmiService::PortStatus => cm::smi_port_status(ctx, &request),
                SmiService::ParServToDs => ds::smi_par_serv_to_ds(ctx, &request),
                SmiService::DsToParServ => ds::smi_ds_to_par_serv(ctx, &request),
            },
        }
    }
}

/// Internal jobs raised while a job executes.
///
/// State machine actions never touch the queue themselves. They post into
/// the outbox and the dispatcher submits the collected jobs, in posting
/// order, on the internal pool once the running job has finished.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<(PortNumber, JobKind)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&mut self, port: PortNumber, kind: JobKind) {
        self.pending.push((port, kind));
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Removes all posted jobs in posting order.
    pub fn drain(&mut self) -> impl Iterator<Item = (PortNumber, JobKind)> + '_ {
        self.pending.drain(..)
    }
}
