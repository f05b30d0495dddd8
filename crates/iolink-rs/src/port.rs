// crates/iolink-rs/src/port.rs
use crate::cm::CmContext;
use crate::ds::DsContext;
use crate::hal::PortServices;
use crate::job::{JobKind, Outbox};
use crate::smi::{ArgBlock, ArgBlockId, JobError, SmiErrorType};
use crate::types::{PORT_QUALITY_INFO_INVALID, PortNumber, PortStatus, TransmissionRate};
use log::trace;

/// What the master knows about the device on a port, as reported in the
/// PortStatusList.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortInfo {
    pub port_status_info: PortStatus,
    pub port_quality_info: u8,
    pub revision_id: u8,
    pub transmission_rate: TransmissionRate,
    pub vendor_id: u16,
    pub device_id: u32,
    pub cycle_time: u8,
}

impl Default for PortInfo {
    fn default() -> Self {
        Self {
            port_status_info: PortStatus::Deactivated,
            port_quality_info: PORT_QUALITY_INFO_INVALID,
            revision_id: 0,
            transmission_rate: TransmissionRate::NotDetected,
            vendor_id: 0,
            device_id: 0,
            cycle_time: 0,
        }
    }
}

/// One physical port with the private state of every sub-stack running on it.
#[derive(Debug)]
pub struct Port {
    number: PortNumber,
    pub(crate) info: PortInfo,
    pub(crate) cm: CmContext,
    pub(crate) ds: DsContext,
}

impl Port {
    pub fn new(number: PortNumber) -> Self {
        Self {
            number,
            info: PortInfo::default(),
            cm: CmContext::new(),
            ds: DsContext::new(),
        }
    }

    pub fn number(&self) -> PortNumber {
        self.number
    }

    pub fn info(&self) -> &PortInfo {
        &self.info
    }

    pub fn cm(&self) -> &CmContext {
        &self.cm
    }

    pub fn ds(&self) -> &DsContext {
        &self.ds
    }
}

/// Everything a job may touch while it runs: its port, the collaborators and
/// the outbox for follow-up jobs.
pub struct Context<'a> {
    pub port: &'a mut Port,
    pub services: &'a mut dyn PortServices,
    pub outbox: &'a mut Outbox,
    /// Number of ports of the master this port belongs to.
    pub port_count: u8,
}

impl<'a> Context<'a> {
    pub fn new(
        port: &'a mut Port,
        services: &'a mut dyn PortServices,
        outbox: &'a mut Outbox,
        port_count: u8,
    ) -> Self {
        Self {
            port,
            services,
            outbox,
            port_count,
        }
    }

    pub fn port_number(&self) -> PortNumber {
        self.port.number
    }

    /// Queues an internal job for this port.
    pub fn post(&mut self, kind: JobKind) {
        trace!("[JOB] Port {}: posting {}", self.port.number, kind.name());
        self.outbox.post(self.port.number, kind);
    }

    /// Sends a confirmation or indication across the SMI boundary.
    pub fn smi_cnf(&mut self, ref_arg_block_id: ArgBlockId, arg_block: &ArgBlock) {
        let port = self.port.number;
        self.services.smi_cnf(port, ref_arg_block_id, arg_block);
    }

    /// Positive confirmation without payload.
    pub fn voidblock_cnf(&mut self, ref_arg_block_id: ArgBlockId) {
        self.smi_cnf(ref_arg_block_id, &ArgBlock::Void);
    }

    /// Negative confirmation carrying a job-error block.
    pub fn joberror_ind(
        &mut self,
        exp_arg_block_id: ArgBlockId,
        ref_arg_block_id: ArgBlockId,
        error: SmiErrorType,
    ) {
        let block = ArgBlock::JobError(JobError {
            exp_arg_block_id,
            error,
        });
        self.smi_cnf(ref_arg_block_id, &block);
    }
}
