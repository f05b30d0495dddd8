// crates/iolink-rs/src/cm/mod.rs
//! Configuration Manager (CM): brings a port into the mode requested through
//! SMI_PortConfiguration and coordinates System Management with Data
//! Storage while doing so.

pub mod events;
mod smi;
pub mod state_machine;
pub mod states;

pub use events::CmEvent;
pub use smi::{
    smi_master_identification, smi_port_configuration, smi_port_status,
    smi_readback_port_configuration,
};
pub use state_machine::{CmAction, ConfigManager, sm_parameters};
pub use states::CmState;

use crate::fsm::StateMachine;
use crate::port::Context;
use crate::smi::{EventCode, PortConfig, SmiRequest};
use crate::types::{DsFault, PortStatus, SmPortMode};
use log::trace;

/// Per-port state of the Configuration Manager.
#[derive(Debug, Clone, Default)]
pub struct CmContext {
    pub(crate) state: CmState,
    /// The SMI_PortConfiguration request being applied.
    pub(crate) last_request: Option<SmiRequest>,
    /// The configuration in effect.
    pub(crate) cfg: PortConfig,
    /// Fault carried by the last DS_Fault.
    pub(crate) ds_fault: DsFault,
}

impl CmContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CmState {
        self.state
    }

    pub fn config(&self) -> &PortConfig {
        &self.cfg
    }

    pub fn ds_fault(&self) -> DsFault {
        self.ds_fault
    }
}

/// SM_PortMode_ind from System Management.
pub fn sm_port_mode_ind(ctx: &mut Context<'_>, mode: SmPortMode) {
    let event = match mode {
        SmPortMode::ComReady => CmEvent::SmComReady,
        SmPortMode::Operate => CmEvent::SmOperate,
        SmPortMode::ComLost => CmEvent::SmComLost,
        SmPortMode::RevisionFault
        | SmPortMode::CompatibilityFault
        | SmPortMode::SerialNumberFault
        | SmPortMode::CycleTimeFault => CmEvent::SmFault,
        SmPortMode::Inactive => {
            if ctx.port.info.port_status_info != PortStatus::Deactivated {
                ctx.port.info.port_status_info = PortStatus::Deactivated;
                ConfigManager::new(ctx).port_event(EventCode::PORT_STATUS_CHANGE);
            }
            return;
        }
        SmPortMode::DigitalInput | SmPortMode::DigitalOutput => {
            trace!("[CM] Port {}: ignoring SM mode {:?}", ctx.port_number(), mode);
            return;
        }
    };
    ConfigManager::new(ctx).fire(event);
}

/// DS_Ready from Data Storage.
pub fn ds_ready(ctx: &mut Context<'_>) {
    ConfigManager::new(ctx).fire(CmEvent::DsReady);
}

/// DS_Change from Data Storage.
pub fn ds_change(ctx: &mut Context<'_>) {
    ConfigManager::new(ctx).fire(CmEvent::DsChange);
}

/// DS_Fault from Data Storage.
pub fn ds_fault(ctx: &mut Context<'_>, fault: DsFault) {
    ctx.port.cm.ds_fault = fault;
    ConfigManager::new(ctx).fire(CmEvent::DsFault);
}
