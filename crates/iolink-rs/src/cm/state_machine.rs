// crates/iolink-rs/src/cm/state_machine.rs
use super::events::CmEvent;
use super::states::CmState;
use crate::ds;
use crate::fsm::{StateMachine, Transition};
use crate::hal::SmParameterList;
use crate::job::JobKind;
use crate::log::{PortLogContext, port_info, port_warn};
use crate::port::Context;
use crate::smi::{ArgBlock, ArgBlockId, DiagEntry, EventCode, PortConfig, SmiErrorType};
use crate::types::{
    DsFault, IOLINK_REVISION_1_0, IOLINK_REVISION_1_1, InspectionLevel, PORT_QUALITY_INFO_INVALID,
    PORT_QUALITY_INFO_VALID, PortMode, PortNumber, PortStatus, SmTargetMode, TransmissionRate,
    ValidationCheck,
};

/// Actions attached to the CM transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmAction {
    CheckMode,
    Startup,
    Dido,
    Deactivate,
    ComLost,
    StartDs,
    DsReady,
    DsChange,
    SmOperate,
    PortFault,
    /// Logged and dropped while DS owns the device.
    CfgChangeIgnore,
    /// Logged and dropped while DS owns the device.
    ComLostIgnore,
    /// A repeated DS_Ready in Port_Active.
    DsReadyIgnore,
}

type Row = Transition<CmState, CmEvent, CmAction>;

const fn row(event: CmEvent, next: CmState, action: CmAction) -> Row {
    Transition::new(event, next, action)
}

// (Reference: IO-Link Interface Spec v1.1.3, Table 91)
// DS_ParamManager deviates from the table on purpose: a configuration change
// or COMLOST must not abort a running backup transfer, DS reports the
// outcome itself.

const CHECK_PORT_MODE: &[Row] = &[
    row(CmEvent::IolManual, CmState::SmStartup, CmAction::Startup), // T1
    row(CmEvent::IolAutostart, CmState::SmStartup, CmAction::Startup), // T2
    row(CmEvent::DiCq, CmState::PortDido, CmAction::Dido),          // T9
    row(CmEvent::DoCq, CmState::PortDido, CmAction::Dido),          // T10
    row(CmEvent::Deactivated, CmState::PortDeactivated, CmAction::Deactivate), // T11
    row(CmEvent::Unknown, CmState::PortDeactivated, CmAction::Deactivate), // T12
    row(CmEvent::CfgChange, CmState::CheckPortMode, CmAction::CheckMode),
    row(CmEvent::SmComLost, CmState::CheckPortMode, CmAction::ComLost),
];

const SM_STARTUP: &[Row] = &[
    row(CmEvent::SmComReady, CmState::DsParamManager, CmAction::StartDs), // T3
    row(CmEvent::CfgChange, CmState::CheckPortMode, CmAction::CheckMode), // T13
    row(CmEvent::SmFault, CmState::PortFault, CmAction::PortFault),       // T4
    row(CmEvent::SmComLost, CmState::CheckPortMode, CmAction::ComLost),   // T15
];

const DS_PARAM_MANAGER: &[Row] = &[
    row(CmEvent::DsReady, CmState::WaitingOnOperate, CmAction::DsReady), // T5
    row(CmEvent::DsChange, CmState::SmStartup, CmAction::DsChange),      // T14
    row(CmEvent::DsFault, CmState::PortFault, CmAction::PortFault),      // T6
    row(CmEvent::CfgChange, CmState::DsParamManager, CmAction::CfgChangeIgnore),
    row(CmEvent::SmComLost, CmState::DsParamManager, CmAction::ComLostIgnore),
];

const PORT_FAULT: &[Row] = &[
    row(CmEvent::CfgChange, CmState::CheckPortMode, CmAction::CheckMode), // T13
    row(CmEvent::DsChange, CmState::SmStartup, CmAction::DsChange),       // T14
    row(CmEvent::SmComLost, CmState::CheckPortMode, CmAction::ComLost),   // T15
];

const WAITING_ON_OPERATE: &[Row] = &[
    row(CmEvent::SmOperate, CmState::PortActive, CmAction::SmOperate), // T7
    row(CmEvent::CfgChange, CmState::CheckPortMode, CmAction::CheckMode), // T13
    row(CmEvent::DsChange, CmState::SmStartup, CmAction::DsChange),    // T14
    row(CmEvent::SmComLost, CmState::CheckPortMode, CmAction::ComLost), // T15
    row(CmEvent::DsFault, CmState::PortFault, CmAction::PortFault),
];

const PORT_ACTIVE: &[Row] = &[
    row(CmEvent::CfgChange, CmState::CheckPortMode, CmAction::CheckMode), // T13
    row(CmEvent::DsChange, CmState::SmStartup, CmAction::DsChange),       // T14
    row(CmEvent::SmComLost, CmState::CheckPortMode, CmAction::ComLost),   // T15
    row(CmEvent::DsReady, CmState::PortActive, CmAction::DsReadyIgnore),
    row(CmEvent::DsFault, CmState::PortFault, CmAction::PortFault),
];

const PORT_DIDO: &[Row] = &[
    row(CmEvent::CfgChange, CmState::CheckPortMode, CmAction::CheckMode), // T13
];

const PORT_DEACTIVATED: &[Row] = &[
    row(CmEvent::CfgChange, CmState::CheckPortMode, CmAction::CheckMode), // T13
];

pub fn transitions(state: CmState) -> &'static [Row] {
    match state {
        CmState::CheckPortMode => CHECK_PORT_MODE,
        CmState::SmStartup => SM_STARTUP,
        CmState::DsParamManager => DS_PARAM_MANAGER,
        CmState::PortFault => PORT_FAULT,
        CmState::WaitingOnOperate => WAITING_ON_OPERATE,
        CmState::PortActive => PORT_ACTIVE,
        CmState::PortDido => PORT_DIDO,
        CmState::PortDeactivated => PORT_DEACTIVATED,
    }
}

/// Maps a validated configuration onto the parameters SM expects.
pub fn sm_parameters(cfg: &PortConfig) -> SmParameterList {
    let (inspection_level, revision_id) = match cfg.validation_backup {
        ValidationCheck::NoCheck => (InspectionLevel::NoCheck, 0),
        ValidationCheck::V10 => (InspectionLevel::Identical, IOLINK_REVISION_1_0),
        ValidationCheck::V11 | ValidationCheck::V11BackupRestore | ValidationCheck::V11Restore => {
            (InspectionLevel::TypeCompatible, IOLINK_REVISION_1_1)
        }
    };

    SmParameterList {
        mode: SmTargetMode::from(cfg.port_mode),
        inspection_level,
        revision_id,
        cycle_time: cfg.port_cycle_time,
        vendor_id: cfg.vendor_id,
        device_id: cfg.device_id,
    }
}

/// The Configuration Manager of one port, borrowed for the duration of a job.
pub struct ConfigManager<'c, 'a> {
    ctx: &'c mut Context<'a>,
}

impl<'c, 'a> ConfigManager<'c, 'a> {
    pub fn new(ctx: &'c mut Context<'a>) -> Self {
        Self { ctx }
    }

    fn log_ctx(&self) -> PortLogContext {
        PortLogContext::new(Self::NAME, self.ctx.port_number())
    }

    /// Sends an SMI_PortEvent_ind raised by the master itself.
    pub(super) fn port_event(&mut self, code: EventCode) {
        let block = ArgBlock::PortEvent(DiagEntry::master_notification(code));
        self.ctx.smi_cnf(ArgBlockId::VOID_BLOCK, &block);
    }

    fn set_port_config(&mut self, ds_init: bool) {
        let port = self.ctx.port_number();
        let cfg = self.ctx.port.cm.cfg;
        let mut params = sm_parameters(&cfg);

        if ds_init {
            self.ctx.post(JobKind::DsInit { cfg });
        } else {
            params.mode = SmTargetMode::CfgCom;
        }
        self.ctx.services.sm_set_port_config(port, &params);
    }

    fn init_port_info(&mut self, status: PortStatus, quality: u8) {
        let port = self.ctx.port_number();
        let real = self.ctx.services.sm_real_parameters(port);
        let rate = self.ctx.services.sm_transmission_rate(port);
        let info = &mut self.ctx.port.info;

        info.port_status_info = status;
        if status != PortStatus::Deactivated {
            info.revision_id = real.revision_id;
            info.transmission_rate = rate;
            info.vendor_id = real.vendor_id;
            info.device_id = real.device_id;
        } else {
            info.revision_id = 0;
            info.transmission_rate = TransmissionRate::NotDetected;
            info.vendor_id = 0;
            info.device_id = 0;
            info.cycle_time = 0;
        }
        info.port_quality_info = quality;
        if status == PortStatus::PreOperate {
            info.cycle_time = real.cycle_time;
        }
    }

    /// Applies the configuration carried by the last SMI_PortConfiguration.
    fn check_mode(&mut self, event: CmEvent) -> Option<CmEvent> {
        if event != CmEvent::CfgChange {
            return None;
        }
        let Some(request) = self.ctx.port.cm.last_request.take() else {
            port_warn!(self.log_ctx(), "configuration change without request");
            return None;
        };
        let parsed = match &request.arg_block {
            ArgBlock::PortConfigList(list) => PortConfig::try_from(list).ok(),
            _ => None,
        };
        let mode_event = match parsed.map(|cfg| cfg.port_mode) {
            Some(PortMode::IolManual) => CmEvent::IolManual,
            Some(PortMode::IolAutostart) => CmEvent::IolAutostart,
            Some(PortMode::DiCq) => CmEvent::DiCq,
            Some(PortMode::DoCq) => CmEvent::DoCq,
            Some(PortMode::Deactive) => CmEvent::Deactivated,
            None => CmEvent::Unknown,
        };

        let port = self.ctx.port_number();
        self.ctx.services.pd_stop(port);
        self.ctx.services.od_stop(port);

        let ref_id = request.ref_arg_block_id();
        match parsed {
            Some(cfg) => {
                self.ctx.port.cm.cfg = cfg;
                self.ctx.voidblock_cnf(ref_id);
            }
            None => {
                self.ctx.joberror_ind(
                    request.exp_arg_block_id,
                    ref_id,
                    SmiErrorType::ArgBlockInconsistent,
                );
            }
        }
        Some(mode_event)
    }

    fn startup(&mut self, event: CmEvent) -> Option<CmEvent> {
        let port = &self.ctx.port;
        if event == CmEvent::IolAutostart || !ds::check_config(&port.ds, &port.cm.cfg) {
            self.ctx.post(JobKind::DsDelete);
        }
        self.set_port_config(true);
        None
    }

    fn dido(&mut self, event: CmEvent) -> Option<CmEvent> {
        let info = &mut self.ctx.port.info;
        info.port_status_info = if event == CmEvent::DiCq {
            PortStatus::DigitalInput
        } else {
            PortStatus::DigitalOutput
        };
        info.revision_id = 0;
        info.transmission_rate = TransmissionRate::NotDetected;
        info.vendor_id = 0;
        info.device_id = 0;
        info.port_quality_info = PORT_QUALITY_INFO_INVALID;

        self.ctx.post(JobKind::DsDelete);
        self.set_port_config(true);
        None
    }

    fn port_fault(&mut self, event: CmEvent) -> Option<CmEvent> {
        let fault = self.ctx.port.cm.ds_fault;
        let code = if event == CmEvent::DsFault {
            match fault {
                DsFault::ComErr => return Some(CmEvent::SmComLost),
                DsFault::Id => EventCode::BACKUP_INCON_ID,
                DsFault::Size => EventCode::BACKUP_INCON_SIZE,
                DsFault::Lock => EventCode::BACKUP_INCON,
                DsFault::Up => EventCode::BACKUP_INCON_UL,
                DsFault::Down => EventCode::BACKUP_INCON_DL,
                DsFault::None => EventCode::BAD_DID,
            }
        } else {
            EventCode::BAD_DID
        };

        self.init_port_info(PortStatus::PortDiag, PORT_QUALITY_INFO_INVALID);
        self.port_event(code);
        None
    }

    fn deactivate(&mut self, event: CmEvent) -> Option<CmEvent> {
        let port = self.ctx.port_number();
        self.init_port_info(PortStatus::Deactivated, PORT_QUALITY_INFO_INVALID);
        if event == CmEvent::Unknown {
            self.ctx.post(JobKind::DsDelete);
        }
        let params = SmParameterList {
            mode: SmTargetMode::Inactive,
            ..SmParameterList::default()
        };
        self.ctx.services.sm_set_port_config(port, &params);
        None
    }

    fn sm_operate(&mut self) -> Option<CmEvent> {
        let port = self.ctx.port_number();
        self.init_port_info(PortStatus::Operate, PORT_QUALITY_INFO_VALID);
        self.ctx.services.od_start(port);
        self.ctx.services.pd_start(port);
        self.port_event(EventCode::PORT_STATUS_CHANGE);
        None
    }
}

impl StateMachine for ConfigManager<'_, '_> {
    type State = CmState;
    type Event = CmEvent;
    type Action = CmAction;
    const NAME: &'static str = "CM";

    fn port(&self) -> PortNumber {
        self.ctx.port_number()
    }

    fn current_state(&self) -> CmState {
        self.ctx.port.cm.state
    }

    fn set_state(&mut self, state: CmState) {
        self.ctx.port.cm.state = state;
    }

    fn transitions(state: CmState) -> &'static [Row] {
        transitions(state)
    }

    fn perform(&mut self, action: CmAction, event: CmEvent) -> Option<CmEvent> {
        match action {
            CmAction::CheckMode => self.check_mode(event),
            CmAction::Startup => self.startup(event),
            CmAction::Dido => self.dido(event),
            CmAction::Deactivate => self.deactivate(event),
            CmAction::ComLost => {
                self.ctx.port.info.port_status_info = PortStatus::NoDevice;
                self.port_event(EventCode::NO_DEV);
                self.check_mode(event)
            }
            CmAction::StartDs => {
                self.init_port_info(PortStatus::PreOperate, PORT_QUALITY_INFO_INVALID);
                self.ctx.post(JobKind::DsStartup);
                None
            }
            CmAction::DsReady => {
                let port = self.ctx.port_number();
                self.ctx.services.sm_operate(port);
                None
            }
            CmAction::DsChange => {
                // OD and PD stay running; reaching Operate again restarts
                // them without a stop in between.
                self.set_port_config(false);
                None
            }
            CmAction::SmOperate => self.sm_operate(),
            CmAction::PortFault => self.port_fault(event),
            CmAction::CfgChangeIgnore => {
                port_warn!(self.log_ctx(), "configuration change ignored in DS_ParamManager");
                None
            }
            CmAction::ComLostIgnore => {
                port_warn!(self.log_ctx(), "COMLOST ignored in DS_ParamManager");
                None
            }
            CmAction::DsReadyIgnore => {
                port_info!(self.log_ctx(), "DS_Ready ignored in Port_Active");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::lookup;

    #[test]
    fn test_ds_param_manager_keeps_state_on_disruptions() {
        for event in [CmEvent::CfgChange, CmEvent::SmComLost] {
            let row = lookup(transitions(CmState::DsParamManager), event).unwrap();
            assert_eq!(row.next_state, CmState::DsParamManager);
        }
    }

    #[test]
    fn test_configuration_change_is_accepted_everywhere() {
        for state in [
            CmState::CheckPortMode,
            CmState::SmStartup,
            CmState::PortFault,
            CmState::WaitingOnOperate,
            CmState::PortActive,
            CmState::PortDido,
            CmState::PortDeactivated,
        ] {
            let row = lookup(transitions(state), CmEvent::CfgChange).unwrap();
            assert_eq!(row.action, CmAction::CheckMode, "{state:?}");
        }
    }

    #[test]
    fn test_sm_parameters_from_configuration() {
        let cfg = PortConfig {
            port_mode: PortMode::IolManual,
            validation_backup: ValidationCheck::V11Restore,
            port_cycle_time: 0x40,
            vendor_id: 0x0123,
            device_id: 0x00ABCDEF,
            ..PortConfig::default()
        };
        let params = sm_parameters(&cfg);
        assert_eq!(params.mode, SmTargetMode::CfgCom);
        assert_eq!(params.inspection_level, InspectionLevel::TypeCompatible);
        assert_eq!(params.revision_id, IOLINK_REVISION_1_1);
        assert_eq!((params.cycle_time, params.vendor_id, params.device_id), (0x40, 0x0123, 0x00ABCDEF));

        let v10 = sm_parameters(&PortConfig {
            validation_backup: ValidationCheck::V10,
            ..cfg
        });
        assert_eq!((v10.inspection_level, v10.revision_id), (InspectionLevel::Identical, 0x10));

        let none = sm_parameters(&PortConfig::default());
        assert_eq!((none.mode, none.inspection_level, none.revision_id), (SmTargetMode::Inactive, InspectionLevel::NoCheck, 0));
    }
}
