// crates/iolink-rs/src/ds/state_machine.rs
use super::dataset::DsCommand;
use super::events::DsEvent;
use super::states::DsState;
use super::DsContext;
use crate::fsm::{StateMachine, Transition};
use crate::job::JobKind;
use crate::log::{PortLogContext, port_debug, port_error, port_trace};
use crate::port::Context;
use crate::types::{
    DS_PARAM_INDEX, DS_PARAM_SUBINDEX_CHECKSUM, DS_PARAM_SUBINDEX_CMD,
    DS_PARAM_SUBINDEX_INDEX_LIST, DS_PARAM_SUBINDEX_SIZE, DS_PARAM_SUBINDEX_STATE,
    DS_STATE_PROPERTY_STATE_LOCKED, DS_STATE_PROPERTY_STATE_MASK, DS_STATE_PROPERTY_UPLOAD_REQ,
    DsFault,
};

/// Actions attached to the DS transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsAction {
    /// Transition without side effects.
    NoOp,
    WaitDsActivity,
    Reinit,
    Delete,
    Off,
    CheckIdentity,
    CheckMemSize,
    CheckUpload,
    CheckValidity,
    CheckChecksum,
    Upload,
    ReadParameter,
    StoreData,
    InitDownload,
    DecomposeSet,
    WriteParameter,
    DownloadDone,
    Ready,
    UploadFault,
    DownloadFault,
    Fault,
}

type Row = Transition<DsState, DsEvent, DsAction>;

const fn row(event: DsEvent, next: DsState, action: DsAction) -> Row {
    Transition::new(event, next, action)
}

// (Reference: IO-Link Interface Spec v1.1.3, Table 104)
// Rows are matched first to last.

const CHECK_ACTIVATION_STATE: &[Row] = &[
    row(DsEvent::Enable, DsState::WaitingOnDsActivity, DsAction::WaitDsActivity), // T1
    row(DsEvent::ClrDisa, DsState::Off, DsAction::Off),                           // T7
    row(DsEvent::Delete, DsState::CheckActivationState, DsAction::Delete),
    row(DsEvent::Init, DsState::CheckActivationState, DsAction::Reinit),
];

const WAITING_ON_DS_ACTIVITY: &[Row] = &[
    row(DsEvent::Startup, DsState::CheckIdentity, DsAction::CheckIdentity), // T2
    row(DsEvent::Upload, DsState::CheckIdentity, DsAction::CheckIdentity),  // T4
    row(DsEvent::Delete, DsState::WaitingOnDsActivity, DsAction::Delete),   // T9
    row(DsEvent::Clear, DsState::Off, DsAction::NoOp),                      // T11
    row(DsEvent::Disable, DsState::Off, DsAction::NoOp),                    // T12
    row(DsEvent::Init, DsState::CheckActivationState, DsAction::Reinit),
];

const OFF: &[Row] = &[
    row(DsEvent::EnableCom, DsState::CheckIdentity, DsAction::NoOp), // T6
    row(DsEvent::EnableNoC, DsState::WaitingOnDsActivity, DsAction::NoOp), // T8
    row(DsEvent::Delete, DsState::Off, DsAction::Delete),            // T10
    row(DsEvent::Upload, DsState::Off, DsAction::Off),               // T13
    row(DsEvent::Startup, DsState::Off, DsAction::Off),              // T14
    row(DsEvent::Init, DsState::CheckActivationState, DsAction::Reinit),
];

const CHECK_IDENTITY: &[Row] = &[
    row(DsEvent::Passed, DsState::CheckMemSize, DsAction::CheckMemSize), // T16
    row(DsEvent::FaultId, DsState::DsFault, DsAction::Fault),            // T15
    row(DsEvent::Init, DsState::CheckActivationState, DsAction::Reinit),
];

const CHECK_MEM_SIZE: &[Row] = &[
    row(DsEvent::Passed, DsState::CheckUpload, DsAction::CheckUpload), // T18
    row(DsEvent::FaultSize, DsState::DsFault, DsAction::Fault),        // T17
    row(DsEvent::Init, DsState::CheckActivationState, DsAction::Reinit),
];

const CHECK_UPLOAD: &[Row] = &[
    row(DsEvent::DoUpload, DsState::DecomposeIl, DsAction::Upload), // T19
    row(DsEvent::NoUpload, DsState::CheckDsValidity, DsAction::CheckValidity), // T20, T43
    row(DsEvent::FaultLock, DsState::DsFault, DsAction::Fault),     // T29
    row(DsEvent::ComErr, DsState::DsFault, DsAction::Fault),
];

const CHECK_DS_VALIDITY: &[Row] = &[
    row(DsEvent::DoUpload, DsState::DecomposeIl, DsAction::Upload), // T21
    row(DsEvent::Passed, DsState::CheckChecksum, DsAction::CheckChecksum), // T22
    row(DsEvent::ComErr, DsState::DsFault, DsAction::Fault),
];

const CHECK_CHECKSUM: &[Row] = &[
    row(DsEvent::Download, DsState::DecomposeSet, DsAction::InitDownload), // T24
    row(DsEvent::Ready, DsState::DsReady, DsAction::Ready),                // T25
];

const DS_READY: &[Row] = &[
    row(DsEvent::Ready, DsState::WaitingOnDsActivity, DsAction::WaitDsActivity), // T3
];

const DS_FAULT: &[Row] = &[
    row(DsEvent::FaultDone, DsState::WaitingOnDsActivity, DsAction::WaitDsActivity), // T5
    row(DsEvent::ComErr, DsState::DsFault, DsAction::Fault),
];

const DECOMPOSE_IL: &[Row] = &[
    row(DsEvent::MoreData, DsState::ReadParameter, DsAction::ReadParameter), // T30
    row(DsEvent::StoreData, DsState::StoreDataSet, DsAction::StoreData),     // T35
    row(DsEvent::ComErr, DsState::UploadFault, DsAction::UploadFault),       // T34
];

const READ_PARAMETER: &[Row] = &[
    row(DsEvent::ReadDone, DsState::DecomposeIl, DsAction::Upload), // T31
    row(DsEvent::DevErr, DsState::UploadFault, DsAction::UploadFault), // T32
    row(DsEvent::ComErr, DsState::UploadFault, DsAction::UploadFault), // T33
];

const STORE_DATA_SET: &[Row] = &[
    row(DsEvent::UlDone, DsState::DsReady, DsAction::Ready), // T26
    row(DsEvent::ComErr, DsState::UploadFault, DsAction::UploadFault), // T36
];

const UPLOAD_FAULT: &[Row] = &[
    row(DsEvent::FaultUl, DsState::DsFault, DsAction::Fault), // T23
];

const DECOMPOSE_SET: &[Row] = &[
    row(DsEvent::MoreData, DsState::WriteParameter, DsAction::WriteParameter), // T37
    row(DsEvent::Download, DsState::DecomposeSet, DsAction::DecomposeSet),     // T24
    row(DsEvent::DlDone, DsState::DownloadDone, DsAction::DownloadDone),       // T41
    row(DsEvent::ComErr, DsState::DownloadFault, DsAction::DownloadFault),
];

const WRITE_PARAMETER: &[Row] = &[
    row(DsEvent::WrDone, DsState::DecomposeSet, DsAction::DecomposeSet), // T38
    row(DsEvent::DevErr, DsState::DownloadFault, DsAction::DownloadFault), // T39
    row(DsEvent::ComErr, DsState::DownloadFault, DsAction::DownloadFault), // T40
];

const DOWNLOAD_DONE: &[Row] = &[
    row(DsEvent::Ready, DsState::DsReady, DsAction::Ready), // T27
    row(DsEvent::ComErr, DsState::DownloadFault, DsAction::DownloadFault), // T42
];

const DOWNLOAD_FAULT: &[Row] = &[
    row(DsEvent::FaultDl, DsState::DsFault, DsAction::Fault), // T28
];

/// The transition list of a DS state.
pub fn transitions(state: DsState) -> &'static [Row] {
    match state {
        DsState::CheckActivationState => CHECK_ACTIVATION_STATE,
        DsState::WaitingOnDsActivity => WAITING_ON_DS_ACTIVITY,
        DsState::Off => OFF,
        DsState::CheckIdentity => CHECK_IDENTITY,
        DsState::CheckMemSize => CHECK_MEM_SIZE,
        DsState::CheckUpload => CHECK_UPLOAD,
        DsState::CheckDsValidity => CHECK_DS_VALIDITY,
        DsState::CheckChecksum => CHECK_CHECKSUM,
        DsState::DsReady => DS_READY,
        DsState::DsFault => DS_FAULT,
        DsState::DecomposeIl => DECOMPOSE_IL,
        DsState::ReadParameter => READ_PARAMETER,
        DsState::StoreDataSet => STORE_DATA_SET,
        DsState::UploadFault => UPLOAD_FAULT,
        DsState::DecomposeSet => DECOMPOSE_SET,
        DsState::WriteParameter => WRITE_PARAMETER,
        DsState::DownloadDone => DOWNLOAD_DONE,
        DsState::DownloadFault => DOWNLOAD_FAULT,
    }
}

/// The Data Storage state machine of one port, borrowed for the duration of
/// a job.
pub struct DataStorage<'c, 'a> {
    ctx: &'c mut Context<'a>,
}

impl<'c, 'a> DataStorage<'c, 'a> {
    pub fn new(ctx: &'c mut Context<'a>) -> Self {
        Self { ctx }
    }

    fn ds(&mut self) -> &mut DsContext {
        &mut self.ctx.port.ds
    }

    fn log_ctx(&self) -> PortLogContext {
        PortLogContext::new(Self::NAME, self.ctx.port_number())
    }

    /// Issues an AL read and remembers what is being read.
    pub(super) fn read_req(&mut self, index: u16, subindex: u8) {
        let port = self.ctx.port_number();
        self.ds().current = (index, subindex);
        port_trace!(self.log_ctx(), "AL_Read_req index {} subindex {}", index, subindex);
        self.ctx.services.al_read_req(port, index, subindex);
    }

    /// Writes `command` to DS_Command.
    pub(super) fn write_command(&mut self, command: DsCommand) {
        let port = self.ctx.port_number();
        let ds = self.ds();
        ds.current = (DS_PARAM_INDEX, DS_PARAM_SUBINDEX_CMD);
        ds.command = command;
        port_trace!(self.log_ctx(), "DS_Command {:?}", command);
        self.ctx
            .services
            .al_write_req(port, DS_PARAM_INDEX, DS_PARAM_SUBINDEX_CMD, &[command as u8]);
    }

    /// Stores the staged upload as the master's backup set.
    pub(super) fn commit_upload(&mut self) {
        let ds = self.ds();
        core::mem::swap(&mut ds.master.data, &mut ds.staging);
        ds.staging.clear();
        ds.master.data.rewind();
        ds.master.vendor_id = ds.pending_id.vendor_id;
        ds.master.device_id = ds.pending_id.device_id;
        ds.master.checksum = ds.device.checksum;
        ds.master.valid = true;
        port_debug!(
            self.log_ctx(),
            "backup stored, {} bytes, checksum {:#010x}",
            self.ctx.port.ds.master.size(),
            self.ctx.port.ds.master.checksum
        );
    }

    /// Reports a fault to CM.
    fn report_fault(&mut self, fault: DsFault) {
        self.ctx.post(JobKind::DsFault { fault });
    }

    fn identity_matches(&self) -> bool {
        let master = &self.ctx.port.ds.master;
        let info = &self.ctx.port.info;
        master.vendor_id == 0
            || (master.vendor_id == info.vendor_id && master.device_id == info.device_id)
    }

    fn fault(&mut self, event: DsEvent) -> Option<DsEvent> {
        match event {
            DsEvent::FaultId => {
                self.report_fault(DsFault::Id);
                Some(DsEvent::FaultDone)
            }
            DsEvent::FaultSize => {
                self.report_fault(DsFault::Size);
                Some(DsEvent::FaultDone)
            }
            DsEvent::FaultUl | DsEvent::FaultDl => {
                self.ds().fault = if event == DsEvent::FaultUl {
                    DsFault::Up
                } else {
                    DsFault::Down
                };
                // The fault is reported once the break command is confirmed.
                self.write_command(DsCommand::Break);
                None
            }
            DsEvent::FaultLock => {
                self.ds().ds_enable = false;
                self.report_fault(DsFault::Lock);
                Some(DsEvent::FaultDone)
            }
            DsEvent::ComErr => {
                self.ds().fault = DsFault::ComErr;
                self.report_fault(DsFault::ComErr);
                Some(DsEvent::FaultDone)
            }
            _ => None,
        }
    }

    fn check_upload(&mut self) -> Option<DsEvent> {
        let ds = &self.ctx.port.ds;
        let state_property = ds.device.state_property;
        let ds_upload = ds.ds_upload;

        if state_property & DS_STATE_PROPERTY_STATE_MASK == DS_STATE_PROPERTY_STATE_LOCKED {
            return Some(DsEvent::FaultLock); // T29
        }
        if state_property & DS_STATE_PROPERTY_UPLOAD_REQ != 0 && ds_upload {
            self.write_command(DsCommand::UploadStart); // T19
        } else {
            self.read_req(DS_PARAM_INDEX, DS_PARAM_SUBINDEX_CHECKSUM); // T20, T43
        }
        None
    }

    fn upload(&mut self, event: DsEvent) -> Option<DsEvent> {
        match event {
            DsEvent::DoUpload => {
                let ds = self.ds();
                ds.staging.clear();
                ds.index_list.rewind();
                ds.current = (DS_PARAM_INDEX, DS_PARAM_SUBINDEX_INDEX_LIST);
                Some(DsEvent::MoreData) // T30
            }
            DsEvent::ReadDone => {
                let ds = self.ds();
                if let Some(entry) = ds.index_list.next_entry() {
                    ds.current = (entry.index, entry.subindex);
                    Some(DsEvent::MoreData) // T30
                } else {
                    self.read_req(DS_PARAM_INDEX, DS_PARAM_SUBINDEX_CHECKSUM); // T35
                    Some(DsEvent::StoreData)
                }
            }
            _ => None,
        }
    }

    fn decompose_set(&mut self, event: DsEvent) -> Option<DsEvent> {
        let data = &mut self.ds().master.data;
        if event == DsEvent::Download {
            data.rewind();
        }
        if data.is_exhausted() {
            Some(DsEvent::DlDone)
        } else {
            Some(DsEvent::MoreData)
        }
    }

    fn write_parameter(&mut self) -> Option<DsEvent> {
        let port = self.ctx.port_number();
        let log_ctx = self.log_ctx();
        let ds = &mut self.ctx.port.ds;

        match ds.master.data.next_record() {
            Ok(Some(record)) => {
                ds.current = (record.index, record.subindex);
                port_trace!(
                    log_ctx,
                    "AL_Write_req index {} subindex {} ({} bytes)",
                    record.index,
                    record.subindex,
                    record.data.len()
                );
                self.ctx
                    .services
                    .al_write_req(port, record.index, record.subindex, record.data);
                None
            }
            Ok(None) => Some(DsEvent::DevErr),
            Err(e) => {
                port_error!(log_ctx, "cannot download backup set: {}", e);
                Some(DsEvent::DevErr)
            }
        }
    }
}

impl StateMachine for DataStorage<'_, '_> {
    type State = DsState;
    type Event = DsEvent;
    type Action = DsAction;
    const NAME: &'static str = "DS";

    fn port(&self) -> crate::types::PortNumber {
        self.ctx.port_number()
    }

    fn current_state(&self) -> DsState {
        self.ctx.port.ds.state
    }

    fn set_state(&mut self, state: DsState) {
        self.ctx.port.ds.state = state;
    }

    fn transitions(state: DsState) -> &'static [Row] {
        transitions(state)
    }

    fn perform(&mut self, action: DsAction, event: DsEvent) -> Option<DsEvent> {
        match action {
            DsAction::NoOp | DsAction::WaitDsActivity | DsAction::StoreData => None,
            DsAction::Reinit => {
                if self.ctx.port.ds.ds_enable {
                    Some(DsEvent::Enable) // T1
                } else {
                    Some(DsEvent::ClrDisa) // T7
                }
            }
            DsAction::Delete => {
                self.ds().master.delete();
                None
            }
            DsAction::Off => {
                if event == DsEvent::Startup {
                    self.ctx.post(JobKind::DsReady); // T14
                }
                None
            }
            DsAction::CheckIdentity => {
                if self.identity_matches() {
                    self.read_req(DS_PARAM_INDEX, DS_PARAM_SUBINDEX_SIZE);
                    None
                } else {
                    Some(DsEvent::FaultId) // T15
                }
            }
            DsAction::CheckMemSize => {
                let ds = &self.ctx.port.ds;
                if (ds.master.size_max as u64) < u64::from(ds.device.size_max) {
                    Some(DsEvent::FaultSize) // T17
                } else {
                    self.read_req(DS_PARAM_INDEX, DS_PARAM_SUBINDEX_STATE);
                    None
                }
            }
            DsAction::CheckUpload => self.check_upload(),
            DsAction::CheckValidity => {
                if self.ctx.port.ds.master.valid {
                    Some(DsEvent::Passed) // T22
                } else {
                    self.write_command(DsCommand::UploadStart); // T21
                    None
                }
            }
            DsAction::CheckChecksum => {
                let ds = &self.ctx.port.ds;
                if ds.ds_download && ds.master.checksum != ds.device.checksum {
                    Some(DsEvent::Download) // T24
                } else {
                    Some(DsEvent::Ready) // T25
                }
            }
            DsAction::Upload => self.upload(event),
            DsAction::ReadParameter => {
                let (index, subindex) = self.ctx.port.ds.current;
                self.read_req(index, subindex);
                None
            }
            DsAction::InitDownload => {
                self.write_command(DsCommand::DownloadStart);
                None
            }
            DsAction::DecomposeSet => self.decompose_set(event),
            DsAction::WriteParameter => self.write_parameter(),
            DsAction::DownloadDone => {
                self.write_command(DsCommand::DownloadEnd);
                None
            }
            DsAction::Ready => {
                self.ctx.post(JobKind::DsReady);
                Some(DsEvent::Ready)
            }
            DsAction::UploadFault => Some(DsEvent::FaultUl),
            DsAction::DownloadFault => Some(DsEvent::FaultDl),
            DsAction::Fault => self.fault(event),
        }
    }
}
