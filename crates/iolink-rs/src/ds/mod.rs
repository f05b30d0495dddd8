// crates/iolink-rs/src/ds/mod.rs
//! Data Storage (DS): keeps a backup of the device parameters in the master
//! and restores it into a replacement device.

pub mod dataset;
pub mod events;
mod smi;
pub mod state_machine;
pub mod states;

pub use dataset::{
    DataSetBuffer, DeviceDataSet, DsCommand, IndexEntry, IndexList, MasterDataSet, PendingIdentity,
};
pub use events::DsEvent;
pub use smi::{smi_ds_to_par_serv, smi_par_serv_to_ds};
pub use state_machine::{DataStorage, DsAction};
pub use states::DsState;

use crate::fsm::{StateMachine, lookup};
use crate::log::{PortLogContext, port_debug, port_error, port_warn};
use crate::port::Context;
use crate::smi::arg_block::read_u32;
use crate::smi::{PortConfig, SmiErrorType};
use crate::types::{
    DS_MAX_SIZE, DS_PARAM_INDEX, DS_PARAM_SUBINDEX_CHECKSUM, DS_PARAM_SUBINDEX_INDEX_LIST,
    DsFault, PortMode, ValidationCheck,
};

/// Per-port state of the Data Storage state machine.
#[derive(Debug, Clone, Default)]
pub struct DsContext {
    pub(crate) state: DsState,
    /// Fault reported once a BREAK command is confirmed.
    pub(crate) fault: DsFault,
    pub(crate) ds_enable: bool,
    pub(crate) ds_upload: bool,
    pub(crate) ds_download: bool,
    pub(crate) device: DeviceDataSet,
    pub(crate) master: MasterDataSet,
    /// Upload in progress. Only committed to `master` once complete.
    pub(crate) staging: DataSetBuffer,
    pub(crate) index_list: IndexList,
    pub(crate) command: DsCommand,
    /// `(index, subindex)` of the outstanding AL request.
    pub(crate) current: (u16, u8),
    pub(crate) pending_id: PendingIdentity,
}

impl DsContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DsState {
        self.state
    }

    pub fn fault(&self) -> DsFault {
        self.fault
    }

    pub fn is_enabled(&self) -> bool {
        self.ds_enable
    }

    pub fn upload_enabled(&self) -> bool {
        self.ds_upload
    }

    pub fn download_enabled(&self) -> bool {
        self.ds_download
    }

    /// The backup set held by the master.
    pub fn master(&self) -> &MasterDataSet {
        &self.master
    }

    /// Storage descriptor last read from the device.
    pub fn device(&self) -> &DeviceDataSet {
        &self.device
    }

    pub fn index_list(&self) -> &IndexList {
        &self.index_list
    }

    /// Last command written to DS_Command.
    pub fn command(&self) -> DsCommand {
        self.command
    }
}

/// True if the stored backup belongs to the device `cfg` expects.
pub fn check_config(ds: &DsContext, cfg: &PortConfig) -> bool {
    ds.master.vendor_id != 0
        && ds.master.vendor_id == cfg.vendor_id
        && ds.master.device_id == cfg.device_id
}

fn log_ctx(ctx: &Context<'_>) -> PortLogContext {
    PortLogContext::new(DataStorage::NAME, ctx.port_number())
}

/// DS_Startup: the device is ready for the data storage check.
pub fn startup(ctx: &mut Context<'_>) {
    DataStorage::new(ctx).fire(DsEvent::Startup);
}

/// DS_Delete: drops the backup.
pub fn delete(ctx: &mut Context<'_>) {
    DataStorage::new(ctx).fire(DsEvent::Delete);
}

/// DS_Upload: the device flagged a parameter change.
pub fn upload(ctx: &mut Context<'_>) {
    DataStorage::new(ctx).fire(DsEvent::Upload);
}

/// DS_Init: derives the backup policy from a new port configuration.
pub fn init(ctx: &mut Context<'_>, cfg: &PortConfig) {
    let ds = &mut ctx.port.ds;
    ds.ds_upload = false;
    ds.ds_download = false;
    ds.fault = DsFault::None;

    if cfg.port_mode == PortMode::IolManual {
        match cfg.validation_backup {
            ValidationCheck::V11BackupRestore => {
                ds.ds_upload = true;
                ds.ds_download = true;
                ds.ds_enable = true;
            }
            ValidationCheck::V11Restore => {
                ds.ds_download = true;
                ds.ds_enable = true;
            }
            _ => {}
        }
    }
    ds.pending_id = PendingIdentity {
        vendor_id: cfg.vendor_id,
        device_id: cfg.device_id,
    };

    DataStorage::new(ctx).fire(DsEvent::Init);
}

fn read_checksum(data: &[u8], errortype: SmiErrorType) -> Option<u32> {
    if errortype != SmiErrorType::None {
        return None;
    }
    read_u32(data, 0).ok()
}

/// AL_Read_cnf for the read DS issued last.
pub fn al_read_cnf(ctx: &mut Context<'_>, data: &[u8], errortype: SmiErrorType) {
    let state = ctx.port.ds.state;
    let mut ds = DataStorage::new(ctx);

    if errortype == SmiErrorType::ComErr
        && lookup(state_machine::transitions(state), DsEvent::ComErr).is_some()
    {
        ds.fire(DsEvent::ComErr);
        return;
    }

    match state {
        DsState::CheckIdentity => {
            let size = read_u32(data, 0).ok().filter(|_| errortype == SmiErrorType::None);
            let Some(size) = size else {
                ds.fire(DsEvent::FaultId);
                return;
            };
            if size as usize > DS_MAX_SIZE {
                port_debug!(log_ctx(ctx), "device requests {} bytes of data storage", size);
            }
            ctx.port.ds.device.size_max = size;
            DataStorage::new(ctx).fire(DsEvent::Passed);
        }
        DsState::CheckMemSize => {
            if errortype != SmiErrorType::None || data.len() != 1 {
                ds.fire(DsEvent::FaultSize);
                return;
            }
            ctx.port.ds.device.state_property = data[0];
            DataStorage::new(ctx).fire(DsEvent::Passed);
        }
        DsState::ReadParameter => {
            if errortype != SmiErrorType::None {
                ds.fire(DsEvent::DevErr);
                return;
            }
            let stored = store_parameter(ctx, data);
            let event = if stored {
                DsEvent::ReadDone
            } else {
                DsEvent::DevErr
            };
            DataStorage::new(ctx).fire(event);
        }
        DsState::CheckUpload | DsState::StoreDataSet | DsState::DownloadDone => {
            let Some(checksum) = read_checksum(data, errortype) else {
                ds.fire(DsEvent::ComErr);
                return;
            };
            ctx.port.ds.device.checksum = checksum;
            let mut ds = DataStorage::new(ctx);
            match state {
                DsState::CheckUpload => {
                    ds.fire(DsEvent::NoUpload);
                }
                DsState::StoreDataSet => ds.write_command(DsCommand::UploadEnd),
                _ => {
                    ds.fire(DsEvent::Ready);
                }
            }
        }
        _ => {
            port_warn!(log_ctx(ctx), "unexpected AL_Read_cnf in state {:?}", state);
        }
    }
}

/// Stores a parameter read during an upload. Returns false if the upload
/// must be aborted.
fn store_parameter(ctx: &mut Context<'_>, data: &[u8]) -> bool {
    let log_ctx = log_ctx(ctx);
    let ds = &mut ctx.port.ds;
    let (index, subindex) = ds.current;

    if (index, subindex) == (DS_PARAM_INDEX, DS_PARAM_SUBINDEX_INDEX_LIST) {
        match IndexList::parse(data) {
            Ok(list) => {
                port_debug!(log_ctx, "index list with {} entries", list.len());
                ds.index_list = list;
                true
            }
            Err(e) => {
                port_error!(log_ctx, "invalid index list: {}", e);
                false
            }
        }
    } else {
        match ds.staging.append_record(index, subindex, data) {
            Ok(()) => true,
            Err(e) => {
                port_error!(log_ctx, "cannot store index {} subindex {}: {}", index, subindex, e);
                false
            }
        }
    }
}

/// AL_Write_cnf for the write DS issued last.
pub fn al_write_cnf(ctx: &mut Context<'_>, errortype: SmiErrorType) {
    let state = ctx.port.ds.state;
    let mut ds = DataStorage::new(ctx);

    if errortype != SmiErrorType::None {
        ds.fire(DsEvent::ComErr);
        return;
    }

    match state {
        DsState::CheckUpload | DsState::CheckDsValidity => {
            ds.fire(DsEvent::DoUpload);
        }
        DsState::WriteParameter => {
            ds.fire(DsEvent::WrDone);
        }
        DsState::StoreDataSet => {
            ds.commit_upload();
            ds.fire(DsEvent::UlDone);
        }
        DsState::DecomposeSet => {
            ds.fire(DsEvent::Download);
        }
        DsState::DownloadDone => ds.read_req(DS_PARAM_INDEX, DS_PARAM_SUBINDEX_CHECKSUM),
        DsState::DsFault => {
            let fault = ctx.port.ds.fault;
            ctx.post(crate::job::JobKind::DsFault { fault });
            DataStorage::new(ctx).fire(DsEvent::FaultDone);
        }
        _ => {
            port_warn!(log_ctx(ctx), "unexpected AL_Write_cnf in state {:?}", state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_config_requires_a_stored_identity() {
        let mut ds = DsContext::new();
        let cfg = PortConfig {
            vendor_id: 0,
            device_id: 0,
            ..PortConfig::default()
        };
        // An empty backup never matches, not even an all-zero configuration.
        assert!(!check_config(&ds, &cfg));

        ds.master.vendor_id = 0x0123;
        ds.master.device_id = 0x0A0B0C;
        let cfg = PortConfig {
            vendor_id: 0x0123,
            device_id: 0x0A0B0C,
            ..PortConfig::default()
        };
        assert!(check_config(&ds, &cfg));
        assert!(!check_config(&ds, &PortConfig { device_id: 1, ..cfg }));
    }

    #[test]
    fn test_checksum_read_requires_four_bytes_without_error() {
        assert_eq!(read_checksum(&[0, 0, 1, 2], SmiErrorType::None), Some(0x0102));
        assert_eq!(read_checksum(&[0, 0, 1], SmiErrorType::None), None);
        assert_eq!(read_checksum(&[0, 0, 1, 2], SmiErrorType::AppDev), None);
    }

    #[test]
    fn test_new_context_is_idle_and_disabled() {
        let ds = DsContext::new();
        assert_eq!(ds.state(), DsState::CheckActivationState);
        assert!(!ds.is_enabled());
        assert!(!ds.master().valid);
        assert_eq!(ds.master().size_max, DS_MAX_SIZE);
    }
}
