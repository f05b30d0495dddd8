// crates/iolink-rs/src/smi/arg_block.rs
//! Argument blocks exchanged across the SMI boundary.
//!
//! Every block starts with a 2-byte big-endian identifier followed by a
//! type-specific payload. (Reference: IO-Link Interface Spec v1.1.3, Annex E)

use crate::hal::IolinkError;
use crate::types::{
    IqBehavior, MAX_PORTS, MasterType, PortMode, PortStatus, PortType, TransmissionRate,
    ValidationCheck,
};
use alloc::vec;
use alloc::vec::Vec;
use core::convert::TryFrom;

/// Identifier of an argument block (ArgBlockID).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgBlockId(pub u16);

impl ArgBlockId {
    pub const MASTERIDENT: Self = Self(0x0001);
    pub const FS_MASTER_ACCESS: Self = Self(0x0100);
    pub const W_MASTER_CFG: Self = Self(0x0200);
    pub const PD_IN: Self = Self(0x1001);
    pub const PD_OUT: Self = Self(0x1002);
    pub const PD_IN_OUT: Self = Self(0x1003);
    pub const SPDU_IN: Self = Self(0x1101);
    pub const SPDU_OUT: Self = Self(0x1102);
    pub const PD_IN_IQ: Self = Self(0x1FFE);
    pub const PD_OUT_IQ: Self = Self(0x1FFF);
    pub const OD_WR: Self = Self(0x3000);
    pub const OD_RD: Self = Self(0x3001);
    pub const DS_DATA: Self = Self(0x7000);
    pub const DEV_PAR_BAT: Self = Self(0x7001);
    pub const PORT_INDEX_LIST: Self = Self(0x7002);
    pub const PORT_POWER: Self = Self(0x7003);
    pub const PORT_CFG_LIST: Self = Self(0x8000);
    pub const FS_PORT_CFG_LIST: Self = Self(0x8100);
    pub const W_TRACK_CFG_LIST: Self = Self(0x8200);
    pub const PORT_STATUS_LIST: Self = Self(0x9000);
    pub const FS_PORT_STATUS_LIST: Self = Self(0x9100);
    pub const W_TRACK_STATUS_LIST: Self = Self(0x9200);
    pub const W_TRACK_SCAN_RES: Self = Self(0x9201);
    pub const DEV_EVENT: Self = Self(0xA000);
    pub const PORT_EVENT: Self = Self(0xA001);
    pub const VOID_BLOCK: Self = Self(0xFFF0);
    pub const JOB_ERROR: Self = Self(0xFFFF);
}

/// Event code carried in diagnosis entries and port events.
/// (Reference: IO-Link Interface Spec v1.1.3, Annex D)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventCode(pub u16);

impl EventCode {
    pub const NONE: Self = Self(0x0000);
    pub const NO_DEV: Self = Self(0x1800);
    pub const START_PARAM_ERR: Self = Self(0x1801);
    pub const BAD_VID: Self = Self(0x1802);
    pub const BAD_DID: Self = Self(0x1803);
    pub const SHORT_CIR_CQ: Self = Self(0x1804);
    pub const PHY_OVERTEMP: Self = Self(0x1805);
    pub const SHORT_CIR_L: Self = Self(0x1806);
    pub const OVERCUR_L: Self = Self(0x1807);
    pub const DEV_EVENT_OVERF: Self = Self(0x1808);
    pub const BACKUP_INCON_SIZE: Self = Self(0x1809);
    pub const BACKUP_INCON_ID: Self = Self(0x180A);
    pub const BACKUP_INCON: Self = Self(0x180B);
    pub const BACKUP_INCON_UL: Self = Self(0x180C);
    pub const BACKUP_INCON_DL: Self = Self(0x180D);
    pub const P24: Self = Self(0x180E);
    pub const P24_SHORT_CIR: Self = Self(0x180F);
    pub const SHORT_CIR_IQ: Self = Self(0x1810);
    pub const SHORT_CIR_DO_CQ: Self = Self(0x1811);
    pub const OVERCUR_IQ: Self = Self(0x1812);
    pub const OVERCUR_CQ: Self = Self(0x1813);
    pub const INVAL_CYCTIME: Self = Self(0x6000);
    pub const REV_FAULT: Self = Self(0x6001);
    pub const ISDU_FAIL: Self = Self(0x6002);
    pub const PORT_STATUS_CHANGE: Self = Self(0xFF26);
    pub const DS_UPLOAD_DONE: Self = Self(0xFF27);
    pub const DEV_DS_UPLOAD_REQ: Self = Self(0xFF91);
}

/// SMI error types reported in job-error blocks and AL confirmations.
/// (Reference: IO-Link Interface Spec v1.1.3, Tables C.1, C.2 and C.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u16)]
pub enum SmiErrorType {
    #[default]
    None = 0x0000,
    // Table C.1
    AppDev = 0x8000,
    IdxNotAvail = 0x8011,
    SubIdxNotAvail = 0x8012,
    ServNotAvail = 0x8020,
    ServNotAvailLocCtrl = 0x8021,
    ServNotAvailDevCtrl = 0x8022,
    IdxNotAccessible = 0x8023,
    ParValOutOfRange = 0x8030,
    ParValGtLim = 0x8031,
    ParValLtLim = 0x8032,
    ValLenOverrun = 0x8033,
    ValLenUnderrun = 0x8034,
    FuncNotAvail = 0x8035,
    FuncUnavailTemp = 0x8036,
    ParSetInvalid = 0x8040,
    ParSetInconsistent = 0x8041,
    AppDevNotReady = 0x8082,
    Unspecific = 0x8100,
    // Table C.2
    ComErr = 0x1000,
    IServiceTimeout = 0x1100,
    MIsduChecksum = 0x5600,
    MIsduIllegal = 0x5700,
    // Table C.3
    ArgBlockNotSupported = 0x4001,
    ArgBlockInconsistent = 0x4002,
    DevNotAccessible = 0x4003,
    ServiceNotSupported = 0x4004,
    DevNotInOperate = 0x4005,
    MemoryOverrun = 0x4006,
    PortNumInvalid = 0x4011,
    ArgBlockLengthInvalid = 0x4034,
    ServiceTempUnavailable = 0x4036,
}

impl TryFrom<u16> for SmiErrorType {
    type Error = IolinkError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        const ALL: [SmiErrorType; 32] = [
            SmiErrorType::None,
            SmiErrorType::AppDev,
            SmiErrorType::IdxNotAvail,
            SmiErrorType::SubIdxNotAvail,
            SmiErrorType::ServNotAvail,
            SmiErrorType::ServNotAvailLocCtrl,
            SmiErrorType::ServNotAvailDevCtrl,
            SmiErrorType::IdxNotAccessible,
            SmiErrorType::ParValOutOfRange,
            SmiErrorType::ParValGtLim,
            SmiErrorType::ParValLtLim,
            SmiErrorType::ValLenOverrun,
            SmiErrorType::ValLenUnderrun,
            SmiErrorType::FuncNotAvail,
            SmiErrorType::FuncUnavailTemp,
            SmiErrorType::ParSetInvalid,
            SmiErrorType::ParSetInconsistent,
            SmiErrorType::AppDevNotReady,
            SmiErrorType::Unspecific,
            SmiErrorType::ComErr,
            SmiErrorType::IServiceTimeout,
            SmiErrorType::MIsduChecksum,
            SmiErrorType::MIsduIllegal,
            SmiErrorType::ArgBlockNotSupported,
            SmiErrorType::ArgBlockInconsistent,
            SmiErrorType::DevNotAccessible,
            SmiErrorType::ServiceNotSupported,
            SmiErrorType::DevNotInOperate,
            SmiErrorType::MemoryOverrun,
            SmiErrorType::PortNumInvalid,
            SmiErrorType::ArgBlockLengthInvalid,
            SmiErrorType::ServiceTempUnavailable,
        ];
        ALL.into_iter()
            .find(|e| *e as u16 == value)
            .ok_or(IolinkError::InvalidEnumValue)
    }
}

// --- Event qualifier bits (IO-Link Interface Spec v1.1.3, A.6.4) ---
const EVENT_INSTANCE_APPLICATION: u8 = 4;
const EVENT_SOURCE_MASTER: u8 = 1;
const EVENT_TYPE_NOTIFICATION: u8 = 1;
const EVENT_MODE_SINGLE_SHOT: u8 = 1;

/// A single diagnosis entry / event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagEntry {
    pub event_qualifier: u8,
    pub event_code: EventCode,
}

impl DiagEntry {
    pub const LEN: usize = 3;

    /// A single-shot notification raised by the master's application instance.
    pub const fn master_notification(event_code: EventCode) -> Self {
        Self {
            event_qualifier: EVENT_INSTANCE_APPLICATION
                | EVENT_SOURCE_MASTER << 3
                | EVENT_TYPE_NOTIFICATION << 4
                | EVENT_MODE_SINGLE_SHOT << 6,
            event_code,
        }
    }
}

/// Master identification (ArgBlock 0x0001).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterIdent {
    pub vendor_id: u16,
    pub master_id: u32,
    pub master_type: MasterType,
    pub features_1: u8,
    pub features_2: u8,
    /// One entry per port; its length is the reported MaxNumberOfPorts.
    pub port_types: heapless::Vec<PortType, { MAX_PORTS as usize }>,
}

impl MasterIdent {
    pub const HEADER_LEN: usize = 12;
}

/// PortConfigList as carried on the wire (ArgBlock 0x8000).
///
/// The enumeration fields are kept raw, so that a request with out of range
/// values can still reach the Configuration Manager and be rejected there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortConfigList {
    pub port_mode: u8,
    pub validation_backup: u8,
    pub iq_behavior: u8,
    pub port_cycle_time: u8,
    pub vendor_id: u16,
    pub device_id: u32,
    pub in_buffer_len: u8,
    pub out_buffer_len: u8,
}

impl PortConfigList {
    pub const LEN: usize = 14;
}

/// A validated port configuration, as cached by the Configuration Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortConfig {
    pub port_mode: PortMode,
    pub validation_backup: ValidationCheck,
    pub iq_behavior: IqBehavior,
    pub port_cycle_time: u8,
    pub vendor_id: u16,
    pub device_id: u32,
    pub in_buffer_len: u8,
    pub out_buffer_len: u8,
}

impl TryFrom<&PortConfigList> for PortConfig {
    type Error = IolinkError;

    fn try_from(list: &PortConfigList) -> Result<Self, Self::Error> {
        Ok(Self {
            port_mode: PortMode::try_from(list.port_mode)?,
            validation_backup: ValidationCheck::try_from(list.validation_backup)?,
            iq_behavior: IqBehavior::try_from(list.iq_behavior)?,
            port_cycle_time: list.port_cycle_time,
            vendor_id: list.vendor_id,
            device_id: list.device_id,
            in_buffer_len: list.in_buffer_len,
            out_buffer_len: list.out_buffer_len,
        })
    }
}

impl From<&PortConfig> for PortConfigList {
    fn from(cfg: &PortConfig) -> Self {
        Self {
            port_mode: cfg.port_mode as u8,
            validation_backup: cfg.validation_backup as u8,
            iq_behavior: cfg.iq_behavior as u8,
            port_cycle_time: cfg.port_cycle_time,
            vendor_id: cfg.vendor_id,
            device_id: cfg.device_id,
            in_buffer_len: cfg.in_buffer_len,
            out_buffer_len: cfg.out_buffer_len,
        }
    }
}

/// PortStatusList (ArgBlock 0x9000).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PortStatusList {
    pub port_status_info: PortStatus,
    pub port_quality_info: u8,
    pub revision_id: u8,
    pub transmission_rate: TransmissionRate,
    pub master_cycle_time: u8,
    pub vendor_id: u16,
    pub device_id: u32,
    pub diag_entries: Vec<DiagEntry>,
}

impl PortStatusList {
    pub const HEADER_LEN: usize = 15;
}

/// Data storage backup set (ArgBlock 0x7000).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DsData {
    pub checksum: u32,
    pub vendor_id: u16,
    pub device_id: u32,
    pub function_id: u16,
    pub data: Vec<u8>,
}

impl DsData {
    pub const HEADER_LEN: usize = 14;
}

/// JobError (ArgBlock 0xFFFF).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobError {
    pub exp_arg_block_id: ArgBlockId,
    pub error: SmiErrorType,
}

impl JobError {
    pub const LEN: usize = 6;
}

/// A decoded argument block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgBlock {
    Void,
    MasterIdent(MasterIdent),
    PortConfigList(PortConfigList),
    PortStatusList(PortStatusList),
    DsData(DsData),
    PortEvent(DiagEntry),
    JobError(JobError),
    /// Any block this stack passes through without interpreting it.
    Other { id: ArgBlockId, payload: Vec<u8> },
}

impl ArgBlock {
    pub fn id(&self) -> ArgBlockId {
        match self {
            ArgBlock::Void => ArgBlockId::VOID_BLOCK,
            ArgBlock::MasterIdent(_) => ArgBlockId::MASTERIDENT,
            ArgBlock::PortConfigList(_) => ArgBlockId::PORT_CFG_LIST,
            ArgBlock::PortStatusList(_) => ArgBlockId::PORT_STATUS_LIST,
            ArgBlock::DsData(_) => ArgBlockId::DS_DATA,
            ArgBlock::PortEvent(_) => ArgBlockId::PORT_EVENT,
            ArgBlock::JobError(_) => ArgBlockId::JOB_ERROR,
            ArgBlock::Other { id, .. } => *id,
        }
    }

    /// Number of bytes `encode` writes, identifier included.
    pub fn encoded_len(&self) -> usize {
        match self {
            ArgBlock::Void => 2,
            ArgBlock::MasterIdent(m) => MasterIdent::HEADER_LEN + m.port_types.len(),
            ArgBlock::PortConfigList(_) => PortConfigList::LEN,
            ArgBlock::PortStatusList(s) => {
                PortStatusList::HEADER_LEN + s.diag_entries.len() * DiagEntry::LEN
            }
            ArgBlock::DsData(d) => DsData::HEADER_LEN + d.data.len(),
            ArgBlock::PortEvent(_) => 2 + DiagEntry::LEN,
            ArgBlock::JobError(_) => JobError::LEN,
            ArgBlock::Other { payload, .. } => 2 + payload.len(),
        }
    }

    /// Serializes the block into `buffer` (big-endian). Returns the number of
    /// bytes written.
    pub fn encode(&self, buffer: &mut [u8]) -> Result<usize, IolinkError> {
        let len = self.encoded_len();
        if buffer.len() < len {
            return Err(IolinkError::BufferTooShort);
        }
        let buf = &mut buffer[..len];
        buf[0..2].copy_from_slice(&self.id().0.to_be_bytes());

        match self {
            ArgBlock::Void => {}
            ArgBlock::MasterIdent(m) => {
                buf[2..4].copy_from_slice(&m.vendor_id.to_be_bytes());
                buf[4..8].copy_from_slice(&m.master_id.to_be_bytes());
                buf[8] = m.master_type as u8;
                buf[9] = m.features_1;
                buf[10] = m.features_2;
                buf[11] = m.port_types.len() as u8;
                for (slot, port_type) in buf[12..].iter_mut().zip(m.port_types.iter()) {
                    *slot = *port_type as u8;
                }
            }
            ArgBlock::PortConfigList(c) => {
                buf[2] = c.port_mode;
                buf[3] = c.validation_backup;
                buf[4] = c.iq_behavior;
                buf[5] = c.port_cycle_time;
                buf[6..8].copy_from_slice(&c.vendor_id.to_be_bytes());
                buf[8..12].copy_from_slice(&c.device_id.to_be_bytes());
                buf[12] = c.in_buffer_len;
                buf[13] = c.out_buffer_len;
            }
            ArgBlock::PortStatusList(s) => {
                buf[2] = s.port_status_info as u8;
                buf[3] = s.port_quality_info;
                buf[4] = s.revision_id;
                buf[5] = s.transmission_rate as u8;
                buf[6] = s.master_cycle_time;
                buf[7] = 0; // reserved
                buf[8..10].copy_from_slice(&s.vendor_id.to_be_bytes());
                buf[10..14].copy_from_slice(&s.device_id.to_be_bytes());
                buf[14] = s.diag_entries.len() as u8;
                for (chunk, entry) in buf[15..]
                    .chunks_exact_mut(DiagEntry::LEN)
                    .zip(s.diag_entries.iter())
                {
                    write_diag_entry(chunk, entry);
                }
            }
            ArgBlock::DsData(d) => {
                buf[2..6].copy_from_slice(&d.checksum.to_be_bytes());
                buf[6..8].copy_from_slice(&d.vendor_id.to_be_bytes());
                buf[8..12].copy_from_slice(&d.device_id.to_be_bytes());
                buf[12..14].copy_from_slice(&d.function_id.to_be_bytes());
                buf[14..].copy_from_slice(&d.data);
            }
            ArgBlock::PortEvent(entry) => write_diag_entry(&mut buf[2..], entry),
            ArgBlock::JobError(e) => {
                buf[2..4].copy_from_slice(&e.exp_arg_block_id.0.to_be_bytes());
                buf[4..6].copy_from_slice(&(e.error as u16).to_be_bytes());
            }
            ArgBlock::Other { payload, .. } => buf[2..].copy_from_slice(payload),
        }

        Ok(len)
    }

    /// Convenience wrapper around `encode` returning an owned buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.encoded_len()];
        // The buffer is sized from encoded_len, encode cannot fail.
        let _ = self.encode(&mut buf);
        buf
    }

    /// Parses an argument block from `buffer`.
    ///
    /// Trailing bytes after a fixed-size block are ignored; unknown
    /// identifiers decode to `ArgBlock::Other`.
    pub fn decode(buffer: &[u8]) -> Result<Self, IolinkError> {
        let id = ArgBlockId(read_u16(buffer, 0)?);

        let block = match id {
            ArgBlockId::VOID_BLOCK => ArgBlock::Void,
            ArgBlockId::MASTERIDENT => {
                let count = usize::from(read_u8(buffer, 11)?);
                let mut port_types = heapless::Vec::new();
                for i in 0..count {
                    let port_type = PortType::try_from(read_u8(buffer, 12 + i)?)?;
                    port_types
                        .push(port_type)
                        .map_err(|_| IolinkError::InvalidEnumValue)?;
                }
                ArgBlock::MasterIdent(MasterIdent {
                    vendor_id: read_u16(buffer, 2)?,
                    master_id: read_u32(buffer, 4)?,
                    master_type: MasterType::try_from(read_u8(buffer, 8)?)?,
                    features_1: read_u8(buffer, 9)?,
                    features_2: read_u8(buffer, 10)?,
                    port_types,
                })
            }
            ArgBlockId::PORT_CFG_LIST => ArgBlock::PortConfigList(PortConfigList {
                port_mode: read_u8(buffer, 2)?,
                validation_backup: read_u8(buffer, 3)?,
                iq_behavior: read_u8(buffer, 4)?,
                port_cycle_time: read_u8(buffer, 5)?,
                vendor_id: read_u16(buffer, 6)?,
                device_id: read_u32(buffer, 8)?,
                in_buffer_len: read_u8(buffer, 12)?,
                out_buffer_len: read_u8(buffer, 13)?,
            }),
            ArgBlockId::PORT_STATUS_LIST => {
                let count = usize::from(read_u8(buffer, 14)?);
                let diag_entries = (0..count)
                    .map(|i| read_diag_entry(buffer, PortStatusList::HEADER_LEN + i * DiagEntry::LEN))
                    .collect::<Result<Vec<_>, _>>()?;
                ArgBlock::PortStatusList(PortStatusList {
                    port_status_info: PortStatus::try_from(read_u8(buffer, 2)?)?,
                    port_quality_info: read_u8(buffer, 3)?,
                    revision_id: read_u8(buffer, 4)?,
                    transmission_rate: TransmissionRate::try_from(read_u8(buffer, 5)?)?,
                    master_cycle_time: read_u8(buffer, 6)?,
                    vendor_id: read_u16(buffer, 8)?,
                    device_id: read_u32(buffer, 10)?,
                    diag_entries,
                })
            }
            ArgBlockId::DS_DATA => {
                if buffer.len() < DsData::HEADER_LEN {
                    return Err(IolinkError::BufferTooShort);
                }
                ArgBlock::DsData(DsData {
                    checksum: read_u32(buffer, 2)?,
                    vendor_id: read_u16(buffer, 6)?,
                    device_id: read_u32(buffer, 8)?,
                    function_id: read_u16(buffer, 12)?,
                    data: buffer[DsData::HEADER_LEN..].to_vec(),
                })
            }
            ArgBlockId::PORT_EVENT => ArgBlock::PortEvent(read_diag_entry(buffer, 2)?),
            ArgBlockId::JOB_ERROR => ArgBlock::JobError(JobError {
                exp_arg_block_id: ArgBlockId(read_u16(buffer, 2)?),
                error: SmiErrorType::try_from(read_u16(buffer, 4)?)?,
            }),
            _ => ArgBlock::Other {
                id,
                payload: buffer[2..].to_vec(),
            },
        };

        Ok(block)
    }
}

fn write_diag_entry(buf: &mut [u8], entry: &DiagEntry) {
    buf[0] = entry.event_qualifier;
    buf[1..3].copy_from_slice(&entry.event_code.0.to_be_bytes());
}

fn read_diag_entry(buffer: &[u8], offset: usize) -> Result<DiagEntry, IolinkError> {
    Ok(DiagEntry {
        event_qualifier: read_u8(buffer, offset)?,
        event_code: EventCode(read_u16(buffer, offset + 1)?),
    })
}

fn read_u8(buffer: &[u8], offset: usize) -> Result<u8, IolinkError> {
    buffer.get(offset).copied().ok_or(IolinkError::BufferTooShort)
}

fn read_u16(buffer: &[u8], offset: usize) -> Result<u16, IolinkError> {
    let bytes = buffer
        .get(offset..offset + 2)
        .ok_or(IolinkError::BufferTooShort)?;
    Ok(u16::from_be_bytes(bytes.try_into()?))
}

pub(crate) fn read_u32(buffer: &[u8], offset: usize) -> Result<u32, IolinkError> {
    let bytes = buffer
        .get(offset..offset + 4)
        .ok_or(IolinkError::BufferTooShort)?;
    Ok(u32::from_be_bytes(bytes.try_into()?))
}
