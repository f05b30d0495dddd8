// crates/iolink-rs/src/hal.rs
use crate::smi::{ArgBlock, ArgBlockId};
use crate::types::{InspectionLevel, PortNumber, SmTargetMode, TransmissionRate};
use core::array::TryFromSliceError;
use core::fmt;

/// Pool a job record is claimed from and returned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    /// Jobs created by the stack itself (lower-layer indications, CM <-> DS).
    Internal,
    /// Jobs created for requests arriving through the SMI boundary.
    Api,
}

/// Defines a portable, descriptive Error type for the IO-Link master stack.
///
/// These are local, immediate errors. Protocol level failures travel across
/// the SMI boundary as job-error argument blocks instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IolinkError {
    /// The port number is zero or beyond the configured port count.
    InvalidPort(u8),
    /// The configuration handed to the master is inconsistent.
    ParameterConflict,
    /// The master is not running (never started, or already shut down).
    StateInvalid,
    /// A master instance already exists in this process.
    AlreadyInitialized,
    /// No free job record left in the given pool.
    PoolExhausted(PoolKind),
    /// The job queue rejected a job.
    QueueFull,
    /// The provided buffer is too short to hold or decode the argument block.
    BufferTooShort,
    /// A value is not a valid enum variant.
    InvalidEnumValue,
    /// The index list already holds the maximum number of entries.
    IndexListFull,
    /// Appending to a data storage buffer would exceed its capacity.
    DataStorageOverflow { needed: usize, capacity: usize },
    /// A data storage record is truncated or malformed.
    MalformedRecord(usize),
    /// A multi-byte value could not be parsed from a slice.
    SliceConversion,
}

impl fmt::Display for IolinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort(p) => write!(f, "Invalid port number: {p}"),
            Self::ParameterConflict => write!(f, "Conflicting or missing parameters"),
            Self::StateInvalid => write!(f, "The IO-Link master is not running"),
            Self::AlreadyInitialized => write!(f, "An IO-Link master instance already exists"),
            Self::PoolExhausted(pool) => write!(f, "Job pool {pool:?} is exhausted"),
            Self::QueueFull => write!(f, "The job queue is full"),
            Self::BufferTooShort => write!(f, "Buffer is too short for the argument block"),
            Self::InvalidEnumValue => write!(f, "A value is not a valid enum variant"),
            Self::IndexListFull => write!(f, "Data storage index list is full"),
            Self::DataStorageOverflow { needed, capacity } => write!(
                f,
                "Data storage overflow: {needed} bytes needed, capacity {capacity}"
            ),
            Self::MalformedRecord(pos) => write!(f, "Malformed data storage record at offset {pos}"),
            Self::SliceConversion => write!(f, "Failed to convert slice to a fixed-size array"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for IolinkError {}

impl From<TryFromSliceError> for IolinkError {
    fn from(_: TryFromSliceError) -> Self {
        IolinkError::SliceConversion
    }
}

/// Parameter list handed to System Management (SM_SetPortConfig).
/// (Reference: IO-Link Interface Spec v1.1.3, Table 80)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SmParameterList {
    pub mode: SmTargetMode,
    pub inspection_level: InspectionLevel,
    pub revision_id: u8,
    pub cycle_time: u8,
    pub vendor_id: u16,
    pub device_id: u32,
}

/// System Management of a port. Negotiates the physical connection and the
/// device compatibility; reports back through `MasterHandle::sm_port_mode_ind`.
pub trait SystemManagement {
    /// Applies a new target configuration (SM_SetPortConfig_req).
    fn sm_set_port_config(&mut self, port: PortNumber, params: &SmParameterList);

    /// Requests the transition to the OPERATE mode (SM_Operate).
    fn sm_operate(&mut self, port: PortNumber);

    /// Returns the parameters read from the connected device.
    fn sm_real_parameters(&self, port: PortNumber) -> SmParameterList;

    /// Returns the communication speed negotiated with the device.
    fn sm_transmission_rate(&self, port: PortNumber) -> TransmissionRate;
}

/// Application Layer acyclic (ISDU) services.
///
/// Confirmations are delivered asynchronously via `MasterHandle::al_read_cnf`
/// and `MasterHandle::al_write_cnf`.
pub trait ApplicationLayer {
    fn al_read_req(&mut self, port: PortNumber, index: u16, subindex: u8);

    fn al_write_req(&mut self, port: PortNumber, index: u16, subindex: u8, data: &[u8]);
}

/// On-request Data exchange lifecycle.
pub trait OnRequestData {
    fn od_start(&mut self, port: PortNumber);
    fn od_stop(&mut self, port: PortNumber);
}

/// Process Data exchange lifecycle.
pub trait ProcessData {
    fn pd_start(&mut self, port: PortNumber);
    fn pd_stop(&mut self, port: PortNumber);
}

/// Receiver of everything the master reports across the SMI boundary.
pub trait SmiListener {
    /// A confirmation or indication (SMI_xxx_cnf / SMI_PortEvent_ind).
    fn smi_cnf(&mut self, port: PortNumber, ref_arg_block_id: ArgBlockId, arg_block: &ArgBlock);

    /// New cyclic input data for a port.
    fn pd_ind(&mut self, _port: PortNumber, _data: &[u8]) {}
}

/// Everything the master's worker calls out to.
pub trait PortServices:
    SystemManagement + ApplicationLayer + OnRequestData + ProcessData + SmiListener
{
}

impl<T> PortServices for T where
    T: SystemManagement + ApplicationLayer + OnRequestData + ProcessData + SmiListener
{
}
