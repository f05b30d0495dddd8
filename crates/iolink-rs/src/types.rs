// crates/iolink-rs/src/types.rs
use crate::hal::IolinkError;
use core::convert::TryFrom;
use core::fmt;

// --- Stack Sizing Constants ---

/// Maximum number of ports a single master instance can drive.
pub const MAX_PORTS: u8 = 8;

/// Jobs reserved for work originating inside the stack (lower layers, CM <-> DS).
pub const JOB_POOL_INTERNAL_SIZE: usize = 40;

/// Jobs reserved for requests submitted through the SMI boundary.
pub const JOB_POOL_API_SIZE: usize = 10;

/// Capacity of the shared job queue. Equal to the sum of both pools, so
/// submitting a job that was acquired from a pool can never overflow it.
pub const JOB_QUEUE_SIZE: usize = JOB_POOL_INTERNAL_SIZE + JOB_POOL_API_SIZE;

/// Maximum payload of a single ISDU transfer (IO-Link Interface Spec v1.1.3, Annex A.5)
pub const ISDU_MAX_DATA: usize = 232;

/// Maximum number of bytes in Process Data
pub const PD_MAX_SIZE: usize = 32;

// --- Data Storage Constants (Spec v1.1.3, Chapter 10.4) ---

/// Maximum size in bytes of a data storage backup set held by the master.
pub const DS_MAX_SIZE: usize = 2048;

/// Maximum number of entries in a device's Index_List.
pub const DS_INDEX_LIST_MAX_ENTRIES: usize = 70;

/// ISDU index of the device's Data Storage parameter (0x0003).
pub const DS_PARAM_INDEX: u16 = 0x0003;
/// Subindex of DS_Command.
pub const DS_PARAM_SUBINDEX_CMD: u8 = 1;
/// Subindex of State_Property.
pub const DS_PARAM_SUBINDEX_STATE: u8 = 2;
/// Subindex of Data_Storage_Size.
pub const DS_PARAM_SUBINDEX_SIZE: u8 = 3;
/// Subindex of Parameter_Checksum.
pub const DS_PARAM_SUBINDEX_CHECKSUM: u8 = 4;
/// Subindex of Index_List.
pub const DS_PARAM_SUBINDEX_INDEX_LIST: u8 = 5;

/// State_Property: mask of the two "state of data storage" bits.
pub const DS_STATE_PROPERTY_STATE_MASK: u8 = 3 << 1;
/// State_Property: device is uploading.
pub const DS_STATE_PROPERTY_STATE_UPLOAD: u8 = 1 << 1;
/// State_Property: device is downloading.
pub const DS_STATE_PROPERTY_STATE_DOWNLOAD: u8 = 2 << 1;
/// State_Property: data storage is locked by the device.
pub const DS_STATE_PROPERTY_STATE_LOCKED: u8 = 3 << 1;
/// State_Property: DS_UPLOAD_FLAG, the device requests an upload.
pub const DS_STATE_PROPERTY_UPLOAD_REQ: u8 = 1 << 7;

// --- Master Identification ---

/// IO-Link protocol revision 1.0 as reported in the direct parameter page.
pub const IOLINK_REVISION_1_0: u8 = 0x10;
/// IO-Link protocol revision 1.1.
pub const IOLINK_REVISION_1_1: u8 = 0x11;

pub const MASTER_VENDOR_ID: u16 = 1171;
pub const MASTER_ID: u32 = 123;

/// Port quality bit 0: 0 = port data valid, 1 = invalid.
pub const PORT_QUALITY_INFO_VALID: u8 = 0;
pub const PORT_QUALITY_INFO_INVALID: u8 = 1 << 0;

/// Represents a 1-based IO-Link port number.
///
/// Port numbers are what crosses the SMI boundary. Internally ports are
/// stored in a zero-based array, which is what `index()` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PortNumber(pub u8);

impl PortNumber {
    /// Zero-based index into the master's port array.
    pub fn index(self) -> usize {
        usize::from(self.0.saturating_sub(1))
    }

    /// Builds a port number from a zero-based array index.
    pub(crate) fn from_index(index: usize) -> Self {
        PortNumber(index as u8 + 1)
    }
}

impl TryFrom<u8> for PortNumber {
    type Error = IolinkError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value == 0 || value > MAX_PORTS {
            Err(IolinkError::InvalidPort(value))
        } else {
            Ok(PortNumber(value))
        }
    }
}

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generates a `TryFrom<u8>` impl for a fieldless `#[repr(u8)]` enum.
macro_rules! impl_try_from_u8 {
    ($ty:ty { $($variant:ident),+ $(,)? }) => {
        impl TryFrom<u8> for $ty {
            type Error = IolinkError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                $(
                    if value == <$ty>::$variant as u8 {
                        return Ok(<$ty>::$variant);
                    }
                )+
                Err(IolinkError::InvalidEnumValue)
            }
        }
    };
}

/// Target port mode requested through SMI_PortConfiguration.
/// (Reference: IO-Link Interface Spec v1.1.3, Table E.3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PortMode {
    /// Port is switched off.
    #[default]
    Deactive = 0,
    /// IO-Link, device identity checked against the configuration.
    IolManual = 1,
    /// IO-Link, any compatible device is accepted.
    IolAutostart = 2,
    /// Standard digital input on C/Q.
    DiCq = 3,
    /// Standard digital output on C/Q.
    DoCq = 4,
}
impl_try_from_u8!(PortMode { Deactive, IolManual, IolAutostart, DiCq, DoCq });

/// Validation and backup policy of a port configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ValidationCheck {
    #[default]
    NoCheck = 0,
    /// Identical V1.0 device.
    V10 = 1,
    /// Type compatible V1.1 device.
    V11 = 2,
    /// Type compatible V1.1 device with backup and restore.
    V11BackupRestore = 3,
    /// Type compatible V1.1 device with restore only.
    V11Restore = 4,
}
impl_try_from_u8!(ValidationCheck { NoCheck, V10, V11, V11BackupRestore, V11Restore });

/// Behavior of the port's I/Q pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum IqBehavior {
    #[default]
    NotSupported = 0,
    DigitalInput = 1,
    DigitalOutput = 2,
    Reserved1 = 3,
    Reserved2 = 4,
    Power2 = 5,
}
impl_try_from_u8!(IqBehavior { NotSupported, DigitalInput, DigitalOutput, Reserved1, Reserved2, Power2 });

/// PortStatusInfo reported in the PortStatusList.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum PortStatus {
    NoDevice = 0,
    #[default]
    Deactivated = 1,
    PortDiag = 2,
    PreOperate = 3,
    Operate = 4,
    DigitalInput = 5,
    DigitalOutput = 6,
    PowerOff = 254,
    NotAvailable = 255,
}
impl_try_from_u8!(PortStatus {
    NoDevice,
    Deactivated,
    PortDiag,
    PreOperate,
    Operate,
    DigitalInput,
    DigitalOutput,
    PowerOff,
    NotAvailable,
});

/// Negotiated communication speed (COMx).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TransmissionRate {
    #[default]
    NotDetected = 0,
    Com1 = 1,
    Com2 = 2,
    Com3 = 3,
}
impl_try_from_u8!(TransmissionRate { NotDetected, Com1, Com2, Com3 });

/// Target mode handed to System Management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmTargetMode {
    /// Communication established with an identity check.
    CfgCom,
    /// Communication established with any device.
    AutoCom,
    #[default]
    Inactive,
    DigitalInput,
    DigitalOutput,
}

impl From<PortMode> for SmTargetMode {
    fn from(mode: PortMode) -> Self {
        match mode {
            PortMode::IolManual => SmTargetMode::CfgCom,
            PortMode::IolAutostart => SmTargetMode::AutoCom,
            PortMode::DiCq => SmTargetMode::DigitalInput,
            PortMode::DoCq => SmTargetMode::DigitalOutput,
            PortMode::Deactive => SmTargetMode::Inactive,
        }
    }
}

/// Device inspection level applied by System Management.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InspectionLevel {
    #[default]
    NoCheck,
    TypeCompatible,
    Identical,
}

/// Mode indications reported by System Management (SM_PortMode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmPortMode {
    Inactive,
    DigitalInput,
    DigitalOutput,
    ComReady,
    Operate,
    ComLost,
    RevisionFault,
    CompatibilityFault,
    SerialNumberFault,
    CycleTimeFault,
}

/// Classification of a Data Storage fault reported to CM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DsFault {
    #[default]
    None,
    /// Backup belongs to a different device.
    Id,
    /// Device backup does not fit into the master's storage.
    Size,
    /// Upload from the device failed.
    Up,
    /// Download to the device failed.
    Down,
    /// Communication broke down during a DS transaction.
    ComErr,
    /// Data storage is locked by the device.
    Lock,
}

/// Master type reported in the MasterIdent block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MasterType {
    Unspecified = 0,
    Reserved = 1,
    MasterAccessory = 2,
    FailSafe = 3,
    Wireless = 4,
}
impl_try_from_u8!(MasterType { Unspecified, Reserved, MasterAccessory, FailSafe, Wireless });

/// Port class reported per port in the MasterIdent block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PortType {
    ClassA = 0,
    ClassAWithPower = 1,
    ClassB = 2,
    FailSafeANoOssd = 3,
    FailSafeAOssd = 4,
    FailSafeB = 5,
    WirelessMaster = 6,
}
impl_try_from_u8!(PortType {
    ClassA,
    ClassAWithPower,
    ClassB,
    FailSafeANoOssd,
    FailSafeAOssd,
    FailSafeB,
    WirelessMaster,
});
