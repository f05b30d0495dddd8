// crates/iolink-rs/src/ds/states.rs

/// States of the Data Storage state machine.
/// (Reference: IO-Link Interface Spec v1.1.3, Figure 101 and Table 104)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DsState {
    /// Waits for DS_Init to decide between enabled and disabled.
    #[default]
    CheckActivationState,
    /// Idle, data storage enabled.
    WaitingOnDsActivity,
    /// Idle, data storage disabled.
    Off,

    // --- UploadDownload ---
    /// Compares the backup identity with the connected device.
    CheckIdentity,
    /// Compares the device's storage size with the master's capacity.
    CheckMemSize,
    /// Evaluates the device's State_Property.
    CheckUpload,
    /// Checks whether the master holds a valid backup.
    CheckDsValidity,
    /// Compares master and device parameter checksums.
    CheckChecksum,
    DsReady,
    DsFault,

    // --- Upload ---
    /// Walks the device's Index_List.
    DecomposeIl,
    /// Waits for one parameter read.
    ReadParameter,
    /// Waits for the checksum read and the upload-end command.
    StoreDataSet,
    UploadFault,

    // --- Download ---
    /// Walks the stored backup set record by record.
    DecomposeSet,
    /// Waits for one parameter write.
    WriteParameter,
    /// Waits for the download-end command and the checksum read.
    DownloadDone,
    DownloadFault,
}

impl DsState {
    /// No transfer with the device is in progress.
    pub fn is_idle(self) -> bool {
        matches!(
            self,
            DsState::CheckActivationState | DsState::WaitingOnDsActivity | DsState::Off
        )
    }
}
