// crates/iolink-rs/src/ds/events.rs

/// Events driving the Data Storage state machine.
///
/// The `T<n>` tags name the transitions of the state diagram the event
/// triggers. (Reference: IO-Link Interface Spec v1.1.3, Table 104)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DsEvent {
    /// T1
    Enable,
    /// T2, T14
    Startup,
    /// T3, T25, T26, T27
    Ready,
    /// T4, T13
    Upload,
    /// T5
    FaultDone,
    /// T15
    FaultId,
    /// T17
    FaultSize,
    /// T23
    FaultUl,
    /// T28
    FaultDl,
    /// T29
    FaultLock,
    /// T6
    EnableCom,
    /// T7
    ClrDisa,
    /// T8
    EnableNoC,
    /// T9, T10
    Delete,
    /// T11
    Clear,
    /// T12
    Disable,
    /// T16, T18, T22
    Passed,
    /// T19, T21
    DoUpload,
    /// T20, T43
    NoUpload,
    /// T24
    Download,
    /// T30, T37
    MoreData,
    /// T31
    ReadDone,
    /// T35
    StoreData,
    /// T26
    UlDone,
    /// T32, T39
    DevErr,
    /// T33, T34, T36, T40, T42
    ComErr,
    /// T38
    WrDone,
    /// T41
    DlDone,
    /// New port configuration, re-evaluates the activation state.
    Init,
}
