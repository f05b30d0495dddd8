// crates/iolink-rs/src/cm/events.rs

/// Events driving the Configuration Manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmEvent {
    // --- Port modes, raised while checking a new configuration ---
    /// IO-Link with identity check (T1).
    IolManual,
    /// IO-Link accepting any device (T2).
    IolAutostart,
    /// Digital input on C/Q (T9).
    DiCq,
    /// Digital output on C/Q (T10).
    DoCq,
    /// Port switched off (T11).
    Deactivated,
    /// The configuration holds values outside their enumeration (T12).
    Unknown,

    // --- System Management ---
    SmComReady,
    SmFault,
    SmOperate,
    SmComLost,

    // --- Data Storage ---
    DsReady,
    DsChange,
    DsFault,

    /// SMI_PortConfiguration received.
    CfgChange,
}
