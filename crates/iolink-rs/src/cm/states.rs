// crates/iolink-rs/src/cm/states.rs

/// States of the Configuration Manager.
/// (Reference: IO-Link Interface Spec v1.1.3, Figure 92)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CmState {
    /// Evaluates the target mode of a new port configuration.
    CheckPortMode,
    /// System Management is establishing communication.
    SmStartup,
    /// Data Storage is checking, uploading or restoring the parameters.
    DsParamManager,
    /// The device was rejected by SM or DS.
    PortFault,
    /// Waits for SM to reach OPERATE.
    WaitingOnOperate,
    /// The device is in OPERATE and exchanges process data.
    PortActive,
    /// The port runs as a standard digital input or output.
    PortDido,
    /// The port is switched off.
    #[default]
    PortDeactivated,
}
