// crates/iolink-rs/src/log.rs
//! Port-scoped logging. Every line a state machine emits carries the layer
//! and the port it runs for, e.g. `[DS@3] backup stored, 19 bytes`.

use crate::types::PortNumber;
use core::fmt;

/// Identifies the layer and port a log line belongs to.
#[derive(Debug, Clone, Copy)]
pub struct PortLogContext {
    pub layer: &'static str,
    pub port: PortNumber,
}

impl PortLogContext {
    pub const fn new(layer: &'static str, port: PortNumber) -> Self {
        Self { layer, port }
    }
}

impl fmt::Display for PortLogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.layer, self.port)
    }
}

macro_rules! port_log {
    ($level:expr, $ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {
        ::log::log!($level, concat!("[{}] ", $fmt), $ctx $(, $($arg)+)?)
    };
}

macro_rules! port_error {
    ($ctx:expr, $($rest:tt)+) => { $crate::log::port_log!(::log::Level::Error, $ctx, $($rest)+) };
}

macro_rules! port_warn {
    ($ctx:expr, $($rest:tt)+) => { $crate::log::port_log!(::log::Level::Warn, $ctx, $($rest)+) };
}

macro_rules! port_info {
    ($ctx:expr, $($rest:tt)+) => { $crate::log::port_log!(::log::Level::Info, $ctx, $($rest)+) };
}

macro_rules! port_debug {
    ($ctx:expr, $($rest:tt)+) => { $crate::log::port_log!(::log::Level::Debug, $ctx, $($rest)+) };
}

macro_rules! port_trace {
    ($ctx:expr, $($rest:tt)+) => { $crate::log::port_log!(::log::Level::Trace, $ctx, $($rest)+) };
}

pub(crate) use port_debug;
pub(crate) use port_error;
pub(crate) use port_info;
pub(crate) use port_log;
pub(crate) use port_trace;
pub(crate) use port_warn;
