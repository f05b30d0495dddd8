#![cfg_attr(not(feature = "std"), no_std)]

// 'alloc' is used for dynamic allocation (e.g., Vec<u8> in argument blocks)
extern crate alloc;

// --- Foundation Modules ---
pub mod types;
pub mod hal;
mod log;

// --- Job Pool & Dispatcher ---
pub mod fsm;
pub mod job;
pub mod port;
#[cfg(feature = "std")]
pub mod dispatcher;

// --- Master Interface ---
pub mod smi;
#[cfg(feature = "std")]
pub mod master;

// --- Port Layers ---
pub mod cm;
pub mod ds;

// --- Top-level Exports ---
pub use types::{PortMode, PortNumber, PortStatus, SmPortMode, ValidationCheck};
pub use hal::{
    ApplicationLayer, IolinkError, OnRequestData, PoolKind, PortServices, ProcessData,
    SmParameterList, SmiListener, SystemManagement,
};
pub use smi::{ArgBlock, ArgBlockId, PortConfig, PortConfigList, SmiErrorType, SmiRequest};
pub use fsm::StateMachine;
pub use cm::CmState;
pub use ds::DsState;
#[cfg(feature = "std")]
pub use dispatcher::{Dispatcher, MasterHandle};
#[cfg(feature = "std")]
pub use master::{Master, MasterConfig};
