// crates/iolink-rs/tests/harness/mod.rs
#![allow(dead_code)]

pub mod device;
pub mod services;

pub use device::SimulatedDevice;
pub use services::{Call, MockServices};

use iolink_rs::cm::CmState;
use iolink_rs::ds::{DsContext, DsState};
use iolink_rs::hal::SmParameterList;
use iolink_rs::smi::{ArgBlock, ArgBlockId, EventCode, PortConfig, PortConfigList, SmiRequest};
use iolink_rs::types::{PortMode, SmPortMode, TransmissionRate, ValidationCheck};
use iolink_rs::{Dispatcher, MasterHandle};
use std::collections::HashMap;

pub const DEVICE_VENDOR_ID: u16 = 0x0123;
pub const DEVICE_ID: u32 = 0x00A1_B2C3;
pub const DEVICE_CYCLE_TIME: u8 = 0x40;

/// Drives a dispatcher synchronously and plays the devices on its ports.
pub struct Harness {
    pub dispatcher: Dispatcher<MockServices>,
    pub handle: MasterHandle,
    /// Devices answering AL requests. Requests on a port without a device
    /// stay open for the test to answer through `handle`.
    pub devices: HashMap<u8, SimulatedDevice>,
    answered: usize,
}

impl Harness {
    pub fn new(port_count: u8) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();

        let (mut dispatcher, handle) =
            Dispatcher::new(port_count, MockServices::default()).unwrap();
        let services = dispatcher.services_mut();
        services.real = SmParameterList {
            revision_id: 0x11,
            cycle_time: DEVICE_CYCLE_TIME,
            vendor_id: DEVICE_VENDOR_ID,
            device_id: DEVICE_ID,
            ..SmParameterList::default()
        };
        services.rate = TransmissionRate::Com2;

        Self {
            dispatcher,
            handle,
            devices: HashMap::new(),
            answered: 0,
        }
    }

    pub fn attach(&mut self, port: u8, device: SimulatedDevice) {
        self.devices.insert(port, device);
    }

    pub fn device(&self, port: u8) -> &SimulatedDevice {
        &self.devices[&port]
    }

    /// Runs jobs and lets the devices answer until nothing is left to do.
    pub fn run(&mut self) {
        loop {
            let executed = self.dispatcher.run_until_idle();
            let answered = self.answer_requests();
            if executed == 0 && answered == 0 {
                break;
            }
        }
    }

    fn answer_requests(&mut self) -> usize {
        let pending = self.dispatcher.services().calls[self.answered..].to_vec();
        self.answered += pending.len();

        let mut answered = 0;
        for call in pending {
            match call {
                Call::AlRead(port, index, subindex) => {
                    if let Some(device) = self.devices.get(&port) {
                        let (data, error) = device.read(index, subindex);
                        self.handle.al_read_cnf(port, &data, error).unwrap();
                        answered += 1;
                    }
                }
                Call::AlWrite(port, index, subindex, data) => {
                    if let Some(device) = self.devices.get_mut(&port) {
                        let error = device.write(index, subindex, &data);
                        self.handle.al_write_cnf(port, error).unwrap();
                        answered += 1;
                    }
                }
                _ => {}
            }
        }
        answered
    }

    pub fn calls(&self) -> &[Call] {
        &self.dispatcher.services().calls
    }

    /// Removes and returns the calls recorded so far.
    pub fn take_calls(&mut self) -> Vec<Call> {
        self.answered = 0;
        std::mem::take(&mut self.dispatcher.services_mut().calls)
    }

    /// SMI confirmations and indications sent for `port`.
    pub fn smi_replies(&self, port: u8) -> Vec<(ArgBlockId, ArgBlock)> {
        self.calls()
            .iter()
            .filter_map(|call| match call {
                Call::Smi(p, id, block) if *p == port => Some((*id, block.clone())),
                _ => None,
            })
            .collect()
    }

    /// Event codes of the port events sent for `port`.
    pub fn port_events(&self, port: u8) -> Vec<EventCode> {
        self.smi_replies(port)
            .into_iter()
            .filter_map(|(_, block)| match block {
                ArgBlock::PortEvent(entry) => Some(entry.event_code),
                _ => None,
            })
            .collect()
    }

    pub fn al_requests(&self, port: u8) -> Vec<Call> {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::AlRead(p, ..) | Call::AlWrite(p, ..) if *p == port))
            .cloned()
            .collect()
    }

    pub fn cm_state(&self, port: u8) -> CmState {
        self.dispatcher.port(port).unwrap().cm().state()
    }

    pub fn ds_state(&self, port: u8) -> DsState {
        self.dispatcher.port(port).unwrap().ds().state()
    }

    pub fn ds(&self, port: u8) -> &DsContext {
        self.dispatcher.port(port).unwrap().ds()
    }

    /// Submits SMI_PortConfiguration and runs it.
    pub fn configure(&mut self, port: u8, cfg: PortConfig) {
        let request = SmiRequest::new(
            ArgBlockId::VOID_BLOCK,
            ArgBlock::PortConfigList(PortConfigList::from(&cfg)),
        );
        self.handle.smi_port_configuration(port, request).unwrap();
        self.run();
    }

    /// Submits SM_PortMode_ind and runs it.
    pub fn mode_ind(&mut self, port: u8, mode: SmPortMode) {
        self.handle.sm_port_mode_ind(port, mode).unwrap();
        self.run();
    }

    /// Configures `port` and walks SM through COMREADY and OPERATE.
    pub fn bring_up(&mut self, port: u8, cfg: PortConfig) {
        self.configure(port, cfg);
        self.mode_ind(port, SmPortMode::ComReady);
        self.mode_ind(port, SmPortMode::Operate);
    }
}

pub fn port_config(mode: PortMode, validation: ValidationCheck) -> PortConfig {
    PortConfig {
        port_mode: mode,
        validation_backup: validation,
        port_cycle_time: DEVICE_CYCLE_TIME,
        vendor_id: DEVICE_VENDOR_ID,
        device_id: DEVICE_ID,
        ..PortConfig::default()
    }
}

/// IO-Link with backup and restore, expecting the harness device.
pub fn backup_config() -> PortConfig {
    port_config(PortMode::IolManual, ValidationCheck::V11BackupRestore)
}
