// crates/iolink-rs/tests/harness/services.rs
use iolink_rs::hal::{
    ApplicationLayer, OnRequestData, ProcessData, SmParameterList, SmiListener, SystemManagement,
};
use iolink_rs::smi::{ArgBlock, ArgBlockId};
use iolink_rs::types::{PortNumber, TransmissionRate};

/// One call made by the master into its collaborators.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetPortConfig(u8, SmParameterList),
    Operate(u8),
    AlRead(u8, u16, u8),
    AlWrite(u8, u16, u8, Vec<u8>),
    OdStart(u8),
    OdStop(u8),
    PdStart(u8),
    PdStop(u8),
    Smi(u8, ArgBlockId, ArgBlock),
    PdInd(u8, Vec<u8>),
}

/// Records every collaborator call in order.
#[derive(Debug, Default)]
pub struct MockServices {
    pub calls: Vec<Call>,
    /// What SM reports as read from the device.
    pub real: SmParameterList,
    pub rate: TransmissionRate,
}

impl SystemManagement for MockServices {
    fn sm_set_port_config(&mut self, port: PortNumber, params: &SmParameterList) {
        self.calls.push(Call::SetPortConfig(port.0, *params));
    }

    fn sm_operate(&mut self, port: PortNumber) {
        self.calls.push(Call::Operate(port.0));
    }

    fn sm_real_parameters(&self, _port: PortNumber) -> SmParameterList {
        self.real
    }

    fn sm_transmission_rate(&self, _port: PortNumber) -> TransmissionRate {
        self.rate
    }
}

impl ApplicationLayer for MockServices {
    fn al_read_req(&mut self, port: PortNumber, index: u16, subindex: u8) {
        self.calls.push(Call::AlRead(port.0, index, subindex));
    }

    fn al_write_req(&mut self, port: PortNumber, index: u16, subindex: u8, data: &[u8]) {
        self.calls.push(Call::AlWrite(port.0, index, subindex, data.to_vec()));
    }
}

impl OnRequestData for MockServices {
    fn od_start(&mut self, port: PortNumber) {
        self.calls.push(Call::OdStart(port.0));
    }

    fn od_stop(&mut self, port: PortNumber) {
        self.calls.push(Call::OdStop(port.0));
    }
}

impl ProcessData for MockServices {
    fn pd_start(&mut self, port: PortNumber) {
        self.calls.push(Call::PdStart(port.0));
    }

    fn pd_stop(&mut self, port: PortNumber) {
        self.calls.push(Call::PdStop(port.0));
    }
}

impl SmiListener for MockServices {
    fn smi_cnf(&mut self, port: PortNumber, ref_arg_block_id: ArgBlockId, arg_block: &ArgBlock) {
        self.calls
            .push(Call::Smi(port.0, ref_arg_block_id, arg_block.clone()));
    }

    fn pd_ind(&mut self, port: PortNumber, data: &[u8]) {
        self.calls.push(Call::PdInd(port.0, data.to_vec()));
    }
}
