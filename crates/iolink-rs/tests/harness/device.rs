// crates/iolink-rs/tests/harness/device.rs
use iolink_rs::smi::SmiErrorType;
use std::collections::{BTreeMap, HashMap};

/// An IO-Link device answering the acyclic requests of Data Storage.
#[derive(Debug, Clone)]
pub struct SimulatedDevice {
    /// Data_Storage_Size (index 3, subindex 3).
    pub ds_size: u32,
    /// State_Property (index 3, subindex 2).
    pub state_property: u8,
    /// Parameter_Checksum (index 3, subindex 4).
    pub checksum: u32,
    /// Index_List (index 3, subindex 5).
    pub index_list: Vec<(u16, u8)>,
    pub params: BTreeMap<(u16, u8), Vec<u8>>,
    /// Every value written to DS_Command, in order.
    pub commands: Vec<u8>,
    /// Errors returned instead of data for a given `(index, subindex)`.
    pub read_errors: HashMap<(u16, u8), SmiErrorType>,
    pub write_errors: HashMap<(u16, u8), SmiErrorType>,
}

impl Default for SimulatedDevice {
    fn default() -> Self {
        Self {
            ds_size: 64,
            state_property: 0,
            checksum: 0xCAFE_0001,
            index_list: Vec::new(),
            params: BTreeMap::new(),
            commands: Vec::new(),
            read_errors: HashMap::new(),
            write_errors: HashMap::new(),
        }
    }
}

impl SimulatedDevice {
    /// A device with three backup parameters that requests an upload.
    pub fn with_parameters() -> Self {
        let mut device = Self {
            state_property: 0x80,
            index_list: vec![(0x0010, 0), (0x0040, 1), (0x0041, 0)],
            ..Self::default()
        };
        device.params.insert((0x0010, 0), vec![0x01, 0x02]);
        device.params.insert((0x0040, 1), vec![0xAA]);
        device.params.insert((0x0041, 0), vec![0x10, 0x20, 0x30, 0x40]);
        device
    }

    pub fn read(&self, index: u16, subindex: u8) -> (Vec<u8>, SmiErrorType) {
        if let Some(error) = self.read_errors.get(&(index, subindex)) {
            return (Vec::new(), *error);
        }
        if index == 3 {
            let data = match subindex {
                2 => vec![self.state_property],
                3 => self.ds_size.to_be_bytes().to_vec(),
                4 => self.checksum.to_be_bytes().to_vec(),
                5 => {
                    let mut raw = Vec::new();
                    for (index, subindex) in &self.index_list {
                        raw.extend_from_slice(&index.to_be_bytes());
                        raw.push(*subindex);
                    }
                    raw.extend_from_slice(&[0, 0, 0]);
                    raw
                }
                _ => return (Vec::new(), SmiErrorType::SubIdxNotAvail),
            };
            return (data, SmiErrorType::None);
        }
        match self.params.get(&(index, subindex)) {
            Some(value) => (value.clone(), SmiErrorType::None),
            None => (Vec::new(), SmiErrorType::IdxNotAvail),
        }
    }

    pub fn write(&mut self, index: u16, subindex: u8, data: &[u8]) -> SmiErrorType {
        if let Some(error) = self.write_errors.get(&(index, subindex)) {
            return *error;
        }
        if (index, subindex) == (3, 1) {
            let command = data.first().copied().unwrap_or(0);
            self.commands.push(command);
            // UploadEnd clears DS_UPLOAD_FLAG.
            if command == 2 {
                self.state_property &= !0x80;
            }
            return SmiErrorType::None;
        }
        self.params.insert((index, subindex), data.to_vec());
        SmiErrorType::None
    }
}
