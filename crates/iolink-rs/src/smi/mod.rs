// crates/iolink-rs/src/smi/mod.rs
//! Standardized Master Interface (SMI): the request/confirmation boundary of
//! the master.

pub mod arg_block;

pub use arg_block::{
    ArgBlock, ArgBlockId, DiagEntry, DsData, EventCode, JobError, MasterIdent, PortConfig,
    PortConfigList, PortStatusList, SmiErrorType,
};

use crate::hal::IolinkError;
use crate::port::Context;
use log::debug;

/// SMI services executed by the master's worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmiService {
    /// SMI_MasterIdentification
    MasterIdentification,
    /// SMI_PortConfiguration
    PortConfiguration,
    /// SMI_ReadbackPortConfiguration
    ReadbackPortConfiguration,
    /// SMI_PortStatus
    PortStatus,
    /// SMI_ParServToDS
    ParServToDs,
    /// SMI_DSToParServ
    DsToParServ,
}

/// An SMI service request as handed over by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmiRequest {
    /// ArgBlockID the client expects in the confirmation.
    pub exp_arg_block_id: ArgBlockId,
    /// Length the client claims for `arg_block`, identifier included.
    pub arg_block_len: u16,
    pub arg_block: ArgBlock,
}

impl SmiRequest {
    /// Builds a request whose length matches the encoded argument block.
    pub fn new(exp_arg_block_id: ArgBlockId, arg_block: ArgBlock) -> Self {
        Self {
            exp_arg_block_id,
            arg_block_len: arg_block.encoded_len() as u16,
            arg_block,
        }
    }

    /// Decodes a raw argument block received from the client.
    pub fn from_bytes(exp_arg_block_id: ArgBlockId, bytes: &[u8]) -> Result<Self, IolinkError> {
        Ok(Self {
            exp_arg_block_id,
            arg_block_len: bytes.len() as u16,
            arg_block: ArgBlock::decode(bytes)?,
        })
    }

    /// ArgBlockID of the carried block, used as reference in the reply.
    pub fn ref_arg_block_id(&self) -> ArgBlockId {
        self.arg_block.id()
    }
}

/// Validates a request before a service acts on it.
///
/// Checks run in order: reference id, length, expected id. The first failing
/// check is reported as a job error, except for a wrong expected id when the
/// service defines no error type for it (`expected_id_error == None`), which
/// is dropped silently.
pub(crate) fn check_arg_block(
    ctx: &mut Context<'_>,
    request: &SmiRequest,
    ref_arg_block_id: ArgBlockId,
    arg_block_len: usize,
    exp_arg_block_id: ArgBlockId,
    expected_id_error: Option<SmiErrorType>,
) -> bool {
    let actual_ref = request.ref_arg_block_id();
    let actual_exp = request.exp_arg_block_id;

    let error = if actual_ref != ref_arg_block_id {
        Some(SmiErrorType::ArgBlockNotSupported)
    } else if usize::from(request.arg_block_len) != arg_block_len {
        Some(SmiErrorType::ArgBlockLengthInvalid)
    } else if actual_exp != exp_arg_block_id {
        match expected_id_error {
            Some(error) => Some(error),
            None => {
                debug!(
                    "[SMI] Port {}: dropping request expecting {:#06x}",
                    ctx.port_number(),
                    actual_exp.0
                );
                return false;
            }
        }
    } else {
        None
    };

    match error {
        Some(error) => {
            ctx.joberror_ind(actual_exp, actual_ref, error);
            false
        }
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_length_is_derived_from_block() {
        let request = SmiRequest::new(ArgBlockId::VOID_BLOCK, ArgBlock::PortConfigList(PortConfigList::default()));
        assert_eq!(request.arg_block_len, 14);
        assert_eq!(request.ref_arg_block_id(), ArgBlockId::PORT_CFG_LIST);
        assert_eq!(SmiRequest::new(ArgBlockId::MASTERIDENT, ArgBlock::Void).arg_block_len, 2);
    }

    #[test]
    fn test_request_from_bytes() {
        let request = SmiRequest::from_bytes(ArgBlockId::PORT_STATUS_LIST, &[0xFF, 0xF0]).unwrap();
        assert_eq!(request.arg_block, ArgBlock::Void);
        assert_eq!(request.arg_block_len, 2);
        assert!(SmiRequest::from_bytes(ArgBlockId::VOID_BLOCK, &[0xFF]).is_err());
    }
}
