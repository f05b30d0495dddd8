// crates/iolink-rs/src/cm/smi.rs
//! SMI services answered by the Configuration Manager.

use super::{CmEvent, ConfigManager};
use crate::fsm::StateMachine;
use crate::port::Context;
use crate::smi::{
    ArgBlock, ArgBlockId, MasterIdent, PortConfigList, PortStatusList, SmiErrorType, SmiRequest,
    check_arg_block,
};
use crate::types::{MASTER_ID, MASTER_VENDOR_ID, MasterType, PortStatus, PortType};
use alloc::vec::Vec;

/// SMI_MasterIdentification
pub fn smi_master_identification(ctx: &mut Context<'_>, request: &SmiRequest) {
    if !check_arg_block(ctx, request, ArgBlockId::VOID_BLOCK, 2, ArgBlockId::MASTERIDENT, None) {
        return;
    }

    let mut port_types = heapless::Vec::new();
    for _ in 0..ctx.port_count {
        // port_count never exceeds the capacity.
        let _ = port_types.push(PortType::ClassA);
    }
    let ident = ArgBlock::MasterIdent(MasterIdent {
        vendor_id: MASTER_VENDOR_ID,
        master_id: MASTER_ID,
        master_type: MasterType::MasterAccessory,
        features_1: 0,
        features_2: 0,
        port_types,
    });
    ctx.smi_cnf(request.ref_arg_block_id(), &ident);
}

/// SMI_PortConfiguration: validated here, applied by CM on CFG_CHANGE.
pub fn smi_port_configuration(ctx: &mut Context<'_>, request: SmiRequest) {
    if !check_arg_block(
        ctx,
        &request,
        ArgBlockId::PORT_CFG_LIST,
        PortConfigList::LEN,
        ArgBlockId::VOID_BLOCK,
        Some(SmiErrorType::ArgBlockInconsistent),
    ) {
        return;
    }

    ctx.port.cm.last_request = Some(request);
    ConfigManager::new(ctx).fire(CmEvent::CfgChange);
}

/// SMI_ReadbackPortConfiguration
pub fn smi_readback_port_configuration(ctx: &mut Context<'_>, request: &SmiRequest) {
    if !check_arg_block(
        ctx,
        request,
        ArgBlockId::VOID_BLOCK,
        2,
        ArgBlockId::PORT_CFG_LIST,
        Some(SmiErrorType::ArgBlockInconsistent),
    ) {
        return;
    }

    let list = PortConfigList::from(&ctx.port.cm.cfg);
    ctx.smi_cnf(request.ref_arg_block_id(), &ArgBlock::PortConfigList(list));
}

/// SMI_PortStatus
pub fn smi_port_status(ctx: &mut Context<'_>, request: &SmiRequest) {
    if !check_arg_block(ctx, request, ArgBlockId::VOID_BLOCK, 2, ArgBlockId::PORT_STATUS_LIST, None) {
        return;
    }

    let info = ctx.port.info;
    let master_cycle_time = match info.port_status_info {
        PortStatus::NoDevice
        | PortStatus::Deactivated
        | PortStatus::DigitalInput
        | PortStatus::DigitalOutput => 0,
        _ => info.cycle_time,
    };
    let status = ArgBlock::PortStatusList(PortStatusList {
        port_status_info: info.port_status_info,
        port_quality_info: info.port_quality_info,
        revision_id: info.revision_id,
        transmission_rate: info.transmission_rate,
        master_cycle_time,
        vendor_id: info.vendor_id,
        device_id: info.device_id,
        diag_entries: Vec::new(),
    });
    ctx.smi_cnf(request.ref_arg_block_id(), &status);
}
