// crates/iolink-rs/src/ds/smi.rs
//! SMI services giving a client access to the backup set.

use super::log_ctx;
use crate::log::{port_info, port_warn};
use crate::port::Context;
use crate::smi::{ArgBlock, ArgBlockId, DsData, SmiErrorType, SmiRequest, check_arg_block};

/// SMI_ParServToDS: loads a backup set supplied by the client.
///
/// The set is treated as opaque. Its checksum is unknown, so the next
/// startup with download enabled always restores it into the device.
/// Rejected while an upload or download is running on the port.
pub fn smi_par_serv_to_ds(ctx: &mut Context<'_>, request: &SmiRequest) {
    let ref_id = request.ref_arg_block_id();
    let exp_id = request.exp_arg_block_id;

    let ArgBlock::DsData(set) = &request.arg_block else {
        ctx.joberror_ind(exp_id, ref_id, SmiErrorType::ArgBlockNotSupported);
        return;
    };
    if usize::from(request.arg_block_len) != request.arg_block.encoded_len() {
        ctx.joberror_ind(exp_id, ref_id, SmiErrorType::ArgBlockLengthInvalid);
        return;
    }
    if exp_id != ArgBlockId::VOID_BLOCK {
        ctx.joberror_ind(exp_id, ref_id, SmiErrorType::ArgBlockNotSupported);
        return;
    }
    let state = ctx.port.ds.state();
    if !state.is_idle() {
        port_warn!(log_ctx(ctx), "backup set rejected in state {:?}", state);
        ctx.joberror_ind(exp_id, ref_id, SmiErrorType::ServiceTempUnavailable);
        return;
    }

    let master = &mut ctx.port.ds.master;
    if set.data.len() > master.size_max || master.data.load(&set.data).is_err() {
        ctx.joberror_ind(exp_id, ref_id, SmiErrorType::ArgBlockInconsistent);
        return;
    }
    master.checksum = 0;
    master.vendor_id = set.vendor_id;
    master.device_id = set.device_id;
    master.function_id = set.function_id;
    master.valid = true;

    port_info!(
        log_ctx(ctx),
        "backup set of {} bytes loaded by client",
        set.data.len()
    );
    ctx.voidblock_cnf(ref_id);
}

/// SMI_DSToParServ: hands the stored backup set to the client.
pub fn smi_ds_to_par_serv(ctx: &mut Context<'_>, request: &SmiRequest) {
    if !check_arg_block(
        ctx,
        request,
        ArgBlockId::VOID_BLOCK,
        2,
        ArgBlockId::DS_DATA,
        Some(SmiErrorType::ArgBlockInconsistent),
    ) {
        return;
    }

    let master = &ctx.port.ds.master;
    if !master.valid {
        ctx.joberror_ind(
            request.exp_arg_block_id,
            request.ref_arg_block_id(),
            SmiErrorType::ArgBlockInconsistent,
        );
        return;
    }

    let block = ArgBlock::DsData(DsData {
        checksum: master.checksum,
        vendor_id: master.vendor_id,
        device_id: master.device_id,
        function_id: master.function_id,
        data: master.data.as_slice().to_vec(),
    });
    ctx.smi_cnf(request.ref_arg_block_id(), &block);
}
