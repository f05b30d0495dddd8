// crates/iolink-rs/tests/ds_test.rs

#[cfg(feature = "std")]
mod harness;

#[cfg(feature = "std")]
mod tests {
    use super::harness::{
        Call, DEVICE_ID, DEVICE_VENDOR_ID, Harness, SimulatedDevice, backup_config, port_config,
    };
    use iolink_rs::cm::CmState;
    use iolink_rs::ds::{DsCommand, DsState, check_config};
    use iolink_rs::smi::{
        ArgBlock, ArgBlockId, DsData, EventCode, JobError, PortConfig, SmiErrorType, SmiRequest,
    };
    use iolink_rs::types::{DsFault, PortMode, PortStatus, SmPortMode, ValidationCheck};

    /// The backup set `SimulatedDevice::with_parameters` uploads.
    const UPLOADED_SET: [u8; 19] = [
        0x00, 0x10, 0x00, 0x02, 0x01, 0x02, // 0x0010/0
        0x00, 0x40, 0x01, 0x01, 0xAA, // 0x0040/1
        0x00, 0x41, 0x00, 0x04, 0x10, 0x20, 0x30, 0x40, // 0x0041/0
    ];

    fn restore_config() -> PortConfig {
        port_config(PortMode::IolManual, ValidationCheck::V11Restore)
    }

    fn load_backup(h: &mut Harness, port: u8, data: &[u8]) {
        let set = DsData {
            checksum: 0,
            vendor_id: DEVICE_VENDOR_ID,
            device_id: DEVICE_ID,
            function_id: 0,
            data: data.to_vec(),
        };
        let request = SmiRequest::new(ArgBlockId::VOID_BLOCK, ArgBlock::DsData(set));
        h.handle.smi_par_serv_to_ds(port, request).unwrap();
        h.run();
    }

    #[test]
    fn test_com_error_during_identity_check() {
        let mut h = Harness::new(1);
        h.configure(1, backup_config());
        h.mode_ind(1, SmPortMode::ComReady);
        assert_eq!(h.al_requests(1), vec![Call::AlRead(1, 3, 3)]);

        h.handle.al_read_cnf(1, &[], SmiErrorType::ComErr).unwrap();
        h.run();

        assert_eq!(h.port_events(1), vec![EventCode::BACKUP_INCON_ID]);
        assert_eq!(h.ds_state(1), DsState::WaitingOnDsActivity);
        assert_eq!(h.cm_state(1), CmState::PortFault);
        let cm = h.dispatcher.port(1).unwrap().cm();
        assert_eq!(cm.ds_fault(), DsFault::Id);
    }

    #[test]
    fn test_upload_on_first_startup() {
        let mut h = Harness::new(1);
        h.attach(1, SimulatedDevice::with_parameters());
        h.configure(1, backup_config());
        h.mode_ind(1, SmPortMode::ComReady);

        assert_eq!(h.cm_state(1), CmState::WaitingOnOperate);
        assert_eq!(h.ds_state(1), DsState::WaitingOnDsActivity);
        assert_eq!(h.device(1).commands, vec![1, 2]);
        assert_eq!(h.device(1).state_property & 0x80, 0);
        assert!(h.calls().contains(&Call::Operate(1)));

        let ds = h.ds(1);
        let master = ds.master();
        assert!(master.valid);
        assert_eq!(master.data.as_slice(), UPLOADED_SET);
        assert_eq!((master.vendor_id, master.device_id), (DEVICE_VENDOR_ID, DEVICE_ID));
        assert_eq!(master.checksum, 0xCAFE_0001);
        assert_eq!(ds.index_list().len(), 3);
        assert_eq!(ds.command(), DsCommand::UploadEnd);

        assert!(check_config(ds, &backup_config()));
        let other = PortConfig {
            device_id: DEVICE_ID + 1,
            ..backup_config()
        };
        assert!(!check_config(ds, &other));
    }

    #[test]
    fn test_upload_reads_every_listed_parameter() {
        let mut h = Harness::new(1);
        h.attach(1, SimulatedDevice::with_parameters());
        h.configure(1, backup_config());
        h.take_calls();
        h.mode_ind(1, SmPortMode::ComReady);

        let requests = h.al_requests(1);
        assert_eq!(
            requests,
            vec![
                Call::AlRead(1, 3, 3),
                Call::AlRead(1, 3, 2),
                Call::AlWrite(1, 3, 1, vec![1]),
                Call::AlRead(1, 3, 5),
                Call::AlRead(1, 0x10, 0),
                Call::AlRead(1, 0x40, 1),
                Call::AlRead(1, 0x41, 0),
                Call::AlRead(1, 3, 4),
                Call::AlWrite(1, 3, 1, vec![2]),
            ]
        );
    }

    #[test]
    fn test_failed_upload_keeps_previous_backup() {
        let mut h = Harness::new(1);
        let mut device = SimulatedDevice::with_parameters();
        device.read_errors.insert((0x40, 1), SmiErrorType::IdxNotAvail);
        h.attach(1, device);
        h.configure(1, backup_config());
        h.mode_ind(1, SmPortMode::ComReady);

        assert_eq!(h.port_events(1), vec![EventCode::BACKUP_INCON_UL]);
        assert_eq!(h.cm_state(1), CmState::PortFault);
        assert_eq!(h.device(1).commands, vec![1, DsCommand::Break as u8]);

        let ds = h.ds(1);
        assert_eq!(ds.fault(), DsFault::Up);
        assert!(!ds.master().valid);
        assert_eq!(ds.master().size(), 0);
        assert_eq!(ds.state(), DsState::WaitingOnDsActivity);
    }

    #[test]
    fn test_locked_storage_is_reported() {
        let mut h = Harness::new(1);
        h.attach(
            1,
            SimulatedDevice {
                state_property: 0x06,
                ..SimulatedDevice::default()
            },
        );
        h.configure(1, backup_config());
        h.mode_ind(1, SmPortMode::ComReady);

        assert_eq!(h.port_events(1), vec![EventCode::BACKUP_INCON]);
        assert_eq!(h.cm_state(1), CmState::PortFault);
        assert!(!h.ds(1).is_enabled());
        assert!(h.device(1).commands.is_empty());
    }

    #[test]
    fn test_oversized_device_storage_is_reported() {
        let mut h = Harness::new(1);
        h.attach(
            1,
            SimulatedDevice {
                ds_size: 4096,
                ..SimulatedDevice::default()
            },
        );
        h.configure(1, backup_config());
        h.mode_ind(1, SmPortMode::ComReady);

        assert_eq!(h.port_events(1), vec![EventCode::BACKUP_INCON_SIZE]);
        assert_eq!(h.ds(1).device().size_max, 4096);
        assert_eq!(h.ds_state(1), DsState::WaitingOnDsActivity);
    }

    #[test]
    fn test_backup_of_other_device_is_rejected() {
        let mut h = Harness::new(1);
        h.attach(1, SimulatedDevice::default());
        let set = DsData {
            vendor_id: 0x0999,
            device_id: 7,
            data: UPLOADED_SET.to_vec(),
            ..DsData::default()
        };
        h.handle
            .smi_par_serv_to_ds(1, SmiRequest::new(ArgBlockId::VOID_BLOCK, ArgBlock::DsData(set)))
            .unwrap();
        h.run();

        // The stored identity does not match the configuration, so startup
        // drops it before the device is checked.
        h.configure(1, backup_config());
        assert!(!h.ds(1).master().valid);

        h.mode_ind(1, SmPortMode::ComReady);
        assert_eq!(h.cm_state(1), CmState::WaitingOnOperate);
    }

    #[test]
    fn test_download_restores_replacement_device() {
        let mut h = Harness::new(1);
        h.attach(1, SimulatedDevice::default());
        load_backup(&mut h, 1, &UPLOADED_SET);
        assert_eq!(h.smi_replies(1), vec![(ArgBlockId::DS_DATA, ArgBlock::Void)]);

        h.configure(1, restore_config());
        h.mode_ind(1, SmPortMode::ComReady);

        assert_eq!(h.cm_state(1), CmState::WaitingOnOperate);
        let device = h.device(1);
        assert_eq!(device.commands, vec![3, 4]);
        assert_eq!(device.params[&(0x10, 0)], vec![0x01, 0x02]);
        assert_eq!(device.params[&(0x40, 1)], vec![0xAA]);
        assert_eq!(device.params[&(0x41, 0)], vec![0x10, 0x20, 0x30, 0x40]);

        let writes: Vec<_> = h
            .al_requests(1)
            .into_iter()
            .filter(|call| matches!(call, Call::AlWrite(_, index, ..) if *index != 3))
            .collect();
        assert_eq!(writes.len(), 3);
        assert!(h.ds(1).master().valid);
    }

    #[test]
    fn test_uploaded_parameters_restore_replacement_device() {
        let mut h = Harness::new(1);
        let original = SimulatedDevice::with_parameters();
        h.attach(1, original.clone());
        h.configure(1, backup_config());
        h.mode_ind(1, SmPortMode::ComReady);

        let reads: Vec<(u16, u8)> = h
            .take_calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::AlRead(_, index, subindex) if index != 3 => Some((index, subindex)),
                _ => None,
            })
            .collect();
        assert_eq!(reads, original.index_list);

        // Same device type, factory parameters.
        let mut replacement = SimulatedDevice {
            checksum: 0xCAFE_0002,
            index_list: original.index_list.clone(),
            ..SimulatedDevice::default()
        };
        for (key, value) in &original.params {
            replacement.params.insert(*key, vec![0; value.len()]);
        }
        h.attach(1, replacement);
        h.mode_ind(1, SmPortMode::ComLost);
        h.configure(1, restore_config());
        h.take_calls();
        h.mode_ind(1, SmPortMode::ComReady);

        let writes: Vec<(u16, u8, Vec<u8>)> = h
            .al_requests(1)
            .into_iter()
            .filter_map(|call| match call {
                Call::AlWrite(_, index, subindex, data) if index != 3 => {
                    Some((index, subindex, data))
                }
                _ => None,
            })
            .collect();
        let written: Vec<(u16, u8)> = writes.iter().map(|(i, s, _)| (*i, *s)).collect();
        assert_eq!(written, reads);
        for (index, subindex, data) in &writes {
            assert_eq!(data, &original.params[&(*index, *subindex)]);
        }
        assert_eq!(h.device(1).params, original.params);
        assert_eq!(h.device(1).commands, vec![3, 4]);
        assert_eq!(h.cm_state(1), CmState::WaitingOnOperate);
    }

    #[test]
    fn test_client_backup_rejected_during_transfer() {
        let mut h = Harness::new(1);
        h.configure(1, backup_config());
        // No device attached: the first Data Storage read stays open.
        h.mode_ind(1, SmPortMode::ComReady);
        assert!(!h.ds_state(1).is_idle());
        h.take_calls();

        load_backup(&mut h, 1, &UPLOADED_SET);

        assert_eq!(
            h.smi_replies(1),
            vec![(
                ArgBlockId::DS_DATA,
                ArgBlock::JobError(JobError {
                    exp_arg_block_id: ArgBlockId::VOID_BLOCK,
                    error: SmiErrorType::ServiceTempUnavailable,
                })
            )]
        );
        assert!(!h.ds(1).master().valid);
        assert_eq!(h.ds(1).master().size(), 0);
    }

    #[test]
    fn test_matching_checksum_skips_download() {
        let mut h = Harness::new(1);
        h.attach(1, SimulatedDevice::with_parameters());
        h.bring_up(1, backup_config());
        assert_eq!(h.device(1).commands, vec![1, 2]);

        // Same device comes back: the checksums match and nothing moves.
        h.configure(1, backup_config());
        h.mode_ind(1, SmPortMode::ComReady);

        assert_eq!(h.device(1).commands, vec![1, 2]);
        assert_eq!(h.cm_state(1), CmState::WaitingOnOperate);
    }

    #[test]
    fn test_failed_parameter_write_aborts_download() {
        let mut h = Harness::new(1);
        let mut device = SimulatedDevice::default();
        device.write_errors.insert((0x40, 1), SmiErrorType::AppDev);
        h.attach(1, device);
        load_backup(&mut h, 1, &UPLOADED_SET);

        h.configure(1, restore_config());
        h.mode_ind(1, SmPortMode::ComReady);

        assert_eq!(h.port_events(1), vec![EventCode::BACKUP_INCON_DL]);
        assert_eq!(h.cm_state(1), CmState::PortFault);
        assert_eq!(h.device(1).commands, vec![3, DsCommand::Break as u8]);
        assert_eq!(h.ds(1).fault(), DsFault::Down);
        assert_eq!(
            h.dispatcher.port(1).unwrap().info().port_status_info,
            PortStatus::PortDiag
        );
    }

    #[test]
    fn test_malformed_backup_aborts_download() {
        let mut h = Harness::new(1);
        h.attach(1, SimulatedDevice::default());
        // Second record claims more data than there is.
        load_backup(&mut h, 1, &[0x00, 0x10, 0x00, 0x01, 0x05, 0x00, 0x20, 0x00, 0x09, 0x01]);

        h.configure(1, restore_config());
        h.mode_ind(1, SmPortMode::ComReady);

        assert_eq!(h.port_events(1), vec![EventCode::BACKUP_INCON_DL]);
        assert_eq!(h.device(1).params[&(0x10, 0)], vec![0x05]);
        assert_eq!(h.device(1).commands, vec![3, DsCommand::Break as u8]);
    }

    #[test]
    fn test_com_error_on_checksum_read_drops_the_device() {
        let mut h = Harness::new(1);
        let mut device = SimulatedDevice::default();
        device.read_errors.insert((3, 4), SmiErrorType::ComErr);
        h.attach(1, device);
        h.configure(1, backup_config());
        h.mode_ind(1, SmPortMode::ComReady);

        assert_eq!(h.port_events(1), vec![EventCode::NO_DEV]);
        assert_eq!(h.cm_state(1), CmState::CheckPortMode);
        assert_eq!(
            h.dispatcher.port(1).unwrap().info().port_status_info,
            PortStatus::NoDevice
        );
        assert_eq!(h.ds(1).fault(), DsFault::ComErr);
        assert_eq!(h.ds_state(1), DsState::WaitingOnDsActivity);
    }

    #[test]
    fn test_upload_request_while_disabled_is_ignored() {
        let mut h = Harness::new(1);
        h.attach(1, SimulatedDevice::with_parameters());
        h.bring_up(1, port_config(PortMode::IolAutostart, ValidationCheck::NoCheck));
        assert_eq!(h.ds_state(1), DsState::Off);

        h.handle.ds_upload(1).unwrap();
        h.run();

        assert_eq!(h.ds_state(1), DsState::Off);
        assert!(h.device(1).commands.is_empty());
        assert_eq!(h.cm_state(1), CmState::PortActive);
    }

    #[test]
    fn test_backup_is_handed_to_client() {
        let mut h = Harness::new(1);
        h.attach(1, SimulatedDevice::with_parameters());
        h.bring_up(1, backup_config());
        h.take_calls();

        let request = SmiRequest::new(ArgBlockId::DS_DATA, ArgBlock::Void);
        h.handle.smi_ds_to_par_serv(1, request).unwrap();
        h.run();

        let expected = DsData {
            checksum: 0xCAFE_0001,
            vendor_id: DEVICE_VENDOR_ID,
            device_id: DEVICE_ID,
            function_id: 0,
            data: UPLOADED_SET.to_vec(),
        };
        assert_eq!(
            h.smi_replies(1),
            vec![(ArgBlockId::VOID_BLOCK, ArgBlock::DsData(expected))]
        );
    }

    #[test]
    fn test_client_backup_round_trip() {
        let mut h = Harness::new(1);
        load_backup(&mut h, 1, &UPLOADED_SET);
        h.take_calls();

        let request = SmiRequest::new(ArgBlockId::DS_DATA, ArgBlock::Void);
        h.handle.smi_ds_to_par_serv(1, request).unwrap();
        h.run();

        match h.smi_replies(1).pop() {
            Some((ArgBlockId::VOID_BLOCK, ArgBlock::DsData(set))) => {
                assert_eq!(set.data, UPLOADED_SET);
                assert_eq!((set.vendor_id, set.device_id, set.checksum), (DEVICE_VENDOR_ID, DEVICE_ID, 0));
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn test_backup_requests_without_backup() {
        let mut h = Harness::new(1);
        let request = SmiRequest::new(ArgBlockId::DS_DATA, ArgBlock::Void);
        h.handle.smi_ds_to_par_serv(1, request).unwrap();

        // A client set larger than the master's storage.
        let set = DsData {
            data: vec![0; 2049],
            ..DsData::default()
        };
        let oversized = SmiRequest::new(ArgBlockId::VOID_BLOCK, ArgBlock::DsData(set));
        h.handle.smi_par_serv_to_ds(1, oversized).unwrap();

        let wrong_block = SmiRequest::new(ArgBlockId::VOID_BLOCK, ArgBlock::Void);
        h.handle.smi_par_serv_to_ds(1, wrong_block).unwrap();
        h.run();

        assert_eq!(
            h.smi_replies(1),
            vec![
                (
                    ArgBlockId::VOID_BLOCK,
                    ArgBlock::JobError(JobError {
                        exp_arg_block_id: ArgBlockId::DS_DATA,
                        error: SmiErrorType::ArgBlockInconsistent,
                    })
                ),
                (
                    ArgBlockId::DS_DATA,
                    ArgBlock::JobError(JobError {
                        exp_arg_block_id: ArgBlockId::VOID_BLOCK,
                        error: SmiErrorType::ArgBlockInconsistent,
                    })
                ),
                (
                    ArgBlockId::VOID_BLOCK,
                    ArgBlock::JobError(JobError {
                        exp_arg_block_id: ArgBlockId::VOID_BLOCK,
                        error: SmiErrorType::ArgBlockNotSupported,
                    })
                ),
            ]
        );
        assert!(!h.ds(1).master().valid);
    }
}
