mod tests {
    use myrtio_actuator_core::bus::{ChainId, ModuleKind};
    use myrtio_actuator_core::channel::{Channel, TryReceiveError, TrySendError};
    use myrtio_actuator_core::motion::ArmId;
    use myrtio_actuator_core::status::{StatusChannel, StatusEvent, StatusSink};

    #[test]
    fn test_full_channel_counts_drops() {
        let channel = Channel::<u8, 2>::new();
        let sender = channel.sender();

        assert_eq!(sender.try_send(1), Ok(()));
        assert_eq!(sender.try_send(2), Ok(()));
        assert_eq!(sender.try_send(3), Err(TrySendError(3)));
        assert_eq!(channel.len(), 2);
        assert_eq!(channel.dropped(), 1);
    }

    #[test]
    fn test_receive_in_order() {
        let channel = Channel::<u8, 4>::new();
        let receiver = channel.receiver();

        assert_eq!(receiver.try_receive(), Err(TryReceiveError));
        channel.try_send(7).unwrap();
        channel.try_send(8).unwrap();
        assert_eq!(receiver.try_receive(), Ok(7));
        assert_eq!(channel.drain().collect::<Vec<_>>(), vec![8]);
        assert!(channel.is_empty());
    }

    #[test]
    fn test_status_sink_never_blocks() {
        let status = StatusChannel::<1>::new();
        let sender = status.sender();

        sender.report(StatusEvent::MovementFinished { arm: ArmId::Left });
        status.report(StatusEvent::ModuleDiscovered {
            chain: ChainId::RightArm,
            slot: 2,
            kind: ModuleKind::Led,
        });

        assert_eq!(status.dropped(), 1);
        assert_eq!(
            status.try_receive(),
            Ok(StatusEvent::MovementFinished { arm: ArmId::Left })
        );
        ().report(StatusEvent::ModuleSilent {
            chain: ChainId::Head,
            slot: 0,
        });
    }
}
