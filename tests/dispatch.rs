mod tests {
    use myrtio_actuator_core::bus::{BusTimings, ChainId, ModuleError};
    use myrtio_actuator_core::command::{Direction, MotorDrive, MotorSide, ParseError};
    use myrtio_actuator_core::motion::{ActuatorId, ArmId, Position, WaypointError};
    use myrtio_actuator_core::status::{StatusChannel, StatusEvent};
    use myrtio_actuator_core::{
        ActuatorOutput, Command, DispatchError, Dispatcher, Duration, Fade, Instant, LedColor,
        MotorDriver, Rejected, SharedBus, SharedMotion,
    };

    #[derive(Default)]
    struct MockPwm {
        positions: [Position; 8],
    }

    impl ActuatorOutput for MockPwm {
        fn set_position(&mut self, actuator: ActuatorId, position: Position) {
            self.positions[actuator.index()] = position;
        }

        fn position(&self, actuator: ActuatorId) -> Position {
            self.positions[actuator.index()]
        }
    }

    #[derive(Default)]
    struct MockMotors {
        calls: Vec<(MotorSide, MotorDrive)>,
    }

    impl MotorDriver for MockMotors {
        fn drive(&mut self, side: MotorSide, drive: MotorDrive) {
            self.calls.push((side, drive));
        }
    }

    fn charge_packet(records: &[(u8, u32, u32, u32)]) -> Vec<u8> {
        let mut packet = vec![0x13, u8::try_from(records.len()).unwrap()];
        for &(actuator, start_ms, stop_ms, position) in records {
            packet.push(actuator);
            packet.extend_from_slice(&start_ms.to_be_bytes());
            packet.extend_from_slice(&stop_ms.to_be_bytes());
            packet.extend_from_slice(&position.to_be_bytes());
        }
        packet
    }

    fn actuator(id: u8) -> ActuatorId {
        ActuatorId::new(id).unwrap()
    }

    const T0: Instant = Instant::from_millis(500);

    #[test]
    fn test_drive_motors() {
        let motion = SharedMotion::<8>::new();
        let bus = SharedBus::new(ChainId::Head, BusTimings::DEFAULT);
        let dispatcher = Dispatcher::new(&motion, &bus);
        let mut pwm = MockPwm::default();
        let mut motors = MockMotors::default();

        let packet = [0x00, 0x02, 0, 0, 0, 0x40, 0x01, 0, 0, 0, 0x20];
        let consumed = dispatcher
            .dispatch(&packet, T0, &mut pwm, &mut motors)
            .unwrap();

        assert_eq!(consumed, 11);
        assert_eq!(
            motors.calls,
            vec![
                (
                    MotorSide::Right,
                    MotorDrive {
                        direction: Direction::Backward,
                        duty: 0x40,
                    }
                ),
                (
                    MotorSide::Left,
                    MotorDrive {
                        direction: Direction::Forward,
                        duty: 0x20,
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_servo_direct_writes_output() {
        let motion = SharedMotion::<8>::new();
        let bus = SharedBus::new(ChainId::Head, BusTimings::DEFAULT);
        let dispatcher = Dispatcher::new(&motion, &bus);
        let mut pwm = MockPwm::default();
        let mut motors = MockMotors::default();

        dispatcher
            .dispatch(&[0x10, 6, 0, 0, 0x01, 0x2C], T0, &mut pwm, &mut motors)
            .unwrap();
        assert_eq!(pwm.position(actuator(6)), 300);
        assert!(motors.calls.is_empty());
    }

    #[test]
    fn test_charge_then_start_runs_movement() {
        let motion = SharedMotion::<8>::new();
        let bus = SharedBus::new(ChainId::Head, BusTimings::DEFAULT);
        let dispatcher = Dispatcher::new(&motion, &bus);
        let mut pwm = MockPwm::default();
        let mut motors = MockMotors::default();
        let status = StatusChannel::<8>::new();

        let packet = charge_packet(&[(4, 0, 20, 400), (5, 0, 10, 100)]);
        dispatcher
            .dispatch(&packet, T0, &mut pwm, &mut motors)
            .unwrap();
        dispatcher
            .dispatch(&[0x12, 0x02], T0, &mut pwm, &mut motors)
            .unwrap();
        assert!(motion.with(|scheduler| scheduler.is_moving(ArmId::Right)));

        motion.tick(T0 + Duration::from_millis(10), &mut pwm, &status);
        assert_eq!(pwm.position(actuator(4)), 200);
        assert_eq!(pwm.position(actuator(5)), 100);

        motion.tick(T0 + Duration::from_millis(20), &mut pwm, &status);
        motion.tick(T0 + Duration::from_millis(21), &mut pwm, &status);
        assert_eq!(pwm.position(actuator(4)), 400);
        assert!(!motion.with(|scheduler| scheduler.is_moving(ArmId::Right)));
        assert_eq!(
            status.drain().last(),
            Some(StatusEvent::MovementFinished { arm: ArmId::Right })
        );
    }

    #[test]
    fn test_charge_keeps_valid_waypoints() {
        let motion = SharedMotion::<8>::new();
        let bus = SharedBus::new(ChainId::Head, BusTimings::DEFAULT);
        let dispatcher = Dispatcher::new(&motion, &bus);
        let mut pwm = MockPwm::default();
        let mut motors = MockMotors::default();

        let packet = charge_packet(&[(9, 0, 10, 1), (1, 20, 10, 1), (2, 0, 10, 1)]);
        let result = dispatcher.dispatch(&packet, T0, &mut pwm, &mut motors);

        assert_eq!(
            result,
            Err(Rejected {
                consumed: packet.len(),
                error: DispatchError::Waypoint(WaypointError::UnknownActuator),
            })
        );
        assert_eq!(motion.with(|scheduler| scheduler.pending(actuator(1))), 0);
        assert_eq!(motion.with(|scheduler| scheduler.pending(actuator(2))), 1);
    }

    #[test]
    fn test_module_commands_target_the_chain() {
        let motion = SharedMotion::<8>::new();
        let bus = SharedBus::new(ChainId::LeftArm, BusTimings::DEFAULT);
        let dispatcher = Dispatcher::new(&motion, &bus);
        let mut pwm = MockPwm::default();
        let mut motors = MockMotors::default();

        assert_eq!(
            dispatcher.dispatch(&[0x20, 0, 0x80], T0, &mut pwm, &mut motors),
            Err(Rejected {
                consumed: 3,
                error: DispatchError::Module(ModuleError::NotAServo),
            })
        );
        assert_eq!(
            dispatcher.dispatch(&[0x21, 7, 0xF0], T0, &mut pwm, &mut motors),
            Err(Rejected {
                consumed: 3,
                error: DispatchError::Module(ModuleError::SlotOutOfRange),
            })
        );

        dispatcher
            .dispatch(&[0x22, 7, 1, 2, 3], T0, &mut pwm, &mut motors)
            .unwrap();
        let expected = LedColor::new(7, 1, 2, Fade::Ms800).encode();
        assert_eq!(bus.with(|bus| bus.registry().led_pair()), expected);
        assert_eq!(bus.with(|bus| bus.chain()), ChainId::LeftArm);
    }

    #[test]
    fn test_parse_errors_are_reported() {
        let motion = SharedMotion::<8>::new();
        let bus = SharedBus::new(ChainId::Head, BusTimings::DEFAULT);
        let dispatcher = Dispatcher::new(&motion, &bus);
        let mut pwm = MockPwm::default();
        let mut motors = MockMotors::default();

        assert_eq!(
            dispatcher.dispatch(&[0x04], T0, &mut pwm, &mut motors),
            Err(Rejected {
                consumed: 0,
                error: DispatchError::Parse(ParseError::Unsupported(0x04)),
            })
        );
        assert_eq!(
            dispatcher.dispatch(&[], T0, &mut pwm, &mut motors),
            Err(Rejected {
                consumed: 0,
                error: DispatchError::Parse(ParseError::Empty),
            })
        );
    }

    #[test]
    fn test_rejected_command_can_be_stepped_over() {
        let motion = SharedMotion::<8>::new();
        let bus = SharedBus::new(ChainId::Head, BusTimings::DEFAULT);
        let dispatcher = Dispatcher::new(&motion, &bus);
        let mut pwm = MockPwm::default();
        let mut motors = MockMotors::default();

        let buffer = [0x20, 0, 0x80, 0x12, 0x01];
        let consumed = match dispatcher.dispatch(&buffer, T0, &mut pwm, &mut motors) {
            Ok(consumed) => consumed,
            Err(rejected) => {
                assert_eq!(
                    rejected.error,
                    DispatchError::Module(ModuleError::NotAServo)
                );
                rejected.consumed
            }
        };
        assert_eq!(consumed, 3);

        let consumed = dispatcher
            .dispatch(&buffer[consumed..], T0, &mut pwm, &mut motors)
            .unwrap();
        assert_eq!(consumed, 2);
        assert!(motion.with(|scheduler| scheduler.is_moving(ArmId::Left)));
    }

    #[test]
    fn test_motion_ticks_between_batch_waypoints() {
        let motion = SharedMotion::<8>::new();
        let bus = SharedBus::new(ChainId::Head, BusTimings::DEFAULT);
        let dispatcher = Dispatcher::new(&motion, &bus);
        let mut pwm = MockPwm::default();
        let mut motors = MockMotors::default();

        dispatcher
            .dispatch(&charge_packet(&[(0, 0, 10, 100)]), T0, &mut pwm, &mut motors)
            .unwrap();
        dispatcher
            .dispatch(&[0x12, 0x01], T0, &mut pwm, &mut motors)
            .unwrap();

        let packet = charge_packet(&[(1, 0, 20, 200), (2, 0, 20, 400), (3, 0, 20, 800)]);
        let (Command::ChargeMovement(batch), _) = Command::parse(&packet).unwrap() else {
            panic!("expected a charge movement");
        };
        for (ms, request) in (1..).zip(batch.iter()) {
            dispatcher.enqueue(request).unwrap();
            motion.tick(T0 + Duration::from_millis(ms), &mut pwm, &());
        }

        assert_eq!(pwm.position(actuator(0)), 30);
        assert_eq!(pwm.position(actuator(1)), 30);
        assert_eq!(pwm.position(actuator(2)), 60);
        assert_eq!(pwm.position(actuator(3)), 120);
        assert_eq!(motion.with(|scheduler| scheduler.pending(actuator(3))), 1);
    }
}
