#![no_std]

pub mod bus;
pub mod channel;
pub mod command;
pub mod dispatch;
pub mod motion;
pub mod shared;
pub mod status;

pub use bus::{
    BusEvent, BusLine, BusState, BusTimings, ChainId, CycleOutcome, Fade, LedColor, Level,
    ModuleBus, ModuleError, ModuleKind, ModuleRegistry, ServoColor,
};
pub use channel::{Channel, Receiver, Sender, TryReceiveError, TrySendError};
pub use command::{Command, Direction, MotorDrive, MotorSide, ParseError, WaypointRequest};
pub use dispatch::{DispatchError, Dispatcher, Rejected};
pub use motion::{
    ActuatorId, ArmId, ArmMask, MotionScheduler, Position, Waypoint, WaypointError, WaypointList,
};
pub use shared::{SharedBus, SharedMotion};
pub use status::{StatusChannel, StatusEvent, StatusSender, StatusSink};

pub use embassy_time::{Duration, Instant};

/// PWM outputs of the arm actuators.
///
/// Implement this trait per board. The motion scheduler writes every
/// interpolated position through it and reads it back when a movement
/// starts.
pub trait ActuatorOutput {
    /// Drive `actuator` to `position`.
    fn set_position(&mut self, actuator: ActuatorId, position: Position);

    /// Position `actuator` is currently driven to.
    fn position(&self, actuator: ActuatorId) -> Position;
}

/// H-bridge outputs of the two DC motors.
pub trait MotorDriver {
    fn drive(&mut self, side: MotorSide, drive: MotorDrive);
}
