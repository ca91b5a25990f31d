//! Applies host commands to the shared motion and bus state.

use embassy_time::Instant;

#[cfg(feature = "esp32-log")]
use esp_println::println;

use crate::bus::ModuleError;
use crate::command::{Command, MotorSide, ParseError, WaypointBatch, WaypointRequest};
use crate::motion::{DEFAULT_WAYPOINT_DEPTH, WaypointError};
use crate::shared::{SharedBus, SharedMotion};
use crate::{ActuatorOutput, MotorDriver};

/// Why a command could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    Parse(ParseError),
    Waypoint(WaypointError),
    Module(ModuleError),
}

impl From<ParseError> for DispatchError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<WaypointError> for DispatchError {
    fn from(error: WaypointError) -> Self {
        Self::Waypoint(error)
    }
}

impl From<ModuleError> for DispatchError {
    fn from(error: ModuleError) -> Self {
        Self::Module(error)
    }
}

/// A packet that could not be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rejected {
    /// Bytes the packet occupies; the next command starts after them.
    /// Zero when the packet could not be decoded.
    pub consumed: usize,
    pub error: DispatchError,
}

/// Command-context front end of one controller.
///
/// Module commands go to the chain the dispatcher was built with.
pub struct Dispatcher<'a, const DEPTH: usize = DEFAULT_WAYPOINT_DEPTH> {
    motion: &'a SharedMotion<DEPTH>,
    bus: &'a SharedBus,
}

impl<'a, const DEPTH: usize> Dispatcher<'a, DEPTH> {
    pub const fn new(motion: &'a SharedMotion<DEPTH>, bus: &'a SharedBus) -> Self {
        Self { motion, bus }
    }

    /// Decode the packet and apply the command it starts with.
    ///
    /// Returns the number of bytes consumed. A command that decodes but
    /// cannot be applied still reports its length in [`Rejected`].
    pub fn dispatch<O, M>(
        &self,
        packet: &[u8],
        now: Instant,
        outputs: &mut O,
        motors: &mut M,
    ) -> Result<usize, Rejected>
    where
        O: ActuatorOutput,
        M: MotorDriver,
    {
        let (command, consumed) = Command::parse(packet).map_err(|error| {
            #[cfg(feature = "esp32-log")]
            println!("[Dispatcher.dispatch] rejected packet: {:?}", error);
            Rejected {
                consumed: 0,
                error: error.into(),
            }
        })?;
        self.apply(command, now, outputs, motors)
            .map_err(|error| Rejected { consumed, error })?;
        Ok(consumed)
    }

    /// Apply a decoded command.
    pub fn apply<O, M>(
        &self,
        command: Command<'_>,
        now: Instant,
        outputs: &mut O,
        motors: &mut M,
    ) -> Result<(), DispatchError>
    where
        O: ActuatorOutput,
        M: MotorDriver,
    {
        match command {
            Command::DriveMotors { right, left } => {
                if let Some(drive) = right {
                    motors.drive(MotorSide::Right, drive);
                }
                if let Some(drive) = left {
                    motors.drive(MotorSide::Left, drive);
                }
            }
            Command::ServoDirect { actuator, position } => {
                outputs.set_position(actuator, position);
            }
            Command::StartMovement(arms) => {
                self.motion
                    .with(|scheduler| scheduler.start_movement(arms, now, outputs));
            }
            Command::ChargeMovement(batch) => self.charge(batch)?,
            Command::ModuleServoPosition { slot, position } => {
                self.bus.with(|bus| bus.set_servo_position(slot, position))?;
            }
            Command::ModuleServoColor { slot, color } => {
                self.bus.with(|bus| bus.set_servo_color(slot, color))?;
            }
            Command::ModuleLed(color) => self.bus.with(|bus| bus.set_led_color(color)),
        }
        Ok(())
    }

    /// Queue one waypoint from the command context.
    ///
    /// Takes its own critical section, so the motion tick and the bus can
    /// run between the waypoints of a batch.
    pub fn enqueue(&self, request: WaypointRequest) -> Result<(), WaypointError> {
        self.motion.with(|scheduler| {
            scheduler.enqueue_raw(
                request.actuator,
                request.start_ms,
                request.stop_ms,
                request.position,
            )
        })
    }

    /// Queue every waypoint of the batch.
    ///
    /// A rejected waypoint does not stop the rest; the first rejection is
    /// returned.
    fn charge(&self, batch: WaypointBatch<'_>) -> Result<(), WaypointError> {
        let mut first_error = None;
        for request in batch.iter() {
            if let Err(error) = self.enqueue(request) {
                first_error.get_or_insert(error);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
