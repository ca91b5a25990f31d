//! Host command decoding.
//!
//! The host sends one command per packet: a command code followed by its
//! arguments, multi-byte integers big-endian. [`Command::parse`] decodes a
//! packet without copying and reports how many bytes it consumed.

use crate::bus::{Fade, LedColor, ServoColor};
use crate::motion::{ActuatorId, ArmMask, Position};

pub const DC_DIRECT_CMD: u8 = 0x00;
pub const DC_MVMT_CMD: u8 = 0x01;
pub const DC_START_MVMT_CMD: u8 = 0x02;
pub const DC_CHARGE_MVMT_CMD: u8 = 0x03;
pub const DC_GET_POSITION_CMD: u8 = 0x04;
pub const SERVO_DIRECT_CMD: u8 = 0x10;
pub const SERVO_MVMT_CMD: u8 = 0x11;
pub const SERVO_START_MVMT_CMD: u8 = 0x12;
pub const SERVO_CHARGE_MVMT_CMD: u8 = 0x13;
pub const SERVO_GET_POSITION_CMD: u8 = 0x14;
pub const MODULE_SERVO_POS_CMD: u8 = 0x20;
pub const MODULE_SERVO_COLOR_CMD: u8 = 0x21;
pub const MODULE_LED_CMD: u8 = 0x22;

/// Bytes per waypoint in a charge-movement packet.
pub const WAYPOINT_RECORD_LEN: usize = 13;

/// Why a packet could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    Empty,
    /// The packet ends before the command's arguments do.
    Truncated { expected: usize, actual: usize },
    /// Reserved or unknown command code.
    Unsupported(u8),
    InvalidActuator(u8),
    InvalidServoColor(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Direction and PWM match value for one DC motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotorDrive {
    pub direction: Direction,
    pub duty: u32,
}

impl MotorDrive {
    /// Direction byte 1 drives forward, 2 backward, anything else leaves
    /// the motor as it is.
    fn decode(direction: u8, duty: u32) -> Option<Self> {
        let direction = match direction {
            0x01 => Direction::Forward,
            0x02 => Direction::Backward,
            _ => return None,
        };
        Some(Self { direction, duty })
    }
}

/// One waypoint of a charge-movement packet, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaypointRequest {
    pub actuator: u8,
    pub start_ms: u32,
    pub stop_ms: u32,
    pub position: Position,
}

/// Waypoint records borrowed from a charge-movement packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaypointBatch<'a> {
    records: &'a [u8],
}

impl<'a> WaypointBatch<'a> {
    pub fn len(&self) -> usize {
        self.records.len() / WAYPOINT_RECORD_LEN
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = WaypointRequest> + 'a {
        self.records
            .chunks_exact(WAYPOINT_RECORD_LEN)
            .map(|record| WaypointRequest {
                actuator: record[0],
                start_ms: be_u32(&record[1..]),
                stop_ms: be_u32(&record[5..]),
                position: be_u32(&record[9..]),
            })
    }
}

/// A decoded host command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Drive the two DC motors directly.
    DriveMotors {
        right: Option<MotorDrive>,
        left: Option<MotorDrive>,
    },
    /// Write an actuator output immediately, bypassing the scheduler.
    ServoDirect {
        actuator: ActuatorId,
        position: Position,
    },
    StartMovement(ArmMask),
    /// Queue waypoints for later movement.
    ChargeMovement(WaypointBatch<'a>),
    ModuleServoPosition { slot: u8, position: u8 },
    ModuleServoColor { slot: u8, color: ServoColor },
    ModuleLed(LedColor),
}

impl<'a> Command<'a> {
    /// Decode the command at the start of `packet`.
    ///
    /// Returns the command and the number of bytes it occupies.
    pub fn parse(packet: &'a [u8]) -> Result<(Self, usize), ParseError> {
        let (&code, args) = packet.split_first().ok_or(ParseError::Empty)?;
        let command = match code {
            DC_DIRECT_CMD => {
                let args = take(args, 10)?;
                Self::DriveMotors {
                    right: MotorDrive::decode(args[0], be_u32(&args[1..])),
                    left: MotorDrive::decode(args[5], be_u32(&args[6..])),
                }
            }
            SERVO_DIRECT_CMD => {
                let args = take(args, 5)?;
                let actuator =
                    ActuatorId::new(args[0]).ok_or(ParseError::InvalidActuator(args[0]))?;
                Self::ServoDirect {
                    actuator,
                    position: be_u32(&args[1..]),
                }
            }
            SERVO_START_MVMT_CMD => {
                let args = take(args, 1)?;
                Self::StartMovement(ArmMask::from_bits(args[0]))
            }
            SERVO_CHARGE_MVMT_CMD => {
                let count = *take(args, 1)?.first().ok_or(ParseError::Empty)?;
                let records = take(&args[1..], usize::from(count) * WAYPOINT_RECORD_LEN)
                    .map_err(|_| ParseError::Truncated {
                        expected: 2 + usize::from(count) * WAYPOINT_RECORD_LEN,
                        actual: packet.len(),
                    })?;
                Self::ChargeMovement(WaypointBatch { records })
            }
            MODULE_SERVO_POS_CMD => {
                let args = take(args, 2)?;
                Self::ModuleServoPosition {
                    slot: args[0],
                    position: args[1],
                }
            }
            MODULE_SERVO_COLOR_CMD => {
                let args = take(args, 2)?;
                let color =
                    ServoColor::from_raw(args[1]).ok_or(ParseError::InvalidServoColor(args[1]))?;
                Self::ModuleServoColor {
                    slot: args[0],
                    color,
                }
            }
            MODULE_LED_CMD => {
                let args = take(args, 4)?;
                Self::ModuleLed(LedColor::new(
                    args[0],
                    args[1],
                    args[2],
                    Fade::from_raw(args[3]),
                ))
            }
            other => return Err(ParseError::Unsupported(other)),
        };
        Ok((command, 1 + command.args_len()))
    }

    /// Argument bytes following the command code.
    fn args_len(&self) -> usize {
        match self {
            Self::DriveMotors { .. } => 10,
            Self::ServoDirect { .. } => 5,
            Self::StartMovement(_) => 1,
            Self::ChargeMovement(batch) => 1 + batch.records.len(),
            Self::ModuleServoPosition { .. } | Self::ModuleServoColor { .. } => 2,
            Self::ModuleLed(_) => 4,
        }
    }
}

/// The first `len` argument bytes, or a truncation error.
fn take(args: &[u8], len: usize) -> Result<&[u8], ParseError> {
    args.get(..len).ok_or(ParseError::Truncated {
        expected: len + 1,
        actual: args.len() + 1,
    })
}

/// Callers guarantee at least four bytes.
fn be_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
