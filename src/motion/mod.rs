//! Timed motion for the eight PWM actuators (four per arm).
//!
//! Hosts queue [`Waypoint`]s per actuator, then start a movement session for
//! one or both arms. A 1 ms timer interrupt calls [`MotionScheduler::tick`],
//! which interpolates every due waypoint and retires the finished ones.

mod scheduler;
mod waypoint;

pub use scheduler::{DEFAULT_WAYPOINT_DEPTH, MotionScheduler, MotionSession};
pub use waypoint::{Waypoint, WaypointError, WaypointList};

/// Actuator position as written to the PWM layer.
pub type Position = u32;

/// Number of actuators on one arm.
pub const ACTUATORS_PER_ARM: usize = 4;

/// Total number of scheduled actuators.
pub const ACTUATOR_COUNT: usize = 2 * ACTUATORS_PER_ARM;

/// One of the two arms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmId {
    Left,
    Right,
}

impl ArmId {
    pub const ALL: [Self; 2] = [Self::Left, Self::Right];

    pub const fn index(self) -> usize {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }

    /// Actuators driven by this arm, in evaluation order.
    pub fn actuators(self) -> impl Iterator<Item = ActuatorId> {
        let base = self.index() * ACTUATORS_PER_ARM;
        #[allow(clippy::cast_possible_truncation)]
        (base..base + ACTUATORS_PER_ARM).map(|id| ActuatorId(id as u8))
    }
}

/// Actuator index `0..8`; `0..4` belong to the left arm, `4..8` to the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ActuatorId(u8);

impl ActuatorId {
    /// Returns `None` for ids outside `0..8`.
    pub const fn new(id: u8) -> Option<Self> {
        if (id as usize) < ACTUATOR_COUNT {
            Some(Self(id))
        } else {
            None
        }
    }

    pub const fn raw(self) -> u8 {
        self.0
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub const fn arm(self) -> ArmId {
        if (self.0 as usize) < ACTUATORS_PER_ARM {
            ArmId::Left
        } else {
            ArmId::Right
        }
    }
}

/// Set of arms as sent by the host: bit 0 = left, bit 1 = right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArmMask(u8);

impl ArmMask {
    pub const NONE: Self = Self(0);
    pub const LEFT: Self = Self(0x01);
    pub const RIGHT: Self = Self(0x02);
    pub const BOTH: Self = Self(0x03);

    /// Unknown bits are ignored.
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::BOTH.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, arm: ArmId) -> bool {
        let bit = match arm {
            ArmId::Left => Self::LEFT.0,
            ArmId::Right => Self::RIGHT.0,
        };
        self.0 & bit != 0
    }

    /// Arms selected by this mask.
    pub fn arms(self) -> impl Iterator<Item = ArmId> {
        ArmId::ALL.into_iter().filter(move |arm| self.contains(*arm))
    }
}

impl From<ArmId> for ArmMask {
    fn from(arm: ArmId) -> Self {
        match arm {
            ArmId::Left => Self::LEFT,
            ArmId::Right => Self::RIGHT,
        }
    }
}
