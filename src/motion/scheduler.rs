use embassy_time::{Duration, Instant};

#[cfg(feature = "esp32-log")]
use esp_println::println;

use super::{
    ACTUATOR_COUNT, ActuatorId, ArmId, ArmMask, Position, Waypoint, WaypointError, WaypointList,
};
use crate::ActuatorOutput;
use crate::status::{StatusEvent, StatusSink};

/// Waypoints each actuator can hold when no depth is given.
pub const DEFAULT_WAYPOINT_DEPTH: usize = 32;

/// Movement state of one arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MotionSession {
    /// Set by [`MotionScheduler::start_movement`], cleared once every list
    /// of the arm is empty.
    pub active: bool,
    /// Instant the waypoint offsets are measured from.
    pub reference: Instant,
}

impl MotionSession {
    const fn idle() -> Self {
        Self {
            active: false,
            reference: Instant::from_ticks(0),
        }
    }
}

/// Waypoint interpolation engine, advanced once per millisecond.
///
/// `DEPTH` bounds the number of queued waypoints per actuator.
pub struct MotionScheduler<const DEPTH: usize = DEFAULT_WAYPOINT_DEPTH> {
    lists: [WaypointList<DEPTH>; ACTUATOR_COUNT],
    /// Position each actuator held when its current waypoint became active.
    /// Only updated when a waypoint completes.
    actual: [Position; ACTUATOR_COUNT],
    sessions: [MotionSession; 2],
}

impl<const DEPTH: usize> MotionScheduler<DEPTH> {
    pub const fn new() -> Self {
        Self {
            lists: [const { WaypointList::new() }; ACTUATOR_COUNT],
            actual: [0; ACTUATOR_COUNT],
            sessions: [MotionSession::idle(); 2],
        }
    }

    /// Queue a waypoint for `actuator`.
    pub fn enqueue(&mut self, actuator: ActuatorId, waypoint: Waypoint) -> Result<(), WaypointError> {
        let result = self.lists[actuator.index()].insert(waypoint);
        #[cfg(feature = "esp32-log")]
        if let Err(error) = result {
            println!(
                "[MotionScheduler.enqueue] actuator {} rejected waypoint: {:?}",
                actuator.raw(),
                error
            );
        }
        result
    }

    /// Queue a waypoint from raw host values.
    pub fn enqueue_raw(
        &mut self,
        actuator: u8,
        start_ms: u32,
        stop_ms: u32,
        target: Position,
    ) -> Result<(), WaypointError> {
        let actuator = ActuatorId::new(actuator).ok_or(WaypointError::UnknownActuator)?;
        let waypoint = Waypoint::from_millis(start_ms, stop_ms, target)?;
        self.enqueue(actuator, waypoint)
    }

    /// Start a movement session for every arm in `arms`.
    ///
    /// Snapshots the current output of the arm's actuators as interpolation
    /// base and measures waypoint offsets from `now`.
    pub fn start_movement<O: ActuatorOutput>(&mut self, arms: ArmMask, now: Instant, output: &O) {
        for arm in arms.arms() {
            for actuator in arm.actuators() {
                self.actual[actuator.index()] = output.position(actuator);
            }
            self.sessions[arm.index()] = MotionSession {
                active: true,
                reference: now,
            };
        }
    }

    /// Drop every queued waypoint of `actuator`.
    ///
    /// The actuator holds whatever position it was last driven to.
    pub fn clear(&mut self, actuator: ActuatorId) {
        self.lists[actuator.index()].clear();
    }

    pub fn is_moving(&self, arm: ArmId) -> bool {
        self.sessions[arm.index()].active
    }

    pub fn session(&self, arm: ArmId) -> MotionSession {
        self.sessions[arm.index()]
    }

    /// Interpolation base of `actuator`.
    pub fn actual_position(&self, actuator: ActuatorId) -> Position {
        self.actual[actuator.index()]
    }

    /// Number of waypoints still queued for `actuator`.
    pub fn pending(&self, actuator: ActuatorId) -> usize {
        self.lists[actuator.index()].len()
    }

    pub fn waypoints(&self, actuator: ActuatorId) -> &WaypointList<DEPTH> {
        &self.lists[actuator.index()]
    }

    /// Advance all active arms to `now`.
    ///
    /// Called from the 1 ms timer interrupt.
    pub fn tick<O, S>(&mut self, now: Instant, output: &mut O, status: &S)
    where
        O: ActuatorOutput,
        S: StatusSink + ?Sized,
    {
        for arm in ArmId::ALL {
            let session = self.sessions[arm.index()];
            if !session.active {
                continue;
            }

            let mut all_empty = true;
            for actuator in arm.actuators() {
                if self.lists[actuator.index()].is_empty() {
                    continue;
                }
                all_empty = false;
                self.advance(actuator, session.reference, now, output, status);
            }

            if all_empty {
                self.sessions[arm.index()].active = false;
                #[cfg(feature = "esp32-log")]
                println!("[MotionScheduler.tick] {:?} arm finished", arm);
                status.report(StatusEvent::MovementFinished { arm });
            }
        }
    }

    /// Drive one actuator toward the head of its list.
    fn advance<O, S>(
        &mut self,
        actuator: ActuatorId,
        reference: Instant,
        now: Instant,
        output: &mut O,
        status: &S,
    ) where
        O: ActuatorOutput,
        S: StatusSink + ?Sized,
    {
        let index = actuator.index();
        let Some(&waypoint) = self.lists[index].head() else {
            return;
        };
        if reference + waypoint.start() > now {
            return;
        }

        let remaining = (reference + waypoint.stop()).saturating_duration_since(now);
        if remaining.as_ticks() == 0 {
            let target = waypoint.target();
            self.actual[index] = target;
            output.set_position(actuator, target);
            self.lists[index].pop_front();
            status.report(StatusEvent::WaypointRetired {
                actuator,
                position: target,
            });
            return;
        }

        let position = interpolate(
            self.actual[index],
            waypoint.target(),
            waypoint.duration() - remaining,
            waypoint.duration(),
        );
        output.set_position(actuator, position);
    }
}

impl<const DEPTH: usize> Default for MotionScheduler<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

/// Linear interpolation from `from` toward `to` after `elapsed` of `duration`.
///
/// `duration` must be non-zero and not shorter than `elapsed`.
#[allow(clippy::cast_possible_truncation)]
fn interpolate(from: Position, to: Position, elapsed: Duration, duration: Duration) -> Position {
    let elapsed = u128::from(elapsed.as_ticks());
    let duration = u128::from(duration.as_ticks());
    if from <= to {
        let delta = u128::from(to - from) * elapsed / duration;
        from + delta as Position
    } else {
        let delta = u128::from(from - to) * elapsed / duration;
        from - delta as Position
    }
}
