use embassy_time::Duration;
use heapless::Vec;

use super::Position;

/// Reasons a waypoint is refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaypointError {
    /// The actuator's list already holds its full capacity.
    Full,
    /// `stop` lies before `start`.
    InvalidWindow,
    /// The actuator id is outside `0..8`.
    UnknownActuator,
}

/// A position target reached linearly over a time window.
///
/// `start` and `stop` are offsets from the movement session start.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waypoint {
    start: Duration,
    stop: Duration,
    target: Position,
}

impl Waypoint {
    /// Create a waypoint. A zero-length window is allowed and snaps to
    /// `target` as soon as it is due.
    pub const fn new(start: Duration, stop: Duration, target: Position) -> Result<Self, WaypointError> {
        if stop.as_ticks() < start.as_ticks() {
            return Err(WaypointError::InvalidWindow);
        }
        Ok(Self {
            start,
            stop,
            target,
        })
    }

    /// Build from the host's millisecond offsets.
    pub const fn from_millis(start_ms: u32, stop_ms: u32, target: Position) -> Result<Self, WaypointError> {
        Self::new(
            Duration::from_millis(start_ms as u64),
            Duration::from_millis(stop_ms as u64),
            target,
        )
    }

    pub const fn start(&self) -> Duration {
        self.start
    }

    pub const fn stop(&self) -> Duration {
        self.stop
    }

    pub const fn target(&self) -> Position {
        self.target
    }

    /// Length of the window.
    pub const fn duration(&self) -> Duration {
        Duration::from_ticks(self.stop.as_ticks() - self.start.as_ticks())
    }
}

/// Waypoints of one actuator, sorted by start offset.
///
/// The head is the only waypoint the scheduler looks at. Waypoints with equal
/// start offsets keep reverse insertion order: a new one goes in front of the
/// first existing entry whose start is equal or later.
#[derive(Debug, Clone, Default)]
pub struct WaypointList<const N: usize> {
    items: Vec<Waypoint, N>,
}

impl<const N: usize> WaypointList<N> {
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Insert keeping the list sorted by start offset.
    pub fn insert(&mut self, waypoint: Waypoint) -> Result<(), WaypointError> {
        let index = self
            .items
            .iter()
            .position(|item| item.start >= waypoint.start)
            .unwrap_or(self.items.len());
        self.items
            .insert(index, waypoint)
            .map_err(|_| WaypointError::Full)
    }

    /// The waypoint currently being executed.
    pub fn head(&self) -> Option<&Waypoint> {
        self.items.first()
    }

    /// Remove and return the head.
    pub fn pop_front(&mut self) -> Option<Waypoint> {
        if self.items.is_empty() {
            None
        } else {
            Some(self.items.remove(0))
        }
    }

    /// Remove and return the last waypoint.
    pub fn pop_back(&mut self) -> Option<Waypoint> {
        self.items.pop()
    }

    /// Check whether a waypoint starts exactly at `start`.
    pub fn contains(&self, start: Duration) -> bool {
        self.items
            .iter()
            .take_while(|item| item.start <= start)
            .any(|item| item.start == start)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    pub fn iter(&self) -> impl Iterator<Item = &Waypoint> {
        self.items.iter()
    }
}
