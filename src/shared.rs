//! State shared between the command context and the timer interrupts.
//!
//! Each wrapper owns its state machine inside a
//! `critical_section::Mutex<RefCell<_>>`. Every call runs inside one short
//! critical section, so a waypoint insertion can never interleave with the
//! motion tick reading the list head, and a pending-output write lands either
//! before or after a frame is latched.

use core::cell::RefCell;

use critical_section::Mutex;
use embassy_time::Instant;

use crate::ActuatorOutput;
use crate::bus::{BusEvent, BusLine, BusTimings, ChainId, CycleOutcome, ModuleBus};
use crate::motion::{DEFAULT_WAYPOINT_DEPTH, MotionScheduler};
use crate::status::StatusSink;

/// A [`MotionScheduler`] usable from a `static`.
pub struct SharedMotion<const DEPTH: usize = DEFAULT_WAYPOINT_DEPTH> {
    inner: Mutex<RefCell<MotionScheduler<DEPTH>>>,
}

impl<const DEPTH: usize> SharedMotion<DEPTH> {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(MotionScheduler::new())),
        }
    }

    /// Run `f` with exclusive access to the scheduler.
    pub fn with<R>(&self, f: impl FnOnce(&mut MotionScheduler<DEPTH>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow(cs).borrow_mut()))
    }

    /// 1 ms timer interrupt entry point.
    pub fn tick<O, S>(&self, now: Instant, output: &mut O, status: &S)
    where
        O: ActuatorOutput,
        S: StatusSink + ?Sized,
    {
        self.with(|scheduler| scheduler.tick(now, output, status));
    }
}

impl<const DEPTH: usize> Default for SharedMotion<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`ModuleBus`] usable from a `static`.
pub struct SharedBus {
    inner: Mutex<RefCell<ModuleBus>>,
}

impl SharedBus {
    pub const fn new(chain: ChainId, timings: BusTimings) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(ModuleBus::new(chain, timings))),
        }
    }

    /// Run `f` with exclusive access to the bus.
    pub fn with<R>(&self, f: impl FnOnce(&mut ModuleBus) -> R) -> R {
        critical_section::with(|cs| f(&mut self.inner.borrow(cs).borrow_mut()))
    }

    /// Timer and edge interrupt entry point.
    pub fn handle<L, S>(&self, event: BusEvent, line: &mut L, status: &S) -> Option<CycleOutcome>
    where
        L: BusLine,
        S: StatusSink + ?Sized,
    {
        self.with(|bus| bus.handle(event, line, status))
    }
}
