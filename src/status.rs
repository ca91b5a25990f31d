//! Status events raised by the interrupt-side state machines.
//!
//! The main loop drains a [`StatusChannel`] and reports to the host or a
//! debug console. Reporting never blocks the interrupt that raised it.

use crate::bus::{ChainId, ModuleKind};
use crate::channel::{Channel, Sender};
use crate::motion::{ActuatorId, ArmId, Position};

/// Something worth reporting happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEvent {
    /// A waypoint reached its stop time and was removed.
    WaypointRetired {
        actuator: ActuatorId,
        position: Position,
    },
    /// Every waypoint list of the arm ran empty; its session ended.
    MovementFinished { arm: ArmId },
    /// A slot reported its module type for the first time.
    ModuleDiscovered {
        chain: ChainId,
        slot: u8,
        kind: ModuleKind,
    },
    /// A slot answered `0x00`; it and every slot behind it were reset.
    ModuleLost { chain: ChainId, slot: u8 },
    /// The addressed slot did not answer within the response timeout.
    ModuleSilent { chain: ChainId, slot: u8 },
}

/// Receiver of [`StatusEvent`]s.
///
/// Implementations must not block; they run in interrupt context.
pub trait StatusSink {
    fn report(&self, event: StatusEvent);
}

/// Discards every event.
impl StatusSink for () {
    fn report(&self, _event: StatusEvent) {}
}

/// Type alias for the status channel
pub type StatusChannel<const SIZE: usize> = Channel<StatusEvent, SIZE>;

/// Type alias for a status sender
pub type StatusSender<'a, const SIZE: usize> = Sender<'a, StatusEvent, SIZE>;

impl<const SIZE: usize> StatusSink for StatusChannel<SIZE> {
    fn report(&self, event: StatusEvent) {
        // A full channel counts the drop itself.
        let _ = self.try_send(event);
    }
}

impl<const SIZE: usize> StatusSink for StatusSender<'_, SIZE> {
    fn report(&self, event: StatusEvent) {
        let _ = self.try_send(event);
    }
}
