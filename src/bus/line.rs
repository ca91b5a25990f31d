use embassy_time::Duration;

/// Logic level on the module data wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high { Self::High } else { Self::Low }
    }
}

impl Level {
    pub const fn is_high(self) -> bool {
        matches!(self, Self::High)
    }
}

/// Hardware behind one module chain: a single open GPIO pin, its
/// rising-edge interrupt and a periodic timer that drives the state machine.
///
/// Implement this trait per board. Every method is called from interrupt
/// context and must return promptly.
pub trait BusLine {
    /// Drive the pin (only meaningful while configured as output).
    fn set_level(&mut self, level: Level);

    /// Sample the pin.
    fn read_level(&mut self) -> Level;

    fn configure_output(&mut self);

    fn configure_input(&mut self);

    /// Reload the periodic bus timer; it keeps firing at this interval until
    /// armed again.
    fn arm_timer(&mut self, period: Duration);

    /// Clear any latched edge, then enable the rising-edge interrupt.
    fn enable_edge_interrupt(&mut self);

    /// Disable the rising-edge interrupt and clear any latched edge.
    fn disable_edge_interrupt(&mut self);
}
