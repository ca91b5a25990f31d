//! Single-wire smart-module bus.
//!
//! Up to four modules share one half-duplex data wire. Every communication
//! cycle sends a six byte frame (header, one data byte per slot, checksum)
//! bit by bit from a timer interrupt, then turns the wire around and reads
//! one answer byte from the slot addressed in the checksum's low nibble.
//! The addressed slot advances round-robin after every cycle.
//!
//! [`ModuleBus`] is a pure state machine: the board feeds it [`BusEvent`]s
//! from its timer and edge interrupts and it drives the wire through a
//! [`BusLine`].

mod encoding;
mod line;
mod registry;

use embassy_time::Duration;

pub use encoding::{
    CALIBRATION_READOUT, FRAME_HEADER, Fade, IDLE, LED_DISCOVERY_PAIR, LedColor, POLL_CONTINUE,
    RESPONSE_ABSENT, RESPONSE_LED, RESPONSE_PRESENT, RESPONSE_SERVO, SERVO_POSITION_MAX,
    SERVO_POSITION_MIN, ServoColor, checksum, servo_position,
};
pub use line::{BusLine, Level};
pub use registry::{ModuleError, ModuleKind, ModuleRegistry, ModuleSlot, SLOT_COUNT, SlotChange};

use crate::status::{StatusEvent, StatusSink};

/// Bytes per frame.
pub const FRAME_LEN: usize = 6;

/// The three module chains of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainId {
    Head,
    LeftArm,
    RightArm,
}

impl ChainId {
    pub const fn index(self) -> usize {
        match self {
            Self::Head => 0,
            Self::LeftArm => 1,
            Self::RightArm => 2,
        }
    }
}

/// Timer periods of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusTimings {
    /// One bit on the wire (2400 baud).
    pub bit_period: Duration,
    /// Wait for the first answer edge after the frame.
    pub response_timeout: Duration,
    /// Wait for each following answer edge.
    pub bit_timeout: Duration,
    /// Delay from a rising edge to sampling the bit.
    pub sample_delay: Duration,
    /// Pause between two cycles.
    pub frame_gap: Duration,
}

impl BusTimings {
    pub const DEFAULT: Self = Self {
        bit_period: Duration::from_micros(417),
        response_timeout: Duration::from_micros(3000),
        bit_timeout: Duration::from_micros(1500),
        sample_delay: Duration::from_micros(500),
        frame_gap: Duration::from_millis(10),
    };
}

impl Default for BusTimings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Interrupts that advance the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusEvent {
    /// The bus timer fired.
    TimerElapsed,
    /// The wire rose while an answer was expected.
    RisingEdge,
}

/// Where the bus is within a communication cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusState {
    /// Next timer call drives the start bit of frame byte `byte`.
    StartBit { byte: u8 },
    /// Data bits (`mask` `0x01..=0x80`) and two stop bits (`0x100`, `0x200`).
    SendingBits { byte: u8, mask: u16 },
    /// Frame sent; next timer call turns the wire around.
    ReleaseLine,
    /// Reading the answer byte, least significant bit first.
    AwaitResponse {
        mask: u8,
        received: u8,
        /// Cleared whenever a bit window is armed, set by the edge interrupt.
        edge_seen: bool,
    },
}

/// End of a communication cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Answered { slot: u8, response: u8 },
    /// No edge inside a bit window; the slot keeps its recorded type.
    Silent { slot: u8 },
}

/// Protocol engine for one chain.
#[derive(Debug, Clone)]
pub struct ModuleBus {
    chain: ChainId,
    timings: BusTimings,
    state: BusState,
    /// Frame bytes, each latched at its own start bit.
    frame: [u8; FRAME_LEN],
    /// Slot asked to answer in the current cycle.
    slot: u8,
    registry: ModuleRegistry,
}

impl ModuleBus {
    pub const fn new(chain: ChainId, timings: BusTimings) -> Self {
        Self {
            chain,
            timings,
            state: BusState::StartBit { byte: 0 },
            frame: [0; FRAME_LEN],
            slot: 0,
            registry: ModuleRegistry::new(),
        }
    }

    /// Take over the wire: drive it low, forget all modules and schedule
    /// the first cycle one frame gap from now.
    pub fn init<L: BusLine>(&mut self, line: &mut L) {
        line.disable_edge_interrupt();
        line.configure_output();
        line.set_level(Level::Low);
        self.registry.reset();
        self.slot = 0;
        self.state = BusState::StartBit { byte: 0 };
        line.arm_timer(self.timings.frame_gap);
    }

    pub const fn chain(&self) -> ChainId {
        self.chain
    }

    pub const fn state(&self) -> BusState {
        self.state
    }

    /// Slot that answers in the current cycle.
    pub const fn addressed_slot(&self) -> u8 {
        self.slot
    }

    /// Frame being sent, or the last one sent.
    pub const fn frame(&self) -> [u8; FRAME_LEN] {
        self.frame
    }

    pub const fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ModuleRegistry {
        &mut self.registry
    }

    pub fn set_servo_position(&mut self, slot: u8, position: u8) -> Result<(), ModuleError> {
        self.registry.set_servo_position(slot, position)
    }

    pub fn set_servo_color(&mut self, slot: u8, color: ServoColor) -> Result<(), ModuleError> {
        self.registry.set_servo_color(slot, color)
    }

    pub fn set_servo_calibration(&mut self, slot: u8) -> Result<(), ModuleError> {
        self.registry.set_servo_calibration(slot)
    }

    pub fn set_led_color(&mut self, color: LedColor) {
        self.registry.set_led_color(color);
    }

    pub fn servo_position(&self, slot: u8) -> u8 {
        self.registry.servo_position(slot)
    }

    /// Advance the state machine by one interrupt.
    ///
    /// Returns the outcome when the event finished a cycle.
    pub fn handle<L, S>(&mut self, event: BusEvent, line: &mut L, status: &S) -> Option<CycleOutcome>
    where
        L: BusLine,
        S: StatusSink + ?Sized,
    {
        match event {
            BusEvent::TimerElapsed => self.on_timer(line, status),
            BusEvent::RisingEdge => {
                self.on_edge(line);
                None
            }
        }
    }

    /// Bus timer interrupt.
    pub fn on_timer<L, S>(&mut self, line: &mut L, status: &S) -> Option<CycleOutcome>
    where
        L: BusLine,
        S: StatusSink + ?Sized,
    {
        match self.state {
            BusState::StartBit { byte } => {
                self.frame[byte as usize] = self.frame_byte(byte);
                line.configure_output();
                line.set_level(Level::Low);
                line.arm_timer(self.timings.bit_period);
                self.state = BusState::SendingBits { byte, mask: 0x001 };
                None
            }
            BusState::SendingBits { byte, mask } => {
                if mask <= 0x080 {
                    let bit = u16::from(self.frame[byte as usize]) & mask != 0;
                    line.set_level(Level::from(bit));
                    self.state = BusState::SendingBits {
                        byte,
                        mask: mask << 1,
                    };
                } else if mask == 0x100 {
                    line.set_level(Level::High);
                    self.state = BusState::SendingBits {
                        byte,
                        mask: mask << 1,
                    };
                } else {
                    line.set_level(Level::High);
                    let next = byte + 1;
                    self.state = if next as usize == FRAME_LEN {
                        BusState::ReleaseLine
                    } else {
                        BusState::StartBit { byte: next }
                    };
                }
                None
            }
            BusState::ReleaseLine => {
                line.configure_input();
                line.arm_timer(self.timings.response_timeout);
                line.enable_edge_interrupt();
                self.state = BusState::AwaitResponse {
                    mask: 0x01,
                    received: 0,
                    edge_seen: false,
                };
                None
            }
            BusState::AwaitResponse {
                mask,
                received,
                edge_seen,
            } => {
                if !edge_seen {
                    return Some(self.finish_silent(line, status));
                }
                let received = if line.read_level().is_high() {
                    received | mask
                } else {
                    received
                };
                if mask == 0x80 {
                    return Some(self.finish_answered(received, line, status));
                }
                line.arm_timer(self.timings.bit_timeout);
                line.enable_edge_interrupt();
                self.state = BusState::AwaitResponse {
                    mask: mask << 1,
                    received,
                    edge_seen: false,
                };
                None
            }
        }
    }

    /// Rising-edge interrupt: the module started a bit, sample it shortly.
    pub fn on_edge<L: BusLine>(&mut self, line: &mut L) {
        line.disable_edge_interrupt();
        if let BusState::AwaitResponse { edge_seen, .. } = &mut self.state {
            *edge_seen = true;
            line.arm_timer(self.timings.sample_delay);
        }
    }

    /// Byte `byte` of the frame, read at its start bit.
    ///
    /// Data bytes reflect the pending outputs at that moment; the checksum
    /// covers the data bytes already sent in this frame.
    fn frame_byte(&self, byte: u8) -> u8 {
        match byte {
            0 => FRAME_HEADER,
            1..=4 => self.registry.outputs()[usize::from(byte - 1)],
            _ => checksum(
                [self.frame[1], self.frame[2], self.frame[3], self.frame[4]],
                self.slot,
            ),
        }
    }

    fn finish_answered<L, S>(&mut self, response: u8, line: &mut L, status: &S) -> CycleOutcome
    where
        L: BusLine,
        S: StatusSink + ?Sized,
    {
        let slot = self.slot;
        match self.registry.record_response(slot, response) {
            Some(SlotChange::Discovered(kind)) => status.report(StatusEvent::ModuleDiscovered {
                chain: self.chain,
                slot,
                kind,
            }),
            Some(SlotChange::Lost) => status.report(StatusEvent::ModuleLost {
                chain: self.chain,
                slot,
            }),
            None => {}
        }
        self.end_cycle(line);
        CycleOutcome::Answered { slot, response }
    }

    fn finish_silent<L, S>(&mut self, line: &mut L, status: &S) -> CycleOutcome
    where
        L: BusLine,
        S: StatusSink + ?Sized,
    {
        let slot = self.slot;
        self.registry.record_silence();
        status.report(StatusEvent::ModuleSilent {
            chain: self.chain,
            slot,
        });
        self.end_cycle(line);
        CycleOutcome::Silent { slot }
    }

    fn end_cycle<L: BusLine>(&mut self, line: &mut L) {
        line.disable_edge_interrupt();
        self.slot = (self.slot + 1) % SLOT_COUNT as u8;
        self.state = BusState::StartBit { byte: 0 };
        line.arm_timer(self.timings.frame_gap);
    }
}
