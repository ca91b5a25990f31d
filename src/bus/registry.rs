#[cfg(feature = "esp32-log")]
use esp_println::println;

use super::encoding::{
    CALIBRATION_READOUT, IDLE, LED_DISCOVERY_PAIR, LedColor, POLL_CONTINUE, RESPONSE_ABSENT,
    RESPONSE_LED, RESPONSE_PRESENT, RESPONSE_SERVO, ServoColor, servo_position,
};

/// Number of modules one chain can address.
pub const SLOT_COUNT: usize = 4;

/// Errors returned to the command layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleError {
    /// Slot index is not in `0..4`.
    SlotOutOfRange,
    /// The command only applies to a discovered servo.
    NotAServo,
}

/// Module type a slot reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModuleKind {
    #[default]
    Unknown,
    Servo,
    Led,
}

/// One position in a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleSlot {
    pub kind: ModuleKind,
    /// Byte sent to this slot in the next frame.
    pub output: u8,
    /// Last byte this slot answered with.
    pub input: u8,
}

impl ModuleSlot {
    pub const EMPTY: Self = Self {
        kind: ModuleKind::Unknown,
        output: IDLE,
        input: 0,
    };
}

impl Default for ModuleSlot {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// What a completed exchange changed in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotChange {
    Discovered(ModuleKind),
    /// The slot and every slot behind it were reset.
    Lost,
}

/// Per-chain table of discovered modules and their pending output.
#[derive(Debug, Clone)]
pub struct ModuleRegistry {
    slots: [ModuleSlot; SLOT_COUNT],
    /// Bytes the LED module needs on alternating polls.
    led_pair: [u8; 2],
    led_phase: usize,
    /// Slot whose answer is in `input`, if the last exchange completed.
    last_responder: Option<u8>,
}

impl ModuleRegistry {
    pub const fn new() -> Self {
        Self {
            slots: [ModuleSlot::EMPTY; SLOT_COUNT],
            led_pair: LED_DISCOVERY_PAIR,
            led_phase: 0,
            last_responder: None,
        }
    }

    /// Forget every module.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn slot(&self, slot: u8) -> Option<&ModuleSlot> {
        self.slots.get(slot as usize)
    }

    pub fn slots(&self) -> &[ModuleSlot; SLOT_COUNT] {
        &self.slots
    }

    /// Data bytes of the next frame, one per slot.
    pub fn outputs(&self) -> [u8; SLOT_COUNT] {
        self.slots.map(|slot| slot.output)
    }

    pub fn led_pair(&self) -> [u8; 2] {
        self.led_pair
    }

    /// Slot that answered the last completed exchange.
    pub fn last_responder(&self) -> Option<u8> {
        self.last_responder
    }

    fn servo_mut(&mut self, slot: u8) -> Result<&mut ModuleSlot, ModuleError> {
        let entry = self
            .slots
            .get_mut(slot as usize)
            .ok_or(ModuleError::SlotOutOfRange)?;
        if entry.kind == ModuleKind::Servo {
            Ok(entry)
        } else {
            Err(ModuleError::NotAServo)
        }
    }

    /// Command a servo to `position`, clamped to the usable range.
    pub fn set_servo_position(&mut self, slot: u8, position: u8) -> Result<(), ModuleError> {
        self.servo_mut(slot)?.output = servo_position(position);
        Ok(())
    }

    pub fn set_servo_color(&mut self, slot: u8, color: ServoColor) -> Result<(), ModuleError> {
        self.servo_mut(slot)?.output = color.code();
        Ok(())
    }

    /// Release the servo motor and have it report its position.
    pub fn set_servo_calibration(&mut self, slot: u8) -> Result<(), ModuleError> {
        self.servo_mut(slot)?.output = CALIBRATION_READOUT;
        Ok(())
    }

    /// Change the color the LED module is refreshed with.
    ///
    /// Takes effect on the LED slot's next poll.
    pub fn set_led_color(&mut self, color: LedColor) {
        self.led_pair = color.encode();
    }

    /// Position a servo last reported.
    ///
    /// Only valid while `slot` is the most recent responder; `0x00` otherwise.
    pub fn servo_position(&self, slot: u8) -> u8 {
        match self.slots.get(slot as usize) {
            Some(entry)
                if entry.kind == ModuleKind::Servo && self.last_responder == Some(slot) =>
            {
                entry.input
            }
            _ => 0x00,
        }
    }

    /// The addressed slot stayed silent; its entry is left as it was.
    pub(crate) fn record_silence(&mut self) {
        self.last_responder = None;
    }

    /// Apply the answer `response` of `slot`.
    pub(crate) fn record_response(&mut self, slot: u8, response: u8) -> Option<SlotChange> {
        let index = slot as usize;
        let mut change = None;
        self.last_responder = Some(slot);
        self.slots[index].input = response;

        if response == RESPONSE_PRESENT {
            self.slots[index].output = POLL_CONTINUE;
        }

        if response == RESPONSE_SERVO && self.slots[index].kind == ModuleKind::Unknown {
            self.slots[index].kind = ModuleKind::Servo;
            self.slots[index].output = ServoColor::Blue.code();
            change = Some(SlotChange::Discovered(ModuleKind::Servo));
        }

        if self.slots[index].kind == ModuleKind::Led {
            self.slots[index].output = self.led_pair[self.led_phase];
            self.led_phase ^= 1;
        }

        if response == RESPONSE_LED && self.slots[index].kind == ModuleKind::Unknown {
            self.led_pair = LED_DISCOVERY_PAIR;
            self.slots[index].kind = ModuleKind::Led;
            self.slots[index].output = self.led_pair[0];
            self.led_phase = 1;
            change = Some(SlotChange::Discovered(ModuleKind::Led));
        }

        if response == RESPONSE_ABSENT {
            for entry in &mut self.slots[index..] {
                entry.kind = ModuleKind::Unknown;
                entry.output = IDLE;
            }
            change = Some(SlotChange::Lost);
        }

        #[cfg(feature = "esp32-log")]
        if let Some(change) = change {
            println!("[ModuleRegistry] slot {}: {:?}", slot, change);
        }

        change
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
