//! Byte-level encoding of the smart-module protocol.

/// First byte of every frame.
pub const FRAME_HEADER: u8 = 0xFF;

/// Output for a slot with nothing to say; also the discovery request.
pub const IDLE: u8 = 0xFE;

/// Sent to a present module whose type is still unknown.
pub const POLL_CONTINUE: u8 = 0xFC;

/// Puts a servo into calibration readout ("LIM") mode: the motor is released
/// and the module reports its position instead.
pub const CALIBRATION_READOUT: u8 = 0xFA;

/// Responses a module can give.
pub const RESPONSE_ABSENT: u8 = 0x00;
pub const RESPONSE_SERVO: u8 = 0x01;
pub const RESPONSE_LED: u8 = 0x02;
pub const RESPONSE_PRESENT: u8 = 0xFE;

/// Servo positions outside this range are clamped.
pub const SERVO_POSITION_MIN: u8 = 0x18;
pub const SERVO_POSITION_MAX: u8 = 0xE8;

/// Refresh pair loaded when an LED module is discovered.
pub const LED_DISCOVERY_PAIR: [u8; 2] = [0x04, 0x47];

/// Checksum byte of a frame, carrying the responding slot in its low nibble.
///
/// The data sum is folded over its carry and the low nibble of the folded
/// sum is moved into the high nibble; overflow above 8 bits is discarded.
pub const fn checksum(data: [u8; 4], slot: u8) -> u8 {
    let mut sum = data[0] as u32 + data[1] as u32 + data[2] as u32 + data[3] as u32;
    sum += sum >> 8;
    sum += sum << 4;
    ((sum & 0xF0) as u8) | (slot & 0x0F)
}

/// Clamp a raw host position into the servo's usable range.
pub const fn servo_position(position: u8) -> u8 {
    if position < SERVO_POSITION_MIN {
        SERVO_POSITION_MIN
    } else if position > SERVO_POSITION_MAX {
        SERVO_POSITION_MAX
    } else {
        position
    }
}

/// Colors of the servo's built-in LED.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ServoColor {
    Off = 0xF0,
    Red = 0xF1,
    Green = 0xF2,
    RedGreen = 0xF3,
    Blue = 0xF4,
    RedBlue = 0xF5,
    GreenBlue = 0xF6,
    White = 0xF7,
}

impl ServoColor {
    pub const fn from_raw(value: u8) -> Option<Self> {
        Some(match value {
            0xF0 => Self::Off,
            0xF1 => Self::Red,
            0xF2 => Self::Green,
            0xF3 => Self::RedGreen,
            0xF4 => Self::Blue,
            0xF5 => Self::RedBlue,
            0xF6 => Self::GreenBlue,
            0xF7 => Self::White,
            _ => return None,
        })
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

/// Fade presets of the LED module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum Fade {
    #[default]
    Instant = 0,
    Ms200 = 1,
    Ms500 = 2,
    Ms800 = 3,
    S1 = 4,
    S2 = 5,
    S3 = 6,
    S4 = 7,
}

impl Fade {
    /// Only the low three bits are used.
    pub const fn from_raw(value: u8) -> Self {
        match value & 0x07 {
            0 => Self::Instant,
            1 => Self::Ms200,
            2 => Self::Ms500,
            3 => Self::Ms800,
            4 => Self::S1,
            5 => Self::S2,
            6 => Self::S3,
            _ => Self::S4,
        }
    }
}

/// Color and fade command for the LED module.
///
/// Channels have eight levels, 0 is off and 7 is full brightness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LedColor {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
    pub fade: Fade,
}

impl LedColor {
    pub const fn new(red: u8, green: u8, blue: u8, fade: Fade) -> Self {
        Self {
            red,
            green,
            blue,
            fade,
        }
    }

    /// The two bytes the module expects on consecutive polls.
    pub const fn encode(self) -> [u8; 2] {
        let first = ((self.green << 3) & 0x38) | (self.red & 0x07);
        let second = 0x40 | (((self.fade as u8) << 3) & 0x38) | (self.blue & 0x07);
        [first, second]
    }
}
