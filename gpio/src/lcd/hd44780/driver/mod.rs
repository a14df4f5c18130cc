//! HD44780 transport and command encoding.
//!
//! See [HD44780Driver] for the driver interface and [GpioHD44780Driver] for the implementation
//! bit-banging GPIO pins.
//!
//! # Sources
//!
//! - Hitachi, [“HD44780U (LCD-II) Dot Matrix Liquid Crystal Display Controller/Driver,”](https://www.sparkfun.com/datasheets/LCD/HD44780.pdf)
//!   figures 23 and 24 (pages 45–46) for the initialization by instruction.

mod gpio;

use crate::GpioResult;
pub use gpio::*;
use log::trace;
use std::fmt::Debug;
use std::time::Duration;

/// Controller timings. All of them are minimums, the controller is never polled.
pub mod timing {
    use std::time::Duration;

    /// Wait after power rises above 2.7 V before the first instruction (datasheet: 40 ms).
    pub const POWER_ON: Duration = Duration::from_millis(50);
    /// Wait after the first two reset probes (datasheet: 4.1 ms).
    pub const RESET_PROBE: Duration = Duration::from_micros(4500);
    /// Wait after the third reset probe (datasheet: 100 µs).
    pub const RESET_FINAL_PROBE: Duration = Duration::from_micros(150);
    /// E setup and pulse width (datasheet: 450 ns).
    pub const ENABLE_PULSE: Duration = Duration::from_micros(1);
    /// Execution time of ordinary instructions and data writes (datasheet: 37 µs).
    pub const COMMAND_SETTLE: Duration = Duration::from_micros(100);
    /// Execution time of clear display and return home (datasheet: 1.52 ms).
    pub const LONG_COMMAND: Duration = Duration::from_micros(2000);
}

const CMD_CLEAR_DISPLAY: u8 = 0b0000_0001;
const CMD_RETURN_HOME: u8 = 0b0000_0010;
const CMD_ENTRY_MODE_SET: u8 = 0b0000_0100;
const CMD_DISPLAY_CONTROL: u8 = 0b0000_1000;
const CMD_CURSOR_SHIFT: u8 = 0b0001_0000;
const CMD_FUNCTION_SET: u8 = 0b0010_0000;
const CMD_SET_CGRAM_ADDR: u8 = 0b0100_0000;
const CMD_SET_DDRAM_ADDR: u8 = 0b1000_0000;

/// Width of the data bus between the host and the controller.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum InterfaceWidth {
    /// Only D4–D7 of the display are wired, every byte is sent as two nibbles.
    #[default]
    FourBit,
    /// All of D0–D7 are wired.
    EightBit,
}

impl InterfaceWidth {
    /// Number of data lines used by this width.
    pub fn bits(self) -> usize {
        match self {
            InterfaceWidth::FourBit => 4,
            InterfaceWidth::EightBit => 8,
        }
    }
}

/// Which controller register a transfer targets, i.e. the level of the RS line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RegisterSelect {
    /// Instruction register, RS low.
    Command,
    /// Data register, RS high.
    Data,
}

impl RegisterSelect {
    /// Level to put on the RS line.
    pub fn level(self) -> bool {
        matches!(self, RegisterSelect::Data)
    }
}

/// Character font height.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum DotSize {
    #[default]
    Dots5x8,
    /// Only available on single-line displays.
    Dots5x10,
}

/// Direction the address counter moves after a write.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum TextDirection {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// Direction of a cursor or display shift.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShiftDirection {
    Left,
    Right,
}

/// What a shift instruction moves.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ShiftTarget {
    Cursor,
    Display,
}

/// Function set register: `001DNF??`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct FunctionFlags {
    /// `D`: 8-bit interface when set.
    pub interface_width: InterfaceWidth,
    /// `N`: two display lines when set. Four-line panels are wired as two long lines.
    pub two_lines: bool,
    /// `F`: 5x10 font when set.
    pub large_font: bool,
}

impl FunctionFlags {
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.interface_width == InterfaceWidth::EightBit {
            bits |= 0b0001_0000;
        }
        if self.two_lines {
            bits |= 0b0000_1000;
        }
        if self.large_font {
            bits |= 0b0000_0100;
        }
        bits
    }
}

/// Display on/off control register: `00001DCB`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct DisplayControlFlags {
    pub display_on: bool,
    pub cursor_on: bool,
    pub blink_on: bool,
}

impl DisplayControlFlags {
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.display_on {
            bits |= 0b0000_0100;
        }
        if self.cursor_on {
            bits |= 0b0000_0010;
        }
        if self.blink_on {
            bits |= 0b0000_0001;
        }
        bits
    }
}

/// Entry mode register: `000001IS`.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EntryModeFlags {
    /// `I`: increment (left to right) when set.
    pub direction: TextDirection,
    /// `S`: shift the display along with the cursor on every write.
    pub autoscroll: bool,
}

impl EntryModeFlags {
    pub fn bits(&self) -> u8 {
        let mut bits = 0;
        if self.direction == TextDirection::LeftToRight {
            bits |= 0b0000_0010;
        }
        if self.autoscroll {
            bits |= 0b0000_0001;
        }
        bits
    }
}

/// The `HD44780Driver` trait is the transport to an HD44780 controller.
///
/// Implementations provide the pin-level operations: latching bits onto the data bus, selecting a
/// register and waiting. Everything above that (splitting bytes into nibbles, encoding
/// instructions, the delays the slow instructions need) is provided here and is the same for every
/// transport.
///
/// The controller is never read, so none of these methods can report a controller-side failure.
/// Errors only come from the pins themselves.
pub trait HD44780Driver: Debug {
    /// Width of the wired data bus. Fixed for the lifetime of the driver.
    fn interface_width(&self) -> InterfaceWidth;

    /// Puts the low `width.bits()` bits of `value` on the data lines, bit *i* on line *i*, and
    /// pulses E so the controller latches them. Returns after the controller had time to process
    /// the transfer.
    fn write_bits(&mut self, value: u8, width: InterfaceWidth) -> GpioResult<()>;

    /// Drives RS to the level of `register` and R/W low, if wired.
    fn select_register(&mut self, register: RegisterSelect) -> GpioResult<()>;

    /// Drives RS, E and R/W (if wired) low, giving the controller a known starting point.
    fn reset_control_lines(&mut self) -> GpioResult<()>;

    /// Blocks for at least `duration`.
    fn delay(&mut self, duration: Duration);

    /// Transfers one byte to the selected register.
    ///
    /// On a 4-bit bus the high nibble goes first.
    fn send(&mut self, value: u8, register: RegisterSelect) -> GpioResult<()> {
        trace!("Sending data: {:08b}, RS: {:?}", value, register);

        self.select_register(register)?;

        match self.interface_width() {
            InterfaceWidth::EightBit => self.write_bits(value, InterfaceWidth::EightBit),
            InterfaceWidth::FourBit => {
                self.write_bits(value >> 4, InterfaceWidth::FourBit)?;
                self.write_bits(value & 0x0F, InterfaceWidth::FourBit)
            }
        }
    }

    /// Sends an instruction (RS low).
    fn send_command(&mut self, command: u8) -> GpioResult<()> {
        self.send(command, RegisterSelect::Command)
    }

    /// Sends a byte to DDRAM or CGRAM, depending on the last address set (RS high).
    fn send_data(&mut self, data: u8) -> GpioResult<()> {
        self.send(data, RegisterSelect::Data)
    }

    /// Clears the display and sets the cursor to the home position.
    fn clear_display(&mut self) -> GpioResult<()> {
        self.send_command(CMD_CLEAR_DISPLAY)?;
        self.delay(timing::LONG_COMMAND);
        Ok(())
    }

    /// Sets the cursor to the home position and undoes display shifts. DDRAM is left untouched.
    fn return_home(&mut self) -> GpioResult<()> {
        self.send_command(CMD_RETURN_HOME)?;
        self.delay(timing::LONG_COMMAND);
        Ok(())
    }

    /// Command: `000001IS`.
    fn set_entry_mode(&mut self, flags: EntryModeFlags) -> GpioResult<()> {
        self.send_command(CMD_ENTRY_MODE_SET | flags.bits())
    }

    /// Command: `00001DCB`.
    fn set_display_control(&mut self, flags: DisplayControlFlags) -> GpioResult<()> {
        self.send_command(CMD_DISPLAY_CONTROL | flags.bits())
    }

    /// Moves the cursor or shifts the display by one position without touching DDRAM.
    ///
    /// Command: `0001SR??`.
    fn cursor_shift(&mut self, target: ShiftTarget, direction: ShiftDirection) -> GpioResult<()> {
        let mut command = CMD_CURSOR_SHIFT;
        if target == ShiftTarget::Display {
            command |= 0b0000_1000;
        }
        if direction == ShiftDirection::Right {
            command |= 0b0000_0100;
        }
        self.send_command(command)
    }

    /// Command: `001DNF??`.
    fn function_set(&mut self, flags: FunctionFlags) -> GpioResult<()> {
        self.send_command(CMD_FUNCTION_SET | flags.bits())
    }

    /// Sets the CGRAM address. Only the low 6 bits are used.
    fn set_cgram_address(&mut self, address: u8) -> GpioResult<()> {
        self.send_command(CMD_SET_CGRAM_ADDR | (address & 0b0011_1111))
    }

    /// Sets the DDRAM address. Only the low 7 bits are used.
    fn set_ddram_address(&mut self, address: u8) -> GpioResult<()> {
        self.send_command(CMD_SET_DDRAM_ADDR | (address & 0b0111_1111))
    }
}
