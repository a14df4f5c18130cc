use crate::lcd::hd44780::driver::{
    timing, DisplayControlFlags, DotSize, EntryModeFlags, FunctionFlags, HD44780Driver,
    InterfaceWidth, ShiftDirection, ShiftTarget, TextDirection,
};
use crate::{GpioError, GpioResult};
use log::debug;

/// Number of rows the DDRAM row table covers.
pub const MAX_LINES: u8 = 4;

/// DDRAM holds 80 characters, so no row can be wider than that.
pub const MAX_COLUMNS: u8 = 80;

/// Mirror of the write-only controller registers, plus the display geometry.
///
/// The controller can't be read back, so this is the only record of its configuration. Every
/// [CharacterLcd] method that changes a register value here writes it to the controller before
/// returning.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct DisplayState {
    pub function: FunctionFlags,
    pub control: DisplayControlFlags,
    pub entry_mode: EntryModeFlags,
    /// DDRAM address of the first column of each row.
    pub row_offsets: [u8; MAX_LINES as usize],
    pub columns: u8,
    pub lines: u8,
}

impl DisplayState {
    fn new(width: InterfaceWidth) -> Self {
        DisplayState {
            function: FunctionFlags {
                interface_width: width,
                ..FunctionFlags::default()
            },
            control: DisplayControlFlags::default(),
            entry_mode: EntryModeFlags::default(),
            row_offsets: Self::row_offsets_for(16),
            columns: 16,
            lines: 1,
        }
    }

    /// Standard HD44780 row bases. Rows 2 and 3 continue rows 0 and 1 past the last column.
    ///
    /// The last entry wraps for `columns` above 191. [CharacterLcd::begin] never gets there as it
    /// caps `columns` at [MAX_COLUMNS].
    pub fn row_offsets_for(columns: u8) -> [u8; MAX_LINES as usize] {
        [0x00, 0x40, columns, 0x40u8.wrapping_add(columns)]
    }
}

/// `CharacterLcd` is the high-level interface to an HD44780 display.
///
/// It owns the transport and the [DisplayState]. Nothing is sent to the display until [Self::begin]
/// is called, and calling any other method before it leaves the display in an undefined state.
///
/// There's no way to detect whether the display actually received anything: all methods assume
/// success once the pins were written.
#[derive(Debug)]
pub struct CharacterLcd<D: HD44780Driver> {
    driver: D,
    state: DisplayState,
}

impl<D: HD44780Driver> CharacterLcd<D> {
    pub fn new(driver: D) -> Self {
        let state = DisplayState::new(driver.interface_width());
        CharacterLcd { driver, state }
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn driver(&mut self) -> &mut D {
        &mut self.driver
    }

    pub fn into_inner(self) -> D {
        self.driver
    }

    /// Initializes the controller for a display of `columns` x `lines` characters.
    ///
    /// The controller is assumed to have just powered up, or to be in any unknown state, including
    /// halfway through a 4-bit transfer. It runs the reset sequence from figures 23 and 24 of the
    /// datasheet, then sets line count and font, turns the display on with no cursor, clears it
    /// and sets left-to-right entry without autoscroll.
    ///
    /// `dot_size` is only honored on single-line displays, otherwise it's ignored.
    ///
    /// Can be called again to reconfigure the geometry. Takes a bit over 60 ms.
    ///
    /// # Errors
    /// - `GpioError::InvalidArgument` if `lines` isn't within 1..=4 or `columns` isn't within
    ///   1..=80.
    pub fn begin(&mut self, columns: u8, lines: u8, dot_size: DotSize) -> GpioResult<()> {
        if !(1..=MAX_LINES).contains(&lines) || !(1..=MAX_COLUMNS).contains(&columns) {
            return Err(GpioError::InvalidArgument);
        }

        let width = self.driver.interface_width();
        debug!(
            "Initializing {}x{} display, {:?} font, {:?} interface",
            columns, lines, dot_size, width
        );

        self.state.function = FunctionFlags {
            interface_width: width,
            two_lines: lines > 1,
            large_font: dot_size == DotSize::Dots5x10 && lines == 1,
        };
        self.state.columns = columns;
        self.state.lines = lines;
        self.state.row_offsets = DisplayState::row_offsets_for(columns);

        self.driver.delay(timing::POWER_ON);
        self.driver.reset_control_lines()?;

        // The controller wakes up in 8-bit mode, but a 4-bit host may have left it mid-byte.
        // Three 8-bit function sets resynchronize it either way.
        match width {
            InterfaceWidth::FourBit => {
                self.driver.write_bits(0x03, InterfaceWidth::FourBit)?;
                self.driver.delay(timing::RESET_PROBE);
                self.driver.write_bits(0x03, InterfaceWidth::FourBit)?;
                self.driver.delay(timing::RESET_PROBE);
                self.driver.write_bits(0x03, InterfaceWidth::FourBit)?;
                self.driver.delay(timing::RESET_FINAL_PROBE);
                // Still read as 8-bit, so a single nibble switches to 4-bit
                self.driver.write_bits(0x02, InterfaceWidth::FourBit)?;
            }
            InterfaceWidth::EightBit => {
                self.driver.function_set(self.state.function)?;
                self.driver.delay(timing::RESET_PROBE);
                self.driver.function_set(self.state.function)?;
                self.driver.delay(timing::RESET_FINAL_PROBE);
                self.driver.function_set(self.state.function)?;
            }
        }

        self.driver.function_set(self.state.function)?;

        self.state.control = DisplayControlFlags {
            display_on: true,
            cursor_on: false,
            blink_on: false,
        };
        self.driver.set_display_control(self.state.control)?;

        self.clear()?;

        self.state.entry_mode = EntryModeFlags {
            direction: TextDirection::LeftToRight,
            autoscroll: false,
        };
        self.driver.set_entry_mode(self.state.entry_mode)?;

        debug!("Display initialized: {:?}", self.state);
        Ok(())
    }

    /// Overrides the DDRAM row table, for panels that don't use the standard layout.
    ///
    /// The next [Self::begin] restores the standard table.
    pub fn set_row_offsets(&mut self, offsets: [u8; MAX_LINES as usize]) {
        self.state.row_offsets = offsets;
    }

    /// Clears the display and moves the cursor to the top-left corner.
    pub fn clear(&mut self) -> GpioResult<()> {
        self.driver.clear_display()
    }

    /// Moves the cursor to the top-left corner and undoes scrolling, keeping the text.
    pub fn home(&mut self) -> GpioResult<()> {
        self.driver.return_home()
    }

    /// Moves the cursor to `col` on `row`, both counting from 0.
    ///
    /// Rows past the last configured line are clamped to it. Columns aren't checked: the address
    /// simply runs on into the next DDRAM row, as the controller does itself.
    pub fn set_cursor(&mut self, col: u8, row: u8) -> GpioResult<()> {
        let row = row.min(MAX_LINES - 1).min(self.state.lines.saturating_sub(1));
        let address = self.state.row_offsets[row as usize].wrapping_add(col);
        self.driver.set_ddram_address(address)
    }

    pub fn display_on(&mut self) -> GpioResult<()> {
        self.state.control.display_on = true;
        self.driver.set_display_control(self.state.control)
    }

    /// Blanks the display without losing its contents.
    pub fn display_off(&mut self) -> GpioResult<()> {
        self.state.control.display_on = false;
        self.driver.set_display_control(self.state.control)
    }

    /// Shows the underline cursor.
    pub fn cursor_on(&mut self) -> GpioResult<()> {
        self.state.control.cursor_on = true;
        self.driver.set_display_control(self.state.control)
    }

    pub fn cursor_off(&mut self) -> GpioResult<()> {
        self.state.control.cursor_on = false;
        self.driver.set_display_control(self.state.control)
    }

    /// Blinks the character cell under the cursor.
    pub fn blink_on(&mut self) -> GpioResult<()> {
        self.state.control.blink_on = true;
        self.driver.set_display_control(self.state.control)
    }

    pub fn blink_off(&mut self) -> GpioResult<()> {
        self.state.control.blink_on = false;
        self.driver.set_display_control(self.state.control)
    }

    /// Scrolls the whole display one position to the left. DDRAM is not changed.
    pub fn scroll_left(&mut self) -> GpioResult<()> {
        self.driver.cursor_shift(ShiftTarget::Display, ShiftDirection::Left)
    }

    /// Scrolls the whole display one position to the right. DDRAM is not changed.
    pub fn scroll_right(&mut self) -> GpioResult<()> {
        self.driver.cursor_shift(ShiftTarget::Display, ShiftDirection::Right)
    }

    /// Sets which way the cursor moves after each character.
    pub fn text_direction(&mut self, direction: TextDirection) -> GpioResult<()> {
        self.state.entry_mode.direction = direction;
        self.driver.set_entry_mode(self.state.entry_mode)
    }

    /// With autoscroll on, the display shifts on every character so text appears to be pushed out
    /// of the cursor position.
    pub fn autoscroll(&mut self, enabled: bool) -> GpioResult<()> {
        self.state.entry_mode.autoscroll = enabled;
        self.driver.set_entry_mode(self.state.entry_mode)
    }

    /// Defines custom character `slot` (0–7, higher values wrap) from 8 rows of 5 pixels, top row
    /// first, pixels in the low 5 bits of each byte.
    ///
    /// The character is then printed by writing byte `slot`. This leaves the address counter in
    /// CGRAM, so call [Self::set_cursor], [Self::home] or [Self::clear] before printing again.
    pub fn create_char(&mut self, slot: u8, glyph: &[u8; 8]) -> GpioResult<()> {
        let slot = slot & 0x7;
        self.driver.set_cgram_address(slot << 3)?;
        for &row in glyph {
            self.driver.send_data(row)?;
        }
        Ok(())
    }

    /// Writes `text` at the cursor, one byte per character code.
    ///
    /// There is no character mapping: ASCII prints as expected on the common ROM variants, other
    /// bytes show whatever glyph the display's ROM has at that code.
    pub fn print(&mut self, text: &str) -> GpioResult<()> {
        self.print_bytes(text.as_bytes())
    }

    pub fn print_bytes(&mut self, bytes: &[u8]) -> GpioResult<()> {
        for &byte in bytes {
            self.write(byte)?;
        }
        Ok(())
    }

    /// Writes a single character code at the cursor.
    pub fn write(&mut self, value: u8) -> GpioResult<()> {
        self.driver.send_data(value)
    }

    /// Sends a raw instruction, bypassing the mirrored state.
    pub fn command(&mut self, value: u8) -> GpioResult<()> {
        self.driver.send_command(value)
    }
}
