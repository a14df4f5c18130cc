//! HD44780 LCD module.
//!
//! The controller is driven write-only: the busy flag is never read, so every transfer is followed
//! by a fixed delay long enough for the slowest command it may carry.
//!
//! Two layers live here:
//! - [driver]: the transport. [HD44780Driver](driver::HD44780Driver) knows how to put bits on the
//!   data lines and how to encode commands; [GpioHD44780Driver](driver::GpioHD44780Driver) does it
//!   by bit-banging GPIO pins.
//! - [CharacterLcd]: the stateful front-end. It mirrors the function set, display control and
//!   entry mode registers, runs the power-up handshake and exposes the text-oriented API.
//!
//! ```no_run
//! # use lcdbang_gpio::{GpioDriver, GpioResult};
//! # use lcdbang_gpio::delay::ThreadDelay;
//! # use lcdbang_gpio::gpiod::GpiodDriver;
//! # use lcdbang_gpio::lcd::hd44780::CharacterLcd;
//! # use lcdbang_gpio::lcd::hd44780::driver::{DotSize, GpioHD44780Driver};
//! # fn main() -> GpioResult<()> {
//! let gpio = GpiodDriver::open("/dev/gpiochip0")?;
//! let mut rs = gpio.get_pin(22)?;
//! let mut e = gpio.get_pin(17)?;
//! let mut data = [gpio.get_pin(26)?, gpio.get_pin(16)?, gpio.get_pin(20)?, gpio.get_pin(21)?];
//! let [d0, d1, d2, d3] = &mut data;
//!
//! let driver = GpioHD44780Driver::new_4bit(
//!     rs.as_output()?,
//!     None,
//!     e.as_output()?,
//!     [d0.as_output()?, d1.as_output()?, d2.as_output()?, d3.as_output()?],
//!     ThreadDelay,
//! );
//! let mut lcd = CharacterLcd::new(driver);
//! lcd.begin(16, 2, DotSize::Dots5x8)?;
//! lcd.print("Hello")?;
//! # Ok(())
//! # }
//! ```

pub mod driver;
mod display;

pub use display::*;
