use crate::lcd::hd44780::driver::{timing, HD44780Driver, InterfaceWidth, RegisterSelect};
use crate::{GpioError, GpioOutput, GpioResult};
use embedded_hal::delay::DelayNs;
use log::trace;
use std::fmt::Debug;
use std::time::Duration;

/// GpioHD44780Driver drives an HD44780 controller by bit-banging GPIO pins.
///
/// Every transfer pulses E for 1 µs and then gives the controller 100 µs to process it, which covers
/// every instruction except clear display and return home. Those two get their extra time from
/// [HD44780Driver::clear_display] and [HD44780Driver::return_home].
///
/// The R/W line is only ever driven low. If it's not passed in, the R/W pin of the display must be
/// tied to GND.
#[derive(Debug)]
pub struct GpioHD44780Driver<'a, D: DelayNs> {
    pin_rs: Box<dyn GpioOutput + 'a>,
    pin_rw: Option<Box<dyn GpioOutput + 'a>>,
    pin_e: Box<dyn GpioOutput + 'a>,
    /// D0..D7 on an 8-bit bus, D4..D7 of the display on a 4-bit bus. Index 0 is the LSb.
    data_pins: Vec<Box<dyn GpioOutput + 'a>>,
    width: InterfaceWidth,
    delay: D,
}

impl<'a, D: DelayNs> GpioHD44780Driver<'a, D> {
    /// Creates a driver with a 4-bit data bus.
    ///
    /// # Parameters
    ///
    /// - `pin_rs`: Register select output pin.
    /// - `pin_rw`: Optional read/write output pin, kept low.
    /// - `pin_e`: Enable output pin.
    /// - `data_pins`: Pins wired to D4, D5, D6 and D7 of the display, in that order.
    /// - `delay`: Used for the enable pulse and the processing delays.
    pub fn new_4bit(
        pin_rs: Box<dyn GpioOutput + 'a>,
        pin_rw: Option<Box<dyn GpioOutput + 'a>>,
        pin_e: Box<dyn GpioOutput + 'a>,
        data_pins: [Box<dyn GpioOutput + 'a>; 4],
        delay: D,
    ) -> Self {
        GpioHD44780Driver {
            pin_rs,
            pin_rw,
            pin_e,
            data_pins: data_pins.into(),
            width: InterfaceWidth::FourBit,
            delay,
        }
    }

    /// Creates a driver with an 8-bit data bus. `data_pins` are wired to D0..D7, in that order.
    ///
    /// See [Self::new_4bit] for the other parameters.
    pub fn new_8bit(
        pin_rs: Box<dyn GpioOutput + 'a>,
        pin_rw: Option<Box<dyn GpioOutput + 'a>>,
        pin_e: Box<dyn GpioOutput + 'a>,
        data_pins: [Box<dyn GpioOutput + 'a>; 8],
        delay: D,
    ) -> Self {
        GpioHD44780Driver {
            pin_rs,
            pin_rw,
            pin_e,
            data_pins: data_pins.into(),
            width: InterfaceWidth::EightBit,
            delay,
        }
    }

    /// Creates a driver for the given width, checking that the number of data pins matches it.
    ///
    /// # Errors
    /// - `GpioError::InvalidConfig` if `data_pins` doesn't hold exactly `width.bits()` pins.
    pub fn new(
        width: InterfaceWidth,
        pin_rs: Box<dyn GpioOutput + 'a>,
        pin_rw: Option<Box<dyn GpioOutput + 'a>>,
        pin_e: Box<dyn GpioOutput + 'a>,
        data_pins: Vec<Box<dyn GpioOutput + 'a>>,
        delay: D,
    ) -> GpioResult<Self> {
        if data_pins.len() != width.bits() {
            return Err(GpioError::InvalidConfig(format!(
                "{:?} interface needs {} data pins, got {}",
                width,
                width.bits(),
                data_pins.len()
            )));
        }

        Ok(GpioHD44780Driver {
            pin_rs,
            pin_rw,
            pin_e,
            data_pins,
            width,
            delay,
        })
    }

    /// Rounds `duration` up to whole microseconds.
    fn wait(&mut self, duration: Duration) {
        let us = duration.as_nanos().div_ceil(1_000);
        self.delay.delay_us(u32::try_from(us).unwrap_or(u32::MAX));
    }

    fn pulse_e(&mut self) -> GpioResult<()> {
        self.pin_e.write(false)?;
        self.wait(timing::ENABLE_PULSE);
        self.pin_e.write(true)?;
        self.wait(timing::ENABLE_PULSE);
        self.pin_e.write(false)?;
        self.wait(timing::COMMAND_SETTLE);
        Ok(())
    }
}

impl<D: DelayNs + Debug> HD44780Driver for GpioHD44780Driver<'_, D> {
    fn interface_width(&self) -> InterfaceWidth {
        self.width
    }

    fn write_bits(&mut self, value: u8, width: InterfaceWidth) -> GpioResult<()> {
        if width.bits() > self.data_pins.len() {
            return Err(GpioError::InvalidArgument);
        }

        trace!("Writing {} bits: {:08b}", width.bits(), value);

        for (i, pin) in self.data_pins.iter().take(width.bits()).enumerate() {
            pin.write((value >> i) & 1 != 0)?;
        }

        self.pulse_e()
    }

    fn select_register(&mut self, register: RegisterSelect) -> GpioResult<()> {
        self.pin_rs.write(register.level())?;

        if let Some(rw) = &self.pin_rw {
            rw.write(false)?;
        }

        Ok(())
    }

    fn reset_control_lines(&mut self) -> GpioResult<()> {
        self.pin_rs.write(false)?;
        self.pin_e.write(false)?;

        if let Some(rw) = &self.pin_rw {
            rw.write(false)?;
        }

        Ok(())
    }

    fn delay(&mut self, duration: Duration) {
        self.wait(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{FakeDelay, RecordingPin, Timeline};

    fn driver_4bit(timeline: &Timeline, with_rw: bool) -> GpioHD44780Driver<'static, FakeDelay> {
        GpioHD44780Driver::new_4bit(
            timeline.pin("rs"),
            with_rw.then(|| timeline.pin("rw")),
            timeline.pin("e"),
            timeline.data_pins::<4>(),
            timeline.delay(),
        )
    }

    #[test]
    fn data_bits_are_lsb_first() {
        let timeline = Timeline::default();
        let mut driver = driver_4bit(&timeline, false);

        driver.write_bits(0b0110, InterfaceWidth::FourBit).unwrap();

        let latched = timeline.latched(4);
        assert_eq!(latched.len(), 1);
        assert_eq!(latched[0].bits, 0b0110);
        assert_eq!(timeline.level("d0"), Some(false));
        assert_eq!(timeline.level("d1"), Some(true));
        assert_eq!(timeline.level("d2"), Some(true));
        assert_eq!(timeline.level("d3"), Some(false));
    }

    #[test]
    fn enable_pulse_timing() {
        let timeline = Timeline::default();
        let mut driver = driver_4bit(&timeline, false);

        driver.write_bits(0x3, InterfaceWidth::FourBit).unwrap();

        let e: Vec<_> = timeline.events_of("e");
        let levels: Vec<bool> = e.iter().map(|event| event.level).collect();
        assert_eq!(levels, vec![false, true, false]);
        assert!(e[1].at - e[0].at >= Duration::from_nanos(450));
        assert!(e[2].at - e[1].at >= Duration::from_nanos(450));
        assert!(timeline.now() - e[2].at >= Duration::from_micros(37));
    }

    #[test]
    fn delay_rounds_up_to_whole_microseconds() {
        let timeline = Timeline::default();
        let mut driver = driver_4bit(&timeline, false);

        driver.delay(timing::LONG_COMMAND);
        assert_eq!(timeline.now(), timing::LONG_COMMAND);

        driver.delay(Duration::from_nanos(1_500));
        assert_eq!(timeline.now(), timing::LONG_COMMAND + Duration::from_micros(2));
        assert!(timeline.events().is_empty());
    }

    #[test]
    fn data_settles_before_enable_rises() {
        let timeline = Timeline::default();
        let mut driver = driver_4bit(&timeline, false);

        driver.write_bits(0xF, InterfaceWidth::FourBit).unwrap();

        let events = timeline.events();
        let rise = events
            .iter()
            .position(|event| event.pin == "e" && event.level)
            .unwrap();
        assert!(events[..rise].iter().filter(|event| event.pin.starts_with('d')).count() == 4);
        assert!(events[rise..].iter().all(|event| !event.pin.starts_with('d')));
    }

    #[test]
    fn select_register_drives_rs_and_rw() {
        let timeline = Timeline::default();
        let mut driver = driver_4bit(&timeline, true);

        driver.select_register(RegisterSelect::Data).unwrap();
        assert_eq!(timeline.level("rs"), Some(true));
        assert_eq!(timeline.level("rw"), Some(false));

        driver.select_register(RegisterSelect::Command).unwrap();
        assert_eq!(timeline.level("rs"), Some(false));
    }

    #[test]
    fn missing_rw_is_never_touched() {
        let timeline = Timeline::default();
        let mut driver = driver_4bit(&timeline, false);

        driver.reset_control_lines().unwrap();
        driver.send_data(b'A').unwrap();

        assert!(timeline.events_of("rw").is_empty());
    }

    #[test]
    fn reset_control_lines_pulls_everything_low() {
        let timeline = Timeline::default();
        let mut driver = driver_4bit(&timeline, true);

        driver.reset_control_lines().unwrap();

        assert_eq!(timeline.level("rs"), Some(false));
        assert_eq!(timeline.level("e"), Some(false));
        assert_eq!(timeline.level("rw"), Some(false));
    }

    #[test]
    fn eight_bit_writes_every_line() {
        let timeline = Timeline::default();
        let mut driver = GpioHD44780Driver::new_8bit(
            timeline.pin("rs"),
            None,
            timeline.pin("e"),
            timeline.data_pins::<8>(),
            timeline.delay(),
        );

        driver.send_command(0b1010_0101).unwrap();

        let latched = timeline.latched(8);
        assert_eq!(latched.len(), 1);
        assert_eq!(latched[0].bits, 0b1010_0101);
        assert!(!latched[0].rs);
    }

    #[test]
    fn four_bit_driver_rejects_byte_writes() {
        let timeline = Timeline::default();
        let mut driver = driver_4bit(&timeline, false);

        assert_eq!(
            driver.write_bits(0xFF, InterfaceWidth::EightBit),
            Err(GpioError::InvalidArgument)
        );
        assert!(timeline.events().is_empty());
    }

    #[test]
    fn new_checks_data_pin_count() {
        let timeline = Timeline::default();
        let data: Vec<Box<dyn GpioOutput>> = timeline.data_pins::<4>().into();

        let result = GpioHD44780Driver::new(
            InterfaceWidth::EightBit,
            timeline.pin("rs"),
            None,
            timeline.pin("e"),
            data,
            timeline.delay(),
        );

        assert!(matches!(result, Err(GpioError::InvalidConfig(_))));
    }

    #[test]
    fn new_accepts_matching_pins() {
        let timeline = Timeline::default();
        let data: Vec<Box<dyn GpioOutput>> = timeline.data_pins::<8>().into();

        let driver = GpioHD44780Driver::new(
            InterfaceWidth::EightBit,
            timeline.pin("rs"),
            Some(timeline.pin("rw")),
            timeline.pin("e"),
            data,
            timeline.delay(),
        )
        .unwrap();

        assert_eq!(driver.interface_width(), InterfaceWidth::EightBit);
    }

    #[test]
    fn failing_pin_aborts_the_transfer() {
        let timeline = Timeline::default();
        let mut data = timeline.data_pins::<4>();
        data[2] = Box::new(RecordingPin::failing("d2", &timeline));
        let mut driver = GpioHD44780Driver::new_4bit(
            timeline.pin("rs"),
            None,
            timeline.pin("e"),
            data,
            timeline.delay(),
        );

        assert!(driver.send_data(b'x').is_err());
        assert!(timeline.events_of("e").is_empty());
    }
}
