//! Test doubles: pins that record every level change against a fake clock, and an HD44780
//! transport that records the operations it's asked to do.

use crate::lcd::hd44780::driver::{HD44780Driver, InterfaceWidth, RegisterSelect};
use crate::{GpioError, GpioOutput, GpioResult};
use embedded_hal::delay::DelayNs;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

const DATA_PIN_NAMES: [&str; 8] = ["d0", "d1", "d2", "d3", "d4", "d5", "d6", "d7"];

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PinEvent {
    pub pin: &'static str,
    pub level: bool,
    pub at: Duration,
}

/// Data bus contents captured on a falling edge of E, which is when the controller latches them.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Latch {
    pub rs: bool,
    pub bits: u8,
    pub at: Duration,
}

#[derive(Debug, Default)]
struct TimelineInner {
    now: Duration,
    events: Vec<PinEvent>,
}

/// A fake clock shared by a set of [RecordingPin]s and [FakeDelay]s.
#[derive(Clone, Debug, Default)]
pub struct Timeline {
    inner: Rc<RefCell<TimelineInner>>,
}

impl Timeline {
    pub fn pin(&self, name: &'static str) -> Box<dyn GpioOutput> {
        Box::new(RecordingPin {
            name,
            timeline: self.clone(),
            failing: false,
        })
    }

    /// Pins named `d0`.. in bus order.
    pub fn data_pins<const N: usize>(&self) -> [Box<dyn GpioOutput>; N] {
        std::array::from_fn(|i| self.pin(DATA_PIN_NAMES[i]))
    }

    pub fn delay(&self) -> FakeDelay {
        FakeDelay {
            timeline: self.clone(),
        }
    }

    pub fn now(&self) -> Duration {
        self.inner.borrow().now
    }

    pub fn events(&self) -> Vec<PinEvent> {
        self.inner.borrow().events.clone()
    }

    pub fn events_of(&self, pin: &str) -> Vec<PinEvent> {
        self.inner
            .borrow()
            .events
            .iter()
            .filter(|event| event.pin == pin)
            .copied()
            .collect()
    }

    /// Last level written to `pin`, if any.
    pub fn level(&self, pin: &str) -> Option<bool> {
        self.events_of(pin).last().map(|event| event.level)
    }

    /// Replays the log and returns what the controller would have latched, reading `width` data lines.
    pub fn latched(&self, width: usize) -> Vec<Latch> {
        let mut levels: HashMap<&str, bool> = HashMap::new();
        let mut latched = Vec::new();

        for event in self.inner.borrow().events.iter() {
            let was_high = levels.get(event.pin).copied().unwrap_or(false);
            if event.pin == "e" && was_high && !event.level {
                let bits = DATA_PIN_NAMES[..width]
                    .iter()
                    .enumerate()
                    .filter(|(_, name)| levels.get(*name).copied().unwrap_or(false))
                    .fold(0u8, |bits, (i, _)| bits | (1 << i));
                latched.push(Latch {
                    rs: levels.get("rs").copied().unwrap_or(false),
                    bits,
                    at: event.at,
                });
            }
            levels.insert(event.pin, event.level);
        }

        latched
    }

    fn record(&self, pin: &'static str, level: bool) {
        let mut inner = self.inner.borrow_mut();
        let at = inner.now;
        inner.events.push(PinEvent { pin, level, at });
    }

    fn advance(&self, duration: Duration) {
        self.inner.borrow_mut().now += duration;
    }
}

#[derive(Debug)]
pub struct RecordingPin {
    name: &'static str,
    timeline: Timeline,
    failing: bool,
}

impl RecordingPin {
    /// A pin whose every write fails, as a disconnected line would.
    pub fn failing(name: &'static str, timeline: &Timeline) -> Self {
        RecordingPin {
            name,
            timeline: timeline.clone(),
            failing: true,
        }
    }
}

impl GpioOutput for RecordingPin {
    fn write(&self, value: bool) -> GpioResult<()> {
        if self.failing {
            return Err(GpioError::Io(std::io::ErrorKind::BrokenPipe));
        }
        self.timeline.record(self.name, value);
        Ok(())
    }
}

/// Advances the [Timeline] instead of sleeping.
#[derive(Debug)]
pub struct FakeDelay {
    timeline: Timeline,
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.timeline.advance(Duration::from_nanos(ns.into()));
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DriverOp {
    Bits(u8, InterfaceWidth),
    Select(RegisterSelect),
    ResetLines,
    Delay(Duration),
}

/// Transport that only records what it's asked to do.
#[derive(Debug)]
pub struct RecordingDriver {
    width: InterfaceWidth,
    pub ops: Vec<DriverOp>,
}

impl RecordingDriver {
    pub fn new(width: InterfaceWidth) -> Self {
        RecordingDriver {
            width,
            ops: Vec::new(),
        }
    }

    /// Whole bytes sent through [HD44780Driver::send], with their register. Raw nibbles written
    /// after the control lines were reset, but before any register was selected, are skipped.
    pub fn transfers(&self) -> Vec<(RegisterSelect, u8)> {
        let mut register = None;
        let mut high_nibble = None;
        let mut transfers = Vec::new();

        for op in &self.ops {
            match *op {
                DriverOp::ResetLines => register = None,
                DriverOp::Select(selected) => {
                    register = Some(selected);
                    high_nibble = None;
                }
                DriverOp::Bits(value, width) => {
                    let Some(register) = register else { continue };
                    match (width, high_nibble.take()) {
                        (InterfaceWidth::EightBit, _) => transfers.push((register, value)),
                        (InterfaceWidth::FourBit, Some(high)) => {
                            transfers.push((register, (high << 4) | value))
                        }
                        (InterfaceWidth::FourBit, None) => high_nibble = Some(value),
                    }
                }
                DriverOp::Delay(_) => {}
            }
        }

        transfers
    }

    pub fn commands(&self) -> Vec<u8> {
        self.values_of(RegisterSelect::Command)
    }

    pub fn data(&self) -> Vec<u8> {
        self.values_of(RegisterSelect::Data)
    }

    fn values_of(&self, register: RegisterSelect) -> Vec<u8> {
        self.transfers()
            .into_iter()
            .filter(|(selected, _)| *selected == register)
            .map(|(_, value)| value)
            .collect()
    }

    /// Total time spent in delays.
    pub fn elapsed(&self) -> Duration {
        self.ops
            .iter()
            .filter_map(|op| match op {
                DriverOp::Delay(duration) => Some(*duration),
                _ => None,
            })
            .sum()
    }
}

impl HD44780Driver for RecordingDriver {
    fn interface_width(&self) -> InterfaceWidth {
        self.width
    }

    fn write_bits(&mut self, value: u8, width: InterfaceWidth) -> GpioResult<()> {
        self.ops.push(DriverOp::Bits(value, width));
        Ok(())
    }

    fn select_register(&mut self, register: RegisterSelect) -> GpioResult<()> {
        self.ops.push(DriverOp::Select(register));
        Ok(())
    }

    fn reset_control_lines(&mut self) -> GpioResult<()> {
        self.ops.push(DriverOp::ResetLines);
        Ok(())
    }

    fn delay(&mut self, duration: Duration) {
        self.ops.push(DriverOp::Delay(duration));
    }
}
