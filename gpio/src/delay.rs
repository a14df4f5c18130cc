//! Blocking delays.
//!
//! Drivers never call [std::thread::sleep] directly. They take an [embedded_hal::delay::DelayNs],
//! so tests can substitute a fake clock and check the minimum durations without actually waiting.

use embedded_hal::delay::DelayNs;
use std::thread::sleep;
use std::time::Duration;

/// [DelayNs] backed by the OS scheduler.
///
/// The thread may sleep longer than requested, which is fine for the HD44780 as all of its timings
/// are minimums.
#[derive(Copy, Clone, Debug, Default)]
pub struct ThreadDelay;

impl DelayNs for ThreadDelay {
    fn delay_ns(&mut self, ns: u32) {
        sleep(Duration::from_nanos(ns.into()));
    }

    fn delay_us(&mut self, us: u32) {
        sleep(Duration::from_micros(us.into()));
    }

    fn delay_ms(&mut self, ms: u32) {
        sleep(Duration::from_millis(ms.into()));
    }
}
