//! WS2812 bit timing expressed in timer ticks.
//!
//! One bit-time is one timer period. Every period three DMA bursts hit the GPIO
//! output register:
//!
//! ```text
//!  Update (cnt = 0)        all lanes high
//!  CC1    (cnt = T0H)      lanes sending a 0 drop low, 1-lanes stay high
//!  CC2    (cnt = T1H)      all lanes low
//! ```
//!
//! After the last word the bus must idle low for at least the latch time; that
//! dead time is counted in whole timer periods, so it is derived from the same
//! tick arithmetic as the bit itself.

use crate::{Error, Result};

const NS_PER_S: u64 = 1_000_000_000;

/// Datasheet figures for the LED part plus the timer counter clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Timing {
    /// Counter clock after the prescaler.
    pub timer_clock_hz: u32,
    /// Full bit time (T0H + T0L == T1H + T1L).
    pub bit_ns: u32,
    /// High time of a 0 bit.
    pub t0h_ns: u32,
    /// High time of a 1 bit.
    pub t1h_ns: u32,
    /// Minimum low time that makes the LEDs latch the received colours.
    pub reset_ns: u32,
}

impl Timing {
    /// WS2812B at 800 kHz clocked from a 24 MHz counter.
    pub const WS2812B: Timing = Timing {
        timer_clock_hz: 24_000_000,
        bit_ns: 1_250,
        t0h_ns: 350,
        t1h_ns: 700,
        reset_ns: 50_000,
    };

    const fn ticks(&self, ns: u32) -> u32 {
        ((ns as u64 * self.timer_clock_hz as u64 + NS_PER_S / 2) / NS_PER_S) as u32
    }

    const fn ticks_ceil(&self, ns: u32) -> u32 {
        ((ns as u64 * self.timer_clock_hz as u64 + NS_PER_S - 1) / NS_PER_S) as u32
    }

    /// Timer ticks per bit.
    pub const fn period_ticks(&self) -> u16 {
        self.ticks(self.bit_ns) as u16
    }

    /// Auto-reload register value; also the counter preset that makes the first
    /// Update event fire on the very next tick.
    pub const fn auto_reload(&self) -> u16 {
        self.period_ticks() - 1
    }

    /// CC1 compare value, where 0-lanes are pulled low.
    pub const fn data_compare(&self) -> u16 {
        self.ticks(self.t0h_ns) as u16
    }

    /// CC2 compare value, where every lane is pulled low.
    pub const fn low_compare(&self) -> u16 {
        self.ticks(self.t1h_ns) as u16
    }

    /// Number of timer overflows that cover the latch time.
    pub const fn dead_periods(&self) -> u16 {
        let reset = self.ticks_ceil(self.reset_ns);
        let period = self.period_ticks() as u32;
        ((reset + period - 1) / period) as u16
    }

    /// Prescaler register value for the given timer input clock.
    pub fn prescaler(&self, input_hz: u32) -> Result<u16> {
        if input_hz < self.timer_clock_hz || input_hz % self.timer_clock_hz != 0 {
            return Err(Error::Config);
        }
        u16::try_from(input_hz / self.timer_clock_hz - 1).map_err(|_| Error::Config)
    }

    /// Checks the ordering the waveform depends on, and that the bit period
    /// fits the 16-bit timer.
    pub const fn is_consistent(&self) -> bool {
        if self.ticks(self.bit_ns) > u16::MAX as u32 {
            return false;
        }
        let (t0, t1, period) = (self.data_compare(), self.low_compare(), self.period_ticks());
        0 < t0 && t0 < t1 && t1 < period && self.dead_periods() > 0
    }
}

const _: () = assert!(Timing::WS2812B.is_consistent());
