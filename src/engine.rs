//! Transmission engine: pushes an [`EncodedFrame`] out through a timer and
//! three DMA channels, then holds the bus low for the latch time.
//!
//! ```text
//!            send()                transfer complete          overflow x dead_periods
//! IdleReady ───────▶ Transmitting ───────────────────▶ DeadTime ─────────────────────▶ IdleReady
//! ```
//!
//! The frame is a `&'static mut` borrow, so the DMA source address stays valid
//! however the engine itself is moved. It can only be reached through the
//! engine, and every mutating call checks the state first, so nothing can touch
//! the words the DMA is reading. Dropping a busy engine stops the hardware.
//! In the firmware the engine lives in an RTIC shared resource; the resource
//! lock serialises the render task and the two interrupt handlers.

use embedded_dma::ReadTarget;
use smart_leds::RGB8;

use crate::frame::{Column, EncodedFrame, Row};
use crate::timing::Timing;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransmissionState {
    /// Frame may be edited and sent.
    IdleReady,
    /// DMA is streaming the frame to the GPIO port.
    Transmitting,
    /// Frame is out, bus idles low until the LEDs latch.
    DeadTime,
}

/// The two timer compare channels that trigger DMA bursts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CompareChannel {
    /// CC1: writes the frame word (0-lanes drop low).
    Data,
    /// CC2: writes the all-low word.
    Low,
}

/// What the last DMA channel reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransferEvent {
    Complete,
    Error,
}

/// Timer + DMA + GPIO resources the engine drives.
///
/// Calls always come in the order the state machine dictates; implementations
/// only translate them into register writes.
pub trait PixelBus {
    /// GPIO lanes as outputs, timer period and prescaler, DMA channels.
    fn configure(&mut self, timing: &Timing) -> Result<()>;

    fn set_compare_value(&mut self, channel: CompareChannel, ticks: u16);

    /// Points the high/data/low channels at their sources, clears pending
    /// flags, enables the channels and then the timer's Update, CC1 and CC2 DMA
    /// requests, in that order.
    fn arm(&mut self, frame: (*const u16, usize));

    /// Enables both compare channels, presets the counter and starts the timer.
    fn start(&mut self, preset: u16);

    /// Reads and acknowledges the last channel's interrupt flags.
    fn transfer_event(&mut self) -> Option<TransferEvent>;

    /// Disables the three channels, detaches their requests from the timer and
    /// enables the Update interrupt.
    fn release(&mut self);

    /// Acknowledges a timer Update interrupt.
    fn clear_overflow(&mut self);

    /// Compare channels off, timer stopped, Update interrupt off.
    fn stop(&mut self);
}

pub struct Ws2812<B: PixelBus> {
    bus: B,
    timing: Timing,
    frame: &'static mut EncodedFrame,
    state: TransmissionState,
    overflows: u16,
}

impl<B: PixelBus> Ws2812<B> {
    /// Configures the hardware and returns an idle engine. `frame` is cleared
    /// to black; it is usually a `cortex_m::singleton!`.
    pub fn new(mut bus: B, frame: &'static mut EncodedFrame, timing: Timing) -> Result<Self> {
        if !timing.is_consistent() {
            return Err(Error::Config);
        }
        bus.configure(&timing)?;
        bus.set_compare_value(CompareChannel::Data, timing.data_compare());
        bus.set_compare_value(CompareChannel::Low, timing.low_compare());
        #[cfg(feature = "defmt")]
        defmt::debug!(
            "ws2812: period {} ticks, dead time {} periods",
            timing.period_ticks(),
            timing.dead_periods()
        );

        frame.clear();
        Ok(Ws2812 {
            bus,
            timing,
            frame,
            state: TransmissionState::IdleReady,
            overflows: 0,
        })
    }

    pub fn state(&self) -> TransmissionState {
        self.state
    }

    pub fn is_transmission_complete(&self) -> bool {
        self.state == TransmissionState::IdleReady
    }

    /// `WouldBlock` until the previous frame has latched.
    pub fn poll_ready(&self) -> nb::Result<(), void::Void> {
        if self.is_transmission_complete() {
            Ok(())
        } else {
            Err(nb::Error::WouldBlock)
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state {
            TransmissionState::IdleReady => Ok(()),
            state => Err(Error::InvalidState(state)),
        }
    }

    /// The frame, for drawing, while no transmission is in flight.
    pub fn frame_mut(&mut self) -> Result<&mut EncodedFrame> {
        self.ensure_idle()?;
        Ok(&mut *self.frame)
    }

    pub fn frame(&self) -> &EncodedFrame {
        &*self.frame
    }

    pub fn set_pixel(&mut self, row: Row, column: Column, color: RGB8) -> Result<()> {
        self.frame_mut()?.set_pixel(row, column, color);
        Ok(())
    }

    pub fn clear(&mut self) -> Result<()> {
        self.frame_mut()?.clear();
        Ok(())
    }

    /// Starts shifting the frame out.
    pub fn send(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.state = TransmissionState::Transmitting;
        self.bus.arm(self.frame.as_read_buffer());
        self.bus.start(self.timing.auto_reload());
        #[cfg(feature = "defmt")]
        defmt::trace!("ws2812: frame sent");
        Ok(())
    }

    /// Last DMA channel interrupt.
    pub fn on_dma_interrupt(&mut self) -> Result<()> {
        match self.bus.transfer_event() {
            Some(TransferEvent::Complete) => self.transfer_complete(),
            Some(TransferEvent::Error) => {
                #[cfg(feature = "defmt")]
                defmt::error!("ws2812: DMA transfer error in {}", self.state);
                Err(Error::Transfer)
            }
            None => Ok(()),
        }
    }

    /// Timer Update interrupt. Returns `true` once the frame has latched.
    pub fn on_timer_interrupt(&mut self) -> Result<bool> {
        self.bus.clear_overflow();
        self.overflow()
    }

    fn transfer_complete(&mut self) -> Result<()> {
        if self.state != TransmissionState::Transmitting {
            return Err(Error::InvalidState(self.state));
        }
        self.bus.release();
        self.overflows = 0;
        self.state = TransmissionState::DeadTime;
        #[cfg(feature = "defmt")]
        defmt::trace!("ws2812: dead time");
        Ok(())
    }

    fn overflow(&mut self) -> Result<bool> {
        if self.state != TransmissionState::DeadTime {
            return Err(Error::InvalidState(self.state));
        }
        self.overflows += 1;
        if self.overflows < self.timing.dead_periods() {
            return Ok(false);
        }
        self.overflows = 0;
        self.bus.stop();
        self.state = TransmissionState::IdleReady;
        #[cfg(feature = "defmt")]
        defmt::trace!("ws2812: ready");
        Ok(true)
    }

    pub fn timing(&self) -> &Timing {
        &self.timing
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<B: PixelBus> Drop for Ws2812<B> {
    fn drop(&mut self) {
        match self.state {
            TransmissionState::IdleReady => return,
            TransmissionState::Transmitting => self.bus.release(),
            TransmissionState::DeadTime => (),
        }
        self.bus.stop();
        #[cfg(feature = "defmt")]
        defmt::warn!("ws2812: dropped in {}", self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counting {
        arms: usize,
        stops: usize,
        events: Option<TransferEvent>,
    }

    impl PixelBus for Counting {
        fn configure(&mut self, _: &Timing) -> Result<()> {
            Ok(())
        }
        fn set_compare_value(&mut self, _: CompareChannel, _: u16) {}
        fn arm(&mut self, _: (*const u16, usize)) {
            self.arms += 1;
        }
        fn start(&mut self, _: u16) {}
        fn transfer_event(&mut self) -> Option<TransferEvent> {
            self.events.take()
        }
        fn release(&mut self) {}
        fn clear_overflow(&mut self) {}
        fn stop(&mut self) {
            self.stops += 1;
        }
    }

    fn frame() -> &'static mut EncodedFrame {
        Box::leak(Box::new(EncodedFrame::new()))
    }

    fn complete(engine: &mut Ws2812<Counting>) {
        engine.bus.events = Some(TransferEvent::Complete);
        engine.on_dma_interrupt().unwrap();
    }

    #[test]
    fn frame_is_locked_while_busy() {
        let mut engine = Ws2812::new(Counting::default(), frame(), Timing::WS2812B).unwrap();
        engine.send().unwrap();
        assert_eq!(engine.bus.arms, 1);
        let (row, column) = (Row::new(0).unwrap(), Column::new(0).unwrap());
        assert_eq!(
            engine.set_pixel(row, column, RGB8::new(1, 1, 1)),
            Err(Error::InvalidState(TransmissionState::Transmitting))
        );
        complete(&mut engine);
        assert_eq!(
            engine.clear(),
            Err(Error::InvalidState(TransmissionState::DeadTime))
        );
        assert_eq!(engine.frame(), &EncodedFrame::new());
    }

    #[test]
    fn stray_interrupts_are_rejected() {
        let mut engine = Ws2812::new(Counting::default(), frame(), Timing::WS2812B).unwrap();
        assert_eq!(
            engine.on_timer_interrupt(),
            Err(Error::InvalidState(TransmissionState::IdleReady))
        );
        engine.bus.events = Some(TransferEvent::Complete);
        assert_eq!(
            engine.on_dma_interrupt(),
            Err(Error::InvalidState(TransmissionState::IdleReady))
        );
        assert_eq!(engine.bus.stops, 0);
        assert!(engine.is_transmission_complete());
    }

    #[test]
    fn counts_exactly_dead_periods() {
        let timing = Timing::WS2812B;
        let mut engine = Ws2812::new(Counting::default(), frame(), timing).unwrap();
        engine.send().unwrap();
        complete(&mut engine);
        for _ in 1..timing.dead_periods() {
            assert_eq!(engine.on_timer_interrupt(), Ok(false));
        }
        assert_eq!(engine.on_timer_interrupt(), Ok(true));
        assert_eq!(engine.bus.stops, 1);
        assert!(engine.poll_ready().is_ok());
    }

    #[test]
    fn empty_dma_interrupt_is_ignored() {
        let mut engine = Ws2812::new(Counting::default(), frame(), Timing::WS2812B).unwrap();
        engine.send().unwrap();
        assert_eq!(engine.on_dma_interrupt(), Ok(()));
        assert_eq!(engine.state(), TransmissionState::Transmitting);
        assert!(matches!(engine.poll_ready(), Err(nb::Error::WouldBlock)));
    }

    #[test]
    fn starts_from_black_frame() {
        let stale = frame();
        stale.fill(RGB8::new(9, 9, 9));
        let engine = Ws2812::new(Counting::default(), stale, Timing::WS2812B).unwrap();
        assert_eq!(engine.frame(), &EncodedFrame::new());
    }

    #[test]
    fn inconsistent_timing_is_a_config_error() {
        let timing = Timing {
            t1h_ns: 2_000,
            ..Timing::WS2812B
        };
        assert_eq!(
            Ws2812::new(Counting::default(), frame(), timing).err(),
            Some(Error::Config)
        );
    }
}
