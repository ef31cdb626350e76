//! [`PixelBus`] on the STM32F103: TIM2 paces, DMA1 moves words into GPIOA.
//!
//! | channel | request  | source             |
//! |---------|----------|--------------------|
//! | DMA1 2  | TIM2_UP  | `HIGH` (constant)  |
//! | DMA1 5  | TIM2_CH1 | frame words        |
//! | DMA1 7  | TIM2_CH2 | `LOW` (constant)   |
//!
//! Channel 7 carries the last write of every bit, so its transfer-complete
//! interrupt marks the end of the frame.

use stm32f1xx_hal::pac::{DMA1, GPIOA, RCC, TIM2};

use crate::engine::{CompareChannel, PixelBus, TransferEvent};
use crate::frame::{FRAME_WORDS, LANE_MASK, ROWS};
use crate::timing::Timing;
use crate::Result;

// all lanes live in GPIOA CRL
const _: () = assert!(ROWS <= 8);

static HIGH: u16 = LANE_MASK;
static LOW: u16 = 0;

mod dma_cr {
    pub const EN: u32 = 1 << 0;
    pub const TCIE: u32 = 1 << 1;
    pub const TEIE: u32 = 1 << 3;
    pub const DIR_FROM_MEMORY: u32 = 1 << 4;
    pub const MINC: u32 = 1 << 7;
    pub const PSIZE_16: u32 = 0b01 << 8;
    pub const MSIZE_16: u32 = 0b01 << 10;
    pub const PL_VERY_HIGH: u32 = 0b11 << 12;

    pub const BASE: u32 = DIR_FROM_MEMORY | PSIZE_16 | MSIZE_16 | PL_VERY_HIGH;
}

mod tim {
    pub const CEN: u32 = 1 << 0;
    pub const ARPE: u32 = 1 << 7;

    pub const UIE: u32 = 1 << 0;
    pub const UDE: u32 = 1 << 8;
    pub const CC1DE: u32 = 1 << 9;
    pub const CC2DE: u32 = 1 << 10;

    pub const OC1PE: u32 = 1 << 3;
    pub const OC2PE: u32 = 1 << 11;

    pub const CC1E: u32 = 1 << 0;
    pub const CC2E: u32 = 1 << 4;
}

/// DMA1 ISR/IFCR bits of channel `n`.
const fn flags(n: u32) -> u32 {
    0xF << (4 * (n - 1))
}
const TCIF7: u32 = 1 << 25;
const TEIF7: u32 = 1 << 27;

/// Turns on the clocks of the three peripherals. Call before `RCC.constrain()`.
pub fn enable_clocks(rcc: &RCC) {
    rcc.ahbenr.modify(|_, w| w.dma1en().enabled());
    rcc.apb1enr.modify(|_, w| w.tim2en().enabled());
    rcc.apb2enr.modify(|_, w| w.iopaen().enabled());
}

pub struct Tim2Dma1 {
    tim: TIM2,
    dma: DMA1,
    gpio: GPIOA,
    /// TIM2 kernel clock (`pclk1_tim`).
    timer_input_hz: u32,
}

impl Tim2Dma1 {
    pub fn new(tim: TIM2, dma: DMA1, gpio: GPIOA, timer_input_hz: u32) -> Self {
        Tim2Dma1 {
            tim,
            dma,
            gpio,
            timer_input_hz,
        }
    }

    fn odr_address(&self) -> u32 {
        &self.gpio.odr as *const _ as u32
    }
}

impl PixelBus for Tim2Dma1 {
    fn configure(&mut self, timing: &Timing) -> Result<()> {
        let prescaler = timing.prescaler(self.timer_input_hz)?;

        // PA0.. push-pull outputs, 50 MHz
        let (mask, mode) = (0..ROWS).fold((0u32, 0u32), |(m, v), pin| {
            (m | 0xF << (4 * pin), v | 0b0011 << (4 * pin))
        });
        self.gpio
            .crl
            .modify(|r, w| unsafe { w.bits((r.bits() & !mask) | mode) });
        self.gpio
            .odr
            .modify(|r, w| unsafe { w.bits(r.bits() & !u32::from(LANE_MASK)) });

        self.tim.cr1.write(|w| unsafe { w.bits(tim::ARPE) });
        self.tim.dier.write(|w| unsafe { w.bits(0) });
        self.tim
            .psc
            .write(|w| unsafe { w.bits(u32::from(prescaler)) });
        self.tim
            .arr
            .write(|w| unsafe { w.bits(u32::from(timing.auto_reload())) });
        self.tim
            .ccmr1_output()
            .write(|w| unsafe { w.bits(tim::OC1PE | tim::OC2PE) });
        // load PSC/ARR now; UG sets UIF as a side effect
        self.tim.egr.write(|w| w.ug().set_bit());
        self.tim.sr.write(|w| unsafe { w.bits(0) });

        let odr = self.odr_address();
        let (high, low) = (&HIGH as *const u16 as u32, &LOW as *const u16 as u32);
        self.dma.ch2.cr.write(|w| unsafe { w.bits(dma_cr::BASE) });
        self.dma.ch2.par.write(|w| unsafe { w.bits(odr) });
        self.dma.ch2.mar.write(|w| unsafe { w.bits(high) });
        self.dma
            .ch5
            .cr
            .write(|w| unsafe { w.bits(dma_cr::BASE | dma_cr::MINC) });
        self.dma.ch5.par.write(|w| unsafe { w.bits(odr) });
        self.dma
            .ch7
            .cr
            .write(|w| unsafe { w.bits(dma_cr::BASE | dma_cr::TCIE | dma_cr::TEIE) });
        self.dma.ch7.par.write(|w| unsafe { w.bits(odr) });
        self.dma.ch7.mar.write(|w| unsafe { w.bits(low) });

        #[cfg(feature = "defmt")]
        defmt::debug!(
            "tim2: input {} Hz, psc {}, arr {}",
            self.timer_input_hz,
            prescaler,
            timing.auto_reload()
        );
        Ok(())
    }

    fn set_compare_value(&mut self, channel: CompareChannel, ticks: u16) {
        let ticks = u32::from(ticks);
        match channel {
            CompareChannel::Data => self.tim.ccr1.write(|w| unsafe { w.bits(ticks) }),
            CompareChannel::Low => self.tim.ccr2.write(|w| unsafe { w.bits(ticks) }),
        }
    }

    fn arm(&mut self, (frame, len): (*const u16, usize)) {
        let len = len.min(FRAME_WORDS) as u32;
        let dma = &self.dma;
        dma.ch5.mar.write(|w| unsafe { w.bits(frame as u32) });
        for ch in [&dma.ch2, &dma.ch5, &dma.ch7] {
            ch.ndtr.write(|w| unsafe { w.bits(len) });
        }
        dma.ifcr
            .write(|w| unsafe { w.bits(flags(2) | flags(5) | flags(7)) });
        self.tim.sr.write(|w| unsafe { w.bits(0) });

        for ch in [&dma.ch2, &dma.ch5, &dma.ch7] {
            ch.cr.modify(|r, w| unsafe { w.bits(r.bits() | dma_cr::EN) });
        }
        for request in [tim::UDE, tim::CC1DE, tim::CC2DE] {
            self.tim
                .dier
                .modify(|r, w| unsafe { w.bits(r.bits() | request) });
        }
    }

    fn start(&mut self, preset: u16) {
        self.tim
            .ccer
            .modify(|r, w| unsafe { w.bits(r.bits() | tim::CC1E | tim::CC2E) });
        self.tim.cnt.write(|w| unsafe { w.bits(u32::from(preset)) });
        self.tim
            .cr1
            .modify(|r, w| unsafe { w.bits(r.bits() | tim::CEN) });
    }

    fn transfer_event(&mut self) -> Option<TransferEvent> {
        let isr = self.dma.isr.read().bits();
        let event = if isr & TEIF7 != 0 {
            TransferEvent::Error
        } else if isr & TCIF7 != 0 {
            TransferEvent::Complete
        } else {
            return None;
        };
        self.dma.ifcr.write(|w| unsafe { w.bits(flags(7)) });
        Some(event)
    }

    fn release(&mut self) {
        let dma = &self.dma;
        for ch in [&dma.ch2, &dma.ch5, &dma.ch7] {
            ch.cr.modify(|r, w| unsafe { w.bits(r.bits() & !dma_cr::EN) });
        }
        self.tim.sr.write(|w| unsafe { w.bits(0) });
        self.tim.dier.write(|w| unsafe { w.bits(tim::UIE) });
    }

    fn clear_overflow(&mut self) {
        self.tim.sr.modify(|_, w| w.uif().clear_bit());
    }

    fn stop(&mut self) {
        self.tim
            .ccer
            .modify(|r, w| unsafe { w.bits(r.bits() & !(tim::CC1E | tim::CC2E)) });
        self.tim
            .cr1
            .modify(|r, w| unsafe { w.bits(r.bits() & !tim::CEN) });
        self.tim.dier.write(|w| unsafe { w.bits(0) });
    }
}
